//! Player Accessibility Checker
//!
//! Four independent heuristics over the primary player's container:
//! keyboard reachability, accessible names, focus visibility and caption
//! customization UI.

use once_cell::sync::Lazy;
use regex::Regex;
use streamaudit_core::{
    AriaButtonInfo, AriaLabelResult, CaptionCustomizationResult, DetectedPlayer, ElementHandle,
    FocusIndicatorResult, KeyboardNavigationResult, PageResult, PageState,
    PlayerAccessibilityResult,
};
use tracing::{debug, info};

use crate::dom::{
    non_empty_attribute, recover_or_propagate, short_locator, skip_or_propagate, trimmed_text,
};

const COMPONENT: &str = "PlayerAccessibility";

const INTERACTIVE: &str = r#"button, [role="button"], input[type="range"], [tabindex], a[href], [role="slider"], [role="menuitem"]"#;
const NAMEABLE: &str = r#"button, [role="button"], [role="slider"]"#;
const FOCUS_CANDIDATES: &str =
    r#"button, [role="button"], input[type="range"], [tabindex="0"], a[href]"#;
const SETTINGS_PANELS: [&str; 8] = [
    r#"[class*="settings"]"#,
    r#"[class*="menu"]"#,
    r#"[class*="caption"]"#,
    r#"[class*="subtitle"]"#,
    r#"[class*="preferences"]"#,
    r#"[role="menu"]"#,
    r#"[role="dialog"]"#,
    "dialog",
];
const SETTINGS_INPUTS: &str = r#"input[type="color"], input[type="range"], select"#;

const CONTROL_LABEL_LIMIT: usize = 50;
const FOCUS_LABEL_LIMIT: usize = 30;

/// Role of a reachable control, checked in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlRole {
    PlayPause,
    Captions,
    AudioDescription,
    Volume,
    Fullscreen,
    Seek,
}

impl ControlRole {
    fn label(self) -> &'static str {
        match self {
            ControlRole::PlayPause => "play/pause",
            ControlRole::Captions => "captions toggle",
            ControlRole::AudioDescription => "audio description",
            ControlRole::Volume => "volume",
            ControlRole::Fullscreen => "fullscreen",
            ControlRole::Seek => "timeline/seek",
        }
    }
}

static ROLE_PATTERNS: Lazy<Vec<(ControlRole, Regex)>> = Lazy::new(|| {
    [
        (ControlRole::PlayPause, r"(?i)play|pause"),
        (ControlRole::Captions, r"(?i)caption|subtitle|cc|closed.?caption"),
        (ControlRole::AudioDescription, r"(?i)audio.?desc|described|^ad$"),
        (ControlRole::Volume, r"(?i)volume|mute|sound"),
        (ControlRole::Fullscreen, r"(?i)fullscreen|full.?screen|expand"),
        (ControlRole::Seek, r"(?i)seek|timeline|progress|scrub"),
    ]
    .into_iter()
    .map(|(role, pattern)| (role, Regex::new(pattern).unwrap()))
    .collect()
});

fn classify_control(combined: &str) -> Option<ControlRole> {
    ROLE_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(combined))
        .map(|(role, _)| *role)
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Caption appearance options and the phrases that reveal them.
const CUSTOMIZATION_GROUPS: [(&str, &[&str]); 5] = [
    ("font size", &["font size", "text size", "font-size", "fontsize"]),
    ("font color", &["font color", "text color", "font-color", "foreground color"]),
    ("background color", &["background color", "background-color", "bg color", "window color"]),
    ("opacity", &["opacity", "transparency", "background opacity"]),
    ("position", &["position", "placement", "alignment"]),
];

/// Leading number of a CSS length such as `2px` or `0.5em`.
fn css_length(value: &str) -> f64 {
    let value = value.trim();
    let end = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(value.len());
    value[..end].parse().unwrap_or(0.0)
}

async fn container(page: &dyn PageState, player: &DetectedPlayer) -> PageResult<Option<ElementHandle>> {
    page.query_one(&player.container_selector, None).await
}

/// Where an interactive element stands for keyboard users.
enum Reach {
    Focusable,
    /// Rendered but out of the tab order, with its display label.
    Unreachable(String),
    Hidden,
}

async fn reach_of(page: &dyn PageState, element: &ElementHandle) -> PageResult<Reach> {
    if !page.is_rendered(element).await? {
        return Ok(Reach::Hidden);
    }
    if page.tab_index(element).await? >= 0 {
        return Ok(Reach::Focusable);
    }
    let label = match non_empty_attribute(page, element, "aria-label").await? {
        Some(label) => label,
        None => {
            let text = trimmed_text(page, element).await?;
            if text.is_empty() {
                page.tag_name(element).await?
            } else {
                truncate(&text, CONTROL_LABEL_LIMIT)
            }
        }
    };
    Ok(Reach::Unreachable(label))
}

struct ControlDescription {
    role: Option<ControlRole>,
    name: String,
    is_button: bool,
}

async fn describe_control(
    page: &dyn PageState,
    element: &ElementHandle,
    check_button: bool,
) -> PageResult<ControlDescription> {
    let text = trimmed_text(page, element).await?;
    let aria_label = page.attribute(element, "aria-label").await?.unwrap_or_default();
    let title = page.attribute(element, "title").await?.unwrap_or_default();
    let class = page.attribute(element, "class").await?.unwrap_or_default();
    let combined = format!("{text} {aria_label} {title} {class}");

    let role = classify_control(&combined);
    let name = match role {
        Some(role) => role.label().to_string(),
        None => {
            let trimmed = combined.trim();
            if trimmed.is_empty() {
                page.tag_name(element).await?
            } else {
                truncate(trimmed, CONTROL_LABEL_LIMIT)
            }
        }
    };
    let is_button = check_button
        && (page.tag_name(element).await? == "button"
            || page.attribute(element, "role").await?.as_deref() == Some("button"));
    Ok(ControlDescription { role, name, is_button })
}

pub async fn check_keyboard_navigation(
    page: &dyn PageState,
    player: &DetectedPlayer,
) -> PageResult<KeyboardNavigationResult> {
    let mut result = KeyboardNavigationResult::default();
    let Some(root) = container(page, player).await? else {
        return Ok(result);
    };

    let mut focusable = Vec::new();
    for element in page.query_all(INTERACTIVE, Some(&root)).await? {
        match skip_or_propagate(reach_of(page, &element).await, COMPONENT, "control reachability")? {
            Some(Reach::Focusable) => focusable.push(element),
            Some(Reach::Unreachable(label)) => result.unreachable_controls.push(label),
            Some(Reach::Hidden) | None => {}
        }
    }
    result.can_tab_into_player = !focusable.is_empty();

    for (index, element) in focusable.iter().enumerate() {
        let stop = index as i32 + 1;
        let described = describe_control(page, element, !result.controls_activatable_with_keyboard).await;
        // The element still occupies its tab stop when it cannot be described.
        let Some(control) = skip_or_propagate(described, COMPONENT, "control description")? else {
            continue;
        };

        let slot = match control.role {
            Some(ControlRole::PlayPause) => Some(&mut result.tab_stops_to_play),
            Some(ControlRole::Captions) => Some(&mut result.tab_stops_to_captions),
            Some(ControlRole::AudioDescription) => Some(&mut result.tab_stops_to_ad),
            _ => None,
        };
        if let Some(slot) = slot {
            if *slot == -1 {
                *slot = stop;
            }
        }
        result.reachable_controls.push(control.name);
        if control.is_button {
            result.controls_activatable_with_keyboard = true;
        }
    }

    debug!(
        reachable = result.reachable_controls.len(),
        unreachable = result.unreachable_controls.len(),
        "[PlayerAccessibility] Keyboard navigation checked"
    );
    Ok(result)
}

/// `aria-label`, then the `aria-labelledby` target's text, then visible
/// text, then `title`.
async fn accessible_name(page: &dyn PageState, element: &ElementHandle) -> PageResult<Option<String>> {
    if let Some(label) = non_empty_attribute(page, element, "aria-label").await? {
        return Ok(Some(label));
    }
    if let Some(reference) = non_empty_attribute(page, element, "aria-labelledby").await? {
        return Ok(match page.element_by_id(&reference).await? {
            Some(target) => Some(trimmed_text(page, &target).await?),
            None => Some(reference),
        });
    }
    let text = trimmed_text(page, element).await?;
    if !text.is_empty() {
        return Ok(Some(text));
    }
    non_empty_attribute(page, element, "title").await
}

async fn button_info(page: &dyn PageState, element: &ElementHandle) -> PageResult<AriaButtonInfo> {
    let role = match page.attribute(element, "role").await? {
        Some(role) => Some(role),
        None if page.tag_name(element).await? == "button" => Some("button".to_string()),
        None => None,
    };
    Ok(AriaButtonInfo {
        selector: short_locator(page, element).await?,
        accessible_name: accessible_name(page, element).await?,
        role,
    })
}

pub async fn check_aria_labels(
    page: &dyn PageState,
    player: &DetectedPlayer,
) -> PageResult<AriaLabelResult> {
    let mut result = AriaLabelResult::default();
    let Some(root) = container(page, player).await? else {
        return Ok(result);
    };

    let root_tag = page.tag_name(&root).await?;
    result.player_has_role =
        page.attribute(&root, "role").await?.is_some() || matches!(root_tag.as_str(), "video" | "audio");
    let mut has_name = false;
    for attr in ["aria-label", "aria-labelledby", "title"] {
        if page.attribute(&root, attr).await?.is_some() {
            has_name = true;
            break;
        }
    }
    result.player_has_accessible_name = has_name;

    for element in page.query_all(NAMEABLE, Some(&root)).await? {
        let named = button_info(page, &element).await;
        let Some(info) = skip_or_propagate(named, COMPONENT, "control naming")? else {
            continue;
        };
        if info.accessible_name.as_deref().map(|n| !n.is_empty()).unwrap_or(false) {
            result.labeled_buttons.push(info);
        } else {
            result.unlabeled_buttons.push(info);
        }
    }

    debug!(
        labeled = result.labeled_buttons.len(),
        unlabeled = result.unlabeled_buttons.len(),
        "[PlayerAccessibility] Accessible names checked"
    );
    Ok(result)
}

/// Label of a rendered control and whether focusing it shows an outline or
/// box shadow. `None` for controls that are not rendered.
async fn focus_indicator_of(
    page: &dyn PageState,
    element: &ElementHandle,
) -> PageResult<Option<(String, bool)>> {
    if !page.is_rendered(element).await? {
        return Ok(None);
    }

    // A control that refuses focus is judged by its resting style.
    skip_or_propagate(page.focus(element).await, COMPONENT, "focusing a control")?;
    let style = page.computed_style(element).await;
    skip_or_propagate(page.blur(element).await, COMPONENT, "blurring a control")?;
    let style = style?;

    let prop = |name: &str| style.get(name).map(|v| v.trim().to_string()).unwrap_or_default();
    let outline_style = prop("outline-style");
    let has_outline =
        !outline_style.is_empty() && outline_style != "none" && css_length(&prop("outline-width")) > 0.0;
    let box_shadow = prop("box-shadow");
    let has_box_shadow = !box_shadow.is_empty() && box_shadow != "none";

    let label = match non_empty_attribute(page, element, "aria-label").await? {
        Some(label) => label,
        None => {
            let text = trimmed_text(page, element).await?;
            if text.is_empty() {
                page.tag_name(element).await?
            } else {
                truncate(&text, FOCUS_LABEL_LIMIT)
            }
        }
    };
    Ok(Some((label, has_outline || has_box_shadow)))
}

pub async fn check_focus_indicators(
    page: &dyn PageState,
    player: &DetectedPlayer,
) -> PageResult<FocusIndicatorResult> {
    let mut result = FocusIndicatorResult::default();
    let Some(root) = container(page, player).await? else {
        return Ok(result);
    };

    for element in page.query_all(FOCUS_CANDIDATES, Some(&root)).await? {
        let checked = focus_indicator_of(page, &element).await;
        match skip_or_propagate(checked, COMPONENT, "focus indicator")?.flatten() {
            Some((label, true)) => result.controls_with_focus_indicator.push(label),
            Some((label, false)) => result.controls_without_focus_indicator.push(label),
            None => {}
        }
    }

    debug!(
        with = result.controls_with_focus_indicator.len(),
        without = result.controls_without_focus_indicator.len(),
        "[PlayerAccessibility] Focus indicators checked"
    );
    Ok(result)
}

pub async fn check_caption_customization(
    page: &dyn PageState,
    player: &DetectedPlayer,
) -> PageResult<CaptionCustomizationResult> {
    // Without a container the whole document is searched.
    let root = container(page, player).await?;
    let scope = root.as_ref();

    let mut text = String::new();
    for selector in SETTINGS_PANELS {
        for element in page.query_all(selector, scope).await? {
            text.push(' ');
            text.push_str(&page.text_content(&element).await?);
        }
    }
    for input in page.query_all(SETTINGS_INPUTS, scope).await? {
        let label = match page.attribute(&input, "aria-label").await?.filter(|l| !l.is_empty()) {
            Some(label) => label,
            None => page.attribute(&input, "name").await?.unwrap_or_default(),
        };
        text.push(' ');
        text.push_str(&label);
    }
    let text = text.to_lowercase();

    let mut result = CaptionCustomizationResult::default();
    for (option, phrases) in CUSTOMIZATION_GROUPS {
        if !phrases.iter().any(|p| text.contains(p)) {
            continue;
        }
        match option {
            "font size" => result.has_font_size_control = true,
            "font color" => result.has_color_control = true,
            "background color" => result.has_background_control = true,
            "opacity" => result.has_opacity_control = true,
            _ => result.has_position_control = true,
        }
        result.detected_options.push(option.to_string());
    }

    debug!(options = ?result.detected_options, "[PlayerAccessibility] Caption customization checked");
    Ok(result)
}

/// Run all four heuristics concurrently against the player's container.
/// A heuristic that fails recoverably contributes its empty result.
pub async fn check_player_accessibility(
    page: &dyn PageState,
    player: &DetectedPlayer,
) -> PageResult<PlayerAccessibilityResult> {
    let (keyboard, aria, focus, customization) = tokio::join!(
        check_keyboard_navigation(page, player),
        check_aria_labels(page, player),
        check_focus_indicators(page, player),
        check_caption_customization(page, player),
    );

    let result = PlayerAccessibilityResult {
        keyboard_navigation: recover_or_propagate(keyboard, COMPONENT, "keyboard navigation")?,
        aria_labels: recover_or_propagate(aria, COMPONENT, "accessible naming")?,
        focus_indicators: recover_or_propagate(focus, COMPONENT, "focus indicators")?,
        caption_customization: recover_or_propagate(customization, COMPONENT, "caption customization")?,
    };
    info!(
        container = %player.container_selector,
        can_tab = result.keyboard_navigation.can_tab_into_player,
        unlabeled = result.aria_labels.unlabeled_buttons.len(),
        options = result.caption_customization.detected_options.len(),
        "[PlayerAccessibility] Player checked"
    );
    Ok(result)
}
