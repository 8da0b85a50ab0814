//! Evidence produced by the caption, audio-description and player checkers.
//!
//! Recomputed for every analysis; never cached across pages.

use serde::{Deserialize, Serialize};

use crate::manifest::{AudioTrack, ManifestTrack};

/// A `<track>` element found in the DOM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomTrackInfo {
    pub kind: String,
    pub src: Option<String>,
    pub srclang: Option<String>,
    pub label: Option<String>,
    /// Locator of the owning media element, `unknown` if the track is orphaned.
    pub parent_selector: String,
}

/// A text track exposed through the media element API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerApiTrackInfo {
    pub label: Option<String>,
    pub language: Option<String>,
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionCheckResult {
    pub dom_tracks: Vec<DomTrackInfo>,
    pub manifest_tracks: Vec<ManifestTrack>,
    pub player_api_tracks: Vec<PlayerApiTrackInfo>,
    pub has_captions: bool,
    /// Every discovered track carries a language tag. True when there are none.
    pub has_language_attributes: bool,
}

impl CaptionCheckResult {
    pub fn track_count(&self) -> usize {
        self.dom_tracks.len() + self.manifest_tracks.len() + self.player_api_tracks.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioDescriptionCheckResult {
    pub dom_description_tracks: Vec<DomTrackInfo>,
    #[serde(rename = "manifestADTracks")]
    pub manifest_ad_tracks: Vec<AudioTrack>,
    pub has_audio_description: bool,
    #[serde(rename = "hasADSelector")]
    pub has_ad_selector: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyboardNavigationResult {
    pub can_tab_into_player: bool,
    pub reachable_controls: Vec<String>,
    pub unreachable_controls: Vec<String>,
    /// 1-based tab stop of the first play/pause control, `-1` if none.
    pub tab_stops_to_play: i32,
    pub tab_stops_to_captions: i32,
    #[serde(rename = "tabStopsToAD")]
    pub tab_stops_to_ad: i32,
    pub controls_activatable_with_keyboard: bool,
}

impl Default for KeyboardNavigationResult {
    fn default() -> Self {
        Self {
            can_tab_into_player: false,
            reachable_controls: Vec::new(),
            unreachable_controls: Vec::new(),
            tab_stops_to_play: -1,
            tab_stops_to_captions: -1,
            tab_stops_to_ad: -1,
            controls_activatable_with_keyboard: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AriaButtonInfo {
    pub selector: String,
    pub accessible_name: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AriaLabelResult {
    pub labeled_buttons: Vec<AriaButtonInfo>,
    pub unlabeled_buttons: Vec<AriaButtonInfo>,
    pub player_has_role: bool,
    pub player_has_accessible_name: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusIndicatorResult {
    pub controls_with_focus_indicator: Vec<String>,
    pub controls_without_focus_indicator: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionCustomizationResult {
    pub has_font_size_control: bool,
    pub has_color_control: bool,
    pub has_background_control: bool,
    pub has_opacity_control: bool,
    pub has_position_control: bool,
    /// Names of the option groups found, in detection order.
    pub detected_options: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerAccessibilityResult {
    pub keyboard_navigation: KeyboardNavigationResult,
    pub aria_labels: AriaLabelResult,
    pub focus_indicators: FocusIndicatorResult,
    pub caption_customization: CaptionCustomizationResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_defaults_mark_controls_as_not_found() {
        let kb = KeyboardNavigationResult::default();
        assert_eq!(kb.tab_stops_to_play, -1);
        assert_eq!(kb.tab_stops_to_captions, -1);
        assert_eq!(kb.tab_stops_to_ad, -1);
        assert!(!kb.can_tab_into_player);
    }

    #[test]
    fn audio_description_keys_keep_acronym_casing() {
        let json = serde_json::to_value(AudioDescriptionCheckResult::default()).unwrap();
        assert!(json.get("manifestADTracks").is_some());
        assert!(json.get("hasADSelector").is_some());
    }
}
