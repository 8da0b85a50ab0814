//! Static HTML Page
//!
//! A [`PageState`] over an HTML snapshot instead of a live tab. Used for offline
//! audits of saved pages and as the fixture page in tests.
//!
//! Layout is approximated: an element is rendered unless it, or an ancestor,
//! is `hidden` or computes to `display: none`. Computed style is the document's
//! `<style>` rules applied in source order (no specificity), then the inline
//! `style` attribute. `:focus` and `:focus-visible` rules apply to the focused
//! element only.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use streamaudit_core::{AuditError, ElementHandle, PageResult, PageState, PlayerApiTrackInfo};
use tracing::debug;

static CSS_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());

const OUTLINE_STYLES: &[&str] = &[
    "none", "hidden", "dotted", "dashed", "solid", "double", "groove", "ridge", "inset", "outset",
    "auto",
];

const NON_RENDERED_TAGS: &[&str] = &[
    "head", "script", "style", "template", "title", "meta", "link", "noscript",
];

struct StyleRule {
    selector: Selector,
    focus_only: bool,
    declarations: Vec<(String, String)>,
}

/// One element of the snapshot, resolved once at load.
struct Node {
    tag: String,
    attrs: HashMap<String, String>,
    text: String,
    parent: Option<usize>,
    children: Vec<usize>,
    /// Index of the last element in this node's subtree.
    last_descendant: usize,
    tab_index: i32,
    rendered: bool,
    style: HashMap<String, String>,
    focus_style: HashMap<String, String>,
}

pub struct HtmlPage {
    source: String,
    nodes: Vec<Node>,
    ids: HashMap<String, usize>,
    globals: Map<String, Value>,
    focused: Mutex<Option<u64>>,
    /// Document-wide matches per selector string.
    matches: Mutex<HashMap<String, Vec<usize>>>,
    parses: AtomicUsize,
}

impl HtmlPage {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let html = Html::parse_document(&source);
        let nodes = build_nodes(&html);

        let mut ids = HashMap::new();
        for (index, node) in nodes.iter().enumerate() {
            if let Some(id) = node.attrs.get("id") {
                ids.entry(id.clone()).or_insert(index);
            }
        }
        debug!(elements = nodes.len(), "[HtmlPage] snapshot loaded");

        Self {
            source,
            nodes,
            ids,
            globals: Map::new(),
            focused: Mutex::new(None),
            matches: Mutex::new(HashMap::new()),
            parses: AtomicUsize::new(1),
        }
    }

    pub async fn from_file(path: &Path) -> Result<Self> {
        let source = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read HTML snapshot: {}", path.display()))?;
        Ok(Self::new(source))
    }

    /// Expose a value on the page's global object, e.g. `("Hls", json!({"version": "1.5.7"}))`.
    pub fn with_global(mut self, name: &str, value: Value) -> Self {
        self.globals.insert(name.to_string(), value);
        self
    }

    /// Replace all globals at once from a JSON object.
    pub fn with_globals(mut self, globals: Map<String, Value>) -> Self {
        self.globals = globals;
        self
    }

    /// Handle of the currently focused element, if any.
    pub fn focused(&self) -> Option<ElementHandle> {
        self.focused_id().map(ElementHandle::new)
    }

    fn focused_id(&self) -> Option<u64> {
        *self.focused.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_focused(&self, id: Option<u64>) {
        *self.focused.lock().unwrap_or_else(|e| e.into_inner()) = id;
    }

    #[cfg(test)]
    fn parse_count(&self) -> usize {
        self.parses.load(Ordering::Relaxed)
    }

    fn node(&self, handle: &ElementHandle) -> PageResult<&Node> {
        usize::try_from(handle.id())
            .ok()
            .and_then(|i| self.nodes.get(i))
            .ok_or_else(|| AuditError::Evaluation(format!("stale element handle {}", handle.id())))
    }

    fn handle(index: usize) -> ElementHandle {
        ElementHandle::new(index as u64)
    }

    /// Document-wide matches for `selector`. The tree is only re-parsed the
    /// first time a selector is seen.
    fn select(&self, selector: &str) -> PageResult<Vec<usize>> {
        let sel = parse_selector(selector)?;
        let mut cache = self.matches.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(found) = cache.get(selector) {
            return Ok(found.clone());
        }

        let html = Html::parse_document(&self.source);
        self.parses.fetch_add(1, Ordering::Relaxed);
        let positions: HashMap<_, usize> = document_elements(&html)
            .enumerate()
            .map(|(i, el)| (el.id(), i))
            .collect();
        let found: Vec<usize> = html
            .select(&sel)
            .filter_map(|el| positions.get(&el.id()).copied())
            .collect();
        cache.insert(selector.to_string(), found.clone());
        Ok(found)
    }
}

fn document_elements(html: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    html.root_element().descendants().filter_map(ElementRef::wrap)
}

/// Flatten the parsed tree into document order and resolve everything the
/// page later answers from: text, focusability, rendering and style.
fn build_nodes(html: &Html) -> Vec<Node> {
    let elements: Vec<ElementRef<'_>> = document_elements(html).collect();
    let positions: HashMap<_, usize> = elements
        .iter()
        .enumerate()
        .map(|(i, el)| (el.id(), i))
        .collect();

    let rules: Vec<StyleRule> = match Selector::parse("style") {
        Ok(style_sel) => html
            .select(&style_sel)
            .flat_map(|style| parse_stylesheet(&style.text().collect::<String>()))
            .collect(),
        Err(_) => Vec::new(),
    };

    let mut nodes: Vec<Node> = Vec::with_capacity(elements.len());
    for (index, el) in elements.iter().enumerate() {
        let value = el.value();
        let parent = el
            .parent()
            .and_then(ElementRef::wrap)
            .and_then(|p| positions.get(&p.id()).copied());
        let (style, focus_style) = element_styles(*el, &rules);

        let tag = value.name().to_ascii_lowercase();
        let hidden_input = tag == "input"
            && value
                .attr("type")
                .map(|t| t.eq_ignore_ascii_case("hidden"))
                .unwrap_or(false);
        let self_hidden = value.attr("hidden").is_some()
            || NON_RENDERED_TAGS.contains(&tag.as_str())
            || hidden_input
            || style.get("display").map(|d| d == "none").unwrap_or(false);
        // Parents always precede their children in document order.
        let parent_rendered = parent.map(|p| nodes[p].rendered).unwrap_or(true);

        let tab_index = value
            .attr("tabindex")
            .and_then(|v| v.trim().parse::<i32>().ok())
            .unwrap_or(if natively_focusable(*el) { 0 } else { -1 });

        nodes.push(Node {
            attrs: value
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            text: el.text().collect(),
            parent,
            children: el
                .children()
                .filter_map(ElementRef::wrap)
                .filter_map(|c| positions.get(&c.id()).copied())
                .collect(),
            last_descendant: index,
            tab_index,
            rendered: parent_rendered && !self_hidden,
            style,
            focus_style,
            tag,
        });
    }

    for index in (0..nodes.len()).rev() {
        if let Some(&last) = nodes[index].children.last() {
            nodes[index].last_descendant = nodes[last].last_descendant;
        }
    }
    nodes
}

/// Computed style without and with focus. Rules apply in source order (no
/// specificity), then the inline `style` attribute.
fn element_styles(
    element: ElementRef<'_>,
    rules: &[StyleRule],
) -> (HashMap<String, String>, HashMap<String, String>) {
    let mut style: HashMap<String, String> = [
        ("display", "inline"),
        ("position", "static"),
        ("outline-style", "none"),
        ("outline-width", "0px"),
        ("box-shadow", "none"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let mut focus_style = style.clone();

    for rule in rules {
        if !rule.selector.matches(&element) {
            continue;
        }
        apply_declarations(&mut focus_style, &rule.declarations);
        if !rule.focus_only {
            apply_declarations(&mut style, &rule.declarations);
        }
    }
    if let Some(inline) = element.value().attr("style") {
        let inline = parse_declarations(inline);
        apply_declarations(&mut style, &inline);
        apply_declarations(&mut focus_style, &inline);
    }
    (style, focus_style)
}

fn parse_stylesheet(css: &str) -> Vec<StyleRule> {
    let css = CSS_COMMENT.replace_all(css, "");
    let mut rules = Vec::new();

    for block in css.split('}') {
        let Some((selectors, body)) = block.split_once('{') else {
            continue;
        };
        let selectors = selectors.trim();
        if selectors.starts_with('@') {
            continue;
        }
        let declarations = parse_declarations(body);

        for part in selectors.split(',') {
            let part = part.trim();
            if part.is_empty() || part.contains(":focus-within") {
                continue;
            }
            let focus_only = part.contains(":focus");
            let mut stripped = part.replace(":focus-visible", "").replace(":focus", "");
            if stripped.trim().is_empty() || stripped.ends_with(' ') || stripped.ends_with('>') {
                stripped.push('*');
            }
            match Selector::parse(stripped.trim()) {
                Ok(selector) => rules.push(StyleRule {
                    selector,
                    focus_only,
                    declarations: declarations.clone(),
                }),
                Err(_) => debug!(selector = part, "[HtmlPage] skipping unsupported CSS selector"),
            };
        }
    }
    rules
}

fn parse_declarations(body: &str) -> Vec<(String, String)> {
    body.split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim().to_ascii_lowercase();
            let value = value.trim().trim_end_matches("!important").trim().to_string();
            (!prop.is_empty()).then_some((prop, value))
        })
        .collect()
}

fn apply_declarations(style: &mut HashMap<String, String>, declarations: &[(String, String)]) {
    for (prop, value) in declarations {
        if prop == "outline" {
            expand_outline(style, value);
        } else {
            style.insert(prop.clone(), value.clone());
        }
    }
}

/// `outline: <width> <style> <color>` in any order.
fn expand_outline(style: &mut HashMap<String, String>, value: &str) {
    let mut outline_style = "none".to_string();
    let mut width = None;
    for token in value.split_whitespace() {
        let lower = token.to_ascii_lowercase();
        if OUTLINE_STYLES.contains(&lower.as_str()) {
            outline_style = lower;
        } else if lower.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
            width = Some(lower);
        } else if matches!(lower.as_str(), "thin" | "medium" | "thick") {
            width = Some(
                match lower.as_str() {
                    "thin" => "1px",
                    "medium" => "3px",
                    _ => "5px",
                }
                .to_string(),
            );
        }
    }
    style.insert("outline-style".into(), outline_style);
    style.insert("outline-width".into(), width.unwrap_or_else(|| "3px".into()));
}

fn natively_focusable(element: ElementRef<'_>) -> bool {
    let el = element.value();
    match el.name() {
        "a" | "area" => el.attr("href").is_some(),
        "button" | "select" | "textarea" | "iframe" | "summary" => true,
        "input" => !el
            .attr("type")
            .map(|t| t.eq_ignore_ascii_case("hidden"))
            .unwrap_or(false),
        "video" | "audio" => el.attr("controls").is_some(),
        _ => el.attr("contenteditable").is_some(),
    }
}

fn parse_selector(selector: &str) -> PageResult<Selector> {
    Selector::parse(selector).map_err(|e| AuditError::InvalidSelector(format!("{selector}: {e:?}")))
}

#[async_trait]
impl PageState for HtmlPage {
    async fn global_value(&self, path: &str) -> PageResult<Option<Value>> {
        let mut parts = path.split('.');
        let Some(first) = parts.next() else {
            return Ok(None);
        };
        let mut current = match self.globals.get(first) {
            Some(v) => v,
            None => return Ok(None),
        };
        for part in parts {
            current = match current.get(part) {
                Some(v) => v,
                None => return Ok(None),
            };
        }
        Ok((!current.is_null()).then(|| current.clone()))
    }

    async fn query_all(
        &self,
        selector: &str,
        scope: Option<&ElementHandle>,
    ) -> PageResult<Vec<ElementHandle>> {
        let found = self.select(selector)?;
        let range = match scope {
            Some(handle) => {
                let node = self.node(handle)?;
                handle.id() as usize + 1..=node.last_descendant
            }
            None => 0..=usize::MAX,
        };
        Ok(found
            .into_iter()
            .filter(|i| range.contains(i))
            .map(Self::handle)
            .collect())
    }

    async fn element_by_id(&self, id: &str) -> PageResult<Option<ElementHandle>> {
        Ok(self.ids.get(id).copied().map(Self::handle))
    }

    async fn tag_name(&self, element: &ElementHandle) -> PageResult<String> {
        Ok(self.node(element)?.tag.clone())
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> PageResult<Option<String>> {
        Ok(self.node(element)?.attrs.get(name).cloned())
    }

    async fn text_content(&self, element: &ElementHandle) -> PageResult<String> {
        Ok(self.node(element)?.text.clone())
    }

    async fn parent(&self, element: &ElementHandle) -> PageResult<Option<ElementHandle>> {
        Ok(self.node(element)?.parent.map(Self::handle))
    }

    async fn children(&self, element: &ElementHandle) -> PageResult<Vec<ElementHandle>> {
        Ok(self
            .node(element)?
            .children
            .iter()
            .copied()
            .map(Self::handle)
            .collect())
    }

    async fn tab_index(&self, element: &ElementHandle) -> PageResult<i32> {
        Ok(self.node(element)?.tab_index)
    }

    async fn is_rendered(&self, element: &ElementHandle) -> PageResult<bool> {
        Ok(self.node(element)?.rendered)
    }

    async fn computed_style(&self, element: &ElementHandle) -> PageResult<HashMap<String, String>> {
        let node = self.node(element)?;
        Ok(if self.focused_id() == Some(element.id()) {
            node.focus_style.clone()
        } else {
            node.style.clone()
        })
    }

    async fn text_tracks(&self, media: &ElementHandle) -> PageResult<Vec<PlayerApiTrackInfo>> {
        let node = self.node(media)?;
        if !matches!(node.tag.as_str(), "video" | "audio") {
            return Ok(Vec::new());
        }
        Ok(node
            .children
            .iter()
            .map(|&i| &self.nodes[i])
            .filter(|c| c.tag == "track")
            .map(|track| {
                let non_empty =
                    |name: &str| track.attrs.get(name).filter(|s| !s.is_empty()).cloned();
                PlayerApiTrackInfo {
                    label: non_empty("label"),
                    language: non_empty("srclang"),
                    // The track API reports a missing kind as subtitles.
                    kind: Some(
                        non_empty("kind")
                            .unwrap_or_else(|| "subtitles".to_string())
                            .to_ascii_lowercase(),
                    ),
                }
            })
            .collect())
    }

    async fn focus(&self, element: &ElementHandle) -> PageResult<()> {
        self.node(element)?;
        self.set_focused(Some(element.id()));
        Ok(())
    }

    async fn blur(&self, element: &ElementHandle) -> PageResult<()> {
        if self.focused_id() == Some(element.id()) {
            self.set_focused(None);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PAGE: &str = r#"
        <html><head>
          <style>
            .hidden { display: none; }
            .ctl:focus-visible { outline: 2px solid #ffbf47; }
          </style>
        </head><body>
          <div id="player" class="player shell">
            <video id="v" controls>
              <track kind="captions" srclang="en" label="English" src="en.vtt">
              <track src="sv.vtt">
            </video>
            <button class="ctl" aria-label="Play">▶</button>
            <button class="ctl hidden">Secret</button>
            <span role="button" tabindex="-1">Mute</span>
          </div>
        </body></html>
    "#;

    #[tokio::test]
    async fn scoped_queries_only_see_descendants() {
        let page = HtmlPage::new(PAGE);
        let player = page.query_one("#player", None).await.unwrap().unwrap();
        let buttons = page.query_all("button", Some(&player)).await.unwrap();
        assert_eq!(buttons.len(), 2);
        let inside_player = page.query_all("#player", Some(&player)).await.unwrap();
        assert!(inside_player.is_empty());
    }

    #[tokio::test]
    async fn invalid_selector_is_reported() {
        let page = HtmlPage::new(PAGE);
        let err = page.query_all("[[nope", None).await.unwrap_err();
        assert!(matches!(err, AuditError::InvalidSelector(_)));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn tab_index_follows_native_focusability() {
        let page = HtmlPage::new(PAGE);
        let play = page.query_one("button", None).await.unwrap().unwrap();
        let mute = page.query_one("span[role=\"button\"]", None).await.unwrap().unwrap();
        let player = page.element_by_id("player").await.unwrap().unwrap();
        assert_eq!(page.tab_index(&play).await.unwrap(), 0);
        assert_eq!(page.tab_index(&mute).await.unwrap(), -1);
        assert_eq!(page.tab_index(&player).await.unwrap(), -1);
    }

    #[tokio::test]
    async fn stylesheet_display_none_hides_element() {
        let page = HtmlPage::new(PAGE);
        let buttons = page.query_all("button", None).await.unwrap();
        assert!(page.is_rendered(&buttons[0]).await.unwrap());
        assert!(!page.is_rendered(&buttons[1]).await.unwrap());
    }

    #[tokio::test]
    async fn focus_rules_apply_only_while_focused() {
        let page = HtmlPage::new(PAGE);
        let play = page.query_one("button", None).await.unwrap().unwrap();

        let before = page.computed_style(&play).await.unwrap();
        assert_eq!(before["outline-style"], "none");

        page.focus(&play).await.unwrap();
        assert_eq!(page.focused(), Some(play));
        let during = page.computed_style(&play).await.unwrap();
        assert_eq!(during["outline-style"], "solid");
        assert_eq!(during["outline-width"], "2px");

        page.blur(&play).await.unwrap();
        assert_eq!(page.focused(), None);
    }

    #[tokio::test]
    async fn text_tracks_default_kind_to_subtitles() {
        let page = HtmlPage::new(PAGE);
        let video = page.element_by_id("v").await.unwrap().unwrap();
        let tracks = page.text_tracks(&video).await.unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].kind.as_deref(), Some("captions"));
        assert_eq!(tracks[0].language.as_deref(), Some("en"));
        assert_eq!(tracks[1].kind.as_deref(), Some("subtitles"));
        assert_eq!(tracks[1].language, None);
    }

    #[tokio::test]
    async fn global_paths_resolve_through_objects() {
        let page = HtmlPage::new(PAGE).with_global("Hls", json!({ "version": "1.5.7" }));
        assert_eq!(page.global_value("Hls.version").await.unwrap(), Some(json!("1.5.7")));
        assert!(page.global_value("Hls").await.unwrap().is_some());
        assert_eq!(page.global_value("dashjs").await.unwrap(), None);
        assert_eq!(page.global_value("Hls.missing.deeper").await.unwrap(), None);
    }

    #[tokio::test]
    async fn parent_and_children_walk_the_tree() {
        let page = HtmlPage::new(PAGE);
        let video = page.element_by_id("v").await.unwrap().unwrap();
        let parent = page.parent(&video).await.unwrap().unwrap();
        assert_eq!(page.attribute(&parent, "id").await.unwrap().as_deref(), Some("player"));
        let children = page.children(&parent).await.unwrap();
        assert_eq!(children.len(), 4);
        assert_eq!(page.tag_name(&children[0]).await.unwrap(), "video");
    }

    fn menu_blocks(count: usize) -> String {
        let mut body = String::from("<html><head><style>.menu button:focus { outline: 1px solid red; }</style></head><body>");
        for i in 0..count {
            body.push_str(&format!(
                r#"<div class="menu" id="m{i}"><span>Item {i}</span><button aria-label="Open {i}">+</button></div>"#
            ));
        }
        body.push_str("</body></html>");
        body
    }

    #[tokio::test]
    async fn snapshot_is_parsed_once_per_selector() {
        let page = HtmlPage::new(menu_blocks(2_000));
        assert_eq!(page.parse_count(), 1);

        let buttons = page.query_all("button", None).await.unwrap();
        assert_eq!(buttons.len(), 2_000);
        for button in &buttons {
            assert_eq!(page.tag_name(button).await.unwrap(), "button");
            assert!(page.is_rendered(button).await.unwrap());
            page.computed_style(button).await.unwrap();
            page.text_content(button).await.unwrap();
            let menu = page.parent(button).await.unwrap().unwrap();
            assert_eq!(page.query_all("button", Some(&menu)).await.unwrap(), vec![*button]);
        }
        assert_eq!(page.parse_count(), 2);

        let last = page.element_by_id("m1999").await.unwrap().unwrap();
        assert_eq!(page.children(&last).await.unwrap().len(), 2);
        assert_eq!(page.parse_count(), 2);
    }

    #[tokio::test]
    async fn scoped_matches_respect_subtree_bounds() {
        let page = HtmlPage::new(menu_blocks(3));
        let middle = page.element_by_id("m1").await.unwrap().unwrap();
        let spans = page.query_all("span", Some(&middle)).await.unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(page.text_content(&spans[0]).await.unwrap(), "Item 1");

        let body = page.query_one("body", None).await.unwrap().unwrap();
        assert_eq!(page.query_all(".menu span", Some(&body)).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn stale_handles_are_rejected() {
        let page = HtmlPage::new(PAGE);
        let err = page.tag_name(&ElementHandle::new(10_000)).await.unwrap_err();
        assert!(matches!(err, AuditError::Evaluation(_)));
    }
}
