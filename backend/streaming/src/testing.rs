//! Scripted page with fault injection, layered over a static HTML page.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use streamaudit_browser::HtmlPage;
use streamaudit_core::{AuditError, ElementHandle, PageResult, PageState, PlayerApiTrackInfo};

#[derive(Debug, Clone, Copy)]
pub enum Fault {
    Evaluation,
    /// A single rejected command, the way a live tab refuses to focus a
    /// disabled control.
    Rejected,
    Disconnected,
}

impl Fault {
    fn error(self, what: &str) -> AuditError {
        match self {
            Fault::Evaluation => AuditError::Evaluation(format!("scripted failure: {what}")),
            Fault::Rejected => AuditError::Protocol {
                method: what.to_string(),
                message: "scripted failure".to_string(),
            },
            Fault::Disconnected => AuditError::Disconnected(format!("scripted failure: {what}")),
        }
    }
}

pub struct ScriptedPage {
    inner: HtmlPage,
    globals: HashMap<String, Fault>,
    selectors: HashMap<String, Fault>,
    styles: Option<Fault>,
    /// Focus faults keyed by the target's `aria-label`.
    focus: HashMap<String, Fault>,
}

impl ScriptedPage {
    pub fn new(inner: HtmlPage) -> Self {
        Self {
            inner,
            globals: HashMap::new(),
            selectors: HashMap::new(),
            styles: None,
            focus: HashMap::new(),
        }
    }

    pub fn fail_global(mut self, path: &str, fault: Fault) -> Self {
        self.globals.insert(path.to_string(), fault);
        self
    }

    pub fn fail_selector(mut self, selector: &str, fault: Fault) -> Self {
        self.selectors.insert(selector.to_string(), fault);
        self
    }

    pub fn fail_styles(mut self, fault: Fault) -> Self {
        self.styles = Some(fault);
        self
    }

    pub fn focused(&self) -> Option<ElementHandle> {
        self.inner.focused()
    }

    pub fn fail_focus_on(mut self, aria_label: &str, fault: Fault) -> Self {
        self.focus.insert(aria_label.to_string(), fault);
        self
    }
}

#[async_trait]
impl PageState for ScriptedPage {
    async fn global_value(&self, path: &str) -> PageResult<Option<Value>> {
        match self.globals.get(path) {
            Some(fault) => Err(fault.error(path)),
            None => self.inner.global_value(path).await,
        }
    }

    async fn query_all(
        &self,
        selector: &str,
        scope: Option<&ElementHandle>,
    ) -> PageResult<Vec<ElementHandle>> {
        match self.selectors.get(selector) {
            Some(fault) => Err(fault.error(selector)),
            None => self.inner.query_all(selector, scope).await,
        }
    }

    async fn tag_name(&self, element: &ElementHandle) -> PageResult<String> {
        self.inner.tag_name(element).await
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> PageResult<Option<String>> {
        self.inner.attribute(element, name).await
    }

    async fn text_content(&self, element: &ElementHandle) -> PageResult<String> {
        self.inner.text_content(element).await
    }

    async fn parent(&self, element: &ElementHandle) -> PageResult<Option<ElementHandle>> {
        self.inner.parent(element).await
    }

    async fn children(&self, element: &ElementHandle) -> PageResult<Vec<ElementHandle>> {
        self.inner.children(element).await
    }

    async fn tab_index(&self, element: &ElementHandle) -> PageResult<i32> {
        self.inner.tab_index(element).await
    }

    async fn is_rendered(&self, element: &ElementHandle) -> PageResult<bool> {
        self.inner.is_rendered(element).await
    }

    async fn computed_style(&self, element: &ElementHandle) -> PageResult<HashMap<String, String>> {
        match self.styles {
            Some(fault) => Err(fault.error("computed style")),
            None => self.inner.computed_style(element).await,
        }
    }

    async fn text_tracks(&self, media: &ElementHandle) -> PageResult<Vec<PlayerApiTrackInfo>> {
        self.inner.text_tracks(media).await
    }

    async fn focus(&self, element: &ElementHandle) -> PageResult<()> {
        let label = self.inner.attribute(element, "aria-label").await?.unwrap_or_default();
        match self.focus.get(&label) {
            Some(fault) => Err(fault.error("DOM.focus")),
            None => self.inner.focus(element).await,
        }
    }

    async fn blur(&self, element: &ElementHandle) -> PageResult<()> {
        self.inner.blur(element).await
    }
}
