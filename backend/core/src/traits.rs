use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::checks::PlayerApiTrackInfo;
use crate::error::PageResult;
use crate::manifest::InterceptedManifest;

/// Opaque reference to an element on the controlled page.
///
/// Only meaningful to the [`PageState`] that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(u64);

impl ElementHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Read access to a live page's global state and DOM.
///
/// Every call is an asynchronous round trip and may fail on its own. The
/// engine only ever reads through this trait, apart from moving focus.
#[async_trait]
pub trait PageState: Send + Sync {
    /// Value of a dotted property path on the page's global object
    /// (e.g. `Hls.version`). `None` when any segment is missing or null.
    ///
    /// Objects and functions may be reported by their type name rather than
    /// by value; scalars come back as-is.
    async fn global_value(&self, path: &str) -> PageResult<Option<Value>>;

    /// Elements matching `selector`, in document order. With a scope, only
    /// descendants of that element are considered.
    async fn query_all(
        &self,
        selector: &str,
        scope: Option<&ElementHandle>,
    ) -> PageResult<Vec<ElementHandle>>;

    /// Lower-case tag name.
    async fn tag_name(&self, element: &ElementHandle) -> PageResult<String>;

    async fn attribute(&self, element: &ElementHandle, name: &str) -> PageResult<Option<String>>;

    async fn text_content(&self, element: &ElementHandle) -> PageResult<String>;

    async fn parent(&self, element: &ElementHandle) -> PageResult<Option<ElementHandle>>;

    async fn children(&self, element: &ElementHandle) -> PageResult<Vec<ElementHandle>>;

    /// Effective tab index (`0` for natively focusable elements, `-1` otherwise
    /// unless set explicitly).
    async fn tab_index(&self, element: &ElementHandle) -> PageResult<i32>;

    /// Whether the element takes part in layout (has an offset parent or is
    /// fixed-positioned).
    async fn is_rendered(&self, element: &ElementHandle) -> PageResult<bool>;

    /// Computed style properties keyed by CSS property name.
    async fn computed_style(&self, element: &ElementHandle) -> PageResult<HashMap<String, String>>;

    /// Text tracks exposed by a media element's track API, all kinds.
    async fn text_tracks(&self, media: &ElementHandle) -> PageResult<Vec<PlayerApiTrackInfo>>;

    async fn focus(&self, element: &ElementHandle) -> PageResult<()>;

    async fn blur(&self, element: &ElementHandle) -> PageResult<()>;

    async fn query_one(
        &self,
        selector: &str,
        scope: Option<&ElementHandle>,
    ) -> PageResult<Option<ElementHandle>> {
        Ok(self.query_all(selector, scope).await?.into_iter().next())
    }

    async fn element_by_id(&self, id: &str) -> PageResult<Option<ElementHandle>> {
        let escaped = id.replace('\\', "\\\\").replace('"', "\\\"");
        self.query_one(&format!("[id=\"{escaped}\"]"), None).await
    }
}

/// Source of manifest responses captured during one page load.
#[async_trait]
pub trait ManifestFeed: Send + Sync {
    /// Begin capturing. Must be called before navigation to see the initial load.
    async fn start(&self) -> PageResult<()>;

    /// Snapshot of everything captured so far.
    async fn captured(&self) -> PageResult<Vec<InterceptedManifest>>;
}
