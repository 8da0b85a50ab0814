//! Page Control
//!
//! [`PageState`] over a live DevTools target: navigation, waiting, and the
//! read-only DOM and global queries the analysis engine issues.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use streamaudit_core::{AuditError, ElementHandle, PageResult, PageState, PlayerApiTrackInfo};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cdp_client::CdpClient;
use crate::element_query::{remote_value, ElementQuery, OBJECT_GROUP};

static GLOBAL_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][\w$]*(\.[A-Za-z_$][\w$]*)*$").unwrap());

const POLL_INTERVAL: Duration = Duration::from_millis(250);

const TEXT_CONTENT_FN: &str = "function() { return this.textContent || ''; }";
const TAB_INDEX_FN: &str = "function() { return this.tabIndex; }";
const RENDERED_FN: &str =
    "function() { return this.offsetParent !== null || getComputedStyle(this).position === 'fixed'; }";
const PARENT_FN: &str = "function() { return this.parentElement; }";
const BLUR_FN: &str = "function() { if (typeof this.blur === 'function') this.blur(); }";
const COMPUTED_STYLE_FN: &str = r#"function() {
    const s = getComputedStyle(this);
    const out = {};
    for (let i = 0; i < s.length; i++) { out[s[i]] = s.getPropertyValue(s[i]); }
    for (const k of ['outline', 'border']) { out[k] = s.getPropertyValue(k); }
    return out;
}"#;
const TEXT_TRACKS_FN: &str = r#"function() {
    const tracks = this.textTracks;
    if (!tracks) return [];
    const out = [];
    for (let i = 0; i < tracks.length; i++) {
        const t = tracks[i];
        out.push({ label: t.label || null, language: t.language || null, kind: t.kind || null });
    }
    return out;
}"#;

pub struct PageControl {
    client: Arc<CdpClient>,
    root: Mutex<Option<i64>>,
    navigation_timeout: Duration,
}

impl PageControl {
    pub fn new(client: Arc<CdpClient>) -> Self {
        Self {
            client,
            root: Mutex::new(None),
            navigation_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn client(&self) -> &Arc<CdpClient> {
        &self.client
    }

    /// Navigates the attached tab and waits for its load event.
    pub async fn navigate(&self, url: &str) -> PageResult<()> {
        info!("[Page] Navigating to {}", url);
        let mut events = self.client.subscribe();
        self.client.send_command("Page.enable", json!({})).await?;

        let reply = self
            .client
            .send_command("Page.navigate", json!({ "url": url }))
            .await?;
        if let Some(error) = reply.get("errorText").and_then(Value::as_str) {
            return Err(AuditError::Evaluation(format!("navigation to {url} failed: {error}")));
        }

        let wait_for_load = async {
            loop {
                match events.recv().await {
                    Ok(event) if event.method == "Page.loadEventFired" => return Ok(()),
                    Ok(_) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "[Page] Event receiver lagged");
                        continue;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        return Err(AuditError::Disconnected("event stream closed".into()))
                    }
                }
            }
        };
        tokio::time::timeout(self.navigation_timeout, wait_for_load)
            .await
            .map_err(|_| AuditError::Timeout(format!("load of {url}")))??;

        *self.root.lock().await = None;
        info!("[Page] Loaded {}", url);
        Ok(())
    }

    /// Polls until `selector` matches or `timeout` elapses. Returns whether it matched.
    pub async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> PageResult<bool> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.query_one(selector, None).await?.is_some() {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                debug!(selector, "[Page] Selector never appeared");
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Drop the page-side objects held for element handles. Call once the
    /// analysis is done with the page.
    pub async fn release_objects(&self) -> PageResult<()> {
        self.dom().release_objects().await?;
        debug!(group = OBJECT_GROUP, "[Page] Released remote objects");
        Ok(())
    }

    fn dom(&self) -> ElementQuery<'_> {
        ElementQuery::new(&self.client)
    }

    async fn root(&self) -> PageResult<i64> {
        let mut cached = self.root.lock().await;
        if let Some(id) = *cached {
            return Ok(id);
        }
        let id = self.dom().document_node().await?;
        *cached = Some(id);
        Ok(id)
    }

    async fn call(&self, element: &ElementHandle, function: &str) -> PageResult<Value> {
        self.dom().call_on(node_id(element), function).await
    }
}

fn node_id(element: &ElementHandle) -> i64 {
    element.id() as i64
}

fn handles(ids: Vec<i64>) -> Vec<ElementHandle> {
    ids.into_iter().map(|id| ElementHandle::new(id as u64)).collect()
}

/// Expression that walks a dotted path from `globalThis`, reporting objects
/// and functions by their `typeof` name.
fn global_expression(path: &str) -> PageResult<String> {
    if !GLOBAL_PATH.is_match(path) {
        return Err(AuditError::Evaluation(format!("not a property path: {path}")));
    }
    let segments = serde_json::to_string(&path.split('.').collect::<Vec<_>>())
        .map_err(|e| AuditError::Evaluation(e.to_string()))?;
    Ok(format!(
        "(() => {{ let v = globalThis; for (const k of {segments}) {{ if (v === null || v === undefined) return null; v = v[k]; }} \
         if (v === null || v === undefined) return null; const t = typeof v; \
         return (t === 'object' || t === 'function') ? t : v; }})()"
    ))
}

#[async_trait]
impl PageState for PageControl {
    async fn global_value(&self, path: &str) -> PageResult<Option<Value>> {
        let expression = global_expression(path)?;
        let reply = self
            .client
            .send_command(
                "Runtime.evaluate",
                json!({ "expression": expression, "returnByValue": true }),
            )
            .await?;
        Ok(match remote_value(&reply)? {
            Value::Null => None,
            value => Some(value),
        })
    }

    async fn query_all(
        &self,
        selector: &str,
        scope: Option<&ElementHandle>,
    ) -> PageResult<Vec<ElementHandle>> {
        let base = match scope {
            Some(element) => node_id(element),
            None => self.root().await?,
        };
        Ok(handles(self.dom().query_selector_all(base, selector).await?))
    }

    async fn tag_name(&self, element: &ElementHandle) -> PageResult<String> {
        self.dom().local_name(node_id(element)).await
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> PageResult<Option<String>> {
        Ok(self
            .dom()
            .attributes(node_id(element))
            .await?
            .into_iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
            .map(|(_, value)| value))
    }

    async fn text_content(&self, element: &ElementHandle) -> PageResult<String> {
        Ok(self
            .call(element, TEXT_CONTENT_FN)
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn parent(&self, element: &ElementHandle) -> PageResult<Option<ElementHandle>> {
        Ok(self
            .dom()
            .call_for_node(node_id(element), PARENT_FN)
            .await?
            .map(|id| ElementHandle::new(id as u64)))
    }

    async fn children(&self, element: &ElementHandle) -> PageResult<Vec<ElementHandle>> {
        Ok(handles(
            self.dom()
                .query_selector_all(node_id(element), ":scope > *")
                .await?,
        ))
    }

    async fn tab_index(&self, element: &ElementHandle) -> PageResult<i32> {
        Ok(self
            .call(element, TAB_INDEX_FN)
            .await?
            .as_i64()
            .map(|v| v as i32)
            .unwrap_or(-1))
    }

    async fn is_rendered(&self, element: &ElementHandle) -> PageResult<bool> {
        Ok(self.call(element, RENDERED_FN).await?.as_bool().unwrap_or(false))
    }

    async fn computed_style(&self, element: &ElementHandle) -> PageResult<HashMap<String, String>> {
        let value = self.call(element, COMPUTED_STYLE_FN).await?;
        Ok(value
            .as_object()
            .map(|props| {
                props
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn text_tracks(&self, media: &ElementHandle) -> PageResult<Vec<PlayerApiTrackInfo>> {
        let value = self.call(media, TEXT_TRACKS_FN).await?;
        serde_json::from_value(value).map_err(|e| AuditError::Evaluation(e.to_string()))
    }

    async fn focus(&self, element: &ElementHandle) -> PageResult<()> {
        self.client
            .send_command("DOM.focus", json!({ "nodeId": node_id(element) }))
            .await?;
        Ok(())
    }

    async fn blur(&self, element: &ElementHandle) -> PageResult<()> {
        self.call(element, BLUR_FN).await?;
        Ok(())
    }
}
