//! Network Capture
//!
//! Watches DevTools network traffic for HLS and DASH manifest responses and
//! keeps their bodies for the manifest parser.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};
use streamaudit_core::{InterceptedManifest, ManifestFeed, ManifestFormat, PageResult};
use tokio::sync::{broadcast::error::RecvError, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cdp_client::{CdpClient, CdpEvent};

/// Response metadata seen before its body finished loading.
struct PendingResponse {
    url: String,
    mime_type: Option<String>,
}

pub struct NetworkCapture {
    client: Arc<CdpClient>,
    captured: Arc<Mutex<Vec<InterceptedManifest>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl NetworkCapture {
    pub fn new(client: Arc<CdpClient>) -> Self {
        Self {
            client,
            captured: Arc::new(Mutex::new(Vec::new())),
            task: Mutex::new(None),
        }
    }
}

impl Drop for NetworkCapture {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

/// Remember the response if it looks like a manifest.
fn track_response(event: &CdpEvent, pending: &mut HashMap<String, PendingResponse>) {
    let Some(request_id) = event.params.get("requestId").and_then(Value::as_str) else {
        return;
    };
    let Some(response) = event.params.get("response") else {
        return;
    };
    let url = response.get("url").and_then(Value::as_str).unwrap_or_default();
    let mime_type = response
        .get("mimeType")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty());
    if ManifestFormat::classify(url, mime_type).is_some() {
        pending.insert(
            request_id.to_string(),
            PendingResponse {
                url: url.to_string(),
                mime_type: mime_type.map(String::from),
            },
        );
    }
}

fn decode_body(reply: &Value) -> Option<String> {
    let body = reply.get("body")?.as_str()?;
    if reply.get("base64Encoded").and_then(Value::as_bool).unwrap_or(false) {
        let bytes = STANDARD.decode(body).ok()?;
        String::from_utf8(bytes).ok()
    } else {
        Some(body.to_string())
    }
}

#[async_trait]
impl ManifestFeed for NetworkCapture {
    async fn start(&self) -> PageResult<()> {
        let mut slot = self.task.lock().await;
        if slot.is_some() {
            return Ok(());
        }
        let mut events = self.client.subscribe();
        self.client.send_command("Network.enable", json!({})).await?;
        info!("[Capture] Listening for manifest responses");

        let client = Arc::clone(&self.client);
        let captured = Arc::clone(&self.captured);
        *slot = Some(tokio::spawn(async move {
            let mut pending: HashMap<String, PendingResponse> = HashMap::new();
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "[Capture] Dropped network events");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                match event.method.as_str() {
                    "Network.responseReceived" => track_response(&event, &mut pending),
                    "Network.loadingFinished" | "Network.loadingFailed" => {
                        let Some(request_id) = event.params.get("requestId").and_then(Value::as_str)
                        else {
                            continue;
                        };
                        let Some(response) = pending.remove(request_id) else {
                            continue;
                        };
                        if event.method == "Network.loadingFailed" {
                            continue;
                        }
                        let reply = client
                            .send_command(
                                "Network.getResponseBody",
                                json!({ "requestId": request_id }),
                            )
                            .await;
                        match reply.ok().as_ref().and_then(decode_body) {
                            Some(body) => {
                                debug!(url = %response.url, "[Capture] Captured manifest");
                                captured.lock().await.push(InterceptedManifest {
                                    url: response.url,
                                    body,
                                    declared_type: response.mime_type,
                                });
                            }
                            None => debug!(url = %response.url, "[Capture] Manifest body unavailable"),
                        }
                    }
                    _ => {}
                }
            }
        }));
        Ok(())
    }

    async fn captured(&self) -> PageResult<Vec<InterceptedManifest>> {
        Ok(self.captured.lock().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_event(id: &str, url: &str, mime: &str) -> CdpEvent {
        CdpEvent {
            method: "Network.responseReceived".into(),
            params: json!({ "requestId": id, "response": { "url": url, "mimeType": mime } }),
        }
    }

    #[test]
    fn tracks_only_manifest_responses() {
        let mut pending = HashMap::new();
        track_response(&response_event("1", "https://cdn.test/master.m3u8?t=1", ""), &mut pending);
        track_response(&response_event("2", "https://cdn.test/seg1.ts", "video/mp2t"), &mut pending);
        track_response(
            &response_event("3", "https://cdn.test/play", "application/dash+xml"),
            &mut pending,
        );
        assert_eq!(pending.len(), 2);
        assert!(pending.contains_key("1"));
        assert_eq!(pending["3"].mime_type.as_deref(), Some("application/dash+xml"));
        assert_eq!(pending["1"].mime_type, None);
    }

    #[test]
    fn decodes_plain_and_base64_bodies() {
        let plain = json!({ "body": "#EXTM3U", "base64Encoded": false });
        assert_eq!(decode_body(&plain).as_deref(), Some("#EXTM3U"));

        let encoded = json!({ "body": STANDARD.encode("<MPD/>"), "base64Encoded": true });
        assert_eq!(decode_body(&encoded).as_deref(), Some("<MPD/>"));

        let broken = json!({ "body": "!!!", "base64Encoded": true });
        assert_eq!(decode_body(&broken), None);
    }
}
