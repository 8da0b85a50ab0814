//! Chrome DevTools Protocol Client
//!
//! Attaches to a running Chromium target over its DevTools WebSocket and
//! multiplexes JSON-RPC commands and events over that single connection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use streamaudit_core::{AuditError, PageResult};
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<PageResult<Value>>>>>;

const EVENT_BUFFER: usize = 1024;

/// Default per-command timeout.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// An unsolicited protocol notification, e.g. `Network.responseReceived`.
#[derive(Debug, Clone)]
pub struct CdpEvent {
    pub method: String,
    pub params: Value,
}

/// One decoded inbound frame.
#[derive(Debug)]
enum Inbound {
    Reply { id: u64, result: PageResult<Value> },
    Event(CdpEvent),
}

pub struct CdpClient {
    ws_endpoint: String,
    next_id: AtomicU64,
    outgoing: mpsc::UnboundedSender<String>,
    pending: Pending,
    events: broadcast::Sender<CdpEvent>,
    command_timeout: Duration,
}

impl CdpClient {
    /// Attaches onto the DevTools endpoint and starts the reader/writer tasks.
    pub async fn connect(ws_endpoint: &str) -> PageResult<Self> {
        info!("[CDP] Connecting to DevTools websocket at {}", ws_endpoint);
        let (stream, _response) = connect_async(ws_endpoint)
            .await
            .map_err(|e| AuditError::Disconnected(format!("{ws_endpoint}: {e}")))?;
        let (mut sink, mut source) = stream.split();

        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<String>();
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        tokio::spawn(async move {
            while let Some(frame) = outgoing_rx.recv().await {
                if let Err(e) = sink.send(Message::Text(frame)).await {
                    warn!("[CDP] Write failed, closing writer: {}", e);
                    break;
                }
            }
        });

        let reader_pending = Arc::clone(&pending);
        let reader_events = events.clone();
        tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("[CDP] Read failed: {}", e);
                        break;
                    }
                };
                match decode_frame(&text) {
                    Some(Inbound::Reply { id, result }) => {
                        if let Some(tx) = reader_pending.lock().await.remove(&id) {
                            let _ = tx.send(result);
                        }
                    }
                    Some(Inbound::Event(event)) => {
                        // No subscribers is fine; events are only consumed while capturing.
                        let _ = reader_events.send(event);
                    }
                    None => debug!("[CDP] Ignoring undecodable frame"),
                }
            }
            let mut waiting = reader_pending.lock().await;
            for (_, tx) in waiting.drain() {
                let _ = tx.send(Err(AuditError::Disconnected("DevTools socket closed".into())));
            }
            info!("[CDP] Connection closed");
        });

        Ok(Self {
            ws_endpoint: ws_endpoint.to_string(),
            next_id: AtomicU64::new(1),
            outgoing,
            pending,
            events,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        })
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.ws_endpoint
    }

    /// Receive every event emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<CdpEvent> {
        self.events.subscribe()
    }

    /// Dispatches one command and waits for its reply.
    pub async fn send_command(&self, method: &str, params: Value) -> PageResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let frame = json!({ "id": id, "method": method, "params": params }).to_string();
        debug!(id, method, "[CDP] Sending command");
        if self.outgoing.send(frame).is_err() {
            self.pending.lock().await.remove(&id);
            return Err(AuditError::Disconnected("DevTools writer stopped".into()));
        }

        match tokio::time::timeout(self.command_timeout, rx).await {
            Ok(Ok(result)) => result.map_err(|e| match e {
                AuditError::Protocol { message, .. } => AuditError::Protocol {
                    method: method.to_string(),
                    message,
                },
                other => other,
            }),
            Ok(Err(_)) => Err(AuditError::Disconnected("reply channel dropped".into())),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(AuditError::Timeout(method.to_string()))
            }
        }
    }
}

fn decode_frame(text: &str) -> Option<Inbound> {
    let value: Value = serde_json::from_str(text).ok()?;

    if let Some(id) = value.get("id").and_then(Value::as_u64) {
        let result = match value.get("error") {
            Some(error) => Err(AuditError::Protocol {
                method: String::new(),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown protocol error")
                    .to_string(),
            }),
            None => Ok(value.get("result").cloned().unwrap_or(Value::Null)),
        };
        return Some(Inbound::Reply { id, result });
    }

    let method = value.get("method")?.as_str()?.to_string();
    let params = value.get("params").cloned().unwrap_or(Value::Null);
    Some(Inbound::Event(CdpEvent { method, params }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_successful_reply() {
        let frame = r#"{"id":7,"result":{"nodeIds":[4,9]}}"#;
        match decode_frame(frame) {
            Some(Inbound::Reply { id, result }) => {
                assert_eq!(id, 7);
                assert_eq!(result.unwrap()["nodeIds"], json!([4, 9]));
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn decodes_error_reply_as_protocol_error() {
        let frame = r#"{"id":3,"error":{"code":-32000,"message":"Could not find node with given id"}}"#;
        match decode_frame(frame) {
            Some(Inbound::Reply { id: 3, result: Err(AuditError::Protocol { message, .. }) }) => {
                assert_eq!(message, "Could not find node with given id");
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn decodes_event() {
        let frame = r#"{"method":"Network.loadingFinished","params":{"requestId":"1000.2"}}"#;
        match decode_frame(frame) {
            Some(Inbound::Event(event)) => {
                assert_eq!(event.method, "Network.loadingFinished");
                assert_eq!(event.params["requestId"], "1000.2");
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode_frame("not json").is_none());
        assert!(decode_frame(r#"{"params":{}}"#).is_none());
    }
}
