//! Element Queries
//!
//! DOM-domain helpers over a [`CdpClient`]: selector queries, attribute reads
//! and function calls on a node, all addressed by protocol node id.
//!
//! Remote objects created along the way live in [`OBJECT_GROUP`] until
//! [`ElementQuery::release_objects`] drops them.

use serde_json::{json, Value};
use streamaudit_core::{AuditError, PageResult};

use crate::cdp_client::CdpClient;

/// Runtime object group holding every node resolved for an analysis.
pub const OBJECT_GROUP: &str = "streamaudit";

pub struct ElementQuery<'a> {
    client: &'a CdpClient,
}

impl<'a> ElementQuery<'a> {
    pub fn new(client: &'a CdpClient) -> Self {
        Self { client }
    }

    /// Root document node id. Re-requesting the document invalidates earlier ids.
    pub async fn document_node(&self) -> PageResult<i64> {
        let reply = self
            .client
            .send_command("DOM.getDocument", json!({ "depth": 0 }))
            .await?;
        reply
            .pointer("/root/nodeId")
            .and_then(Value::as_i64)
            .ok_or_else(|| AuditError::Evaluation("DOM.getDocument returned no root".into()))
    }

    pub async fn query_selector_all(&self, node_id: i64, selector: &str) -> PageResult<Vec<i64>> {
        let reply = self
            .client
            .send_command(
                "DOM.querySelectorAll",
                json!({ "nodeId": node_id, "selector": selector }),
            )
            .await
            .map_err(|e| match e {
                AuditError::Protocol { message, .. } if message.contains("selector") => {
                    AuditError::InvalidSelector(format!("{selector}: {message}"))
                }
                other => other,
            })?;
        Ok(reply
            .get("nodeIds")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_i64).filter(|id| *id > 0).collect())
            .unwrap_or_default())
    }

    /// Attribute name/value pairs in source order.
    pub async fn attributes(&self, node_id: i64) -> PageResult<Vec<(String, String)>> {
        let reply = self
            .client
            .send_command("DOM.getAttributes", json!({ "nodeId": node_id }))
            .await?;
        let flat: Vec<String> = reply
            .get("attributes")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();
        Ok(flat
            .chunks(2)
            .filter_map(|pair| match pair {
                [name, value] => Some((name.clone(), value.clone())),
                _ => None,
            })
            .collect())
    }

    pub async fn local_name(&self, node_id: i64) -> PageResult<String> {
        let reply = self
            .client
            .send_command("DOM.describeNode", json!({ "nodeId": node_id }))
            .await?;
        let node = reply.get("node").cloned().unwrap_or(Value::Null);
        let name = node
            .get("localName")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .or_else(|| node.get("nodeName").and_then(Value::as_str))
            .unwrap_or_default();
        Ok(name.to_ascii_lowercase())
    }

    async fn resolve(&self, node_id: i64) -> PageResult<String> {
        let reply = self
            .client
            .send_command("DOM.resolveNode", resolve_params(node_id))
            .await?;
        reply
            .pointer("/object/objectId")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| AuditError::Evaluation(format!("node {node_id} has no remote object")))
    }

    /// Call `function_declaration` with `this` bound to the node and return its
    /// result by value.
    pub async fn call_on(&self, node_id: i64, function_declaration: &str) -> PageResult<Value> {
        let object_id = self.resolve(node_id).await?;
        let reply = self
            .client
            .send_command(
                "Runtime.callFunctionOn",
                call_params(&object_id, function_declaration, true),
            )
            .await?;
        remote_value(&reply)
    }

    /// Like [`call_on`](Self::call_on) but the function returns an element,
    /// which is mapped back to a node id.
    pub async fn call_for_node(
        &self,
        node_id: i64,
        function_declaration: &str,
    ) -> PageResult<Option<i64>> {
        let object_id = self.resolve(node_id).await?;
        let reply = self
            .client
            .send_command(
                "Runtime.callFunctionOn",
                call_params(&object_id, function_declaration, false),
            )
            .await?;
        check_exception(&reply)?;
        let Some(result_id) = reply.pointer("/result/objectId").and_then(Value::as_str) else {
            return Ok(None);
        };
        let node = self
            .client
            .send_command("DOM.requestNode", json!({ "objectId": result_id }))
            .await?;
        Ok(node.get("nodeId").and_then(Value::as_i64).filter(|id| *id > 0))
    }

    /// Release every remote object resolved so far. Node ids stay valid.
    pub async fn release_objects(&self) -> PageResult<()> {
        self.client
            .send_command("Runtime.releaseObjectGroup", release_params())
            .await?;
        Ok(())
    }
}

fn resolve_params(node_id: i64) -> Value {
    json!({ "nodeId": node_id, "objectGroup": OBJECT_GROUP })
}

fn call_params(object_id: &str, function_declaration: &str, return_by_value: bool) -> Value {
    json!({
        "objectId": object_id,
        "functionDeclaration": function_declaration,
        "returnByValue": return_by_value,
        "objectGroup": OBJECT_GROUP,
    })
}

fn release_params() -> Value {
    json!({ "objectGroup": OBJECT_GROUP })
}

fn check_exception(reply: &Value) -> PageResult<()> {
    match reply.get("exceptionDetails") {
        Some(details) => Err(AuditError::Evaluation(
            details
                .pointer("/exception/description")
                .or_else(|| details.get("text"))
                .and_then(Value::as_str)
                .unwrap_or("script threw")
                .to_string(),
        )),
        None => Ok(()),
    }
}

/// Unwrap a `Runtime.RemoteObject` returned by value.
pub(crate) fn remote_value(reply: &Value) -> PageResult<Value> {
    check_exception(reply)?;
    Ok(reply
        .pointer("/result/value")
        .cloned()
        .unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_value_unwraps_by_value_results() {
        let reply = json!({ "result": { "type": "string", "value": "1.5.7" } });
        assert_eq!(remote_value(&reply).unwrap(), json!("1.5.7"));
    }

    #[test]
    fn remote_value_maps_undefined_to_null() {
        let reply = json!({ "result": { "type": "undefined" } });
        assert_eq!(remote_value(&reply).unwrap(), Value::Null);
    }

    #[test]
    fn resolved_nodes_and_call_results_share_one_group() {
        let resolve = resolve_params(42);
        assert_eq!(resolve["nodeId"], 42);
        assert_eq!(resolve["objectGroup"], OBJECT_GROUP);

        let call = call_params("obj-1", "function() { return this; }", false);
        assert_eq!(call["objectId"], "obj-1");
        assert_eq!(call["returnByValue"], false);
        assert_eq!(call["objectGroup"], OBJECT_GROUP);

        assert_eq!(release_params(), json!({ "objectGroup": "streamaudit" }));
    }

    #[test]
    fn exceptions_become_evaluation_errors() {
        let reply = json!({
            "result": { "type": "object", "subtype": "error" },
            "exceptionDetails": {
                "text": "Uncaught",
                "exception": { "description": "TypeError: Cannot read properties of undefined" }
            }
        });
        let err = remote_value(&reply).unwrap_err();
        assert!(matches!(err, AuditError::Evaluation(ref m) if m.starts_with("TypeError")));
        assert!(!err.is_fatal());
    }
}
