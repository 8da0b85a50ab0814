//! StreamAudit runtime configuration schema.
//!
//! Every section and field is optional in the file; defaults fill the gaps
//! after loading.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamAuditConfig {
    /// Browser connection (DevTools endpoint and timeouts)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<BrowserConfig>,

    /// Analysis pacing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisConfig>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

// ---------------------------------------------------------------------------
// Browser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserConfig {
    /// WebSocket debugger URL of the target page (`ws://` or `wss://`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdp_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_timeout_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    /// Wait after navigation so players can initialise and fetch manifests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settle_ms: Option<u64>,
    /// Selector to wait for before analysing, e.g. `video`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_selector: Option<String>,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>, // "trace" | "debug" | "info" | "warn" | "error"
    /// Directory for the rolling JSON log; console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_yaml() {
        let yaml = r#"
browser:
  cdpEndpoint: "ws://127.0.0.1:9222/devtools/page/ABC"
  navigationTimeoutMs: 45000
analysis:
  settleMs: 1500
  waitForSelector: "video"
logging:
  level: debug
"#;
        let cfg: StreamAuditConfig = serde_yaml::from_str(yaml).unwrap();
        let browser = cfg.browser.unwrap();
        assert_eq!(browser.cdp_endpoint.as_deref(), Some("ws://127.0.0.1:9222/devtools/page/ABC"));
        assert_eq!(browser.navigation_timeout_ms, Some(45000));
        assert_eq!(browser.command_timeout_ms, None);
        assert_eq!(cfg.analysis.unwrap().wait_for_selector.as_deref(), Some("video"));
        assert_eq!(cfg.logging.unwrap().level.as_deref(), Some("debug"));
    }

    #[test]
    fn empty_document_is_default() {
        let cfg: StreamAuditConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg, StreamAuditConfig::default());
    }
}
