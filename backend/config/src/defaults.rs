//! Config defaults applied after loading.

use crate::schema::{AnalysisConfig, BrowserConfig, LoggingConfig, StreamAuditConfig};

pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// Navigation timeouts above this are clamped.
pub const MAX_NAVIGATION_TIMEOUT_MS: u64 = 120_000;

pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 10_000;

pub const DEFAULT_SETTLE_MS: u64 = 3_000;

pub const DEFAULT_LOG_LEVEL: &str = "info";

pub fn apply_all_defaults(config: StreamAuditConfig) -> StreamAuditConfig {
    let config = apply_browser_defaults(config);
    let config = apply_analysis_defaults(config);
    apply_logging_defaults(config)
}

fn apply_browser_defaults(mut config: StreamAuditConfig) -> StreamAuditConfig {
    let browser = config.browser.get_or_insert_with(BrowserConfig::default);
    let navigation = browser
        .navigation_timeout_ms
        .unwrap_or(DEFAULT_NAVIGATION_TIMEOUT_MS);
    browser.navigation_timeout_ms = Some(navigation.min(MAX_NAVIGATION_TIMEOUT_MS));
    if browser.command_timeout_ms.is_none() {
        browser.command_timeout_ms = Some(DEFAULT_COMMAND_TIMEOUT_MS);
    }
    config
}

fn apply_analysis_defaults(mut config: StreamAuditConfig) -> StreamAuditConfig {
    let analysis = config.analysis.get_or_insert_with(AnalysisConfig::default);
    if analysis.settle_ms.is_none() {
        analysis.settle_ms = Some(DEFAULT_SETTLE_MS);
    }
    config
}

fn apply_logging_defaults(mut config: StreamAuditConfig) -> StreamAuditConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_every_section() {
        let cfg = apply_all_defaults(StreamAuditConfig::default());
        let browser = cfg.browser.unwrap();
        assert_eq!(browser.navigation_timeout_ms, Some(DEFAULT_NAVIGATION_TIMEOUT_MS));
        assert_eq!(browser.command_timeout_ms, Some(DEFAULT_COMMAND_TIMEOUT_MS));
        assert_eq!(browser.cdp_endpoint, None);
        assert_eq!(cfg.analysis.unwrap().settle_ms, Some(DEFAULT_SETTLE_MS));
        assert_eq!(cfg.logging.unwrap().level.as_deref(), Some("info"));
    }

    #[test]
    fn clamps_navigation_timeout() {
        let cfg = StreamAuditConfig {
            browser: Some(BrowserConfig {
                navigation_timeout_ms: Some(600_000),
                ..Default::default()
            }),
            ..Default::default()
        };
        let cfg = apply_all_defaults(cfg);
        assert_eq!(
            cfg.browser.unwrap().navigation_timeout_ms,
            Some(MAX_NAVIGATION_TIMEOUT_MS)
        );
    }

    #[test]
    fn keeps_user_values() {
        let cfg = StreamAuditConfig {
            analysis: Some(AnalysisConfig {
                settle_ms: Some(0),
                wait_for_selector: Some("video".into()),
            }),
            ..Default::default()
        };
        let analysis = apply_all_defaults(cfg).analysis.unwrap();
        assert_eq!(analysis.settle_ms, Some(0));
        assert_eq!(analysis.wait_for_selector.as_deref(), Some("video"));
    }
}
