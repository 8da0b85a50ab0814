//! Config validation with field paths in every message.

use crate::defaults::MAX_NAVIGATION_TIMEOUT_MS;
use crate::schema::StreamAuditConfig;
use thiserror::Error;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Run before defaults so out-of-range user values are still visible.
pub fn validate(config: &StreamAuditConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_browser(config, &mut report);
    validate_analysis(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_browser(config: &StreamAuditConfig, report: &mut ValidationReport) {
    let Some(browser) = &config.browser else { return };
    if let Some(endpoint) = &browser.cdp_endpoint {
        if !(endpoint.starts_with("ws://") || endpoint.starts_with("wss://")) {
            report.error(
                "browser.cdpEndpoint",
                format!("'{endpoint}' is not a WebSocket URL; use ws:// or wss://"),
            );
        }
    }
    match browser.navigation_timeout_ms {
        Some(0) => report.error("browser.navigationTimeoutMs", "navigationTimeoutMs must be > 0"),
        Some(ms) if ms > MAX_NAVIGATION_TIMEOUT_MS => report.warn(
            "browser.navigationTimeoutMs",
            format!("{ms} exceeds {MAX_NAVIGATION_TIMEOUT_MS}; it will be clamped"),
        ),
        _ => {}
    }
    if browser.command_timeout_ms == Some(0) {
        report.error("browser.commandTimeoutMs", "commandTimeoutMs must be > 0");
    }
}

fn validate_analysis(config: &StreamAuditConfig, report: &mut ValidationReport) {
    let Some(analysis) = &config.analysis else { return };
    if let Some(selector) = &analysis.wait_for_selector {
        if selector.trim().is_empty() {
            report.error("analysis.waitForSelector", "waitForSelector cannot be empty");
        }
    }
}

fn validate_logging(config: &StreamAuditConfig, report: &mut ValidationReport) {
    let Some(logging) = &config.logging else { return };
    if let Some(level) = &logging.level {
        if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            report.error(
                "logging.level",
                format!("Unknown log level '{level}'. Use one of: {}", LOG_LEVELS.join(", ")),
            );
        }
    }
}
