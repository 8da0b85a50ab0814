//! `streamaudit-config`: StreamAudit runtime configuration.
//!
//! Provides:
//! - Typed config schema (browser, analysis, logging)
//! - YAML loading with a missing file treated as empty
//! - `${ENV_VAR}` substitution
//! - Default value application
//! - Validation with warnings and errors

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{collect_referenced_vars, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config, load_raw};
pub use schema::{AnalysisConfig, BrowserConfig, LoggingConfig, StreamAuditConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Load, substitute env vars, validate, then apply defaults.
///
/// Validation errors abort; warnings are logged.
pub async fn load_and_prepare(path: &Path) -> Result<StreamAuditConfig> {
    let raw = load_raw(path).await?;
    let value = resolve_env_vars(&raw).context("Failed to resolve env vars in config")?;
    prepare_value(value)
}

/// Same pipeline over an in-memory tree with an explicit environment.
pub fn prepare_with_env(raw: &Value, env: &HashMap<String, String>) -> Result<StreamAuditConfig> {
    let value = resolve_env_vars_with(raw, env).context("Failed to resolve env vars in config")?;
    prepare_value(value)
}

fn prepare_value(value: Value) -> Result<StreamAuditConfig> {
    let config: StreamAuditConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    if let Some(first) = report.errors.first() {
        for error in &report.errors {
            tracing::error!(path = %error.path, message = %error.message, "Config error");
        }
        bail!("{first} ({} error(s) total)", report.errors.len());
    }

    Ok(apply_all_defaults(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_pipeline_with_env() {
        let raw = json!({
            "browser": {"cdpEndpoint": "ws://${CDP_HOST}:9222/devtools/page/1", "navigationTimeoutMs": 500000},
            "logging": {"level": "debug"}
        });
        let env = HashMap::from([("CDP_HOST".to_string(), "localhost".to_string())]);
        let cfg = prepare_with_env(&raw, &env).unwrap();
        let browser = cfg.browser.unwrap();
        assert_eq!(browser.cdp_endpoint.as_deref(), Some("ws://localhost:9222/devtools/page/1"));
        assert_eq!(browser.navigation_timeout_ms, Some(defaults::MAX_NAVIGATION_TIMEOUT_MS));
        assert_eq!(cfg.analysis.unwrap().settle_ms, Some(defaults::DEFAULT_SETTLE_MS));
    }

    #[test]
    fn validation_errors_abort() {
        let raw = json!({"logging": {"level": "loud"}});
        let err = prepare_with_env(&raw, &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn unknown_structure_is_rejected() {
        let raw = json!({"browser": {"navigationTimeoutMs": "soon"}});
        assert!(prepare_with_env(&raw, &HashMap::new()).is_err());
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("streamaudit-absent-config.yaml");
        let cfg = load_and_prepare(&path).await.unwrap();
        assert_eq!(cfg.logging.unwrap().level.as_deref(), Some("info"));
    }
}
