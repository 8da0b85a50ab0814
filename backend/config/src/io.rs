//! Config file location and loading.

use crate::schema::StreamAuditConfig;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const CONFIG_FILE_NAME: &str = "config.yaml";

/// Priority: `STREAMAUDIT_CONFIG_DIR` env > `~/.streamaudit/`.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("STREAMAUDIT_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".streamaudit"),
        None => PathBuf::from(".streamaudit"),
    }
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Read the file as an untyped tree so env substitution runs before typing.
///
/// A missing file is an empty config (first run). An empty file is too.
pub async fn load_raw(path: &Path) -> Result<Value> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }

    let value: Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;
    info!(path = %path.display(), "Loaded config");
    Ok(value)
}

/// Load and type the config without env substitution.
pub async fn load_config(path: &Path) -> Result<StreamAuditConfig> {
    let value = load_raw(path).await?;
    serde_json::from_value(value)
        .with_context(|| format!("Invalid config structure at: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("streamaudit-config-{}-{name}", std::process::id()))
    }

    #[tokio::test]
    async fn missing_file_is_default() {
        let cfg = load_config(&scratch("does-not-exist.yaml")).await.unwrap();
        assert_eq!(cfg, StreamAuditConfig::default());
    }

    #[tokio::test]
    async fn reads_yaml_file() {
        let path = scratch("config.yaml");
        fs::write(&path, "analysis:\n  settleMs: 500\n").await.unwrap();
        let cfg = load_config(&path).await.unwrap();
        let _ = fs::remove_file(&path).await;
        assert_eq!(cfg.analysis.unwrap().settle_ms, Some(500));
    }

    #[tokio::test]
    async fn rejects_malformed_yaml() {
        let path = scratch("broken.yaml");
        fs::write(&path, "browser: [unclosed\n").await.unwrap();
        let err = load_config(&path).await.unwrap_err();
        let _ = fs::remove_file(&path).await;
        assert!(err.to_string().contains("Failed to parse config YAML"));
    }

    #[test]
    fn file_lives_in_config_dir() {
        let path = config_file_path(Path::new("/etc/streamaudit"));
        assert_eq!(path, PathBuf::from("/etc/streamaudit/config.yaml"));
    }
}
