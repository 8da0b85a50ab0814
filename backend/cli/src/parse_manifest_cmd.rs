//! `streamaudit parse-manifest`: print the tracks one manifest declares.

use std::path::Path;

use anyhow::{Context, Result};
use streamaudit_core::InterceptedManifest;
use streamaudit_streaming::parse_manifest;

pub async fn run(file: &Path) -> Result<()> {
    let body = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read manifest: {}", file.display()))?;
    let captured = InterceptedManifest {
        url: file.display().to_string(),
        body,
        declared_type: None,
    };
    let format = captured.format().with_context(|| {
        format!("{} is neither an HLS playlist nor a DASH MPD", file.display())
    })?;
    let info = parse_manifest(format, &captured.body, &captured.url);
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
