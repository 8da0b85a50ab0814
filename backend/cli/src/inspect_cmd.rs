//! `streamaudit inspect`: offline audit of an HTML snapshot and manifest files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use streamaudit_browser::{HtmlPage, StaticManifestFeed};
use streamaudit_core::StreamingAnalysisResult;
use streamaudit_streaming::analyze_loaded_page;

async fn load_globals(path: &Path) -> Result<Map<String, Value>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read globals file: {}", path.display()))?;
    match serde_json::from_str(&raw)
        .with_context(|| format!("Globals file is not JSON: {}", path.display()))?
    {
        Value::Object(map) => Ok(map),
        _ => anyhow::bail!("Globals file must hold a JSON object: {}", path.display()),
    }
}

pub async fn run(
    html: &Path,
    manifests: &[PathBuf],
    globals: Option<&Path>,
) -> Result<StreamingAnalysisResult> {
    let mut page = HtmlPage::from_file(html).await?;
    if let Some(path) = globals {
        page = page.with_globals(load_globals(path).await?);
    }
    let feed = StaticManifestFeed::from_files(manifests).await?;

    // A snapshot is already settled.
    Ok(analyze_loaded_page(&page, &feed, Duration::ZERO).await?)
}
