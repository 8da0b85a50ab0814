//! `streamaudit analyze`: live audit over the DevTools protocol.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use streamaudit_browser::{CdpClient, NetworkCapture, PageControl};
use streamaudit_config::defaults::{
    DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_NAVIGATION_TIMEOUT_MS, DEFAULT_SETTLE_MS,
};
use streamaudit_config::StreamAuditConfig;
use streamaudit_core::StreamingAnalysisResult;
use streamaudit_streaming::prepare;
use tracing::{info, warn};

pub async fn run(
    config: &StreamAuditConfig,
    url: &str,
    cdp_override: Option<&str>,
) -> Result<StreamingAnalysisResult> {
    let browser = config.browser.clone().unwrap_or_default();
    let analysis_cfg = config.analysis.clone().unwrap_or_default();

    let endpoint = match cdp_override.map(str::to_string).or(browser.cdp_endpoint) {
        Some(endpoint) => endpoint,
        None => bail!("No DevTools endpoint: pass --cdp or set browser.cdpEndpoint"),
    };
    let command_timeout =
        Duration::from_millis(browser.command_timeout_ms.unwrap_or(DEFAULT_COMMAND_TIMEOUT_MS));
    let navigation_timeout = Duration::from_millis(
        browser
            .navigation_timeout_ms
            .unwrap_or(DEFAULT_NAVIGATION_TIMEOUT_MS),
    );
    let settle = Duration::from_millis(analysis_cfg.settle_ms.unwrap_or(DEFAULT_SETTLE_MS));

    let client = CdpClient::connect(&endpoint)
        .await
        .with_context(|| format!("Failed to connect to {endpoint}"))?
        .with_command_timeout(command_timeout);
    let client = Arc::new(client);
    let page = PageControl::new(Arc::clone(&client)).with_navigation_timeout(navigation_timeout);
    let capture = NetworkCapture::new(client);

    let analysis = prepare(&page, &capture);
    analysis.setup_interception().await?;
    page.navigate(url)
        .await
        .with_context(|| format!("Failed to load {url}"))?;

    if let Some(selector) = &analysis_cfg.wait_for_selector {
        if !page.wait_for_selector(selector, navigation_timeout).await? {
            warn!(selector = %selector, "Selector never appeared; analysing anyway");
        }
    }
    if !settle.is_zero() {
        info!(settle_ms = settle.as_millis() as u64, "Waiting for player to settle");
        tokio::time::sleep(settle).await;
    }

    let result = analysis.analyze().await?;
    if let Err(e) = page.release_objects().await {
        warn!(error = %e, "Failed to release page objects");
    }
    Ok(result)
}
