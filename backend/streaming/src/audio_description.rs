//! Audio Description Checker

use streamaudit_core::{AudioDescriptionCheckResult, AudioTrack, ManifestInfo, PageResult, PageState};
use tracing::{debug, info};

use crate::dom::{collect_dom_tracks, recover_or_propagate};

const COMPONENT: &str = "AudioDescriptionChecker";
const DESCRIPTION_TRACKS: &str = r#"track[kind="descriptions"]"#;

/// Elements whose text or label may name an audio description switch.
const SELECTOR_CANDIDATES: &str =
    r#"button, [role="menuitemradio"], [role="menuitem"], [role="option"], label, span"#;

/// Matched case-insensitively anywhere in the text. The bare "ad" makes this
/// generous: "Download" counts too.
const AD_PHRASES: [&str; 6] = [
    "audio description",
    "audio-description",
    "audiodescription",
    "described video",
    "descriptive audio",
    "ad",
];

pub fn mentions_audio_description(text: &str) -> bool {
    let lower = text.to_lowercase();
    AD_PHRASES.iter().any(|p| lower.contains(p))
}

pub fn manifest_ad_tracks(manifests: &[ManifestInfo]) -> Vec<AudioTrack> {
    manifests
        .iter()
        .flat_map(|m| m.audio_tracks.iter().filter(|t| t.is_audio_description).cloned())
        .collect()
}

/// Whether the UI exposes something that reads as an audio description control.
pub async fn has_ad_selector(page: &dyn PageState) -> PageResult<bool> {
    for element in page.query_all(SELECTOR_CANDIDATES, None).await? {
        let text = page.text_content(&element).await?;
        let aria_label = page.attribute(&element, "aria-label").await?.unwrap_or_default();
        if mentions_audio_description(&format!("{} {}", text.trim(), aria_label)) {
            debug!("[AudioDescriptionChecker] AD control found: {}", text.trim());
            return Ok(true);
        }
    }
    Ok(false)
}

pub async fn check_audio_description(
    page: &dyn PageState,
    manifests: &[ManifestInfo],
) -> PageResult<AudioDescriptionCheckResult> {
    let (dom_tracks, selector) = tokio::join!(
        collect_dom_tracks(page, DESCRIPTION_TRACKS),
        has_ad_selector(page),
    );
    let dom_description_tracks = recover_or_propagate(dom_tracks, COMPONENT, "DOM track scan")?;
    let has_ad_selector = recover_or_propagate(selector, COMPONENT, "AD selector scan")?;
    let manifest_ad_tracks = manifest_ad_tracks(manifests);

    let has_audio_description =
        !dom_description_tracks.is_empty() || !manifest_ad_tracks.is_empty() || has_ad_selector;
    info!(
        dom = dom_description_tracks.len(),
        manifest = manifest_ad_tracks.len(),
        selector = has_ad_selector,
        "[AudioDescriptionChecker] Audio description {}",
        if has_audio_description { "found" } else { "not found" }
    );

    Ok(AudioDescriptionCheckResult {
        dom_description_tracks,
        manifest_ad_tracks,
        has_audio_description,
        has_ad_selector,
    })
}
