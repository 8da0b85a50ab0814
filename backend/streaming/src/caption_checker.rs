//! Caption Checker
//!
//! Fuses three caption sources: sidecar `<track>` elements, manifest subtitle
//! renditions and the media elements' text track API.

use streamaudit_core::{
    CaptionCheckResult, ManifestInfo, ManifestTrack, PageResult, PageState, PlayerApiTrackInfo,
};
use tracing::info;

use crate::dom::{collect_dom_tracks, recover_or_propagate};

const COMPONENT: &str = "CaptionChecker";
const CAPTION_TRACKS: &str = r#"track[kind="captions"], track[kind="subtitles"]"#;
const CAPTION_KINDS: [&str; 2] = ["captions", "subtitles"];

/// Caption and subtitle text tracks of every media element.
pub async fn player_api_caption_tracks(page: &dyn PageState) -> PageResult<Vec<PlayerApiTrackInfo>> {
    let mut tracks = Vec::new();
    for media in page.query_all("video, audio", None).await? {
        tracks.extend(page.text_tracks(&media).await?.into_iter().filter(|t| {
            t.kind
                .as_deref()
                .map(|k| CAPTION_KINDS.contains(&k))
                .unwrap_or(false)
        }));
    }
    Ok(tracks)
}

pub fn manifest_caption_tracks(manifests: &[ManifestInfo]) -> Vec<ManifestTrack> {
    manifests
        .iter()
        .flat_map(|m| m.subtitle_tracks.iter().cloned())
        .collect()
}

fn has_language(tag: Option<&str>) -> bool {
    tag.map(|t| !t.is_empty()).unwrap_or(false)
}

pub async fn check_captions(
    page: &dyn PageState,
    manifests: &[ManifestInfo],
) -> PageResult<CaptionCheckResult> {
    let (dom_tracks, player_api_tracks) = tokio::join!(
        collect_dom_tracks(page, CAPTION_TRACKS),
        player_api_caption_tracks(page),
    );
    let dom_tracks = recover_or_propagate(dom_tracks, COMPONENT, "DOM track scan")?;
    let player_api_tracks = recover_or_propagate(player_api_tracks, COMPONENT, "text track API")?;
    let manifest_tracks = manifest_caption_tracks(manifests);

    let has_captions =
        !dom_tracks.is_empty() || !manifest_tracks.is_empty() || !player_api_tracks.is_empty();
    let has_language_attributes = dom_tracks.iter().all(|t| has_language(t.srclang.as_deref()))
        && manifest_tracks.iter().all(|t| has_language(t.language.as_deref()))
        && player_api_tracks.iter().all(|t| has_language(t.language.as_deref()));

    info!(
        dom = dom_tracks.len(),
        manifest = manifest_tracks.len(),
        api = player_api_tracks.len(),
        "[CaptionChecker] Captions {}",
        if has_captions { "found" } else { "not found" }
    );

    Ok(CaptionCheckResult {
        dom_tracks,
        manifest_tracks,
        player_api_tracks,
        has_captions,
        has_language_attributes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest_parser::parse_hls;
    use crate::testing::{Fault, ScriptedPage};
    use streamaudit_browser::HtmlPage;
    use streamaudit_core::AuditError;

    #[tokio::test]
    async fn dom_and_api_tracks_with_languages() {
        let page = HtmlPage::new(
            r#"<body><video id="v">
                <track kind="captions" srclang="en" label="English" src="en.vtt">
                <track kind="subtitles" srclang="sv" label="Svenska" src="sv.vtt">
                <track kind="descriptions" srclang="en" src="ad.vtt">
            </video></body>"#,
        );
        let result = check_captions(&page, &[]).await.unwrap();
        assert!(result.has_captions);
        assert!(result.has_language_attributes);
        assert_eq!(result.dom_tracks.len(), 2);
        assert_eq!(result.dom_tracks[0].kind, "captions");
        assert_eq!(result.dom_tracks[0].parent_selector, "#v");
        assert_eq!(result.player_api_tracks.len(), 2);
        assert!(result.manifest_tracks.is_empty());
    }

    #[tokio::test]
    async fn missing_language_on_any_source_is_reported() {
        let page = HtmlPage::new("<body><p>no media</p></body>");
        let manifest = parse_hls(
            "#EXT-X-MEDIA:TYPE=SUBTITLES,NAME=\"Unknown\",URI=\"subs.m3u8\"",
            "m.m3u8",
        );
        let result = check_captions(&page, &[manifest]).await.unwrap();
        assert!(result.has_captions);
        assert!(!result.has_language_attributes);
        assert_eq!(result.track_count(), 1);
    }

    #[tokio::test]
    async fn no_tracks_anywhere() {
        let page = HtmlPage::new(r#"<body><video src="x.mp4"></video></body>"#);
        let result = check_captions(&page, &[]).await.unwrap();
        assert!(!result.has_captions);
        assert!(result.has_language_attributes);
    }

    #[tokio::test]
    async fn failing_source_degrades_to_empty() {
        let page = ScriptedPage::new(HtmlPage::new(
            r#"<body><video><track kind="captions" srclang="en"></video></body>"#,
        ))
        .fail_selector(CAPTION_TRACKS, Fault::Evaluation);
        let result = check_captions(&page, &[]).await.unwrap();
        assert!(result.dom_tracks.is_empty());
        assert_eq!(result.player_api_tracks.len(), 1);
        assert!(result.has_captions);
    }

    #[tokio::test]
    async fn fatal_failure_propagates() {
        let page = ScriptedPage::new(HtmlPage::new("<body></body>"))
            .fail_selector("video, audio", Fault::Disconnected);
        let err = check_captions(&page, &[]).await.unwrap_err();
        assert!(matches!(err, AuditError::Disconnected(_)));
    }
}
