//! Streaming analysis orchestrator.
//!
//! Call order: start manifest capture, load the page (caller's job), then
//! parse, detect, check and map to Clause 7.

use std::time::Duration;

use streamaudit_core::{
    InterceptedManifest, ManifestFeed, PageResult, PageState, StreamingAnalysisResult,
};
use tracing::info;

use crate::audio_description::check_audio_description;
use crate::caption_checker::check_captions;
use crate::clause7::{map_to_clause7, Clause7Context};
use crate::manifest_parser::parse_manifests;
use crate::player_accessibility::check_player_accessibility;
use crate::player_detector::detect_players;

/// Analysis bound to one page and its manifest feed.
pub struct PreparedAnalysis<'a> {
    page: &'a dyn PageState,
    feed: &'a dyn ManifestFeed,
}

pub fn prepare<'a>(page: &'a dyn PageState, feed: &'a dyn ManifestFeed) -> PreparedAnalysis<'a> {
    PreparedAnalysis { page, feed }
}

impl<'a> PreparedAnalysis<'a> {
    /// Must run before navigation, or the initial manifests are missed.
    pub async fn setup_interception(&self) -> PageResult<()> {
        self.feed.start().await?;
        info!("[Analyzer] Manifest interception started");
        Ok(())
    }

    /// Analyze with whatever the feed has captured so far.
    pub async fn analyze(&self) -> PageResult<StreamingAnalysisResult> {
        let captured = self.feed.captured().await?;
        run_analysis(self.page, &captured).await
    }
}

/// For a page that is already loaded: capture, let the player settle, analyze.
pub async fn analyze_loaded_page(
    page: &dyn PageState,
    feed: &dyn ManifestFeed,
    settle: Duration,
) -> PageResult<StreamingAnalysisResult> {
    let analysis = prepare(page, feed);
    analysis.setup_interception().await?;
    if !settle.is_zero() {
        tokio::time::sleep(settle).await;
    }
    analysis.analyze().await
}

pub async fn run_analysis(
    page: &dyn PageState,
    intercepted: &[InterceptedManifest],
) -> PageResult<StreamingAnalysisResult> {
    let manifests = parse_manifests(intercepted);
    info!(
        captured = intercepted.len(),
        parsed = manifests.len(),
        "[Analyzer] Manifests parsed"
    );

    let (players, captions, audio_description) = tokio::join!(
        detect_players(page),
        check_captions(page, &manifests),
        check_audio_description(page, &manifests),
    );
    let players = players?;
    let captions = captions?;
    let audio_description = audio_description?;

    let primary = players.first();
    let player_accessibility = match primary {
        Some(player) => Some(check_player_accessibility(page, player).await?),
        None => None,
    };

    let findings = map_to_clause7(&Clause7Context {
        captions: &captions,
        audio_description: &audio_description,
        accessibility: player_accessibility.as_ref(),
        manifests: &manifests,
        player_detected: primary.is_some(),
    });

    let result = StreamingAnalysisResult {
        player_detected: primary.is_some(),
        player_type: primary.map(|p| p.sdk.as_str().to_string()),
        player_version: primary.and_then(|p| p.version.clone()),
        players,
        captions,
        audio_description,
        player_accessibility,
        manifests,
        findings,
    };

    let summary = result.summary();
    info!(
        passed = summary.passed,
        failed = summary.failed,
        needs_review = summary.needs_review,
        not_applicable = summary.not_applicable,
        critical_failures = summary.critical_failures,
        "[Analyzer] Clause 7 evaluation complete"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fault, ScriptedPage};
    use std::sync::atomic::{AtomicBool, Ordering};
    use streamaudit_browser::{HtmlPage, StaticManifestFeed};
    use streamaudit_core::{AuditError, ComplianceStatus};

    #[tokio::test]
    async fn empty_page_is_not_applicable_throughout() {
        let page = HtmlPage::new("<html><body><p>Article</p></body></html>");
        let result = run_analysis(&page, &[]).await.unwrap();
        assert!(!result.player_detected);
        assert!(result.player_type.is_none());
        assert!(result.player_accessibility.is_none());
        assert_eq!(result.findings.len(), 8);
        assert!(result
            .findings
            .iter()
            .all(|f| f.status == ComplianceStatus::NotApplicable));
    }

    #[tokio::test]
    async fn native_player_runs_accessibility_checks() {
        let page = HtmlPage::new(
            r#"<body><div id="wrap"><video src="a.mp4"></video><button>Play</button></div></body>"#,
        );
        let result = run_analysis(&page, &[]).await.unwrap();
        assert!(result.player_detected);
        assert_eq!(result.player_type.as_deref(), Some("native"));
        assert!(result.player_accessibility.is_some());
        assert_eq!(result.findings[0].status, ComplianceStatus::Fail);
    }

    #[tokio::test]
    async fn unparseable_captures_are_skipped() {
        let page = HtmlPage::new("<body></body>");
        let captured = [InterceptedManifest {
            url: "https://cdn.example.com/segment.ts".into(),
            body: "binary".into(),
            declared_type: Some("video/mp2t".into()),
        }];
        let result = run_analysis(&page, &captured).await.unwrap();
        assert!(result.manifests.is_empty());
    }

    #[tokio::test]
    async fn fatal_collaborator_failure_aborts() {
        let page = ScriptedPage::new(HtmlPage::new("<body><video></video></body>"))
            .fail_selector("video, audio", Fault::Disconnected);
        let err = run_analysis(&page, &[]).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, AuditError::Disconnected(_)));
    }

    struct RecordingFeed {
        started: AtomicBool,
        inner: StaticManifestFeed,
    }

    #[async_trait::async_trait]
    impl ManifestFeed for RecordingFeed {
        async fn start(&self) -> PageResult<()> {
            self.started.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn captured(&self) -> PageResult<Vec<InterceptedManifest>> {
            if !self.started.load(Ordering::SeqCst) {
                return Err(AuditError::Evaluation("feed not started".into()));
            }
            self.inner.captured().await
        }
    }

    #[tokio::test]
    async fn loaded_page_starts_capture_first() {
        let page = HtmlPage::new(r#"<body><video src="a.mp4"></video></body>"#);
        let feed = RecordingFeed {
            started: AtomicBool::new(false),
            inner: StaticManifestFeed::new(vec![InterceptedManifest {
                url: "https://cdn.example.com/master.m3u8".into(),
                body: include_str!("../tests/fixtures/master.m3u8").into(),
                declared_type: None,
            }]),
        };
        let result = analyze_loaded_page(&page, &feed, Duration::ZERO).await.unwrap();
        assert!(feed.started.load(Ordering::SeqCst));
        assert_eq!(result.manifests.len(), 1);
        assert!(result.captions.has_captions);
        assert!(result.audio_description.has_audio_description);
    }
}
