use std::path::PathBuf;
use std::time::Duration;

use serde_json::json;
use streamaudit_browser::{HtmlPage, StaticManifestFeed};
use streamaudit_core::{ComplianceStatus, ManifestFormat, StreamingAnalysisResult};
use streamaudit_streaming::{analyze_loaded_page, prepare};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn status_of(result: &StreamingAnalysisResult, clause_id: &str) -> ComplianceStatus {
    result
        .findings
        .iter()
        .find(|f| f.clause_id == clause_id)
        .map(|f| f.status)
        .unwrap_or_else(|| panic!("missing finding for {clause_id}"))
}

#[tokio::test]
async fn compliant_videojs_player() {
    let page = HtmlPage::from_file(&fixture("compliant-player.html"))
        .await
        .unwrap()
        .with_global("videojs", json!({ "VERSION": "8.10.0" }));
    let feed = StaticManifestFeed::from_files(&[fixture("master.m3u8")]).await.unwrap();

    let analysis = prepare(&page, &feed);
    analysis.setup_interception().await.unwrap();
    let result = analysis.analyze().await.unwrap();

    assert!(result.player_detected);
    assert_eq!(result.player_type.as_deref(), Some("videojs"));
    assert_eq!(result.player_version.as_deref(), Some("8.10.0"));
    assert_eq!(result.primary_player().unwrap().container_selector, ".video-js");

    assert_eq!(result.manifests.len(), 1);
    assert_eq!(result.manifests[0].format, ManifestFormat::Hls);
    assert!(result.captions.has_captions);
    assert!(result.captions.has_language_attributes);
    assert_eq!(result.captions.dom_tracks[0].parent_selector, "#lecture");
    assert!(result.audio_description.has_ad_selector);
    assert_eq!(result.audio_description.manifest_ad_tracks.len(), 1);

    let accessibility = result.player_accessibility.as_ref().unwrap();
    let keyboard = &accessibility.keyboard_navigation;
    assert!(keyboard.can_tab_into_player);
    assert_eq!(keyboard.tab_stops_to_play, 1);
    assert_eq!(keyboard.tab_stops_to_captions, 2);
    assert_eq!(keyboard.tab_stops_to_ad, 3);
    assert!(accessibility.aria_labels.player_has_role);
    assert!(accessibility.aria_labels.unlabeled_buttons.is_empty());
    assert_eq!(accessibility.focus_indicators.controls_with_focus_indicator.len(), 5);
    assert_eq!(
        accessibility.caption_customization.detected_options,
        vec!["font size", "font color", "opacity"]
    );

    let expected = [
        ("7.1.1", ComplianceStatus::Pass),
        ("7.1.2", ComplianceStatus::NeedsReview),
        ("7.1.3", ComplianceStatus::Pass),
        ("7.1.4", ComplianceStatus::Pass),
        ("7.2.1", ComplianceStatus::Pass),
        ("7.2.2", ComplianceStatus::NeedsReview),
        ("7.2.3", ComplianceStatus::Pass),
        ("7.3", ComplianceStatus::Pass),
    ];
    for (clause, status) in expected {
        assert_eq!(status_of(&result, clause), status, "clause {clause}");
    }
    let summary = result.summary();
    assert_eq!(summary.passed, 6);
    assert!(!summary.has_critical_failures());
}

#[tokio::test]
async fn native_player_without_captions() {
    let page = HtmlPage::from_file(&fixture("no-captions.html")).await.unwrap();
    let feed = StaticManifestFeed::from_files(&[fixture("no-subs.m3u8")]).await.unwrap();

    let result = analyze_loaded_page(&page, &feed, Duration::ZERO).await.unwrap();

    assert_eq!(result.player_type.as_deref(), Some("native"));
    assert_eq!(result.primary_player().unwrap().container_selector, "div.player.teaser");
    assert!(!result.captions.has_captions);
    assert!(!result.audio_description.has_audio_description);

    let keyboard = &result.player_accessibility.as_ref().unwrap().keyboard_navigation;
    assert!(!keyboard.can_tab_into_player);
    assert_eq!(keyboard.unreachable_controls, vec!["Play", "CC"]);

    assert_eq!(status_of(&result, "7.1.1"), ComplianceStatus::Fail);
    assert_eq!(status_of(&result, "7.1.2"), ComplianceStatus::NotApplicable);
    assert_eq!(status_of(&result, "7.1.3"), ComplianceStatus::Fail);
    assert_eq!(status_of(&result, "7.1.4"), ComplianceStatus::NotApplicable);
    assert_eq!(status_of(&result, "7.2.1"), ComplianceStatus::Fail);
    assert_eq!(status_of(&result, "7.2.3"), ComplianceStatus::NotApplicable);
    assert_eq!(status_of(&result, "7.3"), ComplianceStatus::Fail);
    assert_eq!(result.summary().critical_failures, 3);
}

#[tokio::test]
async fn dash_manifest_supplies_tracks_for_bare_video() {
    let page = HtmlPage::new(r#"<html><body><video src="movie.mp4"></video></body></html>"#);
    let feed = StaticManifestFeed::from_files(&[fixture("manifest.mpd")]).await.unwrap();

    let result = analyze_loaded_page(&page, &feed, Duration::ZERO).await.unwrap();

    assert_eq!(result.manifests[0].format, ManifestFormat::Dash);
    assert_eq!(result.captions.manifest_tracks.len(), 2);
    assert_eq!(status_of(&result, "7.1.1"), ComplianceStatus::Pass);
    assert_eq!(status_of(&result, "7.1.3"), ComplianceStatus::Pass);
    assert_eq!(status_of(&result, "7.2.1"), ComplianceStatus::Pass);
    assert_eq!(status_of(&result, "7.2.3"), ComplianceStatus::Pass);
    assert_eq!(status_of(&result, "7.3"), ComplianceStatus::Fail);
}
