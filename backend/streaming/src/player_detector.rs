//! Player Detector
//!
//! Probes the page for known player SDKs and enumerates native media elements.
//! A failing probe only loses that probe; the rest still run.

use serde_json::Value;
use streamaudit_core::{
    DetectedPlayer, ElementHandle, MediaElementInfo, MediaKind, PageResult, PageState, PlayerSdk,
};
use tracing::{debug, info, warn};

use crate::dom::{non_empty_attribute, recover_or_propagate, short_locator, structural_locator};

const COMPONENT: &str = "PlayerDetector";

/// Elements that make an ancestor count as the host of a native player's controls.
const CONTROL_SELECTOR: &str = r#"button, [role="button"], input[type="range"], [role="slider"]"#;

const ACCESSIBLE_TRACK_KINDS: [&str; 3] = ["captions", "subtitles", "descriptions"];

/// One entry of the detection table.
#[derive(Debug, Clone, Copy)]
pub struct PlayerProbe {
    pub sdk: PlayerSdk,
    /// Global the SDK installs on the page.
    pub global: Option<&'static str>,
    /// DOM evidence of the SDK (script tags, player elements).
    pub markers: &'static str,
    /// Property path holding the SDK version.
    pub version_path: Option<&'static str>,
    pub container: &'static str,
}

/// Probed in order; the first hit becomes the primary player.
pub const PLAYER_PROBES: [PlayerProbe; 8] = [
    PlayerProbe {
        sdk: PlayerSdk::HlsJs,
        global: Some("Hls"),
        markers: r#"script[src*="hls.js"], script[src*="hls.min.js"]"#,
        version_path: Some("Hls.version"),
        container: "video",
    },
    PlayerProbe {
        sdk: PlayerSdk::DashJs,
        global: Some("dashjs"),
        markers: r#"script[src*="dash.all"], script[src*="dash.js"]"#,
        version_path: Some("dashjs.Version"),
        container: "video",
    },
    PlayerProbe {
        sdk: PlayerSdk::Shaka,
        global: Some("shaka"),
        markers: r#"script[src*="shaka-player"]"#,
        version_path: Some("shaka.Player.version"),
        container: "video",
    },
    PlayerProbe {
        sdk: PlayerSdk::VideoJs,
        global: Some("videojs"),
        markers: ".video-js",
        version_path: Some("videojs.VERSION"),
        container: ".video-js",
    },
    PlayerProbe {
        sdk: PlayerSdk::JwPlayer,
        global: Some("jwplayer"),
        markers: ".jwplayer",
        version_path: Some("jwplayer.version"),
        container: ".jwplayer",
    },
    PlayerProbe {
        sdk: PlayerSdk::Bitmovin,
        global: Some("bitmovin"),
        markers: r#"[class*="bitmovin"], bitmovin-player, [id*="bitmovin"]"#,
        version_path: Some("bitmovin.player.Player.version"),
        container: r#"[class*="bitmovin"], bitmovin-player, [id*="bitmovin"]"#,
    },
    PlayerProbe {
        sdk: PlayerSdk::Plyr,
        global: Some("Plyr"),
        markers: ".plyr",
        version_path: Some("Plyr.version"),
        container: ".plyr",
    },
    PlayerProbe {
        sdk: PlayerSdk::Eyevinn,
        global: None,
        markers: "eyevinn-video",
        version_path: None,
        container: "eyevinn-video",
    },
];

/// JavaScript truthiness of a reported value.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

async fn probe_matches(page: &dyn PageState, probe: &PlayerProbe) -> PageResult<bool> {
    if let Some(global) = probe.global {
        let present = recover_or_propagate(
            page.global_value(global)
                .await
                .map(|v| v.as_ref().map(is_truthy).unwrap_or(false)),
            COMPONENT,
            "global probe",
        )?;
        if present {
            return Ok(true);
        }
    }
    let markers = recover_or_propagate(page.query_one(probe.markers, None).await, COMPONENT, "marker probe")?;
    Ok(markers.is_some())
}

async fn probe_version(page: &dyn PageState, probe: &PlayerProbe) -> PageResult<Option<String>> {
    let Some(path) = probe.version_path else {
        return Ok(None);
    };
    let value = match page.global_value(path).await {
        Ok(value) => value,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!(sdk = %probe.sdk, error = %e, "[PlayerDetector] Version probe failed");
            None
        }
    };
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

async fn probe_container(page: &dyn PageState, probe: &PlayerProbe) -> PageResult<String> {
    let found = recover_or_propagate(page.query_one(probe.container, None).await, COMPONENT, "container lookup")?;
    Ok(match found {
        Some(_) => probe.container.to_string(),
        None => "body".to_string(),
    })
}

async fn describe_media(
    page: &dyn PageState,
    kind: MediaKind,
    element: &ElementHandle,
) -> PageResult<MediaElementInfo> {
    let src = match non_empty_attribute(page, element, "src").await? {
        Some(src) => Some(src),
        None => match page.query_one("source", Some(element)).await? {
            Some(source) => non_empty_attribute(page, &source, "src").await?,
            None => None,
        },
    };

    let tracks = page.query_all("track", Some(element)).await?;
    let mut has_accessible_tracks = false;
    for track in &tracks {
        let kind = page.attribute(track, "kind").await?.unwrap_or_default();
        if ACCESSIBLE_TRACK_KINDS.contains(&kind.to_ascii_lowercase().as_str()) {
            has_accessible_tracks = true;
            break;
        }
    }

    Ok(MediaElementInfo {
        tag_name: kind,
        selector: structural_locator(page, element).await?,
        src,
        has_tracks: !tracks.is_empty(),
        has_accessible_tracks,
        track_count: tracks.len(),
    })
}

/// Every `<video>` then every `<audio>` element on the page.
pub async fn detect_media_elements(page: &dyn PageState) -> PageResult<Vec<MediaElementInfo>> {
    let mut media = Vec::new();
    for kind in [MediaKind::Video, MediaKind::Audio] {
        for element in page.query_all(kind.tag(), None).await? {
            media.push(describe_media(page, kind, &element).await?);
        }
    }
    Ok(media)
}

/// Nearest ancestor of the media element, below `body`, that also holds a
/// control. Falls back to the media element's own locator.
pub async fn native_container(page: &dyn PageState, media_selector: &str) -> PageResult<String> {
    let Some(media) = page.query_one(media_selector, None).await? else {
        return Ok(media_selector.to_string());
    };
    let mut current = page.parent(&media).await?;
    while let Some(el) = current {
        if matches!(page.tag_name(&el).await?.as_str(), "body" | "html") {
            break;
        }
        if page.query_one(CONTROL_SELECTOR, Some(&el)).await?.is_some() {
            return short_locator(page, &el).await;
        }
        current = page.parent(&el).await?;
    }
    Ok(media_selector.to_string())
}

/// Detected players in probe order, or a single synthesized `native` player
/// when no SDK matched but media elements exist.
pub async fn detect_players(page: &dyn PageState) -> PageResult<Vec<DetectedPlayer>> {
    let media_elements = recover_or_propagate(
        detect_media_elements(page).await,
        COMPONENT,
        "media element scan",
    )?;
    debug!(count = media_elements.len(), "[PlayerDetector] Media elements found");

    let mut players = Vec::new();
    for probe in &PLAYER_PROBES {
        if !probe_matches(page, probe).await? {
            continue;
        }
        let version = probe_version(page, probe).await?;
        let container_selector = probe_container(page, probe).await?;
        debug!(sdk = %probe.sdk, ?version, container = %container_selector, "[PlayerDetector] Probe matched");
        players.push(DetectedPlayer {
            sdk: probe.sdk,
            version,
            container_selector,
            media_elements: media_elements.clone(),
        });
    }

    if players.is_empty() {
        if let Some(first) = media_elements.first() {
            let container_selector = recover_or_propagate(
                native_container(page, &first.selector).await.map(Some),
                COMPONENT,
                "native container lookup",
            )?
            .unwrap_or_else(|| first.selector.clone());
            players.push(DetectedPlayer {
                sdk: PlayerSdk::Native,
                version: None,
                container_selector,
                media_elements,
            });
        }
    }

    info!(
        "[PlayerDetector] Detected {} player(s){}",
        players.len(),
        players
            .first()
            .map(|p| format!(", primary {}", p.sdk))
            .unwrap_or_default()
    );
    Ok(players)
}
