//! Player detection model.

use serde::{Deserialize, Serialize};

/// Known player technologies, plus the native/unknown fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerSdk {
    #[serde(rename = "hls.js")]
    HlsJs,
    #[serde(rename = "dash.js")]
    DashJs,
    #[serde(rename = "shaka")]
    Shaka,
    #[serde(rename = "videojs")]
    VideoJs,
    #[serde(rename = "jwplayer")]
    JwPlayer,
    #[serde(rename = "bitmovin")]
    Bitmovin,
    #[serde(rename = "plyr")]
    Plyr,
    #[serde(rename = "eyevinn")]
    Eyevinn,
    #[serde(rename = "native")]
    Native,
    #[serde(rename = "unknown")]
    Unknown,
}

impl PlayerSdk {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerSdk::HlsJs => "hls.js",
            PlayerSdk::DashJs => "dash.js",
            PlayerSdk::Shaka => "shaka",
            PlayerSdk::VideoJs => "videojs",
            PlayerSdk::JwPlayer => "jwplayer",
            PlayerSdk::Bitmovin => "bitmovin",
            PlayerSdk::Plyr => "plyr",
            PlayerSdk::Eyevinn => "eyevinn",
            PlayerSdk::Native => "native",
            PlayerSdk::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PlayerSdk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn tag(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

/// A raw `<video>`/`<audio>` element found on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaElementInfo {
    pub tag_name: MediaKind,
    pub selector: String,
    pub src: Option<String>,
    pub has_tracks: bool,
    /// At least one child track of kind captions, subtitles or descriptions.
    pub has_accessible_tracks: bool,
    pub track_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedPlayer {
    pub sdk: PlayerSdk,
    pub version: Option<String>,
    /// Locator of the element that hosts the player controls.
    pub container_selector: String,
    pub media_elements: Vec<MediaElementInfo>,
}
