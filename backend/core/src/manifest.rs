//! Normalized streaming manifest model.
//!
//! Produced once per intercepted HLS playlist or DASH MPD and read-only afterwards.

use serde::{Deserialize, Serialize};

/// Streaming manifest grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestFormat {
    Hls,
    Dash,
}

impl ManifestFormat {
    /// Classify a network response by URL suffix or declared content type.
    ///
    /// HLS wins when both match. Query strings and fragments are ignored for
    /// the suffix test.
    pub fn classify(url: &str, content_type: Option<&str>) -> Option<Self> {
        let path = url
            .split(['?', '#'])
            .next()
            .unwrap_or(url)
            .to_ascii_lowercase();
        let content_type = content_type.unwrap_or("").to_ascii_lowercase();

        if path.ends_with(".m3u8") || content_type.contains("mpegurl") {
            Some(ManifestFormat::Hls)
        } else if path.ends_with(".mpd") || content_type.contains("dash+xml") {
            Some(ManifestFormat::Dash)
        } else {
            None
        }
    }

    /// Guess the grammar from the body when neither URL nor content type tells.
    pub fn sniff(body: &str) -> Option<Self> {
        let head = body.trim_start_matches('\u{feff}').trim_start();
        if head.starts_with("#EXTM3U") {
            Some(ManifestFormat::Hls)
        } else if head.contains("<MPD") {
            Some(ManifestFormat::Dash)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ManifestFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManifestFormat::Hls => f.write_str("hls"),
            ManifestFormat::Dash => f.write_str("dash"),
        }
    }
}

/// A subtitle/caption rendition declared by a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestTrack {
    pub language: Option<String>,
    pub name: Option<String>,
    pub uri: Option<String>,
    pub is_default: bool,
    pub auto_select: bool,
    pub forced: bool,
}

/// An audio rendition declared by a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrack {
    pub language: Option<String>,
    pub name: Option<String>,
    pub uri: Option<String>,
    pub is_default: bool,
    pub auto_select: bool,
    pub is_audio_description: bool,
    /// Free-text role annotations (HLS `CHARACTERISTICS`, DASH `Role` values).
    pub characteristics: Option<String>,
}

/// One parsed manifest response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestInfo {
    pub url: String,
    #[serde(rename = "type")]
    pub format: ManifestFormat,
    pub subtitle_tracks: Vec<ManifestTrack>,
    pub audio_tracks: Vec<AudioTrack>,
}

impl ManifestInfo {
    pub fn has_audio_description(&self) -> bool {
        self.audio_tracks.iter().any(|t| t.is_audio_description)
    }
}

/// A manifest response captured while the page loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptedManifest {
    pub url: String,
    pub body: String,
    /// The response `Content-Type`, if any.
    pub declared_type: Option<String>,
}

impl InterceptedManifest {
    /// Resolve the grammar: URL and content type first, then the body itself.
    pub fn format(&self) -> Option<ManifestFormat> {
        ManifestFormat::classify(&self.url, self.declared_type.as_deref())
            .or_else(|| ManifestFormat::sniff(&self.body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_suffix_and_content_type() {
        assert_eq!(
            ManifestFormat::classify("https://cdn.example.com/master.m3u8", None),
            Some(ManifestFormat::Hls)
        );
        assert_eq!(
            ManifestFormat::classify("https://cdn.example.com/live.mpd?token=abc", None),
            Some(ManifestFormat::Dash)
        );
        assert_eq!(
            ManifestFormat::classify("https://cdn.example.com/playlist", Some("application/vnd.apple.mpegurl")),
            Some(ManifestFormat::Hls)
        );
        assert_eq!(
            ManifestFormat::classify("https://cdn.example.com/manifest", Some("application/dash+xml")),
            Some(ManifestFormat::Dash)
        );
        assert_eq!(ManifestFormat::classify("https://cdn.example.com/seg1.ts", Some("video/mp2t")), None);
    }

    #[test]
    fn sniffs_body_when_url_is_opaque() {
        let hls = InterceptedManifest {
            url: "file:///tmp/capture-1".into(),
            body: "#EXTM3U\n#EXT-X-VERSION:3\n".into(),
            declared_type: None,
        };
        assert_eq!(hls.format(), Some(ManifestFormat::Hls));

        let dash = InterceptedManifest {
            url: "file:///tmp/capture-2".into(),
            body: "<?xml version=\"1.0\"?>\n<MPD xmlns=\"urn:mpeg:dash:schema:mpd:2011\"></MPD>".into(),
            declared_type: None,
        };
        assert_eq!(dash.format(), Some(ManifestFormat::Dash));
    }

    #[test]
    fn format_serializes_as_type_field() {
        let info = ManifestInfo {
            url: "https://example.com/a.mpd".into(),
            format: ManifestFormat::Dash,
            subtitle_tracks: vec![],
            audio_tracks: vec![],
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["type"], "dash");
        assert!(json["subtitleTracks"].as_array().unwrap().is_empty());
    }
}
