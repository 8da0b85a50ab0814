//! Manifest Parser
//!
//! Reads HLS master playlists and DASH MPDs just far enough to list their
//! subtitle and audio tracks. Manifests are untrusted input: anything missing
//! or malformed turns into `None`/`false` fields or an empty list, never an error.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use streamaudit_core::{
    AudioTrack, InterceptedManifest, ManifestFormat, ManifestInfo, ManifestTrack,
};
use tracing::{debug, info};

const HLS_MEDIA_TAG: &str = "#EXT-X-MEDIA:";
const DESCRIBES_VIDEO: &str = "public.accessibility.describes-video";

static HLS_ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([A-Za-z0-9-]+)=(?:"([^"]*)"|([^,]*))"#).unwrap());

static ADAPTATION_SET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<AdaptationSet\b[^>]*>(.*?)</AdaptationSet\s*>").unwrap());
static ROLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<Role\b[^>]*>").unwrap());
static BASE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<BaseURL\b[^>]*>([^<]*)</BaseURL\s*>").unwrap());

/// Parse whichever format the response classifies as. Responses that are
/// neither HLS nor DASH are skipped.
pub fn parse_manifests(intercepted: &[InterceptedManifest]) -> Vec<ManifestInfo> {
    let parsed: Vec<ManifestInfo> = intercepted
        .iter()
        .filter_map(|m| match m.format() {
            Some(format) => Some(parse_manifest(format, &m.body, &m.url)),
            None => {
                debug!(url = %m.url, "[ManifestParser] Skipping unrecognised response");
                None
            }
        })
        .collect();
    info!(
        "[ManifestParser] Parsed {} of {} captured manifest(s)",
        parsed.len(),
        intercepted.len()
    );
    parsed
}

pub fn parse_manifest(format: ManifestFormat, body: &str, url: &str) -> ManifestInfo {
    match format {
        ManifestFormat::Hls => parse_hls(body, url),
        ManifestFormat::Dash => parse_dash(body, url),
    }
}

// --- HLS ---

/// `KEY=value` pairs of one tag line, keys upper-cased, quotes stripped.
fn hls_attributes(list: &str) -> HashMap<String, String> {
    HLS_ATTRIBUTE
        .captures_iter(list)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().trim())
                .unwrap_or_default();
            (caps[1].to_ascii_uppercase(), value.to_string())
        })
        .collect()
}

fn is_yes(attrs: &HashMap<String, String>, key: &str) -> bool {
    attrs
        .get(key)
        .map(|v| v.eq_ignore_ascii_case("YES"))
        .unwrap_or(false)
}

pub fn parse_hls(body: &str, url: &str) -> ManifestInfo {
    let mut subtitle_tracks = Vec::new();
    let mut audio_tracks = Vec::new();

    for line in body.lines() {
        let Some(list) = line.strip_prefix(HLS_MEDIA_TAG) else {
            continue;
        };
        let attrs = hls_attributes(list);
        let language = attrs.get("LANGUAGE").cloned();
        let name = attrs.get("NAME").cloned();
        let uri = attrs.get("URI").cloned();
        let is_default = is_yes(&attrs, "DEFAULT");
        let auto_select = is_yes(&attrs, "AUTOSELECT");

        match attrs.get("TYPE").map(String::as_str) {
            Some("SUBTITLES") => subtitle_tracks.push(ManifestTrack {
                language,
                name,
                uri,
                is_default,
                auto_select,
                forced: is_yes(&attrs, "FORCED"),
            }),
            Some("AUDIO") => {
                let characteristics = attrs.get("CHARACTERISTICS").cloned();
                audio_tracks.push(AudioTrack {
                    language,
                    name,
                    uri,
                    is_default,
                    auto_select,
                    is_audio_description: characteristics
                        .as_deref()
                        .map(|c| c.contains(DESCRIBES_VIDEO))
                        .unwrap_or(false),
                    characteristics,
                });
            }
            _ => {}
        }
    }

    ManifestInfo {
        url: url.to_string(),
        format: ManifestFormat::Hls,
        subtitle_tracks,
        audio_tracks,
    }
}

// --- DASH ---

/// First `attr="value"` in `text`. Attribute names match case-insensitively.
fn xml_attr(text: &str, attr: &str) -> Option<String> {
    let pattern = format!(r#"(?i)\b{}\s*=\s*"([^"]*)""#, regex::escape(attr));
    Regex::new(&pattern)
        .ok()?
        .captures(text)
        .map(|caps| caps[1].to_string())
}

fn first_base_url(text: &str) -> Option<String> {
    BASE_URL
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
}

/// Resource of a text adaptation set: the first `BaseURL` in the set, whether
/// it sits on the set itself or inside one of its representations.
fn text_track_uri(inner: &str) -> Option<String> {
    first_base_url(inner)
}

pub fn parse_dash(body: &str, url: &str) -> ManifestInfo {
    let mut subtitle_tracks = Vec::new();
    let mut audio_tracks = Vec::new();

    for caps in ADAPTATION_SET.captures_iter(body) {
        let block = &caps[0];
        let inner = &caps[1];

        let content_type = xml_attr(block, "contentType");
        let mime_type = xml_attr(block, "mimeType");
        let lang = xml_attr(block, "lang");
        let label = xml_attr(block, "label");
        let roles: Vec<String> = ROLE
            .find_iter(inner)
            .filter_map(|role| xml_attr(role.as_str(), "value"))
            .map(|value| value.to_lowercase())
            .collect();
        let has_role = |name: &str| roles.iter().any(|r| r == name);

        let is_text = content_type.as_deref() == Some("text")
            || mime_type
                .as_deref()
                .map(|m| m.contains("ttml") || m.contains("vtt") || m.contains("text"))
                .unwrap_or(false)
            || has_role("subtitle")
            || has_role("caption");
        let is_audio = content_type.as_deref() == Some("audio")
            || mime_type
                .as_deref()
                .map(|m| m.starts_with("audio/"))
                .unwrap_or(false);

        if is_text {
            subtitle_tracks.push(ManifestTrack {
                language: lang,
                name: label,
                uri: text_track_uri(inner),
                is_default: has_role("main"),
                auto_select: false,
                forced: has_role("forced"),
            });
        } else if is_audio {
            audio_tracks.push(AudioTrack {
                language: lang,
                name: label,
                uri: None,
                is_default: has_role("main"),
                auto_select: false,
                is_audio_description: has_role("description") || has_role("commentary"),
                characteristics: (!roles.is_empty()).then(|| roles.join(", ")),
            });
        }
    }

    ManifestInfo {
        url: url.to_string(),
        format: ManifestFormat::Dash,
        subtitle_tracks,
        audio_tracks,
    }
}
