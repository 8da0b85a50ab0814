//! Clause 7 Rule Engine
//!
//! A fixed table of independent rules, one per EN 301 549 sub-clause. Each
//! rule is a pure function of the gathered evidence; the engine keeps no state.

use streamaudit_core::{
    AudioDescriptionCheckResult, CaptionCheckResult, ComplianceStatus, ManifestInfo,
    PlayerAccessibilityResult, Severity, StreamingFinding,
};

/// Evidence every rule reads from.
#[derive(Debug, Clone, Copy)]
pub struct Clause7Context<'a> {
    pub captions: &'a CaptionCheckResult,
    pub audio_description: &'a AudioDescriptionCheckResult,
    pub accessibility: Option<&'a PlayerAccessibilityResult>,
    pub manifests: &'a [ManifestInfo],
    pub player_detected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    pub status: ComplianceStatus,
    pub description: String,
    pub evidence: String,
}

impl RuleOutcome {
    fn new(status: ComplianceStatus, description: impl Into<String>, evidence: impl Into<String>) -> Self {
        Self {
            status,
            description: description.into(),
            evidence: evidence.into(),
        }
    }
}

pub struct ClauseRule {
    pub clause_id: &'static str,
    pub clause_title: &'static str,
    pub severity: Severity,
    pub evaluate: fn(&Clause7Context<'_>) -> RuleOutcome,
}

impl ClauseRule {
    pub fn apply(&self, ctx: &Clause7Context<'_>) -> StreamingFinding {
        let outcome = (self.evaluate)(ctx);
        StreamingFinding {
            clause_id: self.clause_id.to_string(),
            clause_title: self.clause_title.to_string(),
            status: outcome.status,
            description: outcome.description,
            evidence: outcome.evidence,
            severity: self.severity,
        }
    }
}

pub const CLAUSE_7_RULES: [ClauseRule; 8] = [
    ClauseRule {
        clause_id: "7.1.1",
        clause_title: "Captioning playback",
        severity: Severity::Critical,
        evaluate: caption_playback,
    },
    ClauseRule {
        clause_id: "7.1.2",
        clause_title: "Captioning synchronization",
        severity: Severity::Major,
        evaluate: caption_synchronization,
    },
    ClauseRule {
        clause_id: "7.1.3",
        clause_title: "Preservation of captioning",
        severity: Severity::Major,
        evaluate: caption_preservation,
    },
    ClauseRule {
        clause_id: "7.1.4",
        clause_title: "Captioning characteristics",
        severity: Severity::Major,
        evaluate: caption_characteristics,
    },
    ClauseRule {
        clause_id: "7.2.1",
        clause_title: "Audio description playback",
        severity: Severity::Critical,
        evaluate: audio_description_playback,
    },
    ClauseRule {
        clause_id: "7.2.2",
        clause_title: "Audio description synchronization",
        severity: Severity::Major,
        evaluate: audio_description_synchronization,
    },
    ClauseRule {
        clause_id: "7.2.3",
        clause_title: "Preservation of audio description",
        severity: Severity::Major,
        evaluate: audio_description_preservation,
    },
    ClauseRule {
        clause_id: "7.3",
        clause_title: "User controls for captions and audio description",
        severity: Severity::Critical,
        evaluate: user_controls,
    },
];

/// One finding per rule, in table order.
pub fn map_to_clause7(ctx: &Clause7Context<'_>) -> Vec<StreamingFinding> {
    CLAUSE_7_RULES.iter().map(|rule| rule.apply(ctx)).collect()
}

pub fn rule(clause_id: &str) -> Option<&'static ClauseRule> {
    CLAUSE_7_RULES.iter().find(|r| r.clause_id == clause_id)
}

pub fn evaluate_clause(clause_id: &str, ctx: &Clause7Context<'_>) -> Option<StreamingFinding> {
    rule(clause_id).map(|r| r.apply(ctx))
}

fn no_player() -> RuleOutcome {
    RuleOutcome::new(
        ComplianceStatus::NotApplicable,
        "No video player detected on the page.",
        "No <video>, <audio> or known player SDK found.",
    )
}

fn caption_sources(captions: &CaptionCheckResult) -> String {
    let mut sources = Vec::new();
    if !captions.dom_tracks.is_empty() {
        sources.push(format!("{} DOM <track> element(s)", captions.dom_tracks.len()));
    }
    if !captions.manifest_tracks.is_empty() {
        sources.push(format!("{} manifest subtitle track(s)", captions.manifest_tracks.len()));
    }
    if !captions.player_api_tracks.is_empty() {
        sources.push(format!("{} player API text track(s)", captions.player_api_tracks.len()));
    }
    sources.join(", ")
}

fn caption_playback(ctx: &Clause7Context<'_>) -> RuleOutcome {
    if !ctx.player_detected {
        return no_player();
    }
    if !ctx.captions.has_captions {
        return RuleOutcome::new(
            ComplianceStatus::Fail,
            "No caption or subtitle tracks detected. ICT with video capabilities must support captioning playback.",
            "No <track kind=\"captions\"|\"subtitles\"> in the DOM, no subtitle tracks in HLS/DASH manifests, no text tracks via the player API.",
        );
    }
    let sources = caption_sources(ctx.captions);
    if !ctx.captions.has_language_attributes {
        return RuleOutcome::new(
            ComplianceStatus::NeedsReview,
            "Caption tracks detected but some are missing language attributes, so players may not identify the caption language.",
            format!("Found: {sources}. One or more tracks missing a srclang/language attribute."),
        );
    }
    RuleOutcome::new(
        ComplianceStatus::Pass,
        "Caption/subtitle tracks detected with language attributes.",
        format!("Found: {sources}."),
    )
}

/// Timing can only be judged from the caption payloads, which are not fetched.
fn caption_synchronization(ctx: &Clause7Context<'_>) -> RuleOutcome {
    if !ctx.player_detected || !ctx.captions.has_captions {
        return RuleOutcome::new(
            ComplianceStatus::NotApplicable,
            "No captions detected to evaluate synchronization.",
            "Caption playback check did not find caption tracks.",
        );
    }
    RuleOutcome::new(
        ComplianceStatus::NeedsReview,
        "Caption tracks found. Synchronization quality requires manual verification or caption file analysis.",
        format!(
            "{} caption track(s) detected. Timestamp validation requires downloading and parsing caption files.",
            ctx.captions.track_count()
        ),
    )
}

fn caption_preservation(ctx: &Clause7Context<'_>) -> RuleOutcome {
    if !ctx.player_detected {
        return no_player();
    }
    let with_subtitles = ctx
        .manifests
        .iter()
        .filter(|m| !m.subtitle_tracks.is_empty())
        .count();
    if with_subtitles > 0 {
        return RuleOutcome::new(
            ComplianceStatus::Pass,
            "Caption data is present in the streaming manifest, so captions are carried in the transport stream.",
            format!("Found subtitle tracks in {with_subtitles} manifest(s)."),
        );
    }
    if !ctx.captions.dom_tracks.is_empty() {
        return RuleOutcome::new(
            ComplianceStatus::NeedsReview,
            "Captions are provided via sidecar DOM <track> elements. Verify that captions are preserved if content is redistributed.",
            format!(
                "{} DOM track(s) found, but no manifest-level caption tracks.",
                ctx.captions.dom_tracks.len()
            ),
        );
    }
    if ctx.captions.has_captions {
        return RuleOutcome::new(
            ComplianceStatus::NeedsReview,
            "Captions detected via the player API but not in a manifest. Verify preservation in transport.",
            "Caption tracks detected via the player API only.",
        );
    }
    RuleOutcome::new(
        ComplianceStatus::Fail,
        "No caption data found in streaming manifests or the DOM.",
        "No subtitle tracks in HLS/DASH manifests, no <track> elements.",
    )
}

fn caption_characteristics(ctx: &Clause7Context<'_>) -> RuleOutcome {
    if !ctx.player_detected || !ctx.captions.has_captions {
        return RuleOutcome::new(
            ComplianceStatus::NotApplicable,
            "No captions detected to evaluate customization.",
            "No caption tracks found.",
        );
    }
    let Some(accessibility) = ctx.accessibility else {
        return RuleOutcome::new(
            ComplianceStatus::NeedsReview,
            "Player accessibility not evaluated. Cannot check caption customization.",
            "Player accessibility checks were not run.",
        );
    };

    let options = &accessibility.caption_customization.detected_options;
    let listed = options.join(", ");
    match options.len() {
        0 => RuleOutcome::new(
            ComplianceStatus::Fail,
            "No caption customization controls detected. Users must be able to modify caption appearance (font, size, color, opacity, position).",
            "No font size, color, background, opacity or position controls found in the player UI.",
        ),
        n if n >= 3 => RuleOutcome::new(
            ComplianceStatus::Pass,
            format!("Player offers caption customization options: {listed}."),
            format!("Detected {n} customization option(s): {listed}."),
        ),
        n => RuleOutcome::new(
            ComplianceStatus::NeedsReview,
            format!("Some caption customization detected ({listed}), but controls for font, size, color, opacity and position are expected."),
            format!("Only {n} option(s) found: {listed}."),
        ),
    }
}

fn audio_description_playback(ctx: &Clause7Context<'_>) -> RuleOutcome {
    if !ctx.player_detected {
        return no_player();
    }
    let ad = ctx.audio_description;
    if !ad.has_audio_description {
        return RuleOutcome::new(
            ComplianceStatus::Fail,
            "No audio description tracks or controls detected. A mechanism for audio description playback is required.",
            "No <track kind=\"descriptions\"> in the DOM, no AD audio tracks in HLS/DASH manifests, no AD selector in the player UI.",
        );
    }
    let mut sources = Vec::new();
    if !ad.dom_description_tracks.is_empty() {
        sources.push(format!(
            "{} DOM <track kind=\"descriptions\"> element(s)",
            ad.dom_description_tracks.len()
        ));
    }
    if !ad.manifest_ad_tracks.is_empty() {
        sources.push(format!(
            "{} manifest audio description track(s)",
            ad.manifest_ad_tracks.len()
        ));
    }
    if ad.has_ad_selector {
        sources.push("AD selector UI element detected".to_string());
    }
    RuleOutcome::new(
        ComplianceStatus::Pass,
        "Audio description capability detected.",
        format!("Found: {}.", sources.join(", ")),
    )
}

fn audio_description_synchronization(ctx: &Clause7Context<'_>) -> RuleOutcome {
    if !ctx.player_detected || !ctx.audio_description.has_audio_description {
        return RuleOutcome::new(
            ComplianceStatus::NotApplicable,
            "No audio description detected to evaluate synchronization.",
            "Audio description check did not find audio description tracks.",
        );
    }
    RuleOutcome::new(
        ComplianceStatus::NeedsReview,
        "Audio description found. Synchronization with the video content requires manual verification.",
        "AD track(s) detected. Sync quality must be verified by a human auditor.",
    )
}

fn audio_description_preservation(ctx: &Clause7Context<'_>) -> RuleOutcome {
    if !ctx.player_detected {
        return no_player();
    }
    let with_ad = ctx.manifests.iter().filter(|m| m.has_audio_description()).count();
    if with_ad > 0 {
        return RuleOutcome::new(
            ComplianceStatus::Pass,
            "Audio description track is present in the streaming manifest.",
            format!("Found AD audio tracks in {with_ad} manifest(s)."),
        );
    }
    let dom_tracks = ctx.audio_description.dom_description_tracks.len();
    if dom_tracks > 0 {
        return RuleOutcome::new(
            ComplianceStatus::NeedsReview,
            "Audio description provided via a DOM <track> element. Verify preservation in transport and redistribution.",
            format!("{dom_tracks} DOM description track(s) found."),
        );
    }
    RuleOutcome::new(
        ComplianceStatus::NotApplicable,
        "No audio description tracks found in manifests to evaluate preservation.",
        "No AD tracks in manifests or the DOM.",
    )
}

/// Tab stops allowed between play and the caption toggle.
const MAX_CAPTION_DISTANCE: i32 = 3;

fn user_controls(ctx: &Clause7Context<'_>) -> RuleOutcome {
    if !ctx.player_detected {
        return no_player();
    }
    let Some(accessibility) = ctx.accessibility else {
        return RuleOutcome::new(
            ComplianceStatus::NeedsReview,
            "Player accessibility not evaluated.",
            "Player accessibility checks were not run.",
        );
    };
    let kb = &accessibility.keyboard_navigation;

    if !kb.can_tab_into_player {
        return RuleOutcome::new(
            ComplianceStatus::Fail,
            "Cannot tab into the player controls. Keyboard users cannot reach any control, including caption and AD toggles.",
            "No focusable elements found within the player container.",
        );
    }

    let mut issues = Vec::new();
    if kb.tab_stops_to_play == -1 {
        issues.push("Play/pause control not identified as keyboard-reachable".to_string());
    }
    if kb.tab_stops_to_captions == -1 && ctx.captions.has_captions {
        issues.push("Caption toggle not keyboard-reachable despite captions being available".to_string());
    } else if kb.tab_stops_to_play > 0
        && kb.tab_stops_to_captions > 0
        && (kb.tab_stops_to_captions - kb.tab_stops_to_play).abs() > MAX_CAPTION_DISTANCE
    {
        issues.push(format!(
            "Caption control requires {} tab stops vs {} for play, so it may not be at the same interaction level",
            kb.tab_stops_to_captions, kb.tab_stops_to_play
        ));
    }
    if !kb.controls_activatable_with_keyboard {
        issues.push(
            "Controls may not be activatable with Enter/Space (no native <button> or role=\"button\" found)"
                .to_string(),
        );
    }

    if issues.is_empty() {
        return RuleOutcome::new(
            ComplianceStatus::Pass,
            "Player controls including caption/AD toggles are keyboard-accessible and at the same interaction level as primary controls.",
            format!(
                "{} controls reachable via keyboard. Play at tab stop {}, captions at {}.",
                kb.reachable_controls.len(),
                kb.tab_stops_to_play,
                kb.tab_stops_to_captions
            ),
        );
    }

    let or_none = |list: &[String]| if list.is_empty() { "none".to_string() } else { list.join(", ") };
    RuleOutcome::new(
        if issues.len() >= 2 {
            ComplianceStatus::Fail
        } else {
            ComplianceStatus::NeedsReview
        },
        format!("Keyboard accessibility issues found: {}.", issues.join("; ")),
        format!(
            "Reachable: {}. Unreachable: {}.",
            or_none(&kb.reachable_controls),
            or_none(&kb.unreachable_controls)
        ),
    )
}
