use serde::{Deserialize, Serialize};

use crate::checks::{AudioDescriptionCheckResult, CaptionCheckResult, PlayerAccessibilityResult};
use crate::finding::{FindingSummary, StreamingFinding};
use crate::manifest::ManifestInfo;
use crate::player::DetectedPlayer;

/// Everything one analysis pass produced. The sole hand-off to report assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingAnalysisResult {
    pub player_detected: bool,
    pub player_type: Option<String>,
    pub player_version: Option<String>,
    pub players: Vec<DetectedPlayer>,
    pub captions: CaptionCheckResult,
    pub audio_description: AudioDescriptionCheckResult,
    pub player_accessibility: Option<PlayerAccessibilityResult>,
    pub manifests: Vec<ManifestInfo>,
    pub findings: Vec<StreamingFinding>,
}

impl StreamingAnalysisResult {
    pub fn primary_player(&self) -> Option<&DetectedPlayer> {
        self.players.first()
    }

    pub fn summary(&self) -> FindingSummary {
        FindingSummary::from_findings(&self.findings)
    }
}
