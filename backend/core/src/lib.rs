pub mod analysis;
pub mod checks;
pub mod error;
pub mod finding;
pub mod manifest;
pub mod player;
pub mod traits;

pub use analysis::StreamingAnalysisResult;
pub use checks::{
    AriaButtonInfo, AriaLabelResult, AudioDescriptionCheckResult, CaptionCheckResult,
    CaptionCustomizationResult, DomTrackInfo, FocusIndicatorResult, KeyboardNavigationResult,
    PlayerAccessibilityResult, PlayerApiTrackInfo,
};
pub use error::{AuditError, PageResult};
pub use finding::{ComplianceStatus, FindingSummary, Severity, StreamingFinding};
pub use manifest::{AudioTrack, InterceptedManifest, ManifestFormat, ManifestInfo, ManifestTrack};
pub use player::{DetectedPlayer, MediaElementInfo, MediaKind, PlayerSdk};
pub use traits::{ElementHandle, ManifestFeed, PageState};
