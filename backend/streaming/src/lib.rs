pub mod analyzer;
pub mod audio_description;
pub mod caption_checker;
pub mod clause7;
pub mod dom;
pub mod manifest_parser;
pub mod player_accessibility;
pub mod player_detector;

#[cfg(test)]
mod testing;

pub use analyzer::{analyze_loaded_page, prepare, run_analysis, PreparedAnalysis};
pub use audio_description::check_audio_description;
pub use caption_checker::check_captions;
pub use clause7::{map_to_clause7, Clause7Context, ClauseRule, CLAUSE_7_RULES};
pub use manifest_parser::{parse_dash, parse_hls, parse_manifest, parse_manifests};
pub use player_accessibility::check_player_accessibility;
pub use player_detector::{detect_players, PLAYER_PROBES};
