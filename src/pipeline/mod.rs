//! Batch-processing pipeline: routing, per-item processing, batch coordination

pub mod batch;
pub mod item;
pub mod response;

pub use batch::{BatchCoordinator, BatchResult, ItemOutcome, SkipReason};
pub use item::{ItemError, ItemProcessor, ProcessedItem, StageTimings};
pub use response::InvocationResponse;

use crate::config::PipelineConfig;

/// Routing classification for one work item, evaluated before any fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Eligible,
    SkipWrongPrefix,
    SkipAlreadyThumbnail,
}

/// Classify a source key. Pure and side-effect-free: eligible iff the key
/// starts with the source prefix and not with the output prefix.
pub fn route_for(source_key: &str, config: &PipelineConfig) -> Route {
    if source_key.starts_with(&config.output_prefix) {
        Route::SkipAlreadyThumbnail
    } else if source_key.starts_with(&config.source_prefix) {
        Route::Eligible
    } else {
        Route::SkipWrongPrefix
    }
}

/// Derive the thumbnail key from an eligible source key.
///
/// Textual substitution: exactly the first occurrence of the source prefix
/// is replaced with the output prefix.
pub fn thumbnail_key(source_key: &str, config: &PipelineConfig) -> String {
    source_key.replacen(&config.source_prefix, &config.output_prefix, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    #[test]
    fn test_route_eligible() {
        assert_eq!(route_for("images/a.jpg", &config()), Route::Eligible);
    }

    #[test]
    fn test_route_wrong_prefix() {
        assert_eq!(route_for("other/x.png", &config()), Route::SkipWrongPrefix);
        assert_eq!(route_for("a.jpg", &config()), Route::SkipWrongPrefix);
    }

    #[test]
    fn test_route_already_thumbnail() {
        assert_eq!(
            route_for("thumbnails/x.jpg", &config()),
            Route::SkipAlreadyThumbnail
        );
    }

    #[test]
    fn test_thumbnail_key() {
        assert_eq!(
            thumbnail_key("images/a.jpg", &config()),
            "thumbnails/a.jpg"
        );
    }

    #[test]
    fn test_thumbnail_key_replaces_first_occurrence_only() {
        assert_eq!(
            thumbnail_key("images/images/x.jpg", &config()),
            "thumbnails/images/x.jpg"
        );
    }

    #[test]
    fn test_thumbnail_key_nested() {
        assert_eq!(
            thumbnail_key("images/2024/trip/photo.jpg", &config()),
            "thumbnails/2024/trip/photo.jpg"
        );
    }
}
