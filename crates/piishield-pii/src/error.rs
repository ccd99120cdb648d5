//! Error types for PII detection and masking

use crate::detector::PIIType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectionError {
    /// Input is longer than the configured maximum. Nothing was scanned.
    #[error("Input of {length} bytes exceeds the maximum of {max} bytes")]
    SizeExceeded { length: usize, max: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A registry entry failed to compile. Only raised while building the registry.
    #[error("Failed to compile pattern for {pii_type}: {source}")]
    PatternCompilation {
        pii_type: PIIType,
        #[source]
        source: Box<regex::Error>,
    },

    #[error("Failed to build context keyword matcher: {0}")]
    KeywordCompilation(#[from] aho_corasick::BuildError),

    /// Caller-supplied matches do not describe disjoint spans of the text.
    #[error("Invalid match: {0}")]
    InvalidMatch(String),
}

impl DetectionError {
    /// True for errors that can only happen while building the registry
    pub fn is_startup_error(&self) -> bool {
        matches!(
            self,
            DetectionError::PatternCompilation { .. } | DetectionError::KeywordCompilation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DetectionError>;
