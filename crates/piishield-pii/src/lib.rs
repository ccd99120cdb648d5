//! PII Shield detection and masking core
//!
//! This crate provides the detection-validation-masking pipeline:
//! - Pattern registry for the twelve supported PII types
//! - Candidate matching, per-type validation and overlap resolution
//! - Masking strategies (full, partial, redact, hash, tokenize)
//!
//! The crate performs no I/O and never logs matched values.

pub mod config;
pub mod detector;
pub mod engine;
pub mod error;
pub mod masker;
pub mod registry;

pub use config::Configuration;
pub use detector::{
    ContextKeywords, PIIDetector, PIIMatch, PIIType, RegexPIIDetector, ValidationContext, Verdict,
    find_candidates, resolve, validate,
};
pub use engine::{DetectionOutcome, PIIShield, count_by_type};
pub use error::{DetectionError, Result};
pub use masker::{MaskOutcome, MaskingStrategy, PIIMasker, StandardMasker, TokenMap};
pub use registry::{PatternDefinition, PatternRegistry};
