//! PII masking

mod standard_masker;

pub use standard_masker::StandardMasker;

use crate::config::Configuration;
use crate::detector::PIIMatch;
use crate::error::{DetectionError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a matched span is rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MaskingStrategy {
    /// Replace with a type placeholder such as `[EMAIL]`
    Full,

    /// Keep a few identifying characters, star out the rest
    Partial,

    /// Replace every character with `*`
    Redact,

    /// Replace with a truncated SHA-256 (or HMAC-SHA256) digest
    Hash,

    /// Replace with a random per-call token (reversible via [`TokenMap`])
    Tokenize,
}

impl MaskingStrategy {
    pub const ALL: [MaskingStrategy; 5] = [
        MaskingStrategy::Full,
        MaskingStrategy::Partial,
        MaskingStrategy::Redact,
        MaskingStrategy::Hash,
        MaskingStrategy::Tokenize,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MaskingStrategy::Full => "FULL",
            MaskingStrategy::Partial => "PARTIAL",
            MaskingStrategy::Redact => "REDACT",
            MaskingStrategy::Hash => "HASH",
            MaskingStrategy::Tokenize => "TOKENIZE",
        }
    }
}

impl fmt::Display for MaskingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaskingStrategy {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self> {
        MaskingStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                DetectionError::InvalidConfiguration(format!("unknown masking strategy '{}'", s))
            })
    }
}

/// Tokens issued during one masking call and the values they replaced
///
/// Scoped to a single call and handed back to the caller; never shared.
#[derive(Clone, Default)]
pub struct TokenMap {
    entries: Vec<(String, String)>,
}

impl TokenMap {
    pub fn insert(&mut self, token: String, original: String) {
        self.entries.push((token, original));
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, original)| original.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(token, _)| token.as_str())
    }

    /// Substitute every token in `masked` with its original value
    pub fn restore(&self, masked: &str) -> String {
        self.entries
            .iter()
            .fold(masked.to_string(), |text, (token, original)| {
                text.replace(token.as_str(), original)
            })
    }
}

impl fmt::Debug for TokenMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenMap")
            .field("tokens", &self.entries.len())
            .finish()
    }
}

/// Result of a masking call
#[derive(Debug, Clone)]
pub struct MaskOutcome {
    pub masked_text: String,

    /// Replacement written for each match, in match order
    pub replacements: Vec<String>,

    /// Present only when the configuration asks to retain tokens
    pub token_map: Option<TokenMap>,
}

/// Trait for masking detected PII
pub trait PIIMasker: Send + Sync {
    /// Mask `matches` in `text`, returning replacements and tokens as well
    fn mask_with_tokens(
        &self,
        text: &str,
        matches: &[PIIMatch<'_>],
        config: &Configuration,
    ) -> Result<MaskOutcome>;

    /// Mask `matches` in `text`
    fn mask(&self, text: &str, matches: &[PIIMatch<'_>], config: &Configuration) -> Result<String> {
        self.mask_with_tokens(text, matches, config)
            .map(|outcome| outcome.masked_text)
    }
}
