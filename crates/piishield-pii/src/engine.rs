//! Boundary operations combining detection and masking

use crate::config::Configuration;
use crate::detector::{PIIDetector, PIIMatch, PIIType, RegexPIIDetector};
use crate::error::Result;
use crate::masker::{PIIMasker, StandardMasker, TokenMap};
use crate::registry::PatternRegistry;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Result of a detect-and-mask call
#[derive(Debug, Clone)]
pub struct DetectionOutcome<'a> {
    /// Final matches, sorted by start and pairwise disjoint
    pub matches: Vec<PIIMatch<'a>>,

    pub masked_text: String,

    /// Masked replacement for each match, in match order
    pub masked_values: Vec<String>,

    /// Present when the configuration retains tokenize output
    pub token_map: Option<TokenMap>,
}

impl DetectionOutcome<'_> {
    pub fn pii_found(&self) -> bool {
        !self.matches.is_empty()
    }

    /// Number of final matches per type
    pub fn counts_by_type(&self) -> BTreeMap<PIIType, usize> {
        count_by_type(&self.matches)
    }
}

/// Number of matches per type
pub fn count_by_type(matches: &[PIIMatch<'_>]) -> BTreeMap<PIIType, usize> {
    let mut counts = BTreeMap::new();
    for m in matches {
        *counts.entry(m.pii_type).or_insert(0) += 1;
    }
    counts
}

/// Detection and masking pipeline over a shared pattern registry
///
/// Holds no per-call state; clone it or share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct PIIShield {
    registry: Arc<PatternRegistry>,
    detector: RegexPIIDetector,
    masker: StandardMasker,
}

impl PIIShield {
    /// Compile the registry and build the pipeline
    pub fn new() -> Result<Self> {
        Ok(Self::with_registry(Arc::new(PatternRegistry::new()?)))
    }

    pub fn with_registry(registry: Arc<PatternRegistry>) -> Self {
        Self {
            detector: RegexPIIDetector::new(registry.clone()),
            masker: StandardMasker::new(registry.clone()),
            registry,
        }
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    pub fn supported_types(&self, config: &Configuration) -> Vec<PIIType> {
        self.detector.supported_types(config)
    }

    /// Find the final, non-overlapping matches in `text`
    pub fn detect<'a>(&self, text: &'a str, config: &Configuration) -> Result<Vec<PIIMatch<'a>>> {
        self.detector.detect(text, config)
    }

    /// Mask previously detected `matches` in `text`
    pub fn mask(
        &self,
        text: &str,
        matches: &[PIIMatch<'_>],
        config: &Configuration,
    ) -> Result<String> {
        self.masker.mask(text, matches, config)
    }

    pub fn detect_and_mask<'a>(
        &self,
        text: &'a str,
        config: &Configuration,
    ) -> Result<DetectionOutcome<'a>> {
        let matches = self.detect(text, config)?;
        let outcome = self.masker.mask_with_tokens(text, &matches, config)?;

        Ok(DetectionOutcome {
            matches,
            masked_text: outcome.masked_text,
            masked_values: outcome.replacements,
            token_map: outcome.token_map,
        })
    }

    /// Detect in each text independently; results keep input order
    pub fn detect_batch<'a, S>(
        &self,
        texts: &'a [S],
        config: &Configuration,
    ) -> Vec<Result<Vec<PIIMatch<'a>>>>
    where
        S: AsRef<str>,
    {
        texts.iter().map(|text| self.detect(text.as_ref(), config)).collect()
    }

    pub fn detect_and_mask_batch<'a, S>(
        &self,
        texts: &'a [S],
        config: &Configuration,
    ) -> Vec<Result<DetectionOutcome<'a>>>
    where
        S: AsRef<str>,
    {
        texts
            .iter()
            .map(|text| self.detect_and_mask(text.as_ref(), config))
            .collect()
    }
}
