//! Registry-driven PII detector

use super::{PIIDetector, PIIMatch, PIIType, ValidationContext, find_candidates, resolve, validate};
use crate::config::Configuration;
use crate::error::Result;
use crate::registry::PatternRegistry;
use chrono::Utc;
use std::sync::Arc;

/// Detector running the registry patterns, validators and overlap resolver
#[derive(Debug, Clone)]
pub struct RegexPIIDetector {
    registry: Arc<PatternRegistry>,
}

impl RegexPIIDetector {
    pub fn new(registry: Arc<PatternRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    /// Run each candidate through its validator.
    ///
    /// Rejected candidates are dropped. Survivors take the validator's
    /// confidence and are marked validated when their type requires it.
    fn validate_candidates<'a>(
        &self,
        text: &'a str,
        candidates: Vec<PIIMatch<'a>>,
        config: &Configuration,
    ) -> Vec<PIIMatch<'a>> {
        let reference_date = config
            .reference_date
            .unwrap_or_else(|| Utc::now().date_naive());
        let keywords = self.registry.keywords();

        candidates
            .into_iter()
            .filter_map(|mut candidate| {
                let ctx = ValidationContext::around(
                    text,
                    candidate.start,
                    candidate.end,
                    config.context_window,
                    keywords,
                    reference_date,
                );

                let verdict = validate(candidate.pii_type, candidate.raw_value, &ctx);
                if !verdict.accept {
                    return None;
                }

                candidate.confidence = verdict.confidence;
                candidate.validated = self.registry.get(candidate.pii_type).requires_validation;
                Some(candidate)
            })
            .collect()
    }
}

impl PIIDetector for RegexPIIDetector {
    fn detect<'a>(&self, text: &'a str, config: &Configuration) -> Result<Vec<PIIMatch<'a>>> {
        config.validate()?;

        let candidates = find_candidates(text, &self.registry, config)?;
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let validated = self.validate_candidates(text, candidates, config);
        Ok(resolve(validated, config.confidence_threshold))
    }

    fn supported_types(&self, config: &Configuration) -> Vec<PIIType> {
        self.registry
            .list_patterns()
            .iter()
            .map(|d| d.pii_type)
            .filter(|t| config.is_enabled(*t))
            .collect()
    }
}
