//! Per-call detection and masking configuration

use crate::detector::PIIType;
use crate::error::{DetectionError, Result};
use crate::masker::MaskingStrategy;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.7;
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 1_000_000;
pub const DEFAULT_HASH_LENGTH: usize = 12;
pub const DEFAULT_CONTEXT_WINDOW: usize = 50;

/// Longest hex digest HASH masking can emit (full SHA-256)
pub const MAX_HASH_LENGTH: usize = 64;

/// Configuration for a detection or masking call
///
/// Built once per request and never mutated while a call is running.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Minimum confidence a match needs to survive overlap resolution
    pub confidence_threshold: f32,

    /// Per-type masking strategy overrides (registry default otherwise)
    pub strategy_overrides: HashMap<PIIType, MaskingStrategy>,

    /// Types that are not scanned at all
    pub disabled_types: HashSet<PIIType>,

    /// Maximum input size in bytes
    pub max_text_length: usize,

    /// Per-type overrides of the characters left visible by partial masking
    pub partial_visible: HashMap<PIIType, usize>,

    /// Number of hex characters emitted by hash masking
    pub hash_length: usize,

    /// Key for HMAC-SHA256 digests; plain SHA-256 when unset
    #[serde(skip_serializing)]
    pub hash_secret: Option<String>,

    /// Return the token map produced by tokenize masking
    pub retain_token_map: bool,

    /// Characters inspected on each side of a match by context heuristics
    pub context_window: usize,

    /// Date used for date-of-birth plausibility (today when unset)
    pub reference_date: Option<NaiveDate>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            strategy_overrides: HashMap::new(),
            disabled_types: HashSet::new(),
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
            partial_visible: HashMap::new(),
            hash_length: DEFAULT_HASH_LENGTH,
            hash_secret: None,
            retain_token_map: false,
            context_window: DEFAULT_CONTEXT_WINDOW,
            reference_date: None,
        }
    }
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("confidence_threshold", &self.confidence_threshold)
            .field("strategy_overrides", &self.strategy_overrides)
            .field("disabled_types", &self.disabled_types)
            .field("max_text_length", &self.max_text_length)
            .field("partial_visible", &self.partial_visible)
            .field("hash_length", &self.hash_length)
            .field("hash_secret", &self.hash_secret.as_ref().map(|_| "<set>"))
            .field("retain_token_map", &self.retain_token_map)
            .field("context_window", &self.context_window)
            .field("reference_date", &self.reference_date)
            .finish()
    }
}

impl Configuration {
    /// Check value ranges. Every boundary operation calls this first.
    pub fn validate(&self) -> Result<()> {
        if !self.confidence_threshold.is_finite()
            || !(0.0..=1.0).contains(&self.confidence_threshold)
        {
            return Err(DetectionError::InvalidConfiguration(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }

        if self.max_text_length == 0 {
            return Err(DetectionError::InvalidConfiguration(
                "max_text_length must be at least 1".to_string(),
            ));
        }

        if self.hash_length == 0 || self.hash_length > MAX_HASH_LENGTH {
            return Err(DetectionError::InvalidConfiguration(format!(
                "hash_length must be within 1..={}, got {}",
                MAX_HASH_LENGTH, self.hash_length
            )));
        }

        if self.disabled_types.len() == PIIType::ALL.len() {
            return Err(DetectionError::InvalidConfiguration(
                "at least one PII type must be enabled".to_string(),
            ));
        }

        Ok(())
    }

    pub fn is_enabled(&self, pii_type: PIIType) -> bool {
        !self.disabled_types.contains(&pii_type)
    }

    /// Strategy override for `pii_type`, if any
    pub fn strategy_override(&self, pii_type: PIIType) -> Option<MaskingStrategy> {
        self.strategy_overrides.get(&pii_type).copied()
    }

    pub fn partial_visible_for(&self, pii_type: PIIType) -> usize {
        self.partial_visible
            .get(&pii_type)
            .copied()
            .unwrap_or_else(|| pii_type.default_partial_visible())
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_strategy(mut self, pii_type: PIIType, strategy: MaskingStrategy) -> Self {
        self.strategy_overrides.insert(pii_type, strategy);
        self
    }

    /// Apply the same strategy to every type
    pub fn with_all_strategies(mut self, strategy: MaskingStrategy) -> Self {
        for pii_type in PIIType::ALL {
            self.strategy_overrides.insert(pii_type, strategy);
        }
        self
    }

    /// Override a strategy using wire names, e.g. `("ssn", "partial")`
    pub fn with_named_strategy(self, pii_type: &str, strategy: &str) -> Result<Self> {
        Ok(self.with_strategy(pii_type.parse()?, strategy.parse()?))
    }

    pub fn with_disabled(mut self, pii_type: PIIType) -> Self {
        self.disabled_types.insert(pii_type);
        self
    }

    /// Restrict scanning to the given types
    pub fn with_only<I>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = PIIType>,
    {
        let enabled: HashSet<PIIType> = types.into_iter().collect();
        self.disabled_types = PIIType::ALL
            .into_iter()
            .filter(|pii_type| !enabled.contains(pii_type))
            .collect();
        self
    }

    pub fn with_max_text_length(mut self, max_text_length: usize) -> Self {
        self.max_text_length = max_text_length;
        self
    }

    pub fn with_partial_visible(mut self, pii_type: PIIType, visible: usize) -> Self {
        self.partial_visible.insert(pii_type, visible);
        self
    }

    pub fn with_hash_length(mut self, hash_length: usize) -> Self {
        self.hash_length = hash_length;
        self
    }

    pub fn with_hash_secret(mut self, secret: impl Into<String>) -> Self {
        self.hash_secret = Some(secret.into());
        self
    }

    pub fn with_token_map(mut self, retain: bool) -> Self {
        self.retain_token_map = retain;
        self
    }

    pub fn with_context_window(mut self, chars: usize) -> Self {
        self.context_window = chars;
        self
    }

    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Configuration::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.confidence_threshold, 0.7);
        assert!(PIIType::ALL.iter().all(|t| config.is_enabled(*t)));
    }

    #[test]
    fn test_threshold_out_of_range() {
        for threshold in [-0.1, 1.5, f32::NAN] {
            let config = Configuration::default().with_threshold(threshold);
            assert!(matches!(
                config.validate(),
                Err(DetectionError::InvalidConfiguration(_))
            ));
        }

        assert!(Configuration::default().with_threshold(0.0).validate().is_ok());
        assert!(Configuration::default().with_threshold(1.0).validate().is_ok());
    }

    #[test]
    fn test_hash_length_bounds() {
        assert!(Configuration::default().with_hash_length(0).validate().is_err());
        assert!(Configuration::default().with_hash_length(65).validate().is_err());
        assert!(Configuration::default().with_hash_length(64).validate().is_ok());
    }

    #[test]
    fn test_named_strategy_unknown_type() {
        let result = Configuration::default().with_named_strategy("favorite_color", "full");
        assert!(matches!(result, Err(DetectionError::InvalidConfiguration(_))));

        let result = Configuration::default().with_named_strategy("ssn", "scramble");
        assert!(matches!(result, Err(DetectionError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_named_strategy() {
        let config = Configuration::default()
            .with_named_strategy("ssn", "partial")
            .unwrap()
            .with_named_strategy("Email", "FULL")
            .unwrap();

        assert_eq!(
            config.strategy_override(PIIType::SSN),
            Some(MaskingStrategy::Partial)
        );
        assert_eq!(
            config.strategy_override(PIIType::Email),
            Some(MaskingStrategy::Full)
        );
        assert_eq!(config.strategy_override(PIIType::Phone), None);
    }

    #[test]
    fn test_with_only() {
        let config = Configuration::default().with_only([PIIType::Email, PIIType::SSN]);
        assert!(config.is_enabled(PIIType::Email));
        assert!(config.is_enabled(PIIType::SSN));
        assert!(!config.is_enabled(PIIType::Phone));
        assert_eq!(config.disabled_types.len(), 10);
    }

    #[test]
    fn test_all_disabled_is_invalid() {
        let config = Configuration::default().with_only([]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_visible_override() {
        let config = Configuration::default().with_partial_visible(PIIType::SSN, 2);
        assert_eq!(config.partial_visible_for(PIIType::SSN), 2);
        assert_eq!(config.partial_visible_for(PIIType::CreditCard), 4);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: Configuration = serde_json::from_str(
            r#"{"confidence_threshold": 0.9, "strategy_overrides": {"EMAIL": "REDACT"}}"#,
        )
        .unwrap();

        assert_eq!(config.confidence_threshold, 0.9);
        assert_eq!(
            config.strategy_override(PIIType::Email),
            Some(MaskingStrategy::Redact)
        );
        assert_eq!(config.max_text_length, DEFAULT_MAX_TEXT_LENGTH);
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = Configuration::default().with_hash_secret("hunter2");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<set>"));
    }
}
