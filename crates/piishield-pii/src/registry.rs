//! Pattern registry
//!
//! Immutable catalog with one compiled pattern per [`PIIType`], built once at
//! startup and shared by reference. Registry order is the tie-break priority
//! used by overlap resolution.
//!
//! All patterns use bounded quantifiers. The `regex` crate guarantees linear
//! time matching, so adversarial input cannot trigger backtracking blowups.

use crate::detector::{ContextKeywords, PIIType};
use crate::error::{DetectionError, Result};
use crate::masker::MaskingStrategy;
use regex::Regex;
use std::borrow::Cow;

/// Honorifics accepted in front of a person name
pub const NAME_HONORIFICS: &[&str] = &[
    "Mr", "Mrs", "Ms", "Miss", "Dr", "Prof", "Rev", "Sir", "Dame", "Capt", "Col", "Gen", "Lt",
    "Sgt", "Hon",
];

/// First names that start an unprefixed person-name candidate
pub const COMMON_FIRST_NAMES: &[&str] = &[
    "James", "John", "Robert", "Michael", "William", "David", "Richard", "Joseph", "Thomas",
    "Charles", "Christopher", "Daniel", "Matthew", "Anthony", "Mark", "Donald", "Steven", "Paul",
    "Andrew", "Joshua", "Kenneth", "Kevin", "Brian", "George", "Edward", "Ronald", "Timothy",
    "Jason", "Jeffrey", "Ryan", "Mary", "Patricia", "Jennifer", "Linda", "Barbara", "Elizabeth",
    "Susan", "Jessica", "Sarah", "Karen", "Nancy", "Lisa", "Betty", "Margaret", "Sandra", "Ashley",
    "Kimberly", "Emily", "Donna", "Michelle", "Dorothy", "Carol", "Amanda", "Melissa", "Deborah",
    "Stephanie", "Rebecca", "Sharon", "Laura", "Cynthia", "Kathleen", "Amy", "Angela", "Shirley",
    "Anna", "Brenda", "Pamela", "Emma", "Nicole", "Helen", "Samantha", "Katherine", "Jane",
];

/// Street-type keywords that terminate an address candidate
pub const STREET_TYPES: &[&str] = &[
    "street", "st", "avenue", "ave", "road", "rd", "boulevard", "blvd", "lane", "ln", "drive",
    "dr", "court", "ct", "circle", "cir", "way", "place", "pl", "terrace", "ter", "parkway",
    "pkwy", "highway", "hwy", "trail", "trl", "alley", "plaza", "square", "sq", "loop",
];

/// Definition of a PII pattern with metadata
#[derive(Debug, Clone)]
pub struct PatternDefinition {
    pub pii_type: PIIType,

    /// Compiled pattern
    pub pattern: Regex,

    /// Confidence assigned to raw candidates before validation
    pub base_confidence: f32,

    /// Whether a failed validator discards the candidate outright
    pub requires_validation: bool,

    pub description: &'static str,

    /// Masking strategy used when the configuration has no override
    pub default_strategy: MaskingStrategy,
}

/// Central registry for all PII detection patterns
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    definitions: Vec<PatternDefinition>,
    keywords: ContextKeywords,
}

impl PatternRegistry {
    /// Compile every pattern. Fails only on a malformed registry entry.
    pub fn new() -> Result<Self> {
        let definitions = PIIType::ALL
            .into_iter()
            .map(compile_definition)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            definitions,
            keywords: ContextKeywords::new()?,
        })
    }

    /// All definitions in priority order
    pub fn list_patterns(&self) -> &[PatternDefinition] {
        &self.definitions
    }

    pub fn get(&self, pii_type: PIIType) -> &PatternDefinition {
        // Built from PIIType::ALL, so the index is the priority
        &self.definitions[pii_type.priority()]
    }

    /// Context keyword matchers shared by the heuristic validators
    pub fn keywords(&self) -> &ContextKeywords {
        &self.keywords
    }
}

fn compile_definition(pii_type: PIIType) -> Result<PatternDefinition> {
    let source = pattern_source(pii_type);
    let pattern = Regex::new(&source).map_err(|e| DetectionError::PatternCompilation {
        pii_type,
        source: Box::new(e),
    })?;

    let (base_confidence, requires_validation, default_strategy, description) = match pii_type {
        PIIType::CreditCard => (
            0.90,
            true,
            MaskingStrategy::Partial,
            "Visa, Mastercard, American Express or Discover card number",
        ),
        PIIType::SSN => (
            0.98,
            true,
            MaskingStrategy::Partial,
            "US Social Security Number",
        ),
        PIIType::Email => (0.99, true, MaskingStrategy::Partial, "Email address"),
        PIIType::Phone => (
            0.85,
            true,
            MaskingStrategy::Partial,
            "US phone number with optional country code",
        ),
        PIIType::PersonName => (
            0.70,
            false,
            MaskingStrategy::Partial,
            "Person name with honorific or common first name",
        ),
        PIIType::Address => (0.75, false, MaskingStrategy::Full, "US street address"),
        PIIType::IPAddress => (0.90, true, MaskingStrategy::Full, "IPv4 address"),
        PIIType::DateOfBirth => (
            0.75,
            true,
            MaskingStrategy::Full,
            "Date of birth (MM/DD/YYYY, DD/MM/YYYY or YYYY-MM-DD)",
        ),
        PIIType::Passport => (0.70, false, MaskingStrategy::Full, "US passport number"),
        PIIType::DriverLicense => (
            0.65,
            false,
            MaskingStrategy::Full,
            "Driver license number",
        ),
        PIIType::BankAccount => (
            0.50,
            false,
            MaskingStrategy::Partial,
            "Bank account number",
        ),
        PIIType::TaxId => (
            0.75,
            false,
            MaskingStrategy::Full,
            "Employer identification number",
        ),
    };

    Ok(PatternDefinition {
        pii_type,
        pattern,
        base_confidence,
        requires_validation,
        description,
        default_strategy,
    })
}

fn pattern_source(pii_type: PIIType) -> Cow<'static, str> {
    match pii_type {
        PIIType::CreditCard => Cow::Borrowed(concat!(
            r"\b(?:4\d{3}|5[1-5]\d{2}|2[2-7]\d{2}|6(?:011|5\d{2}))(?:[ -]?\d{4}){3}\b",
            r"|\b3[47]\d{2}[ -]?\d{6}[ -]?\d{5}\b",
        )),
        PIIType::SSN => Cow::Borrowed(r"\b\d{3}(?:-\d{2}-| \d{2} |\d{2})\d{4}\b"),
        PIIType::Email => Cow::Borrowed(
            r"\b[A-Za-z0-9._%+-]{1,64}@[A-Za-z0-9.-]{1,253}\.[A-Za-z]{2,24}\b",
        ),
        PIIType::Phone => Cow::Borrowed(
            r"(?:\+?\b1[ .-]?)?(?:\(\d{3}\)|\b\d{3})[ .-]?\d{3}[ .-]?\d{4}\b",
        ),
        PIIType::PersonName => Cow::Owned(format!(
            concat!(
                r"\b(?:(?:{})\.? +[A-Z][a-z]{{1,24}}(?: +[A-Z][a-z]{{1,24}}){{0,2}}",
                r"|(?:{})(?: +[A-Z][a-z]{{1,24}}){{1,2}})\b",
            ),
            NAME_HONORIFICS.join("|"),
            COMMON_FIRST_NAMES.join("|"),
        )),
        PIIType::Address => Cow::Owned(format!(
            r"\b\d{{1,6}}(?: +[A-Z][a-z]{{1,24}}){{1,4}} +(?i:{})\b",
            STREET_TYPES.join("|"),
        )),
        PIIType::IPAddress => Cow::Borrowed(r"\b(?:\d{1,3}\.){3}\d{1,3}\b"),
        PIIType::DateOfBirth => {
            Cow::Borrowed(r"\b(?:\d{1,2}[/-]\d{1,2}[/-]\d{4}|\d{4}-\d{2}-\d{2})\b")
        }
        PIIType::Passport => Cow::Borrowed(r"\b[A-Z]{1,2}\d{6,9}\b"),
        PIIType::DriverLicense => Cow::Borrowed(r"\b[A-Z]\d{7,12}\b"),
        PIIType::BankAccount => Cow::Borrowed(r"\b\d{8,17}\b"),
        PIIType::TaxId => Cow::Borrowed(r"\b\d{2}-?\d{7}\b"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_order_matches_priority() {
        let registry = PatternRegistry::new().unwrap();
        let types: Vec<PIIType> = registry
            .list_patterns()
            .iter()
            .map(|d| d.pii_type)
            .collect();

        assert_eq!(types, PIIType::ALL.to_vec());
        assert_eq!(types[0], PIIType::CreditCard);
        assert_eq!(types[11], PIIType::TaxId);
    }

    #[test]
    fn test_confidences_in_range() {
        let registry = PatternRegistry::new().unwrap();
        for definition in registry.list_patterns() {
            assert!((0.0..=1.0).contains(&definition.base_confidence));
            assert!(!definition.description.is_empty());
        }
    }

    #[test]
    fn test_hard_validated_types() {
        let registry = PatternRegistry::new().unwrap();
        let validated: Vec<PIIType> = registry
            .list_patterns()
            .iter()
            .filter(|d| d.requires_validation)
            .map(|d| d.pii_type)
            .collect();

        assert_eq!(
            validated,
            vec![
                PIIType::CreditCard,
                PIIType::SSN,
                PIIType::Email,
                PIIType::Phone,
                PIIType::IPAddress,
                PIIType::DateOfBirth,
            ]
        );
    }

    #[test]
    fn test_get_by_type() {
        let registry = PatternRegistry::new().unwrap();
        for pii_type in PIIType::ALL {
            assert_eq!(registry.get(pii_type).pii_type, pii_type);
        }
        assert_eq!(
            registry.get(PIIType::Address).default_strategy,
            MaskingStrategy::Full
        );
    }

    #[test]
    fn test_patterns_find_expected_shapes() {
        let registry = PatternRegistry::new().unwrap();
        let cases = [
            (PIIType::CreditCard, "card 4532-0151-1283-0366 here", "4532-0151-1283-0366"),
            (PIIType::CreditCard, "amex 3782 822463 10005", "3782 822463 10005"),
            (PIIType::SSN, "ssn 123 45 6789", "123 45 6789"),
            (PIIType::Email, "mail j@x.com.", "j@x.com"),
            (PIIType::Phone, "call (555) 123-4567", "(555) 123-4567"),
            (PIIType::Phone, "call +1 555-987-6543", "+1 555-987-6543"),
            (PIIType::PersonName, "Contact John Smith today", "John Smith"),
            (PIIType::PersonName, "Dr. Jane Doe said", "Dr. Jane Doe"),
            (PIIType::Address, "at 742 Evergreen Terrace.", "742 Evergreen Terrace"),
            (PIIType::IPAddress, "from 10.0.0.255 ok", "10.0.0.255"),
            (PIIType::DateOfBirth, "born 1985-03-15", "1985-03-15"),
            (PIIType::Passport, "passport AB1234567", "AB1234567"),
            (PIIType::DriverLicense, "DL D12345678", "D12345678"),
            (PIIType::BankAccount, "acct 123456789012", "123456789012"),
            (PIIType::TaxId, "EIN 12-3456789", "12-3456789"),
        ];

        for (pii_type, text, expected) in cases {
            let found = registry.get(pii_type).pattern.find(text).map(|m| m.as_str());
            assert_eq!(found, Some(expected), "{} in {:?}", pii_type, text);
        }
    }

    #[test]
    fn test_ssn_pattern_rejects_mixed_separators() {
        let registry = PatternRegistry::new().unwrap();
        assert!(registry.get(PIIType::SSN).pattern.find("123-45 6789").is_none());
    }

    #[test]
    fn test_placeholders_do_not_match() {
        let registry = PatternRegistry::new().unwrap();
        let text = "[CREDIT_CARD] [SSN] [EMAIL] [PHONE] [PERSON_NAME] [ADDRESS] [IP_ADDRESS] \
                    [DATE_OF_BIRTH] [PASSPORT] [DRIVER_LICENSE] [BANK_ACCOUNT] [TAX_ID] *********";

        for definition in registry.list_patterns() {
            assert!(
                definition.pattern.find(text).is_none(),
                "{} matched a placeholder",
                definition.pii_type
            );
        }
    }
}
