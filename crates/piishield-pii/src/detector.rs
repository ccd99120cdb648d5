//! PII detectors

mod candidates;
mod overlap;
mod regex_detector;
mod validators;

pub use candidates::find_candidates;
pub use overlap::resolve;
pub use regex_detector::RegexPIIDetector;
pub use validators::{
    ContextKeywords, KeywordSet, ValidationContext, ValidatorFn, Verdict, email_is_valid,
    ipv4_is_valid, luhn_is_valid, phone_is_valid, ssn_is_valid, validate, validator_for,
};

use crate::config::Configuration;
use crate::error::{DetectionError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Types of PII that can be detected
///
/// Declaration order is the registry order and therefore the tie-break
/// priority used during overlap resolution (earlier wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PIIType {
    /// Credit card number
    CreditCard,

    /// Social Security Number
    #[serde(rename = "SSN")]
    SSN,

    /// Email address
    Email,

    /// Phone number
    Phone,

    /// Person name
    PersonName,

    /// Street address
    Address,

    /// IPv4 address
    #[serde(rename = "IP_ADDRESS")]
    IPAddress,

    /// Date of birth
    DateOfBirth,

    /// Passport number
    Passport,

    /// Driver license number
    DriverLicense,

    /// Bank account number
    BankAccount,

    /// Tax identification number (EIN)
    TaxId,
}

impl PIIType {
    /// All types in registry order
    pub const ALL: [PIIType; 12] = [
        PIIType::CreditCard,
        PIIType::SSN,
        PIIType::Email,
        PIIType::Phone,
        PIIType::PersonName,
        PIIType::Address,
        PIIType::IPAddress,
        PIIType::DateOfBirth,
        PIIType::Passport,
        PIIType::DriverLicense,
        PIIType::BankAccount,
        PIIType::TaxId,
    ];

    /// Registry index; lower values win overlap ties
    pub fn priority(self) -> usize {
        self as usize
    }

    /// Wire name, also used inside placeholders (`[EMAIL]`)
    pub fn label(self) -> &'static str {
        match self {
            PIIType::CreditCard => "CREDIT_CARD",
            PIIType::SSN => "SSN",
            PIIType::Email => "EMAIL",
            PIIType::Phone => "PHONE",
            PIIType::PersonName => "PERSON_NAME",
            PIIType::Address => "ADDRESS",
            PIIType::IPAddress => "IP_ADDRESS",
            PIIType::DateOfBirth => "DATE_OF_BIRTH",
            PIIType::Passport => "PASSPORT",
            PIIType::DriverLicense => "DRIVER_LICENSE",
            PIIType::BankAccount => "BANK_ACCOUNT",
            PIIType::TaxId => "TAX_ID",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            PIIType::CreditCard => "Credit Card",
            PIIType::SSN => "Social Security Number",
            PIIType::Email => "Email Address",
            PIIType::Phone => "Phone Number",
            PIIType::PersonName => "Person Name",
            PIIType::Address => "Street Address",
            PIIType::IPAddress => "IP Address",
            PIIType::DateOfBirth => "Date of Birth",
            PIIType::Passport => "Passport Number",
            PIIType::DriverLicense => "Driver's License",
            PIIType::BankAccount => "Bank Account",
            PIIType::TaxId => "Tax ID",
        }
    }

    /// Default number of characters left visible by partial masking.
    ///
    /// For emails this is the local-part prefix, for names the prefix of
    /// every token, and for everything else the trailing alphanumerics.
    pub fn default_partial_visible(self) -> usize {
        match self {
            PIIType::CreditCard | PIIType::SSN | PIIType::Phone | PIIType::BankAccount => 4,
            PIIType::Passport | PIIType::DriverLicense | PIIType::TaxId => 2,
            PIIType::Email | PIIType::PersonName => 1,
            PIIType::Address | PIIType::IPAddress | PIIType::DateOfBirth => 0,
        }
    }
}

impl fmt::Display for PIIType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PIIType {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");

        let pii_type = match normalized.as_str() {
            "CREDIT_CARD" | "CARD" => PIIType::CreditCard,
            "SSN" => PIIType::SSN,
            "EMAIL" => PIIType::Email,
            "PHONE" => PIIType::Phone,
            "PERSON_NAME" | "NAME" => PIIType::PersonName,
            "ADDRESS" => PIIType::Address,
            "IP_ADDRESS" | "IPV4" | "IP" => PIIType::IPAddress,
            "DATE_OF_BIRTH" | "DOB" => PIIType::DateOfBirth,
            "PASSPORT" => PIIType::Passport,
            "DRIVER_LICENSE" => PIIType::DriverLicense,
            "BANK_ACCOUNT" => PIIType::BankAccount,
            "TAX_ID" | "EIN" => PIIType::TaxId,
            _ => {
                return Err(DetectionError::InvalidConfiguration(format!(
                    "unknown PII type '{}'",
                    s
                )));
            }
        };

        Ok(pii_type)
    }
}

/// A detected span of PII
///
/// Borrows the scanned text. `raw_value` is never serialized and is elided
/// from `Debug` output so matches can be logged safely.
#[derive(Clone, PartialEq, Serialize)]
pub struct PIIMatch<'a> {
    /// Type of PII detected
    pub pii_type: PIIType,

    /// Start byte offset in the text
    pub start: usize,

    /// End byte offset in the text (exclusive)
    pub end: usize,

    /// The matched slice of the source text
    #[serde(skip_serializing)]
    pub raw_value: &'a str,

    /// Confidence score (0.0 to 1.0)
    pub confidence: f32,

    /// Whether a hard validator accepted the value
    pub validated: bool,
}

impl<'a> PIIMatch<'a> {
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn overlaps(&self, other: &PIIMatch<'_>) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Debug for PIIMatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PIIMatch")
            .field("pii_type", &self.pii_type)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("raw_value", &format_args!("<{} bytes>", self.raw_value.len()))
            .field("confidence", &self.confidence)
            .field("validated", &self.validated)
            .finish()
    }
}

/// Trait for detecting PII in text
pub trait PIIDetector: Send + Sync {
    /// Detect PII in the given text, returning disjoint matches sorted by start
    fn detect<'a>(&self, text: &'a str, config: &Configuration) -> Result<Vec<PIIMatch<'a>>>;

    /// Get the types of PII this detector will look for under `config`
    fn supported_types(&self, config: &Configuration) -> Vec<PIIType>;
}
