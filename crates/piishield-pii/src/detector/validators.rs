//! Per-type validators
//!
//! One pure function per [`PIIType`], dispatched through [`validator_for`].
//! Hard validators (card, SSN, email, phone, IPv4, date of birth) reject
//! malformed values outright. The remaining types use context heuristics
//! that only adjust confidence after a basic shape check.

use super::PIIType;
use crate::error::Result;
use crate::registry::{COMMON_FIRST_NAMES, NAME_HONORIFICS, STREET_TYPES};
use aho_corasick::AhoCorasick;
use chrono::{Datelike, NaiveDate};

/// Result of validating a single candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub accept: bool,
    pub confidence: f32,
}

impl Verdict {
    pub fn accepted(confidence: f32) -> Self {
        Self {
            accept: true,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn rejected() -> Self {
        Self {
            accept: false,
            confidence: 0.0,
        }
    }
}

/// Signature shared by every validator
pub type ValidatorFn = fn(&str, &ValidationContext<'_>) -> Verdict;

/// Keyword families consulted by the context heuristics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordSet {
    NamePositive,
    NameNegative,
    Address,
    Birth,
    Passport,
    License,
    Account,
    Tax,
}

impl KeywordSet {
    pub const ALL: [KeywordSet; 8] = [
        KeywordSet::NamePositive,
        KeywordSet::NameNegative,
        KeywordSet::Address,
        KeywordSet::Birth,
        KeywordSet::Passport,
        KeywordSet::License,
        KeywordSet::Account,
        KeywordSet::Tax,
    ];

    fn words(self) -> &'static [&'static str] {
        match self {
            KeywordSet::NamePositive => &[
                "name",
                "called",
                "contact",
                "from",
                "by",
                "to",
                "dear",
                "sincerely",
                "regards",
                "attn",
                "attention",
            ],
            KeywordSet::NameNegative => &[
                "file",
                "folder",
                "document",
                "system",
                "server",
                "application",
                "program",
                "code",
                "variable",
                "class",
            ],
            KeywordSet::Address => &[
                "address",
                "located",
                "live",
                "lives",
                "office",
                "building",
                "suite",
                "floor",
                "unit",
                "apt",
                "apartment",
                "ship",
                "deliver",
            ],
            KeywordSet::Birth => &["born", "birth", "birthday", "birthdate", "dob"],
            KeywordSet::Passport => &["passport"],
            KeywordSet::License => &["license", "licence", "dl", "driver", "driving"],
            KeywordSet::Account => &["account", "acct", "bank", "routing", "iban"],
            KeywordSet::Tax => &["ein", "tin", "tax", "employer"],
        }
    }
}

/// Case-insensitive whole-word keyword matchers, one automaton per set
#[derive(Debug, Clone)]
pub struct ContextKeywords {
    matchers: Vec<AhoCorasick>,
}

impl ContextKeywords {
    pub fn new() -> Result<Self> {
        let matchers = KeywordSet::ALL
            .into_iter()
            .map(|set| {
                AhoCorasick::builder()
                    .ascii_case_insensitive(true)
                    .build(set.words())
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self { matchers })
    }

    /// True if any keyword of `set` occurs in `haystack` as a whole word
    pub fn contains(&self, set: KeywordSet, haystack: &str) -> bool {
        let bytes = haystack.as_bytes();
        self.matchers[set as usize]
            .find_overlapping_iter(haystack)
            .any(|m| {
                let clear_before = m.start() == 0 || !bytes[m.start() - 1].is_ascii_alphanumeric();
                let clear_after = m.end() == bytes.len() || !bytes[m.end()].is_ascii_alphanumeric();
                clear_before && clear_after
            })
    }
}

/// Text surrounding a candidate plus the date used for age checks
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub before: &'a str,
    pub after: &'a str,
    pub keywords: &'a ContextKeywords,
    pub reference_date: NaiveDate,
}

impl<'a> ValidationContext<'a> {
    /// Context for the span `start..end`, taking up to `window` characters on
    /// each side. Offsets must lie on char boundaries.
    pub fn around(
        text: &'a str,
        start: usize,
        end: usize,
        window: usize,
        keywords: &'a ContextKeywords,
        reference_date: NaiveDate,
    ) -> Self {
        let head = &text[..start];
        let tail = &text[end..];

        let from = if window == 0 {
            start
        } else {
            head.char_indices()
                .rev()
                .take(window)
                .last()
                .map_or(start, |(i, _)| i)
        };
        let to = tail.char_indices().nth(window).map_or(tail.len(), |(i, _)| i);

        Self {
            before: &head[from..],
            after: &tail[..to],
            keywords,
            reference_date,
        }
    }

    /// Context with no surrounding text
    pub fn bare(keywords: &'a ContextKeywords, reference_date: NaiveDate) -> Self {
        Self {
            before: "",
            after: "",
            keywords,
            reference_date,
        }
    }

    pub fn has(&self, set: KeywordSet) -> bool {
        self.keywords.contains(set, self.before) || self.keywords.contains(set, self.after)
    }
}

/// Validator registered for `pii_type`
pub fn validator_for(pii_type: PIIType) -> ValidatorFn {
    match pii_type {
        PIIType::CreditCard => credit_card,
        PIIType::SSN => ssn,
        PIIType::Email => email,
        PIIType::Phone => phone,
        PIIType::PersonName => person_name,
        PIIType::Address => address,
        PIIType::IPAddress => ip_address,
        PIIType::DateOfBirth => date_of_birth,
        PIIType::Passport => passport,
        PIIType::DriverLicense => driver_license,
        PIIType::BankAccount => bank_account,
        PIIType::TaxId => tax_id,
    }
}

/// Validate `raw` as `pii_type`
pub fn validate(pii_type: PIIType, raw: &str, ctx: &ValidationContext<'_>) -> Verdict {
    validator_for(pii_type)(raw, ctx)
}

fn credit_card(raw: &str, _ctx: &ValidationContext<'_>) -> Verdict {
    if luhn_is_valid(raw) {
        Verdict::accepted(0.95)
    } else {
        Verdict::rejected()
    }
}

fn ssn(raw: &str, _ctx: &ValidationContext<'_>) -> Verdict {
    if ssn_is_valid(raw) {
        Verdict::accepted(0.98)
    } else {
        Verdict::rejected()
    }
}

fn email(raw: &str, _ctx: &ValidationContext<'_>) -> Verdict {
    if email_is_valid(raw) {
        Verdict::accepted(0.99)
    } else {
        Verdict::rejected()
    }
}

fn phone(raw: &str, _ctx: &ValidationContext<'_>) -> Verdict {
    if phone_is_valid(raw) {
        Verdict::accepted(0.85)
    } else {
        Verdict::rejected()
    }
}

fn ip_address(raw: &str, _ctx: &ValidationContext<'_>) -> Verdict {
    if ipv4_is_valid(raw) {
        Verdict::accepted(0.90)
    } else {
        Verdict::rejected()
    }
}

fn date_of_birth(raw: &str, ctx: &ValidationContext<'_>) -> Verdict {
    let Some(date) = parse_date(raw) else {
        return Verdict::rejected();
    };

    let earliest_year = ctx.reference_date.year() - 120;
    if date > ctx.reference_date || date.year() < earliest_year {
        return Verdict::rejected();
    }

    if ctx.has(KeywordSet::Birth) {
        Verdict::accepted(0.85)
    } else {
        Verdict::accepted(0.75)
    }
}

fn person_name(raw: &str, ctx: &ValidationContext<'_>) -> Verdict {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let (honorific, names) = match tokens.split_first() {
        Some((first, rest)) if is_honorific(first) => (true, rest),
        _ => (false, tokens.as_slice()),
    };

    let min_names = if honorific { 1 } else { 2 };
    if names.len() < min_names || names.len() > 4 || !names.iter().all(|t| is_capitalized(t)) {
        return Verdict::rejected();
    }

    let mut confidence = if honorific {
        0.85
    } else if COMMON_FIRST_NAMES.contains(&names[0]) {
        0.80
    } else {
        0.60
    };

    if ctx.has(KeywordSet::NamePositive) {
        confidence += 0.05;
    }
    if ctx.has(KeywordSet::NameNegative) {
        confidence *= 0.5;
    }

    Verdict::accepted(confidence)
}

fn address(raw: &str, ctx: &ValidationContext<'_>) -> Verdict {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let shaped = match tokens.as_slice() {
        [number, words @ .., street_type] if !words.is_empty() => {
            number.len() <= 6
                && number.bytes().all(|b| b.is_ascii_digit())
                && words.iter().all(|w| is_capitalized(w))
                && STREET_TYPES
                    .iter()
                    .any(|t| t.eq_ignore_ascii_case(street_type))
        }
        _ => false,
    };

    if !shaped {
        return Verdict::rejected();
    }

    if ctx.has(KeywordSet::Address) {
        Verdict::accepted(0.85)
    } else {
        Verdict::accepted(0.75)
    }
}

fn passport(raw: &str, ctx: &ValidationContext<'_>) -> Verdict {
    let letters = raw.bytes().take_while(u8::is_ascii_uppercase).count();
    let digits = &raw[letters..];
    let shaped = (1..=2).contains(&letters)
        && (6..=9).contains(&digits.len())
        && digits.bytes().all(|b| b.is_ascii_digit());

    context_verdict(shaped, ctx.has(KeywordSet::Passport), 0.70, 0.90)
}

fn driver_license(raw: &str, ctx: &ValidationContext<'_>) -> Verdict {
    let shaped = raw.len() >= 8
        && raw.len() <= 13
        && raw.as_bytes()[0].is_ascii_uppercase()
        && raw[1..].bytes().all(|b| b.is_ascii_digit());

    context_verdict(shaped, ctx.has(KeywordSet::License), 0.65, 0.85)
}

fn bank_account(raw: &str, ctx: &ValidationContext<'_>) -> Verdict {
    let shaped = (8..=17).contains(&raw.len()) && raw.bytes().all(|b| b.is_ascii_digit());

    context_verdict(shaped, ctx.has(KeywordSet::Account), 0.50, 0.85)
}

/// EIN prefixes the IRS has never assigned
const UNASSIGNED_EIN_PREFIXES: &[&str] = &[
    "00", "07", "08", "09", "17", "18", "19", "28", "29", "49", "69", "70", "78", "79", "89",
];

fn tax_id(raw: &str, ctx: &ValidationContext<'_>) -> Verdict {
    let digits = match raw.len() {
        9 => raw.to_string(),
        10 if raw.as_bytes()[2] == b'-' => raw.replacen('-', "", 1),
        _ => return Verdict::rejected(),
    };

    let shaped = digits.len() == 9
        && digits.bytes().all(|b| b.is_ascii_digit())
        && !UNASSIGNED_EIN_PREFIXES.contains(&&digits[..2]);

    context_verdict(shaped, ctx.has(KeywordSet::Tax), 0.75, 0.90)
}

fn context_verdict(shaped: bool, in_context: bool, base: f32, boosted: f32) -> Verdict {
    match (shaped, in_context) {
        (false, _) => Verdict::rejected(),
        (true, true) => Verdict::accepted(boosted),
        (true, false) => Verdict::accepted(base),
    }
}

/// Luhn checksum over the digits of `raw` (13 to 19 digits required)
pub fn luhn_is_valid(raw: &str) -> bool {
    let digits: Vec<u32> = raw.chars().filter_map(|c| c.to_digit(10)).collect();
    if !(13..=19).contains(&digits.len()) {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

/// SSN area/group/serial rules. Accepts `AAA-GG-SSSS`, `AAA GG SSSS` or
/// nine bare digits.
pub fn ssn_is_valid(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let digits: String = match bytes.len() {
        9 => raw.to_string(),
        11 if bytes[3] == bytes[6] && matches!(bytes[3], b'-' | b' ') => {
            format!("{}{}{}", &raw[..3], &raw[4..6], &raw[7..])
        }
        _ => return false,
    };

    if digits.len() != 9 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let area = &digits[..3];
    let group = &digits[3..5];
    let serial = &digits[5..];

    area != "000" && area != "666" && !area.starts_with('9') && group != "00" && serial != "0000"
}

const EMAIL_LOCAL_SYMBOLS: &str = ".!#$%&'*+/=?^_`{|}~-";

/// Syntactic email check
pub fn email_is_valid(raw: &str) -> bool {
    let mut parts = raw.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    let local_ok = !local.is_empty()
        && local.len() <= 64
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || EMAIL_LOCAL_SYMBOLS.contains(c));
    if !local_ok || domain.is_empty() || domain.len() > 253 {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    let Some(tld) = labels.last() else {
        return false;
    };

    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        })
        && tld.len() >= 2
        && tld.bytes().all(|b| b.is_ascii_alphabetic())
}

/// US phone number check: 10 digits (or 11 with a leading `1`), grouped as
/// `NNNNNNNNNN` or `NNN NNN NNNN`, NANP area code.
pub fn phone_is_valid(raw: &str) -> bool {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let national = match digits.len() {
        10 => &digits[..],
        11 if digits.starts_with('1') => &digits[1..],
        _ => return false,
    };

    let parenthesized = match (raw.find('('), raw.find(')')) {
        (None, None) => false,
        (Some(open), Some(close)) => {
            if close != open + 4
                || raw.matches('(').count() != 1
                || raw.matches(')').count() != 1
                || !raw[open + 1..close].bytes().all(|b| b.is_ascii_digit())
            {
                return false;
            }
            true
        }
        _ => return false,
    };

    let groups: Vec<&str> = raw
        .split(|c: char| !c.is_ascii_digit())
        .filter(|g| !g.is_empty())
        .collect();
    let national_groups = match groups.as_slice() {
        [cc, rest @ ..] if digits.len() == 11 && *cc == "1" => rest,
        all => all,
    };
    let lengths: Vec<usize> = national_groups.iter().map(|g| g.len()).collect();

    match lengths.as_slice() {
        [10] | [11] => {}
        [3, 3, 4] => {
            if !parenthesized && !consistent_separators(raw) {
                return false;
            }
        }
        _ => return false,
    }

    let area: u16 = match national[..3].parse() {
        Ok(area) => area,
        Err(_) => return false,
    };

    (200..=999).contains(&area) && area != 911 && area != 988
}

fn consistent_separators(raw: &str) -> bool {
    let inner = raw.trim_matches(|c: char| !c.is_ascii_digit());
    let separators: Vec<&str> = inner
        .split(|c: char| c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .collect();

    // Only the two separators inside the national number must agree
    match separators.as_slice() {
        [.., a, b] => a == b,
        _ => true,
    }
}

/// IPv4 dotted quad. Octets with leading zeros are rejected.
pub fn ipv4_is_valid(raw: &str) -> bool {
    let octets: Vec<&str> = raw.split('.').collect();
    octets.len() == 4
        && octets.iter().all(|octet| {
            !octet.is_empty()
                && octet.len() <= 3
                && octet.bytes().all(|b| b.is_ascii_digit())
                && !(octet.len() > 1 && octet.starts_with('0'))
                && octet.parse::<u16>().is_ok_and(|value| value <= 255)
        })
}

/// Parse `MM/DD/YYYY`, falling back to `DD/MM/YYYY`, or ISO `YYYY-MM-DD`.
/// Both separators must be the same character.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let separator = raw.chars().find(|c| !c.is_ascii_digit())?;
    if separator != '/' && separator != '-' {
        return None;
    }

    let parts: Vec<&str> = raw.split(separator).collect();
    let all_digits = |p: &&str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    if parts.len() != 3 || !parts.iter().all(all_digits) {
        return None;
    }

    let first: u32 = parts[0].parse().ok()?;
    let second: u32 = parts[1].parse().ok()?;
    let third: u32 = parts[2].parse().ok()?;

    if parts[0].len() == 4 {
        if separator != '-' {
            return None;
        }
        return NaiveDate::from_ymd_opt(first as i32, second, third);
    }

    if parts[2].len() != 4 {
        return None;
    }

    let year = third as i32;
    NaiveDate::from_ymd_opt(year, first, second)
        .or_else(|| NaiveDate::from_ymd_opt(year, second, first))
}

fn is_honorific(token: &str) -> bool {
    let bare = token.strip_suffix('.').unwrap_or(token);
    NAME_HONORIFICS.contains(&bare)
}

fn is_capitalized(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => {
            let rest = chars.as_str();
            !rest.is_empty() && rest.chars().all(|c| c.is_lowercase() || c == '\'' || c == '-')
        }
        _ => false,
    }
}
