//! Standard PII masker implementation

use crate::config::Configuration;
use crate::detector::{PIIMatch, PIIType};
use crate::error::{DetectionError, Result};
use crate::masker::{MaskOutcome, MaskingStrategy, PIIMasker, TokenMap};
use crate::registry::PatternRegistry;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Hex characters in a tokenize placeholder
const TOKEN_HEX_LENGTH: usize = 12;

/// Masker applying the per-type strategy resolved from the configuration
/// and the registry defaults
#[derive(Debug, Clone)]
pub struct StandardMasker {
    registry: Arc<PatternRegistry>,
}

impl StandardMasker {
    pub fn new(registry: Arc<PatternRegistry>) -> Self {
        Self { registry }
    }

    /// Override from the configuration, else the registry default
    pub fn strategy_for(&self, pii_type: PIIType, config: &Configuration) -> MaskingStrategy {
        config
            .strategy_override(pii_type)
            .unwrap_or(self.registry.get(pii_type).default_strategy)
    }

    /// Replacement text for a single match
    fn mask_match(
        &self,
        m: &PIIMatch<'_>,
        config: &Configuration,
        tokens: &mut TokenMap,
    ) -> Result<String> {
        let replacement = match self.strategy_for(m.pii_type, config) {
            MaskingStrategy::Full => format!("[{}]", m.pii_type.label()),
            MaskingStrategy::Partial => {
                partial(m.pii_type, m.raw_value, config.partial_visible_for(m.pii_type))
            }
            MaskingStrategy::Redact => "*".repeat(m.raw_value.chars().count()),
            MaskingStrategy::Hash => {
                let digest = digest_hex(m.raw_value, config.hash_secret.as_deref())?;
                format!("[{}:{}]", m.pii_type.label(), &digest[..config.hash_length])
            }
            MaskingStrategy::Tokenize => {
                let id = Uuid::new_v4().simple().to_string();
                let token = format!("[{}_TOKEN_{}]", m.pii_type.label(), &id[..TOKEN_HEX_LENGTH]);
                tokens.insert(token.clone(), m.raw_value.to_string());
                token
            }
        };

        Ok(replacement)
    }
}

impl PIIMasker for StandardMasker {
    fn mask_with_tokens(
        &self,
        text: &str,
        matches: &[PIIMatch<'_>],
        config: &Configuration,
    ) -> Result<MaskOutcome> {
        config.validate()?;
        check_matches(text, matches)?;

        let mut tokens = TokenMap::default();
        let mut replacements = Vec::with_capacity(matches.len());
        let mut result = String::with_capacity(text.len());
        let mut last_end = 0;

        for m in matches {
            // Add text before this match
            result.push_str(&text[last_end..m.start]);

            let replacement = self.mask_match(m, config, &mut tokens)?;
            result.push_str(&replacement);
            replacements.push(replacement);

            last_end = m.end;
        }

        // Add remaining text
        result.push_str(&text[last_end..]);

        Ok(MaskOutcome {
            masked_text: result,
            replacements,
            token_map: config.retain_token_map.then_some(tokens),
        })
    }
}

/// Matches must be in bounds, on char boundaries, sorted, disjoint and
/// agree with the text they claim to cover.
fn check_matches(text: &str, matches: &[PIIMatch<'_>]) -> Result<()> {
    let mut last_end = 0;

    for (index, m) in matches.iter().enumerate() {
        if m.start >= m.end || m.end > text.len() {
            return Err(DetectionError::InvalidMatch(format!(
                "match {} spans {}..{} outside text of {} bytes",
                index,
                m.start,
                m.end,
                text.len()
            )));
        }

        if !text.is_char_boundary(m.start) || !text.is_char_boundary(m.end) {
            return Err(DetectionError::InvalidMatch(format!(
                "match {} does not start and end on character boundaries",
                index
            )));
        }

        if m.start < last_end {
            return Err(DetectionError::InvalidMatch(format!(
                "match {} overlaps or precedes the previous match",
                index
            )));
        }

        if text[m.span()] != *m.raw_value {
            return Err(DetectionError::InvalidMatch(format!(
                "match {} value differs from the text at {}..{}",
                index, m.start, m.end
            )));
        }

        last_end = m.end;
    }

    Ok(())
}

fn partial(pii_type: PIIType, raw: &str, visible: usize) -> String {
    match pii_type {
        PIIType::Email => match raw.split_once('@') {
            Some((local, domain)) => format!("{}@{}", keep_leading(local, visible), domain),
            None => keep_trailing(raw, visible),
        },
        PIIType::PersonName => raw
            .split(' ')
            .map(|token| keep_leading(token, visible))
            .collect::<Vec<_>>()
            .join(" "),
        _ => keep_trailing(raw, visible),
    }
}

/// Keep the first `visible` chars, star the rest. Short values are fully starred.
fn keep_leading(value: &str, visible: usize) -> String {
    let count = value.chars().count();
    let keep = if count <= visible { 0 } else { visible };

    value
        .chars()
        .enumerate()
        .map(|(i, c)| if i < keep { c } else { '*' })
        .collect()
}

/// Keep the last `visible` alphanumerics and every separator
fn keep_trailing(value: &str, visible: usize) -> String {
    let alnum = value.chars().filter(|c| c.is_alphanumeric()).count();
    let first_visible = if alnum <= visible {
        alnum
    } else {
        alnum - visible
    };

    let mut seen = 0;
    value
        .chars()
        .map(|c| {
            if !c.is_alphanumeric() {
                return c;
            }
            let keep = seen >= first_visible;
            seen += 1;
            if keep { c } else { '*' }
        })
        .collect()
}

fn digest_hex(raw: &str, secret: Option<&str>) -> Result<String> {
    let bytes = match secret {
        Some(key) => {
            let mut mac = HmacSha256::new_from_slice(key.as_bytes()).map_err(|_| {
                DetectionError::InvalidConfiguration(
                    "hash_secret is not a usable HMAC key".to_string(),
                )
            })?;
            mac.update(raw.as_bytes());
            mac.finalize().into_bytes().to_vec()
        }
        None => Sha256::digest(raw.as_bytes()).to_vec(),
    };

    Ok(bytes.iter().map(|b| format!("{:02x}", b)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_trailing() {
        assert_eq!(partial(PIIType::SSN, "123-45-6789", 4), "***-**-6789");
        assert_eq!(
            partial(PIIType::CreditCard, "4111 1111 1111 1111", 4),
            "**** **** **** 1111"
        );
        assert_eq!(partial(PIIType::Phone, "(555) 123-4567", 4), "(***) ***-4567");
        assert_eq!(partial(PIIType::Passport, "AB1234567", 2), "*******67");
        assert_eq!(partial(PIIType::IPAddress, "10.0.0.12", 0), "**.*.*.**");
    }

    #[test]
    fn test_partial_short_value_fully_masked() {
        assert_eq!(partial(PIIType::BankAccount, "1234", 4), "****");
        assert_eq!(partial(PIIType::BankAccount, "12-3", 6), "**-*");
    }

    #[test]
    fn test_partial_email() {
        assert_eq!(
            partial(PIIType::Email, "john.doe@example.com", 1),
            "j*******@example.com"
        );
        assert_eq!(partial(PIIType::Email, "j@x.com", 1), "*@x.com");
        assert_eq!(
            partial(PIIType::Email, "john.doe@example.com", 3),
            "joh*****@example.com"
        );
    }

    #[test]
    fn test_partial_name() {
        assert_eq!(partial(PIIType::PersonName, "John Smith", 1), "J*** S****");
        assert_eq!(partial(PIIType::PersonName, "Dr. Jane Doe", 1), "D** J*** D**");
    }

    #[test]
    fn test_partial_preserves_char_count() {
        let value = "Zoë Brontë";
        let masked = partial(PIIType::PersonName, value, 1);
        assert_eq!(masked.chars().count(), value.chars().count());
        assert_eq!(masked, "Z** B*****");
    }

    #[test]
    fn test_digest_hex() {
        assert_eq!(&digest_hex("123-45-6789", None).unwrap()[..12], "01a54629efb9");
        assert_eq!(
            &digest_hex("123-45-6789", Some("secret")).unwrap()[..12],
            "b52e28fe1ceb"
        );
        assert_eq!(digest_hex("j@x.com", None).unwrap().len(), 64);
    }

    #[test]
    fn test_check_matches_rejects_bad_spans() {
        let text = "SSN 123-45-6789";
        let ok = PIIMatch {
            pii_type: PIIType::SSN,
            start: 4,
            end: 15,
            raw_value: "123-45-6789",
            confidence: 0.98,
            validated: true,
        };
        assert!(check_matches(text, std::slice::from_ref(&ok)).is_ok());

        let out_of_bounds = PIIMatch { end: 16, ..ok.clone() };
        assert!(check_matches(text, &[out_of_bounds]).is_err());

        let wrong_value = PIIMatch {
            raw_value: "987-65-4321",
            ..ok.clone()
        };
        assert!(check_matches(text, &[wrong_value]).is_err());

        let overlapping = [ok.clone(), ok.clone()];
        assert!(matches!(
            check_matches(text, &overlapping),
            Err(DetectionError::InvalidMatch(_))
        ));
    }

    #[test]
    fn test_check_matches_rejects_split_chars() {
        let text = "Zoë";
        let split = PIIMatch {
            pii_type: PIIType::PersonName,
            start: 0,
            end: 3,
            raw_value: "Zo",
            confidence: 0.9,
            validated: false,
        };
        assert!(check_matches(text, &[split]).is_err());
    }
}
