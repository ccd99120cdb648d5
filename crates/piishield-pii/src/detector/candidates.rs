use super::{PIIMatch, PIIType};
use crate::config::Configuration;
use crate::error::{DetectionError, Result};
use crate::registry::PatternRegistry;

/// Collect raw pattern hits for every enabled type
///
/// Each pattern runs independently, so hits of different types may overlap.
/// Candidates carry the registry base confidence and are not yet validated.
pub fn find_candidates<'a>(
    text: &'a str,
    registry: &PatternRegistry,
    config: &Configuration,
) -> Result<Vec<PIIMatch<'a>>> {
    if text.len() > config.max_text_length {
        return Err(DetectionError::SizeExceeded {
            length: text.len(),
            max: config.max_text_length,
        });
    }

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut candidates = Vec::new();
    for definition in registry.list_patterns() {
        if !config.is_enabled(definition.pii_type) {
            continue;
        }

        for mat in definition.pattern.find_iter(text) {
            if mat.is_empty() {
                continue;
            }
            if definition.pii_type == PIIType::IPAddress
                && extends_dotted_number(text, mat.start(), mat.end())
            {
                continue;
            }

            candidates.push(PIIMatch {
                pii_type: definition.pii_type,
                start: mat.start(),
                end: mat.end(),
                raw_value: mat.as_str(),
                confidence: definition.base_confidence,
                validated: false,
            });
        }
    }

    Ok(candidates)
}

/// True when the hit is part of a longer dotted run such as `1.2.3.4.5`
fn extends_dotted_number(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].as_bytes();
    let after = text[end..].as_bytes();
    matches!(before, [.., d, b'.'] if d.is_ascii_digit())
        || matches!(after, [b'.', d, ..] if d.is_ascii_digit())
}
