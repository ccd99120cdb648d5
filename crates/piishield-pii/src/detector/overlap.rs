use super::PIIMatch;
use std::cmp::Ordering;

/// Reduce validated candidates to a disjoint match set
///
/// Candidates below `threshold` are dropped first. The rest are ordered by
/// start offset, then confidence (higher first), then registry priority,
/// then span length (longer first), and swept left to right: a candidate
/// survives iff it starts at or after the end of the last survivor.
pub fn resolve<'a>(candidates: Vec<PIIMatch<'a>>, threshold: f32) -> Vec<PIIMatch<'a>> {
    let mut candidates: Vec<PIIMatch<'a>> = candidates
        .into_iter()
        .filter(|c| c.confidence >= threshold)
        .collect();

    candidates.sort_by(compare);

    let mut resolved: Vec<PIIMatch<'a>> = Vec::with_capacity(candidates.len());
    let mut last_end = 0;

    for candidate in candidates {
        if candidate.start >= last_end {
            last_end = candidate.end;
            resolved.push(candidate);
        }
    }

    resolved
}

fn compare(a: &PIIMatch<'_>, b: &PIIMatch<'_>) -> Ordering {
    a.start
        .cmp(&b.start)
        .then_with(|| b.confidence.total_cmp(&a.confidence))
        .then_with(|| a.pii_type.priority().cmp(&b.pii_type.priority()))
        .then_with(|| b.len().cmp(&a.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::PIIType;

    fn candidate(
        pii_type: PIIType,
        start: usize,
        end: usize,
        confidence: f32,
    ) -> PIIMatch<'static> {
        PIIMatch {
            pii_type,
            start,
            end,
            raw_value: "",
            confidence,
            validated: false,
        }
    }

    fn assert_disjoint(matches: &[PIIMatch<'_>]) {
        for pair in matches.windows(2) {
            assert!(pair[0].end <= pair[1].start, "{:?} overlaps {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_empty() {
        assert!(resolve(Vec::new(), 0.7).is_empty());
    }

    #[test]
    fn test_threshold_applied_before_sweep() {
        // The low-confidence candidate starts first and would otherwise win
        let resolved = resolve(
            vec![
                candidate(PIIType::BankAccount, 0, 12, 0.5),
                candidate(PIIType::Phone, 2, 12, 0.85),
            ],
            0.7,
        );

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].pii_type, PIIType::Phone);
    }

    #[test]
    fn test_same_start_prefers_confidence() {
        let resolved = resolve(
            vec![
                candidate(PIIType::TaxId, 3, 12, 0.75),
                candidate(PIIType::SSN, 3, 12, 0.98),
            ],
            0.7,
        );

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].pii_type, PIIType::SSN);
    }

    #[test]
    fn test_tie_break_by_registry_priority() {
        let resolved = resolve(
            vec![
                candidate(PIIType::DriverLicense, 0, 9, 0.8),
                candidate(PIIType::Passport, 0, 9, 0.8),
            ],
            0.7,
        );

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].pii_type, PIIType::Passport);
    }

    #[test]
    fn test_tie_break_by_length() {
        let resolved = resolve(
            vec![
                candidate(PIIType::Address, 0, 10, 0.8),
                candidate(PIIType::Address, 0, 20, 0.8),
            ],
            0.7,
        );

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].end, 20);
    }

    #[test]
    fn test_earlier_start_wins_over_confidence() {
        let resolved = resolve(
            vec![
                candidate(PIIType::Email, 5, 15, 0.99),
                candidate(PIIType::PersonName, 0, 8, 0.8),
            ],
            0.7,
        );

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].pii_type, PIIType::PersonName);
    }

    #[test]
    fn test_adjacent_spans_both_kept() {
        let resolved = resolve(
            vec![
                candidate(PIIType::Email, 10, 20, 0.99),
                candidate(PIIType::SSN, 0, 10, 0.98),
            ],
            0.7,
        );

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].pii_type, PIIType::SSN);
        assert_eq!(resolved[1].pii_type, PIIType::Email);
    }

    #[test]
    fn test_output_sorted_and_disjoint() {
        let resolved = resolve(
            vec![
                candidate(PIIType::Phone, 40, 52, 0.85),
                candidate(PIIType::BankAccount, 41, 51, 0.85),
                candidate(PIIType::CreditCard, 0, 16, 0.95),
                candidate(PIIType::BankAccount, 0, 16, 0.85),
                candidate(PIIType::Email, 20, 35, 0.99),
                candidate(PIIType::PersonName, 30, 45, 0.9),
            ],
            0.7,
        );

        let types: Vec<PIIType> = resolved.iter().map(|m| m.pii_type).collect();
        assert_eq!(types, vec![PIIType::CreditCard, PIIType::Email, PIIType::Phone]);
        assert_disjoint(&resolved);
    }
}
