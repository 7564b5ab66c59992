//! Merge resolver: per-field "last updated wins".

use crate::attr::{Attribute, Record};
use crate::field::Field;

/// Decide which of an existing field and an incoming candidate survives.
///
/// - No existing field: the candidate.
/// - Candidate strictly later: the candidate.
/// - Otherwise (older, equal, or unparseable candidate timestamp): the
///   existing field, unchanged.
pub fn resolve_field(existing: Option<&Field>, candidate: &Field) -> Field {
    match existing {
        None => candidate.clone(),
        Some(current) if candidate.is_newer_than(current) => candidate.clone(),
        Some(current) => current.clone(),
    }
}

/// Merge `incoming` into `existing` attribute by attribute.
///
/// Only attributes present in `incoming` are considered. Returns the
/// number of attributes whose field changed.
pub fn merge_record<A: Attribute>(existing: &mut Record<A>, incoming: &Record<A>) -> usize {
    let mut changed = 0;
    for attr in A::ALL {
        let Some(candidate) = incoming.get(*attr) else {
            continue;
        };
        let resolved = resolve_field(existing.get(*attr), candidate);
        if existing.get(*attr) != Some(&resolved) {
            changed += 1;
            existing.set(*attr, resolved);
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{Lead, LeadAttr};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(y: i32, m: u32, d: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap())
    }

    fn field(v: &str, ts: Option<DateTime<Utc>>) -> Field {
        Field::new(Some(v.to_string()), ts)
    }

    #[test]
    fn absent_existing_takes_candidate() {
        let cand = field("Ann", at(2024, 1, 1));
        assert_eq!(resolve_field(None, &cand), cand);
        let undated = field("Ann", None);
        assert_eq!(resolve_field(None, &undated), undated);
    }

    #[test]
    fn later_candidate_wins() {
        let existing = field("Ann", at(2024, 1, 1));
        let cand = field("Anne", at(2024, 2, 1));
        assert_eq!(resolve_field(Some(&existing), &cand), cand);
    }

    #[test]
    fn older_or_equal_candidate_is_discarded() {
        let existing = field("Ann", at(2024, 2, 1));
        for ts in [at(2024, 1, 1), at(2024, 2, 1)] {
            let cand = field("Anne", ts);
            assert_eq!(resolve_field(Some(&existing), &cand), existing);
        }
    }

    #[test]
    fn later_empty_value_still_wins() {
        let existing = field("Ann", at(2024, 1, 1));
        let cand = Field::new(None, at(2024, 3, 1));
        assert_eq!(resolve_field(Some(&existing), &cand), cand);
    }

    #[test]
    fn malformed_timestamps() {
        let dated = field("Ann", at(2024, 1, 1));
        let undated = field("Anne", None);
        assert_eq!(resolve_field(Some(&dated), &undated), dated);
        assert_eq!(resolve_field(Some(&undated), &dated), dated);
        assert_eq!(resolve_field(Some(&undated), &field("Other", None)), undated);
    }

    #[test]
    fn merge_record_counts_changes() {
        let mut existing = Lead::new()
            .with(LeadAttr::FirstName, field("Ann", at(2024, 1, 1)))
            .with(LeadAttr::City, field("Oslo", at(2024, 5, 1)));
        let incoming = Lead::new()
            .with(LeadAttr::FirstName, field("Anne", at(2024, 2, 1)))
            .with(LeadAttr::City, field("Bergen", at(2024, 2, 1)))
            .with(LeadAttr::Country, field("NO", at(2024, 2, 1)));

        let changed = merge_record(&mut existing, &incoming);
        assert_eq!(changed, 2);
        assert_eq!(existing.text(LeadAttr::FirstName), Some("Anne"));
        assert_eq!(existing.text(LeadAttr::City), Some("Oslo"));
        assert_eq!(existing.text(LeadAttr::Country), Some("NO"));
    }
}
