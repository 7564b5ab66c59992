//! Field-value model.
//!
//! Every record attribute is stored as a [`Field`]: the observed value plus
//! the point in time it was last observed. Freshness comparisons between
//! two fields for the same attribute use only the timestamp.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A value and the time it was last observed.
///
/// `value == None` is a legitimate state (the source never supplied it).
/// `last_updated == None` means the source timestamp could not be parsed;
/// such a field is treated as older than any valid timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub value: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Field {
    pub fn new(value: Option<String>, last_updated: Option<DateTime<Utc>>) -> Self {
        Self {
            value,
            last_updated,
        }
    }

    /// Build a field from a raw cell. Blank cells become `value = None`.
    pub fn observed(raw_value: Option<&str>, last_updated: Option<DateTime<Utc>>) -> Self {
        let value = raw_value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        Self {
            value,
            last_updated,
        }
    }

    /// The value if present and non-empty.
    pub fn text(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| !v.is_empty())
    }

    /// Whether this field's timestamp is strictly later than `other`'s.
    ///
    /// An unparseable timestamp is never later than anything; a valid one
    /// is always later than an unparseable one.
    pub fn is_newer_than(&self, other: &Field) -> bool {
        match (self.last_updated, other.last_updated) {
            (Some(mine), Some(theirs)) => mine > theirs,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

/// Parse a source timestamp.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`,
/// `YYYY-MM-DD` and `MM/DD/YYYY`. Date-only values resolve to midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }

    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }

    None
}

/// Freshness score for display: 100 minus whole days since `last_updated`,
/// floored at 0.
///
/// Partial days round up, so anything observed within the last 24 hours
/// (but not exactly now) scores 99. Unparseable timestamps score 0. This
/// value plays no part in merge decisions.
pub fn trust_score(last_updated: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u32 {
    let Some(ts) = last_updated else {
        return 0;
    };
    let diff_ms = (now - ts).num_milliseconds().unsigned_abs();
    let days = diff_ms.div_ceil(86_400_000);
    100u64.saturating_sub(days) as u32
}
