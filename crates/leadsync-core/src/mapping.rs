//! Column mapping: canonical attribute labels → input column headers.
//!
//! An upload carries its own headers. The caller supplies a
//! [`FieldMappings`] table saying which header feeds which canonical label
//! (`"LinkedIn UrL"`, `"Last Updated"`, ...). Building a record walks the
//! attribute set and looks up each label's cell.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attr::{Attribute, CompanyAttr, LeadAttr, Record, LAST_UPDATED_LABEL};
use crate::field::{parse_timestamp, Field};

/// One input row: header → cell text.
pub type RawRow = HashMap<String, String>;

/// Mapping from canonical label to the header present in this upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMappings {
    labels: BTreeMap<String, String>,
}

impl FieldMappings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, header: impl Into<String>) {
        self.labels.insert(label.into(), header.into());
    }

    pub fn with(mut self, label: impl Into<String>, header: impl Into<String>) -> Self {
        self.insert(label, header);
        self
    }

    /// Overlay `other` on top of `self`; `other` wins on conflicts.
    pub fn merged_with(mut self, other: &FieldMappings) -> Self {
        for (label, header) in &other.labels {
            self.labels.insert(label.clone(), header.clone());
        }
        self
    }

    /// Fill every unmapped canonical label whose text appears verbatim
    /// among `headers`.
    pub fn with_fallback_headers<'a>(mut self, headers: impl IntoIterator<Item = &'a str>) -> Self {
        let headers: Vec<&str> = headers.into_iter().collect();
        for label in all_labels() {
            if self.labels.contains_key(label) {
                continue;
            }
            if headers.contains(&label) {
                self.labels.insert(label.to_string(), label.to_string());
            }
        }
        self
    }

    pub fn header_for(&self, label: &str) -> Option<&str> {
        self.labels
            .get(label)
            .map(String::as_str)
            .filter(|h| !h.is_empty())
    }

    /// `(label, header)` pairs, ordered by label.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(l, h)| (l.as_str(), h.as_str()))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The cell for `label` in `row`, if the label is mapped and the row
    /// has that header.
    pub fn cell<'r>(&self, row: &'r RawRow, label: &str) -> Option<&'r str> {
        self.header_for(label)
            .and_then(|header| row.get(header))
            .map(String::as_str)
    }

    /// Timestamp shared by every field built from `row`.
    ///
    /// An unmapped or blank "Last Updated" cell means the row is stamped
    /// with the ingestion time; a present but unparseable cell yields
    /// `None`, which never wins a merge.
    pub fn row_timestamp(&self, row: &RawRow, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.cell(row, LAST_UPDATED_LABEL).map(str::trim) {
            None | Some("") => Some(now),
            Some(raw) => parse_timestamp(raw),
        }
    }

    /// Build a record with one field per attribute in `A::ALL`.
    pub fn record_from_row<A: Attribute>(&self, row: &RawRow, now: DateTime<Utc>) -> Record<A> {
        let ts = self.row_timestamp(row, now);
        A::ALL.iter().fold(Record::new(), |record, attr| {
            record.with(*attr, Field::observed(self.cell(row, attr.label()), ts))
        })
    }

    pub fn lead_from_row(&self, row: &RawRow, now: DateTime<Utc>) -> Record<LeadAttr> {
        self.record_from_row(row, now)
    }

    pub fn company_from_row(&self, row: &RawRow, now: DateTime<Utc>) -> Record<CompanyAttr> {
        self.record_from_row(row, now)
    }
}

/// Every canonical label the mapping table understands.
pub fn all_labels() -> impl Iterator<Item = &'static str> {
    LeadAttr::ALL
        .iter()
        .map(|a| a.label())
        .chain(CompanyAttr::ALL.iter().map(|a| a.label()))
        .chain(std::iter::once(LAST_UPDATED_LABEL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn builds_lead_from_mapped_headers() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let mappings = FieldMappings::new()
            .with("LinkedIn UrL", "profile")
            .with("Email", "mail")
            .with("Last Updated", "seen");
        let r = row(&[
            ("profile", "https://linkedin.com/in/ann"),
            ("mail", "a@x.com"),
            ("seen", "2024-01-01"),
        ]);

        let lead = mappings.lead_from_row(&r, now);
        assert_eq!(lead.len(), LeadAttr::ALL.len());
        assert_eq!(
            lead.text(LeadAttr::LinkedInUrl),
            Some("https://linkedin.com/in/ann")
        );
        let email = lead.get(LeadAttr::Email).unwrap();
        assert_eq!(
            email.last_updated,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(lead.get(LeadAttr::FirstName).unwrap().value, None);
    }

    #[test]
    fn unmapped_timestamp_uses_ingestion_time() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let mappings = FieldMappings::new().with("Email", "Email");
        let lead = mappings.lead_from_row(&row(&[("Email", "a@x.com")]), now);
        assert_eq!(lead.get(LeadAttr::Email).unwrap().last_updated, Some(now));
    }

    #[test]
    fn unparseable_timestamp_is_none() {
        let now = Utc::now();
        let mappings = FieldMappings::new().with("Last Updated", "when");
        let company = mappings.company_from_row(&row(&[("when", "soon")]), now);
        assert!(company.iter().all(|(_, f)| f.last_updated.is_none()));
    }

    #[test]
    fn fallback_headers_fill_only_unmapped_labels() {
        let mappings = FieldMappings::new()
            .with("Email", "E-mail Address")
            .with_fallback_headers(["Email", "First Name", "Something Else"]);
        assert_eq!(mappings.header_for("Email"), Some("E-mail Address"));
        assert_eq!(mappings.header_for("First Name"), Some("First Name"));
        assert_eq!(mappings.header_for("Something Else"), None);
    }

    #[test]
    fn empty_header_counts_as_unmapped() {
        // The dashboard sends "" for labels the user left unselected.
        let mappings = FieldMappings::new().with("Email", "");
        assert_eq!(mappings.header_for("Email"), None);
    }
}
