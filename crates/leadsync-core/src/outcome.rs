//! Per-row outcomes returned from a batch.

use serde::{Deserialize, Serialize};

use crate::attr::{Attribute, CompanyAttr, LeadAttr, Record};

/// Reason attached to every incomplete-collection outcome.
pub const MISSING_LINKEDIN_REASON: &str = "Missing LinkedIn Url";

/// Reason attached to a company outcome when the row carried no company data.
pub const NO_COMPANY_DATA_REASON: &str = "No company data";

/// What happened to one row on one side (lead or company).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeStatus {
    #[serde(rename = "created")]
    Created,
    #[serde(rename = "updated")]
    Updated,
    #[serde(rename = "moved from incomplete to lead")]
    MovedFromIncomplete,
    #[serde(rename = "created in incomplete")]
    CreatedIncomplete,
    #[serde(rename = "updated in incomplete")]
    UpdatedIncomplete,
    #[serde(rename = "skipped")]
    Skipped,
    #[serde(rename = "error")]
    Error,
}

impl OutcomeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeStatus::Created => "created",
            OutcomeStatus::Updated => "updated",
            OutcomeStatus::MovedFromIncomplete => "moved from incomplete to lead",
            OutcomeStatus::CreatedIncomplete => "created in incomplete",
            OutcomeStatus::UpdatedIncomplete => "updated in incomplete",
            OutcomeStatus::Skipped => "skipped",
            OutcomeStatus::Error => "error",
        }
    }
}

/// The incoming record for a row, tagged with what happened to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct RowOutcome<A: Attribute> {
    #[serde(flatten)]
    pub record: Record<A>,
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl<A: Attribute> RowOutcome<A> {
    pub fn new(record: Record<A>, status: OutcomeStatus) -> Self {
        Self {
            record,
            status,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn error(record: Record<A>, reason: impl Into<String>) -> Self {
        Self::new(record, OutcomeStatus::Error).with_reason(reason)
    }

    pub fn is_error(&self) -> bool {
        self.status == OutcomeStatus::Error
    }
}

/// Outcomes for a whole batch, in input row order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub lead_results: Vec<RowOutcome<LeadAttr>>,
    pub company_results: Vec<RowOutcome<CompanyAttr>>,
}

impl BatchResult {
    /// Append another batch's outcomes after this one's.
    pub fn extend(&mut self, other: BatchResult) {
        self.lead_results.extend(other.lead_results);
        self.company_results.extend(other.company_results);
    }

    pub fn lead_summary(&self) -> OutcomeSummary {
        OutcomeSummary::from_statuses(self.lead_results.iter().map(|o| o.status))
    }

    pub fn company_summary(&self) -> OutcomeSummary {
        OutcomeSummary::from_statuses(self.company_results.iter().map(|o| o.status))
    }

    /// Lead outcome counts for every status, including the incomplete ones.
    pub fn lead_status_counts(&self) -> Vec<(OutcomeStatus, usize)> {
        let order = [
            OutcomeStatus::Created,
            OutcomeStatus::Updated,
            OutcomeStatus::MovedFromIncomplete,
            OutcomeStatus::CreatedIncomplete,
            OutcomeStatus::UpdatedIncomplete,
            OutcomeStatus::Error,
        ];
        order
            .iter()
            .map(|s| (*s, self.lead_results.iter().filter(|o| o.status == *s).count()))
            .collect()
    }
}

/// Dashboard tallies: plain `created`, `updated` and `error` statuses.
///
/// Incomplete and moved outcomes are deliberately not counted in either
/// bucket, matching how the upload report has always been summarized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    pub created: usize,
    pub updated: usize,
    pub errors: usize,
}

impl OutcomeSummary {
    pub fn from_statuses(statuses: impl IntoIterator<Item = OutcomeStatus>) -> Self {
        let mut summary = Self::default();
        for status in statuses {
            match status {
                OutcomeStatus::Created => summary.created += 1,
                OutcomeStatus::Updated => summary.updated += 1,
                OutcomeStatus::Error => summary.errors += 1,
                _ => {}
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::Lead;
    use crate::field::Field;

    #[test]
    fn outcome_serializes_flat_with_status() {
        let lead = Lead::new().with(LeadAttr::Email, Field::new(Some("a@x.com".into()), None));
        let outcome =
            RowOutcome::new(lead, OutcomeStatus::CreatedIncomplete).with_reason(MISSING_LINKEDIN_REASON);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "created in incomplete");
        assert_eq!(json["reason"], "Missing LinkedIn Url");
        assert_eq!(json["email"]["value"], "a@x.com");
    }

    #[test]
    fn summary_counts_only_plain_statuses() {
        let summary = OutcomeSummary::from_statuses([
            OutcomeStatus::Created,
            OutcomeStatus::Created,
            OutcomeStatus::Updated,
            OutcomeStatus::MovedFromIncomplete,
            OutcomeStatus::CreatedIncomplete,
            OutcomeStatus::Skipped,
            OutcomeStatus::Error,
        ]);
        assert_eq!(
            summary,
            OutcomeSummary {
                created: 2,
                updated: 1,
                errors: 1
            }
        );
    }

    #[test]
    fn status_strings_match_serde() {
        for s in [
            OutcomeStatus::Created,
            OutcomeStatus::MovedFromIncomplete,
            OutcomeStatus::UpdatedIncomplete,
            OutcomeStatus::Skipped,
            OutcomeStatus::Error,
        ] {
            assert_eq!(serde_json::to_value(s).unwrap(), s.as_str());
        }
    }
}
