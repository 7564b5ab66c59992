//! Batch orchestrator.
//!
//! Rows are processed strictly in order, one at a time: a later row may
//! depend on what an earlier row wrote (two rows for the same person).
//! Each row produces exactly one lead outcome and one company outcome.
//!
//! The lead side and the company side have separate error boundaries. A
//! failure on one side becomes an `error` outcome for that side and the
//! other side still runs, so a lead-side failure never costs the row its
//! company upsert. When the store is down both sides fail and the row's
//! pair is `error`/`error`.

use chrono::{DateTime, Utc};

use crate::attr::{Attribute, Record};
use crate::mapping::{FieldMappings, RawRow};
use crate::outcome::{BatchResult, RowOutcome};
use crate::resolver::{resolve_company, resolve_lead};
use crate::store::Store;

/// Reconcile `rows` against `store` and report per-row outcomes.
///
/// `now` stamps rows whose "Last Updated" column is unmapped or blank.
pub async fn process_batch(
    store: &dyn Store,
    rows: &[RawRow],
    mappings: &FieldMappings,
    now: DateTime<Utc>,
) -> BatchResult {
    let mut result = BatchResult {
        lead_results: Vec::with_capacity(rows.len()),
        company_results: Vec::with_capacity(rows.len()),
    };

    for (index, row) in rows.iter().enumerate() {
        let lead = mappings.lead_from_row(row, now);
        let company = mappings.company_from_row(row, now);

        let lead_outcome = settle(index, "lead", lead.clone(), resolve_lead(store, lead).await);
        let company_outcome = settle(
            index,
            "company",
            company.clone(),
            resolve_company(store, company).await,
        );

        result.lead_results.push(lead_outcome);
        result.company_results.push(company_outcome);
    }

    let summary = result.lead_summary();
    tracing::info!(
        rows = rows.len(),
        created = summary.created,
        updated = summary.updated,
        errors = summary.errors,
        "batch processed"
    );

    result
}

/// Turn a resolver result into an outcome, logging failures.
fn settle<A: Attribute>(
    index: usize,
    side: &str,
    record: Record<A>,
    result: anyhow::Result<RowOutcome<A>>,
) -> RowOutcome<A> {
    match result {
        Ok(outcome) => outcome,
        Err(err) => {
            let reason = format!("{:#}", err);
            tracing::warn!(row = index, side, error = %reason, "row failed");
            RowOutcome::error(record, reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{CompanyAttr, LeadAttr, StoredRecord};
    use crate::outcome::OutcomeStatus;
    use crate::store::memory::InMemoryStore;
    use crate::store::Collection;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn mappings() -> FieldMappings {
        FieldMappings::new()
            .with("LinkedIn UrL", "linkedInUrl")
            .with("Email", "email")
            .with("First Name", "firstName")
            .with("Last Updated", "lastUpdated")
            .with("Company Linkedin Url", "companyUrl")
            .with("Company Name", "company")
    }

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    async fn run(store: &dyn Store, rows: &[RawRow]) -> BatchResult {
        process_batch(store, rows, &mappings(), now()).await
    }

    #[tokio::test]
    async fn new_row_without_url_goes_to_incomplete() {
        let store = InMemoryStore::new();
        let r = row(&[
            ("linkedInUrl", ""),
            ("email", "a@x.com"),
            ("firstName", "Ann"),
            ("lastUpdated", "2024-01-01"),
        ]);

        let result = run(&store, &[r]).await;
        assert_eq!(result.lead_results[0].status, OutcomeStatus::CreatedIncomplete);
        assert_eq!(result.lead_results[0].reason.as_deref(), Some("Missing LinkedIn Url"));
        assert_eq!(store.incomplete_leads.count().await.unwrap(), 1);
        assert_eq!(store.leads.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn repeat_row_without_url_updates_incomplete_in_place() {
        let store = InMemoryStore::new();
        run(
            &store,
            &[row(&[
                ("email", "a@x.com"),
                ("firstName", "Ann"),
                ("lastUpdated", "2024-01-01"),
            ])],
        )
        .await;

        let result = run(
            &store,
            &[row(&[
                ("email", "a@x.com"),
                ("firstName", "Anne"),
                ("lastUpdated", "2024-02-01"),
            ])],
        )
        .await;

        assert_eq!(result.lead_results[0].status, OutcomeStatus::UpdatedIncomplete);
        let stored = store.incomplete_leads.snapshot();
        assert_eq!(stored.len(), 1);
        let first = stored[0].record.get(LeadAttr::FirstName).unwrap();
        assert_eq!(first.value.as_deref(), Some("Anne"));
        assert_eq!(
            first.last_updated,
            Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn url_arrival_moves_incomplete_to_lead() {
        let store = InMemoryStore::new();
        let rows = [
            row(&[("email", "a@x.com"), ("lastUpdated", "2024-01-01")]),
            row(&[
                ("linkedInUrl", "https://linkedin.com/in/ann"),
                ("email", "a@x.com"),
                ("lastUpdated", "2024-02-01"),
            ]),
        ];

        let result = run(&store, &rows).await;
        assert_eq!(result.lead_results[0].status, OutcomeStatus::CreatedIncomplete);
        assert_eq!(result.lead_results[1].status, OutcomeStatus::MovedFromIncomplete);
        assert!(store
            .incomplete_leads
            .find_one(LeadAttr::Email, "a@x.com")
            .await
            .unwrap()
            .is_none());
        let leads = store.leads.snapshot();
        assert_eq!(leads.len(), 1);
        assert_eq!(
            leads[0].record.text(LeadAttr::LinkedInUrl),
            Some("https://linkedin.com/in/ann")
        );
    }

    #[tokio::test]
    async fn complete_rows_create_then_update() {
        let store = InMemoryStore::new();
        let first = row(&[
            ("linkedInUrl", "https://linkedin.com/in/bo"),
            ("email", "bo@x.com"),
            ("firstName", "Bo"),
            ("lastUpdated", "2024-03-01"),
            ("companyUrl", "https://linkedin.com/company/acme"),
            ("company", "Acme"),
        ]);
        let older = row(&[
            ("linkedInUrl", "https://linkedin.com/in/bo"),
            ("email", "bo@x.com"),
            ("firstName", "Robert"),
            ("lastUpdated", "2024-01-01"),
            ("companyUrl", "https://linkedin.com/company/acme"),
            ("company", "Acme Old"),
        ]);

        let result = run(&store, &[first, older]).await;
        let lead_statuses: Vec<_> = result.lead_results.iter().map(|o| o.status).collect();
        let company_statuses: Vec<_> = result.company_results.iter().map(|o| o.status).collect();
        assert_eq!(lead_statuses, [OutcomeStatus::Created, OutcomeStatus::Updated]);
        assert_eq!(company_statuses, [OutcomeStatus::Created, OutcomeStatus::Updated]);

        // The older row lost every field comparison.
        let leads = store.leads.snapshot();
        assert_eq!(leads[0].record.text(LeadAttr::FirstName), Some("Bo"));
        let companies = store.companies.snapshot();
        assert_eq!(companies[0].record.text(CompanyAttr::Name), Some("Acme"));
    }

    #[tokio::test]
    async fn company_runs_for_incomplete_leads() {
        let store = InMemoryStore::new();
        let result = run(
            &store,
            &[row(&[
                ("email", "a@x.com"),
                ("companyUrl", "https://linkedin.com/company/acme"),
                ("company", "Acme"),
            ])],
        )
        .await;
        assert_eq!(result.company_results[0].status, OutcomeStatus::Created);
        assert_eq!(store.companies.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rows_without_company_data_add_no_companies() {
        let store = InMemoryStore::new();
        let rows: Vec<RawRow> = (0..5)
            .map(|n| {
                row(&[
                    ("linkedInUrl", format!("https://linkedin.com/in/p{}", n).as_str()),
                    ("email", format!("p{}@x.com", n).as_str()),
                ])
            })
            .collect();

        let result = run(&store, &rows).await;
        assert_eq!(result.company_results.len(), 5);
        assert!(result
            .company_results
            .iter()
            .all(|o| o.status == OutcomeStatus::Skipped));
        assert_eq!(result.company_summary().created, 0);
        assert_eq!(store.companies.count().await.unwrap(), 0);
        assert_eq!(store.leads.count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn companies_named_without_url_do_not_multiply() {
        let store = InMemoryStore::new();
        let rows: Vec<RawRow> = (0..3)
            .map(|n| {
                row(&[
                    ("linkedInUrl", format!("https://linkedin.com/in/p{}", n).as_str()),
                    ("company", "Acme"),
                ])
            })
            .collect();

        let result = run(&store, &rows).await;
        let statuses: Vec<_> = result.company_results.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            [OutcomeStatus::Created, OutcomeStatus::Updated, OutcomeStatus::Updated]
        );
        assert_eq!(store.companies.count().await.unwrap(), 1);
    }

    /// Store wrapper whose lead collection fails for one poisoned LinkedIn
    /// URL and whose company collection fails for one poisoned company URL.
    struct FlakyStore {
        inner: Arc<InMemoryStore>,
        leads: FlakyLeads,
        companies: FlakyCompanies,
    }

    struct FlakyLeads {
        target: &'static str,
        inner: Arc<InMemoryStore>,
    }

    struct FlakyCompanies {
        inner: Arc<InMemoryStore>,
    }

    impl FlakyLeads {
        fn inner(&self) -> &InMemoryStore {
            &self.inner
        }
    }

    impl FlakyCompanies {
        fn inner(&self) -> &InMemoryStore {
            &self.inner
        }
    }

    #[async_trait]
    impl Collection<LeadAttr> for FlakyLeads {
        async fn find_one(&self, attr: LeadAttr, value: &str) -> Result<Option<StoredRecord<LeadAttr>>> {
            if value == self.target {
                bail!("simulated lead store failure");
            }
            self.inner().leads.find_one(attr, value).await
        }
        async fn find_missing(&self, attr: LeadAttr) -> Result<Option<StoredRecord<LeadAttr>>> {
            self.inner().leads.find_missing(attr).await
        }
        async fn insert(&self, record: &Record<LeadAttr>) -> Result<StoredRecord<LeadAttr>> {
            self.inner().leads.insert(record).await
        }
        async fn save(&self, stored: &StoredRecord<LeadAttr>) -> Result<()> {
            self.inner().leads.save(stored).await
        }
        async fn delete(&self, id: &str) -> Result<()> {
            self.inner().leads.delete(id).await
        }
        async fn list(&self) -> Result<Vec<StoredRecord<LeadAttr>>> {
            self.inner().leads.list().await
        }
        async fn count(&self) -> Result<u64> {
            self.inner().leads.count().await
        }
    }

    #[async_trait]
    impl Collection<CompanyAttr> for FlakyCompanies {
        async fn find_one(
            &self,
            attr: CompanyAttr,
            value: &str,
        ) -> Result<Option<StoredRecord<CompanyAttr>>> {
            if value == "https://linkedin.com/company/down" {
                bail!("simulated company store failure");
            }
            self.inner().companies.find_one(attr, value).await
        }
        async fn find_missing(&self, attr: CompanyAttr) -> Result<Option<StoredRecord<CompanyAttr>>> {
            self.inner().companies.find_missing(attr).await
        }
        async fn insert(&self, record: &Record<CompanyAttr>) -> Result<StoredRecord<CompanyAttr>> {
            self.inner().companies.insert(record).await
        }
        async fn save(&self, stored: &StoredRecord<CompanyAttr>) -> Result<()> {
            self.inner().companies.save(stored).await
        }
        async fn delete(&self, id: &str) -> Result<()> {
            self.inner().companies.delete(id).await
        }
        async fn list(&self) -> Result<Vec<StoredRecord<CompanyAttr>>> {
            self.inner().companies.list().await
        }
        async fn count(&self) -> Result<u64> {
            self.inner().companies.count().await
        }
    }

    impl Store for FlakyStore {
        fn leads(&self) -> &dyn Collection<LeadAttr> {
            &self.leads
        }
        fn incomplete_leads(&self) -> &dyn Collection<LeadAttr> {
            &self.inner.incomplete_leads
        }
        fn companies(&self) -> &dyn Collection<CompanyAttr> {
            &self.companies
        }
    }

    fn flaky_store() -> FlakyStore {
        let inner = Arc::new(InMemoryStore::new());
        FlakyStore {
            leads: FlakyLeads {
                target: "https://linkedin.com/in/poison",
                inner: inner.clone(),
            },
            companies: FlakyCompanies {
                inner: inner.clone(),
            },
            inner,
        }
    }

    fn complete_row(n: usize, url: &str, company_url: &str) -> RawRow {
        row(&[
            ("linkedInUrl", url),
            ("email", format!("p{}@x.com", n).as_str()),
            ("lastUpdated", "2024-01-01"),
            ("companyUrl", company_url),
            ("company", "Acme"),
        ])
    }

    #[tokio::test]
    async fn failing_row_is_isolated() {
        let store = flaky_store();
        let rows = vec![
            complete_row(0, "https://linkedin.com/in/p0", "https://linkedin.com/company/acme"),
            complete_row(1, "https://linkedin.com/in/poison", "https://linkedin.com/company/down"),
            complete_row(2, "https://linkedin.com/in/p2", "https://linkedin.com/company/acme"),
        ];

        let result = run(&store, &rows).await;
        assert_eq!(result.lead_results.len(), 3);
        assert_eq!(result.company_results.len(), 3);

        assert!(result.lead_results[1].is_error());
        assert!(result.company_results[1].is_error());
        assert!(result.lead_results[1]
            .reason
            .as_deref()
            .unwrap()
            .contains("simulated lead store failure"));

        assert_eq!(result.lead_results[0].status, OutcomeStatus::Created);
        assert_eq!(result.lead_results[2].status, OutcomeStatus::Created);
        assert_eq!(result.company_results[0].status, OutcomeStatus::Created);
        assert_eq!(result.company_results[2].status, OutcomeStatus::Updated);
        assert_eq!(store.inner.leads.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn lead_failure_still_upserts_company() {
        let store = flaky_store();
        let rows = vec![complete_row(
            7,
            "https://linkedin.com/in/poison",
            "https://linkedin.com/company/acme",
        )];

        let result = run(&store, &rows).await;
        assert!(result.lead_results[0].is_error());
        assert_eq!(result.company_results[0].status, OutcomeStatus::Created);
        assert_eq!(store.inner.companies.count().await.unwrap(), 1);
    }
}
