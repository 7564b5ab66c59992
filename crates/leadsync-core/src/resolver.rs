//! Lead and company resolvers.
//!
//! Each resolver takes the record built from one row, consults the store,
//! performs the create/update/move it decides on, and returns the outcome.
//! Errors propagate to the batch orchestrator; resolvers never retry.
//!
//! # Lead transitions
//!
//! | LinkedIn URL | Incomplete match (email) | Lead match (url, then email) | Action | Status |
//! |---|---|---|---|---|
//! | absent | yes | n/a | merge into incomplete | `updated in incomplete` |
//! | absent | no | n/a | insert incomplete | `created in incomplete` |
//! | present | yes | n/a | delete incomplete, insert lead | `moved from incomplete to lead` |
//! | present | no | yes | merge into lead | `updated` |
//! | present | no | no | insert lead | `created` |

use anyhow::{Context, Result};

use crate::attr::{Attribute, Company, CompanyAttr, Lead, LeadAttr, StoredRecord};
use crate::merge::merge_record;
use crate::outcome::{OutcomeStatus, RowOutcome, MISSING_LINKEDIN_REASON, NO_COMPANY_DATA_REASON};
use crate::store::{lookup_key, Store};

/// Route one incoming lead through the incomplete/lead state machine.
pub async fn resolve_lead(store: &dyn Store, lead: Lead) -> Result<RowOutcome<LeadAttr>> {
    let email = lookup_key(&lead, LeadAttr::Email);

    let existing_incomplete = match email {
        Some(email) => store
            .incomplete_leads()
            .find_one(LeadAttr::Email, email)
            .await
            .context("looking up incomplete lead by email")?,
        None => None,
    };

    if lookup_key(&lead, LeadAttr::LinkedInUrl).is_none() {
        tracing::debug!(email = email.unwrap_or(""), "row has no LinkedIn URL");
        return match existing_incomplete {
            Some(mut stored) => {
                merge_record(&mut stored.record, &lead);
                store
                    .incomplete_leads()
                    .save(&stored)
                    .await
                    .context("saving incomplete lead")?;
                Ok(RowOutcome::new(lead, OutcomeStatus::UpdatedIncomplete)
                    .with_reason(MISSING_LINKEDIN_REASON))
            }
            None => {
                store
                    .incomplete_leads()
                    .insert(&lead)
                    .await
                    .context("inserting incomplete lead")?;
                Ok(RowOutcome::new(lead, OutcomeStatus::CreatedIncomplete)
                    .with_reason(MISSING_LINKEDIN_REASON))
            }
        };
    }

    if let Some(incomplete) = existing_incomplete {
        // Fresh creation from the incoming row; the incomplete record's
        // fields are not carried over.
        store
            .incomplete_leads()
            .delete(&incomplete.id)
            .await
            .context("deleting incomplete lead")?;
        store
            .leads()
            .insert(&lead)
            .await
            .context("inserting lead")?;
        return Ok(RowOutcome::new(lead, OutcomeStatus::MovedFromIncomplete));
    }

    match find_existing_lead(store, &lead).await? {
        Some(mut stored) => {
            merge_record(&mut stored.record, &lead);
            store
                .leads()
                .save(&stored)
                .await
                .context("saving lead")?;
            Ok(RowOutcome::new(lead, OutcomeStatus::Updated))
        }
        None => {
            store
                .leads()
                .insert(&lead)
                .await
                .context("inserting lead")?;
            Ok(RowOutcome::new(lead, OutcomeStatus::Created))
        }
    }
}

/// Find the stored lead an incoming lead refers to.
///
/// A LinkedIn URL match takes precedence over an email match, so when the
/// two keys point at different stored leads the URL owner is updated.
async fn find_existing_lead(
    store: &dyn Store,
    lead: &Lead,
) -> Result<Option<StoredRecord<LeadAttr>>> {
    for attr in [LeadAttr::LinkedInUrl, LeadAttr::Email] {
        let Some(key) = lookup_key(lead, attr) else {
            continue;
        };
        let found = store
            .leads()
            .find_one(attr, key)
            .await
            .with_context(|| format!("looking up lead by {}", attr.key()))?;
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

/// Upsert the row's company, keyed by the company LinkedIn URL.
///
/// A row with no company values at all is skipped. A company without a
/// URL shares the one stored company that also has none.
pub async fn resolve_company(
    store: &dyn Store,
    company: Company,
) -> Result<RowOutcome<CompanyAttr>> {
    if !company.has_values() {
        return Ok(RowOutcome::new(company, OutcomeStatus::Skipped)
            .with_reason(NO_COMPANY_DATA_REASON));
    }

    let existing = match lookup_key(&company, CompanyAttr::LinkedInUrl) {
        Some(url) => store
            .companies()
            .find_one(CompanyAttr::LinkedInUrl, url)
            .await
            .context("looking up company by linkedInUrl")?,
        None => store
            .companies()
            .find_missing(CompanyAttr::LinkedInUrl)
            .await
            .context("looking up company without linkedInUrl")?,
    };

    match existing {
        Some(mut stored) => {
            merge_record(&mut stored.record, &company);
            store
                .companies()
                .save(&stored)
                .await
                .context("saving company")?;
            Ok(RowOutcome::new(company, OutcomeStatus::Updated))
        }
        None => {
            store
                .companies()
                .insert(&company)
                .await
                .context("inserting company")?;
            Ok(RowOutcome::new(company, OutcomeStatus::Created))
        }
    }
}
