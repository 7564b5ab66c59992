//! # leadsync core
//!
//! Storage-agnostic reconciliation logic for leadsync: the field-value
//! model, attribute sets, column mapping, merge resolver, lead and company
//! resolvers, the batch orchestrator, the [`store::Store`] abstraction and
//! the browse query used by the dashboard read path.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. The native
//! shell (`leadsync`) supplies a SQLite-backed store; tests and embedders
//! can use [`store::memory::InMemoryStore`].
//!
//! ## Data Flow
//!
//! ```text
//! raw rows + FieldMappings
//!        │
//!        ▼
//!  ┌────────────┐   Lead    ┌───────────────┐
//!  │  mapping   │──────────▶│ lead resolver │──▶ leads / incomplete_leads
//!  │ (Field per │           └───────────────┘
//!  │ attribute) │  Company  ┌──────────────────┐
//!  └────────────┘──────────▶│ company resolver │──▶ companies
//!                           └──────────────────┘
//!        │
//!        ▼
//!   BatchResult { lead_results, company_results }
//! ```

pub mod attr;
pub mod batch;
pub mod browse;
pub mod field;
pub mod mapping;
pub mod merge;
pub mod outcome;
pub mod resolver;
pub mod store;

pub use attr::{Attribute, Company, CompanyAttr, Lead, LeadAttr, Record, StoredRecord};
pub use batch::process_batch;
pub use field::Field;
pub use mapping::{FieldMappings, RawRow};
pub use outcome::{BatchResult, OutcomeStatus, OutcomeSummary, RowOutcome};
