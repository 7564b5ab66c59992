//! Storage abstraction for leadsync.
//!
//! The reconciliation engine depends on three collections (leads,
//! incomplete leads, companies), each offering the same small set of
//! operations. [`Collection`] defines them; [`Store`] bundles the three.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::attr::{Attribute, CompanyAttr, LeadAttr, Record, StoredRecord};

/// One persistent collection of records over attribute set `A`.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`find_one`](Collection::find_one) | First record whose `attr` value equals `value` |
/// | [`find_missing`](Collection::find_missing) | First record with no value for `attr` |
/// | [`insert`](Collection::insert) | Persist a new record, assigning an id |
/// | [`save`](Collection::save) | Overwrite a loaded record in place |
/// | [`delete`](Collection::delete) | Remove a record by id |
/// | [`list`](Collection::list) | Every record (read path) |
/// | [`count`](Collection::count) | Number of records |
#[async_trait]
pub trait Collection<A: Attribute>: Send + Sync {
    /// Find the earliest-created record whose `attr` value equals `value`.
    ///
    /// Callers never pass an empty `value`; see [`lookup_key`].
    async fn find_one(&self, attr: A, value: &str) -> Result<Option<StoredRecord<A>>>;

    /// Find the earliest-created record with no value for `attr`.
    async fn find_missing(&self, attr: A) -> Result<Option<StoredRecord<A>>>;

    async fn insert(&self, record: &Record<A>) -> Result<StoredRecord<A>>;

    async fn save(&self, stored: &StoredRecord<A>) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;

    async fn list(&self) -> Result<Vec<StoredRecord<A>>>;

    async fn count(&self) -> Result<u64>;
}

/// The three collections the engine reads and mutates.
pub trait Store: Send + Sync {
    fn leads(&self) -> &dyn Collection<LeadAttr>;

    fn incomplete_leads(&self) -> &dyn Collection<LeadAttr>;

    fn companies(&self) -> &dyn Collection<CompanyAttr>;
}

/// Which collection a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Leads,
    IncompleteLeads,
    Companies,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 3] = [
        CollectionKind::Leads,
        CollectionKind::IncompleteLeads,
        CollectionKind::Companies,
    ];

    /// Table / collection name.
    pub fn name(self) -> &'static str {
        match self {
            CollectionKind::Leads => "leads",
            CollectionKind::IncompleteLeads => "incomplete_leads",
            CollectionKind::Companies => "companies",
        }
    }

    /// Attribute keys that are looked up by equality in this collection.
    pub fn lookup_keys(self) -> &'static [&'static str] {
        match self {
            CollectionKind::Leads | CollectionKind::IncompleteLeads => &["linkedInUrl", "email"],
            CollectionKind::Companies => &["linkedInUrl"],
        }
    }
}

/// The value to look a record up by, or `None` when the record has no
/// usable value for `attr`.
///
/// Empty keys never match anything: a row without an email must not be
/// merged into whichever stored record also lacks one.
pub fn lookup_key<A: Attribute>(record: &Record<A>, attr: A) -> Option<&str> {
    record.text(attr)
}
