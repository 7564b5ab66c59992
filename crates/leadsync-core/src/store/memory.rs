//! In-memory [`Store`] implementation for testing and embedding.
//!
//! Each collection is a `Vec` behind `std::sync::RwLock`, kept in insertion
//! order so that [`Collection::find_one`] returns the earliest-created
//! match, the same ordering the SQLite store uses.

use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::attr::{Attribute, CompanyAttr, LeadAttr, Record, StoredRecord};

use super::{Collection, Store};

/// A single in-memory collection.
pub struct MemoryCollection<A: Attribute> {
    records: RwLock<Vec<StoredRecord<A>>>,
}

impl<A: Attribute> MemoryCollection<A> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of every stored record, in insertion order.
    pub fn snapshot(&self) -> Vec<StoredRecord<A>> {
        self.records.read().unwrap().clone()
    }
}

impl<A: Attribute> Default for MemoryCollection<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<A: Attribute> Collection<A> for MemoryCollection<A> {
    async fn find_one(&self, attr: A, value: &str) -> Result<Option<StoredRecord<A>>> {
        let records = self.records.read().unwrap();
        Ok(records
            .iter()
            .find(|r| r.record.text(attr) == Some(value))
            .cloned())
    }

    async fn find_missing(&self, attr: A) -> Result<Option<StoredRecord<A>>> {
        let records = self.records.read().unwrap();
        Ok(records
            .iter()
            .find(|r| r.record.text(attr).is_none())
            .cloned())
    }

    async fn insert(&self, record: &Record<A>) -> Result<StoredRecord<A>> {
        let now = Utc::now();
        let stored = StoredRecord {
            id: Uuid::new_v4().to_string(),
            record: record.clone(),
            created_at: now,
            updated_at: now,
        };
        self.records.write().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn save(&self, stored: &StoredRecord<A>) -> Result<()> {
        let mut records = self.records.write().unwrap();
        match records.iter_mut().find(|r| r.id == stored.id) {
            Some(slot) => {
                slot.record = stored.record.clone();
                slot.updated_at = Utc::now();
                Ok(())
            }
            None => bail!("record not found: {}", stored.id),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.records.write().unwrap().retain(|r| r.id != id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<StoredRecord<A>>> {
        Ok(self.snapshot())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.records.read().unwrap().len() as u64)
    }
}

/// In-memory store holding all three collections.
#[derive(Default)]
pub struct InMemoryStore {
    pub leads: MemoryCollection<LeadAttr>,
    pub incomplete_leads: MemoryCollection<LeadAttr>,
    pub companies: MemoryCollection<CompanyAttr>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for InMemoryStore {
    fn leads(&self) -> &dyn Collection<LeadAttr> {
        &self.leads
    }

    fn incomplete_leads(&self) -> &dyn Collection<LeadAttr> {
        &self.incomplete_leads
    }

    fn companies(&self) -> &dyn Collection<CompanyAttr> {
        &self.companies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::Lead;
    use crate::field::Field;

    fn lead(email: &str) -> Lead {
        Lead::new().with(LeadAttr::Email, Field::new(Some(email.to_string()), None))
    }

    #[tokio::test]
    async fn find_returns_earliest_match() {
        let coll = MemoryCollection::<LeadAttr>::new();
        let first = coll.insert(&lead("a@x.com")).await.unwrap();
        coll.insert(&lead("a@x.com")).await.unwrap();

        let found = coll.find_one(LeadAttr::Email, "a@x.com").await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
        assert!(coll.find_one(LeadAttr::Email, "b@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_missing_skips_records_with_a_value() {
        let coll = MemoryCollection::<LeadAttr>::new();
        coll.insert(&lead("a@x.com")).await.unwrap();
        assert!(coll.find_missing(LeadAttr::Email).await.unwrap().is_none());

        let blank = coll.insert(&lead("")).await.unwrap();
        coll.insert(&Lead::new()).await.unwrap();
        let found = coll.find_missing(LeadAttr::Email).await.unwrap().unwrap();
        assert_eq!(found.id, blank.id);
    }

    #[tokio::test]
    async fn save_and_delete() {
        let coll = MemoryCollection::<LeadAttr>::new();
        let mut stored = coll.insert(&lead("a@x.com")).await.unwrap();
        stored
            .record
            .set(LeadAttr::City, Field::new(Some("Oslo".into()), None));
        coll.save(&stored).await.unwrap();
        assert_eq!(coll.snapshot()[0].record.text(LeadAttr::City), Some("Oslo"));

        coll.delete(&stored.id).await.unwrap();
        assert_eq!(coll.count().await.unwrap(), 0);
        assert!(coll.save(&stored).await.is_err());
    }
}
