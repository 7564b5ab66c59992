//! SQLite-backed [`Store`] implementation.
//!
//! Each [`Collection`] maps to one table created by [`crate::migrate`].
//! Records are stored as JSON in `fields_json`; equality lookups use the
//! same `json_extract` expression the migration indexes.

use std::marker::PhantomData;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use leadsync_core::attr::{Attribute, CompanyAttr, LeadAttr, Record, StoredRecord};
use leadsync_core::store::{Collection, CollectionKind, Store};

use crate::migrate::lookup_expr;

/// One table of records over attribute set `A`.
pub struct SqliteCollection<A: Attribute> {
    pool: SqlitePool,
    kind: CollectionKind,
    _attrs: PhantomData<A>,
}

impl<A: Attribute> SqliteCollection<A> {
    fn new(pool: SqlitePool, kind: CollectionKind) -> Self {
        Self {
            pool,
            kind,
            _attrs: PhantomData,
        }
    }

    fn table(&self) -> &'static str {
        self.kind.name()
    }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).with_context(|| format!("timestamp out of range: {}", ms))
}

fn decode<A: Attribute>(row: &SqliteRow) -> Result<StoredRecord<A>> {
    let id: String = row.get("id");
    let fields_json: String = row.get("fields_json");
    let record: Record<A> = serde_json::from_str(&fields_json)
        .with_context(|| format!("corrupt fields_json for record {}", id))?;
    Ok(StoredRecord {
        id,
        record,
        created_at: from_millis(row.get("created_at"))?,
        updated_at: from_millis(row.get("updated_at"))?,
    })
}

#[async_trait]
impl<A: Attribute> Collection<A> for SqliteCollection<A> {
    async fn find_one(&self, attr: A, value: &str) -> Result<Option<StoredRecord<A>>> {
        let sql = format!(
            "SELECT id, fields_json, created_at, updated_at FROM {} WHERE {} = ? \
             ORDER BY created_at ASC, rowid ASC LIMIT 1",
            self.table(),
            lookup_expr(attr.key())
        );
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode).transpose()
    }

    async fn find_missing(&self, attr: A) -> Result<Option<StoredRecord<A>>> {
        let sql = format!(
            "SELECT id, fields_json, created_at, updated_at FROM {} \
             WHERE COALESCE(TRIM({}), '') = '' \
             ORDER BY created_at ASC, rowid ASC LIMIT 1",
            self.table(),
            lookup_expr(attr.key())
        );
        let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;
        row.as_ref().map(decode).transpose()
    }

    async fn insert(&self, record: &Record<A>) -> Result<StoredRecord<A>> {
        let now = Utc::now();
        let stored = StoredRecord {
            id: Uuid::new_v4().to_string(),
            record: record.clone(),
            created_at: now,
            updated_at: now,
        };
        let fields_json = serde_json::to_string(&stored.record)?;

        sqlx::query(&format!(
            "INSERT INTO {} (id, fields_json, created_at, updated_at) VALUES (?, ?, ?, ?)",
            self.table()
        ))
        .bind(&stored.id)
        .bind(&fields_json)
        .bind(now.timestamp_millis())
        .bind(now.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(stored)
    }

    async fn save(&self, stored: &StoredRecord<A>) -> Result<()> {
        let fields_json = serde_json::to_string(&stored.record)?;
        let result = sqlx::query(&format!(
            "UPDATE {} SET fields_json = ?, updated_at = ? WHERE id = ?",
            self.table()
        ))
        .bind(&fields_json)
        .bind(Utc::now().timestamp_millis())
        .bind(&stored.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            bail!("record not found: {}", stored.id);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query(&format!("DELETE FROM {} WHERE id = ?", self.table()))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<StoredRecord<A>>> {
        let rows = sqlx::query(&format!(
            "SELECT id, fields_json, created_at, updated_at FROM {} ORDER BY created_at ASC, rowid ASC",
            self.table()
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(decode).collect()
    }

    async fn count(&self) -> Result<u64> {
        let n: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", self.table()))
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }
}

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
    leads: SqliteCollection<LeadAttr>,
    incomplete_leads: SqliteCollection<LeadAttr>,
    companies: SqliteCollection<CompanyAttr>,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            leads: SqliteCollection::new(pool.clone(), CollectionKind::Leads),
            incomplete_leads: SqliteCollection::new(pool.clone(), CollectionKind::IncompleteLeads),
            companies: SqliteCollection::new(pool.clone(), CollectionKind::Companies),
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl Store for SqliteStore {
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
