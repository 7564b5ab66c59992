//! Database schema migrations (idempotent).
//!
//! Every collection is one table holding the record as JSON
//! (`fields_json`, keyed by attribute storage key) plus bookkeeping
//! timestamps. Lookup keys get expression indexes over
//! `json_extract(fields_json, '$.<key>.value')`; the store queries with
//! the identical expression so SQLite can use them.

use anyhow::Result;
use sqlx::SqlitePool;

use leadsync_core::store::CollectionKind;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create every table and index on an open pool.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    for kind in CollectionKind::ALL {
        let table = kind.name();

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                fields_json TEXT NOT NULL DEFAULT '{{}}',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#
        ))
        .execute(pool)
        .await?;

        for key in kind.lookup_keys() {
            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_{key} ON {table}({expr})",
                expr = lookup_expr(key),
                key = key.to_lowercase(),
            ))
            .execute(pool)
            .await?;
        }

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_updated_at ON {table}(updated_at DESC)"
        ))
        .execute(pool)
        .await?;
    }

    tracing::debug!("schema up to date");
    Ok(())
}

/// SQL expression extracting an attribute's value from `fields_json`.
///
/// `key` is always a static attribute key, never user input.
pub fn lookup_expr(key: &str) -> String {
    format!("json_extract(fields_json, '$.{}.value')", key)
}
