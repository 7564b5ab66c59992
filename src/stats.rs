//! `leadsync stats`: how many records each collection holds and when it
//! last changed.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use leadsync_core::store::CollectionKind;

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::progress::format_number;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionStats {
    pub kind: CollectionKind,
    pub count: i64,
    /// Most recent `updated_at`, unix millis.
    pub last_updated: Option<i64>,
}

pub async fn collect(pool: &SqlitePool) -> Result<Vec<CollectionStats>> {
    let mut stats = Vec::with_capacity(CollectionKind::ALL.len());
    for kind in CollectionKind::ALL {
        let (count, last_updated): (i64, Option<i64>) = sqlx::query_as(&format!(
            "SELECT COUNT(*), MAX(updated_at) FROM {}",
            kind.name()
        ))
        .fetch_one(pool)
        .await?;
        stats.push(CollectionStats {
            kind,
            count,
            last_updated,
        });
    }
    Ok(stats)
}

pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;
    let stats = collect(&pool).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("leadsync database stats");
    println!("=======================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  {:<20} {:>10}   {}", "COLLECTION", "RECORDS", "LAST UPDATE");
    println!("  {}", "-".repeat(50));
    let now = Utc::now();
    for s in &stats {
        let last = s
            .last_updated
            .and_then(DateTime::from_timestamp_millis)
            .map(|ts| format_relative(ts, now))
            .unwrap_or_else(|| "never".to_string());
        println!(
            "  {:<20} {:>10}   {}",
            s.kind.name(),
            format_number(s.count.max(0) as u64),
            last
        );
    }
    println!();

    pool.close().await;
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// "3 hours ago", falling back to a date after a month.
fn format_relative(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = (now - ts).num_seconds();
    let plural = |n: i64, unit: &str| format!("{} {}{} ago", n, unit, if n == 1 { "" } else { "s" });

    match delta {
        d if d < 0 => ts.format("%Y-%m-%d %H:%M").to_string(),
        d if d < 60 => "just now".to_string(),
        d if d < 3600 => plural(d / 60, "min"),
        d if d < 86_400 => plural(d / 3600, "hour"),
        d if d < 86_400 * 30 => plural(d / 86_400, "day"),
        _ => ts.format("%Y-%m-%d %H:%M").to_string(),
    }
}
