//! `leadsync leads|incomplete|companies`: browse a collection from the
//! command line with the same query semantics as the HTTP API.

use anyhow::{Context, Result};
use chrono::Utc;

use leadsync_core::browse::{browse, BrowseQuery, Page};
use leadsync_core::store::{Collection, CollectionKind, Store};

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

/// Load one collection and run `query` over it.
pub async fn browse_collection(
    store: &dyn Store,
    kind: CollectionKind,
    query: &BrowseQuery,
) -> Result<Page> {
    let now = Utc::now();
    match kind {
        CollectionKind::Leads => browse(store.leads().list().await?, query, now),
        CollectionKind::IncompleteLeads => {
            browse(store.incomplete_leads().list().await?, query, now)
        }
        CollectionKind::Companies => browse(store.companies().list().await?, query, now),
    }
}

/// Parse a `--filter key=value` argument.
pub fn parse_filter(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .with_context(|| format!("invalid filter '{}': expected key=value", raw))?;
    Ok((key.trim().to_string(), value.to_string()))
}

/// Columns shown in the human-readable table.
fn columns(kind: CollectionKind) -> &'static [&'static str] {
    match kind {
        CollectionKind::Leads | CollectionKind::IncompleteLeads => {
            &["firstName", "lastName", "email", "linkedInUrl", "jobTitle"]
        }
        CollectionKind::Companies => &["name", "linkedInUrl", "industry", "country"],
    }
}

pub async fn run_browse(
    config: &Config,
    kind: CollectionKind,
    query: &BrowseQuery,
    json: bool,
) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;
    let store = SqliteStore::new(pool);

    let page = browse_collection(&store, kind, query).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else {
        print_page(kind, &page);
    }

    store.pool().close().await;
    Ok(())
}

fn print_page(kind: CollectionKind, page: &Page) {
    if page.records.is_empty() {
        println!("No {} found.", kind.name().replace('_', " "));
        return;
    }

    let cols = columns(kind);
    let header: Vec<String> = cols.iter().map(|c| format!("{:<24}", c)).collect();
    println!("{:<10} {}", "ID", header.join(" "));
    println!("{}", "-".repeat(11 + 25 * cols.len()));

    for record in &page.records {
        let cells: Vec<String> = cols
            .iter()
            .map(|col| {
                let value = record
                    .fields
                    .get(col)
                    .and_then(|f| f.value.as_deref())
                    .unwrap_or("-");
                format!("{:<24}", truncate(value, 24))
            })
            .collect();
        println!("{:<10} {}", truncate(&record.id, 8), cells.join(" "));
    }

    println!();
    println!(
        "page {} of {} ({} total)",
        page.page,
        page.total_pages.max(1),
        page.total
    );
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
