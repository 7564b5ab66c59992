//! Import pipeline: CSV file → mappings → chunked batches → store.
//!
//! Chunks are reconciled one after another with the same orchestrator the
//! HTTP upload uses, so a 50,000-row export behaves exactly like a hundred
//! sequential 500-row uploads.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::Serialize;

use leadsync_core::attr::{Attribute, LeadAttr};
use leadsync_core::mapping::all_labels;
use leadsync_core::outcome::{BatchResult, OutcomeSummary};
use leadsync_core::store::Store;
use leadsync_core::{process_batch, FieldMappings, RawRow};

use crate::config::{load_mappings, Config};
use crate::csv_source::read_csv_file;
use crate::db;
use crate::migrate;
use crate::progress::{format_number, ImportProgressEvent, ImportProgressReporter};
use crate::sqlite_store::SqliteStore;

/// Flags of `leadsync import`.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub mapping: Option<PathBuf>,
    pub chunk_size: Option<usize>,
    pub dry_run: bool,
    pub report: Option<PathBuf>,
}

/// Created/updated/error tallies for both sides of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    pub leads: OutcomeSummary,
    pub companies: OutcomeSummary,
}

impl UploadSummary {
    pub fn of(result: &BatchResult) -> Self {
        Self {
            leads: result.lead_summary(),
            companies: result.company_summary(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportReport<'a> {
    file: String,
    rows: usize,
    #[serde(flatten)]
    result: &'a BatchResult,
    summary: UploadSummary,
}

/// Effective mappings for one upload: `base` overlaid by `overlay`, then
/// every still-unmapped label that appears verbatim among `headers`.
pub fn resolve_mappings(
    base: &FieldMappings,
    overlay: Option<&FieldMappings>,
    headers: &[String],
) -> FieldMappings {
    let mappings = match overlay {
        Some(overlay) => base.clone().merged_with(overlay),
        None => base.clone(),
    };
    mappings.with_fallback_headers(headers.iter().map(String::as_str))
}

/// Reconcile `rows` against `store` in chunks of `chunk_size`.
pub async fn import_rows(
    store: &dyn Store,
    rows: &[RawRow],
    mappings: &FieldMappings,
    chunk_size: usize,
    file: &str,
    progress: &dyn ImportProgressReporter,
) -> Result<BatchResult> {
    if chunk_size == 0 {
        bail!("chunk size must be > 0");
    }

    let total = rows.len() as u64;
    let mut result = BatchResult::default();
    let mut done = 0u64;

    for (i, chunk) in rows.chunks(chunk_size).enumerate() {
        let batch = process_batch(store, chunk, mappings, Utc::now()).await;
        done += chunk.len() as u64;
        tracing::debug!(chunk = i, rows = chunk.len(), "chunk reconciled");
        progress.report(ImportProgressEvent::Reconciling {
            file: file.to_string(),
            n: done,
            total,
        });
        result.extend(batch);
    }

    Ok(result)
}

pub async fn run_import(
    config: &Config,
    csv_path: &Path,
    options: &ImportOptions,
    progress: &dyn ImportProgressReporter,
) -> Result<()> {
    let file = csv_path.display().to_string();
    let chunk_size = options.chunk_size.unwrap_or(config.ingest.chunk_size);
    if chunk_size == 0 {
        bail!("--chunk-size must be > 0");
    }

    let overlay = options
        .mapping
        .as_deref()
        .map(load_mappings)
        .transpose()?;

    progress.report(ImportProgressEvent::Reading { file: file.clone() });
    let table = read_csv_file(csv_path)?;
    let mappings = resolve_mappings(&config.mappings, overlay.as_ref(), &table.headers);

    if options.dry_run {
        print_dry_run(&file, &table.rows, &mappings);
        return Ok(());
    }

    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;
    let store = SqliteStore::new(pool);

    let result = import_rows(
        &store,
        &table.rows,
        &mappings,
        chunk_size,
        &file,
        progress,
    )
    .await?;

    println!("import {}", file);
    println!("  rows: {}", format_number(table.rows.len() as u64));
    println!("  leads:");
    for (status, count) in result.lead_status_counts() {
        if count > 0 {
            println!("    {:<30} {}", status.as_str(), format_number(count as u64));
        }
    }
    let companies = result.company_summary();
    println!(
        "  companies: {} created, {} updated, {} errors",
        companies.created, companies.updated, companies.errors
    );

    if let Some(report_path) = &options.report {
        write_report(report_path, &file, table.rows.len(), &result)?;
        println!("  report: {}", report_path.display());
    }
    println!("ok");

    store.pool().close().await;
    Ok(())
}

fn print_dry_run(file: &str, rows: &[RawRow], mappings: &FieldMappings) {
    let url_label = LeadAttr::LinkedInUrl.label();
    let missing_url = rows
        .iter()
        .filter(|row| {
            mappings
                .cell(row, url_label)
                .map_or(true, |v| v.trim().is_empty())
        })
        .count();

    println!("import {} (dry-run)", file);
    println!("  rows: {}", format_number(rows.len() as u64));
    println!("  mapped labels:");
    for (label, header) in mappings.iter() {
        if !header.is_empty() {
            println!("    {:<28} <- {}", label, header);
        }
    }
    let unmapped: Vec<&str> = all_labels()
        .filter(|label| mappings.header_for(label).is_none())
        .collect();
    if !unmapped.is_empty() {
        println!("  unmapped labels: {}", unmapped.join(", "));
    }
    println!(
        "  rows without {}: {}",
        url_label,
        format_number(missing_url as u64)
    );
}

fn write_report(path: &Path, file: &str, rows: usize, result: &BatchResult) -> Result<()> {
    let report = ImportReport {
        file: file.to_string(),
        rows,
        result,
        summary: UploadSummary::of(result),
    };
    let json = serde_json::to_string_pretty(&report)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    Ok(())
}
