//! # leadsync
//!
//! Reconciles CRM CSV exports into three SQLite collections (leads,
//! incomplete leads, companies) with per-field "last updated wins"
//! merging. The reconciliation engine lives in `leadsync-core`; this crate
//! is the native shell around it: configuration, the SQLite store, the
//! import pipeline, the browse CLI and the HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌───────────────┐   ┌──────────┐
//! │ CSV file │──▶│ csv_source + │──▶│ leadsync-core │──▶│  SQLite  │
//! │ / upload │   │   mappings   │   │ process_batch │   │ 3 tables │
//! └──────────┘   └──────────────┘   └───────────────┘   └────┬─────┘
//!                                                            │
//!                                        ┌───────────────────┤
//!                                        ▼                   ▼
//!                                   ┌──────────┐       ┌──────────┐
//!                                   │   CLI    │       │   HTTP   │
//!                                   │ browse   │       │   API    │
//!                                   └──────────┘       └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and mapping files |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite implementation of the core `Store` trait |
//! | [`csv_source`] | CSV parsing |
//! | [`ingest`] | `leadsync import` pipeline |
//! | [`progress`] | Import progress on stderr |
//! | [`browse`] | Browse CLI |
//! | [`stats`] | Collection counts |
//! | [`server`] | HTTP API |
//! | [`logging`] | `tracing` subscriber setup |

pub mod browse;
pub mod config;
pub mod csv_source;
pub mod db;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod progress;
pub mod server;
pub mod sqlite_store;
pub mod stats;
