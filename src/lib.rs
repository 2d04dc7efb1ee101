//! # Gleaner
//!
//! Source-collection orchestrator for sentiment analysis pipelines.
//!
//! Gleaner turns a heterogeneous set of registered data sources (RSS feeds,
//! rendered HTML pages fetched through a headless-crawl worker) into
//! deduplicatable content records, under bounded per-host concurrency, with
//! per-source job lifecycle tracking.
//!
//! ## Architecture
//!
//! ```text
//! Orchestrator → Strategy (rss | crawl) → Limiter → Fetch → Fingerprint → Store
//! ```
//!
//! - [`orchestrator`]: job creation, fan-out across sources, fan-in of results
//! - [`strategy`]: one fetch-and-normalize implementation per source kind
//! - [`limiter`]: per-host concurrency bounds protecting origins
//! - [`feed`]: RSS/Atom parsing, also exposed for ad-hoc parse requests
//! - [`store`]: SQLite persistence behind source/job/item traits
//!
//! ## Quick Start
//!
//! ```bash
//! # Register sources
//! gleaner add-source --name "Pension Watch" --url https://example.com/rss --kind rss
//! gleaner add-source --name "Fund Page" --url https://example.com/funds --kind html
//!
//! # Collect from all active sources
//! gleaner collect
//!
//! # Inspect outcomes
//! gleaner jobs --status failed
//! gleaner items --processed false
//! ```

/// Application context and error handling.
///
/// [`AppContext`](app::AppContext) wires together the store, limiter, feed
/// service, strategies, and orchestrator.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration loaded from `~/.config/gleaner/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Source`](domain::Source): a registered collection origin
/// - [`Job`](domain::Job): one collection attempt with an enforced
///   `queued -> running -> {completed | failed}` life cycle
/// - [`CollectedItem`](domain::CollectedItem): one normalized content record
///   with a SHA-256 content fingerprint
pub mod domain;

/// Feed listing and parsing helper built on feed-rs.
pub mod feed;

/// Per-host politeness limits backed by counting semaphores.
pub mod limiter;

/// The collection orchestrator: fan-out, fan-in, job-state transitions.
pub mod orchestrator;

/// Persistence traits and the SQLite implementation.
pub mod store;

/// Pluggable collection strategies selected by source kind.
pub mod strategy;
