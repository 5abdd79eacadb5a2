//! Scraped Product Data Pipeline Library
//!
//! Turns raw product listings scraped from Georgian retail sites into a
//! validated, cleaned and deduplicated dataset, exports it as JSON/CSV/XLSX,
//! and produces statistical and trend reports.
//!
//! # Modules
//!
//! - `core`: Pipeline stages grouped under one namespace.
//! - `obs`: Observability and logging.
//! - `cleaning`: Text normalization, feature extraction, quality scoring.
//! - `config`: Configuration management.
//! - `dedup`: Duplicate listing removal.
//! - `diagnostics`: Per-run error and warning log.
//! - `errors`: Error handling types.
//! - `export`: Multi-format table export.
//! - `layout`: Output directory convention.
//! - `loader`: Raw JSON loading.
//! - `models`: Core data models.
//! - `pipeline`: Stage orchestration for the CLI commands.
//! - `reports`: JSON, HTML and plaintext analysis reports.
//! - `stats`: Descriptive statistics.
//! - `trends`: Regression-based trend detection.
//! - `validation`: Rule table and record validation.

pub mod core;
pub mod obs;

pub mod cleaning;
pub mod config;
pub mod dedup;
pub mod diagnostics;
pub mod errors;
pub mod export;
pub mod layout;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod reports;
pub mod stats;
pub mod trends;
pub mod validation;
