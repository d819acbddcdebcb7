#![forbid(unsafe_code)]

//! Storage Gauge (sgauge): disk-usage aggregation and reporting for
//! applications that track named categories of storage.
//!
//! The pipeline:
//! 1. **Category catalog**: named groups of filesystem paths, with one
//!    optional enclosing category declared a superset of the others
//! 2. **Parallel probing**: every path measured concurrently; a failing
//!    path yields a flagged partial figure instead of a failed report
//! 3. **Report assembly**: derived `system`, `limit` and `free` figures,
//!    human-readable sizes, rounded percent-of-limit
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use storage_gauge::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use storage_gauge::core::config::Config;
//! use storage_gauge::report::engine::GaugeEngine;
//! ```

pub mod prelude;

pub mod catalog;
pub mod core;
pub mod journal;
pub mod probe;
pub mod report;
