//! Core types: errors, configuration, shared units.

pub mod config;
pub mod errors;
pub mod paths;
pub mod units;
