//! Usage reporting: parallel aggregation, report assembly, engine façade.

pub mod aggregator;
pub mod builder;
pub mod engine;
