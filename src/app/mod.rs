//! Application wiring

pub mod pipeline;

pub use pipeline::{Pipeline, RunSummary};
