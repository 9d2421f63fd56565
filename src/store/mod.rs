//! Report building and persistence

pub mod report;
pub mod sink;

pub use report::{MatchReport, PlayerRow, RoundReport, RoundSummary, StatBlock};
pub use sink::{JsonFileSink, MemorySink, SinkError, StatsSink};
