//! Match telemetry statistics
//!
//! Consumes an ordered stream of round, combat and utility events, rebuilds
//! a consistent round lifecycle from it and computes per-round and per-match
//! player statistics.

pub mod app;
pub mod config;
pub mod events;
pub mod game;
pub mod stats;
pub mod store;
pub mod util;

pub use app::{Pipeline, RunSummary};
pub use config::{Config, ConfigError};
pub use events::{GameEvent, TimedEvent};
pub use game::{MatchController, Settings};
pub use store::{JsonFileSink, MatchReport, MemorySink, RoundReport, StatsSink};
