//! Event pipeline: controller plus report sink

use tracing::{error, info, warn};

use crate::events::protocol::TimedEvent;
use crate::game::{Boundary, MatchController, Settings};
use crate::stats::StatError;
use crate::store::{MatchReport, RoundReport, StatsSink};
use crate::util::time::stream_millis;

/// Counters reported when the run finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub events: u64,
    pub rounds_written: u32,
    pub sink_failures: u32,
}

/// Drives a [`MatchController`] and hands finalized data to a sink
pub struct Pipeline<S> {
    controller: MatchController,
    sink: S,
    summary: RunSummary,
    match_written: bool,
}

impl<S: StatsSink> Pipeline<S> {
    pub fn new(settings: Settings, sink: S) -> Result<Self, StatError> {
        Ok(Self::with_controller(
            MatchController::with_default_calculators(settings)?,
            sink,
        ))
    }

    pub fn with_controller(controller: MatchController, sink: S) -> Self {
        Self {
            controller,
            sink,
            summary: RunSummary::default(),
            match_written: false,
        }
    }

    pub fn controller(&self) -> &MatchController {
        &self.controller
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Process one event, then flush any boundaries it produced
    pub fn process(&mut self, event: &TimedEvent) -> Result<(), StatError> {
        self.summary.events += 1;
        self.controller.process(event)?;
        for boundary in self.controller.drain_boundaries() {
            match boundary {
                Boundary::RoundFinalized(number) => {
                    info!(round = number, at_ms = stream_millis(event.time), "round finalized");
                    self.write_round(number);
                }
                Boundary::MatchEnded => self.write_match()?,
            }
        }
        Ok(())
    }

    pub fn run<I>(&mut self, events: I) -> Result<(), StatError>
    where
        I: IntoIterator<Item = TimedEvent>,
    {
        for event in events {
            self.process(&event)?;
        }
        Ok(())
    }

    /// Write the match report if the stream ended without a match end
    pub fn finish(mut self) -> Result<(RunSummary, S), StatError> {
        if !self.match_written {
            warn!(
                rounds = self.controller.rounds().len(),
                "stream ended before the match did, writing partial report"
            );
            self.write_match()?;
        }
        Ok((self.summary, self.sink))
    }

    fn write_round(&mut self, number: u32) {
        let Some(report) = RoundReport::build(&self.controller, number) else {
            return;
        };
        match self.sink.write_round(&report) {
            Ok(()) => self.summary.rounds_written += 1,
            Err(e) => {
                self.summary.sink_failures += 1;
                error!(round = number, error = %e, "Failed to write round report");
            }
        }
    }

    fn write_match(&mut self) -> Result<(), StatError> {
        let report = MatchReport::build(&self.controller)?;
        self.match_written = true;
        if let Err(e) = self.sink.write_match(&report) {
            self.summary.sink_failures += 1;
            error!(error = %e, "Failed to write match report");
        }
        Ok(())
    }
}
