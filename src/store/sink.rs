//! Destinations for finalized reports

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::report::{MatchReport, RoundReport};

/// Sink errors
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl SinkError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Receives reports at round and match boundaries
pub trait StatsSink {
    fn write_round(&mut self, report: &RoundReport) -> Result<(), SinkError>;

    fn write_match(&mut self, report: &MatchReport) -> Result<(), SinkError>;
}

/// Writes the match report as JSON and round reports as JSON lines next to it
#[derive(Debug)]
pub struct JsonFileSink {
    match_path: PathBuf,
    rounds_path: PathBuf,
    rounds: Option<BufWriter<File>>,
}

impl JsonFileSink {
    pub fn new(match_path: impl Into<PathBuf>) -> Self {
        let match_path = match_path.into();
        let rounds_path = match_path.with_extension("rounds.jsonl");
        Self {
            match_path,
            rounds_path,
            rounds: None,
        }
    }

    pub fn match_path(&self) -> &Path {
        &self.match_path
    }

    pub fn rounds_path(&self) -> &Path {
        &self.rounds_path
    }

    fn rounds_writer(&mut self) -> Result<&mut BufWriter<File>, SinkError> {
        let writer = match self.rounds.take() {
            Some(writer) => writer,
            None => {
                let file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(&self.rounds_path)
                    .map_err(|e| SinkError::io(&self.rounds_path, e))?;
                BufWriter::new(file)
            }
        };
        Ok(self.rounds.insert(writer))
    }
}

impl StatsSink for JsonFileSink {
    fn write_round(&mut self, report: &RoundReport) -> Result<(), SinkError> {
        let line = serde_json::to_string(report)?;
        let path = self.rounds_path.clone();
        let writer = self.rounds_writer()?;
        writeln!(writer, "{line}")
            .and_then(|_| writer.flush())
            .map_err(|e| SinkError::io(&path, e))?;
        debug!(round = report.round.number, path = %path.display(), "round report written");
        Ok(())
    }

    fn write_match(&mut self, report: &MatchReport) -> Result<(), SinkError> {
        let json = serde_json::to_vec_pretty(report)?;
        std::fs::write(&self.match_path, json).map_err(|e| SinkError::io(&self.match_path, e))?;
        debug!(path = %self.match_path.display(), "match report written");
        Ok(())
    }
}

/// Keeps reports in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub rounds: Vec<RoundReport>,
    pub matches: Vec<MatchReport>,
}

impl StatsSink for MemorySink {
    fn write_round(&mut self, report: &RoundReport) -> Result<(), SinkError> {
        self.rounds.push(report.clone());
        Ok(())
    }

    fn write_match(&mut self, report: &MatchReport) -> Result<(), SinkError> {
        self.matches.push(report.clone());
        Ok(())
    }
}
