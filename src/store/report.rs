//! Serializable round and match reports

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::events::protocol::{PlayerId, Side};
use crate::game::{MatchController, RoundRecord, TeamScores};
use crate::stats::{RatioStat, StatError};

/// One player's values for a calculator
#[derive(Debug, Clone, Serialize)]
pub struct PlayerRow {
    pub player: PlayerId,
    pub name: String,
    /// Slot in the round roster, absent for match totals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<u8>,
    pub values: Vec<f64>,
    /// Ratio name → value, absent when the denominator is zero
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub ratios: BTreeMap<String, Option<f64>>,
}

/// A calculator's rows under its header
#[derive(Debug, Clone, Serialize)]
pub struct StatBlock {
    pub calculator: String,
    pub header: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ratios: Vec<RatioStat>,
    pub rows: Vec<PlayerRow>,
}

/// Statistics for one finalized round
#[derive(Debug, Clone, Serialize)]
pub struct RoundReport {
    pub session: Uuid,
    #[serde(flatten)]
    pub round: RoundRecord,
    pub stats: Vec<StatBlock>,
}

impl RoundReport {
    pub fn build(controller: &MatchController, number: u32) -> Option<Self> {
        let round = controller.round(number)?.clone();
        let stats = controller
            .calculators()
            .map(|calculator| {
                let table = calculator.table();
                let rows = round
                    .roster
                    .iter()
                    .filter_map(|entry| {
                        let values = table.round_statistic(number, entry.id)?;
                        Some(PlayerRow {
                            player: entry.id,
                            name: entry.display_name.clone(),
                            slot: Some(entry.slot),
                            values: values.to_vec(),
                            ratios: BTreeMap::new(),
                        })
                    })
                    .collect();
                StatBlock {
                    calculator: table.calculator().to_string(),
                    header: table.header().to_vec(),
                    ratios: Vec::new(),
                    rows,
                }
            })
            .collect();

        Some(Self {
            session: controller.match_record().session,
            round,
            stats,
        })
    }
}

/// Per-round outcome kept in the match report
#[derive(Debug, Clone, Serialize)]
pub struct RoundSummary {
    pub number: u32,
    pub winner: Option<Side>,
    pub valid: bool,
    pub processed: bool,
    pub players: usize,
}

impl From<&RoundRecord> for RoundSummary {
    fn from(round: &RoundRecord) -> Self {
        Self {
            number: round.number,
            winner: round.winner,
            valid: round.valid,
            processed: round.processed,
            players: round.roster.len(),
        }
    }
}

/// Match totals across every recorded round
#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub session: Uuid,
    pub generated_at: DateTime<Utc>,
    pub map_name: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended: bool,
    pub team_scores: TeamScores,
    pub rounds: Vec<RoundSummary>,
    pub stats: Vec<StatBlock>,
}

impl MatchReport {
    pub fn build(controller: &MatchController) -> Result<Self, StatError> {
        let record = controller.match_record();
        let participants = controller.participants();

        let mut stats = Vec::new();
        for calculator in controller.calculators() {
            let table = calculator.table();
            let mut rows = Vec::new();
            for player in table.players() {
                let Some(values) = table.match_statistic(player) else {
                    continue;
                };
                let mut ratios = BTreeMap::new();
                for ratio in table.ratios() {
                    ratios.insert(ratio.name.clone(), table.ratio_value(ratio, &values)?);
                }
                rows.push(PlayerRow {
                    player,
                    name: participants
                        .get(player)
                        .map(|p| p.display_name.clone())
                        .unwrap_or_default(),
                    slot: None,
                    values,
                    ratios,
                });
            }
            stats.push(StatBlock {
                calculator: table.calculator().to_string(),
                header: table.header().to_vec(),
                ratios: table.ratios().to_vec(),
                rows,
            });
        }

        Ok(Self {
            session: record.session,
            generated_at: Utc::now(),
            map_name: record.map_name.clone(),
            started_at: record.started_at,
            ended: record.ended,
            team_scores: record.team_scores,
            rounds: controller.rounds().iter().map(RoundSummary::from).collect(),
            stats,
        })
    }

    /// Block of a calculator by name
    pub fn block(&self, calculator: &str) -> Option<&StatBlock> {
        self.stats.iter().find(|b| b.calculator == calculator)
    }
}

impl StatBlock {
    /// Value of a column for a player
    pub fn value(&self, player: PlayerId, column: &str) -> Option<f64> {
        let idx = self.header.iter().position(|h| h == column)?;
        self.rows
            .iter()
            .find(|r| r.player == player)
            .and_then(|r| r.values.get(idx).copied())
    }
}
