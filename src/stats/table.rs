//! Per-round, per-player statistic tables
//!
//! Every calculator owns one `StatTable`. The column layout is fixed when the
//! table is built: a "Rounds" column first, then each declared stat followed
//! by its "(T)" and "(CT)" siblings when the stat is split by team. Rows are
//! keyed by round number; the last row is always the current round.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use tracing::trace;

use crate::events::protocol::{PlayerId, Side};

/// Column every table carries; credited once per player per round
pub const ROUNDS: &str = "Rounds";

/// Configuration faults in stat declarations or updates
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StatError {
    #[error("{calculator}: unknown stat '{stat}'")]
    UnknownStat {
        calculator: &'static str,
        stat: String,
    },

    #[error("{calculator}: stat '{stat}' declared twice")]
    DuplicateStat {
        calculator: &'static str,
        stat: String,
    },

    #[error("{calculator}: ratio '{ratio}' references unknown stat '{stat}'")]
    UnknownRatioStat {
        calculator: &'static str,
        ratio: String,
        stat: String,
    },
}

/// Declaration of one stat column
#[derive(Debug, Clone, Copy)]
pub struct StatDef {
    pub name: &'static str,
    pub default: f64,
    /// Also keep "(T)" / "(CT)" columns
    pub team_split: bool,
}

impl StatDef {
    pub const fn counter(name: &'static str) -> Self {
        Self {
            name,
            default: 0.0,
            team_split: true,
        }
    }

    pub const fn plain(name: &'static str) -> Self {
        Self {
            name,
            default: 0.0,
            team_split: false,
        }
    }

    pub const fn with_default(self, default: f64) -> Self {
        Self { default, ..self }
    }
}

/// Display-only ratio of two columns, computed downstream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioStat {
    pub name: String,
    pub numerator: String,
    pub denominator: String,
}

impl RatioStat {
    pub fn new(name: &str, numerator: &str, denominator: &str) -> Self {
        Self {
            name: name.to_string(),
            numerator: numerator.to_string(),
            denominator: denominator.to_string(),
        }
    }
}

/// Name of the team-suffixed sibling of a stat
pub fn team_stat_name(base: &str, side: Side) -> Option<String> {
    side.short_name().map(|suffix| format!("{base} ({suffix})"))
}

/// All rows recorded for one round
#[derive(Debug, Clone, Default, Serialize)]
pub struct RoundRows {
    pub number: u32,
    pub values: BTreeMap<PlayerId, Vec<f64>>,
}

#[derive(Debug, Clone)]
pub struct StatTable {
    calculator: &'static str,
    header: Vec<String>,
    index: HashMap<String, usize>,
    defaults: Vec<f64>,
    /// base column → [T column, CT column]
    team_columns: HashMap<usize, [usize; 2]>,
    ratios: Vec<RatioStat>,
    rounds: Vec<RoundRows>,
}

impl StatTable {
    /// Build the column layout and validate ratio definitions against it
    pub fn new(
        calculator: &'static str,
        defs: &[StatDef],
        ratios: Vec<RatioStat>,
    ) -> Result<Self, StatError> {
        let mut table = Self {
            calculator,
            header: Vec::new(),
            index: HashMap::new(),
            defaults: Vec::new(),
            team_columns: HashMap::new(),
            ratios: Vec::new(),
            rounds: Vec::new(),
        };

        let rounds = StatDef::counter(ROUNDS);
        for def in std::iter::once(&rounds).chain(defs.iter().filter(|d| d.name != ROUNDS)) {
            let base = table.push_column(def.name.to_string(), def.default)?;
            if def.team_split {
                let mut siblings = [0; 2];
                for (slot, side) in siblings.iter_mut().zip(Side::PLAYING) {
                    let name = team_stat_name(def.name, side).unwrap_or_default();
                    *slot = table.push_column(name, def.default)?;
                }
                table.team_columns.insert(base, siblings);
            }
        }

        for ratio in &ratios {
            for stat in [&ratio.numerator, &ratio.denominator] {
                if !table.index.contains_key(stat.as_str()) {
                    return Err(StatError::UnknownRatioStat {
                        calculator,
                        ratio: ratio.name.clone(),
                        stat: stat.clone(),
                    });
                }
            }
        }
        table.ratios = ratios;

        Ok(table)
    }

    fn push_column(&mut self, name: String, default: f64) -> Result<usize, StatError> {
        if self.index.contains_key(&name) {
            return Err(StatError::DuplicateStat {
                calculator: self.calculator,
                stat: name,
            });
        }
        let idx = self.header.len();
        self.index.insert(name.clone(), idx);
        self.header.push(name);
        self.defaults.push(default);
        Ok(idx)
    }

    pub fn calculator(&self) -> &'static str {
        self.calculator
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn ratios(&self) -> &[RatioStat] {
        &self.ratios
    }

    pub fn rounds(&self) -> &[RoundRows] {
        &self.rounds
    }

    /// Column index of a stat name
    pub fn column(&self, name: &str) -> Result<usize, StatError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| StatError::UnknownStat {
                calculator: self.calculator,
                stat: name.to_string(),
            })
    }

    /// Number of the round currently addressed by updates
    pub fn current_round(&self) -> Option<u32> {
        self.rounds.last().map(|r| r.number)
    }

    /// Players with a row in the current round
    pub fn current_players(&self) -> Vec<PlayerId> {
        self.rounds
            .last()
            .map(|r| r.values.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Every player that has a row in any round
    pub fn players(&self) -> BTreeSet<PlayerId> {
        self.rounds
            .iter()
            .flat_map(|r| r.values.keys().copied())
            .collect()
    }

    /// Append a row per player, pre-filled with the declared defaults
    pub fn add_new_round(&mut self, number: u32, players: impl IntoIterator<Item = PlayerId>) {
        let values = players
            .into_iter()
            .map(|id| (id, self.defaults.clone()))
            .collect();
        self.rounds.push(RoundRows { number, values });
    }

    /// Drop every round numbered above `keep_through`
    pub fn crop(&mut self, keep_through: u32) {
        self.rounds.retain(|r| r.number <= keep_through);
    }

    fn columns_for(&self, name: &str, side: Side) -> Result<(usize, Option<usize>), StatError> {
        let base = self.column(name)?;
        let team = self.team_columns.get(&base).and_then(|cols| match side {
            Side::Terrorist => Some(cols[0]),
            Side::CounterTerrorist => Some(cols[1]),
            _ => None,
        });
        Ok((base, team))
    }

    fn current_row_mut(&mut self, player: PlayerId) -> Option<&mut Vec<f64>> {
        let row = self.rounds.last_mut()?.values.get_mut(&player);
        if row.is_none() {
            trace!(calculator = self.calculator, player, "no row for player this round");
        }
        row
    }

    /// Add to a stat in the current round, and to its team sibling for `side`
    pub fn add_player_stat(
        &mut self,
        player: PlayerId,
        side: Side,
        delta: f64,
        name: &str,
    ) -> Result<(), StatError> {
        let (base, team) = self.columns_for(name, side)?;
        if let Some(row) = self.current_row_mut(player) {
            row[base] += delta;
            if let Some(team) = team {
                row[team] += delta;
            }
        }
        Ok(())
    }

    /// Absolute counterpart of `add_player_stat`, current round only
    pub fn set_player_stat(
        &mut self,
        player: PlayerId,
        side: Side,
        value: f64,
        name: &str,
    ) -> Result<(), StatError> {
        let (base, team) = self.columns_for(name, side)?;
        if let Some(row) = self.current_row_mut(player) {
            row[base] = value;
            if let Some(team) = team {
                row[team] = value;
            }
        }
        Ok(())
    }

    /// Current-round value of a single column
    pub fn value(&self, player: PlayerId, column: &str) -> Result<Option<f64>, StatError> {
        let idx = self.column(column)?;
        Ok(self
            .rounds
            .last()
            .and_then(|r| r.values.get(&player))
            .map(|row| row[idx]))
    }

    /// Overwrite a single column in the current round
    pub fn set_value(
        &mut self,
        player: PlayerId,
        column: &str,
        value: f64,
    ) -> Result<(), StatError> {
        let idx = self.column(column)?;
        if let Some(row) = self.current_row_mut(player) {
            row[idx] = value;
        }
        Ok(())
    }

    pub fn round_statistic(&self, round: u32, player: PlayerId) -> Option<&[f64]> {
        self.rounds
            .iter()
            .rev()
            .find(|r| r.number == round)?
            .values
            .get(&player)
            .map(Vec::as_slice)
    }

    /// Element-wise sum of every round row containing the player
    pub fn match_statistic(&self, player: PlayerId) -> Option<Vec<f64>> {
        let mut total: Option<Vec<f64>> = None;
        for row in self.rounds.iter().filter_map(|r| r.values.get(&player)) {
            match total.as_mut() {
                Some(acc) => acc.iter_mut().zip(row).for_each(|(a, v)| *a += v),
                None => total = Some(row.clone()),
            }
        }
        total
    }

    /// Evaluate a ratio over a value vector from this table
    ///
    /// `None` for a zero denominator or a vector too short for this layout.
    pub fn ratio_value(
        &self,
        ratio: &RatioStat,
        values: &[f64],
    ) -> Result<Option<f64>, StatError> {
        let numerator = values.get(self.column(&ratio.numerator)?);
        let denominator = values.get(self.column(&ratio.denominator)?);
        Ok(match (numerator, denominator) {
            (Some(&n), Some(&d)) if d != 0.0 => Some(n / d),
            _ => None,
        })
    }
}
