//! Score counters, half-time side mapping and match point

use serde::{Deserialize, Serialize};

use crate::events::protocol::Side;

/// Rounds per regulation half
pub const HALF_ROUNDS: u32 = 15;
/// Rounds per overtime half
pub const OVERTIME_HALF_ROUNDS: u32 = 3;

/// Raw score counters as reported per side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBoard {
    pub terrorist: u32,
    pub counter_terrorist: u32,
}

/// Scores attributed to the teams by the side they started on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamScores {
    pub started_t: u32,
    pub started_ct: u32,
}

impl ScoreBoard {
    pub fn raw(&self, side: Side) -> Option<u32> {
        match side {
            Side::Terrorist => Some(self.terrorist),
            Side::CounterTerrorist => Some(self.counter_terrorist),
            _ => None,
        }
    }

    pub fn apply(&mut self, side: Side, score: u32) {
        match side {
            Side::Terrorist => self.terrorist = score,
            Side::CounterTerrorist => self.counter_terrorist = score,
            _ => {}
        }
    }

    /// Number of the round about to be played
    pub fn round_number(&self) -> u32 {
        self.terrorist + self.counter_terrorist + 1
    }

    /// Side that ends the match by winning the next round, if any
    pub fn match_point_side(&self) -> Option<Side> {
        Side::PLAYING.into_iter().find(|&side| {
            let own = self.raw(side).unwrap_or(0);
            let other = side.opponent().and_then(|o| self.raw(o)).unwrap_or(0);
            own >= HALF_ROUNDS && own % OVERTIME_HALF_ROUNDS == 0 && own > other
        })
    }

    /// Map raw counters to starting teams as of `round`
    pub fn team_scores(&self, round: u32) -> TeamScores {
        if sides_swapped(round) {
            TeamScores {
                started_t: self.counter_terrorist,
                started_ct: self.terrorist,
            }
        } else {
            TeamScores {
                started_t: self.terrorist,
                started_ct: self.counter_terrorist,
            }
        }
    }
}

/// Whether the team that started T plays CT in `round`
///
/// Regulation swaps after round 15. Overtime keeps second-half sides for its
/// first three rounds, then alternates every three rounds.
pub fn sides_swapped(round: u32) -> bool {
    let regulation = HALF_ROUNDS * 2;
    if round <= HALF_ROUNDS {
        false
    } else if round <= regulation {
        true
    } else {
        ((round - regulation - 1) / OVERTIME_HALF_ROUNDS) % 2 == 0
    }
}
