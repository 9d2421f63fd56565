//! Match structure: participants, scores and the round lifecycle

pub mod lifecycle;
pub mod roster;
pub mod score;

pub use lifecycle::{Boundary, MatchController, MatchRecord, Phase, RoundRecord, Settings};
pub use roster::{Participants, Player, Roster, RosterEntry, MAX_SLOTS};
pub use score::{sides_swapped, ScoreBoard, TeamScores};
