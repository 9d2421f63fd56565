//! Participant tracking and per-round roster snapshots

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::events::protocol::{PlayerId, PlayerRef, Side};

/// Maximum players in a round roster (one slot each)
pub const MAX_SLOTS: usize = 10;

/// A player known to the match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub team: Side,
    pub connected: bool,
}

/// One roster line with its stable output slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: PlayerId,
    pub display_name: String,
    pub team: Side,
    /// Column slot 0..MAX_SLOTS, T players first
    pub slot: u8,
}

/// Players taking part in a round
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Non-empty and fits the slot layout
    pub fn is_valid(&self) -> bool {
        !self.entries.is_empty() && self.entries.len() <= MAX_SLOTS
    }

    pub fn iter(&self) -> impl Iterator<Item = &RosterEntry> {
        self.entries.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.entries.iter().map(|e| e.id)
    }

    pub fn get(&self, id: PlayerId) -> Option<&RosterEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn side_of(&self, id: PlayerId) -> Option<Side> {
        self.get(id).map(|e| e.team)
    }

    pub fn count_on(&self, side: Side) -> usize {
        self.entries.iter().filter(|e| e.team == side).count()
    }
}

/// Everyone seen in the stream, connected or not
#[derive(Debug, Clone, Default)]
pub struct Participants {
    players: BTreeMap<PlayerId, Player>,
}

impl Participants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record what an event tells us about a player
    pub fn observe(&mut self, player: &PlayerRef) {
        let known = self.players.entry(player.id).or_insert_with(|| Player {
            id: player.id,
            display_name: player.name.clone(),
            team: player.team,
            connected: true,
        });
        if !player.name.is_empty() {
            known.display_name.clone_from(&player.name);
        }
        if player.team != Side::Unassigned {
            known.team = player.team;
        }
    }

    pub fn connect(&mut self, player: &PlayerRef) {
        self.observe(player);
        if let Some(known) = self.players.get_mut(&player.id) {
            known.connected = true;
        }
    }

    pub fn disconnect(&mut self, id: PlayerId) {
        if let Some(known) = self.players.get_mut(&id) {
            known.connected = false;
        }
    }

    pub fn set_team(&mut self, id: PlayerId, team: Side) {
        self.players
            .entry(id)
            .or_insert_with(|| Player {
                id,
                display_name: String::new(),
                team,
                connected: true,
            })
            .team = team;
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Connected players on a playing side, T first, each ordered by id
    pub fn snapshot(&self) -> Roster {
        let mut playing: Vec<&Player> = self
            .players
            .values()
            .filter(|p| p.connected && p.team.is_playing())
            .collect();
        playing.sort_by_key(|p| (p.team != Side::Terrorist, p.id));

        let entries = playing
            .into_iter()
            .enumerate()
            .map(|(slot, p)| RosterEntry {
                id: p.id,
                display_name: p.display_name.clone(),
                team: p.team,
                slot: u8::try_from(slot).unwrap_or(u8::MAX),
            })
            .collect();

        Roster { entries }
    }
}
