//! Telemetry event definitions
//! These are the wire types produced by the replay decoder, one JSON object per event

use serde::{Deserialize, Serialize};

/// Persistent player identifier (account id from the decoder)
pub type PlayerId = u64;

/// Team side a player is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Side {
    #[default]
    #[serde(rename = "unassigned")]
    Unassigned,
    #[serde(rename = "spectator")]
    Spectator,
    #[serde(rename = "t", alias = "terrorist")]
    Terrorist,
    #[serde(rename = "ct", alias = "counter_terrorist")]
    CounterTerrorist,
}

impl Side {
    /// Sides that take part in rounds
    pub const PLAYING: [Side; 2] = [Side::Terrorist, Side::CounterTerrorist];

    pub fn is_playing(self) -> bool {
        matches!(self, Side::Terrorist | Side::CounterTerrorist)
    }

    pub fn opponent(self) -> Option<Side> {
        match self {
            Side::Terrorist => Some(Side::CounterTerrorist),
            Side::CounterTerrorist => Some(Side::Terrorist),
            _ => None,
        }
    }

    /// Short label used for team-suffixed stat names
    pub fn short_name(self) -> Option<&'static str> {
        match self {
            Side::Terrorist => Some("T"),
            Side::CounterTerrorist => Some("CT"),
            _ => None,
        }
    }
}

/// A player as seen by the decoder at the moment of an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRef {
    pub id: PlayerId,
    #[serde(default)]
    pub name: String,
    /// Team at event time
    #[serde(default)]
    pub team: Side,
}

impl PlayerRef {
    pub fn new(id: PlayerId, name: impl Into<String>, team: Side) -> Self {
        Self {
            id,
            name: name.into(),
            team,
        }
    }

    /// Both players are on the same playing side
    pub fn is_teammate_of(&self, other: &PlayerRef) -> bool {
        self.team.is_playing() && self.team == other.team
    }

    /// Both players are on opposing playing sides
    pub fn is_opponent_of(&self, other: &PlayerRef) -> bool {
        self.team.opponent() == Some(other.team)
    }
}

/// Grenade types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrenadeKind {
    Flashbang,
    HeGrenade,
    Smoke,
    Molotov,
    Incendiary,
    Decoy,
}

/// Why a round ended, as reported by the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundEndReason {
    TargetBombed,
    BombDefused,
    TerroristsEliminated,
    CounterTerroristsEliminated,
    TargetSaved,
    Surrender,
    Draw,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Telemetry events (round boundaries, combat, utility, roster changes)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// Match header information
    MatchInfo { map_name: String },

    /// Game left warm-up and the match went live
    MatchStarted,

    /// Final scoreboard shown
    MatchEnded,

    WarmupChanged { active: bool },

    PlayerConnected { player: PlayerRef },

    PlayerDisconnected { player_id: PlayerId },

    PlayerTeamChanged { player_id: PlayerId, new_team: Side },

    RoundStart,

    /// Freeze time is over, players can move
    FreezeTimeEnded,

    /// A side's score counter changed
    ScoreUpdated {
        side: Side,
        old_score: u32,
        new_score: u32,
    },

    /// Player killed
    Kill {
        killer: Option<PlayerRef>,
        victim: Option<PlayerRef>,
        assister: Option<PlayerRef>,
        /// Weapon name, e.g. "ak47", "c4"
        #[serde(default)]
        weapon: String,
        #[serde(default)]
        headshot: bool,
    },

    /// Damage registered
    PlayerHurt {
        attacker: Option<PlayerRef>,
        victim: PlayerRef,
        /// Raw damage dealt
        damage: u32,
        #[serde(default)]
        weapon: String,
    },

    /// Player blinded by a flashbang
    PlayerFlashed {
        victim: PlayerRef,
        attacker: Option<PlayerRef>,
        /// Blind duration in seconds
        duration: f64,
    },

    GrenadeThrown {
        thrower: Option<PlayerRef>,
        grenade: GrenadeKind,
    },

    GrenadeExploded {
        thrower: Option<PlayerRef>,
        grenade: GrenadeKind,
    },

    BombPlanted { player: Option<PlayerRef> },

    BombDefused { player: Option<PlayerRef> },

    BombExploded,

    WeaponFire { shooter: PlayerRef, weapon: String },

    Footstep { player: PlayerRef },

    /// Round winner decided
    RoundEnd {
        #[serde(default)]
        winner: Option<Side>,
        #[serde(default)]
        reason: RoundEndReason,
    },

    /// Round fully over (after the end-of-round delay)
    RoundEndOfficial,

    /// Anything the decoder emits that this crate does not consume
    #[serde(other)]
    Unknown,
}

/// Event category used for routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventKind {
    MatchInfo,
    MatchStarted,
    MatchEnded,
    WarmupChanged,
    PlayerConnected,
    PlayerDisconnected,
    PlayerTeamChanged,
    RoundStart,
    FreezeTimeEnded,
    ScoreUpdated,
    Kill,
    PlayerHurt,
    PlayerFlashed,
    GrenadeThrown,
    GrenadeExploded,
    BombPlanted,
    BombDefused,
    BombExploded,
    WeaponFire,
    Footstep,
    RoundEnd,
    RoundEndOfficial,
    Unknown,
}

impl EventKind {
    /// In-round activity: can start a round that never saw freeze time end
    pub fn is_gameplay(self) -> bool {
        matches!(
            self,
            EventKind::Kill
                | EventKind::PlayerHurt
                | EventKind::PlayerFlashed
                | EventKind::GrenadeThrown
                | EventKind::GrenadeExploded
                | EventKind::BombPlanted
                | EventKind::BombDefused
                | EventKind::BombExploded
                | EventKind::WeaponFire
                | EventKind::Footstep
        )
    }
}

impl GameEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GameEvent::MatchInfo { .. } => EventKind::MatchInfo,
            GameEvent::MatchStarted => EventKind::MatchStarted,
            GameEvent::MatchEnded => EventKind::MatchEnded,
            GameEvent::WarmupChanged { .. } => EventKind::WarmupChanged,
            GameEvent::PlayerConnected { .. } => EventKind::PlayerConnected,
            GameEvent::PlayerDisconnected { .. } => EventKind::PlayerDisconnected,
            GameEvent::PlayerTeamChanged { .. } => EventKind::PlayerTeamChanged,
            GameEvent::RoundStart => EventKind::RoundStart,
            GameEvent::FreezeTimeEnded => EventKind::FreezeTimeEnded,
            GameEvent::ScoreUpdated { .. } => EventKind::ScoreUpdated,
            GameEvent::Kill { .. } => EventKind::Kill,
            GameEvent::PlayerHurt { .. } => EventKind::PlayerHurt,
            GameEvent::PlayerFlashed { .. } => EventKind::PlayerFlashed,
            GameEvent::GrenadeThrown { .. } => EventKind::GrenadeThrown,
            GameEvent::GrenadeExploded { .. } => EventKind::GrenadeExploded,
            GameEvent::BombPlanted { .. } => EventKind::BombPlanted,
            GameEvent::BombDefused { .. } => EventKind::BombDefused,
            GameEvent::BombExploded => EventKind::BombExploded,
            GameEvent::WeaponFire { .. } => EventKind::WeaponFire,
            GameEvent::Footstep { .. } => EventKind::Footstep,
            GameEvent::RoundEnd { .. } => EventKind::RoundEnd,
            GameEvent::RoundEndOfficial => EventKind::RoundEndOfficial,
            GameEvent::Unknown => EventKind::Unknown,
        }
    }

    /// Visit every player referenced by this event
    pub fn for_each_player(&self, mut f: impl FnMut(&PlayerRef)) {
        match self {
            GameEvent::PlayerConnected { player }
            | GameEvent::Footstep { player }
            | GameEvent::WeaponFire {
                shooter: player, ..
            } => f(player),
            GameEvent::Kill {
                killer,
                victim,
                assister,
                ..
            } => [killer, victim, assister]
                .into_iter()
                .flatten()
                .for_each(f),
            GameEvent::PlayerHurt {
                attacker, victim, ..
            }
            | GameEvent::PlayerFlashed {
                victim, attacker, ..
            } => {
                f(victim);
                if let Some(attacker) = attacker {
                    f(attacker);
                }
            }
            GameEvent::GrenadeThrown { thrower, .. }
            | GameEvent::GrenadeExploded { thrower, .. }
            | GameEvent::BombPlanted { player: thrower }
            | GameEvent::BombDefused { player: thrower } => {
                if let Some(player) = thrower {
                    f(player);
                }
            }
            _ => {}
        }
    }
}

/// Whether a weapon name refers to the bomb
pub fn is_bomb(weapon: &str) -> bool {
    matches!(
        weapon.to_ascii_lowercase().as_str(),
        "c4" | "weapon_c4" | "planted_c4" | "bomb"
    )
}

/// An event together with its position in the stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    /// Demo tick
    #[serde(default)]
    pub tick: u64,
    /// Seconds since the start of the recording
    #[serde(default)]
    pub time: f64,
    pub event: GameEvent,
}

impl TimedEvent {
    pub fn new(tick: u64, time: f64, event: GameEvent) -> Self {
        Self { tick, time, event }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kill_event_from_json() {
        let line = r#"{"tick":1200,"time":18.75,"event":{"type":"kill",
            "killer":{"id":7,"name":"alpha","team":"t"},
            "victim":{"id":9,"name":"bravo","team":"ct"},
            "weapon":"ak47","headshot":true}}"#;
        let parsed: TimedEvent = serde_json::from_str(line).expect("parse");

        assert_eq!(parsed.tick, 1200);
        assert_eq!(parsed.event.kind(), EventKind::Kill);
        if let GameEvent::Kill {
            killer,
            victim,
            assister,
            headshot,
            ..
        } = &parsed.event
        {
            assert_eq!(killer.as_ref().map(|p| p.team), Some(Side::Terrorist));
            assert_eq!(victim.as_ref().map(|p| p.id), Some(9));
            assert!(assister.is_none());
            assert!(headshot);
        } else {
            panic!("Wrong event type");
        }
    }

    #[test]
    fn test_unrecognised_event_is_unknown() {
        let parsed: TimedEvent =
            serde_json::from_str(r#"{"event":{"type":"chat_message"}}"#).expect("parse");
        assert_eq!(parsed.event, GameEvent::Unknown);
        assert_eq!(parsed.time, 0.0);
    }

    #[test]
    fn test_round_end_defaults() {
        let parsed: GameEvent = serde_json::from_str(r#"{"type":"round_end"}"#).expect("parse");
        assert_eq!(
            parsed,
            GameEvent::RoundEnd {
                winner: None,
                reason: RoundEndReason::Unknown
            }
        );
    }

    #[test]
    fn test_for_each_player_visits_kill_participants() {
        let event = GameEvent::Kill {
            killer: Some(PlayerRef::new(1, "a", Side::Terrorist)),
            victim: Some(PlayerRef::new(2, "b", Side::CounterTerrorist)),
            assister: None,
            weapon: "awp".into(),
            headshot: false,
        };
        let mut seen = Vec::new();
        event.for_each_player(|p| seen.push(p.id));
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn test_side_relations() {
        let t = PlayerRef::new(1, "a", Side::Terrorist);
        let ct = PlayerRef::new(2, "b", Side::CounterTerrorist);
        let spec = PlayerRef::new(3, "c", Side::Spectator);
        assert!(t.is_opponent_of(&ct));
        assert!(!t.is_teammate_of(&ct));
        assert!(!spec.is_teammate_of(&spec));
        assert!(is_bomb("C4"));
        assert!(!is_bomb("world"));
    }
}
