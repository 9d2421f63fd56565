//! Flashbang usage: blind time, players flashed, flash-assisted deaths

use std::collections::HashMap;

use crate::events::protocol::{
    EventKind, GameEvent, GrenadeKind, PlayerId, PlayerRef, Side, TimedEvent,
};

use super::table::{team_stat_name, RatioStat, StatDef, StatError, StatTable};
use super::{Calculator, RoundContext};

pub const FLASHES_THROWN: &str = "Flashes Thrown";
pub const ENEMIES_FLASHED: &str = "Enemies Flashed";
pub const TEAMMATES_FLASHED: &str = "Teammates Flashed";
pub const ENEMY_BLIND_TIME: &str = "Enemy Blind Time";
pub const TEAMMATE_BLIND_TIME: &str = "Teammate Blind Time";
pub const ENEMY_FLASH_DEATHS: &str = "Flashes Leading To Enemy Death";
pub const TEAMMATE_FLASH_DEATHS: &str = "Flashes Leading To Teammate Death";
pub const NET_PLAYERS_FLASHED: &str = "Net Players Flashed";
pub const NET_BLIND_TIME: &str = "Net Blind Time";
pub const NET_FLASH_DEATHS: &str = "Net Flash Deaths";

const STATS: &[StatDef] = &[
    StatDef::counter(FLASHES_THROWN),
    StatDef::counter(ENEMIES_FLASHED),
    StatDef::counter(TEAMMATES_FLASHED),
    StatDef::counter(ENEMY_BLIND_TIME),
    StatDef::counter(TEAMMATE_BLIND_TIME),
    StatDef::counter(ENEMY_FLASH_DEATHS),
    StatDef::counter(TEAMMATE_FLASH_DEATHS),
    StatDef::counter(NET_PLAYERS_FLASHED),
    StatDef::counter(NET_BLIND_TIME),
    StatDef::counter(NET_FLASH_DEATHS),
];

/// Net columns as (net, enemy, teammate)
const NET_COLUMNS: [(&str, &str, &str); 3] = [
    (NET_PLAYERS_FLASHED, ENEMIES_FLASHED, TEAMMATES_FLASHED),
    (NET_BLIND_TIME, ENEMY_BLIND_TIME, TEAMMATE_BLIND_TIME),
    (NET_FLASH_DEATHS, ENEMY_FLASH_DEATHS, TEAMMATE_FLASH_DEATHS),
];

/// The blind currently affecting a player
#[derive(Debug, Clone)]
struct BlindEffect {
    attacker: PlayerRef,
    expires_at: f64,
}

pub struct FlashCalculator {
    table: StatTable,
    effects: HashMap<PlayerId, BlindEffect>,
}

impl FlashCalculator {
    pub fn new() -> Result<Self, StatError> {
        let ratios = vec![RatioStat::new(
            "Blind Time Per Flash",
            ENEMY_BLIND_TIME,
            FLASHES_THROWN,
        )];
        Ok(Self {
            table: StatTable::new("flash", STATS, ratios)?,
            effects: HashMap::new(),
        })
    }

    fn on_flashed(
        &mut self,
        time: f64,
        victim: &PlayerRef,
        attacker: &PlayerRef,
        duration: f64,
    ) -> Result<(), StatError> {
        let expires_at = time + duration;
        if let Some(current) = self.effects.get(&victim.id) {
            // Overlapping blinds do not stack
            if expires_at <= current.expires_at {
                return Ok(());
            }
        }
        self.effects.insert(
            victim.id,
            BlindEffect {
                attacker: attacker.clone(),
                expires_at,
            },
        );

        let (count, blind_time) = if attacker.is_opponent_of(victim) {
            (ENEMIES_FLASHED, ENEMY_BLIND_TIME)
        } else if attacker.is_teammate_of(victim) {
            (TEAMMATES_FLASHED, TEAMMATE_BLIND_TIME)
        } else {
            return Ok(());
        };
        self.table.add_player_stat(attacker.id, attacker.team, 1.0, count)?;
        self.table
            .add_player_stat(attacker.id, attacker.team, duration, blind_time)
    }

    fn on_death(&mut self, time: f64, victim: &PlayerRef) -> Result<(), StatError> {
        let Some(effect) = self.effects.remove(&victim.id) else {
            return Ok(());
        };
        if time >= effect.expires_at {
            return Ok(());
        }

        let attacker = &effect.attacker;
        let stat = if attacker.is_opponent_of(victim) {
            ENEMY_FLASH_DEATHS
        } else if attacker.is_teammate_of(victim) {
            TEAMMATE_FLASH_DEATHS
        } else {
            return Ok(());
        };
        self.table.add_player_stat(attacker.id, attacker.team, 1.0, stat)
    }

    fn compute_net(&mut self) -> Result<(), StatError> {
        let mut columns = Vec::with_capacity(NET_COLUMNS.len() * 3);
        for (net, enemy, teammate) in NET_COLUMNS {
            columns.push((net.to_string(), enemy.to_string(), teammate.to_string()));
            for side in Side::PLAYING {
                if let (Some(n), Some(e), Some(m)) = (
                    team_stat_name(net, side),
                    team_stat_name(enemy, side),
                    team_stat_name(teammate, side),
                ) {
                    columns.push((n, e, m));
                }
            }
        }

        for player in self.table.current_players() {
            for (net, enemy, teammate) in &columns {
                let enemy = self.table.value(player, enemy)?.unwrap_or(0.0);
                let teammate = self.table.value(player, teammate)?.unwrap_or(0.0);
                self.table.set_value(player, net, enemy - teammate)?;
            }
        }
        Ok(())
    }
}

impl Calculator for FlashCalculator {
    fn subscriptions(&self) -> &'static [EventKind] {
        &[
            EventKind::FreezeTimeEnded,
            EventKind::GrenadeThrown,
            EventKind::PlayerFlashed,
            EventKind::Kill,
            EventKind::RoundEndOfficial,
        ]
    }

    fn table(&self) -> &StatTable {
        &self.table
    }

    fn table_mut(&mut self) -> &mut StatTable {
        &mut self.table
    }

    fn handle(&mut self, event: &TimedEvent, _ctx: &RoundContext<'_>) -> Result<(), StatError> {
        match &event.event {
            GameEvent::FreezeTimeEnded => {
                self.effects.clear();
                Ok(())
            }
            GameEvent::GrenadeThrown {
                thrower: Some(thrower),
                grenade: GrenadeKind::Flashbang,
            } => self
                .table
                .add_player_stat(thrower.id, thrower.team, 1.0, FLASHES_THROWN),
            GameEvent::PlayerFlashed {
                victim,
                attacker: Some(attacker),
                duration,
            } => self.on_flashed(event.time, victim, attacker, *duration),
            GameEvent::Kill {
                victim: Some(victim),
                ..
            } => self.on_death(event.time, victim),
            GameEvent::RoundEndOfficial => {
                self.effects.clear();
                self.compute_net()
            }
            _ => Ok(()),
        }
    }
}
