//! Damage dealt per player

use crate::events::protocol::{EventKind, GameEvent, TimedEvent};

use super::table::{RatioStat, StatDef, StatError, StatTable, ROUNDS};
use super::{Calculator, RoundContext};

pub const TOTAL_DAMAGE: &str = "Total Damage Done";
/// Portion of the total dealt to teammates
pub const TEAM_DAMAGE: &str = "Team Damage Done";

const STATS: &[StatDef] = &[StatDef::counter(TOTAL_DAMAGE), StatDef::counter(TEAM_DAMAGE)];

/// Accumulates raw damage dealt by attackers
pub struct DamageCalculator {
    table: StatTable,
}

impl DamageCalculator {
    pub fn new() -> Result<Self, StatError> {
        let ratios = vec![RatioStat::new("ADR", TOTAL_DAMAGE, ROUNDS)];
        Ok(Self {
            table: StatTable::new("damage", STATS, ratios)?,
        })
    }
}

impl Calculator for DamageCalculator {
    fn subscriptions(&self) -> &'static [EventKind] {
        &[EventKind::PlayerHurt]
    }

    fn table(&self) -> &StatTable {
        &self.table
    }

    fn table_mut(&mut self) -> &mut StatTable {
        &mut self.table
    }

    fn handle(&mut self, event: &TimedEvent, _ctx: &RoundContext<'_>) -> Result<(), StatError> {
        let GameEvent::PlayerHurt {
            attacker: Some(attacker),
            victim,
            damage,
            ..
        } = &event.event
        else {
            return Ok(());
        };

        // Self-inflicted damage is not damage dealt
        if attacker.id == victim.id {
            return Ok(());
        }

        let damage = f64::from(*damage);
        self.table
            .add_player_stat(attacker.id, attacker.team, damage, TOTAL_DAMAGE)?;
        if attacker.is_teammate_of(victim) {
            self.table
                .add_player_stat(attacker.id, attacker.team, damage, TEAM_DAMAGE)?;
        }
        Ok(())
    }
}
