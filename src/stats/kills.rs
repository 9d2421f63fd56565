//! Kills, deaths, assists, trades, clutches and KAST

use std::collections::HashMap;

use tracing::debug;

use crate::events::protocol::{
    is_bomb, EventKind, GameEvent, PlayerId, PlayerRef, Side, TimedEvent,
};

use super::table::{RatioStat, StatDef, StatError, StatTable, ROUNDS};
use super::{Calculator, RoundContext};

pub const KILLS: &str = "Kills";
pub const DEATHS: &str = "Deaths";
pub const ASSISTS: &str = "Assists";
pub const HEADSHOT_KILLS: &str = "Headshot Kills";
pub const FIRST_KILLS: &str = "First Kills";
pub const FIRST_KILL_ATTEMPTS: &str = "First Kill Attempts";
pub const TRADES: &str = "Trades";
pub const WAS_TRADED: &str = "Was Traded";
pub const CLUTCH_ATTEMPTS: &str = "Clutch Attempts";
pub const CLUTCHES: &str = "Clutches";
pub const KAST: &str = "KAST";
pub const MULTIKILLS: &str = "Multikills";

/// Largest bucket for clutch and multi-kill stats
pub const MAX_BUCKET: usize = 5;

pub const CLUTCH_ATTEMPT_BUCKETS: [&str; MAX_BUCKET] = [
    "1v1 Attempts",
    "1v2 Attempts",
    "1v3 Attempts",
    "1v4 Attempts",
    "1v5 Attempts",
];
pub const CLUTCH_WIN_BUCKETS: [&str; MAX_BUCKET] =
    ["1v1 Wins", "1v2 Wins", "1v3 Wins", "1v4 Wins", "1v5 Wins"];
pub const KILL_BUCKETS: [&str; MAX_BUCKET] = ["1K", "2K", "3K", "4K", "5K"];

const STATS: &[StatDef] = &[
    StatDef::counter(KILLS),
    StatDef::counter(DEATHS),
    StatDef::counter(ASSISTS),
    StatDef::counter(HEADSHOT_KILLS),
    StatDef::counter(FIRST_KILLS),
    StatDef::counter(FIRST_KILL_ATTEMPTS),
    StatDef::counter(TRADES),
    StatDef::counter(WAS_TRADED),
    StatDef::counter(CLUTCH_ATTEMPTS),
    StatDef::counter(CLUTCHES),
    StatDef::counter(CLUTCH_ATTEMPT_BUCKETS[0]),
    StatDef::counter(CLUTCH_ATTEMPT_BUCKETS[1]),
    StatDef::counter(CLUTCH_ATTEMPT_BUCKETS[2]),
    StatDef::counter(CLUTCH_ATTEMPT_BUCKETS[3]),
    StatDef::counter(CLUTCH_ATTEMPT_BUCKETS[4]),
    StatDef::counter(CLUTCH_WIN_BUCKETS[0]),
    StatDef::counter(CLUTCH_WIN_BUCKETS[1]),
    StatDef::counter(CLUTCH_WIN_BUCKETS[2]),
    StatDef::counter(CLUTCH_WIN_BUCKETS[3]),
    StatDef::counter(CLUTCH_WIN_BUCKETS[4]),
    StatDef::counter(KAST),
    StatDef::counter(KILL_BUCKETS[0]),
    StatDef::counter(KILL_BUCKETS[1]),
    StatDef::counter(KILL_BUCKETS[2]),
    StatDef::counter(KILL_BUCKETS[3]),
    StatDef::counter(KILL_BUCKETS[4]),
    StatDef::counter(MULTIKILLS),
];

/// A kill that can still be traded
#[derive(Debug, Clone, Copy)]
struct TradeEntry {
    victim: PlayerId,
    victim_side: Side,
    time: f64,
}

/// Last player alive on a side facing at least one opponent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClutchSituation {
    pub clutcher: PlayerId,
    pub side: Side,
    pub opponents: usize,
}

/// Per-player tallies used for end-of-round credits
#[derive(Debug, Clone, Copy, Default)]
struct RoundTally {
    kills: u32,
    assists: u32,
    deaths: u32,
    traded: bool,
}

pub struct KillCalculator {
    table: StatTable,
    first_kill_done: bool,
    /// Pending kills keyed by the killer's id
    trade_window: HashMap<PlayerId, Vec<TradeEntry>>,
    alive: HashMap<PlayerId, Side>,
    clutches: Vec<ClutchSituation>,
    tallies: HashMap<PlayerId, RoundTally>,
}

impl KillCalculator {
    pub fn new() -> Result<Self, StatError> {
        let ratios = vec![
            RatioStat::new("K/D", KILLS, DEATHS),
            RatioStat::new("KPR", KILLS, ROUNDS),
            RatioStat::new("Headshot Ratio", HEADSHOT_KILLS, KILLS),
            RatioStat::new("KAST Ratio", KAST, ROUNDS),
        ];
        Ok(Self {
            table: StatTable::new("kills", STATS, ratios)?,
            first_kill_done: false,
            trade_window: HashMap::new(),
            alive: HashMap::new(),
            clutches: Vec::new(),
            tallies: HashMap::new(),
        })
    }

    /// Clutch situations recorded so far this round
    pub fn clutches(&self) -> &[ClutchSituation] {
        &self.clutches
    }

    fn reset_round(&mut self, ctx: &RoundContext<'_>) {
        self.first_kill_done = false;
        self.trade_window.clear();
        self.clutches.clear();
        self.tallies.clear();
        self.alive = ctx.roster.iter().map(|e| (e.id, e.team)).collect();
    }

    #[allow(clippy::too_many_arguments)]
    fn on_kill(
        &mut self,
        time: f64,
        killer: Option<&PlayerRef>,
        victim: &PlayerRef,
        assister: Option<&PlayerRef>,
        weapon: &str,
        headshot: bool,
        trade_interval: f64,
    ) -> Result<(), StatError> {
        self.table.add_player_stat(victim.id, victim.team, 1.0, DEATHS)?;
        self.tallies.entry(victim.id).or_default().deaths += 1;

        match killer {
            None => {
                if !is_bomb(weapon) {
                    // World kill: counts against the victim
                    self.table.add_player_stat(victim.id, victim.team, -1.0, KILLS)?;
                }
            }
            Some(killer) if killer.id == victim.id || killer.is_teammate_of(victim) => {
                self.table.add_player_stat(killer.id, killer.team, -1.0, KILLS)?;
            }
            Some(killer) => {
                self.table.add_player_stat(killer.id, killer.team, 1.0, KILLS)?;
                if headshot {
                    self.table
                        .add_player_stat(killer.id, killer.team, 1.0, HEADSHOT_KILLS)?;
                }
                if killer.is_opponent_of(victim) {
                    self.tallies.entry(killer.id).or_default().kills += 1;
                    self.first_duel(killer, victim)?;
                    self.trade(time, killer, victim, trade_interval)?;
                }
            }
        }

        if let Some(assister) = assister {
            let credited =
                assister.is_opponent_of(victim) && killer.map(|k| k.id) != Some(assister.id);
            if credited {
                self.table
                    .add_player_stat(assister.id, assister.team, 1.0, ASSISTS)?;
                self.tallies.entry(assister.id).or_default().assists += 1;
            }
        }

        let side = self.alive.remove(&victim.id).unwrap_or(victim.team);
        self.detect_clutch(side);
        Ok(())
    }

    fn first_duel(&mut self, killer: &PlayerRef, victim: &PlayerRef) -> Result<(), StatError> {
        if self.first_kill_done {
            return Ok(());
        }
        self.first_kill_done = true;
        self.table.add_player_stat(killer.id, killer.team, 1.0, FIRST_KILLS)?;
        self.table
            .add_player_stat(killer.id, killer.team, 1.0, FIRST_KILL_ATTEMPTS)?;
        self.table
            .add_player_stat(victim.id, victim.team, 1.0, FIRST_KILL_ATTEMPTS)
    }

    fn trade(
        &mut self,
        time: f64,
        killer: &PlayerRef,
        victim: &PlayerRef,
        trade_interval: f64,
    ) -> Result<(), StatError> {
        self.trade_window.retain(|_, entries| {
            entries.retain(|e| time - e.time < trade_interval);
            !entries.is_empty()
        });

        // The victim's own recent kills are avenged by this one
        if let Some(avenged) = self.trade_window.remove(&victim.id) {
            for entry in &avenged {
                self.table
                    .add_player_stat(entry.victim, entry.victim_side, 1.0, WAS_TRADED)?;
                self.tallies.entry(entry.victim).or_default().traded = true;
            }
            self.table.add_player_stat(killer.id, killer.team, 1.0, TRADES)?;
            debug!(killer = killer.id, traded = avenged.len(), "trade kill");
        }

        self.trade_window.entry(killer.id).or_default().push(TradeEntry {
            victim: victim.id,
            victim_side: victim.team,
            time,
        });
        Ok(())
    }

    fn detect_clutch(&mut self, side: Side) {
        let Some(opponent) = side.opponent() else {
            return;
        };
        if self.clutches.iter().any(|c| c.side == side) {
            return;
        }

        let mut survivors = self.alive.iter().filter(|(_, s)| **s == side).map(|(id, _)| *id);
        let (Some(clutcher), None) = (survivors.next(), survivors.next()) else {
            return;
        };
        let opponents = self.alive.values().filter(|s| **s == opponent).count();
        if opponents == 0 {
            return;
        }

        debug!(clutcher, opponents, "clutch situation");
        self.clutches.push(ClutchSituation {
            clutcher,
            side,
            opponents,
        });
    }

    fn finish_round(&mut self, ctx: &RoundContext<'_>) -> Result<(), StatError> {
        for situation in std::mem::take(&mut self.clutches) {
            let bucket = situation.opponents.clamp(1, MAX_BUCKET) - 1;
            let (id, side) = (situation.clutcher, situation.side);
            self.table.add_player_stat(id, side, 1.0, CLUTCH_ATTEMPTS)?;
            self.table
                .add_player_stat(id, side, 1.0, CLUTCH_ATTEMPT_BUCKETS[bucket])?;
            if ctx.winner == Some(side) {
                self.table.add_player_stat(id, side, 1.0, CLUTCHES)?;
                self.table
                    .add_player_stat(id, side, 1.0, CLUTCH_WIN_BUCKETS[bucket])?;
            }
        }

        for entry in ctx.roster.iter() {
            let tally = self.tallies.get(&entry.id).copied().unwrap_or_default();
            if tally.kills > 0 || tally.assists > 0 || tally.deaths == 0 || tally.traded {
                self.table.add_player_stat(entry.id, entry.team, 1.0, KAST)?;
            }
            if tally.kills > 0 {
                let bucket = (tally.kills as usize).min(MAX_BUCKET) - 1;
                self.table
                    .add_player_stat(entry.id, entry.team, 1.0, KILL_BUCKETS[bucket])?;
                if tally.kills > 1 {
                    self.table.add_player_stat(entry.id, entry.team, 1.0, MULTIKILLS)?;
                }
            }
        }

        self.trade_window.clear();
        self.tallies.clear();
        Ok(())
    }
}

impl Calculator for KillCalculator {
    fn subscriptions(&self) -> &'static [EventKind] {
        &[
            EventKind::FreezeTimeEnded,
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

    fn handle(&mut self, event: &TimedEvent, ctx: &RoundContext<'_>) -> Result<(), StatError> {
        match &event.event {
            GameEvent::FreezeTimeEnded => {
                self.reset_round(ctx);
                Ok(())
            }
            GameEvent::Kill {
                killer,
                victim: Some(victim),
                assister,
                weapon,
                headshot,
            } => self.on_kill(
                event.time,
                killer.as_ref(),
                victim,
                assister.as_ref(),
                weapon,
                *headshot,
                ctx.trade_interval_secs,
            ),
            GameEvent::RoundEndOfficial => self.finish_round(ctx),
            _ => Ok(()),
        }
    }
}
