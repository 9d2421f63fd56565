//! Helpers for driving a single calculator in unit tests

use crate::events::protocol::{GameEvent, PlayerRef, Side, TimedEvent};
use crate::game::roster::{Participants, Roster};

use super::{Calculator, RoundContext, StatError, ROUNDS};

pub const TRADE_WINDOW: f64 = 5.0;

pub fn t(id: u64) -> PlayerRef {
    PlayerRef::new(id, format!("t{id}"), Side::Terrorist)
}

pub fn ct(id: u64) -> PlayerRef {
    PlayerRef::new(id, format!("ct{id}"), Side::CounterTerrorist)
}

pub fn roster(players: &[PlayerRef]) -> Roster {
    let mut participants = Participants::new();
    for p in players {
        participants.observe(p);
    }
    participants.snapshot()
}

pub fn at(time: f64, event: GameEvent) -> TimedEvent {
    TimedEvent::new((time * 64.0) as u64, time, event)
}

pub fn ctx(round: u32, roster: &Roster, winner: Option<Side>) -> RoundContext<'_> {
    RoundContext {
        round,
        roster,
        winner,
        trade_interval_secs: TRADE_WINDOW,
    }
}

pub fn kill(killer: Option<&PlayerRef>, victim: &PlayerRef) -> GameEvent {
    GameEvent::Kill {
        killer: killer.cloned(),
        victim: Some(victim.clone()),
        assister: None,
        weapon: "ak47".into(),
        headshot: false,
    }
}

/// Create the round's rows the way the controller does, then notify
pub fn begin_round(
    calc: &mut dyn Calculator,
    round: u32,
    roster: &Roster,
    time: f64,
) -> Result<(), StatError> {
    let table = calc.table_mut();
    table.crop(round - 1);
    table.add_new_round(round, roster.ids());
    for entry in roster.iter() {
        table.add_player_stat(entry.id, entry.team, 1.0, ROUNDS)?;
    }
    calc.handle(&at(time, GameEvent::FreezeTimeEnded), &ctx(round, roster, None))
}

/// Current-round value of a column
pub fn value(calc: &dyn Calculator, player: u64, column: &str) -> f64 {
    calc.table()
        .value(player, column)
        .expect("known column")
        .expect("player row")
}
