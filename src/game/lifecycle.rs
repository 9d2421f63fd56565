//! Round lifecycle controller
//!
//! Reconstructs round boundaries from an event stream whose order cannot be
//! trusted and decides which events reach the statistic calculators.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::events::bus::{EventBus, HandlerId};
use crate::events::protocol::{EventKind, GameEvent, RoundEndReason, Side, TimedEvent};
use crate::stats::{default_calculators, Calculator, RoundContext, StatError, ROUNDS};

use super::roster::{Participants, Roster};
use super::score::{ScoreBoard, TeamScores};

/// Controller settings
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    /// Seconds after a kill during which avenging it counts as a trade
    pub trade_interval_secs: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            trade_interval_secs: 5.0,
        }
    }
}

/// Lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// No round seen yet
    Idle,
    /// Last round-start failed validation; gameplay is dropped
    PendingStart,
    /// Round started, rows not created yet
    AwaitingStructure,
    /// Rows created, events forwarded
    Active,
    /// Winner known, waiting for the official end
    RoundEnded,
    /// Round processed
    RoundEndedOfficial,
    MatchEnded,
}

impl Phase {
    /// Per-round events may reach calculators
    pub fn structure_created(self) -> bool {
        matches!(self, Phase::Active | Phase::RoundEnded)
    }
}

/// Metadata kept for every accepted round
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundRecord {
    pub number: u32,
    /// Stream time of the round-start
    pub started_at: f64,
    pub freeze_ended: bool,
    pub winner: Option<Side>,
    pub reason: RoundEndReason,
    pub structure_created: bool,
    pub valid: bool,
    pub processed: bool,
    /// Side that ends the match by winning this round
    pub match_point: Option<Side>,
    pub roster: Roster,
}

impl RoundRecord {
    fn new(number: u32, started_at: f64, roster: Roster, match_point: Option<Side>) -> Self {
        Self {
            number,
            started_at,
            freeze_ended: false,
            winner: None,
            reason: RoundEndReason::default(),
            structure_created: false,
            valid: true,
            processed: false,
            match_point,
            roster,
        }
    }
}

/// Match-wide metadata
#[derive(Debug, Clone, Serialize)]
pub struct MatchRecord {
    pub session: Uuid,
    pub map_name: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub started: bool,
    pub ended: bool,
    pub team_scores: TeamScores,
}

impl MatchRecord {
    fn new() -> Self {
        Self {
            session: Uuid::new_v4(),
            map_name: None,
            started_at: None,
            started: false,
            ended: false,
            team_scores: TeamScores::default(),
        }
    }
}

/// Scratch state of the round being set up
#[derive(Debug, Clone, Copy, Default)]
struct RoundState {
    /// A score update arrived after the round-start was accepted
    score_after_start: bool,
    /// The round-start carried the previous round's number
    awaiting_score: bool,
    winner_decided: bool,
}

/// Points where collected data becomes final
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    RoundFinalized(u32),
    MatchEnded,
}

pub struct MatchController {
    settings: Settings,
    phase: Phase,
    warmup: bool,
    participants: Participants,
    scores: ScoreBoard,
    record: MatchRecord,
    rounds: Vec<RoundRecord>,
    state: RoundState,
    calculators: Vec<Box<dyn Calculator>>,
    bus: EventBus<EventKind>,
    boundaries: VecDeque<Boundary>,
}

impl MatchController {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            phase: Phase::Idle,
            warmup: false,
            participants: Participants::new(),
            scores: ScoreBoard::default(),
            record: MatchRecord::new(),
            rounds: Vec::new(),
            state: RoundState::default(),
            calculators: Vec::new(),
            bus: EventBus::new(),
            boundaries: VecDeque::new(),
        }
    }

    /// Controller with the damage, kill and flash calculators registered
    pub fn with_default_calculators(settings: Settings) -> Result<Self, StatError> {
        let mut controller = Self::new(settings);
        for calculator in default_calculators()? {
            controller.register(calculator);
        }
        debug!(kinds = controller.bus.active_kinds(), "event routes ready");
        Ok(controller)
    }

    pub fn register(&mut self, calculator: Box<dyn Calculator>) -> HandlerId {
        let id = self.calculators.len();
        for &kind in calculator.subscriptions() {
            self.bus.subscribe(kind, id);
        }
        debug!(
            calculator = calculator.name(),
            handler = id,
            "calculator registered"
        );
        self.calculators.push(calculator);
        id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    pub fn round(&self, number: u32) -> Option<&RoundRecord> {
        self.rounds.iter().find(|r| r.number == number)
    }

    pub fn match_record(&self) -> &MatchRecord {
        &self.record
    }

    pub fn scores(&self) -> ScoreBoard {
        self.scores
    }

    pub fn participants(&self) -> &Participants {
        &self.participants
    }

    pub fn calculators(&self) -> impl Iterator<Item = &dyn Calculator> {
        self.calculators.iter().map(|c| c.as_ref())
    }

    /// Take the boundaries reached since the last call
    pub fn drain_boundaries(&mut self) -> Vec<Boundary> {
        self.boundaries.drain(..).collect()
    }

    /// Feed one event
    ///
    /// Only configuration faults surface as errors; events that fail a guard
    /// are dropped.
    pub fn process(&mut self, event: &TimedEvent) -> Result<(), StatError> {
        event
            .event
            .for_each_player(|player| self.participants.observe(player));

        match &event.event {
            GameEvent::MatchInfo { map_name } => {
                self.record.map_name = Some(map_name.clone());
            }
            GameEvent::MatchStarted => {
                self.warmup = false;
                self.mark_started();
            }
            GameEvent::WarmupChanged { active } => {
                debug!(active, "warmup changed");
                self.warmup = *active;
            }
            GameEvent::PlayerConnected { player } => self.participants.connect(player),
            GameEvent::PlayerDisconnected { player_id } => {
                self.participants.disconnect(*player_id)
            }
            GameEvent::PlayerTeamChanged {
                player_id,
                new_team,
            } => self.participants.set_team(*player_id, *new_team),
            GameEvent::RoundStart => self.start_round(event)?,
            GameEvent::FreezeTimeEnded => {
                if self.phase == Phase::AwaitingStructure {
                    self.create_structure(event, true)?;
                } else {
                    trace!(phase = ?self.phase, "freeze time end dropped");
                }
            }
            GameEvent::ScoreUpdated {
                side,
                old_score,
                new_score,
            } => self.update_score(event, *side, *old_score, *new_score)?,
            GameEvent::RoundEnd { winner, reason } => {
                if self.forwarding() {
                    if let Some(round) = self.rounds.last_mut() {
                        if round.winner.is_none() {
                            round.winner = *winner;
                            round.reason = *reason;
                        }
                    }
                    self.phase = Phase::RoundEnded;
                    self.dispatch(event)?;
                }
            }
            GameEvent::RoundEndOfficial => {
                if self.forwarding() {
                    self.finish_round(event)?;
                } else {
                    trace!(phase = ?self.phase, "official end dropped");
                }
            }
            GameEvent::MatchEnded => {
                if self.forwarding() {
                    self.finish_round(event)?;
                }
                self.end_match();
            }
            GameEvent::Unknown => {}
            _ => {
                if self.phase == Phase::AwaitingStructure && event.event.kind().is_gameplay() {
                    debug!("no freeze time end, creating round from gameplay");
                    self.create_structure(event, false)?;
                }
                if self.forwarding() {
                    self.dispatch(event)?;
                }
            }
        }
        Ok(())
    }

    /// The single guard every per-round event passes
    fn forwarding(&self) -> bool {
        self.record.started && !self.record.ended && self.phase.structure_created()
    }

    fn mark_started(&mut self) {
        if !self.record.started {
            self.record.started = true;
            self.record.started_at = Some(Utc::now());
            info!(session = %self.record.session, "match started");
        }
    }

    fn start_round(&mut self, event: &TimedEvent) -> Result<(), StatError> {
        if self.record.ended {
            trace!("round start after match end dropped");
            return Ok(());
        }

        // Previous round never got its official end
        if self.phase.structure_created() {
            self.finish_round(event)?;
        }

        let number = self.scores.round_number();
        let current = self.rounds.last().map(|r| r.number);
        // The finished round's score has not been published yet
        let stale = self.phase == Phase::RoundEndedOfficial
            && current == Some(number)
            && !self.state.winner_decided;

        if stale {
            debug!(round = number, "round start ahead of score update");
            self.phase = Phase::AwaitingStructure;
            self.state = RoundState {
                awaiting_score: true,
                ..RoundState::default()
            };
            return Ok(());
        }

        let roster = self.participants.snapshot();
        let recorded = self.rounds.len() as u32;
        if !roster.is_valid() || self.warmup || number - 1 > recorded {
            debug!(
                round = number,
                players = roster.len(),
                warmup = self.warmup,
                recorded,
                "round start rejected"
            );
            if let Some(round) = self.rounds.last_mut() {
                if round.number == number && !round.processed {
                    round.valid = false;
                }
            }
            self.phase = Phase::PendingStart;
            self.state = RoundState::default();
            return Ok(());
        }

        self.mark_started();

        // Repeat of the round still being set up
        let duplicate = self
            .rounds
            .last()
            .is_some_and(|r| r.number == number && !r.processed && r.roster == roster);
        if duplicate {
            trace!(round = number, "duplicate round start");
            if self.phase == Phase::PendingStart {
                self.phase = Phase::AwaitingStructure;
            }
            return Ok(());
        }

        if self.rounds.len() >= number as usize {
            info!(
                round = number,
                discarded = self.rounds.len() + 1 - number as usize,
                "round replayed, discarding later rounds"
            );
        }
        self.state = RoundState::default();
        let match_point = self.scores.match_point_side();
        self.rounds.truncate(number as usize - 1);
        self.rounds
            .push(RoundRecord::new(number, event.time, roster, match_point));
        self.phase = Phase::AwaitingStructure;
        info!(round = number, match_point = ?match_point, "round started");
        self.dispatch(event)
    }

    fn create_structure(&mut self, event: &TimedEvent, explicit: bool) -> Result<(), StatError> {
        if self.state.score_after_start {
            self.state.score_after_start = false;
            self.start_round(event)?;
            if self.phase != Phase::AwaitingStructure {
                return Ok(());
            }
        }
        if self.state.awaiting_score {
            debug!("round start never confirmed by a score update");
            self.phase = Phase::PendingStart;
            return Ok(());
        }

        let roster = self.participants.snapshot();
        if !roster.is_valid() {
            debug!(players = roster.len(), "roster invalid at structure creation");
            if let Some(round) = self.rounds.last_mut() {
                round.valid = false;
            }
            self.phase = Phase::PendingStart;
            return Ok(());
        }

        let Some(round) = self.rounds.last_mut() else {
            return Ok(());
        };
        round.roster = roster;
        round.structure_created = true;
        round.freeze_ended = explicit;
        round.winner = None;
        round.reason = RoundEndReason::default();
        round.processed = false;
        round.valid = true;
        let number = round.number;

        for calculator in &mut self.calculators {
            let table = calculator.table_mut();
            table.crop(number - 1);
            table.add_new_round(number, round.roster.ids());
            for entry in round.roster.iter() {
                table.add_player_stat(entry.id, entry.team, 1.0, ROUNDS)?;
            }
        }

        self.phase = Phase::Active;
        info!(round = number, players = round.roster.len(), explicit, "round live");
        self.dispatch(&TimedEvent::new(
            event.tick,
            event.time,
            GameEvent::FreezeTimeEnded,
        ))
    }

    fn update_score(
        &mut self,
        event: &TimedEvent,
        side: Side,
        old_score: u32,
        new_score: u32,
    ) -> Result<(), StatError> {
        self.scores.apply(side, new_score);
        let round = self.rounds.last().map_or(1, |r| r.number);
        self.record.team_scores = self.scores.team_scores(round);

        match self.phase {
            Phase::AwaitingStructure => {
                self.state.score_after_start = true;
                if self.state.awaiting_score {
                    self.state.awaiting_score = false;
                    self.decide_winner(event, side, old_score, new_score)?;
                }
                Ok(())
            }
            Phase::Active | Phase::RoundEnded | Phase::RoundEndedOfficial => {
                self.decide_winner(event, side, old_score, new_score)
            }
            _ => Ok(()),
        }
    }

    fn decide_winner(
        &mut self,
        event: &TimedEvent,
        side: Side,
        old_score: u32,
        new_score: u32,
    ) -> Result<(), StatError> {
        if self.state.winner_decided || new_score <= old_score || !side.is_playing() {
            return Ok(());
        }
        self.state.winner_decided = true;

        let Some(round) = self.rounds.last_mut() else {
            return Ok(());
        };
        round.winner = Some(side);
        let (number, match_point) = (round.number, round.match_point);
        info!(
            round = number,
            winner = ?side,
            t = self.scores.terrorist,
            ct = self.scores.counter_terrorist,
            "round won"
        );

        if match_point == Some(side) {
            if self.forwarding() {
                self.finish_round(event)?;
            }
            self.end_match();
        }
        Ok(())
    }

    fn finish_round(&mut self, event: &TimedEvent) -> Result<(), StatError> {
        let Some(round) = self.rounds.last_mut() else {
            return Ok(());
        };
        if round.processed {
            return Ok(());
        }
        round.processed = true;
        let number = round.number;
        self.phase = Phase::RoundEndedOfficial;

        self.dispatch(&TimedEvent::new(
            event.tick,
            event.time,
            GameEvent::RoundEndOfficial,
        ))?;
        self.boundaries.push_back(Boundary::RoundFinalized(number));
        debug!(round = number, "round finalized");
        Ok(())
    }

    fn end_match(&mut self) {
        if self.record.ended {
            return;
        }
        self.record.ended = true;
        self.phase = Phase::MatchEnded;
        self.boundaries.push_back(Boundary::MatchEnded);
        info!(
            session = %self.record.session,
            rounds = self.rounds.len(),
            started_t = self.record.team_scores.started_t,
            started_ct = self.record.team_scores.started_ct,
            "match ended"
        );
    }

    fn dispatch(&mut self, event: &TimedEvent) -> Result<(), StatError> {
        let kind = event.event.kind();
        if !self.bus.is_active(kind) {
            return Ok(());
        }
        let Some(round) = self.rounds.last() else {
            return Ok(());
        };
        let ctx = RoundContext {
            round: round.number,
            roster: &round.roster,
            winner: round.winner,
            trade_interval_secs: self.settings.trade_interval_secs,
        };
        for &handler in self.bus.handlers(kind) {
            if let Some(calculator) = self.calculators.get_mut(handler) {
                calculator.handle(event, &ctx)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::events::protocol::PlayerRef;
    use crate::stats::kills::{DEATHS, KILLS};
    use crate::stats::test_support::{at, ct, kill, t};
    use crate::stats::StatTable;

    type Log = Rc<RefCell<Vec<(EventKind, u32)>>>;

    /// Records every event delivered to it
    struct Probe {
        table: StatTable,
        seen: Log,
    }

    impl Calculator for Probe {
        fn subscriptions(&self) -> &'static [EventKind] {
            &[
                EventKind::RoundStart,
                EventKind::FreezeTimeEnded,
                EventKind::Kill,
                EventKind::RoundEnd,
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
            self.seen.borrow_mut().push((event.event.kind(), ctx.round));
            Ok(())
        }
    }

    struct Harness {
        controller: MatchController,
        log: Log,
        time: f64,
    }

    impl Harness {
        fn new() -> Self {
            let mut controller =
                MatchController::with_default_calculators(Settings::default()).unwrap();
            let log = Log::default();
            controller.register(Box::new(Probe {
                table: StatTable::new("probe", &[], Vec::new()).unwrap(),
                seen: Rc::clone(&log),
            }));
            Self {
                controller,
                log,
                time: 0.0,
            }
        }

        fn send(&mut self, event: GameEvent) {
            self.time += 1.0;
            self.controller.process(&at(self.time, event)).unwrap();
        }

        fn connect(&mut self, players: &[&PlayerRef]) {
            for &player in players {
                self.send(GameEvent::PlayerConnected {
                    player: player.clone(),
                });
            }
        }

        fn score(&mut self, side: Side) {
            let old_score = self.controller.scores().raw(side).unwrap_or(0);
            self.send(GameEvent::ScoreUpdated {
                side,
                old_score,
                new_score: old_score + 1,
            });
        }

        fn seen(&self, kind: EventKind) -> Vec<u32> {
            self.log
                .borrow()
                .iter()
                .filter(|(k, _)| *k == kind)
                .map(|(_, round)| *round)
                .collect()
        }

        fn kills(&self) -> &StatTable {
            self.controller
                .calculators()
                .find(|c| c.name() == "kills")
                .unwrap()
                .table()
        }

        /// A full round won by `winner`
        fn play_round(&mut self, killer: &PlayerRef, victim: &PlayerRef, winner: Side) {
            self.send(GameEvent::RoundStart);
            self.send(GameEvent::FreezeTimeEnded);
            self.send(kill(Some(killer), victim));
            self.send(GameEvent::RoundEnd {
                winner: Some(winner),
                reason: RoundEndReason::TerroristsEliminated,
            });
            self.score(winner);
            self.send(GameEvent::RoundEndOfficial);
        }
    }

    #[test]
    fn test_empty_roster_creates_nothing() {
        let mut h = Harness::new();
        h.send(GameEvent::RoundStart);
        h.send(GameEvent::FreezeTimeEnded);
        h.send(kill(Some(&t(1)), &ct(2)));

        assert_eq!(h.controller.phase(), Phase::PendingStart);
        assert!(h.controller.rounds().is_empty());
        assert!(h.seen(EventKind::RoundStart).is_empty());
        assert!(h.seen(EventKind::Kill).is_empty());
        assert!(h.kills().rounds().is_empty());
    }

    #[test]
    fn test_warmup_rounds_are_rejected() {
        let mut h = Harness::new();
        let (a, b) = (t(1), ct(2));
        h.connect(&[&a, &b]);
        h.send(GameEvent::WarmupChanged { active: true });
        h.send(GameEvent::RoundStart);
        assert_eq!(h.controller.phase(), Phase::PendingStart);

        h.send(GameEvent::MatchStarted);
        h.send(GameEvent::RoundStart);
        assert_eq!(h.controller.phase(), Phase::AwaitingStructure);
        assert_eq!(h.seen(EventKind::RoundStart), vec![1]);
    }

    #[test]
    fn test_events_dropped_until_structure_created() {
        let mut h = Harness::new();
        let (a, b) = (t(1), ct(2));
        h.connect(&[&a, &b]);
        h.send(GameEvent::RoundStart);
        h.send(GameEvent::RoundEnd {
            winner: Some(Side::Terrorist),
            reason: RoundEndReason::default(),
        });
        h.send(GameEvent::RoundEndOfficial);

        assert_eq!(h.controller.phase(), Phase::AwaitingStructure);
        assert!(h.seen(EventKind::RoundEnd).is_empty());
        assert!(h.seen(EventKind::RoundEndOfficial).is_empty());
    }

    #[test]
    fn test_fallback_structure_from_gameplay() {
        let mut h = Harness::new();
        let (a, b) = (t(1), ct(2));
        h.connect(&[&a, &b]);
        h.send(GameEvent::RoundStart);
        h.send(kill(Some(&a), &b));

        assert_eq!(h.controller.phase(), Phase::Active);
        assert_eq!(h.seen(EventKind::FreezeTimeEnded), vec![1]);
        assert_eq!(h.seen(EventKind::Kill), vec![1]);
        assert!(!h.controller.rounds()[0].freeze_ended);
        assert_eq!(h.kills().value(1, KILLS).unwrap(), Some(1.0));
        assert_eq!(h.kills().value(1, ROUNDS).unwrap(), Some(1.0));
        assert_eq!(h.kills().value(2, DEATHS).unwrap(), Some(1.0));
    }

    #[test]
    fn test_rounds_follow_scores() {
        let mut h = Harness::new();
        let (a, b) = (t(1), ct(2));
        h.connect(&[&a, &b]);
        h.play_round(&a, &b, Side::Terrorist);
        h.play_round(&b, &a, Side::CounterTerrorist);

        let rounds = h.controller.rounds();
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[0].winner, Some(Side::Terrorist));
        assert_eq!(rounds[1].winner, Some(Side::CounterTerrorist));
        assert!(rounds.iter().all(|r| r.processed && r.structure_created));
        assert_eq!(h.seen(EventKind::RoundEndOfficial), vec![1, 2]);
        assert_eq!(
            h.controller.drain_boundaries(),
            vec![Boundary::RoundFinalized(1), Boundary::RoundFinalized(2)]
        );
        assert_eq!(h.kills().match_statistic(1).unwrap()[0], 2.0);
    }

    #[test]
    fn test_reentry_delivers_single_official_end() {
        let mut h = Harness::new();
        let (a, b) = (t(1), ct(2));
        h.connect(&[&a, &b]);
        h.send(GameEvent::RoundStart);
        h.send(GameEvent::FreezeTimeEnded);
        h.score(Side::Terrorist);
        // No official end before the next round
        h.send(GameEvent::RoundStart);
        h.send(GameEvent::RoundEndOfficial);
        h.send(GameEvent::FreezeTimeEnded);
        h.send(GameEvent::RoundEndOfficial);
        h.send(GameEvent::RoundEndOfficial);

        assert_eq!(h.seen(EventKind::RoundEndOfficial), vec![1, 2]);
        assert_eq!(h.controller.rounds().len(), 2);
    }

    #[test]
    fn test_score_after_start_renumbers_round() {
        let mut h = Harness::new();
        let (a, b) = (t(1), ct(2));
        h.connect(&[&a, &b]);
        h.send(GameEvent::RoundStart);
        h.send(GameEvent::FreezeTimeEnded);
        h.send(GameEvent::RoundEnd {
            winner: Some(Side::CounterTerrorist),
            reason: RoundEndReason::BombDefused,
        });

        // Next round starts before the previous result is published
        h.send(GameEvent::RoundStart);
        assert_eq!(h.seen(EventKind::RoundEndOfficial), vec![1]);
        h.score(Side::CounterTerrorist);
        h.send(kill(Some(&b), &a));

        let rounds = h.controller.rounds();
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[0].winner, Some(Side::CounterTerrorist));
        assert_eq!(rounds[1].number, 2);
        assert_eq!(h.controller.phase(), Phase::Active);
        assert_eq!(h.seen(EventKind::RoundStart), vec![1, 2]);
        assert_eq!(h.seen(EventKind::Kill), vec![2]);
        assert_eq!(h.kills().current_round(), Some(2));
    }

    #[test]
    fn test_rewind_with_new_roster_replaces_rounds() {
        let mut h = Harness::new();
        let (a, b, c) = (t(1), ct(2), ct(3));
        h.connect(&[&a, &b]);
        h.play_round(&a, &b, Side::Terrorist);
        h.play_round(&a, &b, Side::Terrorist);
        assert_eq!(h.kills().rounds().len(), 2);

        // Scores reset to 1-0: round 2 is replayed with an extra player
        h.send(GameEvent::ScoreUpdated {
            side: Side::Terrorist,
            old_score: 2,
            new_score: 1,
        });
        h.connect(&[&c]);
        h.send(GameEvent::RoundStart);
        h.send(GameEvent::FreezeTimeEnded);

        let rounds = h.controller.rounds();
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[1].roster.len(), 3);
        assert_eq!(h.seen(EventKind::RoundStart), vec![1, 2, 2]);
        let table = h.kills();
        assert_eq!(table.rounds().len(), 2);
        assert_eq!(table.round_statistic(2, 3).map(|row| row[0]), Some(1.0));
        assert_eq!(table.value(1, KILLS).unwrap(), Some(0.0));
    }

    #[test]
    fn test_duplicate_start_same_roster_is_ignored() {
        let mut h = Harness::new();
        let (a, b) = (t(1), ct(2));
        h.connect(&[&a, &b]);
        h.send(GameEvent::RoundStart);
        h.send(GameEvent::RoundStart);
        assert_eq!(h.controller.phase(), Phase::AwaitingStructure);

        h.send(GameEvent::FreezeTimeEnded);
        h.send(kill(Some(&a), &b));

        assert_eq!(h.seen(EventKind::RoundStart), vec![1]);
        assert_eq!(h.controller.rounds().len(), 1);
        assert_eq!(h.kills().value(1, KILLS).unwrap(), Some(1.0));
    }

    #[test]
    fn test_rollback_same_roster_replays_round() {
        let mut h = Harness::new();
        let (a, b) = (t(1), ct(2));
        h.connect(&[&a, &b]);
        h.play_round(&a, &b, Side::Terrorist);
        h.play_round(&a, &b, Side::Terrorist);

        // Backup restored to 1-0 with the same players
        h.send(GameEvent::ScoreUpdated {
            side: Side::Terrorist,
            old_score: 2,
            new_score: 1,
        });
        h.send(GameEvent::RoundStart);
        assert_eq!(h.controller.phase(), Phase::AwaitingStructure);
        h.send(GameEvent::FreezeTimeEnded);
        h.send(kill(Some(&b), &a));

        assert_eq!(h.controller.phase(), Phase::Active);
        let rounds = h.controller.rounds();
        assert_eq!(rounds.len(), 2);
        assert!(!rounds[1].processed);
        assert_eq!(rounds[1].winner, None);
        assert_eq!(h.seen(EventKind::RoundStart), vec![1, 2, 2]);
        assert_eq!(h.seen(EventKind::Kill), vec![1, 2, 2]);

        let table = h.kills();
        let kills = table.column(KILLS).unwrap();
        assert_eq!(table.rounds().len(), 2);
        assert_eq!(table.round_statistic(2, 1).map(|row| row[kills]), Some(0.0));
        assert_eq!(table.round_statistic(2, 2).map(|row| row[kills]), Some(1.0));
        assert_eq!(table.match_statistic(1).map(|row| row[kills]), Some(1.0));
    }

    #[test]
    fn test_start_during_live_round_finalizes_it() {
        let mut h = Harness::new();
        let (a, b) = (t(1), ct(2));
        h.connect(&[&a, &b]);
        h.send(GameEvent::RoundStart);
        h.send(GameEvent::FreezeTimeEnded);
        h.send(kill(Some(&a), &b));

        // No round end, score published after the next start
        h.send(GameEvent::RoundStart);
        assert_eq!(h.seen(EventKind::RoundEndOfficial), vec![1]);
        assert_eq!(h.controller.phase(), Phase::AwaitingStructure);
        h.score(Side::Terrorist);
        h.send(GameEvent::FreezeTimeEnded);
        h.send(kill(Some(&a), &b));
        h.send(GameEvent::RoundEndOfficial);

        let rounds = h.controller.rounds();
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[0].winner, Some(Side::Terrorist));
        assert_eq!(h.seen(EventKind::Kill), vec![1, 2]);
        assert_eq!(h.seen(EventKind::RoundEndOfficial), vec![1, 2]);

        let table = h.kills();
        let kills = table.column(KILLS).unwrap();
        assert_eq!(table.current_round(), Some(2));
        assert_eq!(table.round_statistic(1, 1).map(|row| row[kills]), Some(1.0));
        assert_eq!(table.round_statistic(2, 1).map(|row| row[kills]), Some(1.0));
        assert_eq!(
            h.controller.drain_boundaries(),
            vec![Boundary::RoundFinalized(1), Boundary::RoundFinalized(2)]
        );
    }

    #[test]
    fn test_match_point_win_ends_match() {
        let mut h = Harness::new();
        let (a, b) = (t(1), ct(2));
        h.connect(&[&a, &b]);
        h.send(GameEvent::ScoreUpdated {
            side: Side::Terrorist,
            old_score: 0,
            new_score: 15,
        });
        h.send(GameEvent::RoundStart);
        assert!(h.controller.rounds().is_empty());
        assert_eq!(h.controller.phase(), Phase::PendingStart);

        // Rounds must be contiguous, so build up a recorded history first
        let mut h = Harness::new();
        h.connect(&[&a, &b]);
        for _ in 0..15 {
            h.play_round(&a, &b, Side::Terrorist);
        }
        assert_eq!(h.controller.rounds()[15 - 1].match_point, None);
        h.send(GameEvent::RoundStart);
        h.send(GameEvent::FreezeTimeEnded);
        assert_eq!(h.controller.rounds()[15].match_point, Some(Side::Terrorist));
        h.score(Side::Terrorist);
        h.send(GameEvent::RoundEndOfficial);
        h.send(GameEvent::RoundStart);

        assert_eq!(h.controller.phase(), Phase::MatchEnded);
        assert!(h.controller.match_record().ended);
        assert_eq!(h.seen(EventKind::RoundEndOfficial).len(), 16);
        let boundaries = h.controller.drain_boundaries();
        assert_eq!(boundaries.last(), Some(&Boundary::MatchEnded));
        assert_eq!(
            boundaries
                .iter()
                .filter(|b| matches!(b, Boundary::RoundFinalized(_)))
                .count(),
            16
        );
        assert_eq!(h.controller.scores().terrorist, 16);
    }

    #[test]
    fn test_team_changes_apply_to_next_roster() {
        let mut h = Harness::new();
        let (a, b) = (t(1), ct(2));
        h.connect(&[&a, &b]);
        h.play_round(&a, &b, Side::Terrorist);
        h.send(GameEvent::PlayerTeamChanged {
            player_id: 1,
            new_team: Side::CounterTerrorist,
        });
        h.send(GameEvent::PlayerTeamChanged {
            player_id: 2,
            new_team: Side::Terrorist,
        });
        h.send(GameEvent::RoundStart);
        h.send(GameEvent::FreezeTimeEnded);

        let roster = &h.controller.rounds()[1].roster;
        assert_eq!(roster.side_of(1), Some(Side::CounterTerrorist));
        assert_eq!(roster.side_of(2), Some(Side::Terrorist));
    }
}
