//! Statistic calculators fed by the round lifecycle controller

pub mod damage;
pub mod flash;
pub mod kills;
pub mod table;

#[cfg(test)]
pub(crate) mod test_support;

pub use damage::DamageCalculator;
pub use flash::FlashCalculator;
pub use kills::KillCalculator;
pub use table::{team_stat_name, RatioStat, RoundRows, StatDef, StatError, StatTable, ROUNDS};

use crate::events::protocol::{EventKind, Side, TimedEvent};
use crate::game::roster::Roster;

/// What a calculator may know about the round an event belongs to
#[derive(Debug, Clone, Copy)]
pub struct RoundContext<'a> {
    pub round: u32,
    /// Roster fixed at structure creation
    pub roster: &'a Roster,
    /// Winner, once known
    pub winner: Option<Side>,
    pub trade_interval_secs: f64,
}

/// A statistic calculator
///
/// Lifecycle notifications arrive through `handle` like any other event:
/// `FreezeTimeEnded` once the round's rows exist, `RoundEndOfficial` once per
/// finished round.
pub trait Calculator {
    fn name(&self) -> &'static str {
        self.table().calculator()
    }

    /// Event kinds this calculator wants delivered
    fn subscriptions(&self) -> &'static [EventKind];

    fn table(&self) -> &StatTable;

    fn table_mut(&mut self) -> &mut StatTable;

    fn handle(&mut self, event: &TimedEvent, ctx: &RoundContext<'_>) -> Result<(), StatError>;
}

/// The standard calculator set, in delivery order
pub fn default_calculators() -> Result<Vec<Box<dyn Calculator>>, StatError> {
    Ok(vec![
        Box::new(DamageCalculator::new()?),
        Box::new(KillCalculator::new()?),
        Box::new(FlashCalculator::new()?),
    ])
}
