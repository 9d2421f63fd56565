//! Telemetry event types and routing

pub mod bus;
pub mod protocol;

pub use bus::{EventBus, HandlerId};
pub use protocol::{
    is_bomb, EventKind, GameEvent, GrenadeKind, PlayerId, PlayerRef, RoundEndReason, Side,
    TimedEvent,
};
