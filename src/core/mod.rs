//! Core types: ids, players, zones and phases, configuration, errors,
//! actions, RNG, and the match state.

pub mod action;
pub mod config;
pub mod entity;
pub mod error;
pub mod player;
pub mod rng;
pub mod state;

pub use action::{ActionRecord, ActionType, ModeList, PlayerAction, TargetList};
pub use config::{Phase, RulesConfig, TriggerOrdering, Zone};
pub use entity::{CardId, RequestId};
pub use error::{ConfigError, RulesError, RulesResult};
pub use player::{PlayerId, PlayerMap, Side, PLAYER_COUNT};
pub use rng::GameRng;
pub use state::{GameOutcome, Match, PlayerState};
