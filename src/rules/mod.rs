//! The game facade.
//!
//! [`Game`] ties the rules managers together: the turn structure, player
//! actions and their pending inputs, chase resolution, battle, and the
//! state-based checkpoint that runs after every change.

mod actions;
pub mod decision;
pub mod engine;
mod resolution;
mod turn;

pub use decision::{ActionOutcome, DecisionAnswer, DecisionRequest};
pub use engine::Game;
pub use turn::OPENING_HAND;
