//! Targeting engine.
//!
//! ## Key Types
//!
//! - `TargetFilter`: pure predicate over a card, relative to the choosing player
//! - `TargetRequirement`: filter plus min/max counts
//! - `TargetingManager`: computes valid targets and holds the outstanding
//!   selection request
//!
//! Barrier is enforced here: a card with Barrier is never a valid target for
//! an opponent's effect.

pub mod filter;
pub mod manager;
pub mod requirement;

pub use filter::TargetFilter;
pub use manager::{TargetOutcome, TargetRequest, TargetingManager};
pub use requirement::{
    multiple_targets, optional_target, single_target, target_addition, target_attribute_resonator,
    target_card_in_graveyard, target_j_resonator, target_opponent_resonator, target_rested_resonator,
    target_resonator, target_spell_on_chase, target_stone, target_with_max_def, target_your_resonator, up_to_targets,
    TargetRequirement,
};
