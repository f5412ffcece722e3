//! Replacement effects.
//!
//! A replacement effect watches for an event that is about to happen and
//! changes it: a card is not destroyed, damage is reduced, or damage to a
//! player becomes life gain. The registry lives on the [`Match`] so every
//! damage and destruction path consults it.
//!
//! ## Key Types
//!
//! - [`ReplacementDeclaration`]: what a script declares
//! - [`ReplacementManager`]: registered effects and the checks
//!
//! ```
//! use chase_rules::cards::CardTemplate;
//! use chase_rules::core::{Match, PlayerId, Zone};
//! use chase_rules::replacement::prevent_destruction;
//!
//! let mut state = Match::new(4000);
//! let golem = state.create_card(PlayerId(0), CardTemplate::resonator("G", "Golem", 500, 500), Zone::Field);
//! state.replacements.register(golem, prevent_destruction());
//!
//! let card = state.card(golem).unwrap();
//! assert!(state.replacements.prevents_destruction(card, &state).is_some());
//! ```
//!
//! [`Match`]: crate::core::Match

mod declaration;
mod manager;

pub use declaration::{
    damage_to_life, prevent_damage, prevent_destruction, ReplacementAction, ReplacementDeclaration,
    ReplacementEffect, ReplacementId, ReplacementScope,
};
pub use manager::{DamageOutcome, ReplacementManager};
