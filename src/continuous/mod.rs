//! Continuous effects and the layered recompute.
//!
//! ## Layers
//!
//! | Layer | Payload |
//! |---|---|
//! | Control | controller change |
//! | Type | card type replacement |
//! | Attribute | attribute set/add |
//! | Ability | keyword grant/remove |
//! | StatModify | additive ATK/DEF, then stat counters |
//! | StatSet | ATK/DEF overwrite |
//!
//! Within a layer effects apply by timestamp, adjusted by declared
//! dependencies. The outcome depends only on `(layer, timestamp)`, never on
//! the order effects sit in the manager.
//!
//! ```
//! use chase_rules::cards::CardTemplate;
//! use chase_rules::continuous::{buff, ContinuousEffectManager};
//! use chase_rules::core::{Match, PlayerId, Zone};
//! use chase_rules::scripts::ScriptLibrary;
//!
//! let mut state = Match::new(4000);
//! let lord = state.create_card(PlayerId(0), CardTemplate::resonator("L", "Lord", 300, 300), Zone::Field);
//! let ally = state.create_card(PlayerId(0), CardTemplate::resonator("A", "Ally", 500, 500), Zone::Field);
//!
//! let mut effects = ContinuousEffectManager::new();
//! effects.register_effect(lord, buff(200, 0));
//! effects.apply_all_effects(&mut state, &ScriptLibrary::new());
//!
//! assert_eq!(state.card(ally).unwrap().current_atk, 700);
//! ```

pub mod filter;
pub mod layer;
pub mod manager;

pub use filter::AffectedFilter;
pub use layer::{
    attribute_buff, buff, buff_cards, buff_self, gain_control, grant_keyword, keyword_buff,
    race_buff, remove_keyword, set_stats, ContinuousDeclaration, ContinuousEffect, ControlTarget,
    EffectCondition, EffectDuration, EffectId, EffectLayer, LayerPayload,
};
pub use manager::ContinuousEffectManager;
