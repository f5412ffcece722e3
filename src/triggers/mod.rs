//! Event-driven triggered abilities.
//!
//! ## Key Components
//!
//! - [`TriggerEvent`] / [`GameEvent`]: what happened, with its data
//! - [`TriggerCondition`]: extra tests beyond the event kind
//! - [`TriggeredAbility`]: a script's declaration
//! - [`TriggerManager`]: live registrations, the pending queue, delayed
//!   triggers
//!
//! ## Example Usage
//!
//! ```
//! use chase_rules::cards::CardTemplate;
//! use chase_rules::core::{Match, PlayerId, TriggerOrdering, Zone};
//! use chase_rules::effects::EffectOp;
//! use chase_rules::scripts::ScriptLibrary;
//! use chase_rules::triggers::{TriggerManager, TriggeredAbility};
//!
//! let mut state = Match::new(4000);
//! let card = state.create_card(PlayerId(0), CardTemplate::resonator("C", "Scout", 200, 200), Zone::Hand);
//!
//! let mut triggers = TriggerManager::new();
//! triggers.register_trigger(card, TriggeredAbility::when_enters_field(vec![EffectOp::draw(1)]));
//!
//! state.move_card(card, Zone::Field).unwrap();
//! let scripts = ScriptLibrary::new();
//! for event in state.drain_events() {
//!     triggers.check_triggers(&event, &state, &scripts);
//! }
//! let batch = triggers.process_pending_triggers(PlayerId(0), TriggerOrdering::Fifo);
//! assert_eq!(batch.chase.len(), 1);
//! ```

mod condition;
mod event;
mod registry;

pub use condition::{ConditionContext, ConditionEvaluator, TriggerCondition};
pub use event::{GameEvent, TriggerEvent, TriggerEvents};
pub use registry::{
    DelayedTiming, DelayedTrigger, PendingTrigger, TriggerBatch, TriggerId, TriggerKind,
    TriggerManager, TriggerRegistration, TriggerTiming, TriggeredAbility,
};
