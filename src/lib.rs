//! # chase-rules
//!
//! Rules-resolution core for a two-player Force of Will style card game.
//!
//! ## Design Principles
//!
//! 1. **Request/Response**: The engine never blocks on a player. When it
//!    needs a choice it stops and exposes a [`DecisionRequest`]; the host
//!    answers with [`Game::submit`] or gives up with [`Game::cancel_request`].
//!
//! 2. **Nothing Half-Done**: A failed action leaves the match exactly as it
//!    was. Costs are checked before anything is paid, and a pending action
//!    applies nothing until it is complete.
//!
//! 3. **Derived State Is Recomputed**: Card stats, keywords, types and
//!    control are rebuilt from printed values plus the active continuous
//!    effects, so recomputing is idempotent.
//!
//! ## Architecture
//!
//! - **The Chase**: A LIFO stack of spells, abilities, Judgment and
//!   triggers, driven by two-player priority passing.
//!
//! - **Checkpoints**: After every change the engine drains events into the
//!   trigger engine, recomputes continuous effects, destroys dead
//!   combatants, and decides the game.
//!
//! - **Persistent Data Structures**: Zones use `im::Vector`, so cloning a
//!   [`Game`] for lookahead is cheap.
//!
//! ## Modules
//!
//! - `core`: Ids, players, zones, configuration, errors, the match state
//! - `cards`: Templates, instances, attributes, will
//! - `keywords`: Keyword set and the keyword rules
//! - `effects`: Effect operations and their resolver
//! - `scripts`: Card scripts and the script registry
//! - `targeting`: Target filters, requirements and requests
//! - `continuous`: Layered continuous effects
//! - `replacement`: Replacement effects on damage and destruction
//! - `triggers`: Events, conditions and triggered abilities
//! - `combat`: The battle sub-machine
//! - `chase`: The chase, priority, and pending actions
//! - `rules`: The `Game` facade

pub mod core;
pub mod cards;
pub mod keywords;
pub mod effects;
pub mod scripts;
pub mod targeting;
pub mod continuous;
pub mod replacement;
pub mod triggers;
pub mod combat;
pub mod chase;
pub mod rules;

// Re-export commonly used types
pub use crate::core::{
    CardId, RequestId, PlayerId, PlayerMap,
    Phase, Zone, RulesConfig, TriggerOrdering,
    PlayerAction, ActionType, TargetList,
    RulesError, RulesResult, ConfigError,
    Match, GameOutcome,
};

pub use crate::cards::{Attribute, CardInstance, CardTemplate, CardType, WillCost, WillPool};

pub use crate::keywords::{Keyword, KeywordProcessor, KeywordSet};

pub use crate::effects::{EffectOp, EffectResolver};

pub use crate::scripts::{CardScript, ScriptLibrary, ScriptRegistry};

pub use crate::targeting::{TargetFilter, TargetRequirement, TargetingManager};

pub use crate::continuous::{ContinuousDeclaration, ContinuousEffectManager, EffectId};

pub use crate::replacement::{ReplacementDeclaration, ReplacementId, ReplacementManager};

pub use crate::triggers::{GameEvent, TriggerEvent, TriggerId, TriggerManager, TriggeredAbility};

pub use crate::combat::{AttackDeclaration, BlockDeclaration, CombatManager};

pub use crate::chase::{Chase, ChaseItem, ChaseItemId, PendingInput, PriorityManager, PriorityState};

pub use crate::rules::{ActionOutcome, DecisionAnswer, DecisionRequest, Game};
