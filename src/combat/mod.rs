//! The battle sub-machine.
//!
//! A battle exists only during the Battle phase. [`CombatManager`] asks for
//! attackers, then blockers, and runs the first-strike and normal damage
//! steps. Keyword rules (Flying, Stealth, Pierce, Drain, Explode,
//! Imperishable) come from [`KeywordProcessor`](crate::keywords::KeywordProcessor).

mod manager;
mod state;

pub use manager::{CombatManager, CombatProgress, DamageReport};
pub use state::{
    Attack, AttackDeclaration, AttackTarget, BlockDeclaration, CombatState, CombatStep,
};
