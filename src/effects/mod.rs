//! Effect operations and their resolution.
//!
//! - [`EffectOp`]: tagged enumeration of everything an effect can do
//! - [`CardScope`] / [`PlayerRef`]: what an operation applies to
//! - [`EffectResolver`]: executes operations against the match
//!
//! Operations are data. A chase frame stores the list it will run, and the
//! resolver interprets it when the frame resolves.

mod effect;
mod resolver;

pub use effect::{CardScope, EffectOp, PlayerRef};
pub use resolver::{
    deal_damage, destroy_card, EffectResolver, ResolveContext, ResolveEnv, ResolveResult,
    ResolveSummary,
};
