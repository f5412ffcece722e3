//! Effect operations.
//!
//! Every deferred piece of card behaviour (a spell's resolution, an
//! ability's body, a trigger's result) is a list of [`EffectOp`]s. They are
//! plain data, so chase frames and pending triggers can be cloned and
//! serialized with the rest of the engine state.
//!
//! ## Scopes
//!
//! Card operations name their cards through a [`CardScope`], and player
//! operations through a [`PlayerRef`]. Both are resolved against the
//! [`ResolveContext`](super::ResolveContext) at resolution time:
//! - `Targets`: the targets chosen when the frame was created
//! - `Source`: the card that created the effect
//! - `EventCard` / `EventOther`: cards named by the triggering event
//! - `Matching`: every card an [`AffectedFilter`] selects, relative to the
//!   resolving controller

use serde::{Deserialize, Serialize};

use crate::cards::Attribute;
use crate::continuous::{AffectedFilter, ContinuousDeclaration};
use crate::keywords::KeywordSet;
use crate::replacement::ReplacementDeclaration;

/// Which cards a card operation affects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardScope {
    /// The chosen targets.
    Targets,
    /// The card that created the effect.
    Source,
    /// The event's card.
    EventCard,
    /// The event's second card.
    EventOther,
    /// Every card the filter selects.
    Matching(AffectedFilter),
}

/// Which player a player operation affects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerRef {
    /// The resolving controller.
    You,
    /// The resolving controller's opponent.
    Opponent,
    /// The event's player.
    EventPlayer,
    /// Controller of the first target.
    TargetController,
}

/// A single effect operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectOp {
    // === Cards ===

    /// Deal damage to cards.
    DealDamage { to: CardScope, amount: i32 },

    /// Destroy cards (put them into the graveyard).
    Destroy(CardScope),

    /// Counter spells on the chase. A countered spell leaves the chase
    /// without resolving.
    Counter(CardScope),

    /// Remove cards from the game.
    Banish(CardScope),

    /// Return cards to their owner's hand.
    ReturnToHand(CardScope),

    /// Put cards onto the field under their owner's control.
    PutOntoField(CardScope),

    /// Rest cards.
    Rest(CardScope),

    /// Recover cards.
    Recover(CardScope),

    /// `+atk/+def` until end of turn.
    Buff { scope: CardScope, atk: i32, def: i32 },

    /// Grant keywords until end of turn.
    GrantKeywords { scope: CardScope, keywords: KeywordSet },

    /// Remove keywords until end of turn.
    RemoveKeywords { scope: CardScope, keywords: KeywordSet },

    /// The resolving controller gains control.
    GainControl(CardScope),

    /// Put `+atk/+def` counters.
    AddStatCounter { scope: CardScope, atk: i32, def: i32 },

    /// Adjust a named counter.
    AddCounter { scope: CardScope, name: String, amount: i32 },

    // === Players ===

    /// Deal damage to a player.
    DamagePlayer { player: PlayerRef, amount: i32 },

    /// Gain life.
    GainLife { player: PlayerRef, amount: i32 },

    /// Lose life.
    LoseLife { player: PlayerRef, amount: i32 },

    /// Draw cards.
    DrawCards { player: PlayerRef, count: usize },

    /// Add will to a pool.
    AddWill { player: PlayerRef, attribute: Attribute, amount: u32 },

    // === Effects ===

    /// Register a continuous effect with the source as its source.
    RegisterEffect(ContinuousDeclaration),

    /// Register a replacement effect with the source as its source.
    RegisterReplacement(ReplacementDeclaration),

    /// Run `op` only if the source satisfies a script predicate.
    Conditional { predicate: String, op: Box<EffectOp> },
}

impl EffectOp {
    /// Deal damage to the targets.
    #[must_use]
    pub fn damage_targets(amount: i32) -> Self {
        Self::DealDamage {
            to: CardScope::Targets,
            amount,
        }
    }

    /// Destroy the targets.
    #[must_use]
    pub fn destroy_targets() -> Self {
        Self::Destroy(CardScope::Targets)
    }

    /// Counter the targeted spells.
    #[must_use]
    pub fn counter_targets() -> Self {
        Self::Counter(CardScope::Targets)
    }

    /// Buff the targets until end of turn.
    #[must_use]
    pub fn buff_targets(atk: i32, def: i32) -> Self {
        Self::Buff {
            scope: CardScope::Targets,
            atk,
            def,
        }
    }

    /// Damage the opponent.
    #[must_use]
    pub fn damage_opponent(amount: i32) -> Self {
        Self::DamagePlayer {
            player: PlayerRef::Opponent,
            amount,
        }
    }

    /// The controller gains life.
    #[must_use]
    pub fn gain_life(amount: i32) -> Self {
        Self::GainLife {
            player: PlayerRef::You,
            amount,
        }
    }

    /// The controller draws.
    #[must_use]
    pub fn draw(count: usize) -> Self {
        Self::DrawCards {
            player: PlayerRef::You,
            count,
        }
    }

    /// Check whether this operation reads the chosen targets.
    #[must_use]
    pub fn uses_targets(&self) -> bool {
        match self {
            EffectOp::DealDamage { to: scope, .. }
            | EffectOp::Destroy(scope)
            | EffectOp::Counter(scope)
            | EffectOp::Banish(scope)
            | EffectOp::ReturnToHand(scope)
            | EffectOp::PutOntoField(scope)
            | EffectOp::Rest(scope)
            | EffectOp::Recover(scope)
            | EffectOp::Buff { scope, .. }
            | EffectOp::GrantKeywords { scope, .. }
            | EffectOp::RemoveKeywords { scope, .. }
            | EffectOp::GainControl(scope)
            | EffectOp::AddStatCounter { scope, .. }
            | EffectOp::AddCounter { scope, .. } => *scope == CardScope::Targets,
            EffectOp::DamagePlayer { player, .. }
            | EffectOp::GainLife { player, .. }
            | EffectOp::LoseLife { player, .. }
            | EffectOp::DrawCards { player, .. }
            | EffectOp::AddWill { player, .. } => *player == PlayerRef::TargetController,
            EffectOp::RegisterEffect(_) | EffectOp::RegisterReplacement(_) => false,
            EffectOp::Conditional { op, .. } => op.uses_targets(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uses_targets() {
        assert!(EffectOp::damage_targets(300).uses_targets());
        assert!(!EffectOp::damage_opponent(300).uses_targets());
        assert!(EffectOp::Conditional {
            predicate: "x".into(),
            op: Box::new(EffectOp::destroy_targets()),
        }
        .uses_targets());
        assert!(EffectOp::LoseLife {
            player: PlayerRef::TargetController,
            amount: 100
        }
        .uses_targets());
    }

    #[test]
    fn test_serialization() {
        let op = EffectOp::buff_targets(200, 200);
        let json = serde_json::to_string(&op).unwrap();
        let back: EffectOp = serde_json::from_str(&json).unwrap();
        assert_eq!(op, back);
    }
}
