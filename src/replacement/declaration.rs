//! Replacement effect declarations.

use serde::{Deserialize, Serialize};

use crate::continuous::{AffectedFilter, EffectDuration};
use crate::core::{CardId, Match, Side, Zone};

/// Unique identifier for a registered replacement effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReplacementId(pub u32);

impl std::fmt::Display for ReplacementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Replacement({})", self.0)
    }
}

/// What happens instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplacementAction {
    /// The card is not destroyed.
    PreventDestruction,
    /// Prevent up to this much damage, or all of it when `None`.
    PreventDamage(Option<i32>),
    /// The damage is prevented and the damaged player (or the damaged
    /// card's controller) gains that much life.
    DamageToLife,
}

impl ReplacementAction {
    /// Whether this replaces destruction rather than damage.
    #[must_use]
    pub const fn replaces_destruction(self) -> bool {
        matches!(self, ReplacementAction::PreventDestruction)
    }
}

/// What a replacement effect watches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplacementScope {
    /// The source card only.
    Source,
    /// Cards the filter selects, read relative to the source's controller.
    /// Custom predicate keys are not supported here.
    Cards(AffectedFilter),
    /// Players on this side of the source's controller.
    Players(Side),
}

/// "If X would happen, Y instead", as a card script declares it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementDeclaration {
    /// Display name.
    pub name: String,

    /// What is done instead.
    pub action: ReplacementAction,

    /// Which cards or players it protects.
    pub scope: ReplacementScope,

    /// How long it lasts.
    pub duration: EffectDuration,
}

impl ReplacementDeclaration {
    /// A while-on-field declaration.
    #[must_use]
    pub fn new(name: impl Into<String>, action: ReplacementAction, scope: ReplacementScope) -> Self {
        Self {
            name: name.into(),
            action,
            scope,
            duration: EffectDuration::WhileOnField,
        }
    }

    /// Set the duration (builder pattern).
    #[must_use]
    pub fn with_duration(mut self, duration: EffectDuration) -> Self {
        self.duration = duration;
        self
    }
}

/// "This card cannot be destroyed."
#[must_use]
pub fn prevent_destruction() -> ReplacementDeclaration {
    ReplacementDeclaration::new(
        "indestructible",
        ReplacementAction::PreventDestruction,
        ReplacementScope::Source,
    )
}

/// Prevent up to `amount` damage (all of it when `None`) to the cards
/// `filter` selects.
#[must_use]
pub fn prevent_damage(filter: AffectedFilter, amount: Option<i32>) -> ReplacementDeclaration {
    ReplacementDeclaration::new(
        "prevent damage",
        ReplacementAction::PreventDamage(amount),
        ReplacementScope::Cards(filter),
    )
}

/// Damage dealt to players on `side` becomes life gain.
#[must_use]
pub fn damage_to_life(side: Side) -> ReplacementDeclaration {
    ReplacementDeclaration::new(
        "damage becomes life",
        ReplacementAction::DamageToLife,
        ReplacementScope::Players(side),
    )
}

/// A registered replacement effect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementEffect {
    pub id: ReplacementId,
    pub source: CardId,
    pub declaration: ReplacementDeclaration,
}

impl ReplacementEffect {
    /// Whether the source still keeps the effect alive.
    #[must_use]
    pub fn is_active(&self, state: &Match) -> bool {
        match self.declaration.duration {
            EffectDuration::WhileOnField => state
                .card(self.source)
                .is_some_and(|card| matches!(card.zone, Zone::Field | Zone::RulerArea)),
            EffectDuration::UntilEndOfTurn | EffectDuration::Permanent => {
                state.card(self.source).is_some()
            }
        }
    }
}
