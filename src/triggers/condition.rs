//! Trigger conditions.
//!
//! A condition is checked against the event, the match, and the trigger's
//! own card. Player and controller tests are relative to the trigger's
//! controller, so the same script works for either player.

use serde::{Deserialize, Serialize};

use crate::cards::CardTypeSet;
use crate::core::{CardId, Match, PlayerId, Side, Zone};
use crate::scripts::ScriptRegistry;

use super::event::GameEvent;

/// A condition that must hold for a trigger to fire.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerCondition {
    // === Event card ===

    /// The event's card is the trigger's own card.
    IsSelf,

    /// The event's card is some other card.
    IsOther,

    /// The event's card has one of these types.
    CardType(CardTypeSet),

    /// The event's card is controlled by this side.
    CardControlledBy(Side),

    /// The event moved a card out of this zone.
    FromZone(Zone),

    /// The event moved a card into this zone.
    ToZone(Zone),

    // === Event player ===

    /// The event's player is on this side.
    EventPlayer(Side),

    /// The event's amount is at least this much.
    AmountAtLeast(i32),

    // === Trigger card ===

    /// The trigger's own card is in this zone.
    SourceInZone(Zone),

    /// It is the trigger controller's turn.
    YourTurn,

    // === Combinators ===

    /// All conditions must be true.
    All(Vec<TriggerCondition>),

    /// At least one condition must be true.
    Any(Vec<TriggerCondition>),

    /// Condition must be false.
    Not(Box<TriggerCondition>),

    // === Special ===

    /// Always matches.
    #[default]
    Always,

    /// Never matches.
    Never,

    /// A script predicate, evaluated on the trigger's own card.
    Custom(String),
}

impl TriggerCondition {
    /// Create an AND condition.
    pub fn all(conditions: impl IntoIterator<Item = TriggerCondition>) -> Self {
        Self::All(conditions.into_iter().collect())
    }

    /// Create an OR condition.
    pub fn any(conditions: impl IntoIterator<Item = TriggerCondition>) -> Self {
        Self::Any(conditions.into_iter().collect())
    }

    /// Negate this condition.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Add another condition with AND.
    #[must_use]
    pub fn and(self, other: TriggerCondition) -> Self {
        match self {
            Self::Always => other,
            Self::All(mut conditions) => {
                conditions.push(other);
                Self::All(conditions)
            }
            _ => Self::All(vec![self, other]),
        }
    }
}

/// Context for evaluating trigger conditions.
pub struct ConditionContext<'a> {
    /// The event being checked.
    pub event: &'a GameEvent,
    /// Current match.
    pub state: &'a Match,
    /// The card carrying the trigger.
    pub card: CardId,
    /// The trigger's controller.
    pub controller: PlayerId,
    /// Custom predicate lookup.
    pub scripts: &'a dyn ScriptRegistry,
}

/// Evaluator for trigger conditions.
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Check if a condition is satisfied. Unknown custom predicates fail.
    pub fn evaluate(condition: &TriggerCondition, ctx: &ConditionContext<'_>) -> bool {
        let event_card = ctx.event.card.and_then(|id| ctx.state.card(id));
        match condition {
            TriggerCondition::IsSelf => ctx.event.card == Some(ctx.card),

            TriggerCondition::IsOther => ctx.event.card.is_some_and(|id| id != ctx.card),

            TriggerCondition::CardType(types) => {
                event_card.is_some_and(|card| types.contains(card.card_type))
            }

            TriggerCondition::CardControlledBy(side) => {
                event_card.is_some_and(|card| side.matches(card.controller, ctx.controller))
            }

            TriggerCondition::FromZone(zone) => ctx.event.from_zone == Some(*zone),

            TriggerCondition::ToZone(zone) => ctx.event.to_zone == Some(*zone),

            TriggerCondition::EventPlayer(side) => ctx
                .event
                .player
                .is_some_and(|player| side.matches(player, ctx.controller)),

            TriggerCondition::AmountAtLeast(min) => ctx.event.amount >= *min,

            TriggerCondition::SourceInZone(zone) => {
                ctx.state.card(ctx.card).is_some_and(|card| card.zone == *zone)
            }

            TriggerCondition::YourTurn => ctx.state.turn_player == ctx.controller,

            TriggerCondition::All(conditions) => conditions.iter().all(|c| Self::evaluate(c, ctx)),

            TriggerCondition::Any(conditions) => conditions.iter().any(|c| Self::evaluate(c, ctx)),

            TriggerCondition::Not(inner) => !Self::evaluate(inner, ctx),

            TriggerCondition::Always => true,

            TriggerCondition::Never => false,

            TriggerCondition::Custom(key) => ctx
                .state
                .card(ctx.card)
                .and_then(|card| ctx.scripts.evaluate_predicate(key, card, ctx.state))
                .unwrap_or(false),
        }
    }
}
