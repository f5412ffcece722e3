//! Trigger registrations and the pending-trigger queue.
//!
//! ## Lifecycle
//!
//! 1. A card's [`TriggeredAbility`]s are registered when it becomes active
//!    (enters the field or the ruler area) and unregistered when it leaves.
//! 2. Every event drained at a checkpoint goes through
//!    [`TriggerManager::check_triggers`], which enqueues matches.
//! 3. [`TriggerManager::process_pending_triggers`] drains the queue and sorts
//!    it by timing: immediate triggers run at once, chase triggers become
//!    chase frames, state-based triggers wait for the next state-based check.
//!
//! Once-per-turn triggers are marked when they are enqueued, so a second
//! matching event in the same checkpoint does not queue them again.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::condition::{ConditionContext, ConditionEvaluator, TriggerCondition};
use super::event::{GameEvent, TriggerEvent, TriggerEvents};
use crate::core::{CardId, Match, PlayerId, TriggerOrdering, Zone};
use crate::effects::EffectOp;
use crate::scripts::ScriptRegistry;
use crate::targeting::TargetRequirement;

/// Unique identifier for a trigger registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriggerId(pub u32);

impl TriggerId {
    /// Create a new trigger ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for TriggerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Trigger({})", self.0)
    }
}

/// How a fired trigger is carried out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriggerTiming {
    /// Resolved on the spot, without using the chase.
    Immediate,
    /// Put on the chase.
    #[default]
    Chase,
    /// Held until the next state-based check, then put on the chase.
    StateBased,
}

/// Whether the condition is checked again on resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriggerKind {
    /// Condition checked only when the event happens.
    #[default]
    Standard,
    /// Condition checked again when the frame resolves; fizzles if false.
    InterveningIf,
}

/// A triggered ability as declared by a card script.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggeredAbility {
    /// Human-readable name.
    pub name: String,

    /// Events this ability listens for.
    pub events: TriggerEvents,

    /// How it is carried out.
    pub timing: TriggerTiming,

    /// Standard or intervening-if.
    pub kind: TriggerKind,

    /// Extra conditions beyond the event kind.
    pub condition: TriggerCondition,

    /// What it does.
    pub ops: Vec<EffectOp>,

    /// Targets chosen when it goes on the chase.
    pub targets: Option<TargetRequirement>,

    /// `false` for "may" abilities.
    pub mandatory: bool,

    /// Fires at most once each turn.
    pub once_per_turn: bool,
}

impl TriggeredAbility {
    /// A chase trigger on `events` with no condition.
    pub fn new(name: impl Into<String>, events: impl Into<TriggerEvents>, ops: Vec<EffectOp>) -> Self {
        Self {
            name: name.into(),
            events: events.into(),
            timing: TriggerTiming::default(),
            kind: TriggerKind::default(),
            condition: TriggerCondition::Always,
            ops,
            targets: None,
            mandatory: true,
            once_per_turn: false,
        }
    }

    /// "When this card enters the field".
    pub fn when_enters_field(ops: Vec<EffectOp>) -> Self {
        Self::new("enters the field", TriggerEvent::EnterField, ops)
            .with_condition(TriggerCondition::IsSelf)
    }

    /// "When this card leaves the field".
    pub fn when_leaves_field(ops: Vec<EffectOp>) -> Self {
        Self::new("leaves the field", TriggerEvent::LeaveField, ops)
            .with_condition(TriggerCondition::IsSelf)
    }

    /// "When this card attacks".
    pub fn when_attacks(ops: Vec<EffectOp>) -> Self {
        Self::new("attacks", TriggerEvent::AttackDeclared, ops)
            .with_condition(TriggerCondition::IsSelf)
    }

    /// "When this card deals damage".
    pub fn when_deals_damage(ops: Vec<EffectOp>) -> Self {
        Self::new("deals damage", TriggerEvent::DamageDealt, ops)
            .with_condition(TriggerCondition::IsSelf)
    }

    /// "When this card is destroyed".
    pub fn when_destroyed(ops: Vec<EffectOp>) -> Self {
        Self::new("destroyed", TriggerEvent::Destroyed, ops)
            .with_condition(TriggerCondition::IsSelf)
    }

    /// "At the beginning of your turn".
    pub fn at_turn_start(ops: Vec<EffectOp>) -> Self {
        Self::new("turn start", TriggerEvent::TurnStart, ops)
            .with_condition(TriggerCondition::YourTurn)
    }

    /// "At the end of your turn".
    pub fn at_turn_end(ops: Vec<EffectOp>) -> Self {
        Self::new("turn end", TriggerEvent::TurnEnd, ops)
            .with_condition(TriggerCondition::YourTurn)
    }

    /// Add a condition with AND (builder pattern).
    #[must_use]
    pub fn with_condition(mut self, condition: TriggerCondition) -> Self {
        self.condition = std::mem::take(&mut self.condition).and(condition);
        self
    }

    /// Set the timing (builder pattern).
    #[must_use]
    pub fn with_timing(mut self, timing: TriggerTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Set the target requirement (builder pattern).
    #[must_use]
    pub fn with_targets(mut self, targets: TargetRequirement) -> Self {
        self.targets = Some(targets);
        self
    }

    /// Make it a "may" ability (builder pattern).
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.mandatory = false;
        self
    }

    /// Limit to once each turn (builder pattern).
    #[must_use]
    pub fn once_per_turn(mut self) -> Self {
        self.once_per_turn = true;
        self
    }

    /// Re-check the condition on resolution (builder pattern).
    #[must_use]
    pub fn intervening_if(mut self) -> Self {
        self.kind = TriggerKind::InterveningIf;
        self
    }
}

/// A live trigger, bound to its card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRegistration {
    /// Registration id.
    pub id: TriggerId,
    /// The card carrying the ability.
    pub card: CardId,
    /// The ability.
    pub ability: TriggeredAbility,
    /// Fired since the last turn reset.
    pub fired_this_turn: bool,
}

/// A trigger that fired and waits to be carried out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTrigger {
    /// Which registration fired.
    pub trigger: TriggerId,
    /// The card carrying the ability.
    pub card: CardId,
    /// Controller of the card when it fired.
    pub controller: PlayerId,
    /// Snapshot of the ability.
    pub ability: TriggeredAbility,
    /// The event that fired it.
    pub event: GameEvent,
}

/// When a delayed trigger is released.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DelayedTiming {
    /// At the end of this turn.
    EndOfTurn,
    /// At the start of the next turn.
    NextTurnStart,
}

/// A one-shot effect scheduled for later.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayedTrigger {
    /// When it happens.
    pub timing: DelayedTiming,
    /// The card it comes from.
    pub card: CardId,
    /// Who resolves it.
    pub controller: PlayerId,
    /// Only if `card` is still in this zone.
    pub requires_zone: Option<Zone>,
    /// What it does.
    pub ops: Vec<EffectOp>,
}

/// Output of [`TriggerManager::process_pending_triggers`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TriggerBatch {
    /// To resolve right away, in order.
    pub immediate: Vec<PendingTrigger>,
    /// To push onto the chase, in push order.
    pub chase: Vec<PendingTrigger>,
}

impl TriggerBatch {
    /// Check for an empty batch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.immediate.is_empty() && self.chase.is_empty()
    }
}

/// Owns trigger registrations, the pending queue, and delayed triggers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TriggerManager {
    registrations: Vec<TriggerRegistration>,
    pending: VecDeque<PendingTrigger>,
    held: Vec<PendingTrigger>,
    delayed: Vec<DelayedTrigger>,
    next_id: u32,
}

impl TriggerManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a triggered ability for `card`.
    pub fn register_trigger(&mut self, card: CardId, ability: TriggeredAbility) -> TriggerId {
        let id = TriggerId(self.next_id);
        self.next_id += 1;
        debug!(trigger = %id, %card, name = %ability.name, "trigger registered");
        self.registrations.push(TriggerRegistration {
            id,
            card,
            ability,
            fired_this_turn: false,
        });
        id
    }

    /// Remove one registration.
    pub fn unregister(&mut self, id: TriggerId) -> Option<TriggerRegistration> {
        let index = self.registrations.iter().position(|r| r.id == id)?;
        Some(self.registrations.remove(index))
    }

    /// Remove every registration for `card`. Already pending triggers stay.
    pub fn unregister_card(&mut self, card: CardId) -> usize {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.card != card);
        before - self.registrations.len()
    }

    /// Live registrations in registration order.
    #[must_use]
    pub fn registrations(&self) -> &[TriggerRegistration] {
        &self.registrations
    }

    /// Check whether `card` has live registrations.
    #[must_use]
    pub fn is_registered(&self, card: CardId) -> bool {
        self.registrations.iter().any(|r| r.card == card)
    }

    /// Enqueue every registration `event` fires. Returns how many fired.
    pub fn check_triggers(&mut self, event: &GameEvent, state: &Match, scripts: &dyn ScriptRegistry) -> usize {
        let mut fired = 0;
        for registration in &mut self.registrations {
            let ability = &registration.ability;
            if !ability.events.contains(event.kind) {
                continue;
            }
            if ability.once_per_turn && registration.fired_this_turn {
                continue;
            }
            let Some(card) = state.card(registration.card) else {
                continue;
            };
            let ctx = ConditionContext {
                event,
                state,
                card: registration.card,
                controller: card.controller,
                scripts,
            };
            if !ConditionEvaluator::evaluate(&ability.condition, &ctx) {
                continue;
            }
            if ability.once_per_turn {
                registration.fired_this_turn = true;
            }
            debug!(trigger = %registration.id, card = %registration.card, event = %event.kind, "trigger fired");
            self.pending.push_back(PendingTrigger {
                trigger: registration.id,
                card: registration.card,
                controller: card.controller,
                ability: ability.clone(),
                event: event.clone(),
            });
            fired += 1;
        }
        fired
    }

    /// Check for queued triggers.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drain the queue in FIFO order and sort it by timing.
    ///
    /// With [`TriggerOrdering::Apnap`] the turn player's chase triggers come
    /// first in push order, so the other player's resolve first.
    pub fn process_pending_triggers(&mut self, turn_player: PlayerId, ordering: TriggerOrdering) -> TriggerBatch {
        let mut batch = TriggerBatch::default();
        while let Some(pending) = self.pending.pop_front() {
            match pending.ability.timing {
                TriggerTiming::Immediate => batch.immediate.push(pending),
                TriggerTiming::Chase => batch.chase.push(pending),
                TriggerTiming::StateBased => self.held.push(pending),
            }
        }
        if ordering == TriggerOrdering::Apnap {
            batch.chase.sort_by_key(|p| p.controller != turn_player);
        }
        batch
    }

    /// Release state-based triggers held since the last check.
    pub fn release_state_based(&mut self) -> Vec<PendingTrigger> {
        std::mem::take(&mut self.held)
    }

    /// Re-check an intervening-if trigger's condition.
    #[must_use]
    pub fn condition_holds(pending: &PendingTrigger, state: &Match, scripts: &dyn ScriptRegistry) -> bool {
        let ctx = ConditionContext {
            event: &pending.event,
            state,
            card: pending.card,
            controller: pending.controller,
            scripts,
        };
        ConditionEvaluator::evaluate(&pending.ability.condition, &ctx)
    }

    /// Schedule a delayed trigger.
    pub fn add_delayed(&mut self, delayed: DelayedTrigger) {
        debug!(card = %delayed.card, timing = ?delayed.timing, "delayed trigger scheduled");
        self.delayed.push(delayed);
    }

    /// Take the delayed triggers due at `timing`, in scheduling order.
    pub fn release_delayed(&mut self, timing: DelayedTiming) -> Vec<DelayedTrigger> {
        let (due, rest) = std::mem::take(&mut self.delayed)
            .into_iter()
            .partition(|d| d.timing == timing);
        self.delayed = rest;
        due
    }

    /// Scheduled delayed triggers.
    #[must_use]
    pub fn delayed(&self) -> &[DelayedTrigger] {
        &self.delayed
    }

    /// Clear the once-per-turn marks.
    pub fn reset_turn_triggers(&mut self) {
        for registration in &mut self.registrations {
            registration.fired_this_turn = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardTemplate;
    use crate::core::Side;
    use crate::effects::{CardScope, EffectOp};
    use crate::scripts::ScriptLibrary;

    fn setup() -> (Match, CardId, CardId) {
        let mut state = Match::new(4000);
        let a = state.create_card(PlayerId(0), CardTemplate::resonator("A", "A", 100, 100), Zone::Field);
        let b = state.create_card(PlayerId(1), CardTemplate::resonator("B", "B", 100, 100), Zone::Field);
        (state, a, b)
    }

    fn enters(card: CardId, owner: u8) -> GameEvent {
        GameEvent::zone_change(TriggerEvent::EnterField, card, PlayerId(owner), Zone::Hand, Zone::Field)
    }

    // === Matching ===

    #[test]
    fn test_self_enter_trigger() {
        let (state, a, b) = setup();
        let scripts = ScriptLibrary::new();
        let mut manager = TriggerManager::new();
        manager.register_trigger(a, TriggeredAbility::when_enters_field(vec![EffectOp::draw(1)]));

        assert_eq!(manager.check_triggers(&enters(b, 1), &state, &scripts), 0);
        assert_eq!(manager.check_triggers(&enters(a, 0), &state, &scripts), 1);
        let batch = manager.process_pending_triggers(PlayerId(0), TriggerOrdering::Fifo);
        assert_eq!(batch.chase.len(), 1);
        assert_eq!(batch.chase[0].controller, PlayerId(0));
    }

    #[test]
    fn test_once_per_turn() {
        let (state, a, b) = setup();
        let scripts = ScriptLibrary::new();
        let mut manager = TriggerManager::new();
        manager.register_trigger(
            a,
            TriggeredAbility::new("watch", TriggerEvent::EnterField, vec![])
                .with_condition(TriggerCondition::CardControlledBy(Side::Opponent))
                .once_per_turn(),
        );
        assert_eq!(manager.check_triggers(&enters(b, 1), &state, &scripts), 1);
        assert_eq!(manager.check_triggers(&enters(b, 1), &state, &scripts), 0);
        manager.reset_turn_triggers();
        assert_eq!(manager.check_triggers(&enters(b, 1), &state, &scripts), 1);
    }

    #[test]
    fn test_unregister_card_keeps_pending() {
        let (state, a, _) = setup();
        let scripts = ScriptLibrary::new();
        let mut manager = TriggerManager::new();
        manager.register_trigger(a, TriggeredAbility::when_enters_field(vec![]));
        manager.check_triggers(&enters(a, 0), &state, &scripts);
        assert_eq!(manager.unregister_card(a), 1);
        assert!(!manager.is_registered(a));
        assert!(manager.has_pending());
    }

    // === Ordering ===

    #[test]
    fn test_timing_split_and_apnap() {
        let (state, a, b) = setup();
        let scripts = ScriptLibrary::new();
        let mut manager = TriggerManager::new();
        let any_enter = || TriggeredAbility::new("any", TriggerEvent::EnterField, vec![]);
        manager.register_trigger(b, any_enter());
        manager.register_trigger(a, any_enter());
        manager.register_trigger(a, any_enter().with_timing(TriggerTiming::Immediate));
        manager.register_trigger(b, any_enter().with_timing(TriggerTiming::StateBased));
        manager.check_triggers(&enters(a, 0), &state, &scripts);

        let fifo = manager.clone().process_pending_triggers(PlayerId(0), TriggerOrdering::Fifo);
        assert_eq!(fifo.chase.iter().map(|p| p.card).collect::<Vec<_>>(), vec![b, a]);

        let batch = manager.process_pending_triggers(PlayerId(0), TriggerOrdering::Apnap);
        assert_eq!(batch.immediate.len(), 1);
        assert_eq!(batch.chase.iter().map(|p| p.card).collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(manager.release_state_based().len(), 1);
        assert!(manager.release_state_based().is_empty());
    }

    #[test]
    fn test_intervening_if_recheck() {
        let (mut state, a, _) = setup();
        let scripts = ScriptLibrary::new();
        let mut manager = TriggerManager::new();
        manager.register_trigger(
            a,
            TriggeredAbility::new("while here", TriggerEvent::LifeGained, vec![])
                .with_condition(TriggerCondition::SourceInZone(Zone::Field))
                .intervening_if(),
        );
        let event = GameEvent::new(TriggerEvent::LifeGained).with_player(PlayerId(0));
        manager.check_triggers(&event, &state, &scripts);
        let batch = manager.process_pending_triggers(PlayerId(0), TriggerOrdering::Fifo);
        let pending = &batch.chase[0];
        assert!(TriggerManager::condition_holds(pending, &state, &scripts));
        state.move_card(a, Zone::Graveyard).unwrap();
        assert!(!TriggerManager::condition_holds(pending, &state, &scripts));
    }

    // === Delayed ===

    #[test]
    fn test_delayed_release() {
        let mut manager = TriggerManager::new();
        let delayed = |timing| DelayedTrigger {
            timing,
            card: CardId(1),
            controller: PlayerId(0),
            requires_zone: Some(Zone::Graveyard),
            ops: vec![EffectOp::ReturnToHand(CardScope::Source)],
        };
        manager.add_delayed(delayed(DelayedTiming::EndOfTurn));
        manager.add_delayed(delayed(DelayedTiming::NextTurnStart));

        assert_eq!(manager.release_delayed(DelayedTiming::EndOfTurn).len(), 1);
        assert_eq!(manager.delayed().len(), 1);
        assert_eq!(manager.release_delayed(DelayedTiming::NextTurnStart).len(), 1);
        assert!(manager.delayed().is_empty());
    }
}
