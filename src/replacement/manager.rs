//! The replacement registry and the checks damage and destruction consult.
//!
//! Effects apply in registration order. Damage prevention shrinks the
//! amount and lets later effects see what is left; turning damage into life
//! gain takes the rest and ends the chain.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use super::declaration::{
    ReplacementAction, ReplacementDeclaration, ReplacementEffect, ReplacementId, ReplacementScope,
};
use crate::cards::CardInstance;
use crate::continuous::EffectDuration;
use crate::core::{CardId, Match, PlayerId};

/// What is left of a damage event after replacement.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DamageOutcome {
    /// Damage still dealt.
    pub amount: i32,
    /// Life gained instead, and by whom.
    pub life_gain: Option<(PlayerId, i32)>,
    /// Effects that changed the event.
    pub applied: SmallVec<[ReplacementId; 2]>,
}

/// Owns every registered replacement effect.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReplacementManager {
    effects: Vec<ReplacementEffect>,
    next_id: u32,
}

impl ReplacementManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an effect from `source`.
    pub fn register(&mut self, source: CardId, declaration: ReplacementDeclaration) -> ReplacementId {
        let id = ReplacementId(self.next_id);
        self.next_id += 1;
        debug!(replacement = %id, %source, name = %declaration.name, "replacement effect registered");
        self.effects.push(ReplacementEffect { id, source, declaration });
        id
    }

    /// Remove one effect. Returns `false` if it was not registered.
    pub fn unregister(&mut self, id: ReplacementId) -> bool {
        let before = self.effects.len();
        self.effects.retain(|e| e.id != id);
        self.effects.len() != before
    }

    /// Remove every effect `source` created.
    pub fn unregister_source(&mut self, source: CardId) -> usize {
        let before = self.effects.len();
        self.effects.retain(|e| e.source != source);
        before - self.effects.len()
    }

    /// Remove `source`'s while-on-field effects.
    pub fn unregister_static(&mut self, source: CardId) -> usize {
        let before = self.effects.len();
        self.effects.retain(|e| {
            e.source != source || e.declaration.duration != EffectDuration::WhileOnField
        });
        before - self.effects.len()
    }

    /// End-of-turn cleanup.
    pub fn remove_end_of_turn(&mut self) -> usize {
        let before = self.effects.len();
        self.effects
            .retain(|e| e.declaration.duration != EffectDuration::UntilEndOfTurn);
        before - self.effects.len()
    }

    /// Registered effects in registration order.
    #[must_use]
    pub fn effects(&self) -> &[ReplacementEffect] {
        &self.effects
    }

    /// The effect that stops `card` from being destroyed, if any.
    #[must_use]
    pub fn prevents_destruction(&self, card: &CardInstance, state: &Match) -> Option<ReplacementId> {
        self.effects
            .iter()
            .filter(|e| e.declaration.action.replaces_destruction())
            .find(|e| e.is_active(state) && covers_card(e, card, state))
            .map(|e| e.id)
    }

    /// Replace damage about to be dealt to `card`.
    #[must_use]
    pub fn damage_to_card(&self, card: &CardInstance, amount: i32, state: &Match) -> DamageOutcome {
        self.replace_damage(amount, card.controller, state, |e| covers_card(e, card, state))
    }

    /// Replace damage about to be dealt to `player`.
    #[must_use]
    pub fn damage_to_player(&self, player: PlayerId, amount: i32, state: &Match) -> DamageOutcome {
        self.replace_damage(amount, player, state, |e| match &e.declaration.scope {
            ReplacementScope::Players(side) => state
                .card(e.source)
                .is_some_and(|source| side.matches(player, source.controller)),
            _ => false,
        })
    }

    fn replace_damage(
        &self,
        amount: i32,
        beneficiary: PlayerId,
        state: &Match,
        covers: impl Fn(&ReplacementEffect) -> bool,
    ) -> DamageOutcome {
        let mut outcome = DamageOutcome {
            amount,
            ..DamageOutcome::default()
        };
        for effect in &self.effects {
            if outcome.amount <= 0 {
                break;
            }
            if effect.declaration.action.replaces_destruction() || !effect.is_active(state) || !covers(effect) {
                continue;
            }
            outcome.applied.push(effect.id);
            match effect.declaration.action {
                ReplacementAction::PreventDamage(Some(up_to)) => {
                    outcome.amount -= up_to.clamp(0, outcome.amount);
                }
                ReplacementAction::PreventDamage(None) => outcome.amount = 0,
                ReplacementAction::DamageToLife => {
                    outcome.life_gain = Some((beneficiary, outcome.amount));
                    outcome.amount = 0;
                }
                ReplacementAction::PreventDestruction => {}
            }
        }
        if !outcome.applied.is_empty() {
            debug!(before = amount, after = outcome.amount, "damage replaced");
        }
        outcome
    }
}

fn covers_card(effect: &ReplacementEffect, card: &CardInstance, state: &Match) -> bool {
    match &effect.declaration.scope {
        ReplacementScope::Source => card.uid == effect.source,
        ReplacementScope::Cards(filter) => {
            filter.custom.is_none()
                && state
                    .card(effect.source)
                    .is_some_and(|source| filter.matches_static(card, source.controller))
        }
        ReplacementScope::Players(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardTemplate;
    use crate::continuous::AffectedFilter;
    use crate::core::{Side, Zone};
    use crate::replacement::{damage_to_life, prevent_damage, prevent_destruction};

    fn setup() -> (Match, CardId, CardId) {
        let mut state = Match::new(4000);
        let guard = state.create_card(PlayerId(0), CardTemplate::resonator("G", "Guardian", 100, 100), Zone::Field);
        let ward = state.create_card(PlayerId(0), CardTemplate::resonator("W", "Ward", 300, 300), Zone::Field);
        (state, guard, ward)
    }

    // === Destruction ===

    #[test]
    fn test_prevent_destruction_covers_source_only() {
        let (state, guard, ward) = setup();
        let mut manager = ReplacementManager::new();
        let id = manager.register(guard, prevent_destruction());

        assert_eq!(manager.prevents_destruction(state.card(guard).unwrap(), &state), Some(id));
        assert_eq!(manager.prevents_destruction(state.card(ward).unwrap(), &state), None);
    }

    #[test]
    fn test_static_effect_needs_source_on_field() {
        let (mut state, guard, _) = setup();
        let mut manager = ReplacementManager::new();
        manager.register(guard, prevent_destruction());
        state.move_card(guard, Zone::Hand).unwrap();

        assert_eq!(manager.prevents_destruction(state.card(guard).unwrap(), &state), None);
        assert_eq!(manager.unregister_static(guard), 1);
        assert!(manager.effects().is_empty());
    }

    // === Damage ===

    #[test]
    fn test_prevention_chains() {
        let (state, guard, ward) = setup();
        let mut manager = ReplacementManager::new();
        manager.register(guard, prevent_damage(AffectedFilter::resonators(Side::You), Some(200)));
        manager.register(guard, prevent_damage(AffectedFilter::cards(&[ward]), Some(50)));

        let outcome = manager.damage_to_card(state.card(ward).unwrap(), 500, &state);
        assert_eq!(outcome.amount, 250);
        assert_eq!(outcome.applied.len(), 2);

        let outcome = manager.damage_to_card(state.card(guard).unwrap(), 500, &state);
        assert_eq!(outcome.amount, 300);
    }

    #[test]
    fn test_damage_to_life_for_players() {
        let (state, guard, _) = setup();
        let mut manager = ReplacementManager::new();
        manager.register(guard, damage_to_life(Side::You).with_duration(EffectDuration::UntilEndOfTurn));

        let outcome = manager.damage_to_player(PlayerId(0), 400, &state);
        assert_eq!(outcome.amount, 0);
        assert_eq!(outcome.life_gain, Some((PlayerId(0), 400)));

        let outcome = manager.damage_to_player(PlayerId(1), 400, &state);
        assert_eq!(outcome.amount, 400);
        assert_eq!(outcome.life_gain, None);

        assert_eq!(manager.remove_end_of_turn(), 1);
    }
}
