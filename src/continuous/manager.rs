//! Registration and the recompute pass.
//!
//! ## Pass
//!
//! [`ContinuousEffectManager::apply_all_effects`] rebuilds every derived
//! field from scratch:
//!
//! 1. Reset every card to base values.
//! 2. Keep effects whose source satisfies the duration.
//! 3. Order by `(layer, timestamp)`; `depends_on` edges inside a layer are
//!    honoured with Kahn's algorithm.
//! 4. Apply each effect to the cards its filter selects. Conditions and
//!    filters are evaluated against the state as it stands at that point of
//!    the pass.
//! 5. Stat counters are added once the StatModify layer is done, before
//!    StatSet.
//!
//! The pass never touches the effect list, so running it twice gives the same
//! result.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, warn};

use super::layer::{ContinuousDeclaration, ContinuousEffect, EffectDuration, EffectId, EffectLayer};
use crate::core::{CardId, Match, RulesError};
use crate::scripts::ScriptRegistry;

/// Owns every registered continuous effect.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ContinuousEffectManager {
    effects: Vec<ContinuousEffect>,
    next_id: u32,
    next_timestamp: u64,
    #[serde(skip)]
    diagnostics: Vec<RulesError>,
}

impl ContinuousEffectManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an effect from `source`. Timestamps are assigned here.
    pub fn register_effect(&mut self, source: CardId, declaration: ContinuousDeclaration) -> EffectId {
        self.register_dependent(source, declaration, &[])
    }

    /// Register an effect that must apply after `depends_on` within its layer.
    pub fn register_dependent(
        &mut self,
        source: CardId,
        declaration: ContinuousDeclaration,
        depends_on: &[EffectId],
    ) -> EffectId {
        let id = EffectId(self.next_id);
        self.next_id += 1;
        let timestamp = self.next_timestamp;
        self.next_timestamp += 1;
        debug!(effect = %id, %source, name = %declaration.name, layer = ?declaration.layer, "continuous effect registered");
        self.effects.push(ContinuousEffect {
            id,
            source,
            timestamp,
            depends_on: SmallVec::from_slice(depends_on),
            declaration,
        });
        id
    }

    /// Make `effect` apply after `on` when both share a layer.
    pub fn add_dependency(&mut self, effect: EffectId, on: EffectId) -> bool {
        match self.effects.iter_mut().find(|e| e.id == effect) {
            Some(e) if effect != on => {
                if !e.depends_on.contains(&on) {
                    e.depends_on.push(on);
                }
                true
            }
            _ => false,
        }
    }

    /// Remove one effect. Returns `false` if it was not registered.
    pub fn unregister_effect(&mut self, id: EffectId) -> bool {
        let before = self.effects.len();
        self.effects.retain(|e| e.id != id);
        self.effects.len() != before
    }

    /// Remove every effect `source` created. Returns how many were removed.
    pub fn unregister_source(&mut self, source: CardId) -> usize {
        let before = self.effects.len();
        self.effects.retain(|e| e.source != source);
        before - self.effects.len()
    }

    /// Remove `source`'s while-on-field effects, keeping what it granted
    /// with other durations.
    pub fn unregister_static_effects(&mut self, source: CardId) -> usize {
        let before = self.effects.len();
        self.effects.retain(|e| {
            e.source != source || e.declaration.duration != EffectDuration::WhileOnField
        });
        before - self.effects.len()
    }

    /// A card changed zones: drop it from explicit card lists. Effects left
    /// with an empty list are removed.
    pub fn forget_card(&mut self, card: CardId) {
        self.effects.retain_mut(|e| !e.declaration.filter.forget(card) || e.declaration.affects_self);
    }

    /// End-of-turn cleanup.
    pub fn remove_end_of_turn_effects(&mut self) -> usize {
        let before = self.effects.len();
        self.effects
            .retain(|e| e.declaration.duration != EffectDuration::UntilEndOfTurn);
        let removed = before - self.effects.len();
        if removed > 0 {
            debug!(removed, "end-of-turn effects removed");
        }
        removed
    }

    /// Registered effects in registration order.
    #[must_use]
    pub fn effects(&self) -> &[ContinuousEffect] {
        &self.effects
    }

    /// Look up an effect.
    #[must_use]
    pub fn get(&self, id: EffectId) -> Option<&ContinuousEffect> {
        self.effects.iter().find(|e| e.id == id)
    }

    /// Declarations skipped by the last pass.
    #[must_use]
    pub fn diagnostics(&self) -> &[RulesError] {
        &self.diagnostics
    }

    /// Recompute every card's derived state.
    pub fn apply_all_effects(&mut self, state: &mut Match, scripts: &dyn ScriptRegistry) {
        for card in state.cards_mut() {
            card.reset_to_base();
        }

        let active: Vec<&ContinuousEffect> = self
            .effects
            .iter()
            .filter(|e| e.source_satisfies_duration(state))
            .collect();
        let ordered = order_effects(&active);

        let mut diagnostics = Vec::new();
        let mut counters_applied = false;
        for effect in ordered {
            if !counters_applied && effect.declaration.layer == EffectLayer::StatSet {
                apply_stat_counters(state);
                counters_applied = true;
            }
            if let Err(err) = apply_effect(effect, state, scripts) {
                warn!(effect = %effect.id, %err, "continuous effect skipped");
                diagnostics.push(err);
            }
        }
        if !counters_applied {
            apply_stat_counters(state);
        }
        self.diagnostics = diagnostics;
    }
}

fn apply_stat_counters(state: &mut Match) {
    for card in state.cards_mut() {
        card.current_atk += card.stat_counters.atk;
        card.current_def += card.stat_counters.def;
    }
}

fn apply_effect(
    effect: &ContinuousEffect,
    state: &mut Match,
    scripts: &dyn ScriptRegistry,
) -> Result<(), RulesError> {
    let declaration = &effect.declaration;
    if !declaration.is_well_formed() {
        return Err(RulesError::malformed(
            effect.source,
            format!(
                "{:?} payload declared in {:?} layer",
                declaration.payload.layer(),
                declaration.layer
            ),
        ));
    }
    let source = state.get_card(effect.source)?;
    let source_controller = source.controller;

    if let Some(condition) = &declaration.condition {
        let holds = condition
            .evaluate(source, state, scripts)
            .map_err(|key| RulesError::malformed(effect.source, format!("unknown predicate `{}`", key)))?;
        if !holds {
            return Ok(());
        }
    }

    let mut affected = Vec::new();
    for id in state.card_ids() {
        let Some(card) = state.card(id) else { continue };
        // A source only affects itself when it says so or names itself.
        let hit = if id == effect.source && declaration.affects_self {
            true
        } else if id == effect.source && !declaration.filter.names(id) {
            false
        } else {
            declaration
                .filter
                .evaluate(card, source_controller, state, scripts)
                .map_err(|key| {
                    RulesError::malformed(effect.source, format!("unknown predicate `{}`", key))
                })?
        };
        if hit {
            affected.push(id);
        }
    }

    for id in affected {
        if let Some(card) = state.card_mut(id) {
            declaration.payload.apply(card, source_controller);
        }
    }
    Ok(())
}

/// Order by `(layer, timestamp)`, honouring same-layer dependencies. A cycle
/// falls back to timestamp order for the effects caught in it.
fn order_effects<'a>(active: &[&'a ContinuousEffect]) -> Vec<&'a ContinuousEffect> {
    let index: FxHashMap<EffectId, usize> =
        active.iter().enumerate().map(|(i, e)| (e.id, i)).collect();

    let mut in_degree = vec![0usize; active.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); active.len()];
    for (i, effect) in active.iter().enumerate() {
        for dep in &effect.depends_on {
            let Some(&j) = index.get(dep) else { continue };
            if j != i && active[j].declaration.layer == effect.declaration.layer {
                in_degree[i] += 1;
                dependents[j].push(i);
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<((EffectLayer, u64), usize)>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == 0)
        .map(|(i, _)| Reverse((active[i].order_key(), i)))
        .collect();

    let mut ordered = Vec::with_capacity(active.len());
    let mut placed = vec![false; active.len()];
    while let Some(Reverse((_, i))) = ready.pop() {
        ordered.push(active[i]);
        placed[i] = true;
        for &k in &dependents[i] {
            in_degree[k] -= 1;
            if in_degree[k] == 0 {
                ready.push(Reverse((active[k].order_key(), k)));
            }
        }
    }

    if ordered.len() < active.len() {
        let mut stuck: Vec<&ContinuousEffect> = active
            .iter()
            .enumerate()
            .filter(|(i, _)| !placed[*i])
            .map(|(_, e)| *e)
            .collect();
        warn!(count = stuck.len(), "dependency cycle among continuous effects");
        stuck.sort_by_key(|e| e.order_key());
        ordered.extend(stuck);
        ordered.sort_by_key(|e| e.declaration.layer);
    }
    ordered
}
