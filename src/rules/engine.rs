//! The game facade and its state-based checkpoint.
//!
//! [`Game`] owns the match and every rules manager. Player actions, decision
//! answers and turn-structure calls all go through it. After anything that
//! may have changed the match it runs a checkpoint ([`Game::settle`]):
//!
//! 1. Drain queued events. Cards that entered the field get their script
//!    abilities registered, every event is offered to the trigger engine,
//!    and cards that left the field lose their abilities.
//! 2. Recompute derived card state from the continuous effects.
//! 3. Destroy combatants whose remaining DEF is at or below zero. A card a
//!    replacement effect protects stays on the field.
//! 4. Decide the game if a player lost.
//! 5. Run immediate triggers. Repeat from 1 while events keep coming.
//! 6. Push held state-based triggers and the new chase triggers.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cards::{CardInstance, CardTemplate};
use crate::chase::{Chase, ChaseItem, PendingAction, PriorityManager, PriorityState};
use crate::combat::CombatManager;
use crate::continuous::{ContinuousDeclaration, ContinuousEffectManager, EffectId};
use crate::core::{
    CardId, GameOutcome, Match, Phase, PlayerId, RequestId, RulesConfig, RulesError, RulesResult,
    Zone,
};
use crate::effects::{
    destroy_card, CardScope, EffectOp, EffectResolver, ResolveContext, ResolveEnv, ResolveSummary,
};
use crate::keywords::{EternalReturn, KeywordProcessor};
use crate::replacement::{ReplacementDeclaration, ReplacementId, ReplacementManager};
use crate::scripts::{ScriptLibrary, ScriptRegistry};
use crate::targeting::{TargetOutcome, TargetingManager};
use crate::triggers::{
    DelayedTiming, DelayedTrigger, PendingTrigger, TriggerEvent, TriggerId, TriggerManager,
    TriggeredAbility,
};

/// What a waiting chase trigger needs from its controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum TriggerWaitKind {
    /// Targets, through the targeting manager's open request.
    Targets,
    /// A yes or no on a "may" ability.
    Confirm,
}

/// A chase trigger waiting for its controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TriggerWait {
    /// The open request.
    pub request: RequestId,
    /// What the request asks for.
    pub kind: TriggerWaitKind,
    /// The trigger being targeted.
    pub trigger: PendingTrigger,
    /// Triggers to push after this one.
    pub queued: Vec<PendingTrigger>,
    /// Who gets priority once the wait is over.
    pub resume: Option<PlayerId>,
}

fn empty_scripts() -> Arc<dyn ScriptRegistry> {
    Arc::new(ScriptLibrary::new())
}

/// A two-player game under the chase rules.
///
/// `Game` is `Clone` and serializable. The script registry is not part of
/// the serialized form; reattach it with [`attach_scripts`](Self::attach_scripts)
/// after deserializing.
///
/// ```
/// use std::sync::Arc;
/// use chase_rules::cards::CardTemplate;
/// use chase_rules::core::{PlayerAction, PlayerId, RulesConfig, Zone};
/// use chase_rules::rules::{ActionOutcome, Game};
/// use chase_rules::scripts::ScriptLibrary;
///
/// let mut game = Game::new(RulesConfig::default(), Arc::new(ScriptLibrary::new()));
/// for player in PlayerId::both() {
///     for i in 0..10 {
///         game.add_card(player, CardTemplate::resonator(format!("R{}", i), "Knight", 300, 300), Zone::MainDeck);
///     }
/// }
/// game.start_game(PlayerId(0)).unwrap();
///
/// let first = game.take_action(PlayerId(0), PlayerAction::Pass).unwrap();
/// assert_eq!(first, ActionOutcome::PriorityPassed(PlayerId(1)));
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Game {
    pub(crate) state: Match,
    pub(crate) chase: Chase,
    pub(crate) priority: PriorityManager,
    pub(crate) continuous: ContinuousEffectManager,
    pub(crate) triggers: TriggerManager,
    pub(crate) combat: CombatManager,
    pub(crate) targeting: TargetingManager,
    pub(crate) trigger_wait: Option<TriggerWait>,
    /// Cards whose script abilities are registered.
    pub(crate) live_scripts: FxHashSet<CardId>,
    pub(crate) config: RulesConfig,
    #[serde(skip, default = "empty_scripts")]
    pub(crate) scripts: Arc<dyn ScriptRegistry>,
}

impl Game {
    /// Create a game with an empty match.
    #[must_use]
    pub fn new(config: RulesConfig, scripts: Arc<dyn ScriptRegistry>) -> Self {
        Self {
            state: Match::new(config.starting_life),
            chase: Chase::new(),
            priority: PriorityManager::new(),
            continuous: ContinuousEffectManager::new(),
            triggers: TriggerManager::new(),
            combat: CombatManager::new(),
            targeting: TargetingManager::new(),
            trigger_wait: None,
            live_scripts: FxHashSet::default(),
            config,
            scripts,
        }
    }

    /// Replace the script registry.
    pub fn attach_scripts(&mut self, scripts: Arc<dyn ScriptRegistry>) {
        self.scripts = scripts;
    }

    // === Accessors ===

    /// The match.
    #[must_use]
    pub fn state(&self) -> &Match {
        &self.state
    }

    /// A card.
    #[must_use]
    pub fn card(&self, id: CardId) -> Option<&CardInstance> {
        self.state.card(id)
    }

    #[must_use]
    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    #[must_use]
    pub fn chase(&self) -> &Chase {
        &self.chase
    }

    #[must_use]
    pub fn priority(&self) -> &PriorityManager {
        &self.priority
    }

    /// Current priority state.
    #[must_use]
    pub fn priority_state(&self) -> PriorityState {
        self.priority.state()
    }

    /// The player holding priority.
    #[must_use]
    pub fn priority_holder(&self) -> Option<PlayerId> {
        self.priority.holder()
    }

    #[must_use]
    pub fn combat(&self) -> &CombatManager {
        &self.combat
    }

    #[must_use]
    pub fn continuous(&self) -> &ContinuousEffectManager {
        &self.continuous
    }

    #[must_use]
    pub fn triggers(&self) -> &TriggerManager {
        &self.triggers
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    #[must_use]
    pub fn turn_player(&self) -> PlayerId {
        self.state.turn_player
    }

    /// How the game ended, once it has.
    #[must_use]
    pub fn outcome(&self) -> Option<GameOutcome> {
        self.state.outcome
    }

    /// The action waiting for input.
    #[must_use]
    pub fn pending_action(&self) -> Option<&PendingAction> {
        self.priority.pending()
    }

    // === Setup ===

    /// Create a card directly in a zone, without events.
    ///
    /// Cards created on the field are not summoning sick and their script
    /// abilities are live at once.
    pub fn add_card(&mut self, owner: PlayerId, template: CardTemplate, zone: Zone) -> CardId {
        let id = self.state.create_card(owner, template, zone);
        if zone == Zone::Field {
            self.activate_scripts(id);
            self.recompute();
        }
        id
    }

    /// Create `owner`'s ruler in the ruler area.
    pub fn set_ruler(&mut self, owner: PlayerId, template: CardTemplate) -> CardId {
        let id = self.state.create_card(owner, template, Zone::RulerArea);
        self.state.players[owner].ruler = Some(id);
        self.activate_scripts(id);
        self.recompute();
        id
    }

    /// Put a new card onto the field the way an effect would: it enters
    /// this turn and fires `EnterField`.
    pub fn put_onto_field(&mut self, owner: PlayerId, template: CardTemplate) -> CardId {
        let id = self.state.create_card(owner, template, Zone::Hand);
        if let Err(err) = self.state.move_card(id, Zone::Field) {
            warn!(card = %id, %err, "could not put card onto the field");
        }
        self.settle();
        id
    }

    /// Shuffle both players' decks deterministically.
    pub fn shuffle_decks(&mut self, seed: u64) {
        self.state.shuffle_decks(seed);
    }

    // === Registration ===

    /// Register a continuous effect and recompute.
    pub fn register_effect(&mut self, source: CardId, declaration: ContinuousDeclaration) -> EffectId {
        let id = self.continuous.register_effect(source, declaration);
        self.recompute();
        id
    }

    /// Remove every effect `source` created and recompute.
    pub fn unregister_source(&mut self, source: CardId) -> usize {
        let removed = self.continuous.unregister_source(source);
        self.recompute();
        removed
    }

    /// Register a triggered ability for `card`.
    pub fn register_trigger(&mut self, card: CardId, ability: TriggeredAbility) -> TriggerId {
        self.triggers.register_trigger(card, ability)
    }

    /// Register a replacement effect.
    pub fn register_replacement(&mut self, source: CardId, declaration: ReplacementDeclaration) -> ReplacementId {
        self.state.replacements.register(source, declaration)
    }

    /// Registered replacement effects.
    #[must_use]
    pub fn replacements(&self) -> &ReplacementManager {
        &self.state.replacements
    }

    /// Remove every triggered ability of `card`.
    ///
    /// The card's script abilities count as gone, so they come back if the
    /// card leaves and re-enters the field.
    pub fn unregister_card(&mut self, card: CardId) -> usize {
        self.live_scripts.remove(&card);
        self.triggers.unregister_card(card)
    }

    /// Run a state-based checkpoint now.
    pub fn run_state_based_actions(&mut self) {
        self.settle();
    }

    pub(crate) fn ensure_running(&self) -> RulesResult<()> {
        match self.state.outcome {
            Some(outcome) => Err(RulesError::illegal(format!("the game is over ({:?})", outcome))),
            None => Ok(()),
        }
    }

    // === Script abilities ===

    /// Register `card`'s script triggers and continuous effects.
    pub(crate) fn activate_scripts(&mut self, card: CardId) {
        if !self.live_scripts.insert(card) {
            return;
        }
        let scripts = Arc::clone(&self.scripts);
        let Some(script) = self.state.card(card).and_then(|c| scripts.script(c.code())) else {
            return;
        };
        for ability in &script.triggered {
            self.triggers.register_trigger(card, ability.clone());
        }
        for declaration in &script.continuous {
            self.continuous.register_effect(card, declaration.clone());
        }
        for declaration in &script.replacements {
            self.state.replacements.register(card, declaration.clone());
        }
        debug!(
            %card,
            triggers = script.triggered.len(),
            effects = script.continuous.len(),
            replacements = script.replacements.len(),
            "script abilities live"
        );
    }

    /// Drop `card`'s triggers and while-on-field effects.
    pub(crate) fn deactivate_scripts(&mut self, card: CardId) {
        self.live_scripts.remove(&card);
        self.triggers.unregister_card(card);
        self.continuous.unregister_static_effects(card);
        self.continuous.forget_card(card);
        self.state.replacements.unregister_static(card);
    }

    /// Recompute derived card state.
    pub(crate) fn recompute(&mut self) {
        let scripts = Arc::clone(&self.scripts);
        self.continuous.apply_all_effects(&mut self.state, scripts.as_ref());
    }

    /// Run operations on behalf of `ctx.source`, take countered spells off
    /// the chase, and schedule any Eternal follow-ups they caused.
    pub(crate) fn run_ops(&mut self, ops: &[EffectOp], ctx: &ResolveContext) -> ResolveSummary {
        let scripts = Arc::clone(&self.scripts);
        let mut env = ResolveEnv {
            state: &mut self.state,
            continuous: &mut self.continuous,
            scripts: scripts.as_ref(),
        };
        let summary = EffectResolver::resolve_all(ops, ctx, &mut env);
        self.counter_spells(&summary.countered);
        self.schedule_eternal(&summary.eternal);
        summary
    }

    /// Eternal cards come back to their owner's hand at end of turn if they
    /// are still in the graveyard.
    pub(crate) fn schedule_eternal(&mut self, follow_ups: &[EternalReturn]) {
        for follow_up in follow_ups {
            self.triggers.add_delayed(DelayedTrigger {
                timing: DelayedTiming::EndOfTurn,
                card: follow_up.card,
                controller: follow_up.owner,
                requires_zone: Some(Zone::Graveyard),
                ops: vec![EffectOp::ReturnToHand(CardScope::Source)],
            });
        }
    }

    // === Checkpoint ===

    /// The state-based checkpoint.
    pub(crate) fn settle(&mut self) {
        if self.state.is_game_over() {
            return;
        }
        let mut to_push = self.triggers.release_state_based();
        let mut quiet = false;

        for _ in 0..self.config.max_state_based_iterations {
            self.dispatch_events();
            self.recompute();
            self.destroy_dead();
            if let Some(outcome) = self.state.check_outcome() {
                self.finish_game(outcome);
                return;
            }

            let batch = self
                .triggers
                .process_pending_triggers(self.state.turn_player, self.config.trigger_ordering);
            to_push.extend(batch.chase);
            for trigger in batch.immediate {
                self.resolve_immediately(trigger);
            }

            if !self.state.has_pending_events() {
                quiet = true;
                break;
            }
        }
        if !quiet {
            warn!(
                limit = self.config.max_state_based_iterations,
                "state-based checkpoint did not settle"
            );
        }
        self.push_triggers(to_push);
    }

    fn dispatch_events(&mut self) {
        let scripts = Arc::clone(&self.scripts);
        let events = self.state.drain_events();
        let on_field = |state: &Match, id: CardId| state.card(id).is_some_and(|c| c.zone == Zone::Field);

        for event in &events {
            if event.kind != TriggerEvent::EnterField {
                continue;
            }
            if let Some(card) = event.card.filter(|id| on_field(&self.state, *id)) {
                self.activate_scripts(card);
            }
        }
        for event in &events {
            self.triggers.check_triggers(event, &self.state, scripts.as_ref());
        }
        for event in &events {
            if event.kind != TriggerEvent::LeaveField {
                continue;
            }
            if let Some(card) = event.card.filter(|id| !on_field(&self.state, *id)) {
                self.deactivate_scripts(card);
            }
        }
    }

    /// Destroy every combatant on the field with no DEF left.
    fn destroy_dead(&mut self) {
        let dying: Vec<CardId> = self
            .state
            .cards_in(Zone::Field)
            .into_iter()
            .filter(|id| {
                self.state.card(*id).is_some_and(|card| {
                    card.card_type.is_combatant()
                        && card.remaining_def() <= 0
                        && KeywordProcessor::can_be_destroyed(card)
                })
            })
            .collect();

        let mut follow_ups = Vec::new();
        for id in dying {
            match destroy_card(&mut self.state, id) {
                Ok(Some(follow_up)) => follow_ups.push(follow_up),
                Ok(None) => {}
                Err(err) => warn!(card = %id, %err, "state-based destruction failed"),
            }
        }
        self.schedule_eternal(&follow_ups);
    }

    fn resolve_immediately(&mut self, trigger: PendingTrigger) {
        let mut ctx = ResolveContext::new(trigger.card, trigger.controller).with_event(trigger.event.clone());
        if let Some(requirement) = &trigger.ability.targets {
            let scripts = Arc::clone(&self.scripts);
            match self.targeting.request_targets(
                requirement,
                trigger.card,
                trigger.controller,
                &mut self.state,
                scripts.as_ref(),
                false,
            ) {
                TargetOutcome::Selected(targets) => ctx = ctx.with_targets(&targets),
                TargetOutcome::Failed | TargetOutcome::Suspended(_) => {
                    debug!(card = %trigger.card, name = %trigger.ability.name, "immediate trigger has no targets");
                    return;
                }
            }
        }
        debug!(card = %trigger.card, name = %trigger.ability.name, "immediate trigger");
        self.run_ops(&trigger.ability.ops, &ctx);
    }

    /// Put fired chase triggers onto the chase, in order.
    ///
    /// A "may" trigger, or one whose controller must pick targets, suspends
    /// the rest until its request is answered.
    pub(crate) fn push_triggers(&mut self, triggers: Vec<PendingTrigger>) {
        if triggers.is_empty() {
            return;
        }
        if let Some(wait) = self.trigger_wait.as_mut() {
            wait.queued.extend(triggers);
            return;
        }

        let mut queue = triggers.into_iter();
        while let Some(trigger) = queue.next() {
            let waiting = if trigger.ability.mandatory {
                self.push_trigger(trigger)
                    .map(|(request, trigger)| (request, trigger, TriggerWaitKind::Targets))
            } else {
                let request = self.state.next_request_id();
                Some((request, trigger, TriggerWaitKind::Confirm))
            };
            if let Some((request, trigger, kind)) = waiting {
                self.wait_for_trigger(request, kind, trigger, queue.collect(), self.priority.holder());
                return;
            }
        }
    }

    /// Push one trigger, choosing its targets first. Returns the trigger
    /// and the open request when the controller has to pick.
    pub(crate) fn push_trigger(&mut self, trigger: PendingTrigger) -> Option<(RequestId, PendingTrigger)> {
        let Some(requirement) = trigger.ability.targets.clone() else {
            self.chase.push(ChaseItem::trigger(trigger));
            return None;
        };
        let scripts = Arc::clone(&self.scripts);
        match self.targeting.request_targets(
            &requirement,
            trigger.card,
            trigger.controller,
            &mut self.state,
            scripts.as_ref(),
            !self.config.auto_target_triggers,
        ) {
            TargetOutcome::Selected(targets) => {
                self.chase
                    .push(ChaseItem::trigger(trigger).with_targets(targets, Some(requirement)));
                None
            }
            TargetOutcome::Failed => {
                debug!(card = %trigger.card, name = %trigger.ability.name, "trigger has no legal targets");
                None
            }
            TargetOutcome::Suspended(request) => Some((request, trigger)),
        }
    }

    pub(crate) fn wait_for_trigger(
        &mut self,
        request: RequestId,
        kind: TriggerWaitKind,
        trigger: PendingTrigger,
        queued: Vec<PendingTrigger>,
        resume: Option<PlayerId>,
    ) {
        self.priority.await_response();
        debug!(card = %trigger.card, %request, ?kind, "trigger waits for its controller");
        self.trigger_wait = Some(TriggerWait {
            request,
            kind,
            trigger,
            queued,
            resume,
        });
    }

    /// Give priority to `player`, or to them once a trigger wait is over.
    pub(crate) fn hand_priority_to(&mut self, player: PlayerId) {
        match self.trigger_wait.as_mut() {
            Some(wait) => wait.resume = Some(player),
            None => self.priority.give_to(player),
        }
    }

    pub(crate) fn finish_game(&mut self, outcome: GameOutcome) {
        info!(?outcome, turn = self.state.turn_number, "game decided");
        self.priority.close();
        self.combat.clear();
        self.targeting.clear();
        self.trigger_wait = None;
    }
}
