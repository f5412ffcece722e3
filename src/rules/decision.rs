//! Requests to the decision provider and their answers.
//!
//! Whenever the engine needs a choice it cannot make itself it stops and
//! exposes a [`DecisionRequest`]. The host answers with
//! [`Game::submit`](super::Game::submit) using the request's id, or gives up
//! with [`Game::cancel_request`](super::Game::cancel_request). At most one
//! request is outstanding at a time.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::engine::{Game, TriggerWaitKind};
use crate::cards::Attribute;
use crate::chase::{ChaseItem, ChaseItemId, PendingInput};
use crate::combat::{Attack, AttackDeclaration, BlockDeclaration, CombatStep};
use crate::core::{CardId, GameOutcome, Phase, PlayerAction, PlayerId, RequestId, RulesError, RulesResult};
use crate::triggers::PendingTrigger;

/// A choice the engine is waiting for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionRequest {
    /// The turn player declares attackers.
    DeclareAttackers {
        id: RequestId,
        player: PlayerId,
        legal: Vec<CardId>,
    },

    /// The defending player declares blockers.
    DeclareBlockers {
        id: RequestId,
        player: PlayerId,
        legal: Vec<CardId>,
        attacks: Vec<Attack>,
    },

    /// Choose targets for a card, ability, or trigger.
    SelectTargets {
        id: RequestId,
        player: PlayerId,
        source: CardId,
        valid: Vec<CardId>,
        min: usize,
        max: usize,
        optional: bool,
    },

    /// Choose modes of a modal spell.
    SelectModes {
        id: RequestId,
        player: PlayerId,
        source: CardId,
        labels: Vec<String>,
        choose: usize,
    },

    /// Choose X for a cost with X. `max` is what the player can afford.
    ChooseX {
        id: RequestId,
        player: PlayerId,
        source: CardId,
        max: u32,
    },

    /// Choose which colour of will to produce.
    SelectWillColor {
        id: RequestId,
        player: PlayerId,
        source: CardId,
        colors: Vec<Attribute>,
    },

    /// Decide whether a "may" trigger goes on the chase.
    ConfirmTrigger {
        id: RequestId,
        player: PlayerId,
        source: CardId,
        name: String,
    },
}

impl DecisionRequest {
    /// The id to answer with.
    #[must_use]
    pub fn id(&self) -> RequestId {
        match self {
            Self::DeclareAttackers { id, .. }
            | Self::DeclareBlockers { id, .. }
            | Self::SelectTargets { id, .. }
            | Self::SelectModes { id, .. }
            | Self::ChooseX { id, .. }
            | Self::SelectWillColor { id, .. }
            | Self::ConfirmTrigger { id, .. } => *id,
        }
    }

    /// The player who must answer.
    #[must_use]
    pub fn player(&self) -> PlayerId {
        match self {
            Self::DeclareAttackers { player, .. }
            | Self::DeclareBlockers { player, .. }
            | Self::SelectTargets { player, .. }
            | Self::SelectModes { player, .. }
            | Self::ChooseX { player, .. }
            | Self::SelectWillColor { player, .. }
            | Self::ConfirmTrigger { player, .. } => *player,
        }
    }
}

/// An answer to a [`DecisionRequest`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionAnswer {
    Attackers(Vec<AttackDeclaration>),
    Blockers(Vec<BlockDeclaration>),
    Targets(Vec<CardId>),
    Modes(Vec<usize>),
    XValue(u32),
    WillColor(Attribute),
    Confirm(bool),
}

/// What a successful call into the engine did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    /// The action completed without touching the chase.
    Done,
    /// A frame went onto the chase.
    Pushed(ChaseItemId),
    /// The engine is waiting for a decision.
    Suspended(DecisionRequest),
    /// Priority moved to this player.
    PriorityPassed(PlayerId),
    /// The top frame resolved.
    Resolved(ChaseItemId),
    /// The turn structure moved on to this phase.
    PhaseAdvanced(Phase),
    /// The game ended.
    GameOver(GameOutcome),
}

impl ActionOutcome {
    /// The request this outcome is waiting on, if any.
    #[must_use]
    pub fn request(&self) -> Option<&DecisionRequest> {
        match self {
            Self::Suspended(request) => Some(request),
            _ => None,
        }
    }
}

impl Game {
    /// The decision the engine is waiting for, if any.
    #[must_use]
    pub fn pending_decision(&self) -> Option<DecisionRequest> {
        if let Some(wait) = &self.trigger_wait {
            return match wait.kind {
                TriggerWaitKind::Targets => self.target_decision(),
                TriggerWaitKind::Confirm => Some(DecisionRequest::ConfirmTrigger {
                    id: wait.request,
                    player: wait.trigger.controller,
                    source: wait.trigger.card,
                    name: wait.trigger.ability.name.clone(),
                }),
            };
        }
        if let Some(pending) = self.priority.pending() {
            return self.decision_for_pending(pending);
        }
        let combat = self.combat.state()?;
        let id = combat.request?;
        match combat.step {
            CombatStep::DeclareAttackers => Some(DecisionRequest::DeclareAttackers {
                id,
                player: combat.active_player,
                legal: combat.legal.clone(),
            }),
            CombatStep::DeclareBlockers => Some(DecisionRequest::DeclareBlockers {
                id,
                player: combat.defending_player,
                legal: combat.legal.clone(),
                attacks: combat.attacks.clone(),
            }),
            _ => None,
        }
    }

    /// The open target request as a decision.
    pub(crate) fn target_decision(&self) -> Option<DecisionRequest> {
        let request = self.targeting.pending()?;
        Some(DecisionRequest::SelectTargets {
            id: request.id,
            player: request.controller,
            source: request.source,
            valid: request.valid_targets.clone(),
            min: request.requirement.min_targets,
            max: request.requirement.max_targets,
            optional: request.requirement.optional,
        })
    }

    /// Answer the outstanding request.
    ///
    /// A rejected answer leaves the request open.
    pub fn submit(&mut self, id: RequestId, answer: DecisionAnswer) -> RulesResult<ActionOutcome> {
        self.ensure_running()?;

        if let Some(kind) = self.trigger_wait.as_ref().filter(|wait| wait.request == id).map(|w| w.kind) {
            return match (kind, answer) {
                (TriggerWaitKind::Targets, DecisionAnswer::Targets(targets)) => {
                    self.answer_trigger_targets(id, &targets)
                }
                (TriggerWaitKind::Confirm, DecisionAnswer::Confirm(accept)) => self.answer_trigger_confirm(id, accept),
                (TriggerWaitKind::Targets, _) => Err(RulesError::illegal(format!("{} expects targets", id))),
                (TriggerWaitKind::Confirm, _) => Err(RulesError::illegal(format!("{} expects a yes or no", id))),
            };
        }

        if let Some(pending) = self.priority.pending().filter(|p| p.request == Some(id)) {
            let pending = pending.id;
            let input = match answer {
                DecisionAnswer::Targets(targets) => PendingInput::Targets(targets),
                DecisionAnswer::Modes(modes) => PendingInput::Modes(modes),
                DecisionAnswer::XValue(x) => PendingInput::XValue(x),
                DecisionAnswer::WillColor(color) => PendingInput::WillColor(color),
                DecisionAnswer::Attackers(_) | DecisionAnswer::Blockers(_) => {
                    return Err(RulesError::illegal(format!("{} is not a combat request", id)));
                }
                DecisionAnswer::Confirm(_) => {
                    return Err(RulesError::illegal(format!("{} does not ask for a yes or no", id)));
                }
            };
            return self.provide_input(pending, input);
        }

        if self.combat.pending_request() == Some(id) {
            let player = self
                .declaration_owner()
                .ok_or_else(|| RulesError::illegal("no combat declaration is owed"))?;
            return match answer {
                DecisionAnswer::Attackers(declarations) => {
                    self.take_action(player, PlayerAction::Attack { declarations })
                }
                DecisionAnswer::Blockers(blocks) => self.take_action(player, PlayerAction::Block { blocks }),
                _ => Err(RulesError::illegal(format!("{} expects a combat declaration", id))),
            };
        }

        warn!(request = %id, "answer to an unknown request");
        Err(RulesError::UnknownRequest(id))
    }

    /// Give up on the outstanding request.
    ///
    /// A trigger waiting for targets is skipped, a "may" trigger is
    /// declined, a pending action is dropped, and a combat declaration
    /// becomes an empty one.
    pub fn cancel_request(&mut self, id: RequestId) -> RulesResult<ActionOutcome> {
        self.ensure_running()?;

        if let Some(kind) = self.trigger_wait.as_ref().filter(|wait| wait.request == id).map(|w| w.kind) {
            if kind == TriggerWaitKind::Targets {
                self.targeting.cancel_selection(id)?;
            }
            if let Some(wait) = self.trigger_wait.take() {
                debug!(card = %wait.trigger.card, name = %wait.trigger.ability.name, "trigger skipped");
                self.resume_after_trigger_wait(wait.resume, wait.queued);
            }
            return Ok(self.finish(ActionOutcome::Done));
        }

        if self.priority.pending().is_some_and(|p| p.request == Some(id)) {
            self.cancel_pending_action()?;
            return Ok(ActionOutcome::Done);
        }

        if self.combat.pending_request() == Some(id) {
            let player = self
                .declaration_owner()
                .ok_or_else(|| RulesError::illegal("no combat declaration is owed"))?;
            let action = match self.combat.step() {
                Some(CombatStep::DeclareAttackers) => PlayerAction::Attack { declarations: Vec::new() },
                _ => PlayerAction::Block { blocks: Vec::new() },
            };
            return self.take_action(player, action);
        }

        Err(RulesError::UnknownRequest(id))
    }

    fn answer_trigger_targets(&mut self, id: RequestId, targets: &[CardId]) -> RulesResult<ActionOutcome> {
        let chosen = self.targeting.submit_selection(id, targets)?;
        let wait = self.trigger_wait.take().ok_or(RulesError::UnknownRequest(id))?;
        let requirement = wait.trigger.ability.targets.clone();
        let pushed = self
            .chase
            .push(ChaseItem::trigger(wait.trigger).with_targets(chosen, requirement));
        self.resume_after_trigger_wait(wait.resume, wait.queued);
        Ok(self.finish(ActionOutcome::Pushed(pushed)))
    }

    fn answer_trigger_confirm(&mut self, id: RequestId, accept: bool) -> RulesResult<ActionOutcome> {
        let wait = self.trigger_wait.take().ok_or(RulesError::UnknownRequest(id))?;
        if !accept {
            debug!(card = %wait.trigger.card, name = %wait.trigger.ability.name, "trigger declined");
            self.resume_after_trigger_wait(wait.resume, wait.queued);
            return Ok(self.finish(ActionOutcome::Done));
        }
        let depth = self.chase.len();
        if let Some((request, trigger)) = self.push_trigger(wait.trigger) {
            self.wait_for_trigger(request, TriggerWaitKind::Targets, trigger, wait.queued, wait.resume);
            return Ok(self.finish(ActionOutcome::Done));
        }
        let pushed = (self.chase.len() > depth).then(|| self.chase.peek().map(|item| item.id)).flatten();
        self.resume_after_trigger_wait(wait.resume, wait.queued);
        Ok(self.finish(pushed.map_or(ActionOutcome::Done, ActionOutcome::Pushed)))
    }

    fn resume_after_trigger_wait(&mut self, resume: Option<PlayerId>, queued: Vec<PendingTrigger>) {
        let player = resume.unwrap_or(self.state.turn_player);
        self.priority.give_to(player);
        self.push_triggers(queued);
        self.maybe_run_battle_damage();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cards::CardTemplate;
    use crate::chase::PriorityState;
    use crate::core::{RulesConfig, Zone};
    use crate::effects::EffectOp;
    use crate::scripts::{CardScript, ScriptLibrary};
    use crate::targeting::{single_target, target_opponent_resonator};
    use crate::triggers::TriggeredAbility;

    /// A game where "HUNTER" deals 200 to a chosen opposing resonator when
    /// it enters, and player 1 has two resonators.
    fn hunter_game() -> (Game, CardId, CardId) {
        let scripts = ScriptLibrary::new().with_script(
            "HUNTER",
            CardScript::new().with_trigger(
                TriggeredAbility::when_enters_field(vec![EffectOp::damage_targets(200)])
                    .with_targets(single_target(target_opponent_resonator())),
            ),
        );
        let mut game = Game::new(RulesConfig::default().with_manual_trigger_targets(), Arc::new(scripts));
        let a = game.add_card(PlayerId(1), CardTemplate::resonator("A", "A", 100, 500), Zone::Field);
        let b = game.add_card(PlayerId(1), CardTemplate::resonator("B", "B", 100, 500), Zone::Field);
        game.priority.reset_for_phase(PlayerId(0));
        game.put_onto_field(PlayerId(0), CardTemplate::resonator("HUNTER", "Hunter", 100, 100));
        (game, a, b)
    }

    #[test]
    fn test_request_accessors() {
        let request = DecisionRequest::SelectWillColor {
            id: RequestId(7),
            player: PlayerId(1),
            source: CardId(3),
            colors: vec![Attribute::Fire, Attribute::Water],
        };
        assert_eq!(request.id(), RequestId(7));
        assert_eq!(request.player(), PlayerId(1));

        let outcome = ActionOutcome::Suspended(request.clone());
        assert_eq!(outcome.request(), Some(&request));
        assert_eq!(ActionOutcome::Done.request(), None);
    }

    #[test]
    fn test_answer_serialization() {
        let answer = DecisionAnswer::Targets(vec![CardId(2), CardId(5)]);
        let json = serde_json::to_string(&answer).unwrap();
        let back: DecisionAnswer = serde_json::from_str(&json).unwrap();
        assert_eq!(answer, back);
    }

    // === Trigger targets ===

    #[test]
    fn test_submit_trigger_targets() {
        let (mut game, _, b) = hunter_game();
        let Some(DecisionRequest::SelectTargets { id, player, valid, .. }) = game.pending_decision() else {
            panic!("expected a target request");
        };
        assert_eq!(player, PlayerId(0));
        assert_eq!(valid.len(), 2);

        assert!(game.submit(id, DecisionAnswer::Modes(vec![0])).is_err());
        assert!(game.submit(id, DecisionAnswer::Targets(vec![CardId(999)])).is_err());
        assert_eq!(game.priority_state(), PriorityState::WaitingResponse);

        let outcome = game.submit(id, DecisionAnswer::Targets(vec![b])).unwrap();
        assert!(matches!(outcome, ActionOutcome::Pushed(_)));
        assert_eq!(game.chase().peek().unwrap().targets.as_slice(), &[b]);
        assert_eq!(game.priority_state(), PriorityState::Active(PlayerId(0)));
        assert!(game.pending_decision().is_none());
    }

    #[test]
    fn test_cancel_trigger_targets_skips_trigger() {
        let (mut game, _, _) = hunter_game();
        let id = game.pending_decision().unwrap().id();

        game.cancel_request(id).unwrap();
        assert!(game.chase().is_empty());
        assert_eq!(game.priority_state(), PriorityState::Active(PlayerId(0)));
        assert_eq!(game.cancel_request(id), Err(RulesError::UnknownRequest(id)));
    }

    // === Optional triggers ===

    /// "SCOUT" may gain 300 life when it enters. With `hunter` it also deals
    /// 200 to a chosen opposing resonator.
    fn scout_game(hunter: bool) -> Game {
        let mut ability = TriggeredAbility::when_enters_field(vec![EffectOp::gain_life(300)]).optional();
        if hunter {
            ability = ability.with_targets(single_target(target_opponent_resonator()));
        }
        let scripts = ScriptLibrary::new().with_script("SCOUT", CardScript::new().with_trigger(ability));
        let mut game = Game::new(RulesConfig::default().with_manual_trigger_targets(), Arc::new(scripts));
        game.add_card(PlayerId(1), CardTemplate::resonator("A", "A", 100, 500), Zone::Field);
        game.add_card(PlayerId(1), CardTemplate::resonator("B", "B", 100, 500), Zone::Field);
        game.priority.reset_for_phase(PlayerId(0));
        game.put_onto_field(PlayerId(0), CardTemplate::resonator("SCOUT", "Scout", 100, 100));
        game
    }

    #[test]
    fn test_optional_trigger_asks_first() {
        let mut game = scout_game(false);
        let Some(DecisionRequest::ConfirmTrigger { id, player, .. }) = game.pending_decision() else {
            panic!("expected a confirmation");
        };
        assert_eq!(player, PlayerId(0));
        assert!(game.chase().is_empty());
        assert_eq!(game.priority_state(), PriorityState::WaitingResponse);
        assert!(game.submit(id, DecisionAnswer::Targets(vec![])).is_err());

        let outcome = game.submit(id, DecisionAnswer::Confirm(true)).unwrap();
        assert!(matches!(outcome, ActionOutcome::Pushed(_)));
        assert_eq!(game.chase().len(), 1);
        assert_eq!(game.priority_state(), PriorityState::Active(PlayerId(0)));
    }

    #[test]
    fn test_declining_optional_trigger() {
        let mut game = scout_game(false);
        let id = game.pending_decision().unwrap().id();

        let outcome = game.submit(id, DecisionAnswer::Confirm(false)).unwrap();
        assert_eq!(outcome, ActionOutcome::Done);
        assert!(game.chase().is_empty());
        assert!(game.pending_decision().is_none());
    }

    #[test]
    fn test_cancel_declines_optional_trigger() {
        let mut game = scout_game(false);
        let id = game.pending_decision().unwrap().id();

        game.cancel_request(id).unwrap();
        assert!(game.chase().is_empty());
        assert_eq!(game.priority_state(), PriorityState::Active(PlayerId(0)));
    }

    #[test]
    fn test_accepted_trigger_then_asks_for_targets() {
        let mut game = scout_game(true);
        let id = game.pending_decision().unwrap().id();

        let outcome = game.submit(id, DecisionAnswer::Confirm(true)).unwrap();
        let Some(DecisionRequest::SelectTargets { id, valid, .. }) = outcome.request().cloned() else {
            panic!("expected a target request, got {:?}", outcome);
        };
        assert_eq!(valid.len(), 2);

        game.submit(id, DecisionAnswer::Targets(vec![valid[0]])).unwrap();
        assert_eq!(game.chase().peek().unwrap().targets.as_slice(), &[valid[0]]);
    }

    #[test]
    fn test_unknown_request() {
        let (mut game, _, _) = hunter_game();
        let result = game.submit(RequestId(4242), DecisionAnswer::Targets(vec![]));
        assert_eq!(result, Err(RulesError::UnknownRequest(RequestId(4242))));
    }
}
