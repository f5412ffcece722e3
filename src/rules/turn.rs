//! Turn structure: phases, turn hand-over, and the battle driver.

use tracing::{debug, info};

use super::decision::{ActionOutcome, DecisionRequest};
use super::engine::Game;
use crate::combat::{CombatProgress, CombatStep};
use crate::core::{Phase, PlayerId, RulesError, RulesResult, Zone};
use crate::effects::ResolveContext;
use crate::keywords::DamageStep;
use crate::triggers::{DelayedTiming, GameEvent, TriggerEvent};

/// Cards each player draws before the first turn.
pub const OPENING_HAND: usize = 5;

impl Game {
    /// Start the game: draw opening hands and begin `first_player`'s first
    /// turn at its draw phase.
    pub fn start_game(&mut self, first_player: PlayerId) -> RulesResult<()> {
        if self.state.turn_number != 0 {
            return Err(RulesError::illegal("the game has already started"));
        }
        self.state.first_player = first_player;
        self.state.turn_player = first_player;
        self.state.turn_number = 1;
        for player in PlayerId::both() {
            self.state.draw_cards(player, OPENING_HAND);
        }
        info!(first = %first_player, "game started");
        self.state
            .emit(GameEvent::new(TriggerEvent::TurnStart).with_player(first_player));
        self.enter_phase(Phase::Draw);
        Ok(())
    }

    /// Move on to the next phase, or to the next turn after End.
    ///
    /// Called after both players pass over an empty chase. A battle still
    /// running ends first.
    pub fn advance_phase(&mut self) -> RulesResult<Phase> {
        self.ensure_running()?;
        if !self.chase.is_empty() {
            return Err(RulesError::illegal("the chase is not empty"));
        }
        if self.combat.is_active() {
            self.combat.end_battle_phase(&mut self.state);
            self.settle();
        }
        match self.state.phase.next() {
            Some(next) => self.enter_phase(next),
            None => self.finish_turn(),
        }
        Ok(self.state.phase)
    }

    /// Jump straight to `phase` of the current turn.
    pub fn change_phase(&mut self, phase: Phase) -> RulesResult<()> {
        self.ensure_running()?;
        if self.combat.is_active() {
            self.combat.end_battle_phase(&mut self.state);
            self.settle();
        }
        self.enter_phase(phase);
        Ok(())
    }

    /// End the current turn and start the opponent's.
    pub fn end_turn(&mut self) -> RulesResult<()> {
        self.ensure_running()?;
        if !self.chase.is_empty() {
            return Err(RulesError::illegal("the chase is not empty"));
        }
        if self.state.phase != Phase::End {
            self.change_phase(Phase::End)?;
        }
        self.finish_turn();
        Ok(())
    }

    /// Enter the battle phase of the current turn.
    ///
    /// Returns the attacker request unless the battle needs no decision.
    pub fn begin_battle_phase(&mut self) -> RulesResult<ActionOutcome> {
        self.ensure_running()?;
        if !self.chase.is_empty() {
            return Err(RulesError::illegal("the chase is not empty"));
        }
        self.state.phase = Phase::Battle;
        info!(turn = self.state.turn_number, phase = ?Phase::Battle, "phase");
        self.priority.reset_for_phase(self.state.turn_player);
        let progress = self.combat.begin_battle_phase(self.state.turn_player, &mut self.state);
        self.settle();
        Ok(self.continue_battle(progress))
    }

    pub(crate) fn enter_phase(&mut self, phase: Phase) {
        let turn_player = self.state.turn_player;
        let turn = self.state.turn_number;
        self.state.phase = phase;
        info!(turn, player = %turn_player, ?phase, "phase");

        match phase {
            Phase::Draw => {
                self.state
                    .emit(GameEvent::new(TriggerEvent::DrawPhase).with_player(turn_player));
                let skip = self.config.first_player_skips_draw
                    && turn == 1
                    && turn_player == self.state.first_player;
                if !skip {
                    self.state.draw_cards(turn_player, 1);
                }
            }
            Phase::Recovery => self.recover(turn_player),
            Phase::Main => {
                self.state
                    .emit(GameEvent::new(TriggerEvent::MainPhase).with_player(turn_player));
            }
            Phase::Battle => {
                self.priority.reset_for_phase(turn_player);
                let progress = self.combat.begin_battle_phase(turn_player, &mut self.state);
                self.settle();
                self.continue_battle(progress);
                return;
            }
            Phase::End => {
                self.state
                    .emit(GameEvent::new(TriggerEvent::EndPhase).with_player(turn_player));
                self.state
                    .emit(GameEvent::new(TriggerEvent::TurnEnd).with_player(turn_player));
                self.release_delayed(DelayedTiming::EndOfTurn);
            }
        }
        self.priority.reset_for_phase(turn_player);
        self.settle();
    }

    /// Recover the turn player's field and ruler. The first recovery of each
    /// player is skipped.
    fn recover(&mut self, player: PlayerId) {
        self.state.players[player].will_pool.clear();
        if !self.state.players[player].has_had_recovery {
            self.state.players[player].has_had_recovery = true;
            debug!(%player, "first recovery skipped");
            return;
        }

        let mut cards = self.state.field_of(player);
        cards.extend(self.state.players[player].ruler);
        let mut recovered = 0;
        for id in cards {
            let Some(card) = self.state.card_mut(id) else { continue };
            if !card.is_rested || !matches!(card.zone, Zone::Field | Zone::RulerArea) {
                continue;
            }
            card.is_rested = false;
            recovered += 1;
            self.state
                .emit(GameEvent::new(TriggerEvent::Recovered).with_card(id).with_player(player));
        }
        debug!(%player, recovered, "recovery");
    }

    /// End-of-turn cleanup and the hand-over to the next turn.
    fn finish_turn(&mut self) {
        let turn_player = self.state.turn_player;

        let hand = self.state.players[turn_player].zone(Zone::Hand);
        let excess = hand.len().saturating_sub(self.config.max_hand_size);
        for id in hand.iter().rev().take(excess).copied() {
            if self.state.move_card(id, Zone::Graveyard).is_ok() {
                self.state.emit(
                    GameEvent::new(TriggerEvent::CardDiscarded)
                        .with_card(id)
                        .with_player(turn_player),
                );
            }
        }

        self.continuous.remove_end_of_turn_effects();
        self.state.replacements.remove_end_of_turn();
        for card in self.state.cards_mut() {
            card.damage = 0;
        }
        for (_, player) in self.state.players.iter_mut() {
            player.will_pool.clear();
            player.has_called_stone = false;
        }
        self.triggers.reset_turn_triggers();
        self.settle();
        if self.state.is_game_over() {
            return;
        }

        self.state.turn_number += 1;
        self.state.turn_player = turn_player.opponent();
        let next = self.state.turn_player;
        info!(turn = self.state.turn_number, player = %next, "turn");
        self.release_delayed(DelayedTiming::NextTurnStart);
        self.state
            .emit(GameEvent::new(TriggerEvent::TurnStart).with_player(next));
        self.enter_phase(Phase::Draw);
    }

    /// Resolve the delayed triggers due at `timing`.
    fn release_delayed(&mut self, timing: DelayedTiming) {
        for delayed in self.triggers.release_delayed(timing) {
            let in_zone = match delayed.requires_zone {
                Some(zone) => self.state.card(delayed.card).is_some_and(|c| c.zone == zone),
                None => true,
            };
            if !in_zone {
                debug!(card = %delayed.card, ?timing, "delayed trigger lapsed");
                continue;
            }
            let ctx = ResolveContext::new(delayed.card, delayed.controller);
            self.run_ops(&delayed.ops, &ctx);
        }
    }

    // === Battle ===

    /// Drive the battle until it needs a decision or priority.
    pub(crate) fn continue_battle(&mut self, mut progress: CombatProgress) -> ActionOutcome {
        loop {
            if self.state.is_game_over() {
                return ActionOutcome::Done;
            }
            match progress {
                CombatProgress::AwaitingAttackers { request, legal } => {
                    if self.config.unattended_combat {
                        let attacks = self.combat.default_attacks();
                        progress = match self.combat.declare_attackers(&attacks, &mut self.state) {
                            Ok(next) => next,
                            Err(_) => {
                                self.combat.end_battle_phase(&mut self.state);
                                CombatProgress::Ended
                            }
                        };
                        self.settle();
                        continue;
                    }
                    let player = self.state.turn_player;
                    self.hand_priority_to(player);
                    return ActionOutcome::Suspended(DecisionRequest::DeclareAttackers {
                        id: request,
                        player,
                        legal,
                    });
                }
                CombatProgress::AwaitingBlockers { request, legal } => {
                    if self.config.unattended_combat {
                        progress = self
                            .combat
                            .declare_blockers(&[], &mut self.state)
                            .unwrap_or(CombatProgress::ReadyForDamage);
                        self.settle();
                        continue;
                    }
                    let defender = self.state.turn_player.opponent();
                    let attacks = self
                        .combat
                        .state()
                        .map(|c| c.attacks.clone())
                        .unwrap_or_default();
                    self.hand_priority_to(defender);
                    return ActionOutcome::Suspended(DecisionRequest::DeclareBlockers {
                        id: request,
                        player: defender,
                        legal,
                        attacks,
                    });
                }
                CombatProgress::ReadyForDamage => {
                    if !self.chase.is_empty() || self.trigger_wait.is_some() {
                        // Damage waits until the declaration triggers resolve.
                        self.hand_priority_to(self.state.turn_player);
                        return ActionOutcome::Done;
                    }
                    self.run_battle_damage();
                    return ActionOutcome::Done;
                }
                CombatProgress::Ended => {
                    self.settle();
                    self.hand_priority_to(self.state.turn_player);
                    return ActionOutcome::Done;
                }
            }
        }
    }

    /// Run the first-strike and normal damage steps and end the battle.
    ///
    /// Continuous effects are recomputed and the destruction check runs
    /// after each step, so first-strike kills happen before normal damage.
    pub(crate) fn run_battle_damage(&mut self) {
        for step in [DamageStep::FirstStrike, DamageStep::Normal] {
            if self.state.is_game_over() {
                return;
            }
            if !self.combat.has_damage_in(step, &self.state) {
                continue;
            }
            let report = self.combat.run_damage_step(step, &mut self.state);
            self.recompute();
            let follow_ups = self.combat.destruction_check(&report.exploded, &mut self.state);
            self.schedule_eternal(&follow_ups);
            self.settle();
        }
        if self.state.is_game_over() {
            return;
        }
        self.combat.end_battle_phase(&mut self.state);
        self.settle();
        self.hand_priority_to(self.state.turn_player);
    }

    /// Run battle damage if the declarations are done and the chase is
    /// clear.
    pub(crate) fn maybe_run_battle_damage(&mut self) {
        let ready = self.chase.is_empty()
            && self.trigger_wait.is_none()
            && self
                .combat
                .state()
                .is_some_and(|c| c.step == CombatStep::DeclareBlockers && c.request.is_none());
        if ready {
            self.run_battle_damage();
        }
    }

    /// The player who owes a combat declaration.
    pub(crate) fn declaration_owner(&self) -> Option<PlayerId> {
        let combat = self.combat.state()?;
        combat.request?;
        match combat.step {
            CombatStep::DeclareAttackers => Some(combat.active_player),
            CombatStep::DeclareBlockers => Some(combat.defending_player),
            _ => None,
        }
    }

    /// Priority after the chase resolved: back to whoever owes a combat
    /// declaration, else to the turn player.
    pub(crate) fn restore_priority(&mut self) {
        match self.declaration_owner() {
            Some(player) => self.priority.give_to(player),
            None => self.priority.after_chase_resolution(),
        }
    }
}
