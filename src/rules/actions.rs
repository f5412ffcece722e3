//! Player actions: legality, the pending-action pipeline, and finalizing.
//!
//! ## Flow
//!
//! [`Game::take_action`] checks priority and the timing window, then
//! dispatches. Playing a card, activating an ability, and producing will
//! become a [`PendingAction`] that collects its missing inputs (modes, then
//! targets, then a will colour). Each missing input suspends the action
//! with a [`DecisionRequest`]. Once complete, the action is re-checked,
//! paid for, and carried out.
//!
//! ```
//! use std::sync::Arc;
//! use chase_rules::cards::CardTemplate;
//! use chase_rules::core::{ActionType, PlayerId, RulesConfig, Zone};
//! use chase_rules::rules::Game;
//! use chase_rules::scripts::ScriptLibrary;
//!
//! let mut game = Game::new(RulesConfig::default(), Arc::new(ScriptLibrary::new()));
//! for player in PlayerId::both() {
//!     for i in 0..10 {
//!         game.add_card(player, CardTemplate::resonator(format!("R{}", i), "Knight", 300, 300), Zone::MainDeck);
//!     }
//! }
//! game.start_game(PlayerId(0)).unwrap();
//!
//! let legal = game.get_legal_actions(PlayerId(0));
//! assert!(legal.contains(&ActionType::Pass));
//! assert!(game.get_legal_actions(PlayerId(1)).is_empty());
//! ```

use std::sync::Arc;

use tracing::debug;

use super::decision::{ActionOutcome, DecisionRequest};
use super::engine::Game;
use crate::cards::{Attribute, CardType, WillCost};
use crate::chase::{
    ChaseItem, ChaseItemKind, ChasePayload, PassResult, PendingAction, PendingId, PendingInput,
    PendingKind, PendingNeed, TimingWindow,
};
use crate::combat::{AttackDeclaration, BlockDeclaration, CombatStep};
use crate::core::{
    ActionRecord, ActionType, CardId, ModeList, PlayerAction, PlayerId, RulesError, RulesResult,
    TargetList, Zone,
};
use crate::keywords::KeywordProcessor;
use crate::scripts::ActivatedAbility;
use crate::targeting::{TargetOutcome, TargetRequirement, TargetingManager};
use crate::triggers::{GameEvent, TriggerEvent};

impl Game {
    /// Timing facts for `player` right now.
    #[must_use]
    pub fn timing_window(&self, player: PlayerId) -> TimingWindow {
        TimingWindow {
            player,
            turn_player: self.state.turn_player,
            phase: self.state.phase,
            in_battle: self.combat.is_active(),
            chase_empty: self.chase.is_empty(),
            awaiting_blockers: self.combat.awaiting_blockers(),
        }
    }

    // === Legality ===

    /// Action types `player` can take now.
    #[must_use]
    pub fn get_legal_actions(&self, player: PlayerId) -> Vec<ActionType> {
        ActionType::ALL
            .into_iter()
            .filter(|action| self.can_take_action(player, *action))
            .collect()
    }

    /// Check whether `player` can take at least one action of this type.
    #[must_use]
    pub fn can_take_action(&self, player: PlayerId, action: ActionType) -> bool {
        if self.state.is_game_over()
            || !self.priority.has_priority(player)
            || !self.timing_window(player).allows(action)
        {
            return false;
        }
        match action {
            ActionType::Pass => self.check_pass(player).is_ok(),
            ActionType::PlayCard => self.playable_cards(player).next().is_some(),
            ActionType::ActivateAbility => self.has_activatable_ability(player),
            ActionType::ProduceWill => self
                .state
                .field_of(player)
                .into_iter()
                .any(|id| self.check_produce(player, id).is_ok()),
            ActionType::CallStone => self.check_call_stone(player).is_ok(),
            ActionType::Judgment => self.check_judgment(player).is_ok(),
            ActionType::Attack => self.check_attack(player).is_ok(),
            ActionType::Block => self.check_block(player).is_ok(),
        }
    }

    fn playable_cards(&self, player: PlayerId) -> impl Iterator<Item = CardId> + '_ {
        let players = &self.state.players[player];
        players
            .zone(Zone::Hand)
            .into_iter()
            .chain(players.zone(Zone::Graveyard))
            .filter(move |id| {
                self.check_play(player, *id).is_ok()
                    && self.check_targets(self.spell_requirement(*id).as_ref(), *id, player, None).is_ok()
            })
    }

    fn has_activatable_ability(&self, player: PlayerId) -> bool {
        let mut sources = self.state.field_of(player);
        sources.extend(self.state.players[player].ruler);
        sources.into_iter().any(|source| {
            let count = self
                .state
                .card(source)
                .and_then(|card| self.scripts.script(card.code()))
                .map_or(0, |script| script.activated.len());
            (0..count).any(|index| {
                self.check_activate(player, source, index).is_ok_and(|ability| {
                    self.check_targets(ability.targets.as_ref(), source, player, None).is_ok()
                })
            })
        })
    }

    // === Dispatch ===

    /// Take an action.
    ///
    /// On error nothing changed. A returned
    /// [`ActionOutcome::Suspended`] names the decision the engine needs next.
    pub fn take_action(&mut self, player: PlayerId, action: PlayerAction) -> RulesResult<ActionOutcome> {
        self.ensure_running()?;
        if !self.priority.has_priority(player) {
            return Err(RulesError::illegal(format!("{} does not hold priority", player)));
        }
        let action_type = action.action_type();
        if !self.timing_window(player).allows(action_type) {
            return Err(RulesError::illegal(format!(
                "{:?} is not allowed in {:?}",
                action_type, self.state.phase
            )));
        }
        debug!(%player, action = ?action_type, "action");

        let outcome = match action {
            PlayerAction::Pass => self.pass(player)?,
            PlayerAction::ProduceWill { source, color } => self.produce_will(player, source, color)?,
            PlayerAction::PlayCard { card, targets, modes } => self.play_card(player, card, targets, modes)?,
            PlayerAction::ActivateAbility {
                source,
                ability_index,
                targets,
            } => self.activate_ability(player, source, ability_index, targets)?,
            PlayerAction::CallStone => self.call_stone(player)?,
            PlayerAction::Judgment => self.judgment(player)?,
            PlayerAction::Attack { declarations } => self.attack(player, &declarations)?,
            PlayerAction::Block { blocks } => self.block(player, &blocks)?,
        };
        Ok(self.finish(outcome))
    }

    /// [`take_action`](Self::take_action), reporting only success.
    pub fn try_action(&mut self, player: PlayerId, action: PlayerAction) -> bool {
        self.take_action(player, action).is_ok()
    }

    /// Declare attackers for the battle in progress.
    pub fn declare_attackers(
        &mut self,
        player: PlayerId,
        declarations: &[AttackDeclaration],
    ) -> RulesResult<ActionOutcome> {
        self.take_action(
            player,
            PlayerAction::Attack {
                declarations: declarations.to_vec(),
            },
        )
    }

    /// Declare blockers for the battle in progress.
    pub fn declare_blockers(
        &mut self,
        player: PlayerId,
        blocks: &[BlockDeclaration],
    ) -> RulesResult<ActionOutcome> {
        self.take_action(
            player,
            PlayerAction::Block {
                blocks: blocks.to_vec(),
            },
        )
    }

    /// Override the outcome when the game ended or a trigger now waits for
    /// targets.
    pub(crate) fn finish(&self, outcome: ActionOutcome) -> ActionOutcome {
        if let Some(result) = self.state.outcome {
            return ActionOutcome::GameOver(result);
        }
        if self.trigger_wait.is_some() && outcome.request().is_none() {
            if let Some(request) = self.pending_decision() {
                return ActionOutcome::Suspended(request);
            }
        }
        outcome
    }

    fn record(&mut self, player: PlayerId, action: ActionType, card: Option<CardId>) {
        let turn = self.state.turn_number;
        self.state.record(ActionRecord::new(player, action, card, turn));
    }

    // === Pass ===

    fn check_pass(&self, player: PlayerId) -> RulesResult<()> {
        if self.chase.is_empty() && self.declaration_owner() == Some(player) {
            return Err(RulesError::illegal("a combat declaration is owed"));
        }
        Ok(())
    }

    fn pass(&mut self, player: PlayerId) -> RulesResult<ActionOutcome> {
        self.check_pass(player)?;
        let result = self.priority.record_pass(player, self.chase.is_empty())?;
        self.record(player, ActionType::Pass, None);
        match result {
            PassResult::PriorityTo(next) => Ok(ActionOutcome::PriorityPassed(next)),
            PassResult::Resolve => self.resolve_top().map(ActionOutcome::Resolved),
            PassResult::AdvancePhase => self.advance_phase().map(ActionOutcome::PhaseAdvanced),
        }
    }

    // === Targets ===

    fn spell_requirement(&self, card: CardId) -> Option<TargetRequirement> {
        let card = self.state.card(card)?;
        self.scripts.script(card.code())?.targets.clone()
    }

    /// Check that a requirement can be met and validate preset targets.
    fn check_targets(
        &self,
        requirement: Option<&TargetRequirement>,
        source: CardId,
        player: PlayerId,
        preset: Option<&[CardId]>,
    ) -> RulesResult<Option<TargetList>> {
        let Some(requirement) = requirement else {
            return match preset {
                Some(targets) if !targets.is_empty() => {
                    Err(RulesError::illegal(format!("{} takes no targets", source)))
                }
                _ => Ok(None),
            };
        };
        let valid = TargetingManager::valid_targets(
            requirement,
            source,
            player,
            &self.state,
            self.scripts.as_ref(),
        );
        if valid.len() < requirement.min_targets && !requirement.optional {
            return Err(RulesError::NoValidTargets { card: source });
        }
        preset
            .map(|targets| TargetingManager::validate_selection(requirement, &valid, targets))
            .transpose()
    }

    /// Attach a requirement to a new pending action, either as a need or with
    /// its preset targets.
    fn with_requirement(
        mut pending: PendingAction,
        requirement: Option<TargetRequirement>,
        preset: Option<TargetList>,
    ) -> PendingAction {
        match (requirement, preset) {
            (Some(requirement), Some(targets)) => {
                pending.requirement = Some(requirement);
                pending.targets = targets;
                pending
            }
            (Some(requirement), None) => pending.needing_targets(requirement),
            (None, _) => pending,
        }
    }

    // === Play ===

    /// Check that `player` may play `card` now. Returns whether it comes
    /// from the graveyard.
    fn check_play(&self, player: PlayerId, card: CardId) -> RulesResult<bool> {
        let instance = self.state.get_card(card)?;
        if instance.owner != player {
            return Err(RulesError::illegal(format!("{} does not own {}", player, card)));
        }
        let from_graveyard = match instance.zone {
            Zone::Hand => false,
            Zone::Graveyard if KeywordProcessor::can_play_from_graveyard(instance) => true,
            zone => {
                return Err(RulesError::illegal(format!("{} cannot be played from {}", card, zone)));
            }
        };
        if instance.card_type.is_stone() || matches!(instance.card_type, CardType::Ruler | CardType::JRuler) {
            return Err(RulesError::illegal(format!("{} is not played from hand", card)));
        }
        if !KeywordProcessor::is_quickcast(instance) && !self.timing_window(player).is_main_timing() {
            return Err(RulesError::illegal(format!("{} needs main timing", card)));
        }
        if !self.state.players[player].will_pool.can_pay(&instance.template.cost) {
            return Err(RulesError::insufficient(format!("cannot pay for {}", card)));
        }
        Ok(from_graveyard)
    }

    fn play_card(
        &mut self,
        player: PlayerId,
        card: CardId,
        targets: Option<TargetList>,
        modes: Option<ModeList>,
    ) -> RulesResult<ActionOutcome> {
        let from_graveyard = self.check_play(player, card)?;
        let scripts = Arc::clone(&self.scripts);
        let script = self.state.card(card).and_then(|c| scripts.script(c.code()));
        let requirement = script.and_then(|s| s.targets.clone());
        let mode_choice = script.and_then(|s| s.modes.clone());

        let preset = self.check_targets(requirement.as_ref(), card, player, targets.as_deref())?;
        match (&mode_choice, &modes) {
            (Some(choice), Some(chosen)) if !choice.is_valid_selection(chosen) => {
                return Err(RulesError::illegal(format!("invalid modes for {}", card)));
            }
            (None, Some(chosen)) if !chosen.is_empty() => {
                return Err(RulesError::illegal(format!("{} has no modes", card)));
            }
            _ => {}
        }

        let id = self.priority.next_pending_id();
        let mut pending = Self::with_requirement(
            PendingAction::new(id, player, PendingKind::PlayCard { card, from_graveyard }),
            requirement,
            preset,
        );
        match (mode_choice, modes) {
            (Some(choice), Some(chosen)) => {
                pending.mode_choice = Some(choice);
                pending.modes = chosen;
            }
            (Some(choice), None) => pending = pending.needing_modes(choice),
            (None, _) => {}
        }
        if self.state.card(card).is_some_and(|c| c.template.cost.has_x) {
            pending = pending.needing_x();
        }
        self.advance_pending(pending)
    }

    // === Activate ===

    /// Check an activated ability and return it.
    fn check_activate(&self, player: PlayerId, source: CardId, index: usize) -> RulesResult<ActivatedAbility> {
        let card = self.state.get_card(source)?;
        if !matches!(card.zone, Zone::Field | Zone::RulerArea) || card.controller != player {
            return Err(RulesError::illegal(format!("{} does not control {}", player, source)));
        }
        let ability = self
            .scripts
            .script(card.code())
            .and_then(|script| script.activated.get(index))
            .cloned()
            .ok_or_else(|| RulesError::illegal(format!("{} has no ability {}", source, index)))?;
        if ability.rest_cost && card.is_rested {
            return Err(RulesError::insufficient(format!("{} is rested", source)));
        }
        if !self.state.players[player].will_pool.can_pay(&ability.cost) {
            return Err(RulesError::insufficient(format!("cannot pay for {}", ability.name)));
        }
        Ok(ability)
    }

    fn activate_ability(
        &mut self,
        player: PlayerId,
        source: CardId,
        ability_index: usize,
        targets: Option<TargetList>,
    ) -> RulesResult<ActionOutcome> {
        let ability = self.check_activate(player, source, ability_index)?;
        let preset = self.check_targets(ability.targets.as_ref(), source, player, targets.as_deref())?;
        let id = self.priority.next_pending_id();
        let mut pending = Self::with_requirement(
            PendingAction::new(id, player, PendingKind::ActivateAbility { source, ability_index }),
            ability.targets,
            preset,
        );
        if ability.cost.has_x {
            pending = pending.needing_x();
        }
        self.advance_pending(pending)
    }

    // === Will ===

    /// Colours `card` can produce.
    #[must_use]
    pub fn will_colors(&self, card: CardId) -> Vec<Attribute> {
        let Some(instance) = self.state.card(card) else {
            return Vec::new();
        };
        if let Some(script) = self.scripts.script(instance.code()) {
            if !script.will_colors.is_empty() {
                return script.will_colors.clone();
            }
        }
        if instance.card_type.is_stone() {
            let colors: Vec<Attribute> = instance.attributes.iter().collect();
            return if colors.is_empty() { vec![Attribute::Void] } else { colors };
        }
        Vec::new()
    }

    fn check_produce(&self, player: PlayerId, source: CardId) -> RulesResult<Vec<Attribute>> {
        let card = self.state.get_card(source)?;
        if card.zone != Zone::Field || card.controller != player {
            return Err(RulesError::illegal(format!("{} does not control {}", player, source)));
        }
        let colors = self.will_colors(source);
        if colors.is_empty() {
            return Err(RulesError::illegal(format!("{} produces no will", source)));
        }
        if card.is_rested {
            return Err(RulesError::insufficient(format!("{} is rested", source)));
        }
        Ok(colors)
    }

    fn produce_will(
        &mut self,
        player: PlayerId,
        source: CardId,
        color: Option<Attribute>,
    ) -> RulesResult<ActionOutcome> {
        let colors = self.check_produce(player, source)?;
        if let Some(color) = color {
            if !colors.contains(&color) {
                return Err(RulesError::illegal(format!("{} cannot produce {:?}", source, color)));
            }
        }
        let id = self.priority.next_pending_id();
        let mut pending = PendingAction::new(id, player, PendingKind::ProduceWill { source });
        if color.is_some() {
            pending.color = color;
        } else if colors.len() == 1 {
            pending.color = colors.first().copied();
        } else {
            pending = pending.needing_will_color(colors);
        }
        self.advance_pending(pending)
    }

    // === Pending pipeline ===

    /// Ask for the next missing input, or finalize.
    fn advance_pending(&mut self, mut pending: PendingAction) -> RulesResult<ActionOutcome> {
        let scripts = Arc::clone(&self.scripts);
        loop {
            match pending.next_need() {
                Some(PendingNeed::Modes) | Some(PendingNeed::XValue) | Some(PendingNeed::WillColor) => {
                    pending.request = Some(self.state.next_request_id());
                    return Ok(self.suspend_pending(pending));
                }
                Some(PendingNeed::Targets) => {
                    let Some(requirement) = pending.requirement.clone() else {
                        pending.needs_targets = false;
                        continue;
                    };
                    match self.targeting.request_targets(
                        &requirement,
                        pending.source(),
                        pending.player,
                        &mut self.state,
                        scripts.as_ref(),
                        true,
                    ) {
                        TargetOutcome::Selected(targets) => {
                            pending.targets = targets;
                            pending.needs_targets = false;
                        }
                        TargetOutcome::Failed => {
                            return Err(RulesError::NoValidTargets { card: pending.source() });
                        }
                        TargetOutcome::Suspended(request) => {
                            pending.request = Some(request);
                            return Ok(self.suspend_pending(pending));
                        }
                    }
                }
                None => return self.finalize(pending),
            }
        }
    }

    fn suspend_pending(&mut self, pending: PendingAction) -> ActionOutcome {
        let request = self.decision_for_pending(&pending);
        self.priority.begin_input(pending);
        match request {
            Some(request) => ActionOutcome::Suspended(request),
            None => ActionOutcome::Done,
        }
    }

    /// The request a pending action is waiting on.
    pub(crate) fn decision_for_pending(&self, pending: &PendingAction) -> Option<DecisionRequest> {
        let id = pending.request?;
        let source = pending.source();
        match pending.next_need()? {
            PendingNeed::Modes => {
                let choice = pending.mode_choice.as_ref()?;
                Some(DecisionRequest::SelectModes {
                    id,
                    player: pending.player,
                    source,
                    labels: choice.modes.iter().map(|m| m.label.clone()).collect(),
                    choose: choice.choose,
                })
            }
            PendingNeed::XValue => Some(DecisionRequest::ChooseX {
                id,
                player: pending.player,
                source,
                max: self.max_x(pending),
            }),
            PendingNeed::Targets => self.target_decision().filter(|r| r.id() == id),
            PendingNeed::WillColor => Some(DecisionRequest::SelectWillColor {
                id,
                player: pending.player,
                source,
                colors: pending.will_colors.clone(),
            }),
        }
    }

    /// Will cost of the action a pending action builds.
    fn pending_cost(&self, pending: &PendingAction) -> Option<WillCost> {
        match pending.kind {
            PendingKind::PlayCard { card, .. } => self.state.card(card).map(|c| c.template.cost),
            PendingKind::ActivateAbility { source, ability_index } => {
                let card = self.state.card(source)?;
                let script = self.scripts.script(card.code())?;
                script.activated.get(ability_index).map(|ability| ability.cost)
            }
            PendingKind::ProduceWill { .. } => None,
        }
    }

    /// Largest X the player can pay for a pending action.
    fn max_x(&self, pending: &PendingAction) -> u32 {
        self.pending_cost(pending)
            .map_or(0, |cost| self.state.players[pending.player].will_pool.max_x(&cost))
    }

    /// Supply a missing input to the pending action.
    pub fn provide_input(&mut self, id: PendingId, input: PendingInput) -> RulesResult<ActionOutcome> {
        self.ensure_running()?;
        let pending = self
            .priority
            .pending()
            .ok_or_else(|| RulesError::illegal("no pending action"))?;
        if pending.id != id {
            return Err(RulesError::illegal(format!("{} is not the pending action", id)));
        }
        if pending.next_need() != Some(input.need()) {
            return Err(RulesError::illegal(format!("{} is not waiting for {:?}", id, input.need())));
        }

        let mut filled_targets = None;
        match &input {
            PendingInput::Modes(modes) => {
                let valid = pending
                    .mode_choice
                    .as_ref()
                    .is_some_and(|choice| choice.is_valid_selection(modes));
                if !valid {
                    return Err(RulesError::illegal("invalid mode selection"));
                }
            }
            PendingInput::XValue(x) => {
                if *x > self.max_x(pending) {
                    return Err(RulesError::insufficient(format!("cannot pay X={}", x)));
                }
            }
            PendingInput::WillColor(color) => {
                if !pending.will_colors.contains(color) {
                    return Err(RulesError::illegal(format!("{:?} is not on offer", color)));
                }
            }
            PendingInput::Targets(targets) => {
                let request = pending.request.ok_or_else(|| RulesError::illegal("no target request"))?;
                filled_targets = Some(self.targeting.submit_selection(request, targets)?);
            }
        }

        let mut pending = self
            .priority
            .take_pending()
            .ok_or_else(|| RulesError::illegal("no pending action"))?;
        pending.request = None;
        match input {
            PendingInput::Modes(modes) => {
                pending.modes = modes.into_iter().collect();
                pending.needs_modes = false;
            }
            PendingInput::XValue(x) => {
                pending.x = x;
                pending.needs_x = false;
            }
            PendingInput::WillColor(color) => {
                pending.color = Some(color);
                pending.needs_will_color = false;
            }
            PendingInput::Targets(_) => {
                pending.targets = filled_targets.unwrap_or_default();
                pending.needs_targets = false;
            }
        }
        let outcome = self.advance_pending(pending)?;
        Ok(self.finish(outcome))
    }

    /// Drop the pending action. Nothing was paid, so nothing is undone.
    pub fn cancel_pending_action(&mut self) -> RulesResult<()> {
        let pending = self
            .priority
            .take_pending()
            .ok_or_else(|| RulesError::illegal("no pending action"))?;
        if let Some(request) = pending.request {
            if self.targeting.pending().is_some_and(|r| r.id == request) {
                self.targeting.clear();
            }
        }
        debug!(pending = %pending.id, player = %pending.player, "pending action cancelled");
        Ok(())
    }

    /// Carry out a complete pending action.
    fn finalize(&mut self, pending: PendingAction) -> RulesResult<ActionOutcome> {
        let player = pending.player;
        match pending.kind {
            PendingKind::PlayCard { card, .. } => {
                let from_graveyard = self.check_play(player, card)?;
                let instance = self.state.get_card(card)?;
                let cost = instance.template.cost;
                let scripts = Arc::clone(&self.scripts);
                let script = scripts.script(instance.code());
                let mut ops = script.map(|s| s.on_resolve.clone()).unwrap_or_default();
                if let Some(choice) = script.and_then(|s| s.modes.as_ref()) {
                    ops.extend(choice.ops_for(&pending.modes));
                }

                self.state.players[player].will_pool.pay_with_x(&cost, pending.x)?;
                self.state.move_card(card, Zone::Chase)?;
                let mut item = ChaseItem::spell(card, player, ops).with_targets(pending.targets, pending.requirement);
                if from_graveyard {
                    item = item.from_graveyard();
                }
                let id = self.chase.push(item);
                self.state
                    .emit(GameEvent::new(TriggerEvent::SpellCast).with_card(card).with_player(player));
                self.record(player, ActionType::PlayCard, Some(card));
                self.priority.after_action(player);
                self.settle();
                Ok(ActionOutcome::Pushed(id))
            }
            PendingKind::ActivateAbility { source, ability_index } => {
                let ability = self.check_activate(player, source, ability_index)?;
                self.state.players[player].will_pool.pay_with_x(&ability.cost, pending.x)?;
                if ability.rest_cost {
                    self.rest(source, player);
                }
                let id = self.chase.push(
                    ChaseItem::ability(source, player, ability.ops).with_targets(pending.targets, ability.targets),
                );
                self.state.emit(
                    GameEvent::new(TriggerEvent::AbilityActivated)
                        .with_card(source)
                        .with_player(player)
                        .with_amount(ability_index as i32),
                );
                self.record(player, ActionType::ActivateAbility, Some(source));
                self.priority.after_action(player);
                self.settle();
                Ok(ActionOutcome::Pushed(id))
            }
            PendingKind::ProduceWill { source } => {
                let colors = self.check_produce(player, source)?;
                let color = pending
                    .color
                    .filter(|c| colors.contains(c))
                    .ok_or_else(|| RulesError::illegal("no will colour chosen"))?;
                self.rest(source, player);
                self.state.players[player].will_pool.add(color, 1);
                self.state.emit(
                    GameEvent::new(TriggerEvent::WillProduced)
                        .with_card(source)
                        .with_player(player)
                        .with_amount(1),
                );
                debug!(%player, %source, ?color, "will produced");
                self.record(player, ActionType::ProduceWill, Some(source));
                self.settle();
                Ok(ActionOutcome::Done)
            }
        }
    }

    fn rest(&mut self, card: CardId, player: PlayerId) {
        if let Some(instance) = self.state.card_mut(card) {
            instance.is_rested = true;
        }
        self.state
            .emit(GameEvent::new(TriggerEvent::Rested).with_card(card).with_player(player));
    }

    // === Ruler ===

    /// Returns the ruler and the stone to call.
    fn check_call_stone(&self, player: PlayerId) -> RulesResult<(CardId, CardId)> {
        let state = &self.state.players[player];
        if state.has_called_stone {
            return Err(RulesError::illegal("a stone was already called this turn"));
        }
        let ruler = state.ruler.ok_or_else(|| RulesError::illegal("no ruler"))?;
        let card = self.state.get_card(ruler)?;
        if card.zone != Zone::RulerArea {
            return Err(RulesError::illegal("the ruler is not in the ruler area"));
        }
        if card.is_rested {
            return Err(RulesError::insufficient("the ruler is rested"));
        }
        let stone = state
            .top_of(Zone::StoneDeck)
            .ok_or_else(|| RulesError::insufficient("the stone deck is empty"))?;
        Ok((ruler, stone))
    }

    fn call_stone(&mut self, player: PlayerId) -> RulesResult<ActionOutcome> {
        let (ruler, stone) = self.check_call_stone(player)?;
        self.rest(ruler, player);
        self.state.move_card(stone, Zone::Field)?;
        self.state.players[player].has_called_stone = true;
        self.state
            .emit(GameEvent::new(TriggerEvent::StoneCalled).with_card(stone).with_player(player));
        debug!(%player, %stone, "stone called");
        self.record(player, ActionType::CallStone, Some(stone));
        self.settle();
        Ok(ActionOutcome::Done)
    }

    /// Returns the ruler and the Judgment cost.
    fn check_judgment(&self, player: PlayerId) -> RulesResult<(CardId, WillCost)> {
        let state = &self.state.players[player];
        if state.has_performed_judgment {
            return Err(RulesError::illegal("Judgment was already performed"));
        }
        let ruler = state.ruler.ok_or_else(|| RulesError::illegal("no ruler"))?;
        let card = self.state.get_card(ruler)?;
        if card.zone != Zone::RulerArea || card.template.j_ruler.is_none() {
            return Err(RulesError::illegal("the ruler cannot perform Judgment"));
        }
        let cost = card
            .template
            .judgment_cost
            .ok_or_else(|| RulesError::illegal("the ruler has no Judgment cost"))?;
        if !state.will_pool.can_pay(&cost) {
            return Err(RulesError::insufficient("cannot pay for Judgment"));
        }
        Ok((ruler, cost))
    }

    fn judgment(&mut self, player: PlayerId) -> RulesResult<ActionOutcome> {
        let (ruler, cost) = self.check_judgment(player)?;
        self.state.players[player].will_pool.pay(&cost)?;
        self.state.players[player].has_performed_judgment = true;
        let id = self.chase.push(ChaseItem::new(
            ruler,
            player,
            ChaseItemKind::Judgment,
            ChasePayload::Judgment,
        ));
        self.state
            .emit(GameEvent::new(TriggerEvent::Judgment).with_card(ruler).with_player(player));
        self.record(player, ActionType::Judgment, Some(ruler));
        self.priority.after_action(player);
        self.settle();
        Ok(ActionOutcome::Pushed(id))
    }

    // === Battle ===

    fn check_attack(&self, player: PlayerId) -> RulesResult<()> {
        let declaring = self.combat.state().is_some_and(|c| {
            c.step == CombatStep::DeclareAttackers && c.request.is_some() && c.active_player == player
        });
        if !declaring {
            return Err(RulesError::illegal("not declaring attackers"));
        }
        Ok(())
    }

    fn check_block(&self, player: PlayerId) -> RulesResult<()> {
        let declaring = self.combat.awaiting_blockers()
            && self.combat.state().is_some_and(|c| c.defending_player == player);
        if !declaring {
            return Err(RulesError::illegal("not declaring blockers"));
        }
        Ok(())
    }

    fn attack(&mut self, player: PlayerId, declarations: &[AttackDeclaration]) -> RulesResult<ActionOutcome> {
        self.check_attack(player)?;
        let progress = self.combat.declare_attackers(declarations, &mut self.state)?;
        self.record(player, ActionType::Attack, declarations.first().map(|d| d.attacker));
        self.settle();
        Ok(self.continue_battle(progress))
    }

    fn block(&mut self, player: PlayerId, blocks: &[BlockDeclaration]) -> RulesResult<ActionOutcome> {
        self.check_block(player)?;
        let progress = self.combat.declare_blockers(blocks, &mut self.state)?;
        self.record(player, ActionType::Block, blocks.first().map(|b| b.blocker));
        self.settle();
        Ok(self.continue_battle(progress))
    }
}
