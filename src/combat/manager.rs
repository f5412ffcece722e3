//! The battle sub-machine.
//!
//! [`CombatManager`] owns the [`CombatState`] while a battle is running and
//! moves it through `Beginning → DeclareAttackers → DeclareBlockers →
//! [FirstStrikeDamage] → [Damage] → End`. It does not own priority or the
//! continuous pass: [`Game`](crate::rules::Game) drives the damage steps and
//! settles state between them.
//!
//! Damage inside one step is simultaneous. Every hit of a step is planned
//! from the state at the start of the step and then applied, so a blocker
//! destroyed in the normal step still strikes back, and Pierce is measured
//! against the blocker's DEF before any damage of that step is marked.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use super::state::{
    Attack, AttackDeclaration, AttackTarget, BlockDeclaration, CombatState, CombatStep,
};
use crate::core::{CardId, Match, PlayerId, RequestId, RulesError, RulesResult, Zone};
use crate::effects::{deal_damage, destroy_card};
use crate::keywords::{DamageStep, EternalReturn, KeywordProcessor};
use crate::triggers::{GameEvent, TriggerEvent};

/// Where a battle stands after a call into the manager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatProgress {
    /// Waiting for the attacking player's declaration.
    AwaitingAttackers {
        request: RequestId,
        legal: Vec<CardId>,
    },
    /// Waiting for the defending player's blocks.
    AwaitingBlockers {
        request: RequestId,
        legal: Vec<CardId>,
    },
    /// Declarations are done; the damage steps can run.
    ReadyForDamage,
    /// The battle is over.
    Ended,
}

/// One planned piece of battle damage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Hit {
    source: CardId,
    target: AttackTarget,
    amount: i32,
    /// Pierce excess. It reaches the player but does not drain.
    pierce: bool,
}

/// What a damage step did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DamageReport {
    /// Number of hits applied.
    pub hits: usize,
    /// Cards that Explode destroys at the destruction check.
    pub exploded: Vec<CardId>,
}

/// Runs battles.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CombatManager {
    state: Option<CombatState>,
}

impl CombatManager {
    /// Create a manager with no battle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The battle in progress.
    #[must_use]
    pub fn state(&self) -> Option<&CombatState> {
        self.state.as_ref()
    }

    /// Check whether a battle is in progress.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// Current step, if a battle is in progress.
    #[must_use]
    pub fn step(&self) -> Option<CombatStep> {
        self.state.as_ref().map(|s| s.step)
    }

    /// The outstanding declaration request.
    #[must_use]
    pub fn pending_request(&self) -> Option<RequestId> {
        self.state.as_ref().and_then(|s| s.request)
    }

    /// Check whether the defending player owes a block declaration.
    #[must_use]
    pub fn awaiting_blockers(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|s| s.step == CombatStep::DeclareBlockers && s.request.is_some())
    }

    // === Legality ===

    /// Cards `player` may attack with, ascending by id.
    #[must_use]
    pub fn legal_attackers(player: PlayerId, state: &Match) -> Vec<CardId> {
        let mut legal: Vec<CardId> = state
            .field_of(player)
            .into_iter()
            .filter(|id| {
                state
                    .card(*id)
                    .is_some_and(|card| KeywordProcessor::can_attack(card, state.turn_number))
            })
            .collect();
        legal.sort_unstable();
        legal
    }

    /// Cards `defender` may block with: recovered combatants able to block
    /// at least one declared attacker.
    #[must_use]
    pub fn legal_blockers(&self, state: &Match) -> Vec<CardId> {
        let Some(combat) = &self.state else {
            return Vec::new();
        };
        let mut legal: Vec<CardId> = state
            .field_of(combat.defending_player)
            .into_iter()
            .filter(|id| {
                let Some(blocker) = state.card(*id) else { return false };
                combat.attacks.iter().any(|attack| {
                    state
                        .card(attack.attacker)
                        .is_some_and(|attacker| KeywordProcessor::can_block(blocker, attacker))
                })
            })
            .collect();
        legal.sort_unstable();
        legal
    }

    // === Declarations ===

    /// Start a battle for `active`.
    ///
    /// With no legal attackers the battle ends at once.
    pub fn begin_battle_phase(&mut self, active: PlayerId, state: &mut Match) -> CombatProgress {
        let mut combat = CombatState::new(active);
        let legal = Self::legal_attackers(active, state);
        debug!(player = %active, attackers = legal.len(), "battle begins");

        if legal.is_empty() {
            self.state = Some(combat);
            self.end_battle_phase(state);
            return CombatProgress::Ended;
        }

        let request = state.next_request_id();
        combat.step = CombatStep::DeclareAttackers;
        combat.request = Some(request);
        combat.legal = legal.clone();
        self.state = Some(combat);
        CombatProgress::AwaitingAttackers { request, legal }
    }

    /// The unattended declaration: every legal attacker attacks the
    /// defending player.
    #[must_use]
    pub fn default_attacks(&self) -> Vec<AttackDeclaration> {
        self.state
            .as_ref()
            .filter(|s| s.step == CombatStep::DeclareAttackers)
            .map(|s| {
                s.legal
                    .iter()
                    .map(|id| AttackDeclaration::player(*id, s.defending_player))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Declare attackers.
    ///
    /// The whole declaration is rejected if any entry is illegal. Accepted
    /// attackers are rested and fire `AttackDeclared`. Declaring nothing ends
    /// the battle.
    pub fn declare_attackers(
        &mut self,
        declarations: &[AttackDeclaration],
        state: &mut Match,
    ) -> RulesResult<CombatProgress> {
        let combat = self
            .state
            .as_ref()
            .filter(|s| s.step == CombatStep::DeclareAttackers)
            .ok_or_else(|| RulesError::illegal("not declaring attackers"))?;
        Self::validate_attacks(combat, declarations, state)?;

        let active = combat.active_player;
        if declarations.is_empty() {
            debug!(player = %active, "no attack declared");
            self.end_battle_phase(state);
            return Ok(CombatProgress::Ended);
        }

        let mut attacks = Vec::with_capacity(declarations.len());
        for declaration in declarations {
            if let Some(card) = state.card_mut(declaration.attacker) {
                card.is_rested = true;
            }
            state.emit(
                GameEvent::new(TriggerEvent::Rested)
                    .with_card(declaration.attacker)
                    .with_player(active),
            );
            let mut event = GameEvent::new(TriggerEvent::AttackDeclared)
                .with_card(declaration.attacker)
                .with_player(active);
            if let AttackTarget::Card(target) = declaration.target {
                event = event.with_other(target);
            }
            state.emit(event);
            debug!(attacker = %declaration.attacker, target = ?declaration.target, "attack declared");
            attacks.push(Attack {
                attacker: declaration.attacker,
                target: declaration.target,
                blocker: None,
            });
        }

        if let Some(combat) = self.state.as_mut() {
            combat.attacks = attacks;
            combat.step = CombatStep::DeclareBlockers;
            combat.request = None;
            combat.legal.clear();
        }

        let legal = self.legal_blockers(state);
        if legal.is_empty() {
            return Ok(CombatProgress::ReadyForDamage);
        }
        let request = state.next_request_id();
        if let Some(combat) = self.state.as_mut() {
            combat.request = Some(request);
            combat.legal = legal.clone();
        }
        Ok(CombatProgress::AwaitingBlockers { request, legal })
    }

    fn validate_attacks(
        combat: &CombatState,
        declarations: &[AttackDeclaration],
        state: &Match,
    ) -> RulesResult<()> {
        let legal = Self::legal_attackers(combat.active_player, state);
        let mut seen: SmallVec<[CardId; 8]> = SmallVec::new();
        for declaration in declarations {
            if !legal.contains(&declaration.attacker) {
                return Err(RulesError::illegal(format!(
                    "{} cannot attack",
                    declaration.attacker
                )));
            }
            if seen.contains(&declaration.attacker) {
                return Err(RulesError::illegal(format!(
                    "{} declared twice",
                    declaration.attacker
                )));
            }
            seen.push(declaration.attacker);

            match declaration.target {
                AttackTarget::Player(player) if player == combat.defending_player => {}
                AttackTarget::Player(player) => {
                    return Err(RulesError::illegal(format!("cannot attack {}", player)));
                }
                AttackTarget::Card(target) => {
                    let attacker = state.get_card(declaration.attacker)?;
                    let victim = state.get_card(target)?;
                    if victim.controller != combat.defending_player
                        || !KeywordProcessor::can_attack_card(attacker, victim)
                    {
                        return Err(RulesError::illegal(format!(
                            "{} cannot attack {}",
                            declaration.attacker, target
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Declare blockers.
    ///
    /// Each blocker must be a legal blocker for the attack it names, and an
    /// attack takes at most one blocker. Accepted blocks fire
    /// `BlockerDeclared`.
    pub fn declare_blockers(
        &mut self,
        blocks: &[BlockDeclaration],
        state: &mut Match,
    ) -> RulesResult<CombatProgress> {
        let combat = self
            .state
            .as_ref()
            .filter(|s| s.step == CombatStep::DeclareBlockers)
            .ok_or_else(|| RulesError::illegal("not declaring blockers"))?;

        let mut blocked: SmallVec<[usize; 8]> = SmallVec::new();
        let mut blockers: SmallVec<[CardId; 8]> = SmallVec::new();
        for block in blocks {
            let attack = combat.attacks.get(block.attack_index).ok_or_else(|| {
                RulesError::illegal(format!("no attack at index {}", block.attack_index))
            })?;
            let blocker = state.get_card(block.blocker)?;
            let attacker = state.get_card(attack.attacker)?;
            if blocker.controller != combat.defending_player
                || !KeywordProcessor::can_block(blocker, attacker)
            {
                return Err(RulesError::illegal(format!(
                    "{} cannot block {}",
                    block.blocker, attack.attacker
                )));
            }
            if blocked.contains(&block.attack_index) || blockers.contains(&block.blocker) {
                return Err(RulesError::illegal("each attack and blocker is used once"));
            }
            blocked.push(block.attack_index);
            blockers.push(block.blocker);
        }

        let defender = combat.defending_player;
        if let Some(combat) = self.state.as_mut() {
            for block in blocks {
                let attack = &mut combat.attacks[block.attack_index];
                attack.blocker = Some(block.blocker);
                state.emit(
                    GameEvent::new(TriggerEvent::BlockerDeclared)
                        .with_card(block.blocker)
                        .with_other(attack.attacker)
                        .with_player(defender),
                );
                debug!(blocker = %block.blocker, attacker = %attack.attacker, "blocker declared");
            }
            combat.request = None;
            combat.legal.clear();
        }
        Ok(CombatProgress::ReadyForDamage)
    }

    // === Damage ===

    fn plan(&self, step: DamageStep, state: &Match) -> Vec<Hit> {
        let Some(combat) = &self.state else {
            return Vec::new();
        };
        let on_field = |id: CardId| state.card(id).filter(|c| c.zone == Zone::Field);

        let mut hits = Vec::new();
        for attack in &combat.attacks {
            let Some(attacker) = on_field(attack.attacker) else { continue };
            let opposing = attack.opponent_card().and_then(on_field);

            if KeywordProcessor::damage_order(attacker) == step && attacker.current_atk > 0 {
                let amount = attacker.current_atk;
                match (attack.blocker, attack.target) {
                    (Some(_), _) => {
                        // A blocked attacker whose blocker left deals no damage.
                        if let Some(blocker) = opposing {
                            hits.push(Hit {
                                source: attacker.uid,
                                target: AttackTarget::Card(blocker.uid),
                                amount,
                                pierce: false,
                            });
                            let pierce = KeywordProcessor::pierce_damage(attacker, amount, blocker);
                            if pierce > 0 {
                                hits.push(Hit {
                                    source: attacker.uid,
                                    target: AttackTarget::Player(combat.defending_player),
                                    amount: pierce,
                                    pierce: true,
                                });
                            }
                        }
                    }
                    (None, AttackTarget::Card(_)) => {
                        if let Some(victim) = opposing {
                            hits.push(Hit {
                                source: attacker.uid,
                                target: AttackTarget::Card(victim.uid),
                                amount,
                                pierce: false,
                            });
                        }
                    }
                    (None, AttackTarget::Player(player)) => hits.push(Hit {
                        source: attacker.uid,
                        target: AttackTarget::Player(player),
                        amount,
                        pierce: false,
                    }),
                }
            }

            if let Some(defender) = opposing {
                if KeywordProcessor::damage_order(defender) == step && defender.current_atk > 0 {
                    hits.push(Hit {
                        source: defender.uid,
                        target: AttackTarget::Card(attacker.uid),
                        amount: defender.current_atk,
                        pierce: false,
                    });
                }
            }
        }
        hits
    }

    /// Check whether any combatant deals damage in `step`.
    #[must_use]
    pub fn has_damage_in(&self, step: DamageStep, state: &Match) -> bool {
        !self.plan(step, state).is_empty()
    }

    /// Run one damage step.
    ///
    /// Marks damage on cards, lowers life, and applies Drain. Destruction is
    /// left to [`destruction_check`](Self::destruction_check).
    pub fn run_damage_step(&mut self, step: DamageStep, state: &mut Match) -> DamageReport {
        let hits = self.plan(step, state);
        if let Some(combat) = self.state.as_mut() {
            combat.step = match step {
                DamageStep::FirstStrike => CombatStep::FirstStrikeDamage,
                DamageStep::Normal => CombatStep::Damage,
            };
        }
        debug!(?step, hits = hits.len(), "damage step");

        let mut report = DamageReport {
            hits: hits.len(),
            exploded: Vec::new(),
        };
        for hit in hits {
            let Some(source) = state.card(hit.source) else { continue };
            let explodes = KeywordProcessor::explodes(source);
            let controller = source.controller;

            let dealt = match hit.target {
                AttackTarget::Card(target) => {
                    let dealt = deal_damage(state, hit.source, target, hit.amount);
                    if explodes {
                        for card in [hit.source, target] {
                            if !report.exploded.contains(&card) {
                                report.exploded.push(card);
                            }
                        }
                    }
                    dealt
                }
                AttackTarget::Player(player) => state.damage_player(player, hit.amount, Some(hit.source)),
            };
            if !hit.pierce {
                let drain = state
                    .card(hit.source)
                    .map_or(0, |source| KeywordProcessor::drain_amount(source, dealt));
                state.gain_life(controller, drain);
            }
        }
        report
    }

    /// Destroy every combatant of this battle whose remaining DEF is at or
    /// below zero, plus the cards `exploded` names. Imperishable cards stay.
    ///
    /// Returns the Eternal follow-ups of the destroyed cards.
    pub fn destruction_check(&self, exploded: &[CardId], state: &mut Match) -> Vec<EternalReturn> {
        let Some(combat) = &self.state else {
            return Vec::new();
        };
        let mut candidates: Vec<CardId> = Vec::new();
        for attack in &combat.attacks {
            for id in [Some(attack.attacker), attack.opponent_card()].into_iter().flatten() {
                if !candidates.contains(&id) {
                    candidates.push(id);
                }
            }
        }

        let mut follow_ups = Vec::new();
        for id in candidates {
            let Some(card) = state.card(id) else { continue };
            let dying = card.remaining_def() <= 0 || exploded.contains(&id);
            if card.zone != Zone::Field || !dying || !KeywordProcessor::can_be_destroyed(card) {
                continue;
            }
            if let Ok(Some(follow_up)) = destroy_card(state, id) {
                follow_ups.push(follow_up);
            }
        }
        follow_ups
    }

    /// End the battle: fire `CombatEnd` and drop the combat state.
    pub fn end_battle_phase(&mut self, state: &mut Match) {
        if let Some(combat) = self.state.take() {
            debug!(player = %combat.active_player, attacks = combat.attacks.len(), "battle ends");
            state.emit(GameEvent::new(TriggerEvent::CombatEnd).with_player(combat.active_player));
        }
    }

    /// Drop the battle without firing events. Used when the game ends.
    pub fn clear(&mut self) {
        self.state = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardTemplate;
    use crate::keywords::Keyword;

    fn resonator(state: &mut Match, owner: u8, atk: i32, def: i32, keywords: &[Keyword]) -> CardId {
        let mut template = CardTemplate::resonator("R", "Resonator", atk, def);
        for k in keywords {
            template = template.with_keyword(*k);
        }
        state.create_card(PlayerId(owner), template, Zone::Field)
    }

    fn setup() -> Match {
        let mut state = Match::new(4000);
        state.turn_number = 3;
        state
    }

    fn run_all(combat: &mut CombatManager, state: &mut Match) {
        for step in [DamageStep::FirstStrike, DamageStep::Normal] {
            if combat.has_damage_in(step, state) {
                let report = combat.run_damage_step(step, state);
                combat.destruction_check(&report.exploded, state);
            }
        }
        combat.end_battle_phase(state);
    }

    fn events(state: &mut Match) -> Vec<TriggerEvent> {
        state.drain_events().into_iter().map(|e| e.kind).collect()
    }

    // === Declarations ===

    #[test]
    fn test_no_attackers_ends_battle() {
        let mut state = setup();
        let mut combat = CombatManager::new();
        assert_eq!(combat.begin_battle_phase(PlayerId(0), &mut state), CombatProgress::Ended);
        assert!(!combat.is_active());
        assert_eq!(events(&mut state), vec![TriggerEvent::CombatEnd]);
    }

    #[test]
    fn test_summoning_sick_cannot_attack() {
        let mut state = setup();
        let old = resonator(&mut state, 0, 100, 100, &[]);
        let fresh = resonator(&mut state, 0, 100, 100, &[]);
        let swift = resonator(&mut state, 0, 100, 100, &[Keyword::Swiftness]);
        state.card_mut(old).unwrap().entered_turn = Some(1);
        state.card_mut(fresh).unwrap().entered_turn = Some(3);
        state.card_mut(swift).unwrap().entered_turn = Some(3);

        assert_eq!(CombatManager::legal_attackers(PlayerId(0), &state), vec![old, swift]);
    }

    #[test]
    fn test_declare_rests_attackers() {
        let mut state = setup();
        let attacker = resonator(&mut state, 0, 300, 300, &[]);
        let mut combat = CombatManager::new();
        assert!(matches!(
            combat.begin_battle_phase(PlayerId(0), &mut state),
            CombatProgress::AwaitingAttackers { .. }
        ));
        let defaults = combat.default_attacks();
        assert_eq!(defaults, vec![AttackDeclaration::player(attacker, PlayerId(1))]);

        let progress = combat.declare_attackers(&defaults, &mut state).unwrap();
        assert_eq!(progress, CombatProgress::ReadyForDamage);
        assert!(state.card(attacker).unwrap().is_rested);
        assert!(events(&mut state).contains(&TriggerEvent::AttackDeclared));
    }

    #[test]
    fn test_invalid_declaration_rejected_whole() {
        let mut state = setup();
        let a = resonator(&mut state, 0, 300, 300, &[]);
        let b = resonator(&mut state, 0, 300, 300, &[]);
        let victim = resonator(&mut state, 1, 100, 100, &[]);
        let mut combat = CombatManager::new();
        combat.begin_battle_phase(PlayerId(0), &mut state);

        // `b` has no Precision, so it cannot attack a card.
        let err = combat
            .declare_attackers(
                &[AttackDeclaration::player(a, PlayerId(1)), AttackDeclaration::card(b, victim)],
                &mut state,
            )
            .unwrap_err();
        assert!(matches!(err, RulesError::IllegalAction { .. }));
        assert!(!state.card(a).unwrap().is_rested);
        assert_eq!(combat.step(), Some(CombatStep::DeclareAttackers));
    }

    #[test]
    fn test_empty_declaration_ends_battle() {
        let mut state = setup();
        resonator(&mut state, 0, 300, 300, &[]);
        let mut combat = CombatManager::new();
        combat.begin_battle_phase(PlayerId(0), &mut state);
        assert_eq!(combat.declare_attackers(&[], &mut state).unwrap(), CombatProgress::Ended);
        assert!(!combat.is_active());
    }

    #[test]
    fn test_flying_and_stealth_limit_blockers() {
        let mut state = setup();
        let flyer = resonator(&mut state, 0, 300, 300, &[Keyword::Flying]);
        let ground = resonator(&mut state, 1, 100, 100, &[]);
        let wings = resonator(&mut state, 1, 100, 100, &[Keyword::Flying]);
        let mut combat = CombatManager::new();
        combat.begin_battle_phase(PlayerId(0), &mut state);
        let progress = combat
            .declare_attackers(&[AttackDeclaration::player(flyer, PlayerId(1))], &mut state)
            .unwrap();
        assert!(matches!(progress, CombatProgress::AwaitingBlockers { ref legal, .. } if legal == &vec![wings]));

        let err = combat
            .declare_blockers(&[BlockDeclaration { blocker: ground, attack_index: 0 }], &mut state)
            .unwrap_err();
        assert!(matches!(err, RulesError::IllegalAction { .. }));
        assert!(combat.awaiting_blockers());
    }

    // === Damage ===

    #[test]
    fn test_unblocked_attack_damages_player() {
        let mut state = setup();
        let attacker = resonator(&mut state, 0, 600, 300, &[]);
        let mut combat = CombatManager::new();
        combat.begin_battle_phase(PlayerId(0), &mut state);
        combat
            .declare_attackers(&[AttackDeclaration::player(attacker, PlayerId(1))], &mut state)
            .unwrap();
        run_all(&mut combat, &mut state);
        assert_eq!(state.players[PlayerId(1)].life, 3400);
        assert!(!combat.is_active());
    }

    #[test]
    fn test_drain_blocked() {
        let mut state = setup();
        let attacker = resonator(&mut state, 0, 500, 500, &[Keyword::Drain]);
        let blocker = resonator(&mut state, 1, 100, 400, &[]);
        let mut combat = CombatManager::new();
        combat.begin_battle_phase(PlayerId(0), &mut state);
        combat
            .declare_attackers(&[AttackDeclaration::player(attacker, PlayerId(1))], &mut state)
            .unwrap();
        combat
            .declare_blockers(&[BlockDeclaration { blocker, attack_index: 0 }], &mut state)
            .unwrap();
        run_all(&mut combat, &mut state);

        assert_eq!(state.card(blocker).unwrap().zone, Zone::Graveyard);
        assert_eq!(state.card(attacker).unwrap().damage, 100);
        assert_eq!(state.players[PlayerId(0)].life, 4500);
        assert_eq!(state.players[PlayerId(1)].life, 4000);
    }

    #[test]
    fn test_pierce_excess_goes_through() {
        let mut state = setup();
        let attacker = resonator(&mut state, 0, 700, 500, &[Keyword::Pierce]);
        let blocker = resonator(&mut state, 1, 0, 300, &[]);
        let mut combat = CombatManager::new();
        combat.begin_battle_phase(PlayerId(0), &mut state);
        combat
            .declare_attackers(&[AttackDeclaration::player(attacker, PlayerId(1))], &mut state)
            .unwrap();
        combat
            .declare_blockers(&[BlockDeclaration { blocker, attack_index: 0 }], &mut state)
            .unwrap();
        run_all(&mut combat, &mut state);

        assert_eq!(state.players[PlayerId(1)].life, 3600);
        assert_eq!(state.card(blocker).unwrap().zone, Zone::Graveyard);
    }

    #[test]
    fn test_first_strike_kills_before_strike_back() {
        let mut state = setup();
        let attacker = resonator(&mut state, 0, 500, 300, &[Keyword::FirstStrike]);
        let blocker = resonator(&mut state, 1, 800, 400, &[]);
        let mut combat = CombatManager::new();
        combat.begin_battle_phase(PlayerId(0), &mut state);
        combat
            .declare_attackers(&[AttackDeclaration::player(attacker, PlayerId(1))], &mut state)
            .unwrap();
        combat
            .declare_blockers(&[BlockDeclaration { blocker, attack_index: 0 }], &mut state)
            .unwrap();

        assert!(combat.has_damage_in(DamageStep::FirstStrike, &state));
        let report = combat.run_damage_step(DamageStep::FirstStrike, &mut state);
        combat.destruction_check(&report.exploded, &mut state);
        assert_eq!(state.card(blocker).unwrap().zone, Zone::Graveyard);
        assert!(!combat.has_damage_in(DamageStep::Normal, &state));
        assert_eq!(state.card(attacker).unwrap().damage, 0);
    }

    #[test]
    fn test_normal_step_is_simultaneous() {
        let mut state = setup();
        let attacker = resonator(&mut state, 0, 500, 300, &[]);
        let blocker = resonator(&mut state, 1, 300, 400, &[]);
        let mut combat = CombatManager::new();
        combat.begin_battle_phase(PlayerId(0), &mut state);
        combat
            .declare_attackers(&[AttackDeclaration::player(attacker, PlayerId(1))], &mut state)
            .unwrap();
        combat
            .declare_blockers(&[BlockDeclaration { blocker, attack_index: 0 }], &mut state)
            .unwrap();
        run_all(&mut combat, &mut state);

        assert_eq!(state.card(attacker).unwrap().zone, Zone::Graveyard);
        assert_eq!(state.card(blocker).unwrap().zone, Zone::Graveyard);
    }

    #[test]
    fn test_imperishable_survives() {
        let mut state = setup();
        let attacker = resonator(&mut state, 0, 500, 300, &[]);
        let blocker = resonator(&mut state, 1, 0, 100, &[Keyword::Imperishable]);
        let mut combat = CombatManager::new();
        combat.begin_battle_phase(PlayerId(0), &mut state);
        combat
            .declare_attackers(&[AttackDeclaration::player(attacker, PlayerId(1))], &mut state)
            .unwrap();
        combat
            .declare_blockers(&[BlockDeclaration { blocker, attack_index: 0 }], &mut state)
            .unwrap();
        run_all(&mut combat, &mut state);
        assert_eq!(state.card(blocker).unwrap().zone, Zone::Field);
    }

    #[test]
    fn test_precision_attack_on_card() {
        let mut state = setup();
        let attacker = resonator(&mut state, 0, 400, 500, &[Keyword::Precision]);
        let victim = resonator(&mut state, 1, 200, 300, &[]);
        let mut combat = CombatManager::new();
        combat.begin_battle_phase(PlayerId(0), &mut state);
        combat
            .declare_attackers(&[AttackDeclaration::card(attacker, victim)], &mut state)
            .unwrap();
        assert!(combat.awaiting_blockers());
        combat.declare_blockers(&[], &mut state).unwrap();
        run_all(&mut combat, &mut state);

        assert_eq!(state.card(victim).unwrap().zone, Zone::Graveyard);
        assert_eq!(state.card(attacker).unwrap().damage, 200);
        assert_eq!(state.players[PlayerId(1)].life, 4000);
    }

    #[test]
    fn test_explode_destroys_both() {
        let mut state = setup();
        let attacker = resonator(&mut state, 0, 100, 900, &[Keyword::Explode]);
        let blocker = resonator(&mut state, 1, 0, 900, &[]);
        let mut combat = CombatManager::new();
        combat.begin_battle_phase(PlayerId(0), &mut state);
        combat
            .declare_attackers(&[AttackDeclaration::player(attacker, PlayerId(1))], &mut state)
            .unwrap();
        combat
            .declare_blockers(&[BlockDeclaration { blocker, attack_index: 0 }], &mut state)
            .unwrap();
        run_all(&mut combat, &mut state);

        assert_eq!(state.card(attacker).unwrap().zone, Zone::Graveyard);
        assert_eq!(state.card(blocker).unwrap().zone, Zone::Graveyard);
    }

    #[test]
    fn test_eternal_follow_up_returned() {
        let mut state = setup();
        let attacker = resonator(&mut state, 0, 500, 500, &[]);
        let blocker = resonator(&mut state, 1, 0, 100, &[Keyword::Eternal]);
        let mut combat = CombatManager::new();
        combat.begin_battle_phase(PlayerId(0), &mut state);
        combat
            .declare_attackers(&[AttackDeclaration::player(attacker, PlayerId(1))], &mut state)
            .unwrap();
        combat
            .declare_blockers(&[BlockDeclaration { blocker, attack_index: 0 }], &mut state)
            .unwrap();
        let report = combat.run_damage_step(DamageStep::Normal, &mut state);
        let follow_ups = combat.destruction_check(&report.exploded, &mut state);
        assert_eq!(follow_ups, vec![EternalReturn { card: blocker, owner: PlayerId(1) }]);
    }
}
