//! Effect resolution: executing [`EffectOp`]s against the match.
//!
//! The resolver never fails as a whole. Each operation reports a
//! [`ResolveResult`]; an operation whose cards have gone away is `Skipped`,
//! one that cannot make sense (an unknown predicate, a player reference with
//! nothing to refer to) is `Failed`. The remaining operations still run.

use tracing::{debug, warn};

use super::effect::{CardScope, EffectOp, PlayerRef};
use crate::continuous::{
    buff_cards, gain_control, AffectedFilter, ContinuousDeclaration, ContinuousEffectManager,
    EffectDuration, LayerPayload,
};
use crate::core::{CardId, Match, PlayerId, RulesResult, TargetList, Zone};
use crate::keywords::{EternalReturn, KeywordProcessor, KeywordSet};
use crate::scripts::ScriptRegistry;
use crate::triggers::{GameEvent, TriggerEvent};

/// Who is resolving what, against which targets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolveContext {
    /// The card the effect comes from.
    pub source: CardId,
    /// The player resolving it.
    pub controller: PlayerId,
    /// Chosen targets that are still legal.
    pub targets: TargetList,
    /// The event that triggered the effect, if any.
    pub event: Option<GameEvent>,
}

impl ResolveContext {
    /// A context with no targets and no event.
    #[must_use]
    pub fn new(source: CardId, controller: PlayerId) -> Self {
        Self {
            source,
            controller,
            targets: TargetList::new(),
            event: None,
        }
    }

    /// Set the targets (builder pattern).
    #[must_use]
    pub fn with_targets(mut self, targets: &[CardId]) -> Self {
        self.targets = targets.iter().copied().collect();
        self
    }

    /// Set the triggering event (builder pattern).
    #[must_use]
    pub fn with_event(mut self, event: GameEvent) -> Self {
        self.event = Some(event);
        self
    }
}

/// Result of resolving one operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveResult {
    /// The operation resolved.
    Success,
    /// The operation could not be carried out.
    Failed(String),
    /// Nothing to do (no cards in scope, condition false).
    Skipped,
}

/// Everything a resolution produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolveSummary {
    /// One result per operation, in order.
    pub results: Vec<ResolveResult>,
    /// Eternal cards destroyed along the way.
    pub eternal: Vec<EternalReturn>,
    /// Spells on the chase that were countered. The caller takes them off
    /// the chase.
    pub countered: Vec<CardId>,
}

/// Mutable engine state an operation may touch.
pub struct ResolveEnv<'a> {
    pub state: &'a mut Match,
    pub continuous: &'a mut ContinuousEffectManager,
    pub scripts: &'a dyn ScriptRegistry,
}

/// Resolves effect operations.
pub struct EffectResolver;

impl EffectResolver {
    /// Resolve `ops` in order.
    pub fn resolve_all(ops: &[EffectOp], ctx: &ResolveContext, env: &mut ResolveEnv<'_>) -> ResolveSummary {
        let mut summary = ResolveSummary::default();
        for op in ops {
            let result = Self::resolve_single(op, ctx, env, &mut summary);
            if let ResolveResult::Failed(reason) = &result {
                warn!(source = %ctx.source, %reason, "effect operation failed");
            }
            summary.results.push(result);
        }
        summary
    }

    /// Resolve one operation.
    pub fn resolve_single(
        op: &EffectOp,
        ctx: &ResolveContext,
        env: &mut ResolveEnv<'_>,
        summary: &mut ResolveSummary,
    ) -> ResolveResult {
        match op {
            EffectOp::DealDamage { to, amount } => {
                let cards = on_field(Self::cards_in_scope(to, ctx, env), env.state);
                for card in &cards {
                    deal_damage(env.state, ctx.source, *card, *amount);
                }
                done(&cards)
            }

            EffectOp::Destroy(scope) => {
                let cards = on_field(Self::cards_in_scope(scope, ctx, env), env.state);
                for card in &cards {
                    if let Ok(Some(follow_up)) = destroy_card(env.state, *card) {
                        summary.eternal.push(follow_up);
                    }
                }
                done(&cards)
            }

            EffectOp::Counter(scope) => {
                let cards: Vec<CardId> = Self::cards_in_scope(scope, ctx, env)
                    .into_iter()
                    .filter(|id| env.state.card(*id).is_some_and(|c| c.zone == Zone::Chase))
                    .filter(|id| !summary.countered.contains(id))
                    .collect();
                for card in &cards {
                    debug!(source = %ctx.source, %card, "spell countered");
                }
                summary.countered.extend(cards.iter().copied());
                done(&cards)
            }

            EffectOp::Banish(scope) => {
                let cards = Self::cards_in_scope(scope, ctx, env);
                for card in &cards {
                    move_with_event(env.state, *card, Zone::Removed, TriggerEvent::Banished);
                }
                done(&cards)
            }

            EffectOp::ReturnToHand(scope) => {
                let cards = Self::cards_in_scope(scope, ctx, env);
                for card in &cards {
                    move_with_event(env.state, *card, Zone::Hand, TriggerEvent::ReturnedToHand);
                }
                done(&cards)
            }

            EffectOp::PutOntoField(scope) => {
                let cards: Vec<CardId> = Self::cards_in_scope(scope, ctx, env)
                    .into_iter()
                    .filter(|id| env.state.card(*id).is_some_and(|c| c.zone != Zone::Field))
                    .collect();
                for card in &cards {
                    let _ = env.state.move_card(*card, Zone::Field);
                }
                done(&cards)
            }

            EffectOp::Rest(scope) | EffectOp::Recover(scope) => {
                let rest = matches!(op, EffectOp::Rest(_));
                let cards = on_field(Self::cards_in_scope(scope, ctx, env), env.state);
                for id in &cards {
                    set_rested(env.state, *id, rest);
                }
                done(&cards)
            }

            EffectOp::Buff { scope, atk, def } => {
                let cards = on_field(Self::cards_in_scope(scope, ctx, env), env.state);
                if !cards.is_empty() {
                    env.continuous
                        .register_effect(ctx.source, buff_cards(&cards, *atk, *def));
                }
                done(&cards)
            }

            EffectOp::GrantKeywords { scope, keywords } | EffectOp::RemoveKeywords { scope, keywords } => {
                let cards = on_field(Self::cards_in_scope(scope, ctx, env), env.state);
                if !cards.is_empty() {
                    let (grant, remove) = if matches!(op, EffectOp::GrantKeywords { .. }) {
                        (*keywords, KeywordSet::EMPTY)
                    } else {
                        (KeywordSet::EMPTY, *keywords)
                    };
                    let declaration = ContinuousDeclaration::new(
                        format!("keywords {}", keywords),
                        AffectedFilter::cards(&cards),
                        LayerPayload::Keywords { grant, remove },
                    )
                    .with_duration(EffectDuration::UntilEndOfTurn);
                    env.continuous.register_effect(ctx.source, declaration);
                }
                done(&cards)
            }

            EffectOp::GainControl(scope) => {
                let cards = on_field(Self::cards_in_scope(scope, ctx, env), env.state);
                if !cards.is_empty() {
                    env.continuous.register_effect(
                        ctx.source,
                        gain_control(&cards).with_duration(EffectDuration::Permanent),
                    );
                }
                done(&cards)
            }

            EffectOp::AddStatCounter { scope, atk, def } => {
                let cards = on_field(Self::cards_in_scope(scope, ctx, env), env.state);
                for id in &cards {
                    if let Some(card) = env.state.card_mut(*id) {
                        card.stat_counters.atk += atk;
                        card.stat_counters.def += def;
                    }
                }
                done(&cards)
            }

            EffectOp::AddCounter { scope, name, amount } => {
                let cards = Self::cards_in_scope(scope, ctx, env);
                for id in &cards {
                    if let Some(card) = env.state.card_mut(*id) {
                        card.add_counter(name, *amount);
                    }
                }
                done(&cards)
            }

            EffectOp::DamagePlayer { player, amount } => Self::with_player(*player, ctx, env, |state, p| {
                state.damage_player(p, *amount, Some(ctx.source));
            }),

            EffectOp::GainLife { player, amount } => {
                Self::with_player(*player, ctx, env, |state, p| state.gain_life(p, *amount))
            }

            EffectOp::LoseLife { player, amount } => {
                Self::with_player(*player, ctx, env, |state, p| state.lose_life(p, *amount))
            }

            EffectOp::DrawCards { player, count } => Self::with_player(*player, ctx, env, |state, p| {
                state.draw_cards(p, *count);
            }),

            EffectOp::AddWill { player, attribute, amount } => {
                Self::with_player(*player, ctx, env, |state, p| {
                    state.players[p].will_pool.add(*attribute, *amount);
                })
            }

            EffectOp::RegisterEffect(declaration) => {
                env.continuous.register_effect(ctx.source, declaration.clone());
                ResolveResult::Success
            }

            EffectOp::RegisterReplacement(declaration) => {
                env.state.replacements.register(ctx.source, declaration.clone());
                ResolveResult::Success
            }

            EffectOp::Conditional { predicate, op } => {
                let Some(source) = env.state.card(ctx.source) else {
                    return ResolveResult::Skipped;
                };
                match env.scripts.evaluate_predicate(predicate, source, env.state) {
                    Some(true) => Self::resolve_single(op, ctx, env, summary),
                    Some(false) => ResolveResult::Skipped,
                    None => ResolveResult::Failed(format!("unknown predicate `{}`", predicate)),
                }
            }
        }
    }

    /// Cards a scope names, in a deterministic order.
    #[must_use]
    pub fn cards_in_scope(scope: &CardScope, ctx: &ResolveContext, env: &ResolveEnv<'_>) -> Vec<CardId> {
        let state = &*env.state;
        let ids: Vec<CardId> = match scope {
            CardScope::Targets => ctx.targets.to_vec(),
            CardScope::Source => vec![ctx.source],
            CardScope::EventCard => ctx.event.as_ref().and_then(|e| e.card).into_iter().collect(),
            CardScope::EventOther => ctx.event.as_ref().and_then(|e| e.other).into_iter().collect(),
            CardScope::Matching(filter) => state
                .card_ids()
                .into_iter()
                .filter(|id| {
                    state.card(*id).is_some_and(|card| {
                        filter
                            .evaluate(card, ctx.controller, state, env.scripts)
                            .unwrap_or(false)
                    })
                })
                .collect(),
        };
        ids.into_iter().filter(|id| state.card(*id).is_some()).collect()
    }

    /// Resolve a player reference.
    #[must_use]
    pub fn player_for(player: PlayerRef, ctx: &ResolveContext, state: &Match) -> Option<PlayerId> {
        match player {
            PlayerRef::You => Some(ctx.controller),
            PlayerRef::Opponent => Some(ctx.controller.opponent()),
            PlayerRef::EventPlayer => ctx.event.as_ref().and_then(|e| e.player),
            PlayerRef::TargetController => ctx
                .targets
                .first()
                .and_then(|id| state.card(*id))
                .map(|card| card.controller),
        }
    }

    fn with_player(
        player: PlayerRef,
        ctx: &ResolveContext,
        env: &mut ResolveEnv<'_>,
        apply: impl FnOnce(&mut Match, PlayerId),
    ) -> ResolveResult {
        match Self::player_for(player, ctx, env.state) {
            Some(p) => {
                apply(env.state, p);
                ResolveResult::Success
            }
            None => ResolveResult::Failed(format!("no player for {:?}", player)),
        }
    }
}

fn done(cards: &[CardId]) -> ResolveResult {
    if cards.is_empty() {
        ResolveResult::Skipped
    } else {
        ResolveResult::Success
    }
}

fn on_field(cards: Vec<CardId>, state: &Match) -> Vec<CardId> {
    cards
        .into_iter()
        .filter(|id| state.card(*id).is_some_and(|c| c.zone == Zone::Field))
        .collect()
}

fn move_with_event(state: &mut Match, card: CardId, to: Zone, kind: TriggerEvent) {
    if let Ok(from) = state.move_card(card, to) {
        if let Some(owner) = state.card(card).map(|c| c.owner) {
            state.emit(GameEvent::zone_change(kind, card, owner, from, to));
        }
    }
}

fn set_rested(state: &mut Match, id: CardId, rested: bool) {
    let Some(card) = state.card_mut(id) else { return };
    if card.is_rested == rested {
        return;
    }
    card.is_rested = rested;
    let controller = card.controller;
    let kind = if rested {
        TriggerEvent::Rested
    } else {
        TriggerEvent::Recovered
    };
    state.emit(GameEvent::new(kind).with_card(id).with_player(controller));
}

/// Mark damage on a card after replacement effects and emit the damage
/// events.
///
/// Returns the damage actually marked.
pub fn deal_damage(state: &mut Match, source: CardId, target: CardId, amount: i32) -> i32 {
    if amount <= 0 {
        return 0;
    }
    let Some(card) = state.card(target) else { return 0 };
    let replaced = state.replacements.damage_to_card(card, amount, state);
    if let Some((player, life)) = replaced.life_gain {
        state.gain_life(player, life);
    }
    let amount = replaced.amount;
    if amount <= 0 {
        debug!(%source, %target, "damage prevented");
        return 0;
    }
    let Some(card) = state.card_mut(target) else { return 0 };
    card.damage += amount;
    debug!(%source, %target, amount, damage = card.damage, "damage marked");
    state.emit(GameEvent::damage(TriggerEvent::DamageDealt, source, target, amount));
    state.emit(GameEvent::damage(TriggerEvent::DamageReceived, target, source, amount));
    amount
}

/// Put a card from the field into its owner's graveyard as a destruction.
///
/// Returns the Eternal follow-up if the card had Eternal when it left. A
/// card a replacement effect protects stays where it is and yields `None`.
pub fn destroy_card(state: &mut Match, id: CardId) -> RulesResult<Option<EternalReturn>> {
    let card = state.get_card(id)?;
    if let Some(replacement) = state.replacements.prevents_destruction(card, state) {
        debug!(card = %id, %replacement, "destruction replaced");
        return Ok(None);
    }
    let follow_up = KeywordProcessor::on_destroyed(card);
    let controller = card.controller;
    let from = state.move_card(id, Zone::Graveyard)?;
    debug!(card = %id, "destroyed");
    state.emit(
        GameEvent::new(TriggerEvent::Destroyed)
            .with_card(id)
            .with_player(controller)
            .with_zones(from, Zone::Graveyard),
    );
    Ok(follow_up)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Attribute, CardTemplate, CardType};
    use crate::core::Side;
    use crate::keywords::Keyword;
    use crate::scripts::ScriptLibrary;

    fn setup() -> (Match, CardId, CardId) {
        let mut state = Match::new(4000);
        let source = state.create_card(PlayerId(0), CardTemplate::resonator("S", "Source", 100, 100), Zone::Field);
        let victim = state.create_card(PlayerId(1), CardTemplate::resonator("V", "Victim", 400, 400), Zone::Field);
        (state, source, victim)
    }

    // === Cards ===

    #[test]
    fn test_damage_and_destroy_targets() {
        let (mut state, source, victim) = setup();
        let mut continuous = ContinuousEffectManager::new();
        let scripts = ScriptLibrary::new();
        let ctx = ResolveContext::new(source, PlayerId(0)).with_targets(&[victim]);
        let mut env = ResolveEnv { state: &mut state, continuous: &mut continuous, scripts: &scripts };

        let summary = EffectResolver::resolve_all(
            &[EffectOp::damage_targets(300), EffectOp::destroy_targets()],
            &ctx,
            &mut env,
        );
        assert_eq!(summary.results, vec![ResolveResult::Success, ResolveResult::Success]);
        assert_eq!(state.card(victim).unwrap().zone, Zone::Graveyard);
        let kinds: Vec<_> = state.drain_events().iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&TriggerEvent::DamageDealt));
        assert!(kinds.contains(&TriggerEvent::Destroyed));
    }

    #[test]
    fn test_destroy_reports_eternal() {
        let (mut state, source, _) = setup();
        let undying = state.create_card(
            PlayerId(1),
            CardTemplate::resonator("E", "Undying", 100, 100).with_keyword(Keyword::Eternal),
            Zone::Field,
        );
        let mut continuous = ContinuousEffectManager::new();
        let scripts = ScriptLibrary::new();
        let ctx = ResolveContext::new(source, PlayerId(0)).with_targets(&[undying]);
        let mut env = ResolveEnv { state: &mut state, continuous: &mut continuous, scripts: &scripts };
        let summary = EffectResolver::resolve_all(&[EffectOp::destroy_targets()], &ctx, &mut env);
        assert_eq!(summary.eternal, vec![EternalReturn { card: undying, owner: PlayerId(1) }]);
    }

    #[test]
    fn test_buff_registers_end_of_turn_effect() {
        let (mut state, source, victim) = setup();
        let mut continuous = ContinuousEffectManager::new();
        let scripts = ScriptLibrary::new();
        let ctx = ResolveContext::new(source, PlayerId(0)).with_targets(&[victim]);
        let mut env = ResolveEnv { state: &mut state, continuous: &mut continuous, scripts: &scripts };
        EffectResolver::resolve_all(&[EffectOp::buff_targets(200, 0)], &ctx, &mut env);

        continuous.apply_all_effects(&mut state, &scripts);
        assert_eq!(state.card(victim).unwrap().current_atk, 600);
        continuous.remove_end_of_turn_effects();
        continuous.apply_all_effects(&mut state, &scripts);
        assert_eq!(state.card(victim).unwrap().current_atk, 400);
    }

    #[test]
    fn test_matching_scope_is_relative_to_controller() {
        let (mut state, source, victim) = setup();
        let mut continuous = ContinuousEffectManager::new();
        let scripts = ScriptLibrary::new();
        let ctx = ResolveContext::new(source, PlayerId(0));
        let mut env = ResolveEnv { state: &mut state, continuous: &mut continuous, scripts: &scripts };
        EffectResolver::resolve_all(
            &[EffectOp::Rest(CardScope::Matching(AffectedFilter::resonators(Side::Opponent)))],
            &ctx,
            &mut env,
        );
        assert!(state.card(victim).unwrap().is_rested);
        assert!(!state.card(source).unwrap().is_rested);
    }

    #[test]
    fn test_replacements_shield_damage_and_destruction() {
        let (mut state, source, victim) = setup();
        state
            .replacements
            .register(victim, crate::replacement::prevent_damage(AffectedFilter::cards(&[victim]), Some(100)));
        state.replacements.register(victim, crate::replacement::prevent_destruction());
        let mut continuous = ContinuousEffectManager::new();
        let scripts = ScriptLibrary::new();
        let ctx = ResolveContext::new(source, PlayerId(0)).with_targets(&[victim]);
        let mut env = ResolveEnv { state: &mut state, continuous: &mut continuous, scripts: &scripts };

        let summary = EffectResolver::resolve_all(
            &[EffectOp::damage_targets(300), EffectOp::destroy_targets()],
            &ctx,
            &mut env,
        );
        assert_eq!(summary.results, vec![ResolveResult::Success, ResolveResult::Success]);
        let victim = state.card(victim).unwrap();
        assert_eq!(victim.damage, 200);
        assert_eq!(victim.zone, Zone::Field);
        let kinds: Vec<_> = state.drain_events().iter().map(|e| e.kind).collect();
        assert!(!kinds.contains(&TriggerEvent::Destroyed));
    }

    #[test]
    fn test_counter_collects_spells_on_the_chase() {
        let (mut state, source, victim) = setup();
        let spell = state.create_card(PlayerId(1), CardTemplate::new("B", "Bolt", CardType::ChantInstant), Zone::Chase);
        let mut continuous = ContinuousEffectManager::new();
        let scripts = ScriptLibrary::new();
        let ctx = ResolveContext::new(source, PlayerId(0)).with_targets(&[spell, victim]);
        let mut env = ResolveEnv { state: &mut state, continuous: &mut continuous, scripts: &scripts };

        let summary = EffectResolver::resolve_all(&[EffectOp::counter_targets()], &ctx, &mut env);
        assert_eq!(summary.results, vec![ResolveResult::Success]);
        assert_eq!(summary.countered, vec![spell]);
        assert_eq!(state.card(spell).unwrap().zone, Zone::Chase);
    }

    // === Players ===

    #[test]
    fn test_player_operations() {
        let (mut state, source, victim) = setup();
        let mut continuous = ContinuousEffectManager::new();
        let scripts = ScriptLibrary::new();
        let ctx = ResolveContext::new(source, PlayerId(0)).with_targets(&[victim]);
        let mut env = ResolveEnv { state: &mut state, continuous: &mut continuous, scripts: &scripts };
        let summary = EffectResolver::resolve_all(
            &[
                EffectOp::damage_opponent(500),
                EffectOp::gain_life(200),
                EffectOp::LoseLife { player: PlayerRef::TargetController, amount: 100 },
                EffectOp::AddWill { player: PlayerRef::You, attribute: Attribute::Fire, amount: 2 },
                EffectOp::DamagePlayer { player: PlayerRef::EventPlayer, amount: 100 },
            ],
            &ctx,
            &mut env,
        );
        assert_eq!(state.players[PlayerId(1)].life, 3400);
        assert_eq!(state.players[PlayerId(0)].life, 4200);
        assert_eq!(state.players[PlayerId(0)].will_pool.amount(Attribute::Fire), 2);
        assert!(matches!(summary.results[4], ResolveResult::Failed(_)));
    }

    #[test]
    fn test_conditional() {
        let (mut state, source, _) = setup();
        let mut continuous = ContinuousEffectManager::new();
        let mut scripts = ScriptLibrary::new();
        scripts.register_predicate("never", |_, _| false);
        let ctx = ResolveContext::new(source, PlayerId(0));
        let mut env = ResolveEnv { state: &mut state, continuous: &mut continuous, scripts: &scripts };
        let summary = EffectResolver::resolve_all(
            &[
                EffectOp::Conditional { predicate: "never".into(), op: Box::new(EffectOp::gain_life(100)) },
                EffectOp::Conditional { predicate: "unknown".into(), op: Box::new(EffectOp::gain_life(100)) },
            ],
            &ctx,
            &mut env,
        );
        assert_eq!(summary.results[0], ResolveResult::Skipped);
        assert!(matches!(summary.results[1], ResolveResult::Failed(_)));
        assert_eq!(state.players[PlayerId(0)].life, 4000);
    }
}
