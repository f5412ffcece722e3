//! Battle integration tests.
//!
//! Every test here walks the full battle flow through the decision
//! interface: `begin_battle_phase`, then `submit` answers for the attacker
//! and blocker requests.

use std::sync::Arc;

use chase_rules::cards::{CardTemplate, CardType};
use chase_rules::combat::{AttackDeclaration, BlockDeclaration};
use chase_rules::continuous::AffectedFilter;
use chase_rules::core::{CardId, Phase, PlayerAction, PlayerId, RulesConfig, RulesError, Side, Zone};
use chase_rules::keywords::Keyword;
use chase_rules::replacement::{damage_to_life, prevent_damage, prevent_destruction};
use chase_rules::rules::{ActionOutcome, DecisionAnswer, DecisionRequest, Game};
use chase_rules::scripts::ScriptLibrary;
use tracing_subscriber::EnvFilter;

/// Route engine logs to the test harness. `RUST_LOG=chase_rules=debug`
/// shows the battle step by step.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

fn game_with(config: RulesConfig) -> Game {
    init_tracing();
    let mut game = Game::new(config, Arc::new(ScriptLibrary::new()));
    for player in PlayerId::both() {
        for i in 0..15 {
            game.add_card(
                player,
                CardTemplate::resonator(format!("D{}", i), "Deck Knight", 100, 100),
                Zone::MainDeck,
            );
        }
    }
    game.start_game(PlayerId(0)).unwrap();
    game.change_phase(Phase::Main).unwrap();
    game
}

fn main_phase() -> Game {
    game_with(RulesConfig::default())
}

fn resonator(game: &mut Game, owner: PlayerId, atk: i32, def: i32, keywords: &[Keyword]) -> CardId {
    let mut template = CardTemplate::resonator(format!("R{}{}", atk, def), "Fighter", atk, def);
    for keyword in keywords {
        template = template.with_keyword(*keyword);
    }
    game.add_card(owner, template, Zone::Field)
}

/// Begin the battle and declare `attacks`. Returns the blocker request, if
/// the defender gets one.
fn attack_with(game: &mut Game, attacks: Vec<AttackDeclaration>) -> ActionOutcome {
    let outcome = game.begin_battle_phase().unwrap();
    let Some(DecisionRequest::DeclareAttackers { id, player, .. }) = outcome.request().cloned() else {
        panic!("expected an attacker request, got {:?}", outcome);
    };
    assert_eq!(player, PlayerId(0));
    game.submit(id, DecisionAnswer::Attackers(attacks)).unwrap()
}

fn block_with(game: &mut Game, outcome: &ActionOutcome, blocks: Vec<BlockDeclaration>) -> ActionOutcome {
    let Some(DecisionRequest::DeclareBlockers { id, player, .. }) = outcome.request().cloned() else {
        panic!("expected a blocker request, got {:?}", outcome);
    };
    assert_eq!(player, PlayerId(1));
    game.submit(id, DecisionAnswer::Blockers(blocks)).unwrap()
}

fn life(game: &Game, player: PlayerId) -> i32 {
    game.state().players[player].life
}

fn zone(game: &Game, card: CardId) -> Zone {
    game.card(card).unwrap().zone
}

// =============================================================================
// Unblocked attacks
// =============================================================================

/// An unblocked attack damages the defending player and rests the attacker.
#[test]
fn test_unblocked_attack_hits_player() {
    let mut game = main_phase();
    let attacker = resonator(&mut game, PlayerId(0), 700, 700, &[]);

    let outcome = attack_with(&mut game, vec![AttackDeclaration::player(attacker, PlayerId(1))]);

    assert_eq!(outcome, ActionOutcome::Done);
    assert_eq!(life(&game, PlayerId(1)), 3300);
    assert!(game.card(attacker).unwrap().is_rested);
    assert!(!game.combat().is_active());
    assert!(game.priority().has_priority(PlayerId(0)));
}

/// A summoning-sick resonator cannot attack unless it has Swiftness.
#[test]
fn test_swiftness_ignores_summoning_sickness() {
    let mut game = main_phase();
    let sick = game.put_onto_field(PlayerId(0), CardTemplate::resonator("S", "Recruit", 300, 300));
    let swift = game.put_onto_field(
        PlayerId(0),
        CardTemplate::resonator("F", "Scout", 300, 300).with_keyword(Keyword::Swiftness),
    );

    let outcome = game.begin_battle_phase().unwrap();
    let Some(DecisionRequest::DeclareAttackers { id, legal, .. }) = outcome.request().cloned() else {
        panic!("expected an attacker request");
    };
    assert_eq!(legal, vec![swift]);

    let result = game.submit(id, DecisionAnswer::Attackers(vec![AttackDeclaration::player(sick, PlayerId(1))]));
    assert!(matches!(result, Err(RulesError::IllegalAction { .. })));
    assert_eq!(life(&game, PlayerId(1)), 4000);
}

/// With nobody able to attack, the battle ends without a request.
#[test]
fn test_no_attackers_no_request() {
    let mut game = main_phase();
    let outcome = game.begin_battle_phase().unwrap();

    assert_eq!(outcome, ActionOutcome::Done);
    assert_eq!(game.phase(), Phase::Battle);
    assert!(!game.combat().is_active());
    assert!(game.priority().has_priority(PlayerId(0)));
}

/// Declaring no attackers ends the battle.
#[test]
fn test_empty_declaration_ends_battle() {
    let mut game = main_phase();
    resonator(&mut game, PlayerId(0), 500, 500, &[]);

    let outcome = attack_with(&mut game, vec![]);
    assert_eq!(outcome, ActionOutcome::Done);
    assert!(!game.combat().is_active());
    assert_eq!(life(&game, PlayerId(1)), 4000);
}

// =============================================================================
// Blocks
// =============================================================================

/// A 500 Drain attacker blocked by a 400/400 resonator destroys it and its
/// controller gains 500.
#[test]
fn test_drain_attacker_kills_blocker_and_gains_life() {
    let mut game = main_phase();
    let attacker = resonator(&mut game, PlayerId(0), 500, 500, &[Keyword::Drain]);
    let blocker = resonator(&mut game, PlayerId(1), 400, 400, &[]);

    let outcome = attack_with(&mut game, vec![AttackDeclaration::player(attacker, PlayerId(1))]);
    let outcome = block_with(&mut game, &outcome, vec![BlockDeclaration { blocker, attack_index: 0 }]);

    assert_eq!(outcome, ActionOutcome::Done);
    assert_eq!(zone(&game, blocker), Zone::Graveyard);
    assert_eq!(zone(&game, attacker), Zone::Field);
    assert_eq!(game.card(attacker).unwrap().damage, 400);
    assert_eq!(life(&game, PlayerId(0)), 4500);
    assert_eq!(life(&game, PlayerId(1)), 4000);
}

/// Pierce sends the damage beyond the blocker's DEF to the defending player.
#[test]
fn test_pierce_sends_excess_to_player() {
    let mut game = main_phase();
    let attacker = resonator(&mut game, PlayerId(0), 800, 800, &[Keyword::Pierce]);
    let blocker = resonator(&mut game, PlayerId(1), 100, 300, &[]);

    let outcome = attack_with(&mut game, vec![AttackDeclaration::player(attacker, PlayerId(1))]);
    block_with(&mut game, &outcome, vec![BlockDeclaration { blocker, attack_index: 0 }]);

    assert_eq!(zone(&game, blocker), Zone::Graveyard);
    assert_eq!(life(&game, PlayerId(1)), 3500);
}

/// Drain counts the attacker's damage once; the pierced excess adds nothing.
#[test]
fn test_drain_with_pierce_drains_once() {
    let mut game = main_phase();
    let attacker = resonator(&mut game, PlayerId(0), 700, 500, &[Keyword::Pierce, Keyword::Drain]);
    let blocker = resonator(&mut game, PlayerId(1), 0, 300, &[]);

    let outcome = attack_with(&mut game, vec![AttackDeclaration::player(attacker, PlayerId(1))]);
    block_with(&mut game, &outcome, vec![BlockDeclaration { blocker, attack_index: 0 }]);

    assert_eq!(zone(&game, blocker), Zone::Graveyard);
    assert_eq!(life(&game, PlayerId(1)), 3600);
    assert_eq!(life(&game, PlayerId(0)), 4700);
}

/// Drain gains only what was actually dealt after prevention.
#[test]
fn test_drain_counts_prevented_damage_out() {
    let mut game = main_phase();
    let attacker = resonator(&mut game, PlayerId(0), 700, 500, &[Keyword::Drain]);
    let blocker = resonator(&mut game, PlayerId(1), 0, 300, &[]);
    game.register_replacement(blocker, prevent_damage(AffectedFilter::cards(&[blocker]), Some(500)));

    let outcome = attack_with(&mut game, vec![AttackDeclaration::player(attacker, PlayerId(1))]);
    block_with(&mut game, &outcome, vec![BlockDeclaration { blocker, attack_index: 0 }]);

    assert_eq!(zone(&game, blocker), Zone::Field);
    assert_eq!(game.card(blocker).unwrap().damage, 200);
    assert_eq!(life(&game, PlayerId(0)), 4200);
}

/// Pierce through a blocker with more DEF than the damage sends nothing.
#[test]
fn test_pierce_never_negative() {
    let mut game = main_phase();
    let attacker = resonator(&mut game, PlayerId(0), 300, 800, &[Keyword::Pierce]);
    let blocker = resonator(&mut game, PlayerId(1), 100, 600, &[]);

    let outcome = attack_with(&mut game, vec![AttackDeclaration::player(attacker, PlayerId(1))]);
    block_with(&mut game, &outcome, vec![BlockDeclaration { blocker, attack_index: 0 }]);

    assert_eq!(zone(&game, blocker), Zone::Field);
    assert_eq!(life(&game, PlayerId(1)), 4000);
}

/// First Strike kills the blocker before it can strike back.
#[test]
fn test_first_strike_kills_before_return_damage() {
    let mut game = main_phase();
    let attacker = resonator(&mut game, PlayerId(0), 500, 300, &[Keyword::FirstStrike]);
    let blocker = resonator(&mut game, PlayerId(1), 900, 400, &[]);

    let outcome = attack_with(&mut game, vec![AttackDeclaration::player(attacker, PlayerId(1))]);
    block_with(&mut game, &outcome, vec![BlockDeclaration { blocker, attack_index: 0 }]);

    assert_eq!(zone(&game, blocker), Zone::Graveyard);
    assert_eq!(zone(&game, attacker), Zone::Field);
    assert_eq!(game.card(attacker).unwrap().damage, 0);
}

/// Without First Strike both combatants trade.
#[test]
fn test_simultaneous_damage_trades() {
    let mut game = main_phase();
    let attacker = resonator(&mut game, PlayerId(0), 500, 300, &[]);
    let blocker = resonator(&mut game, PlayerId(1), 900, 400, &[]);

    let outcome = attack_with(&mut game, vec![AttackDeclaration::player(attacker, PlayerId(1))]);
    block_with(&mut game, &outcome, vec![BlockDeclaration { blocker, attack_index: 0 }]);

    assert_eq!(zone(&game, blocker), Zone::Graveyard);
    assert_eq!(zone(&game, attacker), Zone::Graveyard);
}

/// Imperishable keeps a lethally damaged resonator on the field.
#[test]
fn test_imperishable_survives_lethal_damage() {
    let mut game = main_phase();
    let attacker = resonator(&mut game, PlayerId(0), 1000, 1000, &[]);
    let blocker = resonator(&mut game, PlayerId(1), 100, 200, &[Keyword::Imperishable]);

    let outcome = attack_with(&mut game, vec![AttackDeclaration::player(attacker, PlayerId(1))]);
    block_with(&mut game, &outcome, vec![BlockDeclaration { blocker, attack_index: 0 }]);

    assert_eq!(zone(&game, blocker), Zone::Field);
    assert_eq!(game.card(blocker).unwrap().damage, 1000);
}

/// Explode destroys both combatants, but not an Imperishable one.
#[test]
fn test_explode_destroys_both_except_imperishable() {
    let mut game = main_phase();
    let bomb = resonator(&mut game, PlayerId(0), 100, 900, &[Keyword::Explode]);
    let wall = resonator(&mut game, PlayerId(1), 0, 2000, &[]);

    let outcome = attack_with(&mut game, vec![AttackDeclaration::player(bomb, PlayerId(1))]);
    block_with(&mut game, &outcome, vec![BlockDeclaration { blocker: wall, attack_index: 0 }]);

    assert_eq!(zone(&game, bomb), Zone::Graveyard);
    assert_eq!(zone(&game, wall), Zone::Graveyard);

    let mut game = main_phase();
    let bomb = resonator(&mut game, PlayerId(0), 100, 900, &[Keyword::Explode]);
    let wall = resonator(&mut game, PlayerId(1), 0, 2000, &[Keyword::Imperishable]);

    let outcome = attack_with(&mut game, vec![AttackDeclaration::player(bomb, PlayerId(1))]);
    block_with(&mut game, &outcome, vec![BlockDeclaration { blocker: wall, attack_index: 0 }]);

    assert_eq!(zone(&game, bomb), Zone::Graveyard);
    assert_eq!(zone(&game, wall), Zone::Field);
}

/// Flying attackers can only be blocked by Flying resonators, and Stealth
/// attackers cannot be blocked at all.
#[test]
fn test_evasion_limits_blockers() {
    let mut game = main_phase();
    let flyer = resonator(&mut game, PlayerId(0), 300, 300, &[Keyword::Flying]);
    resonator(&mut game, PlayerId(1), 300, 300, &[]);
    let bird = resonator(&mut game, PlayerId(1), 200, 200, &[Keyword::Flying]);

    let outcome = attack_with(&mut game, vec![AttackDeclaration::player(flyer, PlayerId(1))]);
    let Some(DecisionRequest::DeclareBlockers { legal, .. }) = outcome.request().cloned() else {
        panic!("expected a blocker request");
    };
    assert_eq!(legal, vec![bird]);

    let mut game = main_phase();
    let sneak = resonator(&mut game, PlayerId(0), 300, 300, &[Keyword::Stealth]);
    resonator(&mut game, PlayerId(1), 300, 300, &[Keyword::Flying]);

    let outcome = attack_with(&mut game, vec![AttackDeclaration::player(sneak, PlayerId(1))]);
    assert_eq!(outcome, ActionOutcome::Done);
    assert_eq!(life(&game, PlayerId(1)), 3700);
}

/// Declining to block lets the attack through.
#[test]
fn test_no_block_hits_player() {
    let mut game = main_phase();
    let attacker = resonator(&mut game, PlayerId(0), 600, 600, &[]);
    resonator(&mut game, PlayerId(1), 100, 100, &[]);

    let outcome = attack_with(&mut game, vec![AttackDeclaration::player(attacker, PlayerId(1))]);
    let outcome = block_with(&mut game, &outcome, vec![]);

    assert_eq!(outcome, ActionOutcome::Done);
    assert_eq!(life(&game, PlayerId(1)), 3400);
}

/// A cancelled blocker request counts as no blocks.
#[test]
fn test_cancel_blocker_request() {
    let mut game = main_phase();
    let attacker = resonator(&mut game, PlayerId(0), 600, 600, &[]);
    resonator(&mut game, PlayerId(1), 100, 100, &[]);

    let outcome = attack_with(&mut game, vec![AttackDeclaration::player(attacker, PlayerId(1))]);
    let id = outcome.request().unwrap().id();
    game.cancel_request(id).unwrap();

    assert_eq!(life(&game, PlayerId(1)), 3400);
    assert!(!game.combat().is_active());
}

/// One blocker cannot block two attacks.
#[test]
fn test_blocker_used_once() {
    let mut game = main_phase();
    let first = resonator(&mut game, PlayerId(0), 300, 300, &[]);
    let second = resonator(&mut game, PlayerId(0), 400, 400, &[]);
    let blocker = resonator(&mut game, PlayerId(1), 500, 500, &[]);

    let outcome = attack_with(
        &mut game,
        vec![
            AttackDeclaration::player(first, PlayerId(1)),
            AttackDeclaration::player(second, PlayerId(1)),
        ],
    );
    let id = outcome.request().unwrap().id();
    let result = game.submit(
        id,
        DecisionAnswer::Blockers(vec![
            BlockDeclaration { blocker, attack_index: 0 },
            BlockDeclaration { blocker, attack_index: 1 },
        ]),
    );

    assert!(result.is_err());
    assert!(game.combat().is_active());
    assert_eq!(game.pending_decision().map(|r| r.id()), Some(id));
}

// =============================================================================
// Attacking cards
// =============================================================================

/// Precision lets an attacker fight a chosen resonator, which strikes back.
#[test]
fn test_precision_attacks_resonator() {
    let mut game = main_phase();
    let hunter = resonator(&mut game, PlayerId(0), 600, 500, &[Keyword::Precision]);
    let prey = resonator(&mut game, PlayerId(1), 200, 500, &[]);

    let outcome = game.begin_battle_phase().unwrap();
    let id = outcome.request().unwrap().id();
    let outcome = game
        .submit(id, DecisionAnswer::Attackers(vec![AttackDeclaration::card(hunter, prey)]))
        .unwrap();
    block_with(&mut game, &outcome, vec![]);

    assert_eq!(zone(&game, prey), Zone::Graveyard);
    assert_eq!(game.card(hunter).unwrap().damage, 200);
    assert_eq!(life(&game, PlayerId(1)), 4000);
}

/// Without Precision or Target Attack a resonator cannot attack cards.
#[test]
fn test_plain_attacker_cannot_attack_card() {
    let mut game = main_phase();
    let attacker = resonator(&mut game, PlayerId(0), 600, 500, &[]);
    let prey = resonator(&mut game, PlayerId(1), 200, 500, &[]);

    let outcome = game.begin_battle_phase().unwrap();
    let id = outcome.request().unwrap().id();
    let result = game.submit(id, DecisionAnswer::Attackers(vec![AttackDeclaration::card(attacker, prey)]));

    assert!(result.is_err());
    assert_eq!(zone(&game, prey), Zone::Field);
}

// =============================================================================
// Declarations and priority
// =============================================================================

/// The attacking player cannot pass while their declaration is owed.
#[test]
fn test_pass_rejected_while_declaration_owed() {
    let mut game = main_phase();
    resonator(&mut game, PlayerId(0), 500, 500, &[]);
    game.begin_battle_phase().unwrap();

    let result = game.take_action(PlayerId(0), PlayerAction::Pass);
    assert!(matches!(result, Err(RulesError::IllegalAction { .. })));
    assert!(game.combat().is_active());
}

/// Unattended combat declares every legal attacker and no blockers.
#[test]
fn test_unattended_combat() {
    let mut game = game_with(RulesConfig::default().unattended());
    resonator(&mut game, PlayerId(0), 500, 500, &[]);
    resonator(&mut game, PlayerId(0), 300, 300, &[]);
    resonator(&mut game, PlayerId(1), 1000, 1000, &[]);

    let outcome = game.begin_battle_phase().unwrap();

    assert_eq!(outcome, ActionOutcome::Done);
    assert_eq!(life(&game, PlayerId(1)), 3200);
    assert!(game.pending_decision().is_none());
}

/// Lethal battle damage ends the game.
#[test]
fn test_lethal_attack_ends_game() {
    let mut game = main_phase();
    let attacker = resonator(&mut game, PlayerId(0), 4000, 100, &[]);

    let outcome = attack_with(&mut game, vec![AttackDeclaration::player(attacker, PlayerId(1))]);

    assert!(matches!(outcome, ActionOutcome::GameOver(_)));
    assert!(game.state().is_game_over());
    assert!(game.begin_battle_phase().is_err());
}

/// Eternal resonators come back to hand at the end of the turn they died.
#[test]
fn test_eternal_returns_at_end_of_turn() {
    let mut game = main_phase();
    let attacker = resonator(&mut game, PlayerId(0), 500, 300, &[Keyword::Eternal]);
    let blocker = resonator(&mut game, PlayerId(1), 900, 900, &[]);

    let outcome = attack_with(&mut game, vec![AttackDeclaration::player(attacker, PlayerId(1))]);
    block_with(&mut game, &outcome, vec![BlockDeclaration { blocker, attack_index: 0 }]);
    assert_eq!(zone(&game, attacker), Zone::Graveyard);

    game.take_action(PlayerId(0), PlayerAction::Pass).unwrap();
    game.take_action(PlayerId(1), PlayerAction::Pass).unwrap();
    assert_eq!(game.phase(), Phase::End);

    // The delayed return resolves through the chase.
    while !game.chase().is_empty() {
        let holder = game.priority_holder().unwrap();
        game.take_action(holder, PlayerAction::Pass).unwrap();
    }
    assert_eq!(zone(&game, attacker), Zone::Hand);
}

// =============================================================================
// Replacement effects
// =============================================================================

/// A blocker that cannot be destroyed survives lethal battle damage.
#[test]
fn test_indestructible_blocker_survives() {
    let mut game = main_phase();
    let attacker = resonator(&mut game, PlayerId(0), 700, 700, &[]);
    let blocker = resonator(&mut game, PlayerId(1), 100, 300, &[]);
    game.register_replacement(blocker, prevent_destruction());

    let outcome = attack_with(&mut game, vec![AttackDeclaration::player(attacker, PlayerId(1))]);
    block_with(&mut game, &outcome, vec![BlockDeclaration { blocker, attack_index: 0 }]);

    assert_eq!(zone(&game, blocker), Zone::Field);
    assert_eq!(game.card(blocker).unwrap().damage, 700);
    assert_eq!(life(&game, PlayerId(1)), 4000);
}

/// Battle damage to a protected player becomes life gain.
#[test]
fn test_player_damage_becomes_life() {
    let mut game = main_phase();
    let attacker = resonator(&mut game, PlayerId(0), 700, 700, &[]);
    let shrine = game.add_card(PlayerId(1), CardTemplate::new("S", "Shrine", CardType::AdditionField), Zone::Field);
    game.register_replacement(shrine, damage_to_life(Side::You));

    let outcome = attack_with(&mut game, vec![AttackDeclaration::player(attacker, PlayerId(1))]);

    assert_eq!(outcome, ActionOutcome::Done);
    assert_eq!(life(&game, PlayerId(1)), 4700);
}
