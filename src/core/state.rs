//! Match state: players, zones, cards, and the event queue.
//!
//! ## Match
//!
//! The world state the rules core operates on:
//! - Turn number, phase, turn player
//! - Per-player life, will pool, and zone contents
//! - Every card instance, keyed by `CardId`
//! - Events emitted since the last checkpoint
//!
//! Zone contents use `im::Vector` so snapshots of a match are cheap to take.
//! The top of a deck is the *last* element.
//!
//! `Match` knows nothing about priority or the chase. It carries the
//! replacement registry so every damage and destruction path sees it, and
//! is moved only through [`Game`](crate::rules::Game) and its managers.

use im::Vector;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::action::ActionRecord;
use super::config::{Phase, Zone};
use super::entity::{CardId, RequestId};
use super::error::{RulesError, RulesResult};
use super::player::{PlayerId, PlayerMap};
use super::rng::GameRng;
use crate::cards::{CardInstance, CardTemplate, WillPool};
use crate::replacement::ReplacementManager;
use crate::triggers::{GameEvent, TriggerEvent};

/// How a match ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameOutcome {
    /// One player won.
    Winner(PlayerId),
    /// Both players lost at the same time.
    Draw,
}

/// One player's resources and zones.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Life total.
    pub life: i32,

    /// Unspent will.
    pub will_pool: WillPool,

    /// The player's ruler (or J-ruler after Judgment).
    pub ruler: Option<CardId>,

    /// Called a stone this turn.
    pub has_called_stone: bool,

    /// Performed Judgment this game.
    pub has_performed_judgment: bool,

    /// Had a recovery phase this game.
    pub has_had_recovery: bool,

    /// Lost the game (deck out or life).
    pub has_lost: bool,

    zones: FxHashMap<Zone, Vector<CardId>>,
}

impl PlayerState {
    fn new(life: i32) -> Self {
        Self {
            life,
            will_pool: WillPool::default(),
            ruler: None,
            has_called_stone: false,
            has_performed_judgment: false,
            has_had_recovery: false,
            has_lost: false,
            zones: Zone::ALL.iter().map(|z| (*z, Vector::new())).collect(),
        }
    }

    /// Cards this player owns in `zone`, bottom to top.
    #[must_use]
    pub fn zone(&self, zone: Zone) -> Vector<CardId> {
        self.zones.get(&zone).cloned().unwrap_or_default()
    }

    /// Number of cards this player owns in `zone`.
    #[must_use]
    pub fn zone_len(&self, zone: Zone) -> usize {
        self.zones.get(&zone).map_or(0, Vector::len)
    }

    /// Top card of `zone`.
    #[must_use]
    pub fn top_of(&self, zone: Zone) -> Option<CardId> {
        self.zones.get(&zone).and_then(|cards| cards.last().copied())
    }

    fn zone_mut(&mut self, zone: Zone) -> &mut Vector<CardId> {
        self.zones.entry(zone).or_default()
    }
}

/// The match: world state shared by every rules component.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Match {
    /// Per-player state.
    pub players: PlayerMap<PlayerState>,

    /// Turn number (starts at 1).
    pub turn_number: u32,

    /// Whose turn it is.
    pub turn_player: PlayerId,

    /// Player who took the first turn.
    pub first_player: PlayerId,

    /// Current phase.
    pub phase: Phase,

    /// Completed actions.
    pub history: Vector<ActionRecord>,

    /// Set once the game is decided.
    pub outcome: Option<GameOutcome>,

    /// Registered replacement effects.
    pub replacements: ReplacementManager,

    cards: FxHashMap<CardId, CardInstance>,
    events: Vec<GameEvent>,
    next_card_id: u32,
    next_request_id: u32,
}

impl Match {
    /// Create an empty match.
    #[must_use]
    pub fn new(starting_life: i32) -> Self {
        Self {
            players: PlayerMap::new(|_| PlayerState::new(starting_life)),
            turn_number: 0,
            turn_player: PlayerId(0),
            first_player: PlayerId(0),
            phase: Phase::Draw,
            history: Vector::new(),
            outcome: None,
            replacements: ReplacementManager::new(),
            cards: FxHashMap::default(),
            events: Vec::new(),
            next_card_id: 1,
            next_request_id: 1,
        }
    }

    // === Cards ===

    /// Create a card in `owner`'s `zone`, on top.
    pub fn create_card(&mut self, owner: PlayerId, template: CardTemplate, zone: Zone) -> CardId {
        let id = CardId(self.next_card_id);
        self.next_card_id += 1;
        self.cards
            .insert(id, CardInstance::new(id, template, owner, zone));
        self.players[owner].zone_mut(zone).push_back(id);
        id
    }

    /// Look up a card.
    #[must_use]
    pub fn card(&self, id: CardId) -> Option<&CardInstance> {
        self.cards.get(&id)
    }

    /// Look up a card mutably.
    pub fn card_mut(&mut self, id: CardId) -> Option<&mut CardInstance> {
        self.cards.get_mut(&id)
    }

    /// Look up a card or fail with [`RulesError::UnknownCard`].
    pub fn get_card(&self, id: CardId) -> RulesResult<&CardInstance> {
        self.cards.get(&id).ok_or(RulesError::UnknownCard(id))
    }

    /// Iterate every card mutably, in no particular order.
    pub fn cards_mut(&mut self) -> impl Iterator<Item = &mut CardInstance> {
        self.cards.values_mut()
    }

    /// Every card id, ascending.
    #[must_use]
    pub fn card_ids(&self) -> Vec<CardId> {
        let mut ids: Vec<_> = self.cards.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Cards in `zone` (both owners), ascending by id.
    #[must_use]
    pub fn cards_in(&self, zone: Zone) -> Vec<CardId> {
        let mut ids: Vec<_> = self
            .cards
            .values()
            .filter(|c| c.zone == zone)
            .map(|c| c.uid)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Cards on the field controlled by `player`, ascending by id.
    #[must_use]
    pub fn field_of(&self, player: PlayerId) -> Vec<CardId> {
        let mut ids: Vec<_> = self
            .cards
            .values()
            .filter(|c| c.zone == Zone::Field && c.controller == player)
            .map(|c| c.uid)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Move a card to its owner's `to` zone, on top.
    ///
    /// Per-zone state (rest, damage, counters, control) is cleared. Cards
    /// entering the field are stamped with the current turn. Emits
    /// `CardMoved` plus `LeaveField`/`EnterField` where they apply. Returns
    /// the zone the card left.
    pub fn move_card(&mut self, id: CardId, to: Zone) -> RulesResult<Zone> {
        let turn = self.turn_number;
        let card = self.cards.get_mut(&id).ok_or(RulesError::UnknownCard(id))?;
        let from = card.zone;
        let owner = card.owner;
        card.zone = to;
        card.reset_for_zone_change();
        if to == Zone::Field {
            card.entered_turn = Some(turn);
        }

        let player = &mut self.players[owner];
        let source = player.zone_mut(from);
        if let Some(index) = source.iter().position(|c| *c == id) {
            source.remove(index);
        }
        player.zone_mut(to).push_back(id);

        debug!(card = %id, %from, %to, "card moved");
        self.emit(GameEvent::zone_change(TriggerEvent::CardMoved, id, owner, from, to));
        if from == Zone::Field {
            self.emit(GameEvent::zone_change(TriggerEvent::LeaveField, id, owner, from, to));
        }
        if to == Zone::Field {
            self.emit(GameEvent::zone_change(TriggerEvent::EnterField, id, owner, from, to));
        }
        Ok(from)
    }

    // === Events ===

    /// Queue an event for the next checkpoint.
    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take every queued event, oldest first.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Check for queued events.
    #[must_use]
    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }

    // === Players ===

    /// Allocate a fresh request id.
    pub fn next_request_id(&mut self) -> RequestId {
        let id = RequestId(self.next_request_id);
        self.next_request_id += 1;
        id
    }

    /// Shuffle both players' main and stone decks.
    pub fn shuffle_decks(&mut self, seed: u64) {
        let rng = GameRng::new(seed);
        for (player, state) in self.players.iter_mut() {
            for zone in [Zone::MainDeck, Zone::StoneDeck] {
                let mut stream = rng.for_context(&format!("{:?}:{}", zone, player.0));
                let mut cards: Vec<_> = state.zone(zone).into_iter().collect();
                stream.shuffle(&mut cards);
                *state.zone_mut(zone) = cards.into_iter().collect();
            }
        }
    }

    /// Draw `count` cards. Drawing from an empty deck loses the game.
    ///
    /// Returns the number of cards drawn.
    pub fn draw_cards(&mut self, player: PlayerId, count: usize) -> usize {
        let mut drawn = 0;
        for _ in 0..count {
            let Some(top) = self.players[player].top_of(Zone::MainDeck) else {
                info!(%player, "drew from an empty deck");
                self.players[player].has_lost = true;
                break;
            };
            if self.move_card(top, Zone::Hand).is_ok() {
                self.emit(GameEvent::new(TriggerEvent::CardDrawn).with_player(player).with_card(top));
                drawn += 1;
            }
        }
        drawn
    }

    /// Deal damage to a player after replacement effects.
    ///
    /// Returns the damage actually dealt.
    pub fn damage_player(&mut self, player: PlayerId, amount: i32, source: Option<CardId>) -> i32 {
        if amount <= 0 {
            return 0;
        }
        let replaced = self.replacements.damage_to_player(player, amount, self);
        if let Some((gainer, life)) = replaced.life_gain {
            self.gain_life(gainer, life);
        }
        let amount = replaced.amount;
        if amount <= 0 {
            return 0;
        }
        self.players[player].life -= amount;
        debug!(%player, amount, life = self.players[player].life, "player damaged");
        let mut event = GameEvent::new(TriggerEvent::PlayerDamaged)
            .with_player(player)
            .with_amount(amount);
        if let Some(source) = source {
            event = event.with_card(source);
        }
        self.emit(event);
        self.emit(GameEvent::new(TriggerEvent::LifeLost).with_player(player).with_amount(amount));
        amount
    }

    /// Lose life without damage.
    pub fn lose_life(&mut self, player: PlayerId, amount: i32) {
        if amount <= 0 {
            return;
        }
        self.players[player].life -= amount;
        self.emit(GameEvent::new(TriggerEvent::LifeLost).with_player(player).with_amount(amount));
    }

    /// Gain life.
    pub fn gain_life(&mut self, player: PlayerId, amount: i32) {
        if amount <= 0 {
            return;
        }
        self.players[player].life += amount;
        self.emit(GameEvent::new(TriggerEvent::LifeGained).with_player(player).with_amount(amount));
    }

    /// Append to the action history.
    pub fn record(&mut self, record: ActionRecord) {
        self.history.push_back(record);
    }

    /// Decide the game from loss flags and life totals.
    ///
    /// Returns the outcome if the game just ended.
    pub fn check_outcome(&mut self) -> Option<GameOutcome> {
        if self.outcome.is_some() {
            return None;
        }
        for (_, state) in self.players.iter_mut() {
            if state.life <= 0 {
                state.has_lost = true;
            }
        }
        let losers: Vec<_> = self
            .players
            .iter()
            .filter(|(_, s)| s.has_lost)
            .map(|(p, _)| p)
            .collect();
        let outcome = match losers.as_slice() {
            [] => return None,
            [loser] => GameOutcome::Winner(loser.opponent()),
            _ => GameOutcome::Draw,
        };
        info!(?outcome, "game over");
        self.outcome = Some(outcome);
        self.outcome
    }

    /// Check whether the game is decided.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.outcome.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resonator() -> CardTemplate {
        CardTemplate::resonator("T-001", "Knight", 500, 500)
    }

    // === Cards and zones ===

    #[test]
    fn test_create_card() {
        let mut m = Match::new(4000);
        let id = m.create_card(PlayerId(0), resonator(), Zone::Hand);

        assert_eq!(id, CardId(1));
        assert_eq!(m.card(id).unwrap().zone, Zone::Hand);
        assert_eq!(m.players[PlayerId(0)].zone_len(Zone::Hand), 1);
        assert!(m.get_card(CardId(99)).is_err());
    }

    #[test]
    fn test_move_card_emits_events() {
        let mut m = Match::new(4000);
        m.turn_number = 3;
        let id = m.create_card(PlayerId(0), resonator(), Zone::Hand);

        let from = m.move_card(id, Zone::Field).unwrap();
        assert_eq!(from, Zone::Hand);
        assert_eq!(m.card(id).unwrap().entered_turn, Some(3));
        assert_eq!(m.field_of(PlayerId(0)), vec![id]);

        let kinds: Vec<_> = m.drain_events().into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![TriggerEvent::CardMoved, TriggerEvent::EnterField]);

        m.move_card(id, Zone::Graveyard).unwrap();
        let kinds: Vec<_> = m.drain_events().into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![TriggerEvent::CardMoved, TriggerEvent::LeaveField]);
        assert_eq!(m.players[PlayerId(0)].zone_len(Zone::Field), 0);
    }

    #[test]
    fn test_move_returns_to_owner_zone() {
        let mut m = Match::new(4000);
        let id = m.create_card(PlayerId(1), resonator(), Zone::Field);
        m.card_mut(id).unwrap().base_controller = PlayerId(0);

        m.move_card(id, Zone::Hand).unwrap();
        assert_eq!(m.players[PlayerId(1)].zone_len(Zone::Hand), 1);
        assert_eq!(m.card(id).unwrap().controller, PlayerId(1));
    }

    // === Players ===

    #[test]
    fn test_draw_and_deck_out() {
        let mut m = Match::new(4000);
        let top = m.create_card(PlayerId(0), resonator(), Zone::MainDeck);

        assert_eq!(m.draw_cards(PlayerId(0), 2), 1);
        assert_eq!(m.card(top).unwrap().zone, Zone::Hand);
        assert!(m.players[PlayerId(0)].has_lost);
        assert_eq!(m.check_outcome(), Some(GameOutcome::Winner(PlayerId(1))));
    }

    #[test]
    fn test_simultaneous_loss_is_draw() {
        let mut m = Match::new(100);
        m.damage_player(PlayerId(0), 100, None);
        m.damage_player(PlayerId(1), 200, None);
        assert_eq!(m.check_outcome(), Some(GameOutcome::Draw));
        assert!(m.is_game_over());
    }

    #[test]
    fn test_life_changes_emit_events() {
        let mut m = Match::new(4000);
        m.gain_life(PlayerId(0), 300);
        m.damage_player(PlayerId(0), 100, None);
        assert_eq!(m.players[PlayerId(0)].life, 4200);

        let kinds: Vec<_> = m.drain_events().into_iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![TriggerEvent::LifeGained, TriggerEvent::PlayerDamaged, TriggerEvent::LifeLost]
        );
    }

    #[test]
    fn test_shuffle_is_deterministic() {
        let build = || {
            let mut m = Match::new(4000);
            for _ in 0..20 {
                m.create_card(PlayerId(0), resonator(), Zone::MainDeck);
            }
            m.shuffle_decks(9);
            m.players[PlayerId(0)].zone(Zone::MainDeck)
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_request_ids_are_unique() {
        let mut m = Match::new(4000);
        let a = m.next_request_id();
        let b = m.next_request_id();
        assert_ne!(a, b);
    }
}
