//! Game events.
//!
//! Every observable change in the match is reported as a [`GameEvent`].
//! Events are queued on the [`Match`](crate::core::Match) as they happen and
//! drained by the engine at its next checkpoint, where they are dispatched
//! to the trigger engine.
//!
//! ## Event Data
//!
//! Events carry contextual information:
//! - `kind`: What happened
//! - `player`: The player the event is about (drawer, damaged player, ...)
//! - `card`: The card the event is about
//! - `other`: A second card (the blocker, the damage source, ...)
//! - `amount`: Damage, life, or will amount
//! - `from_zone` / `to_zone`: Zone-change information

use serde::{Deserialize, Serialize};

use crate::core::{CardId, PlayerId, Zone};

/// Kinds of game events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerEvent {
    // Turn structure
    TurnStart,
    TurnEnd,
    DrawPhase,
    MainPhase,
    EndPhase,

    // Combat
    AttackDeclared,
    BlockerDeclared,
    CombatEnd,

    // Card movement and state
    EnterField,
    LeaveField,
    Destroyed,
    Banished,
    ReturnedToHand,
    Recovered,
    Rested,
    CardMoved,

    // Damage
    DamageDealt,
    DamageReceived,
    PlayerDamaged,

    // Actions
    SpellCast,
    AbilityActivated,
    StoneCalled,
    WillProduced,
    Judgment,

    // Players
    LifeGained,
    LifeLost,
    CardDrawn,
    CardDiscarded,
}

impl TriggerEvent {
    const fn bit(self) -> u64 {
        1 << (self as u64)
    }
}

impl std::fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// A set of event kinds a trigger listens for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerEvents(u64);

impl TriggerEvents {
    /// No events.
    pub const NONE: TriggerEvents = TriggerEvents(0);

    /// Build a set from a slice.
    #[must_use]
    pub fn from_slice(events: &[TriggerEvent]) -> Self {
        events.iter().fold(Self::NONE, |set, e| set.with(*e))
    }

    /// Add an event kind.
    #[must_use]
    pub const fn with(self, event: TriggerEvent) -> Self {
        Self(self.0 | event.bit())
    }

    /// Check membership.
    #[must_use]
    pub const fn contains(self, event: TriggerEvent) -> bool {
        self.0 & event.bit() != 0
    }
}

impl From<TriggerEvent> for TriggerEvents {
    fn from(event: TriggerEvent) -> Self {
        Self::NONE.with(event)
    }
}

/// A game event with contextual data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// What happened.
    pub kind: TriggerEvent,

    /// The player the event is about.
    pub player: Option<PlayerId>,

    /// The card the event is about.
    pub card: Option<CardId>,

    /// A second card involved in the event.
    pub other: Option<CardId>,

    /// Numeric payload.
    pub amount: i32,

    /// Zone the card left.
    pub from_zone: Option<Zone>,

    /// Zone the card entered.
    pub to_zone: Option<Zone>,
}

impl GameEvent {
    /// Create an event with just a kind.
    #[must_use]
    pub fn new(kind: TriggerEvent) -> Self {
        Self {
            kind,
            player: None,
            card: None,
            other: None,
            amount: 0,
            from_zone: None,
            to_zone: None,
        }
    }

    /// Set the player (builder pattern).
    #[must_use]
    pub fn with_player(mut self, player: PlayerId) -> Self {
        self.player = Some(player);
        self
    }

    /// Set the card (builder pattern).
    #[must_use]
    pub fn with_card(mut self, card: CardId) -> Self {
        self.card = Some(card);
        self
    }

    /// Set the second card (builder pattern).
    #[must_use]
    pub fn with_other(mut self, other: CardId) -> Self {
        self.other = Some(other);
        self
    }

    /// Set the amount (builder pattern).
    #[must_use]
    pub fn with_amount(mut self, amount: i32) -> Self {
        self.amount = amount;
        self
    }

    /// Set zone-change information (builder pattern).
    #[must_use]
    pub fn with_zones(mut self, from: Zone, to: Zone) -> Self {
        self.from_zone = Some(from);
        self.to_zone = Some(to);
        self
    }

    /// A zone change.
    #[must_use]
    pub fn zone_change(kind: TriggerEvent, card: CardId, owner: PlayerId, from: Zone, to: Zone) -> Self {
        Self::new(kind)
            .with_card(card)
            .with_player(owner)
            .with_zones(from, to)
    }

    /// `card` dealt `amount` damage to `other` (or the reverse, for
    /// `DamageReceived`).
    #[must_use]
    pub fn damage(kind: TriggerEvent, card: CardId, other: CardId, amount: i32) -> Self {
        Self::new(kind)
            .with_card(card)
            .with_other(other)
            .with_amount(amount)
    }
}
