//! Rules predicates derived from keywords.
//!
//! Every function here is pure: it reads the *effective* keywords written by
//! the last continuous-effect pass and never mutates a card.

use serde::{Deserialize, Serialize};

use super::Keyword;
use crate::cards::CardInstance;
use crate::core::{CardId, PlayerId, Zone};

/// Which combat damage step a card deals damage in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageStep {
    FirstStrike,
    Normal,
}

/// Follow-up for a destroyed Eternal card: return it to its owner's hand at
/// end of turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EternalReturn {
    pub card: CardId,
    pub owner: PlayerId,
}

/// Keyword rules checks.
pub struct KeywordProcessor;

impl KeywordProcessor {
    /// Can declare an attack this turn: an untapped combatant on the field
    /// that has been there since the start of the turn, or has Swiftness.
    #[must_use]
    pub fn can_attack(card: &CardInstance, turn: u32) -> bool {
        card.zone == Zone::Field
            && card.card_type.is_combatant()
            && !card.is_rested
            && (!card.is_summoning_sick(turn) || card.has_keyword(Keyword::Swiftness))
    }

    /// Can `blocker` block `attacker`.
    ///
    /// Stealth attackers cannot be blocked; Flying attackers need a Flying
    /// blocker.
    #[must_use]
    pub fn can_block(blocker: &CardInstance, attacker: &CardInstance) -> bool {
        if blocker.zone != Zone::Field || !blocker.card_type.is_combatant() || blocker.is_rested {
            return false;
        }
        if attacker.has_keyword(Keyword::Stealth) {
            return false;
        }
        !attacker.has_keyword(Keyword::Flying) || blocker.has_keyword(Keyword::Flying)
    }

    /// Can `card` be targeted by something `by` controls. Barrier stops
    /// opponents.
    #[must_use]
    pub fn can_be_targeted(card: &CardInstance, by: PlayerId) -> bool {
        !(card.has_keyword(Keyword::Barrier) && card.controller != by)
    }

    /// Can the destruction check destroy `card`.
    #[must_use]
    pub fn can_be_destroyed(card: &CardInstance) -> bool {
        !card.has_keyword(Keyword::Imperishable)
    }

    /// Which step `card` deals combat damage in.
    #[must_use]
    pub fn damage_order(card: &CardInstance) -> DamageStep {
        if card.has_keyword(Keyword::FirstStrike) {
            DamageStep::FirstStrike
        } else {
            DamageStep::Normal
        }
    }

    /// Excess damage a Pierce attacker sends through `blocker`, measured
    /// against the blocker's DEF before this damage is marked.
    #[must_use]
    pub fn pierce_damage(attacker: &CardInstance, damage: i32, blocker: &CardInstance) -> i32 {
        if attacker.has_keyword(Keyword::Pierce) {
            (damage - blocker.remaining_def()).max(0)
        } else {
            0
        }
    }

    /// Life a Drain card's controller gains for dealing `damage`.
    #[must_use]
    pub fn drain_amount(card: &CardInstance, damage: i32) -> i32 {
        if card.has_keyword(Keyword::Drain) {
            damage.max(0)
        } else {
            0
        }
    }

    /// Can `attacker` attack `target` directly: Precision, or Target Attack
    /// against a rested card.
    #[must_use]
    pub fn can_attack_card(attacker: &CardInstance, target: &CardInstance) -> bool {
        if target.zone != Zone::Field
            || !target.card_type.is_combatant()
            || target.controller == attacker.controller
        {
            return false;
        }
        attacker.has_keyword(Keyword::Precision)
            || (attacker.has_keyword(Keyword::TargetAttack) && target.is_rested)
    }

    /// Does dealing battle damage to a combatant destroy both cards.
    #[must_use]
    pub fn explodes(card: &CardInstance) -> bool {
        card.has_keyword(Keyword::Explode)
    }

    /// Can `card` be played from its graveyard.
    #[must_use]
    pub fn can_play_from_graveyard(card: &CardInstance) -> bool {
        card.zone == Zone::Graveyard && card.has_keyword(Keyword::Remnant)
    }

    /// Playable at instant speed.
    #[must_use]
    pub fn is_quickcast(card: &CardInstance) -> bool {
        card.card_type.is_instant() || card.has_keyword(Keyword::Quickcast)
    }

    /// Follow-ups owed when `card` is destroyed. Read the card before it
    /// leaves the field, while its keywords are still effective.
    #[must_use]
    pub fn on_destroyed(card: &CardInstance) -> Option<EternalReturn> {
        card.has_keyword(Keyword::Eternal).then_some(EternalReturn {
            card: card.uid,
            owner: card.owner,
        })
    }
}
