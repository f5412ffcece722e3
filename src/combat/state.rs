//! Combat data: declarations and the per-battle state.

use serde::{Deserialize, Serialize};

use crate::core::{CardId, PlayerId, RequestId};

/// Sub-phase of a battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatStep {
    Beginning,
    DeclareAttackers,
    DeclareBlockers,
    FirstStrikeDamage,
    Damage,
    End,
}

/// What an attacker is attacking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackTarget {
    /// The defending player.
    Player(PlayerId),
    /// A J-ruler or resonator (Precision or Target Attack).
    Card(CardId),
}

/// One attacker as declared by the attacking player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttackDeclaration {
    pub attacker: CardId,
    pub target: AttackTarget,
}

impl AttackDeclaration {
    /// Attack a player.
    #[must_use]
    pub const fn player(attacker: CardId, player: PlayerId) -> Self {
        Self {
            attacker,
            target: AttackTarget::Player(player),
        }
    }

    /// Attack a card.
    #[must_use]
    pub const fn card(attacker: CardId, target: CardId) -> Self {
        Self {
            attacker,
            target: AttackTarget::Card(target),
        }
    }
}

/// One blocker as declared by the defending player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockDeclaration {
    pub blocker: CardId,
    /// Index into the declared attacks.
    pub attack_index: usize,
}

/// A declared attack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attack {
    pub attacker: CardId,
    pub target: AttackTarget,
    pub blocker: Option<CardId>,
}

impl Attack {
    /// The card fighting the attacker, if any.
    #[must_use]
    pub fn opponent_card(&self) -> Option<CardId> {
        match (self.blocker, self.target) {
            (Some(blocker), _) => Some(blocker),
            (None, AttackTarget::Card(card)) => Some(card),
            (None, AttackTarget::Player(_)) => None,
        }
    }
}

/// State of the battle in progress.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatState {
    /// Current sub-phase.
    pub step: CombatStep,

    /// The attacking player.
    pub active_player: PlayerId,

    /// The defending player.
    pub defending_player: PlayerId,

    /// Declared attacks, in declaration order.
    pub attacks: Vec<Attack>,

    /// Outstanding attacker or blocker request.
    pub request: Option<RequestId>,

    /// Cards legal for the outstanding request.
    pub legal: Vec<CardId>,
}

impl CombatState {
    /// A battle for `active_player`.
    #[must_use]
    pub fn new(active_player: PlayerId) -> Self {
        Self {
            step: CombatStep::Beginning,
            active_player,
            defending_player: active_player.opponent(),
            attacks: Vec::new(),
            request: None,
            legal: Vec::new(),
        }
    }

    /// Check whether `card` is in any attack.
    #[must_use]
    pub fn is_in_combat(&self, card: CardId) -> bool {
        self.attacks.iter().any(|a| {
            a.attacker == card || a.blocker == Some(card) || a.target == AttackTarget::Card(card)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opponent_card() {
        let direct = Attack {
            attacker: CardId(1),
            target: AttackTarget::Player(PlayerId(1)),
            blocker: None,
        };
        assert_eq!(direct.opponent_card(), None);

        let blocked = Attack {
            blocker: Some(CardId(3)),
            ..direct
        };
        assert_eq!(blocked.opponent_card(), Some(CardId(3)));

        let precise = Attack {
            target: AttackTarget::Card(CardId(4)),
            ..direct
        };
        assert_eq!(precise.opponent_card(), Some(CardId(4)));
    }

    #[test]
    fn test_new_state() {
        let mut state = CombatState::new(PlayerId(1));
        assert_eq!(state.defending_player, PlayerId(0));
        state.attacks.push(Attack {
            attacker: CardId(2),
            target: AttackTarget::Card(CardId(5)),
            blocker: None,
        });
        assert!(state.is_in_combat(CardId(5)));
        assert!(!state.is_in_combat(CardId(6)));
    }
}
