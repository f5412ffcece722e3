//! Player actions and the action history.
//!
//! A [`PlayerAction`] is everything a player can submit to
//! [`Game::take_action`](crate::rules::Game::take_action). Inputs the player
//! has not decided yet (targets, modes, will color) are left as `None`; the
//! engine then suspends the action as a pending action and asks for them.
//!
//! ```
//! use chase_rules::core::{ActionType, CardId, PlayerAction};
//!
//! let play = PlayerAction::play(CardId::new(4));
//! assert_eq!(play.action_type(), ActionType::PlayCard);
//! assert_eq!(PlayerAction::Pass.action_type(), ActionType::Pass);
//! ```

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::entity::CardId;
use super::player::PlayerId;
use crate::cards::Attribute;
use crate::combat::{AttackDeclaration, BlockDeclaration};

/// Chosen targets. Most effects name three or fewer.
pub type TargetList = SmallVec<[CardId; 3]>;

/// Chosen mode indices.
pub type ModeList = SmallVec<[usize; 2]>;

/// Action categories, used for legality queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    /// Play a card from hand (or graveyard with Remnant).
    PlayCard,
    /// Activate an ability of a card on the field.
    ActivateAbility,
    /// Produce will from a stone or other will source.
    ProduceWill,
    /// Call a magic stone by resting the ruler.
    CallStone,
    /// Flip the ruler into its J-ruler.
    Judgment,
    /// Declare attackers.
    Attack,
    /// Declare blockers.
    Block,
    /// Pass priority.
    Pass,
}

impl ActionType {
    /// Every action type.
    pub const ALL: [ActionType; 8] = [
        ActionType::Pass,
        ActionType::ProduceWill,
        ActionType::PlayCard,
        ActionType::ActivateAbility,
        ActionType::CallStone,
        ActionType::Judgment,
        ActionType::Attack,
        ActionType::Block,
    ];
}

/// A concrete action submitted by a player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerAction {
    /// Pass priority.
    Pass,

    /// Rest `source` to add will. `color` may be left open for multi-color
    /// sources.
    ProduceWill {
        source: CardId,
        color: Option<Attribute>,
    },

    /// Play `card`. Missing targets or modes are requested afterwards.
    PlayCard {
        card: CardId,
        targets: Option<TargetList>,
        modes: Option<ModeList>,
    },

    /// Activate the `ability_index`-th activated ability of `source`.
    ActivateAbility {
        source: CardId,
        ability_index: usize,
        targets: Option<TargetList>,
    },

    /// Call a magic stone.
    CallStone,

    /// Perform Judgment.
    Judgment,

    /// Declare attackers.
    Attack { declarations: Vec<AttackDeclaration> },

    /// Declare blockers.
    Block { blocks: Vec<BlockDeclaration> },
}

impl PlayerAction {
    /// Play a card and supply targets and modes later.
    #[must_use]
    pub fn play(card: CardId) -> Self {
        Self::PlayCard {
            card,
            targets: None,
            modes: None,
        }
    }

    /// Play a card with its targets already chosen.
    #[must_use]
    pub fn play_targeting(card: CardId, targets: &[CardId]) -> Self {
        Self::PlayCard {
            card,
            targets: Some(SmallVec::from_slice(targets)),
            modes: None,
        }
    }

    /// Activate an ability and supply targets later.
    #[must_use]
    pub fn activate(source: CardId, ability_index: usize) -> Self {
        Self::ActivateAbility {
            source,
            ability_index,
            targets: None,
        }
    }

    /// Produce will, choosing the color later if needed.
    #[must_use]
    pub fn produce_will(source: CardId) -> Self {
        Self::ProduceWill {
            source,
            color: None,
        }
    }

    /// The category of this action.
    #[must_use]
    pub fn action_type(&self) -> ActionType {
        match self {
            Self::Pass => ActionType::Pass,
            Self::ProduceWill { .. } => ActionType::ProduceWill,
            Self::PlayCard { .. } => ActionType::PlayCard,
            Self::ActivateAbility { .. } => ActionType::ActivateAbility,
            Self::CallStone => ActionType::CallStone,
            Self::Judgment => ActionType::Judgment,
            Self::Attack { .. } => ActionType::Attack,
            Self::Block { .. } => ActionType::Block,
        }
    }
}

/// Record of a completed action for history tracking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// The player who took the action.
    pub player: PlayerId,

    /// What they did.
    pub action: ActionType,

    /// The card at the center of the action, if any.
    pub card: Option<CardId>,

    /// Turn number when the action was taken.
    pub turn: u32,
}

impl ActionRecord {
    /// Create a new action record.
    #[must_use]
    pub fn new(player: PlayerId, action: ActionType, card: Option<CardId>, turn: u32) -> Self {
        Self {
            player,
            action,
            card,
            turn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_types() {
        assert_eq!(
            PlayerAction::activate(CardId(1), 0).action_type(),
            ActionType::ActivateAbility
        );
        assert_eq!(
            PlayerAction::produce_will(CardId(1)).action_type(),
            ActionType::ProduceWill
        );
        assert_eq!(
            PlayerAction::Attack { declarations: vec![] }.action_type(),
            ActionType::Attack
        );
    }

    #[test]
    fn test_play_targeting() {
        let action = PlayerAction::play_targeting(CardId(2), &[CardId(7)]);
        match action {
            PlayerAction::PlayCard { card, targets, modes } => {
                assert_eq!(card, CardId(2));
                assert_eq!(targets.unwrap().as_slice(), &[CardId(7)]);
                assert!(modes.is_none());
            }
            _ => panic!("expected PlayCard"),
        }
    }

    #[test]
    fn test_action_serialization() {
        let action = PlayerAction::play(CardId(3));
        let json = serde_json::to_string(&action).unwrap();
        let back: PlayerAction = serde_json::from_str(&json).unwrap();
        assert_eq!(action, back);
    }
}
