//! Actions waiting for player input.
//!
//! Playing a card or activating an ability may need choices the player did
//! not supply with the action: modes, a value for X, targets, or a will
//! colour. The action is then parked as a [`PendingAction`] and the missing
//! inputs are asked for one at a time, in that order. Nothing is paid or moved while an action is
//! pending, so cancelling it needs no undo.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::cards::Attribute;
use crate::core::{CardId, ModeList, PlayerId, RequestId, TargetList};
use crate::scripts::ModeChoice;
use crate::targeting::TargetRequirement;

/// Unique identifier for a pending action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingId(pub u32);

impl std::fmt::Display for PendingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pending({})", self.0)
    }
}

/// The action being built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingKind {
    PlayCard { card: CardId, from_graveyard: bool },
    ActivateAbility { source: CardId, ability_index: usize },
    ProduceWill { source: CardId },
}

/// Which input is missing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PendingNeed {
    Modes,
    XValue,
    Targets,
    WillColor,
}

/// An answer to a pending action's request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingInput {
    Targets(Vec<CardId>),
    Modes(Vec<usize>),
    XValue(u32),
    WillColor(Attribute),
}

impl PendingInput {
    /// The need this input fills.
    #[must_use]
    pub fn need(&self) -> PendingNeed {
        match self {
            Self::Targets(_) => PendingNeed::Targets,
            Self::Modes(_) => PendingNeed::Modes,
            Self::XValue(_) => PendingNeed::XValue,
            Self::WillColor(_) => PendingNeed::WillColor,
        }
    }
}

/// A player action waiting for targets, modes, or a will colour.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: PendingId,
    pub player: PlayerId,
    pub kind: PendingKind,

    pub needs_modes: bool,
    pub needs_x: bool,
    pub needs_targets: bool,
    pub needs_will_color: bool,

    /// Target requirement, when targets are needed.
    pub requirement: Option<TargetRequirement>,
    /// Mode choice, when modes are needed.
    pub mode_choice: Option<ModeChoice>,
    /// Colours on offer, when a colour is needed.
    pub will_colors: Vec<Attribute>,

    pub targets: TargetList,
    pub modes: ModeList,
    /// Chosen X, charged as extra generic will.
    pub x: u32,
    pub color: Option<Attribute>,

    /// The open request for the next missing input.
    pub request: Option<RequestId>,
}

impl PendingAction {
    /// Create a pending action with nothing missing yet.
    #[must_use]
    pub fn new(id: PendingId, player: PlayerId, kind: PendingKind) -> Self {
        Self {
            id,
            player,
            kind,
            needs_modes: false,
            needs_x: false,
            needs_targets: false,
            needs_will_color: false,
            requirement: None,
            mode_choice: None,
            will_colors: Vec::new(),
            targets: SmallVec::new(),
            modes: SmallVec::new(),
            x: 0,
            color: None,
            request: None,
        }
    }

    /// Ask for targets (builder pattern).
    #[must_use]
    pub fn needing_targets(mut self, requirement: TargetRequirement) -> Self {
        self.needs_targets = true;
        self.requirement = Some(requirement);
        self
    }

    /// Ask for modes (builder pattern).
    #[must_use]
    pub fn needing_modes(mut self, choice: ModeChoice) -> Self {
        self.needs_modes = true;
        self.mode_choice = Some(choice);
        self
    }

    /// Ask for X (builder pattern).
    #[must_use]
    pub fn needing_x(mut self) -> Self {
        self.needs_x = true;
        self
    }

    /// Ask for a will colour (builder pattern).
    #[must_use]
    pub fn needing_will_color(mut self, colors: Vec<Attribute>) -> Self {
        self.needs_will_color = true;
        self.will_colors = colors;
        self
    }

    /// The card at the center of the action.
    #[must_use]
    pub fn source(&self) -> CardId {
        match self.kind {
            PendingKind::PlayCard { card, .. } => card,
            PendingKind::ActivateAbility { source, .. } | PendingKind::ProduceWill { source } => source,
        }
    }

    /// The next input to ask for.
    #[must_use]
    pub fn next_need(&self) -> Option<PendingNeed> {
        if self.needs_modes {
            Some(PendingNeed::Modes)
        } else if self.needs_x {
            Some(PendingNeed::XValue)
        } else if self.needs_targets {
            Some(PendingNeed::Targets)
        } else if self.needs_will_color {
            Some(PendingNeed::WillColor)
        } else {
            None
        }
    }

    /// Check whether every input has been supplied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.next_need().is_none()
    }
}
