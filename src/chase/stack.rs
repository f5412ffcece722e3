//! The chase: a LIFO stack of spells and abilities waiting to resolve.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use crate::core::{CardId, PlayerId, TargetList};
use crate::effects::EffectOp;
use crate::targeting::TargetRequirement;
use crate::triggers::PendingTrigger;

/// Unique identifier for a chase item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChaseItemId(pub u32);

impl ChaseItemId {
    /// Create a new chase item ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ChaseItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChaseItem({})", self.0)
    }
}

/// What kind of thing is on the chase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChaseItemKind {
    /// A played card.
    Spell,
    /// An activated ability.
    Ability,
    /// A ruler's Judgment.
    Judgment,
    /// A triggered ability.
    Trigger,
}

/// What a chase item does when it resolves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChasePayload {
    /// Run these operations.
    Ops(Vec<EffectOp>),
    /// Flip the source ruler into its J-ruler.
    Judgment,
    /// Run a fired trigger. Intervening-if triggers re-check their
    /// condition first.
    Trigger(Box<PendingTrigger>),
}

/// An item on the chase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaseItem {
    /// Assigned by [`Chase::push`].
    pub id: ChaseItemId,

    /// The card the item comes from.
    pub source: CardId,

    /// Who controls the item.
    pub controller: PlayerId,

    /// Spell, ability, Judgment, or trigger.
    pub kind: ChaseItemKind,

    /// Chosen targets.
    pub targets: TargetList,

    /// The requirement the targets were chosen for. Targets are checked
    /// against it again on resolution.
    pub requirement: Option<TargetRequirement>,

    /// What happens on resolution.
    pub payload: ChasePayload,

    /// Played from the graveyard (Remnant).
    pub from_graveyard: bool,
}

impl ChaseItem {
    /// Create an item with no targets.
    #[must_use]
    pub fn new(source: CardId, controller: PlayerId, kind: ChaseItemKind, payload: ChasePayload) -> Self {
        Self {
            id: ChaseItemId(0),
            source,
            controller,
            kind,
            targets: SmallVec::new(),
            requirement: None,
            payload,
            from_graveyard: false,
        }
    }

    /// A played card.
    #[must_use]
    pub fn spell(source: CardId, controller: PlayerId, ops: Vec<EffectOp>) -> Self {
        Self::new(source, controller, ChaseItemKind::Spell, ChasePayload::Ops(ops))
    }

    /// An activated ability.
    #[must_use]
    pub fn ability(source: CardId, controller: PlayerId, ops: Vec<EffectOp>) -> Self {
        Self::new(source, controller, ChaseItemKind::Ability, ChasePayload::Ops(ops))
    }

    /// A fired trigger.
    #[must_use]
    pub fn trigger(pending: PendingTrigger) -> Self {
        Self::new(
            pending.card,
            pending.controller,
            ChaseItemKind::Trigger,
            ChasePayload::Trigger(Box::new(pending)),
        )
    }

    /// Set targets and the requirement they satisfy (builder pattern).
    #[must_use]
    pub fn with_targets(mut self, targets: TargetList, requirement: Option<TargetRequirement>) -> Self {
        self.targets = targets;
        self.requirement = requirement;
        self
    }

    /// Mark as played from the graveyard (builder pattern).
    #[must_use]
    pub fn from_graveyard(mut self) -> Self {
        self.from_graveyard = true;
        self
    }

    /// Operations run on resolution. Judgment has none.
    #[must_use]
    pub fn ops(&self) -> &[EffectOp] {
        match &self.payload {
            ChasePayload::Ops(ops) => ops,
            ChasePayload::Trigger(pending) => &pending.ability.ops,
            ChasePayload::Judgment => &[],
        }
    }
}

/// The chase area.
///
/// Index 0 is the bottom, the last item is the top.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Chase {
    items: Vec<ChaseItem>,
    next_id: u32,
}

impl Chase {
    /// Create an empty chase.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check for an empty chase.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Put an item on top. Returns its id.
    pub fn push(&mut self, mut item: ChaseItem) -> ChaseItemId {
        let id = ChaseItemId(self.next_id);
        self.next_id += 1;
        item.id = id;
        debug!(item = %id, source = %item.source, kind = ?item.kind, depth = self.items.len() + 1, "chase push");
        self.items.push(item);
        id
    }

    /// Take the top item.
    pub fn pop(&mut self) -> Option<ChaseItem> {
        self.items.pop()
    }

    /// The top item without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&ChaseItem> {
        self.items.last()
    }

    /// All items, bottom to top.
    #[must_use]
    pub fn items(&self) -> &[ChaseItem] {
        &self.items
    }

    /// Check whether `card` is the source of any item.
    #[must_use]
    pub fn contains_source(&self, card: CardId) -> bool {
        self.items.iter().any(|item| item.source == card)
    }

    /// Take the spell item whose card is `card` out of the chase, wherever
    /// it sits.
    pub fn remove_spell(&mut self, card: CardId) -> Option<ChaseItem> {
        let index = self
            .items
            .iter()
            .position(|item| item.kind == ChaseItemKind::Spell && item.source == card)?;
        Some(self.items.remove(index))
    }

    /// Drop every item.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}
