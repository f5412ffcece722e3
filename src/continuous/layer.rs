//! Continuous effect declarations.
//!
//! A [`ContinuousDeclaration`] is the static description a card script
//! carries. Registering one with the
//! [`ContinuousEffectManager`](super::ContinuousEffectManager) produces a
//! [`ContinuousEffect`]: the declaration plus its source, id and timestamp.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::filter::AffectedFilter;
use crate::cards::{Attribute, AttributeSet, CardType, CardTypeSet, CardInstance};
use crate::core::{CardId, Match, PlayerId, Side, Zone};
use crate::keywords::{Keyword, KeywordSet};
use crate::scripts::ScriptRegistry;

/// Unique identifier for a registered continuous effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EffectId(pub u32);

impl EffectId {
    /// Create a new effect ID.
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

impl std::fmt::Display for EffectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Effect({})", self.0)
    }
}

/// Application layer. Effects apply in ascending layer order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EffectLayer {
    Control,
    Type,
    Attribute,
    Ability,
    StatModify,
    StatSet,
}

/// How long an effect lasts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectDuration {
    /// Only while the source is on the field (or in the ruler area).
    WhileOnField,
    /// Removed by the end-of-turn cleanup.
    UntilEndOfTurn,
    /// Until explicitly unregistered.
    Permanent,
}

/// New controller for a control-changing effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlTarget {
    /// Whoever controls the source when the effect applies.
    SourceController,
    /// A fixed player.
    Player(PlayerId),
}

/// What an effect does to each affected card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerPayload {
    /// Change controller.
    Control(ControlTarget),
    /// Replace the card type.
    SetType(CardType),
    /// Replace the attribute set.
    SetAttributes(AttributeSet),
    /// Add attributes.
    AddAttributes(AttributeSet),
    /// Grant and remove keywords.
    Keywords { grant: KeywordSet, remove: KeywordSet },
    /// Add to ATK/DEF.
    Modify { atk: i32, def: i32 },
    /// Overwrite ATK and/or DEF.
    Set { atk: Option<i32>, def: Option<i32> },
}

impl LayerPayload {
    /// The layer this payload belongs in.
    #[must_use]
    pub const fn layer(&self) -> EffectLayer {
        match self {
            LayerPayload::Control(_) => EffectLayer::Control,
            LayerPayload::SetType(_) => EffectLayer::Type,
            LayerPayload::SetAttributes(_) | LayerPayload::AddAttributes(_) => {
                EffectLayer::Attribute
            }
            LayerPayload::Keywords { .. } => EffectLayer::Ability,
            LayerPayload::Modify { .. } => EffectLayer::StatModify,
            LayerPayload::Set { .. } => EffectLayer::StatSet,
        }
    }

    /// Apply to one card. `source_controller` is the source's controller at
    /// the time of application.
    pub(crate) fn apply(&self, card: &mut CardInstance, source_controller: PlayerId) {
        match self {
            LayerPayload::Control(ControlTarget::SourceController) => {
                card.controller = source_controller;
            }
            LayerPayload::Control(ControlTarget::Player(player)) => card.controller = *player,
            LayerPayload::SetType(card_type) => card.card_type = *card_type,
            LayerPayload::SetAttributes(set) => card.attributes = *set,
            LayerPayload::AddAttributes(set) => {
                for attribute in set.iter() {
                    card.attributes.insert(attribute);
                }
            }
            LayerPayload::Keywords { grant, remove } => {
                card.keywords.grant(*grant);
                card.keywords.remove(*remove);
            }
            LayerPayload::Modify { atk, def } => {
                card.current_atk += atk;
                card.current_def += def;
            }
            LayerPayload::Set { atk, def } => {
                if let Some(atk) = atk {
                    card.current_atk = *atk;
                }
                if let Some(def) = def {
                    card.current_def = *def;
                }
            }
        }
    }
}

/// A condition the source must meet for its effect to apply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectCondition {
    /// The source is rested.
    SourceRested,
    /// The source is recovered.
    SourceRecovered,
    /// The source's controller has at most this much life.
    LifeAtMost(i32),
    /// The source's controller controls at least `count` cards of `types`
    /// on the field, the source included.
    ControlsAtLeast { types: CardTypeSet, count: usize },
    /// It is the source controller's turn.
    YourTurn,
    /// A predicate registered with the script registry.
    Custom(String),
}

impl EffectCondition {
    /// Evaluate against the current state. `Err(key)` for an unknown custom
    /// predicate.
    pub fn evaluate(
        &self,
        source: &CardInstance,
        state: &Match,
        scripts: &dyn ScriptRegistry,
    ) -> Result<bool, String> {
        let controller = source.controller;
        Ok(match self {
            EffectCondition::SourceRested => source.is_rested,
            EffectCondition::SourceRecovered => !source.is_rested,
            EffectCondition::LifeAtMost(life) => state.players[controller].life <= *life,
            EffectCondition::ControlsAtLeast { types, count } => {
                state
                    .field_of(controller)
                    .into_iter()
                    .filter_map(|id| state.card(id))
                    .filter(|card| types.contains(card.card_type))
                    .count()
                    >= *count
            }
            EffectCondition::YourTurn => state.turn_player == controller,
            EffectCondition::Custom(key) => scripts
                .evaluate_predicate(key, source, state)
                .ok_or_else(|| key.clone())?,
        })
    }
}

/// A continuous effect as declared by a card script.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuousDeclaration {
    /// Display name.
    pub name: String,

    /// Declared layer. Must match the payload.
    pub layer: EffectLayer,

    /// How long it lasts.
    pub duration: EffectDuration,

    /// Which cards it affects, relative to the source.
    pub filter: AffectedFilter,

    /// Also affects the source.
    pub affects_self: bool,

    /// What it does.
    pub payload: LayerPayload,

    /// Applies only while this holds.
    pub condition: Option<EffectCondition>,
}

impl ContinuousDeclaration {
    /// A declaration whose layer follows from its payload.
    #[must_use]
    pub fn new(name: impl Into<String>, filter: AffectedFilter, payload: LayerPayload) -> Self {
        Self {
            name: name.into(),
            layer: payload.layer(),
            duration: EffectDuration::WhileOnField,
            filter,
            affects_self: false,
            payload,
            condition: None,
        }
    }

    /// Set the duration.
    #[must_use]
    pub fn with_duration(mut self, duration: EffectDuration) -> Self {
        self.duration = duration;
        self
    }

    /// Apply only while `condition` holds.
    #[must_use]
    pub fn with_condition(mut self, condition: EffectCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Replace the filter.
    #[must_use]
    pub fn with_filter(mut self, filter: AffectedFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Include the source itself.
    #[must_use]
    pub fn including_self(mut self) -> Self {
        self.affects_self = true;
        self
    }

    /// Check that the declared layer matches the payload.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.layer == self.payload.layer()
    }
}

// === Builders ===

/// Resonators you control get `+atk/+def`.
#[must_use]
pub fn buff(atk: i32, def: i32) -> ContinuousDeclaration {
    ContinuousDeclaration::new(
        format!("+{}/+{}", atk, def),
        AffectedFilter::resonators(Side::You),
        LayerPayload::Modify { atk, def },
    )
}

/// The source gets `+atk/+def`.
#[must_use]
pub fn buff_self(atk: i32, def: i32) -> ContinuousDeclaration {
    ContinuousDeclaration::new(
        format!("self +{}/+{}", atk, def),
        AffectedFilter::nothing(),
        LayerPayload::Modify { atk, def },
    )
    .including_self()
}

/// The listed cards get `+atk/+def` until end of turn.
#[must_use]
pub fn buff_cards(cards: &[CardId], atk: i32, def: i32) -> ContinuousDeclaration {
    ContinuousDeclaration::new(
        format!("+{}/+{} until end of turn", atk, def),
        AffectedFilter::cards(cards),
        LayerPayload::Modify { atk, def },
    )
    .with_duration(EffectDuration::UntilEndOfTurn)
}

/// Resonators you control gain `keyword`.
#[must_use]
pub fn grant_keyword(keyword: Keyword) -> ContinuousDeclaration {
    ContinuousDeclaration::new(
        format!("gain {}", keyword),
        AffectedFilter::resonators(Side::You),
        LayerPayload::Keywords {
            grant: keyword.into(),
            remove: KeywordSet::EMPTY,
        },
    )
}

/// Resonators your opponent controls lose `keyword`.
#[must_use]
pub fn remove_keyword(keyword: Keyword) -> ContinuousDeclaration {
    ContinuousDeclaration::new(
        format!("lose {}", keyword),
        AffectedFilter::resonators(Side::Opponent),
        LayerPayload::Keywords {
            grant: KeywordSet::EMPTY,
            remove: keyword.into(),
        },
    )
}

/// Cards matching `filter` have base ATK/DEF set.
#[must_use]
pub fn set_stats(filter: AffectedFilter, atk: Option<i32>, def: Option<i32>) -> ContinuousDeclaration {
    ContinuousDeclaration::new("set ATK/DEF", filter, LayerPayload::Set { atk, def })
}

/// The source's controller gains control of the listed cards.
#[must_use]
pub fn gain_control(cards: &[CardId]) -> ContinuousDeclaration {
    ContinuousDeclaration::new(
        "gain control",
        AffectedFilter::cards(cards).controlled_by(Side::Any),
        LayerPayload::Control(ControlTarget::SourceController),
    )
}

/// Your resonators of `race` get `+atk/+def`.
#[must_use]
pub fn race_buff(race: impl Into<String>, atk: i32, def: i32) -> ContinuousDeclaration {
    let race = race.into();
    ContinuousDeclaration::new(
        format!("{} +{}/+{}", race, atk, def),
        AffectedFilter::resonators(Side::You).with_race(race),
        LayerPayload::Modify { atk, def },
    )
}

/// Your resonators of `attribute` get `+atk/+def`.
#[must_use]
pub fn attribute_buff(attribute: Attribute, atk: i32, def: i32) -> ContinuousDeclaration {
    ContinuousDeclaration::new(
        format!("{} +{}/+{}", attribute, atk, def),
        AffectedFilter::resonators(Side::You).with_attribute(attribute),
        LayerPayload::Modify { atk, def },
    )
}

/// Your resonators with `keyword` get `+atk/+def`.
#[must_use]
pub fn keyword_buff(keyword: Keyword, atk: i32, def: i32) -> ContinuousDeclaration {
    ContinuousDeclaration::new(
        format!("{} +{}/+{}", keyword, atk, def),
        AffectedFilter::resonators(Side::You).with_keyword(keyword),
        LayerPayload::Modify { atk, def },
    )
}

/// A registered continuous effect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuousEffect {
    /// Registration id.
    pub id: EffectId,

    /// The card that created the effect.
    pub source: CardId,

    /// Registration order, monotonic.
    pub timestamp: u64,

    /// Effects in the same layer that must apply first.
    pub depends_on: SmallVec<[EffectId; 2]>,

    /// The declaration.
    pub declaration: ContinuousDeclaration,
}

impl ContinuousEffect {
    /// Sort key within a pass.
    #[must_use]
    pub fn order_key(&self) -> (EffectLayer, u64) {
        (self.declaration.layer, self.timestamp)
    }

    /// Check the duration against the source's current zone.
    #[must_use]
    pub fn source_satisfies_duration(&self, state: &Match) -> bool {
        match self.declaration.duration {
            EffectDuration::WhileOnField => state
                .card(self.source)
                .is_some_and(|card| matches!(card.zone, Zone::Field | Zone::RulerArea)),
            EffectDuration::UntilEndOfTurn | EffectDuration::Permanent => {
                state.card(self.source).is_some()
            }
        }
    }
}
