//! Card instances - runtime card state.
//!
//! `CardInstance` represents one physical card in a match. It tracks the
//! mutable state the rules touch directly (zone, rest state, damage,
//! counters) and the *derived* state written by the continuous-effect pass
//! (`controller`, `card_type`, `attributes`, `current_atk`, `current_def`,
//! keyword overlay).
//!
//! Derived fields are never adjusted incrementally. They are reset to base
//! by [`CardInstance::reset_to_base`] and rebuilt by
//! [`ContinuousEffectManager::apply_all_effects`](crate::continuous::ContinuousEffectManager::apply_all_effects).

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::attributes::AttributeSet;
use super::definition::{CardTemplate, CardType};
use crate::core::{CardId, PlayerId, Zone};
use crate::keywords::{Keyword, KeywordState};

/// Permanent `+X/+Y` counters on a card.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatCounters {
    pub atk: i32,
    pub def: i32,
}

/// A card in a match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardInstance {
    /// Unique id for this instance.
    pub uid: CardId,

    /// Printed data.
    pub template: CardTemplate,

    /// Who started the game with this card.
    pub owner: PlayerId,

    /// Current controller (derived).
    pub controller: PlayerId,

    /// Controller before control-changing effects.
    pub base_controller: PlayerId,

    /// Current zone.
    pub zone: Zone,

    /// Rested (tapped).
    pub is_rested: bool,

    /// Turn the card last entered the field.
    pub entered_turn: Option<u32>,

    /// Damage marked this turn.
    pub damage: i32,

    /// Current ATK (derived).
    pub current_atk: i32,

    /// Current DEF before damage (derived).
    pub current_def: i32,

    /// Current type (derived).
    pub card_type: CardType,

    /// Current attributes (derived).
    pub attributes: AttributeSet,

    /// Keyword state (overlay derived).
    pub keywords: KeywordState,

    /// Named counters.
    #[serde(default)]
    pub counters: FxHashMap<String, i32>,

    /// `+X/+Y` counters.
    pub stat_counters: StatCounters,
}

impl CardInstance {
    /// Create an instance with base values.
    pub fn new(uid: CardId, template: CardTemplate, owner: PlayerId, zone: Zone) -> Self {
        let mut card = Self {
            uid,
            card_type: template.card_type,
            attributes: template.attributes,
            current_atk: template.atk,
            current_def: template.def,
            keywords: KeywordState::new(template.keywords),
            template,
            owner,
            controller: owner,
            base_controller: owner,
            zone,
            is_rested: false,
            entered_turn: None,
            damage: 0,
            counters: FxHashMap::default(),
            stat_counters: StatCounters::default(),
        };
        card.reset_to_base();
        card
    }

    /// Printed name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.template.name
    }

    /// Script code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.template.code
    }

    /// Restore every derived field to its base value.
    pub fn reset_to_base(&mut self) {
        self.current_atk = self.template.atk;
        self.current_def = self.template.def;
        self.card_type = self.template.card_type;
        self.attributes = self.template.attributes;
        self.keywords = KeywordState::new(self.template.keywords);
        self.controller = self.base_controller;
    }

    /// Replace the printed data (Judgment). Derived state is reset.
    pub fn transform(&mut self, template: CardTemplate) {
        self.template = template;
        self.reset_to_base();
    }

    /// DEF left after marked damage.
    #[must_use]
    pub fn remaining_def(&self) -> i32 {
        self.current_def - self.damage
    }

    /// Check for an effective keyword.
    #[must_use]
    pub fn has_keyword(&self, keyword: Keyword) -> bool {
        self.keywords.has(keyword)
    }

    /// Entered the field this turn.
    #[must_use]
    pub fn is_summoning_sick(&self, turn: u32) -> bool {
        self.entered_turn == Some(turn)
    }

    /// A named counter's value (0 if absent).
    #[must_use]
    pub fn counter(&self, name: &str) -> i32 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    /// Adjust a named counter, never below 0.
    pub fn add_counter(&mut self, name: &str, amount: i32) {
        let slot = self.counters.entry(name.to_string()).or_insert(0);
        *slot = (*slot + amount).max(0);
    }

    /// Clear per-zone state on a zone change.
    pub(crate) fn reset_for_zone_change(&mut self) {
        self.is_rested = false;
        self.damage = 0;
        self.entered_turn = None;
        self.counters.clear();
        self.stat_counters = StatCounters::default();
        self.base_controller = self.owner;
        self.reset_to_base();
    }
}
