//! Target filters.
//!
//! A `TargetFilter` is a conjunction of optional predicates. An unset
//! predicate accepts every card. Filters are pure data: they can be stored
//! in card scripts, pending requests, and chase frames, and evaluated
//! against any match state.
//!
//! Barrier is *not* a filter predicate. It is applied by the
//! [`TargetingManager`](super::TargetingManager) on top of the filter,
//! because it depends on who is targeting rather than on the card.

use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

use crate::cards::{Attribute, AttributeSet, CardInstance, CardTypeSet};
use crate::core::{Match, PlayerId, Side, Zone};
use crate::keywords::{Keyword, KeywordSet};
use crate::scripts::ScriptRegistry;

/// Filter for valid targets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetFilter {
    /// Zones the target may be in.
    pub zones: SmallVec<[Zone; 2]>,

    /// Controller relative to the targeting player.
    pub controller: Side,

    /// Accepted card types.
    pub types: Option<CardTypeSet>,

    /// The card must have one of these attributes.
    pub attributes: Option<AttributeSet>,

    /// The card must have one of these races.
    pub races: Vec<String>,

    pub min_atk: Option<i32>,
    pub max_atk: Option<i32>,
    pub min_def: Option<i32>,
    pub max_def: Option<i32>,
    pub min_total_cost: Option<u32>,
    pub max_total_cost: Option<u32>,

    /// Case-insensitive substring of the name.
    pub name_contains: Option<String>,

    /// Case-insensitive exact name.
    pub name_exact: Option<String>,

    /// The card must have all of these keywords.
    pub has_keywords: KeywordSet,

    /// The card must have none of these keywords.
    pub lacks_keywords: KeywordSet,

    /// `Some(true)` for rested only, `Some(false)` for recovered only.
    pub is_rested: Option<bool>,

    /// Predicate key evaluated by the script registry.
    pub custom: Option<String>,
}

impl Default for TargetFilter {
    fn default() -> Self {
        Self {
            zones: smallvec![Zone::Field],
            controller: Side::Any,
            types: None,
            attributes: None,
            races: Vec::new(),
            min_atk: None,
            max_atk: None,
            min_def: None,
            max_def: None,
            min_total_cost: None,
            max_total_cost: None,
            name_contains: None,
            name_exact: None,
            has_keywords: KeywordSet::EMPTY,
            lacks_keywords: KeywordSet::EMPTY,
            is_rested: None,
            custom: None,
        }
    }
}

impl TargetFilter {
    /// Any card on the field.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Any resonator on the field.
    #[must_use]
    pub fn resonator() -> Self {
        Self::new().with_types(CardTypeSet::RESONATOR)
    }

    /// Any resonator or J-ruler on the field.
    #[must_use]
    pub fn j_resonator() -> Self {
        Self::new().with_types(CardTypeSet::COMBATANT)
    }

    /// Set the zones.
    #[must_use]
    pub fn in_zones(mut self, zones: &[Zone]) -> Self {
        self.zones = SmallVec::from_slice(zones);
        self
    }

    /// Set the controller side.
    #[must_use]
    pub fn controlled_by(mut self, side: Side) -> Self {
        self.controller = side;
        self
    }

    /// Restrict card types.
    #[must_use]
    pub fn with_types(mut self, types: CardTypeSet) -> Self {
        self.types = Some(types);
        self
    }

    /// Require an attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes = Some(self.attributes.unwrap_or_default().with(attribute));
        self
    }

    /// Require a race.
    #[must_use]
    pub fn with_race(mut self, race: impl Into<String>) -> Self {
        self.races.push(race.into());
        self
    }

    /// Cap DEF.
    #[must_use]
    pub fn with_max_def(mut self, max_def: i32) -> Self {
        self.max_def = Some(max_def);
        self
    }

    /// Cap ATK.
    #[must_use]
    pub fn with_max_atk(mut self, max_atk: i32) -> Self {
        self.max_atk = Some(max_atk);
        self
    }

    /// Cap total cost.
    #[must_use]
    pub fn with_max_total_cost(mut self, cost: u32) -> Self {
        self.max_total_cost = Some(cost);
        self
    }

    /// Require a keyword.
    #[must_use]
    pub fn with_keyword(mut self, keyword: Keyword) -> Self {
        self.has_keywords.insert(keyword);
        self
    }

    /// Forbid a keyword.
    #[must_use]
    pub fn without_keyword(mut self, keyword: Keyword) -> Self {
        self.lacks_keywords.insert(keyword);
        self
    }

    /// Require rested (`true`) or recovered (`false`).
    #[must_use]
    pub fn rested(mut self, rested: bool) -> Self {
        self.is_rested = Some(rested);
        self
    }

    /// Require an exact name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name_exact = Some(name.into());
        self
    }

    /// Require a name substring.
    #[must_use]
    pub fn name_containing(mut self, text: impl Into<String>) -> Self {
        self.name_contains = Some(text.into());
        self
    }

    /// Add a custom predicate key.
    #[must_use]
    pub fn with_custom(mut self, key: impl Into<String>) -> Self {
        self.custom = Some(key.into());
        self
    }

    /// Check every built-in predicate against `card`.
    #[must_use]
    pub fn matches_static(&self, card: &CardInstance, targeting_player: PlayerId) -> bool {
        if !self.zones.contains(&card.zone) {
            return false;
        }
        if !self.controller.matches(card.controller, targeting_player) {
            return false;
        }
        if let Some(types) = self.types {
            if !types.contains(card.card_type) {
                return false;
            }
        }
        if let Some(attributes) = self.attributes {
            if !attributes.intersects(card.attributes) {
                return false;
            }
        }
        if !self.races.is_empty() && !self.races.iter().any(|r| card.template.has_race(r)) {
            return false;
        }
        if !in_range(card.current_atk, self.min_atk, self.max_atk)
            || !in_range(card.current_def, self.min_def, self.max_def)
        {
            return false;
        }
        let cost = card.template.cost.total();
        if self.min_total_cost.is_some_and(|min| cost < min)
            || self.max_total_cost.is_some_and(|max| cost > max)
        {
            return false;
        }
        let name = card.name().to_lowercase();
        if let Some(exact) = &self.name_exact {
            if name != exact.to_lowercase() {
                return false;
            }
        }
        if let Some(part) = &self.name_contains {
            if !name.contains(&part.to_lowercase()) {
                return false;
            }
        }
        let keywords = card.keywords.effective();
        if self.has_keywords.difference(keywords) != KeywordSet::EMPTY {
            return false;
        }
        if self.lacks_keywords.iter().any(|k| keywords.contains(k)) {
            return false;
        }
        if self.is_rested.is_some_and(|rested| card.is_rested != rested) {
            return false;
        }
        true
    }

    /// Evaluate the whole filter, including the custom predicate.
    ///
    /// Returns `Err(key)` when the custom predicate is unknown to the
    /// registry.
    pub fn evaluate(
        &self,
        card: &CardInstance,
        targeting_player: PlayerId,
        state: &Match,
        scripts: &dyn ScriptRegistry,
    ) -> Result<bool, String> {
        if !self.matches_static(card, targeting_player) {
            return Ok(false);
        }
        match &self.custom {
            None => Ok(true),
            Some(key) => scripts
                .evaluate_predicate(key, card, state)
                .ok_or_else(|| key.clone()),
        }
    }

    /// Like [`evaluate`](Self::evaluate), treating unknown predicates as a
    /// non-match.
    #[must_use]
    pub fn matches(
        &self,
        card: &CardInstance,
        targeting_player: PlayerId,
        state: &Match,
        scripts: &dyn ScriptRegistry,
    ) -> bool {
        self.evaluate(card, targeting_player, state, scripts)
            .unwrap_or(false)
    }
}

fn in_range(value: i32, min: Option<i32>, max: Option<i32>) -> bool {
    min.map_or(true, |m| value >= m) && max.map_or(true, |m| value <= m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{CardTemplate, CardType, WillCost};
    use crate::core::CardId;
    use crate::scripts::ScriptLibrary;

    fn card(owner: u8, atk: i32, def: i32) -> CardInstance {
        let template = CardTemplate::resonator("T", "Flame Knight", atk, def)
            .with_attribute(Attribute::Fire)
            .with_race("Knight")
            .with_cost(WillCost::parse("{R}{1}").unwrap());
        CardInstance::new(CardId(1), template, PlayerId(owner), Zone::Field)
    }

    // === Built-in predicates ===

    #[test]
    fn test_default_accepts_field_cards() {
        assert!(TargetFilter::new().matches_static(&card(0, 100, 100), PlayerId(1)));

        let mut in_hand = card(0, 100, 100);
        in_hand.zone = Zone::Hand;
        assert!(!TargetFilter::new().matches_static(&in_hand, PlayerId(0)));
    }

    #[test]
    fn test_controller_side() {
        let c = card(1, 100, 100);
        let opp = TargetFilter::resonator().controlled_by(Side::Opponent);
        assert!(opp.matches_static(&c, PlayerId(0)));
        assert!(!opp.matches_static(&c, PlayerId(1)));
    }

    #[test]
    fn test_stat_and_cost_ranges() {
        let c = card(0, 500, 400);
        assert!(TargetFilter::new().with_max_def(400).matches_static(&c, PlayerId(0)));
        assert!(!TargetFilter::new().with_max_def(399).matches_static(&c, PlayerId(0)));
        assert!(!TargetFilter::new().with_max_atk(100).matches_static(&c, PlayerId(0)));
        assert!(TargetFilter::new().with_max_total_cost(2).matches_static(&c, PlayerId(0)));
        assert!(!TargetFilter::new().with_max_total_cost(1).matches_static(&c, PlayerId(0)));
    }

    #[test]
    fn test_name_race_attribute() {
        let c = card(0, 100, 100);
        assert!(TargetFilter::new().name_containing("flame").matches_static(&c, PlayerId(0)));
        assert!(!TargetFilter::new().named("Flame").matches_static(&c, PlayerId(0)));
        assert!(TargetFilter::new().with_race("knight").matches_static(&c, PlayerId(0)));
        assert!(!TargetFilter::new().with_race("Fairy").matches_static(&c, PlayerId(0)));
        assert!(TargetFilter::new()
            .with_attribute(Attribute::Fire)
            .matches_static(&c, PlayerId(0)));
        assert!(!TargetFilter::new()
            .with_attribute(Attribute::Water)
            .matches_static(&c, PlayerId(0)));
    }

    #[test]
    fn test_types_keywords_and_rest() {
        let mut c = card(0, 100, 100);
        assert!(!TargetFilter::new()
            .with_types(CardTypeSet::single(CardType::Regalia))
            .matches_static(&c, PlayerId(0)));
        assert!(!TargetFilter::new()
            .with_keyword(Keyword::Flying)
            .matches_static(&c, PlayerId(0)));
        assert!(TargetFilter::new()
            .without_keyword(Keyword::Flying)
            .matches_static(&c, PlayerId(0)));

        assert!(!TargetFilter::new().rested(true).matches_static(&c, PlayerId(0)));
        c.is_rested = true;
        assert!(TargetFilter::new().rested(true).matches_static(&c, PlayerId(0)));
    }

    // === Custom predicates ===

    #[test]
    fn test_custom_predicate() {
        let mut scripts = ScriptLibrary::new();
        scripts.register_predicate("big", |card, _| card.current_atk >= 500);
        let state = Match::new(4000);

        let filter = TargetFilter::new().with_custom("big");
        assert_eq!(filter.evaluate(&card(0, 500, 100), PlayerId(0), &state, &scripts), Ok(true));
        assert_eq!(filter.evaluate(&card(0, 100, 100), PlayerId(0), &state, &scripts), Ok(false));

        let unknown = TargetFilter::new().with_custom("missing");
        assert_eq!(
            unknown.evaluate(&card(0, 100, 100), PlayerId(0), &state, &scripts),
            Err("missing".to_string())
        );
        assert!(!unknown.matches(&card(0, 100, 100), PlayerId(0), &state, &scripts));
    }
}
