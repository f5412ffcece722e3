//! Which cards a continuous effect touches.

use serde::{Deserialize, Serialize};

use crate::cards::{Attribute, AttributeSet, CardInstance, CardTypeSet};
use crate::core::{CardId, Match, PlayerId, Side, Zone};
use crate::keywords::{Keyword, KeywordSet};
use crate::scripts::ScriptRegistry;

/// Selects the cards a continuous effect applies to.
///
/// `controller` is read relative to the source's controller at the time the
/// effect applies, so a control change earlier in the pass is respected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedFilter {
    /// Zone the card must be in.
    pub zone: Zone,

    /// Controller relative to the source.
    pub controller: Side,

    /// Allowed card types.
    pub types: Option<CardTypeSet>,

    /// Required attributes (any of).
    pub attributes: Option<AttributeSet>,

    /// Required races (any of).
    pub races: Vec<String>,

    /// Required keywords (all of).
    pub keywords: KeywordSet,

    /// Substring of the name.
    pub name_contains: Option<String>,

    /// Script predicate key.
    pub custom: Option<String>,

    /// Explicit card list. When set, only these cards can match.
    pub cards: Option<Vec<CardId>>,
}

impl Default for AffectedFilter {
    fn default() -> Self {
        Self {
            zone: Zone::Field,
            controller: Side::Any,
            types: None,
            attributes: None,
            races: Vec::new(),
            keywords: KeywordSet::EMPTY,
            name_contains: None,
            custom: None,
            cards: None,
        }
    }
}

impl AffectedFilter {
    /// Every card on the field.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches no card. Combine with `affects_self` for self-only effects.
    #[must_use]
    pub fn nothing() -> Self {
        Self {
            cards: Some(Vec::new()),
            ..Self::default()
        }
    }

    /// Resonators on the field on `side`.
    #[must_use]
    pub fn resonators(side: Side) -> Self {
        Self {
            controller: side,
            types: Some(CardTypeSet::RESONATOR),
            ..Self::default()
        }
    }

    /// Exactly these cards, while on the field.
    #[must_use]
    pub fn cards(cards: &[CardId]) -> Self {
        Self {
            cards: Some(cards.to_vec()),
            ..Self::default()
        }
    }

    /// Restrict the controller side.
    #[must_use]
    pub fn controlled_by(mut self, side: Side) -> Self {
        self.controller = side;
        self
    }

    /// Restrict the types.
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

    /// Require a keyword.
    #[must_use]
    pub fn with_keyword(mut self, keyword: Keyword) -> Self {
        self.keywords.insert(keyword);
        self
    }

    /// Require a name substring.
    #[must_use]
    pub fn name_containing(mut self, text: impl Into<String>) -> Self {
        self.name_contains = Some(text.into());
        self
    }

    /// Require a script predicate.
    #[must_use]
    pub fn with_custom(mut self, key: impl Into<String>) -> Self {
        self.custom = Some(key.into());
        self
    }

    /// Whether `card` is named in the explicit list.
    #[must_use]
    pub fn names(&self, card: CardId) -> bool {
        self.cards.as_ref().is_some_and(|list| list.contains(&card))
    }

    /// Drop `card` from an explicit list. Returns `true` if the list is now
    /// empty.
    pub(crate) fn forget(&mut self, card: CardId) -> bool {
        match &mut self.cards {
            Some(list) => {
                list.retain(|id| *id != card);
                list.is_empty()
            }
            None => false,
        }
    }

    /// Every test except the custom predicate.
    #[must_use]
    pub fn matches_static(&self, card: &CardInstance, source_controller: PlayerId) -> bool {
        if card.zone != self.zone {
            return false;
        }
        if let Some(list) = &self.cards {
            if !list.contains(&card.uid) {
                return false;
            }
        }
        if !self.controller.matches(card.controller, source_controller) {
            return false;
        }
        if self.types.is_some_and(|types| !types.contains(card.card_type)) {
            return false;
        }
        if self
            .attributes
            .is_some_and(|wanted| !wanted.intersects(card.attributes))
        {
            return false;
        }
        if !self.races.is_empty() && !self.races.iter().any(|r| card.template.has_race(r)) {
            return false;
        }
        if self.keywords.iter().any(|k| !card.has_keyword(k)) {
            return false;
        }
        if let Some(text) = &self.name_contains {
            if !card.name().to_lowercase().contains(&text.to_lowercase()) {
                return false;
            }
        }
        true
    }

    /// Full evaluation. `Err(key)` when the custom predicate is unknown.
    pub fn evaluate(
        &self,
        card: &CardInstance,
        source_controller: PlayerId,
        state: &Match,
        scripts: &dyn ScriptRegistry,
    ) -> Result<bool, String> {
        if !self.matches_static(card, source_controller) {
            return Ok(false);
        }
        match &self.custom {
            None => Ok(true),
            Some(key) => scripts
                .evaluate_predicate(key, card, state)
                .ok_or_else(|| key.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardTemplate;

    fn card(id: u32, owner: u8, template: CardTemplate) -> CardInstance {
        CardInstance::new(CardId(id), template, PlayerId(owner), Zone::Field)
    }

    #[test]
    fn test_side_is_relative_to_source() {
        let mine = card(1, 0, CardTemplate::resonator("A", "A", 100, 100));
        let theirs = card(2, 1, CardTemplate::resonator("B", "B", 100, 100));
        let filter = AffectedFilter::resonators(Side::You);
        assert!(filter.matches_static(&mine, PlayerId(0)));
        assert!(!filter.matches_static(&theirs, PlayerId(0)));
        assert!(filter.matches_static(&theirs, PlayerId(1)));
    }

    #[test]
    fn test_explicit_list_and_forget() {
        let a = card(1, 0, CardTemplate::resonator("A", "A", 100, 100));
        let mut filter = AffectedFilter::cards(&[CardId(1)]);
        assert!(filter.matches_static(&a, PlayerId(1)));
        assert!(filter.forget(CardId(1)));
        assert!(!filter.matches_static(&a, PlayerId(1)));
        assert!(!AffectedFilter::nothing().matches_static(&a, PlayerId(0)));
    }

    #[test]
    fn test_names_only_explicit_lists() {
        assert!(AffectedFilter::cards(&[CardId(3)]).names(CardId(3)));
        assert!(!AffectedFilter::cards(&[CardId(3)]).names(CardId(4)));
        assert!(!AffectedFilter::resonators(Side::You).names(CardId(3)));
    }

    #[test]
    fn test_race_keyword_and_name() {
        let elf = card(
            1,
            0,
            CardTemplate::resonator("E", "Elvish Archer", 300, 300)
                .with_race("Elf")
                .with_keyword(Keyword::Flying),
        );
        assert!(AffectedFilter::new().with_race("Elf").matches_static(&elf, PlayerId(0)));
        assert!(!AffectedFilter::new().with_race("Human").matches_static(&elf, PlayerId(0)));
        assert!(AffectedFilter::new().with_keyword(Keyword::Flying).matches_static(&elf, PlayerId(0)));
        assert!(AffectedFilter::new().name_containing("archer").matches_static(&elf, PlayerId(0)));
    }
}
