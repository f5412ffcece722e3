//! Card templates: static card data.
//!
//! A `CardTemplate` holds the printed properties of a card: type, cost,
//! base ATK/DEF, races, and printed keywords. Everything a card *does* lives
//! in its script, looked up by `code` through the
//! [`ScriptRegistry`](crate::scripts::ScriptRegistry).
//!
//! Instance-specific data (zone, rest state, damage, derived stats) is
//! stored separately in [`CardInstance`](super::CardInstance).

use serde::{Deserialize, Serialize};

use super::attributes::{Attribute, AttributeSet};
use super::will::WillCost;
use crate::keywords::{Keyword, KeywordSet};

/// Printed card type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardType {
    Ruler,
    JRuler,
    Resonator,
    Chant,
    ChantInstant,
    ChantStandby,
    AdditionField,
    AdditionResonator,
    AdditionRuler,
    Regalia,
    MagicStone,
    SpecialMagicStone,
}

impl CardType {
    const fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Resonators and J-rulers: the cards that fight.
    #[must_use]
    pub fn is_combatant(self) -> bool {
        matches!(self, CardType::Resonator | CardType::JRuler)
    }

    /// Any chant.
    #[must_use]
    pub fn is_spell(self) -> bool {
        matches!(
            self,
            CardType::Chant | CardType::ChantInstant | CardType::ChantStandby
        )
    }

    /// Magic stones, special or not.
    #[must_use]
    pub fn is_stone(self) -> bool {
        matches!(self, CardType::MagicStone | CardType::SpecialMagicStone)
    }

    /// Any addition.
    #[must_use]
    pub fn is_addition(self) -> bool {
        matches!(
            self,
            CardType::AdditionField | CardType::AdditionResonator | CardType::AdditionRuler
        )
    }

    /// Cards that stay on the field after resolving.
    #[must_use]
    pub fn is_permanent(self) -> bool {
        !self.is_spell()
    }

    /// Playable at instant speed without Quickcast.
    #[must_use]
    pub fn is_instant(self) -> bool {
        self == CardType::ChantInstant
    }
}

/// A set of card types, used by filters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardTypeSet(u16);

impl CardTypeSet {
    /// No types.
    pub const NONE: CardTypeSet = CardTypeSet(0);
    /// Resonators only.
    pub const RESONATOR: CardTypeSet = CardTypeSet(1 << CardType::Resonator as u16);
    /// Resonators and J-rulers.
    pub const COMBATANT: CardTypeSet =
        CardTypeSet((1 << CardType::Resonator as u16) | (1 << CardType::JRuler as u16));
    /// Rulers and J-rulers.
    pub const RULER: CardTypeSet =
        CardTypeSet((1 << CardType::Ruler as u16) | (1 << CardType::JRuler as u16));
    /// All chants.
    pub const SPELL: CardTypeSet = CardTypeSet(
        (1 << CardType::Chant as u16)
            | (1 << CardType::ChantInstant as u16)
            | (1 << CardType::ChantStandby as u16),
    );
    /// All additions.
    pub const ADDITION: CardTypeSet = CardTypeSet(
        (1 << CardType::AdditionField as u16)
            | (1 << CardType::AdditionResonator as u16)
            | (1 << CardType::AdditionRuler as u16),
    );
    /// All magic stones.
    pub const STONE: CardTypeSet = CardTypeSet(
        (1 << CardType::MagicStone as u16) | (1 << CardType::SpecialMagicStone as u16),
    );

    /// A set holding one type.
    #[must_use]
    pub const fn single(card_type: CardType) -> Self {
        Self(card_type.bit())
    }

    /// Union of two sets.
    #[must_use]
    pub const fn union(self, other: CardTypeSet) -> Self {
        Self(self.0 | other.0)
    }

    /// Check membership.
    #[must_use]
    pub const fn contains(self, card_type: CardType) -> bool {
        self.0 & card_type.bit() != 0
    }

    /// Check for the empty set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<CardType> for CardTypeSet {
    fn from(card_type: CardType) -> Self {
        Self::single(card_type)
    }
}

/// Static card data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardTemplate {
    /// Script lookup code (e.g. `"CMF-001"`).
    pub code: String,

    /// Printed name.
    pub name: String,

    /// Printed type.
    pub card_type: CardType,

    /// Printed attributes.
    pub attributes: AttributeSet,

    /// Play cost.
    pub cost: WillCost,

    /// Base ATK.
    pub atk: i32,

    /// Base DEF.
    pub def: i32,

    /// Races (e.g. "Fairy Tale", "Knight").
    pub races: Vec<String>,

    /// Printed keywords.
    pub keywords: KeywordSet,

    /// Judgment cost (rulers only).
    pub judgment_cost: Option<WillCost>,

    /// Back face for rulers that can do Judgment.
    pub j_ruler: Option<Box<CardTemplate>>,
}

impl CardTemplate {
    /// Create a template with no stats.
    pub fn new(code: impl Into<String>, name: impl Into<String>, card_type: CardType) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            card_type,
            attributes: AttributeSet::EMPTY,
            cost: WillCost::FREE,
            atk: 0,
            def: 0,
            races: Vec::new(),
            keywords: KeywordSet::EMPTY,
            judgment_cost: None,
            j_ruler: None,
        }
    }

    /// Shorthand for a resonator.
    pub fn resonator(code: impl Into<String>, name: impl Into<String>, atk: i32, def: i32) -> Self {
        Self::new(code, name, CardType::Resonator).with_stats(atk, def)
    }

    /// Set base ATK/DEF.
    #[must_use]
    pub fn with_stats(mut self, atk: i32, def: i32) -> Self {
        self.atk = atk;
        self.def = def;
        self
    }

    /// Set the play cost.
    #[must_use]
    pub fn with_cost(mut self, cost: WillCost) -> Self {
        self.cost = cost;
        self
    }

    /// Add an attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.insert(attribute);
        self
    }

    /// Add a race.
    #[must_use]
    pub fn with_race(mut self, race: impl Into<String>) -> Self {
        self.races.push(race.into());
        self
    }

    /// Add a printed keyword.
    #[must_use]
    pub fn with_keyword(mut self, keyword: Keyword) -> Self {
        self.keywords.insert(keyword);
        self
    }

    /// Give a ruler its J-ruler side.
    #[must_use]
    pub fn with_j_ruler(mut self, judgment_cost: WillCost, j_ruler: CardTemplate) -> Self {
        self.judgment_cost = Some(judgment_cost);
        self.j_ruler = Some(Box::new(j_ruler));
        self
    }

    /// Check for a race, ignoring case.
    #[must_use]
    pub fn has_race(&self, race: &str) -> bool {
        self.races.iter().any(|r| r.eq_ignore_ascii_case(race))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_predicates() {
        assert!(CardType::Resonator.is_combatant());
        assert!(CardType::JRuler.is_combatant());
        assert!(!CardType::Ruler.is_combatant());
        assert!(CardType::ChantInstant.is_spell());
        assert!(CardType::ChantInstant.is_instant());
        assert!(!CardType::Chant.is_instant());
        assert!(CardType::SpecialMagicStone.is_stone());
        assert!(CardType::Regalia.is_permanent());
    }

    #[test]
    fn test_type_sets() {
        assert!(CardTypeSet::COMBATANT.contains(CardType::JRuler));
        assert!(!CardTypeSet::RESONATOR.contains(CardType::JRuler));
        assert!(CardTypeSet::SPELL.contains(CardType::ChantStandby));
        let mixed = CardTypeSet::RESONATOR.union(CardTypeSet::STONE);
        assert!(mixed.contains(CardType::MagicStone));
        assert!(!mixed.contains(CardType::Regalia));
    }

    #[test]
    fn test_template_builders() {
        let t = CardTemplate::resonator("T-001", "Knight", 600, 600)
            .with_attribute(Attribute::Light)
            .with_race("Knight")
            .with_keyword(Keyword::FirstStrike)
            .with_cost(WillCost::parse("{W}{1}").unwrap());

        assert_eq!(t.card_type, CardType::Resonator);
        assert_eq!((t.atk, t.def), (600, 600));
        assert!(t.attributes.contains(Attribute::Light));
        assert!(t.has_race("knight"));
        assert!(t.keywords.contains(Keyword::FirstStrike));
        assert_eq!(t.cost.total(), 2);
    }
}
