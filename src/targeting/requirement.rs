//! Target requirements and the common builders.
//!
//! ```
//! use chase_rules::targeting::{single_target, target_opponent_resonator, up_to_targets};
//!
//! let req = single_target(target_opponent_resonator());
//! assert!(req.is_single_target());
//! assert!(req.validate_count(1));
//! assert!(!req.validate_count(0));
//!
//! let some = up_to_targets(target_opponent_resonator(), 2);
//! assert!(some.validate_count(0));
//! assert!(!some.validate_count(3));
//! ```

use serde::{Deserialize, Serialize};

use super::filter::TargetFilter;
use crate::cards::{Attribute, CardTypeSet};
use crate::core::{Side, Zone};

/// How many targets of what kind an effect needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRequirement {
    /// What can be chosen.
    pub filter: TargetFilter,

    /// Fewest targets.
    pub min_targets: usize,

    /// Most targets.
    pub max_targets: usize,

    /// Zero targets is acceptable.
    pub optional: bool,

    /// Prompt shown with the request.
    pub prompt: String,
}

impl TargetRequirement {
    /// Exactly one target.
    #[must_use]
    pub fn is_single_target(&self) -> bool {
        self.min_targets == 1 && self.max_targets == 1
    }

    /// Check a selection size.
    #[must_use]
    pub fn validate_count(&self, count: usize) -> bool {
        if count == 0 && self.optional {
            return true;
        }
        (self.min_targets..=self.max_targets).contains(&count)
    }

    /// Replace the prompt.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

// === Filters ===

/// Any resonator on the field.
#[must_use]
pub fn target_resonator() -> TargetFilter {
    TargetFilter::resonator()
}

/// Any resonator or J-ruler on the field.
#[must_use]
pub fn target_j_resonator() -> TargetFilter {
    TargetFilter::j_resonator()
}

/// A resonator an opponent controls.
#[must_use]
pub fn target_opponent_resonator() -> TargetFilter {
    TargetFilter::resonator().controlled_by(Side::Opponent)
}

/// A resonator you control.
#[must_use]
pub fn target_your_resonator() -> TargetFilter {
    TargetFilter::resonator().controlled_by(Side::You)
}

/// A rested resonator.
#[must_use]
pub fn target_rested_resonator() -> TargetFilter {
    TargetFilter::resonator().rested(true)
}

/// A resonator of one attribute.
#[must_use]
pub fn target_attribute_resonator(attribute: Attribute) -> TargetFilter {
    TargetFilter::resonator().with_attribute(attribute)
}

/// A resonator with DEF at most `max_def`.
#[must_use]
pub fn target_with_max_def(max_def: i32) -> TargetFilter {
    TargetFilter::resonator().with_max_def(max_def)
}

/// A card in a graveyard.
#[must_use]
pub fn target_card_in_graveyard(side: Side) -> TargetFilter {
    TargetFilter::new()
        .in_zones(&[Zone::Graveyard])
        .controlled_by(side)
}

/// A spell on the chase, of any card type.
#[must_use]
pub fn target_spell_on_chase() -> TargetFilter {
    TargetFilter::new().in_zones(&[Zone::Chase])
}

/// A magic stone on the field.
#[must_use]
pub fn target_stone() -> TargetFilter {
    TargetFilter::new().with_types(CardTypeSet::STONE)
}

/// An addition on the field.
#[must_use]
pub fn target_addition() -> TargetFilter {
    TargetFilter::new().with_types(CardTypeSet::ADDITION)
}

// === Requirements ===

/// Exactly one target.
#[must_use]
pub fn single_target(filter: TargetFilter) -> TargetRequirement {
    TargetRequirement {
        filter,
        min_targets: 1,
        max_targets: 1,
        optional: false,
        prompt: "Select a target".to_string(),
    }
}

/// Exactly `count` targets.
#[must_use]
pub fn multiple_targets(filter: TargetFilter, count: usize) -> TargetRequirement {
    TargetRequirement {
        filter,
        min_targets: count,
        max_targets: count,
        optional: false,
        prompt: format!("Select {} targets", count),
    }
}

/// Up to `max_count` targets.
#[must_use]
pub fn up_to_targets(filter: TargetFilter, max_count: usize) -> TargetRequirement {
    TargetRequirement {
        filter,
        min_targets: 0,
        max_targets: max_count,
        optional: true,
        prompt: format!("Select up to {} targets", max_count),
    }
}

/// Zero or one target.
#[must_use]
pub fn optional_target(filter: TargetFilter) -> TargetRequirement {
    TargetRequirement {
        filter,
        min_targets: 0,
        max_targets: 1,
        optional: true,
        prompt: "Select a target (optional)".to_string(),
    }
}
