//! Keyword model.
//!
//! ## KeywordSet
//!
//! Keywords are a fixed bitset embedded in every card. A card carries three
//! sets: the printed `base`, plus `granted` and `removed` overlays written by
//! the continuous-effect pass. The overlays are cleared on every reset, so
//! the effective set is always recomputed from scratch:
//!
//! ```text
//! effective = (base | granted) & !removed
//! ```
//!
//! ```
//! use chase_rules::keywords::{Keyword, KeywordSet, KeywordState};
//!
//! let mut state = KeywordState::new(KeywordSet::from_slice(&[Keyword::Flying]));
//! state.grant(Keyword::Pierce.into());
//! state.remove(Keyword::Flying.into());
//!
//! assert!(state.has(Keyword::Pierce));
//! assert!(!state.has(Keyword::Flying));
//! ```
//!
//! ## KeywordProcessor
//!
//! Rules predicates derived from the effective set live in [`processor`].

pub mod processor;

pub use processor::{DamageStep, EternalReturn, KeywordProcessor};

use serde::{Deserialize, Serialize};

/// A keyword ability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Keyword {
    Flying,
    Stealth,
    FirstStrike,
    Swiftness,
    Precision,
    Pierce,
    TargetAttack,
    Imperishable,
    Barrier,
    Eternal,
    Drain,
    Explode,
    Remnant,
    Quickcast,
    Incarnation,
    Inheritance,
    Resonance,
    Awakening,
    Mobilize,
}

impl Keyword {
    /// Every keyword in bit order.
    pub const ALL: [Keyword; 19] = [
        Keyword::Flying,
        Keyword::Stealth,
        Keyword::FirstStrike,
        Keyword::Swiftness,
        Keyword::Precision,
        Keyword::Pierce,
        Keyword::TargetAttack,
        Keyword::Imperishable,
        Keyword::Barrier,
        Keyword::Eternal,
        Keyword::Drain,
        Keyword::Explode,
        Keyword::Remnant,
        Keyword::Quickcast,
        Keyword::Incarnation,
        Keyword::Inheritance,
        Keyword::Resonance,
        Keyword::Awakening,
        Keyword::Mobilize,
    ];

    const fn bit(self) -> u32 {
        1 << (self as u32)
    }

    /// Printed name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Keyword::Flying => "Flying",
            Keyword::Stealth => "Stealth",
            Keyword::FirstStrike => "First Strike",
            Keyword::Swiftness => "Swiftness",
            Keyword::Precision => "Precision",
            Keyword::Pierce => "Pierce",
            Keyword::TargetAttack => "Target Attack",
            Keyword::Imperishable => "Imperishable",
            Keyword::Barrier => "Barrier",
            Keyword::Eternal => "Eternal",
            Keyword::Drain => "Drain",
            Keyword::Explode => "Explode",
            Keyword::Remnant => "Remnant",
            Keyword::Quickcast => "Quickcast",
            Keyword::Incarnation => "Incarnation",
            Keyword::Inheritance => "Inheritance",
            Keyword::Resonance => "Resonance",
            Keyword::Awakening => "Awakening",
            Keyword::Mobilize => "Mobilize",
        }
    }

    /// Parse a printed name, ignoring case and separators
    /// (`"first strike"`, `"First-Strike"` and `"firststrike"` all work).
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let normalized: String = text
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Self::ALL.into_iter().find(|k| {
            k.name()
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .map(|c| c.to_ascii_lowercase())
                .eq(normalized.chars())
        })
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of keywords.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeywordSet(u32);

impl KeywordSet {
    /// No keywords.
    pub const EMPTY: KeywordSet = KeywordSet(0);

    /// Build a set from a slice.
    #[must_use]
    pub fn from_slice(keywords: &[Keyword]) -> Self {
        keywords.iter().fold(Self::EMPTY, |set, k| set.with(*k))
    }

    /// Add a keyword.
    #[must_use]
    pub const fn with(self, keyword: Keyword) -> Self {
        Self(self.0 | keyword.bit())
    }

    /// Add a keyword in place.
    pub fn insert(&mut self, keyword: Keyword) {
        self.0 |= keyword.bit();
    }

    /// Check membership.
    #[must_use]
    pub const fn contains(self, keyword: Keyword) -> bool {
        self.0 & keyword.bit() != 0
    }

    /// Union.
    #[must_use]
    pub const fn union(self, other: KeywordSet) -> Self {
        Self(self.0 | other.0)
    }

    /// Members of `self` not in `other`.
    #[must_use]
    pub const fn difference(self, other: KeywordSet) -> Self {
        Self(self.0 & !other.0)
    }

    /// Check for the empty set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of keywords in the set.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Iterate members in bit order.
    pub fn iter(self) -> impl Iterator<Item = Keyword> {
        Keyword::ALL.into_iter().filter(move |k| self.contains(*k))
    }

    /// Parse a comma-separated list. Unknown names are returned as errors.
    pub fn parse_list(text: &str) -> Result<Self, String> {
        text.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .try_fold(Self::EMPTY, |set, name| {
                Keyword::parse(name)
                    .map(|k| set.with(k))
                    .ok_or_else(|| name.to_string())
            })
    }
}

impl From<Keyword> for KeywordSet {
    fn from(keyword: Keyword) -> Self {
        Self::EMPTY.with(keyword)
    }
}

impl std::fmt::Display for KeywordSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for keyword in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            f.write_str(keyword.name())?;
            first = false;
        }
        Ok(())
    }
}

/// Printed keywords plus the continuous-effect overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeywordState {
    /// Printed keywords.
    pub base: KeywordSet,
    /// Granted by effects this pass.
    pub granted: KeywordSet,
    /// Removed by effects this pass.
    pub removed: KeywordSet,
}

impl KeywordState {
    /// Create a state from printed keywords.
    #[must_use]
    pub const fn new(base: KeywordSet) -> Self {
        Self {
            base,
            granted: KeywordSet::EMPTY,
            removed: KeywordSet::EMPTY,
        }
    }

    /// The effective keyword set.
    #[must_use]
    pub const fn effective(&self) -> KeywordSet {
        self.base.union(self.granted).difference(self.removed)
    }

    /// Check for an effective keyword.
    #[must_use]
    pub const fn has(&self, keyword: Keyword) -> bool {
        self.effective().contains(keyword)
    }

    /// Add to the granted overlay.
    pub fn grant(&mut self, keywords: KeywordSet) {
        self.granted = self.granted.union(keywords);
    }

    /// Add to the removed overlay.
    pub fn remove(&mut self, keywords: KeywordSet) {
        self.removed = self.removed.union(keywords);
    }

    /// Drop both overlays.
    pub fn reset(&mut self) {
        self.granted = KeywordSet::EMPTY;
        self.removed = KeywordSet::EMPTY;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Parsing ===

    #[test]
    fn test_parse_names() {
        assert_eq!(Keyword::parse("first strike"), Some(Keyword::FirstStrike));
        assert_eq!(Keyword::parse("First-Strike"), Some(Keyword::FirstStrike));
        assert_eq!(Keyword::parse("TARGET ATTACK"), Some(Keyword::TargetAttack));
        assert_eq!(Keyword::parse("trample"), None);
    }

    #[test]
    fn test_parse_list_and_display() {
        let set = KeywordSet::parse_list("Flying, first strike,drain").unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.to_string(), "Flying, First Strike, Drain");

        assert_eq!(KeywordSet::parse_list("Flying, Haste"), Err("Haste".to_string()));
    }

    #[test]
    fn test_every_name_round_trips() {
        for keyword in Keyword::ALL {
            assert_eq!(Keyword::parse(keyword.name()), Some(keyword));
        }
    }

    // === Overlay ===

    #[test]
    fn test_removal_beats_grant() {
        let mut state = KeywordState::new(KeywordSet::EMPTY);
        state.grant(Keyword::Flying.into());
        state.remove(Keyword::Flying.into());
        assert!(!state.has(Keyword::Flying));
    }

    #[test]
    fn test_reset_restores_base() {
        let mut state = KeywordState::new(Keyword::Barrier.into());
        state.remove(Keyword::Barrier.into());
        state.grant(Keyword::Drain.into());
        state.reset();
        assert_eq!(state.effective(), KeywordSet::from(Keyword::Barrier));
    }
}
