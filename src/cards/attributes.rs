//! Card attributes (will colors).
//!
//! A card has a set of attributes; a will pool and a will cost are counted
//! per attribute. [`Attribute::Void`] is colorless will.

use serde::{Deserialize, Serialize};

/// A single attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Attribute {
    Light,
    Fire,
    Water,
    Wind,
    Darkness,
    Void,
}

impl Attribute {
    /// All attributes, colored first.
    pub const ALL: [Attribute; 6] = [
        Attribute::Light,
        Attribute::Fire,
        Attribute::Water,
        Attribute::Wind,
        Attribute::Darkness,
        Attribute::Void,
    ];

    /// Index into per-attribute arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// Parse a color name or its one-letter symbol.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "light" | "w" | "l" => Some(Attribute::Light),
            "fire" | "r" | "f" => Some(Attribute::Fire),
            "water" | "u" => Some(Attribute::Water),
            "wind" | "g" => Some(Attribute::Wind),
            "darkness" | "b" | "d" => Some(Attribute::Darkness),
            "void" | "colorless" => Some(Attribute::Void),
            _ => None,
        }
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Attribute::Light => "Light",
            Attribute::Fire => "Fire",
            Attribute::Water => "Water",
            Attribute::Wind => "Wind",
            Attribute::Darkness => "Darkness",
            Attribute::Void => "Void",
        };
        f.write_str(name)
    }
}

/// A set of attributes as a bitset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeSet(u8);

impl AttributeSet {
    /// No attributes.
    pub const EMPTY: AttributeSet = AttributeSet(0);

    /// A set holding one attribute.
    #[must_use]
    pub const fn single(attribute: Attribute) -> Self {
        Self(attribute.bit())
    }

    /// Build a set from a slice.
    #[must_use]
    pub fn from_slice(attributes: &[Attribute]) -> Self {
        attributes.iter().fold(Self::EMPTY, |set, a| set.with(*a))
    }

    /// Add an attribute.
    #[must_use]
    pub const fn with(self, attribute: Attribute) -> Self {
        Self(self.0 | attribute.bit())
    }

    /// Add an attribute in place.
    pub fn insert(&mut self, attribute: Attribute) {
        self.0 |= attribute.bit();
    }

    /// Check membership.
    #[must_use]
    pub const fn contains(self, attribute: Attribute) -> bool {
        self.0 & attribute.bit() != 0
    }

    /// Check whether the sets share an attribute.
    #[must_use]
    pub const fn intersects(self, other: AttributeSet) -> bool {
        self.0 & other.0 != 0
    }

    /// Check for the empty set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate members in canonical order.
    pub fn iter(self) -> impl Iterator<Item = Attribute> {
        Attribute::ALL.into_iter().filter(move |a| self.contains(*a))
    }
}

impl From<Attribute> for AttributeSet {
    fn from(attribute: Attribute) -> Self {
        Self::single(attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Attribute::parse("Fire"), Some(Attribute::Fire));
        assert_eq!(Attribute::parse(" w "), Some(Attribute::Light));
        assert_eq!(Attribute::parse("colorless"), Some(Attribute::Void));
        assert_eq!(Attribute::parse("purple"), None);
    }

    #[test]
    fn test_set_operations() {
        let set = AttributeSet::from_slice(&[Attribute::Fire, Attribute::Wind]);
        assert!(set.contains(Attribute::Fire));
        assert!(!set.contains(Attribute::Water));
        assert!(set.intersects(AttributeSet::single(Attribute::Wind)));
        assert!(!set.intersects(AttributeSet::single(Attribute::Light)));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Attribute::Fire, Attribute::Wind]);
        assert!(AttributeSet::EMPTY.is_empty());
    }
}
