//! Identifiers for cards and decision requests.
//!
//! ## ID Layout
//!
//! Card ids are allocated by the [`Match`](super::Match) in creation order,
//! starting at 1. They are never reused: a card keeps its id while it moves
//! between zones, so effects and triggers can keep pointing at it after it
//! leaves the field.
//!
//! ```
//! use chase_rules::core::CardId;
//!
//! let card = CardId::new(7);
//! assert_eq!(card.raw(), 7);
//! assert_eq!(format!("{}", card), "Card(7)");
//! ```

use serde::{Deserialize, Serialize};

/// Unique identifier for a card instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CardId(pub u32);

impl CardId {
    /// Create a card ID.
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

impl From<u32> for CardId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Card({})", self.0)
    }
}

/// Identifier for an outstanding decision request (targets, attackers,
/// blockers, modes, will color).
///
/// Request ids are allocated from a single counter per match, so an id
/// names at most one request for the whole game. Answering a request that
/// was already consumed fails instead of applying twice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u32);

impl RequestId {
    /// Create a request ID.
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

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Request({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_id_basics() {
        let id = CardId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(CardId::from(42), id);
        assert_eq!(format!("{}", id), "Card(42)");
    }

    #[test]
    fn test_card_id_ordering() {
        let mut ids = vec![CardId(5), CardId(1), CardId(3)];
        ids.sort();
        assert_eq!(ids, vec![CardId(1), CardId(3), CardId(5)]);
    }

    #[test]
    fn test_request_id_display() {
        assert_eq!(format!("{}", RequestId::new(3)), "Request(3)");
    }

    #[test]
    fn test_serialization() {
        let id = CardId(123);
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: CardId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
