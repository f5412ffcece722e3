//! Error types for the rules core.
//!
//! Nothing in the rules core is fatal. Every failure means "the action did
//! not happen" and the match is left in the state it had before the call.
//! Callers that only care about success can use the `bool` wrappers on
//! [`Game`](crate::rules::Game).

use super::entity::{CardId, RequestId};

/// Errors returned by rules operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    /// The action was attempted without priority, at the wrong timing, by the
    /// wrong player, or against state that no longer allows it.
    #[error("illegal action: {reason}")]
    IllegalAction {
        /// Why the action was rejected.
        reason: String,
    },

    /// A will, rest, or life cost cannot be paid. Nothing was deducted.
    #[error("insufficient resource: {reason}")]
    InsufficientResource {
        /// Which cost could not be paid.
        reason: String,
    },

    /// A required target selection cannot be satisfied.
    #[error("no valid targets for {card}")]
    NoValidTargets {
        /// The card whose targeting failed.
        card: CardId,
    },

    /// A card script declaration cannot be resolved and was skipped.
    #[error("malformed effect declaration on {card}: {detail}")]
    MalformedEffectDeclaration {
        /// The card carrying the declaration.
        card: CardId,
        /// What is wrong with it.
        detail: String,
    },

    /// No card with this id exists in the match.
    #[error("unknown card: {0}")]
    UnknownCard(CardId),

    /// No outstanding request has this id.
    #[error("unknown request: {0}")]
    UnknownRequest(RequestId),
}

impl RulesError {
    /// Build an [`RulesError::IllegalAction`].
    pub fn illegal(reason: impl Into<String>) -> Self {
        Self::IllegalAction {
            reason: reason.into(),
        }
    }

    /// Build an [`RulesError::InsufficientResource`].
    pub fn insufficient(reason: impl Into<String>) -> Self {
        Self::InsufficientResource {
            reason: reason.into(),
        }
    }

    /// Build an [`RulesError::MalformedEffectDeclaration`].
    pub fn malformed(card: CardId, detail: impl Into<String>) -> Self {
        Self::MalformedEffectDeclaration {
            card,
            detail: detail.into(),
        }
    }
}

/// Result alias for rules operations.
pub type RulesResult<T> = Result<T, RulesError>;

/// Errors that can occur when loading a [`RulesConfig`](super::RulesConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config source could not be read or deserialized.
    #[error("failed to load rules config: {source}")]
    Load {
        /// The underlying loader error.
        #[from]
        source: config::ConfigError,
    },

    /// The config parsed but holds values the engine cannot run with.
    #[error("invalid rules config: {reason}")]
    Invalid {
        /// Which value is invalid.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            RulesError::illegal("no priority").to_string(),
            "illegal action: no priority"
        );
        assert_eq!(
            RulesError::NoValidTargets { card: CardId(3) }.to_string(),
            "no valid targets for Card(3)"
        );
        assert_eq!(
            RulesError::malformed(CardId(9), "layer mismatch").to_string(),
            "malformed effect declaration on Card(9): layer mismatch"
        );
        assert_eq!(
            RulesError::UnknownRequest(RequestId(4)).to_string(),
            "unknown request: Request(4)"
        );
    }
}
