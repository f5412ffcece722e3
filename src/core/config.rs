//! Zones, phases, and the rules configuration.
//!
//! ## Zones
//!
//! Every card lives in exactly one [`Zone`]. Zones other than the field and
//! the chase are private per owner: a card always returns to its *owner's*
//! hand, graveyard, or deck, whoever controls it at the time.
//!
//! ## Configuration
//!
//! [`RulesConfig`] holds the handful of knobs the rules core exposes. It can
//! be built in code with the `with_*` builders or loaded from TOML:
//!
//! ```
//! use chase_rules::core::{RulesConfig, TriggerOrdering};
//!
//! let config = RulesConfig::from_toml_str(r#"
//!     starting_life = 2000
//!     trigger_ordering = "apnap"
//! "#).unwrap();
//!
//! assert_eq!(config.starting_life, 2000);
//! assert_eq!(config.trigger_ordering, TriggerOrdering::Apnap);
//! assert_eq!(config.max_hand_size, 7);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// A card location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zone {
    /// Face-down main deck. The top is the *last* element.
    MainDeck,
    /// Face-down magic stone deck. The top is the *last* element.
    StoneDeck,
    /// Owner-only hand.
    Hand,
    /// The shared battlefield.
    Field,
    /// The ruler area (a ruler that has not done Judgment).
    RulerArea,
    /// Owner's graveyard.
    Graveyard,
    /// Removed from the game.
    Removed,
    /// On the chase as a spell.
    Chase,
}

impl Zone {
    /// All zones in declaration order.
    pub const ALL: [Zone; 8] = [
        Zone::MainDeck,
        Zone::StoneDeck,
        Zone::Hand,
        Zone::Field,
        Zone::RulerArea,
        Zone::Graveyard,
        Zone::Removed,
        Zone::Chase,
    ];

    /// Zones whose contents are visible to both players.
    #[must_use]
    pub fn is_public(self) -> bool {
        matches!(
            self,
            Zone::Field | Zone::RulerArea | Zone::Graveyard | Zone::Removed | Zone::Chase
        )
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Zone::MainDeck => "main deck",
            Zone::StoneDeck => "stone deck",
            Zone::Hand => "hand",
            Zone::Field => "field",
            Zone::RulerArea => "ruler area",
            Zone::Graveyard => "graveyard",
            Zone::Removed => "removed area",
            Zone::Chase => "chase",
        };
        f.write_str(name)
    }
}

/// Turn phases in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Draw a card.
    Draw,
    /// Recover everything the turn player controls.
    Recovery,
    /// Main timing.
    Main,
    /// Combat.
    Battle,
    /// End of turn cleanup.
    End,
}

impl Phase {
    /// The phase after this one, or `None` after End.
    #[must_use]
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Draw => Some(Phase::Recovery),
            Phase::Recovery => Some(Phase::Main),
            Phase::Main => Some(Phase::Battle),
            Phase::Battle => Some(Phase::End),
            Phase::End => None,
        }
    }
}

/// Order in which simultaneously-triggered abilities go onto the chase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerOrdering {
    /// Registration/fire order.
    #[default]
    Fifo,
    /// Active player's triggers first (so they resolve last).
    Apnap,
}

/// Rules configuration.
///
/// Every field has a default, so a TOML source only needs to name the values
/// it overrides.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Life each player starts with.
    pub starting_life: i32,

    /// Hand size enforced during the end phase.
    pub max_hand_size: usize,

    /// Resolve combat declarations without asking: attack with everything,
    /// declare no blockers.
    pub unattended_combat: bool,

    /// Pick triggered-ability targets automatically instead of asking.
    pub auto_target_triggers: bool,

    /// Ordering of simultaneous triggers.
    pub trigger_ordering: TriggerOrdering,

    /// The first player skips the draw of their first turn.
    pub first_player_skips_draw: bool,

    /// Upper bound on state-based action passes per checkpoint.
    pub max_state_based_iterations: u32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            starting_life: 4000,
            max_hand_size: 7,
            unattended_combat: false,
            auto_target_triggers: true,
            trigger_ordering: TriggerOrdering::Fifo,
            first_player_skips_draw: true,
            max_state_based_iterations: 100,
        }
    }
}

impl RulesConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set starting life.
    #[must_use]
    pub fn with_starting_life(mut self, life: i32) -> Self {
        self.starting_life = life;
        self
    }

    /// Set the maximum hand size.
    #[must_use]
    pub fn with_max_hand_size(mut self, size: usize) -> Self {
        self.max_hand_size = size;
        self
    }

    /// Run combat declarations with defaults instead of asking.
    #[must_use]
    pub fn unattended(mut self) -> Self {
        self.unattended_combat = true;
        self
    }

    /// Set trigger ordering.
    #[must_use]
    pub fn with_trigger_ordering(mut self, ordering: TriggerOrdering) -> Self {
        self.trigger_ordering = ordering;
        self
    }

    /// Ask for triggered-ability targets instead of picking them.
    #[must_use]
    pub fn with_manual_trigger_targets(mut self) -> Self {
        self.auto_target_triggers = false;
        self
    }

    /// Load a configuration from a TOML string.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).format(config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check that values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.starting_life <= 0 {
            return Err(ConfigError::Invalid {
                reason: format!("starting_life must be positive, got {}", self.starting_life),
            });
        }
        if self.max_state_based_iterations == 0 {
            return Err(ConfigError::Invalid {
                reason: "max_state_based_iterations must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
