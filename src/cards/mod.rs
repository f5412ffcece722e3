//! Card system: templates, instances, attributes, and will.
//!
//! ## Key Types
//!
//! - `CardTemplate`: printed card data, keyed by `code` for script lookup
//! - `CardInstance`: one card in a match (zone, rest state, derived stats)
//! - `Attribute` / `AttributeSet`: will colors
//! - `WillCost` / `WillPool`: costs and payment

pub mod attributes;
pub mod definition;
pub mod instance;
pub mod will;

pub use attributes::{Attribute, AttributeSet};
pub use definition::{CardTemplate, CardType, CardTypeSet};
pub use instance::{CardInstance, StatCounters};
pub use will::{WillCost, WillPool};
