//! Card scripts and the injected registry.
//!
//! The rules core never parses ability text. Each template code maps to a
//! [`CardScript`] holding its resolve operations, targets, modes, activated
//! and triggered abilities, continuous declarations and will colours. The
//! [`ScriptRegistry`] trait is the seam; [`ScriptLibrary`] is the in-memory
//! implementation.

mod registry;
mod script;

pub use registry::{ScriptLibrary, ScriptRegistry};
pub use script::{ActivatedAbility, CardScript, ModeChoice, SpellMode};
