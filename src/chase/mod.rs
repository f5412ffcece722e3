//! Priority and the chase.
//!
//! ## Key Components
//!
//! - [`Chase`]: the LIFO stack of [`ChaseItem`]s
//! - [`PriorityManager`]: who may act, the pass flags, and the
//!   [`PendingAction`] waiting for input
//! - [`TimingWindow`]: main timing and per-action-type legality
//!
//! ## Example Usage
//!
//! ```
//! use chase_rules::chase::{Chase, ChaseItem, PassResult, PriorityManager};
//! use chase_rules::core::{CardId, PlayerId};
//!
//! let mut chase = Chase::new();
//! let mut priority = PriorityManager::new();
//! priority.reset_for_phase(PlayerId(0));
//!
//! chase.push(ChaseItem::spell(CardId(1), PlayerId(0), vec![]));
//! priority.after_action(PlayerId(0));
//! assert!(priority.has_priority(PlayerId(1)));
//!
//! priority.record_pass(PlayerId(1), chase.is_empty()).unwrap();
//! let result = priority.record_pass(PlayerId(0), chase.is_empty()).unwrap();
//! assert_eq!(result, PassResult::Resolve);
//! ```

mod pending;
mod priority;
mod stack;

pub use pending::{PendingAction, PendingId, PendingInput, PendingKind, PendingNeed};
pub use priority::{PassResult, PriorityManager, PriorityState, TimingWindow};
pub use stack::{Chase, ChaseItem, ChaseItemId, ChaseItemKind, ChasePayload};
