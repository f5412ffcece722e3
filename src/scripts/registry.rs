//! The script registry seam.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::script::CardScript;
use crate::cards::CardInstance;
use crate::core::Match;

/// Source of card scripts and custom predicates.
///
/// Injected into [`Game`](crate::rules::Game) behind an `Arc`. The rules core
/// only reads from it.
pub trait ScriptRegistry: std::fmt::Debug + Send + Sync {
    /// The script for a template code.
    fn script(&self, code: &str) -> Option<&CardScript>;

    /// Evaluate a custom predicate. `None` means the key is unknown.
    fn evaluate_predicate(&self, key: &str, card: &CardInstance, state: &Match) -> Option<bool>;
}

type Predicate = Arc<dyn Fn(&CardInstance, &Match) -> bool + Send + Sync>;

/// In-memory [`ScriptRegistry`].
#[derive(Clone, Default)]
pub struct ScriptLibrary {
    scripts: FxHashMap<String, CardScript>,
    predicates: FxHashMap<String, Predicate>,
}

impl ScriptLibrary {
    /// Create an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a script under a template code, replacing any previous one.
    pub fn register(&mut self, code: impl Into<String>, script: CardScript) {
        self.scripts.insert(code.into(), script);
    }

    /// Register a script (builder pattern).
    #[must_use]
    pub fn with_script(mut self, code: impl Into<String>, script: CardScript) -> Self {
        self.register(code, script);
        self
    }

    /// Register a custom predicate.
    pub fn register_predicate(
        &mut self,
        key: impl Into<String>,
        predicate: impl Fn(&CardInstance, &Match) -> bool + Send + Sync + 'static,
    ) {
        self.predicates.insert(key.into(), Arc::new(predicate));
    }

    /// Number of registered scripts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    /// Check for an empty library.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

impl ScriptRegistry for ScriptLibrary {
    fn script(&self, code: &str) -> Option<&CardScript> {
        self.scripts.get(code)
    }

    fn evaluate_predicate(&self, key: &str, card: &CardInstance, state: &Match) -> Option<bool> {
        self.predicates.get(key).map(|predicate| predicate(card, state))
    }
}

impl std::fmt::Debug for ScriptLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut predicates: Vec<_> = self.predicates.keys().collect();
        predicates.sort();
        f.debug_struct("ScriptLibrary")
            .field("scripts", &self.scripts.len())
            .field("predicates", &predicates)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardTemplate;
    use crate::core::{CardId, PlayerId, Zone};
    use crate::effects::EffectOp;

    #[test]
    fn test_lookup_and_predicates() {
        let mut library = ScriptLibrary::new()
            .with_script("BOLT", CardScript::new().on_resolve(vec![EffectOp::damage_opponent(300)]));
        library.register_predicate("wounded", |card, _| card.damage > 0);

        assert_eq!(library.len(), 1);
        assert!(library.script("BOLT").is_some());
        assert!(library.script("NOPE").is_none());

        let state = Match::new(4000);
        let mut card = CardInstance::new(
            CardId(1),
            CardTemplate::resonator("T", "T", 100, 100),
            PlayerId(0),
            Zone::Field,
        );
        assert_eq!(library.evaluate_predicate("wounded", &card, &state), Some(false));
        card.damage = 50;
        assert_eq!(library.evaluate_predicate("wounded", &card, &state), Some(true));
        assert_eq!(library.evaluate_predicate("missing", &card, &state), None);
    }

    #[test]
    fn test_debug_lists_predicates() {
        let mut library = ScriptLibrary::new();
        library.register_predicate("b", |_, _| true);
        library.register_predicate("a", |_, _| true);
        let text = format!("{:?}", library);
        assert!(text.contains("[\"a\", \"b\"]"));
    }
}
