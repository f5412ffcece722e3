//! Card script declarations.
//!
//! A [`CardScript`] is everything the rules core needs to know about a
//! card's behaviour beyond its printed data. Scripts are produced by an
//! external ability compiler; here they are plain structs.

use serde::{Deserialize, Serialize};

use crate::cards::{Attribute, WillCost};
use crate::continuous::ContinuousDeclaration;
use crate::effects::EffectOp;
use crate::replacement::ReplacementDeclaration;
use crate::targeting::TargetRequirement;
use crate::triggers::TriggeredAbility;

/// An activated ability.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivatedAbility {
    /// Display name.
    pub name: String,

    /// Will cost.
    pub cost: WillCost,

    /// Rest the source as part of the cost.
    pub rest_cost: bool,

    /// Targets chosen on activation.
    pub targets: Option<TargetRequirement>,

    /// What it does.
    pub ops: Vec<EffectOp>,
}

impl ActivatedAbility {
    /// An ability with no cost.
    #[must_use]
    pub fn new(name: impl Into<String>, ops: Vec<EffectOp>) -> Self {
        Self {
            name: name.into(),
            cost: WillCost::FREE,
            rest_cost: false,
            targets: None,
            ops,
        }
    }

    /// Set the will cost (builder pattern).
    #[must_use]
    pub fn with_cost(mut self, cost: WillCost) -> Self {
        self.cost = cost;
        self
    }

    /// Require resting the source (builder pattern).
    #[must_use]
    pub fn with_rest_cost(mut self) -> Self {
        self.rest_cost = true;
        self
    }

    /// Set the target requirement (builder pattern).
    #[must_use]
    pub fn with_targets(mut self, targets: TargetRequirement) -> Self {
        self.targets = Some(targets);
        self
    }
}

/// One mode of a modal spell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellMode {
    /// Shown to the player.
    pub label: String,
    /// What the mode does.
    pub ops: Vec<EffectOp>,
}

/// "Choose N" on a modal spell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeChoice {
    /// Available modes.
    pub modes: Vec<SpellMode>,
    /// How many must be chosen.
    pub choose: usize,
}

impl ModeChoice {
    /// Check a selection: the right count, no repeats, all in range.
    #[must_use]
    pub fn is_valid_selection(&self, selected: &[usize]) -> bool {
        selected.len() == self.choose
            && selected.iter().all(|m| *m < self.modes.len())
            && selected
                .iter()
                .enumerate()
                .all(|(i, m)| !selected[..i].contains(m))
    }

    /// Operations of the selected modes, in selection order.
    #[must_use]
    pub fn ops_for(&self, selected: &[usize]) -> Vec<EffectOp> {
        selected
            .iter()
            .filter_map(|m| self.modes.get(*m))
            .flat_map(|mode| mode.ops.iter().cloned())
            .collect()
    }
}

/// Everything a card does.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardScript {
    /// Operations run when the card resolves from the chase.
    pub on_resolve: Vec<EffectOp>,

    /// Targets chosen when the card is played.
    pub targets: Option<TargetRequirement>,

    /// Modes chosen when the card is played.
    pub modes: Option<ModeChoice>,

    /// Activated abilities, addressed by index.
    pub activated: Vec<ActivatedAbility>,

    /// Triggered abilities, live while the card is on the field.
    pub triggered: Vec<TriggeredAbility>,

    /// Continuous effects, live while the card is on the field.
    pub continuous: Vec<ContinuousDeclaration>,

    /// Replacement effects, live while the card is on the field.
    pub replacements: Vec<ReplacementDeclaration>,

    /// Colours of will the card can produce by resting.
    pub will_colors: Vec<Attribute>,
}

impl CardScript {
    /// An empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add resolve operations (builder pattern).
    #[must_use]
    pub fn on_resolve(mut self, ops: Vec<EffectOp>) -> Self {
        self.on_resolve.extend(ops);
        self
    }

    /// Set the target requirement (builder pattern).
    #[must_use]
    pub fn with_targets(mut self, targets: TargetRequirement) -> Self {
        self.targets = Some(targets);
        self
    }

    /// Set the modes (builder pattern).
    #[must_use]
    pub fn with_modes(mut self, modes: ModeChoice) -> Self {
        self.modes = Some(modes);
        self
    }

    /// Add an activated ability (builder pattern).
    #[must_use]
    pub fn with_activated(mut self, ability: ActivatedAbility) -> Self {
        self.activated.push(ability);
        self
    }

    /// Add a triggered ability (builder pattern).
    #[must_use]
    pub fn with_trigger(mut self, ability: TriggeredAbility) -> Self {
        self.triggered.push(ability);
        self
    }

    /// Add a continuous effect (builder pattern).
    #[must_use]
    pub fn with_continuous(mut self, declaration: ContinuousDeclaration) -> Self {
        self.continuous.push(declaration);
        self
    }

    /// Add a replacement effect (builder pattern).
    #[must_use]
    pub fn with_replacement(mut self, declaration: ReplacementDeclaration) -> Self {
        self.replacements.push(declaration);
        self
    }

    /// Produce will of these colours (builder pattern).
    #[must_use]
    pub fn producing(mut self, colors: &[Attribute]) -> Self {
        self.will_colors = colors.to_vec();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_selection() {
        let choice = ModeChoice {
            modes: vec![
                SpellMode { label: "draw".into(), ops: vec![EffectOp::draw(1)] },
                SpellMode { label: "life".into(), ops: vec![EffectOp::gain_life(300)] },
                SpellMode { label: "burn".into(), ops: vec![EffectOp::damage_opponent(300)] },
            ],
            choose: 2,
        };
        assert!(choice.is_valid_selection(&[0, 2]));
        assert!(!choice.is_valid_selection(&[1, 1]));
        assert!(!choice.is_valid_selection(&[0]));
        assert!(!choice.is_valid_selection(&[0, 3]));
        assert_eq!(
            choice.ops_for(&[2, 0]),
            vec![EffectOp::damage_opponent(300), EffectOp::draw(1)]
        );
    }
}
