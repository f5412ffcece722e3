//! Target selection requests.
//!
//! ## Flow
//!
//! 1. [`TargetingManager::request_targets`] computes the valid targets.
//! 2. Too few targets for a mandatory requirement: `Failed`.
//! 3. A single-target requirement with exactly one valid target:
//!    `Selected` without asking.
//! 4. Otherwise the request is stored and `Suspended(id)` is returned. The
//!    caller answers with [`submit_selection`](TargetingManager::submit_selection)
//!    or [`cancel_selection`](TargetingManager::cancel_selection).
//!
//! A request is consumed by a successful submit or a cancel. Answering the
//! same id twice fails with `UnknownRequest`.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, warn};

use super::requirement::TargetRequirement;
use crate::core::{CardId, Match, PlayerId, RequestId, RulesError, RulesResult, TargetList};
use crate::keywords::KeywordProcessor;
use crate::scripts::ScriptRegistry;

/// An outstanding target selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRequest {
    /// Request id for the answer.
    pub id: RequestId,

    /// The card whose effect is targeting.
    pub source: CardId,

    /// The player choosing.
    pub controller: PlayerId,

    /// What may be chosen.
    pub requirement: TargetRequirement,

    /// Valid choices, ascending by id.
    pub valid_targets: Vec<CardId>,
}

/// Result of [`TargetingManager::request_targets`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetOutcome {
    /// Targets were chosen without asking.
    Selected(TargetList),
    /// The requirement cannot be met.
    Failed,
    /// Waiting for an answer to this request.
    Suspended(RequestId),
}

/// Owns the outstanding target request, if any.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TargetingManager {
    pending: Option<TargetRequest>,
}

impl TargetingManager {
    /// Create a manager with no request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every card `controller` may choose for `requirement`, ascending by id.
    ///
    /// The source itself is never a valid target. Barrier cards are skipped
    /// when an opponent is choosing.
    #[must_use]
    pub fn valid_targets(
        requirement: &TargetRequirement,
        source: CardId,
        controller: PlayerId,
        state: &Match,
        scripts: &dyn ScriptRegistry,
    ) -> Vec<CardId> {
        state
            .card_ids()
            .into_iter()
            .filter(|id| *id != source)
            .filter(|id| {
                state.card(*id).is_some_and(|card| {
                    KeywordProcessor::can_be_targeted(card, controller)
                        && requirement.filter.matches(card, controller, state, scripts)
                })
            })
            .collect()
    }

    /// Check whether enough valid targets exist.
    #[must_use]
    pub fn has_valid_targets(
        requirement: &TargetRequirement,
        source: CardId,
        controller: PlayerId,
        state: &Match,
        scripts: &dyn ScriptRegistry,
    ) -> bool {
        requirement.optional
            || Self::valid_targets(requirement, source, controller, state, scripts).len()
                >= requirement.min_targets
    }

    /// Check a proposed selection against the valid set and the counts.
    pub fn validate_selection(
        requirement: &TargetRequirement,
        valid: &[CardId],
        selection: &[CardId],
    ) -> RulesResult<TargetList> {
        if !requirement.validate_count(selection.len()) {
            return Err(RulesError::illegal(format!(
                "expected {}..={} targets, got {}",
                requirement.min_targets,
                requirement.max_targets,
                selection.len()
            )));
        }
        let mut chosen: TargetList = SmallVec::new();
        for id in selection {
            if !valid.contains(id) {
                return Err(RulesError::illegal(format!("{} is not a valid target", id)));
            }
            if chosen.contains(id) {
                return Err(RulesError::illegal(format!("{} chosen twice", id)));
            }
            chosen.push(*id);
        }
        Ok(chosen)
    }

    /// Start a target selection.
    ///
    /// With `interactive` false the first valid targets are taken instead of
    /// suspending.
    pub fn request_targets(
        &mut self,
        requirement: &TargetRequirement,
        source: CardId,
        controller: PlayerId,
        state: &mut Match,
        scripts: &dyn ScriptRegistry,
        interactive: bool,
    ) -> TargetOutcome {
        let valid = Self::valid_targets(requirement, source, controller, state, scripts);

        if valid.len() < requirement.min_targets && !requirement.optional {
            debug!(%source, found = valid.len(), needed = requirement.min_targets, "not enough targets");
            return TargetOutcome::Failed;
        }

        if requirement.is_single_target() && valid.len() == 1 && !requirement.optional {
            return TargetOutcome::Selected(SmallVec::from_slice(&valid));
        }

        if !interactive {
            let take = requirement
                .min_targets
                .max(1)
                .min(requirement.max_targets)
                .min(valid.len());
            return TargetOutcome::Selected(valid.iter().copied().take(take).collect());
        }

        let id = state.next_request_id();
        debug!(%source, request = %id, choices = valid.len(), "target request opened");
        self.pending = Some(TargetRequest {
            id,
            source,
            controller,
            requirement: requirement.clone(),
            valid_targets: valid,
        });
        TargetOutcome::Suspended(id)
    }

    /// The outstanding request.
    #[must_use]
    pub fn pending(&self) -> Option<&TargetRequest> {
        self.pending.as_ref()
    }

    /// Answer the outstanding request.
    ///
    /// An invalid selection is rejected and the request stays open.
    pub fn submit_selection(&mut self, id: RequestId, selection: &[CardId]) -> RulesResult<TargetList> {
        let request = match &self.pending {
            Some(request) if request.id == id => request,
            _ => return Err(RulesError::UnknownRequest(id)),
        };
        let chosen =
            Self::validate_selection(&request.requirement, &request.valid_targets, selection)
                .inspect_err(|err| warn!(request = %id, %err, "target selection rejected"))?;
        self.pending = None;
        Ok(chosen)
    }

    /// Cancel the outstanding request.
    pub fn cancel_selection(&mut self, id: RequestId) -> RulesResult<TargetRequest> {
        match self.pending.take() {
            Some(request) if request.id == id => Ok(request),
            other => {
                self.pending = other;
                Err(RulesError::UnknownRequest(id))
            }
        }
    }

    /// Drop any outstanding request.
    pub fn clear(&mut self) {
        self.pending = None;
    }
}
