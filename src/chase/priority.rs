//! Priority passing and timing windows.
//!
//! Two players alternate priority. Passing hands priority to the opponent;
//! two consecutive passes either resolve the top of the chase or, with an
//! empty chase, tell the caller to advance the turn structure. Any action
//! that puts something on the chase clears both pass flags and hands
//! priority to the opponent.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::pending::{PendingAction, PendingId};
use crate::core::{ActionType, Phase, PlayerId, PlayerMap, RulesError, RulesResult};

/// Priority state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriorityState {
    /// This player holds priority.
    Active(PlayerId),
    /// Nobody holds priority: the game has not started or is over.
    Passed,
    /// Nobody holds priority until a trigger's controller answers a target
    /// request.
    WaitingResponse,
    /// Both players passed with an empty chase; the turn structure must
    /// advance.
    BothPassed,
    /// The top of the chase is resolving.
    Resolving,
    /// A pending action is waiting for input.
    WaitingInput,
}

/// What a pass led to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassResult {
    /// Priority moved to this player.
    PriorityTo(PlayerId),
    /// Both passed over a non-empty chase: resolve the top item.
    Resolve,
    /// Both passed over an empty chase: advance the phase.
    AdvancePhase,
}

/// Timing facts needed to judge an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimingWindow {
    pub player: PlayerId,
    pub turn_player: PlayerId,
    pub phase: Phase,
    pub in_battle: bool,
    pub chase_empty: bool,
    /// An attack is waiting for blocks.
    pub awaiting_blockers: bool,
}

impl TimingWindow {
    /// Own turn, Main phase, no battle, empty chase.
    #[must_use]
    pub fn is_main_timing(&self) -> bool {
        self.player == self.turn_player
            && self.phase == Phase::Main
            && !self.in_battle
            && self.chase_empty
    }

    /// Check whether the window allows an action type at all.
    ///
    /// Card-level checks (instant speed, costs, targets) happen later.
    #[must_use]
    pub fn allows(&self, action: ActionType) -> bool {
        match action {
            ActionType::Pass
            | ActionType::ProduceWill
            | ActionType::PlayCard
            | ActionType::ActivateAbility => true,
            ActionType::CallStone | ActionType::Judgment => self.is_main_timing(),
            ActionType::Attack => {
                self.phase == Phase::Battle && self.player == self.turn_player
            }
            ActionType::Block => {
                self.phase == Phase::Battle
                    && self.player != self.turn_player
                    && self.awaiting_blockers
            }
        }
    }
}

/// Tracks who holds priority, the pass flags, and the pending action.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriorityManager {
    state: PriorityState,
    turn_player: PlayerId,
    passed: PlayerMap<bool>,
    pending: Option<PendingAction>,
    next_pending_id: u32,
}

impl Default for PriorityManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PriorityManager {
    /// Create a manager where nobody holds priority.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: PriorityState::Passed,
            turn_player: PlayerId(0),
            passed: PlayerMap::with_value(false),
            pending: None,
            next_pending_id: 1,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> PriorityState {
        self.state
    }

    /// The player holding priority.
    #[must_use]
    pub fn holder(&self) -> Option<PlayerId> {
        match self.state {
            PriorityState::Active(player) => Some(player),
            _ => None,
        }
    }

    /// Check whether `player` holds priority.
    #[must_use]
    pub fn has_priority(&self, player: PlayerId) -> bool {
        self.state == PriorityState::Active(player)
    }

    /// Check whether `player` has passed since the last action.
    #[must_use]
    pub fn has_passed(&self, player: PlayerId) -> bool {
        self.passed[player]
    }

    /// The turn player as of the last phase reset.
    #[must_use]
    pub fn turn_player(&self) -> PlayerId {
        self.turn_player
    }

    // === Transitions ===

    /// Give priority to the turn player at the start of a phase.
    pub fn reset_for_phase(&mut self, turn_player: PlayerId) {
        self.turn_player = turn_player;
        self.passed.fill(false);
        self.pending = None;
        self.state = PriorityState::Active(turn_player);
        debug!(player = %turn_player, "priority reset for phase");
    }

    /// Record a pass by the priority holder.
    pub fn record_pass(&mut self, player: PlayerId, chase_empty: bool) -> RulesResult<PassResult> {
        if !self.has_priority(player) {
            return Err(RulesError::illegal(format!("{} does not hold priority", player)));
        }
        self.passed[player] = true;
        let opponent = player.opponent();

        if self.passed[opponent] {
            self.state = PriorityState::BothPassed;
            if chase_empty {
                debug!("both passed, chase empty");
                Ok(PassResult::AdvancePhase)
            } else {
                self.state = PriorityState::Resolving;
                debug!("both passed, resolving");
                Ok(PassResult::Resolve)
            }
        } else {
            self.state = PriorityState::Active(opponent);
            debug!(from = %player, to = %opponent, "priority passed");
            Ok(PassResult::PriorityTo(opponent))
        }
    }

    /// After `player` put something on the chase: clear passes and hand
    /// priority to the opponent.
    pub fn after_action(&mut self, player: PlayerId) {
        self.passed.fill(false);
        self.state = PriorityState::Active(player.opponent());
    }

    /// After the top of the chase resolved: the turn player gets priority.
    pub fn after_chase_resolution(&mut self) {
        self.passed.fill(false);
        self.state = PriorityState::Active(self.turn_player);
    }

    /// Give priority to `player` with both flags cleared.
    pub fn give_to(&mut self, player: PlayerId) {
        self.passed.fill(false);
        self.state = PriorityState::Active(player);
    }

    /// Suspend priority until a trigger target request is answered.
    pub fn await_response(&mut self) {
        self.state = PriorityState::WaitingResponse;
    }

    /// Nobody holds priority any more.
    pub fn close(&mut self) {
        self.pending = None;
        self.state = PriorityState::Passed;
    }

    // === Pending action ===

    /// Allocate an id for a new pending action.
    pub fn next_pending_id(&mut self) -> PendingId {
        let id = PendingId(self.next_pending_id);
        self.next_pending_id += 1;
        id
    }

    /// Park an action until its inputs arrive.
    pub fn begin_input(&mut self, pending: PendingAction) {
        debug!(pending = %pending.id, player = %pending.player, "waiting for input");
        self.pending = Some(pending);
        self.state = PriorityState::WaitingInput;
    }

    /// The pending action.
    #[must_use]
    pub fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    /// Take the pending action and hand priority back to its player.
    pub fn take_pending(&mut self) -> Option<PendingAction> {
        let pending = self.pending.take()?;
        self.state = PriorityState::Active(pending.player);
        Some(pending)
    }
}
