use thiserror::Error;
use uuid::Uuid;

/// Lifecycle phases of a spectated room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    /// No beatmap has been picked yet.
    Empty,
    /// A beatmap was picked and its attributes are being acquired.
    AwaitingBeatmap(BeatmapStatus),
    /// Beatmap attributes are known; waiting for gameplay to start.
    BeatmapReady,
    /// Gameplay is live.
    InGameplay,
    /// The round finished; late stat messages are still accepted.
    GameplayEnded,
}

/// Progress of the beatmap acquisition while awaiting a beatmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeatmapStatus {
    /// The collaborator has not answered yet.
    Pending,
    /// The collaborator could not provide the beatmap.
    NotFound,
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEvent {
    /// A different beatmap was picked.
    BeatmapChanged,
    /// The beatmap collaborator delivered the attributes.
    BeatmapAcquired,
    /// The beatmap collaborator gave up.
    BeatmapFailed,
    /// Players started playing.
    GameplayStarted,
    /// Players finished playing.
    GameplayEnded,
    /// The room is torn down.
    Reset,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: RoomPhase,
    /// The event that cannot be applied from this phase.
    pub event: RoomEvent,
}

/// Errors that can occur when planning a state machine transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    #[error("a transition is already pending")]
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    #[error(transparent)]
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// No transition is currently pending.
    #[error("no transition is pending")]
    NoPending,
    /// Plan ID does not match the pending plan.
    #[error("pending transition {expected} does not match {got}")]
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// State machine phase changed since the plan was created.
    #[error("phase changed during transition (expected {expected:?}, got {actual:?})")]
    PhaseMismatch {
        /// Phase when plan was created.
        expected: RoomPhase,
        /// Current phase.
        actual: RoomPhase,
    },
    /// State machine version changed since the plan was created.
    #[error("version changed during transition (expected {expected}, got {actual})")]
    VersionMismatch {
        /// Version when plan was created.
        expected: usize,
        /// Current version.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbortError {
    /// No transition is currently pending.
    #[error("no transition is pending")]
    NoPending,
    /// Plan ID does not match the pending plan.
    #[error("pending transition {expected} does not match {got}")]
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A planned state machine transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the state machine is currently in.
    pub from: RoomPhase,
    /// Phase the state machine will transition to.
    pub to: RoomPhase,
    /// Event that triggered this transition.
    pub event: RoomEvent,
    /// Version number after applying this transition.
    pub version_next: usize,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase of the state machine.
    pub phase: RoomPhase,
    /// Version number of the state machine (increments on each transition).
    pub version: usize,
    /// Pending transition phase, if a transition is planned but not yet applied.
    pub pending: Option<RoomPhase>,
}

/// Room lifecycle state machine.
///
/// Transitions are two-step: [`plan`](Self::plan) validates and reserves the
/// transition, the caller performs the side effects, then [`apply`](Self::apply)
/// commits or [`abort`](Self::abort) drops it.
#[derive(Debug, Clone)]
pub struct RoomStateMachine {
    phase: RoomPhase,
    version: usize,
    pending: Option<Plan>,
}

impl Default for RoomStateMachine {
    fn default() -> Self {
        Self {
            phase: RoomPhase::Empty,
            version: 0,
            pending: None,
        }
    }
}

impl RoomStateMachine {
    /// Create a new state machine initialised in the empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    /// Number of applied transitions.
    pub fn version(&self) -> usize {
        self.version
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
            pending: self.pending.as_ref().map(|plan| plan.to),
        }
    }

    /// Plan a transition by validating that the event can be applied from the current phase.
    /// Returns a Plan that can later be applied or aborted.
    pub fn plan(&mut self, event: RoomEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to: next,
            event,
            version_next: self.version + 1,
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, moving the state machine to the next phase.
    /// Returns the new phase after the transition.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<RoomPhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;

        Ok(self.phase)
    }

    /// Abort a planned transition without applying it.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: RoomEvent) -> Result<RoomPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (_, RoomEvent::BeatmapChanged) => RoomPhase::AwaitingBeatmap(BeatmapStatus::Pending),
            (_, RoomEvent::Reset) => RoomPhase::Empty,
            (RoomPhase::AwaitingBeatmap(_), RoomEvent::BeatmapAcquired) => RoomPhase::BeatmapReady,
            (RoomPhase::AwaitingBeatmap(_), RoomEvent::BeatmapFailed) => {
                RoomPhase::AwaitingBeatmap(BeatmapStatus::NotFound)
            }
            (RoomPhase::BeatmapReady, RoomEvent::GameplayStarted)
            | (RoomPhase::GameplayEnded, RoomEvent::GameplayStarted) => RoomPhase::InGameplay,
            (RoomPhase::InGameplay, RoomEvent::GameplayEnded) => RoomPhase::GameplayEnded,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut RoomStateMachine, event: RoomEvent) -> RoomPhase {
        let plan = sm.plan(event).unwrap();
        sm.apply(plan.id).unwrap()
    }

    #[test]
    fn initial_state_is_empty() {
        let sm = RoomStateMachine::new();
        assert_eq!(sm.phase(), RoomPhase::Empty);
        assert_eq!(sm.version(), 0);
    }

    #[test]
    fn full_happy_path_through_round() {
        let mut sm = RoomStateMachine::new();

        assert_eq!(
            apply(&mut sm, RoomEvent::BeatmapChanged),
            RoomPhase::AwaitingBeatmap(BeatmapStatus::Pending)
        );
        assert_eq!(
            apply(&mut sm, RoomEvent::BeatmapAcquired),
            RoomPhase::BeatmapReady
        );
        assert_eq!(
            apply(&mut sm, RoomEvent::GameplayStarted),
            RoomPhase::InGameplay
        );
        assert_eq!(
            apply(&mut sm, RoomEvent::GameplayEnded),
            RoomPhase::GameplayEnded
        );
        assert_eq!(
            apply(&mut sm, RoomEvent::GameplayStarted),
            RoomPhase::InGameplay
        );
        assert_eq!(sm.version(), 5);
    }

    #[test]
    fn failed_acquisition_stays_awaiting() {
        let mut sm = RoomStateMachine::new();
        apply(&mut sm, RoomEvent::BeatmapChanged);

        assert_eq!(
            apply(&mut sm, RoomEvent::BeatmapFailed),
            RoomPhase::AwaitingBeatmap(BeatmapStatus::NotFound)
        );
        assert!(sm.plan(RoomEvent::GameplayStarted).is_err());
        assert_eq!(
            apply(&mut sm, RoomEvent::BeatmapAcquired),
            RoomPhase::BeatmapReady
        );
    }

    #[test]
    fn beatmap_change_is_valid_from_every_phase() {
        let mut sm = RoomStateMachine::new();
        apply(&mut sm, RoomEvent::BeatmapChanged);
        apply(&mut sm, RoomEvent::BeatmapAcquired);
        apply(&mut sm, RoomEvent::GameplayStarted);

        assert_eq!(
            apply(&mut sm, RoomEvent::BeatmapChanged),
            RoomPhase::AwaitingBeatmap(BeatmapStatus::Pending)
        );
        assert_eq!(apply(&mut sm, RoomEvent::Reset), RoomPhase::Empty);
    }

    #[test]
    fn invalid_transition_returns_error() {
        let mut sm = RoomStateMachine::new();
        let err = sm.plan(RoomEvent::GameplayEnded).unwrap_err();
        match err {
            PlanError::InvalidTransition(invalid) => {
                assert_eq!(invalid.from, RoomPhase::Empty);
                assert_eq!(invalid.event, RoomEvent::GameplayEnded);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(sm.snapshot().pending, None);
    }

    #[test]
    fn pending_plan_blocks_new_plans() {
        let mut sm = RoomStateMachine::new();
        let plan = sm.plan(RoomEvent::BeatmapChanged).unwrap();
        assert_eq!(
            sm.snapshot().pending,
            Some(RoomPhase::AwaitingBeatmap(BeatmapStatus::Pending))
        );
        assert_eq!(
            sm.plan(RoomEvent::Reset).unwrap_err(),
            PlanError::AlreadyPending
        );

        let other = Uuid::new_v4();
        assert!(matches!(
            sm.apply(other),
            Err(ApplyError::IdMismatch { .. })
        ));
        assert!(matches!(
            sm.abort(other),
            Err(AbortError::IdMismatch { .. })
        ));
        sm.apply(plan.id).unwrap();
    }

    #[test]
    fn abort_clears_pending() {
        let mut sm = RoomStateMachine::new();
        let plan = sm.plan(RoomEvent::BeatmapChanged).unwrap();
        sm.abort(plan.id).unwrap();
        assert!(sm.pending.is_none());
        assert_eq!(sm.phase(), RoomPhase::Empty);
        assert_eq!(sm.version(), 0);
    }
}
