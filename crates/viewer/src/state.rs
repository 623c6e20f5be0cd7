//! Viewer state model.
//!
//! The viewer is always in exactly one of six top-level states. The
//! interruption sequence between manual and automatic orbit is a tagged
//! sub-phase nested inside `Interruption`, so illegal combinations
//! (e.g. "returning" while still cooling down) cannot be represented.

use std::time::Instant;

use crate::error::LoadFailure;

/// Sub-phase of the interruption sequence between manual and automatic orbit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptionPhase {
    /// Fixed delay after manual interaction ends, before the camera moves.
    Cooldown,
    /// Eased camera move back to the home pose is in flight.
    ReturningToOriginStart,
    /// The return move has landed; automatic orbit resumes immediately.
    ReturningToOriginEnd,
}

impl InterruptionPhase {
    /// Stable label used in logs and state-change notifications.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cooldown => "INTERRUPTION_COOLDOWN",
            Self::ReturningToOriginStart => "RETURN_TO_ORIGIN_START",
            Self::ReturningToOriginEnd => "RETURN_TO_ORIGIN_END",
        }
    }
}

/// Top-level viewer state.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerState {
    /// Initialized object, nothing loaded yet.
    Idle,
    /// At least one asset load task is outstanding.
    Loading,
    /// A load task failed; terminal until the viewer is re-initialized.
    Failed(LoadFailure),
    /// Camera orbits the target on a fixed schedule, independent of input.
    AutoOrbit,
    /// Camera orientation is driven by live user input.
    ManualOrbit,
    /// Manual interaction ended; cooling down and returning to auto orbit.
    Interruption {
        phase: InterruptionPhase,
        /// When the interruption sequence began (the instant interaction ended).
        started_at: Instant,
    },
}

impl ViewerState {
    /// Stable label used in logs and state-change notifications.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Loading => "LOADING",
            Self::Failed(_) => "FAILED",
            Self::AutoOrbit => "AUTO_ORBIT",
            Self::ManualOrbit => "MANUAL_ORBIT",
            Self::Interruption { phase, .. } => phase.label(),
        }
    }

    /// Whether a starting interaction is accepted in this state.
    ///
    /// Manual orbit can only be entered from automatic orbit or by
    /// pre-empting an interruption sequence.
    pub fn accepts_interaction(&self) -> bool {
        matches!(self, Self::AutoOrbit | Self::Interruption { .. })
    }

    /// Whether this state is any phase of the interruption sequence.
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Interruption { .. })
    }
}

impl std::fmt::Display for ViewerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
