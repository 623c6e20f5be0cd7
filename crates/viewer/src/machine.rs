//! Viewer state machine.
//!
//! Owns the current `ViewerState`, the cooldown deadline, the load cycle
//! counter and the observer list. Reacts to load outcomes, interaction
//! signals and the frame clock, and returns `ViewerCommand`s for the
//! caller to execute on the orbit controller, scene graph and renderer.
//! The machine itself never touches a collaborator.
//!
//! Event precedence: callers must apply externally-triggered events
//! (interaction signals) before calling `tick` within a frame, so an
//! interaction that races a cooldown expiry always wins and the expiry
//! is discarded.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{LoadFailure, ViewerError};
use crate::loader::{LoadOutcome, LoadedAssets};
use crate::state::{InterruptionPhase, ViewerState};

/// Delay between the end of manual interaction and the origin return.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(3000);

/// Identifies one load cycle; outcomes from a superseded cycle are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadCycleId(u64);

impl LoadCycleId {
    /// The cycle id assigned by the first `initialize` call.
    pub fn first() -> Self {
        Self(1)
    }

    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for LoadCycleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cycle-{}", self.0)
    }
}

/// Handle returned by `register_state_change_handler`, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Commands the machine emits for the caller to execute on collaborators.
#[derive(Debug)]
pub enum ViewerCommand {
    /// Start a new load cycle for both assets.
    StartLoad { cycle: LoadCycleId },
    /// Hand the loaded payloads to the scene graph.
    AttachAssets(LoadedAssets),
    /// Put the orbit controller into automatic rotation.
    EnableAutoRotate,
    /// Put the orbit controller under direct user control.
    EnableManualControl,
    /// Begin the eased camera move back to the home pose.
    BeginOriginReturn,
    /// Abort an in-flight origin return; the camera stays where it is.
    CancelOriginReturn,
    /// Surface a load failure to whatever presents errors.
    ShowFailure(LoadFailure),
}

type StateHandler = Box<dyn FnMut(&ViewerState)>;

/// The viewer's core decision-maker.
pub struct ViewerStateMachine {
    state: ViewerState,
    cooldown: Duration,
    cooldown_deadline: Option<Instant>,
    cycle: Option<LoadCycleId>,
    handlers: Vec<(HandlerId, StateHandler)>,
    next_handler_id: u64,
}

impl std::fmt::Debug for ViewerStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerStateMachine")
            .field("state", &self.state)
            .field("cooldown", &self.cooldown)
            .field("cooldown_deadline", &self.cooldown_deadline)
            .field("cycle", &self.cycle)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl Default for ViewerStateMachine {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl ViewerStateMachine {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            state: ViewerState::Idle,
            cooldown,
            cooldown_deadline: None,
            cycle: None,
            handlers: Vec::new(),
            next_handler_id: 1,
        }
    }

    /// The currently active state.
    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    /// The live load cycle, if any.
    pub fn cycle(&self) -> Option<LoadCycleId> {
        self.cycle
    }

    /// Register an observer; it is invoked synchronously with the new
    /// state on every accepted transition, in registration order.
    pub fn register_state_change_handler(
        &mut self,
        handler: impl FnMut(&ViewerState) + 'static,
    ) -> HandlerId {
        let id = HandlerId(self.next_handler_id);
        self.next_handler_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Remove a previously registered observer. Returns whether it was
    /// still registered.
    pub fn unregister_state_change_handler(&mut self, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }

    /// Begin (or, after a failure, restart) a load cycle.
    ///
    /// Valid in `Idle` and `Failed`; anywhere else the call fails with
    /// `AlreadyInitialized`, leaving the state and any live cycle intact.
    /// A restart supersedes the previous cycle, so its in-flight task
    /// outcomes are discarded on arrival.
    pub fn initialize(&mut self) -> Result<Vec<ViewerCommand>, ViewerError> {
        match self.state {
            ViewerState::Idle | ViewerState::Failed(_) => {
                let cycle = self
                    .cycle
                    .map_or_else(LoadCycleId::first, LoadCycleId::next);
                self.cycle = Some(cycle);
                info!(%cycle, "starting load cycle");
                self.set_state(ViewerState::Loading);
                Ok(vec![ViewerCommand::StartLoad { cycle }])
            }
            _ => Err(ViewerError::AlreadyInitialized),
        }
    }

    /// Consume the terminal outcome of a load cycle.
    ///
    /// Outcomes from a superseded cycle, or arriving outside `Loading`,
    /// are discarded.
    pub fn on_load_outcome(
        &mut self,
        cycle: LoadCycleId,
        outcome: LoadOutcome,
    ) -> Vec<ViewerCommand> {
        if self.cycle != Some(cycle) || self.state != ViewerState::Loading {
            debug!(%cycle, state = %self.state, "discarding stale load outcome");
            return Vec::new();
        }
        match outcome {
            LoadOutcome::Failed(failure) => {
                warn!(%failure, "load cycle failed");
                self.set_state(ViewerState::Failed(failure.clone()));
                vec![ViewerCommand::ShowFailure(failure)]
            }
            LoadOutcome::Ready(assets) => {
                self.set_state(ViewerState::AutoOrbit);
                vec![
                    ViewerCommand::AttachAssets(assets),
                    ViewerCommand::EnableAutoRotate,
                ]
            }
        }
    }

    /// Manual interaction began.
    ///
    /// Valid in `AutoOrbit` and every interruption phase, where it
    /// pre-empts the cooldown deadline and any in-flight origin return.
    /// A no-op everywhere else; input streams are noisy and stray events
    /// are tolerated rather than raised.
    pub fn on_interaction_started(&mut self) -> Vec<ViewerCommand> {
        match self.state {
            ViewerState::AutoOrbit => {
                self.set_state(ViewerState::ManualOrbit);
                vec![ViewerCommand::EnableManualControl]
            }
            ViewerState::Interruption { phase, .. } => {
                self.cooldown_deadline = None;
                self.set_state(ViewerState::ManualOrbit);
                let mut commands = Vec::new();
                if phase == InterruptionPhase::ReturningToOriginStart {
                    commands.push(ViewerCommand::CancelOriginReturn);
                }
                commands.push(ViewerCommand::EnableManualControl);
                commands
            }
            _ => {
                debug!(state = %self.state, "ignoring interaction start");
                Vec::new()
            }
        }
    }

    /// Manual interaction ended; arm the single-shot cooldown deadline.
    ///
    /// Valid only in `ManualOrbit`; a no-op everywhere else.
    pub fn on_interaction_ended(&mut self, now: Instant) -> Vec<ViewerCommand> {
        if self.state != ViewerState::ManualOrbit {
            debug!(state = %self.state, "ignoring interaction end");
            return Vec::new();
        }
        self.cooldown_deadline = Some(now + self.cooldown);
        self.set_state(ViewerState::Interruption {
            phase: InterruptionPhase::Cooldown,
            started_at: now,
        });
        Vec::new()
    }

    /// Advance the machine's clock; fires the cooldown deadline when
    /// reached. The deadline is consumed on fire and the transition is
    /// state-guarded, so a duplicated or stale fire is a no-op.
    pub fn tick(&mut self, now: Instant) -> Vec<ViewerCommand> {
        let due = self
            .cooldown_deadline
            .is_some_and(|deadline| now >= deadline);
        if !due {
            return Vec::new();
        }
        self.cooldown_deadline = None;
        match self.state {
            ViewerState::Interruption {
                phase: InterruptionPhase::Cooldown,
                started_at,
            } => {
                self.set_state(ViewerState::Interruption {
                    phase: InterruptionPhase::ReturningToOriginStart,
                    started_at,
                });
                vec![ViewerCommand::BeginOriginReturn]
            }
            _ => {
                debug!(state = %self.state, "discarding stale cooldown expiry");
                Vec::new()
            }
        }
    }

    /// The origin-return move landed; resume automatic orbit.
    ///
    /// Valid only while a return is in flight; a completion signal from a
    /// cancelled move is discarded.
    pub fn on_return_completed(&mut self) -> Vec<ViewerCommand> {
        match self.state {
            ViewerState::Interruption {
                phase: InterruptionPhase::ReturningToOriginStart,
                started_at,
            } => {
                self.set_state(ViewerState::Interruption {
                    phase: InterruptionPhase::ReturningToOriginEnd,
                    started_at,
                });
                self.set_state(ViewerState::AutoOrbit);
                vec![ViewerCommand::EnableAutoRotate]
            }
            _ => {
                debug!(state = %self.state, "discarding stale return completion");
                Vec::new()
            }
        }
    }

    fn set_state(&mut self, next: ViewerState) {
        info!(from = %self.state, to = %next, "viewer state change");
        self.state = next;
        let state = self.state.clone();
        for (_, handler) in &mut self.handlers {
            handler(&state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::loader::{AssetKind, EnvironmentMap, ModelNode};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn loaded_assets() -> LoadedAssets {
        let img = image::DynamicImage::ImageRgb32F(image::Rgb32FImage::from_pixel(
            2,
            1,
            image::Rgb([0.0, 0.0, 0.0]),
        ));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::OpenExr).unwrap();
        let environment = environment_from(buf.get_ref());

        let json = br#"{"asset":{"version":"2.0"}}"#;
        let mut padded = json.to_vec();
        while padded.len() % 4 != 0 {
            padded.push(b' ');
        }
        let mut glb = Vec::new();
        glb.extend_from_slice(&0x4654_6C67u32.to_le_bytes());
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&((12 + 8 + padded.len()) as u32).to_le_bytes());
        glb.extend_from_slice(&(padded.len() as u32).to_le_bytes());
        glb.extend_from_slice(&0x4E4F_534Au32.to_le_bytes());
        glb.extend_from_slice(&padded);
        let model = model_from(&glb);

        LoadedAssets { environment, model }
    }

    fn environment_from(bytes: &[u8]) -> EnvironmentMap {
        crate::loader::decode::decode_environment(bytes).unwrap()
    }

    fn model_from(bytes: &[u8]) -> ModelNode {
        crate::loader::decode::decode_model(bytes).unwrap()
    }

    fn ready() -> LoadOutcome {
        LoadOutcome::Ready(loaded_assets())
    }

    fn not_found() -> LoadOutcome {
        LoadOutcome::Failed(LoadFailure {
            asset: AssetKind::Model,
            error: LoadError::NotFound("tower.glb".into()),
        })
    }

    fn machine_in_auto_orbit() -> (ViewerStateMachine, LoadCycleId) {
        let mut machine = ViewerStateMachine::default();
        let cycle = match machine.initialize().unwrap().remove(0) {
            ViewerCommand::StartLoad { cycle } => cycle,
            other => panic!("expected StartLoad, got {other:?}"),
        };
        machine.on_load_outcome(cycle, ready());
        assert_eq!(machine.state(), &ViewerState::AutoOrbit);
        (machine, cycle)
    }

    fn recording_handler(
        machine: &mut ViewerStateMachine,
    ) -> (HandlerId, Rc<RefCell<Vec<&'static str>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let id = machine
            .register_state_change_handler(move |state| sink.borrow_mut().push(state.label()));
        (id, seen)
    }

    #[test]
    fn test_initialize_twice_fails_without_side_effects() {
        let mut machine = ViewerStateMachine::default();
        let commands = machine.initialize().unwrap();
        assert!(matches!(commands[0], ViewerCommand::StartLoad { .. }));
        let cycle = machine.cycle().unwrap();

        let err = machine.initialize().unwrap_err();
        assert!(matches!(err, ViewerError::AlreadyInitialized));
        assert_eq!(machine.state(), &ViewerState::Loading);
        assert_eq!(machine.cycle(), Some(cycle));
    }

    #[test]
    fn test_reinitialize_after_failure_bumps_cycle() {
        let mut machine = ViewerStateMachine::default();
        let cycle = machine.cycle_after_init();
        machine.on_load_outcome(cycle, not_found());
        assert!(matches!(machine.state(), ViewerState::Failed(_)));

        let commands = machine.initialize().unwrap();
        let &ViewerCommand::StartLoad { cycle: next } = &commands[0] else {
            panic!("expected StartLoad");
        };
        assert_ne!(next, cycle);

        // The superseded cycle's late outcome is discarded.
        assert!(machine.on_load_outcome(cycle, ready()).is_empty());
        assert_eq!(machine.state(), &ViewerState::Loading);
    }

    #[test]
    fn test_load_success_is_consumed_once() {
        let mut machine = ViewerStateMachine::default();
        let (_, seen) = recording_handler(&mut machine);
        let cycle = machine.cycle_after_init();

        let commands = machine.on_load_outcome(cycle, ready());
        assert!(matches!(commands[0], ViewerCommand::AttachAssets(_)));
        assert!(matches!(commands[1], ViewerCommand::EnableAutoRotate));

        // A duplicated outcome for the same cycle has no effect.
        assert!(machine.on_load_outcome(cycle, ready()).is_empty());
        assert_eq!(*seen.borrow(), vec!["LOADING", "AUTO_ORBIT"]);
    }

    #[test]
    fn test_interaction_ignored_while_loading_and_failed() {
        let mut machine = ViewerStateMachine::default();
        assert!(machine.on_interaction_started().is_empty());

        let cycle = machine.cycle_after_init();
        assert!(machine.on_interaction_started().is_empty());
        assert_eq!(machine.state(), &ViewerState::Loading);

        machine.on_load_outcome(cycle, not_found());
        assert!(machine.on_interaction_started().is_empty());
        assert!(matches!(machine.state(), ViewerState::Failed(_)));
    }

    #[test]
    fn test_cooldown_fires_once() {
        let (mut machine, _) = machine_in_auto_orbit();
        let base = Instant::now();

        machine.on_interaction_started();
        assert_eq!(machine.state(), &ViewerState::ManualOrbit);
        machine.on_interaction_ended(base);
        assert!(matches!(
            machine.state(),
            ViewerState::Interruption {
                phase: InterruptionPhase::Cooldown,
                ..
            }
        ));

        // Before the deadline nothing happens.
        assert!(machine.tick(base + Duration::from_millis(2999)).is_empty());

        let commands = machine.tick(base + DEFAULT_COOLDOWN);
        assert!(matches!(commands[0], ViewerCommand::BeginOriginReturn));
        assert!(matches!(
            machine.state(),
            ViewerState::Interruption {
                phase: InterruptionPhase::ReturningToOriginStart,
                ..
            }
        ));

        // A duplicated fire must not double-transition.
        assert!(machine.tick(base + DEFAULT_COOLDOWN).is_empty());
        assert!(machine
            .tick(base + DEFAULT_COOLDOWN + Duration::from_secs(1))
            .is_empty());
    }

    #[test]
    fn test_preemption_during_cooldown_cancels_timer() {
        let (mut machine, _) = machine_in_auto_orbit();
        let base = Instant::now();

        machine.on_interaction_started();
        machine.on_interaction_ended(base);
        let commands = machine.on_interaction_started();
        assert_eq!(machine.state(), &ViewerState::ManualOrbit);
        // No return was in flight, so nothing to cancel.
        assert!(matches!(commands[0], ViewerCommand::EnableManualControl));

        // The stale deadline firing later produces no transition.
        assert!(machine.tick(base + DEFAULT_COOLDOWN).is_empty());
        assert_eq!(machine.state(), &ViewerState::ManualOrbit);
    }

    #[test]
    fn test_preemption_during_return_cancels_motion() {
        let (mut machine, _) = machine_in_auto_orbit();
        let base = Instant::now();

        machine.on_interaction_started();
        machine.on_interaction_ended(base);
        machine.tick(base + DEFAULT_COOLDOWN);

        let commands = machine.on_interaction_started();
        assert!(matches!(commands[0], ViewerCommand::CancelOriginReturn));
        assert!(matches!(commands[1], ViewerCommand::EnableManualControl));
        assert_eq!(machine.state(), &ViewerState::ManualOrbit);

        // The cancelled move's completion signal is discarded.
        assert!(machine.on_return_completed().is_empty());
        assert_eq!(machine.state(), &ViewerState::ManualOrbit);
    }

    #[test]
    fn test_full_interruption_sequence_notifications() {
        let (mut machine, _) = machine_in_auto_orbit();
        let (_, seen) = recording_handler(&mut machine);
        let base = Instant::now();

        machine.on_interaction_started();
        machine.on_interaction_ended(base);
        machine.tick(base + DEFAULT_COOLDOWN);
        let commands = machine.on_return_completed();
        assert!(matches!(commands[0], ViewerCommand::EnableAutoRotate));

        assert_eq!(
            *seen.borrow(),
            vec![
                "MANUAL_ORBIT",
                "INTERRUPTION_COOLDOWN",
                "RETURN_TO_ORIGIN_START",
                "RETURN_TO_ORIGIN_END",
                "AUTO_ORBIT",
            ]
        );
    }

    #[test]
    fn test_interaction_end_outside_manual_orbit_is_noop() {
        let (mut machine, _) = machine_in_auto_orbit();
        assert!(machine.on_interaction_ended(Instant::now()).is_empty());
        assert_eq!(machine.state(), &ViewerState::AutoOrbit);
    }

    #[test]
    fn test_unregistered_handler_stops_receiving() {
        let mut machine = ViewerStateMachine::default();
        let (id, seen) = recording_handler(&mut machine);

        machine.initialize().unwrap();
        assert_eq!(seen.borrow().len(), 1);

        assert!(machine.unregister_state_change_handler(id));
        assert!(!machine.unregister_state_change_handler(id));

        let cycle = machine.cycle().unwrap();
        machine.on_load_outcome(cycle, ready());
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_handlers_notified_in_registration_order() {
        let mut machine = ViewerStateMachine::default();
        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let sink = order.clone();
            machine.register_state_change_handler(move |_| sink.borrow_mut().push(tag));
        }
        machine.initialize().unwrap();
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    impl ViewerStateMachine {
        /// Test helper: initialize and return the assigned cycle id.
        fn cycle_after_init(&mut self) -> LoadCycleId {
            self.initialize().unwrap();
            self.cycle().unwrap()
        }
    }
}
