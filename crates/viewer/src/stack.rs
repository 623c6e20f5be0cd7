//! Top-level viewer wiring.
//!
//! `StackViewer` owns the state machine and its collaborators and pumps
//! them once per frame: interaction signals are applied before
//! internally-scheduled work (cooldown expiry, return completion), so
//! external events always win a race against pending timers; then load
//! outcomes are drained, the machine's clock advances, the orbit rig
//! updates, and the frame is presented.
//!
//! Must run inside a tokio runtime; load cycles spawn tasks.

use std::time::Instant;

use glam::Vec2;
use tracing::warn;

use crate::config::ViewerConfig;
use crate::error::Result;
use crate::interaction::{InteractionMonitor, InteractionSignal, PointerEvent};
use crate::loader::{AssetSource, LoadOrchestrator};
use crate::machine::{HandlerId, ViewerCommand, ViewerStateMachine};
use crate::orbit::{auto_speed_to_radians, OrbitController};
use crate::render::Renderer;
use crate::scene::SceneGraph;
use crate::state::ViewerState;

/// One interactive stack bound to a drawing surface.
pub struct StackViewer {
    config: ViewerConfig,
    source: AssetSource,
    machine: ViewerStateMachine,
    monitor: InteractionMonitor,
    orchestrator: Option<LoadOrchestrator>,
    orbit: OrbitController,
    scene: SceneGraph,
    renderer: Box<dyn Renderer>,
    last_pointer: Option<Vec2>,
}

impl StackViewer {
    pub fn new(config: ViewerConfig, renderer: Box<dyn Renderer>) -> Self {
        let source = config.source();
        let scene = if config.dev_mode {
            SceneGraph::with_debug_helpers()
        } else {
            SceneGraph::new()
        };
        let orbit = OrbitController::new(config.orbit_target(), config.home_pose());
        let machine = ViewerStateMachine::new(config.cooldown());
        Self {
            config,
            source,
            machine,
            monitor: InteractionMonitor::default(),
            orchestrator: None,
            orbit,
            scene,
            renderer,
            last_pointer: None,
        }
    }

    pub fn state(&self) -> &ViewerState {
        self.machine.state()
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn orbit(&self) -> &OrbitController {
        &self.orbit
    }

    /// Download progress of the live load cycle, in [0, 1].
    pub fn load_progress(&self) -> f32 {
        self.orchestrator.as_ref().map_or(0.0, |o| o.progress())
    }

    pub fn register_state_change_handler(
        &mut self,
        handler: impl FnMut(&ViewerState) + 'static,
    ) -> HandlerId {
        self.machine.register_state_change_handler(handler)
    }

    pub fn unregister_state_change_handler(&mut self, id: HandlerId) -> bool {
        self.machine.unregister_state_change_handler(id)
    }

    /// Start loading the stack's assets. Fails with `AlreadyInitialized`
    /// unless the viewer is idle or parked in `Failed`.
    pub fn initialize(&mut self, now: Instant) -> Result<()> {
        let commands = self.machine.initialize()?;
        self.run_commands(commands, now);
        Ok(())
    }

    /// Forward the viewport size to the renderer.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.renderer.resize(width, height);
    }

    /// Feed one raw input event from the surface.
    pub fn handle_pointer_event(&mut self, event: PointerEvent, now: Instant) {
        if let Some(signal) = self.monitor.feed(event, now) {
            self.apply_signal(signal, now);
        }

        // Camera input only applies while the machine granted manual
        // control; stray events in other states adjust nothing.
        let manual = self.machine.state() == &ViewerState::ManualOrbit;
        match event {
            PointerEvent::Pressed { position } => {
                self.last_pointer = Some(position);
            }
            PointerEvent::Moved { position } => {
                if manual {
                    if let Some(last) = self.last_pointer {
                        self.orbit.apply_drag(position - last);
                    }
                }
                if self.last_pointer.is_some() {
                    self.last_pointer = Some(position);
                }
            }
            PointerEvent::Released => {
                self.last_pointer = None;
            }
            PointerEvent::Wheel { delta } => {
                if manual {
                    self.orbit.apply_wheel(delta);
                }
            }
        }
    }

    /// Advance one frame.
    pub fn frame(&mut self, now: Instant) {
        // Interaction edges first: external events outrank pending timers.
        if let Some(signal) = self.monitor.tick(now) {
            self.apply_signal(signal, now);
        }

        // Load outcomes.
        if let Some(orchestrator) = self.orchestrator.as_mut() {
            let cycle = orchestrator.cycle();
            if let Some(outcome) = orchestrator.poll() {
                let commands = self.machine.on_load_outcome(cycle, outcome);
                self.run_commands(commands, now);
            }
        }

        // Internal timers.
        let commands = self.machine.tick(now);
        self.run_commands(commands, now);

        // Orbit rig; a landed return move feeds back into the machine.
        if self.orbit.update(now) {
            let commands = self.machine.on_return_completed();
            self.run_commands(commands, now);
        }

        let camera = self.orbit.camera();
        self.renderer.present(&self.scene, &camera);
    }

    fn apply_signal(&mut self, signal: InteractionSignal, now: Instant) {
        let commands = match signal {
            InteractionSignal::Started => self.machine.on_interaction_started(),
            InteractionSignal::Ended => self.machine.on_interaction_ended(now),
        };
        self.run_commands(commands, now);
    }

    fn run_commands(&mut self, commands: Vec<ViewerCommand>, now: Instant) {
        for command in commands {
            match command {
                ViewerCommand::StartLoad { cycle } => {
                    self.scene.clear();
                    self.orchestrator = Some(LoadOrchestrator::start(
                        cycle,
                        self.source.clone(),
                        &self.config.id,
                    ));
                }
                ViewerCommand::AttachAssets(assets) => {
                    self.scene.attach(assets);
                    self.orchestrator = None;
                }
                ViewerCommand::EnableAutoRotate => {
                    self.orbit
                        .enable_automatic(auto_speed_to_radians(self.config.auto_orbit_speed));
                }
                ViewerCommand::EnableManualControl => {
                    self.orbit.enable_manual();
                }
                ViewerCommand::BeginOriginReturn => {
                    self.orbit.begin_return(now);
                }
                ViewerCommand::CancelOriginReturn => {
                    self.orbit.cancel_return();
                }
                ViewerCommand::ShowFailure(failure) => {
                    warn!(%failure, "stack '{}' failed to load", self.config.id);
                    self.orchestrator = None;
                }
            }
        }
    }
}

impl std::fmt::Debug for StackViewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackViewer")
            .field("id", &self.config.id)
            .field("state", self.machine.state())
            .finish()
    }
}
