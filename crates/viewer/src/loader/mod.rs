//! Asset loading.
//!
//! A load cycle runs two tasks concurrently, one per asset, and folds
//! their events into a single terminal outcome for the state machine:
//! the first failure wins, and only when both tasks succeed are the
//! payloads handed over for scene attachment. Outcome emission is
//! idempotent; once a cycle is terminal, further task events are
//! discarded. Starting a new cycle cancels the previous one.

pub mod decode;
pub mod source;
pub mod task;

pub use decode::{AssetPayload, EnvironmentMap, ModelNode};
pub use source::AssetSource;
pub use task::{TaskEvent, TaskPhase};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{LoadError, LoadFailure};
use crate::machine::LoadCycleId;

/// Which of the two stack assets a task is loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Equirectangular environment map used for image-based lighting.
    Environment,
    /// The stack geometry itself.
    Model,
}

impl AssetKind {
    /// File extension the asset resolves to under the configured root.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Environment => "exr",
            Self::Model => "glb",
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Environment => write!(f, "environment map"),
            Self::Model => write!(f, "model"),
        }
    }
}

/// Decoded payloads for both stack assets, delivered to the scene graph.
#[derive(Debug)]
pub struct LoadedAssets {
    pub environment: EnvironmentMap,
    pub model: ModelNode,
}

/// Terminal result of one load cycle.
#[derive(Debug)]
pub enum LoadOutcome {
    /// Both assets loaded; the stack is ready to orbit.
    Ready(LoadedAssets),
    /// A task failed; the sibling task's later events are ignored.
    Failed(LoadFailure),
}

/// Per-asset bookkeeping inside the aggregator.
#[derive(Debug, Default)]
struct TaskSlot {
    progress: f32,
    payload: Option<AssetPayload>,
}

/// Folds task events into at most one terminal outcome.
#[derive(Debug, Default)]
struct OutcomeAggregator {
    environment: TaskSlot,
    model: TaskSlot,
    terminal: bool,
}

impl OutcomeAggregator {
    fn slot_mut(&mut self, kind: AssetKind) -> &mut TaskSlot {
        match kind {
            AssetKind::Environment => &mut self.environment,
            AssetKind::Model => &mut self.model,
        }
    }

    /// Overall progress ratio across both tasks.
    fn progress(&self) -> f32 {
        (self.environment.progress + self.model.progress) / 2.0
    }

    /// Apply one task event; returns the cycle outcome the first time it
    /// becomes terminal, and `None` forever after.
    fn apply(&mut self, event: TaskEvent) -> Option<LoadOutcome> {
        if self.terminal {
            debug!(asset = %event.kind, "discarding task event after terminal outcome");
            return None;
        }
        match event.phase {
            TaskPhase::Progress(ratio) => {
                let slot = self.slot_mut(event.kind);
                slot.progress = slot.progress.max(ratio);
                None
            }
            TaskPhase::Failed(error) => {
                self.terminal = true;
                Some(LoadOutcome::Failed(LoadFailure {
                    asset: event.kind,
                    error,
                }))
            }
            TaskPhase::Succeeded(payload) => {
                let slot = self.slot_mut(event.kind);
                slot.progress = 1.0;
                slot.payload = Some(payload);
                self.try_finish()
            }
        }
    }

    fn try_finish(&mut self) -> Option<LoadOutcome> {
        if self.environment.payload.is_none() || self.model.payload.is_none() {
            return None;
        }
        self.terminal = true;
        match (self.environment.payload.take(), self.model.payload.take()) {
            (
                Some(AssetPayload::Environment(environment)),
                Some(AssetPayload::Model(model)),
            ) => Some(LoadOutcome::Ready(LoadedAssets { environment, model })),
            // Tasks are spawned with matching kinds; a mismatched payload
            // means a bug upstream, not a recoverable load failure.
            (environment, model) => {
                warn!(?environment, ?model, "mismatched payloads in load cycle");
                Some(LoadOutcome::Failed(LoadFailure {
                    asset: AssetKind::Model,
                    error: LoadError::Decode("mismatched payload kinds".into()),
                }))
            }
        }
    }
}

/// One concurrent load cycle for a stack's environment map and model.
///
/// Must be started inside a tokio runtime; the two tasks are spawned
/// immediately. Dropping the orchestrator cancels any task still in
/// flight.
#[derive(Debug)]
pub struct LoadOrchestrator {
    cycle: LoadCycleId,
    events: mpsc::UnboundedReceiver<TaskEvent>,
    cancel: CancellationToken,
    aggregator: OutcomeAggregator,
}

impl LoadOrchestrator {
    /// Start both asset tasks for the identified stack.
    pub fn start(cycle: LoadCycleId, source: AssetSource, id: &str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        for kind in [AssetKind::Environment, AssetKind::Model] {
            task::spawn(
                kind,
                source.clone(),
                id.to_string(),
                tx.clone(),
                cancel.child_token(),
            );
        }
        Self {
            cycle,
            events: rx,
            cancel,
            aggregator: OutcomeAggregator::default(),
        }
    }

    /// The load cycle this orchestrator belongs to.
    pub fn cycle(&self) -> LoadCycleId {
        self.cycle
    }

    /// Overall progress ratio across both tasks, in [0, 1].
    pub fn progress(&self) -> f32 {
        self.aggregator.progress()
    }

    /// Drain pending task events; returns the cycle outcome the first
    /// time it becomes terminal. Non-blocking, call once per frame.
    pub fn poll(&mut self) -> Option<LoadOutcome> {
        while let Ok(event) = self.events.try_recv() {
            if let Some(outcome) = self.aggregator.apply(event) {
                // First terminal outcome wins; silence the sibling task.
                self.cancel.cancel();
                return Some(outcome);
            }
        }
        None
    }
}

impl Drop for LoadOrchestrator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
