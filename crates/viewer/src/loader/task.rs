//! Single-asset load task.
//!
//! A task wraps one fetch-and-decode of one resource. It emits zero or
//! more monotonically non-decreasing progress events followed by exactly
//! one terminal event on the orchestrator's channel. A cancelled task
//! emits nothing further. Retry policy lives above the task; there is
//! none here.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::LoadError;
use crate::loader::decode::{self, AssetPayload};
use crate::loader::source::AssetSource;
use crate::loader::AssetKind;

/// Progress or terminal event from a single load task.
#[derive(Debug)]
pub enum TaskPhase {
    /// Download progress ratio in [0, 1], monotonically non-decreasing.
    Progress(f32),
    /// The resource was fetched and decoded.
    Succeeded(AssetPayload),
    /// The load failed with a classified reason.
    Failed(LoadError),
}

/// Event from one load task, tagged with the asset it belongs to.
#[derive(Debug)]
pub struct TaskEvent {
    pub kind: AssetKind,
    pub phase: TaskPhase,
}

/// Spawn the load task for one asset of the identified stack.
pub(crate) fn spawn(
    kind: AssetKind,
    source: AssetSource,
    id: String,
    events: mpsc::UnboundedSender<TaskEvent>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let phase = match run(kind, source, &id, &events, &cancel).await {
            Ok(Some(payload)) => TaskPhase::Succeeded(payload),
            Ok(None) => {
                debug!(asset = %kind, "load task cancelled");
                return;
            }
            Err(error) => TaskPhase::Failed(error),
        };
        if cancel.is_cancelled() {
            debug!(asset = %kind, "load task cancelled after completion");
            return;
        }
        let _ = events.send(TaskEvent { kind, phase });
    })
}

/// Fetch and decode one asset. `Ok(None)` means the task was cancelled
/// mid-fetch and must stay silent.
async fn run(
    kind: AssetKind,
    source: AssetSource,
    id: &str,
    events: &mpsc::UnboundedSender<TaskEvent>,
    cancel: &CancellationToken,
) -> Result<Option<AssetPayload>, LoadError> {
    let name = format!("{id}.{}", kind.extension());
    trace!(asset = %kind, name, "load task started");

    let mut last = 0.0f32;
    let sender = events.clone();
    let mut report = move |ratio: f32| {
        let ratio = ratio.clamp(0.0, 1.0);
        // Keep the emitted sequence monotonic even if the source repeats
        // or regresses (e.g. a retried chunk).
        if ratio > last {
            last = ratio;
            let _ = sender.send(TaskEvent {
                kind,
                phase: TaskPhase::Progress(ratio),
            });
        }
    };

    let bytes = tokio::select! {
        _ = cancel.cancelled() => return Ok(None),
        result = source.fetch(&name, &mut report) => result?,
    };

    // Decoding EXR images is CPU-bound; keep it off the async workers.
    let payload = tokio::task::spawn_blocking(move || decode::decode(kind, &bytes))
        .await
        .map_err(|e| LoadError::Decode(format!("decode task failed: {e}")))??;
    Ok(Some(payload))
}
