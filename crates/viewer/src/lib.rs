//! Interactive 3D stack viewer core.
//!
//! Renders a single "stack" model (geometry + environment lighting) on a
//! canvas: the camera auto-orbits while idle, hands control to the user
//! on interaction, and eases back to its home pose after a cooldown.
//! The decision-making lives in `machine`; everything around it is
//! collaborators the machine drives through commands.
//!
//! # Architecture
//!
//! - **machine**: the viewer state machine (loading, auto/manual orbit,
//!   interruption sequencing)
//! - **loader**: concurrent asset loading (EXR environment map + GLB
//!   model) with first-failure-wins aggregation
//! - **interaction**: raw pointer/wheel stream classified into
//!   interaction edges
//! - **orbit**: azimuth/elevation/distance camera rig with automatic,
//!   manual and eased-return modes
//! - **scene** / **render**: loaded payload holder and the presentation
//!   seam
//! - **stack**: per-frame wiring of all of the above
//! - **config**: persisted identifier-to-URL mapping and rig tuning

pub mod config;
pub mod error;
pub mod interaction;
pub mod loader;
pub mod machine;
pub mod orbit;
pub mod render;
pub mod scene;
pub mod stack;
pub mod state;

// Re-export commonly used types at crate root
pub use config::ViewerConfig;
pub use error::{LoadError, LoadFailure, Result, ViewerError};
pub use interaction::{InteractionMonitor, InteractionSignal, PointerEvent, DEFAULT_DEBOUNCE};
pub use loader::{
    AssetKind, AssetSource, EnvironmentMap, LoadOrchestrator, LoadOutcome, LoadedAssets, ModelNode,
};
pub use machine::{
    HandlerId, LoadCycleId, ViewerCommand, ViewerStateMachine, DEFAULT_COOLDOWN,
};
pub use orbit::{OrbitController, OrbitPose, DEFAULT_AUTO_SPEED, RETURN_DURATION};
pub use render::{Camera, HeadlessRenderer, Renderer};
pub use scene::SceneGraph;
pub use stack::StackViewer;
pub use state::{InterruptionPhase, ViewerState};
