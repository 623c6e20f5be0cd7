//! Scene graph for the loaded stack.
//!
//! Holds the attached environment map and model payloads plus the debug
//! helper flags (grid/axes) used in dev mode. Attachment replaces both
//! payloads atomically per load cycle.

use tracing::debug;

use crate::loader::{EnvironmentMap, LoadedAssets, ModelNode};

#[derive(Debug, Default)]
pub struct SceneGraph {
    environment: Option<EnvironmentMap>,
    model: Option<ModelNode>,
    show_grid: bool,
    show_axes: bool,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scene graph with grid and axes helpers enabled.
    pub fn with_debug_helpers() -> Self {
        Self {
            show_grid: true,
            show_axes: true,
            ..Self::default()
        }
    }

    /// Attach the payloads of a completed load cycle, replacing any
    /// previous ones.
    pub fn attach(&mut self, assets: LoadedAssets) {
        debug!(
            environment = format!("{}x{}", assets.environment.width(), assets.environment.height()),
            nodes = assets.model.node_count(),
            meshes = assets.model.mesh_count(),
            "attaching stack assets"
        );
        self.environment = Some(assets.environment);
        self.model = Some(assets.model);
    }

    /// Drop both payloads (start of a fresh load cycle).
    pub fn clear(&mut self) {
        self.environment = None;
        self.model = None;
    }

    pub fn environment(&self) -> Option<&EnvironmentMap> {
        self.environment.as_ref()
    }

    pub fn model(&self) -> Option<&ModelNode> {
        self.model.as_ref()
    }

    /// Whether both payloads are attached.
    pub fn is_ready(&self) -> bool {
        self.environment.is_some() && self.model.is_some()
    }

    pub fn show_grid(&self) -> bool {
        self.show_grid
    }

    pub fn show_axes(&self) -> bool {
        self.show_axes
    }
}
