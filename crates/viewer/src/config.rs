//! Viewer configuration.
//!
//! The identifier-to-URL mapping is the only persisted configuration:
//! a stack's two assets resolve to `{asset_root}/{id}.exr` and
//! `{asset_root}/{id}.glb`. The remaining fields tune the orbit rig and
//! the interruption timing, with defaults matching the reference rig.

use std::path::Path;
use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewerError};
use crate::loader::AssetSource;
use crate::orbit::OrbitPose;

/// Viewer configuration stored in a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Stable stack identifier; assets resolve to `{asset_root}/{id}.exr`
    /// and `{asset_root}/{id}.glb`.
    pub id: String,
    /// Directory or HTTP(S) base URL the assets are fetched from.
    pub asset_root: String,
    /// Milliseconds between the end of manual interaction and the start
    /// of the origin return.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    /// Auto-rotate speed (2.0 = one revolution every 30 seconds).
    #[serde(default = "default_auto_orbit_speed")]
    pub auto_orbit_speed: f32,
    /// Point the camera orbits around.
    #[serde(default = "default_orbit_target")]
    pub orbit_target: [f32; 3],
    /// Initial camera position; together with the target it defines the
    /// home pose the camera returns to.
    #[serde(default = "default_camera_position")]
    pub camera_position: [f32; 3],
    /// Attach grid/axes helpers to the scene.
    #[serde(default)]
    pub dev_mode: bool,
}

fn default_cooldown_ms() -> u64 {
    3000
}

fn default_auto_orbit_speed() -> f32 {
    0.5
}

fn default_orbit_target() -> [f32; 3] {
    [2.0, 0.0, 0.0]
}

fn default_camera_position() -> [f32; 3] {
    [5.0, 0.0, 0.0]
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self::new("stack", ".")
    }
}

impl ViewerConfig {
    pub fn new(id: impl Into<String>, asset_root: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            asset_root: asset_root.into(),
            cooldown_ms: default_cooldown_ms(),
            auto_orbit_speed: default_auto_orbit_speed(),
            orbit_target: default_orbit_target(),
            camera_position: default_camera_position(),
            dev_mode: false,
        }
    }

    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ViewerError::Config(e.to_string()))
    }

    /// Save config to a TOML file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ViewerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Asset source matching the configured root.
    pub fn source(&self) -> AssetSource {
        AssetSource::from_root(&self.asset_root)
    }

    pub fn orbit_target(&self) -> Vec3 {
        Vec3::from(self.orbit_target)
    }

    /// Home pose derived from the configured camera position and target.
    pub fn home_pose(&self) -> OrbitPose {
        OrbitPose::from_position(Vec3::from(self.camera_position), self.orbit_target())
    }
}
