//! Orbit camera controller.
//!
//! An azimuth/elevation/distance rig around a fixed target with three
//! modes: automatic rotation at constant angular speed, direct manual
//! control from drag/wheel input, and an eased return move back to the
//! home pose. The controller only produces camera poses; which mode is
//! active is decided by the state machine and applied through commands.

use std::time::{Duration, Instant};

use glam::{Vec2, Vec3};
use tracing::trace;

use crate::render::Camera;

/// Default auto-rotate speed. Speed 2.0 corresponds to one revolution
/// every 30 seconds; the default is a quarter of that.
pub const DEFAULT_AUTO_SPEED: f32 = 0.5;
/// Duration of the eased return move back to the home pose.
pub const RETURN_DURATION: Duration = Duration::from_millis(1200);

const ROTATE_SPEED: f32 = 0.01;
const ZOOM_SPEED: f32 = 0.25;
const MIN_ELEVATION: f32 = -std::f32::consts::FRAC_PI_2 + 0.01;
const MAX_ELEVATION: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Convert the configured auto-rotate speed to radians per second.
pub fn auto_speed_to_radians(speed: f32) -> f32 {
    speed * std::f32::consts::TAU / 60.0
}

/// Spherical pose of the camera around the orbit target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitPose {
    /// Horizontal rotation angle (radians).
    pub azimuth: f32,
    /// Vertical rotation angle (radians, clamped short of the poles).
    pub elevation: f32,
    /// Distance from the target.
    pub distance: f32,
}

impl OrbitPose {
    pub fn new(azimuth: f32, elevation: f32, distance: f32) -> Self {
        Self {
            azimuth,
            elevation,
            distance,
        }
    }

    /// Derive the pose that puts the camera at `position` looking at `target`.
    pub fn from_position(position: Vec3, target: Vec3) -> Self {
        let offset = position - target;
        let distance = offset.length().max(f32::EPSILON);
        Self {
            azimuth: offset.z.atan2(offset.x),
            elevation: (offset.y / distance).clamp(-1.0, 1.0).asin(),
            distance,
        }
    }

    /// Camera world position for this pose around `target`.
    pub fn position(&self, target: Vec3) -> Vec3 {
        let x = self.distance * self.elevation.cos() * self.azimuth.cos();
        let y = self.distance * self.elevation.sin();
        let z = self.distance * self.elevation.cos() * self.azimuth.sin();
        target + Vec3::new(x, y, z)
    }

    fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            azimuth: self.azimuth + (other.azimuth - self.azimuth) * t,
            elevation: self.elevation + (other.elevation - self.elevation) * t,
            distance: self.distance + (other.distance - self.distance) * t,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum OrbitMode {
    /// Constant-speed rotation, no input.
    Automatic,
    /// Pose driven directly by drag/wheel input.
    Manual,
    /// Eased move from `from` back to the home pose.
    Returning { from: OrbitPose, started: Instant },
}

/// The camera rig.
#[derive(Debug)]
pub struct OrbitController {
    target: Vec3,
    home: OrbitPose,
    pose: OrbitPose,
    mode: OrbitMode,
    auto_speed: f32,
    distance_min: f32,
    distance_max: f32,
    return_duration: Duration,
    last_update: Option<Instant>,
}

impl Default for OrbitController {
    fn default() -> Self {
        // Reference rig: orbit around (2, 0, 0) with the camera starting
        // at (5, 0, 0).
        Self::new(
            Vec3::new(2.0, 0.0, 0.0),
            OrbitPose::from_position(Vec3::new(5.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0)),
        )
    }
}

impl OrbitController {
    pub fn new(target: Vec3, home: OrbitPose) -> Self {
        Self {
            target,
            home,
            pose: home,
            mode: OrbitMode::Manual,
            auto_speed: auto_speed_to_radians(DEFAULT_AUTO_SPEED),
            distance_min: 0.1,
            distance_max: 100.0,
            return_duration: RETURN_DURATION,
            last_update: None,
        }
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn pose(&self) -> OrbitPose {
        self.pose
    }

    /// Camera pose presented to the renderer this frame.
    pub fn camera(&self) -> Camera {
        Camera {
            position: self.pose.position(self.target),
            target: self.target,
        }
    }

    /// Switch to constant-speed automatic rotation.
    pub fn enable_automatic(&mut self, speed_radians_per_sec: f32) {
        self.auto_speed = speed_radians_per_sec;
        self.mode = OrbitMode::Automatic;
    }

    /// Hand the pose to direct user control.
    pub fn enable_manual(&mut self) {
        self.mode = OrbitMode::Manual;
    }

    /// Begin the eased move back to the home pose.
    pub fn begin_return(&mut self, now: Instant) {
        trace!("origin return started");
        self.mode = OrbitMode::Returning {
            from: self.pose,
            started: now,
        };
    }

    /// Abort an in-flight return; the camera stays where it is and waits
    /// for the next mode command.
    pub fn cancel_return(&mut self) {
        if matches!(self.mode, OrbitMode::Returning { .. }) {
            self.mode = OrbitMode::Manual;
        }
    }

    /// Whether a return move is currently in flight.
    pub fn is_returning(&self) -> bool {
        matches!(self.mode, OrbitMode::Returning { .. })
    }

    /// Apply a drag delta while under manual control.
    pub fn apply_drag(&mut self, delta: Vec2) {
        if !matches!(self.mode, OrbitMode::Manual) {
            return;
        }
        self.pose.azimuth -= delta.x * ROTATE_SPEED;
        self.pose.elevation =
            (self.pose.elevation + delta.y * ROTATE_SPEED).clamp(MIN_ELEVATION, MAX_ELEVATION);
    }

    /// Apply wheel zoom while under manual control.
    pub fn apply_wheel(&mut self, delta: f32) {
        if !matches!(self.mode, OrbitMode::Manual) {
            return;
        }
        self.pose.distance =
            (self.pose.distance - delta * ZOOM_SPEED).clamp(self.distance_min, self.distance_max);
    }

    /// Advance the rig to `now`. Returns true when a return move landed
    /// on the home pose during this update.
    pub fn update(&mut self, now: Instant) -> bool {
        let dt = self
            .last_update
            .map(|last| now.saturating_duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last_update = Some(now);

        match self.mode {
            OrbitMode::Automatic => {
                self.pose.azimuth += self.auto_speed * dt;
                false
            }
            OrbitMode::Manual => false,
            OrbitMode::Returning { from, started } => {
                let elapsed = now.saturating_duration_since(started);
                let t = (elapsed.as_secs_f32() / self.return_duration.as_secs_f32()).min(1.0);
                self.pose = from.lerp(&self.home, ease_in_out_cubic(t));
                if t >= 1.0 {
                    trace!("origin return completed");
                    self.pose = self.home;
                    // Park until the state machine re-enables a mode.
                    self.mode = OrbitMode::Manual;
                    return true;
                }
                false
            }
        }
    }
}

fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let u = -2.0 * t + 2.0;
        1.0 - u * u * u / 2.0
    }
}
