//! Renderer seam.
//!
//! The core never draws; it hands a scene and a camera pose to whatever
//! implements `Renderer` each frame. `HeadlessRenderer` is the no-GPU
//! implementation used by the CLI driver and by tests.

use glam::Vec3;
use tracing::trace;

use crate::scene::SceneGraph;

/// Camera pose handed to the renderer each frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
}

/// Frame presentation seam.
pub trait Renderer {
    /// Viewport size changed.
    fn resize(&mut self, width: u32, height: u32);
    /// Present one frame of the scene from the camera's pose.
    fn present(&mut self, scene: &SceneGraph, camera: &Camera);
}

/// Renderer that counts frames instead of drawing.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    frames: u64,
    width: u32,
    height: u32,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Renderer for HeadlessRenderer {
    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn present(&mut self, scene: &SceneGraph, camera: &Camera) {
        self.frames += 1;
        trace!(
            frame = self.frames,
            ready = scene.is_ready(),
            position = ?camera.position,
            "headless frame"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_renderer_counts_frames() {
        let mut renderer = HeadlessRenderer::new();
        renderer.resize(800, 600);
        let scene = SceneGraph::new();
        let camera = Camera {
            position: Vec3::new(5.0, 0.0, 0.0),
            target: Vec3::new(2.0, 0.0, 0.0),
        };
        renderer.present(&scene, &camera);
        renderer.present(&scene, &camera);
        assert_eq!(renderer.frames(), 2);
        assert_eq!(renderer.size(), (800, 600));
    }
}
