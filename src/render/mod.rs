use glam::Mat4;

#[cfg(not(target_arch = "wasm32"))]
pub mod native;

#[cfg(not(target_arch = "wasm32"))]
pub use native::{Renderer, SphereInstance};

/// Camera parameters consumed by the renderer's uniform buffer.
pub struct CameraParams {
    pub view_proj: Mat4,
}
