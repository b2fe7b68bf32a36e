//! CPU reference backend.
//!
//! Executes recorded outline commands against a flat [`SoftwareScene`] so
//! the passes can be exercised and inspected without a GPU. Blit programs
//! mirror the WGSL entry points in `assets/shaders/outline/`.

pub mod backend;
pub mod image;
pub mod programs;
pub mod scene;

pub use backend::{SoftTarget, SoftwareBackend, SoftwareStats};
pub use image::{DepthBuffer, Image};
pub use programs::BlitProgram;
pub use scene::{SceneObject, Shape, SoftwareScene};
