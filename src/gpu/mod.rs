//! wgpu backend for the outline passes.
//!
//! Provides device initialization, shader composition, blit pipelines and
//! the [`backend::GpuFrame`] command executor.

/// wgpu executor for recorded outline commands.
pub mod backend;
/// Host seam for drawing scene renderers.
pub mod geometry;
/// Material pass pipelines and blit parameters.
pub mod materials;
/// Shared wgpu boilerplate helpers for full-screen blits.
pub mod pipeline_helpers;
/// wgpu device and queue initialization.
pub mod render_context;
/// WGSL shader composition with `#import` support via naga-oil.
pub mod shader_composer;
/// Render-target textures for temporary targets.
pub mod texture;
