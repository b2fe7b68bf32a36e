// -- Lint policy ---------------------------------------------------------
// Crate-wide clippy policy. Rustc lints live in Cargo.toml.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]

//! Silhouette outline effect injected into a host renderer's frame graph.
//!
//! The effect is two ordered render passes that run once per camera per
//! frame:
//!
//! 1. [`renderer::outline::MaskRenderPass`] rasterizes the renderers that
//!    match a layer mask and a fixed set of shader tags into an offscreen
//!    mask target, reusing the camera's depth buffer.
//! 2. [`renderer::outline::EdgeCompositePass`] runs a Sobel edge-detect
//!    blit from the mask into a scratch target, then composites the edges
//!    onto the camera color target.
//!
//! [`renderer::outline::OutlineFeature`] owns both passes, wires the
//! shared mask target id between them and registers them with the host
//! every frame.
//!
//! # Key entry points
//!
//! - [`renderer::frame::FrameRenderer`] - minimal host that drives the
//!   setup → configure → execute → cleanup lifecycle
//! - [`renderer::frame::CommandExecutor`] - backend seam
//! - [`software::SoftwareBackend`] - CPU reference executor
//! - [`gpu::backend::GpuFrame`] - wgpu executor
//! - [`options::Options`] - TOML-backed configuration

pub mod error;
pub mod gpu;
pub mod options;
pub mod renderer;
pub mod software;

pub use error::OutlineError;
