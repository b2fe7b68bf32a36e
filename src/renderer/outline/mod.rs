//! Silhouette outline effect.
//!
//! [`MaskRenderPass`] draws the selected renderers into an offscreen mask,
//! [`EdgeCompositePass`] runs a Sobel filter over that mask and blends the
//! result onto the camera, and [`OutlineFeature`] wires the two together.

pub mod builtin;
pub mod edge_pass;
pub mod feature;
pub mod mask_pass;

pub use builtin::{register_builtin_materials, BuiltinMaterials};
pub use edge_pass::EdgeCompositePass;
pub use feature::{OutlineFeature, OutlineFeatureConfig};
pub use mask_pass::MaskRenderPass;
