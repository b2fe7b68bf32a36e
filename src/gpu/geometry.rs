//! Host seam for drawing scene renderers into an outline target.

use crate::renderer::filter::{RenderStateBlock, RendererId};

/// Formats of the attachments a mask draw renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawTargetFormats {
    /// Color attachment format.
    pub color: wgpu::TextureFormat,
    /// Depth attachment format, if one is bound.
    pub depth: Option<wgpu::TextureFormat>,
}

/// Draws host-owned scene geometry.
///
/// The outline passes only know renderer ids; the host owns meshes and
/// their pipelines. [`GpuFrame`](super::backend::GpuFrame) opens a render
/// pass on the bound target and hands it here.
pub trait GeometryDrawer {
    /// Record draws for `renderers`, in order, into `pass`.
    ///
    /// `state` carries the pass's depth and blend overrides; fields left
    /// `None` keep the renderer's own state.
    fn draw_renderers(
        &mut self,
        pass: &mut wgpu::RenderPass<'_>,
        renderers: &[RendererId],
        state: RenderStateBlock,
        formats: DrawTargetFormats,
    );
}
