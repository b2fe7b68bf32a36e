//! Mask pass - rasterizes outlined renderers into an offscreen silhouette.
//!
//! The mask target matches the camera resolution, is forced to Argb32,
//! borrows the camera depth buffer for occlusion and is cleared to
//! transparent black every frame before anything is drawn.

use glam::Vec4;

use crate::renderer::command::CommandBuffer;
use crate::renderer::filter::{
    DrawingSettings, FilterSettings, LayerMask, RenderStateBlock,
    SortingCriteria,
};
use crate::renderer::pass::{
    ExecuteContext, FrameData, RenderPass, RenderPassEvent,
};
use crate::renderer::target::{
    ClearFlag, ColorFormat, PassTarget, RenderTargetIdentifier, TargetId,
};

/// Profiling scope and pass name the outline feature gives the mask pass.
pub const MASK_PROFILER_TAG: &str = "RenderOutlineObjects";

/// Draws the layer- and tag-filtered renderers into the mask target.
pub struct MaskRenderPass {
    profiler_tag: String,
    mask_id: TargetId,
    filter: FilterSettings,
    drawing: DrawingSettings,
    state: RenderStateBlock,
    target: PassTarget,
    event: RenderPassEvent,
    allocated: bool,
}

impl MaskRenderPass {
    /// Pass writing into the target `mask_id`, drawing renderers on
    /// `layer_mask` with one of the four forward tags.
    #[must_use]
    pub fn new(
        profiler_tag: &str,
        mask_id: TargetId,
        layer_mask: LayerMask,
    ) -> Self {
        Self {
            profiler_tag: profiler_tag.to_owned(),
            mask_id,
            filter: FilterSettings::forward(layer_mask),
            drawing: DrawingSettings {
                sorting: SortingCriteria::CommonOpaque,
            },
            state: RenderStateBlock::NOTHING,
            target: PassTarget::default(),
            event: RenderPassEvent::AfterRenderingOpaques,
            allocated: false,
        }
    }

    /// Id of the mask target this pass owns.
    #[must_use]
    pub fn mask_id(&self) -> TargetId {
        self.mask_id
    }

    /// Renderer filter.
    #[must_use]
    pub fn filter(&self) -> &FilterSettings {
        &self.filter
    }
}

impl RenderPass for MaskRenderPass {
    fn name(&self) -> &str {
        &self.profiler_tag
    }

    fn event(&self) -> RenderPassEvent {
        self.event
    }

    fn target(&self) -> &PassTarget {
        &self.target
    }

    fn setup(&mut self, cmd: &mut CommandBuffer, frame: &FrameData) {
        let mut descriptor = frame.camera.target_descriptor;
        descriptor.format = ColorFormat::Argb32;
        // Depth testing goes through the camera's own depth buffer.
        descriptor.depth_bits = 0;
        cmd.get_temporary_rt(self.mask_id, descriptor);
        self.allocated = true;

        self.target.configure_target(
            RenderTargetIdentifier::Temporary(self.mask_id),
            Some(RenderTargetIdentifier::CameraDepth),
        );
        self.target.configure_clear(ClearFlag::Color, Vec4::ZERO);
    }

    fn execute(&mut self, context: &mut ExecuteContext, frame: &FrameData) {
        context.profile(&self.profiler_tag, |context| {
            context.draw_renderers(
                &frame.culling,
                &self.drawing,
                &self.filter,
                self.state,
            );
        });
    }

    fn cleanup(&mut self, cmd: &mut CommandBuffer) {
        if std::mem::take(&mut self.allocated) {
            cmd.release_temporary_rt(self.mask_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::command::Command;
    use crate::renderer::filter::{CullingResults, ShaderTagId};
    use crate::renderer::pass::CameraData;
    use crate::renderer::target::TargetDescriptor;

    fn frame() -> FrameData {
        FrameData {
            camera: CameraData::new("Main", 1920, 1080),
            culling: CullingResults::default(),
        }
    }

    #[test]
    fn setup_allocates_color_only_argb32_at_camera_size() {
        let mask_id = TargetId::from_name("_RenderOutlineRT");
        let mut pass =
            MaskRenderPass::new("Outline", mask_id, LayerMask::EVERYTHING);
        let mut cmd = CommandBuffer::new("setup");
        pass.setup(&mut cmd, &frame());

        assert_eq!(
            cmd.commands(),
            &[Command::GetTemporary {
                id: mask_id,
                descriptor: TargetDescriptor::new(
                    1920,
                    1080,
                    ColorFormat::Argb32
                ),
            }]
        );
    }

    #[test]
    fn setup_binds_mask_with_camera_depth_and_clears_transparent() {
        let mask_id = TargetId::from_name("_RenderOutlineRT");
        let mut pass =
            MaskRenderPass::new("Outline", mask_id, LayerMask::EVERYTHING);
        pass.setup(&mut CommandBuffer::new("setup"), &frame());

        let target = pass.target();
        assert_eq!(target.color, RenderTargetIdentifier::Temporary(mask_id));
        assert_eq!(target.depth, Some(RenderTargetIdentifier::CameraDepth));
        assert_eq!(target.clear, ClearFlag::Color);
        assert_eq!(target.clear_color, Vec4::ZERO);
    }

    #[test]
    fn filter_uses_forward_tags_and_layer_mask() {
        let mask = LayerMask::from_layer(8);
        let pass =
            MaskRenderPass::new("Outline", TargetId::from_name("m"), mask);
        assert_eq!(pass.filter().layer_mask, mask);
        assert_eq!(pass.filter().shader_tags, ShaderTagId::FORWARD_TAGS);
    }

    #[test]
    fn cleanup_releases_only_after_setup() {
        let mask_id = TargetId::from_name("m");
        let mut pass =
            MaskRenderPass::new("Outline", mask_id, LayerMask::EVERYTHING);
        let mut cmd = CommandBuffer::new("cleanup");
        pass.cleanup(&mut cmd);
        assert!(cmd.is_empty());

        pass.setup(&mut CommandBuffer::new("setup"), &frame());
        pass.cleanup(&mut cmd);
        assert_eq!(
            cmd.commands(),
            &[Command::ReleaseTemporary { id: mask_id }]
        );
    }

    #[test]
    fn execute_draws_inside_profiling_scope() {
        let mut pass = MaskRenderPass::new(
            "Outline",
            TargetId::from_name("m"),
            LayerMask::EVERYTHING,
        );
        let mut context = ExecuteContext::new("Outline");
        pass.execute(&mut context, &frame());
        let commands = context.commands().commands();
        assert_eq!(commands.len(), 3);
        assert!(matches!(commands[1], Command::DrawRenderers { .. }));
    }
}
