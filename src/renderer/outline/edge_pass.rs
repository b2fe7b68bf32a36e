//! Edge pass - Sobel edge detection on the mask, then composite onto the
//! camera color target.
//!
//! Two strictly ordered blits: mask -> scratch with the edge-detect
//! material, scratch -> camera color with the composite material. Either
//! step is skipped when its material is unset.

use crate::renderer::command::CommandBuffer;
use crate::renderer::material::PassIndexedMaterial;
use crate::renderer::pass::{
    ExecuteContext, FrameData, RenderPass, RenderPassEvent,
};
use crate::renderer::target::{
    ColorFormat, FilterMode, PassTarget, RenderTargetIdentifier,
    TargetDescriptor, TargetId,
};

/// Logical name of the edge-detect scratch target.
pub const SCRATCH_TARGET_NAME: &str = "tmpOutlineRT";

/// Profiling scope wrapping both blits.
pub const PROFILER_TAG: &str = "SobelFilter";

/// Runs the edge-detect and composite blits.
pub struct EdgeCompositePass {
    sobel: PassIndexedMaterial,
    blit: PassIndexedMaterial,
    mask_id: TargetId,
    scratch_target: TargetId,
    mask_source: Option<RenderTargetIdentifier>,
    scratch_id: Option<TargetId>,
    target: PassTarget,
    event: RenderPassEvent,
}

impl EdgeCompositePass {
    /// Pass reading the mask target `mask_id`.
    #[must_use]
    pub fn new(
        mask_id: TargetId,
        sobel: PassIndexedMaterial,
        blit: PassIndexedMaterial,
    ) -> Self {
        Self {
            sobel,
            blit,
            mask_id,
            scratch_target: TargetId::from_name(SCRATCH_TARGET_NAME),
            mask_source: None,
            scratch_id: None,
            target: PassTarget::default(),
            event: RenderPassEvent::AfterRenderingTransparents,
        }
    }

    /// Change the scheduling priority.
    pub fn set_event(&mut self, event: RenderPassEvent) {
        self.event = event;
    }

    /// Edge-detect material binding.
    #[must_use]
    pub fn sobel(&self) -> &PassIndexedMaterial {
        &self.sobel
    }

    /// Composite material binding.
    #[must_use]
    pub fn blit(&self) -> &PassIndexedMaterial {
        &self.blit
    }

    /// Id of the mask target this pass reads.
    #[must_use]
    pub fn mask_id(&self) -> TargetId {
        self.mask_id
    }

    /// Id the scratch target is allocated under.
    #[must_use]
    pub fn scratch_target(&self) -> TargetId {
        self.scratch_target
    }

    /// Allocate the scratch target under `id` instead of
    /// [`SCRATCH_TARGET_NAME`]. Must differ from the mask id.
    pub fn set_scratch_target(&mut self, id: TargetId) {
        self.scratch_target = id;
    }

    /// Scratch target allocated this frame, if configure ran.
    #[must_use]
    pub fn scratch_id(&self) -> Option<TargetId> {
        self.scratch_id
    }
}

impl RenderPass for EdgeCompositePass {
    fn name(&self) -> &str {
        PROFILER_TAG
    }

    fn event(&self) -> RenderPassEvent {
        self.event
    }

    fn target(&self) -> &PassTarget {
        &self.target
    }

    fn setup(&mut self, _cmd: &mut CommandBuffer, _frame: &FrameData) {
        self.mask_source =
            Some(RenderTargetIdentifier::Temporary(self.mask_id));
    }

    fn configure(
        &mut self,
        cmd: &mut CommandBuffer,
        camera: &TargetDescriptor,
    ) {
        let scratch = self.scratch_target;
        let descriptor = TargetDescriptor::new(
            camera.width,
            camera.height,
            ColorFormat::Argb32,
        )
        .with_filter(FilterMode::Bilinear);
        cmd.get_temporary_rt(scratch, descriptor);
        self.scratch_id = Some(scratch);
        self.target
            .configure_target(RenderTargetIdentifier::Temporary(scratch), None);
    }

    fn execute(&mut self, context: &mut ExecuteContext, _frame: &FrameData) {
        let (Some(mask), Some(scratch)) = (self.mask_source, self.scratch_id)
        else {
            log::debug!("{PROFILER_TAG}: targets not configured, skipping");
            return;
        };
        let scratch = RenderTargetIdentifier::Temporary(scratch);

        let mut cmd = CommandBuffer::new(PROFILER_TAG);
        cmd.profile(PROFILER_TAG, |cmd| {
            match self.sobel.resolve() {
                Some((material, pass)) => {
                    cmd.blit(mask, scratch, material, pass);
                }
                None => log::debug!("{PROFILER_TAG}: no edge material bound"),
            }
            match self.blit.resolve() {
                Some((material, pass)) => {
                    cmd.blit(
                        scratch,
                        RenderTargetIdentifier::CameraColor,
                        material,
                        pass,
                    );
                }
                None => {
                    log::debug!("{PROFILER_TAG}: no composite material bound");
                }
            }
        });
        context.execute_command_buffer(&cmd);
    }

    fn cleanup(&mut self, cmd: &mut CommandBuffer) {
        if let Some(scratch) = self.scratch_id.take() {
            cmd.release_temporary_rt(scratch);
        }
        self.mask_source = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::command::Command;
    use crate::renderer::filter::CullingResults;
    use crate::renderer::material::{
        BlendMode, Material, MaterialLibrary, ShaderPass,
    };
    use crate::renderer::pass::CameraData;

    fn materials() -> (Material, Material) {
        let mut library = MaterialLibrary::new();
        let sobel = library.register(
            "Sobel",
            "sobel.wgsl",
            vec![
                ShaderPass::new("A", "fs_a", BlendMode::Opaque),
                ShaderPass::new("B", "fs_b", BlendMode::Opaque),
            ],
        );
        let blit = library.register(
            "Blit",
            "blit.wgsl",
            vec![
                ShaderPass::new("A", "fs_a", BlendMode::Opaque),
                ShaderPass::new("B", "fs_b", BlendMode::AlphaBlend),
                ShaderPass::new("C", "fs_c", BlendMode::Additive),
            ],
        );
        (sobel, blit)
    }

    fn frame() -> FrameData {
        FrameData {
            camera: CameraData::new("Main", 64, 32),
            culling: CullingResults::default(),
        }
    }

    fn run(pass: &mut EdgeCompositePass) -> (CommandBuffer, Vec<Command>) {
        let frame = frame();
        let mut setup = CommandBuffer::new("setup");
        pass.setup(&mut setup, &frame);
        pass.configure(&mut setup, &frame.camera.target_descriptor);
        let mut context = ExecuteContext::new(pass.name());
        pass.execute(&mut context, &frame);
        let mut cleanup = CommandBuffer::new("cleanup");
        pass.cleanup(&mut cleanup);
        (setup, [context.commands().commands(), cleanup.commands()].concat())
    }

    type Blit = (RenderTargetIdentifier, RenderTargetIdentifier, usize);

    fn blits(commands: &[Command]) -> Vec<Blit> {
        commands
            .iter()
            .filter_map(|command| match command {
                Command::Blit {
                    source,
                    destination,
                    pass,
                    ..
                } => Some((*source, *destination, *pass)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn configure_allocates_bilinear_scratch_without_depth() {
        let mut pass = EdgeCompositePass::new(
            TargetId::from_name("mask"),
            PassIndexedMaterial::unset(),
            PassIndexedMaterial::unset(),
        );
        let (setup, _) = run(&mut pass);
        let scratch = TargetId::from_name(SCRATCH_TARGET_NAME);
        assert_eq!(
            setup.commands(),
            &[Command::GetTemporary {
                id: scratch,
                descriptor: TargetDescriptor::new(64, 32, ColorFormat::Argb32)
                    .with_filter(FilterMode::Bilinear),
            }]
        );
        assert_eq!(
            pass.target().color,
            RenderTargetIdentifier::Temporary(scratch)
        );
        assert_eq!(pass.target().depth, None);
    }

    #[test]
    fn edge_then_composite_in_order() {
        let (sobel, blit) = materials();
        let mask_id = TargetId::from_name("mask");
        let mut pass = EdgeCompositePass::new(
            mask_id,
            PassIndexedMaterial::new(Some(sobel), 0),
            PassIndexedMaterial::new(Some(blit), 1),
        );
        let (_, commands) = run(&mut pass);
        let scratch = RenderTargetIdentifier::Temporary(TargetId::from_name(
            SCRATCH_TARGET_NAME,
        ));
        assert_eq!(
            blits(&commands),
            vec![
                (RenderTargetIdentifier::Temporary(mask_id), scratch, 0),
                (scratch, RenderTargetIdentifier::CameraColor, 1),
            ]
        );
    }

    #[test]
    fn unset_materials_skip_their_step() {
        let (_, blit) = materials();
        let mut pass = EdgeCompositePass::new(
            TargetId::from_name("mask"),
            PassIndexedMaterial::unset(),
            PassIndexedMaterial::new(Some(blit), 2),
        );
        let (_, commands) = run(&mut pass);
        let found = blits(&commands);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1, RenderTargetIdentifier::CameraColor);

        let mut idle = EdgeCompositePass::new(
            TargetId::from_name("mask"),
            PassIndexedMaterial::unset(),
            PassIndexedMaterial::unset(),
        );
        let (_, commands) = run(&mut idle);
        assert!(blits(&commands).is_empty());
    }

    #[test]
    fn scratch_target_override_is_allocated_and_released() {
        let (sobel, _) = materials();
        let mask_id = TargetId::from_name("mask");
        let scratch_id = TargetId::from_name("mask_scratch");
        let mut pass = EdgeCompositePass::new(
            mask_id,
            PassIndexedMaterial::new(Some(sobel), 0),
            PassIndexedMaterial::unset(),
        );
        pass.set_scratch_target(scratch_id);
        let (setup, commands) = run(&mut pass);
        assert!(matches!(
            setup.commands(),
            [Command::GetTemporary { id, .. }] if *id == scratch_id
        ));
        assert_eq!(
            blits(&commands),
            vec![(
                RenderTargetIdentifier::Temporary(mask_id),
                RenderTargetIdentifier::Temporary(scratch_id),
                0
            )]
        );
        assert!(
            commands.contains(&Command::ReleaseTemporary { id: scratch_id })
        );
    }

    #[test]
    fn cleanup_releases_scratch_but_not_mask() {
        let mask_id = TargetId::from_name("mask");
        let mut pass = EdgeCompositePass::new(
            mask_id,
            PassIndexedMaterial::unset(),
            PassIndexedMaterial::unset(),
        );
        let (_, commands) = run(&mut pass);
        let released: Vec<_> = commands
            .iter()
            .filter_map(|command| match command {
                Command::ReleaseTemporary { id } => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(released, vec![TargetId::from_name(SCRATCH_TARGET_NAME)]);
        assert_eq!(pass.scratch_id(), None);
    }

    #[test]
    fn execute_without_configure_records_nothing() {
        let (sobel, blit) = materials();
        let mut pass = EdgeCompositePass::new(
            TargetId::from_name("mask"),
            PassIndexedMaterial::new(Some(sobel), 0),
            PassIndexedMaterial::new(Some(blit), 0),
        );
        let mut context = ExecuteContext::new(pass.name());
        pass.execute(&mut context, &frame());
        assert!(context.commands().is_empty());
    }

    #[test]
    fn out_of_range_pass_falls_back_to_first() {
        let (sobel, blit) = materials();
        let mut pass = EdgeCompositePass::new(
            TargetId::from_name("mask"),
            PassIndexedMaterial::new(Some(sobel), 5),
            PassIndexedMaterial::new(Some(blit), 1),
        );
        let (_, commands) = run(&mut pass);
        assert_eq!(blits(&commands)[0].2, 0);
    }
}
