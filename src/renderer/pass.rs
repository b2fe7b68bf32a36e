//! The four-stage render pass interface the host drives every frame.

use super::command::{Command, CommandBuffer};
use super::filter::{
    select_renderers, CullingResults, DrawingSettings, FilterSettings,
    RenderStateBlock,
};
use super::target::{ColorFormat, PassTarget, TargetDescriptor};

/// Where in the host's frame a pass is scheduled. Later variants run later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum RenderPassEvent {
    /// Before anything else in the frame.
    BeforeRendering,
    /// Before shadow maps.
    BeforeRenderingShadows,
    /// After shadow maps.
    AfterRenderingShadows,
    /// Before opaque geometry.
    BeforeRenderingOpaques,
    /// After opaque geometry.
    #[default]
    AfterRenderingOpaques,
    /// Before the skybox.
    BeforeRenderingSkybox,
    /// After the skybox.
    AfterRenderingSkybox,
    /// Before transparent geometry.
    BeforeRenderingTransparents,
    /// After transparent geometry.
    AfterRenderingTransparents,
    /// Before post-processing.
    BeforeRenderingPostProcessing,
    /// After post-processing.
    AfterRenderingPostProcessing,
    /// At the very end of the frame.
    AfterRendering,
}

/// Camera the frame is rendered for.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraData {
    /// Debug name.
    pub name: String,
    /// Descriptor of the camera's color target at current resolution.
    pub target_descriptor: TargetDescriptor,
}

impl CameraData {
    /// Camera with a color target of the given size, Argb32 and 24-bit
    /// depth.
    #[must_use]
    pub fn new(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: name.to_owned(),
            target_descriptor: TargetDescriptor::new(
                width,
                height,
                ColorFormat::Argb32,
            )
            .with_depth_bits(24),
        }
    }
}

/// Per-frame data the host hands to every pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameData {
    /// Camera being rendered.
    pub camera: CameraData,
    /// Renderers visible to that camera.
    pub culling: CullingResults,
}

/// What a pass's execute step records into.
#[derive(Debug)]
pub struct ExecuteContext {
    commands: CommandBuffer,
}

impl ExecuteContext {
    /// Empty context for a named pass.
    #[must_use]
    pub fn new(pass_name: &str) -> Self {
        Self {
            commands: CommandBuffer::new(pass_name),
        }
    }

    /// Filter and sort `culling`, then record a draw of the result into the
    /// bound destination. An empty selection still records the draw.
    pub fn draw_renderers(
        &mut self,
        culling: &CullingResults,
        drawing: &DrawingSettings,
        filter: &FilterSettings,
        state: RenderStateBlock,
    ) {
        let renderers = select_renderers(culling, drawing, filter);
        self.commands.push(Command::DrawRenderers {
            renderers,
            state,
        });
    }

    /// Record `body` inside a named profiling scope.
    pub fn profile(&mut self, label: &str, body: impl FnOnce(&mut Self)) {
        self.commands.push(Command::BeginSample(label.to_owned()));
        body(self);
        self.commands.push(Command::EndSample(label.to_owned()));
    }

    /// Append a pass-local command buffer.
    pub fn execute_command_buffer(&mut self, cmd: &CommandBuffer) {
        self.commands.append(cmd);
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn commands(&self) -> &CommandBuffer {
        &self.commands
    }

    /// Consume the context.
    #[must_use]
    pub fn into_commands(self) -> CommandBuffer {
        self.commands
    }
}

/// One ordered unit of GPU work within a frame.
///
/// The host calls, for every frame: [`setup`](Self::setup) on every queued
/// pass, then per pass [`configure`](Self::configure), binds
/// [`target`](Self::target), [`execute`](Self::execute), and finally
/// [`cleanup`](Self::cleanup) on every queued pass.
pub trait RenderPass {
    /// Debug name.
    fn name(&self) -> &str;

    /// Scheduling priority.
    fn event(&self) -> RenderPassEvent;

    /// Destination and clear policy for the execute step.
    fn target(&self) -> &PassTarget;

    /// Allocate per-camera resources.
    fn setup(&mut self, _cmd: &mut CommandBuffer, _frame: &FrameData) {}

    /// Allocate resources that depend on the camera target descriptor.
    fn configure(
        &mut self,
        _cmd: &mut CommandBuffer,
        _camera: &TargetDescriptor,
    ) {
    }

    /// Record the pass's work.
    fn execute(&mut self, context: &mut ExecuteContext, frame: &FrameData);

    /// Release what setup/configure allocated.
    fn cleanup(&mut self, _cmd: &mut CommandBuffer) {}
}
