//! Minimal host renderer: queues passes and drives their lifecycle.
//!
//! The real host owns the frame graph; this module is the contract it has
//! to honour plus a small conforming implementation used by the CPU
//! reference backend, the wgpu backend and the tests.

use super::command::{Command, CommandBuffer};
use super::pass::{ExecuteContext, FrameData, RenderPass};
use super::target::TargetId;
use crate::error::OutlineError;

/// Backend that turns recorded commands into pixels.
pub trait CommandExecutor {
    /// Run every command of `commands`, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first command's error; earlier commands stay applied.
    fn submit(
        &mut self,
        commands: &CommandBuffer,
        frame: &FrameData,
    ) -> Result<(), OutlineError>;

    /// Temporary targets currently allocated.
    fn live_temporaries(&self) -> Vec<TargetId>;

    /// Free a temporary target outside of any command stream.
    fn release_temporary(&mut self, id: TargetId);
}

/// A renderer extension that contributes passes to every frame.
pub trait RendererFeature {
    /// Debug name.
    fn name(&self) -> &str;

    /// (Re)build passes from configuration. Called at pipeline build and
    /// on every reload.
    fn create(&mut self);

    /// Queue this frame's passes.
    fn add_render_passes<'a>(
        &'a mut self,
        queue: &mut PassQueue<'a>,
        frame: &FrameData,
    );
}

/// Passes registered for one frame.
#[derive(Default)]
pub struct PassQueue<'a> {
    passes: Vec<&'a mut dyn RenderPass>,
}

impl<'a> PassQueue<'a> {
    /// Empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pass. Registration order breaks ties between passes with
    /// the same event.
    pub fn enqueue(&mut self, pass: &'a mut dyn RenderPass) {
        self.passes.push(pass);
    }

    /// Number of queued passes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Queued pass names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut order: Vec<_> = self.passes.iter().collect();
        order.sort_by_key(|pass| pass.event());
        order.iter().map(|pass| pass.name().to_owned()).collect()
    }

    fn into_sorted(mut self) -> Vec<&'a mut dyn RenderPass> {
        // Stable: equal events keep registration order.
        self.passes.sort_by_key(|pass| pass.event());
        self.passes
    }
}

/// Outcome of one frame.
#[derive(Debug, Default)]
pub struct FrameReport {
    /// Passes whose execute step was submitted successfully, in order.
    pub executed: Vec<String>,
    /// Passes that failed, with the first error each hit.
    pub failed: Vec<(String, OutlineError)>,
    /// Temporaries still alive after cleanup; force-released.
    pub leaked: Vec<TargetId>,
}

impl FrameReport {
    /// Whether every pass ran and nothing leaked.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.leaked.is_empty()
    }
}

/// Drives queued passes through setup, configure, execute and cleanup.
#[derive(Debug, Default)]
pub struct FrameRenderer {
    frame_index: u64,
}

impl FrameRenderer {
    /// Renderer at frame zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames rendered so far.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Collect passes from `features` and render one frame.
    pub fn render_features(
        &mut self,
        features: &mut [&mut dyn RendererFeature],
        frame: &FrameData,
        executor: &mut dyn CommandExecutor,
    ) -> FrameReport {
        let mut queue = PassQueue::new();
        for feature in features.iter_mut() {
            feature.add_render_passes(&mut queue, frame);
        }
        self.render(queue, frame, executor)
    }

    /// Render one frame from an explicit queue.
    ///
    /// A pass that fails is skipped for the rest of the frame but its
    /// cleanup still runs. Temporaries alive after cleanup are released.
    pub fn render(
        &mut self,
        queue: PassQueue<'_>,
        frame: &FrameData,
        executor: &mut dyn CommandExecutor,
    ) -> FrameReport {
        let mut passes = queue.into_sorted();
        let mut errors: Vec<Option<OutlineError>> =
            passes.iter().map(|_| None).collect();
        let mut report = FrameReport::default();

        for (pass, error) in passes.iter_mut().zip(errors.iter_mut()) {
            let mut cmd = CommandBuffer::new(pass.name());
            pass.setup(&mut cmd, frame);
            if let Err(e) = executor.submit(&cmd, frame) {
                *error = Some(e);
            }
        }

        for (pass, error) in passes.iter_mut().zip(errors.iter_mut()) {
            if error.is_some() {
                continue;
            }
            if let Err(e) =
                Self::configure_and_execute(&mut **pass, frame, executor)
            {
                *error = Some(e);
            } else {
                report.executed.push(pass.name().to_owned());
            }
        }

        for (pass, error) in passes.iter_mut().zip(errors) {
            let mut cmd = CommandBuffer::new(pass.name());
            pass.cleanup(&mut cmd);
            let cleanup = executor.submit(&cmd, frame);
            if let Some(e) = error.or_else(|| cleanup.err()) {
                log::warn!(
                    "frame {}: pass '{}' skipped for camera '{}': {e}",
                    self.frame_index,
                    pass.name(),
                    frame.camera.name
                );
                report.failed.push((pass.name().to_owned(), e));
            }
        }

        report.leaked = executor.live_temporaries();
        for &id in &report.leaked {
            log::warn!(
                "frame {}: temporary {id} outlived cleanup, releasing",
                self.frame_index
            );
            executor.release_temporary(id);
        }

        self.frame_index += 1;
        report
    }

    fn configure_and_execute(
        pass: &mut dyn RenderPass,
        frame: &FrameData,
        executor: &mut dyn CommandExecutor,
    ) -> Result<(), OutlineError> {
        let mut cmd = CommandBuffer::new(pass.name());
        pass.configure(&mut cmd, &frame.camera.target_descriptor);

        let target = *pass.target();
        cmd.push(Command::SetRenderTarget {
            color: target.color,
            depth: target.depth,
        });
        if target.clear.clears_color() || target.clear.clears_depth() {
            cmd.clear_render_target(target.clear, target.clear_color);
        }
        executor.submit(&cmd, frame)?;

        let mut context = ExecuteContext::new(pass.name());
        pass.execute(&mut context, frame);
        executor.submit(context.commands(), frame)
    }
}
