//! CPU reference executor.

use glam::Vec4;
use rustc_hash::FxHashMap;

use super::image::{DepthBuffer, Image};
use super::programs::{self, blend, BlitProgram};
use super::scene::SoftwareScene;
use crate::error::OutlineError;
use crate::renderer::command::{Command, CommandBuffer};
use crate::renderer::filter::{
    DepthState, RenderStateBlock, RendererId,
};
use crate::renderer::frame::CommandExecutor;
use crate::renderer::material::{BlendMode, Material};
use crate::renderer::pass::{CameraData, FrameData};
use crate::renderer::target::{
    ClearFlag, FilterMode, RenderTargetIdentifier, TargetDescriptor,
    TargetId,
};
use crate::renderer::temporary::TemporaryTargets;

/// Depth state renderers draw with when a pass overrides nothing.
const DEFAULT_DEPTH: DepthState = DepthState {
    write: true,
    test: true,
};

/// A temporary target in CPU memory.
#[derive(Debug, Clone)]
pub struct SoftTarget {
    /// Color buffer.
    pub color: Image,
    /// Own depth buffer, when allocated with depth bits.
    pub depth: Option<DepthBuffer>,
    /// Filter used when sampled.
    pub filter: FilterMode,
}

impl SoftTarget {
    fn new(descriptor: &TargetDescriptor) -> Self {
        Self {
            color: Image::new(
                descriptor.width,
                descriptor.height,
                descriptor.format,
            ),
            depth: (descriptor.depth_bits > 0)
                .then(|| DepthBuffer::new(descriptor.width, descriptor.height)),
            filter: descriptor.filter,
        }
    }
}

/// Counters accumulated across every submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoftwareStats {
    /// Buffers submitted.
    pub submissions: u64,
    /// Clear commands applied.
    pub clears: u64,
    /// Draw commands applied, including empty ones.
    pub draws: u64,
    /// Renderers rasterized.
    pub renderers_drawn: u64,
    /// Blits run.
    pub blits: u64,
    /// Profiling scopes opened.
    pub samples: u64,
}

#[derive(Debug, Clone, Copy)]
struct Binding {
    color: RenderTargetIdentifier,
    depth: Option<RenderTargetIdentifier>,
}

/// Executes recorded commands against a [`SoftwareScene`] on the CPU.
///
/// Holds the camera color and depth buffers; [`begin_frame`](
/// Self::begin_frame) re-renders the opaque baseline into them and returns
/// the frame data passes are driven with.
pub struct SoftwareBackend {
    scene: SoftwareScene,
    camera: CameraData,
    camera_color: Image,
    camera_depth: DepthBuffer,
    temporaries: TemporaryTargets<SoftTarget>,
    programs: FxHashMap<String, BlitProgram>,
    bound: Option<Binding>,
    memory_budget: Option<usize>,
    retain_released: bool,
    released: FxHashMap<TargetId, Image>,
    scopes: Vec<String>,
    stats: SoftwareStats,
}

impl SoftwareBackend {
    /// Backend rendering `scene` through a `width`x`height` camera.
    #[must_use]
    pub fn new(scene: SoftwareScene, width: u32, height: u32) -> Self {
        let camera = CameraData::new("Main Camera", width, height);
        let (camera_color, camera_depth) = scene.render_opaque(width, height);
        let programs = [
            "fs_sobel",
            "fs_sobel_wide",
            "fs_copy",
            "fs_alpha_composite",
            "fs_additive",
        ]
        .into_iter()
        .filter_map(|entry| {
            BlitProgram::for_entry_point(entry)
                .map(|program| (entry.to_owned(), program))
        })
        .collect();
        Self {
            scene,
            camera,
            camera_color,
            camera_depth,
            temporaries: TemporaryTargets::new(),
            programs,
            bound: None,
            memory_budget: None,
            retain_released: false,
            released: FxHashMap::default(),
            scopes: Vec::new(),
            stats: SoftwareStats::default(),
        }
    }

    /// Run `program` for materials whose pass uses `entry_point`.
    pub fn register_program(&mut self, entry_point: &str, program: BlitProgram) {
        let _ = self.programs.insert(entry_point.to_owned(), program);
    }

    /// Cap the bytes temporaries may hold; allocations past it fail.
    pub fn set_memory_budget(&mut self, budget: Option<usize>) {
        self.memory_budget = budget;
    }

    /// Keep a copy of each temporary's color buffer when it is released.
    pub fn set_retain_released(&mut self, retain: bool) {
        self.retain_released = retain;
    }

    /// Color buffer a temporary held when it was last released this frame.
    #[must_use]
    pub fn released(&self, id: TargetId) -> Option<&Image> {
        self.released.get(&id)
    }

    /// Scene being rendered.
    #[must_use]
    pub fn scene(&self) -> &SoftwareScene {
        &self.scene
    }

    /// Mutable scene; changes show up at the next [`begin_frame`](
    /// Self::begin_frame).
    pub fn scene_mut(&mut self) -> &mut SoftwareScene {
        &mut self.scene
    }

    /// Camera color buffer.
    #[must_use]
    pub fn camera_color(&self) -> &Image {
        &self.camera_color
    }

    /// Camera depth buffer.
    #[must_use]
    pub fn camera_depth(&self) -> &DepthBuffer {
        &self.camera_depth
    }

    /// Temporaries currently alive.
    #[must_use]
    pub fn temporaries(&self) -> &TemporaryTargets<SoftTarget> {
        &self.temporaries
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> SoftwareStats {
        self.stats
    }

    /// Render the opaque baseline and return this frame's data.
    pub fn begin_frame(&mut self) -> FrameData {
        let descriptor = self.camera.target_descriptor;
        let (color, depth) =
            self.scene.render_opaque(descriptor.width, descriptor.height);
        self.camera_color = color;
        self.camera_depth = depth;
        self.bound = None;
        self.released.clear();
        FrameData {
            camera: self.camera.clone(),
            culling: self.scene.cull(descriptor.width, descriptor.height),
        }
    }

    fn allocate(
        &mut self,
        id: TargetId,
        descriptor: TargetDescriptor,
    ) -> Result<(), OutlineError> {
        if let Some(budget) = self.memory_budget {
            let reused = self
                .temporaries
                .descriptor(id)
                .map_or(0, TargetDescriptor::byte_size);
            let needed =
                self.temporaries.live_bytes() - reused + descriptor.byte_size();
            if needed > budget {
                return Err(OutlineError::TargetAllocation {
                    id,
                    width: descriptor.width,
                    height: descriptor.height,
                    reason: format!(
                        "{needed} bytes exceeds budget of {budget}"
                    ),
                });
            }
        }
        let _ = self.temporaries.acquire(id, descriptor, |d| {
            Ok::<_, OutlineError>(SoftTarget::new(d))
        })?;
        Ok(())
    }

    fn release(&mut self, id: TargetId) {
        if let Some(target) = self.temporaries.release(id) {
            if self.retain_released {
                let _ = self.released.insert(id, target.color);
            }
        }
        let released = RenderTargetIdentifier::Temporary(id);
        if self.bound.is_some_and(|b| {
            b.color == released || b.depth == Some(released)
        }) {
            self.bound = None;
        }
    }

    fn color_image(
        &self,
        target: RenderTargetIdentifier,
    ) -> Result<(&Image, FilterMode), OutlineError> {
        match target {
            RenderTargetIdentifier::CameraColor => Ok((
                &self.camera_color,
                self.camera.target_descriptor.filter,
            )),
            RenderTargetIdentifier::Temporary(id) => self
                .temporaries
                .get(id)
                .map(|t| (&t.color, t.filter))
                .ok_or(OutlineError::UnknownTarget(target)),
            RenderTargetIdentifier::CameraDepth => {
                Err(OutlineError::UnsupportedTarget {
                    target,
                    usage: "color target",
                })
            }
        }
    }

    fn color_image_mut(
        &mut self,
        target: RenderTargetIdentifier,
    ) -> Result<&mut Image, OutlineError> {
        match target {
            RenderTargetIdentifier::CameraColor => Ok(&mut self.camera_color),
            RenderTargetIdentifier::Temporary(id) => self
                .temporaries
                .get_mut(id)
                .map(|t| &mut t.color)
                .ok_or(OutlineError::UnknownTarget(target)),
            RenderTargetIdentifier::CameraDepth => {
                Err(OutlineError::UnsupportedTarget {
                    target,
                    usage: "color target",
                })
            }
        }
    }

    fn depth_buffer_mut(
        &mut self,
        target: RenderTargetIdentifier,
    ) -> Result<&mut DepthBuffer, OutlineError> {
        let unsupported = OutlineError::UnsupportedTarget {
            target,
            usage: "depth target",
        };
        match target {
            RenderTargetIdentifier::CameraDepth => Ok(&mut self.camera_depth),
            RenderTargetIdentifier::Temporary(id) => self
                .temporaries
                .get_mut(id)
                .ok_or(OutlineError::UnknownTarget(target))?
                .depth
                .as_mut()
                .ok_or(unsupported),
            RenderTargetIdentifier::CameraColor => Err(unsupported),
        }
    }

    fn bind(
        &mut self,
        color: RenderTargetIdentifier,
        depth: Option<RenderTargetIdentifier>,
    ) -> Result<(), OutlineError> {
        let _ = self.color_image(color)?;
        if let Some(depth) = depth {
            let _ = self.depth_buffer_mut(depth)?;
        }
        self.bound = Some(Binding { color, depth });
        Ok(())
    }

    fn clear(
        &mut self,
        flag: ClearFlag,
        color: Vec4,
        depth: f32,
    ) -> Result<(), OutlineError> {
        let binding = self.bound.ok_or(OutlineError::NoRenderTarget)?;
        if flag.clears_color() {
            self.color_image_mut(binding.color)?.fill(color);
        }
        if flag.clears_depth() {
            if let Some(target) = binding.depth {
                self.depth_buffer_mut(target)?.clear(depth);
            }
        }
        self.stats.clears += 1;
        Ok(())
    }

    fn draw(
        &mut self,
        renderers: &[RendererId],
        state: RenderStateBlock,
    ) -> Result<(), OutlineError> {
        let binding = self.bound.ok_or(OutlineError::NoRenderTarget)?;
        let depth_state = state.depth.unwrap_or(DEFAULT_DEPTH);
        let blend_mode = state.blend.unwrap_or(BlendMode::Opaque);

        // Detach depth so color and depth can be borrowed together.
        let mut depth = match binding.depth {
            Some(target) => Some(std::mem::take(self.depth_buffer_mut(target)?)),
            None => None,
        };
        let result = self.rasterize_all(
            binding.color,
            depth.as_mut(),
            renderers,
            depth_state,
            blend_mode,
        );
        if let (Some(target), Some(depth)) = (binding.depth, depth) {
            *self.depth_buffer_mut(target)? = depth;
        }
        self.stats.draws += 1;
        result
    }

    fn rasterize_all(
        &mut self,
        color: RenderTargetIdentifier,
        mut depth: Option<&mut DepthBuffer>,
        renderers: &[RendererId],
        depth_state: DepthState,
        blend_mode: BlendMode,
    ) -> Result<(), OutlineError> {
        let objects: Vec<_> = renderers
            .iter()
            .filter_map(|&id| {
                let object = self.scene.object(id).cloned();
                if object.is_none() {
                    log::warn!("draw references unknown renderer {}", id.0);
                }
                object
            })
            .collect();
        let image = self.color_image_mut(color)?;
        let (width, height) = (image.width(), image.height());
        let mut drawn = 0;
        for object in &objects {
            let test = if depth_state.test { depth.as_deref() } else { None };
            let mut covered = Vec::new();
            SoftwareScene::rasterize(object, test, width, height, |x, y| {
                covered.push((x, y));
            });
            for (x, y) in covered {
                if let Some(dst) = image.get(x, y) {
                    image.set(x, y, blend(blend_mode, object.color, dst));
                }
                if depth_state.write {
                    if let Some(depth) = depth.as_deref_mut() {
                        depth.set(x, y, object.depth);
                    }
                }
            }
            drawn += 1;
        }
        self.stats.renderers_drawn += drawn;
        Ok(())
    }

    fn blit(
        &mut self,
        source: RenderTargetIdentifier,
        destination: RenderTargetIdentifier,
        material: &Material,
        pass: usize,
    ) -> Result<(), OutlineError> {
        if source == destination {
            return Err(OutlineError::UnsupportedTarget {
                target: source,
                usage: "blit source and destination at once",
            });
        }
        let missing = || OutlineError::MissingProgram {
            material: material.name().to_owned(),
            pass,
        };
        let shader_pass = material.pass(pass).ok_or_else(missing)?;
        let program = *self
            .programs
            .get(&shader_pass.entry_point)
            .ok_or_else(missing)?;

        let (input, filter) = self.color_image(source)?;
        let (width, height) = {
            let (output, _) = self.color_image(destination)?;
            (output.width(), output.height())
        };
        let shaded =
            programs::run(program, input, filter, width, height, material.tint());

        let output = self.color_image_mut(destination)?;
        for (i, src) in shaded.into_iter().enumerate() {
            let (x, y) = ((i as u32) % width, (i as u32) / width);
            if let Some(dst) = output.get(x, y) {
                output.set(x, y, blend(shader_pass.blend, src, dst));
            }
        }
        self.stats.blits += 1;
        Ok(())
    }

    fn apply(&mut self, command: &Command) -> Result<(), OutlineError> {
        match command {
            Command::GetTemporary { id, descriptor } => {
                self.allocate(*id, *descriptor)
            }
            Command::ReleaseTemporary { id } => {
                self.release(*id);
                Ok(())
            }
            Command::SetRenderTarget { color, depth } => {
                self.bind(*color, *depth)
            }
            Command::ClearRenderTarget { flag, color, depth } => {
                self.clear(*flag, *color, *depth)
            }
            Command::DrawRenderers { renderers, state } => {
                self.draw(renderers, *state)
            }
            Command::Blit {
                source,
                destination,
                material,
                pass,
            } => self.blit(*source, *destination, material, *pass),
            Command::BeginSample(label) => {
                log::trace!("begin sample '{label}'");
                self.scopes.push(label.clone());
                self.stats.samples += 1;
                Ok(())
            }
            Command::EndSample(label) => {
                if self.scopes.pop().is_none() {
                    log::warn!("unbalanced profiling scope '{label}'");
                }
                Ok(())
            }
        }
    }
}

impl CommandExecutor for SoftwareBackend {
    fn submit(
        &mut self,
        commands: &CommandBuffer,
        _frame: &FrameData,
    ) -> Result<(), OutlineError> {
        self.stats.submissions += 1;
        let result = commands
            .commands()
            .iter()
            .try_for_each(|command| self.apply(command));
        self.scopes.clear();
        result
    }

    fn live_temporaries(&self) -> Vec<TargetId> {
        self.temporaries.live_ids()
    }

    fn release_temporary(&mut self, id: TargetId) {
        self.release(id);
    }
}
