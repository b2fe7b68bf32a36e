//! wgpu executor for recorded outline commands.
//!
//! [`GpuOutlineBackend`] lives across frames and owns the pipeline cache and
//! the temporary-target arena. Each frame the host opens a [`GpuFrame`] over
//! its command encoder and camera textures and submits through it.

use glam::Vec4;
use wgpu::util::DeviceExt;

use super::geometry::{DrawTargetFormats, GeometryDrawer};
use super::materials::{BlitParams, MaterialPipelines};
use super::render_context::RenderContext;
use super::texture::GpuTarget;
use crate::error::OutlineError;
use crate::renderer::command::{Command, CommandBuffer};
use crate::renderer::filter::{RenderStateBlock, RendererId};
use crate::renderer::frame::CommandExecutor;
use crate::renderer::material::Material;
use crate::renderer::pass::FrameData;
use crate::renderer::target::{
    ClearFlag, RenderTargetIdentifier, TargetDescriptor, TargetId,
};
use crate::renderer::temporary::TemporaryTargets;

/// The host's live camera textures for one frame.
#[derive(Clone, Copy)]
pub struct CameraTextures<'a> {
    /// Camera color view.
    pub color: &'a wgpu::TextureView,
    /// Camera color format.
    pub color_format: wgpu::TextureFormat,
    /// Camera depth view, if the camera has one.
    pub depth: Option<&'a wgpu::TextureView>,
    /// Camera depth format.
    pub depth_format: Option<wgpu::TextureFormat>,
}

/// Cross-frame GPU state of the outline effect.
pub struct GpuOutlineBackend {
    pipelines: MaterialPipelines,
    temporaries: TemporaryTargets<GpuTarget>,
    memory_budget: Option<usize>,
}

impl GpuOutlineBackend {
    /// Backend on `context`'s device.
    ///
    /// # Errors
    ///
    /// Returns [`OutlineError::Shader`] if the shared shader modules fail to
    /// register.
    pub fn new(context: &RenderContext) -> Result<Self, OutlineError> {
        Ok(Self {
            pipelines: MaterialPipelines::new(&context.device)?,
            temporaries: TemporaryTargets::new(),
            memory_budget: None,
        })
    }

    /// Cap the bytes temporaries may hold; allocations past it fail.
    pub fn set_memory_budget(&mut self, budget: Option<usize>) {
        self.memory_budget = budget;
    }

    /// Pipeline cache, for registering host material sources.
    pub fn pipelines_mut(&mut self) -> &mut MaterialPipelines {
        &mut self.pipelines
    }

    /// Temporaries currently alive.
    #[must_use]
    pub fn temporaries(&self) -> &TemporaryTargets<GpuTarget> {
        &self.temporaries
    }

    /// Open a frame recording into `encoder`.
    pub fn begin_frame<'a>(
        &'a mut self,
        device: &'a wgpu::Device,
        encoder: &'a mut wgpu::CommandEncoder,
        camera: CameraTextures<'a>,
        drawer: &'a mut dyn GeometryDrawer,
    ) -> GpuFrame<'a> {
        GpuFrame {
            backend: self,
            device,
            encoder,
            camera,
            drawer,
            bound: None,
            pending_clear: None,
            open_samples: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Binding {
    color: RenderTargetIdentifier,
    depth: Option<RenderTargetIdentifier>,
}

impl Binding {
    /// Whether `target` is attached as either color or depth.
    fn attaches(&self, target: RenderTargetIdentifier) -> bool {
        self.color == target || self.depth == Some(target)
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingClear {
    flag: ClearFlag,
    color: Vec4,
    depth: f32,
}

/// One frame's executor over a wgpu command encoder.
///
/// Clears are deferred into the load ops of the next draw on the same
/// binding, and flushed as an empty pass otherwise, so an empty draw list
/// still clears. Profiling scopes become debug groups.
pub struct GpuFrame<'a> {
    backend: &'a mut GpuOutlineBackend,
    device: &'a wgpu::Device,
    encoder: &'a mut wgpu::CommandEncoder,
    camera: CameraTextures<'a>,
    drawer: &'a mut dyn GeometryDrawer,
    bound: Option<Binding>,
    pending_clear: Option<PendingClear>,
    open_samples: Vec<String>,
}

fn color_attachment<'t>(
    temporaries: &'t TemporaryTargets<GpuTarget>,
    camera: &CameraTextures<'t>,
    target: RenderTargetIdentifier,
) -> Result<(&'t wgpu::TextureView, wgpu::TextureFormat), OutlineError> {
    match target {
        RenderTargetIdentifier::CameraColor => {
            Ok((camera.color, camera.color_format))
        }
        RenderTargetIdentifier::Temporary(id) => temporaries
            .get(id)
            .map(|t| (&t.view, t.format))
            .ok_or(OutlineError::UnknownTarget(target)),
        RenderTargetIdentifier::CameraDepth => {
            Err(OutlineError::UnsupportedTarget {
                target,
                usage: "color attachment",
            })
        }
    }
}

fn depth_attachment<'t>(
    temporaries: &'t TemporaryTargets<GpuTarget>,
    camera: &CameraTextures<'t>,
    target: RenderTargetIdentifier,
) -> Result<(&'t wgpu::TextureView, Option<wgpu::TextureFormat>), OutlineError>
{
    let unsupported = OutlineError::UnsupportedTarget {
        target,
        usage: "depth attachment",
    };
    match target {
        RenderTargetIdentifier::CameraDepth => camera
            .depth
            .map(|view| (view, camera.depth_format))
            .ok_or(unsupported),
        RenderTargetIdentifier::Temporary(id) => {
            let gpu_target = temporaries
                .get(id)
                .ok_or(OutlineError::UnknownTarget(target))?;
            let format = temporaries
                .descriptor(id)
                .and_then(|d| super::texture::depth_format(d.depth_bits));
            gpu_target
                .depth_view
                .as_ref()
                .map(|view| (view, format))
                .ok_or(unsupported)
        }
        RenderTargetIdentifier::CameraColor => Err(unsupported),
    }
}

fn to_color(color: Vec4) -> wgpu::Color {
    wgpu::Color {
        r: f64::from(color.x),
        g: f64::from(color.y),
        b: f64::from(color.z),
        a: f64::from(color.w),
    }
}

impl GpuFrame<'_> {
    fn allocate(
        &mut self,
        id: TargetId,
        descriptor: TargetDescriptor,
    ) -> Result<(), OutlineError> {
        let temporaries = &mut self.backend.temporaries;
        if let Some(budget) = self.backend.memory_budget {
            let reused = temporaries
                .descriptor(id)
                .map_or(0, TargetDescriptor::byte_size);
            let needed =
                temporaries.live_bytes() - reused + descriptor.byte_size();
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
        let device = self.device;
        let _ = temporaries.acquire(id, descriptor, |d| {
            Ok::<_, OutlineError>(GpuTarget::new(
                device,
                &format!("Outline Temporary {id}"),
                d,
            ))
        })?;
        Ok(())
    }

    /// Open a render pass on the bound target, consuming any pending clear
    /// as load ops, and draw `renderers` into it when given.
    fn bound_pass(
        &mut self,
        draw: Option<(&[RendererId], RenderStateBlock)>,
    ) -> Result<(), OutlineError> {
        let binding = self.bound.ok_or(OutlineError::NoRenderTarget)?;
        let clear = self.pending_clear.take();
        let (color_view, color_format) = color_attachment(
            &self.backend.temporaries,
            &self.camera,
            binding.color,
        )?;
        let depth = binding
            .depth
            .map(|depth| {
                depth_attachment(&self.backend.temporaries, &self.camera, depth)
            })
            .transpose()?;

        let color_load = match clear {
            Some(clear) if clear.flag.clears_color() => {
                wgpu::LoadOp::Clear(to_color(clear.color))
            }
            _ => wgpu::LoadOp::Load,
        };
        let depth_load = match clear {
            Some(clear) if clear.flag.clears_depth() => {
                wgpu::LoadOp::Clear(clear.depth)
            }
            _ => wgpu::LoadOp::Load,
        };

        let mut pass =
            self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Outline Draw Renderers"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: depth.map(|(view, _)| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view,
                        depth_ops: Some(wgpu::Operations {
                            load: depth_load,
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
        if let Some((renderers, state)) = draw {
            if !renderers.is_empty() {
                self.drawer.draw_renderers(
                    &mut pass,
                    renderers,
                    state,
                    DrawTargetFormats {
                        color: color_format,
                        depth: depth.and_then(|(_, format)| format),
                    },
                );
            }
        }
        Ok(())
    }

    fn flush_clear(&mut self) -> Result<(), OutlineError> {
        if self.pending_clear.is_some() {
            self.bound_pass(None)?;
        }
        Ok(())
    }

    fn blit(
        &mut self,
        source: RenderTargetIdentifier,
        destination: RenderTargetIdentifier,
        material: &Material,
        pass: usize,
    ) -> Result<(), OutlineError> {
        self.flush_clear()?;
        if source == destination {
            return Err(OutlineError::UnsupportedTarget {
                target: source,
                usage: "blit source and destination at once",
            });
        }
        let RenderTargetIdentifier::Temporary(source_id) = source else {
            return Err(OutlineError::UnsupportedTarget {
                target: source,
                usage: "blit source",
            });
        };

        let backend = &mut *self.backend;
        let input = backend
            .temporaries
            .get(source_id)
            .ok_or(OutlineError::UnknownTarget(source))?;
        if !input.is_filterable() {
            return Err(OutlineError::UnsupportedTarget {
                target: source,
                usage: "filtered blit source",
            });
        }
        let size = input.texture.size();
        let (output_view, output_format) =
            color_attachment(&backend.temporaries, &self.camera, destination)?;
        let params = BlitParams::new(material, size.width, size.height);
        let buffer =
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Outline Blit Params"),
                    contents: bytemuck::cast_slice(&[params]),
                    usage: wgpu::BufferUsages::UNIFORM,
                });
        let bind_group =
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Outline Blit Bind Group"),
                layout: backend.pipelines.layout(),
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(
                            &input.view,
                        ),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(
                            &input.sampler,
                        ),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: buffer.as_entire_binding(),
                    },
                ],
            });
        let pipeline = backend.pipelines.pipeline(
            self.device,
            material,
            pass,
            output_format,
        )?;

        let mut render_pass =
            self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(material.name()),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: output_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &bind_group, &[]);
        render_pass.draw(0..3, 0..1);
        Ok(())
    }

    fn apply(&mut self, command: &Command) -> Result<(), OutlineError> {
        match command {
            Command::GetTemporary { id, descriptor } => {
                self.allocate(*id, *descriptor)
            }
            Command::ReleaseTemporary { id } => {
                self.flush_clear()?;
                let released = RenderTargetIdentifier::Temporary(*id);
                if self.bound.is_some_and(|b| b.attaches(released)) {
                    self.bound = None;
                }
                let _ = self.backend.temporaries.release(*id);
                Ok(())
            }
            Command::SetRenderTarget { color, depth } => {
                self.flush_clear()?;
                self.bound = Some(Binding {
                    color: *color,
                    depth: *depth,
                });
                Ok(())
            }
            Command::ClearRenderTarget { flag, color, depth } => {
                if self.bound.is_none() {
                    return Err(OutlineError::NoRenderTarget);
                }
                if *flag != ClearFlag::None {
                    self.pending_clear = Some(PendingClear {
                        flag: *flag,
                        color: *color,
                        depth: *depth,
                    });
                }
                Ok(())
            }
            Command::DrawRenderers { renderers, state } => {
                self.bound_pass(Some((renderers.as_slice(), *state)))
            }
            Command::Blit {
                source,
                destination,
                material,
                pass,
            } => self.blit(*source, *destination, material, *pass),
            Command::BeginSample(label) => {
                self.flush_clear()?;
                self.encoder.push_debug_group(label);
                self.open_samples.push(label.clone());
                Ok(())
            }
            Command::EndSample(label) => {
                self.flush_clear()?;
                if self.open_samples.pop().is_some() {
                    self.encoder.pop_debug_group();
                } else {
                    log::warn!("unbalanced profiling scope '{label}'");
                }
                Ok(())
            }
        }
    }
}

impl CommandExecutor for GpuFrame<'_> {
    fn submit(
        &mut self,
        commands: &CommandBuffer,
        _frame: &FrameData,
    ) -> Result<(), OutlineError> {
        let result = commands
            .commands()
            .iter()
            .try_for_each(|command| self.apply(command))
            .and_then(|()| self.flush_clear());
        // Scopes never stay open past a submission.
        while self.open_samples.pop().is_some() {
            self.encoder.pop_debug_group();
        }
        if result.is_err() {
            self.pending_clear = None;
        }
        result
    }

    fn live_temporaries(&self) -> Vec<TargetId> {
        self.backend.temporaries.live_ids()
    }

    fn release_temporary(&mut self, id: TargetId) {
        let _ = self.backend.temporaries.release(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_attaches_released_depth_temporary() {
        let color = RenderTargetIdentifier::Temporary(TargetId::from_name("c"));
        let depth = RenderTargetIdentifier::Temporary(TargetId::from_name("d"));
        let other = RenderTargetIdentifier::Temporary(TargetId::from_name("o"));
        let binding = Binding {
            color,
            depth: Some(depth),
        };
        assert!(binding.attaches(color));
        assert!(binding.attaches(depth));
        assert!(!binding.attaches(other));

        let color_only = Binding { color, depth: None };
        assert!(!color_only.attaches(depth));
        assert!(!color_only.attaches(RenderTargetIdentifier::CameraDepth));
    }
}
