//! Render pipelines for material passes, compiled on first use.

use rustc_hash::FxHashMap;

use super::pipeline_helpers::{
    blend_state, blit_bind_group_layout, create_blit_pipeline,
};
use super::shader_composer::{builtin_source, ShaderComposer};
use crate::error::OutlineError;
use crate::renderer::material::{Material, MaterialId};

/// Uniform block bound at binding 2 of every blit.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BlitParams {
    /// Material tint.
    pub tint: [f32; 4],
    /// `1 / source size` in pixels.
    pub texel_size: [f32; 2],
    /// Keeps the block 16-byte aligned.
    pub padding: [f32; 2],
}

impl BlitParams {
    /// Parameters for `material` sampling a `width`x`height` source.
    #[must_use]
    pub fn new(material: &Material, width: u32, height: u32) -> Self {
        Self {
            tint: material.tint().to_array(),
            texel_size: [
                1.0 / width.max(1) as f32,
                1.0 / height.max(1) as f32,
            ],
            padding: [0.0; 2],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PipelineKey {
    material: MaterialId,
    pass: usize,
    format: wgpu::TextureFormat,
}

/// Cache of blit pipelines keyed by material, pass and target format.
pub struct MaterialPipelines {
    composer: ShaderComposer,
    layout: wgpu::BindGroupLayout,
    sources: FxHashMap<String, String>,
    shaders: FxHashMap<String, wgpu::ShaderModule>,
    pipelines: FxHashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl MaterialPipelines {
    /// Empty cache with the shared blit layout.
    ///
    /// # Errors
    ///
    /// Returns [`OutlineError::Shader`] if the shared shader modules fail to
    /// register.
    pub fn new(device: &wgpu::Device) -> Result<Self, OutlineError> {
        Ok(Self {
            composer: ShaderComposer::new()?,
            layout: blit_bind_group_layout(device),
            sources: FxHashMap::default(),
            shaders: FxHashMap::default(),
            pipelines: FxHashMap::default(),
        })
    }

    /// Provide WGSL for a host material's shader path. Built-in paths
    /// resolve without registration.
    pub fn register_source(&mut self, path: &str, source: String) {
        let _ = self.shaders.remove(path);
        self.pipelines.clear();
        let _ = self.sources.insert(path.to_owned(), source);
    }

    /// Bind group layout every blit pipeline uses.
    #[must_use]
    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    /// Number of compiled pipelines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    /// Whether nothing has been compiled yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Pipeline running `pass` of `material` into a `format` target.
    ///
    /// # Errors
    ///
    /// [`OutlineError::MissingProgram`] when the material has no such pass,
    /// [`OutlineError::Shader`] when its shader has no source or fails to
    /// compose.
    pub fn pipeline(
        &mut self,
        device: &wgpu::Device,
        material: &Material,
        pass: usize,
        format: wgpu::TextureFormat,
    ) -> Result<&wgpu::RenderPipeline, OutlineError> {
        let key = PipelineKey {
            material: material.id(),
            pass,
            format,
        };
        if !self.pipelines.contains_key(&key) {
            let shader_pass = material.pass(pass).ok_or_else(|| {
                OutlineError::MissingProgram {
                    material: material.name().to_owned(),
                    pass,
                }
            })?;
            let path = material.shader();
            if !self.shaders.contains_key(path) {
                let source = self
                    .sources
                    .get(path)
                    .map(String::as_str)
                    .or_else(|| builtin_source(path))
                    .ok_or_else(|| {
                        OutlineError::Shader(format!(
                            "no source registered for '{path}'"
                        ))
                    })?;
                let module =
                    self.composer.compose(device, path, source, path)?;
                let _ = self.shaders.insert(path.to_owned(), module);
            }
            let shader = self.shaders.get(path).ok_or_else(|| {
                OutlineError::Shader(format!("shader '{path}' not compiled"))
            })?;

            log::debug!(
                "compiling pipeline for '{}' pass {pass} ({format:?})",
                material.name()
            );
            let pipeline = create_blit_pipeline(
                device,
                &format!("{} {}", material.name(), shader_pass.name),
                shader,
                &shader_pass.entry_point,
                format,
                blend_state(shader_pass.blend),
                &[&self.layout],
            );
            let _ = self.pipelines.insert(key, pipeline);
        }
        self.pipelines.get(&key).ok_or(OutlineError::MissingProgram {
            material: material.name().to_owned(),
            pass,
        })
    }
}
