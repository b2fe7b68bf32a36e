use std::borrow::Cow;

use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor,
    ShaderLanguage, ShaderType,
};

use crate::error::OutlineError;
use crate::renderer::outline::builtin::{COMPOSITE_SHADER, SOBEL_SHADER};

/// Wraps `naga_oil::compose::Composer` to provide shader composition with
/// `#import` support.
///
/// Pre-loads the shared WGSL modules at construction time. Material shaders
/// use `#import outline::fullscreen` to pull in the full-screen triangle and
/// blit parameter layout.
pub struct ShaderComposer {
    composer: Composer,
}

/// Shared module definition.
struct ModuleDef {
    source: &'static str,
    file_path: &'static str,
}

const MODULES: &[ModuleDef] = &[ModuleDef {
    source: include_str!("../../assets/shaders/modules/fullscreen.wgsl"),
    file_path: "modules/fullscreen.wgsl",
}];

/// Source of a built-in material shader by its path under
/// `assets/shaders/`.
#[must_use]
pub fn builtin_source(path: &str) -> Option<&'static str> {
    match path {
        SOBEL_SHADER => {
            Some(include_str!("../../assets/shaders/outline/sobel.wgsl"))
        }
        COMPOSITE_SHADER => {
            Some(include_str!("../../assets/shaders/outline/composite.wgsl"))
        }
        _ => None,
    }
}

impl ShaderComposer {
    /// Composer with every shared module registered.
    ///
    /// # Errors
    ///
    /// Returns [`OutlineError::Shader`] if a shared module fails to parse.
    pub fn new() -> Result<Self, OutlineError> {
        let mut composer = Composer::default();

        for m in MODULES {
            let _ = composer
                .add_composable_module(ComposableModuleDescriptor {
                    source: m.source,
                    file_path: m.file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                })
                .map_err(|e| {
                    OutlineError::Shader(format!(
                        "failed to register shader module '{}': {e:?}",
                        m.file_path
                    ))
                })?;
        }

        Ok(Self { composer })
    }

    /// Compose a shader source string (which may contain `#import`
    /// directives) into a `wgpu::ShaderModule` ready for pipeline creation.
    ///
    /// # Errors
    ///
    /// Returns [`OutlineError::Shader`] if composition fails.
    pub fn compose(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        source: &str,
        file_path: &str,
    ) -> Result<wgpu::ShaderModule, OutlineError> {
        let naga_module = self.compose_naga(source, file_path)?;
        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Naga(Cow::Owned(naga_module)),
        }))
    }

    /// Compose a shader source into a `naga::Module` without creating a
    /// wgpu shader module. Useful for testing shader composition without a
    /// GPU device.
    ///
    /// # Errors
    ///
    /// Returns [`OutlineError::Shader`] if composition fails.
    pub fn compose_naga(
        &mut self,
        source: &str,
        file_path: &str,
    ) -> Result<naga::Module, OutlineError> {
        self.composer
            .make_naga_module(NagaModuleDescriptor {
                source,
                file_path,
                shader_type: ShaderType::Wgsl,
                ..Default::default()
            })
            .map_err(|e| {
                OutlineError::Shader(format!(
                    "failed to compose shader '{file_path}': {e}"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::material::MaterialLibrary;
    use crate::renderer::outline::register_builtin_materials;

    #[test]
    fn test_all_shaders_compose() {
        let mut composer = ShaderComposer::new().unwrap();
        for path in [SOBEL_SHADER, COMPOSITE_SHADER] {
            let source = builtin_source(path).unwrap();
            let _ = composer
                .compose_naga(source, path)
                .unwrap_or_else(|e| panic!("{e}"));
        }
    }

    #[test]
    fn composed_modules_validate_and_expose_material_entry_points() {
        let mut library = MaterialLibrary::new();
        let builtins = register_builtin_materials(&mut library);
        let mut composer = ShaderComposer::new().unwrap();

        for material in [&builtins.sobel, &builtins.composite] {
            let source = builtin_source(material.shader()).unwrap();
            let module =
                composer.compose_naga(source, material.shader()).unwrap();
            let _ = naga::valid::Validator::new(
                naga::valid::ValidationFlags::all(),
                naga::valid::Capabilities::empty(),
            )
            .validate(&module)
            .unwrap_or_else(|e| panic!("{}: {e:?}", material.shader()));

            let entry_points: Vec<_> = module
                .entry_points
                .iter()
                .map(|ep| ep.name.as_str())
                .collect();
            assert!(entry_points.contains(&"vs_main"));
            for index in 0..material.pass_count() {
                let pass = material.pass(index).unwrap();
                assert!(
                    entry_points.contains(&pass.entry_point.as_str()),
                    "{} missing {}",
                    material.shader(),
                    pass.entry_point
                );
            }
        }
    }

    #[test]
    fn unknown_builtin_path_has_no_source() {
        assert!(builtin_source("outline/missing.wgsl").is_none());
    }
}
