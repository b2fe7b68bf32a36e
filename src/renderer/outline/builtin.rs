//! Built-in outline materials shipped with the crate.
//!
//! Each material's WGSL lives under `assets/shaders/outline/`; the pass
//! list here must stay in sync with the fragment entry points there.

use crate::renderer::material::{
    BlendMode, Material, MaterialLibrary, ShaderPass,
};

/// Asset name of the edge-detect material.
pub const SOBEL_MATERIAL: &str = "Outline/Sobel";
/// Asset name of the composite material.
pub const COMPOSITE_MATERIAL: &str = "Outline/Composite";

/// Shader path of [`SOBEL_MATERIAL`], relative to `assets/shaders/`.
pub const SOBEL_SHADER: &str = "outline/sobel.wgsl";
/// Shader path of [`COMPOSITE_MATERIAL`], relative to `assets/shaders/`.
pub const COMPOSITE_SHADER: &str = "outline/composite.wgsl";

/// Handles returned by [`register_builtin_materials`].
#[derive(Debug, Clone)]
pub struct BuiltinMaterials {
    /// `Outline/Sobel`: `0: Sobel`, `1: Sobel Wide`.
    pub sobel: Material,
    /// `Outline/Composite`: `0: Copy`, `1: Alpha Composite`,
    /// `2: Additive`.
    pub composite: Material,
}

fn sobel_passes() -> Vec<ShaderPass> {
    vec![
        ShaderPass::new("Sobel", "fs_sobel", BlendMode::Opaque),
        ShaderPass::new("Sobel Wide", "fs_sobel_wide", BlendMode::Opaque),
    ]
}

fn composite_passes() -> Vec<ShaderPass> {
    vec![
        ShaderPass::new("Copy", "fs_copy", BlendMode::Opaque),
        ShaderPass::new(
            "Alpha Composite",
            "fs_alpha_composite",
            BlendMode::AlphaBlend,
        ),
        ShaderPass::new("Additive", "fs_additive", BlendMode::Additive),
    ]
}

/// Register both outline materials into `library`.
pub fn register_builtin_materials(
    library: &mut MaterialLibrary,
) -> BuiltinMaterials {
    BuiltinMaterials {
        sobel: library.register(SOBEL_MATERIAL, SOBEL_SHADER, sobel_passes()),
        composite: library.register(
            COMPOSITE_MATERIAL,
            COMPOSITE_SHADER,
            composite_passes(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_expose_expected_passes() {
        let mut library = MaterialLibrary::new();
        let builtins = register_builtin_materials(&mut library);
        assert_eq!(builtins.sobel.pass_count(), 2);
        assert_eq!(builtins.composite.pass_count(), 3);
        assert_eq!(builtins.composite.pass_name(1), Some("Alpha Composite"));
        assert_eq!(library.get(SOBEL_MATERIAL), Some(&builtins.sobel));
    }

    #[test]
    fn entry_points_exist_in_shader_sources() {
        let mut library = MaterialLibrary::new();
        let builtins = register_builtin_materials(&mut library);
        for (material, source) in [
            (
                &builtins.sobel,
                include_str!("../../../assets/shaders/outline/sobel.wgsl"),
            ),
            (
                &builtins.composite,
                include_str!(
                    "../../../assets/shaders/outline/composite.wgsl"
                ),
            ),
        ] {
            for index in 0..material.pass_count() {
                let entry = &material.pass(index).unwrap().entry_point;
                assert!(
                    source.contains(&format!("fn {entry}(")),
                    "{} missing {entry}",
                    material.name()
                );
            }
        }
    }
}
