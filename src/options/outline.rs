use glam::Vec4;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::renderer::filter::LayerMask;
use crate::renderer::material::{MaterialLibrary, PassIndexedMaterial};
use crate::renderer::outline::builtin::{COMPOSITE_MATERIAL, SOBEL_MATERIAL};
use crate::renderer::outline::feature::{
    OutlineFeatureConfig, DEFAULT_RENDER_TARGET_NAME,
};

/// A material reference by asset name plus a pass index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[schemars(inline)]
#[serde(default)]
pub struct MaterialPassOptions {
    /// Asset name; `None` leaves the step unset.
    #[schemars(title = "Material")]
    pub material: Option<String>,
    /// Sub-program index within the material.
    #[schemars(title = "Pass", range(min = 0))]
    pub pass_index: usize,
}

impl Default for MaterialPassOptions {
    fn default() -> Self {
        Self {
            material: None,
            pass_index: 0,
        }
    }
}

impl MaterialPassOptions {
    /// Reference `material` at `pass_index`.
    #[must_use]
    pub fn new(material: &str, pass_index: usize) -> Self {
        Self {
            material: Some(material.to_owned()),
            pass_index,
        }
    }

    /// Look the material up and clamp the index into its pass range.
    ///
    /// Unknown names resolve to an unset binding.
    #[must_use]
    pub fn resolve(&self, library: &MaterialLibrary) -> PassIndexedMaterial {
        let Some(name) = &self.material else {
            return PassIndexedMaterial::unset();
        };
        match library.get(name) {
            Some(material) => {
                PassIndexedMaterial::clamped(material.clone(), self.pass_index)
            }
            None => {
                log::warn!("material '{name}' is not registered, step unset");
                PassIndexedMaterial::unset()
            }
        }
    }
}

/// Outline feature configuration as stored in presets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Outline", inline)]
#[serde(default)]
pub struct OutlineOptions {
    /// Logical name of the mask target.
    #[schemars(skip)]
    pub render_target_name: String,
    /// Layers whose renderers get outlined.
    #[schemars(title = "Layer Mask")]
    pub layer_mask: LayerMask,
    /// Edge-detect material.
    #[schemars(title = "Sobel Material")]
    pub sobel_material: MaterialPassOptions,
    /// Composite material.
    #[schemars(title = "Blit Material")]
    pub blit_material: MaterialPassOptions,
    /// Stroke color handed to the composite material, RGBA.
    #[schemars(title = "Outline Color")]
    pub outline_color: [f32; 4],
}

impl Default for OutlineOptions {
    fn default() -> Self {
        Self {
            render_target_name: DEFAULT_RENDER_TARGET_NAME.to_owned(),
            layer_mask: LayerMask::EVERYTHING,
            sobel_material: MaterialPassOptions::new(SOBEL_MATERIAL, 0),
            blit_material: MaterialPassOptions::new(COMPOSITE_MATERIAL, 1),
            outline_color: [1.0, 0.6, 0.0, 1.0],
        }
    }
}

impl OutlineOptions {
    /// Build the feature configuration against `library`.
    ///
    /// Pass indices are clamped into range here, so the feature never sees
    /// an out-of-range index from a preset.
    #[must_use]
    pub fn resolve(&self, library: &MaterialLibrary) -> OutlineFeatureConfig {
        let sobel = self.sobel_material.resolve(library);
        let blit = self.blit_material.resolve(library);
        let blit = PassIndexedMaterial::new(
            blit.material()
                .map(|material| material.with_tint(self.outline_color())),
            blit.pass_index(),
        );
        OutlineFeatureConfig {
            render_target_name: self.render_target_name.clone(),
            layer_mask: self.layer_mask,
            sobel,
            blit,
        }
    }

    /// Stroke color as a vector.
    #[must_use]
    pub fn outline_color(&self) -> Vec4 {
        Vec4::from_array(self.outline_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::material::{BlendMode, ShaderPass};
    use crate::renderer::outline::register_builtin_materials;

    #[test]
    fn defaults_resolve_against_builtins() {
        let mut library = MaterialLibrary::new();
        let builtins = register_builtin_materials(&mut library);
        let config = OutlineOptions::default().resolve(&library);
        assert_eq!(config.render_target_name, "_RenderOutlineRT");
        assert_eq!(config.sobel.material(), Some(&builtins.sobel));
        assert_eq!(config.sobel.pass_index(), 0);
        assert_eq!(config.blit.pass_index(), 1);
        let tint = config.blit.material().unwrap().tint();
        assert_eq!(tint, Vec4::new(1.0, 0.6, 0.0, 1.0));
    }

    #[test]
    fn out_of_range_pass_is_clamped() {
        let mut library = MaterialLibrary::new();
        let _ = register_builtin_materials(&mut library);
        let options = OutlineOptions {
            blit_material: MaterialPassOptions::new(COMPOSITE_MATERIAL, 9),
            ..OutlineOptions::default()
        };
        assert_eq!(options.resolve(&library).blit.pass_index(), 2);
    }

    #[test]
    fn unknown_or_missing_material_is_unset() {
        let mut library = MaterialLibrary::new();
        let _ = library.register(
            "Other",
            "other.wgsl",
            vec![ShaderPass::new("A", "fs_a", BlendMode::Opaque)],
        );
        let options = OutlineOptions {
            sobel_material: MaterialPassOptions::new("Nope", 0),
            blit_material: MaterialPassOptions::default(),
            ..OutlineOptions::default()
        };
        let config = options.resolve(&library);
        assert!(!config.sobel.is_set());
        assert!(!config.blit.is_set());
    }
}
