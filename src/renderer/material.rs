//! Material handles and pass-indexed material bindings.
//!
//! A [`Material`] is an opaque handle to a shader asset exposing a list of
//! numbered sub-programs ("passes"). Backends look the handle up by id and
//! run whichever pass a blit asks for. A [`PassIndexedMaterial`] binds a
//! material to one of its passes.

use std::sync::Arc;

use glam::Vec4;
use rustc_hash::FxHashMap;

use crate::error::OutlineError;

/// Label shown for passes that have an empty name.
pub const UNNAMED_PASS: &str = "Unnamed Pass";

/// Library-assigned material identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u32);

/// How a pass's output combines with the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Overwrite the destination.
    #[default]
    Opaque,
    /// `src * src.a + dst * (1 - src.a)`.
    AlphaBlend,
    /// `src * src.a + dst`.
    Additive,
}

/// One numbered sub-program of a material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderPass {
    /// Display name; may be empty.
    pub name: String,
    /// Fragment entry point in the material's shader.
    pub entry_point: String,
    /// Output blending.
    pub blend: BlendMode,
}

impl ShaderPass {
    /// Build a pass description.
    #[must_use]
    pub fn new(name: &str, entry_point: &str, blend: BlendMode) -> Self {
        Self {
            name: name.to_owned(),
            entry_point: entry_point.to_owned(),
            blend,
        }
    }
}

#[derive(Debug)]
struct MaterialInner {
    id: MaterialId,
    name: String,
    shader: String,
    passes: Vec<ShaderPass>,
}

/// Opaque, cheaply clonable handle to a registered material.
#[derive(Debug, Clone)]
pub struct Material {
    inner: Arc<MaterialInner>,
    tint: Vec4,
}

impl PartialEq for Material {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id && self.tint == other.tint
    }
}

impl Material {
    /// Library-assigned id.
    #[must_use]
    pub fn id(&self) -> MaterialId {
        self.inner.id
    }

    /// Asset name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Shader source path the passes live in.
    #[must_use]
    pub fn shader(&self) -> &str {
        &self.inner.shader
    }

    /// Number of sub-programs.
    #[must_use]
    pub fn pass_count(&self) -> usize {
        self.inner.passes.len()
    }

    /// Pass description by index.
    #[must_use]
    pub fn pass(&self, index: usize) -> Option<&ShaderPass> {
        self.inner.passes.get(index)
    }

    /// Pass name by index.
    #[must_use]
    pub fn pass_name(&self, index: usize) -> Option<&str> {
        self.pass(index).map(|pass| pass.name.as_str())
    }

    /// Color parameter passed to every pass.
    #[must_use]
    pub fn tint(&self) -> Vec4 {
        self.tint
    }

    /// Same material with a different tint. Shares id and passes.
    #[must_use]
    pub fn with_tint(&self, tint: Vec4) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            tint,
        }
    }
}

/// Registry of materials by asset name.
#[derive(Debug, Default)]
pub struct MaterialLibrary {
    materials: Vec<Material>,
    by_name: FxHashMap<String, usize>,
}

impl MaterialLibrary {
    /// Empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a material. Re-registering a name replaces the previous
    /// entry under a new id.
    pub fn register(
        &mut self,
        name: &str,
        shader: &str,
        passes: Vec<ShaderPass>,
    ) -> Material {
        let material = Material {
            inner: Arc::new(MaterialInner {
                id: MaterialId(self.materials.len() as u32),
                name: name.to_owned(),
                shader: shader.to_owned(),
                passes,
            }),
            tint: Vec4::ONE,
        };
        let _ = self.by_name.insert(name.to_owned(), self.materials.len());
        self.materials.push(material.clone());
        material
    }

    /// Look up a material by asset name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Material> {
        self.by_name.get(name).map(|&index| &self.materials[index])
    }

    /// Look up a material by id.
    #[must_use]
    pub fn by_id(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0 as usize)
    }

    /// Every registered material, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.materials.iter()
    }
}

/// One entry of the pass picker shown by configuration editors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOption {
    /// Pass index.
    pub index: usize,
    /// `"{index}: {name}"`.
    pub label: String,
}

/// A material bound to one of its numbered passes.
///
/// Immutable once built. An unset material means "skip this step".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassIndexedMaterial {
    material: Option<Material>,
    pass_index: usize,
}

impl PassIndexedMaterial {
    /// Bind without range checking.
    #[must_use]
    pub fn new(material: Option<Material>, pass_index: usize) -> Self {
        Self {
            material,
            pass_index,
        }
    }

    /// No material bound.
    #[must_use]
    pub fn unset() -> Self {
        Self::default()
    }

    /// Bind, rejecting indices outside the material's pass range.
    ///
    /// # Errors
    ///
    /// Returns [`OutlineError::PassIndexOutOfRange`] when the material
    /// exposes passes and `pass_index` is not one of them.
    pub fn validated(
        material: Material,
        pass_index: usize,
    ) -> Result<Self, OutlineError> {
        let pass_count = material.pass_count();
        if pass_count > 0 && pass_index >= pass_count {
            return Err(OutlineError::PassIndexOutOfRange {
                material: material.name().to_owned(),
                index: pass_index,
                pass_count,
            });
        }
        Ok(Self::new(Some(material), pass_index))
    }

    /// Bind, clamping the index into the material's pass range.
    #[must_use]
    pub fn clamped(material: Material, pass_index: usize) -> Self {
        let last = material.pass_count().saturating_sub(1);
        if pass_index > last {
            log::warn!(
                "pass index {pass_index} out of range for material '{}', \
                 clamped to {last}",
                material.name()
            );
        }
        Self::new(Some(material), pass_index.min(last))
    }

    /// Bound material, if any.
    #[must_use]
    pub fn material(&self) -> Option<&Material> {
        self.material.as_ref()
    }

    /// Configured pass index.
    #[must_use]
    pub fn pass_index(&self) -> usize {
        self.pass_index
    }

    /// Whether a material is bound.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.material.is_some()
    }

    /// Material and pass to run this frame.
    ///
    /// `None` when no material is bound or the material has no passes.
    /// An index past the last pass falls back to pass 0.
    #[must_use]
    pub fn resolve(&self) -> Option<(&Material, usize)> {
        let material = self.material.as_ref()?;
        let pass_count = material.pass_count();
        if pass_count == 0 {
            return None;
        }
        if self.pass_index >= pass_count {
            log::warn!(
                "material '{}' has {pass_count} passes, index {} falls \
                 back to pass 0",
                material.name(),
                self.pass_index
            );
            return Some((material, 0));
        }
        Some((material, self.pass_index))
    }

    /// Pass picker entries for the bound material.
    ///
    /// Empty when no material is bound or it exposes no passes.
    #[must_use]
    pub fn pass_options(&self) -> Vec<PassOption> {
        let Some(material) = &self.material else {
            return Vec::new();
        };
        (0..material.pass_count())
            .map(|index| {
                let name = material
                    .pass_name(index)
                    .filter(|name| !name.is_empty())
                    .unwrap_or(UNNAMED_PASS);
                PassOption {
                    index,
                    label: format!("{index}: {name}"),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library_with(passes: &[&str]) -> (MaterialLibrary, Material) {
        let mut library = MaterialLibrary::new();
        let material = library.register(
            "Test",
            "test.wgsl",
            passes
                .iter()
                .map(|name| ShaderPass::new(name, "fs_main", BlendMode::Opaque))
                .collect(),
        );
        (library, material)
    }

    #[test]
    fn library_lookup_by_name_and_id() {
        let (library, material) = library_with(&["A"]);
        assert_eq!(library.get("Test"), Some(&material));
        assert_eq!(library.by_id(material.id()), Some(&material));
        assert!(library.get("Missing").is_none());
    }

    #[test]
    fn unset_material_resolves_to_nothing() {
        assert!(PassIndexedMaterial::unset().resolve().is_none());
        assert!(!PassIndexedMaterial::unset().is_set());
    }

    #[test]
    fn zero_pass_material_resolves_to_nothing() {
        let (_, material) = library_with(&[]);
        let binding = PassIndexedMaterial::new(Some(material), 0);
        assert!(binding.resolve().is_none());
        assert!(binding.pass_options().is_empty());
    }

    #[test]
    fn out_of_range_index_falls_back_to_first_pass() {
        let (_, material) = library_with(&["A", "B"]);
        let binding = PassIndexedMaterial::new(Some(material), 7);
        let (_, pass) = binding.resolve().unwrap();
        assert_eq!(pass, 0);
    }

    #[test]
    fn validated_rejects_and_clamped_clamps() {
        let (_, material) = library_with(&["A", "B", "C"]);
        assert!(PassIndexedMaterial::validated(material.clone(), 2).is_ok());
        assert!(matches!(
            PassIndexedMaterial::validated(material.clone(), 3),
            Err(OutlineError::PassIndexOutOfRange { pass_count: 3, .. })
        ));
        assert_eq!(
            PassIndexedMaterial::clamped(material, 9).pass_index(),
            2
        );
    }

    #[test]
    fn pass_options_label_unnamed_passes() {
        let (_, material) = library_with(&["Sobel", ""]);
        let options = PassIndexedMaterial::new(Some(material), 0)
            .pass_options();
        let labels: Vec<_> =
            options.iter().map(|option| option.label.as_str()).collect();
        assert_eq!(labels, vec!["0: Sobel", "1: Unnamed Pass"]);
    }

    #[test]
    fn tint_shares_identity() {
        let (_, material) = library_with(&["A"]);
        let tinted = material.with_tint(Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(tinted.id(), material.id());
        assert_ne!(tinted, material);
        assert_eq!(tinted.pass_count(), 1);
    }
}
