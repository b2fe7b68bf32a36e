//! Outline feature - owns the mask and edge passes and registers them
//! with the host every frame.

use crate::renderer::filter::LayerMask;
use crate::renderer::frame::{PassQueue, RendererFeature};
use crate::renderer::material::PassIndexedMaterial;
use crate::renderer::pass::{FrameData, RenderPassEvent};
use crate::renderer::target::TargetId;

use super::edge_pass::{EdgeCompositePass, SCRATCH_TARGET_NAME};
use super::mask_pass::{MaskRenderPass, MASK_PROFILER_TAG};

/// Default logical name of the mask target.
pub const DEFAULT_RENDER_TARGET_NAME: &str = "_RenderOutlineRT";

/// Everything the feature needs to build its passes.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineFeatureConfig {
    /// Logical name hashed into the mask target id.
    pub render_target_name: String,
    /// Layers drawn into the mask.
    pub layer_mask: LayerMask,
    /// Edge-detect material and pass.
    pub sobel: PassIndexedMaterial,
    /// Composite material and pass.
    pub blit: PassIndexedMaterial,
}

impl Default for OutlineFeatureConfig {
    fn default() -> Self {
        Self {
            render_target_name: DEFAULT_RENDER_TARGET_NAME.to_owned(),
            layer_mask: LayerMask::EVERYTHING,
            sobel: PassIndexedMaterial::unset(),
            blit: PassIndexedMaterial::unset(),
        }
    }
}

/// Silhouette outline renderer feature.
///
/// [`build`](Self::build) constructs both passes from the current
/// configuration; every frame [`add_render_passes`](
/// RendererFeature::add_render_passes) queues the mask pass, then the edge
/// pass. Nothing is built until the first `build`/`create` call.
pub struct OutlineFeature {
    config: OutlineFeatureConfig,
    mask_pass: Option<MaskRenderPass>,
    edge_pass: Option<EdgeCompositePass>,
}

impl OutlineFeature {
    /// Feature holding `config`, passes not built yet.
    #[must_use]
    pub fn new(config: OutlineFeatureConfig) -> Self {
        Self {
            config,
            mask_pass: None,
            edge_pass: None,
        }
    }

    /// Rebuild both passes from the current configuration.
    pub fn build(&mut self) {
        let mask_id = TargetId::from_name(&self.config.render_target_name);
        let mask_pass = MaskRenderPass::new(
            MASK_PROFILER_TAG,
            mask_id,
            self.config.layer_mask,
        );
        let mut edge_pass = EdgeCompositePass::new(
            mask_id,
            self.config.sobel.clone(),
            self.config.blit.clone(),
        );
        edge_pass.set_event(RenderPassEvent::AfterRenderingTransparents);
        if edge_pass.scratch_target() == mask_id {
            let renamed = format!(
                "{}_{SCRATCH_TARGET_NAME}",
                self.config.render_target_name
            );
            log::warn!(
                "mask target '{}' collides with the scratch target, \
                 allocating scratch as '{renamed}'",
                self.config.render_target_name
            );
            edge_pass.set_scratch_target(TargetId::from_name(&renamed));
        }

        log::info!(
            "outline feature built: mask '{}' ({mask_id}), layers {:#010x}, \
             sobel {}, blit {}",
            self.config.render_target_name,
            self.config.layer_mask.0,
            describe(&self.config.sobel),
            describe(&self.config.blit),
        );
        self.mask_pass = Some(mask_pass);
        self.edge_pass = Some(edge_pass);
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &OutlineFeatureConfig {
        &self.config
    }

    /// Replace the configuration and rebuild.
    pub fn set_config(&mut self, config: OutlineFeatureConfig) {
        self.config = config;
        self.build();
    }

    /// Mask pass, once built.
    #[must_use]
    pub fn mask_pass(&self) -> Option<&MaskRenderPass> {
        self.mask_pass.as_ref()
    }

    /// Edge pass, once built.
    #[must_use]
    pub fn edge_pass(&self) -> Option<&EdgeCompositePass> {
        self.edge_pass.as_ref()
    }
}

fn describe(binding: &PassIndexedMaterial) -> String {
    match binding.material() {
        Some(material) => {
            format!("'{}' pass {}", material.name(), binding.pass_index())
        }
        None => "unset".to_owned(),
    }
}

impl RendererFeature for OutlineFeature {
    fn name(&self) -> &str {
        "Outline"
    }

    fn create(&mut self) {
        self.build();
    }

    fn add_render_passes<'a>(
        &'a mut self,
        queue: &mut PassQueue<'a>,
        _frame: &FrameData,
    ) {
        let (Some(mask), Some(edge)) =
            (self.mask_pass.as_mut(), self.edge_pass.as_mut())
        else {
            log::debug!("outline feature not built, no passes queued");
            return;
        };
        queue.enqueue(mask);
        queue.enqueue(edge);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::filter::CullingResults;
    use crate::renderer::outline::builtin::register_builtin_materials;
    use crate::renderer::pass::{CameraData, RenderPass};
    use crate::renderer::material::MaterialLibrary;

    fn config() -> OutlineFeatureConfig {
        let mut library = MaterialLibrary::new();
        let builtins = register_builtin_materials(&mut library);
        OutlineFeatureConfig {
            render_target_name: DEFAULT_RENDER_TARGET_NAME.to_owned(),
            layer_mask: LayerMask::from_layer(8),
            sobel: PassIndexedMaterial::new(Some(builtins.sobel), 0),
            blit: PassIndexedMaterial::new(Some(builtins.composite), 1),
        }
    }

    fn frame() -> FrameData {
        FrameData {
            camera: CameraData::new("Main", 8, 8),
            culling: CullingResults::default(),
        }
    }

    #[test]
    fn nothing_queued_before_build() {
        let mut feature = OutlineFeature::new(config());
        let frame = frame();
        let mut queue = PassQueue::new();
        feature.add_render_passes(&mut queue, &frame);
        assert!(queue.is_empty());
    }

    #[test]
    fn mask_pass_queued_before_edge_pass() {
        let mut feature = OutlineFeature::new(config());
        feature.create();
        let frame = frame();
        let mut queue = PassQueue::new();
        feature.add_render_passes(&mut queue, &frame);
        assert_eq!(queue.names(), vec![MASK_PROFILER_TAG, "SobelFilter"]);
    }

    #[test]
    fn passes_share_mask_id() {
        let mut feature = OutlineFeature::new(config());
        feature.build();
        let mask = feature.mask_pass().unwrap();
        let edge = feature.edge_pass().unwrap();
        assert_eq!(mask.mask_id(), edge.mask_id());
        assert_eq!(
            mask.mask_id(),
            TargetId::from_name(DEFAULT_RENDER_TARGET_NAME)
        );
    }

    #[test]
    fn rebuild_is_idempotent() {
        let mut feature = OutlineFeature::new(config());
        feature.build();
        let first = {
            let edge = feature.edge_pass().unwrap();
            (edge.event(), edge.sobel().clone(), edge.blit().clone())
        };
        feature.build();
        let edge = feature.edge_pass().unwrap();
        assert_eq!(first.0, RenderPassEvent::AfterRenderingTransparents);
        assert_eq!(edge.event(), first.0);
        assert_eq!(edge.sobel(), &first.1);
        assert_eq!(edge.blit(), &first.2);
        assert_eq!(edge.sobel().pass_index(), 0);
        assert_eq!(edge.blit().pass_index(), 1);
    }

    #[test]
    fn set_config_rebuilds_with_new_target_name() {
        let mut feature = OutlineFeature::new(config());
        feature.build();
        let mut changed = config();
        changed.render_target_name = "_Other".to_owned();
        feature.set_config(changed);
        assert_eq!(
            feature.mask_pass().unwrap().mask_id(),
            TargetId::from_name("_Other")
        );
    }

    #[test]
    fn scratch_target_moves_off_a_colliding_mask_name() {
        let mut colliding = config();
        colliding.render_target_name = SCRATCH_TARGET_NAME.to_owned();
        let mut feature = OutlineFeature::new(colliding);
        feature.build();
        let mask_id = feature.mask_pass().unwrap().mask_id();
        let edge = feature.edge_pass().unwrap();
        assert_eq!(mask_id, TargetId::from_name(SCRATCH_TARGET_NAME));
        assert_eq!(edge.mask_id(), mask_id);
        assert_ne!(edge.scratch_target(), mask_id);
        assert_eq!(
            edge.scratch_target(),
            TargetId::from_name("tmpOutlineRT_tmpOutlineRT")
        );

        feature.set_config(config());
        assert_eq!(
            feature.edge_pass().unwrap().scratch_target(),
            TargetId::from_name(SCRATCH_TARGET_NAME)
        );
    }
}
