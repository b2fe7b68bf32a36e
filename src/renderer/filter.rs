//! Renderer selection: layer masks, shader tags, queue ranges and sorting.
//!
//! The host hands passes a [`CullingResults`] list every frame. A
//! [`FilterSettings`] decides which of those renderers a draw touches, a
//! [`DrawingSettings`] decides the order they are drawn in.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::material::BlendMode;

/// Bitmask over the 32 scene layers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Matches no layer.
    pub const NOTHING: Self = Self(0);
    /// Matches every layer.
    pub const EVERYTHING: Self = Self(u32::MAX);

    /// Mask selecting a single layer. Layers above 31 select nothing.
    #[must_use]
    pub fn from_layer(layer: u8) -> Self {
        Self::NOTHING.with_layer(layer)
    }

    /// Mask selecting every listed layer.
    #[must_use]
    pub fn from_layers(layers: &[u8]) -> Self {
        layers
            .iter()
            .fold(Self::NOTHING, |mask, &layer| mask.with_layer(layer))
    }

    /// This mask plus one more layer.
    #[must_use]
    pub fn with_layer(self, layer: u8) -> Self {
        match 1u32.checked_shl(u32::from(layer)) {
            Some(bit) => Self(self.0 | bit),
            None => self,
        }
    }

    /// Whether `layer` is selected.
    #[must_use]
    pub fn contains(self, layer: u8) -> bool {
        1u32.checked_shl(u32::from(layer))
            .is_some_and(|bit| self.0 & bit != 0)
    }

    /// Whether no layer is selected.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Name of the render-pipeline tag a material pass declares.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderTagId(Cow<'static, str>);

impl ShaderTagId {
    /// Tag implied by passes that declare none.
    pub const DEFAULT_UNLIT: Self = Self(Cow::Borrowed("SRPDefaultUnlit"));
    /// Standard forward pass.
    pub const FORWARD: Self = Self(Cow::Borrowed("UniversalForward"));
    /// Forward-only pass (no deferred variant).
    pub const FORWARD_ONLY: Self =
        Self(Cow::Borrowed("UniversalForwardOnly"));
    /// Legacy lightweight forward pass.
    pub const LIGHTWEIGHT_FORWARD: Self =
        Self(Cow::Borrowed("LightweightForward"));

    /// The four forward-rendering tags the outline mask draws.
    pub const FORWARD_TAGS: [Self; 4] = [
        Self::DEFAULT_UNLIT,
        Self::FORWARD,
        Self::FORWARD_ONLY,
        Self::LIGHTWEIGHT_FORWARD,
    ];

    /// Tag from an arbitrary name.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Tag name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShaderTagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inclusive range of render queue values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderQueueRange {
    /// Lowest queue included.
    pub lower: u32,
    /// Highest queue included.
    pub upper: u32,
}

impl RenderQueueRange {
    /// Every queue.
    pub const ALL: Self = Self {
        lower: 0,
        upper: 5000,
    };
    /// Opaque geometry (background through alpha test).
    pub const OPAQUE: Self = Self {
        lower: 0,
        upper: 2500,
    };
    /// Transparent geometry.
    pub const TRANSPARENT: Self = Self {
        lower: 2501,
        upper: 5000,
    };

    /// Whether `queue` falls inside the range.
    #[must_use]
    pub fn contains(self, queue: u32) -> bool {
        (self.lower..=self.upper).contains(&queue)
    }
}

impl Default for RenderQueueRange {
    fn default() -> Self {
        Self::ALL
    }
}

/// Host-assigned renderer identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RendererId(pub u32);

/// One renderer that survived the host's culling for this camera.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleRenderer {
    /// Host identity, echoed back in draw commands.
    pub id: RendererId,
    /// Scene layer, 0..=31.
    pub layer: u8,
    /// Tag of the renderer's material pass. `None` counts as
    /// [`ShaderTagId::DEFAULT_UNLIT`].
    pub shader_tag: Option<ShaderTagId>,
    /// Render queue value.
    pub render_queue: u32,
    /// View-space distance used for depth sorting.
    pub depth: f32,
}

impl VisibleRenderer {
    /// Effective tag used for matching.
    #[must_use]
    pub fn effective_tag(&self) -> &ShaderTagId {
        self.shader_tag.as_ref().unwrap_or(&ShaderTagId::DEFAULT_UNLIT)
    }
}

/// Per-camera culling output supplied by the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CullingResults {
    /// Renderers visible to the camera.
    pub visible: Vec<VisibleRenderer>,
}

/// Which renderers a draw call is eligible to touch.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSettings {
    /// Scene layers to draw.
    pub layer_mask: LayerMask,
    /// Material pass tags to draw.
    pub shader_tags: Vec<ShaderTagId>,
    /// Render queues to draw.
    pub render_queue: RenderQueueRange,
}

impl FilterSettings {
    /// Filter over the four forward tags and every queue.
    #[must_use]
    pub fn forward(layer_mask: LayerMask) -> Self {
        Self {
            layer_mask,
            shader_tags: ShaderTagId::FORWARD_TAGS.to_vec(),
            render_queue: RenderQueueRange::ALL,
        }
    }

    /// Whether a renderer passes the filter.
    #[must_use]
    pub fn matches(&self, renderer: &VisibleRenderer) -> bool {
        self.layer_mask.contains(renderer.layer)
            && self.render_queue.contains(renderer.render_queue)
            && self.shader_tags.contains(renderer.effective_tag())
    }
}

/// Draw ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortingCriteria {
    /// Queue ascending, then front to back.
    #[default]
    CommonOpaque,
    /// Queue ascending, then back to front.
    CommonTransparent,
    /// Culling order.
    None,
}

/// How matching renderers are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DrawingSettings {
    /// Draw ordering.
    pub sorting: SortingCriteria,
}

/// Depth test and write state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthState {
    /// Whether depth is written.
    pub write: bool,
    /// Whether depth is tested (less-or-equal).
    pub test: bool,
}

/// Render state overrides applied to every renderer in a draw.
///
/// The default overrides nothing: renderers draw with their own state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStateBlock {
    /// Depth override.
    pub depth: Option<DepthState>,
    /// Blend override.
    pub blend: Option<BlendMode>,
}

impl RenderStateBlock {
    /// Nothing overridden.
    pub const NOTHING: Self = Self {
        depth: None,
        blend: None,
    };
}

/// Filter `culling` and return the matching ids in draw order.
#[must_use]
pub fn select_renderers(
    culling: &CullingResults,
    drawing: &DrawingSettings,
    filter: &FilterSettings,
) -> Vec<RendererId> {
    let mut matching: Vec<&VisibleRenderer> = culling
        .visible
        .iter()
        .filter(|renderer| filter.matches(renderer))
        .collect();

    let by_depth = |a: &VisibleRenderer, b: &VisibleRenderer| {
        a.depth.partial_cmp(&b.depth).unwrap_or(Ordering::Equal)
    };
    match drawing.sorting {
        SortingCriteria::CommonOpaque => matching.sort_by(|a, b| {
            a.render_queue
                .cmp(&b.render_queue)
                .then_with(|| by_depth(a, b))
                .then_with(|| a.id.cmp(&b.id))
        }),
        SortingCriteria::CommonTransparent => matching.sort_by(|a, b| {
            a.render_queue
                .cmp(&b.render_queue)
                .then_with(|| by_depth(b, a))
                .then_with(|| a.id.cmp(&b.id))
        }),
        SortingCriteria::None => {}
    }

    matching.into_iter().map(|renderer| renderer.id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer(
        id: u32,
        layer: u8,
        tag: Option<ShaderTagId>,
        depth: f32,
    ) -> VisibleRenderer {
        VisibleRenderer {
            id: RendererId(id),
            layer,
            shader_tag: tag,
            render_queue: 2000,
            depth,
        }
    }

    #[test]
    fn layer_mask_bits() {
        let mask = LayerMask::from_layers(&[0, 5]);
        assert!(mask.contains(0));
        assert!(mask.contains(5));
        assert!(!mask.contains(4));
        assert!(!LayerMask::from_layer(40).contains(40));
        assert!(LayerMask::NOTHING.is_empty());
        assert!(LayerMask::EVERYTHING.contains(31));
    }

    #[test]
    fn untagged_renderer_counts_as_default_unlit() {
        let filter = FilterSettings::forward(LayerMask::EVERYTHING);
        assert!(filter.matches(&renderer(1, 0, None, 1.0)));
        assert!(filter.matches(&renderer(
            2,
            0,
            Some(ShaderTagId::FORWARD_ONLY),
            1.0
        )));
        assert!(!filter.matches(&renderer(
            3,
            0,
            Some(ShaderTagId::new("ShadowCaster")),
            1.0
        )));
    }

    #[test]
    fn opaque_sort_is_front_to_back_within_queue() {
        let mut far_background = renderer(1, 3, None, 1.0);
        far_background.render_queue = 1000;
        let culling = CullingResults {
            visible: vec![
                renderer(4, 3, None, 9.0),
                renderer(2, 3, None, 2.0),
                far_background,
                renderer(3, 3, None, 2.0),
                renderer(5, 4, None, 0.5),
            ],
        };
        let ids = select_renderers(
            &culling,
            &DrawingSettings::default(),
            &FilterSettings::forward(LayerMask::from_layer(3)),
        );
        assert_eq!(
            ids,
            vec![RendererId(1), RendererId(2), RendererId(3), RendererId(4)]
        );
    }

    #[test]
    fn transparent_sort_is_back_to_front() {
        let culling = CullingResults {
            visible: vec![
                renderer(1, 0, None, 1.0),
                renderer(2, 0, None, 5.0),
            ],
        };
        let ids = select_renderers(
            &culling,
            &DrawingSettings {
                sorting: SortingCriteria::CommonTransparent,
            },
            &FilterSettings::forward(LayerMask::EVERYTHING),
        );
        assert_eq!(ids, vec![RendererId(2), RendererId(1)]);
    }

    #[test]
    fn empty_mask_selects_nothing() {
        let culling = CullingResults {
            visible: vec![renderer(1, 0, None, 1.0)],
        };
        let ids = select_renderers(
            &culling,
            &DrawingSettings::default(),
            &FilterSettings::forward(LayerMask::NOTHING),
        );
        assert!(ids.is_empty());
    }
}
