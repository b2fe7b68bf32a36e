//! Flat 2D scene used by the CPU reference backend.
//!
//! Objects are screen-space shapes with a constant depth. The scene plays
//! the host's role: it culls against the camera and renders the baseline
//! opaque image the outline is composited onto.

use glam::{Vec2, Vec4};
use rustc_hash::FxHashMap;

use super::image::{DepthBuffer, Image};
use crate::renderer::filter::{
    CullingResults, LayerMask, RendererId, ShaderTagId, VisibleRenderer,
};
use crate::renderer::target::ColorFormat;

/// Screen-space shape in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Axis-aligned rectangle, `min` inclusive, `max` exclusive.
    Rect {
        /// Top-left corner.
        min: Vec2,
        /// Bottom-right corner.
        max: Vec2,
    },
    /// Disc.
    Circle {
        /// Center.
        center: Vec2,
        /// Radius.
        radius: f32,
    },
}

impl Shape {
    /// Whether the point `p` lies inside.
    #[must_use]
    pub fn contains(&self, p: Vec2) -> bool {
        match *self {
            Self::Rect { min, max } => {
                p.x >= min.x && p.y >= min.y && p.x < max.x && p.y < max.y
            }
            Self::Circle { center, radius } => {
                p.distance_squared(center) <= radius * radius
            }
        }
    }

    /// Axis-aligned bounds as `(min, max)`.
    #[must_use]
    pub fn bounds(&self) -> (Vec2, Vec2) {
        match *self {
            Self::Rect { min, max } => (min, max),
            Self::Circle { center, radius } => {
                (center - Vec2::splat(radius), center + Vec2::splat(radius))
            }
        }
    }

    /// Whether the pixel `(x, y)` is covered, sampled at its center.
    #[must_use]
    pub fn covers(&self, x: u32, y: u32) -> bool {
        self.contains(Vec2::new(x as f32 + 0.5, y as f32 + 0.5))
    }
}

/// One renderable object.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    /// Identity echoed back by draw commands.
    pub id: RendererId,
    /// Debug name.
    pub name: String,
    /// Coverage.
    pub shape: Shape,
    /// Scene layer, 0..=31.
    pub layer: u8,
    /// Material pass tag; `None` counts as `SRPDefaultUnlit`.
    pub shader_tag: Option<ShaderTagId>,
    /// Render queue.
    pub render_queue: u32,
    /// Depth in `0.0..=1.0`, 0 nearest.
    pub depth: f32,
    /// Unlit surface color.
    pub color: Vec4,
}

/// A scene of flat objects plus named layers.
#[derive(Debug, Clone)]
pub struct SoftwareScene {
    objects: Vec<SceneObject>,
    layers: FxHashMap<String, u8>,
    background: Vec4,
    next_id: u32,
}

impl Default for SoftwareScene {
    fn default() -> Self {
        Self {
            objects: Vec::new(),
            layers: FxHashMap::default(),
            background: Vec4::new(0.1, 0.1, 0.12, 1.0),
            next_id: 0,
        }
    }
}

impl SoftwareScene {
    /// Empty scene with a dark background.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Name a layer index.
    pub fn name_layer(&mut self, name: &str, layer: u8) {
        let _ = self.layers.insert(name.to_owned(), layer);
    }

    /// Layer index by name.
    #[must_use]
    pub fn layer(&self, name: &str) -> Option<u8> {
        self.layers.get(name).copied()
    }

    /// Mask over the named layers; unknown names are ignored.
    #[must_use]
    pub fn layer_mask(&self, names: &[&str]) -> LayerMask {
        names
            .iter()
            .filter_map(|name| self.layer(name))
            .fold(LayerMask::NOTHING, LayerMask::with_layer)
    }

    /// Background color.
    #[must_use]
    pub fn background(&self) -> Vec4 {
        self.background
    }

    /// Replace the background color.
    pub fn set_background(&mut self, color: Vec4) {
        self.background = color;
    }

    /// Add an opaque object on `layer` in the geometry queue with the
    /// `UniversalForward` tag. Returns its id.
    pub fn add(
        &mut self,
        name: &str,
        shape: Shape,
        layer: u8,
        depth: f32,
        color: Vec4,
    ) -> RendererId {
        self.push(SceneObject {
            id: RendererId(0),
            name: name.to_owned(),
            shape,
            layer,
            shader_tag: Some(ShaderTagId::FORWARD),
            render_queue: 2000,
            depth,
            color,
        })
    }

    /// Add a fully described object; its id is reassigned. Returns the id.
    pub fn push(&mut self, mut object: SceneObject) -> RendererId {
        let id = RendererId(self.next_id);
        self.next_id += 1;
        object.id = id;
        self.objects.push(object);
        id
    }

    /// Every object, in insertion order.
    #[must_use]
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    /// Object by id.
    #[must_use]
    pub fn object(&self, id: RendererId) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.id == id)
    }

    /// Objects whose bounds overlap a `width`x`height` viewport.
    #[must_use]
    pub fn cull(&self, width: u32, height: u32) -> CullingResults {
        let viewport = Vec2::new(width as f32, height as f32);
        let visible = self
            .objects
            .iter()
            .filter(|object| {
                let (min, max) = object.shape.bounds();
                max.x > 0.0
                    && max.y > 0.0
                    && min.x < viewport.x
                    && min.y < viewport.y
            })
            .map(|object| VisibleRenderer {
                id: object.id,
                layer: object.layer,
                shader_tag: object.shader_tag.clone(),
                render_queue: object.render_queue,
                depth: object.depth,
            })
            .collect();
        CullingResults { visible }
    }

    /// Rasterize `object` with a less-or-equal depth test, calling `write`
    /// for every pixel that passes.
    pub fn rasterize(
        object: &SceneObject,
        depth: Option<&DepthBuffer>,
        width: u32,
        height: u32,
        mut write: impl FnMut(u32, u32),
    ) {
        let (min, max) = object.shape.bounds();
        let x0 = min.x.floor().max(0.0) as u32;
        let y0 = min.y.floor().max(0.0) as u32;
        let x1 = (max.x.ceil().max(0.0) as u32).min(width);
        let y1 = (max.y.ceil().max(0.0) as u32).min(height);
        for y in y0..y1 {
            for x in x0..x1 {
                if !object.shape.covers(x, y) {
                    continue;
                }
                let passes = depth
                    .and_then(|depth| depth.get(x, y))
                    .is_none_or(|stored| object.depth <= stored);
                if passes {
                    write(x, y);
                }
            }
        }
    }

    /// Render the opaque baseline: background, then every visible object
    /// front to back with depth test and write.
    #[must_use]
    pub fn render_opaque(&self, width: u32, height: u32) -> (Image, DepthBuffer) {
        let mut color =
            Image::filled(width, height, ColorFormat::Argb32, self.background);
        let mut depth = DepthBuffer::new(width, height);

        let mut order: Vec<&SceneObject> = self
            .cull(width, height)
            .visible
            .iter()
            .filter_map(|visible| self.object(visible.id))
            .collect();
        order.sort_by(|a, b| {
            a.render_queue
                .cmp(&b.render_queue)
                .then(a.depth.total_cmp(&b.depth))
                .then(a.id.cmp(&b.id))
        });

        for object in order {
            let mut covered = Vec::new();
            Self::rasterize(object, Some(&depth), width, height, |x, y| {
                covered.push((x, y));
            });
            for (x, y) in covered {
                color.set(x, y, object.color);
                depth.set(x, y, object.depth);
            }
        }
        (color, depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Shape {
        Shape::Rect {
            min: Vec2::new(x0, y0),
            max: Vec2::new(x1, y1),
        }
    }

    #[test]
    fn rect_covers_pixel_centers() {
        let shape = rect(1.0, 1.0, 3.0, 2.0);
        assert!(shape.covers(1, 1));
        assert!(shape.covers(2, 1));
        assert!(!shape.covers(3, 1));
        assert!(!shape.covers(1, 2));
    }

    #[test]
    fn cull_drops_offscreen_objects() {
        let mut scene = SoftwareScene::new();
        let on = scene.add("on", rect(0.0, 0.0, 2.0, 2.0), 0, 0.5, Vec4::ONE);
        let _off =
            scene.add("off", rect(50.0, 50.0, 60.0, 60.0), 0, 0.5, Vec4::ONE);
        let culling = scene.cull(10, 10);
        assert_eq!(culling.visible.len(), 1);
        assert_eq!(culling.visible[0].id, on);
    }

    #[test]
    fn nearer_object_wins_regardless_of_insertion_order() {
        let mut scene = SoftwareScene::new();
        let red = Vec4::new(1.0, 0.0, 0.0, 1.0);
        let blue = Vec4::new(0.0, 0.0, 1.0, 1.0);
        let _ = scene.add("far", rect(0.0, 0.0, 4.0, 4.0), 0, 0.8, red);
        let _ = scene.add("near", rect(1.0, 1.0, 3.0, 3.0), 0, 0.2, blue);
        let (color, depth) = scene.render_opaque(4, 4);
        assert_eq!(color.get(2, 2), Some(blue));
        assert_eq!(color.get(0, 0), Some(red));
        assert_eq!(depth.get(2, 2), Some(0.2));
        assert_eq!(color.get(0, 0).map(|c| c.w), Some(1.0));
    }

    #[test]
    fn layer_names_build_masks() {
        let mut scene = SoftwareScene::new();
        scene.name_layer("Default", 0);
        scene.name_layer("Outlined", 8);
        assert_eq!(
            scene.layer_mask(&["Outlined", "Missing"]),
            LayerMask::from_layer(8)
        );
        assert!(scene.layer_mask(&[]).is_empty());
    }
}
