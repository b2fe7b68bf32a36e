//! CPU color and depth buffers.

use glam::{Vec2, Vec4};

use crate::renderer::target::{ColorFormat, FilterMode};

/// Sample positions closer than this to a texel center read that texel
/// exactly instead of interpolating.
const TEXEL_SNAP: f32 = 1e-4;

/// RGBA color buffer, row-major, origin top-left.
///
/// Argb32 images clamp every written channel into `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    format: ColorFormat,
    pixels: Vec<Vec4>,
}

impl Image {
    /// Transparent black image.
    #[must_use]
    pub fn new(width: u32, height: u32, format: ColorFormat) -> Self {
        Self::filled(width, height, format, Vec4::ZERO)
    }

    /// Image filled with `color`.
    #[must_use]
    pub fn filled(
        width: u32,
        height: u32,
        format: ColorFormat,
        color: Vec4,
    ) -> Self {
        let color = quantize(format, color);
        Self {
            width,
            height,
            format,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Storage format.
    #[must_use]
    pub fn format(&self) -> ColorFormat {
        self.format
    }

    /// All pixels, row-major.
    #[must_use]
    pub fn pixels(&self) -> &[Vec4] {
        &self.pixels
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| y as usize * self.width as usize + x as usize)
    }

    /// Pixel at `(x, y)`.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<Vec4> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Write a pixel; out-of-bounds writes are dropped.
    pub fn set(&mut self, x: u32, y: u32, color: Vec4) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = quantize(self.format, color);
        }
    }

    /// Overwrite every pixel.
    pub fn fill(&mut self, color: Vec4) {
        let color = quantize(self.format, color);
        self.pixels.fill(color);
    }

    /// Texel with clamp-to-edge addressing.
    #[must_use]
    pub fn texel(&self, x: i64, y: i64) -> Vec4 {
        if self.pixels.is_empty() {
            return Vec4::ZERO;
        }
        let x = x.clamp(0, i64::from(self.width) - 1) as usize;
        let y = y.clamp(0, i64::from(self.height) - 1) as usize;
        self.pixels[y * self.width as usize + x]
    }

    /// Sample at texel-space position `p` (texel centers at integers).
    #[must_use]
    pub fn sample(&self, p: Vec2, filter: FilterMode) -> Vec4 {
        let snapped = p.round();
        if (p - snapped).abs().max_element() < TEXEL_SNAP {
            return self.texel(snapped.x as i64, snapped.y as i64);
        }
        match filter {
            FilterMode::Point => self.texel(snapped.x as i64, snapped.y as i64),
            FilterMode::Bilinear => {
                let base = p.floor();
                let t = p - base;
                let (x, y) = (base.x as i64, base.y as i64);
                let top = self.texel(x, y).lerp(self.texel(x + 1, y), t.x);
                let bottom =
                    self.texel(x, y + 1).lerp(self.texel(x + 1, y + 1), t.x);
                top.lerp(bottom, t.y)
            }
        }
    }

    /// Coordinates of every pixel that differs from `other`.
    ///
    /// Images of different sizes differ everywhere in `self`.
    #[must_use]
    pub fn differing_pixels(&self, other: &Self) -> Vec<(u32, u32)> {
        let same_size =
            self.width == other.width && self.height == other.height;
        let mut out = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                if !same_size || self.get(x, y) != other.get(x, y) {
                    out.push((x, y));
                }
            }
        }
        out
    }

    /// 8-bit RGBA bytes, row-major.
    #[must_use]
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|p| {
                p.clamp(Vec4::ZERO, Vec4::ONE)
                    .to_array()
                    .map(|c| (c * 255.0).round() as u8)
            })
            .collect()
    }
}

fn quantize(format: ColorFormat, color: Vec4) -> Vec4 {
    if format.is_normalized() {
        color.clamp(Vec4::ZERO, Vec4::ONE)
    } else {
        color
    }
}

/// Depth buffer, 0 is near and 1 is far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DepthBuffer {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl DepthBuffer {
    /// Buffer cleared to the far plane.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            values: vec![1.0; width as usize * height as usize],
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Depth at `(x, y)`.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        (x < self.width && y < self.height)
            .then(|| self.values[y as usize * self.width as usize + x as usize])
    }

    /// Write depth at `(x, y)`; out-of-bounds writes are dropped.
    pub fn set(&mut self, x: u32, y: u32, depth: f32) {
        if x < self.width && y < self.height {
            self.values[y as usize * self.width as usize + x as usize] = depth;
        }
    }

    /// Overwrite every value.
    pub fn clear(&mut self, depth: f32) {
        self.values.fill(depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argb32_clamps_writes() {
        let mut image = Image::new(2, 2, ColorFormat::Argb32);
        image.set(0, 0, Vec4::new(2.0, -1.0, 0.5, 1.5));
        assert_eq!(image.get(0, 0), Some(Vec4::new(1.0, 0.0, 0.5, 1.0)));

        let mut hdr = Image::new(1, 1, ColorFormat::ArgbHalf);
        hdr.set(0, 0, Vec4::splat(3.0));
        assert_eq!(hdr.get(0, 0), Some(Vec4::splat(3.0)));
    }

    #[test]
    fn sampling_at_texel_centers_is_exact() {
        let mut image = Image::new(3, 1, ColorFormat::ArgbFloat);
        image.set(1, 0, Vec4::ONE);
        let p = Vec2::new(1.0 + 5e-5, 0.0);
        assert_eq!(image.sample(p, FilterMode::Bilinear), Vec4::ONE);
    }

    #[test]
    fn bilinear_interpolates_between_texels() {
        let mut image = Image::new(2, 1, ColorFormat::ArgbFloat);
        image.set(1, 0, Vec4::ONE);
        let mid = image.sample(Vec2::new(0.5, 0.0), FilterMode::Bilinear);
        assert!((mid - Vec4::splat(0.5)).abs().max_element() < 1e-6);
        let point = image.sample(Vec2::new(0.75, 0.0), FilterMode::Point);
        assert_eq!(point, Vec4::ONE);
    }

    #[test]
    fn addressing_clamps_to_edge() {
        let image = Image::filled(2, 2, ColorFormat::Argb32, Vec4::ONE);
        assert_eq!(image.texel(-5, 9), Vec4::ONE);
    }

    #[test]
    fn differing_pixels_lists_changes() {
        let a = Image::new(2, 2, ColorFormat::Argb32);
        let mut b = a.clone();
        b.set(1, 0, Vec4::ONE);
        assert_eq!(a.differing_pixels(&b), vec![(1, 0)]);
        assert_eq!(b.to_rgba8()[4..8], [255, 255, 255, 255]);
    }

    #[test]
    fn depth_buffer_starts_far() {
        let mut depth = DepthBuffer::new(2, 1);
        assert_eq!(depth.get(1, 0), Some(1.0));
        depth.set(1, 0, 0.25);
        assert_eq!(depth.get(1, 0), Some(0.25));
        assert_eq!(depth.get(2, 0), None);
    }
}
