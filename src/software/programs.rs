//! CPU counterparts of the WGSL blit entry points.

use glam::{Vec2, Vec4};

use super::image::Image;
use crate::renderer::material::BlendMode;
use crate::renderer::target::FilterMode;

/// A full-screen fragment program evaluated on the CPU.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlitProgram {
    /// Sobel gradient magnitude of source alpha, sampled `radius` texels
    /// out, written to every channel.
    Sobel {
        /// Sample offset in texels.
        radius: f32,
    },
    /// Source color unchanged.
    Copy,
    /// `(tint.rgb, tint.a * source.a)`, meant for alpha blending.
    AlphaComposite,
    /// `(tint.rgb, tint.a * source.a)`, meant for additive blending.
    Additive,
}

impl BlitProgram {
    /// Program implementing a built-in fragment entry point.
    #[must_use]
    pub fn for_entry_point(entry_point: &str) -> Option<Self> {
        match entry_point {
            "fs_sobel" => Some(Self::Sobel { radius: 1.0 }),
            "fs_sobel_wide" => Some(Self::Sobel { radius: 2.0 }),
            "fs_copy" => Some(Self::Copy),
            "fs_alpha_composite" => Some(Self::AlphaComposite),
            "fs_additive" => Some(Self::Additive),
            _ => None,
        }
    }

    /// Shade one fragment sampling `source` at texel-space position `p`.
    #[must_use]
    pub fn shade(
        self,
        source: &Image,
        filter: FilterMode,
        p: Vec2,
        tint: Vec4,
    ) -> Vec4 {
        let sample = |offset: Vec2| source.sample(p + offset, filter);
        match self {
            Self::Sobel { radius } => {
                let mask = |dx: f32, dy: f32| {
                    sample(Vec2::new(dx, dy) * radius).w
                };
                let tl = mask(-1.0, -1.0);
                let t = mask(0.0, -1.0);
                let tr = mask(1.0, -1.0);
                let l = mask(-1.0, 0.0);
                let r = mask(1.0, 0.0);
                let bl = mask(-1.0, 1.0);
                let b = mask(0.0, 1.0);
                let br = mask(1.0, 1.0);

                let gx = (tr + 2.0 * r + br) - (tl + 2.0 * l + bl);
                let gy = (bl + 2.0 * b + br) - (tl + 2.0 * t + tr);
                Vec4::splat(gx.hypot(gy).clamp(0.0, 1.0))
            }
            Self::Copy => sample(Vec2::ZERO),
            Self::AlphaComposite | Self::Additive => {
                tint.truncate().extend(tint.w * sample(Vec2::ZERO).w)
            }
        }
    }
}

/// Combine a shaded fragment with the destination.
#[must_use]
pub fn blend(mode: BlendMode, src: Vec4, dst: Vec4) -> Vec4 {
    match mode {
        BlendMode::Opaque => src,
        BlendMode::AlphaBlend => {
            let rgb = src.truncate() * src.w + dst.truncate() * (1.0 - src.w);
            rgb.extend(src.w + dst.w * (1.0 - src.w))
        }
        BlendMode::Additive => {
            (dst.truncate() + src.truncate() * src.w).extend(dst.w)
        }
    }
}

/// Run `program` over every pixel of a `width`x`height` destination,
/// mapping destination pixel centers onto `source`.
#[must_use]
pub fn run(
    program: BlitProgram,
    source: &Image,
    filter: FilterMode,
    width: u32,
    height: u32,
    tint: Vec4,
) -> Vec<Vec4> {
    let scale = Vec2::new(
        source.width() as f32 / width.max(1) as f32,
        source.height() as f32 / height.max(1) as f32,
    );
    let mut out = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        for x in 0..width {
            let center = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let p = center * scale - Vec2::splat(0.5);
            out.push(program.shade(source, filter, p, tint));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::target::ColorFormat;

    fn square_mask() -> Image {
        let mut mask = Image::new(8, 8, ColorFormat::Argb32);
        for y in 2..6 {
            for x in 2..6 {
                mask.set(x, y, Vec4::ONE);
            }
        }
        mask
    }

    fn edges(mask: &Image, radius: f32) -> Vec<Vec4> {
        run(
            BlitProgram::Sobel { radius },
            mask,
            FilterMode::Bilinear,
            8,
            8,
            Vec4::ONE,
        )
    }

    #[test]
    fn sobel_is_zero_in_flat_regions() {
        let out = edges(&square_mask(), 1.0);
        // Interior and far exterior.
        assert_eq!(out[3 * 8 + 3], Vec4::ZERO);
        assert_eq!(out[0], Vec4::ZERO);
    }

    #[test]
    fn sobel_marks_silhouette_boundary() {
        let out = edges(&square_mask(), 1.0);
        // Inside pixel on the left edge and outside neighbour both respond.
        assert!(out[3 * 8 + 2].w > 0.0);
        assert!(out[3 * 8 + 1].w > 0.0);
        assert_eq!(out[3 * 8 + 1], Vec4::splat(1.0));
    }

    #[test]
    fn wide_sobel_reaches_further() {
        let mask = square_mask();
        assert_eq!(edges(&mask, 1.0)[3 * 8], Vec4::ZERO);
        assert!(edges(&mask, 2.0)[3 * 8].w > 0.0);
    }

    #[test]
    fn zero_edge_composites_leave_destination_unchanged() {
        let dst = Vec4::new(0.3, 0.2, 0.1, 1.0);
        let empty = Image::new(1, 1, ColorFormat::Argb32);
        let tint = Vec4::new(1.0, 0.5, 0.0, 1.0);
        for (program, mode) in [
            (BlitProgram::AlphaComposite, BlendMode::AlphaBlend),
            (BlitProgram::Additive, BlendMode::Additive),
        ] {
            let src =
                program.shade(&empty, FilterMode::Point, Vec2::ZERO, tint);
            assert_eq!(blend(mode, src, dst), dst);
        }
    }

    #[test]
    fn full_edge_alpha_composite_paints_tint() {
        let edge = Image::filled(1, 1, ColorFormat::Argb32, Vec4::ONE);
        let tint = Vec4::new(1.0, 0.5, 0.0, 1.0);
        let src = BlitProgram::AlphaComposite.shade(
            &edge,
            FilterMode::Point,
            Vec2::ZERO,
            tint,
        );
        let out = blend(BlendMode::AlphaBlend, src, Vec4::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(out, tint);
    }

    #[test]
    fn entry_points_map_to_programs() {
        assert_eq!(
            BlitProgram::for_entry_point("fs_sobel_wide"),
            Some(BlitProgram::Sobel { radius: 2.0 })
        );
        assert_eq!(BlitProgram::for_entry_point("fs_unknown"), None);
    }
}
