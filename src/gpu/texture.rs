//! Render-target textures backing the outline's temporary targets.

use crate::renderer::target::{ColorFormat, FilterMode, TargetDescriptor};

/// wgpu color format for a target color format.
#[must_use]
pub fn color_format(format: ColorFormat) -> wgpu::TextureFormat {
    match format {
        ColorFormat::Argb32 => wgpu::TextureFormat::Rgba8Unorm,
        ColorFormat::ArgbHalf => wgpu::TextureFormat::Rgba16Float,
        ColorFormat::ArgbFloat => wgpu::TextureFormat::Rgba32Float,
    }
}

/// wgpu depth format for a depth precision, `None` for no depth.
#[must_use]
pub fn depth_format(depth_bits: u32) -> Option<wgpu::TextureFormat> {
    match depth_bits {
        0 => None,
        1..=16 => Some(wgpu::TextureFormat::Depth16Unorm),
        17..=24 => Some(wgpu::TextureFormat::Depth24Plus),
        _ => Some(wgpu::TextureFormat::Depth32Float),
    }
}

/// wgpu sampler filter for a target filter mode.
#[must_use]
pub fn filter_mode(filter: FilterMode) -> wgpu::FilterMode {
    match filter {
        FilterMode::Point => wgpu::FilterMode::Nearest,
        FilterMode::Bilinear => wgpu::FilterMode::Linear,
    }
}

/// A temporary render target: color texture, optional depth texture and a
/// sampler matching its filter mode.
///
/// The color texture is created with `RENDER_ATTACHMENT | TEXTURE_BINDING |
/// COPY_SRC` usage flags, so it can be drawn into, sampled by the next
/// blit and read back.
pub struct GpuTarget {
    /// Color texture.
    pub texture: wgpu::Texture,
    /// Default full-texture color view.
    pub view: wgpu::TextureView,
    /// Depth attachment view, when the descriptor asks for one.
    pub depth_view: Option<wgpu::TextureView>,
    /// Sampler used when this target is a blit source.
    pub sampler: wgpu::Sampler,
    /// Color format.
    pub format: wgpu::TextureFormat,
}

impl GpuTarget {
    /// Allocate textures for `descriptor`.
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        descriptor: &TargetDescriptor,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: descriptor.width,
            height: descriptor.height,
            depth_or_array_layers: 1,
        };
        let format = color_format(descriptor.format);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let depth_view = depth_format(descriptor.depth_bits).map(|format| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some(&format!("{label} Depth")),
                    size,
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        let sampler = super::pipeline_helpers::sampler(
            device,
            &format!("{label} Sampler"),
            filter_mode(descriptor.filter),
        );

        Self {
            texture,
            view,
            depth_view,
            sampler,
            format,
        }
    }

    /// Whether the color texture can be sampled with a filtering sampler
    /// without extra device features.
    #[must_use]
    pub fn is_filterable(&self) -> bool {
        self.format != wgpu::TextureFormat::Rgba32Float
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argb32_maps_to_rgba8_unorm() {
        assert_eq!(
            color_format(ColorFormat::Argb32),
            wgpu::TextureFormat::Rgba8Unorm
        );
        assert_eq!(
            color_format(ColorFormat::ArgbHalf),
            wgpu::TextureFormat::Rgba16Float
        );
    }

    #[test]
    fn depth_bits_pick_smallest_covering_format() {
        assert_eq!(depth_format(0), None);
        assert_eq!(depth_format(16), Some(wgpu::TextureFormat::Depth16Unorm));
        assert_eq!(depth_format(24), Some(wgpu::TextureFormat::Depth24Plus));
        assert_eq!(depth_format(32), Some(wgpu::TextureFormat::Depth32Float));
    }

    #[test]
    fn bilinear_maps_to_linear() {
        assert_eq!(filter_mode(FilterMode::Bilinear), wgpu::FilterMode::Linear);
        assert_eq!(filter_mode(FilterMode::Point), wgpu::FilterMode::Nearest);
    }
}
