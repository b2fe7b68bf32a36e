//! Offscreen target identifiers, descriptors and per-pass target state.

use std::fmt;
use std::hash::Hasher;

use glam::Vec4;
use rustc_hash::FxHasher;

/// Stable numeric id for a logical target name.
///
/// The same name always hashes to the same id, across pipeline rebuilds
/// and across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u32);

impl TargetId {
    /// Intern a logical target name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let mut hasher = FxHasher::default();
        hasher.write(name.as_bytes());
        let hash = hasher.finish();
        Self((hash ^ (hash >> 32)) as u32)
    }

    /// Raw id value.
    #[must_use]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08x}", self.0)
    }
}

/// Color storage format of an offscreen target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorFormat {
    /// 8 bits per channel unsigned normalized RGBA, 32 bits per pixel.
    #[default]
    Argb32,
    /// 16-bit float per channel.
    ArgbHalf,
    /// 32-bit float per channel.
    ArgbFloat,
}

impl ColorFormat {
    /// Bytes per pixel.
    #[must_use]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Argb32 => 4,
            Self::ArgbHalf => 8,
            Self::ArgbFloat => 16,
        }
    }

    /// Whether stored values are clamped to `[0, 1]`.
    #[must_use]
    pub fn is_normalized(self) -> bool {
        matches!(self, Self::Argb32)
    }
}

/// Texture filtering used when a target is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Nearest texel.
    #[default]
    Point,
    /// Bilinear interpolation between the four nearest texels.
    Bilinear,
}

/// Everything needed to allocate an offscreen target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetDescriptor {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Color format.
    pub format: ColorFormat,
    /// Sampling filter.
    pub filter: FilterMode,
    /// Depth buffer bits; 0 means no depth attachment.
    pub depth_bits: u32,
}

impl TargetDescriptor {
    /// Color-only descriptor with point filtering.
    #[must_use]
    pub fn new(width: u32, height: u32, format: ColorFormat) -> Self {
        Self {
            width,
            height,
            format,
            filter: FilterMode::Point,
            depth_bits: 0,
        }
    }

    /// Same descriptor with a different filter.
    #[must_use]
    pub fn with_filter(mut self, filter: FilterMode) -> Self {
        self.filter = filter;
        self
    }

    /// Same descriptor with a different depth precision.
    #[must_use]
    pub fn with_depth_bits(mut self, depth_bits: u32) -> Self {
        self.depth_bits = depth_bits;
        self
    }

    /// Number of pixels.
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Approximate GPU memory footprint in bytes (color + depth).
    #[must_use]
    pub fn byte_size(&self) -> usize {
        let depth = self.depth_bits.div_ceil(8) as usize;
        self.pixel_count() * (self.format.bytes_per_pixel() + depth)
    }
}

/// A render destination or shader input as seen by a recorded command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTargetIdentifier {
    /// A frame-scoped temporary allocated under the given id.
    Temporary(TargetId),
    /// The camera's live color target.
    CameraColor,
    /// The camera's live depth target.
    CameraDepth,
}

impl fmt::Display for RenderTargetIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temporary(id) => write!(f, "temporary {id}"),
            Self::CameraColor => write!(f, "camera color"),
            Self::CameraDepth => write!(f, "camera depth"),
        }
    }
}

impl From<TargetId> for RenderTargetIdentifier {
    fn from(id: TargetId) -> Self {
        Self::Temporary(id)
    }
}

/// Which attachments are cleared when a pass binds its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClearFlag {
    /// Keep existing contents.
    #[default]
    None,
    /// Clear color only.
    Color,
    /// Clear depth only.
    Depth,
    /// Clear color and depth.
    All,
}

impl ClearFlag {
    /// Whether the color attachment is cleared.
    #[must_use]
    pub fn clears_color(self) -> bool {
        matches!(self, Self::Color | Self::All)
    }

    /// Whether the depth attachment is cleared.
    #[must_use]
    pub fn clears_depth(self) -> bool {
        matches!(self, Self::Depth | Self::All)
    }
}

/// Destination and clear policy a pass declares for its execute step.
///
/// Defaults to the camera's color and depth targets with no clear.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassTarget {
    /// Color destination.
    pub color: RenderTargetIdentifier,
    /// Optional depth attachment.
    pub depth: Option<RenderTargetIdentifier>,
    /// Clear policy applied when the target is bound.
    pub clear: ClearFlag,
    /// Clear color used when `clear` includes color.
    pub clear_color: Vec4,
}

impl Default for PassTarget {
    fn default() -> Self {
        Self {
            color: RenderTargetIdentifier::CameraColor,
            depth: Some(RenderTargetIdentifier::CameraDepth),
            clear: ClearFlag::None,
            clear_color: Vec4::ZERO,
        }
    }
}

impl PassTarget {
    /// Declare the color destination and optional depth attachment.
    pub fn configure_target(
        &mut self,
        color: RenderTargetIdentifier,
        depth: Option<RenderTargetIdentifier>,
    ) {
        self.color = color;
        self.depth = depth;
    }

    /// Declare the clear policy.
    pub fn configure_clear(&mut self, clear: ClearFlag, color: Vec4) {
        self.clear = clear;
        self.clear_color = color;
    }

    /// Back to the camera target with no clear.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_id_is_stable_per_name() {
        let a = TargetId::from_name("_RenderOutlineRT");
        let b = TargetId::from_name("_RenderOutlineRT");
        let c = TargetId::from_name("tmpOutlineRT");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn byte_size_counts_depth() {
        let color_only = TargetDescriptor::new(4, 2, ColorFormat::Argb32);
        assert_eq!(color_only.byte_size(), 32);
        assert_eq!(color_only.with_depth_bits(24).byte_size(), 56);
    }

    #[test]
    fn clear_flag_channels() {
        assert!(ClearFlag::Color.clears_color());
        assert!(!ClearFlag::Color.clears_depth());
        assert!(ClearFlag::All.clears_depth());
        assert!(!ClearFlag::None.clears_color());
    }

    #[test]
    fn pass_target_defaults_to_camera() {
        let mut target = PassTarget::default();
        assert_eq!(target.color, RenderTargetIdentifier::CameraColor);
        target.configure_target(TargetId::from_name("mask").into(), None);
        target.configure_clear(ClearFlag::Color, Vec4::ZERO);
        assert_eq!(target.depth, None);
        target.reset();
        assert_eq!(target, PassTarget::default());
    }
}
