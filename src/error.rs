//! Crate-level error types.

use std::fmt;

use crate::gpu::render_context::RenderContextError;
use crate::renderer::target::{RenderTargetIdentifier, TargetId};

/// Errors produced by the outline crate.
#[derive(Debug)]
pub enum OutlineError {
    /// GPU context initialization failure.
    Gpu(RenderContextError),
    /// An offscreen target could not be allocated.
    TargetAllocation {
        /// Id the allocation was requested under.
        id: TargetId,
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
        /// Backend-specific reason.
        reason: String,
    },
    /// A command referenced a target that is not alive this frame.
    UnknownTarget(RenderTargetIdentifier),
    /// A target was used in a way its backend cannot support.
    UnsupportedTarget {
        /// The offending target.
        target: RenderTargetIdentifier,
        /// What was attempted.
        usage: &'static str,
    },
    /// A blit referenced a material pass the backend has no program for.
    MissingProgram {
        /// Material name.
        material: String,
        /// Requested pass index.
        pass: usize,
    },
    /// A pass index outside the material's pass range was rejected.
    PassIndexOutOfRange {
        /// Material name.
        material: String,
        /// Requested pass index.
        index: usize,
        /// Number of passes the material exposes.
        pass_count: usize,
    },
    /// A draw or clear was issued without a bound render target.
    NoRenderTarget,
    /// WGSL composition or validation failure.
    Shader(String),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// Image export failure.
    Export(String),
}

impl fmt::Display for OutlineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::TargetAllocation {
                id,
                width,
                height,
                reason,
            } => write!(
                f,
                "failed to allocate target {id} ({width}x{height}): {reason}"
            ),
            Self::UnknownTarget(target) => {
                write!(f, "target {target} is not allocated")
            }
            Self::UnsupportedTarget { target, usage } => {
                write!(f, "target {target} cannot be used as {usage}")
            }
            Self::MissingProgram { material, pass } => {
                write!(f, "no program for material '{material}' pass {pass}")
            }
            Self::PassIndexOutOfRange {
                material,
                index,
                pass_count,
            } => write!(
                f,
                "pass index {index} out of range for material '{material}' \
                 ({pass_count} passes)"
            ),
            Self::NoRenderTarget => write!(f, "no render target bound"),
            Self::Shader(msg) => write!(f, "shader error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::Export(msg) => write!(f, "export error: {msg}"),
        }
    }
}

impl std::error::Error for OutlineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RenderContextError> for OutlineError {
    fn from(e: RenderContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<std::io::Error> for OutlineError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
