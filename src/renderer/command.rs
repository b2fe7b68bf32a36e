//! Backend-agnostic command recording.
//!
//! Passes never touch a GPU directly. They record [`Command`]s into a
//! [`CommandBuffer`] which the host submits to a
//! [`CommandExecutor`](super::frame::CommandExecutor).

use glam::Vec4;

use super::filter::{RenderStateBlock, RendererId};
use super::material::Material;
use super::target::{
    ClearFlag, RenderTargetIdentifier, TargetDescriptor, TargetId,
};

/// One recorded operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Allocate (or reallocate) a frame-scoped target.
    GetTemporary {
        /// Id the target is allocated under.
        id: TargetId,
        /// Size and format.
        descriptor: TargetDescriptor,
    },
    /// Release a frame-scoped target.
    ReleaseTemporary {
        /// Id to release.
        id: TargetId,
    },
    /// Bind the destination for subsequent draws and clears.
    SetRenderTarget {
        /// Color destination.
        color: RenderTargetIdentifier,
        /// Optional depth attachment.
        depth: Option<RenderTargetIdentifier>,
    },
    /// Clear the bound destination.
    ClearRenderTarget {
        /// Attachments to clear.
        flag: ClearFlag,
        /// Color clear value.
        color: Vec4,
        /// Depth clear value.
        depth: f32,
    },
    /// Draw host renderers into the bound destination, in order.
    DrawRenderers {
        /// Renderers to draw, already filtered and sorted.
        renderers: Vec<RendererId>,
        /// State overrides.
        state: RenderStateBlock,
    },
    /// Full-screen shader pass from `source` into `destination`.
    Blit {
        /// Texture read by the pass.
        source: RenderTargetIdentifier,
        /// Texture written by the pass.
        destination: RenderTargetIdentifier,
        /// Material to run.
        material: Material,
        /// Sub-program index within the material.
        pass: usize,
    },
    /// Open a named profiling scope.
    BeginSample(String),
    /// Close the innermost profiling scope.
    EndSample(String),
}

/// Named, ordered list of commands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandBuffer {
    name: String,
    commands: Vec<Command>,
}

impl CommandBuffer {
    /// Empty buffer with a debug name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            commands: Vec::new(),
        }
    }

    /// Debug name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Recorded commands.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drop every recorded command.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Append a raw command.
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Append every command of `other`.
    pub fn append(&mut self, other: &Self) {
        self.commands.extend_from_slice(&other.commands);
    }

    /// Allocate a frame-scoped target.
    pub fn get_temporary_rt(
        &mut self,
        id: TargetId,
        descriptor: TargetDescriptor,
    ) {
        self.push(Command::GetTemporary { id, descriptor });
    }

    /// Release a frame-scoped target.
    pub fn release_temporary_rt(&mut self, id: TargetId) {
        self.push(Command::ReleaseTemporary { id });
    }

    /// Bind a destination.
    pub fn set_render_target(
        &mut self,
        color: RenderTargetIdentifier,
        depth: Option<RenderTargetIdentifier>,
    ) {
        self.push(Command::SetRenderTarget { color, depth });
    }

    /// Clear the bound destination. Depth clears to 1.0.
    pub fn clear_render_target(&mut self, flag: ClearFlag, color: Vec4) {
        self.push(Command::ClearRenderTarget {
            flag,
            color,
            depth: 1.0,
        });
    }

    /// Full-screen shader pass.
    pub fn blit(
        &mut self,
        source: RenderTargetIdentifier,
        destination: RenderTargetIdentifier,
        material: &Material,
        pass: usize,
    ) {
        self.push(Command::Blit {
            source,
            destination,
            material: material.clone(),
            pass,
        });
    }

    /// Record `body` inside a named profiling scope.
    pub fn profile(&mut self, label: &str, body: impl FnOnce(&mut Self)) {
        self.push(Command::BeginSample(label.to_owned()));
        body(self);
        self.push(Command::EndSample(label.to_owned()));
    }
}
