//! Device and effect abstraction layer.
//!
//! The geometry subsystem never talks to a GPU API directly. Buffer creation
//! and draw submission go through [`GraphicsDevice`]; pass iteration and the
//! per-pass vertex inputs come from an [`Effect`].
//!
//! # Available Implementations
//!
//! - [`dummy`]: recording device and scripted effect for tests and tooling
//!
//! Real backends implement these traits on top of their own buffer and
//! pipeline objects.

pub mod dummy;

use thiserror::Error;

use crate::mesh::{IndexFormat, VertexUsage};

pub use dummy::{DeviceCommand, DummyDevice, DummyEffect};

/// Device error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Device lost")]
    DeviceLost,
}

/// Handle to a GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(u64);

impl BufferHandle {
    /// Wrap a backend-specific buffer id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The backend-specific buffer id.
    pub const fn id(&self) -> u64 {
        self.0
    }
}

/// What a buffer is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
    Instance,
}

/// Buffer descriptor
#[derive(Debug, Clone)]
pub struct BufferDescriptor {
    pub label: Option<String>,
    pub size: u64,
    pub usage: BufferUsage,
}

/// Primitive type of an indexed draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    #[default]
    TriangleList,
    LineList,
}

/// One vertex attribute bound to a shader input location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeBinding {
    /// Shader input location.
    pub location: u32,
    /// Byte offset within the vertex.
    pub offset: u32,
    /// Number of f32 components.
    pub component_count: u32,
}

/// A single indexed draw submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawCall {
    pub topology: PrimitiveTopology,
    pub index_format: IndexFormat,
    /// Byte offset of the first index in the bound index buffer.
    pub byte_offset: u32,
    pub index_count: u32,
    /// 1 for direct draws.
    pub instance_count: u32,
}

/// The graphics device collaborator.
///
/// Methods take `&self`; implementations synchronize internally, the same way
/// GPU device objects are shared behind an `Arc`.
pub trait GraphicsDevice: Send + Sync {
    /// Backend name for diagnostics.
    fn name(&self) -> &str;

    /// Create a buffer initialized with `contents`.
    fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        contents: &[u8],
    ) -> Result<BufferHandle, DeviceError>;

    /// Release a buffer. The handle must not be used afterwards.
    fn destroy_buffer(&self, buffer: BufferHandle);

    /// Bind a vertex (or instance) buffer to a slot.
    fn bind_vertex_buffer(&self, slot: u32, buffer: BufferHandle);

    /// Bind the index buffer used by subsequent draws.
    fn bind_index_buffer(&self, buffer: BufferHandle, format: IndexFormat);

    /// Describe how the buffer bound at `slot` feeds shader inputs.
    fn set_vertex_attributes(&self, slot: u32, stride: u32, attributes: &[AttributeBinding]);

    /// Set the instance divisor of a shader input location (0 = per vertex).
    fn set_instance_divisor(&self, location: u32, divisor: u32);

    /// Flush pending pipeline/render state before a draw.
    fn apply_render_state(&self);

    /// Submit an indexed draw.
    fn draw_indexed(&self, draw: &DrawCall);
}

/// A vertex input consumed by an effect pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassInput {
    pub usage: VertexUsage,
    pub usage_index: u8,
    /// Shader input location.
    pub location: u32,
}

impl PassInput {
    pub fn new(usage: VertexUsage, usage_index: u8, location: u32) -> Self {
        Self {
            usage,
            usage_index,
            location,
        }
    }
}

/// The shader/effect collaborator.
pub trait Effect {
    /// Technique used when a render call does not name one.
    fn default_technique(&self) -> &str;

    /// Number of passes of `technique` (0 when the technique is unknown or
    /// the effect is not ready).
    fn pass_count(&self, technique: &str) -> usize;

    /// Make `pass` of `technique` current on the device.
    fn apply_pass(&self, technique: &str, pass: usize);

    /// Vertex inputs consumed by `pass` of `technique`.
    fn pass_input(&self, technique: &str, pass: usize) -> Vec<PassInput>;
}
