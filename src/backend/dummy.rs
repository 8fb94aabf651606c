//! Dummy device and effect for testing and tooling.
//!
//! [`DummyDevice`] doesn't perform GPU work; it records every command so that
//! callers can inspect buffer lifetimes, bindings and draw submissions.
//! [`DummyEffect`] serves scripted techniques with fixed pass inputs.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::mesh::IndexFormat;

use super::{
    AttributeBinding, BufferDescriptor, BufferHandle, BufferUsage, DeviceError, DrawCall, Effect,
    GraphicsDevice, PassInput,
};

/// A command received by the [`DummyDevice`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    CreateBuffer {
        buffer: BufferHandle,
        usage: BufferUsage,
        size: u64,
    },
    DestroyBuffer(BufferHandle),
    BindVertexBuffer {
        slot: u32,
        buffer: BufferHandle,
    },
    BindIndexBuffer {
        buffer: BufferHandle,
        format: IndexFormat,
    },
    SetVertexAttributes {
        slot: u32,
        stride: u32,
        attributes: Vec<AttributeBinding>,
    },
    SetInstanceDivisor {
        location: u32,
        divisor: u32,
    },
    ApplyRenderState,
    Draw(DrawCall),
}

/// Recording device.
#[derive(Debug, Default)]
pub struct DummyDevice {
    next_id: AtomicU64,
    fail_allocations: AtomicBool,
    live_buffers: Mutex<HashSet<BufferHandle>>,
    commands: Mutex<Vec<DeviceCommand>>,
}

impl DummyDevice {
    /// Create a new dummy device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `create_buffer` fail with `OutOfMemory`.
    pub fn set_fail_allocations(&self, fail: bool) {
        self.fail_allocations.store(fail, Ordering::Release);
    }

    /// All recorded commands, oldest first.
    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.commands.lock().clone()
    }

    /// Recorded draw submissions, oldest first.
    pub fn draw_calls(&self) -> Vec<DrawCall> {
        self.commands
            .lock()
            .iter()
            .filter_map(|cmd| match cmd {
                DeviceCommand::Draw(draw) => Some(*draw),
                _ => None,
            })
            .collect()
    }

    /// Forget recorded commands (live buffers are kept).
    pub fn clear_commands(&self) {
        self.commands.lock().clear();
    }

    /// Number of buffers created and not yet destroyed.
    pub fn live_buffer_count(&self) -> usize {
        self.live_buffers.lock().len()
    }

    /// Whether `buffer` is alive.
    pub fn is_live(&self, buffer: BufferHandle) -> bool {
        self.live_buffers.lock().contains(&buffer)
    }

    fn record(&self, command: DeviceCommand) {
        self.commands.lock().push(command);
    }
}

impl GraphicsDevice for DummyDevice {
    fn name(&self) -> &str {
        "Dummy Device"
    }

    fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        contents: &[u8],
    ) -> Result<BufferHandle, DeviceError> {
        if self.fail_allocations.load(Ordering::Acquire) {
            return Err(DeviceError::OutOfMemory);
        }
        let buffer = BufferHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        log::trace!(
            "DummyDevice: creating {:?} buffer {:?} (size: {}, initial: {})",
            descriptor.usage,
            descriptor.label,
            descriptor.size,
            contents.len()
        );
        self.live_buffers.lock().insert(buffer);
        self.record(DeviceCommand::CreateBuffer {
            buffer,
            usage: descriptor.usage,
            size: descriptor.size,
        });
        Ok(buffer)
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        if !self.live_buffers.lock().remove(&buffer) {
            log::warn!("DummyDevice: destroying unknown buffer {:?}", buffer);
        }
        self.record(DeviceCommand::DestroyBuffer(buffer));
    }

    fn bind_vertex_buffer(&self, slot: u32, buffer: BufferHandle) {
        self.record(DeviceCommand::BindVertexBuffer { slot, buffer });
    }

    fn bind_index_buffer(&self, buffer: BufferHandle, format: IndexFormat) {
        self.record(DeviceCommand::BindIndexBuffer { buffer, format });
    }

    fn set_vertex_attributes(&self, slot: u32, stride: u32, attributes: &[AttributeBinding]) {
        self.record(DeviceCommand::SetVertexAttributes {
            slot,
            stride,
            attributes: attributes.to_vec(),
        });
    }

    fn set_instance_divisor(&self, location: u32, divisor: u32) {
        self.record(DeviceCommand::SetInstanceDivisor { location, divisor });
    }

    fn apply_render_state(&self) {
        self.record(DeviceCommand::ApplyRenderState);
    }

    fn draw_indexed(&self, draw: &DrawCall) {
        log::trace!(
            "DummyDevice: draw {:?} offset={} count={} instances={}",
            draw.topology,
            draw.byte_offset,
            draw.index_count,
            draw.instance_count
        );
        self.record(DeviceCommand::Draw(*draw));
    }
}

/// Scripted effect: each technique is a list of passes, each pass a list of
/// vertex inputs.
#[derive(Debug, Default)]
pub struct DummyEffect {
    default_technique: String,
    techniques: HashMap<String, Vec<Vec<PassInput>>>,
    applied: Mutex<Vec<(String, usize)>>,
}

impl DummyEffect {
    /// Create an effect whose default technique is `default_technique`.
    pub fn new(default_technique: impl Into<String>) -> Self {
        Self {
            default_technique: default_technique.into(),
            ..Self::default()
        }
    }

    /// Add a technique with the given passes.
    pub fn with_technique(mut self, name: impl Into<String>, passes: Vec<Vec<PassInput>>) -> Self {
        self.techniques.insert(name.into(), passes);
        self
    }

    /// Passes applied so far, as `(technique, pass)`.
    pub fn applied_passes(&self) -> Vec<(String, usize)> {
        self.applied.lock().clone()
    }
}

impl Effect for DummyEffect {
    fn default_technique(&self) -> &str {
        &self.default_technique
    }

    fn pass_count(&self, technique: &str) -> usize {
        self.techniques.get(technique).map_or(0, Vec::len)
    }

    fn apply_pass(&self, technique: &str, pass: usize) {
        self.applied.lock().push((technique.to_string(), pass));
    }

    fn pass_input(&self, technique: &str, pass: usize) -> Vec<PassInput> {
        self.techniques
            .get(technique)
            .and_then(|passes| passes.get(pass))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::VertexUsage;

    #[test]
    fn test_buffer_lifetime() {
        let device = DummyDevice::new();
        let descriptor = BufferDescriptor {
            label: Some("vb".into()),
            size: 12,
            usage: BufferUsage::Vertex,
        };
        let buffer = device.create_buffer(&descriptor, &[0u8; 12]).unwrap();
        assert!(device.is_live(buffer));
        assert_eq!(device.live_buffer_count(), 1);

        device.destroy_buffer(buffer);
        assert!(!device.is_live(buffer));
        assert_eq!(device.live_buffer_count(), 0);
    }

    #[test]
    fn test_failed_allocation() {
        let device = DummyDevice::new();
        device.set_fail_allocations(true);
        let descriptor = BufferDescriptor {
            label: None,
            size: 4,
            usage: BufferUsage::Index,
        };
        assert_eq!(
            device.create_buffer(&descriptor, &[0u8; 4]),
            Err(DeviceError::OutOfMemory)
        );
    }

    #[test]
    fn test_effect_passes() {
        let effect = DummyEffect::new("Main").with_technique(
            "Main",
            vec![vec![PassInput::new(VertexUsage::Position, 0, 0)], vec![]],
        );
        assert_eq!(effect.pass_count("Main"), 2);
        assert_eq!(effect.pass_count("Depth"), 0);
        assert_eq!(effect.pass_input("Main", 0).len(), 1);
        assert!(effect.pass_input("Main", 5).is_empty());

        effect.apply_pass("Main", 1);
        assert_eq!(effect.applied_passes(), vec![("Main".to_string(), 1)]);
    }
}
