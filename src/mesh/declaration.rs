//! Vertex declarations for decoded meshes.
//!
//! A [`VertexDeclaration`] describes one interleaved vertex buffer. Each
//! [`VertexElement`] remembers how it was encoded in the asset file (an
//! [`ElementEncoding`] byte) while its runtime representation is always
//! `f32` components, so the runtime offset of an element is the running sum
//! of the preceding component counts times four.
//!
//! # Encoding Byte
//!
//! ```text
//!  7 6 5 | 4         | 3 2 1 0
//!  comps | normalize | scalar kind
//! ```
//!
//! The component count is `(encoding >> 5) + 1`.
//!
//! # Binding to Passes
//!
//! Effects consume a subset of the elements. [`VertexDeclaration::set_declaration`]
//! binds every input of a pass or fails; [`VertexDeclaration::set_partial_declaration`]
//! binds whatever it can and reports the rest, which is how instance data
//! fills the inputs a mesh doesn't carry.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::backend::{AttributeBinding, GraphicsDevice, PassInput};

/// Semantic meaning of a vertex element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexUsage {
    Position,
    Color,
    Normal,
    Tangent,
    Binormal,
    TexCoord,
    BlendWeight,
    BlendIndices,
    /// Usage id not known to this crate; kept so that the layout stays intact.
    Other(u8),
}

impl VertexUsage {
    /// Map a file usage id to a usage.
    pub fn from_id(id: u8) -> Self {
        match id {
            0 => Self::Position,
            1 => Self::Color,
            2 => Self::Normal,
            3 => Self::Tangent,
            4 => Self::Binormal,
            5 => Self::TexCoord,
            6 => Self::BlendWeight,
            7 => Self::BlendIndices,
            other => Self::Other(other),
        }
    }

    /// File usage id.
    pub fn id(&self) -> u8 {
        match self {
            Self::Position => 0,
            Self::Color => 1,
            Self::Normal => 2,
            Self::Tangent => 3,
            Self::Binormal => 4,
            Self::TexCoord => 5,
            Self::BlendWeight => 6,
            Self::BlendIndices => 7,
            Self::Other(id) => *id,
        }
    }

    /// Parse a usage name as used by structured geometry documents.
    pub fn from_name(name: &str) -> Option<Self> {
        let usage = match name.to_ascii_lowercase().as_str() {
            "position" => Self::Position,
            "color" => Self::Color,
            "normal" => Self::Normal,
            "tangent" => Self::Tangent,
            "binormal" => Self::Binormal,
            "texcoord" => Self::TexCoord,
            "blendweight" => Self::BlendWeight,
            "blendindices" => Self::BlendIndices,
            _ => return None,
        };
        Some(usage)
    }
}

/// Numeric kind stored in the low nibble of an encoding byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    I8,
    I16,
    I32,
    F16,
    F32,
    U8,
    U16,
    U32,
}

impl ScalarKind {
    /// Low-nibble value.
    pub fn nibble(&self) -> u8 {
        match self {
            Self::I8 => 0,
            Self::I16 => 1,
            Self::I32 => 2,
            Self::F16 => 3,
            Self::F32 => 4,
            Self::U8 => 8,
            Self::U16 => 9,
            Self::U32 => 10,
        }
    }

    fn from_nibble(nibble: u8) -> Option<Self> {
        let kind = match nibble {
            0 => Self::I8,
            1 => Self::I16,
            2 => Self::I32,
            3 => Self::F16,
            4 => Self::F32,
            8 => Self::U8,
            9 => Self::U16,
            10 => Self::U32,
            _ => return None,
        };
        Some(kind)
    }
}

/// A packed file encoding byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementEncoding(u8);

impl ElementEncoding {
    /// Normalization flag.
    pub const NORMALIZE: u8 = 0x10;

    /// Wrap a raw byte as read from a file.
    pub const fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// Pack a kind, normalization flag and component count (1..=8).
    pub fn new(kind: ScalarKind, normalized: bool, components: u8) -> Self {
        debug_assert!((1..=8).contains(&components));
        let flag = if normalized { Self::NORMALIZE } else { 0 };
        Self(((components - 1) << 5) | flag | kind.nibble())
    }

    /// The raw byte.
    pub const fn byte(&self) -> u8 {
        self.0
    }

    /// Scalar kind, `None` for unknown nibbles.
    pub fn kind(&self) -> Option<ScalarKind> {
        ScalarKind::from_nibble(self.0 & 0x0f)
    }

    pub fn is_normalized(&self) -> bool {
        self.0 & Self::NORMALIZE != 0
    }

    pub fn component_count(&self) -> u8 {
        (self.0 >> 5) + 1
    }

    /// Bytes one scalar occupies in the file, `None` for unknown kinds.
    ///
    /// The normalized 16-bit kinds are stored as single bytes.
    pub fn scalar_size(&self) -> Option<usize> {
        let size = match (self.kind()?, self.is_normalized()) {
            (ScalarKind::I8 | ScalarKind::U8, _) => 1,
            (ScalarKind::I16 | ScalarKind::U16, true) => 1,
            (ScalarKind::I16 | ScalarKind::U16 | ScalarKind::F16, _) => 2,
            (ScalarKind::I32 | ScalarKind::U32 | ScalarKind::F32, _) => 4,
        };
        Some(size)
    }
}

/// A single element of a vertex declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexElement {
    pub usage: VertexUsage,
    pub usage_index: u8,
    /// How the element is stored in the asset file.
    pub encoding: ElementEncoding,
    /// Number of f32 components at runtime.
    pub component_count: u8,
    /// Runtime byte offset within the vertex.
    pub offset: u32,
}

impl VertexElement {
    /// Runtime size in bytes.
    pub fn size(&self) -> u32 {
        self.component_count as u32 * 4
    }

    fn matches(&self, input: &PassInput) -> bool {
        self.usage == input.usage && self.usage_index == input.usage_index
    }
}

/// Result of a partial binding; feed it back to
/// [`VertexDeclaration::reset_instance_divisors`] after drawing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialBinding {
    /// Pass inputs this declaration could not provide.
    pub missing: Vec<PassInput>,
    /// Locations whose instance divisor was overridden.
    pub divisor_locations: Vec<u32>,
}

/// Ordered list of interleaved vertex elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexDeclaration {
    elements: Vec<VertexElement>,
    stride: u32,
    hash: u64,
}

impl VertexDeclaration {
    /// Create an empty declaration.
    pub fn new() -> Self {
        let mut declaration = Self::default();
        declaration.rebuild();
        declaration
    }

    /// Build a declaration from `(usage, usage_index, encoding)` triples.
    pub fn from_encodings(
        elements: impl IntoIterator<Item = (VertexUsage, u8, ElementEncoding)>,
    ) -> Self {
        let mut declaration = Self::new();
        for (usage, usage_index, encoding) in elements {
            declaration.push(usage, usage_index, encoding);
        }
        declaration
    }

    /// Append an element; its offset is the current stride.
    pub fn push(&mut self, usage: VertexUsage, usage_index: u8, encoding: ElementEncoding) {
        let offset = self.elements.iter().map(VertexElement::size).sum();
        self.elements.push(VertexElement {
            usage,
            usage_index,
            encoding,
            component_count: encoding.component_count(),
            offset,
        });
        self.rebuild();
    }

    /// Remove every element.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.stride = self.elements.iter().map(VertexElement::size).sum();
        let mut hasher = DefaultHasher::new();
        for element in &self.elements {
            element.usage.hash(&mut hasher);
            element.usage_index.hash(&mut hasher);
            element.component_count.hash(&mut hasher);
            element.offset.hash(&mut hasher);
        }
        self.hash = hasher.finish();
    }

    pub fn elements(&self) -> &[VertexElement] {
        &self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Runtime bytes per vertex.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Number of f32 components per vertex.
    pub fn components_per_vertex(&self) -> usize {
        (self.stride / 4) as usize
    }

    /// Structural hash of the runtime layout (usage, index, components, offset).
    pub fn layout_hash(&self) -> u64 {
        self.hash
    }

    /// Whether both declarations describe the same runtime layout.
    pub fn is_compatible_with(&self, other: &VertexDeclaration) -> bool {
        self.hash == other.hash
            && self.elements.len() == other.elements.len()
            && self
                .elements
                .iter()
                .zip(&other.elements)
                .all(|(a, b)| {
                    a.usage == b.usage
                        && a.usage_index == b.usage_index
                        && a.component_count == b.component_count
                        && a.offset == b.offset
                })
    }

    /// Find an element by usage.
    pub fn find(&self, usage: VertexUsage, usage_index: u8) -> Option<&VertexElement> {
        self.elements
            .iter()
            .find(|e| e.usage == usage && e.usage_index == usage_index)
    }

    fn resolve(&self, inputs: &[PassInput]) -> (Vec<AttributeBinding>, Vec<PassInput>) {
        let mut bound = Vec::with_capacity(inputs.len());
        let mut missing = Vec::new();
        for input in inputs {
            match self.elements.iter().find(|e| e.matches(input)) {
                Some(element) => bound.push(AttributeBinding {
                    location: input.location,
                    offset: element.offset,
                    component_count: element.component_count as u32,
                }),
                None => missing.push(*input),
            }
        }
        (bound, missing)
    }

    /// Bind every pass input from this declaration at `slot`.
    ///
    /// Returns `false` (binding nothing) if any input is not provided.
    pub fn set_declaration(
        &self,
        device: &dyn GraphicsDevice,
        slot: u32,
        inputs: &[PassInput],
    ) -> bool {
        let (bound, missing) = self.resolve(inputs);
        if !missing.is_empty() {
            return false;
        }
        device.set_vertex_attributes(slot, self.stride, &bound);
        true
    }

    /// Bind the pass inputs this declaration provides at `slot`, overriding
    /// their instance divisor when `divisor` is non-zero.
    pub fn set_partial_declaration(
        &self,
        device: &dyn GraphicsDevice,
        slot: u32,
        inputs: &[PassInput],
        divisor: u32,
    ) -> PartialBinding {
        let (bound, missing) = self.resolve(inputs);
        if !bound.is_empty() {
            device.set_vertex_attributes(slot, self.stride, &bound);
        }
        let mut divisor_locations = Vec::new();
        if divisor != 0 {
            for binding in &bound {
                device.set_instance_divisor(binding.location, divisor);
                divisor_locations.push(binding.location);
            }
        }
        PartialBinding {
            missing,
            divisor_locations,
        }
    }

    /// Restore per-vertex stepping for locations overridden by
    /// [`set_partial_declaration`](Self::set_partial_declaration).
    pub fn reset_instance_divisors(device: &dyn GraphicsDevice, binding: &PartialBinding) {
        for &location in &binding.divisor_locations {
            device.set_instance_divisor(location, 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DeviceCommand, DummyDevice};

    fn position_normal_uv() -> VertexDeclaration {
        VertexDeclaration::from_encodings([
            (VertexUsage::Position, 0, ElementEncoding::new(ScalarKind::F32, false, 3)),
            (VertexUsage::Normal, 0, ElementEncoding::new(ScalarKind::I8, true, 3)),
            (VertexUsage::TexCoord, 0, ElementEncoding::new(ScalarKind::F16, false, 2)),
        ])
    }

    #[test]
    fn test_encoding_byte() {
        let encoding = ElementEncoding::new(ScalarKind::U16, true, 4);
        assert_eq!(encoding.byte(), 0b011_1_1001);
        assert_eq!(encoding.kind(), Some(ScalarKind::U16));
        assert!(encoding.is_normalized());
        assert_eq!(encoding.component_count(), 4);
        assert_eq!(encoding.scalar_size(), Some(1));

        let unknown = ElementEncoding::from_byte(0x05);
        assert_eq!(unknown.kind(), None);
        assert_eq!(unknown.scalar_size(), None);
    }

    #[test]
    fn test_offsets_and_stride() {
        let decl = position_normal_uv();
        let offsets: Vec<u32> = decl.elements().iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24]);
        assert_eq!(decl.stride(), 32);
        assert_eq!(decl.components_per_vertex(), 8);
    }

    #[test]
    fn test_layout_hash_tracks_runtime_layout() {
        let a = position_normal_uv();
        // Same runtime layout from a different file encoding.
        let b = VertexDeclaration::from_encodings([
            (VertexUsage::Position, 0, ElementEncoding::new(ScalarKind::F16, false, 3)),
            (VertexUsage::Normal, 0, ElementEncoding::new(ScalarKind::F32, false, 3)),
            (VertexUsage::TexCoord, 0, ElementEncoding::new(ScalarKind::F32, false, 2)),
        ]);
        assert_eq!(a.layout_hash(), b.layout_hash());
        assert!(a.is_compatible_with(&b));

        let mut c = a.clone();
        c.push(VertexUsage::Color, 0, ElementEncoding::new(ScalarKind::U8, true, 4));
        assert_ne!(a.layout_hash(), c.layout_hash());
        assert!(!a.is_compatible_with(&c));
    }

    #[test]
    fn test_set_declaration_binds_consumed_subset() {
        let device = DummyDevice::new();
        let decl = position_normal_uv();
        let inputs = [
            PassInput::new(VertexUsage::Position, 0, 0),
            PassInput::new(VertexUsage::TexCoord, 0, 3),
        ];
        assert!(decl.set_declaration(&device, 0, &inputs));
        assert_eq!(
            device.commands(),
            vec![DeviceCommand::SetVertexAttributes {
                slot: 0,
                stride: 32,
                attributes: vec![
                    AttributeBinding { location: 0, offset: 0, component_count: 3 },
                    AttributeBinding { location: 3, offset: 24, component_count: 2 },
                ],
            }]
        );
    }

    #[test]
    fn test_set_declaration_fails_on_missing_input() {
        let device = DummyDevice::new();
        let decl = position_normal_uv();
        let inputs = [PassInput::new(VertexUsage::Tangent, 0, 4)];
        assert!(!decl.set_declaration(&device, 0, &inputs));
        assert!(device.commands().is_empty());
    }

    #[test]
    fn test_partial_declaration_with_divisor() {
        let device = DummyDevice::new();
        let instance = VertexDeclaration::from_encodings([(
            VertexUsage::TexCoord,
            4,
            ElementEncoding::new(ScalarKind::F32, false, 4),
        )]);
        let inputs = [
            PassInput::new(VertexUsage::Position, 0, 0),
            PassInput::new(VertexUsage::TexCoord, 4, 8),
        ];
        let binding = instance.set_partial_declaration(&device, 1, &inputs, 1);
        assert_eq!(binding.missing, vec![inputs[0]]);
        assert_eq!(binding.divisor_locations, vec![8]);

        VertexDeclaration::reset_instance_divisors(&device, &binding);
        let commands = device.commands();
        assert_eq!(
            commands.last(),
            Some(&DeviceCommand::SetInstanceDivisor { location: 8, divisor: 0 })
        );
    }
}
