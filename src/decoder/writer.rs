//! Little-endian writer producing the blocks the decoders read.
//!
//! Used by asset tooling, tests and benches to build geometry files.

use half::f16;

use crate::error::{GeometryError, GeometryResult};
use crate::math::Vec3;
use crate::mesh::{ElementEncoding, IndexData, ScalarKind, VertexDeclaration};

use super::curve::Curve;

/// Growable little-endian byte buffer.
#[derive(Debug, Clone, Default)]
pub struct BinaryWriter {
    bytes: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.write_bytes(&[value])
    }

    pub fn write_i8(&mut self, value: i8) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u16(&mut self, value: u16) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_i16(&mut self, value: i16) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_i32(&mut self, value: i32) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_f32(&mut self, value: f32) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_f16(&mut self, value: f32) -> &mut Self {
        self.write_bytes(&f16::from_f32(value).to_le_bytes())
    }

    pub fn write_vec3(&mut self, value: Vec3) -> &mut Self {
        self.write_f32(value.x).write_f32(value.y).write_f32(value.z)
    }

    /// `[len:u16][utf8 bytes]`; names longer than 65535 bytes are cut.
    pub fn write_string(&mut self, value: &str) -> &mut Self {
        let bytes = value.as_bytes();
        let len = bytes.len().min(u16::MAX as usize);
        self.write_u16(len as u16).write_bytes(&bytes[..len])
    }

    /// Quantize `value` with `encoding`, the inverse of the vertex decoder.
    pub fn write_scalar(&mut self, value: f32, encoding: ElementEncoding) -> GeometryResult<&mut Self> {
        let kind = encoding.kind().ok_or_else(|| GeometryError::FileFormat {
            path: "<writer>".to_string(),
            encoding: encoding.byte(),
        })?;
        let normalized = encoding.is_normalized();
        let quantize = |scale: f32, lo: f32, hi: f32| (value * scale).round().clamp(lo, hi);
        Ok(match (kind, normalized) {
            (ScalarKind::I8, true) => self.write_i8(quantize(127.0, -127.0, 127.0) as i8),
            (ScalarKind::I8, false) => self.write_i8(quantize(1.0, i8::MIN as f32, i8::MAX as f32) as i8),
            (ScalarKind::I16, true) => self.write_i8(quantize(32767.0, -128.0, 127.0) as i8),
            (ScalarKind::I16, false) => {
                self.write_i16(quantize(1.0, i16::MIN as f32, i16::MAX as f32) as i16)
            }
            (ScalarKind::I32, _) => self.write_i32(value.round() as i32),
            (ScalarKind::F16, _) => self.write_f16(value),
            (ScalarKind::F32, _) => self.write_f32(value),
            (ScalarKind::U8, true) => self.write_u8(quantize(255.0, 0.0, 255.0) as u8),
            (ScalarKind::U8, false) => self.write_u8(quantize(1.0, 0.0, 255.0) as u8),
            (ScalarKind::U16, true) => self.write_u8(quantize(65535.0, 0.0, 255.0) as u8),
            (ScalarKind::U16, false) => self.write_u16(quantize(1.0, 0.0, u16::MAX as f32) as u16),
            (ScalarKind::U32, _) => self.write_u32(value.round().max(0.0) as u32),
        })
    }

    /// Write a vertex block for `declaration` with interleaved `vertices`.
    ///
    /// `None` writes the element table with a zero vertex count.
    pub fn write_vertex_block(
        &mut self,
        declaration: &VertexDeclaration,
        vertices: Option<&[f32]>,
    ) -> GeometryResult<&mut Self> {
        self.write_u8(declaration.elements().len() as u8);
        for element in declaration.elements() {
            self.write_u8(element.usage.id())
                .write_u8(element.usage_index)
                .write_u8(element.encoding.byte());
        }
        let per_vertex = declaration.components_per_vertex();
        let vertices = vertices.unwrap_or(&[]);
        let vertex_count = if per_vertex == 0 {
            0
        } else {
            vertices.len() / per_vertex
        };
        self.write_u32(vertex_count as u32);
        for vertex in vertices.chunks_exact(per_vertex.max(1)).take(vertex_count) {
            let mut cursor = 0;
            for element in declaration.elements() {
                let count = element.component_count as usize;
                for &value in &vertex[cursor..cursor + count] {
                    self.write_scalar(value, element.encoding)?;
                }
                cursor += count;
            }
        }
        Ok(self)
    }

    /// Write `[selector:u8][count:u32][indices]`.
    pub fn write_index_block(&mut self, indices: &IndexData) -> &mut Self {
        match indices {
            IndexData::U16(values) => {
                self.write_u8(0).write_u32(values.len() as u32);
                for &value in values {
                    self.write_u16(value);
                }
            }
            IndexData::U32(values) => {
                self.write_u8(1).write_u32(values.len() as u32);
                for &value in values {
                    self.write_u32(value);
                }
            }
        }
        self
    }

    /// Write a curve block; `None` writes the absent marker.
    pub fn write_curve(&mut self, curve: Option<&Curve>) -> &mut Self {
        let Some(curve) = curve else {
            return self.write_u8(0);
        };
        self.write_u8(curve.curve_type.max(1))
            .write_u8(curve.dimension)
            .write_u8(curve.degree)
            .write_u32(curve.knots.len() as u32);
        for &knot in &curve.knots {
            self.write_f32(knot);
        }
        self.write_u32(curve.controls.len() as u32);
        for &control in &curve.controls {
            self.write_f32(control);
        }
        self
    }
}
