//! Self-describing vertex block decoding.
//!
//! Block layout:
//!
//! ```text
//! [elementCount:u8] [usage:u8 usageIndex:u8 encoding:u8] x elementCount
//! [vertexCount:u32] [vertex data]
//! ```
//!
//! Vertex data is interleaved per vertex in element order; every scalar is
//! widened to f32 according to its element encoding.

use crate::error::{GeometryError, GeometryResult};
use crate::mesh::{ElementEncoding, ScalarKind, VertexDeclaration, VertexUsage};

use super::reader::BinaryReader;

/// Decode one scalar of `encoding`.
///
/// The normalized 16-bit kinds read a single byte and divide by the 16-bit
/// range; assets in the wild are written that way.
pub fn read_scalar(reader: &mut BinaryReader<'_>, encoding: ElementEncoding) -> GeometryResult<f32> {
    let kind = encoding.kind().ok_or_else(|| GeometryError::FileFormat {
        path: reader.path().to_string(),
        encoding: encoding.byte(),
    })?;
    let value = match (kind, encoding.is_normalized()) {
        (ScalarKind::I8, true) => (reader.read_i8()? as f32 / 127.0).max(-1.0),
        (ScalarKind::I8, false) => reader.read_i8()? as f32,
        (ScalarKind::I16, true) => reader.read_i8()? as f32 / 32767.0,
        (ScalarKind::I16, false) => reader.read_i16()? as f32,
        (ScalarKind::I32, _) => reader.read_i32()? as f32,
        (ScalarKind::F16, _) => reader.read_f16()?,
        (ScalarKind::F32, _) => reader.read_f32()?,
        (ScalarKind::U8, true) => reader.read_u8()? as f32 / 255.0,
        (ScalarKind::U8, false) => reader.read_u8()? as f32,
        (ScalarKind::U16, true) => reader.read_u8()? as f32 / 65535.0,
        (ScalarKind::U16, false) => reader.read_u16()? as f32,
        (ScalarKind::U32, _) => reader.read_u32()? as f32,
    };
    Ok(value)
}

/// Decode a vertex block, appending its elements to `declaration`.
///
/// Returns `Ok(None)` when the block declares zero vertices.
pub fn decode_vertex_buffer(
    reader: &mut BinaryReader<'_>,
    declaration: &mut VertexDeclaration,
) -> GeometryResult<Option<Vec<f32>>> {
    let element_count = reader.read_u8()?;
    let mut encodings = Vec::with_capacity(element_count as usize);
    for _ in 0..element_count {
        let usage = VertexUsage::from_id(reader.read_u8()?);
        let usage_index = reader.read_u8()?;
        let encoding = ElementEncoding::from_byte(reader.read_u8()?);
        if let VertexUsage::Other(id) = usage {
            log::warn!("{}: unknown vertex usage id {}", reader.path(), id);
        }
        declaration.push(usage, usage_index, encoding);
        encodings.push(encoding);
    }

    let vertex_count = reader.read_u32()? as usize;
    if vertex_count == 0 {
        return Ok(None);
    }

    // Reject unknown encodings before consuming any vertex data.
    if let Some(bad) = encodings.iter().find(|e| e.kind().is_none()) {
        return Err(GeometryError::FileFormat {
            path: reader.path().to_string(),
            encoding: bad.byte(),
        });
    }

    let per_vertex = declaration.components_per_vertex();
    let mut vertices =
        Vec::with_capacity(vertex_count.saturating_mul(per_vertex).min(reader.remaining()));
    for _ in 0..vertex_count {
        for encoding in &encodings {
            for _ in 0..encoding.component_count() {
                vertices.push(read_scalar(reader, *encoding)?);
            }
        }
    }
    Ok(Some(vertices))
}
