//! Index block decoding.

use crate::error::GeometryResult;
use crate::mesh::IndexData;

use super::reader::BinaryReader;

/// Decode `[selector:u8][count:u32][indices]`.
///
/// A zero selector means 16-bit indices; any other value means 32-bit.
pub fn decode_index_buffer(reader: &mut BinaryReader<'_>) -> GeometryResult<IndexData> {
    let selector = reader.read_u8()?;
    let count = reader.read_u32()? as usize;
    if selector == 0 {
        reader.ensure(count.saturating_mul(2))?;
        let indices = (0..count)
            .map(|_| reader.read_u16())
            .collect::<GeometryResult<Vec<_>>>()?;
        Ok(IndexData::U16(indices))
    } else {
        reader.ensure(count.saturating_mul(4))?;
        let indices = (0..count)
            .map(|_| reader.read_u32())
            .collect::<GeometryResult<Vec<_>>>()?;
        Ok(IndexData::U32(indices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeometryError;
    use crate::mesh::IndexFormat;

    #[test]
    fn test_selector_width() {
        let bytes = [0u8, 2, 0, 0, 0, 1, 0, 2, 0];
        let mut reader = BinaryReader::new(&bytes, "mem");
        assert_eq!(decode_index_buffer(&mut reader).unwrap(), IndexData::U16(vec![1, 2]));

        let bytes = [7u8, 1, 0, 0, 0, 0x70, 0x11, 0x01, 0x00];
        let mut reader = BinaryReader::new(&bytes, "mem");
        let indices = decode_index_buffer(&mut reader).unwrap();
        assert_eq!(indices.format(), IndexFormat::Uint32);
        assert_eq!(indices.get(0), Some(70000));
    }

    #[test]
    fn test_truncated_indices() {
        let bytes = [0u8, 3, 0, 0, 0, 1, 0];
        let mut reader = BinaryReader::new(&bytes, "mem");
        assert!(matches!(
            decode_index_buffer(&mut reader),
            Err(GeometryError::Truncated { offset: 5, needed: 4, .. })
        ));
    }
}
