//! Little-endian cursor over asset bytes.

use half::f16;

use crate::error::{GeometryError, GeometryResult};
use crate::math::Vec3;

/// Bounds-checked little-endian reader.
///
/// Every read past the end fails with [`GeometryError::Truncated`] carrying
/// the asset path and the offset of the failed read.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    offset: usize,
    path: &'a str,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8], path: &'a str) -> Self {
        Self {
            data,
            offset: 0,
            path,
        }
    }

    /// Asset path used in error messages.
    pub fn path(&self) -> &'a str {
        self.path
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn is_at_end(&self) -> bool {
        self.offset >= self.data.len()
    }

    /// Fail unless `len` more bytes are available.
    pub fn ensure(&self, len: usize) -> GeometryResult<()> {
        if self.remaining() < len {
            return Err(GeometryError::Truncated {
                path: self.path.to_string(),
                offset: self.offset,
                needed: len - self.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_bytes(&mut self, len: usize) -> GeometryResult<&'a [u8]> {
        self.ensure(len)?;
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> GeometryResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> GeometryResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> GeometryResult<i8> {
        Ok(i8::from_le_bytes(self.read_array()?))
    }

    pub fn read_u16(&mut self) -> GeometryResult<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> GeometryResult<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> GeometryResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> GeometryResult<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> GeometryResult<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    /// Half-precision float expanded to f32.
    pub fn read_f16(&mut self) -> GeometryResult<f32> {
        Ok(f16::from_le_bytes(self.read_array()?).to_f32())
    }

    pub fn read_vec3(&mut self) -> GeometryResult<Vec3> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    /// `count` consecutive f32 values. The length is checked up front so a
    /// corrupt count never triggers a huge allocation.
    pub fn read_f32_array(&mut self, count: usize) -> GeometryResult<Vec<f32>> {
        self.ensure(count.saturating_mul(4))?;
        (0..count).map(|_| self.read_f32()).collect()
    }

    /// `[len:u16][utf8 bytes]`.
    pub fn read_string(&mut self) -> GeometryResult<String> {
        let len = self.read_u16()? as usize;
        let at = self.offset;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| {
            GeometryError::invalid_data(self.path, format!("invalid UTF-8 string at offset {}", at))
        })
    }
}
