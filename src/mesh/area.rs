//! Mesh areas: named sub-ranges of a mesh index buffer.

use crate::math::Aabb;

use super::IndexFormat;

/// A named, material-bound sub-range of a mesh index buffer.
///
/// `start` is a byte offset into the index buffer and `count` an index count,
/// so the area covers indices `start / width .. start / width + count`.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshArea {
    pub name: String,
    /// Byte offset of the first index.
    pub start: u32,
    /// Number of indices.
    pub count: u32,
    pub bounds: Aabb,
}

impl MeshArea {
    /// Index of the first element of this area for a buffer of `format`.
    pub fn first_index(&self, format: IndexFormat) -> u32 {
        self.start / format.size() as u32
    }

    /// Byte offset just past the last index of this area.
    pub fn end(&self, format: IndexFormat) -> u32 {
        self.start + self.count * format.size() as u32
    }

    /// Whether index number `index` (not a byte offset) lies in this area.
    pub fn contains_index(&self, format: IndexFormat, index: u32) -> bool {
        let first = self.first_index(format);
        index >= first && index < first + self.count
    }
}

/// An area as described by a decoder, before upload.
///
/// When `bounds` is `None` the upload path computes it from the raw vertex
/// and index data.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaSource {
    pub name: String,
    pub first_index: u32,
    pub index_count: u32,
    pub bounds: Option<Aabb>,
}

impl AreaSource {
    pub fn new(name: impl Into<String>, first_index: u32, index_count: u32) -> Self {
        Self {
            name: name.into(),
            first_index,
            index_count,
            bounds: None,
        }
    }

    /// Use precomputed bounds instead of deriving them at upload.
    pub fn with_bounds(mut self, bounds: Aabb) -> Self {
        self.bounds = Some(bounds);
        self
    }
}
