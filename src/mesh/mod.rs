//! Mesh data structures.
//!
//! This module provides:
//! - [`VertexDeclaration`] - interleaved runtime vertex layout with a structural hash
//! - [`MeshArea`] - named index sub-ranges with their own bounds
//! - [`Mesh`] - GPU-resident mesh with an optional [`CpuMirror`]
//! - [`MeshSource`] - decoder output waiting for upload

mod area;
mod data;
mod declaration;

pub use area::{AreaSource, MeshArea};
pub use data::{
    index_range_bounds, read_attribute, read_positions, CpuMirror, IndexData, IndexFormat, Mesh,
    MeshSource,
};
pub use declaration::{
    ElementEncoding, PartialBinding, ScalarKind, VertexDeclaration, VertexElement, VertexUsage,
};

/// Non-owning handle to a mesh: its index in the owning resource's mesh list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub usize);
