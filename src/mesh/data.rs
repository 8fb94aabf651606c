//! Mesh data: index storage, CPU mirrors and GPU-resident meshes.
//!
//! This module provides:
//! - [`IndexFormat`] - index element width (u16 or u32)
//! - [`IndexData`] - decoded index stream in its stored width
//! - [`CpuMirror`] - CPU copy of decoded vertices and indices
//! - [`MeshSource`] - decoder output for one mesh, ready for upload
//! - [`Mesh`] - uploaded mesh with areas, bounds and optional mirror

use std::collections::HashMap;

use crate::backend::{BufferDescriptor, BufferHandle, BufferUsage, GraphicsDevice};
use crate::error::{GeometryError, GeometryResult};
use crate::math::{Aabb, Mat4, Vec3};

use super::area::{AreaSource, MeshArea};
use super::declaration::{VertexDeclaration, VertexUsage};

/// Index format for indexed drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// 16-bit unsigned integers (max 65535 vertices).
    #[default]
    Uint16,
    /// 32-bit unsigned integers.
    Uint32,
}

impl IndexFormat {
    /// Get the size in bytes of each index.
    pub fn size(&self) -> usize {
        match self {
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }

    /// Narrowest format able to address `vertex_count` vertices.
    pub fn for_vertex_count(vertex_count: usize) -> Self {
        if vertex_count > u16::MAX as usize {
            Self::Uint32
        } else {
            Self::Uint16
        }
    }
}

/// Decoded index stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexData {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl Default for IndexData {
    fn default() -> Self {
        Self::U16(Vec::new())
    }
}

impl IndexData {
    /// Store `indices` in `format`. Values that don't fit a 16-bit format
    /// are rejected by returning `None`.
    pub fn from_u32(indices: &[u32], format: IndexFormat) -> Option<Self> {
        match format {
            IndexFormat::Uint16 => indices
                .iter()
                .map(|&i| u16::try_from(i).ok())
                .collect::<Option<Vec<_>>>()
                .map(Self::U16),
            IndexFormat::Uint32 => Some(Self::U32(indices.to_vec())),
        }
    }

    pub fn format(&self) -> IndexFormat {
        match self {
            Self::U16(_) => IndexFormat::Uint16,
            Self::U32(_) => IndexFormat::Uint32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index at position `i`, widened to u32.
    pub fn get(&self, i: usize) -> Option<u32> {
        match self {
            Self::U16(v) => v.get(i).map(|&x| x as u32),
            Self::U32(v) => v.get(i).copied(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Raw little-endian bytes as uploaded to the GPU.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::U16(v) => bytemuck::cast_slice(v),
            Self::U32(v) => bytemuck::cast_slice(v),
        }
    }
}

/// CPU-side copy of a mesh's decoded vertex and index data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuMirror {
    /// Interleaved f32 components.
    pub vertices: Vec<f32>,
    pub indices: IndexData,
}

/// Read the first three components of `usage`/`usage_index` for `vertex`
/// from interleaved `vertices`, padding missing components with zero.
pub fn read_attribute(
    declaration: &VertexDeclaration,
    vertices: &[f32],
    usage: VertexUsage,
    usage_index: u8,
    vertex: usize,
) -> Option<Vec3> {
    let element = declaration.find(usage, usage_index)?;
    let base = vertex * declaration.components_per_vertex() + (element.offset / 4) as usize;
    let components = element.component_count as usize;
    let slice = vertices.get(base..base + components)?;
    let mut out = [0.0f32; 3];
    for (dst, src) in out.iter_mut().zip(slice) {
        *dst = *src;
    }
    Some(Vec3::from_array(out))
}

/// All positions of interleaved `vertices`, in vertex order.
pub fn read_positions(declaration: &VertexDeclaration, vertices: &[f32]) -> Vec<Vec3> {
    let per_vertex = declaration.components_per_vertex();
    if per_vertex == 0 {
        return Vec::new();
    }
    (0..vertices.len() / per_vertex)
        .filter_map(|v| read_attribute(declaration, vertices, VertexUsage::Position, 0, v))
        .collect()
}

/// Box around the positions referenced by `indices[first..first + count]`.
pub fn index_range_bounds(
    positions: &[Vec3],
    indices: &IndexData,
    first: usize,
    count: usize,
) -> Aabb {
    Aabb::from_points(
        (first..first + count)
            .filter_map(|i| indices.get(i))
            .filter_map(|v| positions.get(v as usize).copied()),
    )
}

impl CpuMirror {
    /// See [`read_attribute`].
    pub fn attribute(
        &self,
        declaration: &VertexDeclaration,
        usage: VertexUsage,
        usage_index: u8,
        vertex: usize,
    ) -> Option<Vec3> {
        read_attribute(declaration, &self.vertices, usage, usage_index, vertex)
    }

    /// All positions in vertex order.
    pub fn positions(&self, declaration: &VertexDeclaration) -> Vec<Vec3> {
        read_positions(declaration, &self.vertices)
    }
}

/// One mesh as produced by a decoder, before GPU upload.
#[derive(Debug, Clone, Default)]
pub struct MeshSource {
    pub name: String,
    pub declaration: VertexDeclaration,
    /// Interleaved f32 components, `None` for empty geometry.
    pub vertices: Option<Vec<f32>>,
    pub indices: IndexData,
    pub areas: Vec<AreaSource>,
    pub bone_bindings: Vec<String>,
}

impl MeshSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        let per_vertex = self.declaration.components_per_vertex();
        match (&self.vertices, per_vertex) {
            (Some(vertices), n) if n > 0 => vertices.len() / n,
            _ => 0,
        }
    }
}

/// A GPU-resident mesh owned by a geometry resource.
#[derive(Debug)]
pub struct Mesh {
    name: String,
    declaration: VertexDeclaration,
    vertex_buffer: Option<BufferHandle>,
    index_buffer: Option<BufferHandle>,
    index_format: IndexFormat,
    areas: Vec<MeshArea>,
    mirror: Option<CpuMirror>,
    bone_bindings: Vec<String>,
    bone_bounds: HashMap<String, Aabb>,
    vertex_count: usize,
    index_count: usize,
    /// Box around every vertex, taken at upload while the mirror exists.
    vertex_bounds: Aabb,
    bounds: Aabb,
    bounds_dirty: bool,
}

impl Mesh {
    /// Upload a decoded mesh: validate it, compute missing area bounds from
    /// the raw data and create the vertex and index buffers.
    ///
    /// The returned mesh keeps its CPU mirror; callers release it according
    /// to their mirror policy.
    pub fn upload(
        device: &dyn GraphicsDevice,
        path: &str,
        source: MeshSource,
        validate_indices: bool,
    ) -> GeometryResult<Self> {
        let vertex_count = source.vertex_count();
        let per_vertex = source.declaration.components_per_vertex();
        let vertices = source.vertices.unwrap_or_default();
        if per_vertex > 0 && vertices.len() % per_vertex != 0 {
            return Err(GeometryError::invalid_data(
                path,
                format!(
                    "mesh '{}' has {} vertex components, not a multiple of {}",
                    source.name,
                    vertices.len(),
                    per_vertex
                ),
            ));
        }
        if validate_indices {
            if let Some(bad) = source.indices.iter().find(|&i| i as usize >= vertex_count) {
                return Err(GeometryError::invalid_data(
                    path,
                    format!(
                        "mesh '{}' index {} out of range ({} vertices)",
                        source.name, bad, vertex_count
                    ),
                ));
            }
        }

        let index_format = source.indices.format();
        let index_count = source.indices.len();
        let mirror = CpuMirror {
            vertices,
            indices: source.indices,
        };
        let positions = mirror.positions(&source.declaration);
        let vertex_bounds = Aabb::from_points(positions.iter().copied());

        let mut areas = Vec::with_capacity(source.areas.len());
        for area in source.areas {
            let end = area.first_index as usize + area.index_count as usize;
            if end > index_count {
                return Err(GeometryError::invalid_data(
                    path,
                    format!(
                        "mesh '{}' area '{}' ends at index {} past {} indices",
                        source.name, area.name, end, index_count
                    ),
                ));
            }
            let bounds = area.bounds.unwrap_or_else(|| {
                index_range_bounds(
                    &positions,
                    &mirror.indices,
                    area.first_index as usize,
                    area.index_count as usize,
                )
            });
            areas.push(MeshArea {
                start: area.first_index * index_format.size() as u32,
                count: area.index_count,
                name: area.name,
                bounds,
            });
        }

        let vertex_buffer = if mirror.vertices.is_empty() {
            log::warn!("{}: mesh '{}' has no vertices", path, source.name);
            None
        } else {
            let bytes: &[u8] = bytemuck::cast_slice(&mirror.vertices);
            Some(device.create_buffer(
                &BufferDescriptor {
                    label: Some(format!("{}:{}:vertices", path, source.name)),
                    size: bytes.len() as u64,
                    usage: BufferUsage::Vertex,
                },
                bytes,
            )?)
        };

        let index_buffer = if mirror.indices.is_empty() {
            None
        } else {
            let bytes = mirror.indices.as_bytes();
            let created = device.create_buffer(
                &BufferDescriptor {
                    label: Some(format!("{}:{}:indices", path, source.name)),
                    size: bytes.len() as u64,
                    usage: BufferUsage::Index,
                },
                bytes,
            );
            match created {
                Ok(buffer) => Some(buffer),
                Err(err) => {
                    if let Some(buffer) = vertex_buffer {
                        device.destroy_buffer(buffer);
                    }
                    return Err(err.into());
                }
            }
        };

        Ok(Self {
            name: source.name,
            declaration: source.declaration,
            vertex_buffer,
            index_buffer,
            index_format,
            areas,
            mirror: Some(mirror),
            bone_bindings: source.bone_bindings,
            bone_bounds: HashMap::new(),
            vertex_count,
            index_count,
            vertex_bounds,
            bounds: Aabb::EMPTY,
            bounds_dirty: true,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaration(&self) -> &VertexDeclaration {
        &self.declaration
    }

    pub fn vertex_buffer(&self) -> Option<BufferHandle> {
        self.vertex_buffer
    }

    pub fn index_buffer(&self) -> Option<BufferHandle> {
        self.index_buffer
    }

    /// Stored index width, fixed at upload.
    pub fn index_format(&self) -> IndexFormat {
        self.index_format
    }

    pub fn areas(&self) -> &[MeshArea] {
        &self.areas
    }

    pub fn bone_bindings(&self) -> &[String] {
        &self.bone_bindings
    }

    /// Per-bone bounds computed by the last bounds rebuild.
    pub fn bone_bounds(&self, bone: &str) -> Option<&Aabb> {
        self.bone_bounds.get(bone)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }

    /// Number of triangles in the index buffer.
    pub fn face_count(&self) -> usize {
        self.index_count / 3
    }

    pub fn mirror(&self) -> Option<&CpuMirror> {
        self.mirror.as_ref()
    }

    pub fn has_mirror(&self) -> bool {
        self.mirror.is_some()
    }

    /// Drop the CPU mirror. Bounds already computed are kept.
    pub fn release_mirror(&mut self) {
        if self.mirror.take().is_some() {
            log::debug!("Released CPU mirror of mesh '{}'", self.name);
        }
    }

    /// Whether the GPU buffers are alive.
    pub fn is_uploaded(&self) -> bool {
        self.vertex_buffer.is_some() || self.index_buffer.is_some()
    }

    pub fn is_bounds_dirty(&self) -> bool {
        self.bounds_dirty
    }

    /// Mark the cached bounds stale; the owning resource picks this up at
    /// its next bounds check.
    pub fn invalidate_bounds(&mut self) {
        self.bounds_dirty = true;
    }

    /// Cached bounds as of the last rebuild.
    pub fn bounding_box(&self) -> Aabb {
        self.bounds
    }

    /// Recompute the mesh box and the per-bone table.
    ///
    /// The box is the union of area boxes. A mesh without areas falls back
    /// to its mirrored positions, or to the box taken at upload once the
    /// mirror is gone.
    pub fn rebuild_bounds(&mut self) -> Aabb {
        self.bounds = if self.areas.is_empty() {
            if let Some(mirror) = &self.mirror {
                self.vertex_bounds = Aabb::from_points(mirror.positions(&self.declaration));
            }
            self.vertex_bounds
        } else {
            self.areas
                .iter()
                .fold(Aabb::EMPTY, |acc, area| acc.union(&area.bounds))
        };
        self.rebuild_bone_bounds();
        self.bounds_dirty = false;
        self.bounds
    }

    fn rebuild_bone_bounds(&mut self) {
        let Some(mirror) = &self.mirror else {
            return;
        };
        let declaration = &self.declaration;
        let (Some(indices), Some(weights)) = (
            declaration.find(VertexUsage::BlendIndices, 0),
            declaration.find(VertexUsage::BlendWeight, 0),
        ) else {
            return;
        };
        let per_vertex = declaration.components_per_vertex();
        let influences = indices.component_count.min(weights.component_count) as usize;
        let (index_offset, weight_offset) = ((indices.offset / 4) as usize, (weights.offset / 4) as usize);

        self.bone_bounds.clear();
        for vertex in 0..self.vertex_count {
            let Some(position) = mirror.attribute(declaration, VertexUsage::Position, 0, vertex) else {
                continue;
            };
            let base = vertex * per_vertex;
            for influence in 0..influences {
                let weight = mirror.vertices.get(base + weight_offset + influence).copied();
                let bone = mirror.vertices.get(base + index_offset + influence).copied();
                let (Some(weight), Some(bone)) = (weight, bone) else {
                    continue;
                };
                if weight <= 0.0 || bone < 0.0 {
                    continue;
                }
                if let Some(name) = self.bone_bindings.get(bone as usize) {
                    let entry = self.bone_bounds.entry(name.clone()).or_insert(Aabb::EMPTY);
                    *entry = entry.with_point(position);
                }
            }
        }
    }

    /// Mirrored positions transformed to world space.
    pub fn world_positions(&self, world: &Mat4) -> Option<Vec<Vec3>> {
        let mirror = self.mirror.as_ref()?;
        Some(
            mirror
                .positions(&self.declaration)
                .into_iter()
                .map(|p| world.transform_point3(p))
                .collect(),
        )
    }

    /// Index of the area containing index number `index`.
    pub fn area_of_index(&self, index: u32) -> Option<usize> {
        self.areas
            .iter()
            .position(|area| area.contains_index(self.index_format, index))
    }

    /// Destroy the GPU buffers. Calling it again is a no-op.
    pub fn unload(&mut self, device: &dyn GraphicsDevice) {
        if let Some(buffer) = self.vertex_buffer.take() {
            device.destroy_buffer(buffer);
        }
        if let Some(buffer) = self.index_buffer.take() {
            device.destroy_buffer(buffer);
        }
    }
}
