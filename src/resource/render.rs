//! Area batch rendering.
//!
//! Renders a contiguous range of mesh areas with as few draw calls as
//! possible: consecutive areas whose index ranges touch in the index buffer
//! are merged into one run.
//!
//! Per effect pass the renderer applies the pass, binds the mesh buffers and
//! the subset of the vertex declaration the pass consumes, applies pending
//! render state, then issues one draw per run.

use crate::backend::{
    BufferHandle, DrawCall, Effect, GraphicsDevice, PassInput, PrimitiveTopology,
};
use crate::error::{GeometryError, GeometryResult};
use crate::mesh::{IndexFormat, Mesh, MeshArea, PartialBinding, VertexDeclaration};

use super::{GeometryResource, ResourceState};

/// Vertex slot of the mesh vertex buffer.
const MESH_SLOT: u32 = 0;
/// Vertex slot of the instance buffer.
const INSTANCE_SLOT: u32 = 1;

/// One merged draw: `count` indices starting at byte offset `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRun {
    pub start: u32,
    pub count: u32,
}

/// Per-instance data for [`GeometryResource::render_areas_instanced`].
#[derive(Debug, Clone, Copy)]
pub struct InstanceData<'a> {
    pub buffer: BufferHandle,
    pub declaration: &'a VertexDeclaration,
    pub count: u32,
}

/// Merge `areas` into draw runs.
///
/// An area extends the current run when it starts exactly where the run
/// ends, `start + count * index_width` bytes in.
pub fn merge_area_runs(areas: &[MeshArea], format: IndexFormat) -> Vec<DrawRun> {
    let width = format.size() as u32;
    let mut runs = Vec::new();
    let mut areas = areas.iter();
    let Some(first) = areas.next() else {
        return runs;
    };
    let mut run = DrawRun {
        start: first.start,
        count: first.count,
    };
    for area in areas {
        if area.start == run.start + run.count * width {
            run.count += area.count;
        } else {
            runs.push(run);
            run = DrawRun {
                start: area.start,
                count: area.count,
            };
        }
    }
    runs.push(run);
    runs
}

impl GeometryResource {
    /// Draw areas `first_area..first_area + area_count` of mesh `mesh_index`
    /// as triangles, once per pass of `technique` (the effect default when
    /// `None`).
    ///
    /// An out-of-range mesh index falls back to mesh 0. Returns `Ok(false)`
    /// when nothing could be drawn (resource not ready, no passes, no mesh)
    /// and an error when the area range or the pass inputs don't fit the mesh.
    pub fn render_areas(
        &mut self,
        mesh_index: usize,
        first_area: usize,
        area_count: usize,
        effect: &dyn Effect,
        technique: Option<&str>,
    ) -> GeometryResult<bool> {
        self.render(
            mesh_index,
            first_area,
            area_count,
            effect,
            technique,
            PrimitiveTopology::TriangleList,
            None,
        )
    }

    /// Same as [`render_areas`](Self::render_areas) with line primitives.
    pub fn render_lines(
        &mut self,
        mesh_index: usize,
        first_area: usize,
        area_count: usize,
        effect: &dyn Effect,
        technique: Option<&str>,
    ) -> GeometryResult<bool> {
        self.render(
            mesh_index,
            first_area,
            area_count,
            effect,
            technique,
            PrimitiveTopology::LineList,
            None,
        )
    }

    /// Instanced variant of [`render_areas`](Self::render_areas).
    ///
    /// Pass inputs missing from the mesh declaration are taken from the
    /// instance declaration with an instance divisor of 1. An out-of-range
    /// mesh index returns `Ok(false)`.
    pub fn render_areas_instanced(
        &mut self,
        mesh_index: usize,
        first_area: usize,
        area_count: usize,
        effect: &dyn Effect,
        technique: Option<&str>,
        instances: &InstanceData<'_>,
    ) -> GeometryResult<bool> {
        self.render(
            mesh_index,
            first_area,
            area_count,
            effect,
            technique,
            PrimitiveTopology::TriangleList,
            Some(instances),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn render(
        &mut self,
        mesh_index: usize,
        first_area: usize,
        area_count: usize,
        effect: &dyn Effect,
        technique: Option<&str>,
        topology: PrimitiveTopology,
        instances: Option<&InstanceData<'_>>,
    ) -> GeometryResult<bool> {
        self.keep_alive();
        if self.state != ResourceState::Ready {
            return Ok(false);
        }
        let technique = technique.unwrap_or_else(|| effect.default_technique());
        let pass_count = effect.pass_count(technique);
        if pass_count == 0 {
            return Ok(false);
        }

        let mesh_index = if mesh_index < self.meshes.len() {
            mesh_index
        } else if instances.is_some() || self.meshes.is_empty() {
            return Ok(false);
        } else {
            0
        };
        let mesh = &self.meshes[mesh_index];

        let end = first_area.saturating_add(area_count);
        if end > mesh.areas().len() {
            return Err(GeometryError::AreaMissing {
                path: self.path.clone(),
                mesh: mesh.name().to_string(),
                area: mesh.areas().len().max(first_area),
                available: mesh.areas().len(),
            });
        }
        if area_count == 0 {
            return Ok(false);
        }
        let (Some(vertex_buffer), Some(index_buffer)) = (mesh.vertex_buffer(), mesh.index_buffer())
        else {
            return Ok(false);
        };

        let runs = merge_area_runs(&mesh.areas()[first_area..end], mesh.index_format());
        let device = self.device.as_ref();
        for pass in 0..pass_count {
            effect.apply_pass(technique, pass);
            device.bind_vertex_buffer(MESH_SLOT, vertex_buffer);
            device.bind_index_buffer(index_buffer, mesh.index_format());

            let inputs = effect.pass_input(technique, pass);
            let divisors = match instances {
                None => {
                    if !mesh.declaration().set_declaration(device, MESH_SLOT, &inputs) {
                        return Err(self.binding_error(mesh, pass));
                    }
                    None
                }
                Some(instances) => match bind_instanced(device, mesh, instances, &inputs) {
                    Some(binding) => Some(binding),
                    None => return Err(self.binding_error(mesh, pass)),
                },
            };

            device.apply_render_state();
            let instance_count = instances.map_or(1, |i| i.count);
            for run in &runs {
                device.draw_indexed(&DrawCall {
                    topology,
                    index_format: mesh.index_format(),
                    byte_offset: run.start,
                    index_count: run.count,
                    instance_count,
                });
            }
            if let Some(binding) = divisors {
                VertexDeclaration::reset_instance_divisors(device, &binding);
            }
        }
        Ok(true)
    }

    fn binding_error(&self, mesh: &Mesh, pass: usize) -> GeometryError {
        log::error!(
            "{}: pass {} inputs don't match mesh '{}', draw aborted",
            self.path,
            pass,
            mesh.name()
        );
        GeometryError::EffectBinding {
            path: self.path.clone(),
            mesh: mesh.name().to_string(),
            pass,
            stride: mesh.declaration().stride(),
        }
    }
}

/// Bind mesh and instance declarations for one pass. Returns the instance
/// binding whose divisors must be reset, or `None` if some input is
/// provided by neither declaration.
fn bind_instanced(
    device: &dyn GraphicsDevice,
    mesh: &Mesh,
    instances: &InstanceData<'_>,
    inputs: &[PassInput],
) -> Option<PartialBinding> {
    let from_mesh = mesh
        .declaration()
        .set_partial_declaration(device, MESH_SLOT, inputs, 0);
    device.bind_vertex_buffer(INSTANCE_SLOT, instances.buffer);
    let from_instances =
        instances
            .declaration
            .set_partial_declaration(device, INSTANCE_SLOT, &from_mesh.missing, 1);
    if from_instances.missing.is_empty() {
        Some(from_instances)
    } else {
        VertexDeclaration::reset_instance_divisors(device, &from_instances);
        None
    }
}
