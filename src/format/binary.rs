//! The `gr2` binary geometry container.
//!
//! Little-endian throughout, strings are `[len:u16][utf8]`:
//!
//! ```text
//! [version:u8] [meshCount:u8]
//!   mesh: [name] [vertex block] [index block]
//!         [areaCount:u8] area: [name] [firstIndex:u32] [triangleCount:u32] [min:f32x3] [max:f32x3]
//!         [boneBindingCount:u8] [boneName]...
//! [modelCount:u8]
//!   model: [name] [boneCount:u8]
//!          bone: [name] [parent:u8, 255 = root] [flags:u8]
//!                [position:f32x3 if flags&1] [orientation:f32x4 if flags&2]
//!                [scaleShear:f32x9 if flags&4]
//!          [meshBindingCount:u8] [meshIndex:u8]...
//! [animationCount:u8]
//!   animation: [name] [duration:f32] [groupCount:u8]
//!              group: [name] [trackCount:u8]
//!                     track: [name] [orientation curve] [position curve] [scaleShear curve]
//! ```

use glam::Mat3;

use crate::animation::{Animation, TrackGroup, TransformTrack};
use crate::decoder::{
    decode_curve, decode_index_buffer, decode_vertex_buffer, BinaryReader, BinaryWriter,
};
use crate::error::{GeometryError, GeometryResult};
use crate::math::{Aabb, Quat, Vec3};
use crate::mesh::{
    index_range_bounds, read_positions, AreaSource, MeshId, MeshSource, VertexDeclaration,
};
use crate::model::{Bone, BoneId, GeometryModel, ModelSource};

use super::{DecodedGeometry, DecoderOutput, GeometryDecoder, ResponseType};

/// Newest container version understood by the decoder.
pub const FORMAT_VERSION: u8 = 1;

const ROOT_PARENT: u8 = 255;
const BONE_HAS_POSITION: u8 = 1;
const BONE_HAS_ORIENTATION: u8 = 2;
const BONE_HAS_SCALE_SHEAR: u8 = 4;

/// Decoder for `.gr2` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinaryGeometryDecoder;

impl GeometryDecoder for BinaryGeometryDecoder {
    fn name(&self) -> &str {
        "gr2"
    }

    fn supports_extension(&self, extension: &str) -> bool {
        extension == "gr2"
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::ArrayBuffer
    }

    fn decode(&self, path: &str, data: &[u8]) -> GeometryResult<DecoderOutput> {
        decode_geometry(path, data).map(DecoderOutput::Structured)
    }
}

/// Decode a whole container.
pub fn decode_geometry(path: &str, data: &[u8]) -> GeometryResult<DecodedGeometry> {
    let mut reader = BinaryReader::new(data, path);
    let version = reader.read_u8()?;
    if version == 0 || version > FORMAT_VERSION {
        return Err(GeometryError::invalid_data(
            path,
            format!("unsupported container version {}", version),
        ));
    }

    let mesh_count = reader.read_u8()? as usize;
    let meshes = (0..mesh_count)
        .map(|_| read_mesh(&mut reader))
        .collect::<GeometryResult<Vec<_>>>()?;

    let model_count = reader.read_u8()? as usize;
    let models = (0..model_count)
        .map(|_| read_model(&mut reader, mesh_count))
        .collect::<GeometryResult<Vec<_>>>()?;

    let animation_count = reader.read_u8()? as usize;
    let animations = (0..animation_count)
        .map(|_| read_animation(&mut reader))
        .collect::<GeometryResult<Vec<_>>>()?;

    if !reader.is_at_end() {
        log::warn!(
            "{}: {} trailing bytes after geometry data",
            path,
            reader.remaining()
        );
    }

    Ok(DecodedGeometry {
        meshes,
        models,
        animations,
    })
}

fn read_mesh(reader: &mut BinaryReader<'_>) -> GeometryResult<MeshSource> {
    let name = reader.read_string()?;
    let mut declaration = VertexDeclaration::new();
    let vertices = decode_vertex_buffer(reader, &mut declaration)?;
    let indices = decode_index_buffer(reader)?;

    let area_count = reader.read_u8()?;
    let mut areas = Vec::with_capacity(area_count as usize);
    for _ in 0..area_count {
        let area_name = reader.read_string()?;
        let first_index = reader.read_u32()?;
        let triangle_count = reader.read_u32()?;
        let min = reader.read_vec3()?;
        let max = reader.read_vec3()?;
        let index_count = triangle_count.checked_mul(3).ok_or_else(|| {
            GeometryError::invalid_data(
                reader.path(),
                format!("area '{}' triangle count {} overflows", area_name, triangle_count),
            )
        })?;
        areas.push(AreaSource::new(area_name, first_index, index_count).with_bounds(Aabb::new(min, max)));
    }

    let bone_count = reader.read_u8()?;
    let bone_bindings = (0..bone_count)
        .map(|_| reader.read_string())
        .collect::<GeometryResult<Vec<_>>>()?;

    Ok(MeshSource {
        name,
        declaration,
        vertices,
        indices,
        areas,
        bone_bindings,
    })
}

fn read_model(reader: &mut BinaryReader<'_>, mesh_count: usize) -> GeometryResult<ModelSource> {
    let mut model = GeometryModel::new(reader.read_string()?);
    let bone_count = reader.read_u8()? as usize;
    for index in 0..bone_count {
        let mut bone = Bone::new(reader.read_string()?, None);
        let parent = reader.read_u8()?;
        if parent != ROOT_PARENT {
            if parent as usize >= index {
                return Err(GeometryError::invalid_data(
                    reader.path(),
                    format!(
                        "model '{}' bone '{}' has parent {} which is not an earlier bone",
                        model.name(),
                        bone.name,
                        parent
                    ),
                ));
            }
            bone.parent = Some(BoneId(parent as usize));
        }
        let flags = reader.read_u8()?;
        if flags & BONE_HAS_POSITION != 0 {
            bone.position = reader.read_vec3()?;
        }
        if flags & BONE_HAS_ORIENTATION != 0 {
            let q = reader.read_f32_array(4)?;
            bone.orientation = Quat::from_xyzw(q[0], q[1], q[2], q[3]);
        }
        if flags & BONE_HAS_SCALE_SHEAR != 0 {
            let m = reader.read_f32_array(9)?;
            let mut cols = [0.0f32; 9];
            cols.copy_from_slice(&m);
            bone.scale_shear = Mat3::from_cols_array(&cols);
        }
        model.add_bone(bone);
    }

    let binding_count = reader.read_u8()?;
    let mut meshes = Vec::with_capacity(binding_count as usize);
    for _ in 0..binding_count {
        let index = reader.read_u8()? as usize;
        if index >= mesh_count {
            return Err(GeometryError::MeshMissing {
                path: reader.path().to_string(),
                index,
                count: mesh_count,
            });
        }
        meshes.push(MeshId(index));
    }
    Ok(ModelSource { model, meshes })
}

fn read_animation(reader: &mut BinaryReader<'_>) -> GeometryResult<Animation> {
    let name = reader.read_string()?;
    let duration = reader.read_f32()?;
    let group_count = reader.read_u8()?;
    let mut groups = Vec::with_capacity(group_count as usize);
    for _ in 0..group_count {
        let group_name = reader.read_string()?;
        let track_count = reader.read_u8()?;
        let mut tracks = Vec::with_capacity(track_count as usize);
        for _ in 0..track_count {
            tracks.push(TransformTrack {
                name: reader.read_string()?,
                orientation: decode_curve(reader)?,
                position: decode_curve(reader)?,
                scale_shear: decode_curve(reader)?,
            });
        }
        groups.push(TrackGroup {
            name: group_name,
            tracks,
        });
    }
    Ok(Animation {
        name,
        duration,
        groups,
    })
}

fn count_u8(path: &str, what: &str, count: usize) -> GeometryResult<u8> {
    u8::try_from(count).map_err(|_| {
        GeometryError::invalid_data(path, format!("too many {} ({}) for the container", what, count))
    })
}

/// Encode `geometry` as a container. Areas without bounds are written with
/// the box around the vertices they reference.
///
/// Areas are stored as triangle counts, so an area whose index count isn't
/// a multiple of three is rejected.
pub fn encode_geometry(geometry: &DecodedGeometry) -> GeometryResult<Vec<u8>> {
    const PATH: &str = "<encoder>";
    let mut writer = BinaryWriter::new();
    writer
        .write_u8(FORMAT_VERSION)
        .write_u8(count_u8(PATH, "meshes", geometry.meshes.len())?);

    for mesh in &geometry.meshes {
        writer.write_string(&mesh.name);
        writer.write_vertex_block(&mesh.declaration, mesh.vertices.as_deref())?;
        writer.write_index_block(&mesh.indices);
        writer.write_u8(count_u8(PATH, "areas", mesh.areas.len())?);
        let positions = read_positions(&mesh.declaration, mesh.vertices.as_deref().unwrap_or(&[]));
        for area in &mesh.areas {
            if area.index_count % 3 != 0 {
                return Err(GeometryError::invalid_data(
                    PATH,
                    format!(
                        "mesh '{}' area '{}' has {} indices, not whole triangles",
                        mesh.name, area.name, area.index_count
                    ),
                ));
            }
            let bounds = area.bounds.unwrap_or_else(|| {
                index_range_bounds(
                    &positions,
                    &mesh.indices,
                    area.first_index as usize,
                    area.index_count as usize,
                )
            });
            writer
                .write_string(&area.name)
                .write_u32(area.first_index)
                .write_u32(area.index_count / 3)
                .write_vec3(bounds.min)
                .write_vec3(bounds.max);
        }
        writer.write_u8(count_u8(PATH, "bone bindings", mesh.bone_bindings.len())?);
        for bone in &mesh.bone_bindings {
            writer.write_string(bone);
        }
    }

    writer.write_u8(count_u8(PATH, "models", geometry.models.len())?);
    for source in &geometry.models {
        let model = &source.model;
        writer
            .write_string(model.name())
            .write_u8(count_u8(PATH, "bones", model.bones().len())?);
        for bone in model.bones() {
            let parent = match bone.parent {
                Some(BoneId(id)) => count_u8(PATH, "bones", id)?,
                None => ROOT_PARENT,
            };
            let mut flags = 0;
            if bone.position != Vec3::ZERO {
                flags |= BONE_HAS_POSITION;
            }
            if bone.orientation != Quat::IDENTITY {
                flags |= BONE_HAS_ORIENTATION;
            }
            if bone.scale_shear != Mat3::IDENTITY {
                flags |= BONE_HAS_SCALE_SHEAR;
            }
            writer.write_string(&bone.name).write_u8(parent).write_u8(flags);
            if flags & BONE_HAS_POSITION != 0 {
                writer.write_vec3(bone.position);
            }
            if flags & BONE_HAS_ORIENTATION != 0 {
                for value in bone.orientation.to_array() {
                    writer.write_f32(value);
                }
            }
            if flags & BONE_HAS_SCALE_SHEAR != 0 {
                for value in bone.scale_shear.to_cols_array() {
                    writer.write_f32(value);
                }
            }
        }
        writer.write_u8(count_u8(PATH, "mesh bindings", source.meshes.len())?);
        for mesh in &source.meshes {
            writer.write_u8(count_u8(PATH, "meshes", mesh.0)?);
        }
    }

    writer.write_u8(count_u8(PATH, "animations", geometry.animations.len())?);
    for animation in &geometry.animations {
        writer
            .write_string(&animation.name)
            .write_f32(animation.duration)
            .write_u8(count_u8(PATH, "track groups", animation.groups.len())?);
        for group in &animation.groups {
            writer
                .write_string(&group.name)
                .write_u8(count_u8(PATH, "tracks", group.tracks.len())?);
            for track in &group.tracks {
                writer
                    .write_string(&track.name)
                    .write_curve(track.orientation.as_ref())
                    .write_curve(track.position.as_ref())
                    .write_curve(track.scale_shear.as_ref());
            }
        }
    }
    Ok(writer.into_bytes())
}
