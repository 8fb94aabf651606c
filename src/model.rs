//! Skeletal models and mesh binding.
//!
//! A [`GeometryModel`] owns its bones and the [`MeshBinding`]s that tie
//! meshes of the same resource to those bones. Bindings refer to meshes by
//! [`MeshId`] and to bones by [`BoneId`], never by owning references.

use glam::Mat3;

use crate::error::{GeometryError, GeometryResult};
use crate::math::{Aabb, Mat4, Quat, Vec3};
use crate::mesh::{Mesh, MeshId};

/// Non-owning handle to a bone: its index in the owning model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoneId(pub usize);

/// A bone of a skeletal model.
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    pub parent: Option<BoneId>,
    pub position: Vec3,
    pub orientation: Quat,
    pub scale_shear: Mat3,
    /// Bounds of the vertices this bone influences, set by mesh binding.
    pub bounding_box: Option<Aabb>,
}

impl Bone {
    pub fn new(name: impl Into<String>, parent: Option<BoneId>) -> Self {
        Self {
            name: name.into(),
            parent,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            scale_shear: Mat3::IDENTITY,
            bounding_box: None,
        }
    }

    /// Local transform: translation * rotation * scale/shear.
    pub fn local_transform(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * Mat4::from_quat(self.orientation)
            * Mat4::from_mat3(self.scale_shear)
    }
}

/// Ties one mesh to an ordered list of model bones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshBinding {
    pub mesh: MeshId,
    /// One entry per mesh bone binding name, in the same order.
    pub bones: Vec<BoneId>,
}

/// A skeletal model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryModel {
    name: String,
    bones: Vec<Bone>,
    mesh_bindings: Vec<MeshBinding>,
}

impl GeometryModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a bone and return its handle.
    pub fn add_bone(&mut self, bone: Bone) -> BoneId {
        self.bones.push(bone);
        BoneId(self.bones.len() - 1)
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone(&self, id: BoneId) -> Option<&Bone> {
        self.bones.get(id.0)
    }

    pub fn find_bone_by_name(&self, name: &str) -> Option<BoneId> {
        self.bones.iter().position(|b| b.name == name).map(BoneId)
    }

    pub fn mesh_bindings(&self) -> &[MeshBinding] {
        &self.mesh_bindings
    }

    /// World-from-bone transform of `id`, walking the parent chain.
    pub fn bone_world_transform(&self, id: BoneId) -> Option<Mat4> {
        let mut transform = self.bone(id)?.local_transform();
        let mut parent = self.bone(id)?.parent;
        // A malformed parent chain can't be longer than the bone list.
        let mut steps = 0;
        while let Some(parent_id) = parent {
            let bone = self.bone(parent_id)?;
            transform = bone.local_transform() * transform;
            parent = bone.parent;
            steps += 1;
            if steps > self.bones.len() {
                return None;
            }
        }
        Some(transform)
    }
}

/// A decoded model plus the meshes it should be bound to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelSource {
    pub model: GeometryModel,
    pub meshes: Vec<MeshId>,
}

/// Resolve every bone binding name of `mesh` against `model` and append a
/// [`MeshBinding`].
///
/// Fails with [`GeometryError::BoneNameInvalid`] on the first unknown name,
/// leaving the model untouched. On success each resolved bone receives the
/// mesh's per-bone bounds when the mesh computed them.
pub fn bind_mesh_to_model(
    path: &str,
    mesh_id: MeshId,
    mesh: &Mesh,
    model: &mut GeometryModel,
) -> GeometryResult<()> {
    let bones = mesh
        .bone_bindings()
        .iter()
        .map(|name| {
            model
                .find_bone_by_name(name)
                .ok_or_else(|| GeometryError::BoneNameInvalid {
                    path: path.to_string(),
                    mesh: mesh.name().to_string(),
                    bone: name.clone(),
                    model: model.name.clone(),
                })
        })
        .collect::<GeometryResult<Vec<_>>>()?;

    for (name, id) in mesh.bone_bindings().iter().zip(&bones) {
        if let Some(bounds) = mesh.bone_bounds(name) {
            model.bones[id.0].bounding_box = Some(*bounds);
        }
    }
    log::debug!(
        "{}: bound mesh '{}' to model '{}' ({} bones)",
        path,
        mesh.name(),
        model.name,
        bones.len()
    );
    model.mesh_bindings.push(MeshBinding {
        mesh: mesh_id,
        bones,
    });
    Ok(())
}
