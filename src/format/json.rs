//! Structured (JSON) geometry documents.
//!
//! ```json
//! {
//!   "meshes": [{
//!     "name": "hull",
//!     "elements": [{"usage": "position", "usageIndex": 0, "components": 3}],
//!     "vertices": [0.0, 0.0, 0.0],
//!     "indices": [0, 1, 2],
//!     "areas": [{"name": "a", "firstIndex": 0, "indexCount": 3}],
//!     "boneBindings": []
//!   }],
//!   "models": [{"name": "m", "bones": [{"name": "root", "parent": null}], "meshes": ["hull"]}]
//! }
//! ```
//!
//! A mesh without `areas` gets a single area covering all of its indices.
//! Vertex data is always stored as f32.

use serde::{Deserialize, Serialize};

use crate::config::JsonOptions;
use crate::error::{GeometryError, GeometryResult};
use crate::math::{Quat, Vec3};
use crate::mesh::{
    AreaSource, ElementEncoding, IndexData, IndexFormat, MeshId, MeshSource, ScalarKind,
    VertexDeclaration, VertexUsage,
};
use crate::model::{Bone, GeometryModel, ModelSource};

use super::{DecodedGeometry, DecoderOutput, GeometryDecoder, ResponseType};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryDocument {
    #[serde(default)]
    pub meshes: Vec<MeshDocument>,
    #[serde(default)]
    pub models: Vec<ModelDocument>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshDocument {
    pub name: String,
    pub elements: Vec<ElementDocument>,
    #[serde(default)]
    pub vertices: Vec<f32>,
    #[serde(default)]
    pub indices: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub areas: Option<Vec<AreaDocument>>,
    #[serde(default)]
    pub bone_bindings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDocument {
    pub usage: String,
    #[serde(default)]
    pub usage_index: u8,
    pub components: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaDocument {
    pub name: String,
    pub first_index: u32,
    pub index_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDocument {
    pub name: String,
    #[serde(default)]
    pub bones: Vec<BoneDocument>,
    /// Names of the meshes bound to this model.
    #[serde(default)]
    pub meshes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoneDocument {
    pub name: String,
    /// Name of an earlier bone, `null` for roots.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<[f32; 4]>,
}

/// Produces geometry documents on demand, for runtime-generated resources.
///
/// A factory registered on a resource lets it regenerate its data from the
/// recorded [`JsonOptions`] instead of re-fetching bytes.
pub trait GeometryFactory: Send + Sync {
    fn create_document(&self, options: &JsonOptions) -> GeometryResult<serde_json::Value>;
}

/// Decoder for `.json` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonGeometryDecoder;

impl GeometryDecoder for JsonGeometryDecoder {
    fn name(&self) -> &str {
        "json"
    }

    fn supports_extension(&self, extension: &str) -> bool {
        extension == "json"
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::Json
    }

    fn decode(&self, path: &str, data: &[u8]) -> GeometryResult<DecoderOutput> {
        let document: GeometryDocument =
            serde_json::from_slice(data).map_err(|source| GeometryError::Json {
                path: path.to_string(),
                source,
            })?;
        decode_document(path, &document).map(DecoderOutput::Structured)
    }
}

/// Parse and convert an already-parsed JSON value.
pub fn decode_json_value(path: &str, value: &serde_json::Value) -> GeometryResult<DecodedGeometry> {
    let document = GeometryDocument::deserialize(value).map_err(|source| GeometryError::Json {
        path: path.to_string(),
        source,
    })?;
    decode_document(path, &document)
}

/// Convert a document into decoder output.
pub fn decode_document(path: &str, document: &GeometryDocument) -> GeometryResult<DecodedGeometry> {
    let meshes = document
        .meshes
        .iter()
        .map(|mesh| convert_mesh(path, mesh))
        .collect::<GeometryResult<Vec<_>>>()?;
    let models = document
        .models
        .iter()
        .map(|model| convert_model(path, model, &meshes))
        .collect::<GeometryResult<Vec<_>>>()?;
    Ok(DecodedGeometry {
        meshes,
        models,
        animations: Vec::new(),
    })
}

fn convert_mesh(path: &str, mesh: &MeshDocument) -> GeometryResult<MeshSource> {
    let mut declaration = VertexDeclaration::new();
    for element in &mesh.elements {
        let usage = VertexUsage::from_name(&element.usage).ok_or_else(|| {
            GeometryError::invalid_data(
                path,
                format!("mesh '{}' has unknown usage '{}'", mesh.name, element.usage),
            )
        })?;
        if !(1..=8).contains(&element.components) {
            return Err(GeometryError::invalid_data(
                path,
                format!(
                    "mesh '{}' element '{}' has {} components",
                    mesh.name, element.usage, element.components
                ),
            ));
        }
        declaration.push(
            usage,
            element.usage_index,
            ElementEncoding::new(ScalarKind::F32, false, element.components),
        );
    }

    let per_vertex = declaration.components_per_vertex();
    if per_vertex == 0 && !mesh.vertices.is_empty() {
        return Err(GeometryError::invalid_data(
            path,
            format!("mesh '{}' has vertex data but no elements", mesh.name),
        ));
    }
    let vertex_count = if per_vertex == 0 {
        0
    } else {
        mesh.vertices.len() / per_vertex
    };
    let format = IndexFormat::for_vertex_count(vertex_count);
    let indices = IndexData::from_u32(&mesh.indices, format).ok_or_else(|| {
        GeometryError::invalid_data(
            path,
            format!("mesh '{}' has indices past {} vertices", mesh.name, vertex_count),
        )
    })?;

    let areas = match &mesh.areas {
        Some(areas) => areas
            .iter()
            .map(|a| AreaSource::new(a.name.clone(), a.first_index, a.index_count))
            .collect(),
        None => vec![AreaSource::new(mesh.name.clone(), 0, mesh.indices.len() as u32)],
    };

    Ok(MeshSource {
        name: mesh.name.clone(),
        declaration,
        vertices: (!mesh.vertices.is_empty()).then(|| mesh.vertices.clone()),
        indices,
        areas,
        bone_bindings: mesh.bone_bindings.clone(),
    })
}

fn convert_model(
    path: &str,
    document: &ModelDocument,
    meshes: &[MeshSource],
) -> GeometryResult<ModelSource> {
    let mut model = GeometryModel::new(document.name.clone());
    for bone_document in &document.bones {
        let parent = match &bone_document.parent {
            Some(name) => Some(model.find_bone_by_name(name).ok_or_else(|| {
                GeometryError::invalid_data(
                    path,
                    format!(
                        "model '{}' bone '{}' has unknown parent '{}'",
                        document.name, bone_document.name, name
                    ),
                )
            })?),
            None => None,
        };
        let mut bone = Bone::new(bone_document.name.clone(), parent);
        if let Some(position) = bone_document.position {
            bone.position = Vec3::from_array(position);
        }
        if let Some(orientation) = bone_document.orientation {
            bone.orientation = Quat::from_array(orientation);
        }
        model.add_bone(bone);
    }

    let bound = document
        .meshes
        .iter()
        .map(|name| {
            meshes
                .iter()
                .position(|m| &m.name == name)
                .map(MeshId)
                .ok_or_else(|| {
                    GeometryError::invalid_data(
                        path,
                        format!("model '{}' binds unknown mesh '{}'", document.name, name),
                    )
                })
        })
        .collect::<GeometryResult<Vec<_>>>()?;

    Ok(ModelSource {
        model,
        meshes: bound,
    })
}
