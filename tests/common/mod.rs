//! Shared fixtures for the integration tests.
//!
//! Asset builders go through the real encoders so that tests exercise the
//! same bytes a tool would produce.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use geometry_resource::backend::DummyDevice;
use geometry_resource::config::JsonOptions;
use geometry_resource::format::{
    encode_geometry, DecodedGeometry, DecoderOutput, DecoderRegistry, GeometryDecoder,
    GeometryFactory, ResponseType,
};
use geometry_resource::math::{Aabb, Vec3};
use geometry_resource::mesh::{
    AreaSource, ElementEncoding, IndexData, MeshId, MeshSource, ScalarKind, VertexDeclaration,
    VertexUsage,
};
use geometry_resource::model::{Bone, GeometryModel, ModelSource};
use geometry_resource::resource::{load_ticket, LoadMetadata, LoadTicket, ResourceLoader};
use geometry_resource::{GeometryResource, GeometryResult};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn position_declaration() -> VertexDeclaration {
    VertexDeclaration::from_encodings([(
        VertexUsage::Position,
        0,
        ElementEncoding::new(ScalarKind::F32, false, 3),
    )])
}

/// A strip of `quads` unit quads along +X; two triangles per quad, one area
/// per quad.
pub fn quad_strip(name: &str, quads: usize) -> MeshSource {
    let mut mesh = MeshSource::new(name);
    mesh.declaration = position_declaration();
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for q in 0..quads {
        let x = q as f32;
        let base = (q * 4) as u16;
        vertices.extend_from_slice(&[
            x, 0.0, 0.0, //
            x + 1.0, 0.0, 0.0, //
            x + 1.0, 1.0, 0.0, //
            x, 1.0, 0.0,
        ]);
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        mesh.areas.push(AreaSource::new(format!("quad{q}"), (q * 6) as u32, 6));
    }
    mesh.vertices = Some(vertices);
    mesh.indices = IndexData::U16(indices);
    mesh
}

/// Areas laid out as `(byte start, index count)` = (0,10), (20,5), (30,8),
/// (100,4) in a 16-bit index buffer. Index counts aren't triangle multiples,
/// which `gr2` can't store, so the mesh is served through a by-mesh decoder.
pub fn gapped_areas_mesh() -> MeshSource {
    let mut mesh = MeshSource::new("gapped");
    mesh.declaration = position_declaration();
    let vertex_count = 60;
    mesh.vertices = Some(
        (0..vertex_count)
            .flat_map(|i| [i as f32, (i % 7) as f32, 0.0])
            .collect(),
    );
    mesh.indices = IndexData::U16((0..60u16).collect());
    mesh.areas = vec![
        AreaSource::new("a", 0, 10),
        AreaSource::new("b", 10, 5),
        AreaSource::new("c", 15, 8),
        AreaSource::new("d", 50, 4),
    ];
    mesh
}

/// Same area layout as [`gapped_areas_mesh`] in index units, with 32-bit
/// indices.
pub fn wide_index_mesh() -> MeshSource {
    let mut mesh = gapped_areas_mesh();
    mesh.name = "wide".into();
    mesh.indices = IndexData::U32((0..60u32).collect());
    mesh
}

/// A two-bone skinned triangle bound by bone names.
pub fn skinned_triangle(bones: &[&str]) -> MeshSource {
    let mut mesh = MeshSource::new("body");
    mesh.declaration = VertexDeclaration::from_encodings([
        (VertexUsage::Position, 0, ElementEncoding::new(ScalarKind::F32, false, 3)),
        (VertexUsage::BlendIndices, 0, ElementEncoding::new(ScalarKind::U8, false, 1)),
        (VertexUsage::BlendWeight, 0, ElementEncoding::new(ScalarKind::U8, true, 1)),
    ]);
    mesh.vertices = Some(vec![
        0.0, 0.0, 0.0, 0.0, 1.0, //
        2.0, 0.0, 0.0, 0.0, 1.0, //
        0.0, 3.0, 0.0, 1.0, 1.0,
    ]);
    mesh.indices = IndexData::U16(vec![0, 1, 2]);
    mesh.areas = vec![AreaSource::new("skin", 0, 3)];
    mesh.bone_bindings = bones.iter().map(|s| s.to_string()).collect();
    mesh
}

pub fn skeleton(name: &str) -> GeometryModel {
    let mut model = GeometryModel::new(name);
    let root = model.add_bone(Bone::new("root", None));
    model.add_bone(Bone::new("arm", Some(root)));
    model
}

/// A `gr2` asset with one strip mesh and one skinned mesh bound to a model.
pub fn ship_asset(bones: &[&str]) -> Vec<u8> {
    encode_geometry(&DecodedGeometry {
        meshes: vec![quad_strip("hull", 3), skinned_triangle(bones)],
        models: vec![ModelSource {
            model: skeleton("ship"),
            meshes: vec![MeshId(1)],
        }],
        animations: Vec::new(),
    })
    .expect("encode ship asset")
}

pub fn strip_asset(quads: usize) -> Vec<u8> {
    encode_geometry(&DecodedGeometry {
        meshes: vec![quad_strip("strip", quads)],
        ..Default::default()
    })
    .expect("encode strip asset")
}

/// A strip whose mesh has no areas; its box comes from the vertices alone.
pub fn area_less_strip_asset(quads: usize) -> Vec<u8> {
    let mut strip = quad_strip("strip", quads);
    strip.areas.clear();
    encode_geometry(&DecodedGeometry {
        meshes: vec![strip],
        ..Default::default()
    })
    .expect("encode area-less strip asset")
}

pub fn dummy_device() -> Arc<DummyDevice> {
    Arc::new(DummyDevice::new())
}

/// By-mesh decoder for `.mesh` paths serving fixed sources.
pub struct StaticMeshDecoder {
    pub meshes: Vec<MeshSource>,
}

impl GeometryDecoder for StaticMeshDecoder {
    fn name(&self) -> &str {
        "static-mesh"
    }

    fn supports_extension(&self, extension: &str) -> bool {
        extension == "mesh"
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::ArrayBuffer
    }

    fn decode(&self, _path: &str, _data: &[u8]) -> GeometryResult<DecoderOutput> {
        Ok(DecoderOutput::ByMesh(self.meshes.clone()))
    }
}

/// A prepared `.mesh` resource serving `meshes` through a private registry.
pub fn by_mesh_resource(
    device: Arc<DummyDevice>,
    meshes: Vec<MeshSource>,
) -> GeometryResource {
    let registry = Arc::new(DecoderRegistry::new());
    registry.register(Arc::new(StaticMeshDecoder { meshes }));
    let mut resource = GeometryResource::new("res:/test.mesh", device).with_registry(registry);
    resource
        .prepare(&[], Default::default())
        .expect("prepare by-mesh resource");
    resource
}

/// Loader answering every request from memory.
#[derive(Default)]
pub struct ScriptedLoader {
    /// `None` rejects every request.
    pub data: Option<Vec<u8>>,
    pub system_mirror: bool,
    pub loads: AtomicUsize,
    pub keep_alives: AtomicUsize,
    pub last_metadata: parking_lot::Mutex<Option<LoadMetadata>>,
}

impl ScriptedLoader {
    pub fn serving(data: Vec<u8>) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ResourceLoader for ScriptedLoader {
    fn is_system_mirror_enabled(&self) -> bool {
        self.system_mirror
    }

    fn load_resource(&self, _path: &str, metadata: &LoadMetadata) -> LoadTicket {
        self.loads.fetch_add(1, Ordering::SeqCst);
        *self.last_metadata.lock() = Some(metadata.clone());
        let (completer, ticket) = load_ticket();
        match &self.data {
            Some(data) => completer.resolve(data.clone()),
            None => completer.reject("not found"),
        }
        ticket
    }

    fn keep_alive(&self, _path: &str) {
        self.keep_alives.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory producing a single triangle offset along X by
/// `parameters.offset`.
#[derive(Default)]
pub struct TriangleFactory {
    pub calls: AtomicUsize,
}

impl GeometryFactory for TriangleFactory {
    fn create_document(&self, options: &JsonOptions) -> GeometryResult<serde_json::Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(triangle_document(
            options.parameters["offset"].as_f64().unwrap_or(0.0) as f32,
        ))
    }
}

pub fn triangle_document(offset: f32) -> serde_json::Value {
    serde_json::json!({
        "meshes": [{
            "name": "tri",
            "elements": [{"usage": "position", "components": 3}],
            "vertices": [offset, 0.0, 0.0, offset + 1.0, 0.0, 0.0, offset, 1.0, 0.0],
            "indices": [0, 1, 2]
        }]
    })
}

pub fn unit_box() -> Aabb {
    Aabb::new(Vec3::ZERO, Vec3::ONE)
}
