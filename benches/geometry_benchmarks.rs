use criterion::{black_box, criterion_group, criterion_main, Criterion};

use geometry_resource::decoder::{decode_vertex_buffer, BinaryReader, BinaryWriter};
use geometry_resource::format::binary::decode_geometry;
use geometry_resource::format::json::decode_json_value;
use geometry_resource::format::{encode_geometry, DecodedGeometry};
use geometry_resource::math::Aabb;
use geometry_resource::mesh::{
    AreaSource, ElementEncoding, IndexData, IndexFormat, MeshArea, MeshSource, ScalarKind,
    VertexDeclaration, VertexUsage,
};
use geometry_resource::resource::merge_area_runs;

fn skinned_declaration() -> VertexDeclaration {
    VertexDeclaration::from_encodings([
        (VertexUsage::Position, 0, ElementEncoding::new(ScalarKind::F32, false, 3)),
        (VertexUsage::Normal, 0, ElementEncoding::new(ScalarKind::I8, true, 3)),
        (VertexUsage::TexCoord, 0, ElementEncoding::new(ScalarKind::F16, false, 2)),
        (VertexUsage::BlendIndices, 0, ElementEncoding::new(ScalarKind::U8, false, 4)),
        (VertexUsage::BlendWeight, 0, ElementEncoding::new(ScalarKind::U8, true, 4)),
    ])
}

fn vertex_block(vertex_count: usize) -> Vec<u8> {
    let declaration = skinned_declaration();
    let per_vertex = declaration.components_per_vertex();
    let vertices: Vec<f32> = (0..vertex_count * per_vertex)
        .map(|i| (i % 17) as f32 / 17.0)
        .collect();
    let mut writer = BinaryWriter::new();
    writer
        .write_vertex_block(&declaration, Some(vertices.as_slice()))
        .expect("known encodings");
    writer.into_bytes()
}

fn grid_mesh(side: u32) -> MeshSource {
    let mut mesh = MeshSource::new("grid");
    mesh.declaration = VertexDeclaration::from_encodings([(
        VertexUsage::Position,
        0,
        ElementEncoding::new(ScalarKind::F32, false, 3),
    )]);
    let mut vertices = Vec::new();
    for y in 0..=side {
        for x in 0..=side {
            vertices.extend_from_slice(&[x as f32, y as f32, 0.0]);
        }
    }
    let mut indices = Vec::new();
    for y in 0..side {
        for x in 0..side {
            let i = y * (side + 1) + x;
            indices.extend_from_slice(&[i, i + 1, i + side + 2, i, i + side + 2, i + side + 1]);
        }
    }
    let rows = side * 6;
    mesh.areas = (0..side)
        .map(|row| AreaSource::new(format!("row{row}"), row * rows, rows))
        .collect();
    mesh.vertices = Some(vertices);
    mesh.indices = IndexData::U32(indices);
    mesh
}

// ---------------------------------------------------------------------------
// Vertex decoding
// ---------------------------------------------------------------------------

fn bench_decode_vertices(c: &mut Criterion) {
    let block = vertex_block(10_000);
    c.bench_function("decode_vertex_buffer_10k_skinned", |b| {
        b.iter(|| {
            let mut reader = BinaryReader::new(black_box(&block), "bench.gr2");
            let mut declaration = VertexDeclaration::new();
            decode_vertex_buffer(&mut reader, &mut declaration)
        });
    });
}

fn bench_decode_container(c: &mut Criterion) {
    let geometry = DecodedGeometry {
        meshes: vec![grid_mesh(64)],
        ..Default::default()
    };
    let bytes = encode_geometry(&geometry).expect("encode grid");
    c.bench_function("decode_gr2_grid_64", |b| {
        b.iter(|| decode_geometry("bench.gr2", black_box(&bytes)));
    });
}

fn bench_decode_json(c: &mut Criterion) {
    let document = serde_json::json!({
        "meshes": [{
            "name": "tri",
            "elements": [{"usage": "position", "components": 3}],
            "vertices": (0..3000).map(|i| i as f32).collect::<Vec<_>>(),
            "indices": (0..1000).collect::<Vec<u32>>()
        }]
    });
    c.bench_function("decode_json_1k_vertices", |b| {
        b.iter(|| decode_json_value("bench.json", black_box(&document)));
    });
}

// ---------------------------------------------------------------------------
// Area merging
// ---------------------------------------------------------------------------

fn bench_merge_runs(c: &mut Criterion) {
    // Contiguous pairs separated by gaps.
    let areas: Vec<MeshArea> = (0..1024u32)
        .map(|i| MeshArea {
            name: String::new(),
            start: (i / 2) * 400 + (i % 2) * 60,
            count: 30,
            bounds: Aabb::EMPTY,
        })
        .collect();
    c.bench_function("merge_area_runs_1024", |b| {
        b.iter(|| merge_area_runs(black_box(&areas), IndexFormat::Uint16));
    });
}

criterion_group!(decoding, bench_decode_vertices, bench_decode_container, bench_decode_json);
criterion_group!(rendering, bench_merge_runs);
criterion_main!(decoding, rendering);
