//! Ray queries against a resource.

use crate::math::{Mat4, Ray, Vec3};
use crate::mesh::Mesh;

use super::{GeometryResource, ResourceState};

/// One ray/triangle hit.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryHit {
    /// Ray parameter of the hit, in units of the ray direction.
    pub distance: f32,
    /// World-space hit point.
    pub point: Vec3,
    pub resource: String,
    pub mesh: String,
    pub mesh_index: usize,
    /// Area containing the hit triangle, if any.
    pub area: Option<usize>,
    /// Triangle number in the mesh index buffer.
    pub face: usize,
}

/// World-space positions of one mesh, reused while the resource, mesh,
/// transform and bounds generation stay the same.
#[derive(Debug, Clone, Default)]
pub struct IntersectionCache {
    key: Option<CacheKey>,
    positions: Vec<Vec3>,
}

#[derive(Debug, Clone, PartialEq)]
struct CacheKey {
    resource: u64,
    mesh_index: usize,
    transform: Mat4,
    generation: u64,
}

impl IntersectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.key = None;
        self.positions.clear();
    }

    /// Whether positions for `mesh_index` under `transform` are cached.
    pub fn is_cached(&self, mesh_index: usize, transform: &Mat4) -> bool {
        self.key
            .as_ref()
            .is_some_and(|k| k.mesh_index == mesh_index && k.transform == *transform)
    }

    fn positions_for(&mut self, mesh: &Mesh, key: CacheKey) -> Option<&[Vec3]> {
        if self.key.as_ref() != Some(&key) {
            self.positions = mesh.world_positions(&key.transform)?;
            self.key = Some(key);
        }
        Some(&self.positions)
    }
}

impl GeometryResource {
    /// Intersect `ray` with mesh `mesh_index` placed by `world`.
    ///
    /// Hits are appended to `hits`, which is then sorted by distance.
    /// Returns the number of hits added. Meshes without a CPU mirror can't
    /// be queried and yield no hits.
    pub fn intersect(
        &mut self,
        ray: &Ray,
        hits: &mut Vec<GeometryHit>,
        world: &Mat4,
        cache: Option<&mut IntersectionCache>,
        mesh_index: usize,
    ) -> usize {
        self.keep_alive();
        if self.state != ResourceState::Ready {
            return 0;
        }
        let bounds = self.bounding_box().transformed(world);
        if ray.intersect_aabb(&bounds).is_none() {
            return 0;
        }
        let Some(mesh) = self.meshes.get(mesh_index) else {
            return 0;
        };
        let Some(mirror) = mesh.mirror() else {
            log::debug!("{}: mesh '{}' has no CPU mirror", self.path, mesh.name());
            return 0;
        };

        let mut local = IntersectionCache::default();
        let cache = cache.unwrap_or(&mut local);
        let key = CacheKey {
            resource: self.id,
            mesh_index,
            transform: *world,
            generation: self.bounds_generation,
        };
        let Some(positions) = cache.positions_for(mesh, key) else {
            return 0;
        };

        let before = hits.len();
        let indices: Vec<u32> = mirror.indices.iter().collect();
        for (face, triangle) in indices.chunks_exact(3).enumerate() {
            let corner = |i: usize| positions.get(triangle[i] as usize).copied();
            let (Some(a), Some(b), Some(c)) = (corner(0), corner(1), corner(2)) else {
                continue;
            };
            if let Some((distance, _, _)) = ray.intersect_triangle(a, b, c) {
                hits.push(GeometryHit {
                    distance,
                    point: ray.at(distance),
                    resource: self.path.clone(),
                    mesh: mesh.name().to_string(),
                    mesh_index,
                    area: mesh.area_of_index((face * 3) as u32),
                    face,
                });
            }
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.len() - before
    }
}

