//! Geometry resources.
//!
//! A [`GeometryResource`] owns the meshes, models and animations decoded
//! from one asset and drives their lifecycle:
//!
//! ```text
//! Empty -> Loading -> Preparing -> Ready -> Unloaded
//!             \           \
//!              +-----------+-> Error
//! ```
//!
//! `prepare` always starts from a cleared resource, so a failed prepare
//! leaves an empty resource in the `Error` state rather than a partially
//! uploaded one.
//!
//! Aggregate bounds are a cached value with a dirty flag and a generation
//! counter. Mesh mutations only flag the mesh; the resource notices at its
//! next bounds check.

mod intersect;
mod mirror;
mod render;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::animation::Animation;
use crate::backend::GraphicsDevice;
use crate::config::{GeometryConfig, JsonOptions, PrepareOptions};
use crate::error::{GeometryError, GeometryResult};
use crate::format::json::decode_json_value;
use crate::format::{extension_of, DecodedGeometry, DecoderOutput, DecoderRegistry, GeometryFactory};
use crate::math::{Aabb, BoundingSphere};
use crate::mesh::{Mesh, MeshId};
use crate::model::{bind_mesh_to_model, GeometryModel};

pub use intersect::{GeometryHit, IntersectionCache};
pub use mirror::{load_ticket, LoadCompleter, LoadMetadata, LoadOutcome, LoadReason, LoadTicket, ResourceLoader};
pub use render::{merge_area_runs, DrawRun, InstanceData};

/// Lifecycle state of a [`GeometryResource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceState {
    #[default]
    Empty,
    Loading,
    Preparing,
    Ready,
    Unloaded,
    Error,
}

/// Meshes, models and animations decoded from one asset.
pub struct GeometryResource {
    id: u64,
    path: String,
    state: ResourceState,
    device: Arc<dyn GraphicsDevice>,
    config: GeometryConfig,
    registry: Option<Arc<DecoderRegistry>>,
    loader: Option<Arc<dyn ResourceLoader>>,
    factory: Option<Arc<dyn GeometryFactory>>,
    json_options: Option<JsonOptions>,
    decoder_name: Option<String>,

    meshes: Vec<Mesh>,
    models: Vec<GeometryModel>,
    animations: Vec<Animation>,

    bounds: Aabb,
    sphere: BoundingSphere,
    bounds_dirty: bool,
    bounds_generation: u64,

    keep_mirror: bool,
    system_mirror: bool,
    mirror_forced: bool,
    last_used: Option<Instant>,
}

impl GeometryResource {
    /// Create an empty resource for `path`.
    pub fn new(path: impl Into<String>, device: Arc<dyn GraphicsDevice>) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            path: path.into(),
            state: ResourceState::Empty,
            device,
            config: GeometryConfig::default(),
            registry: None,
            loader: None,
            factory: None,
            json_options: None,
            decoder_name: None,
            meshes: Vec::new(),
            models: Vec::new(),
            animations: Vec::new(),
            bounds: Aabb::EMPTY,
            sphere: BoundingSphere::ZERO,
            bounds_dirty: false,
            bounds_generation: 0,
            keep_mirror: false,
            system_mirror: false,
            mirror_forced: false,
            last_used: None,
        }
    }

    pub fn with_config(mut self, config: GeometryConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a private decoder registry instead of [`DecoderRegistry::global`].
    pub fn with_registry(mut self, registry: Arc<DecoderRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn ResourceLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Register a factory used to regenerate JSON-built data on reload.
    pub fn with_factory(mut self, factory: Arc<dyn GeometryFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Process-unique resource id.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ResourceState::Ready
    }

    pub fn config(&self) -> &GeometryConfig {
        &self.config
    }

    /// Name of the decoder used by the last `prepare`.
    pub fn decoder_name(&self) -> Option<&str> {
        self.decoder_name.as_deref()
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.0)
    }

    /// Mutable mesh access. Flag changed geometry with
    /// [`Mesh::invalidate_bounds`]; the resource picks it up lazily.
    pub fn mesh_mut(&mut self, id: MeshId) -> Option<&mut Mesh> {
        self.meshes.get_mut(id.0)
    }

    pub fn find_mesh(&self, name: &str) -> Option<MeshId> {
        self.meshes.iter().position(|m| m.name() == name).map(MeshId)
    }

    pub fn models(&self) -> &[GeometryModel] {
        &self.models
    }

    pub fn find_model(&self, name: &str) -> Option<&GeometryModel> {
        self.models.iter().find(|m| m.name() == name)
    }

    pub fn animations(&self) -> &[Animation] {
        &self.animations
    }

    pub fn find_animation(&self, name: &str) -> Option<&Animation> {
        self.animations.iter().find(|a| a.name == name)
    }

    fn registry(&self) -> &DecoderRegistry {
        match &self.registry {
            Some(registry) => registry.as_ref(),
            None => DecoderRegistry::global(),
        }
    }

    /// Record that the resource was used, forwarding the ping to the loader.
    pub fn keep_alive(&mut self) {
        self.last_used = Some(Instant::now());
        if self.config.keep_alive_with_loader {
            if let Some(loader) = &self.loader {
                loader.keep_alive(&self.path);
            }
        }
    }

    pub fn last_used(&self) -> Option<Instant> {
        self.last_used
    }

    /// Release every mesh (destroying its GPU buffers), model and animation.
    pub fn clear(&mut self) {
        for mesh in &mut self.meshes {
            mesh.unload(self.device.as_ref());
        }
        self.meshes.clear();
        self.models.clear();
        self.animations.clear();
        self.bounds = Aabb::EMPTY;
        self.sphere = BoundingSphere::ZERO;
        self.bounds_dirty = true;
    }

    /// Decode `data` with the decoder registered for the path extension and
    /// upload it.
    pub fn prepare(&mut self, data: &[u8], options: PrepareOptions) -> GeometryResult<()> {
        self.clear();
        self.state = ResourceState::Preparing;
        self.keep_mirror = options.keep_mirror;
        let result = self.decode(data).and_then(|geometry| self.install(geometry));
        self.finish_prepare(result)
    }

    /// Replace the contents with a structured document.
    ///
    /// The options are recorded so that a registered [`GeometryFactory`]
    /// can regenerate the same document on reload.
    pub fn update_from_json(
        &mut self,
        document: &serde_json::Value,
        options: JsonOptions,
    ) -> GeometryResult<()> {
        self.clear();
        self.state = ResourceState::Preparing;
        self.keep_mirror = options.keep_mirror;
        self.decoder_name = Some("json".to_string());
        let result = decode_json_value(&self.path, document).and_then(|g| self.install(g));
        self.json_options = Some(options);
        self.finish_prepare(result)
    }

    fn decode(&mut self, data: &[u8]) -> GeometryResult<DecodedGeometry> {
        let extension = extension_of(&self.path).unwrap_or_default();
        let decoder = self.registry().find(&extension).ok_or_else(|| {
            GeometryError::UnsupportedFormat {
                path: self.path.clone(),
                extension: extension.clone(),
            }
        })?;
        log::debug!("{}: decoding with '{}'", self.path, decoder.name());
        self.decoder_name = Some(decoder.name().to_string());
        match decoder.decode(&self.path, data)? {
            DecoderOutput::Structured(geometry) => Ok(geometry),
            DecoderOutput::ByMesh(meshes) => Ok(DecodedGeometry {
                meshes,
                ..DecodedGeometry::default()
            }),
        }
    }

    fn install(&mut self, geometry: DecodedGeometry) -> GeometryResult<()> {
        for source in geometry.meshes {
            let mut mesh = Mesh::upload(
                self.device.as_ref(),
                &self.path,
                source,
                self.config.validate_indices,
            )?;
            // Bone bounds must exist before models bind to the mesh.
            mesh.rebuild_bounds();
            self.meshes.push(mesh);
        }

        for source in geometry.models {
            let mut model = source.model;
            for mesh_id in source.meshes {
                let mesh = self.meshes.get(mesh_id.0).ok_or_else(|| GeometryError::MeshMissing {
                    path: self.path.clone(),
                    index: mesh_id.0,
                    count: self.meshes.len(),
                })?;
                bind_mesh_to_model(&self.path, mesh_id, mesh, &mut model)?;
            }
            self.models.push(model);
        }
        self.animations = geometry.animations;

        self.rebuild_bounds(true);
        self.release_unneeded_mirrors();
        Ok(())
    }

    fn finish_prepare(&mut self, result: GeometryResult<()>) -> GeometryResult<()> {
        match result {
            Ok(()) => {
                self.state = ResourceState::Ready;
                log::info!(
                    "{}: prepared {} meshes, {} models, {} animations",
                    self.path,
                    self.meshes.len(),
                    self.models.len(),
                    self.animations.len()
                );
                Ok(())
            }
            Err(err) => {
                self.clear();
                self.state = ResourceState::Error;
                log::warn!("{}: prepare failed: {}", self.path, err);
                Err(err)
            }
        }
    }

    /// Destroy the GPU buffers of every mesh. Calling it again is a no-op.
    pub fn unload(&mut self) {
        if self.state == ResourceState::Unloaded {
            return;
        }
        for mesh in &mut self.meshes {
            mesh.unload(self.device.as_ref());
        }
        self.state = ResourceState::Unloaded;
        log::info!("{}: unloaded", self.path);
    }

    pub fn is_bounds_dirty(&self) -> bool {
        self.bounds_dirty
    }

    /// Incremented on every bounds recomputation.
    pub fn bounds_generation(&self) -> u64 {
        self.bounds_generation
    }

    /// Recompute aggregate bounds when they are stale or `force` is set.
    ///
    /// Returns whether a recomputation happened.
    pub fn rebuild_bounds(&mut self, force: bool) -> bool {
        if !self.bounds_dirty && !force && self.meshes.iter().any(Mesh::is_bounds_dirty) {
            self.bounds_dirty = true;
        }
        if !self.bounds_dirty && !force {
            return false;
        }

        let mut bounds = Aabb::EMPTY;
        for mesh in &mut self.meshes {
            bounds = bounds.union(&mesh.rebuild_bounds());
        }
        self.bounds = bounds;
        self.sphere = BoundingSphere::from_aabb(&bounds);
        self.bounds_dirty = false;
        self.bounds_generation += 1;
        true
    }

    /// Aggregate box, rebuilt first if stale.
    pub fn bounding_box(&mut self) -> Aabb {
        self.rebuild_bounds(false);
        self.bounds
    }

    /// Aggregate sphere, rebuilt first if stale.
    pub fn bounding_sphere(&mut self) -> BoundingSphere {
        self.rebuild_bounds(false);
        self.sphere
    }
}

impl Drop for GeometryResource {
    fn drop(&mut self) {
        for mesh in &mut self.meshes {
            mesh.unload(self.device.as_ref());
        }
    }
}

impl std::fmt::Debug for GeometryResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeometryResource")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("state", &self.state)
            .field("meshes", &self.meshes.len())
            .field("models", &self.models.len())
            .field("animations", &self.animations.len())
            .field("bounds_generation", &self.bounds_generation)
            .finish()
    }
}
