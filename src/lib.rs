//! # Geometry Resource
//!
//! Geometry resources for a real-time renderer: decoding self-describing
//! mesh assets into GPU buffers, keeping their bounds, binding meshes to
//! skeletal models and submitting areas with as few draw calls as possible.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`decoder`] - binary vertex, index and curve decoding primitives
//! - [`format`] - the `gr2` and `json` formats and the [`DecoderRegistry`]
//! - [`mesh`] - vertex declarations, mesh areas and uploaded meshes
//! - [`model`] - skeletal models and mesh binding
//! - [`GeometryResource`] - lifecycle, bounds, CPU mirrors, rendering and ray queries
//! - [`backend`] - the [`GraphicsDevice`] and [`Effect`] seams plus a recording dummy
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use geometry_resource::{DummyDevice, DummyEffect, GeometryResource, PrepareOptions};
//!
//! let device = Arc::new(DummyDevice::new());
//! let mut resource = GeometryResource::new("res:/ship.gr2", device);
//! resource.prepare(&bytes, PrepareOptions::default())?;
//! resource.render_areas(0, 0, 2, &effect, None)?;
//! ```

pub mod animation;
pub mod backend;
pub mod config;
pub mod decoder;
pub mod error;
pub mod format;
pub mod math;
pub mod mesh;
pub mod model;
pub mod resource;

pub use backend::{DummyDevice, DummyEffect, Effect, GraphicsDevice, PassInput};
pub use config::{GeometryConfig, JsonOptions, PrepareOptions};
pub use error::{ErrorKind, GeometryError, GeometryResult};
pub use format::{DecoderRegistry, GeometryDecoder, GeometryFactory};
pub use math::{Aabb, BoundingSphere, Ray};
pub use mesh::{Mesh, MeshArea, MeshId, VertexDeclaration};
pub use model::{bind_mesh_to_model, BoneId, GeometryModel};
pub use resource::{
    GeometryHit, GeometryResource, InstanceData, IntersectionCache, ResourceLoader,
    ResourceState,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the geometry subsystem.
///
/// Registers the built-in decoders in the global registry.
pub fn init() {
    let registry = DecoderRegistry::global();
    log::info!(
        "Geometry Resource v{} initialized ({} decoders)",
        VERSION,
        registry.len()
    );
}
