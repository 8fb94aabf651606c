//! Geometry file formats and the decoder registry.
//!
//! A [`GeometryDecoder`] turns raw asset bytes into either a complete
//! [`DecodedGeometry`] (meshes, models, animations) or, for by-mesh
//! producers, a plain list of [`MeshSource`]s. Decoders are looked up by
//! lowercased file extension in a [`DecoderRegistry`].
//!
//! # Built-in Formats
//!
//! - `gr2`: [`BinaryGeometryDecoder`], the binary container
//! - `json`: [`JsonGeometryDecoder`], structured documents

pub mod binary;
pub mod json;

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::animation::Animation;
use crate::error::GeometryResult;
use crate::mesh::MeshSource;
use crate::model::ModelSource;

pub use binary::{encode_geometry, BinaryGeometryDecoder};
pub use json::{GeometryDocument, GeometryFactory, JsonGeometryDecoder};

/// How the fetch layer should deliver the asset bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseType {
    ArrayBuffer,
    Json,
    Text,
}

/// Everything a structured decoder produces for one resource.
#[derive(Debug, Clone, Default)]
pub struct DecodedGeometry {
    pub meshes: Vec<MeshSource>,
    pub models: Vec<ModelSource>,
    pub animations: Vec<Animation>,
}

/// Output of [`GeometryDecoder::decode`].
#[derive(Debug)]
pub enum DecoderOutput {
    Structured(DecodedGeometry),
    /// Meshes only; area bounds are derived from the raw data at upload.
    ByMesh(Vec<MeshSource>),
}

/// A geometry file format.
pub trait GeometryDecoder: Send + Sync {
    /// Name for diagnostics.
    fn name(&self) -> &str;

    /// Whether this decoder handles `extension` (lowercase, without dot).
    fn supports_extension(&self, extension: &str) -> bool;

    /// Expected delivery type for the asset fetch.
    fn response_type(&self) -> ResponseType;

    /// Decode the asset at `path`.
    fn decode(&self, path: &str, data: &[u8]) -> GeometryResult<DecoderOutput>;
}

/// Lowercased extension of `path`, ignoring any query string.
pub fn extension_of(path: &str) -> Option<String> {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let file = path.rsplit(['/', '\\', ':']).next().unwrap_or(path);
    let (_, extension) = file.rsplit_once('.')?;
    (!extension.is_empty()).then(|| extension.to_ascii_lowercase())
}

/// Extension-keyed decoder table.
///
/// Later registrations take precedence over earlier ones for the same
/// extension.
#[derive(Default)]
pub struct DecoderRegistry {
    decoders: RwLock<Vec<Arc<dyn GeometryDecoder>>>,
}

impl std::fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .decoders
            .read()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        f.debug_struct("DecoderRegistry").field("decoders", &names).finish()
    }
}

static GLOBAL_REGISTRY: OnceLock<DecoderRegistry> = OnceLock::new();

impl DecoderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in decoders.
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(BinaryGeometryDecoder));
        registry.register(Arc::new(JsonGeometryDecoder));
        registry
    }

    /// The process-wide registry, populated with the built-in decoders on
    /// first use.
    pub fn global() -> &'static DecoderRegistry {
        GLOBAL_REGISTRY.get_or_init(Self::with_builtin)
    }

    pub fn register(&self, decoder: Arc<dyn GeometryDecoder>) {
        log::debug!("Registered geometry decoder '{}'", decoder.name());
        self.decoders.write().push(decoder);
    }

    /// Decoder for `extension` (case-insensitive).
    pub fn find(&self, extension: &str) -> Option<Arc<dyn GeometryDecoder>> {
        let extension = extension.to_ascii_lowercase();
        self.decoders
            .read()
            .iter()
            .rev()
            .find(|d| d.supports_extension(&extension))
            .cloned()
    }

    /// Decoder for the extension of `path`.
    pub fn find_for_path(&self, path: &str) -> Option<Arc<dyn GeometryDecoder>> {
        self.find(&extension_of(path)?)
    }

    pub fn len(&self) -> usize {
        self.decoders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fake;

    impl GeometryDecoder for Fake {
        fn name(&self) -> &str {
            "fake"
        }
        fn supports_extension(&self, extension: &str) -> bool {
            extension == "gr2"
        }
        fn response_type(&self) -> ResponseType {
            ResponseType::ArrayBuffer
        }
        fn decode(&self, _: &str, _: &[u8]) -> GeometryResult<DecoderOutput> {
            Ok(DecoderOutput::ByMesh(Vec::new()))
        }
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("res:/dx9/ship.GR2").as_deref(), Some("gr2"));
        assert_eq!(extension_of("res:/a.b/mesh.json?v=2").as_deref(), Some("json"));
        assert_eq!(extension_of("res:/a.b/mesh"), None);
        assert_eq!(extension_of("mesh."), None);
    }

    #[test]
    fn test_builtin_lookup() {
        let registry = DecoderRegistry::global();
        assert_eq!(registry.find("GR2").unwrap().name(), "gr2");
        assert_eq!(
            registry.find_for_path("res:/x.json").unwrap().response_type(),
            ResponseType::Json
        );
        assert!(registry.find("obj").is_none());
    }

    #[test]
    fn test_later_registration_wins() {
        let registry = DecoderRegistry::with_builtin();
        registry.register(Arc::new(Fake));
        assert_eq!(registry.find("gr2").unwrap().name(), "fake");
        assert_eq!(registry.len(), 3);
    }
}
