//! Geometry error types.
//!
//! Every variant carries enough context (asset path, offending byte or index,
//! mesh/model/bone names) to diagnose a failure without re-deriving state.

use thiserror::Error;

use crate::backend::DeviceError;

/// Broad classification of a [`GeometryError`].
///
/// The class decides how far a failure reaches: format errors fail a whole
/// `prepare`, structural and binding errors only fail the operation that hit
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unsupported or malformed asset data.
    Format,
    /// Asset metadata that does not line up (missing area, unknown bone).
    Structural,
    /// A pass input that the mesh vertex layout cannot satisfy.
    Binding,
    /// The graphics device refused an operation.
    Device,
    /// The resource loader reported a failed fetch.
    Load,
    /// The resource is not in a state that allows the operation.
    State,
}

/// Errors produced by the geometry subsystem.
#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("{path}: no geometry decoder registered for extension '{extension}'")]
    UnsupportedFormat { path: String, extension: String },

    #[error("{path}: unknown vertex element encoding 0x{encoding:02x}")]
    FileFormat { path: String, encoding: u8 },

    #[error("{path}: unexpected end of data at offset {offset} (needed {needed} more bytes)")]
    Truncated {
        path: String,
        offset: usize,
        needed: usize,
    },

    #[error("{path}: invalid geometry data: {reason}")]
    InvalidData { path: String, reason: String },

    #[error("{path}: malformed geometry document: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: mesh '{mesh}' has no area {area} (mesh declares {available})")]
    AreaMissing {
        path: String,
        mesh: String,
        area: usize,
        available: usize,
    },

    #[error("{path}: mesh '{mesh}' references bone '{bone}' which model '{model}' does not have")]
    BoneNameInvalid {
        path: String,
        mesh: String,
        bone: String,
        model: String,
    },

    #[error("{path}: mesh index {index} out of range ({count} meshes)")]
    MeshMissing {
        path: String,
        index: usize,
        count: usize,
    },

    #[error("{path}: pass {pass} inputs cannot be bound to mesh '{mesh}' (stride {stride})")]
    EffectBinding {
        path: String,
        mesh: String,
        pass: usize,
        stride: u32,
    },

    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    #[error("{path}: load failed: {reason}")]
    LoadFailed { path: String, reason: String },

    #[error("{path}: resource is not ready")]
    NotReady { path: String },
}

impl GeometryError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormat { .. }
            | Self::FileFormat { .. }
            | Self::Truncated { .. }
            | Self::InvalidData { .. }
            | Self::Json { .. } => ErrorKind::Format,
            Self::AreaMissing { .. } | Self::BoneNameInvalid { .. } | Self::MeshMissing { .. } => {
                ErrorKind::Structural
            }
            Self::EffectBinding { .. } => ErrorKind::Binding,
            Self::Device(_) => ErrorKind::Device,
            Self::LoadFailed { .. } => ErrorKind::Load,
            Self::NotReady { .. } => ErrorKind::State,
        }
    }

    pub(crate) fn invalid_data(path: &str, reason: impl Into<String>) -> Self {
        Self::InvalidData {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type GeometryResult<T> = Result<T, GeometryError>;
