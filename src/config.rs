//! Configuration for geometry resources.

use serde::{Deserialize, Serialize};

/// Configuration shared by every resource of a subsystem instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryConfig {
    /// Keep CPU mirrors of all meshes. Ignored while a resource loader is
    /// attached; the loader's own policy applies then.
    pub system_mirror: bool,
    /// Reject index values past the vertex count during prepare.
    pub validate_indices: bool,
    /// Forward keep-alive pings to the resource loader.
    pub keep_alive_with_loader: bool,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            system_mirror: false,
            validate_indices: true,
            keep_alive_with_loader: true,
        }
    }
}

impl GeometryConfig {
    pub fn with_system_mirror(mut self, enabled: bool) -> Self {
        self.system_mirror = enabled;
        self
    }

    pub fn with_validate_indices(mut self, enabled: bool) -> Self {
        self.validate_indices = enabled;
        self
    }

    pub fn with_keep_alive_with_loader(mut self, enabled: bool) -> Self {
        self.keep_alive_with_loader = enabled;
        self
    }
}

/// Per-call options for `prepare`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepareOptions {
    /// Keep CPU mirrors after upload regardless of the mirror policy.
    pub keep_mirror: bool,
}

impl PrepareOptions {
    pub fn keep_mirror() -> Self {
        Self { keep_mirror: true }
    }
}

/// Input recorded by `update_from_json` so a factory can regenerate the
/// same document on reload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonOptions {
    /// Factory-specific parameters.
    #[serde(default)]
    pub parameters: serde_json::Value,
    /// Keep CPU mirrors after upload.
    #[serde(default)]
    pub keep_mirror: bool,
}

impl JsonOptions {
    pub fn new(parameters: serde_json::Value) -> Self {
        Self {
            parameters,
            keep_mirror: false,
        }
    }
}
