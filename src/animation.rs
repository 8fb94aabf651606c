//! Animation curve sets.
//!
//! Animations are stored as decoded; pose evaluation belongs to the
//! animation system.

use crate::decoder::Curve;

/// Optional orientation, position and scale/shear curves of one bone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformTrack {
    pub name: String,
    pub orientation: Option<Curve>,
    pub position: Option<Curve>,
    pub scale_shear: Option<Curve>,
}

impl TransformTrack {
    /// Whether the track animates anything.
    pub fn is_empty(&self) -> bool {
        self.orientation.is_none() && self.position.is_none() && self.scale_shear.is_none()
    }
}

/// Named group of transform tracks, usually one per model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackGroup {
    pub name: String,
    pub tracks: Vec<TransformTrack>,
}

impl TrackGroup {
    pub fn find_track(&self, name: &str) -> Option<&TransformTrack> {
        self.tracks.iter().find(|t| t.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Animation {
    pub name: String,
    /// Seconds.
    pub duration: f32,
    pub groups: Vec<TrackGroup>,
}

impl Animation {
    pub fn find_group(&self, name: &str) -> Option<&TrackGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn track_count(&self) -> usize {
        self.groups.iter().map(|g| g.tracks.len()).sum()
    }
}
