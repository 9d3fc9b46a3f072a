// SPDX-License-Identifier: MIT OR Apache-2.0
//! Marker definitions for the timeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerId(pub Uuid);

impl MarkerId {
    /// Create a new random marker ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MarkerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Kind of marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerKind {
    /// Current playback position
    Playhead,
    /// In point
    In,
    /// Out point
    Out,
    /// Chapter start
    Chapter,
    /// Cue point
    Cue,
}

impl MarkerKind {
    /// Get the default marker color
    pub fn color(&self) -> [u8; 3] {
        match self {
            Self::Playhead => [255, 80, 80],
            Self::In | Self::Out => [255, 200, 100],
            Self::Chapter => [100, 200, 255],
            Self::Cue => [200, 255, 100],
        }
    }
}

/// A labeled point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Unique marker ID
    pub id: MarkerId,
    /// Time in seconds
    pub time: f64,
    /// Marker kind
    pub kind: MarkerKind,
    /// Label
    pub label: String,
    /// Marker color
    pub color: [u8; 3],
    /// Whether the marker can be dragged
    pub draggable: bool,
}

impl Marker {
    /// Create a new marker
    pub fn new(kind: MarkerKind, time: f64, label: impl Into<String>) -> Self {
        Self {
            id: MarkerId::new(),
            time,
            kind,
            label: label.into(),
            color: kind.color(),
            draggable: true,
        }
    }

    /// Create the playhead marker
    pub fn playhead() -> Self {
        Self::new(MarkerKind::Playhead, 0.0, "Playhead")
    }

    /// Whether this is the playhead
    pub fn is_playhead(&self) -> bool {
        self.kind == MarkerKind::Playhead
    }
}
