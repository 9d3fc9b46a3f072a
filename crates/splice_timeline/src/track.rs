// SPDX-License-Identifier: MIT OR Apache-2.0
//! Track and item definitions for the timeline.

use crate::timeline::TimelineError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub Uuid);

impl TrackId {
    /// Create a new random track ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub Uuid);

impl ItemId {
    /// Create a new random item ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

/// Type of track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    /// Video clips
    Video,
    /// Audio clips
    Audio,
    /// Still images
    Image,
    /// Text overlays
    Text,
    /// Effect layers
    Effect,
    /// Master bus lane
    Master,
}

impl TrackKind {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Video => "Video",
            Self::Audio => "Audio",
            Self::Image => "Image",
            Self::Text => "Text",
            Self::Effect => "Effect",
            Self::Master => "Master",
        }
    }

    /// Short prefix used for generated track names ("V1", "A2", ...)
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Video => "V",
            Self::Audio => "A",
            Self::Image => "I",
            Self::Text => "T",
            Self::Effect => "FX",
            Self::Master => "M",
        }
    }

    /// Get the default track color
    pub fn color(&self) -> [u8; 3] {
        match self {
            Self::Video => [100, 150, 255],
            Self::Audio => [150, 255, 100],
            Self::Image => [255, 200, 100],
            Self::Text => [200, 100, 255],
            Self::Effect => [255, 100, 150],
            Self::Master => [150, 150, 150],
        }
    }

    /// Whether the track carries an audible signal into the mix
    pub fn is_audible(&self) -> bool {
        matches!(self, Self::Video | Self::Audio | Self::Master)
    }
}

/// Type of media an item refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    /// Video clip
    Video,
    /// Audio clip
    Audio,
    /// Still image
    Image,
    /// Text block
    Text,
    /// Effect
    Effect,
}

impl ItemKind {
    /// The track kind that naturally hosts this item kind
    pub fn track_kind(&self) -> TrackKind {
        match self {
            Self::Video => TrackKind::Video,
            Self::Audio => TrackKind::Audio,
            Self::Image => TrackKind::Image,
            Self::Text => TrackKind::Text,
            Self::Effect => TrackKind::Effect,
        }
    }
}

/// Opaque handle to an asset owned by the host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef(pub String);

impl AssetRef {
    /// Create a handle from any string-like reference
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }
}

/// Asset descriptor produced by the host's asset resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// Asset identifier
    pub id: String,
    /// Media kind
    pub kind: ItemKind,
    /// Handle passed back to the host when the item is rendered
    pub reference: AssetRef,
    /// Natural duration in seconds (None for stills and text)
    pub duration: Option<f64>,
    /// Pixel resolution for visual media
    pub resolution: Option<(u32, u32)>,
}

/// Default length for assets without a natural duration
pub const DEFAULT_STILL_DURATION: f64 = 5.0;

/// A time-positioned reference to external media on a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique item ID
    pub id: ItemId,
    /// Owning track
    pub track_id: TrackId,
    /// Item name
    pub name: String,
    /// Media kind
    pub kind: ItemKind,
    /// Start time in seconds
    pub start_time: f64,
    /// Duration in seconds
    pub duration: f64,
    /// Offset into the source media in seconds
    pub source_in: f64,
    /// Source asset
    pub source: AssetRef,
    /// Item volume (0 to 1)
    pub volume: f32,
    /// Whether the item is muted
    pub muted: bool,
    /// Whether the item is locked
    pub locked: bool,
    /// Fade in duration
    pub fade_in: Option<f64>,
    /// Fade out duration
    pub fade_out: Option<f64>,
}

impl Item {
    /// Create a new item
    pub fn new(
        track_id: TrackId,
        kind: ItemKind,
        source: AssetRef,
        start_time: f64,
        duration: f64,
    ) -> Self {
        Self {
            id: ItemId::new(),
            track_id,
            name: source.0.clone(),
            kind,
            start_time,
            duration,
            source_in: 0.0,
            source,
            volume: 1.0,
            muted: false,
            locked: false,
            fade_in: None,
            fade_out: None,
        }
    }

    /// Create an item from a resolved asset
    pub fn from_asset(track_id: TrackId, asset: &AssetDescriptor, start_time: f64) -> Self {
        let duration = asset
            .duration
            .filter(|d| *d > 0.0)
            .unwrap_or(DEFAULT_STILL_DURATION);
        let mut item = Self::new(track_id, asset.kind, asset.reference.clone(), start_time, duration);
        item.name = asset.id.clone();
        item
    }

    /// Set fades
    pub fn with_fades(mut self, fade_in: Option<f64>, fade_out: Option<f64>) -> Self {
        self.fade_in = fade_in;
        self.fade_out = fade_out;
        self
    }

    /// Set the item volume
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// End time (exclusive)
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// Whether the item covers the given time
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start_time && time < self.end_time()
    }

    /// Whether `[start, end)` intersects this item
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        start < self.end_time() && end > self.start_time
    }

    /// Check the timing fields
    pub fn validate(&self) -> Result<(), TimelineError> {
        if !self.start_time.is_finite() || self.start_time < 0.0 {
            return Err(TimelineError::InvalidOperation(format!(
                "item start must be >= 0, got {}",
                self.start_time
            )));
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(TimelineError::InvalidOperation(format!(
                "item duration must be > 0, got {}",
                self.duration
            )));
        }
        for fade in [self.fade_in, self.fade_out].into_iter().flatten() {
            if fade < 0.0 || fade > self.duration {
                return Err(TimelineError::InvalidOperation(format!(
                    "fade {fade} outside item duration {}",
                    self.duration
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(TimelineError::InvalidOperation(format!(
                "item volume {} outside [0, 1]",
                self.volume
            )));
        }
        Ok(())
    }

    /// Split the item at `time` into two items with the given IDs.
    ///
    /// The halves exactly partition `[start, end)`. The first keeps the fade in,
    /// the second keeps the fade out.
    pub fn split_at(
        &self,
        time: f64,
        left_id: ItemId,
        right_id: ItemId,
    ) -> Result<(Item, Item), TimelineError> {
        if !(self.start_time < time && time < self.end_time()) {
            return Err(TimelineError::InvalidOperation(format!(
                "split time {time} outside item range [{}, {})",
                self.start_time,
                self.end_time()
            )));
        }

        let offset = time - self.start_time;
        let mut left = self.clone();
        left.id = left_id;
        left.duration = offset;
        left.fade_out = None;
        left.fade_in = self.fade_in.map(|f| f.min(left.duration));

        let mut right = self.clone();
        right.id = right_id;
        right.start_time = time;
        right.duration = self.end_time() - time;
        right.source_in = self.source_in + offset;
        right.fade_in = None;
        right.fade_out = self.fade_out.map(|f| f.min(right.duration));

        Ok((left, right))
    }
}

/// A lane in the timeline holding items of one kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track ID
    pub id: TrackId,
    /// Track name
    pub name: String,
    /// Track kind
    pub kind: TrackKind,
    /// Track color
    pub color: [u8; 3],
    /// Whether the track is drawn
    pub visible: bool,
    /// Whether the track is locked
    pub locked: bool,
    /// Whether the track is muted
    pub muted: bool,
    /// Whether the track is soloed
    pub solo: bool,
    /// Volume (0 to 1)
    pub volume: f32,
    /// Pan (-1 to 1)
    pub pan: f32,
    /// Items sorted by start time
    items: Vec<Item>,
}

impl Track {
    /// Create a new track
    pub fn new(name: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: TrackId::new(),
            name: name.into(),
            kind,
            color: kind.color(),
            visible: true,
            locked: false,
            muted: false,
            solo: false,
            volume: 1.0,
            pan: 0.0,
            items: Vec::new(),
        }
    }

    /// Insert an item keeping start-time order, returns its index.
    ///
    /// Items with equal start times keep insertion order.
    pub fn insert_item(&mut self, mut item: Item) -> usize {
        item.track_id = self.id;
        let index = self.items.partition_point(|i| i.start_time <= item.start_time);
        self.items.insert(index, item);
        index
    }

    /// Insert an item at a known index (used to restore a previous layout)
    pub fn insert_item_at(&mut self, index: usize, mut item: Item) {
        item.track_id = self.id;
        let index = index.min(self.items.len());
        self.items.insert(index, item);
    }

    /// Remove an item, returning its former index
    pub fn remove_item(&mut self, item_id: ItemId) -> Option<(usize, Item)> {
        let index = self.item_index(item_id)?;
        Some((index, self.items.remove(index)))
    }

    /// Index of an item
    pub fn item_index(&self, item_id: ItemId) -> Option<usize> {
        self.items.iter().position(|i| i.id == item_id)
    }

    /// Get item by ID
    pub fn item(&self, item_id: ItemId) -> Option<&Item> {
        self.items.iter().find(|i| i.id == item_id)
    }

    /// Get mutable item by ID.
    ///
    /// Callers must not change `start_time` through this handle; use
    /// remove/insert so ordering holds.
    pub fn item_mut(&mut self, item_id: ItemId) -> Option<&mut Item> {
        self.items.iter_mut().find(|i| i.id == item_id)
    }

    /// Get all items
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Items covering a time
    pub fn items_at(&self, time: f64) -> Vec<&Item> {
        self.items.iter().filter(|i| i.contains(time)).collect()
    }

    /// Whether any item other than `exclude` intersects `[start, end)`
    pub fn has_conflict(&self, start: f64, end: f64, exclude: Option<ItemId>) -> bool {
        self.items
            .iter()
            .filter(|i| Some(i.id) != exclude)
            .any(|i| i.overlaps(start, end))
    }

    /// End of the last item on this track
    pub fn duration(&self) -> f64 {
        self.items.iter().map(Item::end_time).fold(0.0, f64::max)
    }

    /// Get item count
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Check the mix fields
    pub fn validate(&self) -> Result<(), TimelineError> {
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(TimelineError::InvalidOperation(format!(
                "track volume {} outside [0, 1]",
                self.volume
            )));
        }
        if !(-1.0..=1.0).contains(&self.pan) {
            return Err(TimelineError::InvalidOperation(format!(
                "track pan {} outside [-1, 1]",
                self.pan
            )));
        }
        self.items.iter().try_for_each(Item::validate)
    }
}
