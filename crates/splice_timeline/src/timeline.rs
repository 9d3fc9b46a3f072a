// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline model containing tracks and markers.

use crate::marker::{Marker, MarkerId, MarkerKind};
use crate::track::{Item, ItemId, Track, TrackId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by timeline mutation primitives
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimelineError {
    /// Track not found
    #[error("Track not found: {0:?}")]
    TrackNotFound(TrackId),

    /// Item not found
    #[error("Item not found: {0:?}")]
    ItemNotFound(ItemId),

    /// Marker not found
    #[error("Marker not found: {0:?}")]
    MarkerNotFound(MarkerId),

    /// An object with the same ID already exists
    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl TimelineError {
    /// Whether this error reports an unresolved id
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TrackNotFound(_) | Self::ItemNotFound(_) | Self::MarkerNotFound(_)
        )
    }
}

/// Where an item lives inside the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemLocation {
    /// Owning track
    pub track_id: TrackId,
    /// Index of the track in track order
    pub track_index: usize,
    /// Index of the item within its track
    pub item_index: usize,
}

/// The timeline: ordered tracks plus markers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Timeline name
    pub name: String,
    /// Tracks in display order
    tracks: IndexMap<TrackId, Track>,
    /// Markers, including the playhead
    markers: IndexMap<MarkerId, Marker>,
    /// The playhead marker
    playhead: MarkerId,
    /// Frame rate used for frame stepping
    pub frame_rate: f64,
}

impl Timeline {
    /// Create a new empty timeline
    pub fn new(name: impl Into<String>) -> Self {
        let playhead = Marker::playhead();
        let playhead_id = playhead.id;
        let mut markers = IndexMap::new();
        markers.insert(playhead_id, playhead);

        Self {
            name: name.into(),
            tracks: IndexMap::new(),
            markers,
            playhead: playhead_id,
            frame_rate: 30.0,
        }
    }

    // ------------------------------------------------------------------
    // Tracks
    // ------------------------------------------------------------------

    /// Append a track
    pub fn add_track(&mut self, track: Track) -> Result<TrackId, TimelineError> {
        let index = self.tracks.len();
        self.insert_track(index, track)
    }

    /// Insert a track at a position in track order
    pub fn insert_track(&mut self, index: usize, track: Track) -> Result<TrackId, TimelineError> {
        if self.tracks.contains_key(&track.id) {
            return Err(TimelineError::DuplicateId(format!("{:?}", track.id)));
        }
        if let Some(item) = track.items().iter().find(|i| self.find_item(i.id).is_some()) {
            return Err(TimelineError::DuplicateId(format!("{:?}", item.id)));
        }
        track.validate()?;

        let id = track.id;
        let index = index.min(self.tracks.len());
        self.tracks.shift_insert(index, id, track);
        Ok(id)
    }

    /// Remove a track with all of its items, returning its former index
    pub fn remove_track(&mut self, track_id: TrackId) -> Result<(usize, Track), TimelineError> {
        self.tracks
            .shift_remove_full(&track_id)
            .map(|(index, _, track)| (index, track))
            .ok_or(TimelineError::TrackNotFound(track_id))
    }

    /// Get a track
    pub fn track(&self, track_id: TrackId) -> Option<&Track> {
        self.tracks.get(&track_id)
    }

    /// Get a mutable track
    pub fn track_mut(&mut self, track_id: TrackId) -> Option<&mut Track> {
        self.tracks.get_mut(&track_id)
    }

    /// Get a track or a not-found error
    pub fn require_track(&self, track_id: TrackId) -> Result<&Track, TimelineError> {
        self.track(track_id).ok_or(TimelineError::TrackNotFound(track_id))
    }

    /// Get track by position in track order
    pub fn track_at(&self, index: usize) -> Option<&Track> {
        self.tracks.get_index(index).map(|(_, t)| t)
    }

    /// Position of a track in track order
    pub fn track_index(&self, track_id: TrackId) -> Option<usize> {
        self.tracks.get_index_of(&track_id)
    }

    /// Get all tracks in order
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Get track count
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    /// Add an item to the track named by `item.track_id`, returns its index
    pub fn add_item(&mut self, item: Item) -> Result<usize, TimelineError> {
        item.validate()?;
        if self.find_item(item.id).is_some() {
            return Err(TimelineError::DuplicateId(format!("{:?}", item.id)));
        }
        let track_id = item.track_id;
        let track = self
            .tracks
            .get_mut(&track_id)
            .ok_or(TimelineError::TrackNotFound(track_id))?;
        Ok(track.insert_item(item))
    }

    /// Put an item back at a known index on a track
    pub fn insert_item_at(
        &mut self,
        track_id: TrackId,
        index: usize,
        item: Item,
    ) -> Result<(), TimelineError> {
        if self.find_item(item.id).is_some() {
            return Err(TimelineError::DuplicateId(format!("{:?}", item.id)));
        }
        let track = self
            .tracks
            .get_mut(&track_id)
            .ok_or(TimelineError::TrackNotFound(track_id))?;
        track.insert_item_at(index, item);
        Ok(())
    }

    /// Remove an item wherever it lives
    pub fn remove_item(&mut self, item_id: ItemId) -> Result<(TrackId, usize, Item), TimelineError> {
        let location = self
            .item_location(item_id)
            .ok_or(TimelineError::ItemNotFound(item_id))?;
        let track = self
            .tracks
            .get_mut(&location.track_id)
            .ok_or(TimelineError::TrackNotFound(location.track_id))?;
        let (index, item) = track
            .remove_item(item_id)
            .ok_or(TimelineError::ItemNotFound(item_id))?;
        Ok((location.track_id, index, item))
    }

    /// Find an item by ID
    pub fn find_item(&self, item_id: ItemId) -> Option<&Item> {
        self.tracks.values().find_map(|t| t.item(item_id))
    }

    /// Find an item or a not-found error
    pub fn require_item(&self, item_id: ItemId) -> Result<&Item, TimelineError> {
        self.find_item(item_id).ok_or(TimelineError::ItemNotFound(item_id))
    }

    /// Get a mutable item.
    ///
    /// Start time changes must go through remove/insert.
    pub fn item_mut(&mut self, item_id: ItemId) -> Option<&mut Item> {
        self.tracks.values_mut().find_map(|t| t.item_mut(item_id))
    }

    /// Locate an item
    pub fn item_location(&self, item_id: ItemId) -> Option<ItemLocation> {
        self.tracks
            .values()
            .enumerate()
            .find_map(|(track_index, track)| {
                track.item_index(item_id).map(|item_index| ItemLocation {
                    track_id: track.id,
                    track_index,
                    item_index,
                })
            })
    }

    /// Iterate over every item on every track
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.tracks.values().flat_map(|t| t.items().iter())
    }

    /// Total duration: end of the last item, or 0 with no items
    pub fn duration(&self) -> f64 {
        self.tracks
            .values()
            .map(Track::duration)
            .fold(0.0, f64::max)
    }

    // ------------------------------------------------------------------
    // Markers
    // ------------------------------------------------------------------

    /// Check a marker time against the current duration
    pub fn check_marker_time(&self, time: f64) -> Result<(), TimelineError> {
        let duration = self.duration();
        if !time.is_finite() || time < 0.0 || time > duration {
            return Err(TimelineError::InvalidOperation(format!(
                "marker time {time} outside [0, {duration}]"
            )));
        }
        Ok(())
    }

    /// Append a marker. The playhead is unique and cannot be added.
    pub fn add_marker(&mut self, marker: Marker) -> Result<MarkerId, TimelineError> {
        let index = self.markers.len();
        self.insert_marker_at(index, marker)
    }

    /// Insert a marker at a known index
    pub fn insert_marker_at(
        &mut self,
        index: usize,
        marker: Marker,
    ) -> Result<MarkerId, TimelineError> {
        self.check_marker_time(marker.time)?;
        self.place_marker(index, marker)
    }

    /// Put a previously held marker back at `index`.
    ///
    /// Only the time lower bound is checked: a marker may sit past the end
    /// after the items under it shrank.
    pub fn restore_marker_at(
        &mut self,
        index: usize,
        marker: Marker,
    ) -> Result<MarkerId, TimelineError> {
        check_restored_time(marker.time)?;
        self.place_marker(index, marker)
    }

    fn place_marker(&mut self, index: usize, marker: Marker) -> Result<MarkerId, TimelineError> {
        if marker.is_playhead() {
            return Err(TimelineError::InvalidOperation(
                "timeline already has a playhead".to_string(),
            ));
        }
        if self.markers.contains_key(&marker.id) {
            return Err(TimelineError::DuplicateId(format!("{:?}", marker.id)));
        }

        let id = marker.id;
        let index = index.min(self.markers.len());
        self.markers.shift_insert(index, id, marker);
        Ok(id)
    }

    /// Remove a marker, returning its former index
    pub fn remove_marker(&mut self, marker_id: MarkerId) -> Result<(usize, Marker), TimelineError> {
        if marker_id == self.playhead {
            return Err(TimelineError::InvalidOperation(
                "the playhead cannot be removed".to_string(),
            ));
        }
        self.markers
            .shift_remove_full(&marker_id)
            .map(|(index, _, marker)| (index, marker))
            .ok_or(TimelineError::MarkerNotFound(marker_id))
    }

    /// Move a marker, returning its previous time
    pub fn set_marker_time(&mut self, marker_id: MarkerId, time: f64) -> Result<f64, TimelineError> {
        self.check_marker_time(time)?;
        self.replace_marker_time(marker_id, time)
    }

    /// Put a marker back at a time it held before, past the end if need be
    pub fn restore_marker_time(
        &mut self,
        marker_id: MarkerId,
        time: f64,
    ) -> Result<f64, TimelineError> {
        check_restored_time(time)?;
        let time = if marker_id == self.playhead {
            clamp_time(time, self.duration())
        } else {
            time
        };
        self.replace_marker_time(marker_id, time)
    }

    fn replace_marker_time(&mut self, marker_id: MarkerId, time: f64) -> Result<f64, TimelineError> {
        let marker = self
            .markers
            .get_mut(&marker_id)
            .ok_or(TimelineError::MarkerNotFound(marker_id))?;
        Ok(std::mem::replace(&mut marker.time, time))
    }

    /// Get a marker
    pub fn marker(&self, marker_id: MarkerId) -> Option<&Marker> {
        self.markers.get(&marker_id)
    }

    /// Get all markers, playhead included
    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }

    /// Markers of a given kind
    pub fn markers_of(&self, kind: MarkerKind) -> impl Iterator<Item = &Marker> {
        self.markers.values().filter(move |m| m.kind == kind)
    }

    /// The playhead marker
    pub fn playhead(&self) -> &Marker {
        &self.markers[&self.playhead]
    }

    /// Current playhead time
    pub fn playhead_time(&self) -> f64 {
        self.playhead().time
    }

    /// Move the playhead, clamped to `[0, duration]`
    pub fn set_playhead_time(&mut self, time: f64) -> f64 {
        let time = clamp_time(time, self.duration());
        if let Some(marker) = self.markers.get_mut(&self.playhead) {
            marker.time = time;
        }
        time
    }

    // ------------------------------------------------------------------
    // Frames
    // ------------------------------------------------------------------

    /// Convert time to frame number
    pub fn time_to_frame(&self, time: f64) -> u64 {
        (time.max(0.0) * self.frame_rate).round() as u64
    }

    /// Convert frame number to time
    pub fn frame_to_time(&self, frame: u64) -> f64 {
        frame as f64 / self.frame_rate
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new("Untitled Timeline")
    }
}

/// Clamp a time to `[0, duration]`, mapping NaN to 0
pub fn clamp_time(time: f64, duration: f64) -> f64 {
    if time.is_nan() {
        return 0.0;
    }
    time.clamp(0.0, duration.max(0.0))
}

fn check_restored_time(time: f64) -> Result<(), TimelineError> {
    if !time.is_finite() || time < 0.0 {
        return Err(TimelineError::InvalidOperation(format!(
            "marker time {time} is negative or not finite"
        )));
    }
    Ok(())
}
