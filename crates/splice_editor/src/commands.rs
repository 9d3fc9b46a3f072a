// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undoable timeline edits.
//!
//! Every command validates before it mutates, so a failed `execute` leaves the
//! timeline untouched. On success it keeps only what it needs to invert itself
//! (a removed item and its index, the previous start time, the fields a patch
//! overwrote) rather than a snapshot of the timeline.

use serde::{Deserialize, Serialize};
use splice_timeline::{
    Item, ItemId, Marker, MarkerId, Timeline, TimelineError, Track, TrackId,
};
use std::fmt;

/// Error type for command execution
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// The model rejected the edit
    #[error(transparent)]
    Timeline(#[from] TimelineError),

    /// Another command is in flight
    #[error("Another command is in flight")]
    Busy,
}

impl CommandError {
    /// Whether the target of the command no longer exists
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Timeline(e) if e.is_not_found())
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self::Timeline(TimelineError::InvalidOperation(message.into()))
    }
}

/// Kind tag for a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    /// Add an item
    AddItem,
    /// Remove an item
    RemoveItem,
    /// Move an item in time or to another track
    MoveItem,
    /// Trim an item
    ResizeItem,
    /// Split an item in two
    SplitItem,
    /// Add a track
    AddTrack,
    /// Remove a track and its items
    RemoveTrack,
    /// Change track properties
    UpdateTrack,
    /// Change item properties
    UpdateItem,
    /// Add a marker
    AddMarker,
    /// Remove a marker
    RemoveMarker,
    /// Move a marker
    MoveMarker,
    /// Several commands as one undo unit
    Batch,
}

/// An undoable edit against a [`Timeline`]
pub trait Command: Send + fmt::Debug {
    /// Kind tag
    fn kind(&self) -> CommandKind;

    /// Human-readable description for history menus
    fn description(&self) -> String;

    /// Apply the edit. Must not mutate anything when it fails.
    fn execute(&mut self, timeline: &mut Timeline) -> Result<(), CommandError>;

    /// Revert a successful `execute` or `redo`
    fn undo(&mut self, timeline: &mut Timeline) -> Result<(), CommandError>;

    /// Re-apply after an undo
    fn redo(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        self.execute(timeline)
    }
}

/// Validate a start time
fn check_start(start: f64) -> Result<(), CommandError> {
    if !start.is_finite() || start < 0.0 {
        return Err(CommandError::invalid(format!("start time must be >= 0, got {start}")));
    }
    Ok(())
}

/// Validate a duration
fn check_duration(duration: f64) -> Result<(), CommandError> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(CommandError::invalid(format!("duration must be > 0, got {duration}")));
    }
    Ok(())
}

/// Insert an item into a track by start time, bypassing id checks
fn place(timeline: &mut Timeline, track_id: TrackId, item: Item) -> Result<usize, CommandError> {
    let track = timeline
        .track_mut(track_id)
        .ok_or(TimelineError::TrackNotFound(track_id))?;
    Ok(track.insert_item(item))
}

// ----------------------------------------------------------------------------
// Items
// ----------------------------------------------------------------------------

/// Command to add an item to the track named by its `track_id`
#[derive(Debug, Clone)]
pub struct AddItemCommand {
    item: Item,
}

impl AddItemCommand {
    /// Create a new add command
    pub fn new(item: Item) -> Self {
        Self { item }
    }

    /// ID of the item this command adds
    pub fn item_id(&self) -> ItemId {
        self.item.id
    }
}

impl Command for AddItemCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::AddItem
    }

    fn description(&self) -> String {
        format!("Add {}", self.item.name)
    }

    fn execute(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        timeline.add_item(self.item.clone())?;
        Ok(())
    }

    fn undo(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        let (_, _, item) = timeline.remove_item(self.item.id)?;
        self.item = item;
        Ok(())
    }
}

/// Command to remove an item
#[derive(Debug, Clone)]
pub struct RemoveItemCommand {
    item_id: ItemId,
    removed: Option<(TrackId, usize, Item)>,
}

impl RemoveItemCommand {
    /// Create a new remove command
    pub fn new(item_id: ItemId) -> Self {
        Self {
            item_id,
            removed: None,
        }
    }
}

impl Command for RemoveItemCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RemoveItem
    }

    fn description(&self) -> String {
        match &self.removed {
            Some((_, _, item)) => format!("Remove {}", item.name),
            None => "Remove Item".to_string(),
        }
    }

    fn execute(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        self.removed = Some(timeline.remove_item(self.item_id)?);
        Ok(())
    }

    fn undo(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        let Some((track_id, index, item)) = self.removed.clone() else {
            return Err(CommandError::invalid("remove was never executed"));
        };
        timeline.insert_item_at(track_id, index, item)?;
        Ok(())
    }
}

/// Command to move an item in time and optionally to another track
#[derive(Debug, Clone)]
pub struct MoveItemCommand {
    item_id: ItemId,
    new_start: f64,
    new_track: Option<TrackId>,
    /// Track, index and start before the move
    previous: Option<(TrackId, usize, f64)>,
}

impl MoveItemCommand {
    /// Move an item to a new start time on its current track
    pub fn new(item_id: ItemId, new_start: f64) -> Self {
        Self {
            item_id,
            new_start,
            new_track: None,
            previous: None,
        }
    }

    /// Also move the item to another track
    pub fn to_track(mut self, track_id: TrackId) -> Self {
        self.new_track = Some(track_id);
        self
    }
}

impl Command for MoveItemCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::MoveItem
    }

    fn description(&self) -> String {
        "Move Item".to_string()
    }

    fn execute(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        check_start(self.new_start)?;
        let location = timeline
            .item_location(self.item_id)
            .ok_or(TimelineError::ItemNotFound(self.item_id))?;
        let target = self.new_track.unwrap_or(location.track_id);
        timeline.require_track(target)?;

        let (track_id, index, mut item) = timeline.remove_item(self.item_id)?;
        let old_start = std::mem::replace(&mut item.start_time, self.new_start);
        place(timeline, target, item)?;

        self.previous = Some((track_id, index, old_start));
        Ok(())
    }

    fn undo(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        let Some((track_id, index, old_start)) = self.previous else {
            return Err(CommandError::invalid("move was never executed"));
        };
        timeline.require_track(track_id)?;
        let (_, _, mut item) = timeline.remove_item(self.item_id)?;
        item.start_time = old_start;
        timeline.insert_item_at(track_id, index, item)?;
        Ok(())
    }
}

/// Timing state an item had before a trim
#[derive(Debug, Clone, Copy, PartialEq)]
struct ItemTiming {
    index: usize,
    start_time: f64,
    duration: f64,
    source_in: f64,
    fade_in: Option<f64>,
    fade_out: Option<f64>,
}

/// Command to trim an item's start and/or end.
///
/// Moving the start advances `source_in` by the same amount so the media
/// under the remaining part stays put. Fades are clamped to the new length.
#[derive(Debug, Clone)]
pub struct ResizeItemCommand {
    item_id: ItemId,
    new_start: f64,
    new_duration: f64,
    previous: Option<ItemTiming>,
}

impl ResizeItemCommand {
    /// Create a new resize command
    pub fn new(item_id: ItemId, new_start: f64, new_duration: f64) -> Self {
        Self {
            item_id,
            new_start,
            new_duration,
            previous: None,
        }
    }
}

impl Command for ResizeItemCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::ResizeItem
    }

    fn description(&self) -> String {
        "Trim Item".to_string()
    }

    fn execute(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        check_start(self.new_start)?;
        check_duration(self.new_duration)?;
        timeline.require_item(self.item_id)?;

        let (track_id, index, mut item) = timeline.remove_item(self.item_id)?;
        let timing = ItemTiming {
            index,
            start_time: item.start_time,
            duration: item.duration,
            source_in: item.source_in,
            fade_in: item.fade_in,
            fade_out: item.fade_out,
        };

        item.source_in = (item.source_in + self.new_start - item.start_time).max(0.0);
        item.start_time = self.new_start;
        item.duration = self.new_duration;
        item.fade_in = item.fade_in.map(|f| f.min(self.new_duration));
        item.fade_out = item.fade_out.map(|f| f.min(self.new_duration));
        place(timeline, track_id, item)?;

        self.previous = Some(timing);
        Ok(())
    }

    fn undo(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        let Some(timing) = self.previous else {
            return Err(CommandError::invalid("resize was never executed"));
        };
        let (track_id, _, mut item) = timeline.remove_item(self.item_id)?;
        item.start_time = timing.start_time;
        item.duration = timing.duration;
        item.source_in = timing.source_in;
        item.fade_in = timing.fade_in;
        item.fade_out = timing.fade_out;
        timeline.insert_item_at(track_id, timing.index, item)?;
        Ok(())
    }
}

/// Command to split an item in two at a time strictly inside it.
///
/// The IDs of both halves are chosen up front so redo recreates the same items.
#[derive(Debug, Clone)]
pub struct SplitItemCommand {
    item_id: ItemId,
    time: f64,
    left_id: ItemId,
    right_id: ItemId,
    original: Option<(TrackId, usize, Item)>,
}

impl SplitItemCommand {
    /// Create a new split command
    pub fn new(item_id: ItemId, time: f64) -> Self {
        Self {
            item_id,
            time,
            left_id: ItemId::new(),
            right_id: ItemId::new(),
            original: None,
        }
    }

    /// ID of the half before the split point
    pub fn left_id(&self) -> ItemId {
        self.left_id
    }

    /// ID of the half after the split point
    pub fn right_id(&self) -> ItemId {
        self.right_id
    }
}

impl Command for SplitItemCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::SplitItem
    }

    fn description(&self) -> String {
        "Split Item".to_string()
    }

    fn execute(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        let (left, right) =
            timeline
                .require_item(self.item_id)?
                .split_at(self.time, self.left_id, self.right_id)?;

        let (track_id, index, item) = timeline.remove_item(self.item_id)?;
        place(timeline, track_id, left)?;
        place(timeline, track_id, right)?;

        self.original = Some((track_id, index, item));
        Ok(())
    }

    fn undo(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        let Some((track_id, index, item)) = self.original.clone() else {
            return Err(CommandError::invalid("split was never executed"));
        };
        timeline.require_item(self.left_id)?;
        timeline.require_item(self.right_id)?;
        timeline.remove_item(self.left_id)?;
        timeline.remove_item(self.right_id)?;
        timeline.insert_item_at(track_id, index, item)?;
        Ok(())
    }
}

/// Partial update of an item's non-timing properties
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPatch {
    /// New name
    pub name: Option<String>,
    /// New volume (0 to 1)
    pub volume: Option<f32>,
    /// New mute flag
    pub muted: Option<bool>,
    /// New lock flag
    pub locked: Option<bool>,
    /// New fade in (`Some(None)` clears it)
    pub fade_in: Option<Option<f64>>,
    /// New fade out (`Some(None)` clears it)
    pub fade_out: Option<Option<f64>>,
}

impl ItemPatch {
    fn validate(&self, item: &Item) -> Result<(), CommandError> {
        if let Some(volume) = self.volume {
            if !(0.0..=1.0).contains(&volume) {
                return Err(CommandError::invalid(format!("item volume {volume} outside [0, 1]")));
            }
        }
        for fade in [self.fade_in, self.fade_out].into_iter().flatten().flatten() {
            if !(0.0..=item.duration).contains(&fade) {
                return Err(CommandError::invalid(format!(
                    "fade {fade} outside item duration {}",
                    item.duration
                )));
            }
        }
        Ok(())
    }

    /// Apply to an item, returning the patch that reverts it
    fn apply(&self, item: &mut Item) -> ItemPatch {
        ItemPatch {
            name: self
                .name
                .clone()
                .map(|v| std::mem::replace(&mut item.name, v)),
            volume: self.volume.map(|v| std::mem::replace(&mut item.volume, v)),
            muted: self.muted.map(|v| std::mem::replace(&mut item.muted, v)),
            locked: self.locked.map(|v| std::mem::replace(&mut item.locked, v)),
            fade_in: self.fade_in.map(|v| std::mem::replace(&mut item.fade_in, v)),
            fade_out: self.fade_out.map(|v| std::mem::replace(&mut item.fade_out, v)),
        }
    }
}

/// Command to change item properties
#[derive(Debug, Clone)]
pub struct UpdateItemCommand {
    item_id: ItemId,
    patch: ItemPatch,
    previous: Option<ItemPatch>,
}

impl UpdateItemCommand {
    /// Create a new update command
    pub fn new(item_id: ItemId, patch: ItemPatch) -> Self {
        Self {
            item_id,
            patch,
            previous: None,
        }
    }
}

impl Command for UpdateItemCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::UpdateItem
    }

    fn description(&self) -> String {
        match (&self.patch.muted, &self.patch.locked) {
            (Some(true), None) => "Mute Item".to_string(),
            (Some(false), None) => "Unmute Item".to_string(),
            (None, Some(true)) => "Lock Item".to_string(),
            (None, Some(false)) => "Unlock Item".to_string(),
            _ => "Edit Item".to_string(),
        }
    }

    fn execute(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        self.patch.validate(timeline.require_item(self.item_id)?)?;
        let item = timeline
            .item_mut(self.item_id)
            .ok_or(TimelineError::ItemNotFound(self.item_id))?;
        self.previous = Some(self.patch.apply(item));
        Ok(())
    }

    fn undo(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        let Some(previous) = &self.previous else {
            return Err(CommandError::invalid("update was never executed"));
        };
        let item = timeline
            .item_mut(self.item_id)
            .ok_or(TimelineError::ItemNotFound(self.item_id))?;
        previous.apply(item);
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tracks
// ----------------------------------------------------------------------------

/// Command to add a track
#[derive(Debug, Clone)]
pub struct AddTrackCommand {
    track: Track,
    index: Option<usize>,
}

impl AddTrackCommand {
    /// Append a track
    pub fn new(track: Track) -> Self {
        Self { track, index: None }
    }

    /// Insert the track at a position in track order
    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// ID of the track this command adds
    pub fn track_id(&self) -> TrackId {
        self.track.id
    }
}

impl Command for AddTrackCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::AddTrack
    }

    fn description(&self) -> String {
        format!("Add Track {}", self.track.name)
    }

    fn execute(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        let index = self.index.unwrap_or(timeline.track_count());
        timeline.insert_track(index, self.track.clone())?;
        Ok(())
    }

    fn undo(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        let (_, track) = timeline.remove_track(self.track.id)?;
        self.track = track;
        Ok(())
    }
}

/// Command to remove a track together with all of its items
#[derive(Debug, Clone)]
pub struct RemoveTrackCommand {
    track_id: TrackId,
    removed: Option<(usize, Track)>,
}

impl RemoveTrackCommand {
    /// Create a new remove command
    pub fn new(track_id: TrackId) -> Self {
        Self {
            track_id,
            removed: None,
        }
    }
}

impl Command for RemoveTrackCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RemoveTrack
    }

    fn description(&self) -> String {
        match &self.removed {
            Some((_, track)) => format!("Remove Track {}", track.name),
            None => "Remove Track".to_string(),
        }
    }

    fn execute(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        self.removed = Some(timeline.remove_track(self.track_id)?);
        Ok(())
    }

    fn undo(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        let Some((index, track)) = self.removed.clone() else {
            return Err(CommandError::invalid("remove was never executed"));
        };
        timeline.insert_track(index, track)?;
        Ok(())
    }
}

/// Partial update of a track's properties
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackPatch {
    /// New name
    pub name: Option<String>,
    /// New color
    pub color: Option<[u8; 3]>,
    /// New visibility
    pub visible: Option<bool>,
    /// New lock flag
    pub locked: Option<bool>,
    /// New mute flag
    pub muted: Option<bool>,
    /// New solo flag
    pub solo: Option<bool>,
    /// New volume (0 to 1)
    pub volume: Option<f32>,
    /// New pan (-1 to 1)
    pub pan: Option<f32>,
}

impl TrackPatch {
    /// Patch that only toggles mute
    pub fn muted(muted: bool) -> Self {
        Self {
            muted: Some(muted),
            ..Self::default()
        }
    }

    /// Patch that only toggles solo
    pub fn solo(solo: bool) -> Self {
        Self {
            solo: Some(solo),
            ..Self::default()
        }
    }

    /// Patch that only sets volume
    pub fn volume(volume: f32) -> Self {
        Self {
            volume: Some(volume),
            ..Self::default()
        }
    }

    /// Patch that only sets pan
    pub fn pan(pan: f32) -> Self {
        Self {
            pan: Some(pan),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), CommandError> {
        if let Some(volume) = self.volume {
            if !(0.0..=1.0).contains(&volume) {
                return Err(CommandError::invalid(format!("track volume {volume} outside [0, 1]")));
            }
        }
        if let Some(pan) = self.pan {
            if !(-1.0..=1.0).contains(&pan) {
                return Err(CommandError::invalid(format!("track pan {pan} outside [-1, 1]")));
            }
        }
        Ok(())
    }

    /// Apply to a track, returning the patch that reverts it
    fn apply(&self, track: &mut Track) -> TrackPatch {
        TrackPatch {
            name: self
                .name
                .clone()
                .map(|v| std::mem::replace(&mut track.name, v)),
            color: self.color.map(|v| std::mem::replace(&mut track.color, v)),
            visible: self.visible.map(|v| std::mem::replace(&mut track.visible, v)),
            locked: self.locked.map(|v| std::mem::replace(&mut track.locked, v)),
            muted: self.muted.map(|v| std::mem::replace(&mut track.muted, v)),
            solo: self.solo.map(|v| std::mem::replace(&mut track.solo, v)),
            volume: self.volume.map(|v| std::mem::replace(&mut track.volume, v)),
            pan: self.pan.map(|v| std::mem::replace(&mut track.pan, v)),
        }
    }
}

/// Command to change track properties
#[derive(Debug, Clone)]
pub struct UpdateTrackCommand {
    track_id: TrackId,
    patch: TrackPatch,
    previous: Option<TrackPatch>,
}

impl UpdateTrackCommand {
    /// Create a new update command
    pub fn new(track_id: TrackId, patch: TrackPatch) -> Self {
        Self {
            track_id,
            patch,
            previous: None,
        }
    }
}

impl Command for UpdateTrackCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::UpdateTrack
    }

    fn description(&self) -> String {
        let p = &self.patch;
        match (p.muted, p.solo, p.volume, p.pan) {
            (Some(true), None, None, None) => "Mute Track".to_string(),
            (Some(false), None, None, None) => "Unmute Track".to_string(),
            (None, Some(true), None, None) => "Solo Track".to_string(),
            (None, Some(false), None, None) => "Unsolo Track".to_string(),
            (None, None, Some(_), None) => "Change Track Volume".to_string(),
            (None, None, None, Some(_)) => "Change Track Pan".to_string(),
            _ => "Edit Track".to_string(),
        }
    }

    fn execute(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        self.patch.validate()?;
        let track = timeline
            .track_mut(self.track_id)
            .ok_or(TimelineError::TrackNotFound(self.track_id))?;
        self.previous = Some(self.patch.apply(track));
        Ok(())
    }

    fn undo(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        let Some(previous) = &self.previous else {
            return Err(CommandError::invalid("update was never executed"));
        };
        let track = timeline
            .track_mut(self.track_id)
            .ok_or(TimelineError::TrackNotFound(self.track_id))?;
        previous.apply(track);
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Markers
// ----------------------------------------------------------------------------

/// Command to add a marker
#[derive(Debug, Clone)]
pub struct AddMarkerCommand {
    marker: Marker,
}

impl AddMarkerCommand {
    /// Create a new add command
    pub fn new(marker: Marker) -> Self {
        Self { marker }
    }
}

impl Command for AddMarkerCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::AddMarker
    }

    fn description(&self) -> String {
        format!("Add Marker {}", self.marker.label)
    }

    fn execute(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        timeline.add_marker(self.marker.clone())?;
        Ok(())
    }

    fn undo(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        let (_, marker) = timeline.remove_marker(self.marker.id)?;
        self.marker = marker;
        Ok(())
    }
}

/// Command to remove a marker other than the playhead
#[derive(Debug, Clone)]
pub struct RemoveMarkerCommand {
    marker_id: MarkerId,
    removed: Option<(usize, Marker)>,
}

impl RemoveMarkerCommand {
    /// Create a new remove command
    pub fn new(marker_id: MarkerId) -> Self {
        Self {
            marker_id,
            removed: None,
        }
    }
}

impl Command for RemoveMarkerCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RemoveMarker
    }

    fn description(&self) -> String {
        "Remove Marker".to_string()
    }

    fn execute(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        self.removed = Some(timeline.remove_marker(self.marker_id)?);
        Ok(())
    }

    fn undo(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        let Some((index, marker)) = self.removed.clone() else {
            return Err(CommandError::invalid("remove was never executed"));
        };
        timeline.restore_marker_at(index, marker)?;
        Ok(())
    }
}

/// Command to move a marker
#[derive(Debug, Clone)]
pub struct MoveMarkerCommand {
    marker_id: MarkerId,
    time: f64,
    previous: Option<f64>,
}

impl MoveMarkerCommand {
    /// Create a new move command
    pub fn new(marker_id: MarkerId, time: f64) -> Self {
        Self {
            marker_id,
            time,
            previous: None,
        }
    }
}

impl Command for MoveMarkerCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::MoveMarker
    }

    fn description(&self) -> String {
        "Move Marker".to_string()
    }

    fn execute(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        self.previous = Some(timeline.set_marker_time(self.marker_id, self.time)?);
        Ok(())
    }

    fn undo(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        let Some(previous) = self.previous else {
            return Err(CommandError::invalid("move was never executed"));
        };
        timeline.restore_marker_time(self.marker_id, previous)?;
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Batch
// ----------------------------------------------------------------------------

/// Several commands executed as one undo unit.
///
/// All or nothing: when a sub-command fails the ones before it are rolled back
/// in reverse order. Undo runs in reverse order, redo in forward order. A
/// failed undo redoes the sub-commands it already undid.
#[derive(Debug)]
pub struct BatchCommand {
    description: String,
    commands: Vec<Box<dyn Command>>,
}

impl BatchCommand {
    /// Create a new batch
    pub fn new(description: impl Into<String>, commands: Vec<Box<dyn Command>>) -> Self {
        Self {
            description: description.into(),
            commands,
        }
    }

    /// Number of sub-commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the batch has no sub-commands
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    fn rollback(&mut self, applied: usize, timeline: &mut Timeline) {
        for command in self.commands[..applied].iter_mut().rev() {
            if let Err(e) = command.undo(timeline) {
                tracing::warn!(
                    "Rollback of '{}' in batch '{}' failed: {}",
                    command.description(),
                    self.description,
                    e
                );
            }
        }
    }

    fn reapply(&mut self, from: usize, timeline: &mut Timeline) {
        for command in self.commands[from..].iter_mut() {
            if let Err(e) = command.redo(timeline) {
                tracing::warn!(
                    "Reapply of '{}' in batch '{}' failed: {}",
                    command.description(),
                    self.description,
                    e
                );
            }
        }
    }

    fn run_forward(
        &mut self,
        timeline: &mut Timeline,
        redo: bool,
    ) -> Result<(), CommandError> {
        if self.commands.is_empty() {
            return Err(CommandError::invalid("empty batch"));
        }
        for i in 0..self.commands.len() {
            let command = &mut self.commands[i];
            let result = if redo {
                command.redo(timeline)
            } else {
                command.execute(timeline)
            };
            if let Err(e) = result {
                tracing::warn!(
                    "Batch '{}' failed at step {} ({}): {}",
                    self.description,
                    i,
                    command.description(),
                    e
                );
                self.rollback(i, timeline);
                return Err(e);
            }
        }
        Ok(())
    }
}

impl Command for BatchCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::Batch
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn execute(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        self.run_forward(timeline, false)
    }

    fn undo(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        for i in (0..self.commands.len()).rev() {
            let command = &mut self.commands[i];
            if let Err(e) = command.undo(timeline) {
                tracing::warn!(
                    "Undo of batch '{}' failed at step {} ({}): {}",
                    self.description,
                    i,
                    command.description(),
                    e
                );
                self.reapply(i + 1, timeline);
                return Err(e);
            }
        }
        Ok(())
    }

    fn redo(&mut self, timeline: &mut Timeline) -> Result<(), CommandError> {
        self.run_forward(timeline, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splice_timeline::{AssetRef, ItemKind, MarkerKind, TrackKind};

    fn timeline_with_track() -> (Timeline, TrackId) {
        let mut timeline = Timeline::new("Test");
        let track = timeline.add_track(Track::new("V1", TrackKind::Video)).unwrap();
        (timeline, track)
    }

    fn clip(track: TrackId, start: f64, duration: f64) -> Item {
        Item::new(track, ItemKind::Video, AssetRef::new("clip.mp4"), start, duration)
    }

    #[test]
    fn test_add_item_round_trip() {
        let (mut timeline, track) = timeline_with_track();
        let before = timeline.clone();
        let item = clip(track, 1.0, 2.0);
        let id = item.id;

        let mut cmd = AddItemCommand::new(item);
        cmd.execute(&mut timeline).unwrap();
        assert!(timeline.find_item(id).is_some());
        let after = timeline.clone();

        cmd.undo(&mut timeline).unwrap();
        assert_eq!(timeline, before);
        cmd.redo(&mut timeline).unwrap();
        assert_eq!(timeline, after);
    }

    #[test]
    fn test_add_item_to_missing_track_fails() {
        let (mut timeline, _) = timeline_with_track();
        let before = timeline.clone();
        let mut cmd = AddItemCommand::new(clip(TrackId::new(), 0.0, 1.0));

        let err = cmd.execute(&mut timeline).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(timeline, before);
    }

    #[test]
    fn test_remove_item_restores_position() {
        let (mut timeline, track) = timeline_with_track();
        let ids: Vec<_> = [0.0, 1.0, 1.0, 3.0]
            .iter()
            .map(|s| {
                let item = clip(track, *s, 1.0);
                let id = item.id;
                timeline.add_item(item).unwrap();
                id
            })
            .collect();
        let before = timeline.clone();

        let mut cmd = RemoveItemCommand::new(ids[2]);
        cmd.execute(&mut timeline).unwrap();
        assert_eq!(timeline.track(track).unwrap().item_count(), 3);
        cmd.undo(&mut timeline).unwrap();
        assert_eq!(timeline, before);
    }

    #[test]
    fn test_move_item_between_tracks() {
        let (mut timeline, v1) = timeline_with_track();
        let v2 = timeline.add_track(Track::new("V2", TrackKind::Video)).unwrap();
        let item = clip(v1, 1.0, 2.0);
        let id = item.id;
        timeline.add_item(item).unwrap();
        let before = timeline.clone();

        let mut cmd = MoveItemCommand::new(id, 4.0).to_track(v2);
        cmd.execute(&mut timeline).unwrap();
        let moved = timeline.find_item(id).unwrap();
        assert_eq!(moved.track_id, v2);
        assert_eq!(moved.start_time, 4.0);
        assert_eq!(timeline.track(v1).unwrap().item_count(), 0);

        cmd.undo(&mut timeline).unwrap();
        assert_eq!(timeline, before);
    }

    #[test]
    fn test_move_rejects_negative_start() {
        let (mut timeline, track) = timeline_with_track();
        let item = clip(track, 1.0, 2.0);
        let id = item.id;
        timeline.add_item(item).unwrap();
        let before = timeline.clone();

        let err = MoveItemCommand::new(id, -0.5).execute(&mut timeline).unwrap_err();
        assert!(matches!(
            err,
            CommandError::Timeline(TimelineError::InvalidOperation(_))
        ));
        assert_eq!(timeline, before);
    }

    #[test]
    fn test_resize_left_edge_advances_source() {
        let (mut timeline, track) = timeline_with_track();
        let item = clip(track, 2.0, 4.0).with_fades(Some(1.0), Some(3.0));
        let id = item.id;
        timeline.add_item(item).unwrap();
        let before = timeline.clone();

        let mut cmd = ResizeItemCommand::new(id, 3.0, 2.0);
        cmd.execute(&mut timeline).unwrap();
        let trimmed = timeline.find_item(id).unwrap();
        assert_eq!(trimmed.source_in, 1.0);
        assert_eq!(trimmed.end_time(), 5.0);
        assert_eq!(trimmed.fade_out, Some(2.0));

        cmd.undo(&mut timeline).unwrap();
        assert_eq!(timeline, before);
    }

    #[test]
    fn test_split_partitions_range() {
        let (mut timeline, track) = timeline_with_track();
        let item = clip(track, 2.0, 4.0).with_fades(Some(0.5), Some(0.5));
        let id = item.id;
        timeline.add_item(item).unwrap();
        let before = timeline.clone();

        let mut cmd = SplitItemCommand::new(id, 3.5);
        cmd.execute(&mut timeline).unwrap();
        assert!(timeline.find_item(id).is_none());

        let left = timeline.find_item(cmd.left_id()).unwrap().clone();
        let right = timeline.find_item(cmd.right_id()).unwrap().clone();
        assert_eq!(left.start_time, 2.0);
        assert_eq!(left.end_time(), 3.5);
        assert_eq!(right.start_time, 3.5);
        assert_eq!(right.end_time(), 6.0);
        assert_eq!(left.duration + right.duration, 4.0);
        assert_eq!(right.source_in, 1.5);
        assert_eq!(left.fade_in, Some(0.5));
        assert_eq!(left.fade_out, None);
        assert_eq!(right.fade_out, Some(0.5));
        let after = timeline.clone();

        cmd.undo(&mut timeline).unwrap();
        assert_eq!(timeline, before);
        cmd.redo(&mut timeline).unwrap();
        assert_eq!(timeline, after);
    }

    #[test]
    fn test_split_outside_item_is_invalid() {
        let (mut timeline, track) = timeline_with_track();
        let item = clip(track, 2.0, 4.0);
        let id = item.id;
        timeline.add_item(item).unwrap();
        let before = timeline.clone();

        for t in [2.0, 6.0, 7.0] {
            let err = SplitItemCommand::new(id, t).execute(&mut timeline).unwrap_err();
            assert!(!err.is_not_found());
        }
        assert_eq!(timeline, before);
    }

    #[test]
    fn test_remove_track_restores_items_and_position() {
        let mut timeline = Timeline::new("Test");
        let a1 = timeline.add_track(Track::new("A1", TrackKind::Audio)).unwrap();
        let a2 = timeline.add_track(Track::new("A2", TrackKind::Audio)).unwrap();
        timeline.add_track(Track::new("A3", TrackKind::Audio)).unwrap();
        for (start, volume) in [(0.0, 0.2), (2.0, 0.5), (4.0, 0.9)] {
            let item = Item::new(a2, ItemKind::Audio, AssetRef::new("vo.wav"), start, 1.5)
                .with_volume(volume)
                .with_fades(Some(0.25), None);
            timeline.add_item(item).unwrap();
        }
        let before = timeline.clone();

        let mut cmd = RemoveTrackCommand::new(a2);
        cmd.execute(&mut timeline).unwrap();
        assert_eq!(timeline.track_count(), 2);
        assert_eq!(timeline.items().count(), 0);

        cmd.undo(&mut timeline).unwrap();
        assert_eq!(timeline, before);
        assert_eq!(timeline.track_index(a2), Some(1));
        assert_eq!(timeline.track_at(0).unwrap().id, a1);
    }

    #[test]
    fn test_update_track_stores_only_changed_fields() {
        let (mut timeline, track) = timeline_with_track();
        let before = timeline.clone();

        let mut cmd = UpdateTrackCommand::new(track, TrackPatch::muted(true));
        assert_eq!(cmd.description(), "Mute Track");
        cmd.execute(&mut timeline).unwrap();
        assert!(timeline.track(track).unwrap().muted);
        assert_eq!(cmd.previous, Some(TrackPatch::muted(false)));

        cmd.undo(&mut timeline).unwrap();
        assert_eq!(timeline, before);
    }

    #[test]
    fn test_update_track_rejects_bad_pan() {
        let (mut timeline, track) = timeline_with_track();
        let mut cmd = UpdateTrackCommand::new(track, TrackPatch::pan(1.5));
        assert!(cmd.execute(&mut timeline).is_err());
        assert_eq!(timeline.track(track).unwrap().pan, 0.0);
    }

    #[test]
    fn test_update_item_fades() {
        let (mut timeline, track) = timeline_with_track();
        let item = clip(track, 0.0, 2.0);
        let id = item.id;
        timeline.add_item(item).unwrap();

        let patch = ItemPatch {
            fade_in: Some(Some(3.0)),
            ..ItemPatch::default()
        };
        assert!(UpdateItemCommand::new(id, patch).execute(&mut timeline).is_err());

        let patch = ItemPatch {
            fade_in: Some(Some(0.5)),
            volume: Some(0.3),
            ..ItemPatch::default()
        };
        let mut cmd = UpdateItemCommand::new(id, patch);
        cmd.execute(&mut timeline).unwrap();
        assert_eq!(timeline.find_item(id).unwrap().fade_in, Some(0.5));
        cmd.undo(&mut timeline).unwrap();
        let item = timeline.find_item(id).unwrap();
        assert_eq!(item.fade_in, None);
        assert_eq!(item.volume, 1.0);
    }

    #[test]
    fn test_marker_commands() {
        let (mut timeline, track) = timeline_with_track();
        timeline.add_item(clip(track, 0.0, 10.0)).unwrap();
        let before = timeline.clone();

        let marker = Marker::new(MarkerKind::Chapter, 2.0, "Intro");
        let marker_id = marker.id;
        let mut add = AddMarkerCommand::new(marker);
        add.execute(&mut timeline).unwrap();

        let mut mv = MoveMarkerCommand::new(marker_id, 4.0);
        mv.execute(&mut timeline).unwrap();
        assert_eq!(timeline.marker(marker_id).unwrap().time, 4.0);
        assert!(MoveMarkerCommand::new(marker_id, 11.0)
            .execute(&mut timeline)
            .is_err());

        mv.undo(&mut timeline).unwrap();
        assert_eq!(timeline.marker(marker_id).unwrap().time, 2.0);
        add.undo(&mut timeline).unwrap();
        assert_eq!(timeline, before);
    }

    #[test]
    fn test_marker_undo_past_shrunk_end() {
        let (mut timeline, track) = timeline_with_track();
        let item = clip(track, 0.0, 10.0);
        let item_id = item.id;
        timeline.add_item(item).unwrap();
        let marker = Marker::new(MarkerKind::Chapter, 8.0, "Outro");
        let marker_id = marker.id;
        timeline.add_marker(marker).unwrap();

        let mut remove = RemoveMarkerCommand::new(marker_id);
        remove.execute(&mut timeline).unwrap();
        let mut resize = ResizeItemCommand::new(item_id, 0.0, 5.0);
        resize.execute(&mut timeline).unwrap();
        remove.undo(&mut timeline).unwrap();
        assert_eq!(timeline.marker(marker_id).unwrap().time, 8.0);
        assert_eq!(timeline.duration(), 5.0);

        let mut mv = MoveMarkerCommand::new(marker_id, 3.0);
        mv.execute(&mut timeline).unwrap();
        mv.undo(&mut timeline).unwrap();
        assert_eq!(timeline.marker(marker_id).unwrap().time, 8.0);
    }

    #[test]
    fn test_playhead_cannot_be_removed() {
        let (mut timeline, _) = timeline_with_track();
        let playhead = timeline.playhead().id;
        assert!(RemoveMarkerCommand::new(playhead)
            .execute(&mut timeline)
            .is_err());
        assert_eq!(timeline.playhead().id, playhead);
    }

    #[test]
    fn test_batch_rolls_back_on_failure() {
        let (mut timeline, track) = timeline_with_track();
        let item = clip(track, 0.0, 1.0);
        let id = item.id;
        timeline.add_item(item).unwrap();
        let before = timeline.clone();

        let mut batch = BatchCommand::new(
            "Broken",
            vec![
                Box::new(MoveItemCommand::new(id, 5.0)),
                Box::new(AddItemCommand::new(clip(track, 2.0, 1.0))),
                Box::new(RemoveItemCommand::new(ItemId::new())),
            ],
        );
        let err = batch.execute(&mut timeline).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(timeline, before);
    }

    #[test]
    fn test_batch_undo_runs_in_reverse() {
        let (mut timeline, track) = timeline_with_track();
        let before = timeline.clone();
        let item = clip(track, 0.0, 4.0);
        let id = item.id;
        let split = SplitItemCommand::new(id, 1.0);
        let right = split.right_id();

        let mut batch = BatchCommand::new(
            "Add and Split",
            vec![
                Box::new(AddItemCommand::new(item)),
                Box::new(split),
                Box::new(MoveItemCommand::new(right, 6.0)),
            ],
        );
        batch.execute(&mut timeline).unwrap();
        assert_eq!(timeline.duration(), 9.0);
        let after = timeline.clone();

        batch.undo(&mut timeline).unwrap();
        assert_eq!(timeline, before);
        batch.redo(&mut timeline).unwrap();
        assert_eq!(timeline, after);
    }

    #[derive(Debug)]
    struct StuckUndo;

    impl Command for StuckUndo {
        fn kind(&self) -> CommandKind {
            CommandKind::UpdateItem
        }

        fn description(&self) -> String {
            "Stuck".to_string()
        }

        fn execute(&mut self, _timeline: &mut Timeline) -> Result<(), CommandError> {
            Ok(())
        }

        fn undo(&mut self, _timeline: &mut Timeline) -> Result<(), CommandError> {
            Err(CommandError::invalid("cannot undo"))
        }
    }

    #[test]
    fn test_failed_batch_undo_keeps_state() {
        let (mut timeline, track) = timeline_with_track();
        let item = clip(track, 0.0, 1.0);
        let id = item.id;
        timeline.add_item(item).unwrap();

        let mut batch = BatchCommand::new(
            "Partly Stuck",
            vec![
                Box::new(StuckUndo),
                Box::new(AddItemCommand::new(clip(track, 2.0, 1.0))),
                Box::new(MoveItemCommand::new(id, 5.0)),
            ],
        );
        batch.execute(&mut timeline).unwrap();
        let after = timeline.clone();

        let err = batch.undo(&mut timeline).unwrap_err();
        assert_eq!(timeline, after);
        assert!(!err.is_not_found());

        assert_eq!(batch.undo(&mut timeline).unwrap_err(), err);
        assert_eq!(timeline, after);
    }

    #[test]
    fn test_empty_batch_is_invalid() {
        let (mut timeline, _) = timeline_with_track();
        assert!(BatchCommand::new("Nothing", Vec::new())
            .execute(&mut timeline)
            .is_err());
    }
}
