// SPDX-License-Identifier: MIT OR Apache-2.0
//! Clipboard capability and the copy/paste payload.
//!
//! The host decides where text actually goes (system clipboard, a browser
//! bridge, nowhere). Items travel as RON so a paste into another timeline
//! keeps every property.

use serde::{Deserialize, Serialize};
use splice_timeline::{Item, ItemId, Timeline, TrackId, TrackKind};
use thiserror::Error;

/// Current clipboard payload version
pub const CLIPBOARD_FORMAT_VERSION: u32 = 1;

/// Clipboard errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClipboardError {
    /// The host denied or does not offer clipboard access
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),

    /// Nothing on the clipboard
    #[error("Clipboard is empty")]
    Empty,

    /// Clipboard contents are not a timeline payload
    #[error("Malformed clipboard contents: {0}")]
    Malformed(String),
}

/// Text clipboard provided by the host
pub trait ClipboardCapability: Send {
    /// Read the current text
    fn read(&mut self) -> Result<String, ClipboardError>;

    /// Replace the current text
    fn write(&mut self, text: String) -> Result<(), ClipboardError>;
}

/// Clipboard held in memory, private to the engine
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    contents: Option<String>,
}

impl MemoryClipboard {
    /// Create an empty clipboard
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents
    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl ClipboardCapability for MemoryClipboard {
    fn read(&mut self) -> Result<String, ClipboardError> {
        self.contents.clone().ok_or(ClipboardError::Empty)
    }

    fn write(&mut self, text: String) -> Result<(), ClipboardError> {
        self.contents = Some(text);
        Ok(())
    }
}

/// Clipboard for hosts that refuse access
#[derive(Debug, Clone, Default)]
pub struct DeniedClipboard;

impl ClipboardCapability for DeniedClipboard {
    fn read(&mut self) -> Result<String, ClipboardError> {
        Err(ClipboardError::Unavailable("read permission denied".to_string()))
    }

    fn write(&mut self, _text: String) -> Result<(), ClipboardError> {
        Err(ClipboardError::Unavailable("write permission denied".to_string()))
    }
}

/// One copied item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipEntry {
    /// The item as it was copied
    pub item: Item,
    /// Kind of the track it came from
    pub track_kind: TrackKind,
    /// Start relative to the earliest copied item
    pub offset: f64,
}

/// Copied items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipboardPayload {
    /// Format version
    pub version: u32,
    /// Items, earliest first
    pub entries: Vec<ClipEntry>,
}

impl ClipboardPayload {
    /// Build a payload from items on a timeline
    pub fn from_items(timeline: &Timeline, items: &[&Item]) -> Self {
        let origin = items
            .iter()
            .map(|i| i.start_time)
            .reduce(f64::min)
            .unwrap_or(0.0);
        let mut entries: Vec<ClipEntry> = items
            .iter()
            .map(|item| ClipEntry {
                item: (*item).clone(),
                track_kind: timeline
                    .track(item.track_id)
                    .map_or_else(|| item.kind.track_kind(), |t| t.kind),
                offset: item.start_time - origin,
            })
            .collect();
        entries.sort_by(|a, b| a.offset.total_cmp(&b.offset));

        Self {
            version: CLIPBOARD_FORMAT_VERSION,
            entries,
        }
    }

    /// Whether there is nothing to paste
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize for the clipboard
    pub fn encode(&self) -> Result<String, ClipboardError> {
        ron::to_string(self).map_err(|e| ClipboardError::Malformed(e.to_string()))
    }

    /// Parse clipboard text
    pub fn decode(text: &str) -> Result<Self, ClipboardError> {
        if text.trim().is_empty() {
            return Err(ClipboardError::Empty);
        }
        let payload: Self =
            ron::from_str(text).map_err(|e| ClipboardError::Malformed(e.to_string()))?;
        if payload.version > CLIPBOARD_FORMAT_VERSION {
            return Err(ClipboardError::Malformed(format!(
                "payload version {} is newer than supported version {}",
                payload.version, CLIPBOARD_FORMAT_VERSION
            )));
        }
        Ok(payload)
    }

    /// Fresh copies placed relative to `at`, with new IDs
    pub fn instantiate(&self, at: f64) -> Vec<(Item, TrackKind)> {
        self.entries
            .iter()
            .map(|entry| {
                let mut item = entry.item.clone();
                item.id = ItemId::new();
                item.start_time = (at + entry.offset).max(0.0);
                (item, entry.track_kind)
            })
            .collect()
    }
}

/// Pick a track for each new item.
///
/// An item keeps its own track when that track is free over the item's range.
/// Otherwise it goes to the first free track of the same kind, and failing
/// that back to its own track (overlap is allowed). Items whose track no
/// longer exists go to the first track of their kind, or are dropped.
pub fn assign_tracks(timeline: &Timeline, items: Vec<(Item, TrackKind)>) -> Vec<Item> {
    let mut placed: Vec<Item> = Vec::with_capacity(items.len());

    for (mut item, kind) in items {
        let (start, end) = (item.start_time, item.end_time());
        let is_free = |track_id: TrackId, placed: &[Item]| {
            timeline
                .track(track_id)
                .is_some_and(|t| !t.has_conflict(start, end, None))
                && !placed
                    .iter()
                    .any(|p| p.track_id == track_id && p.overlaps(start, end))
        };

        let own = timeline.track(item.track_id).map(|t| t.id);
        let target = own
            .filter(|id| is_free(*id, &placed))
            .or_else(|| {
                timeline
                    .tracks()
                    .filter(|t| t.kind == kind)
                    .map(|t| t.id)
                    .find(|id| is_free(*id, &placed))
            })
            .or(own)
            .or_else(|| timeline.tracks().find(|t| t.kind == kind).map(|t| t.id));

        match target {
            Some(track_id) => {
                item.track_id = track_id;
                placed.push(item);
            }
            None => tracing::warn!("No {} track for pasted item '{}'", kind.name(), item.name),
        }
    }

    placed
}
