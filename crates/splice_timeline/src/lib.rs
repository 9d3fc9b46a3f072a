// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline model for the Splice editor.
//!
//! This crate provides the data side of non-linear editing:
//! - Tracks holding time-positioned items
//! - Markers, including the unique playhead
//! - Snapping to item edges, markers and the second grid
//! - A playback clock bounded to the timeline duration
//! - Backend-neutral layout into a draw list
//!
//! ## Architecture
//!
//! The model only offers mutation primitives. Undoable edits are built on top
//! of them by the editor crate's commands.

pub mod clock;
pub mod layout;
pub mod marker;
#[cfg(feature = "egui")]
pub mod paint;
pub mod snap;
pub mod timeline;
pub mod track;

pub use clock::{PlaybackClock, PlaybackState};
pub use layout::{layout, DrawCmd, DrawList, GhostItem, Rect, ViewState, Viewport};
pub use marker::{Marker, MarkerId, MarkerKind};
pub use snap::{SnapCandidates, SnapEngine, SnapResult, MIN_GRID_INTERVAL};
pub use timeline::{clamp_time, ItemLocation, Timeline, TimelineError};
pub use track::{
    AssetDescriptor, AssetRef, Item, ItemId, ItemKind, Track, TrackId, TrackKind,
};
