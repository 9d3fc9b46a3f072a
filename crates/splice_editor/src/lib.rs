// SPDX-License-Identifier: MIT OR Apache-2.0
//! Splice editor core.
//!
//! Everything between the timeline model and a host UI:
//! - Undoable commands and the bounded undo/redo stack
//! - Pointer interaction (drag, trim, marker and playhead gestures)
//! - Selection, clipboard and the control surface
//! - The [`Engine`] facade that keeps audio, playback and listeners in step
//!   with every committed change
//!
//! ## Architecture
//!
//! The host owns rendering, input devices, asset decoding and the clipboard
//! backend. It feeds pointer events and [`ControlAction`]s into the engine and
//! redraws from [`Engine::draw_list`] after each [`StateChanged`].

pub mod clipboard;
pub mod commands;
pub mod config;
pub mod controls;
pub mod engine;
pub mod history;
pub mod interaction;
pub mod selection;

pub use clipboard::{
    ClipboardCapability, ClipboardError, ClipboardPayload, DeniedClipboard, MemoryClipboard,
};
pub use commands::{
    AddItemCommand, AddMarkerCommand, AddTrackCommand, BatchCommand, Command, CommandError,
    CommandKind, ItemPatch, MoveItemCommand, MoveMarkerCommand, RemoveItemCommand,
    RemoveMarkerCommand, RemoveTrackCommand, ResizeItemCommand, SplitItemCommand, TrackPatch,
    UpdateItemCommand, UpdateTrackCommand,
};
pub use config::{EditorSettings, SettingsError};
pub use controls::{ControlAction, ControlOutcome};
pub use engine::{ChangeCause, Engine, EngineError, ListenerId, SharedEngine, StateChanged};
pub use history::{CommandStack, Committed, HistoryState, MAX_HISTORY};
pub use interaction::{HitTarget, InteractionState, InteractionStateMachine, Modifiers, TrimEdge};
pub use selection::{SelectMode, Selection};
