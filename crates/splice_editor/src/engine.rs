// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editing engine: the timeline plus everything derived from it.
//!
//! Every committed execute, undo or redo runs the same follow-up: the audio
//! graph reconciles against the new tracks, the clock is clamped to the new
//! duration, stale selection is dropped, and listeners get exactly one
//! [`StateChanged`].

use crate::clipboard::{ClipboardCapability, ClipboardError, MemoryClipboard};
use crate::commands::{AddItemCommand, Command, CommandError};
use crate::config::EditorSettings;
use crate::history::{CommandStack, Committed, HistoryState};
use crate::interaction::{
    InteractionContext, InteractionState, InteractionStateMachine, Modifiers, Outcome,
};
use crate::selection::Selection;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use splice_mixer::{AudioGraph, AudioSink};
use splice_timeline::{
    layout, AssetDescriptor, DrawList, Item, PlaybackClock, SnapEngine, Timeline, Track, TrackId,
    ViewState, Viewport,
};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Engine errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A command failed or could not run
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The clipboard failed
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
}

/// What produced a state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeCause {
    /// A new command
    Execute,
    /// An undo
    Undo,
    /// A redo
    Redo,
}

/// Notification sent after each committed change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateChanged {
    /// Monotonically increasing revision
    pub revision: u64,
    /// What produced the change
    pub cause: ChangeCause,
    /// Tracks in order, with their items
    pub tracks: Vec<Track>,
    /// Timeline duration
    pub duration: f64,
}

/// Handle returned by [`Engine::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

type Listener = Box<dyn FnMut(&StateChanged) + Send>;

/// The editing engine
pub struct Engine<S: AudioSink> {
    pub(crate) timeline: Timeline,
    pub(crate) history: CommandStack,
    pub(crate) audio: AudioGraph<S>,
    pub(crate) clock: PlaybackClock,
    pub(crate) selection: Selection,
    pub(crate) interaction: InteractionStateMachine,
    pub(crate) viewport: Viewport,
    pub(crate) snap: SnapEngine,
    pub(crate) ripple: bool,
    pub(crate) clipboard: Box<dyn ClipboardCapability>,
    pub(crate) settings: EditorSettings,
    listeners: Vec<(ListenerId, Listener)>,
    revision: u64,
}

impl<S: AudioSink> fmt::Debug for Engine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("timeline", &self.timeline.name)
            .field("tracks", &self.timeline.track_count())
            .field("history", &self.history.state())
            .field("clock", &self.clock)
            .field("selection", &self.selection)
            .field("revision", &self.revision)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl<S: AudioSink> Engine<S> {
    /// Create an engine over an empty timeline
    pub fn new(sink: S, settings: EditorSettings) -> Self {
        let mut timeline = Timeline::new("Untitled Timeline");
        timeline.frame_rate = settings.playback.frame_rate;
        Self::with_timeline(timeline, sink, settings)
    }

    /// Create an engine over an existing timeline
    pub fn with_timeline(timeline: Timeline, sink: S, settings: EditorSettings) -> Self {
        let mut audio = AudioGraph::with_ramp(sink, settings.audio.ramp_ms);
        audio.reconcile(&timeline);

        let mut clock = PlaybackClock::new(timeline.frame_rate);
        clock.seek(timeline.playhead_time(), timeline.duration());

        let mut viewport = Viewport::default();
        viewport.zoom = settings.view.default_zoom;

        let snap = SnapEngine {
            enabled: settings.snap.enabled,
            pixel_tolerance: settings.snap.pixel_tolerance,
            grid_interval: settings.snap.grid_interval,
        };

        tracing::info!(
            "Engine ready: '{}' with {} tracks",
            timeline.name,
            timeline.track_count()
        );

        Self {
            history: CommandStack::with_max_depth(settings.history.depth),
            ripple: settings.editing.ripple,
            timeline,
            audio,
            clock,
            selection: Selection::new(),
            interaction: InteractionStateMachine::new(),
            viewport,
            snap,
            clipboard: Box::new(MemoryClipboard::new()),
            settings,
            listeners: Vec::new(),
            revision: 0,
        }
    }

    /// Use a host-provided clipboard
    pub fn with_clipboard(mut self, clipboard: impl ClipboardCapability + 'static) -> Self {
        self.clipboard = Box::new(clipboard);
        self
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Execute and record a command
    pub fn execute(&mut self, command: Box<dyn Command>) -> Result<Committed, CommandError> {
        let committed = self.history.execute(command, &mut self.timeline)?;
        self.after_commit(ChangeCause::Execute);
        Ok(committed)
    }

    /// Undo the last command. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool, CommandError> {
        let undone = self.history.undo(&mut self.timeline)?;
        if undone {
            self.after_commit(ChangeCause::Undo);
        }
        Ok(undone)
    }

    /// Redo the last undone command. Returns false when there is nothing to redo.
    pub fn redo(&mut self) -> Result<bool, CommandError> {
        let redone = self.history.redo(&mut self.timeline)?;
        if redone {
            self.after_commit(ChangeCause::Redo);
        }
        Ok(redone)
    }

    /// Undo/redo availability for menus
    pub fn history_state(&self) -> HistoryState {
        self.history.state()
    }

    /// Forget all undo and redo entries
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Add an item built from a resolved asset
    pub fn add_asset(
        &mut self,
        track_id: TrackId,
        asset: &AssetDescriptor,
        start_time: f64,
    ) -> Result<Committed, CommandError> {
        let item = Item::from_asset(track_id, asset, start_time);
        self.execute(Box::new(AddItemCommand::new(item)))
    }

    fn after_commit(&mut self, cause: ChangeCause) {
        let report = self.audio.reconcile(&self.timeline);
        if !report.is_empty() {
            tracing::debug!(
                "Audio reconciled: {} created, {} removed, {} updated",
                report.created.len(),
                report.removed.len(),
                report.updated.len()
            );
        }

        let time = self.clock.clamp_to(self.timeline.duration());
        self.timeline.set_playhead_time(time);
        self.selection.retain_existing(&self.timeline);

        self.revision += 1;
        if self.listeners.is_empty() {
            return;
        }
        let event = StateChanged {
            revision: self.revision,
            cause,
            tracks: self.timeline.tracks().cloned().collect(),
            duration: self.timeline.duration(),
        };
        for (_, listener) in &mut self.listeners {
            listener(&event);
        }
    }

    /// Register a state change listener
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&StateChanged) + Send + 'static,
    ) -> ListenerId {
        let id = ListenerId(Uuid::new_v4());
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    // ------------------------------------------------------------------
    // Playback
    // ------------------------------------------------------------------

    /// Advance playback by `delta` seconds and service the audio graph.
    ///
    /// Does not modify the timeline.
    pub fn tick(&mut self, delta: f64) -> f64 {
        let time = self.clock.tick(delta, self.timeline.duration());
        self.audio.apply_pending();
        self.audio.advance((delta * 1000.0) as f32);
        time
    }

    /// Start playback
    pub fn play(&mut self) {
        self.clock.play(self.timeline.duration());
    }

    /// Pause playback and park the playhead where the clock stopped
    pub fn pause(&mut self) {
        self.clock.pause();
        self.sync_playhead();
    }

    /// Toggle between playing and paused
    pub fn toggle_playback(&mut self) {
        self.clock.toggle(self.timeline.duration());
        if !self.clock.is_playing() {
            self.sync_playhead();
        }
    }

    /// Stop and rewind
    pub fn stop(&mut self) {
        self.clock.stop();
        self.sync_playhead();
    }

    /// Jump to a time, clamped to the timeline
    pub fn seek(&mut self, time: f64) -> f64 {
        let time = self.clock.seek(time, self.timeline.duration());
        self.timeline.set_playhead_time(time);
        time
    }

    /// Step by whole frames
    pub fn step_frames(&mut self, frames: i64) -> f64 {
        let time = self.clock.step_frames(frames, self.timeline.duration());
        self.timeline.set_playhead_time(time);
        time
    }

    fn sync_playhead(&mut self) {
        self.timeline.set_playhead_time(self.clock.time());
    }

    // ------------------------------------------------------------------
    // Pointer input
    // ------------------------------------------------------------------

    /// Pointer pressed on the timeline surface
    pub fn pointer_down(
        &mut self,
        x: f64,
        y: f64,
        modifiers: Modifiers,
    ) -> Result<Option<Committed>, CommandError> {
        let ctx = InteractionContext {
            timeline: &self.timeline,
            viewport: &self.viewport,
            snap: &self.snap,
            settings: &self.settings.interaction,
        };
        let outcome = self
            .interaction
            .pointer_down(&ctx, &mut self.selection, x, y, modifiers);
        self.apply_outcome(outcome)
    }

    /// Pointer moved
    pub fn pointer_move(&mut self, x: f64, y: f64) -> Result<Option<Committed>, CommandError> {
        let ctx = InteractionContext {
            timeline: &self.timeline,
            viewport: &self.viewport,
            snap: &self.snap,
            settings: &self.settings.interaction,
        };
        let outcome = self.interaction.pointer_move(&ctx, x, y);
        self.apply_outcome(outcome)
    }

    /// Pointer released: commits the gesture's command, if any
    pub fn pointer_up(&mut self, x: f64, y: f64) -> Result<Option<Committed>, CommandError> {
        let ctx = InteractionContext {
            timeline: &self.timeline,
            viewport: &self.viewport,
            snap: &self.snap,
            settings: &self.settings.interaction,
        };
        let outcome = self.interaction.pointer_up(&ctx, x, y);
        self.apply_outcome(outcome)
    }

    /// Escape: abandon the active gesture
    pub fn cancel_gesture(&mut self) -> bool {
        self.interaction.cancel()
    }

    fn apply_outcome(&mut self, outcome: Outcome) -> Result<Option<Committed>, CommandError> {
        match outcome {
            Outcome::None => Ok(None),
            Outcome::Seek(time) => {
                self.seek(time);
                Ok(None)
            }
            Outcome::Commit(command) => self.execute(command).map(Some),
        }
    }

    // ------------------------------------------------------------------
    // View
    // ------------------------------------------------------------------

    /// Per-frame view state for the renderer
    pub fn view_state(&self) -> ViewState {
        ViewState {
            selection: self.selection.items().to_vec(),
            playhead_time: self.clock.time(),
            snap_guide: self.interaction.snap_guide(),
            ghosts: self.interaction.ghosts(),
        }
    }

    /// Lay out the current frame
    pub fn draw_list(&self) -> DrawList {
        layout(&self.timeline, &self.viewport, &self.view_state())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The timeline
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// The audio graph
    pub fn audio(&self) -> &AudioGraph<S> {
        &self.audio
    }

    /// The audio graph, mutably (live parameter changes, metering)
    pub fn audio_mut(&mut self) -> &mut AudioGraph<S> {
        &mut self.audio
    }

    /// The playback clock
    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    /// Current selection
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Current selection, mutably
    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    /// The viewport
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// The viewport, mutably (resize, scroll)
    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// Snap settings
    pub fn snap(&self) -> &SnapEngine {
        &self.snap
    }

    /// Whether ripple edit is on
    pub fn is_ripple(&self) -> bool {
        self.ripple
    }

    /// Settings the engine was built with
    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    /// Current gesture
    pub fn interaction_state(&self) -> InteractionState {
        self.interaction.state()
    }

    /// Number of committed changes so far
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// Engine shared between threads and callbacks.
///
/// Only one caller runs at a time. A caller that finds the engine busy, for
/// example a listener calling back in while its notification is delivered,
/// gets [`CommandError::Busy`] instead of blocking.
pub struct SharedEngine<S: AudioSink> {
    inner: Arc<Mutex<Engine<S>>>,
}

impl<S: AudioSink> Clone for SharedEngine<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: AudioSink> fmt::Debug for SharedEngine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedEngine").finish_non_exhaustive()
    }
}

impl<S: AudioSink> SharedEngine<S> {
    /// Wrap an engine
    pub fn new(engine: Engine<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Engine<S>>, CommandError> {
        self.inner.try_lock().ok_or(CommandError::Busy)
    }

    /// Run a closure against the engine
    pub fn with<R>(&self, f: impl FnOnce(&mut Engine<S>) -> R) -> Result<R, CommandError> {
        let mut engine = self.lock()?;
        Ok(f(&mut engine))
    }

    /// Execute a command
    pub fn execute(&self, command: Box<dyn Command>) -> Result<Committed, CommandError> {
        self.lock()?.execute(command)
    }

    /// Undo
    pub fn undo(&self) -> Result<bool, CommandError> {
        self.lock()?.undo()
    }

    /// Redo
    pub fn redo(&self) -> Result<bool, CommandError> {
        self.lock()?.redo()
    }

    /// Undo/redo availability
    pub fn history_state(&self) -> Result<HistoryState, CommandError> {
        Ok(self.lock()?.history_state())
    }
}
