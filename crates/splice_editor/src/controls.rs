// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor actions a host binds to keys, menus or toolbar buttons.

use crate::clipboard::{assign_tracks, ClipboardPayload};
use crate::commands::{
    AddItemCommand, AddTrackCommand, BatchCommand, Command, CommandError, MoveItemCommand,
    RemoveItemCommand, RemoveTrackCommand, SplitItemCommand,
};
use crate::engine::{Engine, EngineError, SharedEngine};
use crate::history::Committed;
use crate::selection::is_editable;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use splice_mixer::AudioSink;
use splice_timeline::{Item, ItemId, TimelineError, Track, TrackId, TrackKind};

/// An editor action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ControlAction {
    /// Toggle playback
    PlayPause,
    /// Step by a number of frames (negative steps back)
    StepFrames(i64),
    /// Jump to a time
    Seek(f64),
    /// Split the selected items, or every item, under the playhead
    SplitAtPlayhead,
    /// Copy the selection
    Copy,
    /// Copy the selection, then delete it
    Cut,
    /// Paste at the playhead
    Paste,
    /// Copy the selection to just after itself
    Duplicate,
    /// Delete the selection
    Delete,
    /// Zoom in around the playhead
    ZoomIn,
    /// Zoom out around the playhead
    ZoomOut,
    /// Fit the whole timeline
    ZoomToFit,
    /// Fit the selection
    ZoomToSelection,
    /// Append a track of a kind
    AddTrack(TrackKind),
    /// Remove a track and its items
    RemoveTrack(TrackId),
    /// Toggle snapping
    ToggleSnap,
    /// Toggle ripple edit
    ToggleRipple,
    /// Undo
    Undo,
    /// Redo
    Redo,
}

/// Result of an action
#[derive(Debug, Clone, PartialEq)]
pub enum ControlOutcome {
    /// View, playback or clipboard state changed
    Applied,
    /// A command was recorded
    Committed(Committed),
    /// Nothing to do
    Nothing,
}

impl<S: AudioSink> Engine<S> {
    /// Perform an action
    pub fn apply(&mut self, action: ControlAction) -> Result<ControlOutcome, EngineError> {
        tracing::debug!("Action: {:?}", action);

        match action {
            ControlAction::PlayPause => {
                self.toggle_playback();
                Ok(ControlOutcome::Applied)
            }
            ControlAction::StepFrames(frames) => {
                self.step_frames(frames);
                Ok(ControlOutcome::Applied)
            }
            ControlAction::Seek(time) => {
                self.seek(time);
                Ok(ControlOutcome::Applied)
            }
            ControlAction::SplitAtPlayhead => self.split_at_playhead(),
            ControlAction::Copy => self.copy_selection(),
            ControlAction::Cut => self.cut_selection(),
            ControlAction::Paste => self.paste(),
            ControlAction::Duplicate => self.duplicate_selection(),
            ControlAction::Delete => self.delete_selection(),
            ControlAction::ZoomIn => Ok(self.zoom_step(self.settings.view.zoom_step)),
            ControlAction::ZoomOut => Ok(self.zoom_step(1.0 / self.settings.view.zoom_step)),
            ControlAction::ZoomToFit => Ok(self.zoom_to(Some((0.0, self.timeline.duration())))),
            ControlAction::ZoomToSelection => {
                let range = self.selection.time_range(&self.timeline);
                Ok(self.zoom_to(range))
            }
            ControlAction::AddTrack(kind) => self.append_track(kind),
            ControlAction::RemoveTrack(track_id) => self.remove_track(track_id),
            ControlAction::ToggleSnap => {
                self.snap.enabled = !self.snap.enabled;
                tracing::info!("Snapping {}", if self.snap.enabled { "on" } else { "off" });
                Ok(ControlOutcome::Applied)
            }
            ControlAction::ToggleRipple => {
                self.ripple = !self.ripple;
                tracing::info!("Ripple edit {}", if self.ripple { "on" } else { "off" });
                Ok(ControlOutcome::Applied)
            }
            ControlAction::Undo => Ok(applied_if(self.undo()?)),
            ControlAction::Redo => Ok(applied_if(self.redo()?)),
        }
    }

    fn split_at_playhead(&mut self) -> Result<ControlOutcome, EngineError> {
        let time = self.clock.time();
        let under_playhead = |item: &Item| time > item.start_time && time < item.end_time();

        let targets: Vec<ItemId> = if self.selection.is_empty() {
            self.timeline
                .items()
                .filter(|item| under_playhead(*item) && is_editable(&self.timeline, item))
                .map(|item| item.id)
                .collect()
        } else {
            self.selection
                .resolve(&self.timeline)
                .into_iter()
                .filter(|item| under_playhead(*item) && is_editable(&self.timeline, item))
                .map(|item| item.id)
                .collect()
        };

        let commands: Vec<Box<dyn Command>> = targets
            .into_iter()
            .map(|id| Box::new(SplitItemCommand::new(id, time)) as Box<dyn Command>)
            .collect();
        self.commit("Split Items", commands)
    }

    fn copy_selection(&mut self) -> Result<ControlOutcome, EngineError> {
        let items = self.selection.resolve(&self.timeline);
        if items.is_empty() {
            return Ok(ControlOutcome::Nothing);
        }
        let text = ClipboardPayload::from_items(&self.timeline, &items).encode()?;
        self.clipboard.write(text)?;
        tracing::debug!("Copied {} items", items.len());
        Ok(ControlOutcome::Applied)
    }

    fn cut_selection(&mut self) -> Result<ControlOutcome, EngineError> {
        if self.copy_selection()? == ControlOutcome::Nothing {
            return Ok(ControlOutcome::Nothing);
        }
        match self.delete_selection()? {
            ControlOutcome::Nothing => Ok(ControlOutcome::Applied),
            outcome => Ok(outcome),
        }
    }

    fn paste(&mut self) -> Result<ControlOutcome, EngineError> {
        let text = self.clipboard.read()?;
        let payload = ClipboardPayload::decode(&text)?;
        let at = self.clock.time();
        self.place_copies("Paste", &payload, at)
    }

    fn duplicate_selection(&mut self) -> Result<ControlOutcome, EngineError> {
        let items = self.selection.resolve(&self.timeline);
        let Some((_, end)) = self.selection.time_range(&self.timeline) else {
            return Ok(ControlOutcome::Nothing);
        };
        let payload = ClipboardPayload::from_items(&self.timeline, &items);
        self.place_copies("Duplicate", &payload, end)
    }

    fn place_copies(
        &mut self,
        description: &str,
        payload: &ClipboardPayload,
        at: f64,
    ) -> Result<ControlOutcome, EngineError> {
        let items = assign_tracks(&self.timeline, payload.instantiate(at));
        if items.is_empty() {
            return Ok(ControlOutcome::Nothing);
        }

        let ids: Vec<ItemId> = items.iter().map(|item| item.id).collect();
        let commands: Vec<Box<dyn Command>> = items
            .into_iter()
            .map(|item| Box::new(AddItemCommand::new(item)) as Box<dyn Command>)
            .collect();
        let committed = self.execute(Box::new(BatchCommand::new(description, commands)))?;
        self.selection.set(ids);
        Ok(ControlOutcome::Committed(committed))
    }

    fn delete_selection(&mut self) -> Result<ControlOutcome, EngineError> {
        let removed: Vec<&Item> = self
            .selection
            .resolve(&self.timeline)
            .into_iter()
            .filter(|item| is_editable(&self.timeline, item))
            .collect();
        if removed.is_empty() {
            return Ok(ControlOutcome::Nothing);
        }

        let mut commands: Vec<Box<dyn Command>> = removed
            .iter()
            .map(|item| Box::new(RemoveItemCommand::new(item.id)) as Box<dyn Command>)
            .collect();

        if !self.ripple {
            return self.commit("Delete Items", commands);
        }

        let mut gaps: IndexMap<TrackId, Vec<(f64, f64)>> = IndexMap::new();
        for item in &removed {
            gaps.entry(item.track_id)
                .or_default()
                .push((item.end_time(), item.duration));
        }

        for (track_id, track_gaps) in &gaps {
            let Some(track) = self.timeline.track(*track_id) else {
                continue;
            };
            for item in track.items() {
                if removed.iter().any(|r| r.id == item.id) || item.locked {
                    continue;
                }
                let shift: f64 = track_gaps
                    .iter()
                    .filter(|(end, _)| *end <= item.start_time)
                    .map(|(_, duration)| duration)
                    .sum();
                if shift > 0.0 {
                    let start = (item.start_time - shift).max(0.0);
                    commands.push(Box::new(MoveItemCommand::new(item.id, start)));
                }
            }
        }

        let committed = self.execute(Box::new(BatchCommand::new("Ripple Delete", commands)))?;
        Ok(ControlOutcome::Committed(committed))
    }

    fn zoom_step(&mut self, factor: f64) -> ControlOutcome {
        let view = &self.settings.view;
        let anchor = self.viewport.time_to_x(self.clock.time());
        self.viewport
            .zoom_by(factor, anchor, view.min_zoom, view.max_zoom);
        ControlOutcome::Applied
    }

    fn zoom_to(&mut self, range: Option<(f64, f64)>) -> ControlOutcome {
        match range {
            Some((start, end)) if end > start => {
                let view = &self.settings.view;
                self.viewport
                    .zoom_to_range(start, end, view.min_zoom, view.max_zoom);
                ControlOutcome::Applied
            }
            _ => ControlOutcome::Nothing,
        }
    }

    fn append_track(&mut self, kind: TrackKind) -> Result<ControlOutcome, EngineError> {
        let count = self.timeline.tracks().filter(|t| t.kind == kind).count();
        let name = format!("{}{}", kind.prefix(), count + 1);
        let committed = self.execute(Box::new(AddTrackCommand::new(Track::new(name, kind))))?;
        Ok(ControlOutcome::Committed(committed))
    }

    fn remove_track(&mut self, track_id: TrackId) -> Result<ControlOutcome, EngineError> {
        let track = self
            .timeline
            .require_track(track_id)
            .map_err(CommandError::from)?;
        if track.locked {
            tracing::warn!("Refusing to remove locked track '{}'", track.name);
            return Err(CommandError::from(TimelineError::InvalidOperation(format!(
                "track '{}' is locked",
                track.name
            )))
            .into());
        }
        let committed = self.execute(Box::new(RemoveTrackCommand::new(track_id)))?;
        Ok(ControlOutcome::Committed(committed))
    }

    /// Execute one command as is, or several as a batch
    fn commit(
        &mut self,
        description: &str,
        mut commands: Vec<Box<dyn Command>>,
    ) -> Result<ControlOutcome, EngineError> {
        let command = match commands.len() {
            0 => return Ok(ControlOutcome::Nothing),
            1 => commands.remove(0),
            _ => Box::new(BatchCommand::new(description, commands)),
        };
        let committed = self.execute(command)?;
        Ok(ControlOutcome::Committed(committed))
    }
}

fn applied_if(changed: bool) -> ControlOutcome {
    if changed {
        ControlOutcome::Applied
    } else {
        ControlOutcome::Nothing
    }
}

impl<S: AudioSink> SharedEngine<S> {
    /// Perform an action
    pub fn apply(&self, action: ControlAction) -> Result<ControlOutcome, EngineError> {
        self.with(|engine| engine.apply(action))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::{ClipboardError, DeniedClipboard};
    use crate::commands::{TrackPatch, UpdateTrackCommand};
    use crate::config::EditorSettings;
    use splice_mixer::NullSink;
    use splice_timeline::{AssetRef, ItemKind};

    fn engine() -> Engine<NullSink> {
        Engine::new(NullSink::new(), EditorSettings::default())
    }

    fn add_track(engine: &mut Engine<NullSink>, kind: TrackKind) -> TrackId {
        let outcome = engine.apply(ControlAction::AddTrack(kind)).unwrap();
        assert!(matches!(outcome, ControlOutcome::Committed(_)));
        engine.timeline().tracks().last().unwrap().id
    }

    fn add_clip(
        engine: &mut Engine<NullSink>,
        track: TrackId,
        start: f64,
        duration: f64,
    ) -> ItemId {
        let item = Item::new(track, ItemKind::Video, AssetRef::new("clip"), start, duration);
        let id = item.id;
        engine.execute(Box::new(AddItemCommand::new(item))).unwrap();
        id
    }

    fn start_of(engine: &Engine<NullSink>, id: ItemId) -> f64 {
        engine.timeline().find_item(id).unwrap().start_time
    }

    #[test]
    fn test_add_track_names() {
        let mut engine = engine();
        add_track(&mut engine, TrackKind::Video);
        add_track(&mut engine, TrackKind::Audio);
        add_track(&mut engine, TrackKind::Video);

        let names: Vec<_> = engine.timeline().tracks().map(|t| t.name.clone()).collect();
        assert_eq!(names, vec!["V1", "A1", "V2"]);
    }

    #[test]
    fn test_split_at_playhead() {
        let mut engine = engine();
        let v1 = add_track(&mut engine, TrackKind::Video);
        add_clip(&mut engine, v1, 0.0, 4.0);
        add_clip(&mut engine, v1, 6.0, 2.0);

        engine.apply(ControlAction::Seek(1.5)).unwrap();
        let outcome = engine.apply(ControlAction::SplitAtPlayhead).unwrap();
        assert!(matches!(outcome, ControlOutcome::Committed(c) if c.description == "Split Item"));
        assert_eq!(engine.timeline().track(v1).unwrap().item_count(), 3);

        engine.apply(ControlAction::Seek(5.0)).unwrap();
        assert_eq!(
            engine.apply(ControlAction::SplitAtPlayhead).unwrap(),
            ControlOutcome::Nothing
        );

        engine.apply(ControlAction::Undo).unwrap();
        assert_eq!(engine.timeline().track(v1).unwrap().item_count(), 2);
    }

    #[test]
    fn test_ripple_cut_shifts_later_items() {
        let mut engine = engine();
        let v1 = add_track(&mut engine, TrackKind::Video);
        let a = add_clip(&mut engine, v1, 0.0, 2.0);
        let b = add_clip(&mut engine, v1, 3.0, 1.0);
        let c = add_clip(&mut engine, v1, 5.0, 1.0);
        let depth = engine.history_state().history_size;

        engine.apply(ControlAction::ToggleRipple).unwrap();
        engine.selection_mut().set([b]);
        let outcome = engine.apply(ControlAction::Cut).unwrap();
        assert!(
            matches!(outcome, ControlOutcome::Committed(c) if c.description == "Ripple Delete")
        );

        assert!(engine.timeline().find_item(b).is_none());
        assert_eq!(start_of(&engine, a), 0.0);
        assert_eq!(start_of(&engine, c), 4.0);
        assert_eq!(engine.history_state().history_size, depth + 1);

        engine.apply(ControlAction::Undo).unwrap();
        assert_eq!(start_of(&engine, b), 3.0);
        assert_eq!(start_of(&engine, c), 5.0);
    }

    #[test]
    fn test_delete_without_ripple_leaves_gap() {
        let mut engine = engine();
        let v1 = add_track(&mut engine, TrackKind::Video);
        let b = add_clip(&mut engine, v1, 3.0, 1.0);
        let c = add_clip(&mut engine, v1, 5.0, 1.0);

        engine.selection_mut().set([b]);
        engine.apply(ControlAction::Delete).unwrap();
        assert_eq!(start_of(&engine, c), 5.0);
        assert!(engine.selection().is_empty());
        assert_eq!(engine.apply(ControlAction::Delete).unwrap(), ControlOutcome::Nothing);
    }

    #[test]
    fn test_paste_reassigns_conflicting_track() {
        let mut engine = engine();
        let v1 = add_track(&mut engine, TrackKind::Video);
        let v2 = add_track(&mut engine, TrackKind::Video);
        let a = add_clip(&mut engine, v1, 0.0, 2.0);

        engine.selection_mut().set([a]);
        assert_eq!(engine.apply(ControlAction::Copy).unwrap(), ControlOutcome::Applied);
        engine.apply(ControlAction::Seek(1.0)).unwrap();
        engine.apply(ControlAction::Paste).unwrap();

        let pasted: Vec<_> = engine.selection().resolve(engine.timeline());
        assert_eq!(pasted.len(), 1);
        assert_ne!(pasted[0].id, a);
        assert_eq!(pasted[0].track_id, v2);
        assert_eq!(pasted[0].start_time, 1.0);
        assert_eq!(engine.history_state().undo_description.as_deref(), Some("Paste"));
    }

    #[test]
    fn test_duplicate_places_after_selection() {
        let mut engine = engine();
        let v1 = add_track(&mut engine, TrackKind::Video);
        let a = add_clip(&mut engine, v1, 1.0, 2.0);

        engine.selection_mut().set([a]);
        engine.apply(ControlAction::Duplicate).unwrap();

        let copy = engine.selection().resolve(engine.timeline())[0].clone();
        assert_eq!(copy.track_id, v1);
        assert_eq!(copy.start_time, 3.0);
        assert_eq!(engine.timeline().duration(), 5.0);
    }

    #[test]
    fn test_denied_clipboard_leaves_model_untouched() {
        let mut engine = engine().with_clipboard(DeniedClipboard);
        let v1 = add_track(&mut engine, TrackKind::Video);
        let a = add_clip(&mut engine, v1, 0.0, 2.0);
        let before = engine.timeline().clone();

        engine.selection_mut().set([a]);
        let err = engine.apply(ControlAction::Cut).unwrap_err();
        assert!(matches!(err, EngineError::Clipboard(ClipboardError::Unavailable(_))));
        assert!(matches!(
            engine.apply(ControlAction::Paste),
            Err(EngineError::Clipboard(ClipboardError::Unavailable(_)))
        ));
        assert_eq!(engine.timeline(), &before);
    }

    #[test]
    fn test_paste_from_empty_clipboard() {
        let mut engine = engine();
        assert_eq!(
            engine.apply(ControlAction::Paste),
            Err(EngineError::Clipboard(ClipboardError::Empty))
        );
    }

    #[test]
    fn test_locked_track_not_removed() {
        let mut engine = engine();
        let v1 = add_track(&mut engine, TrackKind::Video);
        engine.timeline.track_mut(v1).unwrap().locked = true;

        let err = engine.apply(ControlAction::RemoveTrack(v1)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Command(CommandError::Timeline(TimelineError::InvalidOperation(_)))
        ));
        assert_eq!(engine.timeline().track_count(), 1);

        engine.timeline.track_mut(v1).unwrap().locked = false;
        engine.apply(ControlAction::RemoveTrack(v1)).unwrap();
        assert_eq!(engine.timeline().track_count(), 0);
    }

    #[test]
    fn test_zoom_actions() {
        let mut engine = engine();
        let v1 = add_track(&mut engine, TrackKind::Video);
        let a = add_clip(&mut engine, v1, 2.0, 4.0);

        engine.apply(ControlAction::ZoomIn).unwrap();
        assert_eq!(engine.viewport().zoom, 125.0);
        engine.apply(ControlAction::ZoomOut).unwrap();
        assert!((engine.viewport().zoom - 100.0).abs() < 1e-9);

        engine.apply(ControlAction::ZoomToFit).unwrap();
        let lane = engine.viewport().lane_width();
        assert!((engine.viewport().zoom - lane / 6.0).abs() < 1e-9);

        assert_eq!(
            engine.apply(ControlAction::ZoomToSelection).unwrap(),
            ControlOutcome::Nothing
        );
        engine.selection_mut().set([a]);
        engine.apply(ControlAction::ZoomToSelection).unwrap();
        assert!((engine.viewport().zoom - lane / 4.0).abs() < 1e-9);
        assert_eq!(engine.viewport().scroll_offset, 2.0);
    }

    #[test]
    fn test_toggles_and_history_actions() {
        let mut engine = engine();
        assert!(engine.snap().enabled);
        engine.apply(ControlAction::ToggleSnap).unwrap();
        assert!(!engine.snap().enabled);

        assert_eq!(engine.apply(ControlAction::Undo).unwrap(), ControlOutcome::Nothing);
        let a1 = add_track(&mut engine, TrackKind::Audio);
        engine
            .execute(Box::new(UpdateTrackCommand::new(a1, TrackPatch::solo(true))))
            .unwrap();
        assert_eq!(engine.apply(ControlAction::Undo).unwrap(), ControlOutcome::Applied);
        assert!(!engine.timeline().track(a1).unwrap().solo);
        assert_eq!(engine.apply(ControlAction::Redo).unwrap(), ControlOutcome::Applied);
        assert!(engine.timeline().track(a1).unwrap().solo);
    }

    #[test]
    fn test_shared_engine_apply() {
        let shared = SharedEngine::new(engine());
        shared.apply(ControlAction::AddTrack(TrackKind::Text)).unwrap();
        let name = shared
            .with(|engine| engine.timeline().tracks().next().map(|t| t.name.clone()))
            .unwrap();
        assert_eq!(name.as_deref(), Some("T1"));
    }
}
