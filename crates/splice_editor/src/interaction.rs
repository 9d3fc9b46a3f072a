// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pointer interaction state machine.
//!
//! Maps pointer events in pixel space to time-space edits. At most one drag
//! session is active. While it runs the model is never touched: the session
//! only tracks a preview (ghosts and a snap guide). Releasing the pointer turns
//! the session into at most one command; Escape drops it.

use crate::commands::{BatchCommand, Command, MoveItemCommand, MoveMarkerCommand, ResizeItemCommand};
use crate::config::InteractionSettings;
use crate::selection::{is_editable, SelectMode, Selection};
use splice_timeline::layout::{TRACK_HEADER_WIDTH, TRACK_HEIGHT};
use splice_timeline::{
    clamp_time, GhostItem, Item, ItemId, MarkerId, SnapCandidates, SnapEngine, Timeline,
    Viewport,
};

/// Keyboard modifiers held during a click
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Shift is held
    pub shift: bool,
}

impl Modifiers {
    /// Shift held
    pub const SHIFT: Self = Self { shift: true };
}

/// Which edge of an item a trim handle belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimEdge {
    /// Left edge (moves the start)
    Start,
    /// Right edge (moves the end)
    End,
}

/// What lies under the pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    /// Trim handle of an item
    TrimHandle {
        /// The item
        item: ItemId,
        /// The edge
        edge: TrimEdge,
    },
    /// Marker flag in the ruler
    Marker(MarkerId),
    /// Item body
    Item(ItemId),
    /// Nothing: clicks here move the playhead
    Empty,
}

/// Public view of the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    /// No drag
    Idle,
    /// Scrubbing the playhead
    DraggingPlayhead,
    /// Moving one or more items
    DraggingItem,
    /// Moving a marker
    DraggingMarker,
    /// Trimming an item edge
    DraggingTrimHandle,
}

/// What the engine should do after a pointer event
#[derive(Debug)]
pub enum Outcome {
    /// Nothing beyond the preview
    None,
    /// Move the playhead (no command)
    Seek(f64),
    /// Execute the command produced by a finished drag
    Commit(Box<dyn Command>),
}

/// Read-only state a pointer event is evaluated against
#[derive(Debug, Clone, Copy)]
pub struct InteractionContext<'a> {
    /// The timeline
    pub timeline: &'a Timeline,
    /// Current viewport
    pub viewport: &'a Viewport,
    /// Snap settings
    pub snap: &'a SnapEngine,
    /// Hit radii
    pub settings: &'a InteractionSettings,
}

impl InteractionContext<'_> {
    fn min_duration(&self) -> f64 {
        if self.timeline.frame_rate > 0.0 {
            1.0 / self.timeline.frame_rate
        } else {
            0.01
        }
    }

    fn snap_tolerance(&self) -> f64 {
        self.snap.tolerance(self.viewport.zoom)
    }

    fn is_editable(&self, item: &Item) -> bool {
        is_editable(self.timeline, item)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DraggedItem {
    id: ItemId,
    track_index: usize,
    start: f64,
    duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
enum Session {
    Idle,
    Playhead,
    Items {
        origin: (f64, f64),
        items: Vec<DraggedItem>,
        anchor: usize,
        candidates: SnapCandidates,
        delta: f64,
        anchor_start: f64,
        track_offset: isize,
        snapped_to: Option<f64>,
    },
    Marker {
        id: MarkerId,
        origin_x: f64,
        origin_time: f64,
        candidates: SnapCandidates,
        time: f64,
        snapped_to: Option<f64>,
    },
    Trim {
        item: DraggedItem,
        edge: TrimEdge,
        origin_x: f64,
        source_in: f64,
        candidates: SnapCandidates,
        start: f64,
        duration: f64,
        snapped_to: Option<f64>,
    },
}

/// Pointer state machine for the timeline surface
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionStateMachine {
    session: Session,
}

impl InteractionStateMachine {
    /// Create an idle state machine
    pub fn new() -> Self {
        Self {
            session: Session::Idle,
        }
    }

    /// Current session kind
    pub fn state(&self) -> InteractionState {
        match self.session {
            Session::Idle => InteractionState::Idle,
            Session::Playhead => InteractionState::DraggingPlayhead,
            Session::Items { .. } => InteractionState::DraggingItem,
            Session::Marker { .. } => InteractionState::DraggingMarker,
            Session::Trim { .. } => InteractionState::DraggingTrimHandle,
        }
    }

    /// Whether no drag is active
    pub fn is_idle(&self) -> bool {
        self.session == Session::Idle
    }

    /// Find what is under a point
    pub fn hit_test(&self, ctx: &InteractionContext<'_>, x: f64, y: f64) -> HitTarget {
        let viewport = ctx.viewport;

        if viewport.in_ruler(y) {
            let radius = ctx.settings.marker_hit_radius_px;
            return ctx
                .timeline
                .markers()
                .filter(|m| !m.is_playhead())
                .map(|m| (m.id, (viewport.time_to_x(m.time) - x).abs()))
                .filter(|(_, d)| *d <= radius)
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map_or(HitTarget::Empty, |(id, _)| HitTarget::Marker(id));
        }

        let Some(track) = viewport
            .track_index_at(y)
            .and_then(|index| ctx.timeline.track_at(index).map(|t| (index, t)))
        else {
            return HitTarget::Empty;
        };
        let (track_index, track) = track;
        if !track.visible {
            return HitTarget::Empty;
        }

        let margin = ctx.settings.trim_margin_px;
        let mut best_handle: Option<(f64, ItemId, TrimEdge)> = None;
        for item in track.items() {
            let rect = viewport.item_rect(track_index, item);
            if y < rect.min_y || y > rect.max_y {
                continue;
            }
            let d_start = (x - rect.min_x).abs();
            let d_end = (x - rect.max_x).abs();
            let (distance, edge) = if d_start <= d_end {
                (d_start, TrimEdge::Start)
            } else {
                (d_end, TrimEdge::End)
            };
            if distance <= margin && best_handle.map_or(true, |(d, _, _)| distance < d) {
                best_handle = Some((distance, item.id, edge));
            }
        }
        if let Some((_, item, edge)) = best_handle {
            return HitTarget::TrimHandle { item, edge };
        }

        track
            .items()
            .iter()
            .rev()
            .find(|item| viewport.item_rect(track_index, item).contains(x, y))
            .map_or(HitTarget::Empty, |item| HitTarget::Item(item.id))
    }

    /// Pointer pressed. Ignored while a drag is active.
    pub fn pointer_down(
        &mut self,
        ctx: &InteractionContext<'_>,
        selection: &mut Selection,
        x: f64,
        y: f64,
        modifiers: Modifiers,
    ) -> Outcome {
        if !self.is_idle() {
            tracing::debug!("Pointer down ignored: {:?} in progress", self.state());
            return Outcome::None;
        }
        if x < TRACK_HEADER_WIDTH {
            return Outcome::None;
        }

        match self.hit_test(ctx, x, y) {
            HitTarget::TrimHandle { item, edge } => {
                selection.select(item, SelectMode::Set);
                self.begin_trim(ctx, item, edge, x);
                Outcome::None
            }
            HitTarget::Marker(id) => {
                self.begin_marker(ctx, id, x);
                Outcome::None
            }
            HitTarget::Item(id) => {
                if modifiers.shift {
                    selection.select(id, SelectMode::Toggle);
                } else if !selection.contains(id) {
                    selection.select(id, SelectMode::Set);
                }
                if selection.contains(id) {
                    self.begin_items(ctx, selection, id, x, y);
                }
                Outcome::None
            }
            HitTarget::Empty => {
                if !modifiers.shift {
                    selection.clear();
                }
                self.session = Session::Playhead;
                Outcome::Seek(clamp_time(
                    ctx.viewport.x_to_time(x),
                    ctx.timeline.duration(),
                ))
            }
        }
    }

    fn dragged(ctx: &InteractionContext<'_>, id: ItemId) -> Option<DraggedItem> {
        let location = ctx.timeline.item_location(id)?;
        let item = ctx.timeline.find_item(id)?;
        ctx.is_editable(item).then_some(DraggedItem {
            id,
            track_index: location.track_index,
            start: item.start_time,
            duration: item.duration,
        })
    }

    fn begin_items(
        &mut self,
        ctx: &InteractionContext<'_>,
        selection: &Selection,
        clicked: ItemId,
        x: f64,
        y: f64,
    ) {
        let Some(anchor_item) = Self::dragged(ctx, clicked) else {
            return;
        };
        let mut items = vec![anchor_item];
        items.extend(
            selection
                .items()
                .iter()
                .filter(|id| **id != clicked)
                .filter_map(|id| Self::dragged(ctx, *id)),
        );
        let exclude: Vec<ItemId> = items.iter().map(|i| i.id).collect();

        self.session = Session::Items {
            origin: (x, y),
            candidates: ctx.snap.candidates(ctx.timeline, &exclude),
            anchor_start: anchor_item.start,
            items,
            anchor: 0,
            delta: 0.0,
            track_offset: 0,
            snapped_to: None,
        };
    }

    fn begin_marker(&mut self, ctx: &InteractionContext<'_>, id: MarkerId, x: f64) {
        let Some(marker) = ctx.timeline.marker(id) else {
            return;
        };
        if !marker.draggable {
            return;
        }
        let origin_time = marker.time;
        let candidates = ctx.snap.candidates(ctx.timeline, &[]).without(origin_time);
        self.session = Session::Marker {
            id,
            origin_x: x,
            origin_time,
            candidates,
            time: origin_time,
            snapped_to: None,
        };
    }

    fn begin_trim(&mut self, ctx: &InteractionContext<'_>, id: ItemId, edge: TrimEdge, x: f64) {
        let Some(item) = Self::dragged(ctx, id) else {
            return;
        };
        let source_in = ctx.timeline.find_item(id).map_or(0.0, |i| i.source_in);
        self.session = Session::Trim {
            item,
            edge,
            origin_x: x,
            source_in,
            candidates: ctx.snap.candidates(ctx.timeline, &[id]),
            start: item.start,
            duration: item.duration,
            snapped_to: None,
        };
    }

    /// Pointer moved. Updates the preview; scrubbing returns a seek.
    pub fn pointer_move(&mut self, ctx: &InteractionContext<'_>, x: f64, y: f64) -> Outcome {
        let viewport = ctx.viewport;
        let snap = ctx.snap;
        let tolerance = ctx.snap_tolerance();

        match &mut self.session {
            Session::Idle => Outcome::None,
            Session::Playhead => Outcome::Seek(clamp_time(
                viewport.x_to_time(x),
                ctx.timeline.duration(),
            )),
            Session::Items {
                origin,
                items,
                anchor,
                candidates,
                delta,
                anchor_start,
                track_offset,
                snapped_to,
            } => {
                let min_start = items.iter().map(|i| i.start).fold(f64::INFINITY, f64::min);
                let anchor_item = items[*anchor];

                let mut d = viewport.px_to_time(x - origin.0).max(-min_start);
                let mut target = anchor_item.start + d;
                *snapped_to = None;
                let snapped = snap.snap_range(target, anchor_item.duration, candidates, tolerance);
                if let Some(c) = snapped.snapped_to {
                    let snapped_delta = snapped.time - anchor_item.start;
                    if snapped_delta >= -min_start {
                        d = snapped_delta;
                        target = snapped.time;
                        *snapped_to = Some(c);
                    }
                }
                *delta = d;
                *anchor_start = target;

                let min_index = items.iter().map(|i| i.track_index).min().unwrap_or(0) as isize;
                let max_index = items.iter().map(|i| i.track_index).max().unwrap_or(0) as isize;
                let last = ctx.timeline.track_count() as isize - 1;
                let rows = ((y - origin.1) / TRACK_HEIGHT).round() as isize;
                *track_offset = rows.clamp(-min_index, (last - max_index).max(-min_index));
                Outcome::None
            }
            Session::Marker {
                origin_x,
                origin_time,
                candidates,
                time,
                snapped_to,
                ..
            } => {
                let raw = clamp_time(
                    *origin_time + viewport.px_to_time(x - *origin_x),
                    ctx.timeline.duration(),
                );
                let snapped = snap.snap(raw, candidates, tolerance);
                *time = snapped.time;
                *snapped_to = snapped.snapped_to;
                Outcome::None
            }
            Session::Trim {
                item,
                edge,
                origin_x,
                source_in,
                candidates,
                start,
                duration,
                snapped_to,
            } => {
                let dt = viewport.px_to_time(x - *origin_x);
                let end = item.start + item.duration;
                let min_duration = ctx.min_duration();
                match edge {
                    TrimEdge::Start => {
                        let snapped = snap.snap(item.start + dt, candidates, tolerance);
                        let lower = (item.start - *source_in).max(0.0);
                        let upper = end - min_duration;
                        *start = snapped.time.clamp(lower, upper.max(lower));
                        *duration = end - *start;
                        *snapped_to = snapped.snapped_to.filter(|c| *c == *start);
                    }
                    TrimEdge::End => {
                        let snapped = snap.snap(end + dt, candidates, tolerance);
                        let new_end = snapped.time.max(item.start + min_duration);
                        *duration = new_end - item.start;
                        *snapped_to = snapped.snapped_to.filter(|c| *c == new_end);
                    }
                }
                Outcome::None
            }
        }
    }

    /// Pointer released. Finishes the session and returns its command, if any.
    pub fn pointer_up(&mut self, ctx: &InteractionContext<'_>, x: f64, y: f64) -> Outcome {
        let last = self.pointer_move(ctx, x, y);
        let session = std::mem::replace(&mut self.session, Session::Idle);

        match session {
            Session::Idle => Outcome::None,
            Session::Playhead => last,
            Session::Items {
                items,
                anchor,
                delta,
                anchor_start,
                track_offset,
                ..
            } => {
                if delta == 0.0 && track_offset == 0 {
                    return Outcome::None;
                }
                let mut commands: Vec<Box<dyn Command>> = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let new_start = if i == anchor {
                        anchor_start
                    } else {
                        (item.start + delta).max(0.0)
                    };
                    let mut command = MoveItemCommand::new(item.id, new_start);
                    if track_offset != 0 {
                        let index = (item.track_index as isize + track_offset).max(0) as usize;
                        if let Some(track) = ctx.timeline.track_at(index) {
                            command = command.to_track(track.id);
                        }
                    }
                    commands.push(Box::new(command));
                }
                if commands.len() == 1 {
                    commands.pop().map_or(Outcome::None, Outcome::Commit)
                } else {
                    let description = format!("Move {} Items", commands.len());
                    Outcome::Commit(Box::new(BatchCommand::new(description, commands)))
                }
            }
            Session::Marker {
                id,
                origin_time,
                time,
                ..
            } => {
                if time == origin_time {
                    return Outcome::None;
                }
                Outcome::Commit(Box::new(MoveMarkerCommand::new(id, time)))
            }
            Session::Trim {
                item,
                start,
                duration,
                ..
            } => {
                if start == item.start && duration == item.duration {
                    return Outcome::None;
                }
                Outcome::Commit(Box::new(ResizeItemCommand::new(item.id, start, duration)))
            }
        }
    }

    /// Escape: drop the session without a command. Returns whether one was active.
    pub fn cancel(&mut self) -> bool {
        let was_active = !self.is_idle();
        if was_active {
            tracing::debug!("Cancelled {:?}", self.state());
        }
        self.session = Session::Idle;
        was_active
    }

    /// Preview rectangles for the active drag
    pub fn ghosts(&self) -> Vec<GhostItem> {
        match &self.session {
            Session::Items {
                items,
                anchor,
                delta,
                anchor_start,
                track_offset,
                ..
            } => items
                .iter()
                .enumerate()
                .map(|(i, item)| GhostItem {
                    track_index: (item.track_index as isize + track_offset).max(0) as usize,
                    start_time: if i == *anchor {
                        *anchor_start
                    } else {
                        (item.start + delta).max(0.0)
                    },
                    duration: item.duration,
                })
                .collect(),
            Session::Trim {
                item,
                start,
                duration,
                ..
            } => vec![GhostItem {
                track_index: item.track_index,
                start_time: *start,
                duration: *duration,
            }],
            _ => Vec::new(),
        }
    }

    /// Candidate the active drag is snapped to
    pub fn snap_guide(&self) -> Option<f64> {
        match &self.session {
            Session::Items { snapped_to, .. }
            | Session::Marker { snapped_to, .. }
            | Session::Trim { snapped_to, .. } => *snapped_to,
            _ => None,
        }
    }
}

impl Default for InteractionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandKind;
    use splice_timeline::layout::RULER_HEIGHT;
    use splice_timeline::{AssetRef, ItemKind, Marker, MarkerKind, Track, TrackId, TrackKind};

    struct Fixture {
        timeline: Timeline,
        viewport: Viewport,
        snap: SnapEngine,
        settings: InteractionSettings,
        tracks: Vec<TrackId>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut timeline = Timeline::new("Interaction");
            let tracks = (0..3)
                .map(|i| {
                    timeline
                        .add_track(Track::new(format!("V{}", i + 1), TrackKind::Video))
                        .unwrap()
                })
                .collect();
            Self {
                timeline,
                viewport: Viewport::new(1280.0, 400.0),
                snap: SnapEngine::new(),
                settings: InteractionSettings::default(),
                tracks,
            }
        }

        fn ctx(&self) -> InteractionContext<'_> {
            InteractionContext {
                timeline: &self.timeline,
                viewport: &self.viewport,
                snap: &self.snap,
                settings: &self.settings,
            }
        }

        fn add(&mut self, track: usize, start: f64, duration: f64) -> ItemId {
            let item = Item::new(
                self.tracks[track],
                ItemKind::Video,
                AssetRef::new("clip"),
                start,
                duration,
            );
            let id = item.id;
            self.timeline.add_item(item).unwrap();
            id
        }

        fn apply(&mut self, outcome: Outcome) -> CommandKind {
            let Outcome::Commit(mut command) = outcome else {
                panic!("expected a command, got {outcome:?}");
            };
            command.execute(&mut self.timeline).unwrap();
            command.kind()
        }
    }

    fn lane_y(index: usize) -> f64 {
        RULER_HEIGHT + index as f64 * TRACK_HEIGHT + TRACK_HEIGHT / 2.0
    }

    #[test]
    fn test_hit_test_priority() {
        let mut f = Fixture::new();
        let id = f.add(0, 1.0, 2.0);
        let sm = InteractionStateMachine::new();
        let ctx = f.ctx();
        let y = lane_y(0);

        assert_eq!(sm.hit_test(&ctx, 300.0, y), HitTarget::Item(id));
        assert_eq!(
            sm.hit_test(&ctx, 262.0, y),
            HitTarget::TrimHandle {
                item: id,
                edge: TrimEdge::Start
            }
        );
        assert_eq!(
            sm.hit_test(&ctx, 463.0, y),
            HitTarget::TrimHandle {
                item: id,
                edge: TrimEdge::End
            }
        );
        assert_eq!(sm.hit_test(&ctx, 600.0, y), HitTarget::Empty);
        assert_eq!(sm.hit_test(&ctx, 300.0, lane_y(5)), HitTarget::Empty);
    }

    #[test]
    fn test_marker_flag_hit() {
        let mut f = Fixture::new();
        f.add(0, 0.0, 5.0);
        let marker = Marker::new(MarkerKind::Cue, 2.0, "Cue");
        let marker_id = f.timeline.add_marker(marker).unwrap();
        let sm = InteractionStateMachine::new();

        assert_eq!(
            sm.hit_test(&f.ctx(), 364.0, 10.0),
            HitTarget::Marker(marker_id)
        );
        assert_eq!(sm.hit_test(&f.ctx(), 380.0, 10.0), HitTarget::Empty);
    }

    #[test]
    fn test_drag_item_commits_one_move() {
        let mut f = Fixture::new();
        let id = f.add(0, 1.0, 2.5);
        f.add(1, 0.0, 8.0);
        let mut sm = InteractionStateMachine::new();
        let mut selection = Selection::new();
        let y = lane_y(0);

        sm.pointer_down(&f.ctx(), &mut selection, 300.0, y, Modifiers::default());
        assert_eq!(sm.state(), InteractionState::DraggingItem);
        assert_eq!(selection.items(), &[id]);

        sm.pointer_move(&f.ctx(), 350.0, y);
        sm.pointer_move(&f.ctx(), 398.0, y);
        assert_eq!(sm.snap_guide(), Some(2.0));
        assert_eq!(sm.ghosts()[0].start_time, 2.0);

        let outcome = sm.pointer_up(&f.ctx(), 398.0, y);
        assert!(sm.is_idle());
        assert_eq!(f.apply(outcome), CommandKind::MoveItem);
        assert_eq!(f.timeline.find_item(id).unwrap().start_time, 2.0);
    }

    #[test]
    fn test_zero_delta_drag_produces_nothing() {
        let mut f = Fixture::new();
        f.add(0, 1.0, 2.0);
        let mut sm = InteractionStateMachine::new();
        let mut selection = Selection::new();

        sm.pointer_down(&f.ctx(), &mut selection, 300.0, lane_y(0), Modifiers::default());
        let outcome = sm.pointer_up(&f.ctx(), 300.0, lane_y(0));
        assert!(matches!(outcome, Outcome::None));
    }

    #[test]
    fn test_escape_cancels_without_command() {
        let mut f = Fixture::new();
        let id = f.add(0, 1.0, 2.0);
        let mut sm = InteractionStateMachine::new();
        let mut selection = Selection::new();

        sm.pointer_down(&f.ctx(), &mut selection, 300.0, lane_y(0), Modifiers::default());
        sm.pointer_move(&f.ctx(), 500.0, lane_y(0));
        assert!(sm.cancel());
        assert!(sm.is_idle());
        assert!(!sm.cancel());
        assert!(matches!(
            sm.pointer_up(&f.ctx(), 500.0, lane_y(0)),
            Outcome::None
        ));
        assert_eq!(f.timeline.find_item(id).unwrap().start_time, 1.0);
    }

    #[test]
    fn test_pointer_down_during_drag_is_ignored() {
        let mut f = Fixture::new();
        let a = f.add(0, 1.0, 2.0);
        let b = f.add(1, 5.0, 1.0);
        let mut sm = InteractionStateMachine::new();
        let mut selection = Selection::new();

        sm.pointer_down(&f.ctx(), &mut selection, 300.0, lane_y(0), Modifiers::default());
        let outcome = sm.pointer_down(&f.ctx(), &mut selection, 660.0, lane_y(1), Modifiers::default());
        assert!(matches!(outcome, Outcome::None));
        assert_eq!(sm.state(), InteractionState::DraggingItem);
        assert_eq!(selection.items(), &[a]);
        assert!(!selection.contains(b));
    }

    #[test]
    fn test_multi_selection_moves_together() {
        let mut f = Fixture::new();
        f.snap.enabled = false;
        let a = f.add(0, 1.0, 1.0);
        let b = f.add(1, 3.0, 1.0);
        let mut sm = InteractionStateMachine::new();
        let mut selection = Selection::new();

        sm.pointer_down(&f.ctx(), &mut selection, 310.0, lane_y(0), Modifiers::default());
        sm.pointer_up(&f.ctx(), 310.0, lane_y(0));
        sm.pointer_down(&f.ctx(), &mut selection, 510.0, lane_y(1), Modifiers::SHIFT);
        assert_eq!(selection.items(), &[a, b]);

        let outcome = sm.pointer_up(&f.ctx(), 560.0, lane_y(2));
        assert_eq!(f.apply(outcome), CommandKind::Batch);

        let a_item = f.timeline.find_item(a).unwrap();
        let b_item = f.timeline.find_item(b).unwrap();
        assert_eq!(a_item.start_time, 1.5);
        assert_eq!(b_item.start_time, 3.5);
        assert_eq!(a_item.track_id, f.tracks[1]);
        assert_eq!(b_item.track_id, f.tracks[2]);
    }

    #[test]
    fn test_vertical_offset_is_clamped() {
        let mut f = Fixture::new();
        f.snap.enabled = false;
        let id = f.add(1, 1.0, 1.0);
        let mut sm = InteractionStateMachine::new();
        let mut selection = Selection::new();

        sm.pointer_down(&f.ctx(), &mut selection, 310.0, lane_y(1), Modifiers::default());
        let outcome = sm.pointer_up(&f.ctx(), 310.0, lane_y(9));
        f.apply(outcome);
        assert_eq!(f.timeline.find_item(id).unwrap().track_id, f.tracks[2]);
    }

    #[test]
    fn test_trim_start_edge() {
        let mut f = Fixture::new();
        f.snap.enabled = false;
        let id = f.add(0, 1.0, 2.0);
        let mut sm = InteractionStateMachine::new();
        let mut selection = Selection::new();

        sm.pointer_down(&f.ctx(), &mut selection, 261.0, lane_y(0), Modifiers::default());
        assert_eq!(sm.state(), InteractionState::DraggingTrimHandle);
        let outcome = sm.pointer_up(&f.ctx(), 311.0, lane_y(0));
        assert_eq!(f.apply(outcome), CommandKind::ResizeItem);

        let item = f.timeline.find_item(id).unwrap();
        assert_eq!(item.start_time, 1.5);
        assert_eq!(item.end_time(), 3.0);
        assert_eq!(item.source_in, 0.5);
    }

    #[test]
    fn test_trim_cannot_extend_before_source() {
        let mut f = Fixture::new();
        f.snap.enabled = false;
        let id = f.add(0, 1.0, 2.0);
        let mut sm = InteractionStateMachine::new();
        let mut selection = Selection::new();

        sm.pointer_down(&f.ctx(), &mut selection, 261.0, lane_y(0), Modifiers::default());
        let outcome = sm.pointer_up(&f.ctx(), 200.0, lane_y(0));
        assert!(matches!(outcome, Outcome::None));
        assert_eq!(f.timeline.find_item(id).unwrap().start_time, 1.0);
    }

    #[test]
    fn test_locked_item_is_selected_not_dragged() {
        let mut f = Fixture::new();
        let id = f.add(0, 1.0, 2.0);
        f.timeline.item_mut(id).unwrap().locked = true;
        let mut sm = InteractionStateMachine::new();
        let mut selection = Selection::new();

        sm.pointer_down(&f.ctx(), &mut selection, 300.0, lane_y(0), Modifiers::default());
        assert!(sm.is_idle());
        assert!(selection.contains(id));
    }

    #[test]
    fn test_empty_click_scrubs_playhead() {
        let mut f = Fixture::new();
        f.add(0, 0.0, 10.0);
        let mut sm = InteractionStateMachine::new();
        let mut selection = Selection::new();
        selection.select(ItemId::new(), SelectMode::Set);

        let outcome = sm.pointer_down(&f.ctx(), &mut selection, 460.0, 10.0, Modifiers::default());
        assert!(matches!(outcome, Outcome::Seek(t) if t == 3.0));
        assert!(selection.is_empty());
        assert_eq!(sm.state(), InteractionState::DraggingPlayhead);

        assert!(matches!(
            sm.pointer_move(&f.ctx(), 5000.0, 10.0),
            Outcome::Seek(t) if t == 10.0
        ));
        assert!(matches!(
            sm.pointer_up(&f.ctx(), 160.0, 10.0),
            Outcome::Seek(t) if t == 0.0
        ));
        assert!(sm.is_idle());
    }

    #[test]
    fn test_marker_drag_commits_move() {
        let mut f = Fixture::new();
        f.snap.enabled = false;
        f.add(0, 0.0, 10.0);
        let marker_id = f
            .timeline
            .add_marker(Marker::new(MarkerKind::Chapter, 2.0, "A"))
            .unwrap();
        let mut sm = InteractionStateMachine::new();
        let mut selection = Selection::new();

        sm.pointer_down(&f.ctx(), &mut selection, 360.0, 10.0, Modifiers::default());
        assert_eq!(sm.state(), InteractionState::DraggingMarker);
        let outcome = sm.pointer_up(&f.ctx(), 410.0, 10.0);
        assert_eq!(f.apply(outcome), CommandKind::MoveMarker);
        assert_eq!(f.timeline.marker(marker_id).unwrap().time, 2.5);
    }
}
