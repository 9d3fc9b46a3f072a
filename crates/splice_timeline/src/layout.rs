// SPDX-License-Identifier: MIT OR Apache-2.0
//! Backend-neutral timeline layout.
//!
//! Features:
//! - Viewport mapping between pixels and seconds
//! - Track lane and item geometry shared with hit-testing
//! - `layout` producing a flat draw list for any renderer

use crate::marker::MarkerKind;
use crate::timeline::Timeline;
use crate::track::{Item, ItemId, Track};
use serde::{Deserialize, Serialize};

/// Height of one track lane in pixels
pub const TRACK_HEIGHT: f64 = 48.0;
/// Width of the track header column
pub const TRACK_HEADER_WIDTH: f64 = 160.0;
/// Height of the time ruler
pub const RULER_HEIGHT: f64 = 28.0;
/// Width of a marker flag
pub const MARKER_FLAG_WIDTH: f64 = 10.0;
/// Minimum pixel spacing between ruler ticks
const MIN_TICK_SPACING: f64 = 60.0;
/// Tick steps the ruler chooses from, in seconds
const TICK_STEPS: [f64; 12] = [
    0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 15.0, 30.0, 60.0, 300.0, 600.0,
];

const COLOR_BACKGROUND: [u8; 4] = [30, 30, 34, 255];
const COLOR_RULER: [u8; 4] = [45, 45, 50, 255];
const COLOR_TICK: [u8; 4] = [120, 120, 130, 255];
const COLOR_HEADER: [u8; 4] = [40, 40, 46, 255];
const COLOR_LANE_EVEN: [u8; 4] = [36, 36, 40, 255];
const COLOR_LANE_ODD: [u8; 4] = [33, 33, 37, 255];
const COLOR_TEXT: [u8; 4] = [220, 220, 220, 255];
const COLOR_SELECTION: [u8; 4] = [255, 255, 255, 255];
const COLOR_SNAP_GUIDE: [u8; 4] = [255, 220, 0, 255];
const COLOR_GHOST: [u8; 4] = [255, 255, 255, 60];

/// Axis-aligned rectangle in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub min_x: f64,
    /// Top edge
    pub min_y: f64,
    /// Right edge
    pub max_x: f64,
    /// Bottom edge
    pub max_y: f64,
}

impl Rect {
    /// Build from two corners
    pub fn from_min_max(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Whether a point lies inside (edges inclusive)
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Width in pixels
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height in pixels
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Visible window onto the timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Horizontal zoom (pixels per second)
    pub zoom: f64,
    /// Time at the left edge of the lane area
    pub scroll_offset: f64,
    /// Vertical scroll in pixels
    pub vertical_scroll: f64,
    /// Total width in pixels
    pub width: f64,
    /// Total height in pixels
    pub height: f64,
}

impl Viewport {
    /// Create a viewport of the given size at the default zoom
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            zoom: 100.0,
            scroll_offset: 0.0,
            vertical_scroll: 0.0,
            width,
            height,
        }
    }

    /// Convert time to x position
    pub fn time_to_x(&self, time: f64) -> f64 {
        (time - self.scroll_offset) * self.zoom + TRACK_HEADER_WIDTH
    }

    /// Convert x position to time
    pub fn x_to_time(&self, x: f64) -> f64 {
        (x - TRACK_HEADER_WIDTH) / self.zoom + self.scroll_offset
    }

    /// Convert a pixel distance to a time distance
    pub fn px_to_time(&self, px: f64) -> f64 {
        px / self.zoom
    }

    /// Top of a track lane
    pub fn track_y(&self, track_index: usize) -> f64 {
        RULER_HEIGHT + track_index as f64 * TRACK_HEIGHT - self.vertical_scroll
    }

    /// Track lane under a y position, ignoring whether that track exists
    pub fn track_index_at(&self, y: f64) -> Option<usize> {
        let offset = y + self.vertical_scroll - RULER_HEIGHT;
        if y < RULER_HEIGHT || offset < 0.0 {
            return None;
        }
        Some((offset / TRACK_HEIGHT).floor() as usize)
    }

    /// Whether a y position falls in the ruler band
    pub fn in_ruler(&self, y: f64) -> bool {
        (0.0..RULER_HEIGHT).contains(&y)
    }

    /// Lane rectangle for a track
    pub fn lane_rect(&self, track_index: usize) -> Rect {
        let y = self.track_y(track_index);
        Rect::from_min_max(TRACK_HEADER_WIDTH, y, self.width, y + TRACK_HEIGHT)
    }

    /// Item rectangle on a given lane
    pub fn item_rect(&self, track_index: usize, item: &Item) -> Rect {
        let y = self.track_y(track_index);
        Rect::from_min_max(
            self.time_to_x(item.start_time),
            y + 2.0,
            self.time_to_x(item.end_time()),
            y + TRACK_HEIGHT - 2.0,
        )
    }

    /// Time range currently visible in the lane area
    pub fn visible_range(&self) -> (f64, f64) {
        (self.scroll_offset, self.x_to_time(self.width))
    }

    /// Width of the lane area in pixels
    pub fn lane_width(&self) -> f64 {
        (self.width - TRACK_HEADER_WIDTH).max(1.0)
    }

    /// Multiply zoom keeping the time under `anchor_x` fixed
    pub fn zoom_by(&mut self, factor: f64, anchor_x: f64, min_zoom: f64, max_zoom: f64) {
        let anchor_time = self.x_to_time(anchor_x);
        self.zoom = (self.zoom * factor).clamp(min_zoom, max_zoom);
        self.scroll_offset = (anchor_time - (anchor_x - TRACK_HEADER_WIDTH) / self.zoom).max(0.0);
    }

    /// Zoom so that `[start, end]` fills the lane area
    pub fn zoom_to_range(&mut self, start: f64, end: f64, min_zoom: f64, max_zoom: f64) {
        let span = end - start;
        if span <= 0.0 {
            return;
        }
        self.zoom = (self.lane_width() / span).clamp(min_zoom, max_zoom);
        self.scroll_offset = start.max(0.0);
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 400.0)
    }
}

/// Transient placement shown while a drag is in progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GhostItem {
    /// Lane the ghost is drawn on
    pub track_index: usize,
    /// Preview start time
    pub start_time: f64,
    /// Preview duration
    pub duration: f64,
}

/// Per-frame view state that is not part of the model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    /// Selected items
    pub selection: Vec<ItemId>,
    /// Playhead time from the playback clock
    pub playhead_time: f64,
    /// Candidate the active drag snapped to
    pub snap_guide: Option<f64>,
    /// Drag previews
    pub ghosts: Vec<GhostItem>,
}

/// A single draw primitive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawCmd {
    /// Filled rectangle with an optional outline
    Rect {
        /// Bounds
        rect: Rect,
        /// Fill color (RGBA)
        fill: [u8; 4],
        /// Outline color and width
        stroke: Option<([u8; 4], f32)>,
    },
    /// Line segment
    Line {
        /// Start point
        from: (f64, f64),
        /// End point
        to: (f64, f64),
        /// Color (RGBA)
        color: [u8; 4],
        /// Width in pixels
        width: f32,
    },
    /// Text anchored at its left-center
    Text {
        /// Anchor
        pos: (f64, f64),
        /// Contents
        text: String,
        /// Color (RGBA)
        color: [u8; 4],
        /// Font size in points
        size: f32,
    },
}

/// Ordered list of draw primitives, back to front
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawList {
    /// Commands in paint order
    pub commands: Vec<DrawCmd>,
}

impl DrawList {
    fn rect(&mut self, rect: Rect, fill: [u8; 4], stroke: Option<([u8; 4], f32)>) {
        self.commands.push(DrawCmd::Rect { rect, fill, stroke });
    }

    fn line(&mut self, from: (f64, f64), to: (f64, f64), color: [u8; 4], width: f32) {
        self.commands.push(DrawCmd::Line {
            from,
            to,
            color,
            width,
        });
    }

    fn text(&mut self, pos: (f64, f64), text: impl Into<String>, color: [u8; 4], size: f32) {
        self.commands.push(DrawCmd::Text {
            pos,
            text: text.into(),
            color,
            size,
        });
    }

    /// Number of commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

fn rgba(rgb: [u8; 3], alpha: u8) -> [u8; 4] {
    [rgb[0], rgb[1], rgb[2], alpha]
}

/// Pick the ruler step for a zoom level
pub fn tick_step(zoom: f64) -> f64 {
    TICK_STEPS
        .iter()
        .copied()
        .find(|step| step * zoom >= MIN_TICK_SPACING)
        .unwrap_or(TICK_STEPS[TICK_STEPS.len() - 1])
}

/// Format seconds as `m:ss.t`
pub fn format_time(time: f64) -> String {
    let tenths = (time.max(0.0) * 10.0).round() as u64;
    let minutes = tenths / 600;
    let seconds = (tenths / 10) % 60;
    format!("{minutes}:{seconds:02}.{}", tenths % 10)
}

/// Lay out the timeline into a draw list
pub fn layout(timeline: &Timeline, viewport: &Viewport, view: &ViewState) -> DrawList {
    let mut list = DrawList::default();

    list.rect(
        Rect::from_min_max(0.0, 0.0, viewport.width, viewport.height),
        COLOR_BACKGROUND,
        None,
    );

    for (index, track) in timeline.tracks().enumerate() {
        layout_track(&mut list, viewport, view, index, track);
    }

    for ghost in &view.ghosts {
        let y = viewport.track_y(ghost.track_index);
        let rect = Rect::from_min_max(
            viewport.time_to_x(ghost.start_time),
            y + 2.0,
            viewport.time_to_x(ghost.start_time + ghost.duration),
            y + TRACK_HEIGHT - 2.0,
        );
        list.rect(rect, COLOR_GHOST, Some((COLOR_SELECTION, 1.0)));
    }

    layout_ruler(&mut list, timeline, viewport);

    if let Some(guide) = view.snap_guide {
        let x = viewport.time_to_x(guide);
        list.line((x, 0.0), (x, viewport.height), COLOR_SNAP_GUIDE, 1.0);
    }

    let playhead_x = viewport.time_to_x(view.playhead_time);
    if playhead_x >= TRACK_HEADER_WIDTH {
        let color = rgba(MarkerKind::Playhead.color(), 255);
        list.line((playhead_x, 0.0), (playhead_x, viewport.height), color, 2.0);
    }

    list
}

fn layout_track(list: &mut DrawList, viewport: &Viewport, view: &ViewState, index: usize, track: &Track) {
    let lane = viewport.lane_rect(index);
    if lane.max_y < RULER_HEIGHT || lane.min_y > viewport.height {
        return;
    }

    let lane_color = if index % 2 == 0 { COLOR_LANE_EVEN } else { COLOR_LANE_ODD };
    list.rect(lane, lane_color, None);

    let header = Rect::from_min_max(0.0, lane.min_y, TRACK_HEADER_WIDTH, lane.max_y);
    list.rect(header, COLOR_HEADER, None);
    list.rect(
        Rect::from_min_max(0.0, lane.min_y, 4.0, lane.max_y),
        rgba(track.color, 255),
        None,
    );

    let mut label = track.name.clone();
    if track.muted {
        label.push_str(" [M]");
    }
    if track.solo {
        label.push_str(" [S]");
    }
    if track.locked {
        label.push_str(" [L]");
    }
    list.text((10.0, lane.min_y + TRACK_HEIGHT / 2.0), label, COLOR_TEXT, 12.0);

    if !track.visible {
        return;
    }

    let (visible_start, visible_end) = viewport.visible_range();
    for item in track.items() {
        if item.end_time() < visible_start || item.start_time > visible_end {
            continue;
        }

        let rect = viewport.item_rect(index, item);
        let alpha = if item.muted { 120 } else { 220 };
        let stroke = view
            .selection
            .contains(&item.id)
            .then_some((COLOR_SELECTION, 2.0));
        list.rect(rect, rgba(track.color, alpha), stroke);

        if let Some(fade_in) = item.fade_in.filter(|f| *f > 0.0) {
            let x = viewport.time_to_x(item.start_time + fade_in);
            list.line((rect.min_x, rect.max_y), (x, rect.min_y), COLOR_TEXT, 1.0);
        }
        if let Some(fade_out) = item.fade_out.filter(|f| *f > 0.0) {
            let x = viewport.time_to_x(item.end_time() - fade_out);
            list.line((x, rect.min_y), (rect.max_x, rect.max_y), COLOR_TEXT, 1.0);
        }

        if rect.width() > 30.0 {
            list.text(
                (rect.min_x.max(TRACK_HEADER_WIDTH) + 4.0, rect.min_y + 10.0),
                item.name.clone(),
                COLOR_TEXT,
                11.0,
            );
        }
    }
}

fn layout_ruler(list: &mut DrawList, timeline: &Timeline, viewport: &Viewport) {
    list.rect(
        Rect::from_min_max(0.0, 0.0, viewport.width, RULER_HEIGHT),
        COLOR_RULER,
        None,
    );

    let step = tick_step(viewport.zoom);
    let (start, end) = viewport.visible_range();
    let first = (start / step).ceil() as i64;
    let last = (end / step).floor() as i64;
    for n in first..=last {
        let time = n as f64 * step;
        let x = viewport.time_to_x(time);
        list.line((x, RULER_HEIGHT - 8.0), (x, RULER_HEIGHT), COLOR_TICK, 1.0);
        list.text((x + 2.0, 8.0), format_time(time), COLOR_TICK, 10.0);
    }

    for marker in timeline.markers().filter(|m| !m.is_playhead()) {
        let x = viewport.time_to_x(marker.time);
        if x < TRACK_HEADER_WIDTH || x > viewport.width {
            continue;
        }
        let color = rgba(marker.color, 255);
        list.rect(
            Rect::from_min_max(x, 0.0, x + MARKER_FLAG_WIDTH, RULER_HEIGHT / 2.0),
            color,
            None,
        );
        list.line((x, 0.0), (x, viewport.height), rgba(marker.color, 120), 1.0);
        if !marker.label.is_empty() {
            list.text((x + MARKER_FLAG_WIDTH + 2.0, 6.0), marker.label.clone(), color, 10.0);
        }
    }
}
