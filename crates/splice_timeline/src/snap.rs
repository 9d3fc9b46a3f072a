// SPDX-License-Identifier: MIT OR Apache-2.0
//! Snapping of dragged times to item edges, markers and the second grid.

use crate::timeline::Timeline;
use crate::track::ItemId;

/// Default snap radius in pixels
pub const DEFAULT_PIXEL_TOLERANCE: f64 = 8.0;

/// Snap engine settings
#[derive(Debug, Clone, PartialEq)]
pub struct SnapEngine {
    /// Whether snapping is active
    pub enabled: bool,
    /// Snap radius in pixels, converted to time with the current zoom
    pub pixel_tolerance: f64,
    /// Grid spacing in seconds
    pub grid_interval: f64,
}

/// Smallest grid spacing that produces grid lines, in seconds
pub const MIN_GRID_INTERVAL: f64 = 0.001;

/// Snap targets gathered when a drag starts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapCandidates {
    /// Item edges and marker times, sorted and deduplicated
    pub points: Vec<f64>,
    /// Grid spacing in seconds
    pub grid_interval: f64,
    /// Grid lines stop at this time
    pub grid_end: f64,
    excluded: Option<f64>,
}

impl SnapCandidates {
    /// Candidates from explicit points, without a grid
    pub fn from_points(mut points: Vec<f64>) -> Self {
        points.sort_by(f64::total_cmp);
        points.dedup();
        Self {
            points,
            ..Self::default()
        }
    }

    /// Drop a time from the candidates, grid line included
    pub fn without(mut self, time: f64) -> Self {
        self.points.retain(|p| *p != time);
        self.excluded = Some(time);
        self
    }

    /// The grid lines on either side of `time`, within `[0, grid_end]`
    pub fn grid_lines_around(&self, time: f64) -> [Option<f64>; 2] {
        let interval = self.grid_interval;
        if !interval.is_finite() || interval < MIN_GRID_INTERVAL || !time.is_finite() {
            return [None, None];
        }
        let last = (self.grid_end.max(0.0) / interval).floor() * interval;
        let below = ((time / interval).floor() * interval).clamp(0.0, last);
        let above = (below + interval).min(last);
        [below, above].map(|line| Some(line).filter(|l| Some(*l) != self.excluded))
    }

    /// Resolve `time` against the points and the nearest grid lines
    pub fn resolve(&self, time: f64, tolerance: f64) -> SnapResult {
        let grid = self.grid_lines_around(time).into_iter().flatten();
        resolve_iter(time, self.points.iter().copied().chain(grid), tolerance)
    }
}

/// Outcome of a snap query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    /// Resolved time
    pub time: f64,
    /// The candidate that was hit, if any
    pub snapped_to: Option<f64>,
}

impl SnapResult {
    fn unsnapped(time: f64) -> Self {
        Self {
            time,
            snapped_to: None,
        }
    }
}

impl SnapEngine {
    /// Create a snap engine with default settings
    pub fn new() -> Self {
        Self {
            enabled: true,
            pixel_tolerance: DEFAULT_PIXEL_TOLERANCE,
            grid_interval: 1.0,
        }
    }

    /// Time-domain tolerance for a zoom level in pixels per second
    pub fn tolerance(&self, zoom: f64) -> f64 {
        if zoom <= 0.0 {
            return 0.0;
        }
        self.pixel_tolerance / zoom
    }

    /// Collect snap candidates.
    ///
    /// Items in `exclude` (the ones being dragged) contribute no edges. Grid
    /// lines are not listed; they are computed around each queried time.
    pub fn candidates(&self, timeline: &Timeline, exclude: &[ItemId]) -> SnapCandidates {
        let mut points: Vec<f64> = timeline
            .items()
            .filter(|i| !exclude.contains(&i.id))
            .flat_map(|i| [i.start_time, i.end_time()])
            .collect();

        points.extend(
            timeline
                .markers()
                .filter(|m| !m.is_playhead())
                .map(|m| m.time),
        );

        points.sort_by(f64::total_cmp);
        points.dedup();

        SnapCandidates {
            points,
            grid_interval: self.grid_interval,
            grid_end: timeline.duration(),
            excluded: None,
        }
    }

    /// Snap a single time
    pub fn snap(&self, time: f64, candidates: &SnapCandidates, tolerance: f64) -> SnapResult {
        if !self.enabled {
            return SnapResult::unsnapped(time);
        }
        candidates.resolve(time, tolerance)
    }

    /// Snap a range by whichever edge lands closer to a candidate.
    ///
    /// Returns the adjusted start time.
    pub fn snap_range(
        &self,
        start: f64,
        duration: f64,
        candidates: &SnapCandidates,
        tolerance: f64,
    ) -> SnapResult {
        if !self.enabled {
            return SnapResult::unsnapped(start);
        }

        let by_start = candidates.resolve(start, tolerance);
        let by_end = candidates.resolve(start + duration, tolerance);

        match (by_start.snapped_to, by_end.snapped_to) {
            (Some(s), Some(e)) => {
                if (e - (start + duration)).abs() < (s - start).abs() {
                    SnapResult {
                        time: e - duration,
                        snapped_to: Some(e),
                    }
                } else {
                    by_start
                }
            }
            (Some(_), None) => by_start,
            (None, Some(e)) => SnapResult {
                time: e - duration,
                snapped_to: Some(e),
            },
            (None, None) => SnapResult::unsnapped(start),
        }
    }
}

impl Default for SnapEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve `time` to the nearest candidate within `tolerance`.
///
/// Equal distances resolve to the smaller candidate.
pub fn resolve(time: f64, candidates: &[f64], tolerance: f64) -> SnapResult {
    resolve_iter(time, candidates.iter().copied(), tolerance)
}

fn resolve_iter(
    time: f64,
    candidates: impl Iterator<Item = f64>,
    tolerance: f64,
) -> SnapResult {
    let mut best: Option<(f64, f64)> = None;
    for candidate in candidates {
        let distance = (candidate - time).abs();
        best = match best {
            Some((best_distance, best_candidate))
                if distance > best_distance
                    || (distance == best_distance && candidate >= best_candidate) =>
            {
                Some((best_distance, best_candidate))
            }
            _ => Some((distance, candidate)),
        };
    }

    match best {
        Some((distance, candidate)) if distance <= tolerance => SnapResult {
            time: candidate,
            snapped_to: Some(candidate),
        },
        _ => SnapResult::unsnapped(time),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::{Marker, MarkerKind};
    use crate::track::{AssetRef, Item, ItemKind, Track, TrackKind};

    #[test]
    fn test_resolve_nearest_within_tolerance() {
        let candidates = [2.0, 5.0, 5.3];
        assert_eq!(resolve(5.15, &candidates, 0.2).time, 5.3);
        assert_eq!(resolve(3.5, &candidates, 0.2).time, 3.5);
        assert_eq!(resolve(3.5, &candidates, 0.2).snapped_to, None);
    }

    #[test]
    fn test_resolve_tie_prefers_smaller() {
        assert_eq!(resolve(1.5, &[2.0, 1.0], 0.5).time, 1.0);
        assert_eq!(resolve(1.5, &[1.0, 2.0], 0.5).time, 1.0);
    }

    #[test]
    fn test_tolerance_scales_with_zoom() {
        let engine = SnapEngine::new();
        assert_eq!(engine.tolerance(100.0), 0.08);
        assert_eq!(engine.tolerance(0.0), 0.0);
    }

    #[test]
    fn test_candidates_cover_edges_markers_and_grid() {
        let mut timeline = Timeline::new("Test");
        let track_id = timeline.add_track(Track::new("V1", TrackKind::Video)).unwrap();
        let dragged = Item::new(track_id, ItemKind::Video, AssetRef::new("a"), 0.25, 1.0);
        let dragged_id = dragged.id;
        timeline.add_item(dragged).unwrap();
        timeline
            .add_item(Item::new(track_id, ItemKind::Video, AssetRef::new("b"), 1.5, 1.75))
            .unwrap();
        timeline
            .add_marker(Marker::new(MarkerKind::Cue, 2.25, "cue"))
            .unwrap();
        timeline.set_playhead_time(0.6);

        let engine = SnapEngine::new();
        let candidates = engine.candidates(&timeline, &[dragged_id]);
        assert_eq!(candidates.points, vec![1.5, 2.25, 3.25]);
        assert_eq!(candidates.grid_lines_around(2.4), [Some(2.0), Some(3.0)]);
        assert_eq!(candidates.grid_lines_around(9.0), [Some(3.0), Some(3.0)]);
        assert_eq!(engine.snap(0.95, &candidates, 0.1).time, 1.0);
        assert_eq!(engine.snap(2.2, &candidates, 0.1).time, 2.25);
        assert_eq!(engine.snap(0.3, &candidates, 0.1).snapped_to, None);
    }

    #[test]
    fn test_grid_tie_prefers_smaller_line() {
        let candidates = SnapCandidates {
            grid_interval: 1.0,
            grid_end: 10.0,
            ..SnapCandidates::default()
        };
        assert_eq!(candidates.resolve(2.5, 0.5).time, 2.0);
        assert_eq!(candidates.without(2.0).resolve(2.5, 0.5).time, 3.0);
    }

    #[test]
    fn test_tiny_grid_interval_is_ignored() {
        let mut timeline = Timeline::new("Long");
        let track_id = timeline.add_track(Track::new("V1", TrackKind::Video)).unwrap();
        timeline
            .add_item(Item::new(track_id, ItemKind::Video, AssetRef::new("a"), 0.0, 100.0))
            .unwrap();

        let engine = SnapEngine {
            grid_interval: 1e-9,
            ..SnapEngine::new()
        };
        let candidates = engine.candidates(&timeline, &[]);
        assert_eq!(candidates.points, vec![0.0, 100.0]);
        assert_eq!(candidates.grid_lines_around(50.3), [None, None]);
        assert_eq!(engine.snap(50.3, &candidates, 0.1).snapped_to, None);
    }

    #[test]
    fn test_snap_range_uses_closer_edge() {
        let engine = SnapEngine::new();
        let candidates = SnapCandidates::from_points(vec![10.0]);
        let result = engine.snap_range(7.95, 2.0, &candidates, 0.1);
        assert_eq!(result.time, 8.0);
        assert_eq!(result.snapped_to, Some(10.0));
    }

    #[test]
    fn test_disabled_snap_is_identity() {
        let engine = SnapEngine {
            enabled: false,
            ..SnapEngine::new()
        };
        let candidates = SnapCandidates::from_points(vec![5.0]);
        assert_eq!(engine.snap(4.99, &candidates, 0.1).time, 4.99);
    }
}
