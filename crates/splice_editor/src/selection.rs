// SPDX-License-Identifier: MIT OR Apache-2.0
//! Item selection.

use serde::{Deserialize, Serialize};
use splice_timeline::{Item, ItemId, Timeline};

/// Whether an item may be moved, trimmed, split or deleted
pub fn is_editable(timeline: &Timeline, item: &Item) -> bool {
    !item.locked && timeline.track(item.track_id).is_some_and(|t| !t.locked)
}

/// Selection mode for a click
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectMode {
    /// Replace current selection
    #[default]
    Set,
    /// Add to current selection
    Add,
    /// Toggle in current selection (Shift+Click)
    Toggle,
}

/// Selected items, in the order they were selected
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    items: Vec<ItemId>,
}

impl Selection {
    /// Create a new empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if an item is selected
    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains(&id)
    }

    /// Apply a click on an item
    pub fn select(&mut self, id: ItemId, mode: SelectMode) {
        match mode {
            SelectMode::Set => {
                self.items.clear();
                self.items.push(id);
            }
            SelectMode::Add => {
                if !self.contains(id) {
                    self.items.push(id);
                }
            }
            SelectMode::Toggle => {
                if let Some(index) = self.items.iter().position(|i| *i == id) {
                    self.items.remove(index);
                } else {
                    self.items.push(id);
                }
            }
        }
    }

    /// Replace the whole selection
    pub fn set(&mut self, ids: impl IntoIterator<Item = ItemId>) {
        self.items.clear();
        for id in ids {
            self.select(id, SelectMode::Add);
        }
    }

    /// Clear the selection
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Selected IDs
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    /// Number of selected items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is selected
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop IDs that no longer resolve. Returns how many were dropped.
    pub fn retain_existing(&mut self, timeline: &Timeline) -> usize {
        let before = self.items.len();
        self.items.retain(|id| timeline.find_item(*id).is_some());
        before - self.items.len()
    }

    /// Resolve the selection against the timeline, sorted by start time
    pub fn resolve<'a>(&self, timeline: &'a Timeline) -> Vec<&'a Item> {
        let mut items: Vec<&Item> = self
            .items
            .iter()
            .filter_map(|id| timeline.find_item(*id))
            .collect();
        items.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        items
    }

    /// Time range covered by the selection
    pub fn time_range(&self, timeline: &Timeline) -> Option<(f64, f64)> {
        let items = self.resolve(timeline);
        let start = items.iter().map(|i| i.start_time).reduce(f64::min)?;
        let end = items.iter().map(|i| i.end_time()).reduce(f64::max)?;
        Some((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splice_timeline::{AssetRef, ItemKind, Track, TrackKind};

    #[test]
    fn test_click_modes() {
        let (a, b) = (ItemId::new(), ItemId::new());
        let mut selection = Selection::new();

        selection.select(a, SelectMode::Set);
        selection.select(b, SelectMode::Toggle);
        assert_eq!(selection.items(), &[a, b]);

        selection.select(a, SelectMode::Toggle);
        assert_eq!(selection.items(), &[b]);

        selection.select(a, SelectMode::Set);
        assert_eq!(selection.items(), &[a]);
    }

    #[test]
    fn test_prune_and_range() {
        let mut timeline = Timeline::new("Sel");
        let track = timeline.add_track(Track::new("V1", TrackKind::Video)).unwrap();
        let x = Item::new(track, ItemKind::Video, AssetRef::new("x"), 4.0, 1.0);
        let y = Item::new(track, ItemKind::Video, AssetRef::new("y"), 1.0, 2.0);
        let (x_id, y_id) = (x.id, y.id);
        timeline.add_item(x).unwrap();
        timeline.add_item(y).unwrap();

        let mut selection = Selection::new();
        selection.set([x_id, ItemId::new(), y_id]);
        assert_eq!(selection.retain_existing(&timeline), 1);
        assert_eq!(selection.time_range(&timeline), Some((1.0, 5.0)));
        assert_eq!(selection.resolve(&timeline)[0].id, y_id);
    }
}
