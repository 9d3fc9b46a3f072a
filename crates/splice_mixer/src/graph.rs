// SPDX-License-Identifier: MIT OR Apache-2.0
//! Audio graph: one channel strip per track feeding the master bus.

use crate::node::{Analyzer, ChannelStrip, RampedParam, DEFAULT_RAMP_MS};
use crate::queue::{param_queue, ParamChange, ParamReceiver, ParamSender};
use crate::sink::AudioSink;
use indexmap::IndexMap;
use splice_timeline::{Timeline, Track, TrackId};
use thiserror::Error;

/// Mixer errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MixerError {
    /// No binding exists for the track
    #[error("Track has no audio binding: {0:?}")]
    TrackNotBound(TrackId),

    /// Parameter outside its valid range
    #[error("Parameter out of range: {0}")]
    OutOfRange(String),
}

/// What a reconcile pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Tracks that received a new binding
    pub created: Vec<TrackId>,
    /// Tracks whose binding was torn down
    pub removed: Vec<TrackId>,
    /// Tracks whose gain or pan changed
    pub updated: Vec<TrackId>,
}

impl ReconcileReport {
    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

/// Whether a track is silenced by its own mute or by another track's solo
pub fn is_silenced(track: &Track, any_solo: bool) -> bool {
    track.muted || (any_solo && !track.solo)
}

/// Per-track mixing graph driving an [`AudioSink`]
#[derive(Debug)]
pub struct AudioGraph<S: AudioSink> {
    sink: S,
    strips: IndexMap<TrackId, ChannelStrip>,
    master: RampedParam,
    ramp_ms: f32,
    receiver: ParamReceiver,
    sender: Option<ParamSender>,
}

impl<S: AudioSink> AudioGraph<S> {
    /// Create a graph with the default ramp
    pub fn new(sink: S) -> Self {
        Self::with_ramp(sink, DEFAULT_RAMP_MS)
    }

    /// Create a graph with a custom ramp time constant
    pub fn with_ramp(sink: S, ramp_ms: f32) -> Self {
        let (sender, receiver) = param_queue();
        Self {
            sink,
            strips: IndexMap::new(),
            master: RampedParam::new(1.0, ramp_ms),
            ramp_ms,
            receiver,
            sender: Some(sender),
        }
    }

    /// Take the producer half of the parameter queue.
    ///
    /// Returns `None` after the first call.
    pub fn take_param_sender(&mut self) -> Option<ParamSender> {
        self.sender.take()
    }

    /// Bring bindings in line with the timeline's tracks
    pub fn reconcile(&mut self, timeline: &Timeline) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let any_solo = timeline.tracks().any(|t| t.solo);

        let stale: Vec<TrackId> = self
            .strips
            .keys()
            .copied()
            .filter(|id| timeline.track(*id).is_none())
            .collect();
        for id in stale {
            if let Some(strip) = self.strips.shift_remove(&id) {
                self.sink.disconnect(strip.handle);
                tracing::debug!("Disconnected audio binding for track {:?}", id);
                report.removed.push(id);
            }
        }

        let mut ordered = IndexMap::with_capacity(timeline.track_count());
        for track in timeline.tracks() {
            let silenced = is_silenced(track, any_solo);
            let strip = match self.strips.shift_remove(&track.id) {
                Some(mut strip) => {
                    if self.update_strip(&mut strip, track, silenced) {
                        report.updated.push(track.id);
                    }
                    strip
                }
                None => {
                    report.created.push(track.id);
                    self.create_strip(track, silenced)
                }
            };
            ordered.insert(track.id, strip);
        }
        self.strips = ordered;

        report
    }

    fn create_strip(&mut self, track: &Track, silenced: bool) -> ChannelStrip {
        let handle = self.sink.create_channel();
        let mut strip = ChannelStrip::new(handle, track.volume, track.pan, self.ramp_ms);
        strip.silenced = silenced;
        strip.gain.set_immediate(strip.effective_gain());

        self.sink.set_pan(handle, strip.pan);
        self.sink.set_gain(handle, strip.effective_gain(), 0.0);
        self.sink.connect_to_master(handle);

        tracing::debug!(
            "Created audio binding for track {:?} (gain {}, pan {})",
            track.id,
            strip.effective_gain(),
            strip.pan
        );
        strip
    }

    fn update_strip(&mut self, strip: &mut ChannelStrip, track: &Track, silenced: bool) -> bool {
        let mut changed = false;

        if track.volume != strip.model_volume {
            strip.model_volume = track.volume;
            strip.volume = track.volume;
        }
        if track.pan != strip.model_pan {
            strip.model_pan = track.pan;
            if strip.pan != track.pan {
                strip.pan = track.pan;
                self.sink.set_pan(strip.handle, strip.pan);
                changed = true;
            }
        }
        strip.silenced = silenced;

        changed |= push_gain(&mut self.sink, self.ramp_ms, strip);
        changed
    }

    /// Apply changes posted through the parameter queue. Returns how many applied.
    pub fn apply_pending(&mut self) -> usize {
        let mut applied = 0;
        for change in self.receiver.drain() {
            let result = match change {
                ParamChange::Volume { track, value } => self.set_live_volume(track, value),
                ParamChange::Pan { track, value } => self.set_live_pan(track, value),
                ParamChange::Levels { track, peak, rms } => self
                    .strips
                    .get_mut(&track)
                    .map(|s| s.analyzer.set_levels(peak, rms))
                    .ok_or(MixerError::TrackNotBound(track)),
            };
            match result {
                Ok(()) => applied += 1,
                Err(e) => tracing::warn!("Dropped queued audio change {:?}: {}", change, e),
            }
        }
        applied
    }

    /// Adjust a binding's volume without touching the track.
    ///
    /// The model value wins again the next time the track's volume changes.
    pub fn set_live_volume(&mut self, track: TrackId, value: f32) -> Result<(), MixerError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(MixerError::OutOfRange(format!("volume {value}")));
        }
        let strip = self
            .strips
            .get_mut(&track)
            .ok_or(MixerError::TrackNotBound(track))?;
        strip.volume = value;
        push_gain(&mut self.sink, self.ramp_ms, strip);
        Ok(())
    }

    /// Adjust a binding's pan without touching the track
    pub fn set_live_pan(&mut self, track: TrackId, value: f32) -> Result<(), MixerError> {
        if !(-1.0..=1.0).contains(&value) {
            return Err(MixerError::OutOfRange(format!("pan {value}")));
        }
        let strip = self
            .strips
            .get_mut(&track)
            .ok_or(MixerError::TrackNotBound(track))?;
        strip.pan = value;
        self.sink.set_pan(strip.handle, value);
        Ok(())
    }

    /// Set the master bus gain
    pub fn set_master_gain(&mut self, value: f32) -> Result<(), MixerError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(MixerError::OutOfRange(format!("master gain {value}")));
        }
        self.master.set_target(value);
        self.sink.set_master_gain(value, self.ramp_ms);
        Ok(())
    }

    /// Advance every ramp by `elapsed_ms`
    pub fn advance(&mut self, elapsed_ms: f32) {
        self.master.advance(elapsed_ms);
        for strip in self.strips.values_mut() {
            strip.gain.advance(elapsed_ms);
        }
    }

    /// Feed a block of a track's pre-gain samples to its meter
    pub fn analyze(&mut self, track: TrackId, samples: &[f32]) -> Result<Analyzer, MixerError> {
        let strip = self
            .strips
            .get_mut(&track)
            .ok_or(MixerError::TrackNotBound(track))?;
        let gain = strip.gain.current();
        strip.analyzer.process(samples, gain);
        Ok(strip.analyzer)
    }

    /// Binding for a track
    pub fn strip(&self, track: TrackId) -> Option<&ChannelStrip> {
        self.strips.get(&track)
    }

    /// All bindings in track order
    pub fn strips(&self) -> impl Iterator<Item = (&TrackId, &ChannelStrip)> {
        self.strips.iter()
    }

    /// Number of live bindings
    pub fn binding_count(&self) -> usize {
        self.strips.len()
    }

    /// Gain currently targeted for a track
    pub fn effective_gain(&self, track: TrackId) -> Option<f32> {
        self.strips.get(&track).map(ChannelStrip::effective_gain)
    }

    /// Whether the track is currently audible
    pub fn is_audible(&self, track: TrackId) -> bool {
        self.effective_gain(track).is_some_and(|g| g > 0.0)
    }

    /// Master bus gain (ramped)
    pub fn master_gain(&self) -> f32 {
        self.master.current()
    }

    /// The backend
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The backend, mutably
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

/// Send the strip's effective gain to the backend if its target moved
fn push_gain<S: AudioSink>(sink: &mut S, ramp_ms: f32, strip: &mut ChannelStrip) -> bool {
    let effective = strip.effective_gain();
    if effective == strip.gain.target() {
        return false;
    }
    strip.gain.set_target(effective);
    sink.set_gain(strip.handle, effective, ramp_ms);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{MemorySink, SinkCall};
    use splice_timeline::TrackKind;

    fn timeline_with_tracks(n: usize) -> (Timeline, Vec<TrackId>) {
        let mut timeline = Timeline::new("Mix");
        let ids = (0..n)
            .map(|i| {
                timeline
                    .add_track(Track::new(format!("A{}", i + 1), TrackKind::Audio))
                    .unwrap()
            })
            .collect();
        (timeline, ids)
    }

    fn set_track(timeline: &mut Timeline, id: TrackId, f: impl FnOnce(&mut Track)) {
        f(timeline.track_mut(id).unwrap());
    }

    #[test]
    fn test_binding_per_track() {
        let (timeline, ids) = timeline_with_tracks(3);
        let mut graph = AudioGraph::new(MemorySink::new());
        let report = graph.reconcile(&timeline);

        assert_eq!(report.created, ids);
        assert_eq!(graph.binding_count(), 3);
        assert_eq!(graph.sink().channel_count(), 3);
        for id in &ids {
            let handle = graph.strip(*id).unwrap().handle;
            assert!(graph.sink().channel(handle).unwrap().connected);
        }
    }

    #[test]
    fn test_mute_keeps_volume() {
        let (mut timeline, ids) = timeline_with_tracks(1);
        let mut graph = AudioGraph::new(MemorySink::new());
        set_track(&mut timeline, ids[0], |t| t.volume = 0.7);
        graph.reconcile(&timeline);

        set_track(&mut timeline, ids[0], |t| t.muted = true);
        graph.reconcile(&timeline);
        assert_eq!(graph.effective_gain(ids[0]), Some(0.0));
        assert_eq!(timeline.track(ids[0]).unwrap().volume, 0.7);

        set_track(&mut timeline, ids[0], |t| t.muted = false);
        graph.reconcile(&timeline);
        assert_eq!(graph.effective_gain(ids[0]), Some(0.7));
    }

    #[test]
    fn test_gain_changes_are_ramped() {
        let (mut timeline, ids) = timeline_with_tracks(1);
        let mut graph = AudioGraph::new(MemorySink::new());
        graph.reconcile(&timeline);
        graph.sink_mut().clear_calls();

        set_track(&mut timeline, ids[0], |t| t.volume = 0.5);
        graph.reconcile(&timeline);

        let handle = graph.strip(ids[0]).unwrap().handle;
        assert_eq!(
            graph.sink().calls(),
            &[SinkCall::Gain(handle, 0.5, DEFAULT_RAMP_MS)]
        );
        assert_eq!(graph.strip(ids[0]).unwrap().gain.current(), 1.0);
        graph.advance(10.0);
        let current = graph.strip(ids[0]).unwrap().gain.current();
        assert!(current < 1.0 && current > 0.5);
    }

    #[test]
    fn test_solo_is_non_exclusive() {
        let (mut timeline, ids) = timeline_with_tracks(4);
        let mut graph = AudioGraph::new(MemorySink::new());
        set_track(&mut timeline, ids[3], |t| t.muted = true);
        graph.reconcile(&timeline);

        set_track(&mut timeline, ids[0], |t| t.solo = true);
        graph.reconcile(&timeline);
        set_track(&mut timeline, ids[1], |t| t.solo = true);
        graph.reconcile(&timeline);

        assert!(graph.is_audible(ids[0]));
        assert!(graph.is_audible(ids[1]));
        assert!(!graph.is_audible(ids[2]));
        assert!(!graph.is_audible(ids[3]));

        set_track(&mut timeline, ids[0], |t| t.solo = false);
        set_track(&mut timeline, ids[1], |t| t.solo = false);
        graph.reconcile(&timeline);

        assert!(graph.is_audible(ids[0]));
        assert!(graph.is_audible(ids[1]));
        assert!(graph.is_audible(ids[2]));
        assert!(!graph.is_audible(ids[3]));
    }

    #[test]
    fn test_removed_track_is_disconnected_and_rebuilt() {
        let (mut timeline, ids) = timeline_with_tracks(2);
        set_track(&mut timeline, ids[1], |t| {
            t.volume = 0.4;
            t.pan = -0.5;
        });
        let mut graph = AudioGraph::new(MemorySink::new());
        graph.reconcile(&timeline);
        let old_handle = graph.strip(ids[1]).unwrap().handle;

        let (index, track) = timeline.remove_track(ids[1]).unwrap();
        let report = graph.reconcile(&timeline);
        assert_eq!(report.removed, vec![ids[1]]);
        assert!(graph.sink().channel(old_handle).is_none());

        timeline.insert_track(index, track).unwrap();
        graph.reconcile(&timeline);
        let strip = graph.strip(ids[1]).unwrap();
        let state = graph.sink().channel(strip.handle).unwrap();
        assert_eq!(state.gain, 0.4);
        assert_eq!(state.pan, -0.5);
        assert!(state.connected);
    }

    #[test]
    fn test_queued_changes_apply_on_owner() {
        let (timeline, ids) = timeline_with_tracks(1);
        let mut graph = AudioGraph::new(MemorySink::new());
        graph.reconcile(&timeline);

        let sender = graph.take_param_sender().unwrap();
        assert!(graph.take_param_sender().is_none());

        let track = ids[0];
        let worker = std::thread::spawn(move || {
            sender.send(ParamChange::Volume { track, value: 0.25 });
            sender.send(ParamChange::Levels { track, peak: 0.9, rms: 0.3 });
            sender.send(ParamChange::Pan {
                track: TrackId::new(),
                value: 0.0,
            });
        });
        worker.join().unwrap();

        assert_eq!(graph.apply_pending(), 2);
        let strip = graph.strip(track).unwrap();
        assert_eq!(strip.effective_gain(), 0.25);
        assert_eq!(strip.analyzer.peak, 0.9);
    }

    #[test]
    fn test_live_volume_rejects_out_of_range() {
        let (timeline, ids) = timeline_with_tracks(1);
        let mut graph = AudioGraph::new(MemorySink::new());
        graph.reconcile(&timeline);
        assert!(graph.set_live_volume(ids[0], 1.5).is_err());
        assert!(matches!(
            graph.set_live_pan(TrackId::new(), 0.0),
            Err(MixerError::TrackNotBound(_))
        ));
    }
}
