// SPDX-License-Identifier: MIT OR Apache-2.0
//! Playback clock bounded to the timeline duration.

use crate::timeline::clamp_time;
use serde::{Deserialize, Serialize};

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Stopped
    #[default]
    Stopped,
    /// Playing forward
    Playing,
    /// Paused
    Paused,
}

/// Playback clock.
///
/// Ticks are driven by the host's display or audio clock. A tick only reads
/// the duration it is given and never touches the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackClock {
    /// Current playback time
    time: f64,
    /// Playback state
    state: PlaybackState,
    /// Playback speed multiplier
    pub speed: f64,
    /// Frames per second used for frame stepping
    pub frame_rate: f64,
}

impl PlaybackClock {
    /// Create a new clock at time zero
    pub fn new(frame_rate: f64) -> Self {
        Self {
            time: 0.0,
            state: PlaybackState::Stopped,
            speed: 1.0,
            frame_rate,
        }
    }

    /// Current time
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Current state
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Advance by `delta` seconds, stopping at the end. Returns the new time.
    pub fn tick(&mut self, delta: f64, duration: f64) -> f64 {
        if self.state != PlaybackState::Playing {
            return self.time;
        }

        let next = self.time + delta * self.speed;
        if next >= duration {
            self.time = duration.max(0.0);
            self.state = PlaybackState::Stopped;
        } else {
            self.time = clamp_time(next, duration);
        }
        self.time
    }

    /// Play from current position. Playing at the end restarts from zero.
    pub fn play(&mut self, duration: f64) {
        if duration <= 0.0 {
            return;
        }
        if self.time >= duration {
            self.time = 0.0;
        }
        self.state = PlaybackState::Playing;
    }

    /// Pause playback
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    /// Stop and reset to the beginning
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.time = 0.0;
    }

    /// Toggle play/pause
    pub fn toggle(&mut self, duration: f64) {
        match self.state {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused | PlaybackState::Stopped => self.play(duration),
        }
    }

    /// Is currently playing
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Seek to a time, clamped to `[0, duration]`
    pub fn seek(&mut self, time: f64, duration: f64) -> f64 {
        self.time = clamp_time(time, duration);
        self.time
    }

    /// Step by whole frames (negative steps go back)
    pub fn step_frames(&mut self, frames: i64, duration: f64) -> f64 {
        if self.frame_rate <= 0.0 {
            return self.time;
        }
        self.pause();
        let frame = (self.time * self.frame_rate).round() + frames as f64;
        self.seek(frame / self.frame_rate, duration)
    }

    /// Re-clamp after the duration changed
    pub fn clamp_to(&mut self, duration: f64) -> f64 {
        self.time = clamp_time(self.time, duration);
        if self.time >= duration && self.is_playing() {
            self.state = PlaybackState::Stopped;
        }
        self.time
    }

    /// Current frame number
    pub fn current_frame(&self) -> u64 {
        (self.time * self.frame_rate).round() as u64
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new(30.0)
    }
}
