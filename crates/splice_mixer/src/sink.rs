// SPDX-License-Identifier: MIT OR Apache-2.0
//! Audio backend capability.
//!
//! The graph never talks to an audio API directly. A host injects an
//! [`AudioSink`] (a native backend, a web audio bridge, or one of the sinks
//! below) and the graph drives it through channel handles.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Handle to a backend channel (gain -> pan -> master)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelHandle(pub u32);

/// Audio backend operations used by the mixer
pub trait AudioSink {
    /// Allocate a new channel strip
    fn create_channel(&mut self) -> ChannelHandle;

    /// Set channel gain, ramping over `ramp_ms` milliseconds
    fn set_gain(&mut self, channel: ChannelHandle, value: f32, ramp_ms: f32);

    /// Set channel pan (-1 to 1)
    fn set_pan(&mut self, channel: ChannelHandle, value: f32);

    /// Route the channel into the master bus
    fn connect_to_master(&mut self, channel: ChannelHandle);

    /// Disconnect every node of the channel and release it
    fn disconnect(&mut self, channel: ChannelHandle);

    /// Set the master bus gain
    fn set_master_gain(&mut self, _value: f32, _ramp_ms: f32) {}
}

/// Sink that accepts every call and produces no sound
#[derive(Debug, Default)]
pub struct NullSink {
    next_channel: u32,
}

impl NullSink {
    /// Create a null sink
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioSink for NullSink {
    fn create_channel(&mut self) -> ChannelHandle {
        let handle = ChannelHandle(self.next_channel);
        self.next_channel += 1;
        handle
    }

    fn set_gain(&mut self, _channel: ChannelHandle, _value: f32, _ramp_ms: f32) {}

    fn set_pan(&mut self, _channel: ChannelHandle, _value: f32) {}

    fn connect_to_master(&mut self, _channel: ChannelHandle) {}

    fn disconnect(&mut self, _channel: ChannelHandle) {}
}

/// Backend-side state of one channel as seen by [`MemorySink`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelState {
    /// Last gain target
    pub gain: f32,
    /// Ramp used for the last gain change
    pub ramp_ms: f32,
    /// Last pan value
    pub pan: f32,
    /// Whether the channel feeds the master bus
    pub connected: bool,
}

/// Calls recorded by [`MemorySink`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SinkCall {
    /// `create_channel`
    Create(ChannelHandle),
    /// `set_gain`
    Gain(ChannelHandle, f32, f32),
    /// `set_pan`
    Pan(ChannelHandle, f32),
    /// `connect_to_master`
    Connect(ChannelHandle),
    /// `disconnect`
    Disconnect(ChannelHandle),
    /// `set_master_gain`
    MasterGain(f32, f32),
}

/// In-memory sink that tracks channel state and records every call
#[derive(Debug, Default)]
pub struct MemorySink {
    next_channel: u32,
    channels: HashMap<ChannelHandle, ChannelState>,
    master_gain: f32,
    calls: Vec<SinkCall>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self {
            master_gain: 1.0,
            ..Self::default()
        }
    }

    /// State of a live channel
    pub fn channel(&self, channel: ChannelHandle) -> Option<&ChannelState> {
        self.channels.get(&channel)
    }

    /// Number of live channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Master bus gain
    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    /// Every call in order
    pub fn calls(&self) -> &[SinkCall] {
        &self.calls
    }

    /// Forget recorded calls, keeping channel state
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl AudioSink for MemorySink {
    fn create_channel(&mut self) -> ChannelHandle {
        let handle = ChannelHandle(self.next_channel);
        self.next_channel += 1;
        self.channels.insert(handle, ChannelState::default());
        self.calls.push(SinkCall::Create(handle));
        handle
    }

    fn set_gain(&mut self, channel: ChannelHandle, value: f32, ramp_ms: f32) {
        if let Some(state) = self.channels.get_mut(&channel) {
            state.gain = value;
            state.ramp_ms = ramp_ms;
        }
        self.calls.push(SinkCall::Gain(channel, value, ramp_ms));
    }

    fn set_pan(&mut self, channel: ChannelHandle, value: f32) {
        if let Some(state) = self.channels.get_mut(&channel) {
            state.pan = value;
        }
        self.calls.push(SinkCall::Pan(channel, value));
    }

    fn connect_to_master(&mut self, channel: ChannelHandle) {
        if let Some(state) = self.channels.get_mut(&channel) {
            state.connected = true;
        }
        self.calls.push(SinkCall::Connect(channel));
    }

    fn disconnect(&mut self, channel: ChannelHandle) {
        self.channels.remove(&channel);
        self.calls.push(SinkCall::Disconnect(channel));
    }

    fn set_master_gain(&mut self, value: f32, ramp_ms: f32) {
        self.master_gain = value;
        self.calls.push(SinkCall::MasterGain(value, ramp_ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sink_hands_out_distinct_channels() {
        let mut sink = NullSink::new();
        let a = sink.create_channel();
        let b = sink.create_channel();
        assert_ne!(a, b);
        sink.set_gain(a, 0.5, 10.0);
        sink.disconnect(a);
    }
}
