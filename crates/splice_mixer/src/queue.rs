// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cross-thread parameter queue.
//!
//! Background workers (decoders, loudness analysis, control hardware) never
//! touch the graph. They post [`ParamChange`]s through a [`ParamSender`] and the
//! owning thread applies them with `AudioGraph::apply_pending`.

use splice_timeline::TrackId;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

/// A parameter change produced off the owning thread
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamChange {
    /// Live volume adjustment
    Volume {
        /// Target track
        track: TrackId,
        /// New volume (0 to 1)
        value: f32,
    },
    /// Live pan adjustment
    Pan {
        /// Target track
        track: TrackId,
        /// New pan (-1 to 1)
        value: f32,
    },
    /// Levels measured by an analysis worker
    Levels {
        /// Target track
        track: TrackId,
        /// Peak level
        peak: f32,
        /// RMS level
        rms: f32,
    },
}

impl ParamChange {
    /// Track the change applies to
    pub fn track(&self) -> TrackId {
        match self {
            Self::Volume { track, .. } | Self::Pan { track, .. } | Self::Levels { track, .. } => {
                *track
            }
        }
    }
}

/// Producer half of the parameter queue.
///
/// Not `Clone`: the queue has a single producer.
#[derive(Debug)]
pub struct ParamSender {
    sender: Sender<ParamChange>,
}

impl ParamSender {
    /// Post a change. Returns false once the graph has been dropped.
    pub fn send(&self, change: ParamChange) -> bool {
        self.sender.send(change).is_ok()
    }
}

/// Consumer half, owned by the graph
#[derive(Debug)]
pub(crate) struct ParamReceiver {
    receiver: Receiver<ParamChange>,
}

impl ParamReceiver {
    /// Drain everything queued so far without blocking
    pub(crate) fn drain(&self) -> Vec<ParamChange> {
        let mut changes = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(change) => changes.push(change),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        changes
    }
}

/// Create a connected sender/receiver pair
pub(crate) fn param_queue() -> (ParamSender, ParamReceiver) {
    let (sender, receiver) = mpsc::channel();
    (ParamSender { sender }, ParamReceiver { receiver })
}
