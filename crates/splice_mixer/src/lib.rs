// SPDX-License-Identifier: MIT OR Apache-2.0
//! Audio mixing for the Splice editor.
//!
//! Every track gets a channel strip (gain -> pan -> analyzer tap) feeding the
//! master bus. The graph reconciles those strips against the timeline after
//! each committed edit, so undo and redo drive audio state exactly like the
//! original edit did.
//!
//! ## Architecture
//!
//! - [`AudioSink`] is the injected backend capability
//! - [`AudioGraph`] owns the strips and is driven from a single thread
//! - [`ParamSender`] lets background workers post changes without touching it

pub mod graph;
pub mod node;
pub mod queue;
pub mod sink;

pub use graph::{is_silenced, AudioGraph, MixerError, ReconcileReport};
pub use node::{pan_gains, Analyzer, ChannelStrip, RampedParam, DEFAULT_RAMP_MS};
pub use queue::{ParamChange, ParamSender};
pub use sink::{AudioSink, ChannelHandle, ChannelState, MemorySink, NullSink, SinkCall};
