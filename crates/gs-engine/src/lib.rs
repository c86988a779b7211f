//! Tick-driven track engines for the gridseq sequencer.
//!
//! The engine consumes a monotonic tick from an external clock and
//! pushes gate edges and CV updates into bounded, time-ordered queues
//! which drain into abstract output sinks. Every per-track structure is
//! statically sized; the tick path performs no heap allocation and never
//! blocks.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod arpeggiator_engine;
mod curve_track_engine;
mod engine;
pub mod groove;
mod link;
mod midi_cv_track_engine;
mod midi_input;
mod note_track_engine;
mod output;
mod recorder;
mod rng;
mod sequence_state;
mod sorted_queue;
mod track_engine;

pub use arpeggiator_engine::{ArpEvent, ArpeggiatorEngine};
pub use curve_track_engine::CurveTrackEngine;
pub use engine::Engine;
pub use link::LinkData;
pub use midi_cv_track_engine::MidiCvTrackEngine;
pub use midi_input::{midi_input_queue, MidiInputConsumer, MidiInputProducer, TimedMidi};
pub use note_track_engine::NoteTrackEngine;
pub use output::{MidiOutputSink, NullMidiOutput};
pub use recorder::{
    CurveMatch, CurveRecorder, RecordEvent, RecordHistory, RecordKind, CURVE_RECORD_BUCKETS,
    RECORD_HISTORY_SIZE,
};
pub use rng::SeqRng;
pub use sequence_state::{rotate_step, SequenceState};
pub use sorted_queue::{tick_le, tick_lt, CvEvent, GateEvent, SortedQueue, Timed, QUEUE_SIZE};
pub use track_engine::{PlayContext, TrackEngine};
