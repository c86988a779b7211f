//! gridseq — the real-time sequencing core of a multi-track hardware
//! step sequencer.
//!
//! On every clock tick the engine advances per-track sequence state
//! machines, evaluates probabilistic step parameters and emits timed
//! gate/CV events into output sinks, with a mirrored MIDI stream. The
//! workspace splits into three crates:
//!
//! - [`gs_model`] — sequences, steps, track configurations, scales,
//!   curve shapes and device settings.
//! - [`gs_engine`] — the tick-driven track engines, event queues,
//!   groove, recorder and voice allocator.
//! - [`gs_formats`] — versioned binary project and settings files.

pub use gs_engine::{
    midi_input_queue, Engine, MidiInputConsumer, MidiInputProducer, MidiOutputSink,
    NullMidiOutput,
};
pub use gs_formats::{read_project, read_settings, write_project, write_settings, FormatError};
pub use gs_model::{MidiMessage, Project, Settings, Track};
