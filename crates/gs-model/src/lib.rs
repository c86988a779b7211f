//! Data model for the gridseq sequencer.
//!
//! Plain data types shared by the engine and the file formats: sequences
//! and steps, track configurations, scales, curve shapes and device
//! settings. All range clamping lives in the setters; the engine reads
//! model state without further validation.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod arpeggiator;
mod curve;
mod curve_sequence;
mod curve_track;
mod midi;
mod midi_cv_track;
mod note_sequence;
mod note_track;
mod scale;
mod settings;
mod track;
pub mod types;

pub use arpeggiator::{Arpeggiator, ArpeggiatorMode};
pub use curve::{Shape, SHAPES};
pub use curve_sequence::{CurveSequence, CurveStep, SHAPE_VARIATION_RANGE};
pub use curve_track::{CurveFillMode, CurveTrack};
pub use midi::{MidiMessage, CC_MOD_WHEEL};
pub use midi_cv_track::{MidiCvTrack, MidiSource, NotePriority, VoiceConfig};
pub use note_sequence::{NoteSequence, NoteStep};
pub use note_track::{CvUpdateMode, NoteFillMode, NoteTrack};
pub use scale::Scale;
pub use settings::{Calibration, CvOutputCalibration, Settings, CALIBRATION_ITEMS};
pub use track::{Project, Track};
pub use types::{
    measure_divisor, Condition, PlayMode, RecordMode, RunMode, VoltageRange, PATTERN_COUNT,
    PPQN, SEQUENCE_PPQN, STEP_COUNT, TRACK_COUNT,
};
