//! Track engine dispatch.
//!
//! The three engine kinds share a capability set (reset, restart, tick,
//! update, change pattern, link data, outputs) behind a tagged variant,
//! matched against the track's model variant at every call.

use gs_model::{MidiMessage, RecordMode, Scale, Track};

use crate::curve_track_engine::CurveTrackEngine;
use crate::link::LinkData;
use crate::midi_cv_track_engine::MidiCvTrackEngine;
use crate::note_track_engine::NoteTrackEngine;
use crate::output::MidiOutputSink;

/// Per-tick playback state handed to every engine.
#[derive(Clone, Copy, Debug)]
pub struct PlayContext {
    pub running: bool,
    pub recording: bool,
    pub record_mode: RecordMode,
    /// Project-level scale, overridable per sequence.
    pub scale: Scale,
    /// Project-level root note, overridable per sequence.
    pub root_note: i32,
    pub mute: bool,
    pub fill: bool,
    /// Chance in percent that a step participates in the fill.
    pub fill_amount: u32,
    /// Is this the project's selected track?
    pub selected: bool,
    /// Current CV input in volts, for curve recording.
    pub cv_input: f32,
    pub cv_input_active: bool,
}

/// One track's engine.
pub enum TrackEngine {
    Note(NoteTrackEngine),
    Curve(CurveTrackEngine),
    MidiCv(MidiCvTrackEngine),
}

impl TrackEngine {
    /// Build the engine matching a track's mode.
    pub fn for_track(track: &Track, track_index: usize, seed: u64) -> Self {
        match track {
            Track::Note(_) => TrackEngine::Note(NoteTrackEngine::new(track_index, seed)),
            Track::Curve(_) => TrackEngine::Curve(CurveTrackEngine::new(track_index, seed)),
            Track::MidiCv(_) => TrackEngine::MidiCv(MidiCvTrackEngine::new(track_index, seed)),
        }
    }

    pub fn reset(&mut self) {
        match self {
            TrackEngine::Note(engine) => engine.reset(),
            TrackEngine::Curve(engine) => engine.reset(),
            TrackEngine::MidiCv(engine) => engine.reset(),
        }
    }

    pub fn restart(&mut self) {
        match self {
            TrackEngine::Note(engine) => engine.restart(),
            TrackEngine::Curve(engine) => engine.restart(),
            TrackEngine::MidiCv(engine) => engine.restart(),
        }
    }

    pub fn change_pattern(&mut self, pattern: usize) {
        match self {
            TrackEngine::Note(engine) => engine.change_pattern(pattern),
            TrackEngine::Curve(engine) => engine.change_pattern(pattern),
            TrackEngine::MidiCv(_) => {}
        }
    }

    pub fn tick(
        &mut self,
        tick: u32,
        track: &mut Track,
        ctx: &PlayContext,
        link: Option<&LinkData>,
        sink: &mut dyn MidiOutputSink,
    ) {
        match (self, track) {
            (TrackEngine::Note(engine), Track::Note(track)) => {
                engine.tick(tick, track, ctx, link, sink)
            }
            (TrackEngine::Curve(engine), Track::Curve(track)) => {
                engine.tick(tick, track, ctx, link, sink)
            }
            (TrackEngine::MidiCv(engine), Track::MidiCv(track)) => {
                engine.tick(tick, track, ctx.mute && !ctx.fill)
            }
            _ => debug_assert!(false, "track mode mismatch"),
        }
    }

    pub fn update(&mut self, dt: f32, track: &Track, ctx: &PlayContext) {
        match (self, track) {
            (TrackEngine::Note(engine), Track::Note(track)) => engine.update(dt, track, ctx),
            (TrackEngine::Curve(engine), Track::Curve(track)) => engine.update(dt, track, ctx),
            (TrackEngine::MidiCv(_), Track::MidiCv(_)) => {}
            _ => debug_assert!(false, "track mode mismatch"),
        }
    }

    /// Route an incoming MIDI message to the engine's input path.
    pub fn receive_midi(
        &mut self,
        tick: u32,
        message: &MidiMessage,
        track: &mut Track,
        ctx: &PlayContext,
    ) {
        match (self, track) {
            (TrackEngine::Note(engine), Track::Note(track)) => {
                engine.monitor_midi(tick, message, track, ctx)
            }
            (TrackEngine::MidiCv(engine), Track::MidiCv(track)) => {
                engine.receive_midi(tick, message, track)
            }
            _ => {}
        }
    }

    /// Published timing snapshot, for follower tracks.
    pub fn link_data(&self) -> LinkData {
        match self {
            TrackEngine::Note(engine) => engine.link_data(),
            TrackEngine::Curve(engine) => engine.link_data(),
            TrackEngine::MidiCv(_) => LinkData::default(),
        }
    }

    pub fn activity(&self) -> bool {
        match self {
            TrackEngine::Note(engine) => engine.activity(),
            TrackEngine::Curve(engine) => engine.activity(),
            TrackEngine::MidiCv(engine) => engine.activity(),
        }
    }

    pub fn gate_output(&self, track: &Track, index: usize) -> bool {
        match (self, track) {
            (TrackEngine::Note(engine), _) => engine.gate_output(),
            (TrackEngine::Curve(engine), _) => engine.gate_output(),
            (TrackEngine::MidiCv(engine), Track::MidiCv(track)) => {
                engine.gate_output(track, index)
            }
            _ => false,
        }
    }

    pub fn cv_output(&self, track: &Track, index: usize) -> f32 {
        match (self, track) {
            (TrackEngine::Note(engine), _) => engine.cv_output(),
            (TrackEngine::Curve(engine), _) => engine.cv_output(),
            (TrackEngine::MidiCv(engine), Track::MidiCv(track)) => engine.cv_output(track, index),
            _ => 0.0,
        }
    }

    pub fn sequence_progress(&self, track: &Track) -> f32 {
        match (self, track) {
            (TrackEngine::Note(engine), Track::Note(track)) => engine.sequence_progress(track),
            (TrackEngine::Curve(engine), Track::Curve(track)) => engine.sequence_progress(track),
            _ => 0.0,
        }
    }

    pub fn note(&mut self) -> Option<&mut NoteTrackEngine> {
        match self {
            TrackEngine::Note(engine) => Some(engine),
            _ => None,
        }
    }
}
