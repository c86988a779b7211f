//! Top-level sequencer engine.
//!
//! Owns the project model and one engine per track. An external clock
//! calls `tick` at master PPQN resolution; `update` runs at UI/output
//! rate for slide smoothing. All work happens on the caller's context;
//! nothing here blocks.

use alloc::vec::Vec;
use arrayvec::ArrayVec;

use gs_model::{MidiMessage, Project, PATTERN_COUNT, TRACK_COUNT};

use crate::midi_input::MidiInputConsumer;
use crate::output::MidiOutputSink;
use crate::track_engine::{PlayContext, TrackEngine};

/// Messages drained from the MIDI input queue in one tick.
const MIDI_BATCH: usize = 64;

/// Per-track live performance state.
#[derive(Clone, Copy, Debug)]
struct TrackState {
    mute: bool,
    fill: bool,
    fill_amount: u8,
    pattern: u8,
    requested_pattern: Option<u8>,
}

impl Default for TrackState {
    fn default() -> Self {
        Self {
            mute: false,
            fill: false,
            fill_amount: 100,
            pattern: 0,
            requested_pattern: None,
        }
    }
}

/// The sequencer core: project model, track engines and play state.
pub struct Engine {
    project: Project,
    track_engines: Vec<TrackEngine>,
    track_states: [TrackState; TRACK_COUNT],
    midi_input: Option<MidiInputConsumer>,
    cv_input: [f32; 4],
    running: bool,
    recording: bool,
    last_tick: u32,
    /// CV input channel used for curve recording; none disables it.
    curve_cv_input: Option<usize>,
}

impl Engine {
    /// Seed base for the per-track RNG streams.
    const RNG_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

    pub fn new(project: Project) -> Self {
        let track_engines = project
            .tracks()
            .iter()
            .enumerate()
            .map(|(i, track)| TrackEngine::for_track(track, i, Self::RNG_SEED ^ i as u64))
            .collect();
        Self {
            project,
            track_engines,
            track_states: [TrackState::default(); TRACK_COUNT],
            midi_input: None,
            cv_input: [0.0; 4],
            running: false,
            recording: false,
            last_tick: 0,
            curve_cv_input: None,
        }
    }

    /// Attach the consumer half of the MIDI input queue.
    pub fn set_midi_input(&mut self, consumer: MidiInputConsumer) {
        self.midi_input = Some(consumer);
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn project_mut(&mut self) -> &mut Project {
        &mut self.project
    }

    /// Replace a track's mode, rebuilding its engine.
    pub fn set_track_mode(&mut self, track_index: usize, mode_index: u8) {
        debug_assert!(track_index < TRACK_COUNT);
        self.project.set_track_mode(track_index, mode_index);
        self.track_engines[track_index] = TrackEngine::for_track(
            self.project.track(track_index),
            track_index,
            Self::RNG_SEED ^ track_index as u64,
        );
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn recording(&self) -> bool {
        self.recording
    }

    /// The most recently processed tick.
    pub fn last_tick(&self) -> u32 {
        self.last_tick
    }

    pub fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
    }

    pub fn set_mute(&mut self, track_index: usize, mute: bool) {
        self.track_states[track_index].mute = mute;
    }

    pub fn set_fill(&mut self, track_index: usize, fill: bool) {
        self.track_states[track_index].fill = fill;
    }

    pub fn set_fill_amount(&mut self, track_index: usize, amount: u32) {
        self.track_states[track_index].fill_amount = amount.min(100) as u8;
    }

    pub fn set_cv_input(&mut self, channel: usize, volts: f32) {
        if channel < self.cv_input.len() {
            self.cv_input[channel] = volts;
        }
    }

    pub fn set_curve_cv_input(&mut self, channel: Option<usize>) {
        self.curve_cv_input = channel.filter(|&c| c < self.cv_input.len());
    }

    pub fn pattern(&self, track_index: usize) -> usize {
        usize::from(self.track_states[track_index].pattern)
    }

    /// Request a pattern change; it takes effect at the next tick
    /// boundary, never mid-tick.
    pub fn request_pattern_change(&mut self, track_index: usize, pattern: usize) {
        debug_assert!(pattern < PATTERN_COUNT);
        self.track_states[track_index].requested_pattern = Some(pattern.min(PATTERN_COUNT - 1) as u8);
    }

    /// Reset every track engine, as on a transport stop/rewind.
    pub fn reset(&mut self) {
        for engine in &mut self.track_engines {
            engine.reset();
        }
    }

    /// Rewind all cursors without clearing outputs.
    pub fn restart(&mut self) {
        for engine in &mut self.track_engines {
            engine.restart();
        }
    }

    /// Pin a step for monitoring on a note track.
    pub fn set_monitor_step(&mut self, track_index: usize, step_index: i32) {
        let ctx = self.play_context(track_index);
        let track = self.project.track(track_index);
        if let (TrackEngine::Note(engine), gs_model::Track::Note(note_track)) =
            (&mut self.track_engines[track_index], track)
        {
            engine.set_monitor_step(step_index, note_track, &ctx);
        }
    }

    /// Advance all tracks to `tick`. Tracks run in index order so a
    /// follower always reads its leader's link data from the same pass.
    pub fn tick(&mut self, tick: u32, sink: &mut dyn MidiOutputSink) {
        self.apply_pattern_changes();
        self.dispatch_midi_input(tick);

        for track_index in 0..TRACK_COUNT {
            let ctx = self.play_context(track_index);
            let link = self
                .project
                .track(track_index)
                .link_track()
                .filter(|&leader| leader < track_index)
                .map(|leader| self.track_engines[leader].link_data());

            let engine = &mut self.track_engines[track_index];
            let track = self.project.track_mut(track_index);
            engine.tick(tick, track, &ctx, link.as_ref(), sink);
        }

        self.last_tick = tick;
    }

    /// Smooth CV outputs; called at UI/output rate.
    pub fn update(&mut self, dt: f32) {
        for track_index in 0..TRACK_COUNT {
            let ctx = self.play_context(track_index);
            let engine = &mut self.track_engines[track_index];
            let track = self.project.track(track_index);
            engine.update(dt, track, &ctx);
        }
    }

    /// Feed a MIDI message directly (bypassing the input queue).
    pub fn receive_midi(&mut self, tick: u32, message: &MidiMessage) {
        for track_index in 0..TRACK_COUNT {
            let ctx = self.play_context(track_index);
            let engine = &mut self.track_engines[track_index];
            let track = self.project.track_mut(track_index);
            engine.receive_midi(tick, message, track, &ctx);
        }
    }

    pub fn activity(&self, track_index: usize) -> bool {
        self.track_engines[track_index].activity()
    }

    pub fn gate_output(&self, track_index: usize, voice_index: usize) -> bool {
        self.track_engines[track_index].gate_output(self.project.track(track_index), voice_index)
    }

    pub fn cv_output(&self, track_index: usize, voice_index: usize) -> f32 {
        self.track_engines[track_index].cv_output(self.project.track(track_index), voice_index)
    }

    pub fn sequence_progress(&self, track_index: usize) -> f32 {
        self.track_engines[track_index].sequence_progress(self.project.track(track_index))
    }

    fn apply_pattern_changes(&mut self) {
        for track_index in 0..TRACK_COUNT {
            if let Some(pattern) = self.track_states[track_index].requested_pattern.take() {
                self.track_states[track_index].pattern = pattern;
                self.track_engines[track_index].change_pattern(usize::from(pattern));
            }
        }
    }

    fn dispatch_midi_input(&mut self, _tick: u32) {
        let Some(consumer) = self.midi_input.as_mut() else { return };
        let mut batch: ArrayVec<(u32, MidiMessage), MIDI_BATCH> = ArrayVec::new();
        while let Some(timed) = consumer.pop() {
            batch.push((timed.tick, timed.message));
            if batch.is_full() {
                break;
            }
        }
        for (message_tick, message) in batch {
            self.receive_midi(message_tick, &message);
        }
    }

    fn play_context(&self, track_index: usize) -> PlayContext {
        let state = &self.track_states[track_index];
        PlayContext {
            running: self.running,
            recording: self.recording,
            record_mode: self.project.record_mode(),
            scale: self.project.scale(),
            root_note: self.project.root_note(),
            mute: state.mute,
            fill: state.fill,
            fill_amount: u32::from(state.fill_amount),
            selected: self.project.selected_track() == track_index,
            cv_input: self.curve_cv_input.map_or(0.0, |channel| self.cv_input[channel]),
            cv_input_active: self.curve_cv_input.is_some(),
        }
    }
}
