//! Note track playback.
//!
//! Advances the sequence cursor, evaluates the current step under fill and
//! probability rules, and emits time-ordered gate edges and note CVs.

use gs_model::types::{gate_offset, length, probability};
use gs_model::{
    measure_divisor, Condition, CvUpdateMode, MidiMessage, NoteFillMode, NoteStep, NoteTrack,
    PlayMode, Scale, RecordMode, PATTERN_COUNT, PPQN, SEQUENCE_PPQN, STEP_COUNT,
};

use crate::groove::apply_swing;
use crate::link::LinkData;
use crate::output::MidiOutputSink;
use crate::recorder::{RecordHistory, RecordKind};
use crate::rng::SeqRng;
use crate::sequence_state::{rotate_step, SequenceState};
use crate::sorted_queue::{CvEvent, GateEvent, SortedQueue, QUEUE_SIZE};
use crate::track_engine::PlayContext;

/// Evaluate whether a step's gate passes its probability roll.
fn eval_step_gate(step: &NoteStep, probability_bias: i32, rng: &mut SeqRng) -> bool {
    let probability = probability::clamp_biased(step.gate_probability() + probability_bias);
    step.gate() && rng.next_range(probability::RANGE as u32) as i32 <= probability
}

/// Evaluate a step condition. `Pre`/`NotPre` only read the stored previous
/// condition; `Off` neither reads nor writes it.
fn eval_step_condition(
    condition: Condition,
    iteration: u32,
    fill: bool,
    prev_condition: &mut bool,
) -> bool {
    match condition {
        Condition::Off => true,
        Condition::Fill => {
            *prev_condition = fill;
            *prev_condition
        }
        Condition::NotFill => {
            *prev_condition = !fill;
            *prev_condition
        }
        Condition::Pre => *prev_condition,
        Condition::NotPre => !*prev_condition,
        Condition::First => {
            *prev_condition = iteration == 0;
            *prev_condition
        }
        Condition::NotFirst => {
            *prev_condition = iteration != 0;
            *prev_condition
        }
        Condition::Loop { base, offset } => {
            *prev_condition = iteration % u32::from(base.max(1)) == u32::from(offset);
            *prev_condition
        }
    }
}

/// Evaluate the retrigger pulse count for a step.
fn eval_step_retrigger(step: &NoteStep, probability_bias: i32, rng: &mut SeqRng) -> i32 {
    let probability = probability::clamp_biased(step.retrigger_probability() + probability_bias);
    if rng.next_range(probability::RANGE as u32) as i32 <= probability {
        step.retrigger() + 1
    } else {
        1
    }
}

/// Evaluate a step's length in `length::RANGE` units, with variation.
fn eval_step_length(step: &NoteStep, length_bias: i32, rng: &mut SeqRng) -> i32 {
    let mut value = length::clamp(step.length() + length_bias);
    if rng.next_range(probability::RANGE as u32) as i32 <= step.length_variation_probability() {
        let range = step.length_variation_range();
        let mut offset = if range == 0 {
            0
        } else {
            rng.next_range(range.unsigned_abs() + 1) as i32
        };
        if range < 0 {
            offset = -offset;
        }
        value = length::clamp(value + offset);
    }
    value
}

fn eval_transposition(scale: Scale, octave: i32, transpose: i32) -> i32 {
    octave * scale.notes_per_octave() + transpose
}

/// Evaluate a step's note voltage, with variation.
#[allow(clippy::too_many_arguments)]
fn eval_step_note(
    step: &NoteStep,
    probability_bias: i32,
    scale: Scale,
    root_note: i32,
    octave: i32,
    transpose: i32,
    use_variation: bool,
    rng: &mut SeqRng,
) -> f32 {
    let mut value = step.note()
        + if scale.is_chromatic() { root_note } else { 0 }
        + eval_transposition(scale, octave, transpose);
    let probability = probability::clamp_biased(step.note_variation_probability() + probability_bias);
    if use_variation && rng.next_range(probability::RANGE as u32) as i32 <= probability {
        let range = step.note_variation_range();
        let mut offset = if range == 0 {
            0
        } else {
            rng.next_range(range.unsigned_abs() + 1) as i32
        };
        if range < 0 {
            offset = -offset;
        }
        value = gs_model::types::note::clamp(value + offset);
    }
    scale.note_to_volts(value)
}

/// Runtime state of one note track.
pub struct NoteTrackEngine {
    track_index: usize,
    pattern: usize,
    rng: SeqRng,
    sequence_state: SequenceState,
    link_data: LinkData,
    free_relative_tick: u32,
    current_step: i32,
    prev_condition: bool,
    current_record_step: i32,
    monitor_step: i32,
    monitor_override: bool,
    record_history: RecordHistory,
    gate_queue: SortedQueue<GateEvent, QUEUE_SIZE>,
    cv_queue: SortedQueue<CvEvent, QUEUE_SIZE>,
    activity: bool,
    gate_output: bool,
    cv_output: f32,
    cv_output_target: f32,
    slide_active: bool,
}

impl NoteTrackEngine {
    pub fn new(track_index: usize, seed: u64) -> Self {
        Self {
            track_index,
            pattern: 0,
            rng: SeqRng::new(seed),
            sequence_state: SequenceState::new(),
            link_data: LinkData::default(),
            free_relative_tick: 0,
            current_step: -1,
            prev_condition: false,
            current_record_step: -1,
            monitor_step: -1,
            monitor_override: false,
            record_history: RecordHistory::new(),
            gate_queue: SortedQueue::new(),
            cv_queue: SortedQueue::new(),
            activity: false,
            gate_output: false,
            cv_output: 0.0,
            cv_output_target: 0.0,
            slide_active: false,
        }
    }

    pub fn reset(&mut self) {
        self.free_relative_tick = 0;
        self.sequence_state.reset();
        self.current_step = -1;
        self.prev_condition = false;
        self.activity = false;
        self.gate_output = false;
        self.cv_output = 0.0;
        self.cv_output_target = 0.0;
        self.slide_active = false;
        self.gate_queue.clear();
        self.cv_queue.clear();
        self.record_history.clear();
    }

    /// Rewind the cursor without touching outputs or queues.
    pub fn restart(&mut self) {
        self.free_relative_tick = 0;
        self.sequence_state.reset();
        self.current_step = -1;
    }

    pub fn change_pattern(&mut self, pattern: usize) {
        self.pattern = pattern.min(PATTERN_COUNT - 1);
    }

    pub fn pattern(&self) -> usize {
        self.pattern
    }

    pub fn link_data(&self) -> LinkData {
        self.link_data
    }

    pub fn current_step(&self) -> i32 {
        self.current_step
    }

    pub fn activity(&self) -> bool {
        self.activity
    }

    pub fn gate_output(&self) -> bool {
        self.gate_output
    }

    pub fn cv_output(&self) -> f32 {
        self.cv_output
    }

    pub fn cv_output_target(&self) -> f32 {
        self.cv_output_target
    }

    pub fn sequence_progress(&self, track: &NoteTrack) -> f32 {
        if self.current_step < 0 {
            return 0.0;
        }
        let sequence = track.sequence(self.pattern);
        let span = (sequence.last_step() - sequence.first_step()).max(1);
        (self.current_step - sequence.first_step()) as f32 / span as f32
    }

    /// Pin a step for monitoring; a negative index clears the pin.
    pub fn set_monitor_step(&mut self, index: i32, track: &NoteTrack, ctx: &PlayContext) {
        self.monitor_step = if (0..STEP_COUNT as i32).contains(&index) { index } else { -1 };

        // In step record mode this also selects where recording continues.
        let sequence = track.sequence(self.pattern);
        if ctx.recording
            && ctx.record_mode == RecordMode::StepRecord
            && index >= sequence.first_step()
            && index <= sequence.last_step()
        {
            self.current_record_step = index;
        }
    }

    pub fn tick(
        &mut self,
        tick: u32,
        track: &mut NoteTrack,
        ctx: &PlayContext,
        link: Option<&LinkData>,
        sink: &mut dyn MidiOutputSink,
    ) {
        if let Some(link) = link {
            self.link_data = *link;
            self.sequence_state = link.sequence_state;

            if link.relative_tick % link.divisor == 0 {
                self.record_step(tick, link.divisor, track, ctx);
                self.trigger_step(tick, link.divisor, track, ctx);
            }
        } else {
            let sequence = track.sequence(self.pattern);
            let divisor = sequence.divisor() * (PPQN / SEQUENCE_PPQN);
            let reset_divisor = sequence.reset_measure() * measure_divisor();
            let run_mode = sequence.run_mode();
            let first = sequence.first_step();
            let last = sequence.last_step();
            let play_mode = track.play_mode();

            let mut relative_tick = if reset_divisor == 0 { tick } else { tick % reset_divisor };

            if relative_tick == 0 {
                self.reset();
            }

            // Step recording freezes the playback cursor; its own record
            // cursor moves on note input instead.
            let freeze_cursor = ctx.recording && ctx.record_mode == RecordMode::StepRecord;

            match play_mode {
                PlayMode::Aligned => {
                    if relative_tick % divisor == 0 && !freeze_cursor {
                        self.sequence_state.advance_aligned(
                            relative_tick / divisor,
                            run_mode,
                            first,
                            last,
                            &mut self.rng,
                        );
                        self.record_step(tick, divisor, track, ctx);
                        self.trigger_step(tick, divisor, track, ctx);
                    }
                }
                PlayMode::Free => {
                    if !freeze_cursor {
                        relative_tick = self.free_relative_tick;
                        self.free_relative_tick += 1;
                        if self.free_relative_tick >= divisor {
                            self.free_relative_tick = 0;
                        }
                        if relative_tick == 0 {
                            self.sequence_state.advance_free(run_mode, first, last, &mut self.rng);
                            self.record_step(tick, divisor, track, ctx);
                            self.trigger_step(tick, divisor, track, ctx);
                        }
                    }
                }
            }

            self.link_data = LinkData {
                divisor,
                relative_tick,
                sequence_state: self.sequence_state,
            };
        }

        let cv_update_always = track.cv_update_mode() == CvUpdateMode::Always;

        while let Some(event) = self.gate_queue.pop_due(tick) {
            self.activity = event.gate;
            self.gate_output = (!ctx.mute || ctx.fill) && self.activity;
            sink.send_gate(self.track_index, self.gate_output);
        }

        while let Some(event) = self.cv_queue.pop_due(tick) {
            if !ctx.mute || cv_update_always {
                self.cv_output_target = event.cv;
                self.slide_active = event.slide;
                sink.send_cv(self.track_index, event.cv);
                sink.send_slide(self.track_index, event.slide);
            }
        }
    }

    pub fn update(&mut self, dt: f32, track: &NoteTrack, ctx: &PlayContext) {
        let sequence = track.sequence(self.pattern);
        let scale = sequence.scale(ctx.scale);
        let root_note = sequence.root_note(ctx.root_note);
        let octave = track.octave();
        let transpose = track.transpose();

        // Step recording keeps a dedicated cursor while active.
        let is_step_record = ctx.record_mode == RecordMode::StepRecord;
        if ctx.recording && is_step_record {
            if self.current_record_step < 0 {
                self.current_record_step = sequence.first_step();
            }
        } else {
            self.current_record_step = -1;
        }

        if !ctx.running && (!ctx.recording || is_step_record) && self.monitor_step >= 0 {
            // Pinned step monitoring has first priority.
            let step = sequence.step(self.monitor_step as usize);
            self.cv_output_target =
                eval_step_note(step, 0, scale, root_note, octave, transpose, false, &mut self.rng);
            self.activity = true;
            self.gate_output = true;
            self.monitor_override = true;
        } else if (!ctx.running || !is_step_record) && self.record_history.is_note_active() {
            // Newest held MIDI note sounds second.
            let midi_note = self.record_history.active_note().unwrap_or(60);
            let note = self.note_from_midi_note(track, ctx, midi_note)
                + eval_transposition(scale, octave, transpose);
            self.cv_output_target = scale.note_to_volts(note);
            self.activity = true;
            self.gate_output = true;
            self.monitor_override = true;
        } else if self.monitor_override {
            self.activity = false;
            self.gate_output = false;
            self.monitor_override = false;
        }

        if self.slide_active && track.slide_time() > 0 {
            let coefficient = (dt * (200 - 2 * track.slide_time()) as f32).min(1.0);
            self.cv_output += (self.cv_output_target - self.cv_output) * coefficient;
        } else {
            self.cv_output = self.cv_output_target;
        }
    }

    /// Feed an incoming MIDI message: monitoring history plus step-record
    /// capture.
    pub fn monitor_midi(
        &mut self,
        tick: u32,
        message: &MidiMessage,
        track: &mut NoteTrack,
        ctx: &PlayContext,
    ) {
        self.record_history.write(tick, message);

        if ctx.recording && ctx.record_mode == RecordMode::StepRecord && message.is_note_on() {
            let sequence = track.sequence(self.pattern);
            let first = sequence.first_step();
            let last = sequence.last_step();
            if self.current_record_step < 0 {
                self.current_record_step = first;
            }
            let note = self.note_from_midi_note(track, ctx, message.note().unwrap_or(60));
            let index = self.current_record_step as usize;
            let step = track.sequence_mut(self.pattern).step_mut(index);
            step.set_gate(true);
            step.set_note(note);

            self.current_record_step += 1;
            if self.current_record_step > last {
                self.current_record_step = first;
            }
        }
    }

    fn trigger_step(&mut self, tick: u32, divisor: u32, track: &NoteTrack, ctx: &PlayContext) {
        if self.sequence_state.step() < 0 {
            return;
        }
        let octave = track.octave();
        let transpose = track.transpose();
        let rotate = track.rotate();
        let fill_step = ctx.fill && self.rng.next_range(100) < ctx.fill_amount;
        let fill_mode = track.fill_mode();
        let use_fill_gates = fill_step && fill_mode == NoteFillMode::Gates;
        let use_fill_sequence = fill_step && fill_mode == NoteFillMode::NextPattern;
        let use_fill_condition = fill_step && fill_mode == NoteFillMode::Condition;

        let sequence = track.sequence(self.pattern);
        let fill_pattern = (self.pattern + 1).min(PATTERN_COUNT - 1);
        // Rotation uses the current sequence's range; the result indexes
        // the fill sequence directly.
        self.current_step = rotate_step(
            self.sequence_state.step(),
            sequence.first_step(),
            sequence.last_step(),
            rotate,
        );
        let eval_sequence = if use_fill_sequence { track.sequence(fill_pattern) } else { sequence };
        let step = *eval_sequence.step(self.current_step as usize);

        let gate_offset_ticks =
            (divisor as i32 * step.gate_offset()) / (gate_offset::MAX + 1);
        let base = tick.wrapping_add(gate_offset_ticks as u32);
        let swing_amount = track.swing();

        let mut step_gate =
            eval_step_gate(&step, track.gate_probability_bias(), &mut self.rng) || use_fill_gates;
        if step_gate {
            step_gate = eval_step_condition(
                step.condition(),
                self.sequence_state.iteration(),
                use_fill_condition,
                &mut self.prev_condition,
            );
        }

        if step_gate {
            let step_length = (divisor * eval_step_length(&step, track.length_bias(), &mut self.rng) as u32)
                / length::RANGE as u32;
            let retrigger = eval_step_retrigger(&step, track.retrigger_probability_bias(), &mut self.rng);
            if retrigger > 1 {
                // Retriggers subdivide the divisor; pulses past the step
                // length are dropped so length gates the tail.
                let retrigger_length = divisor / retrigger as u32;
                let mut offset = 0u32;
                let mut remaining = retrigger;
                while remaining > 0 && offset <= step_length {
                    self.gate_queue.push_replace(GateEvent {
                        tick: apply_swing(base.wrapping_add(offset), swing_amount),
                        gate: true,
                    });
                    self.gate_queue.push_replace(GateEvent {
                        tick: apply_swing(base.wrapping_add(offset + retrigger_length / 2), swing_amount),
                        gate: false,
                    });
                    offset += retrigger_length;
                    remaining -= 1;
                }
            } else {
                self.gate_queue.push_replace(GateEvent {
                    tick: apply_swing(base, swing_amount),
                    gate: true,
                });
                self.gate_queue.push_replace(GateEvent {
                    tick: apply_swing(base.wrapping_add(step_length), swing_amount),
                    gate: false,
                });
            }
        }

        if step_gate || track.cv_update_mode() == CvUpdateMode::Always {
            let scale = eval_sequence.scale(ctx.scale);
            let root_note = eval_sequence.root_note(ctx.root_note);
            self.cv_queue.push_replace(CvEvent {
                tick: apply_swing(base, swing_amount),
                cv: eval_step_note(
                    &step,
                    track.note_probability_bias(),
                    scale,
                    root_note,
                    octave,
                    transpose,
                    true,
                    &mut self.rng,
                ),
                slide: step.slide(),
            });
        }
    }

    fn record_step(&mut self, tick: u32, divisor: u32, track: &mut NoteTrack, ctx: &PlayContext) {
        if !ctx.recording
            || ctx.record_mode == RecordMode::StepRecord
            || self.sequence_state.prev_step() < 0
        {
            return;
        }

        let prev_step = self.sequence_state.prev_step() as usize;
        let margin = i64::from(divisor / 2);
        let mut step_written = false;

        // Offsets relative to the start of the step that just finished;
        // wrap-safe inside the one-measure horizon.
        let step_start = tick.wrapping_sub(divisor);
        let relative = |t: u32| i64::from(t.wrapping_sub(step_start) as i32);
        let step_end = i64::from(divisor);

        for i in 0..self.record_history.len() {
            let event = *self.record_history.event(i);
            if event.kind != RecordKind::NoteOn {
                continue;
            }

            let note_start = relative(event.tick);
            let note_end = if i + 1 < self.record_history.len() {
                relative(self.record_history.event(i + 1).tick)
            } else {
                relative(tick)
            };

            let length_ticks = if note_start >= -margin && note_start < margin {
                if note_end >= step_end {
                    // Note held through the step.
                    Some(step_end)
                } else {
                    // Note released within the step.
                    Some(note_end - note_start)
                }
            } else if note_start < 0 && note_end > 0 {
                // Note started during the previous step.
                Some(note_end.min(step_end))
            } else {
                None
            };

            if let Some(length_ticks) = length_ticks {
                self.write_step(track, ctx, prev_step, event.note, length_ticks.max(0) as u32, divisor);
                step_written = true;
            }
        }

        if ctx.selected && !step_written && ctx.record_mode == RecordMode::Overwrite {
            track.sequence_mut(self.pattern).step_mut(prev_step).clear();
        }
    }

    fn write_step(
        &mut self,
        track: &mut NoteTrack,
        ctx: &PlayContext,
        index: usize,
        midi_note: u8,
        length_ticks: u32,
        divisor: u32,
    ) {
        let note = self.note_from_midi_note(track, ctx, midi_note);
        let length = (length_ticks * length::RANGE as u32 / divisor) as i32;

        let step = track.sequence_mut(self.pattern).step_mut(index);
        step.set_gate(true);
        step.set_gate_probability(probability::MAX);
        step.set_retrigger(0);
        step.set_retrigger_probability(probability::MAX);
        step.set_length(length);
        step.set_length_variation_range(0);
        step.set_length_variation_probability(probability::MAX);
        step.set_note(note);
        step.set_note_variation_range(0);
        step.set_note_variation_probability(probability::MAX);
        step.set_condition(Condition::Off);
    }

    fn note_from_midi_note(&self, track: &NoteTrack, ctx: &PlayContext, midi_note: u8) -> i32 {
        let sequence = track.sequence(self.pattern);
        let scale = sequence.scale(ctx.scale);
        let root_note = sequence.root_note(ctx.root_note);

        if scale.is_chromatic() {
            scale.note_from_volts((i32::from(midi_note) - 60 - root_note) as f32 / 12.0)
        } else {
            scale.note_from_volts((i32::from(midi_note) - 60) as f32 / 12.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::NullMidiOutput;

    fn ctx() -> PlayContext {
        PlayContext {
            running: true,
            recording: false,
            record_mode: RecordMode::Overwrite,
            scale: Scale::Chromatic,
            root_note: 0,
            mute: false,
            fill: false,
            fill_amount: 100,
            selected: true,
            cv_input: 0.0,
            cv_input_active: false,
        }
    }

    fn all_gates_track() -> NoteTrack {
        let mut track = NoteTrack::new();
        let sequence = track.sequence_mut(0);
        sequence.set_divisor(6); // 24 master ticks per step
        sequence.set_last_step(15);
        for i in 0..16 {
            let step = sequence.step_mut(i);
            step.set_gate(true);
            step.set_note(i as i32);
        }
        track
    }

    fn step(gate: bool, condition: Condition) -> NoteStep {
        let mut step = NoteStep::default();
        step.clear();
        step.set_gate(gate);
        step.set_condition(condition);
        step
    }

    // === step evaluation ===

    #[test]
    fn gate_probability_max_always_passes() {
        let mut rng = SeqRng::new(1);
        let step = step(true, Condition::Off);
        for _ in 0..100 {
            assert!(eval_step_gate(&step, 0, &mut rng));
        }
    }

    #[test]
    fn gate_without_flag_never_passes() {
        let mut rng = SeqRng::new(1);
        let step = step(false, Condition::Off);
        for _ in 0..100 {
            assert!(!eval_step_gate(&step, 0, &mut rng));
        }
    }

    #[test]
    fn gate_probability_bias_can_silence() {
        let mut rng = SeqRng::new(1);
        let step = step(true, Condition::Off);
        // Max probability (7) + bias (-8) = -1: never fires.
        for _ in 0..100 {
            assert!(!eval_step_gate(&step, -8, &mut rng));
        }
    }

    #[test]
    fn condition_off_does_not_touch_prev() {
        let mut prev = true;
        assert!(eval_step_condition(Condition::Off, 3, false, &mut prev));
        assert!(prev);
        prev = false;
        assert!(eval_step_condition(Condition::Off, 3, true, &mut prev));
        assert!(!prev);
    }

    #[test]
    fn condition_pre_reads_only() {
        let mut prev = true;
        assert!(eval_step_condition(Condition::Pre, 0, false, &mut prev));
        assert!(!eval_step_condition(Condition::NotPre, 0, false, &mut prev));
        assert!(prev);
    }

    #[test]
    fn condition_fill_writes_prev() {
        let mut prev = false;
        assert!(eval_step_condition(Condition::Fill, 0, true, &mut prev));
        assert!(prev);
        assert!(!eval_step_condition(Condition::Fill, 0, false, &mut prev));
        assert!(!prev);
        assert!(eval_step_condition(Condition::NotFill, 0, false, &mut prev));
        assert!(prev);
    }

    #[test]
    fn condition_first() {
        let mut prev = false;
        assert!(eval_step_condition(Condition::First, 0, false, &mut prev));
        assert!(!eval_step_condition(Condition::First, 1, false, &mut prev));
        assert!(eval_step_condition(Condition::NotFirst, 1, false, &mut prev));
    }

    #[test]
    fn condition_loop_fires_on_offset() {
        let mut prev = false;
        let condition = Condition::Loop { base: 4, offset: 0 };
        let fired: alloc::vec::Vec<u32> = (0..32)
            .filter(|&i| eval_step_condition(condition, i, false, &mut prev))
            .collect();
        assert_eq!(fired, [0, 4, 8, 12, 16, 20, 24, 28]);
    }

    #[test]
    fn length_variation_respects_sign() {
        let mut rng = SeqRng::new(1);
        let mut s = NoteStep::default();
        s.clear();
        s.set_length(32);
        s.set_length_variation_range(-16);
        s.set_length_variation_probability(probability::MAX);
        for _ in 0..100 {
            let length = eval_step_length(&s, 0, &mut rng);
            assert!(length <= 32 && length >= 16, "length {}", length);
        }
    }

    #[test]
    fn length_without_variation_applies_bias() {
        let mut rng = SeqRng::new(1);
        let mut s = NoteStep::default();
        s.clear();
        s.set_length(32);
        s.set_length_variation_probability(0);
        // Probability 0 passes on roll 0 only, so run the biased value
        // through a step with no variation range instead.
        s.set_length_variation_range(0);
        assert_eq!(eval_step_length(&s, 10, &mut rng), 42);
        assert_eq!(eval_step_length(&s, 100, &mut rng), length::RANGE);
    }

    #[test]
    fn note_eval_applies_octave_and_transpose() {
        let mut rng = SeqRng::new(1);
        let mut s = NoteStep::default();
        s.clear();
        s.set_note(0);
        s.set_note_variation_probability(0);
        s.set_note_variation_range(0);
        let volts = eval_step_note(&s, 0, Scale::Chromatic, 0, 1, 2, true, &mut rng);
        // One octave + two semitones.
        assert!((volts - (1.0 + 2.0 / 12.0)).abs() < 1e-6);
    }

    #[test]
    fn chromatic_root_note_shifts_pitch() {
        let mut rng = SeqRng::new(1);
        let mut s = NoteStep::default();
        s.clear();
        let shifted = eval_step_note(&s, 0, Scale::Chromatic, 2, 0, 0, false, &mut rng);
        assert!((shifted - 2.0 / 12.0).abs() < 1e-6);
        let major = eval_step_note(&s, 0, Scale::Major, 2, 0, 0, false, &mut rng);
        assert_eq!(major, 0.0);
    }

    // === tick-level behavior ===

    #[test]
    fn aligned_steps_produce_alternating_edges() {
        let mut engine = NoteTrackEngine::new(0, 7);
        let mut track = all_gates_track();
        let ctx = ctx();
        let mut sink = NullMidiOutput;

        let mut prev_activity = false;
        let mut edges = 0;
        for tick in 0..16 * 24 {
            engine.tick(tick, &mut track, &ctx, None, &mut sink);
            if engine.activity() != prev_activity {
                edges += 1;
                prev_activity = engine.activity();
            }
        }
        // 16 steps, each with a rise and a fall; edges alternate by
        // construction of the transition counter.
        assert_eq!(edges, 32);
        assert!(!prev_activity);
    }

    #[test]
    fn cursor_stays_in_range() {
        let mut engine = NoteTrackEngine::new(0, 7);
        let mut track = all_gates_track();
        track.sequence_mut(0).set_first_step(4);
        track.sequence_mut(0).set_last_step(9);
        let ctx = ctx();
        let mut sink = NullMidiOutput;
        for tick in 0..24 * 64 {
            engine.tick(tick, &mut track, &ctx, None, &mut sink);
            if engine.current_step() >= 0 {
                assert!(engine.current_step() >= 4 && engine.current_step() <= 9);
            }
        }
    }

    #[test]
    fn mute_suppresses_gate_output_not_activity() {
        let mut engine = NoteTrackEngine::new(0, 7);
        let mut track = all_gates_track();
        let mut ctx = ctx();
        ctx.mute = true;
        let mut sink = NullMidiOutput;
        engine.tick(0, &mut track, &ctx, None, &mut sink);
        assert!(engine.activity());
        assert!(!engine.gate_output());
    }

    #[test]
    fn slide_converges_monotonically() {
        let mut engine = NoteTrackEngine::new(0, 7);
        let mut track = all_gates_track();
        track.set_slide_time(50);
        for i in 0..16 {
            track.sequence_mut(0).step_mut(i).set_slide(true);
        }
        let ctx = ctx();
        let mut sink = NullMidiOutput;
        engine.tick(0, &mut track, &ctx, None, &mut sink);
        engine.cv_output = 5.0; // force a distance to the target
        let mut distance = (engine.cv_output() - engine.cv_output_target()).abs();
        for _ in 0..100 {
            engine.update(0.001, &track, &ctx);
            let next = (engine.cv_output() - engine.cv_output_target()).abs();
            assert!(next <= distance);
            distance = next;
        }
        assert!(distance < 1.0);
    }

    #[test]
    fn no_slide_snaps_to_target() {
        let mut engine = NoteTrackEngine::new(0, 7);
        let mut track = all_gates_track();
        let ctx = ctx();
        let mut sink = NullMidiOutput;
        engine.tick(0, &mut track, &ctx, None, &mut sink);
        engine.cv_output = 5.0;
        engine.update(0.001, &track, &ctx);
        assert_eq!(engine.cv_output(), engine.cv_output_target());
    }

    #[test]
    fn monitor_step_overrides_when_stopped() {
        let mut engine = NoteTrackEngine::new(0, 7);
        let mut track = all_gates_track();
        track.sequence_mut(0).step_mut(3).set_note(12);
        let mut ctx = ctx();
        ctx.running = false;
        engine.set_monitor_step(3, &track, &ctx);
        engine.update(0.001, &track, &ctx);
        assert!(engine.gate_output());
        assert_eq!(engine.cv_output_target(), 1.0);
        // Clearing the pin drops the override.
        engine.set_monitor_step(-1, &track, &ctx);
        engine.update(0.001, &track, &ctx);
        assert!(!engine.gate_output());
    }

    #[test]
    fn held_midi_note_monitors() {
        let mut engine = NoteTrackEngine::new(0, 7);
        let mut track = all_gates_track();
        let mut ctx = ctx();
        ctx.running = false;
        let message = MidiMessage::NoteOn { channel: 0, note: 72, velocity: 100 };
        engine.monitor_midi(0, &message, &mut track, &ctx);
        engine.update(0.001, &track, &ctx);
        assert!(engine.gate_output());
        assert_eq!(engine.cv_output_target(), 1.0);
    }

    #[test]
    fn overwrite_recording_writes_prev_step() {
        let mut engine = NoteTrackEngine::new(0, 7);
        let mut track = all_gates_track();
        let mut ctx = ctx();
        ctx.recording = true;
        let mut sink = NullMidiOutput;

        // Step 0 plays at tick 0; play a note during it.
        engine.tick(0, &mut track, &ctx, None, &mut sink);
        let on = MidiMessage::NoteOn { channel: 0, note: 72, velocity: 100 };
        engine.monitor_midi(2, &on, &mut track, &ctx);
        let off = MidiMessage::NoteOff { channel: 0, note: 72 };
        engine.monitor_midi(14, &off, &mut track, &ctx);
        for tick in 1..=24 {
            engine.tick(tick, &mut track, &ctx, None, &mut sink);
        }

        let recorded = track.sequence(0).step(0);
        assert!(recorded.gate());
        assert_eq!(recorded.note(), 12); // one octave above middle C
        assert_eq!(recorded.gate_probability(), probability::MAX);
        assert_eq!(recorded.length(), (12 * length::RANGE / 24) as i32);
    }

    #[test]
    fn overwrite_recording_clears_unmatched_selected_step() {
        let mut engine = NoteTrackEngine::new(0, 7);
        let mut track = all_gates_track();
        let mut ctx = ctx();
        ctx.recording = true;
        let mut sink = NullMidiOutput;
        for tick in 0..=24 {
            engine.tick(tick, &mut track, &ctx, None, &mut sink);
        }
        assert!(!track.sequence(0).step(0).gate());
    }

    #[test]
    fn punch_recording_never_clears() {
        let mut engine = NoteTrackEngine::new(0, 7);
        let mut track = all_gates_track();
        let mut ctx = ctx();
        ctx.recording = true;
        ctx.record_mode = RecordMode::Punch;
        let mut sink = NullMidiOutput;
        for tick in 0..=24 {
            engine.tick(tick, &mut track, &ctx, None, &mut sink);
        }
        assert!(track.sequence(0).step(0).gate());
    }

    #[test]
    fn step_record_freezes_playback_cursor() {
        let mut engine = NoteTrackEngine::new(0, 7);
        let mut track = all_gates_track();
        let mut ctx = ctx();
        ctx.recording = true;
        ctx.record_mode = RecordMode::StepRecord;
        let mut sink = NullMidiOutput;
        for tick in 0..96 {
            engine.tick(tick, &mut track, &ctx, None, &mut sink);
        }
        assert_eq!(engine.current_step(), -1);
    }

    #[test]
    fn step_record_cursor_advances_and_wraps() {
        let mut engine = NoteTrackEngine::new(0, 7);
        let mut track = all_gates_track();
        track.sequence_mut(0).set_first_step(0);
        track.sequence_mut(0).set_last_step(1);
        let mut ctx = ctx();
        ctx.running = false;
        ctx.recording = true;
        ctx.record_mode = RecordMode::StepRecord;
        engine.update(0.001, &track, &ctx);

        for (i, midi_note) in [60u8, 62, 64].iter().enumerate() {
            let message = MidiMessage::NoteOn { channel: 0, note: *midi_note, velocity: 100 };
            engine.monitor_midi(i as u32, &message, &mut track, &ctx);
        }
        // Third note wrapped back onto step 0.
        assert_eq!(track.sequence(0).step(0).note(), 4);
        assert_eq!(track.sequence(0).step(1).note(), 2);
    }
}
