//! Curve track playback.
//!
//! Emits a continuously interpolated CV by sampling a shape function per
//! step, plus up to four sub-step gate pulses from the step's gate
//! pattern. Supports CV-to-curve recording.

use gs_model::types::probability;
use gs_model::{
    measure_divisor, CurveFillMode, CurveStep, CurveTrack, PlayMode, SHAPE_VARIATION_RANGE,
    PATTERN_COUNT, PPQN, SEQUENCE_PPQN,
};

use crate::groove::apply_swing;
use crate::link::LinkData;
use crate::output::MidiOutputSink;
use crate::recorder::CurveRecorder;
use crate::rng::SeqRng;
use crate::sequence_state::{rotate_step, SequenceState};
use crate::sorted_queue::{GateEvent, SortedQueue, QUEUE_SIZE};
use crate::track_engine::PlayContext;

/// Evaluate a step's shape at `fraction`, mapped through its min/max
/// bounds.
fn eval_step_shape(step: &CurveStep, variation: bool, invert: bool, fraction: f32) -> f32 {
    let shape = if variation { step.shape_variation() } else { step.shape() };
    let mut value = shape.eval(fraction);
    if invert {
        value = 1.0 - value;
    }
    step.min() + value * (step.max() - step.min())
}

/// Roll the per-step shape variation. A stored probability of
/// `SHAPE_VARIATION_RANGE` always substitutes.
fn eval_shape_variation(step: &CurveStep, probability_bias: i32, rng: &mut SeqRng) -> bool {
    let probability =
        (step.shape_variation_probability() + probability_bias).clamp(0, SHAPE_VARIATION_RANGE);
    (rng.next_range(SHAPE_VARIATION_RANGE as u32) as i32) < probability
}

/// Roll one sub-step gate pulse.
fn eval_gate(step: &CurveStep, probability_bias: i32, rng: &mut SeqRng) -> bool {
    let probability = probability::clamp_biased(step.gate_probability() + probability_bias);
    rng.next_range(probability::RANGE as u32) as i32 <= probability
}

/// Runtime state of one curve track.
pub struct CurveTrackEngine {
    track_index: usize,
    pattern: usize,
    rng: SeqRng,
    sequence_state: SequenceState,
    link_data: LinkData,
    free_relative_tick: u32,
    current_step: i32,
    current_step_fraction: f32,
    shape_variation: bool,
    fill_mode: CurveFillMode,
    recorder: CurveRecorder,
    record_value: f32,
    gate_queue: SortedQueue<GateEvent, QUEUE_SIZE>,
    activity: bool,
    gate_output: bool,
    cv_output: f32,
    cv_output_target: f32,
}

impl CurveTrackEngine {
    pub fn new(track_index: usize, seed: u64) -> Self {
        Self {
            track_index,
            pattern: 0,
            rng: SeqRng::new(seed),
            sequence_state: SequenceState::new(),
            link_data: LinkData::default(),
            free_relative_tick: 0,
            current_step: -1,
            current_step_fraction: 0.0,
            shape_variation: false,
            fill_mode: CurveFillMode::None,
            recorder: CurveRecorder::new(),
            record_value: 0.0,
            gate_queue: SortedQueue::new(),
            activity: false,
            gate_output: false,
            cv_output: 0.0,
            cv_output_target: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.free_relative_tick = 0;
        self.sequence_state.reset();
        self.current_step = -1;
        self.current_step_fraction = 0.0;
        self.shape_variation = false;
        self.fill_mode = CurveFillMode::None;
        self.activity = false;
        self.gate_output = false;
        self.recorder.reset();
        self.gate_queue.clear();
    }

    pub fn restart(&mut self) {
        self.free_relative_tick = 0;
        self.sequence_state.reset();
        self.current_step = -1;
        self.current_step_fraction = 0.0;
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

    pub fn current_step_fraction(&self) -> f32 {
        self.current_step_fraction
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

    pub fn sequence_progress(&self, track: &CurveTrack) -> f32 {
        if self.current_step < 0 {
            return 0.0;
        }
        let sequence = track.sequence(self.pattern);
        let span = (sequence.last_step() - sequence.first_step()).max(1);
        (self.current_step - sequence.first_step()) as f32 / span as f32
    }

    pub fn tick(
        &mut self,
        tick: u32,
        track: &mut CurveTrack,
        ctx: &PlayContext,
        link: Option<&LinkData>,
        sink: &mut dyn MidiOutputSink,
    ) {
        if let Some(link) = link {
            self.link_data = *link;
            self.sequence_state = link.sequence_state;

            self.update_recording(link.relative_tick, link.divisor, track, ctx);

            if link.relative_tick % link.divisor == 0 {
                self.trigger_step(tick, link.divisor, track, ctx);
            }

            self.update_output(link.relative_tick, link.divisor, track, sink);
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

            if play_mode == PlayMode::Free {
                relative_tick = self.free_relative_tick;
                self.free_relative_tick += 1;
                if self.free_relative_tick >= divisor {
                    self.free_relative_tick = 0;
                }
            }

            self.update_recording(relative_tick, divisor, track, ctx);

            if relative_tick % divisor == 0 {
                match play_mode {
                    PlayMode::Aligned => {
                        self.sequence_state.advance_aligned(
                            relative_tick / divisor,
                            run_mode,
                            first,
                            last,
                            &mut self.rng,
                        );
                    }
                    PlayMode::Free => {
                        self.sequence_state.advance_free(run_mode, first, last, &mut self.rng);
                    }
                }
                self.trigger_step(tick, divisor, track, ctx);
            }

            self.update_output(relative_tick, divisor, track, sink);

            self.link_data = LinkData {
                divisor,
                relative_tick,
                sequence_state: self.sequence_state,
            };
        }

        while let Some(event) = self.gate_queue.pop_due(tick) {
            self.activity = event.gate;
            self.gate_output = (!ctx.mute || ctx.fill) && self.activity;
            sink.send_gate(self.track_index, self.gate_output);
        }
    }

    pub fn update(&mut self, dt: f32, track: &CurveTrack, ctx: &PlayContext) {
        // While recording, the output follows the input directly.
        if self.is_recording(ctx) {
            let range = track.sequence(self.pattern).range();
            self.record_value = range.normalize(ctx.cv_input);
            self.cv_output_target = range.denormalize(self.record_value);
            self.cv_output = self.cv_output_target;
        }

        if !ctx.mute {
            if track.slide_time() > 0 {
                let factor = 1.0 - 0.01 * track.slide_time() as f32;
                let factor = 500.0 * factor * factor;
                self.cv_output += (self.cv_output_target - self.cv_output) * (dt * factor).min(1.0);
            } else {
                self.cv_output = self.cv_output_target;
            }
        }
    }

    fn trigger_step(&mut self, tick: u32, divisor: u32, track: &CurveTrack, ctx: &PlayContext) {
        if self.sequence_state.step() < 0 {
            return;
        }
        let rotate = track.rotate();
        let shape_probability_bias = track.shape_probability_bias();
        let gate_probability_bias = track.gate_probability_bias();
        let swing_amount = track.swing();

        let sequence = track.sequence(self.pattern);
        self.current_step = rotate_step(
            self.sequence_state.step(),
            sequence.first_step(),
            sequence.last_step(),
            rotate,
        );
        let step = *sequence.step(self.current_step as usize);

        self.shape_variation = eval_shape_variation(&step, shape_probability_bias, &mut self.rng);

        let fill_step = ctx.fill && self.rng.next_range(100) < ctx.fill_amount;
        self.fill_mode = if fill_step { track.fill_mode() } else { CurveFillMode::None };

        // Each set bit of the gate pattern is one sub-step pulse.
        let gate = step.gate();
        for i in 0..4u32 {
            if gate & (1 << i) != 0 && eval_gate(&step, gate_probability_bias, &mut self.rng) {
                let gate_start = (divisor * i) / 4;
                let gate_length = divisor / 8;
                self.gate_queue.push_replace(GateEvent {
                    tick: apply_swing(tick.wrapping_add(gate_start), swing_amount),
                    gate: true,
                });
                self.gate_queue.push_replace(GateEvent {
                    tick: apply_swing(tick.wrapping_add(gate_start + gate_length), swing_amount),
                    gate: false,
                });
            }
        }
    }

    fn update_output(
        &mut self,
        relative_tick: u32,
        divisor: u32,
        track: &CurveTrack,
        sink: &mut dyn MidiOutputSink,
    ) {
        if self.sequence_state.step() < 0 || self.current_step < 0 {
            return;
        }

        let fill_variation = self.fill_mode == CurveFillMode::Variation;
        let fill_next_pattern = self.fill_mode == CurveFillMode::NextPattern;
        let fill_invert = self.fill_mode == CurveFillMode::Invert;

        let sequence = track.sequence(self.pattern);
        let range = sequence.range();

        let fill_pattern = (self.pattern + 1).min(PATTERN_COUNT - 1);
        let eval_sequence = if fill_next_pattern { track.sequence(fill_pattern) } else { sequence };
        let step = eval_sequence.step(self.current_step as usize);

        self.current_step_fraction = (relative_tick % divisor) as f32 / divisor as f32;

        let value = eval_step_shape(
            step,
            self.shape_variation || fill_variation,
            fill_invert,
            self.current_step_fraction,
        );
        self.cv_output_target = range.denormalize(value);

        // The mirror always sees the target; mute only holds the smoothed
        // output in update().
        sink.send_cv(self.track_index, self.cv_output_target);
    }

    fn is_recording(&self, ctx: &PlayContext) -> bool {
        ctx.recording && ctx.cv_input_active && ctx.selected
    }

    fn update_recording(
        &mut self,
        relative_tick: u32,
        divisor: u32,
        track: &mut CurveTrack,
        ctx: &PlayContext,
    ) {
        if !self.is_recording(ctx) {
            self.recorder.reset();
            return;
        }

        let range = track.sequence(self.pattern).range();
        self.record_value = range.normalize(ctx.cv_input);

        if self.recorder.write(relative_tick, divisor, self.record_value)
            && self.sequence_state.step() >= 0
        {
            let rotate = track.rotate();
            let sequence = track.sequence(self.pattern);
            let index = rotate_step(
                self.sequence_state.step(),
                sequence.first_step(),
                sequence.last_step(),
                rotate,
            );
            let fit = self.recorder.match_curve();
            let step = track.sequence_mut(self.pattern).step_mut(index as usize);
            step.set_shape(fit.shape);
            step.set_min_normalized(fit.min);
            step.set_max_normalized(fit.max);
        }
    }
}
