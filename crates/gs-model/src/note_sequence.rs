//! Note sequence and step data.

use alloc::vec::Vec;

use crate::scale::Scale;
use crate::types::{
    gate_offset, length, note, probability, retrigger, Condition, RunMode, STEP_COUNT,
};

/// One step of a note sequence. All setters clamp into the field's range.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NoteStep {
    gate: bool,
    gate_probability: i8,
    gate_offset: i8,
    slide: bool,
    retrigger: i8,
    retrigger_probability: i8,
    length: i8,
    length_variation_range: i8,
    length_variation_probability: i8,
    note: i8,
    note_variation_range: i8,
    note_variation_probability: i8,
    condition: Condition,
}

impl NoteStep {
    /// Reset to the default (silent) step.
    pub fn clear(&mut self) {
        *self = NoteStep::default();
        self.gate_probability = probability::MAX as i8;
        self.retrigger_probability = probability::MAX as i8;
        self.length = (length::RANGE / 2) as i8;
        self.length_variation_probability = probability::MAX as i8;
        self.note_variation_probability = probability::MAX as i8;
    }

    pub fn gate(&self) -> bool {
        self.gate
    }

    pub fn set_gate(&mut self, gate: bool) {
        self.gate = gate;
    }

    pub fn toggle_gate(&mut self) {
        self.gate = !self.gate;
    }

    pub fn gate_probability(&self) -> i32 {
        i32::from(self.gate_probability)
    }

    pub fn set_gate_probability(&mut self, value: i32) {
        self.gate_probability = value.clamp(0, probability::MAX) as i8;
    }

    pub fn gate_offset(&self) -> i32 {
        i32::from(self.gate_offset)
    }

    pub fn set_gate_offset(&mut self, value: i32) {
        self.gate_offset = gate_offset::clamp(value) as i8;
    }

    pub fn slide(&self) -> bool {
        self.slide
    }

    pub fn set_slide(&mut self, slide: bool) {
        self.slide = slide;
    }

    pub fn retrigger(&self) -> i32 {
        i32::from(self.retrigger)
    }

    pub fn set_retrigger(&mut self, value: i32) {
        self.retrigger = retrigger::clamp(value) as i8;
    }

    pub fn retrigger_probability(&self) -> i32 {
        i32::from(self.retrigger_probability)
    }

    pub fn set_retrigger_probability(&mut self, value: i32) {
        self.retrigger_probability = value.clamp(0, probability::MAX) as i8;
    }

    pub fn length(&self) -> i32 {
        i32::from(self.length)
    }

    pub fn set_length(&mut self, value: i32) {
        self.length = length::clamp(value) as i8;
    }

    pub fn length_variation_range(&self) -> i32 {
        i32::from(self.length_variation_range)
    }

    pub fn set_length_variation_range(&mut self, value: i32) {
        self.length_variation_range = value.clamp(-length::RANGE, length::RANGE) as i8;
    }

    pub fn length_variation_probability(&self) -> i32 {
        i32::from(self.length_variation_probability)
    }

    pub fn set_length_variation_probability(&mut self, value: i32) {
        self.length_variation_probability = value.clamp(0, probability::MAX) as i8;
    }

    pub fn note(&self) -> i32 {
        i32::from(self.note)
    }

    pub fn set_note(&mut self, value: i32) {
        self.note = note::clamp(value) as i8;
    }

    pub fn note_variation_range(&self) -> i32 {
        i32::from(self.note_variation_range)
    }

    pub fn set_note_variation_range(&mut self, value: i32) {
        self.note_variation_range = value.clamp(note::MIN, note::MAX) as i8;
    }

    pub fn note_variation_probability(&self) -> i32 {
        i32::from(self.note_variation_probability)
    }

    pub fn set_note_variation_probability(&mut self, value: i32) {
        self.note_variation_probability = value.clamp(0, probability::MAX) as i8;
    }

    pub fn condition(&self) -> Condition {
        self.condition
    }

    pub fn set_condition(&mut self, condition: Condition) {
        self.condition = condition;
    }
}

/// A note sequence: a fixed-length step array plus playback parameters.
#[derive(Clone, Debug)]
pub struct NoteSequence {
    steps: Vec<NoteStep>,
    first_step: u8,
    last_step: u8,
    /// Ticks per step in sequence-PPQN units.
    divisor: u8,
    run_mode: RunMode,
    /// Hard reset period in measures; 0 = no reset.
    reset_measure: u8,
    scale: Option<Scale>,
    root_note: Option<i8>,
}

impl Default for NoteSequence {
    fn default() -> Self {
        let mut sequence = Self {
            steps: alloc::vec![NoteStep::default(); STEP_COUNT],
            first_step: 0,
            last_step: 15,
            divisor: 12,
            run_mode: RunMode::Forward,
            reset_measure: 0,
            scale: None,
            root_note: None,
        };
        for step in &mut sequence.steps {
            step.clear();
        }
        sequence
    }
}

impl NoteSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self, index: usize) -> &NoteStep {
        debug_assert!(index < STEP_COUNT);
        &self.steps[index]
    }

    pub fn step_mut(&mut self, index: usize) -> &mut NoteStep {
        debug_assert!(index < STEP_COUNT);
        &mut self.steps[index]
    }

    pub fn steps(&self) -> &[NoteStep] {
        &self.steps
    }

    pub fn first_step(&self) -> i32 {
        i32::from(self.first_step)
    }

    pub fn set_first_step(&mut self, value: i32) {
        self.first_step = value.clamp(0, self.last_step() ) as u8;
    }

    pub fn last_step(&self) -> i32 {
        i32::from(self.last_step)
    }

    pub fn set_last_step(&mut self, value: i32) {
        self.last_step = value.clamp(self.first_step(), STEP_COUNT as i32 - 1) as u8;
    }

    /// Ticks per step in sequence-PPQN units.
    pub fn divisor(&self) -> u32 {
        u32::from(self.divisor)
    }

    pub fn set_divisor(&mut self, value: i32) {
        self.divisor = value.clamp(1, 192) as u8;
    }

    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    pub fn set_run_mode(&mut self, run_mode: RunMode) {
        self.run_mode = run_mode;
    }

    pub fn reset_measure(&self) -> u32 {
        u32::from(self.reset_measure)
    }

    pub fn set_reset_measure(&mut self, value: i32) {
        self.reset_measure = value.clamp(0, 128) as u8;
    }

    /// Per-sequence scale override, falling back to the project scale.
    pub fn scale(&self, project_scale: Scale) -> Scale {
        self.scale.unwrap_or(project_scale)
    }

    pub fn set_scale(&mut self, scale: Option<Scale>) {
        self.scale = scale;
    }

    pub fn scale_override(&self) -> Option<Scale> {
        self.scale
    }

    /// Per-sequence root note override, falling back to the project root.
    pub fn root_note(&self, project_root: i32) -> i32 {
        self.root_note.map_or(project_root, i32::from)
    }

    pub fn set_root_note(&mut self, root: Option<i32>) {
        self.root_note = root.map(|r| r.clamp(0, 11) as i8);
    }

    pub fn root_note_override(&self) -> Option<i8> {
        self.root_note
    }

    pub fn clear(&mut self) {
        let divisor = self.divisor;
        *self = Self::default();
        self.divisor = divisor;
    }
}
