//! Live recording support.
//!
//! `RecordHistory` is a small ring of timestamped note events shared by
//! the monitoring and MIDI-to-step recording paths. `CurveRecorder`
//! accumulates sampled CV input across one step window and fits the best
//! matching curve shape on window close.

use arrayvec::ArrayVec;
use gs_model::{MidiMessage, Shape, SHAPES};

/// Capacity of the record-history ring.
pub const RECORD_HISTORY_SIZE: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    NoteOn,
    NoteOff,
}

/// One timestamped note event.
#[derive(Clone, Copy, Debug)]
pub struct RecordEvent {
    pub tick: u32,
    pub kind: RecordKind,
    pub note: u8,
}

/// Ring of recent note events plus the set of currently held notes.
#[derive(Clone, Debug, Default)]
pub struct RecordHistory {
    events: ArrayVec<RecordEvent, RECORD_HISTORY_SIZE>,
    active: ArrayVec<u8, 8>,
}

impl RecordHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.active.clear();
    }

    /// Record a note message; other message kinds are ignored.
    pub fn write(&mut self, tick: u32, message: &MidiMessage) {
        let (kind, note) = if message.is_note_on() {
            (RecordKind::NoteOn, message.note().unwrap_or(0))
        } else if message.is_note_off() {
            (RecordKind::NoteOff, message.note().unwrap_or(0))
        } else {
            return;
        };

        if self.events.is_full() {
            self.events.remove(0);
        }
        self.events.push(RecordEvent { tick, kind, note });

        match kind {
            RecordKind::NoteOn => {
                self.active.retain(|&mut n| n != note);
                if self.active.is_full() {
                    self.active.remove(0);
                }
                self.active.push(note);
            }
            RecordKind::NoteOff => {
                self.active.retain(|&mut n| n != note);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn event(&self, index: usize) -> &RecordEvent {
        &self.events[index]
    }

    /// Is any note currently held?
    pub fn is_note_active(&self) -> bool {
        !self.active.is_empty()
    }

    /// The most recently pressed note still held.
    pub fn active_note(&self) -> Option<u8> {
        self.active.last().copied()
    }
}

/// Number of sample buckets per step window.
pub const CURVE_RECORD_BUCKETS: usize = 16;

/// Result of fitting a recorded step window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurveMatch {
    pub shape: Shape,
    /// Normalized lower bound of the window.
    pub min: f32,
    /// Normalized upper bound of the window.
    pub max: f32,
}

/// Streaming analyzer for CV-to-curve recording.
#[derive(Clone, Debug)]
pub struct CurveRecorder {
    buckets: [f32; CURVE_RECORD_BUCKETS],
    filled: [bool; CURVE_RECORD_BUCKETS],
}

impl Default for CurveRecorder {
    fn default() -> Self {
        Self {
            buckets: [0.0; CURVE_RECORD_BUCKETS],
            filled: [false; CURVE_RECORD_BUCKETS],
        }
    }
}

impl CurveRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.filled = [false; CURVE_RECORD_BUCKETS];
    }

    /// Accumulate one normalized sample. Returns true when the step window
    /// closes and `match_curve` holds a complete fit.
    pub fn write(&mut self, relative_tick: u32, divisor: u32, value: f32) -> bool {
        debug_assert!(divisor > 0);
        let phase = relative_tick % divisor;
        if phase == 0 {
            self.reset();
        }
        let bucket = (phase as usize * CURVE_RECORD_BUCKETS) / divisor as usize;
        self.buckets[bucket.min(CURVE_RECORD_BUCKETS - 1)] = value;
        self.filled[bucket.min(CURVE_RECORD_BUCKETS - 1)] = true;
        phase == divisor - 1
    }

    /// Fit the recorded window: normalized bounds plus the shape with the
    /// smallest squared error against the samples.
    pub fn match_curve(&self) -> CurveMatch {
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for (bucket, &filled) in self.buckets.iter().zip(&self.filled) {
            if filled {
                min = min.min(*bucket);
                max = max.max(*bucket);
            }
        }
        if min > max {
            return CurveMatch { shape: Shape::Low, min: 0.0, max: 0.0 };
        }

        let span = max - min;
        let mut best = Shape::Low;
        let mut best_error = f32::MAX;
        for &shape in &SHAPES {
            let mut error = 0.0;
            for (index, (&value, &filled)) in self.buckets.iter().zip(&self.filled).enumerate() {
                if !filled {
                    continue;
                }
                let phase = (index as f32 + 0.5) / CURVE_RECORD_BUCKETS as f32;
                let predicted = min + shape.eval(phase) * span;
                let diff = predicted - value;
                error += diff * diff;
            }
            if error < best_error {
                best_error = error;
                best = shape;
            }
        }

        CurveMatch { shape: best, min, max }
    }
}
