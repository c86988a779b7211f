//! Curve track configuration.

use alloc::vec::Vec;

use crate::curve_sequence::CurveSequence;
use crate::types::{PlayMode, PATTERN_COUNT};

/// Fill behavior of a curve track.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CurveFillMode {
    #[default]
    None,
    /// Evaluate the variation shape instead of the base shape.
    Variation,
    /// Evaluate steps from the next pattern.
    NextPattern,
    /// Evaluate `1 - f(t)`.
    Invert,
}

impl CurveFillMode {
    pub fn from_index(index: u8) -> Self {
        match index {
            1 => CurveFillMode::Variation,
            2 => CurveFillMode::NextPattern,
            3 => CurveFillMode::Invert,
            _ => CurveFillMode::None,
        }
    }

    pub fn to_index(self) -> u8 {
        match self {
            CurveFillMode::None => 0,
            CurveFillMode::Variation => 1,
            CurveFillMode::NextPattern => 2,
            CurveFillMode::Invert => 3,
        }
    }
}

/// A curve track: per-pattern sequences plus track-level settings.
#[derive(Clone, Debug)]
pub struct CurveTrack {
    sequences: Vec<CurveSequence>,
    play_mode: PlayMode,
    fill_mode: CurveFillMode,
    rotate: i8,
    shape_probability_bias: i8,
    gate_probability_bias: i8,
    slide_time: u8,
    swing: u8,
    link_track: Option<u8>,
}

impl Default for CurveTrack {
    fn default() -> Self {
        Self {
            sequences: alloc::vec![CurveSequence::default(); PATTERN_COUNT],
            play_mode: PlayMode::Aligned,
            fill_mode: CurveFillMode::None,
            rotate: 0,
            shape_probability_bias: 0,
            gate_probability_bias: 0,
            slide_time: 0,
            swing: 50,
            link_track: None,
        }
    }
}

impl CurveTrack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sequence(&self, pattern: usize) -> &CurveSequence {
        debug_assert!(pattern < PATTERN_COUNT);
        &self.sequences[pattern]
    }

    pub fn sequence_mut(&mut self, pattern: usize) -> &mut CurveSequence {
        debug_assert!(pattern < PATTERN_COUNT);
        &mut self.sequences[pattern]
    }

    pub fn play_mode(&self) -> PlayMode {
        self.play_mode
    }

    pub fn set_play_mode(&mut self, play_mode: PlayMode) {
        self.play_mode = play_mode;
    }

    pub fn fill_mode(&self) -> CurveFillMode {
        self.fill_mode
    }

    pub fn set_fill_mode(&mut self, fill_mode: CurveFillMode) {
        self.fill_mode = fill_mode;
    }

    pub fn rotate(&self) -> i32 {
        i32::from(self.rotate)
    }

    pub fn set_rotate(&mut self, value: i32) {
        self.rotate = value.clamp(-64, 64) as i8;
    }

    pub fn shape_probability_bias(&self) -> i32 {
        i32::from(self.shape_probability_bias)
    }

    pub fn set_shape_probability_bias(&mut self, value: i32) {
        self.shape_probability_bias = value.clamp(-8, 8) as i8;
    }

    pub fn gate_probability_bias(&self) -> i32 {
        i32::from(self.gate_probability_bias)
    }

    pub fn set_gate_probability_bias(&mut self, value: i32) {
        self.gate_probability_bias = value.clamp(-8, 8) as i8;
    }

    pub fn slide_time(&self) -> i32 {
        i32::from(self.slide_time)
    }

    pub fn set_slide_time(&mut self, value: i32) {
        self.slide_time = value.clamp(0, 100) as u8;
    }

    pub fn swing(&self) -> u32 {
        u32::from(self.swing)
    }

    pub fn set_swing(&mut self, value: i32) {
        self.swing = value.clamp(50, 75) as u8;
    }

    pub fn link_track(&self) -> Option<usize> {
        self.link_track.map(usize::from)
    }

    pub fn set_link_track(&mut self, own_index: usize, leader: Option<usize>) {
        self.link_track = match leader {
            Some(leader) if leader < own_index => Some(leader as u8),
            _ => None,
        };
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_clamp() {
        let mut track = CurveTrack::new();
        track.set_shape_probability_bias(-99);
        assert_eq!(track.shape_probability_bias(), -8);
        track.set_slide_time(-5);
        assert_eq!(track.slide_time(), 0);
    }
}
