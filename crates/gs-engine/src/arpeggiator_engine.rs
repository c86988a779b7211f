//! Arpeggiator playback.
//!
//! Intercepts the held notes of a MIDI/CV track and produces a stream of
//! scheduled note events that feed back into the same voice pipeline.

use arrayvec::ArrayVec;
use gs_model::{Arpeggiator, ArpeggiatorMode, PPQN, SEQUENCE_PPQN};

use crate::rng::SeqRng;

/// Notes a single arp step can produce: the previous note's release plus
/// the next note's press.
pub type ArpEvents = ArrayVec<ArpEvent, 2>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArpEvent {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
}

#[derive(Clone, Copy, Debug)]
struct HeldNote {
    note: u8,
    velocity: u8,
}

/// Runtime state of one track's arpeggiator.
#[derive(Clone, Debug, Default)]
pub struct ArpeggiatorEngine {
    held: ArrayVec<HeldNote, 16>,
    pressed: ArrayVec<u8, 16>,
    step_index: usize,
    relative_tick: u32,
    sounding: Option<u8>,
    gate_remaining: u32,
}

impl ArpeggiatorEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.held.clear();
        self.pressed.clear();
        self.step_index = 0;
        self.relative_tick = 0;
        self.sounding = None;
        self.gate_remaining = 0;
    }

    /// Feed a note press into the arp.
    pub fn note_on(&mut self, note: u8, velocity: u8, hold: bool) {
        // In hold mode a new press after everything was released starts a
        // fresh chord.
        if hold && self.pressed.is_empty() && !self.held.is_empty() {
            self.held.clear();
            self.step_index = 0;
        }
        if !self.pressed.contains(&note) && !self.pressed.is_full() {
            self.pressed.push(note);
        }
        if let Some(existing) = self.held.iter_mut().find(|h| h.note == note) {
            existing.velocity = velocity;
        } else if !self.held.is_full() {
            self.held.push(HeldNote { note, velocity });
        }
    }

    /// Feed a note release into the arp.
    pub fn note_off(&mut self, note: u8, hold: bool) {
        self.pressed.retain(|&mut n| n != note);
        if !hold {
            self.held.retain(|h| h.note != note);
        }
    }

    /// Advance one tick, producing the note events due now.
    pub fn tick(&mut self, config: &Arpeggiator, rng: &mut SeqRng) -> ArpEvents {
        let mut events = ArpEvents::new();

        if self.held.is_empty() {
            if let Some(note) = self.sounding.take() {
                events.push(ArpEvent::NoteOff { note });
            }
            self.relative_tick = 0;
            return events;
        }

        let divisor = config.divisor() * (PPQN / SEQUENCE_PPQN);

        // Release the previous note when its gate time expires.
        if let Some(note) = self.sounding {
            if self.gate_remaining == 0 {
                events.push(ArpEvent::NoteOff { note });
                self.sounding = None;
            } else {
                self.gate_remaining -= 1;
            }
        }

        if self.relative_tick % divisor == 0 {
            let sequence = self.build_sequence(config);
            if !sequence.is_empty() {
                let index = match config.mode() {
                    ArpeggiatorMode::Random => rng.next_range(sequence.len() as u32) as usize,
                    _ => {
                        let index = self.step_index % sequence.len();
                        self.step_index = (self.step_index + 1) % sequence.len();
                        index
                    }
                };
                let next = sequence[index];
                if let Some(note) = self.sounding.take() {
                    if events.is_empty() {
                        events.push(ArpEvent::NoteOff { note });
                    }
                }
                events.push(ArpEvent::NoteOn { note: next.note, velocity: next.velocity });
                self.sounding = Some(next.note);
                self.gate_remaining = (divisor * config.gate_length() / 100).max(1);
            }
        }

        self.relative_tick = self.relative_tick.wrapping_add(1);
        events
    }

    /// Expand the held notes into the traversal order for the mode,
    /// stacked across the configured octave span.
    fn build_sequence(&self, config: &Arpeggiator) -> ArrayVec<HeldNote, 64> {
        let mut base: ArrayVec<HeldNote, 16> = self.held.clone();
        match config.mode() {
            ArpeggiatorMode::Up | ArpeggiatorMode::UpDown | ArpeggiatorMode::Converge => {
                base.sort_unstable_by_key(|h| h.note);
            }
            ArpeggiatorMode::Down | ArpeggiatorMode::DownUp => {
                base.sort_unstable_by_key(|h| core::cmp::Reverse(h.note));
            }
            ArpeggiatorMode::Random => {}
        }

        let mut stacked: ArrayVec<HeldNote, 64> = ArrayVec::new();
        let octaves = config.octaves();
        let span = octaves.unsigned_abs().max(1) as i32;
        for octave in 0..span {
            let shift = if octaves < 0 { -octave * 12 } else { octave * 12 };
            for held in &base {
                let note = i32::from(held.note) + shift;
                if (0..=127).contains(&note) && !stacked.is_full() {
                    stacked.push(HeldNote { note: note as u8, velocity: held.velocity });
                }
            }
        }

        // Up-down modes append the reverse of the inner notes.
        if matches!(config.mode(), ArpeggiatorMode::UpDown | ArpeggiatorMode::DownUp)
            && stacked.len() > 2
        {
            for index in (1..stacked.len() - 1).rev() {
                let entry = stacked[index];
                if stacked.is_full() {
                    break;
                }
                stacked.push(entry);
            }
        }

        // Converge alternates from the outermost notes inward.
        if config.mode() == ArpeggiatorMode::Converge {
            stacked.sort_unstable_by_key(|h| h.note);
            let mut ordered: ArrayVec<HeldNote, 64> = ArrayVec::new();
            let mut low = 0;
            let mut high = stacked.len();
            while low < high {
                ordered.push(stacked[low]);
                low += 1;
                if low < high {
                    high -= 1;
                    ordered.push(stacked[high]);
                }
            }
            stacked = ordered;
        }

        stacked
    }
}
