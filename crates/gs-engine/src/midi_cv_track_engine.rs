//! MIDI-to-CV/gate playback.
//!
//! Routes filtered MIDI input through a priority-driven voice allocator
//! and exposes per-voice pitch, velocity and pressure CVs plus gates.
//! An optional arpeggiator intercepts the held notes and feeds scheduled
//! note events into the same pipeline.

use arrayvec::ArrayVec;
use gs_model::{MidiCvTrack, MidiMessage, NotePriority, VoltageRange, CC_MOD_WHEEL};

use crate::arpeggiator_engine::{ArpEvent, ArpeggiatorEngine};
use crate::rng::SeqRng;

/// Gate-low ticks inserted between consecutive notes on a retriggering
/// voice.
const RETRIGGER_TICKS: u8 = 2;

const VOICE_SLOTS: usize = 8;

#[derive(Clone, Copy, Debug, Default)]
struct Voice {
    note: u8,
    velocity: u8,
    active: bool,
    /// Assignment recency; the lowest order is stolen first.
    order: u32,
    retrigger_ticks: u8,
}

#[derive(Clone, Copy, Debug)]
struct HeldNote {
    note: u8,
    velocity: u8,
    /// Arrival order, for Last/First priorities.
    order: u32,
}

/// Runtime state of one MIDI/CV track.
pub struct MidiCvTrackEngine {
    #[allow(dead_code)]
    track_index: usize,
    rng: SeqRng,
    held: ArrayVec<HeldNote, 16>,
    next_order: u32,
    voices: [Voice; VOICE_SLOTS],
    pitch_bend: i16,
    channel_pressure: u8,
    modulation: u8,
    arp: ArpeggiatorEngine,
    muted: bool,
}

impl MidiCvTrackEngine {
    pub fn new(track_index: usize, seed: u64) -> Self {
        Self {
            track_index,
            rng: SeqRng::new(seed),
            held: ArrayVec::new(),
            next_order: 0,
            voices: [Voice::default(); VOICE_SLOTS],
            pitch_bend: 0,
            channel_pressure: 0,
            modulation: 0,
            arp: ArpeggiatorEngine::new(),
            muted: false,
        }
    }

    pub fn reset(&mut self) {
        self.held.clear();
        self.next_order = 0;
        self.voices = [Voice::default(); VOICE_SLOTS];
        self.pitch_bend = 0;
        self.channel_pressure = 0;
        self.modulation = 0;
        self.arp.reset();
    }

    pub fn restart(&mut self) {
        self.arp.reset();
    }

    /// Feed an incoming MIDI message through the source filter.
    pub fn receive_midi(&mut self, _tick: u32, message: &MidiMessage, config: &MidiCvTrack) {
        if !config.source().accepts(message.channel()) {
            return;
        }

        match *message {
            MidiMessage::PitchBend { value, .. } => {
                self.pitch_bend = value;
                return;
            }
            MidiMessage::ChannelPressure { pressure, .. } => {
                self.channel_pressure = pressure;
                return;
            }
            MidiMessage::ControlChange { controller, value, .. } => {
                if controller == CC_MOD_WHEEL {
                    self.modulation = value;
                }
                return;
            }
            _ => {}
        }

        let Some(note) = message.note() else { return };
        if note < config.low_note() || note > config.high_note() {
            return;
        }

        let arp = config.arpeggiator();
        if message.is_note_on() {
            let velocity = match *message {
                MidiMessage::NoteOn { velocity, .. } => velocity,
                _ => 0,
            };
            if arp.enabled() {
                self.arp.note_on(note, velocity, arp.hold());
            } else {
                self.note_on(note, velocity, config);
            }
        } else if message.is_note_off() {
            if arp.enabled() {
                self.arp.note_off(note, arp.hold());
            } else {
                self.note_off(note, config);
            }
        }
    }

    pub fn tick(&mut self, _tick: u32, config: &MidiCvTrack, mute: bool) {
        self.muted = mute;

        if config.arpeggiator().enabled() {
            let events = self.arp.tick(config.arpeggiator(), &mut self.rng);
            for event in events {
                match event {
                    ArpEvent::NoteOn { note, velocity } => self.note_on(note, velocity, config),
                    ArpEvent::NoteOff { note } => self.note_off(note, config),
                }
            }
        }

        for voice in &mut self.voices {
            if voice.retrigger_ticks > 0 {
                voice.retrigger_ticks -= 1;
            }
        }
    }

    pub fn activity(&self) -> bool {
        self.voices.iter().any(|v| v.active && v.retrigger_ticks == 0)
    }

    pub fn gate_output(&self, config: &MidiCvTrack, index: usize) -> bool {
        let voice = &self.voices[index % config.voices()];
        !self.muted && voice.active && voice.retrigger_ticks == 0
    }

    /// CV outputs are laid out voice-major per signal: all V/Oct outputs,
    /// then all velocity outputs, then all pressure outputs.
    pub fn cv_output(&self, config: &MidiCvTrack, index: usize) -> f32 {
        let voices = config.voices();
        let signals = config.voice_config().signals();
        let index = index % (voices * signals);
        let voice = &self.voices[index % voices];
        match index / voices {
            0 => self.pitch_volts(config, voice),
            1 => VoltageRange::Unipolar5V.denormalize(f32::from(voice.velocity) / 127.0),
            _ => VoltageRange::Unipolar5V.denormalize(f32::from(self.channel_pressure) / 127.0),
        }
    }

    /// The mod wheel mapped through the configured modulation range.
    pub fn modulation_output(&self, config: &MidiCvTrack) -> f32 {
        config
            .modulation_range()
            .denormalize(f32::from(self.modulation) / 127.0)
    }

    fn pitch_volts(&self, config: &MidiCvTrack, voice: &Voice) -> f32 {
        let mut volts = (f32::from(voice.note) - 60.0) / 12.0;
        if config.pitch_bend_range() > 0 {
            let bend = f32::from(self.pitch_bend) / 8192.0;
            volts += bend * config.pitch_bend_range() as f32 / 12.0;
        }
        volts
    }

    fn note_on(&mut self, note: u8, velocity: u8, config: &MidiCvTrack) {
        self.held.retain(|h| h.note != note);
        if self.held.is_full() {
            self.held.remove(0);
        }
        let order = self.next_order;
        self.next_order = self.next_order.wrapping_add(1);
        self.held.push(HeldNote { note, velocity, order });
        self.assign_voices(config);
    }

    fn note_off(&mut self, note: u8, config: &MidiCvTrack) {
        self.held.retain(|h| h.note != note);
        self.assign_voices(config);
    }

    /// Bind the priority-selected held notes to voices, keeping existing
    /// note-to-voice bindings stable.
    fn assign_voices(&mut self, config: &MidiCvTrack) {
        let count = config.voices();

        let mut candidates: ArrayVec<HeldNote, 16> = self.held.clone();
        match config.note_priority() {
            NotePriority::LastNote => {
                candidates.sort_unstable_by_key(|h| core::cmp::Reverse(h.order));
            }
            NotePriority::FirstNote => candidates.sort_unstable_by_key(|h| h.order),
            NotePriority::LowestNote => candidates.sort_unstable_by_key(|h| h.note),
            NotePriority::HighestNote => {
                candidates.sort_unstable_by_key(|h| core::cmp::Reverse(h.note));
            }
        }
        let winners = &candidates[..count.min(candidates.len())];

        let was_active: [bool; VOICE_SLOTS] = core::array::from_fn(|i| self.voices[i].active);

        // Release voices whose note lost its claim, and any slot beyond
        // the configured voice count.
        for (slot, voice) in self.voices.iter_mut().enumerate() {
            if slot >= count || (voice.active && !winners.iter().any(|w| w.note == voice.note)) {
                voice.active = false;
            }
        }

        for winner in winners {
            if self.voices[..count]
                .iter()
                .any(|v| v.active && v.note == winner.note)
            {
                continue;
            }
            let slot = self.voices[..count]
                .iter()
                .position(|v| !v.active)
                .unwrap_or_else(|| {
                    // Steal the least recently assigned voice.
                    let mut slot = 0;
                    for (i, voice) in self.voices[..count].iter().enumerate() {
                        if voice.order < self.voices[slot].order {
                            slot = i;
                        }
                    }
                    slot
                });

            let order = self.next_order;
            self.next_order = self.next_order.wrapping_add(1);
            let voice = &mut self.voices[slot];
            voice.note = winner.note;
            voice.velocity = winner.velocity;
            voice.active = true;
            voice.order = order;
            if config.retrigger() && was_active[slot] {
                voice.retrigger_ticks = RETRIGGER_TICKS;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gs_model::VoiceConfig;

    fn config(voices: i32, priority: NotePriority) -> MidiCvTrack {
        let mut track = MidiCvTrack::new();
        track.set_voices(voices);
        track.set_note_priority(priority);
        track
    }

    fn on(engine: &mut MidiCvTrackEngine, config: &MidiCvTrack, note: u8) {
        let message = MidiMessage::NoteOn { channel: 0, note, velocity: 100 };
        engine.receive_midi(0, &message, config);
    }

    fn off(engine: &mut MidiCvTrackEngine, config: &MidiCvTrack, note: u8) {
        let message = MidiMessage::NoteOff { channel: 0, note };
        engine.receive_midi(0, &message, config);
    }

    #[test]
    fn single_voice_plays_note() {
        let cfg = config(1, NotePriority::LastNote);
        let mut engine = MidiCvTrackEngine::new(0, 1);
        on(&mut engine, &cfg, 60);
        assert!(engine.gate_output(&cfg, 0));
        assert_eq!(engine.cv_output(&cfg, 0), 0.0); // middle C = 0V
        off(&mut engine, &cfg, 60);
        assert!(!engine.gate_output(&cfg, 0));
    }

    #[test]
    fn lowest_priority_keeps_lowest() {
        // Two held notes, one voice: the lower one sounds; releasing it
        // hands the voice to the higher note.
        let cfg = config(1, NotePriority::LowestNote);
        let mut engine = MidiCvTrackEngine::new(0, 1);
        on(&mut engine, &cfg, 48); // C3
        on(&mut engine, &cfg, 52); // E3
        assert!(engine.gate_output(&cfg, 0));
        assert_eq!(engine.cv_output(&cfg, 0), -1.0);
        off(&mut engine, &cfg, 48);
        assert!(engine.gate_output(&cfg, 0));
        assert!((engine.cv_output(&cfg, 0) - (52.0 - 60.0) / 12.0).abs() < 1e-6);
    }

    #[test]
    fn retrigger_inserts_gate_low_edge() {
        let mut cfg = config(1, NotePriority::LowestNote);
        cfg.set_retrigger(true);
        let mut engine = MidiCvTrackEngine::new(0, 1);
        on(&mut engine, &cfg, 48);
        on(&mut engine, &cfg, 52);
        off(&mut engine, &cfg, 48);
        // The voice changed note: gate is low for the retrigger window.
        assert!(!engine.gate_output(&cfg, 0));
        for _ in 0..=RETRIGGER_TICKS {
            engine.tick(0, &cfg, false);
        }
        assert!(engine.gate_output(&cfg, 0));
    }

    #[test]
    fn no_retrigger_keeps_gate_high() {
        let cfg = config(1, NotePriority::LowestNote);
        let mut engine = MidiCvTrackEngine::new(0, 1);
        on(&mut engine, &cfg, 48);
        on(&mut engine, &cfg, 52);
        off(&mut engine, &cfg, 48);
        assert!(engine.gate_output(&cfg, 0));
    }

    #[test]
    fn highest_priority_sorts_down() {
        let cfg = config(2, NotePriority::HighestNote);
        let mut engine = MidiCvTrackEngine::new(0, 1);
        on(&mut engine, &cfg, 60);
        on(&mut engine, &cfg, 64);
        on(&mut engine, &cfg, 67);
        // The two highest notes hold the voices.
        let sounding: alloc::vec::Vec<u8> = engine
            .voices
            .iter()
            .filter(|v| v.active)
            .map(|v| v.note)
            .collect();
        assert_eq!(sounding.len(), 2);
        assert!(sounding.contains(&64));
        assert!(sounding.contains(&67));
    }

    #[test]
    fn last_priority_steals_for_new_notes() {
        let cfg = config(2, NotePriority::LastNote);
        let mut engine = MidiCvTrackEngine::new(0, 1);
        on(&mut engine, &cfg, 60);
        on(&mut engine, &cfg, 62);
        on(&mut engine, &cfg, 64);
        let sounding: alloc::vec::Vec<u8> = engine
            .voices
            .iter()
            .filter(|v| v.active)
            .map(|v| v.note)
            .collect();
        assert!(sounding.contains(&62));
        assert!(sounding.contains(&64));
        assert!(!sounding.contains(&60));
    }

    #[test]
    fn first_priority_ignores_new_notes_when_full() {
        let cfg = config(2, NotePriority::FirstNote);
        let mut engine = MidiCvTrackEngine::new(0, 1);
        on(&mut engine, &cfg, 60);
        on(&mut engine, &cfg, 62);
        on(&mut engine, &cfg, 64);
        let sounding: alloc::vec::Vec<u8> = engine
            .voices
            .iter()
            .filter(|v| v.active)
            .map(|v| v.note)
            .collect();
        assert!(sounding.contains(&60));
        assert!(sounding.contains(&62));
        // The waiting note binds once a voice frees up.
        off(&mut engine, &cfg, 60);
        assert!(engine.voices.iter().any(|v| v.active && v.note == 64));
    }

    #[test]
    fn note_filter_rejects_out_of_range() {
        let mut cfg = config(1, NotePriority::LastNote);
        cfg.set_low_note(48);
        cfg.set_high_note(72);
        let mut engine = MidiCvTrackEngine::new(0, 1);
        on(&mut engine, &cfg, 30);
        assert!(!engine.activity());
        on(&mut engine, &cfg, 60);
        assert!(engine.activity());
    }

    #[test]
    fn channel_filter_rejects_other_channels() {
        let mut cfg = config(1, NotePriority::LastNote);
        cfg.source_mut().set_channel(2);
        let mut engine = MidiCvTrackEngine::new(0, 1);
        let message = MidiMessage::NoteOn { channel: 0, note: 60, velocity: 100 };
        engine.receive_midi(0, &message, &cfg);
        assert!(!engine.activity());
        let message = MidiMessage::NoteOn { channel: 2, note: 60, velocity: 100 };
        engine.receive_midi(0, &message, &cfg);
        assert!(engine.activity());
    }

    #[test]
    fn pitch_bend_scales_by_range() {
        let mut cfg = config(1, NotePriority::LastNote);
        cfg.set_pitch_bend_range(2);
        let mut engine = MidiCvTrackEngine::new(0, 1);
        on(&mut engine, &cfg, 60);
        engine.receive_midi(0, &MidiMessage::PitchBend { channel: 0, value: 8191 }, &cfg);
        // Almost +2 semitones.
        let expected = (8191.0 / 8192.0) * 2.0 / 12.0;
        assert!((engine.cv_output(&cfg, 0) - expected).abs() < 1e-4);
    }

    #[test]
    fn pitch_bend_range_zero_mutes_bend() {
        let mut cfg = config(1, NotePriority::LastNote);
        cfg.set_pitch_bend_range(0);
        let mut engine = MidiCvTrackEngine::new(0, 1);
        on(&mut engine, &cfg, 60);
        engine.receive_midi(0, &MidiMessage::PitchBend { channel: 0, value: 8191 }, &cfg);
        assert_eq!(engine.cv_output(&cfg, 0), 0.0);
    }

    #[test]
    fn velocity_and_pressure_outputs() {
        let mut cfg = config(2, NotePriority::LastNote);
        cfg.set_voice_config(VoiceConfig::PitchVelocityPressure);
        let mut engine = MidiCvTrackEngine::new(0, 1);
        let message = MidiMessage::NoteOn { channel: 0, note: 60, velocity: 127 };
        engine.receive_midi(0, &message, &cfg);
        engine.receive_midi(0, &MidiMessage::ChannelPressure { channel: 0, pressure: 127 }, &cfg);
        // Outputs: [voct0, voct1, vel0, vel1, press0, press1].
        assert_eq!(engine.cv_output(&cfg, 2), 5.0);
        assert_eq!(engine.cv_output(&cfg, 4), 5.0);
    }

    #[test]
    fn modulation_maps_through_range() {
        let mut cfg = config(1, NotePriority::LastNote);
        cfg.set_modulation_range(VoltageRange::Bipolar5V);
        let mut engine = MidiCvTrackEngine::new(0, 1);
        let message = MidiMessage::ControlChange { channel: 0, controller: CC_MOD_WHEEL, value: 127 };
        engine.receive_midi(0, &message, &cfg);
        assert_eq!(engine.modulation_output(&cfg), 5.0);
        let message = MidiMessage::ControlChange { channel: 0, controller: CC_MOD_WHEEL, value: 0 };
        engine.receive_midi(0, &message, &cfg);
        assert_eq!(engine.modulation_output(&cfg), -5.0);
    }

    #[test]
    fn arpeggiator_drives_voices() {
        let mut cfg = config(1, NotePriority::LastNote);
        cfg.arpeggiator_mut().set_enabled(true);
        cfg.arpeggiator_mut().set_divisor(6);
        let mut engine = MidiCvTrackEngine::new(0, 1);
        on(&mut engine, &cfg, 60);
        on(&mut engine, &cfg, 64);
        // Held notes are intercepted: nothing sounds until the arp ticks.
        assert!(!engine.activity());
        engine.tick(0, &cfg, false);
        assert!(engine.activity());
        let first = engine.cv_output(&cfg, 0);
        // Advance one arp step (24 ticks).
        for tick in 1..=24 {
            engine.tick(tick, &cfg, false);
        }
        assert!(engine.activity());
        assert!((engine.cv_output(&cfg, 0) - first).abs() > 0.01);
    }

    #[test]
    fn mute_suppresses_gates() {
        let cfg = config(1, NotePriority::LastNote);
        let mut engine = MidiCvTrackEngine::new(0, 1);
        on(&mut engine, &cfg, 60);
        engine.tick(0, &cfg, true);
        assert!(!engine.gate_output(&cfg, 0));
        engine.tick(1, &cfg, false);
        assert!(engine.gate_output(&cfg, 0));
    }
}
