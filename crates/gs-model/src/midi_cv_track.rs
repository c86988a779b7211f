//! MIDI/CV track configuration.

use crate::arpeggiator::Arpeggiator;
use crate::types::VoltageRange;

/// Which CV signals each voice drives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VoiceConfig {
    #[default]
    Pitch,
    PitchVelocity,
    PitchVelocityPressure,
}

impl VoiceConfig {
    /// CV signals per voice.
    pub fn signals(self) -> usize {
        match self {
            VoiceConfig::Pitch => 1,
            VoiceConfig::PitchVelocity => 2,
            VoiceConfig::PitchVelocityPressure => 3,
        }
    }

    pub fn from_index(index: u8) -> Self {
        match index {
            1 => VoiceConfig::PitchVelocity,
            2 => VoiceConfig::PitchVelocityPressure,
            _ => VoiceConfig::Pitch,
        }
    }

    pub fn to_index(self) -> u8 {
        match self {
            VoiceConfig::Pitch => 0,
            VoiceConfig::PitchVelocity => 1,
            VoiceConfig::PitchVelocityPressure => 2,
        }
    }
}

/// Which held notes win voices when more notes are held than voices exist.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NotePriority {
    #[default]
    LastNote,
    FirstNote,
    LowestNote,
    HighestNote,
}

impl NotePriority {
    pub fn from_index(index: u8) -> Self {
        match index {
            1 => NotePriority::FirstNote,
            2 => NotePriority::LowestNote,
            3 => NotePriority::HighestNote,
            _ => NotePriority::LastNote,
        }
    }

    pub fn to_index(self) -> u8 {
        match self {
            NotePriority::LastNote => 0,
            NotePriority::FirstNote => 1,
            NotePriority::LowestNote => 2,
            NotePriority::HighestNote => 3,
        }
    }
}

/// MIDI input filter: which channel feeds the track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MidiSource {
    /// MIDI channel `0..=15`; -1 accepts all channels.
    channel: i8,
}

impl Default for MidiSource {
    fn default() -> Self {
        Self { channel: -1 }
    }
}

impl MidiSource {
    pub fn channel(&self) -> i32 {
        i32::from(self.channel)
    }

    pub fn set_channel(&mut self, channel: i32) {
        self.channel = channel.clamp(-1, 15) as i8;
    }

    /// Does a message on `channel` pass the filter?
    pub fn accepts(&self, channel: u8) -> bool {
        self.channel < 0 || self.channel as u8 == channel
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// A polyphonic MIDI-to-CV/gate track.
#[derive(Clone, Debug, PartialEq)]
pub struct MidiCvTrack {
    source: MidiSource,
    voices: u8,
    voice_config: VoiceConfig,
    note_priority: NotePriority,
    low_note: u8,
    high_note: u8,
    pitch_bend_range: u8,
    modulation_range: VoltageRange,
    retrigger: bool,
    arpeggiator: Arpeggiator,
}

impl Default for MidiCvTrack {
    fn default() -> Self {
        Self {
            source: MidiSource::default(),
            voices: 1,
            voice_config: VoiceConfig::Pitch,
            note_priority: NotePriority::LowestNote,
            low_note: 0,
            high_note: 127,
            pitch_bend_range: 2,
            modulation_range: VoltageRange::Unipolar5V,
            retrigger: false,
            arpeggiator: Arpeggiator::default(),
        }
    }
}

impl MidiCvTrack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self) -> &MidiSource {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut MidiSource {
        &mut self.source
    }

    pub fn voices(&self) -> usize {
        usize::from(self.voices)
    }

    pub fn set_voices(&mut self, voices: i32) {
        self.voices = voices.clamp(1, 8) as u8;
    }

    pub fn voice_config(&self) -> VoiceConfig {
        self.voice_config
    }

    pub fn set_voice_config(&mut self, voice_config: VoiceConfig) {
        self.voice_config = voice_config;
    }

    pub fn note_priority(&self) -> NotePriority {
        self.note_priority
    }

    pub fn set_note_priority(&mut self, note_priority: NotePriority) {
        self.note_priority = note_priority;
    }

    pub fn low_note(&self) -> u8 {
        self.low_note
    }

    pub fn set_low_note(&mut self, value: i32) {
        self.low_note = value.clamp(0, i32::from(self.high_note)) as u8;
    }

    pub fn high_note(&self) -> u8 {
        self.high_note
    }

    pub fn set_high_note(&mut self, value: i32) {
        self.high_note = value.clamp(i32::from(self.low_note), 127) as u8;
    }

    /// Pitch bend range in semitones; 0 mutes bend.
    pub fn pitch_bend_range(&self) -> i32 {
        i32::from(self.pitch_bend_range)
    }

    pub fn set_pitch_bend_range(&mut self, value: i32) {
        self.pitch_bend_range = value.clamp(0, 48) as u8;
    }

    pub fn modulation_range(&self) -> VoltageRange {
        self.modulation_range
    }

    pub fn set_modulation_range(&mut self, range: VoltageRange) {
        self.modulation_range = range;
    }

    pub fn retrigger(&self) -> bool {
        self.retrigger
    }

    pub fn set_retrigger(&mut self, retrigger: bool) {
        self.retrigger = retrigger;
    }

    pub fn arpeggiator(&self) -> &Arpeggiator {
        &self.arpeggiator
    }

    pub fn arpeggiator_mut(&mut self) -> &mut Arpeggiator {
        &mut self.arpeggiator
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voices_clamp() {
        let mut track = MidiCvTrack::new();
        track.set_voices(0);
        assert_eq!(track.voices(), 1);
        track.set_voices(100);
        assert_eq!(track.voices(), 8);
    }

    #[test]
    fn note_range_stays_ordered() {
        let mut track = MidiCvTrack::new();
        track.set_high_note(60);
        track.set_low_note(80);
        assert!(track.low_note() <= track.high_note());
        track.set_low_note(40);
        track.set_high_note(20);
        assert!(track.low_note() <= track.high_note());
    }

    #[test]
    fn pitch_bend_range_clamps() {
        let mut track = MidiCvTrack::new();
        track.set_pitch_bend_range(100);
        assert_eq!(track.pitch_bend_range(), 48);
        track.set_pitch_bend_range(-3);
        assert_eq!(track.pitch_bend_range(), 0);
    }

    #[test]
    fn source_filter() {
        let mut track = MidiCvTrack::new();
        assert!(track.source().accepts(9));
        track.source_mut().set_channel(3);
        assert!(track.source().accepts(3));
        assert!(!track.source().accepts(4));
    }
}
