//! Arpeggiator configuration.

/// Order in which held notes are arpeggiated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ArpeggiatorMode {
    #[default]
    Up,
    Down,
    UpDown,
    DownUp,
    /// Alternates from the outermost notes inward: lowest, highest,
    /// second lowest, second highest.
    Converge,
    Random,
}

impl ArpeggiatorMode {
    pub const COUNT: u8 = 6;

    pub fn from_index(index: u8) -> Self {
        match index {
            1 => ArpeggiatorMode::Down,
            2 => ArpeggiatorMode::UpDown,
            3 => ArpeggiatorMode::DownUp,
            4 => ArpeggiatorMode::Converge,
            5 => ArpeggiatorMode::Random,
            _ => ArpeggiatorMode::Up,
        }
    }

    pub fn to_index(self) -> u8 {
        match self {
            ArpeggiatorMode::Up => 0,
            ArpeggiatorMode::Down => 1,
            ArpeggiatorMode::UpDown => 2,
            ArpeggiatorMode::DownUp => 3,
            ArpeggiatorMode::Converge => 4,
            ArpeggiatorMode::Random => 5,
        }
    }
}

/// Arpeggiator settings embedded in a MIDI/CV track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Arpeggiator {
    enabled: bool,
    hold: bool,
    mode: ArpeggiatorMode,
    /// Ticks per arp step in sequence-PPQN units.
    divisor: u8,
    /// Gate length in percent of the arp step.
    gate_length: u8,
    /// Octave span; negative stacks downward.
    octaves: i8,
}

impl Default for Arpeggiator {
    fn default() -> Self {
        Self {
            enabled: false,
            hold: false,
            mode: ArpeggiatorMode::Up,
            divisor: 12,
            gate_length: 50,
            octaves: 1,
        }
    }
}

impl Arpeggiator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn hold(&self) -> bool {
        self.hold
    }

    pub fn set_hold(&mut self, hold: bool) {
        self.hold = hold;
    }

    pub fn mode(&self) -> ArpeggiatorMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ArpeggiatorMode) {
        self.mode = mode;
    }

    pub fn divisor(&self) -> u32 {
        u32::from(self.divisor)
    }

    pub fn set_divisor(&mut self, value: i32) {
        self.divisor = value.clamp(1, 192) as u8;
    }

    pub fn gate_length(&self) -> u32 {
        u32::from(self.gate_length)
    }

    pub fn set_gate_length(&mut self, value: i32) {
        self.gate_length = value.clamp(1, 100) as u8;
    }

    pub fn octaves(&self) -> i32 {
        i32::from(self.octaves)
    }

    pub fn set_octaves(&mut self, value: i32) {
        self.octaves = value.clamp(-4, 4) as i8;
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
        let mut arp = Arpeggiator::new();
        arp.set_gate_length(0);
        assert_eq!(arp.gate_length(), 1);
        arp.set_octaves(9);
        assert_eq!(arp.octaves(), 4);
        arp.set_divisor(0);
        assert_eq!(arp.divisor(), 1);
    }

    #[test]
    fn mode_round_trip() {
        for index in 0..ArpeggiatorMode::COUNT {
            assert_eq!(ArpeggiatorMode::from_index(index).to_index(), index);
        }
    }
}
