//! Mapping from scale degrees to control voltages.

/// A musical scale used to convert integer note indices to volts at
/// 1 V/octave.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Scale {
    #[default]
    Chromatic,
    Major,
    Minor,
    Dorian,
    Mixolydian,
    MajorPentatonic,
    MinorPentatonic,
    WholeTone,
}

impl Scale {
    pub const COUNT: u8 = 8;

    /// Semitone intervals of one octave of the scale.
    pub fn intervals(self) -> &'static [u8] {
        match self {
            Scale::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
            Scale::Major => &[0, 2, 4, 5, 7, 9, 11],
            Scale::Minor => &[0, 2, 3, 5, 7, 8, 10],
            Scale::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            Scale::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            Scale::MajorPentatonic => &[0, 2, 4, 7, 9],
            Scale::MinorPentatonic => &[0, 3, 5, 7, 10],
            Scale::WholeTone => &[0, 2, 4, 6, 8, 10],
        }
    }

    /// Scale degrees per octave.
    pub fn notes_per_octave(self) -> i32 {
        self.intervals().len() as i32
    }

    /// Chromatic scales shift with the root note; others are already
    /// expressed relative to it.
    pub fn is_chromatic(self) -> bool {
        matches!(self, Scale::Chromatic)
    }

    /// Convert a scale degree to volts at 1 V/octave.
    pub fn note_to_volts(self, note: i32) -> f32 {
        let notes = self.notes_per_octave();
        let octave = note.div_euclid(notes);
        let degree = note.rem_euclid(notes) as usize;
        octave as f32 + f32::from(self.intervals()[degree]) / 12.0
    }

    /// Nearest scale degree for a voltage (inverse of `note_to_volts`).
    pub fn note_from_volts(self, volts: f32) -> i32 {
        let notes = self.notes_per_octave();
        // Octave-fold, then pick the closest interval.
        let total_semitones = volts * 12.0;
        let octave = (total_semitones / 12.0).floor() as i32;
        let semitone = total_semitones - octave as f32 * 12.0;
        let mut best = 0;
        let mut best_distance = f32::MAX;
        for (degree, &interval) in self.intervals().iter().enumerate() {
            let distance = (semitone - f32::from(interval)).abs();
            if distance < best_distance {
                best_distance = distance;
                best = degree as i32;
            }
        }
        // The octave above may be closer than the top interval.
        if (semitone - 12.0).abs() < best_distance {
            return (octave + 1) * notes;
        }
        octave * notes + best
    }

    pub fn from_index(index: u8) -> Self {
        match index {
            1 => Scale::Major,
            2 => Scale::Minor,
            3 => Scale::Dorian,
            4 => Scale::Mixolydian,
            5 => Scale::MajorPentatonic,
            6 => Scale::MinorPentatonic,
            7 => Scale::WholeTone,
            _ => Scale::Chromatic,
        }
    }

    pub fn to_index(self) -> u8 {
        match self {
            Scale::Chromatic => 0,
            Scale::Major => 1,
            Scale::Minor => 2,
            Scale::Dorian => 3,
            Scale::Mixolydian => 4,
            Scale::MajorPentatonic => 5,
            Scale::MinorPentatonic => 6,
            Scale::WholeTone => 7,
        }
    }
}
