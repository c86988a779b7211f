//! Tracks and the project aggregate.

use alloc::vec::Vec;
use arrayvec::ArrayString;

use crate::curve_track::CurveTrack;
use crate::midi_cv_track::MidiCvTrack;
use crate::note_track::NoteTrack;
use crate::scale::Scale;
use crate::types::{RecordMode, TRACK_COUNT};

/// A track is one of three engine-backed modes.
#[derive(Clone, Debug)]
pub enum Track {
    Note(NoteTrack),
    Curve(CurveTrack),
    MidiCv(MidiCvTrack),
}

impl Track {
    pub fn note(&self) -> Option<&NoteTrack> {
        match self {
            Track::Note(track) => Some(track),
            _ => None,
        }
    }

    pub fn note_mut(&mut self) -> Option<&mut NoteTrack> {
        match self {
            Track::Note(track) => Some(track),
            _ => None,
        }
    }

    pub fn curve(&self) -> Option<&CurveTrack> {
        match self {
            Track::Curve(track) => Some(track),
            _ => None,
        }
    }

    pub fn curve_mut(&mut self) -> Option<&mut CurveTrack> {
        match self {
            Track::Curve(track) => Some(track),
            _ => None,
        }
    }

    pub fn midi_cv(&self) -> Option<&MidiCvTrack> {
        match self {
            Track::MidiCv(track) => Some(track),
            _ => None,
        }
    }

    pub fn midi_cv_mut(&mut self) -> Option<&mut MidiCvTrack> {
        match self {
            Track::MidiCv(track) => Some(track),
            _ => None,
        }
    }

    /// Leader track this one mirrors, if any.
    pub fn link_track(&self) -> Option<usize> {
        match self {
            Track::Note(track) => track.link_track(),
            Track::Curve(track) => track.link_track(),
            Track::MidiCv(_) => None,
        }
    }

    pub fn mode_index(&self) -> u8 {
        match self {
            Track::Note(_) => 0,
            Track::Curve(_) => 1,
            Track::MidiCv(_) => 2,
        }
    }

    pub fn from_mode_index(index: u8) -> Self {
        match index {
            1 => Track::Curve(CurveTrack::default()),
            2 => Track::MidiCv(MidiCvTrack::default()),
            _ => Track::Note(NoteTrack::default()),
        }
    }
}

/// A complete project: global playback settings plus all tracks.
#[derive(Clone, Debug)]
pub struct Project {
    name: ArrayString<16>,
    tempo: f32,
    scale: Scale,
    root_note: u8,
    record_mode: RecordMode,
    selected_track: u8,
    tracks: Vec<Track>,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            name: ArrayString::new(),
            tempo: 120.0,
            scale: Scale::Chromatic,
            root_note: 0,
            record_mode: RecordMode::Overwrite,
            selected_track: 0,
            tracks: (0..TRACK_COUNT).map(|_| Track::Note(NoteTrack::default())).collect(),
        }
    }
}

impl Project {
    pub fn new(name: &str) -> Self {
        let mut project = Self::default();
        let _ = project.name.try_push_str(name);
        project
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name.clear();
        let _ = self.name.try_push_str(name);
    }

    pub fn tempo(&self) -> f32 {
        self.tempo
    }

    pub fn set_tempo(&mut self, tempo: f32) {
        self.tempo = tempo.clamp(1.0, 1000.0);
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Scale) {
        self.scale = scale;
    }

    pub fn root_note(&self) -> i32 {
        i32::from(self.root_note)
    }

    pub fn set_root_note(&mut self, value: i32) {
        self.root_note = value.clamp(0, 11) as u8;
    }

    pub fn record_mode(&self) -> RecordMode {
        self.record_mode
    }

    pub fn set_record_mode(&mut self, mode: RecordMode) {
        self.record_mode = mode;
    }

    pub fn selected_track(&self) -> usize {
        usize::from(self.selected_track)
    }

    pub fn set_selected_track(&mut self, index: usize) {
        self.selected_track = index.min(TRACK_COUNT - 1) as u8;
    }

    pub fn track(&self, index: usize) -> &Track {
        debug_assert!(index < TRACK_COUNT);
        &self.tracks[index]
    }

    pub fn track_mut(&mut self, index: usize) -> &mut Track {
        debug_assert!(index < TRACK_COUNT);
        &mut self.tracks[index]
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn tracks_mut(&mut self) -> &mut [Track] {
        &mut self.tracks
    }

    /// Replace the mode of a track, resetting its contents.
    pub fn set_track_mode(&mut self, index: usize, mode_index: u8) {
        debug_assert!(index < TRACK_COUNT);
        self.tracks[index] = Track::from_mode_index(mode_index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_project_has_note_tracks() {
        let project = Project::default();
        assert_eq!(project.tracks().len(), TRACK_COUNT);
        assert!(project.track(0).note().is_some());
    }

    #[test]
    fn track_mode_switch() {
        let mut project = Project::default();
        project.set_track_mode(2, 1);
        assert!(project.track(2).curve().is_some());
        project.set_track_mode(2, 2);
        assert!(project.track(2).midi_cv().is_some());
    }

    #[test]
    fn selected_track_clamps() {
        let mut project = Project::default();
        project.set_selected_track(99);
        assert_eq!(project.selected_track(), TRACK_COUNT - 1);
    }

    #[test]
    fn name_truncates() {
        let mut project = Project::new("a very long project name indeed");
        assert!(project.name().len() <= 16);
        project.set_name("short");
        assert_eq!(project.name(), "short");
    }
}
