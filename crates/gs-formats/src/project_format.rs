//! Project file payload.

use alloc::vec::Vec;

use gs_model::{
    Arpeggiator, ArpeggiatorMode, Condition, CurveFillMode, CurveSequence, CurveTrack,
    CvUpdateMode, MidiCvTrack, NoteFillMode, NotePriority, NoteSequence, NoteTrack, PlayMode,
    Project, RecordMode, RunMode, Scale, Shape, Track, VoiceConfig, VoltageRange, PATTERN_COUNT,
    STEP_COUNT, TRACK_COUNT,
};

use crate::reader::VersionedReader;
use crate::writer::VersionedWriter;
use crate::{read_header, write_header, FileType, FormatError};

/// Project file versions. Readers gate fields on these.
pub mod project_version {
    /// lowNote/highNote filter on MIDI/CV tracks.
    pub const NOTE_RANGE: u32 = 15;
    /// notePriority on MIDI/CV tracks.
    pub const NOTE_PRIORITY: u32 = 16;
    /// Version written by this build.
    pub const LATEST: u32 = 16;
}

/// Serialize a project to a complete file image.
pub fn write_project(project: &Project) -> Vec<u8> {
    let mut writer = VersionedWriter::new(project_version::LATEST);

    writer.write_str(project.name());
    writer.write_f32(project.tempo());
    writer.write_u8(project.scale().to_index());
    writer.write_u8(project.root_note() as u8);
    writer.write_u8(project.record_mode().to_index());

    for track in project.tracks() {
        writer.write_u8(track.mode_index());
        match track {
            Track::Note(track) => write_note_track(&mut writer, track),
            Track::Curve(track) => write_curve_track(&mut writer, track),
            Track::MidiCv(track) => write_midi_cv_track(&mut writer, track),
        }
    }

    let mut data = Vec::new();
    write_header(&mut data, FileType::Project);
    data.extend_from_slice(&writer.into_data());
    data
}

/// Parse a complete project file image.
pub fn read_project(data: &[u8]) -> Result<Project, FormatError> {
    let payload = read_header(data, FileType::Project)?;
    let mut reader = VersionedReader::new(payload, project_version::LATEST)?;

    let mut project = Project::default();
    let name = reader.read_str()?;
    project.set_name(&name);
    project.set_tempo(reader.read_f32()?);
    project.set_scale(Scale::from_index(reader.read_u8()?));
    project.set_root_note(i32::from(reader.read_u8()?));
    project.set_record_mode(RecordMode::from_index(reader.read_u8()?));

    for index in 0..TRACK_COUNT {
        let mode = reader.read_u8()?;
        project.set_track_mode(index, mode);
        match project.track_mut(index) {
            Track::Note(track) => read_note_track(&mut reader, track, index)?,
            Track::Curve(track) => read_curve_track(&mut reader, track, index)?,
            Track::MidiCv(track) => read_midi_cv_track(&mut reader, track)?,
        }
    }

    Ok(project)
}

fn write_note_track(writer: &mut VersionedWriter, track: &NoteTrack) {
    writer.write_u8(track.play_mode().to_index());
    writer.write_u8(track.fill_mode().to_index());
    writer.write_u8(track.cv_update_mode().to_index());
    writer.write_i8(track.octave() as i8);
    writer.write_i8(track.transpose() as i8);
    writer.write_i8(track.rotate() as i8);
    writer.write_i8(track.gate_probability_bias() as i8);
    writer.write_i8(track.retrigger_probability_bias() as i8);
    writer.write_i8(track.length_bias() as i8);
    writer.write_i8(track.note_probability_bias() as i8);
    writer.write_u8(track.slide_time() as u8);
    writer.write_u8(track.swing() as u8);
    writer.write_i8(track.link_track().map_or(-1, |t| t as i8));
    for pattern in 0..PATTERN_COUNT {
        write_note_sequence(writer, track.sequence(pattern));
    }
}

fn read_note_track(
    reader: &mut VersionedReader,
    track: &mut NoteTrack,
    track_index: usize,
) -> Result<(), FormatError> {
    track.set_play_mode(PlayMode::from_index(reader.read_u8()?));
    track.set_fill_mode(NoteFillMode::from_index(reader.read_u8()?));
    track.set_cv_update_mode(CvUpdateMode::from_index(reader.read_u8()?));
    track.set_octave(i32::from(reader.read_i8()?));
    track.set_transpose(i32::from(reader.read_i8()?));
    track.set_rotate(i32::from(reader.read_i8()?));
    track.set_gate_probability_bias(i32::from(reader.read_i8()?));
    track.set_retrigger_probability_bias(i32::from(reader.read_i8()?));
    track.set_length_bias(i32::from(reader.read_i8()?));
    track.set_note_probability_bias(i32::from(reader.read_i8()?));
    track.set_slide_time(i32::from(reader.read_u8()?));
    track.set_swing(i32::from(reader.read_u8()?));
    let link = reader.read_i8()?;
    track.set_link_track(track_index, (link >= 0).then_some(link as usize));
    for pattern in 0..PATTERN_COUNT {
        read_note_sequence(reader, track.sequence_mut(pattern))?;
    }
    Ok(())
}

fn write_note_sequence(writer: &mut VersionedWriter, sequence: &NoteSequence) {
    writer.write_u8(sequence.first_step() as u8);
    writer.write_u8(sequence.last_step() as u8);
    writer.write_u8(sequence.divisor() as u8);
    writer.write_u8(sequence.run_mode().to_index());
    writer.write_u8(sequence.reset_measure() as u8);
    writer.write_i8(sequence.scale_override().map_or(-1, |s| s.to_index() as i8));
    writer.write_i8(sequence.root_note_override().unwrap_or(-1));
    for index in 0..STEP_COUNT {
        let step = sequence.step(index);
        writer.write_bool(step.gate());
        writer.write_u8(step.gate_probability() as u8);
        writer.write_i8(step.gate_offset() as i8);
        writer.write_bool(step.slide());
        writer.write_u8(step.retrigger() as u8);
        writer.write_u8(step.retrigger_probability() as u8);
        writer.write_u8(step.length() as u8);
        writer.write_i8(step.length_variation_range() as i8);
        writer.write_u8(step.length_variation_probability() as u8);
        writer.write_i8(step.note() as i8);
        writer.write_i8(step.note_variation_range() as i8);
        writer.write_u8(step.note_variation_probability() as u8);
        writer.write_u8(step.condition().to_index());
    }
}

fn read_note_sequence(
    reader: &mut VersionedReader,
    sequence: &mut NoteSequence,
) -> Result<(), FormatError> {
    // last before first so the ordered-range clamp cannot bite.
    let first = reader.read_u8()?;
    let last = reader.read_u8()?;
    sequence.set_last_step(i32::from(last));
    sequence.set_first_step(i32::from(first));
    sequence.set_divisor(i32::from(reader.read_u8()?));
    sequence.set_run_mode(RunMode::from_index(reader.read_u8()?));
    sequence.set_reset_measure(i32::from(reader.read_u8()?));
    let scale = reader.read_i8()?;
    sequence.set_scale((scale >= 0).then(|| Scale::from_index(scale as u8)));
    let root = reader.read_i8()?;
    sequence.set_root_note((root >= 0).then_some(i32::from(root)));
    for index in 0..STEP_COUNT {
        let step = sequence.step_mut(index);
        step.set_gate(reader.read_bool()?);
        step.set_gate_probability(i32::from(reader.read_u8()?));
        step.set_gate_offset(i32::from(reader.read_i8()?));
        step.set_slide(reader.read_bool()?);
        step.set_retrigger(i32::from(reader.read_u8()?));
        step.set_retrigger_probability(i32::from(reader.read_u8()?));
        step.set_length(i32::from(reader.read_u8()?));
        step.set_length_variation_range(i32::from(reader.read_i8()?));
        step.set_length_variation_probability(i32::from(reader.read_u8()?));
        step.set_note(i32::from(reader.read_i8()?));
        step.set_note_variation_range(i32::from(reader.read_i8()?));
        step.set_note_variation_probability(i32::from(reader.read_u8()?));
        step.set_condition(Condition::from_index(reader.read_u8()?));
    }
    Ok(())
}

fn write_curve_track(writer: &mut VersionedWriter, track: &CurveTrack) {
    writer.write_u8(track.play_mode().to_index());
    writer.write_u8(track.fill_mode().to_index());
    writer.write_i8(track.rotate() as i8);
    writer.write_i8(track.shape_probability_bias() as i8);
    writer.write_i8(track.gate_probability_bias() as i8);
    writer.write_u8(track.slide_time() as u8);
    writer.write_u8(track.swing() as u8);
    writer.write_i8(track.link_track().map_or(-1, |t| t as i8));
    for pattern in 0..PATTERN_COUNT {
        write_curve_sequence(writer, track.sequence(pattern));
    }
}

fn read_curve_track(
    reader: &mut VersionedReader,
    track: &mut CurveTrack,
    track_index: usize,
) -> Result<(), FormatError> {
    track.set_play_mode(PlayMode::from_index(reader.read_u8()?));
    track.set_fill_mode(CurveFillMode::from_index(reader.read_u8()?));
    track.set_rotate(i32::from(reader.read_i8()?));
    track.set_shape_probability_bias(i32::from(reader.read_i8()?));
    track.set_gate_probability_bias(i32::from(reader.read_i8()?));
    track.set_slide_time(i32::from(reader.read_u8()?));
    track.set_swing(i32::from(reader.read_u8()?));
    let link = reader.read_i8()?;
    track.set_link_track(track_index, (link >= 0).then_some(link as usize));
    for pattern in 0..PATTERN_COUNT {
        read_curve_sequence(reader, track.sequence_mut(pattern))?;
    }
    Ok(())
}

fn write_curve_sequence(writer: &mut VersionedWriter, sequence: &CurveSequence) {
    writer.write_u8(sequence.first_step() as u8);
    writer.write_u8(sequence.last_step() as u8);
    writer.write_u8(sequence.divisor() as u8);
    writer.write_u8(sequence.run_mode().to_index());
    writer.write_u8(sequence.reset_measure() as u8);
    writer.write_u8(sequence.range().to_index());
    for index in 0..STEP_COUNT {
        let step = sequence.step(index);
        writer.write_u8(step.shape().to_index());
        writer.write_u8(step.shape_variation().to_index());
        writer.write_u8(step.shape_variation_probability() as u8);
        writer.write_u8(step.min_raw());
        writer.write_u8(step.max_raw());
        writer.write_u8(step.gate());
        writer.write_u8(step.gate_probability() as u8);
    }
}

fn read_curve_sequence(
    reader: &mut VersionedReader,
    sequence: &mut CurveSequence,
) -> Result<(), FormatError> {
    let first = reader.read_u8()?;
    let last = reader.read_u8()?;
    sequence.set_last_step(i32::from(last));
    sequence.set_first_step(i32::from(first));
    sequence.set_divisor(i32::from(reader.read_u8()?));
    sequence.set_run_mode(RunMode::from_index(reader.read_u8()?));
    sequence.set_reset_measure(i32::from(reader.read_u8()?));
    sequence.set_range(VoltageRange::from_index(reader.read_u8()?));
    for index in 0..STEP_COUNT {
        let step = sequence.step_mut(index);
        step.set_shape(Shape::from_index(reader.read_u8()?));
        step.set_shape_variation(Shape::from_index(reader.read_u8()?));
        step.set_shape_variation_probability(i32::from(reader.read_u8()?));
        let min = reader.read_u8()?;
        let max = reader.read_u8()?;
        step.set_max_raw(max);
        step.set_min_raw(min.min(max));
        step.set_gate(reader.read_u8()?);
        step.set_gate_probability(i32::from(reader.read_u8()?));
    }
    Ok(())
}

/// MIDI/CV track fields in their fixed order: source, voices, voice
/// config, note priority (v16+), note range (v15+), pitch bend range,
/// modulation range, retrigger, arpeggiator.
fn write_midi_cv_track(writer: &mut VersionedWriter, track: &MidiCvTrack) {
    writer.write_i8(track.source().channel() as i8);
    writer.write_u8(track.voices() as u8);
    writer.write_u8(track.voice_config().to_index());
    writer.write_u8(track.note_priority().to_index());
    writer.write_u8(track.low_note());
    writer.write_u8(track.high_note());
    writer.write_u8(track.pitch_bend_range() as u8);
    writer.write_u8(track.modulation_range().to_index());
    writer.write_bool(track.retrigger());
    write_arpeggiator(writer, track.arpeggiator());
}

fn read_midi_cv_track(
    reader: &mut VersionedReader,
    track: &mut MidiCvTrack,
) -> Result<(), FormatError> {
    track.source_mut().set_channel(i32::from(reader.read_i8()?));
    track.set_voices(i32::from(reader.read_u8()?));
    track.set_voice_config(VoiceConfig::from_index(reader.read_u8()?));
    let priority = reader.read_u8_since(
        project_version::NOTE_PRIORITY,
        NotePriority::LowestNote.to_index(),
    )?;
    track.set_note_priority(NotePriority::from_index(priority));
    if reader.version() >= project_version::NOTE_RANGE {
        let low = reader.read_u8()?;
        let high = reader.read_u8()?;
        track.set_high_note(i32::from(high));
        track.set_low_note(i32::from(low));
    } else {
        track.set_low_note(0);
        track.set_high_note(127);
    }
    track.set_pitch_bend_range(i32::from(reader.read_u8()?));
    track.set_modulation_range(VoltageRange::from_index(reader.read_u8()?));
    track.set_retrigger(reader.read_bool()?);
    read_arpeggiator(reader, track.arpeggiator_mut())
}

fn write_arpeggiator(writer: &mut VersionedWriter, arpeggiator: &Arpeggiator) {
    writer.write_bool(arpeggiator.enabled());
    writer.write_bool(arpeggiator.hold());
    writer.write_u8(arpeggiator.mode().to_index());
    writer.write_u8(arpeggiator.divisor() as u8);
    writer.write_u8(arpeggiator.gate_length() as u8);
    writer.write_i8(arpeggiator.octaves() as i8);
}

fn read_arpeggiator(
    reader: &mut VersionedReader,
    arpeggiator: &mut Arpeggiator,
) -> Result<(), FormatError> {
    arpeggiator.set_enabled(reader.read_bool()?);
    arpeggiator.set_hold(reader.read_bool()?);
    arpeggiator.set_mode(ArpeggiatorMode::from_index(reader.read_u8()?));
    arpeggiator.set_divisor(i32::from(reader.read_u8()?));
    arpeggiator.set_gate_length(i32::from(reader.read_u8()?));
    arpeggiator.set_octaves(i32::from(reader.read_i8()?));
    Ok(())
}
