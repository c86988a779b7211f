//! Allocation-free tick path tests.
//!
//! The tick and update paths must never touch the heap: all per-track
//! storage is statically sized. These tests drive a busy project for
//! several bars and abort on any allocation.
//!
//! Just run `cargo test` — no feature flags needed.

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

use gs_engine::{Engine, NullMidiOutput};
use gs_model::{MidiMessage, NotePriority, Project, Shape};

/// A project exercising all three engine kinds with retriggers, fills
/// and an arpeggiator.
fn busy_project() -> Project {
    let mut project = Project::new("busy");

    {
        let track = project.track_mut(0).note_mut().unwrap();
        track.set_slide_time(30);
        let sequence = track.sequence_mut(0);
        sequence.set_divisor(6);
        for i in 0..16 {
            let step = sequence.step_mut(i);
            step.set_gate(true);
            step.set_note(i as i32 - 8);
            step.set_retrigger((i % 4) as i32);
            step.set_slide(i % 3 == 0);
            step.set_note_variation_range(5);
        }
    }

    project.set_track_mode(1, 1);
    {
        let track = project.track_mut(1).curve_mut().unwrap();
        let sequence = track.sequence_mut(0);
        sequence.set_divisor(12);
        for i in 0..16 {
            let step = sequence.step_mut(i);
            step.set_shape(Shape::Triangle);
            step.set_gate(0b1001);
        }
    }

    project.set_track_mode(2, 2);
    {
        let track = project.track_mut(2).midi_cv_mut().unwrap();
        track.set_voices(4);
        track.set_note_priority(NotePriority::LastNote);
        track.set_retrigger(true);
        track.arpeggiator_mut().set_enabled(true);
        track.arpeggiator_mut().set_divisor(6);
    }

    project
}

#[test]
fn tick_and_update_alloc_free() {
    let mut engine = Engine::new(busy_project());
    engine.set_running(true);
    let mut sink = NullMidiOutput;

    // Hold a chord so the arpeggiator and voice allocator do real work.
    for note in [48u8, 52, 55, 59] {
        engine.receive_midi(0, &MidiMessage::NoteOn { channel: 0, note, velocity: 100 });
    }

    assert_no_alloc(|| {
        for tick in 0..gs_model::PPQN * 16 {
            engine.tick(tick, &mut sink);
            if tick % 8 == 0 {
                engine.update(0.001);
            }
        }
    });
}

#[test]
fn midi_routing_alloc_free() {
    let mut engine = Engine::new(busy_project());
    engine.set_running(true);
    let mut sink = NullMidiOutput;

    assert_no_alloc(|| {
        for tick in 0..gs_model::PPQN * 4 {
            if tick % 96 == 0 {
                let note = 48 + (tick / 96) as u8 % 12;
                engine.receive_midi(tick, &MidiMessage::NoteOn { channel: 0, note, velocity: 90 });
            }
            if tick % 96 == 48 {
                let note = 48 + (tick / 96) as u8 % 12;
                engine.receive_midi(tick, &MidiMessage::NoteOff { channel: 0, note });
            }
            engine.tick(tick, &mut sink);
        }
    });
}
