//! Output sinks consumed by the engine.

/// Mirror of the gate/CV outputs towards a MIDI transport. Implementations
/// must enqueue rather than block; the engine calls these from the tick
/// context.
pub trait MidiOutputSink {
    fn send_gate(&mut self, track: usize, gate: bool);
    fn send_cv(&mut self, track: usize, volts: f32);
    fn send_slide(&mut self, track: usize, slide: bool);
}

/// A sink that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullMidiOutput;

impl MidiOutputSink for NullMidiOutput {
    fn send_gate(&mut self, _track: usize, _gate: bool) {}
    fn send_cv(&mut self, _track: usize, _volts: f32) {}
    fn send_slide(&mut self, _track: usize, _slide: bool) {}
}
