//! Lock-free handoff from the MIDI input callback to the tick context.
//!
//! The transport driver owns the producer half and pushes timestamped
//! messages from its callback; the engine drains the consumer half at the
//! start of each tick. Single producer, single consumer, no locking.

use gs_model::MidiMessage;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// A MIDI message stamped with the tick it arrived on.
#[derive(Clone, Copy, Debug)]
pub struct TimedMidi {
    pub tick: u32,
    pub message: MidiMessage,
}

/// Producer half, owned by the MIDI input callback.
pub struct MidiInputProducer {
    producer: HeapProd<TimedMidi>,
}

impl MidiInputProducer {
    /// Push a message; returns false if the queue is full.
    pub fn push(&mut self, tick: u32, message: MidiMessage) -> bool {
        self.producer.try_push(TimedMidi { tick, message }).is_ok()
    }
}

/// Consumer half, owned by the engine.
pub struct MidiInputConsumer {
    consumer: HeapCons<TimedMidi>,
}

impl MidiInputConsumer {
    pub fn pop(&mut self) -> Option<TimedMidi> {
        self.consumer.try_pop()
    }
}

/// Create a connected producer/consumer pair.
pub fn midi_input_queue(capacity: usize) -> (MidiInputProducer, MidiInputConsumer) {
    let (producer, consumer) = HeapRb::new(capacity).split();
    (
        MidiInputProducer { producer },
        MidiInputConsumer { consumer },
    )
}
