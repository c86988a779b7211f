//! Track linking.
//!
//! After its own advance, each engine publishes a snapshot of its timing
//! state. A follower track (configured with a leader index, never a
//! reference) copies the snapshot and reuses the cursor instead of
//! advancing its own, so linked tracks share an identical step cursor and
//! iteration count. The engine ticks tracks in index order and only
//! earlier tracks are valid leaders, so a follower always reads data
//! published in the same pass.

use crate::sequence_state::SequenceState;

/// Published timing snapshot of a leader track.
#[derive(Clone, Copy, Debug)]
pub struct LinkData {
    /// Ticks per step at master resolution.
    pub divisor: u32,
    /// Tick position inside the leader's reset window.
    pub relative_tick: u32,
    /// The leader's cursor after its advance.
    pub sequence_state: SequenceState,
}

impl Default for LinkData {
    fn default() -> Self {
        Self {
            divisor: 1,
            relative_tick: 0,
            sequence_state: SequenceState::new(),
        }
    }
}
