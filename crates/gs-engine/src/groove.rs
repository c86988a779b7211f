//! Swing timing.
//!
//! Swing displaces the odd subdivisions of a quarter note. It operates on
//! absolute ticks so the phase survives reset-measure boundaries and tick
//! wrap-around.

use gs_model::PPQN;

/// Subdivision base for swing: one sixteenth note.
pub const fn swing_base() -> u32 {
    PPQN / 4
}

/// Apply swing to a tick. `amount` is in percent of the swung pair,
/// `50..=75`; 50 leaves the grid untouched.
///
/// The first sixteenth of each pair is kept; the second is delayed to
/// `period * amount / 100` and the remaining ticks are compressed
/// linearly so the function stays monotonic and periodic.
pub fn swing(tick: u32, base: u32, amount: u32) -> u32 {
    let amount = amount.clamp(50, 75);
    if amount == 50 || base == 0 {
        return tick;
    }
    let period = 2 * base;
    let phase = tick % period;
    if phase < base {
        return tick;
    }
    let pair_start = tick - phase;
    let swung = period * amount / 100;
    pair_start + swung + (phase - base) * (period - swung) / base
}

/// Apply a track's swing at the standard sixteenth-note base.
pub fn apply_swing(tick: u32, amount: u32) -> u32 {
    swing(tick, swing_base(), amount)
}
