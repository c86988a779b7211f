//! Per-track sequence cursor.

use gs_model::RunMode;

use crate::rng::SeqRng;

/// Position state of one sequence: current and previous step, completed
/// iteration count and ping-pong travel direction.
///
/// A step of `-1` means no step has been played since the last reset.
#[derive(Clone, Copy, Debug)]
pub struct SequenceState {
    step: i16,
    prev_step: i16,
    iteration: u32,
    direction: i8,
    free_advances: u32,
}

impl Default for SequenceState {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceState {
    pub fn new() -> Self {
        Self {
            step: -1,
            prev_step: -1,
            iteration: 0,
            direction: 1,
            free_advances: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn step(&self) -> i32 {
        i32::from(self.step)
    }

    pub fn prev_step(&self) -> i32 {
        i32::from(self.prev_step)
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Place the cursor at the position implied by the global step counter.
    /// Used when the track is clock-aligned.
    pub fn advance_aligned(
        &mut self,
        absolute_step: u32,
        run_mode: RunMode,
        first: i32,
        last: i32,
        rng: &mut SeqRng,
    ) {
        debug_assert!(first <= last);
        let count = (last - first + 1) as u32;
        self.prev_step = self.step;

        match run_mode {
            RunMode::Forward => {
                self.step = (first + (absolute_step % count) as i32) as i16;
                self.iteration = absolute_step / count;
            }
            RunMode::Backward => {
                self.step = (last - (absolute_step % count) as i32) as i16;
                self.iteration = absolute_step / count;
            }
            RunMode::PingPong => {
                // Endpoints play once: the cycle is 2n - 2 steps long.
                let period = if count > 1 { 2 * count - 2 } else { 1 };
                let index = absolute_step % period;
                let offset = if index < count { index } else { period - index };
                self.step = (first + offset as i32) as i16;
                self.iteration = absolute_step / period;
            }
            RunMode::PingPongRepeat => {
                // Endpoints play twice: the cycle is 2n steps long.
                let period = 2 * count;
                let index = absolute_step % period;
                let offset = if index < count { index as i32 } else { (period - 1 - index) as i32 };
                self.step = (first + offset) as i16;
                self.iteration = absolute_step / period;
            }
            RunMode::Random => {
                self.step = (first + rng.next_range(count) as i32) as i16;
                self.iteration = absolute_step / count;
            }
            RunMode::RandomWalk => {
                self.random_walk(first, last, rng);
                self.iteration = absolute_step / count;
            }
        }
    }

    /// Advance relative to the previous cursor. Used when the track runs
    /// independently of the global clock.
    pub fn advance_free(&mut self, run_mode: RunMode, first: i32, last: i32, rng: &mut SeqRng) {
        debug_assert!(first <= last);
        let count = last - first + 1;
        self.prev_step = self.step;

        if self.step < 0 {
            self.step = match run_mode {
                RunMode::Backward => last as i16,
                RunMode::Random | RunMode::RandomWalk => {
                    (first + rng.next_range(count as u32) as i32) as i16
                }
                _ => first as i16,
            };
            self.direction = 1;
            return;
        }

        // The range may have changed since the last advance.
        let step = self.step().clamp(first, last);

        match run_mode {
            RunMode::Forward => {
                if step >= last {
                    self.step = first as i16;
                    self.iteration += 1;
                } else {
                    self.step = (step + 1) as i16;
                }
            }
            RunMode::Backward => {
                if step <= first {
                    self.step = last as i16;
                    self.iteration += 1;
                } else {
                    self.step = (step - 1) as i16;
                }
            }
            RunMode::PingPong => {
                if count == 1 {
                    self.step = first as i16;
                } else if self.direction > 0 {
                    if step >= last {
                        self.direction = -1;
                        self.step = (step - 1) as i16;
                    } else {
                        self.step = (step + 1) as i16;
                    }
                } else if step <= first {
                    self.direction = 1;
                    self.step = (step + 1) as i16;
                    self.iteration += 1;
                } else {
                    self.step = (step - 1) as i16;
                }
            }
            RunMode::PingPongRepeat => {
                if count == 1 {
                    self.step = first as i16;
                } else if self.direction > 0 {
                    if step >= last {
                        // Stay put once so the endpoint plays twice.
                        self.direction = -1;
                        self.step = step as i16;
                    } else {
                        self.step = (step + 1) as i16;
                    }
                } else if step <= first {
                    self.direction = 1;
                    self.step = step as i16;
                    self.iteration += 1;
                } else {
                    self.step = (step - 1) as i16;
                }
            }
            RunMode::Random => {
                self.step = (first + rng.next_range(count as u32) as i32) as i16;
                self.count_free_advance(count as u32);
            }
            RunMode::RandomWalk => {
                self.random_walk(first, last, rng);
                self.count_free_advance(count as u32);
            }
        }
    }

    fn count_free_advance(&mut self, count: u32) {
        self.free_advances += 1;
        if self.free_advances % count == 0 {
            self.iteration += 1;
        }
    }

    fn random_walk(&mut self, first: i32, last: i32, rng: &mut SeqRng) {
        let count = (last - first + 1) as u32;
        if self.step < 0 || self.step() < first || self.step() > last {
            self.step = (first + rng.next_range(count) as i32) as i16;
            return;
        }
        if count == 1 {
            return;
        }
        let delta = if rng.next_range(2) == 0 { -1 } else { 1 };
        let mut next = self.step() + delta;
        if next < first || next > last {
            // Reflect at the range edge.
            next = self.step() - delta;
        }
        self.step = next as i16;
    }
}

/// Rotate a step index inside `[first, last]` by `rotate` positions,
/// wrapping at the range edges. Negative cursors pass through untouched.
pub fn rotate_step(step: i32, first: i32, last: i32, rotate: i32) -> i32 {
    if step < 0 {
        return step;
    }
    let count = last - first + 1;
    first + (step - first + rotate).rem_euclid(count)
}
