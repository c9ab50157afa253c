//! Control-rate helpers evaluated once per audio block.
//!
//! Game-side values such as vehicle RPM or liquid flow arrive at frame rate,
//! which is usually slower and less regular than the audio block rate. These
//! helpers turn such values into smooth block-rate controls:
//!
//! - [`InterpPerFrame`] - slew-limited approach to a target, rate expressed
//!   per caller frame
//! - [`VelocityTracker`] - rate of change of a value, averaged over the last
//!   few changes

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Slew-limited interpolation toward a target value.
///
/// Each block the value moves toward the target by at most
/// `increment·steps` upward or `decrement·steps` downward, where
/// `steps = block_time / max(1e-5, frame_time)` is how many caller frames fit
/// in one audio block.
///
/// # Example
///
/// ```rust
/// use modalis_core::InterpPerFrame;
///
/// // Rise 1 unit per 0.1 s frame, audio blocks of 0.01 s
/// let mut rpm = InterpPerFrame::new(0.0, 1.0, 1.0);
/// let v = rpm.advance(10.0, 0.1, 0.01);
/// assert!((v - 0.1).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpPerFrame {
    value: f32,
    increment: f32,
    decrement: f32,
}

impl InterpPerFrame {
    /// Start at `initial`, moving at most `increment`/`decrement` per frame.
    pub fn new(initial: f32, increment: f32, decrement: f32) -> Self {
        Self {
            value: initial,
            increment,
            decrement,
        }
    }

    /// Change the per-frame slew limits.
    pub fn set_rates(&mut self, increment: f32, decrement: f32) {
        self.increment = increment;
        self.decrement = decrement;
    }

    /// Current value.
    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Jump straight to `value`.
    pub fn reset(&mut self, value: f32) {
        self.value = value;
    }

    /// Advance one audio block toward `target` and return the new value.
    pub fn advance(&mut self, target: f32, frame_time: f32, block_time: f32) -> f32 {
        let steps = block_time / frame_time.max(1e-5);
        let max_step = self.increment * steps;
        let min_step = -self.decrement * steps;
        // min_step <= max_step only holds for non-negative rates
        let delta = (target - self.value).max(min_step).min(max_step);
        self.value += delta;
        self.value
    }
}

/// Rate of change of a control value sampled once per block.
///
/// The velocity is computed whenever the value changes, dividing by the time
/// since the previous change. If the value stays constant for at least the
/// standstill duration, all velocities drop to zero.
#[derive(Debug, Clone)]
pub struct VelocityTracker {
    history: Vec<f32>,
    cursor: usize,
    block_time: f32,
    prev_value: f32,
    blocks_since_change: u32,
    average: f32,
    current: f32,
    sign_changed: bool,
}

impl VelocityTracker {
    /// Average over the last `num_average` changes, with blocks of `block_time` seconds.
    pub fn new(num_average: usize, block_time: f32) -> Self {
        let mut history = Vec::new();
        history.resize(num_average.max(1), 0.0);
        Self {
            history,
            cursor: 0,
            block_time: block_time.max(1e-5),
            prev_value: 0.0,
            blocks_since_change: 0,
            average: 0.0,
            current: 0.0,
            sign_changed: false,
        }
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        self.history.fill(0.0);
        self.cursor = 0;
        self.blocks_since_change = 0;
        self.average = 0.0;
        self.current = 0.0;
        self.sign_changed = false;
    }

    /// Feed this block's value.
    pub fn update(&mut self, value: f32, standstill_duration: f32) {
        if self.blocks_since_change == 0 {
            self.prev_value = value;
            self.blocks_since_change = 1;
            return;
        }

        let elapsed = self.blocks_since_change as f32 * self.block_time;
        if value == self.prev_value {
            self.sign_changed = false;
            if elapsed >= standstill_duration {
                self.history.fill(0.0);
                self.cursor = 0;
                self.average = 0.0;
                self.current = 0.0;
                self.blocks_since_change = 1;
            } else {
                self.blocks_since_change += 1;
            }
            return;
        }

        let velocity = (value - self.prev_value) / elapsed;
        let n = self.history.len() as f32;
        self.average = (self.average * n - self.history[self.cursor] + velocity) / n;
        self.sign_changed = self.current * velocity < 0.0;
        self.current = velocity;
        self.history[self.cursor] = velocity;
        self.cursor = (self.cursor + 1) % self.history.len();
        self.prev_value = value;
        self.blocks_since_change = 1;
    }

    /// Velocity averaged over the last changes.
    #[inline]
    pub fn average(&self) -> f32 {
        self.average
    }

    /// Most recent velocity.
    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    /// True when the last change reversed direction.
    #[inline]
    pub fn sign_changed(&self) -> bool {
        self.sign_changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interp_is_slew_limited_both_ways() {
        let mut p = InterpPerFrame::new(0.0, 2.0, 1.0);
        // One frame per block: +2 max
        assert_eq!(p.advance(10.0, 0.01, 0.01), 2.0);
        assert_eq!(p.advance(10.0, 0.01, 0.01), 4.0);
        // Down at most 1
        assert_eq!(p.advance(-10.0, 0.01, 0.01), 3.0);
    }

    #[test]
    fn interp_reaches_close_target_exactly() {
        let mut p = InterpPerFrame::new(1.0, 5.0, 5.0);
        assert_eq!(p.advance(1.5, 0.01, 0.01), 1.5);
    }

    #[test]
    fn interp_guards_zero_frame_time() {
        let mut p = InterpPerFrame::new(0.0, 1.0, 1.0);
        let v = p.advance(1e9, 0.0, 0.01);
        assert!(v.is_finite());
        assert!((v - 1000.0).abs() < 0.1, "got {v}");
    }

    #[test]
    fn velocity_first_update_only_primes() {
        let mut v = VelocityTracker::new(4, 0.01);
        v.update(5.0, 0.1);
        assert_eq!(v.current(), 0.0);
        assert_eq!(v.average(), 0.0);
    }

    #[test]
    fn velocity_of_ramp() {
        let mut v = VelocityTracker::new(2, 0.01);
        v.update(0.0, 1.0);
        v.update(1.0, 1.0);
        assert!((v.current() - 100.0).abs() < 1e-3);
        assert!((v.average() - 50.0).abs() < 1e-3);
        v.update(2.0, 1.0);
        assert!((v.average() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn velocity_sign_change_detected() {
        let mut v = VelocityTracker::new(2, 0.01);
        v.update(0.0, 1.0);
        v.update(1.0, 1.0);
        assert!(!v.sign_changed());
        v.update(0.5, 1.0);
        assert!(v.sign_changed());
        assert!(v.current() < 0.0);
    }

    #[test]
    fn velocity_standstill_resets() {
        let mut v = VelocityTracker::new(2, 0.01);
        v.update(0.0, 0.02);
        v.update(1.0, 0.02);
        v.update(1.0, 0.02);
        v.update(1.0, 0.02);
        assert_eq!(v.current(), 0.0);
        assert_eq!(v.average(), 0.0);
    }
}
