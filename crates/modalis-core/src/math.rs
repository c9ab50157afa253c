//! Mathematical utility functions for modal synthesis.
//!
//! All functions are allocation-free and suitable for `no_std`.
//!
//! # Level and Pitch Conversions
//!
//! - [`db_to_linear`] - Decibels to linear gain
//! - [`pitch_to_ratio`] / [`pitch_to_ratio_clamped`] - Semitone shift to frequency ratio
//! - [`low_pass_db_to_linear`] - Per-frequency gain of a dB/decade style roll-off
//!
//! # Utilities
//!
//! - [`lerp`] - Linear interpolation
//! - [`positive_mod`] - Modulo that never returns a negative value
//! - [`flush_denormal`] - Flush tiny values to zero

use libm::{expf, powf};

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use modalis_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert a pitch shift in semitones to a frequency ratio.
///
/// ```text
/// ratio = 2^(semitones / 12)
/// ```
#[inline]
pub fn pitch_to_ratio(semitones: f32) -> f32 {
    powf(2.0, semitones / 12.0)
}

/// Clamp a pitch shift to `[min, max]` semitones, then convert it to a ratio.
#[inline]
pub fn pitch_to_ratio_clamped(semitones: f32, min: f32, max: f32) -> f32 {
    pitch_to_ratio(semitones.clamp(min, max))
}

/// Gain of a low-pass roll-off evaluated at `freq`.
///
/// Frequencies at or below `cutoff` pass unchanged. Above the cutoff the
/// gain follows the slope given in dB (negative values attenuate):
///
/// ```text
/// gain = (freq / cutoff)^(falloff_db / 20)   for freq > cutoff
/// gain = 1                                   otherwise
/// ```
#[inline]
pub fn low_pass_db_to_linear(freq: f32, cutoff: f32, falloff_db: f32) -> f32 {
    if freq > cutoff {
        powf(freq / cutoff, falloff_db / 20.0)
    } else {
        1.0
    }
}

/// Linear interpolation between `a` and `b`.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Remainder of `value / modulus` mapped into `[0, modulus)`.
///
/// `modulus` must be positive.
#[inline]
pub fn positive_mod(value: i32, modulus: i32) -> i32 {
    (modulus + value % modulus) % modulus
}

/// Flush subnormal-range values to zero.
///
/// Modal recursions decay toward zero forever; without flushing, long tails
/// end up in the subnormal range where some CPUs slow down dramatically.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_to_linear() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_linear(20.0) - 10.0).abs() < 1e-4);
        assert!((db_to_linear(-20.0) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_pitch_to_ratio() {
        assert!((pitch_to_ratio(0.0) - 1.0).abs() < 1e-6);
        assert!((pitch_to_ratio(12.0) - 2.0).abs() < 1e-5);
        assert!((pitch_to_ratio(-12.0) - 0.5).abs() < 1e-6);
        assert!((pitch_to_ratio_clamped(48.0, -24.0, 24.0) - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_low_pass_db_to_linear() {
        assert_eq!(low_pass_db_to_linear(500.0, 1000.0, -12.0), 1.0);
        assert_eq!(low_pass_db_to_linear(1000.0, 1000.0, -12.0), 1.0);
        // One decade above cutoff at -20 dB/decade is a tenth
        let g = low_pass_db_to_linear(10_000.0, 1000.0, -20.0);
        assert!((g - 0.1).abs() < 1e-5, "got {g}");
    }

    #[test]
    fn test_positive_mod() {
        assert_eq!(positive_mod(5, 4), 1);
        assert_eq!(positive_mod(-1, 4), 3);
        assert_eq!(positive_mod(-8, 4), 0);
    }

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(0.0, 10.0, 0.0), 0.0);
        assert_eq!(lerp(0.0, 10.0, 0.5), 5.0);
        assert_eq!(lerp(2.0, 4.0, 1.0), 4.0);
    }

    #[test]
    fn test_flush_denormal() {
        assert_eq!(flush_denormal(1.0), 1.0);
        assert_eq!(flush_denormal(1e-10), 1e-10);
        assert_eq!(flush_denormal(1e-21), 0.0);
        assert_eq!(flush_denormal(-1e-38), 0.0);
    }
}
