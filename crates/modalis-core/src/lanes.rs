//! Lane-width grouping for modal oscillator arrays.
//!
//! Modal state lives in parallel `f32` arrays that are processed in fixed
//! groups of [`LANES`] oscillators. Active counts are always a multiple of
//! the lane width and unused lanes are kept at zero, so per-group reductions
//! and the recursion loops never need a scalar tail.
//!
//! The scans here decide how many oscillators are still audible:
//!
//! - [`count_active_from_top`] walks down from the end of the active range
//!   and stops at the first group that still carries energy. Anything above
//!   is treated as silent.
//! - [`validate_active`] walks up from the start, zeroing unstable lanes
//!   (`|y| > 1`) and stopping at the first quiet group.
//!
//! Both treat oscillators below a fixed absolute threshold as silent
//! regardless of downstream gain staging. That is an intentional CPU/quality
//! tradeoff.

/// Number of oscillators processed together in one group.
pub const LANES: usize = 4;

/// Round `n` up to the next multiple of [`LANES`].
///
/// ```rust
/// use modalis_core::fit_to_lanes;
///
/// assert_eq!(fit_to_lanes(0), 0);
/// assert_eq!(fit_to_lanes(1), 4);
/// assert_eq!(fit_to_lanes(8), 8);
/// assert_eq!(fit_to_lanes(9), 12);
/// ```
#[inline]
pub const fn fit_to_lanes(n: usize) -> usize {
    n.div_ceil(LANES) * LANES
}

#[inline]
fn group_magnitude(y1: &[f32], y2: &[f32]) -> f32 {
    y1.iter().zip(y2).map(|(a, b)| a.abs() + b.abs()).sum()
}

/// Number of oscillators still carrying energy, scanning groups from the top.
///
/// Starting at the last group below `current`, returns the end of the first
/// group whose summed `|y1| + |y2|` exceeds `strength_min`, or 0 when every
/// group is below it. `current` must be a multiple of [`LANES`] and no larger
/// than either slice.
pub fn count_active_from_top(current: usize, y1: &[f32], y2: &[f32], strength_min: f32) -> usize {
    let mut end = current;
    while end >= LANES {
        let start = end - LANES;
        if group_magnitude(&y1[start..end], &y2[start..end]) > strength_min {
            return end;
        }
        end = start;
    }
    0
}

/// Number of leading oscillator groups that are stable and audible.
///
/// Any lane with `|y| > 1` is considered unstable and zeroed in place. The
/// scan stops at the first group whose remaining magnitude falls below
/// `strength_min`.
pub fn validate_active(current: usize, y1: &mut [f32], y2: &mut [f32], strength_min: f32) -> usize {
    let mut count = 0;
    while count + LANES <= current {
        let range = count..count + LANES;
        let mut sum = 0.0;
        for y in y1[range.clone()].iter_mut().chain(y2[range].iter_mut()) {
            if y.abs() > 1.0 {
                *y = 0.0;
            }
            sum += y.abs();
        }
        if sum < strength_min {
            break;
        }
        count += LANES;
    }
    count
}

/// Zero oscillator state in `start..end`.
pub fn zero_range(start: usize, end: usize, y1: &mut [f32], y2: &mut [f32]) {
    y1[start..end].fill(0.0);
    y2[start..end].fill(0.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_rounds_up_to_lane_multiple() {
        for n in 0..64 {
            let fitted = fit_to_lanes(n);
            assert_eq!(fitted % LANES, 0);
            assert!(fitted >= n && fitted < n + LANES);
        }
    }

    #[test]
    fn top_scan_stops_at_loud_group() {
        let mut y1 = [0.0f32; 12];
        let y2 = [0.0f32; 12];
        y1[5] = 0.5;
        assert_eq!(count_active_from_top(12, &y1, &y2, 1e-4), 8);
    }

    #[test]
    fn top_scan_of_silence_is_zero() {
        let y1 = [1e-6f32; 8];
        let y2 = [1e-6f32; 8];
        assert_eq!(count_active_from_top(8, &y1, &y2, 1e-4), 0);
    }

    #[test]
    fn top_scan_keeps_quiet_groups_below_loud_one() {
        // Group 0 is quiet but group 1 is loud: both remain.
        let mut y1 = [0.0f32; 8];
        let y2 = [0.0f32; 8];
        y1[6] = 0.1;
        assert_eq!(count_active_from_top(8, &y1, &y2, 1e-4), 8);
    }

    #[test]
    fn validate_zeroes_unstable_lanes() {
        let mut y1 = [0.2f32, 1.5, 0.2, 0.2, 0.0, 0.0, 0.0, 0.0];
        let mut y2 = [0.1f32, 0.1, -3.0, 0.1, 0.0, 0.0, 0.0, 0.0];
        let n = validate_active(8, &mut y1, &mut y2, 1e-4);
        assert_eq!(n, 4, "second group is silent");
        assert_eq!(y1[1], 0.0, "unstable y1 lane zeroed");
        assert_eq!(y2[2], 0.0, "unstable y2 lane zeroed");
        assert_eq!(y1[0], 0.2);
    }

    #[test]
    fn zero_range_clears_only_range() {
        let mut y1 = [1.0f32; 8];
        let mut y2 = [1.0f32; 8];
        zero_range(4, 8, &mut y1, &mut y2);
        assert_eq!(&y1[..4], &[1.0; 4]);
        assert_eq!(&y1[4..], &[0.0; 4]);
        assert_eq!(&y2[4..], &[0.0; 4]);
    }
}
