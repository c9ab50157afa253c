//! Strike attack envelope.
//!
//! A fixed 10 ms rise, tabulated at 1 kHz and resampled linearly to the
//! render rate. Key synths and the hammer multiply their first samples by it.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Attack envelope sampled at [`ATTACK_TABLE_RATE`].
pub const ATTACK_TABLE: [f32; 11] = [
    0.0, 0.02720551, 0.05071795, 0.08245643, 0.12529889, 0.16313016, 0.26119421, 0.40656966,
    0.54881164, 0.74081822, 1.0,
];

/// Sample rate of [`ATTACK_TABLE`] in Hz.
pub const ATTACK_TABLE_RATE: f32 = 1000.0;

/// Resample the attack envelope to `sample_rate`.
///
/// The result spans the same 10 ms and ends just before the final 1.0.
pub fn attack_curve(sample_rate: f32) -> Vec<f32> {
    let last = ATTACK_TABLE.len() - 1;
    let len = (sample_rate / ATTACK_TABLE_RATE * last as f32).max(0.0) as usize;
    let step = ATTACK_TABLE_RATE / sample_rate;

    (0..len)
        .map(|i| {
            let pos = i as f32 * step;
            let low = (pos as usize).min(last - 1);
            let frac = pos - low as f32;
            ATTACK_TABLE[low] * (1.0 - frac) + ATTACK_TABLE[low + 1] * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_ten_milliseconds() {
        assert_eq!(attack_curve(48000.0).len(), 480);
        assert_eq!(attack_curve(44100.0).len(), 441);
    }

    #[test]
    fn rises_monotonically_from_zero() {
        let curve = attack_curve(48000.0);
        assert_eq!(curve[0], 0.0);
        assert!(curve.windows(2).all(|w| w[1] >= w[0]));
        assert!(curve[479] < 1.0 && curve[479] > 0.7);
    }

    #[test]
    fn hits_table_points() {
        let curve = attack_curve(48000.0);
        for (k, &v) in ATTACK_TABLE.iter().enumerate().take(10) {
            assert!((curve[k * 48] - v).abs() < 1e-5, "point {k}");
        }
    }
}
