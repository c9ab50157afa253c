//! Uniformly sampled lookup curves.
//!
//! A [`Curve`] is a precomputed, read-only table of `f32` values sampled at a
//! fixed step over `[min_x, max_x]`. Synthesizers use curves for
//! frequency-dependent gains, velocity remapping and the per-state shapes of
//! the two-state force generator.
//!
//! Curves are immutable once built and are shared between synth instances
//! through `Arc<Curve>`; nothing on the audio path mutates them.
//!
//! ## Lookup modes
//!
//! | Method | Outside domain | Between samples |
//! |--------|----------------|-----------------|
//! | [`value_interp`](Curve::value_interp) | clamps to first/last sample | linear |
//! | [`value_nearest`](Curve::value_nearest) | clamps | nearest sample |
//! | [`fill_cyclic_interp`](Curve::fill_cyclic_interp) | wraps (below `min_x` renders silence) | linear |

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use libm::{floorf, fmodf, roundf};

use crate::math::lerp;

/// Tolerance used when comparing curve domains.
pub const DOMAIN_TOLERANCE: f32 = 1e-5;

/// Read-only uniformly sampled curve.
///
/// # Example
///
/// ```rust
/// use modalis_core::Curve;
///
/// let ramp = Curve::from_samples(vec![0.0, 1.0, 2.0], 0.0, 1.0);
/// assert_eq!(ramp.value_interp(0.25), 0.5);
/// assert_eq!(ramp.value_interp(5.0), 2.0);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Curve {
    data: Vec<f32>,
    min_x: f32,
    max_x: f32,
    step: f32,
}

impl Curve {
    /// Wrap already-sampled values covering `[min_x, max_x]`.
    ///
    /// A single value produces a constant curve (`step == 0`).
    pub fn from_samples(data: Vec<f32>, min_x: f32, max_x: f32) -> Self {
        let step = if data.len() < 2 {
            0.0
        } else {
            (max_x - min_x) / (data.len() - 1) as f32
        };
        #[cfg(feature = "tracing")]
        {
            if data.len() < 2 {
                tracing::warn!(
                    num_values = data.len(),
                    "curve has fewer than two values; lookups return a constant"
                );
            }
        }
        Self {
            data,
            min_x,
            max_x,
            step,
        }
    }

    /// Bake `f` at `num_points` uniformly spaced positions over `[min_x, max_x]`.
    pub fn from_fn(min_x: f32, max_x: f32, num_points: usize, f: impl Fn(f32) -> f32) -> Self {
        let n = num_points.max(1);
        let step = if n < 2 {
            0.0
        } else {
            (max_x - min_x) / (n - 1) as f32
        };
        let data = (0..n).map(|i| f(min_x + step * i as f32)).collect();
        Self::from_samples(data, min_x, max_x)
    }

    /// Bake a piecewise-linear curve through `(x, y)` keys.
    ///
    /// Keys must be sorted by `x`. With no keys the curve is `default_y`
    /// everywhere over `[0, 0]`.
    pub fn from_keys(keys: &[(f32, f32)], num_points: usize, default_y: f32) -> Self {
        let (Some(&(first_x, _)), Some(&(last_x, _))) = (keys.first(), keys.last()) else {
            return Self::from_samples(alloc_filled(num_points.max(1), default_y), 0.0, 0.0);
        };
        Self::from_fn(first_x, last_x, num_points, |x| eval_keys(keys, x))
    }

    /// Sampled values.
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the curve holds no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Start of the domain.
    #[inline]
    pub fn min_x(&self) -> f32 {
        self.min_x
    }

    /// End of the domain.
    #[inline]
    pub fn max_x(&self) -> f32 {
        self.max_x
    }

    /// Distance between consecutive samples.
    #[inline]
    pub fn step(&self) -> f32 {
        self.step
    }

    /// True when the domain is `[start, end]` within [`DOMAIN_TOLERANCE`].
    pub fn is_x_range_match(&self, start: f32, end: f32) -> bool {
        (self.min_x - start).abs() <= DOMAIN_TOLERANCE && (self.max_x - end).abs() <= DOMAIN_TOLERANCE
    }

    /// Linearly interpolated value at `x`, clamped to the first/last sample.
    pub fn value_interp(&self, x: f32) -> f32 {
        let Some(&first) = self.data.first() else {
            return 0.0;
        };
        if self.step == 0.0 {
            return first;
        }
        let x = x - self.min_x;
        if x <= 0.0 {
            return first;
        }
        let bin = x / self.step;
        let last = self.data.len() - 1;
        let index = (bin as usize).min(last);
        if index == last {
            return self.data[last];
        }
        lerp(self.data[index], self.data[index + 1], bin - index as f32)
    }

    /// Value of the sample nearest to `x`, clamped to the domain.
    pub fn value_nearest(&self, x: f32) -> f32 {
        let Some(&first) = self.data.first() else {
            return 0.0;
        };
        if self.step == 0.0 {
            return first;
        }
        let index = roundf((x - self.min_x) / self.step).max(0.0) as usize;
        self.data[index.min(self.data.len() - 1)]
    }

    /// Value at integer key `key`, where key `round(min_x)` is sample 0.
    ///
    /// Used for per-MIDI-note tables whose domain starts at the first note.
    pub fn value_by_key_index(&self, key: i32) -> f32 {
        self.value_by_array_index(key - roundf(self.min_x) as i32)
    }

    /// Sample at `index`, clamped to the table.
    pub fn value_by_array_index(&self, index: i32) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let index = index.clamp(0, self.data.len() as i32 - 1) as usize;
        self.data[index]
    }

    /// Fill `out` by walking the curve cyclically from `start_x` in steps of `x_step`.
    ///
    /// The last `remove_last` samples are excluded from the cycle, so a curve
    /// whose last sample repeats its first loops seamlessly with
    /// `remove_last = 1`.
    ///
    /// `out` is zeroed when the curve has no step, no data, or when
    /// `start_x < min_x`. A single-valued curve fills `out` with that value.
    pub fn fill_cyclic_interp(&self, start_x: f32, x_step: f32, out: &mut [f32], remove_last: usize) {
        if self.step <= 0.0 || self.data.is_empty() {
            out.fill(0.0);
            return;
        }
        if self.data.len() == 1 {
            out.fill(self.data[0]);
            return;
        }
        let start_x = start_x - self.min_x;
        if start_x < 0.0 {
            out.fill(0.0);
            return;
        }

        let cycle_len = self.data.len().saturating_sub(remove_last).max(1);
        let cycle = cycle_len as f32;
        let bin_step = x_step / self.step;
        let start_bin = fmodf(start_x / self.step, cycle);
        for (k, sample) in out.iter_mut().enumerate() {
            // Positions come from the block start; summed steps drift on long blocks
            let mut bin = fmodf(start_bin + k as f32 * bin_step, cycle);
            if bin < 0.0 {
                bin += cycle;
            }
            let left_bin = floorf(bin);
            let frac = bin - left_bin;
            let left = left_bin as usize % cycle_len;
            let right = (left + 1) % cycle_len;
            *sample = lerp(self.data[left], self.data[right], frac);
        }
    }
}

fn alloc_filled(n: usize, value: f32) -> Vec<f32> {
    let mut v = Vec::with_capacity(n);
    v.resize(n, value);
    v
}

fn eval_keys(keys: &[(f32, f32)], x: f32) -> f32 {
    let upper = keys.partition_point(|&(kx, _)| kx <= x);
    if upper == 0 {
        return keys[0].1;
    }
    if upper == keys.len() {
        return keys[keys.len() - 1].1;
    }
    let (x0, y0) = keys[upper - 1];
    let (x1, y1) = keys[upper];
    if x1 <= x0 {
        return y1;
    }
    lerp(y0, y1, (x - x0) / (x1 - x0))
}
