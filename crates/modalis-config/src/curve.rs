//! Serializable curve descriptions.

use serde::{Deserialize, Serialize};

use modalis_core::Curve;

use crate::validation::{ValidationError, ValidationResult};

/// Default number of points a keyed curve is baked to.
pub const DEFAULT_CURVE_POINTS: usize = 256;

fn default_points() -> usize {
    DEFAULT_CURVE_POINTS
}

/// A curve as stored in preset and model files.
///
/// # TOML Format
///
/// ```toml
/// # Piecewise-linear through (x, y) keys, baked to `points` samples
/// [force.first.curve]
/// kind = "keys"
/// keys = [[0.0, 0.0], [0.5, 1.0], [1.0, 0.0]]
/// points = 128
///
/// # Already sampled values over [min_x, max_x]
/// [force.second.curve]
/// kind = "samples"
/// min_x = 0.0
/// max_x = 1.0
/// values = [0.0, -0.5, 0.0]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CurveConfig {
    /// Piecewise-linear curve through sorted `(x, y)` keys.
    Keys {
        /// Keys sorted by `x`.
        keys: Vec<(f32, f32)>,
        /// Number of baked samples.
        #[serde(default = "default_points")]
        points: usize,
    },
    /// Uniform samples over `[min_x, max_x]`.
    Samples {
        /// Domain start.
        min_x: f32,
        /// Domain end.
        max_x: f32,
        /// Sampled values.
        values: Vec<f32>,
    },
}

impl CurveConfig {
    /// Describe an existing curve by its samples.
    pub fn from_curve(curve: &Curve) -> Self {
        CurveConfig::Samples {
            min_x: curve.min_x(),
            max_x: curve.max_x(),
            values: curve.data().to_vec(),
        }
    }

    /// Check the description, reporting problems under `param`.
    pub fn validate(&self, param: &str) -> ValidationResult<()> {
        let invalid = |reason: &str| {
            Err(ValidationError::InvalidFormat {
                param: param.to_string(),
                reason: reason.to_string(),
            })
        };
        match self {
            CurveConfig::Keys { keys, points } => {
                if keys.is_empty() {
                    return invalid("curve has no keys");
                }
                if *points < 2 {
                    return invalid("curve needs at least 2 points");
                }
                if keys.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
                    return invalid("curve keys must be finite");
                }
                if keys.windows(2).any(|w| w[1].0 < w[0].0) {
                    return invalid("curve keys must be sorted by x");
                }
            }
            CurveConfig::Samples {
                min_x,
                max_x,
                values,
            } => {
                if values.is_empty() {
                    return invalid("curve has no values");
                }
                if !min_x.is_finite() || !max_x.is_finite() || max_x < min_x {
                    return invalid("curve domain must satisfy min_x <= max_x");
                }
                if values.iter().any(|v| !v.is_finite()) {
                    return invalid("curve values must be finite");
                }
            }
        }
        Ok(())
    }

    /// Validate and bake into a [`Curve`].
    pub fn to_curve(&self, param: &str) -> ValidationResult<Curve> {
        self.validate(param)?;
        Ok(match self {
            CurveConfig::Keys { keys, points } => Curve::from_keys(keys, *points, 0.0),
            CurveConfig::Samples {
                min_x,
                max_x,
                values,
            } => Curve::from_samples(values.clone(), *min_x, *max_x),
        })
    }
}
