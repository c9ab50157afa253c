//! Modalis Core - modal synthesis primitives
//!
//! This crate provides the building blocks shared by every modalis
//! synthesizer, designed for real-time use with no allocation in the audio
//! path once buffers are sized.
//!
//! # Core Abstractions
//!
//! ## Modal Oscillators
//!
//! - [`ModalBank`] - Structure-of-arrays bank of damped second-order resonators
//! - [`ModalCoeffs`] - Recursion coefficients for one oscillator
//! - [`LANES`] / [`fit_to_lanes`] - Lane-width grouping of oscillator arrays
//!
//! ## Lookup Tables
//!
//! - [`Curve`] - Uniformly sampled curve with clamped, nearest and cyclic lookup
//!
//! ## Scheduling
//!
//! - [`Trigger`] - Frame offsets at which a trigger input fired
//! - [`TriggerEvents`] - Splits a block into segments at trigger frames
//!
//! ## Control Rate
//!
//! - [`InterpPerFrame`] - Slew-limited approach to a target
//! - [`VelocityTracker`] - Averaged rate of change of a control value
//!
//! ## Utilities
//!
//! - [`Rng`] - Seedable random stream
//! - Math functions: [`db_to_linear`], [`pitch_to_ratio`], [`low_pass_db_to_linear`], etc.
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (it needs `alloc`). Disable the default
//! `std` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! modalis-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use modalis_core::{Curve, ModalBank};
//!
//! // Two partials of a struck bar
//! let mut bank = ModalBank::from_modals(&[(0.5, 4.0, 220.0), (0.3, 9.0, 607.0)], 48000.0);
//! let gain = Curve::from_samples(vec![1.0, 0.5], 0.0, 1.0);
//!
//! let mut block = vec![0.0f32; 256];
//! bank.synthesize_add(&mut block);
//! for s in block.iter_mut() {
//!     *s *= gain.value_interp(0.5);
//! }
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: No allocations in render paths after sizing
//! - **Lane-friendly layout**: Parallel arrays in fixed-width groups that auto-vectorize
//! - **Graceful degradation**: Invalid input renders silence, never NaN

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod control;
pub mod curve;
pub mod lanes;
pub mod math;
pub mod modal;
pub mod rng;
pub mod trigger;

// Re-export main types at crate root
pub use control::{InterpPerFrame, VelocityTracker};
pub use curve::{Curve, DOMAIN_TOLERANCE};
pub use lanes::{LANES, count_active_from_top, fit_to_lanes, validate_active, zero_range};
pub use math::{
    db_to_linear, flush_denormal, lerp, low_pass_db_to_linear, pitch_to_ratio,
    pitch_to_ratio_clamped, positive_mod,
};
pub use modal::{ModalBank, ModalCoeffs, ModalParts};
pub use rng::{RANDOM_SEED, Rng};
pub use trigger::{Segment, Trigger, TriggerEvents, TriggerSplit};
