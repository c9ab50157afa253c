//! Modalis Synth - procedural modal generators
//!
//! This crate builds sound generators on top of the modal bank in
//! `modalis-core`. Each generator owns its oscillators and renders into a
//! caller-provided block.
//!
//! # Core Components
//!
//! ## Burbles
//!
//! Stochastic bubble sounds, one chirping damped oscillator per bubble:
//!
//! - [`BurbleGenerator`] - Spawns, renders and recycles burbles
//! - [`BurbleParams`] - Spawn rate, radius and amplitude distributions, decay
//!
//! ```rust
//! use modalis_synth::{BurbleGenerator, BurbleParams, DEFAULT_MAX_BURBLES};
//!
//! let mut burbles = BurbleGenerator::new(48000.0, 7, DEFAULT_MAX_BURBLES);
//! let mut block = vec![0.0f32; 512];
//! burbles.generate(&mut block, &BurbleParams::default());
//! ```
//!
//! ## Two-State Forces
//!
//! Periodic excitation alternating between two curve-shaped states:
//!
//! - [`TwoStateForceGen`] - Cycle counter with duty-cycle remapping
//! - [`TwoStateParams`] / [`StateShape`] - Per-state curves, noise and frequency scale
//!
//! ## Vehicle Engines
//!
//! - [`VehicleEngineSynth`] - Harmonic engine model driven by rpm and throttle
//! - [`EngineSetup`] / [`EngineParams`] - Static harmonic table and live controls
//!
//! ```rust
//! use modalis_synth::{EngineParams, EngineSetup, VehicleEngineSynth};
//!
//! let setup = EngineSetup {
//!     pulses_per_cycle: 4,
//!     harmonics: vec![(0.5, 0.0, 100.0), (0.25, 0.0, 200.0)],
//!     max_harmonics: 0,
//! };
//! let params = EngineParams { rpm: 2400.0, ..EngineParams::default() };
//! let mut engine = VehicleEngineSynth::new(48000.0, &setup, &params, 1);
//!
//! let mut block = vec![0.0f32; 256];
//! engine.generate(&mut block, &params);
//! ```
//!
//! ## Nodes
//!
//! Sample-accurate play/stop/sync handling around the generators:
//!
//! - [`BurbleNode`] - Burbles with auto-stop
//! - [`TwoStateNode`] - Two-state force with cycle sync
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (it needs `alloc`). Disable the default
//! `std` feature:
//!
//! ```toml
//! [dependencies]
//! modalis-synth = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod burble;
pub mod node;
pub mod two_state;
pub mod vehicle;

// Re-export main types at crate root
pub use burble::{
    BurbleGenerator, BurbleParams, DEFAULT_MAX_BURBLES, UNLIMITED_BURBLES, bubble_decay_rate,
};
pub use node::{BurbleNode, TwoStateNode};
pub use two_state::{NoiseMode, StateShape, TwoStateForceGen, TwoStateParams, state_split};
pub use vehicle::{EngineParams, EngineSetup, VehicleEngineSynth};

// Re-export commonly used types from modalis-core
pub use modalis_core::{Curve, RANDOM_SEED, Trigger};
