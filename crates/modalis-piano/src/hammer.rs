//! Hammer impact noise.
//!
//! The hammer's modal response is rendered once into a buffer and shaped by
//! the attack envelope. Every strike block enqueues one playback of that
//! buffer at a given strength; playbacks mix additively until exhausted.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use modalis_core::ModalBank;

use crate::model::HammerData;

/// Length of the rendered hammer response in seconds.
pub const HAMMER_DURATION: f32 = 0.25;

/// Scale from accumulated strike velocity to playback strength.
pub const HAMMER_RESCALE: f32 = 0.002;

/// Upper bound on the accumulated strike velocity of one block.
pub const HAMMER_VELOCITY_MAX: f32 = 255.0;

/// One queued hammer playback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HammerStrike {
    /// Read position in the hammer buffer.
    pub index: usize,
    /// Playback gain.
    pub strength: f32,
}

/// Pre-rendered hammer response and its playback queue.
#[derive(Debug, Clone, Default)]
pub struct Hammer {
    buffer: Vec<f32>,
    strikes: Vec<HammerStrike>,
}

impl Hammer {
    /// Render the hammer response of `data` for `duration` seconds.
    pub fn new(data: &HammerData, sample_rate: f32, duration: f32, attack: &[f32]) -> Self {
        let len = (duration * sample_rate).max(0.0) as usize;
        let mut buffer = vec![0.0f32; len];
        ModalBank::from_modals(&data.modals, sample_rate).synthesize_write(&mut buffer);
        for (sample, &env) in buffer.iter_mut().zip(attack) {
            *sample *= env;
        }
        Self {
            buffer,
            strikes: Vec::new(),
        }
    }

    /// Rendered response.
    pub fn response(&self) -> &[f32] {
        &self.buffer
    }

    /// Queued playbacks.
    pub fn strikes(&self) -> &[HammerStrike] {
        &self.strikes
    }

    /// Queue a playback at `strength`. Non-positive strengths are ignored.
    pub fn strike(&mut self, strength: f32) {
        if strength > 0.0 && !self.buffer.is_empty() {
            self.strikes.push(HammerStrike { index: 0, strength });
        }
    }

    /// Multiply the strength of playbacks that have not started yet.
    pub fn scale_pending(&mut self, factor: f32) {
        for strike in self.strikes.iter_mut().filter(|s| s.index == 0) {
            strike.strength *= factor;
        }
    }

    /// Mix all queued playbacks into `out` and advance them.
    pub fn render_add(&mut self, out: &mut [f32]) {
        let buffer = &self.buffer;
        self.strikes.retain_mut(|strike| {
            let n = out.len().min(buffer.len() - strike.index);
            let src = &buffer[strike.index..strike.index + n];
            for (o, &h) in out[..n].iter_mut().zip(src) {
                *o += h * strike.strength;
            }
            strike.index += n;
            strike.index < buffer.len()
        });
    }

    /// True when nothing is queued.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.strikes.is_empty()
    }

    /// Drop every queued playback.
    pub fn clear(&mut self) {
        self.strikes.clear();
    }
}
