//! Trigger-driven wrappers around the generators.
//!
//! A node owns a generator and reacts to play/stop/sync triggers at the
//! exact frame they fire. Hosts fire triggers for the coming block, call
//! `process` once, then read the node's output triggers.
//!
//! ```rust
//! use modalis_synth::{BurbleNode, BurbleParams};
//!
//! let mut node = BurbleNode::new(48000.0, 1, 512);
//! node.play(64);
//!
//! let mut block = vec![0.0f32; 256];
//! node.process(&mut block, &BurbleParams::default());
//! assert!(block[..64].iter().all(|&s| s == 0.0));
//! ```

#[cfg(not(feature = "std"))]
use alloc::sync::Arc;
#[cfg(feature = "std")]
use std::sync::Arc;

use modalis_core::{Curve, Trigger, TriggerEvents};

use crate::burble::{BurbleGenerator, BurbleParams};
use crate::two_state::{TwoStateForceGen, TwoStateParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeEvent {
    Play,
    Stop,
    Sync,
}

/// Burble generator with play/stop triggers and auto-stop.
///
/// With auto-stop enabled, the node stops by itself once spawning is
/// disabled (zero rate or chance) and every burble has died out, and fires
/// [`on_done`](Self::on_done).
#[derive(Debug, Clone)]
pub struct BurbleNode {
    generator: BurbleGenerator,
    events: TriggerEvents<NodeEvent>,
    playing: bool,
    auto_stop: bool,
    on_done: Trigger,
}

impl BurbleNode {
    /// Create a stopped node. Auto-stop is on.
    pub fn new(sample_rate: f32, seed: i32, max_burbles: i32) -> Self {
        Self {
            generator: BurbleGenerator::new(sample_rate, seed, max_burbles),
            events: TriggerEvents::new(),
            playing: false,
            auto_stop: true,
            on_done: Trigger::new(),
        }
    }

    /// Enable or disable auto-stop.
    pub fn set_auto_stop(&mut self, auto_stop: bool) {
        self.auto_stop = auto_stop;
    }

    /// Set the frequency-to-gain curve of spawned burbles.
    pub fn set_freq_gain_curve(&mut self, curve: Option<Arc<Curve>>) {
        self.generator.set_freq_gain_curve(curve);
    }

    /// Restart generation at `frame` of the next block.
    pub fn play(&mut self, frame: usize) {
        self.events.push(frame, NodeEvent::Play);
    }

    /// Stop output at `frame` of the next block.
    pub fn stop(&mut self, frame: usize) {
        self.events.push(frame, NodeEvent::Stop);
    }

    /// True while generating.
    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Frames of the last block at which the node finished.
    pub fn on_done(&self) -> &Trigger {
        &self.on_done
    }

    /// Wrapped generator.
    pub fn generator(&self) -> &BurbleGenerator {
        &self.generator
    }

    /// Stop and silence immediately, dropping pending triggers.
    pub fn reset(&mut self) {
        self.generator.restart();
        self.events.clear();
        self.on_done.clear();
        self.playing = false;
    }

    /// Render one block into `out` (overwritten).
    pub fn process(&mut self, out: &mut [f32], params: &BurbleParams) {
        out.fill(0.0);
        self.on_done.clear();
        if out.is_empty() {
            self.events.clear();
            return;
        }

        let mut events = core::mem::take(&mut self.events);
        for segment in events.split(out.len()) {
            match segment.event {
                Some(NodeEvent::Play) => {
                    self.generator.restart();
                    self.playing = true;
                }
                Some(NodeEvent::Stop) if self.playing => {
                    self.playing = false;
                    self.on_done.fire(segment.start);
                }
                _ => {}
            }
            if !segment.is_empty() {
                self.render(out, segment.start, segment.end, params);
            }
        }
        events.clear();
        self.events = events;
    }

    fn render(&mut self, out: &mut [f32], start: usize, end: usize, params: &BurbleParams) {
        if !self.playing {
            return;
        }
        self.generator.generate(&mut out[start..end], params);
        if self.auto_stop && !params.can_spawn() && self.generator.num_burbles() == 0 {
            self.playing = false;
            self.on_done.fire(end.min(out.len() - 1));
        }
    }
}

/// Two-state force generator with play/stop/sync triggers.
///
/// Sync jumps back to the start of the first state without restarting.
/// Triggers sharing a frame are handled in the order they were fired.
#[derive(Debug, Clone)]
pub struct TwoStateNode {
    generator: TwoStateForceGen,
    events: TriggerEvents<NodeEvent>,
    playing: bool,
    on_play: Trigger,
    on_done: Trigger,
}

impl TwoStateNode {
    /// Create a stopped node for blocks of at most `max_block_size` frames.
    pub fn new(sample_rate: f32, max_block_size: usize, seed: i32) -> Self {
        Self {
            generator: TwoStateForceGen::new(sample_rate, max_block_size, seed),
            events: TriggerEvents::new(),
            playing: false,
            on_play: Trigger::new(),
            on_done: Trigger::new(),
        }
    }

    /// Restart the cycle at `frame` of the next block.
    pub fn play(&mut self, frame: usize) {
        self.events.push(frame, NodeEvent::Play);
    }

    /// Stop output at `frame` of the next block.
    pub fn stop(&mut self, frame: usize) {
        self.events.push(frame, NodeEvent::Stop);
    }

    /// Jump to the start of the cycle at `frame` of the next block.
    pub fn sync(&mut self, frame: usize) {
        self.events.push(frame, NodeEvent::Sync);
    }

    /// True while generating.
    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Frames of the last block at which play fired.
    pub fn on_play(&self) -> &Trigger {
        &self.on_play
    }

    /// Frames of the last block at which the node stopped.
    pub fn on_done(&self) -> &Trigger {
        &self.on_done
    }

    /// Stop and silence immediately, dropping pending triggers.
    pub fn reset(&mut self) {
        self.generator.restart();
        self.events.clear();
        self.on_play.clear();
        self.on_done.clear();
        self.playing = false;
    }

    /// Render one block into `out` (overwritten).
    pub fn process(&mut self, out: &mut [f32], params: &TwoStateParams) {
        out.fill(0.0);
        self.on_play.clear();
        self.on_done.clear();
        if out.is_empty() {
            self.events.clear();
            return;
        }

        let mut events = core::mem::take(&mut self.events);
        for segment in events.split(out.len()) {
            match segment.event {
                Some(NodeEvent::Play) => {
                    self.generator.restart();
                    self.playing = true;
                    self.on_play.fire(segment.start);
                }
                Some(NodeEvent::Stop) => {
                    self.playing = false;
                    self.on_done.fire(segment.start);
                }
                Some(NodeEvent::Sync) => self.generator.reset_cycle(),
                None => {}
            }
            if self.playing && !segment.is_empty() {
                self.generator.generate(&mut out[segment.start..segment.end], params);
            }
        }
        events.clear();
        self.events = events;
    }
}
