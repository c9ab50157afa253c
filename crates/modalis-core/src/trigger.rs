//! Sample-accurate trigger handling within an audio block.
//!
//! Hosts deliver triggers (play, stop, sync, note events) as frame offsets
//! inside the block being rendered. A node reacts to each trigger at the exact
//! frame it fires by rendering the block as consecutive segments:
//!
//! ```text
//! block:     |---------------------------------------------|
//! events:              ^play            ^sync     ^stop
//! segments:  [ none   )[ play          )[ sync   )[ stop   )
//! ```
//!
//! Events are handled in non-decreasing frame order. Events sharing a frame
//! keep the order in which they were pushed; the earlier ones get zero-length
//! segments.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Frame offsets at which a single trigger input fired during the current block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trigger {
    frames: Vec<usize>,
}

impl Trigger {
    /// Create a trigger that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a firing at `frame` within the current block.
    pub fn fire(&mut self, frame: usize) {
        self.frames.push(frame);
    }

    /// Frames at which the trigger fired, in firing order.
    pub fn frames(&self) -> &[usize] {
        &self.frames
    }

    /// True when the trigger fired at least once this block.
    pub fn is_fired(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Forget all firings. Call once the block has been rendered.
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// A block segment produced by [`TriggerSplit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<K> {
    /// First frame of the segment.
    pub start: usize,
    /// One past the last frame of the segment.
    pub end: usize,
    /// Event that fires at `start`, if any.
    pub event: Option<K>,
}

impl<K> Segment<K> {
    /// Number of frames in the segment.
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True for zero-length segments (several events on one frame).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Reusable, sorted list of trigger events for one block.
///
/// ```rust
/// use modalis_core::TriggerEvents;
///
/// #[derive(Clone, Copy, Debug, PartialEq)]
/// enum Ev { Play, Stop }
///
/// let mut events = TriggerEvents::new();
/// events.push(100, Ev::Stop);
/// events.push(10, Ev::Play);
///
/// let segments: Vec<_> = events.split(256).collect();
/// assert_eq!(segments.len(), 3);
/// assert_eq!((segments[0].start, segments[0].end, segments[0].event), (0, 10, None));
/// assert_eq!(segments[1].event, Some(Ev::Play));
/// assert_eq!((segments[2].start, segments[2].end), (100, 256));
/// ```
#[derive(Debug, Clone)]
pub struct TriggerEvents<K> {
    events: Vec<(usize, K)>,
}

impl<K> Default for TriggerEvents<K> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<K: Copy> TriggerEvents<K> {
    /// Create an empty event list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event at `frame`.
    pub fn push(&mut self, frame: usize, kind: K) {
        self.events.push((frame, kind));
    }

    /// Add every firing of `trigger` as `kind`.
    pub fn extend_from_trigger(&mut self, trigger: &Trigger, kind: K) {
        for &frame in trigger.frames() {
            self.push(frame, kind);
        }
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when no event is queued.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Remove all events, keeping the allocation.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Sort events by frame (stable) and iterate the block as segments.
    ///
    /// Events at or beyond `block_len` are clamped to the last frame.
    pub fn split(&mut self, block_len: usize) -> TriggerSplit<'_, K> {
        self.events.sort_by_key(|&(frame, _)| frame);
        TriggerSplit {
            events: &self.events,
            block_len,
            next: 0,
            pos: 0,
            started: false,
        }
    }
}

/// Iterator over the segments of a block. See [`TriggerEvents::split`].
#[derive(Debug)]
pub struct TriggerSplit<'a, K> {
    events: &'a [(usize, K)],
    block_len: usize,
    next: usize,
    pos: usize,
    started: bool,
}

impl<K: Copy> TriggerSplit<'_, K> {
    fn clamp(&self, frame: usize) -> usize {
        frame.min(self.block_len.saturating_sub(1))
    }

    fn next_boundary(&self) -> usize {
        self.events
            .get(self.next)
            .map_or(self.block_len, |&(frame, _)| self.clamp(frame))
    }
}

impl<K: Copy> Iterator for TriggerSplit<'_, K> {
    type Item = Segment<K>;

    fn next(&mut self) -> Option<Segment<K>> {
        if !self.started {
            self.started = true;
            let end = self.next_boundary();
            if end > 0 {
                self.pos = end;
                return Some(Segment {
                    start: 0,
                    end,
                    event: None,
                });
            }
        }
        let &(frame, kind) = self.events.get(self.next)?;
        let start = self.clamp(frame).max(self.pos);
        self.next += 1;
        let end = self.next_boundary().max(start);
        self.pos = end;
        Some(Segment {
            start,
            end,
            event: Some(kind),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Ev {
        Play,
        Stop,
        Sync,
    }

    fn collect(events: &mut TriggerEvents<Ev>, len: usize) -> Vec<Segment<Ev>> {
        events.split(len).collect()
    }

    #[test]
    fn no_events_is_one_segment() {
        let mut events = TriggerEvents::<Ev>::new();
        let segs = collect(&mut events, 128);
        assert_eq!(
            segs,
            vec![Segment {
                start: 0,
                end: 128,
                event: None
            }]
        );
    }

    #[test]
    fn event_at_frame_zero_has_no_leading_segment() {
        let mut events = TriggerEvents::new();
        events.push(0, Ev::Play);
        let segs = collect(&mut events, 64);
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].event, Some(Ev::Play));
        assert_eq!((segs[0].start, segs[0].end), (0, 64));
    }

    #[test]
    fn segments_cover_block_in_order() {
        let mut events = TriggerEvents::new();
        events.push(40, Ev::Stop);
        events.push(10, Ev::Play);
        events.push(20, Ev::Sync);
        let segs = collect(&mut events, 64);
        let kinds: Vec<_> = segs.iter().map(|s| s.event).collect();
        assert_eq!(kinds, vec![None, Some(Ev::Play), Some(Ev::Sync), Some(Ev::Stop)]);
        let total: usize = segs.iter().map(Segment::len).sum();
        assert_eq!(total, 64);
        for pair in segs.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn same_frame_events_keep_push_order() {
        let mut events = TriggerEvents::new();
        events.push(8, Ev::Play);
        events.push(8, Ev::Stop);
        let segs = collect(&mut events, 16);
        assert_eq!(segs[1].event, Some(Ev::Play));
        assert!(segs[1].is_empty());
        assert_eq!(segs[2].event, Some(Ev::Stop));
        assert_eq!((segs[2].start, segs[2].end), (8, 16));
    }

    #[test]
    fn late_events_clamp_to_last_frame() {
        let mut events = TriggerEvents::new();
        events.push(500, Ev::Play);
        let segs = collect(&mut events, 32);
        assert_eq!(segs[1].start, 31);
        assert_eq!(segs[1].end, 32);
    }

    #[test]
    fn trigger_records_firings() {
        let mut t = Trigger::new();
        assert!(!t.is_fired());
        t.fire(3);
        t.fire(9);
        let mut events = TriggerEvents::new();
        events.extend_from_trigger(&t, Ev::Sync);
        assert_eq!(events.len(), 2);
        t.clear();
        assert!(t.frames().is_empty());
    }
}
