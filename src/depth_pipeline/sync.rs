//! Frame-pair synchronisation
//!
//! The two tracks are decoded independently and complete frames in arbitrary
//! interleaved order. The synchroniser buffers each track's frames and pairs
//! them strictly by their position in decode-completion order: the Nth pair
//! is always the Nth frame of each track.
//!
//! No timestamp reconciliation is done. When both frames of a pair carry a
//! container timestamp and the two disagree, the pair is still emitted but is
//! logged and counted as suspect, since a decoder that reorders frames
//! internally would silently pair mismatched content.

use std::collections::VecDeque;

use tracing::{trace, warn};

use crate::depth_pipeline::source::types::{RasterFrame, TrackId};

/// Timestamps closer than this are considered the same instant.
const TIMESTAMP_TOLERANCE_MS: f64 = 0.5;

/// Logically simultaneous frames, one from each camera.
#[derive(Debug, Clone)]
pub struct StereoPair {
    pub left: RasterFrame,
    pub right: RasterFrame,
}

impl StereoPair {
    /// Whether the container's presentation timestamps disagree.
    pub fn timestamps_disagree(&self) -> bool {
        match (self.left.timestamp_ms(), self.right.timestamp_ms()) {
            (Some(l), Some(r)) => (l - r).abs() > TIMESTAMP_TOLERANCE_MS,
            _ => false,
        }
    }
}

#[derive(Debug, Default)]
pub struct FramePairSynchronizer {
    left: VecDeque<RasterFrame>,
    right: VecDeque<RasterFrame>,
    current: Option<StereoPair>,
    new_pair: bool,
    pairs_emitted: u64,
    suspect_pairs: u64,
}

impl FramePairSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `frame` for `track` and pairs the queue fronts when both
    /// tracks have a frame waiting. Clears the ready flag of the previous
    /// submission.
    pub fn submit(&mut self, track: TrackId, frame: RasterFrame) {
        self.new_pair = false;
        debug_assert_eq!(track, frame.track());
        match track {
            TrackId::Left => self.left.push_back(frame),
            TrackId::Right => self.right.push_back(frame),
        }

        if self.left.is_empty() || self.right.is_empty() {
            return;
        }
        if let (Some(left), Some(right)) = (self.left.pop_front(), self.right.pop_front()) {
            self.emit(StereoPair { left, right });
        }
    }

    fn emit(&mut self, pair: StereoPair) {
        self.pairs_emitted += 1;
        if pair.timestamps_disagree() {
            self.suspect_pairs += 1;
            warn!(
                pair = self.pairs_emitted - 1,
                left_ms = pair.left.timestamp_ms().unwrap_or_default(),
                right_ms = pair.right.timestamp_ms().unwrap_or_default(),
                "Paired frames carry different container timestamps"
            );
        }
        trace!(
            pair = self.pairs_emitted - 1,
            left_pending = self.left.len(),
            right_pending = self.right.len(),
            "Stereo pair ready"
        );
        self.current = Some(pair);
        self.new_pair = true;
    }

    pub fn has_new_pair(&self) -> bool {
        self.new_pair
    }

    /// Hands out the pair completed by the latest submission, if any.
    pub fn take_pair(&mut self) -> Option<StereoPair> {
        if !self.new_pair {
            return None;
        }
        self.new_pair = false;
        self.current.take()
    }

    pub fn pending(&self, track: TrackId) -> usize {
        match track {
            TrackId::Left => self.left.len(),
            TrackId::Right => self.right.len(),
        }
    }

    pub fn pairs_emitted(&self) -> u64 {
        self.pairs_emitted
    }

    pub fn suspect_pairs(&self) -> u64 {
        self.suspect_pairs
    }

    /// Discards frames that never found a partner. Returns how many were
    /// dropped per track as `(left, right)`.
    pub fn discard_unmatched(&mut self) -> (usize, usize) {
        let dropped = (self.left.len(), self.right.len());
        self.left.clear();
        self.right.clear();
        if dropped != (0, 0) {
            warn!(
                left = dropped.0,
                right = dropped.1,
                "Dropping trailing frames without a partner"
            );
        }
        dropped
    }
}
