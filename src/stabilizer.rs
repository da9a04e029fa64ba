//! Majority vote over recent per-frame classifications.
//!
//! Single-frame shape labels flicker with head motion and lighting. The
//! stabilizer keeps the last [`WINDOW_CAPACITY`] labels and only reports a
//! shape once it holds more than [`MAJORITY`] of a window of at least
//! [`MIN_FRAMES`] entries.

use serde::Serialize;
use tracing::{debug, trace};

use crate::catalog::{shape_info, ShapeInfo};
use crate::classifier::{ClassificationResult, Measurements, ShapeCategory, ShapeScores};

/// Labels retained in the window.
pub const WINDOW_CAPACITY: usize = 15;

/// Labels required before any vote is taken.
pub const MIN_FRAMES: usize = 10;

/// Fraction of the window the leading label must exceed.
pub const MAJORITY: f64 = 0.6;

/// Fixed-capacity FIFO of shape labels. Pushing into a full window
/// overwrites the oldest entry.
#[derive(Debug, Clone)]
pub struct LabelWindow {
    slots: [ShapeCategory; WINDOW_CAPACITY],
    head: usize,
    len: usize,
}

impl LabelWindow {
    pub fn new() -> Self {
        Self {
            slots: [ShapeCategory::Oval; WINDOW_CAPACITY],
            head: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, label: ShapeCategory) {
        let tail = (self.head + self.len) % WINDOW_CAPACITY;
        self.slots[tail] = label;
        if self.len == WINDOW_CAPACITY {
            self.head = (self.head + 1) % WINDOW_CAPACITY;
        } else {
            self.len += 1;
        }
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Labels from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = ShapeCategory> + '_ {
        (0..self.len).map(move |i| self.slots[(self.head + i) % WINDOW_CAPACITY])
    }

    /// Most frequent label and its count. Equal counts favour the label seen
    /// earliest in the window.
    pub fn mode(&self) -> Option<(ShapeCategory, usize)> {
        let mut counts = [0usize; ShapeCategory::ALL.len()];
        let mut first_seen = [usize::MAX; ShapeCategory::ALL.len()];
        for (position, label) in self.iter().enumerate() {
            let idx = label.index();
            counts[idx] += 1;
            first_seen[idx] = first_seen[idx].min(position);
        }

        ShapeCategory::ALL
            .into_iter()
            .filter(|c| counts[c.index()] > 0)
            .min_by_key(|c| (std::cmp::Reverse(counts[c.index()]), first_seen[c.index()]))
            .map(|c| (c, counts[c.index()]))
    }
}

impl Default for LabelWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// A settled classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StableResult {
    /// The majority label.
    pub shape: ShapeCategory,
    /// Confidence of the frame that settled the vote.
    pub confidence: f64,
    pub scores: ShapeScores,
    pub measurements: Measurements,
    /// Share of the window held by `shape`.
    pub agreement: f64,
    pub info: &'static ShapeInfo,
}

/// Rolling majority vote over classification labels.
///
/// Pushes must arrive in frame order; the window is owned by one session and
/// never shared.
#[derive(Debug, Clone, Default)]
pub struct Stabilizer {
    window: LabelWindow,
}

impl Stabilizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one frame's classification and return a settled result if the
    /// window now agrees.
    pub fn push(&mut self, classification: &ClassificationResult) -> Option<StableResult> {
        self.window.push(classification.shape);
        trace!(shape = %classification.shape, window = self.window.len(), "stabilizer push");

        if self.window.len() < MIN_FRAMES {
            return None;
        }

        let (shape, count) = self.window.mode()?;
        let agreement = count as f64 / self.window.len() as f64;
        if agreement <= MAJORITY {
            debug!(leader = %shape, agreement, "no majority yet");
            return None;
        }

        Some(StableResult {
            shape,
            confidence: classification.confidence,
            scores: classification.scores,
            measurements: classification.measurements,
            agreement,
            info: shape_info(shape),
        })
    }

    /// Forget all history, e.g. when the user asks for a re-scan.
    pub fn reset(&mut self) {
        self.window.clear();
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// True while fewer than [`MIN_FRAMES`] labels have been collected.
    pub fn is_collecting(&self) -> bool {
        self.window.len() < MIN_FRAMES
    }
}
