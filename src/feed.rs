//! Adapter over an external face-mesh detector.
//!
//! The detector itself lives outside this crate behind [`LandmarkDetector`].
//! A [`LandmarkFeed`] is created by the session that uses it and closed when
//! that session ends; there is no process-wide detector instance.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use image::RgbaImage;
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::{Landmark, LandmarkSet};

/// An external face-mesh detector.
pub trait LandmarkDetector {
    /// Detect one face in `frame`. `Ok(None)` means no face was found.
    fn detect(&mut self, frame: &RgbaImage) -> Result<Option<Vec<Landmark>>>;

    /// Release detector resources. Called once when the feed closes.
    fn close(&mut self) {}
}

/// Detector output for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedFrame {
    pub landmarks: Option<LandmarkSet>,
}

impl FeedFrame {
    pub fn face_detected(&self) -> bool {
        self.landmarks.is_some()
    }
}

type ResultsCallback = Box<dyn FnMut(&FeedFrame) + Send>;

/// Caller-owned landmark feed.
///
/// Frames are pulled with [`LandmarkFeed::next_frame`]; a callback registered
/// with [`LandmarkFeed::on_results`] also sees every frame.
pub struct LandmarkFeed<D: LandmarkDetector> {
    detector: Option<D>,
    on_results: Option<ResultsCallback>,
    frames: u64,
}

impl<D: LandmarkDetector> LandmarkFeed<D> {
    pub fn new(detector: D) -> Self {
        Self {
            detector: Some(detector),
            on_results: None,
            frames: 0,
        }
    }

    /// Register a callback invoked with every frame's result.
    pub fn on_results<F>(&mut self, callback: F)
    where
        F: FnMut(&FeedFrame) + Send + 'static,
    {
        self.on_results = Some(Box::new(callback));
    }

    /// Run the detector on `frame`.
    ///
    /// Detector failures and short landmark sets are reported as "no face"
    /// so the render loop keeps going. A closed feed never detects anything.
    pub fn next_frame(&mut self, frame: &RgbaImage) -> FeedFrame {
        let Some(detector) = self.detector.as_mut() else {
            return FeedFrame::default();
        };
        self.frames += 1;

        let landmarks = match detector.detect(frame) {
            Ok(Some(points)) => {
                let count = points.len();
                let set = LandmarkSet::new(points);
                if set.is_none() {
                    debug!(count, frame = self.frames, "discarding short landmark set");
                }
                set
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, frame = self.frames, "landmark detection failed");
                None
            }
        };

        let result = FeedFrame { landmarks };
        if let Some(callback) = self.on_results.as_mut() {
            callback(&result);
        }
        result
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    pub fn is_open(&self) -> bool {
        self.detector.is_some()
    }

    /// Release the detector and drop the callback.
    pub fn close(&mut self) {
        if let Some(mut detector) = self.detector.take() {
            detector.close();
            debug!(frames = self.frames, "landmark feed closed");
        }
        self.on_results = None;
    }
}

impl<D: LandmarkDetector> Drop for LandmarkFeed<D> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Replays recorded detector output, one entry per frame.
///
/// Recordings are JSON arrays whose entries are either `null` (no face) or
/// an array of `{"x", "y", "z"}` points. Once exhausted every frame has no
/// face.
#[derive(Debug, Clone, Default)]
pub struct ReplayDetector {
    frames: VecDeque<Option<Vec<Landmark>>>,
}

impl ReplayDetector {
    pub fn new(frames: Vec<Option<Vec<Landmark>>>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let frames: Vec<Option<Vec<Landmark>>> = serde_json::from_reader(reader)?;
        Ok(Self::new(frames))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl LandmarkDetector for ReplayDetector {
    fn detect(&mut self, _frame: &RgbaImage) -> Result<Option<Vec<Landmark>>> {
        Ok(self.frames.pop_front().flatten())
    }

    fn close(&mut self) {
        self.frames.clear();
    }
}
