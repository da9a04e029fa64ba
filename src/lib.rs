//! # mirror-face
//!
//! Face-shape classification and hairstyle overlay compositing for a live
//! "mirror" view.
//!
//! This crate provides:
//! - **Classification**: 468-point face mesh → four anatomical widths →
//!   per-shape rule scores → best of six face shapes with a confidence
//! - **Stabilization**: a rolling majority vote that settles on a shape only
//!   when recent frames agree
//! - **Compositing**: mirrored video plus a hairstyle cutout anchored to the
//!   forehead and temples, rotated with head tilt
//! - **Capture**: the same composite rendered off-screen and encoded to JPEG
//!   or PNG
//!
//! Landmark detection itself is external; plug a detector in through
//! [`LandmarkDetector`].
//!
//! ## Pipeline
//!
//! 1. The [`LandmarkFeed`] runs the detector on a frame
//! 2. [`classify`] scores the landmarks against the shape rule table
//! 3. The [`Stabilizer`] votes over the last 15 labels
//! 4. [`compute_transform`] places the overlay from four anchor landmarks
//! 5. [`render_frame`] draws the mirrored frame, then the overlay
//! 6. [`capture_composite`] encodes a still on demand
//!
//! [`MirrorSession`] wires these together for one video session.
//!
//! ## Quick Start
//!
//! ```rust
//! use mirror_face::{anchors, classify, Landmark, ShapeCategory, Stabilizer, LANDMARK_COUNT};
//!
//! // A synthetic mesh; a real one comes from a face-mesh detector
//! let mut mesh = vec![Landmark::new(0.5, 0.5, 0.0); LANDMARK_COUNT];
//! let mut pair = |left: usize, right: usize, width: f32, y: f32| {
//!     mesh[left] = Landmark::new(0.5 - width / 2.0, y, 0.0);
//!     mesh[right] = Landmark::new(0.5 + width / 2.0, y, 0.0);
//! };
//! pair(anchors::LEFT_FOREHEAD, anchors::RIGHT_FOREHEAD, 0.36, 0.30);
//! pair(anchors::LEFT_CHEEKBONE, anchors::RIGHT_CHEEKBONE, 0.40, 0.45);
//! pair(anchors::LEFT_JAW, anchors::RIGHT_JAW, 0.32, 0.65);
//! mesh[anchors::FOREHEAD_TOP] = Landmark::new(0.5, 0.15, 0.0);
//! mesh[anchors::CHIN] = Landmark::new(0.5, 0.71, 0.0);
//!
//! let result = classify(&mesh).expect("full mesh");
//! assert_eq!(result.shape, ShapeCategory::Oval);
//!
//! let mut stabilizer = Stabilizer::new();
//! let settled = (0..10).filter_map(|_| stabilizer.push(&result)).last();
//! assert_eq!(settled.map(|s| s.shape), Some(ShapeCategory::Oval));
//! ```
//!
//! ## Custom Detectors
//!
//! Implement [`LandmarkDetector`] for your face-mesh backend:
//!
//! ```rust
//! use mirror_face::{Landmark, LandmarkDetector, LandmarkFeed, RgbaImage, Result};
//!
//! struct NoFace;
//!
//! impl LandmarkDetector for NoFace {
//!     fn detect(&mut self, _frame: &RgbaImage) -> Result<Option<Vec<Landmark>>> {
//!         Ok(None)
//!     }
//! }
//!
//! let mut feed = LandmarkFeed::new(NoFace);
//! assert!(!feed.next_frame(&RgbaImage::new(4, 4)).face_detected());
//! ```

mod asset;
mod capture;
mod catalog;
mod classifier;
mod compositor;
mod config;
mod error;
mod feed;
mod font;
mod geometry;
mod session;
mod stabilizer;
mod types;

pub use asset::{AssetSlot, AssetSource, FileSource, LoadHandle, LoadOutcome, OverlayAsset};
pub use capture::{
    capture_composite, compose, CaptureFormat, CaptureSettings, EncodedImage, FALLBACK_HEIGHT, FALLBACK_WIDTH,
};
pub use catalog::{rank_hairstyles, shape_info, HairstyleEntry, ShapeInfo, DEFAULT_COMPATIBILITY};
pub use classifier::{
    classify, score, ClassificationResult, Measurements, Metric, Rule, ShapeCategory, ShapeScores, RULES,
};
pub use compositor::{
    draw_face_layers, draw_landmark_debug, draw_mirrored_frame, draw_overlay, render_frame, RenderOptions,
    DEFAULT_OPACITY,
};
pub use config::{MirrorConfig, DEFAULT_LOG_FILTER};
pub use error::{Error, Result};
pub use feed::{FeedFrame, LandmarkDetector, LandmarkFeed, ReplayDetector};
pub use geometry::{
    compute_transform, to_mirrored_pixel, OverlayTransform, HEIGHT_FACTOR, LIFT_FACTOR, WIDTH_FACTOR,
};
pub use image::RgbaImage;
pub use session::{capture_dimensions, FrameReport, MirrorSession, SessionState};
pub use stabilizer::{LabelWindow, StableResult, Stabilizer, MAJORITY, MIN_FRAMES, WINDOW_CAPACITY};
pub use types::{anchors, Landmark, LandmarkSet, Point, LANDMARK_COUNT};
