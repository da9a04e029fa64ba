//! One live mirror session.
//!
//! A [`MirrorSession`] owns everything a single video session needs: the
//! landmark feed, the stabilizer window, and the selected overlay. The host
//! calls [`MirrorSession::process_frame`] once per displayed frame, in order.

use std::sync::Arc;

use image::RgbaImage;
use tracing::{debug, info};

use crate::asset::{AssetSlot, AssetSource, LoadHandle, OverlayAsset};
use crate::capture::{capture_composite, CaptureSettings, EncodedImage, FALLBACK_HEIGHT, FALLBACK_WIDTH};
use crate::catalog::{rank_hairstyles, HairstyleEntry};
use crate::classifier::{classify, ClassificationResult, ShapeCategory};
use crate::compositor::{draw_face_layers, draw_mirrored_frame, RenderOptions};
use crate::config::MirrorConfig;
use crate::error::{Error, Result};
use crate::feed::{LandmarkDetector, LandmarkFeed};
use crate::stabilizer::{StableResult, Stabilizer};
use crate::types::LandmarkSet;

/// Where the session is in the scan.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Waiting for the stabilizer to settle.
    Scanning,
    /// The first settled result, held until a re-scan.
    Detected(StableResult),
}

/// What happened on one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    pub face_detected: bool,
    /// This frame's own classification.
    pub instant: Option<ClassificationResult>,
    /// Set when the stabilizer window agrees after this frame.
    pub stable: Option<StableResult>,
}

pub struct MirrorSession<D: LandmarkDetector> {
    feed: LandmarkFeed<D>,
    stabilizer: Stabilizer,
    overlay: AssetSlot,
    render: RenderOptions,
    capture: CaptureSettings,
    landmarks: Option<LandmarkSet>,
    selected: Option<String>,
    state: SessionState,
    running: bool,
}

impl<D: LandmarkDetector> MirrorSession<D> {
    pub fn new(detector: D) -> Self {
        Self::with_config(detector, &MirrorConfig::default())
    }

    pub fn with_config(detector: D, config: &MirrorConfig) -> Self {
        Self {
            feed: LandmarkFeed::new(detector),
            stabilizer: Stabilizer::new(),
            overlay: AssetSlot::new(),
            render: config.render,
            capture: config.capture,
            landmarks: None,
            selected: None,
            state: SessionState::Scanning,
            running: true,
        }
    }

    /// Detect, classify, stabilize and draw one frame into `dest`.
    ///
    /// A frame without a face still draws the mirrored video. An unusable
    /// destination or source fails before any session state changes.
    pub fn process_frame(&mut self, frame: &RgbaImage, dest: &mut RgbaImage) -> Result<FrameReport> {
        if !self.running {
            return Err(Error::SessionStopped);
        }
        draw_mirrored_frame(dest, frame)?;

        let detected = self.feed.next_frame(frame);
        self.landmarks = detected.landmarks;

        let mut report = FrameReport {
            face_detected: self.landmarks.is_some(),
            ..Default::default()
        };

        if let Some(landmarks) = self.landmarks.as_deref() {
            report.instant = classify(landmarks);
        }
        if let Some(instant) = report.instant.as_ref() {
            report.stable = self.stabilizer.push(instant);
        }

        if self.state == SessionState::Scanning {
            if let Some(stable) = report.stable.as_ref() {
                info!(
                    shape = %stable.shape,
                    confidence = stable.confidence,
                    agreement = stable.agreement,
                    "face shape detected"
                );
                self.state = SessionState::Detected(stable.clone());
            }
        }

        let asset = self.overlay.current();
        draw_face_layers(dest, self.landmarks.as_deref(), asset.as_ref(), &self.render);
        Ok(report)
    }

    /// Start loading a hairstyle overlay. The previous overlay keeps drawing
    /// until the new one is ready.
    pub fn select_hairstyle<S: AssetSource>(&mut self, source: Arc<S>, reference: &str) -> Result<LoadHandle> {
        if !self.running {
            return Err(Error::SessionStopped);
        }
        let handle = self.overlay.request(source, reference)?;
        self.selected = Some(reference.to_string());
        Ok(handle)
    }

    /// Use an already decoded overlay.
    pub fn set_overlay(&mut self, asset: Option<OverlayAsset>) {
        self.overlay.set(asset);
    }

    /// Drop the settled result, the selected overlay and the vote history.
    pub fn rescan(&mut self) {
        debug!("rescan requested");
        self.stabilizer.reset();
        self.overlay.clear();
        self.selected = None;
        self.state = SessionState::Scanning;
    }

    /// Encode the current composite for `frame` at the frame's own size.
    pub async fn capture(&self, frame: Arc<RgbaImage>) -> Result<EncodedImage> {
        if !self.running {
            return Err(Error::SessionStopped);
        }
        let (width, height) = capture_dimensions(frame.width(), frame.height());
        capture_composite(
            frame,
            self.landmarks.clone(),
            self.overlay.current(),
            width,
            height,
            self.capture,
        )
        .await
    }

    /// Halt the session: no more frames, pending loads are ignored and the
    /// feed is released.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.overlay.close();
        self.feed.close();
        self.landmarks = None;
        info!("mirror session stopped");
    }

    /// Catalog entries ordered for the detected shape. Empty while scanning.
    pub fn recommendations<'a>(&self, entries: &'a [HairstyleEntry]) -> Vec<(&'a HairstyleEntry, u8)> {
        match self.detected_shape() {
            Some(shape) => rank_hairstyles(entries, shape),
            None => Vec::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn detected_shape(&self) -> Option<ShapeCategory> {
        match &self.state {
            SessionState::Detected(stable) => Some(stable.shape),
            SessionState::Scanning => None,
        }
    }

    pub fn selected_hairstyle(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn overlay(&self) -> Option<OverlayAsset> {
        self.overlay.current()
    }

    pub fn is_loading_overlay(&self) -> bool {
        self.overlay.is_loading()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl<D: LandmarkDetector> Drop for MirrorSession<D> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Capture size for a frame, falling back to 640x480 when the frame size is
/// unknown.
pub fn capture_dimensions(width: u32, height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        (FALLBACK_WIDTH, FALLBACK_HEIGHT)
    } else {
        (width, height)
    }
}
