//! Still-image capture of a composite.
//!
//! Capture renders onto its own off-screen surface, never the live one, and
//! encodes the result in a blocking task so the render loop keeps running.

use std::io::Cursor;
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::asset::OverlayAsset;
use crate::compositor::{render_frame, RenderOptions};
use crate::error::{Error, Result};
use crate::types::{Landmark, LandmarkSet};

/// Capture size used when the frame size is unknown.
pub const FALLBACK_WIDTH: u32 = 640;
pub const FALLBACK_HEIGHT: u32 = 480;

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureFormat {
    Jpeg,
    Png,
}

impl CaptureFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            CaptureFormat::Jpeg => "image/jpeg",
            CaptureFormat::Png => "image/png",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub format: CaptureFormat,
    /// JPEG quality, 1-100.
    pub quality: u8,
    pub opacity: f32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            format: CaptureFormat::Jpeg,
            quality: 90,
            opacity: crate::compositor::DEFAULT_OPACITY,
        }
    }
}

/// Encoded composite ready for upload.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub format: CaptureFormat,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

/// Render the mirrored frame plus overlay at `width` x `height` and encode it.
///
/// Missing landmarks or asset produce a plain mirrored snapshot. Errors are
/// an empty output size or frame, or the encoder failing.
pub async fn capture_composite(
    frame: Arc<RgbaImage>,
    landmarks: Option<LandmarkSet>,
    asset: Option<OverlayAsset>,
    width: u32,
    height: u32,
    settings: CaptureSettings,
) -> Result<EncodedImage> {
    info!(width, height, format = ?settings.format, "capturing composite");

    tokio::task::spawn_blocking(move || {
        let surface = compose(&frame, landmarks.as_deref(), asset.as_ref(), width, height, &settings)?;
        let data = encode(surface, &settings)?;
        debug!(size = data.len(), "capture encoded");

        Ok(EncodedImage {
            data,
            format: settings.format,
            width,
            height,
        })
    })
    .await
    .map_err(|e| Error::TaskJoin(e.to_string()))?
}

/// Render a composite onto a fresh surface.
pub fn compose(
    frame: &RgbaImage,
    landmarks: Option<&[Landmark]>,
    asset: Option<&OverlayAsset>,
    width: u32,
    height: u32,
    settings: &CaptureSettings,
) -> Result<RgbaImage> {
    let mut surface = RgbaImage::new(width, height);
    let options = RenderOptions {
        opacity: settings.opacity,
        debug: false,
    };
    render_frame(&mut surface, frame, landmarks, asset, &options)?;
    Ok(surface)
}

fn encode(surface: RgbaImage, settings: &CaptureSettings) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    match settings.format {
        CaptureFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgba8(surface).to_rgb8();
            let quality = settings.quality.clamp(1, 100);
            let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
            encoder
                .encode_image(&rgb)
                .map_err(|e| Error::Encoding(format!("JPEG encoding failed: {e}")))?;
        }
        CaptureFormat::Png => {
            surface
                .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
                .map_err(|e| Error::Encoding(format!("PNG encoding failed: {e}")))?;
        }
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba};

    fn frame() -> Arc<RgbaImage> {
        Arc::new(RgbaImage::from_pixel(32, 24, Rgba([40, 80, 120, 255])))
    }

    #[tokio::test]
    async fn jpeg_capture_has_requested_size() {
        let encoded = capture_composite(frame(), None, None, 64, 48, CaptureSettings::default())
            .await
            .unwrap();
        assert_eq!(encoded.content_type(), "image/jpeg");
        assert!(!encoded.data.is_empty());

        let decoded = image::load_from_memory(&encoded.data).unwrap();
        assert_eq!(decoded.dimensions(), (64, 48));
    }

    #[tokio::test]
    async fn png_capture_keeps_pixels() {
        let settings = CaptureSettings {
            format: CaptureFormat::Png,
            ..Default::default()
        };
        let encoded = capture_composite(frame(), None, None, 32, 24, settings).await.unwrap();
        assert_eq!(encoded.content_type(), "image/png");

        let decoded = image::load_from_memory(&encoded.data).unwrap().to_rgba8();
        assert_eq!(*decoded.get_pixel(3, 3), Rgba([40, 80, 120, 255]));
    }

    #[tokio::test]
    async fn zero_sized_capture_fails() {
        let err = capture_composite(frame(), None, None, 0, 48, CaptureSettings::default()).await;
        assert!(matches!(err, Err(Error::InvalidSurface { .. })));
    }
}
