//! Per-frame compositing onto a destination surface.
//!
//! A frame is the mirrored source image, then the hairstyle overlay placed by
//! [`compute_transform`], then optionally debug markers on the anchor
//! landmarks.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_circle_mut;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::asset::OverlayAsset;
use crate::error::{Error, Result};
use crate::font;
use crate::geometry::{compute_transform, to_mirrored_pixel, OverlayTransform};
use crate::types::{anchors, Landmark, LANDMARK_COUNT};

/// Overlay opacity used unless the caller overrides it.
pub const DEFAULT_OPACITY: f32 = 0.9;

const MARKER_RADIUS: i32 = 3;
const MARKER_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);
const LABEL_SCALE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub opacity: f32,
    /// Mark the anchor landmarks with their indices. Development only.
    pub debug: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            opacity: DEFAULT_OPACITY,
            debug: false,
        }
    }
}

fn check_surface(surface: &RgbaImage) -> Result<()> {
    if surface.width() == 0 || surface.height() == 0 {
        return Err(Error::InvalidSurface {
            width: surface.width(),
            height: surface.height(),
        });
    }
    Ok(())
}

/// Draw `frame` scaled to fill `dest`, flipped horizontally.
pub fn draw_mirrored_frame(dest: &mut RgbaImage, frame: &RgbaImage) -> Result<()> {
    check_surface(dest)?;
    if frame.width() == 0 || frame.height() == 0 {
        return Err(Error::EmptyFrame);
    }

    let (width, height) = dest.dimensions();
    let mut mirrored = if frame.dimensions() == (width, height) {
        frame.clone()
    } else {
        imageops::resize(frame, width, height, FilterType::Triangle)
    };
    imageops::flip_horizontal_in_place(&mut mirrored);
    dest.copy_from_slice(&mirrored);
    Ok(())
}

/// Sample with bilinear interpolation, clamping at the edges.
///
/// Colour channels come back premultiplied by alpha so transparent texels
/// do not bleed into the overlay's outline.
#[inline]
fn sample_bilinear(image: &RgbaImage, x: f32, y: f32) -> [f32; 4] {
    let max_x = image.width() as i32 - 1;
    let max_y = image.height() as i32 - 1;

    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let texel = |px: i32, py: i32| -> [f32; 4] {
        let p = image.get_pixel(px.clamp(0, max_x) as u32, py.clamp(0, max_y) as u32);
        let a = p[3] as f32 / 255.0;
        [p[0] as f32 * a, p[1] as f32 * a, p[2] as f32 * a, p[3] as f32]
    };

    let p00 = texel(x0, y0);
    let p10 = texel(x0 + 1, y0);
    let p01 = texel(x0, y0 + 1);
    let p11 = texel(x0 + 1, y0 + 1);

    let mut out = [0.0; 4];
    for c in 0..4 {
        let top = p00[c] * (1.0 - fx) + p10[c] * fx;
        let bottom = p01[c] * (1.0 - fx) + p11[c] * fx;
        out[c] = top * (1.0 - fy) + bottom * fy;
    }
    out
}

/// Source-over blend of a premultiplied sample scaled by `opacity`.
#[inline]
fn blend(dst: &mut Rgba<u8>, src: [f32; 4], opacity: f32) {
    let src_a = src[3] / 255.0 * opacity;
    if src_a <= 0.0 {
        return;
    }
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);

    for c in 0..3 {
        let premult = src[c] * opacity + dst[c] as f32 * dst_a * (1.0 - src_a);
        dst[c] = (premult / out_a).round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Draw `asset` into the box described by `transform`, rotated about the
/// box centre.
pub fn draw_overlay(dest: &mut RgbaImage, asset: &OverlayAsset, transform: &OverlayTransform, opacity: f32) {
    // NaN draws nothing
    let opacity = if opacity.is_nan() { 0.0 } else { opacity.clamp(0.0, 1.0) };
    if !transform.is_drawable() || opacity <= 0.0 || dest.width() == 0 || dest.height() == 0 {
        return;
    }

    let corners = transform.corners();
    let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
    let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
    for p in &corners {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    let x_start = min_x.floor().max(0.0) as u32;
    let y_start = min_y.floor().max(0.0) as u32;
    let x_end = max_x.ceil().min(dest.width() as f32).max(0.0) as u32;
    let y_end = max_y.ceil().min(dest.height() as f32).max(0.0) as u32;
    if x_start >= x_end || y_start >= y_end {
        return;
    }

    let image = asset.image();
    let scale_x = image.width() as f32 / transform.width;
    let scale_y = image.height() as f32 / transform.height;
    let half_w = transform.width / 2.0;
    let half_h = transform.height / 2.0;
    let (sin, cos) = transform.rotation.sin_cos();

    for py in y_start..y_end {
        for px in x_start..x_end {
            let dx = px as f32 + 0.5 - transform.center_x;
            let dy = py as f32 + 0.5 - transform.center_y;

            // Undo the rotation to land in the box's own frame
            let u = dx * cos + dy * sin + half_w;
            let v = -dx * sin + dy * cos + half_h;
            if u < 0.0 || v < 0.0 || u >= transform.width || v >= transform.height {
                continue;
            }

            let sample = sample_bilinear(image, u * scale_x - 0.5, v * scale_y - 0.5);
            blend(dest.get_pixel_mut(px, py), sample, opacity);
        }
    }
}

/// Mark the anchor landmarks with dots and index labels.
pub fn draw_landmark_debug(dest: &mut RgbaImage, landmarks: &[Landmark]) {
    if landmarks.len() < LANDMARK_COUNT {
        return;
    }
    let (width, height) = dest.dimensions();

    for idx in anchors::DEBUG_POINTS {
        let p = to_mirrored_pixel(&landmarks[idx], width, height);
        let (x, y) = (p.x.round() as i32, p.y.round() as i32);
        draw_filled_circle_mut(dest, (x, y), MARKER_RADIUS, MARKER_COLOR);

        let label_top = y - 5 - (font::GLYPH_HEIGHT * LABEL_SCALE) as i32;
        font::draw_text(dest, x + 5, label_top, &idx.to_string(), MARKER_COLOR, LABEL_SCALE);
    }
}

/// Draw the face-anchored layers over an already mirrored frame: the
/// overlay when landmarks yield a transform and an asset is available, then
/// debug markers if enabled.
pub fn draw_face_layers(
    dest: &mut RgbaImage,
    landmarks: Option<&[Landmark]>,
    asset: Option<&OverlayAsset>,
    options: &RenderOptions,
) {
    let Some(landmarks) = landmarks else {
        return;
    };

    let (width, height) = dest.dimensions();
    if let (Some(transform), Some(asset)) = (compute_transform(landmarks, width, height), asset) {
        trace!(?transform, "drawing overlay");
        draw_overlay(dest, asset, &transform, options.opacity);
    }

    if options.debug {
        draw_landmark_debug(dest, landmarks);
    }
}

/// Render one frame into `dest`.
///
/// The mirrored source frame is always drawn. The overlay is drawn only when
/// landmarks yield a transform and an asset is available; either being
/// absent silently skips it. Fails only for an empty destination or source.
pub fn render_frame(
    dest: &mut RgbaImage,
    frame: &RgbaImage,
    landmarks: Option<&[Landmark]>,
    asset: Option<&OverlayAsset>,
    options: &RenderOptions,
) -> Result<()> {
    draw_mirrored_frame(dest, frame)?;
    draw_face_layers(dest, landmarks, asset, options);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn half_and_half(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, _| if x < width / 2 { RED } else { BLUE })
    }

    fn centered(width: f32, height: f32, rotation: f32, cx: f32, cy: f32) -> OverlayTransform {
        OverlayTransform {
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            width,
            height,
            rotation,
            center_x: cx,
            center_y: cy,
        }
    }

    #[test]
    fn frame_is_mirrored() {
        let frame = half_and_half(8, 4);
        let mut dest = RgbaImage::new(8, 4);
        draw_mirrored_frame(&mut dest, &frame).unwrap();
        assert_eq!(*dest.get_pixel(0, 0), BLUE);
        assert_eq!(*dest.get_pixel(7, 3), RED);
        // Column order is fully reversed
        assert_eq!(*dest.get_pixel(3, 0), BLUE);
        assert_eq!(*dest.get_pixel(4, 0), RED);
    }

    #[test]
    fn frame_is_scaled_to_destination() {
        let frame = half_and_half(16, 8);
        let mut dest = RgbaImage::new(4, 2);
        draw_mirrored_frame(&mut dest, &frame).unwrap();
        assert_eq!(*dest.get_pixel(0, 1), BLUE);
        assert_eq!(*dest.get_pixel(3, 0), RED);
    }

    #[test]
    fn empty_surfaces_are_rejected() {
        let frame = half_and_half(4, 4);
        let mut empty = RgbaImage::new(0, 4);
        assert!(matches!(
            render_frame(&mut empty, &frame, None, None, &RenderOptions::default()),
            Err(Error::InvalidSurface { width: 0, height: 4 })
        ));

        let mut dest = RgbaImage::new(4, 4);
        assert!(matches!(
            draw_mirrored_frame(&mut dest, &RgbaImage::new(0, 0)),
            Err(Error::EmptyFrame)
        ));
    }

    #[test]
    fn opaque_overlay_covers_its_box() {
        let asset = OverlayAsset::new(RgbaImage::from_pixel(4, 4, RED)).unwrap();
        let mut dest = RgbaImage::from_pixel(20, 20, BLUE);
        draw_overlay(&mut dest, &asset, &centered(10.0, 10.0, 0.0, 10.0, 10.0), 1.0);

        assert_eq!(*dest.get_pixel(10, 10), RED);
        assert_eq!(*dest.get_pixel(5, 5), RED);
        assert_eq!(*dest.get_pixel(14, 14), RED);
        assert_eq!(*dest.get_pixel(4, 10), BLUE);
        assert_eq!(*dest.get_pixel(15, 10), BLUE);
    }

    #[test]
    fn opacity_blends_with_frame() {
        let asset = OverlayAsset::new(RgbaImage::from_pixel(2, 2, RED)).unwrap();
        let mut dest = RgbaImage::from_pixel(10, 10, BLUE);
        draw_overlay(&mut dest, &asset, &centered(4.0, 4.0, 0.0, 5.0, 5.0), DEFAULT_OPACITY);

        let p = dest.get_pixel(5, 5);
        // 90% red over blue
        assert!((p[0] as i32 - 230).abs() <= 1);
        assert!((p[2] as i32 - 26).abs() <= 1);
        assert_eq!(p[3], 255);
    }

    #[test]
    fn transparent_texels_leave_frame_untouched() {
        let asset = OverlayAsset::new(RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 0]))).unwrap();
        let mut dest = RgbaImage::from_pixel(10, 10, BLUE);
        draw_overlay(&mut dest, &asset, &centered(6.0, 6.0, 0.3, 5.0, 5.0), 1.0);
        assert!(dest.pixels().all(|p| *p == BLUE));
    }

    #[test]
    fn rotation_turns_box_about_center() {
        // A wide, short bar rotated a quarter turn becomes tall and thin
        let asset = OverlayAsset::new(RgbaImage::from_pixel(8, 2, RED)).unwrap();
        let mut dest = RgbaImage::from_pixel(20, 20, BLUE);
        let quarter = std::f32::consts::FRAC_PI_2;
        draw_overlay(&mut dest, &asset, &centered(16.0, 4.0, quarter, 10.0, 10.0), 1.0);

        assert_eq!(*dest.get_pixel(10, 3), RED);
        assert_eq!(*dest.get_pixel(10, 16), RED);
        assert_eq!(*dest.get_pixel(3, 10), BLUE);
        assert_eq!(*dest.get_pixel(16, 10), BLUE);
    }

    #[test]
    fn invalid_opacity_is_clamped() {
        let asset = OverlayAsset::new(RgbaImage::from_pixel(2, 2, RED)).unwrap();
        let boxed = centered(4.0, 4.0, 0.0, 5.0, 5.0);

        let mut dest = RgbaImage::from_pixel(10, 10, BLUE);
        draw_overlay(&mut dest, &asset, &boxed, f32::NAN);
        assert!(dest.pixels().all(|p| *p == BLUE));

        draw_overlay(&mut dest, &asset, &boxed, -0.5);
        assert!(dest.pixels().all(|p| *p == BLUE));

        draw_overlay(&mut dest, &asset, &boxed, 3.0);
        assert_eq!(*dest.get_pixel(5, 5), RED);
    }

    #[test]
    fn overlay_off_surface_is_clipped() {
        let asset = OverlayAsset::new(RgbaImage::from_pixel(2, 2, RED)).unwrap();
        let mut dest = RgbaImage::from_pixel(10, 10, BLUE);
        draw_overlay(&mut dest, &asset, &centered(6.0, 6.0, 0.0, -20.0, 5.0), 1.0);
        draw_overlay(&mut dest, &asset, &centered(6.0, 6.0, 0.0, 0.0, 0.0), 1.0);
        assert_eq!(*dest.get_pixel(0, 0), RED);
        assert_eq!(*dest.get_pixel(5, 5), BLUE);
    }

    #[test]
    fn missing_inputs_still_draw_video() {
        let frame = half_and_half(8, 8);
        let asset = OverlayAsset::new(RgbaImage::from_pixel(2, 2, Rgba([0, 255, 0, 255]))).unwrap();
        let mut dest = RgbaImage::new(8, 8);

        // Asset without landmarks
        render_frame(&mut dest, &frame, None, Some(&asset), &RenderOptions::default()).unwrap();
        assert_eq!(*dest.get_pixel(0, 0), BLUE);

        // Landmarks too short to place anything
        let short = vec![Landmark::new(0.5, 0.5, 0.0); 12];
        render_frame(&mut dest, &frame, Some(&short), Some(&asset), &RenderOptions::default()).unwrap();
        assert!(dest.pixels().all(|p| *p == RED || *p == BLUE));
    }

    #[test]
    fn debug_markers_land_on_mirrored_anchors() {
        let mut landmarks = vec![Landmark::new(0.5, 0.5, 0.0); LANDMARK_COUNT];
        landmarks[anchors::CHIN] = Landmark::new(0.25, 0.75, 0.0);
        let mut dest = RgbaImage::from_pixel(100, 100, BLUE);
        draw_landmark_debug(&mut dest, &landmarks);

        assert_eq!(*dest.get_pixel(75, 75), MARKER_COLOR);
        assert_eq!(*dest.get_pixel(50, 50), MARKER_COLOR);
        assert_eq!(*dest.get_pixel(10, 10), BLUE);
    }
}
