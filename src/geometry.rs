//! Overlay placement anchored to facial landmarks.
//!
//! All pixel coordinates are in the mirrored (selfie) view: a landmark at
//! normalized `x` lands at `(1 - x) * width`.

use serde::{Deserialize, Serialize};

use crate::types::{anchors, Landmark, Point, LANDMARK_COUNT};

/// Overlay width relative to temple-to-temple distance.
pub const WIDTH_FACTOR: f32 = 1.6;

/// Overlay height relative to forehead-to-chin distance.
pub const HEIGHT_FACTOR: f32 = 0.9;

/// Fraction of the overlay height raised above the forehead top.
pub const LIFT_FACTOR: f32 = 0.55;

/// Where to draw an overlay for the current frame.
///
/// `x`/`y` is the top-left corner of the unrotated box; the compositor
/// rotates the box by `rotation` radians about (`center_x`, `center_y`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayTransform {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
    pub center_x: f32,
    pub center_y: f32,
}

impl OverlayTransform {
    /// Corners of the rotated box, clockwise from top-left.
    pub fn corners(&self) -> [Point; 4] {
        let (sin, cos) = self.rotation.sin_cos();
        let hw = self.width / 2.0;
        let hh = self.height / 2.0;
        [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)].map(|(dx, dy)| {
            Point::new(
                self.center_x + dx * cos - dy * sin,
                self.center_y + dx * sin + dy * cos,
            )
        })
    }

    /// A box that can actually be drawn.
    pub fn is_drawable(&self) -> bool {
        self.width > 0.0
            && self.height > 0.0
            && self.center_x.is_finite()
            && self.center_y.is_finite()
            && self.rotation.is_finite()
    }
}

/// Map a normalized landmark onto a mirrored surface.
pub fn to_mirrored_pixel(landmark: &Landmark, surface_width: u32, surface_height: u32) -> Point {
    Point::new(
        (1.0 - landmark.x) * surface_width as f32,
        landmark.y * surface_height as f32,
    )
}

/// Compute the overlay placement for a surface of the given size.
///
/// Returns `None` when fewer than 468 landmarks are supplied.
pub fn compute_transform(
    landmarks: &[Landmark],
    surface_width: u32,
    surface_height: u32,
) -> Option<OverlayTransform> {
    if landmarks.len() < LANDMARK_COUNT {
        return None;
    }

    let pixel = |idx: usize| to_mirrored_pixel(&landmarks[idx], surface_width, surface_height);
    let forehead_top = pixel(anchors::FOREHEAD_TOP);
    let chin = pixel(anchors::CHIN);
    let left_temple = pixel(anchors::LEFT_TEMPLE);
    let right_temple = pixel(anchors::RIGHT_TEMPLE);

    let face_width = (right_temple.x - left_temple.x).abs();
    let face_height = (chin.y - forehead_top.y).abs();

    let width = face_width * WIDTH_FACTOR;
    let height = face_height * HEIGHT_FACTOR;

    let center_x = left_temple.midpoint(&right_temple).x;
    let top = forehead_top.y - height * LIFT_FACTOR;

    let tilt = right_temple - left_temple;
    let rotation = tilt.y.atan2(tilt.x);

    Some(OverlayTransform {
        x: center_x - width / 2.0,
        y: top,
        width,
        height,
        rotation,
        center_x,
        center_y: top + height / 2.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh(forehead: (f32, f32), chin: (f32, f32), left: (f32, f32), right: (f32, f32)) -> Vec<Landmark> {
        let mut points = vec![Landmark::new(0.5, 0.5, 0.0); LANDMARK_COUNT];
        points[anchors::FOREHEAD_TOP] = Landmark::new(forehead.0, forehead.1, 0.0);
        points[anchors::CHIN] = Landmark::new(chin.0, chin.1, 0.0);
        points[anchors::LEFT_TEMPLE] = Landmark::new(left.0, left.1, 0.0);
        points[anchors::RIGHT_TEMPLE] = Landmark::new(right.0, right.1, 0.0);
        points
    }

    #[test]
    fn mirrors_x_axis() {
        let p = to_mirrored_pixel(&Landmark::new(0.3, 0.25, 0.0), 640, 480);
        assert!((p.x - 448.0).abs() < 1e-3);
        assert!((p.y - 120.0).abs() < 1e-3);
    }

    #[test]
    fn sizes_overlay_from_face_box() {
        // Temples 100px apart, forehead-to-chin 120px on a 1000x1000 surface
        let landmarks = mesh((0.5, 0.30), (0.5, 0.42), (0.55, 0.35), (0.45, 0.35));
        let t = compute_transform(&landmarks, 1000, 1000).unwrap();

        assert!((t.width - 160.0).abs() < 1e-2);
        assert!((t.height - 108.0).abs() < 1e-2);
        assert!((t.center_x - 500.0).abs() < 1e-2);
        assert!((t.y - (300.0 - 108.0 * 0.55)).abs() < 1e-2);
        assert!((t.x - 420.0).abs() < 1e-2);
        assert!((t.center_y - (t.y + 54.0)).abs() < 1e-3);
        assert!(t.rotation.abs() < 1e-6);
    }

    #[test]
    fn rotation_follows_temple_line() {
        // Right temple lower than the left in the mirrored view
        let landmarks = mesh((0.5, 0.3), (0.5, 0.6), (0.6, 0.4), (0.4, 0.5));
        let t = compute_transform(&landmarks, 100, 100).unwrap();
        // dx = 60 - 40 = 20px, dy = 50 - 40 = 10px
        assert!((t.rotation - (10.0f32).atan2(20.0)).abs() < 1e-4);
    }

    #[test]
    fn unmirrored_temples_rotate_half_turn() {
        // Temples swapped relative to a mirrored feed
        let landmarks = mesh((0.5, 0.3), (0.5, 0.6), (0.4, 0.4), (0.6, 0.4));
        let t = compute_transform(&landmarks, 100, 100).unwrap();
        assert!((t.rotation.abs() - std::f32::consts::PI).abs() < 1e-4);
        assert!((t.width - 32.0).abs() < 1e-3);
    }

    #[test]
    fn short_input_has_no_transform() {
        assert!(compute_transform(&[], 640, 480).is_none());
        let short = vec![Landmark::default(); LANDMARK_COUNT - 1];
        assert!(compute_transform(&short, 640, 480).is_none());
    }

    #[test]
    fn corners_surround_center() {
        let t = OverlayTransform {
            x: 0.0,
            y: 0.0,
            width: 20.0,
            height: 10.0,
            rotation: std::f32::consts::FRAC_PI_2,
            center_x: 10.0,
            center_y: 5.0,
        };
        let corners = t.corners();
        // A quarter turn swaps the extents
        let min_x = corners.iter().map(|p| p.x).fold(f32::MAX, f32::min);
        let max_x = corners.iter().map(|p| p.x).fold(f32::MIN, f32::max);
        assert!((max_x - min_x - 10.0).abs() < 1e-4);
        assert!(t.is_drawable());
    }
}
