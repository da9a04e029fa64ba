use serde::{Deserialize, Serialize};

/// Number of points in a face-mesh landmark set.
pub const LANDMARK_COUNT: usize = 468;

/// Fixed anchor indices in the face-mesh topology.
pub mod anchors {
    /// Forehead top centre.
    pub const FOREHEAD_TOP: usize = 10;
    /// Chin bottom.
    pub const CHIN: usize = 152;
    pub const LEFT_TEMPLE: usize = 234;
    pub const RIGHT_TEMPLE: usize = 454;
    pub const LEFT_FOREHEAD: usize = 54;
    pub const RIGHT_FOREHEAD: usize = 284;
    pub const LEFT_JAW: usize = 172;
    pub const RIGHT_JAW: usize = 397;
    pub const LEFT_CHEEKBONE: usize = 132;
    pub const RIGHT_CHEEKBONE: usize = 361;

    /// Indices marked by the debug renderer.
    pub const DEBUG_POINTS: [usize; 10] = [
        FOREHEAD_TOP,
        CHIN,
        LEFT_TEMPLE,
        RIGHT_TEMPLE,
        LEFT_FOREHEAD,
        RIGHT_FOREHEAD,
        LEFT_JAW,
        RIGHT_JAW,
        LEFT_CHEEKBONE,
        RIGHT_CHEEKBONE,
    ];
}

/// A 2D point in surface pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Midpoint between two points.
    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

impl std::ops::Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

/// A single face-mesh landmark.
///
/// `x` and `y` are fractions of the image width and height. `z` is relative
/// depth and is carried through untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance in normalized image space, ignoring depth.
    pub fn planar_distance(&self, other: &Landmark) -> f64 {
        let dx = self.x as f64 - other.x as f64;
        let dy = self.y as f64 - other.y as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// The landmarks produced for one frame.
///
/// Construction fails when fewer than [`LANDMARK_COUNT`] points are supplied,
/// so a `LandmarkSet` in hand is always safe to index at any anchor. Refined
/// meshes with extra iris points are accepted as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    points: Vec<Landmark>,
}

impl LandmarkSet {
    /// Returns `None` when the detector output is too short to use.
    pub fn new(points: Vec<Landmark>) -> Option<Self> {
        if points.len() < LANDMARK_COUNT {
            return None;
        }
        Some(Self { points })
    }

    pub fn num_landmarks(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }
}

impl std::ops::Deref for LandmarkSet {
    type Target = [Landmark];

    fn deref(&self) -> &Self::Target {
        &self.points
    }
}

impl<'de> Deserialize<'de> for LandmarkSet {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let points = Vec::<Landmark>::deserialize(deserializer)?;
        let len = points.len();
        LandmarkSet::new(points).ok_or_else(|| {
            serde::de::Error::invalid_length(len, &"at least 468 face-mesh landmarks")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_arithmetic() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(3.0, 4.0);

        let diff = b - a;
        assert_eq!(diff.x, 2.0);
        assert_eq!(diff.y, 2.0);

        let mid = a.midpoint(&b);
        assert_eq!(mid, Point::new(2.0, 3.0));
    }

    #[test]
    fn landmark_set_rejects_short_input() {
        assert!(LandmarkSet::new(Vec::new()).is_none());
        assert!(LandmarkSet::new(vec![Landmark::default(); LANDMARK_COUNT - 1]).is_none());
        assert!(LandmarkSet::new(vec![Landmark::default(); LANDMARK_COUNT]).is_some());
        // Refined mesh with iris points
        let refined = LandmarkSet::new(vec![Landmark::default(); 478]).unwrap();
        assert_eq!(refined.num_landmarks(), 478);
    }

    #[test]
    fn landmark_set_deserialize_checks_length() {
        let short = serde_json::to_string(&vec![Landmark::default(); 10]).unwrap();
        assert!(serde_json::from_str::<LandmarkSet>(&short).is_err());

        let full = serde_json::to_string(&vec![Landmark::new(0.5, 0.5, 0.0); 468]).unwrap();
        let set: LandmarkSet = serde_json::from_str(&full).unwrap();
        assert_eq!(set[anchors::CHIN], Landmark::new(0.5, 0.5, 0.0));
    }

    #[test]
    fn planar_distance_ignores_depth() {
        let a = Landmark::new(0.0, 0.0, 5.0);
        let b = Landmark::new(0.3, 0.4, -2.0);
        assert!((a.planar_distance(&b) - 0.5).abs() < 1e-6);
    }
}
