//! Face-shape classification from face-mesh landmarks.
//!
//! Four widths are measured between fixed anchor pairs, turned into
//! dimensionless ratios, and scored against a per-shape rule table. Every
//! shape's rules add up to 100 points when all of them hold.

use serde::{Deserialize, Serialize};

use crate::types::{anchors, Landmark, LANDMARK_COUNT};

/// The six face-shape categories, in tie-break order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeCategory {
    #[default]
    Oval,
    Round,
    Square,
    Heart,
    Diamond,
    Oblong,
}

impl ShapeCategory {
    pub const ALL: [ShapeCategory; 6] = [
        ShapeCategory::Oval,
        ShapeCategory::Round,
        ShapeCategory::Square,
        ShapeCategory::Heart,
        ShapeCategory::Diamond,
        ShapeCategory::Oblong,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeCategory::Oval => "oval",
            ShapeCategory::Round => "round",
            ShapeCategory::Square => "square",
            ShapeCategory::Heart => "heart",
            ShapeCategory::Diamond => "diamond",
            ShapeCategory::Oblong => "oblong",
        }
    }

    /// Position in [`ShapeCategory::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for ShapeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ShapeCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ShapeCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown face shape: {s}"))
    }
}

/// Per-category point totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeScores {
    pub oval: u32,
    pub round: u32,
    pub square: u32,
    pub heart: u32,
    pub diamond: u32,
    pub oblong: u32,
}

impl ShapeScores {
    pub fn get(&self, category: ShapeCategory) -> u32 {
        match category {
            ShapeCategory::Oval => self.oval,
            ShapeCategory::Round => self.round,
            ShapeCategory::Square => self.square,
            ShapeCategory::Heart => self.heart,
            ShapeCategory::Diamond => self.diamond,
            ShapeCategory::Oblong => self.oblong,
        }
    }

    fn slot(&mut self, category: ShapeCategory) -> &mut u32 {
        match category {
            ShapeCategory::Oval => &mut self.oval,
            ShapeCategory::Round => &mut self.round,
            ShapeCategory::Square => &mut self.square,
            ShapeCategory::Heart => &mut self.heart,
            ShapeCategory::Diamond => &mut self.diamond,
            ShapeCategory::Oblong => &mut self.oblong,
        }
    }

    /// Highest-scoring category. Only a strictly higher score displaces an
    /// earlier category, and a face that scores nothing anywhere is oval.
    pub fn best(&self) -> (ShapeCategory, u32) {
        let mut best = (ShapeCategory::Oval, 0);
        for category in ShapeCategory::ALL {
            let score = self.get(category);
            if score > best.1 {
                best = (category, score);
            }
        }
        best
    }

    /// Winning score as a fraction of a perfect match, capped at 1.
    pub fn confidence(&self) -> f64 {
        (self.best().1 as f64 / 100.0).min(1.0)
    }
}

/// Raw widths in normalized image units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    pub jaw_width: f64,
    pub forehead_width: f64,
    pub cheekbone_width: f64,
    pub face_length: f64,
}

impl Measurements {
    /// Returns `None` for landmark sets too short to hold every anchor.
    pub fn from_landmarks(landmarks: &[Landmark]) -> Option<Self> {
        if landmarks.len() < LANDMARK_COUNT {
            return None;
        }

        let span = |a: usize, b: usize| landmarks[a].planar_distance(&landmarks[b]);

        Some(Self {
            forehead_width: span(anchors::LEFT_FOREHEAD, anchors::RIGHT_FOREHEAD),
            cheekbone_width: span(anchors::LEFT_CHEEKBONE, anchors::RIGHT_CHEEKBONE),
            jaw_width: span(anchors::LEFT_JAW, anchors::RIGHT_JAW),
            face_length: span(anchors::FOREHEAD_TOP, anchors::CHIN),
        })
    }

    /// Evaluate one derived quantity.
    pub fn metric(&self, metric: Metric) -> f64 {
        let forehead = self.forehead_width;
        let cheek = self.cheekbone_width;
        let jaw = self.jaw_width;

        match metric {
            Metric::LengthToWidth => self.face_length / cheek,
            Metric::JawToCheek => jaw / cheek,
            Metric::ForeheadToJaw => forehead / jaw,
            Metric::ForeheadToCheek => forehead / cheek,
            Metric::TaperSpread => (forehead / cheek - jaw / cheek).abs(),
            Metric::EdgeSpread => (forehead - jaw).abs() / cheek,
            Metric::CheekOverJaw => cheek - jaw * 0.95,
            Metric::CheekProminence => cheek - forehead.max(jaw),
        }
    }
}

/// Quantities the rule table tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Face length over cheekbone width.
    LengthToWidth,
    JawToCheek,
    ForeheadToJaw,
    ForeheadToCheek,
    /// |forehead/cheek - jaw/cheek|
    TaperSpread,
    /// |forehead - jaw| / cheek
    EdgeSpread,
    /// Positive when cheekbones are wider than 95% of the jaw.
    CheekOverJaw,
    /// Positive when cheekbones are wider than both forehead and jaw.
    CheekProminence,
}

/// One scoring rule: `points` are awarded when the metric lies strictly
/// inside the open interval `(above, below)`. A missing bound is unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub metric: Metric,
    pub above: Option<f64>,
    pub below: Option<f64>,
    pub points: u32,
}

impl Rule {
    pub const fn between(metric: Metric, above: f64, below: f64, points: u32) -> Self {
        Self {
            metric,
            above: Some(above),
            below: Some(below),
            points,
        }
    }

    pub const fn above(metric: Metric, above: f64, points: u32) -> Self {
        Self {
            metric,
            above: Some(above),
            below: None,
            points,
        }
    }

    pub const fn below(metric: Metric, below: f64, points: u32) -> Self {
        Self {
            metric,
            above: None,
            below: Some(below),
            points,
        }
    }

    pub fn holds(&self, value: f64) -> bool {
        self.above.map_or(true, |lo| value > lo) && self.below.map_or(true, |hi| value < hi)
    }
}

use Metric::*;

/// Tuned scoring rules per shape.
pub static RULES: [(ShapeCategory, &[Rule]); 6] = [
    (
        ShapeCategory::Oval,
        &[
            Rule::between(LengthToWidth, 1.2, 1.6, 30),
            Rule::between(JawToCheek, 0.7, 0.9, 30),
            Rule::between(ForeheadToJaw, 1.0, 1.3, 20),
            Rule::between(ForeheadToCheek, 0.85, 1.05, 20),
        ],
    ),
    (
        ShapeCategory::Round,
        &[
            Rule::between(LengthToWidth, 0.9, 1.2, 30),
            Rule::above(JawToCheek, 0.85, 30),
            Rule::below(TaperSpread, 0.1, 20),
            Rule::above(CheekOverJaw, 0.0, 20),
        ],
    ),
    (
        ShapeCategory::Square,
        &[
            Rule::between(LengthToWidth, 0.95, 1.25, 25),
            Rule::above(JawToCheek, 0.9, 30),
            Rule::between(ForeheadToCheek, 0.9, 1.1, 25),
            Rule::below(EdgeSpread, 0.1, 20),
        ],
    ),
    (
        ShapeCategory::Heart,
        &[
            Rule::above(ForeheadToJaw, 1.2, 35),
            Rule::above(ForeheadToCheek, 0.95, 25),
            Rule::below(JawToCheek, 0.8, 25),
            Rule::between(LengthToWidth, 1.1, 1.5, 15),
        ],
    ),
    (
        ShapeCategory::Diamond,
        &[
            Rule::below(ForeheadToCheek, 0.85, 30),
            Rule::below(JawToCheek, 0.8, 30),
            Rule::above(CheekProminence, 0.0, 25),
            Rule::between(LengthToWidth, 1.1, 1.5, 15),
        ],
    ),
    (
        ShapeCategory::Oblong,
        &[
            Rule::above(LengthToWidth, 1.5, 40),
            Rule::below(TaperSpread, 0.15, 25),
            Rule::between(JawToCheek, 0.75, 0.95, 20),
            Rule::between(ForeheadToCheek, 0.85, 1.05, 15),
        ],
    ),
];

/// Score every category against the rule table.
pub fn score(measurements: &Measurements) -> ShapeScores {
    let mut scores = ShapeScores::default();
    for (category, rules) in RULES.iter() {
        let total = scores.slot(*category);
        for rule in rules.iter() {
            if rule.holds(measurements.metric(rule.metric)) {
                *total += rule.points;
            }
        }
    }
    scores
}

/// Outcome of classifying a single frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub shape: ShapeCategory,
    pub confidence: f64,
    pub scores: ShapeScores,
    pub measurements: Measurements,
}

/// Classify a face from its landmarks.
///
/// Returns `None` when fewer than 468 landmarks are supplied. The result is a
/// pure function of the input.
pub fn classify(landmarks: &[Landmark]) -> Option<ClassificationResult> {
    let measurements = Measurements::from_landmarks(landmarks)?;
    let scores = score(&measurements);
    let (shape, _) = scores.best();

    Some(ClassificationResult {
        shape,
        confidence: scores.confidence(),
        scores,
        measurements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a mesh whose anchor widths match the given values.
    fn face(forehead: f32, cheek: f32, jaw: f32, length: f32) -> Vec<Landmark> {
        let mut points = vec![Landmark::new(0.5, 0.5, 0.0); LANDMARK_COUNT];
        let mut pair = |left: usize, right: usize, width: f32, y: f32| {
            points[left] = Landmark::new(0.5 - width / 2.0, y, 0.0);
            points[right] = Landmark::new(0.5 + width / 2.0, y, 0.0);
        };
        pair(anchors::LEFT_FOREHEAD, anchors::RIGHT_FOREHEAD, forehead, 0.3);
        pair(anchors::LEFT_CHEEKBONE, anchors::RIGHT_CHEEKBONE, cheek, 0.45);
        pair(anchors::LEFT_JAW, anchors::RIGHT_JAW, jaw, 0.65);
        points[anchors::FOREHEAD_TOP] = Landmark::new(0.5, 0.15, 0.0);
        points[anchors::CHIN] = Landmark::new(0.5, 0.15 + length, 0.0);
        points
    }

    #[test]
    fn every_category_budgets_100_points() {
        for (category, rules) in RULES.iter() {
            let total: u32 = rules.iter().map(|r| r.points).sum();
            assert_eq!(total, 100, "{category} rules do not sum to 100");
        }
    }

    #[test]
    fn rule_bounds_are_exclusive() {
        let rule = Rule::between(JawToCheek, 0.7, 0.9, 30);
        assert!(rule.holds(0.8));
        assert!(!rule.holds(0.7));
        assert!(!rule.holds(0.9));
        assert!(!rule.holds(f64::NAN));
        assert!(Rule::above(CheekOverJaw, 0.0, 20).holds(0.001));
        assert!(!Rule::below(TaperSpread, 0.1, 20).holds(0.1));
    }

    #[test]
    fn classifies_each_shape() {
        let cases = [
            (face(0.36, 0.40, 0.32, 0.56), ShapeCategory::Oval),
            (face(0.42, 0.40, 0.44, 0.42), ShapeCategory::Square),
            (face(0.43, 0.40, 0.30, 0.52), ShapeCategory::Heart),
            (face(0.34, 0.44, 0.33, 0.57), ShapeCategory::Diamond),
            (face(0.32, 0.36, 0.30, 0.63), ShapeCategory::Oblong),
        ];
        for (landmarks, expected) in cases {
            let result = classify(&landmarks).unwrap();
            assert_eq!(result.shape, expected, "scores: {:?}", result.scores);
            assert_eq!(result.scores.get(expected), 100);
            assert_eq!(result.confidence, 1.0);
        }
    }

    #[test]
    fn ties_resolve_in_category_order() {
        // Scores a perfect round and a perfect square
        let result = classify(&face(0.37, 0.40, 0.38, 0.42)).unwrap();
        assert_eq!(result.scores.round, 100);
        assert_eq!(result.scores.square, 100);
        assert_eq!(result.shape, ShapeCategory::Round);
    }

    #[test]
    fn degenerate_face_defaults_to_oval() {
        let flat = vec![Landmark::new(0.5, 0.5, 0.0); LANDMARK_COUNT];
        let result = classify(&flat).unwrap();
        assert_eq!(result.scores, ShapeScores::default());
        assert_eq!(result.shape, ShapeCategory::Oval);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn partial_match_confidence() {
        let scores = ShapeScores {
            diamond: 55,
            heart: 40,
            ..Default::default()
        };
        assert_eq!(scores.best(), (ShapeCategory::Diamond, 55));
        assert!((scores.confidence() - 0.55).abs() < 1e-12);
    }

    #[test]
    fn short_input_is_not_classified() {
        assert!(classify(&[]).is_none());
        let short = vec![Landmark::default(); LANDMARK_COUNT - 1];
        assert!(classify(&short).is_none());
    }

    #[test]
    fn classification_is_deterministic() {
        let landmarks = face(0.36, 0.40, 0.32, 0.56);
        let first = classify(&landmarks).unwrap();
        for _ in 0..10 {
            assert_eq!(classify(&landmarks).unwrap(), first);
        }
    }

    #[test]
    fn category_names_round_trip() {
        for category in ShapeCategory::ALL {
            assert_eq!(category.as_str().parse::<ShapeCategory>().unwrap(), category);
        }
        assert!("triangle".parse::<ShapeCategory>().is_err());
        assert_eq!(
            serde_json::to_string(&ShapeCategory::Oblong).unwrap(),
            "\"oblong\""
        );
    }

    #[test]
    fn default_category_is_oval() {
        assert_eq!(ShapeCategory::default(), ShapeCategory::Oval);
        assert_eq!(ShapeScores::default().best(), (ShapeCategory::Oval, 0));
    }
}
