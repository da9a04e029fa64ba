//! Style recommendations keyed by face shape.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::classifier::ShapeCategory;

/// Compatibility assumed for catalog entries that do not rate a shape.
pub const DEFAULT_COMPATIBILITY: u8 = 50;

/// Human-facing description of a face shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShapeInfo {
    pub shape: ShapeCategory,
    pub label: &'static str,
    pub description: &'static str,
    pub best_styles: &'static [&'static str],
    pub avoid_styles: &'static [&'static str],
}

static SHAPE_INFO: [ShapeInfo; 6] = [
    ShapeInfo {
        shape: ShapeCategory::Oval,
        label: "Oval",
        description: "Balanced proportions, slightly longer than wide",
        best_styles: &["Textured crop", "Quiff", "Pompadour", "Side part"],
        avoid_styles: &["Very heavy bangs"],
    },
    ShapeInfo {
        shape: ShapeCategory::Round,
        label: "Round",
        description: "Similar width and length, soft jawline",
        best_styles: &["Faux hawk", "High fade", "Pompadour", "Angular fringe"],
        avoid_styles: &["Flat sides", "Bowl cuts"],
    },
    ShapeInfo {
        shape: ShapeCategory::Square,
        label: "Square",
        description: "Strong angular jawline, similar width and length",
        best_styles: &["French crop", "Side part", "Textured fringe", "Medium length"],
        avoid_styles: &["Very short all over"],
    },
    ShapeInfo {
        shape: ShapeCategory::Heart,
        label: "Heart",
        description: "Wider forehead, narrow chin",
        best_styles: &["Side-swept", "Textured layers", "Medium fringe", "Taper fade"],
        avoid_styles: &["Slicked back tight"],
    },
    ShapeInfo {
        shape: ShapeCategory::Diamond,
        label: "Diamond",
        description: "Wide cheekbones, narrow forehead and jaw",
        best_styles: &["Textured fringe", "Side part", "Curtain bangs", "Messy top"],
        avoid_styles: &["Slicked back", "Very short sides"],
    },
    ShapeInfo {
        shape: ShapeCategory::Oblong,
        label: "Oblong",
        description: "Noticeably longer than wide, straight sides",
        best_styles: &["Side part", "Classic taper", "Textured crop", "Fringe styles"],
        avoid_styles: &["Extra height on top", "Very tight sides"],
    },
];

/// Recommendation metadata for a shape.
pub fn shape_info(shape: ShapeCategory) -> &'static ShapeInfo {
    &SHAPE_INFO[shape.index()]
}

/// A hairstyle as described by the external catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HairstyleEntry {
    pub id: String,
    pub name: String,
    /// Locator handed to an [`AssetSource`](crate::AssetSource).
    pub overlay_ref: String,
    #[serde(default)]
    pub face_shape_scores: HashMap<ShapeCategory, u8>,
}

impl HairstyleEntry {
    pub fn compatibility(&self, shape: ShapeCategory) -> u8 {
        self.face_shape_scores
            .get(&shape)
            .copied()
            .unwrap_or(DEFAULT_COMPATIBILITY)
    }
}

/// Order catalog entries from most to least compatible with `shape`.
///
/// The sort is stable, so equally rated entries keep catalog order.
pub fn rank_hairstyles(entries: &[HairstyleEntry], shape: ShapeCategory) -> Vec<(&HairstyleEntry, u8)> {
    let mut ranked: Vec<_> = entries
        .iter()
        .map(|entry| (entry, entry.compatibility(shape)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, scores: &[(ShapeCategory, u8)]) -> HairstyleEntry {
        HairstyleEntry {
            id: id.to_string(),
            name: id.to_uppercase(),
            overlay_ref: format!("{id}.png"),
            face_shape_scores: scores.iter().copied().collect(),
        }
    }

    #[test]
    fn info_table_matches_categories() {
        for category in ShapeCategory::ALL {
            let info = shape_info(category);
            assert_eq!(info.shape, category);
            assert!(!info.best_styles.is_empty());
        }
    }

    #[test]
    fn ranking_uses_default_for_unrated_shapes() {
        let entries = vec![
            entry("crop", &[(ShapeCategory::Round, 40)]),
            entry("quiff", &[(ShapeCategory::Round, 90)]),
            entry("taper", &[(ShapeCategory::Oval, 80)]),
        ];

        let ranked = rank_hairstyles(&entries, ShapeCategory::Round);
        let ids: Vec<_> = ranked.iter().map(|(e, _)| e.id.as_str()).collect();
        assert_eq!(ids, ["quiff", "taper", "crop"]);
        assert_eq!(ranked[1].1, DEFAULT_COMPATIBILITY);
    }

    #[test]
    fn entries_deserialize_with_shape_keys() {
        let json = r#"{"id":"a","name":"A","overlay_ref":"a.png","face_shape_scores":{"heart":75}}"#;
        let parsed: HairstyleEntry = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.compatibility(ShapeCategory::Heart), 75);
        assert_eq!(parsed.compatibility(ShapeCategory::Square), 50);
    }
}
