use serde::Serialize;

/// Color ramp and value range for rendering a layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerStyle {
    pub palette: Vec<&'static str>,
    pub min: f64,
    pub max: f64,
}

struct StyleRule {
    keyword: &'static str,
    palette: &'static [&'static str],
    min: f64,
    max: f64,
}

/// ESA WorldCover classes 10 through 100.
const WORLDCOVER_PALETTE: &[&str] = &[
    "#006400", "#FFBB22", "#FFFF4C", "#F096FF", "#FA0000", "#B4B4B4", "#F0F0F0", "#0064C8",
    "#0096A0", "#00CF75", "#FAE6A0",
];

/// First matching keyword wins.
const RULES: &[StyleRule] = &[
    StyleRule {
        keyword: "vegetation",
        palette: &["#00FF00"],
        min: 0.0,
        max: 1.0,
    },
    StyleRule {
        keyword: "ndvi",
        palette: &["#FFFFFF", "#00FF00"],
        min: 0.0,
        max: 1.0,
    },
    StyleRule {
        keyword: "water",
        palette: &["#0000FF"],
        min: 0.0,
        max: 1.0,
    },
    StyleRule {
        keyword: "solar",
        palette: &["#FFFF00", "#FF8C00", "#FF0000"],
        min: 0.0,
        max: 300.0,
    },
    StyleRule {
        keyword: "land cover",
        palette: WORLDCOVER_PALETTE,
        min: 10.0,
        max: 100.0,
    },
    StyleRule {
        keyword: "population",
        palette: &["white", "red"],
        min: 0.0,
        max: 300.0,
    },
];

const DEFAULT_RULE: StyleRule = StyleRule {
    keyword: "",
    palette: &["#FF0000"],
    min: 0.0,
    max: 1.0,
};

impl LayerStyle {
    /// Pick a style by case-insensitive keyword match on the display label.
    pub fn for_label(label: &str) -> Self {
        let label = label.to_lowercase();
        let rule = RULES
            .iter()
            .find(|rule| label.contains(rule.keyword))
            .unwrap_or(&DEFAULT_RULE);

        Self {
            palette: rule.palette.to_vec(),
            min: rule.min,
            max: rule.max,
        }
    }
}
