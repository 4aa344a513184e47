//! Human-readable reasoning trace for a routing decision.

use crate::agent::FallbackReason;
use crate::tools::Capability;

/// Explain a decision where the model settled on `capability`.
pub fn build(capability: &Capability, query: &str, city: &str, buffer_km: u32) -> Vec<String> {
    let mut lines = vec![
        format!("🧭 You asked: \"{}\".", query.trim()),
        format!("📍 Detected location: **{}**.", city),
        format!(
            "📏 The analysis covers a {} km radius buffer around the center of {}.",
            buffer_km, city
        ),
        format!(
            "🤖 The AI matched the query to the **{}** analysis.",
            capability.label
        ),
    ];
    lines.extend(method_lines(capability));
    lines.push(format!(
        "✅ Summary: **{}** around {} ({} km buffer) is now shown on the map.",
        capability.label, city, buffer_km
    ));
    lines
}

/// Explain a decision that fell back to `fallback`.
pub fn build_fallback(
    reason: &FallbackReason,
    fallback: &Capability,
    query: &str,
    city: &str,
    buffer_km: u32,
) -> Vec<String> {
    let uncertainty = match reason {
        FallbackReason::Unparseable => format!(
            "⚠️ The AI had trouble understanding the query \"{}\", so a default analysis was used.",
            query.trim()
        ),
        FallbackReason::UnknownTool(Some(requested)) => format!(
            "⚠️ The AI did not settle on a known tool (it asked for `{}`), so a default analysis was used.",
            requested
        ),
        FallbackReason::UnknownTool(None) => format!(
            "⚠️ The AI did not settle on a known tool for \"{}\", so a default analysis was used.",
            query.trim()
        ),
    };

    let mut lines = vec![
        uncertainty,
        format!("📍 Location: **{}**.", city),
        format!("📏 Buffer radius: {} km.", buffer_km),
    ];
    lines.extend(method_lines(fallback));
    lines.push(format!(
        "🔁 Try rephrasing the query if **{}** is not what you were looking for.",
        fallback.label
    ));
    lines
}

fn method_lines(capability: &Capability) -> Vec<String> {
    vec![
        format!(
            "🛠️ The tool **{}** was used. {}",
            capability.name, capability.explanation
        ),
        format!("📅 Data year: {}.", capability.data_year),
        "⚙️ The dataset query was clipped to the buffered region and evaluated remotely."
            .to_string(),
        format!(
            "🗺️ The result is overlaid on the map as the \"{}\" layer.",
            capability.label
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{terrain, vegetation};

    #[test]
    fn test_build_mentions_city_buffer_and_method() {
        let lines = build(
            &terrain::FLOOD_MASK,
            "Flood prone areas in Guwahati",
            "Guwahati",
            60,
        );
        let text = lines.join("\n");
        assert!(lines[0].contains("Flood prone areas in Guwahati"));
        assert!(text.contains("Guwahati"));
        assert!(text.contains("60 km"));
        assert!(text.contains("The tool **get_flood_mask** was used. It analyzes elevation"));
        assert!(text.contains("Data year: 2000"));
    }

    #[test]
    fn test_build_uses_capability_data_year() {
        let text = build(&vegetation::NDVI_MASK, "green cover", "Hyderabad", 30).join("\n");
        assert!(text.contains("Data year: 2023"));
        assert!(text.contains("Low Vegetation Zones"));
    }

    #[test]
    fn test_fallback_opens_with_uncertainty() {
        let lines = build_fallback(
            &FallbackReason::Unparseable,
            &terrain::FLOOD_MASK,
            "???",
            "Kolkata",
            90,
        );
        assert!(lines[0].starts_with("⚠️ The AI had trouble understanding the query"));
        assert!(lines.iter().any(|l| l.contains("90 km")));

        let lines = build_fallback(
            &FallbackReason::UnknownTool(Some("get_rainfall".to_string())),
            &terrain::FLOOD_MASK,
            "rainfall in Kolkata",
            "Kolkata",
            90,
        );
        assert!(lines[0].contains("The AI did not settle on a known tool"));
        assert!(lines[0].contains("get_rainfall"));
    }
}
