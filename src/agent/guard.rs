use crate::config::GuardPolicy;
use crate::error::RouteError;
use crate::retriever::query_words;
use crate::tools::{terrain, Capability};

/// Reject a capability the query gives no lexical reason to pick.
pub fn check_plausibility(
    policy: GuardPolicy,
    capability: &'static Capability,
    query: &str,
) -> Result<(), RouteError> {
    let plausible = match policy {
        GuardPolicy::Off => true,
        GuardPolicy::FloodKeyword => {
            capability.name != terrain::FLOOD_MASK.name || query.to_lowercase().contains("flood")
        }
        GuardPolicy::AllCapabilities => {
            let words = query_words(query);
            capability.keywords.iter().any(|k| words.contains(*k))
        }
    };

    if plausible {
        Ok(())
    } else {
        log::warn!(
            "Guard: {} rejected for query \"{}\" ({:?})",
            capability.name,
            query,
            policy
        );
        Err(RouteError::ToolQueryMismatch {
            tool: capability.name,
            query: query.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{solar, vegetation};

    #[test]
    fn test_flood_keyword_rejects_flood_tool_without_flood() {
        let err = check_plausibility(
            GuardPolicy::FloodKeyword,
            &terrain::FLOOD_MASK,
            "low-lying terrain in Guwahati",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RouteError::ToolQueryMismatch {
                tool: "get_flood_mask",
                ..
            }
        ));
    }

    #[test]
    fn test_flood_keyword_is_case_insensitive_substring() {
        assert!(check_plausibility(
            GuardPolicy::FloodKeyword,
            &terrain::FLOOD_MASK,
            "FLOODING risk in Kolkata"
        )
        .is_ok());
    }

    #[test]
    fn test_flood_keyword_ignores_other_tools() {
        assert!(check_plausibility(
            GuardPolicy::FloodKeyword,
            &solar::SOLAR_IRRADIANCE,
            "flood prone areas"
        )
        .is_ok());
    }

    #[test]
    fn test_all_capabilities_uses_keywords() {
        assert!(check_plausibility(
            GuardPolicy::AllCapabilities,
            &vegetation::NDVI_MASK,
            "green cover loss in Hyderabad"
        )
        .is_ok());
        assert!(check_plausibility(
            GuardPolicy::AllCapabilities,
            &vegetation::NDVI_MASK,
            "solar potential in Hyderabad"
        )
        .is_err());
        assert!(check_plausibility(
            GuardPolicy::AllCapabilities,
            &terrain::FLOOD_MASK,
            "low-lying terrain in Guwahati"
        )
        .is_ok());
    }

    #[test]
    fn test_off_accepts_anything() {
        assert!(check_plausibility(GuardPolicy::Off, &terrain::FLOOD_MASK, "solar").is_ok());
    }
}
