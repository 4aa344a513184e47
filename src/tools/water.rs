use super::{Capability, ANALYSIS_YEAR};
use crate::geo::{DateRange, Expr};

/// Mean VV backscatter below this (dB) is treated as open water.
const WATER_BACKSCATTER_DB: f64 = -15.0;

pub static S1_WATER_MASK: Capability = Capability {
    name: "get_s1_water_mask",
    label: "Radar-based Water Detection",
    guideline: "Use for detecting actual water or flood extent using radar (Sentinel-1). \
                Keywords: water extent, flood extent, radar, Sentinel-1.",
    explanation: "It processes Sentinel-1 radar data to detect water surfaces, including \
                  flooded regions, by identifying low radar backscatter values.",
    keywords: &[
        "water",
        "flood",
        "flooded",
        "extent",
        "inundation",
        "inundated",
        "radar",
        "sentinel-1",
        "sar",
        "lake",
        "river",
    ],
    data_year: ANALYSIS_YEAR,
    query: s1_water_mask,
};

fn s1_water_mask() -> Expr {
    Expr::collection("COPERNICUS/S1_GRD")
        .within_region()
        .dates(DateRange::year(ANALYSIS_YEAR))
        .filter_eq("instrumentMode", "IW")
        .filter_list_contains("transmitterReceiverPolarisation", "VV")
        .select(&["VV"])
        .mean()
        .lt(WATER_BACKSCATTER_DB)
        .self_mask()
}
