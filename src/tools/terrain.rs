use super::Capability;
use crate::geo::Expr;

const ELEVATION_ASSET: &str = "USGS/SRTMGL1_003";
const MAX_ELEVATION_M: f64 = 200.0;
const MAX_SLOPE_DEG: f64 = 10.0;

/// Low, flat terrain: elevation under 200 m and slope under 10 degrees.
pub static FLOOD_MASK: Capability = Capability {
    name: "get_flood_mask",
    label: "Flood-Prone Terrain",
    guideline: "Use ONLY when the query talks about flood-prone areas due to terrain, \
                elevation, or slope. Do NOT use for 'flood extent', 'water detection', or \
                'radar'. Keywords: flood-prone, elevation, slope.",
    explanation: "It analyzes elevation and terrain slope to identify low-lying, flat areas \
                  below 200 meters elevation and less than 10° slope, which are prone to flooding.",
    keywords: &[
        "flood",
        "floods",
        "flooding",
        "flood-prone",
        "elevation",
        "slope",
        "low-lying",
        "terrain",
        "waterlogging",
    ],
    data_year: 2000,
    query: flood_mask,
};

fn flood_mask() -> Expr {
    let low_elevation = Expr::image(ELEVATION_ASSET).lt(MAX_ELEVATION_M);
    let flat_slope = Expr::image(ELEVATION_ASSET).slope().lt(MAX_SLOPE_DEG);
    low_elevation.and(flat_slope).self_mask()
}
