use super::{Capability, ANALYSIS_YEAR};
use crate::geo::{DateRange, Expr};

const SENTINEL2_ASSET: &str = "COPERNICUS/S2";
const LOW_NDVI: f64 = 0.2;

/// Sparse or unhealthy vegetation in the clearest Sentinel-2 scene of the year.
pub static NDVI_MASK: Capability = Capability {
    name: "get_ndvi_mask",
    label: "Low Vegetation Zones",
    guideline: "Use for vegetation loss or green cover. Keywords: vegetation, green cover, \
                NDVI, crop health, sparse greenery.",
    explanation: "It calculates the NDVI (Normalized Difference Vegetation Index) using \
                  Sentinel-2 satellite images to highlight areas with sparse or unhealthy vegetation.",
    keywords: &[
        "vegetation",
        "green",
        "greenery",
        "ndvi",
        "crop",
        "forest",
        "trees",
        "deforestation",
        "barren",
    ],
    data_year: ANALYSIS_YEAR,
    query: ndvi_mask,
};

/// Highest NDVI reached over the year, per pixel.
pub static PEAK_NDVI: Capability = Capability {
    name: "get_peak_ndvi",
    label: "Peak NDVI (Crop Growth)",
    guideline: "Use this to analyze peak vegetation health or crop productivity by retrieving \
                the highest NDVI values from Sentinel-2 imagery over a year. Keywords: peak NDVI, \
                crop monitoring, vegetation growth, time-series.",
    explanation: "It analyzes time-series NDVI data over the year to determine the maximum \
                  vegetation health, useful for crop monitoring or green cover studies.",
    keywords: &[
        "peak",
        "ndvi",
        "crop",
        "crops",
        "growth",
        "productivity",
        "agriculture",
        "harvest",
        "time-series",
    ],
    data_year: ANALYSIS_YEAR,
    query: peak_ndvi,
};

fn ndvi_mask() -> Expr {
    Expr::collection(SENTINEL2_ASSET)
        .within_region()
        .dates(DateRange::year(ANALYSIS_YEAR))
        .first_sorted_by("CLOUDY_PIXEL_PERCENTAGE")
        .normalized_difference("B8", "B4", "NDVI")
        .lt(LOW_NDVI)
        .self_mask()
}

fn peak_ndvi() -> Expr {
    Expr::collection(SENTINEL2_ASSET)
        .dates(DateRange::year(ANALYSIS_YEAR))
        .within_region()
        .map_normalized_difference("B8", "B4", "NDVI")
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::query::Reducer;

    #[test]
    fn test_ndvi_mask_uses_least_cloudy_scene() {
        match (NDVI_MASK.query)() {
            Expr::SelfMask { input } => match *input {
                Expr::LessThan { threshold, input } => {
                    assert_eq!(threshold, 0.2);
                    assert!(matches!(*input, Expr::NormalizedDifference { .. }));
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_peak_ndvi_reduces_with_max() {
        match (PEAK_NDVI.query)() {
            Expr::Collection { reduce, map, .. } => {
                assert_eq!(reduce, Reducer::Max);
                assert!(map.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
