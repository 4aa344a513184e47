use super::Capability;
use crate::geo::Expr;

pub static LAND_COVER: Capability = Capability {
    name: "get_land_cover",
    label: "Land Cover Classification",
    guideline: "Use for land cover classification. Keywords: land cover, ESA, WorldCover, \
                classification.",
    explanation: "It retrieves detailed land cover categories (e.g., forest, urban, agriculture) \
                  from ESA's WorldCover dataset at 10m resolution.",
    keywords: &[
        "land",
        "cover",
        "landcover",
        "land-use",
        "classification",
        "worldcover",
        "esa",
        "urban",
        "built-up",
    ],
    data_year: 2020,
    query: land_cover,
};

fn land_cover() -> Expr {
    Expr::image("ESA/WorldCover/v100/2020")
}
