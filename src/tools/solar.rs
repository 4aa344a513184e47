use super::{Capability, ANALYSIS_YEAR};
use crate::geo::{DateRange, Expr};

pub static SOLAR_IRRADIANCE: Capability = Capability {
    name: "get_solar_irradiance",
    label: "Solar Irradiance",
    guideline: "Use for solar irradiance analysis. Keywords: solar, irradiance, sunlight, MODIS.",
    explanation: "It computes the average solar radiation received over the year using MODIS \
                  data, helping identify areas best suited for solar panels.",
    keywords: &[
        "solar",
        "irradiance",
        "sunlight",
        "sun",
        "radiation",
        "modis",
        "panels",
        "photovoltaic",
    ],
    data_year: ANALYSIS_YEAR,
    query: solar_irradiance,
};

fn solar_irradiance() -> Expr {
    Expr::collection("MODIS/061/MCD18A1")
        .select(&["ALLSKY_SFC_SW_DWN"])
        .dates(DateRange::year(ANALYSIS_YEAR))
        .mean()
}
