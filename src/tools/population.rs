use super::Capability;
use crate::geo::{DateRange, Expr};

const POPULATION_YEAR: i32 = 2020;

pub static POPULATION_OVERLAY: Capability = Capability {
    name: "get_population_overlay",
    label: "Population Density",
    guideline: "Use for where people live or how densely an area is populated. Keywords: \
                population, people, density, inhabitants, WorldPop.",
    explanation: "It overlays WorldPop's 100m gridded population estimates, showing how many \
                  people live in each cell of the selected region.",
    keywords: &[
        "population",
        "people",
        "density",
        "dense",
        "inhabitants",
        "populated",
        "residents",
        "worldpop",
    ],
    data_year: POPULATION_YEAR,
    query: population_overlay,
};

fn population_overlay() -> Expr {
    Expr::collection("WorldPop/GP/100m/pop")
        .dates(DateRange::year(POPULATION_YEAR))
        .first()
}
