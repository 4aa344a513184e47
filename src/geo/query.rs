//! Declarative dataset expressions handed to the geospatial backend.
//!
//! Capabilities never touch pixels. They describe what to fetch (an image or a
//! filtered and reduced collection) and which per-pixel operations to apply,
//! and the backend evaluates the expression lazily, clipped to a region.

use chrono::NaiveDate;
use serde::Serialize;

/// Inclusive date window used to filter image collections.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// The whole calendar year, 1 January through 31 December.
    pub fn year(year: i32) -> Self {
        // Both dates exist for every year chrono can represent.
        let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN);
        let end = NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(NaiveDate::MAX);
        Self { start, end }
    }
}

/// Metadata filter applied to every image of a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PropertyFilter {
    Equals { property: String, value: String },
    ListContains { property: String, value: String },
}

/// How a collection is collapsed into a single image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reducer {
    /// Least value of `sort_by` first, then take the first image.
    First { sort_by: Option<String> },
    Mean,
    Max,
}

/// Per-image band math applied before a collection is reduced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PerImage {
    NormalizedDifference { bands: [String; 2], rename: String },
}

/// A lazily evaluated raster expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Expr {
    Image {
        asset: String,
    },
    Collection {
        asset: String,
        date_range: Option<DateRange>,
        /// Restrict to images intersecting the analysis region.
        within_region: bool,
        filters: Vec<PropertyFilter>,
        select: Vec<String>,
        map: Option<PerImage>,
        reduce: Reducer,
    },
    Slope {
        input: Box<Expr>,
    },
    NormalizedDifference {
        input: Box<Expr>,
        bands: [String; 2],
        rename: String,
    },
    LessThan {
        input: Box<Expr>,
        threshold: f64,
    },
    And {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    SelfMask {
        input: Box<Expr>,
    },
}

impl Expr {
    pub fn image(asset: &str) -> Self {
        Expr::Image {
            asset: asset.to_string(),
        }
    }

    /// Start a collection query; refine it with [`CollectionBuilder`].
    pub fn collection(asset: &str) -> CollectionBuilder {
        CollectionBuilder {
            asset: asset.to_string(),
            date_range: None,
            within_region: false,
            filters: Vec::new(),
            select: Vec::new(),
            map: None,
        }
    }

    /// Terrain slope in degrees, derived from an elevation model.
    pub fn slope(self) -> Self {
        Expr::Slope {
            input: Box::new(self),
        }
    }

    pub fn normalized_difference(self, a: &str, b: &str, rename: &str) -> Self {
        Expr::NormalizedDifference {
            input: Box::new(self),
            bands: [a.to_string(), b.to_string()],
            rename: rename.to_string(),
        }
    }

    pub fn lt(self, threshold: f64) -> Self {
        Expr::LessThan {
            input: Box::new(self),
            threshold,
        }
    }

    pub fn and(self, other: Expr) -> Self {
        Expr::And {
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// Mask out every zero pixel, so only qualifying pixels remain.
    pub fn self_mask(self) -> Self {
        Expr::SelfMask {
            input: Box::new(self),
        }
    }
}

/// Fluent builder for [`Expr::Collection`].
#[derive(Debug, Clone)]
pub struct CollectionBuilder {
    asset: String,
    date_range: Option<DateRange>,
    within_region: bool,
    filters: Vec<PropertyFilter>,
    select: Vec<String>,
    map: Option<PerImage>,
}

impl CollectionBuilder {
    pub fn dates(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn within_region(mut self) -> Self {
        self.within_region = true;
        self
    }

    pub fn filter_eq(mut self, property: &str, value: &str) -> Self {
        self.filters.push(PropertyFilter::Equals {
            property: property.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn filter_list_contains(mut self, property: &str, value: &str) -> Self {
        self.filters.push(PropertyFilter::ListContains {
            property: property.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn select(mut self, bands: &[&str]) -> Self {
        self.select = bands.iter().map(|b| b.to_string()).collect();
        self
    }

    pub fn map_normalized_difference(mut self, a: &str, b: &str, rename: &str) -> Self {
        self.map = Some(PerImage::NormalizedDifference {
            bands: [a.to_string(), b.to_string()],
            rename: rename.to_string(),
        });
        self
    }

    pub fn reduce(self, reduce: Reducer) -> Expr {
        Expr::Collection {
            asset: self.asset,
            date_range: self.date_range,
            within_region: self.within_region,
            filters: self.filters,
            select: self.select,
            map: self.map,
            reduce,
        }
    }

    pub fn first_sorted_by(self, property: &str) -> Expr {
        self.reduce(Reducer::First {
            sort_by: Some(property.to_string()),
        })
    }

    pub fn first(self) -> Expr {
        self.reduce(Reducer::First { sort_by: None })
    }

    pub fn mean(self) -> Expr {
        self.reduce(Reducer::Mean)
    }

    pub fn max(self) -> Expr {
        self.reduce(Reducer::Max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_range_covers_calendar_year() {
        let range = DateRange::year(2023);
        assert_eq!(range.start.to_string(), "2023-01-01");
        assert_eq!(range.end.to_string(), "2023-12-31");
    }

    #[test]
    fn test_expression_serializes_with_op_tags() {
        let expr = Expr::image("USGS/SRTMGL1_003").lt(200.0).self_mask();
        let json = serde_json::to_value(&expr).unwrap();
        assert_eq!(json["op"], "self_mask");
        assert_eq!(json["input"]["op"], "less_than");
        assert_eq!(json["input"]["threshold"], 200.0);
        assert_eq!(json["input"]["input"]["asset"], "USGS/SRTMGL1_003");
    }

    #[test]
    fn test_collection_builder_keeps_filters_in_order() {
        let expr = Expr::collection("COPERNICUS/S1_GRD")
            .dates(DateRange::year(2023))
            .filter_eq("instrumentMode", "IW")
            .filter_list_contains("transmitterReceiverPolarisation", "VV")
            .select(&["VV"])
            .mean();
        match expr {
            Expr::Collection {
                filters,
                select,
                reduce,
                date_range,
                ..
            } => {
                assert_eq!(filters.len(), 2);
                assert!(matches!(filters[0], PropertyFilter::Equals { .. }));
                assert_eq!(select, vec!["VV"]);
                assert_eq!(reduce, Reducer::Mean);
                assert!(date_range.is_some());
            }
            other => panic!("expected collection, got {:?}", other),
        }
    }
}
