use serde::Deserialize;

/// A named place the analysis can be centered on.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct City {
    pub name: String,
    pub lon: f64,
    pub lat: f64,
}

impl City {
    fn new(name: &str, lon: f64, lat: f64) -> Self {
        Self {
            name: name.to_string(),
            lon,
            lat,
        }
    }
}

/// Known cities, in lookup order.
#[derive(Debug, Clone)]
pub struct Gazetteer {
    cities: Vec<City>,
}

impl Gazetteer {
    pub fn new(cities: Vec<City>) -> Self {
        Self { cities }
    }

    pub fn standard() -> Self {
        Self::new(vec![
            City::new("Guwahati", 91.7362, 26.1445),
            City::new("Hyderabad", 78.4867, 17.3850),
            City::new("Bengaluru", 77.5946, 12.9716),
            City::new("Kolkata", 88.3639, 22.5726),
        ])
    }

    /// The configured cities, or the standard set when none are configured.
    pub fn from_config(cities: &[City]) -> Self {
        if cities.is_empty() {
            Self::standard()
        } else {
            Self::new(cities.to_vec())
        }
    }

    /// Case-insensitive exact name lookup.
    pub fn resolve(&self, name: &str) -> Option<&City> {
        let name = name.trim();
        self.cities
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// First known city mentioned as a whole word in `query`.
    pub fn detect(&self, query: &str) -> Option<&City> {
        let words: Vec<String> = query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(|w| w.to_lowercase())
            .collect();

        self.cities.iter().find(|city| {
            let parts: Vec<String> = city
                .name
                .split_whitespace()
                .map(|p| p.to_lowercase())
                .collect();
            !parts.is_empty() && words.windows(parts.len()).any(|w| w == parts.as_slice())
        })
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &City> {
        self.cities.iter()
    }
}
