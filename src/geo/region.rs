use serde::Serialize;

/// A circular study area: a center point buffered by a radius in meters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    /// Longitude of the center, in degrees.
    pub lon: f64,
    /// Latitude of the center, in degrees.
    pub lat: f64,
    pub buffer_m: f64,
}

impl Region {
    pub fn new(lon: f64, lat: f64, buffer_m: f64) -> Self {
        Self { lon, lat, buffer_m }
    }

    /// Build a region from a center and a buffer radius in kilometers.
    pub fn from_km(lon: f64, lat: f64, buffer_km: u32) -> Self {
        Self::new(lon, lat, f64::from(buffer_km) * 1000.0)
    }

    pub fn buffer_km(&self) -> f64 {
        self.buffer_m / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_km_converts_to_meters() {
        let region = Region::from_km(91.7362, 26.1445, 60);
        assert_eq!(region.buffer_m, 60_000.0);
        assert_eq!(region.buffer_km(), 60.0);
    }
}
