pub mod land_cover;
pub mod population;
pub mod recorder;
pub mod solar;
pub mod terrain;
pub mod vegetation;
pub mod water;

pub use recorder::{Invocation, InvocationRecorder};

use crate::geo::{BackendError, Expr, GeoBackend, RasterResult, Region};

/// Year most time-filtered datasets are pulled from.
pub const ANALYSIS_YEAR: i32 = 2023;

/// Tool trait for agent-orchestrated operations.
///
/// Not object-safe (associated types). The agent calls tools by concrete
/// type, not `dyn Tool`.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    type Input: Send;
    type Output: Send;
    type Error: std::error::Error + Send + Sync + 'static;

    fn name(&self) -> &str;
    async fn run(&self, input: Self::Input) -> Result<Self::Output, Self::Error>;
}

/// A named region-to-raster analysis exposed to the model.
#[derive(Debug)]
pub struct Capability {
    pub name: &'static str,
    /// Display label for the rendered layer.
    pub label: &'static str,
    /// Shown to the model; decides which queries this capability answers.
    pub guideline: &'static str,
    /// One-paragraph method description used in narration.
    pub explanation: &'static str,
    /// Lowercase words that make this capability plausible for a query.
    pub keywords: &'static [&'static str],
    pub data_year: i32,
    pub query: fn() -> Expr,
}

impl Capability {
    /// Evaluate this capability over `region` through the backend.
    pub async fn compute(
        &self,
        backend: &dyn GeoBackend,
        region: &Region,
    ) -> Result<RasterResult, BackendError> {
        backend.evaluate(&(self.query)(), region).await
    }

    /// Fallback display label, e.g. `Flood-Prone Terrain (Fallback)`.
    pub fn fallback_label(&self) -> String {
        format!("{} (Fallback)", self.label)
    }
}

/// The fixed, ordered set of capabilities offered to the model.
#[derive(Debug, Clone)]
pub struct Catalog {
    capabilities: Vec<&'static Capability>,
}

impl Catalog {
    pub fn standard() -> Self {
        Self {
            capabilities: vec![
                &terrain::FLOOD_MASK,
                &vegetation::NDVI_MASK,
                &water::S1_WATER_MASK,
                &vegetation::PEAK_NDVI,
                &solar::SOLAR_IRRADIANCE,
                &land_cover::LAND_COVER,
                &population::POPULATION_OVERLAY,
            ],
        }
    }

    pub fn get(&self, name: &str) -> Option<&'static Capability> {
        self.capabilities.iter().copied().find(|c| c.name == name)
    }

    /// The deterministic default used whenever routing falls back.
    pub fn fallback(&self) -> &'static Capability {
        &terrain::FLOOD_MASK
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static Capability> + '_ {
        self.capabilities.iter().copied()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(|c| c.name).collect()
    }

    /// Bind every capability to one routing call's region, backend and recorder.
    pub fn bind<'a>(
        &self,
        region: &'a Region,
        backend: &'a dyn GeoBackend,
        recorder: &'a InvocationRecorder,
    ) -> Vec<BoundCapability<'a>> {
        self.iter()
            .map(|capability| BoundCapability {
                capability,
                region,
                backend,
                recorder,
            })
            .collect()
    }
}

/// A capability closed over the state of a single routing call.
pub struct BoundCapability<'a> {
    pub capability: &'static Capability,
    region: &'a Region,
    backend: &'a dyn GeoBackend,
    recorder: &'a InvocationRecorder,
}

#[async_trait::async_trait]
impl<'a> Tool for BoundCapability<'a> {
    type Input = String;
    type Output = RasterResult;
    type Error = BackendError;

    fn name(&self) -> &str {
        self.capability.name
    }

    async fn run(&self, action_input: String) -> Result<RasterResult, BackendError> {
        // Record first: the model's final text may never echo the tool name.
        let slot = self.recorder.begin(self.capability.name, &action_input);
        log::info!(
            "{}: evaluating over {:.0} km buffer",
            self.capability.name,
            self.region.buffer_km()
        );

        let result = self.capability.compute(self.backend, self.region).await?;
        self.recorder.complete(slot, result.clone());

        log::info!("{}: raster ready ({})", self.capability.name, result.handle);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubBackend;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_names_are_unique() {
        let catalog = Catalog::standard();
        let names = catalog.names();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(names.len(), unique.len());
        assert_eq!(names.len(), 7);
    }

    #[test]
    fn test_fallback_is_terrain_flood() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.fallback().name, "get_flood_mask");
        assert_eq!(
            catalog.fallback().fallback_label(),
            "Flood-Prone Terrain (Fallback)"
        );
        assert!(catalog.get("get_flood_mask").is_some());
        assert!(catalog.get("get_rainfall").is_none());
    }

    #[test]
    fn test_guidelines_separate_terrain_and_radar_flooding() {
        let catalog = Catalog::standard();
        let terrain = catalog.get("get_flood_mask").unwrap();
        let radar = catalog.get("get_s1_water_mask").unwrap();
        assert!(terrain.guideline.contains("Do NOT use for 'flood extent'"));
        assert!(radar.guideline.contains("flood extent"));
        assert!(radar.guideline.contains("radar"));
    }

    #[tokio::test]
    async fn test_every_bound_capability_records_its_name() {
        let catalog = Catalog::standard();
        let backend = StubBackend::new();
        let region = Region::from_km(91.7362, 26.1445, 60);

        for capability in catalog.iter() {
            let recorder = InvocationRecorder::new();
            let tools = catalog.bind(&region, &backend, &recorder);
            let tool = tools
                .iter()
                .find(|t| t.name() == capability.name)
                .unwrap();

            let result = tool.run("test input".to_string()).await.unwrap();

            assert_eq!(recorder.last_tool(), Some(capability.name));
            let invocation = recorder.last().unwrap();
            assert_eq!(invocation.input, "test input");
            assert_eq!(invocation.result.unwrap().handle, result.handle);
            assert_eq!(result.region, region);
        }
    }

    #[tokio::test]
    async fn test_failed_run_still_records_attempt() {
        let catalog = Catalog::standard();
        let backend = StubBackend::unavailable();
        let region = Region::from_km(78.4867, 17.3850, 30);
        let recorder = InvocationRecorder::new();
        let tools = catalog.bind(&region, &backend, &recorder);

        let err = tools[1].run(String::new()).await.unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 503, .. }));
        assert_eq!(recorder.last_tool(), Some("get_ndvi_mask"));
        assert!(recorder.last().unwrap().result.is_none());
    }
}
