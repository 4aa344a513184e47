use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::driver::{LoopLimits, LoopOutcome, LoopReport, ReactLoop};
use super::guard;
use super::prompt::Prompt;
use crate::config::{Config, GuardPolicy, RetrievalPolicy};
use crate::error::RouteError;
use crate::geo::{GeoBackend, RasterResult, Region};
use crate::llm::CompletionService;
use crate::locations::{City, Gazetteer};
use crate::narration;
use crate::retriever::ExampleStore;
use crate::style::LayerStyle;
use crate::tools::{Capability, Catalog, Invocation};

/// One natural-language question about a place.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub query: String,
    /// Explicit city choice; when absent the city is detected in `query`.
    pub city: Option<String>,
    pub buffer_km: u32,
}

/// Why routing fell back to the default capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The model's output did not follow the ReAct grammar.
    Unparseable,
    /// No catalog capability ran. Holds the last non-catalog name the model asked for.
    UnknownTool(Option<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTool {
    Capability(&'static str),
    Fallback(FallbackReason),
}

impl ResolvedTool {
    pub fn is_fallback(&self) -> bool {
        matches!(self, ResolvedTool::Fallback(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    Pixels(u64),
    /// Nothing in the region passed the capability's mask.
    Empty,
}

/// Everything one routing call produced.
#[derive(Debug, Clone)]
pub struct Decision {
    pub id: Uuid,
    pub tool: ResolvedTool,
    /// The capability whose raster is shown; the default one on fallback.
    pub capability: &'static Capability,
    pub label: String,
    pub layer: RasterResult,
    /// Text of the last model turn the loop kept.
    pub raw_response: String,
    /// The loop's answer; on a forced stop, the stop notice or best guess.
    pub final_answer: Option<String>,
    pub narration: Vec<String>,
    pub style: LayerStyle,
    pub coverage: Coverage,
    pub city: String,
    pub buffer_km: u32,
    pub examples_used: usize,
    pub model_calls: usize,
}

#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub limits: LoopLimits,
    pub temperature: f32,
    pub retrieval: RetrievalPolicy,
    pub examples_top_n: usize,
    pub guard: GuardPolicy,
    pub sample_scale_m: u32,
    pub min_buffer_km: u32,
    pub max_buffer_km: u32,
}

impl RouterSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            limits: LoopLimits {
                max_iterations: config.agent.max_iterations,
                max_execution: Duration::from_secs(config.agent.max_execution_secs),
                early_stopping: config.agent.early_stopping,
            },
            temperature: config.llm.temperature,
            retrieval: config.agent.retrieval,
            examples_top_n: config.agent.examples_top_n,
            guard: config.agent.plausibility_guard,
            sample_scale_m: config.backend.sample_scale_m,
            min_buffer_km: config.region.min_buffer_km,
            max_buffer_km: config.region.max_buffer_km,
        }
    }
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Point-in-time copy of the router counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouterCounters {
    pub routed: u64,
    pub parse_fallbacks: u64,
    pub unknown_tool_fallbacks: u64,
}

#[derive(Debug, Default)]
struct RouterStats {
    routed: AtomicU64,
    parse_fallbacks: AtomicU64,
    unknown_tool_fallbacks: AtomicU64,
}

impl RouterStats {
    fn snapshot(&self) -> RouterCounters {
        RouterCounters {
            routed: self.routed.load(Ordering::Relaxed),
            parse_fallbacks: self.parse_fallbacks.load(Ordering::Relaxed),
            unknown_tool_fallbacks: self.unknown_tool_fallbacks.load(Ordering::Relaxed),
        }
    }
}

/// What the loop left behind, reduced to the three cases resolution cares about.
enum Dispatch {
    Resolved {
        capability: &'static Capability,
        invocation: Invocation,
        answer: String,
        raw: String,
    },
    Unknown {
        requested: Option<String>,
        answer: String,
        raw: String,
    },
    Unparseable {
        raw: String,
    },
}

impl Dispatch {
    fn from_report(report: LoopReport, catalog: &Catalog) -> Self {
        let LoopReport {
            outcome,
            mut invocations,
            mut rejected_tools,
            ..
        } = report;

        let (answer, raw) = match outcome {
            LoopOutcome::Unparseable { raw, .. } => return Dispatch::Unparseable { raw },
            LoopOutcome::Finished { answer, raw } | LoopOutcome::Stopped { answer, raw, .. } => {
                (answer, raw)
            }
        };

        match invocations.pop() {
            Some(invocation) => match catalog.get(invocation.tool) {
                Some(capability) => Dispatch::Resolved {
                    capability,
                    invocation,
                    answer,
                    raw,
                },
                None => Dispatch::Unknown {
                    requested: Some(invocation.tool.to_string()),
                    answer,
                    raw,
                },
            },
            None => Dispatch::Unknown {
                requested: rejected_tools.pop(),
                answer,
                raw,
            },
        }
    }
}

struct Resolution {
    tool: ResolvedTool,
    capability: &'static Capability,
    label: String,
    layer: RasterResult,
    narration: Vec<String>,
}

/// Routes a question to exactly one capability and explains the choice.
///
/// Shareable behind `Arc`; every call keeps its own invocation record.
pub struct AgentRouter {
    llm: Arc<dyn CompletionService>,
    backend: Arc<dyn GeoBackend>,
    catalog: Catalog,
    examples: ExampleStore,
    gazetteer: Gazetteer,
    settings: RouterSettings,
    stats: RouterStats,
}

impl AgentRouter {
    pub fn new(
        llm: Arc<dyn CompletionService>,
        backend: Arc<dyn GeoBackend>,
        catalog: Catalog,
        examples: ExampleStore,
        gazetteer: Gazetteer,
        settings: RouterSettings,
    ) -> Self {
        Self {
            llm,
            backend,
            catalog,
            examples,
            gazetteer,
            settings,
            stats: RouterStats::default(),
        }
    }

    pub fn stats(&self) -> RouterCounters {
        self.stats.snapshot()
    }

    pub async fn route(&self, request: &RouteRequest) -> Result<Decision, RouteError> {
        let id = Uuid::new_v4();
        let query = request.query.trim();

        // Step 1: Location and buffer, before anything remote is touched
        log::info!("Router[{}]: Step 1 - Resolving location", id);
        let city = self.resolve_city(request)?.clone();
        self.check_buffer(request.buffer_km)?;
        let region = Region::from_km(city.lon, city.lat, request.buffer_km);
        log::info!(
            "Router[{}]: Step 1 - {} ({:.4}, {:.4}), {} km buffer",
            id,
            city.name,
            city.lon,
            city.lat,
            request.buffer_km
        );

        // Step 2: Examples and prompt
        let examples =
            self.examples
                .retrieve_with(self.settings.retrieval, query, self.settings.examples_top_n);
        log::info!(
            "Router[{}]: Step 2 - Building prompt ({} example(s))",
            id,
            examples.len()
        );
        let prompt = Prompt::build(query, &examples, &self.catalog);
        log::debug!(
            "Router[{}]: system prompt is {} chars",
            id,
            prompt.system.len()
        );

        // Step 3: ReAct loop
        log::info!("Router[{}]: Step 3 - Asking the model to pick a tool", id);
        let react_loop = ReactLoop {
            llm: self.llm.as_ref(),
            backend: self.backend.as_ref(),
            catalog: &self.catalog,
            limits: &self.settings.limits,
            temperature: self.settings.temperature,
        };
        let report = react_loop.run(&prompt, &region).await?;
        let model_calls = report.model_calls;
        self.stats.routed.fetch_add(1, Ordering::Relaxed);

        // Step 4: Resolve the tool, or fall back
        let dispatch = Dispatch::from_report(report, &self.catalog);
        let (resolution, final_answer, raw_response) = match dispatch {
            Dispatch::Resolved {
                capability,
                invocation,
                answer,
                raw,
            } => {
                log::info!(
                    "Router[{}]: Step 4 - Resolved {} (input \"{}\")",
                    id,
                    capability.name,
                    invocation.input
                );
                guard::check_plausibility(self.settings.guard, capability, query)?;
                let layer = match invocation.result {
                    Some(layer) => layer,
                    None => capability.compute(self.backend.as_ref(), &region).await?,
                };
                let resolution = Resolution {
                    tool: ResolvedTool::Capability(capability.name),
                    capability,
                    label: capability.label.to_string(),
                    layer,
                    narration: narration::build(capability, query, &city.name, request.buffer_km),
                };
                (resolution, Some(answer), raw)
            }
            Dispatch::Unknown {
                requested,
                answer,
                raw,
            } => {
                self.stats
                    .unknown_tool_fallbacks
                    .fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "Router[{}]: Step 4 - No known tool ran (requested {:?}), falling back",
                    id,
                    requested
                );
                let reason = FallbackReason::UnknownTool(requested);
                let resolution = self
                    .fall_back(reason, query, &city, request.buffer_km, &region)
                    .await?;
                (resolution, Some(answer), raw)
            }
            Dispatch::Unparseable { raw } => {
                self.stats.parse_fallbacks.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "Router[{}]: Step 4 - Model output not understood, falling back",
                    id
                );
                let reason = FallbackReason::Unparseable;
                let resolution = self
                    .fall_back(reason, query, &city, request.buffer_km, &region)
                    .await?;
                (resolution, None, raw)
            }
        };

        // Step 5: Coverage and presentation
        log::info!("Router[{}]: Step 5 - Sampling coverage", id);
        let pixels = self
            .backend
            .count_pixels(&resolution.layer, self.settings.sample_scale_m)
            .await?;
        let coverage = if pixels == 0 {
            log::warn!("Router[{}]: no data detected in this region", id);
            Coverage::Empty
        } else {
            Coverage::Pixels(pixels)
        };

        log::debug!("Router[{}]: counters {:?}", id, self.stats.snapshot());

        Ok(Decision {
            id,
            tool: resolution.tool,
            capability: resolution.capability,
            style: LayerStyle::for_label(&resolution.label),
            label: resolution.label,
            layer: resolution.layer,
            raw_response,
            final_answer,
            narration: resolution.narration,
            coverage,
            city: city.name,
            buffer_km: request.buffer_km,
            examples_used: examples.len(),
            model_calls,
        })
    }

    fn resolve_city(&self, request: &RouteRequest) -> Result<&City, RouteError> {
        let found = match request.city.as_deref() {
            Some(name) => self.gazetteer.resolve(name),
            None => self.gazetteer.detect(&request.query),
        };
        found.ok_or_else(|| RouteError::LocationNotFound {
            query: request.city.clone().unwrap_or_else(|| request.query.clone()),
        })
    }

    fn check_buffer(&self, buffer_km: u32) -> Result<(), RouteError> {
        let (min_km, max_km) = (self.settings.min_buffer_km, self.settings.max_buffer_km);
        if (min_km..=max_km).contains(&buffer_km) {
            Ok(())
        } else {
            Err(RouteError::InvalidBuffer {
                buffer_km,
                min_km,
                max_km,
            })
        }
    }

    async fn fall_back(
        &self,
        reason: FallbackReason,
        query: &str,
        city: &City,
        buffer_km: u32,
        region: &Region,
    ) -> Result<Resolution, RouteError> {
        let capability = self.catalog.fallback();
        let layer = capability.compute(self.backend.as_ref(), region).await?;
        let narration =
            narration::build_fallback(&reason, capability, query, &city.name, buffer_km);

        Ok(Resolution {
            tool: ResolvedTool::Fallback(reason),
            capability,
            label: capability.fallback_label(),
            layer,
            narration,
        })
    }
}
