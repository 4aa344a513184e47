use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::llm::Provider;
use crate::locations::City;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub backend: BackendConfig,
    pub examples: ExamplesConfig,
    pub region: RegionConfig,
    pub locations: Vec<City>,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: Provider,
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    /// Environment variable holding the API key, if the provider needs one.
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAi,
            endpoint: "https://api.together.xyz/v1".to_string(),
            model: "mistralai/Mistral-7B-Instruct-v0.1".to_string(),
            temperature: 0.0,
            api_key_env: Some("TOGETHER_API_KEY".to_string()),
            timeout_secs: 60,
        }
    }
}

/// Which example-retrieval contract primes the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalPolicy {
    /// Up to `examples_top_n` rows with at least one shared tag.
    TopN,
    /// Always the single best row, even with zero overlap.
    BestMatch,
}

/// Plausibility check applied to the capability the model settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardPolicy {
    Off,
    /// Reject the terrain-flood capability when the query never says "flood".
    FloodKeyword,
    /// Reject any capability whose keywords share no word with the query.
    AllCapabilities,
}

/// What the loop does once it runs out of iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarlyStopping {
    /// One last model call asking for a best-guess final answer.
    Generate,
    /// Stop without asking the model again.
    Force,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    pub max_iterations: usize,
    pub max_execution_secs: u64,
    pub examples_top_n: usize,
    pub retrieval: RetrievalPolicy,
    pub plausibility_guard: GuardPolicy,
    pub early_stopping: EarlyStopping,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 4,
            max_execution_secs: 60,
            examples_top_n: 6,
            retrieval: RetrievalPolicy::TopN,
            plausibility_guard: GuardPolicy::FloodKeyword,
            early_stopping: EarlyStopping::Generate,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BackendConfig {
    pub endpoint: String,
    /// Pixel size used when sampling a result for empty coverage.
    pub sample_scale_m: u32,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            sample_scale_m: 30,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExamplesConfig {
    pub path: String,
}

impl Default for ExamplesConfig {
    fn default() -> Self {
        Self {
            path: "data/examples.csv".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RegionConfig {
    pub default_buffer_km: u32,
    pub min_buffer_km: u32,
    pub max_buffer_km: u32,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            default_buffer_km: 60,
            min_buffer_km: 30,
            max_buffer_km: 300,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).with_context(|| {
            format!(
                "Failed to read config file {}. Copy config.example.toml to get started.",
                path.display()
            )
        })?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let region = &self.region;
        if region.min_buffer_km > region.max_buffer_km {
            anyhow::bail!(
                "region.min_buffer_km ({}) exceeds region.max_buffer_km ({})",
                region.min_buffer_km,
                region.max_buffer_km
            );
        }
        if !(region.min_buffer_km..=region.max_buffer_km).contains(&region.default_buffer_km) {
            anyhow::bail!(
                "region.default_buffer_km ({}) is outside {}..={}",
                region.default_buffer_km,
                region.min_buffer_km,
                region.max_buffer_km
            );
        }
        if self.agent.max_iterations == 0 {
            anyhow::bail!("agent.max_iterations must be at least 1");
        }
        Ok(())
    }
}
