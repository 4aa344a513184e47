mod agent;
mod config;
mod error;
mod geo;
mod handlers;
mod llm;
mod locations;
mod narration;
mod retriever;
mod style;
#[cfg(test)]
mod testing;
mod tools;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use agent::{AgentRouter, RouteRequest, RouterSettings};
use config::Config;
use geo::HttpGeoBackend;
use llm::LlmClient;
use locations::Gazetteer;
use retriever::ExampleStore;
use tools::Catalog;

const DEFAULT_CONFIG: &str = "config.toml";

#[derive(Parser)]
#[command(
    name = "geoquery",
    version,
    about = "Route natural-language spatial questions to satellite analyses"
)]
struct Cli {
    /// Path to the TOML config file. Defaults apply when config.toml is absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a spatial question, e.g. "flood-prone areas in Guwahati".
    Ask {
        query: String,

        /// City to center on; detected in the query when omitted.
        #[arg(long)]
        city: Option<String>,

        /// Buffer radius around the city center, in kilometers.
        #[arg(long)]
        buffer_km: Option<u32>,
    },

    /// List the analyses the model can choose from.
    Tools,

    /// Show the example rows retrieved for a query.
    Examples { query: String },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.logging.level);
    log::info!("Configuration loaded successfully");

    let catalog = Catalog::standard();

    match cli.command {
        Commands::Tools => {
            handlers::tools_handler(&catalog);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Examples { query } => {
            let store = load_examples(&config, &catalog)?;
            handlers::examples_handler(
                &store,
                config.agent.retrieval,
                &query,
                config.agent.examples_top_n,
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Ask {
            query,
            city,
            buffer_km,
        } => {
            let router = build_router(&config, catalog)?;
            let request = RouteRequest {
                query,
                city,
                buffer_km: buffer_km.unwrap_or(config.region.default_buffer_km),
            };
            handlers::ask_handler(&router, request).await
        }
    }
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(level: &str) {
    let mut builder = pretty_env_logger::formatted_builder();
    match std::env::var("RUST_LOG") {
        Ok(filters) => builder.parse_filters(&filters),
        Err(_) => builder.parse_filters(level),
    };
    builder.init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None if Path::new(DEFAULT_CONFIG).exists() => Config::from_file(DEFAULT_CONFIG),
        None => Ok(Config::default()),
    }
}

fn load_examples(config: &Config, catalog: &Catalog) -> Result<ExampleStore> {
    let mut store = ExampleStore::load(&config.examples.path)
        .with_context(|| format!("Failed to load examples from {}", config.examples.path))?;
    let dropped = store.retain_known_tools(catalog);
    if dropped > 0 {
        log::warn!("Dropped {} example(s) naming unknown tools", dropped);
    }
    if store.is_empty() {
        log::warn!("No usable examples in {}; prompts will carry none", config.examples.path);
    }
    Ok(store)
}

fn build_router(config: &Config, catalog: Catalog) -> Result<AgentRouter> {
    let llm = LlmClient::from_config(&config.llm).context("Failed to create model client")?;
    log::info!("Model: {} via {}", llm.model, llm.endpoint);

    let backend = HttpGeoBackend::new(
        config.backend.endpoint.clone(),
        Duration::from_secs(config.backend.timeout_secs),
    )
    .context("Failed to create geospatial backend client")?;

    let examples = load_examples(config, &catalog)?;

    Ok(AgentRouter::new(
        Arc::new(llm),
        Arc::new(backend),
        catalog,
        examples,
        Gazetteer::from_config(&config.locations),
        RouterSettings::from_config(config),
    ))
}
