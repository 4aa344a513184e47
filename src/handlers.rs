use std::fmt::Write as _;
use std::process::ExitCode;

use anyhow::{Context, Result};

use crate::agent::{AgentRouter, Coverage, Decision, ResolvedTool, RouteRequest};
use crate::config::RetrievalPolicy;
use crate::retriever::ExampleStore;
use crate::tools::Catalog;

/// Handler for `geoquery ask`
pub async fn ask_handler(router: &AgentRouter, request: RouteRequest) -> Result<ExitCode> {
    log::info!("Received query \"{}\"", request.query);

    let routed = router.route(&request).await;
    log::debug!("Router counters: {:?}", router.stats());

    match routed {
        Ok(decision) => {
            if decision.tool.is_fallback() {
                log::warn!("Decision {} used the fallback analysis", decision.id);
            }
            print!("{}", render_decision(&decision)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_user_warning() => {
            eprintln!("⚠️ {}", e);
            Ok(ExitCode::from(2))
        }
        Err(e) => Err(e).context("Routing failed"),
    }
}

/// Handler for `geoquery tools`
pub fn tools_handler(catalog: &Catalog) {
    println!("🧰 Available analyses:\n");
    for capability in catalog.iter() {
        println!("• {} ({})", capability.name, capability.label);
        println!("  {}\n", capability.guideline);
    }
}

/// Handler for `geoquery examples`
pub fn examples_handler(
    store: &ExampleStore,
    policy: RetrievalPolicy,
    query: &str,
    top_n: usize,
) -> Result<()> {
    let examples = store.retrieve_with(policy, query, top_n);
    if examples.is_empty() {
        println!("No examples share a tag with \"{}\".", query);
        return Ok(());
    }

    let json = serde_json::to_string_pretty(&examples).context("Failed to render examples")?;
    println!("{}", json);
    Ok(())
}

fn render_decision(decision: &Decision) -> Result<String> {
    let mut out = String::new();
    let tool = match &decision.tool {
        ResolvedTool::Capability(name) => name.to_string(),
        ResolvedTool::Fallback(reason) => {
            format!("{} (fallback: {:?})", decision.capability.name, reason)
        }
    };
    let style = serde_json::to_string(&decision.style).context("Failed to render style")?;

    writeln!(out, "🆔 Decision: {}", decision.id)?;
    writeln!(out, "🗺️ Layer: {}", decision.label)?;
    writeln!(out, "🧰 Tool: {}", tool)?;
    writeln!(
        out,
        "📍 Region: {} ({} km buffer), raster {}",
        decision.city, decision.buffer_km, decision.layer.handle
    )?;
    writeln!(out, "🎨 Style: {}", style)?;
    match decision.coverage {
        Coverage::Pixels(count) => writeln!(out, "📊 Coverage: {} pixel(s)", count)?,
        Coverage::Empty => writeln!(out, "⚠️ No data detected in this region")?,
    }

    writeln!(out, "\n🧠 Reasoning:")?;
    for line in &decision.narration {
        writeln!(out, "  {}", line)?;
    }

    writeln!(
        out,
        "\n📝 Model response ({} call(s), {} example(s)):",
        decision.model_calls, decision.examples_used
    )?;
    writeln!(out, "{}", decision.raw_response.trim())?;
    if let Some(answer) = &decision.final_answer {
        writeln!(out, "\n💬 Answer: {}", answer)?;
    }
    Ok(out)
}
