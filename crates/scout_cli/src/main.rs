use anyhow::{Context, Result};
use clap::Parser;
use scout_core::{RunState, ScoutConfig, Turn};
use scout_reasoning::providers::create_client;
use scout_reasoning::{AssessmentGraph, ToolRegistry};
use serde_json::json;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_CONFIG: &str = "scout.toml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Free-text request naming the hotel to assess
    request: String,

    /// Path to the TOML config. Defaults apply when omitted and scout.toml is absent.
    #[arg(short, long, env = "SCOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Override the per-step model invocation cap for this run
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Print only the final record instead of every step's result
    #[arg(long)]
    final_only: bool,
}

fn init_tracing(json_logs: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("scout=info,scout_reasoning=info,scout_tools=info"));
    let registry = tracing_subscriber::registry().with(filter);
    // Logs go to stderr so stdout carries only the result document.
    if json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<ScoutConfig> {
    match path {
        Some(p) => ScoutConfig::load(p),
        None => Ok(ScoutConfig::load_or_default(DEFAULT_CONFIG)),
    }
}

fn build_graph(config: &ScoutConfig) -> Result<AssessmentGraph> {
    let handlers = scout_tools::standard_handlers(&config.services)
        .context("failed to initialise tool clients")?;
    let registry = ToolRegistry::with_handlers(handlers);
    info!("Registered tools: {}", registry.names().join(", "));

    let client = create_client(&config.llm)?;
    let graph = AssessmentGraph::from_config(&config.pipeline, &config.llm, client, registry)?;
    Ok(graph)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.json_logs);

    let config = load_config(args.config.as_ref())?;
    info!(
        provider = %config.llm.provider,
        model = %config.llm.model,
        "Starting assessment"
    );
    let graph = build_graph(&config)?;

    let state = RunState::seeded(Turn::user(args.request.as_str()));
    let state = match graph.run(state, args.max_iterations).await {
        Ok(state) => state,
        Err(e) => {
            error!("Assessment failed: {}", e);
            return Err(e.into());
        }
    };

    let document = if args.final_only {
        serde_json::to_value(state.final_record())?
    } else {
        json!({
            "run_id": state.run_id,
            "completed_steps": state.completed_steps,
            "results": state.results,
        })
    };
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::state::StepKind;

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "scout",
            "Hotel Negresco, Nice",
            "--max-iterations",
            "7",
            "--json-logs",
        ])
        .unwrap();
        assert_eq!(args.request, "Hotel Negresco, Nice");
        assert_eq!(args.max_iterations, Some(7));
        assert!(args.json_logs);
        assert!(!args.final_only);
    }

    #[test]
    fn test_request_is_required() {
        assert!(Args::try_parse_from(["scout"]).is_err());
    }

    #[test]
    fn test_default_pipeline_wires_against_standard_tools() {
        let mut config = ScoutConfig::default();
        config.llm.provider = "mock".to_string();
        let graph = build_graph(&config).unwrap();
        assert_eq!(graph.step_kinds(), StepKind::ALL.to_vec());
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let missing = PathBuf::from("/nonexistent/scout.toml");
        assert!(load_config(Some(&missing)).is_err());
    }
}
