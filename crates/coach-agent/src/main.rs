//! Lesson generator CLI
//!
//! Reads a PGN file, runs the lesson agent against a local Stockfish and the
//! Anthropic API, and prints the lesson report as JSON.
//!
//! Usage: coach --pgn game.pgn --rating 1200 [--focus tactics,endgame]

use analysis_engine::config::EngineConfig;
use analysis_engine::{AnalysisCoordinator, HumanMoveModel, StockfishLauncher};
use anyhow::{bail, Context};
use coach_agent::clients::anthropic::AnthropicClient;
use coach_agent::config::AgentConfig;
use coach_agent::tools::{MAX_TARGET_RATING, MIN_TARGET_RATING};
use coach_agent::{LessonAgent, LessonRequest, LessonStatus};
use tracing::info;

struct CliArgs {
    pgn_path: String,
    rating: u32,
    focus_areas: Vec<String>,
}

/// Value following `flag`, if present
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    for i in 0..args.len() {
        if args[i] == flag {
            return args.get(i + 1).cloned();
        }
    }
    None
}

fn parse_args() -> anyhow::Result<CliArgs> {
    let args: Vec<String> = std::env::args().collect();

    let pgn_path = flag_value(&args, "--pgn").context("missing --pgn <file>")?;
    let rating: u32 = flag_value(&args, "--rating")
        .context("missing --rating <n>")?
        .trim()
        .parse()
        .context("--rating must be a number")?;
    if !(MIN_TARGET_RATING..=MAX_TARGET_RATING).contains(&rating) {
        bail!("--rating must be between {MIN_TARGET_RATING} and {MAX_TARGET_RATING}");
    }

    let focus_areas = flag_value(&args, "--focus")
        .map(|list| {
            list.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Ok(CliArgs {
        pgn_path,
        rating,
        focus_areas,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let _ = dotenvy::dotenv();

    let args = parse_args()?;
    let pgn = std::fs::read_to_string(&args.pgn_path)
        .with_context(|| format!("reading {}", args.pgn_path))?;

    let engine_config = EngineConfig::from_env();
    let launcher = StockfishLauncher::discover(&engine_config)?;
    info!(
        stockfish_path = %launcher.path().display(),
        depth = engine_config.analysis_depth,
        "Engine config loaded"
    );

    let coordinator = AnalysisCoordinator::new(
        launcher,
        HumanMoveModel::new(),
        engine_config.analysis_depth,
    );
    let model = AnthropicClient::new(&AgentConfig::from_env())?;
    let agent = LessonAgent::new(model, coordinator);

    let report = agent
        .generate_report(&LessonRequest {
            pgn,
            target_rating: args.rating,
            focus_areas: args.focus_areas,
        })
        .await;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.status == LessonStatus::Failed {
        std::process::exit(1);
    }
    Ok(())
}
