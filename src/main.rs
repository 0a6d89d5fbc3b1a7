//! Betting Pool Risk Assessor
//!
//! Command-line entry point: train a risk model, score and allocate a
//! batch of markets, or screen a pool snapshot for yield opportunities.

use anyhow::Context;
use betpool_risk::{
    config::Config,
    ml::{FeatureConfig, FeatureEngineer, LabelledSeries, RiskScorer, TrainingSample},
    pipeline::AssessmentPipeline,
    strategy::YieldOpportunityGenerator,
    types::{MarketSeries, PoolStatistics},
};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "betpool-risk")]
#[command(about = "Risk scoring and capital allocation for decentralized betting pools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a risk model from labelled market history
    Train {
        /// JSON array of labelled market series
        #[arg(short, long)]
        data: PathBuf,
        /// Where to write the model (defaults to model.path from config)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Score markets and compute allocation weights
    Assess {
        /// JSON array of market series
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Show the batch-normalized feature matrix
    Features {
        /// JSON array of market series
        #[arg(short, long)]
        input: PathBuf,
    },
    /// List yield opportunities for a pool snapshot
    Yield {
        /// Total value locked in the pool
        #[arg(long)]
        tvl: Decimal,
        /// Average pool risk (0-1)
        #[arg(long)]
        risk: Decimal,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config))?;

    match cli.command {
        Commands::Train { data, out } => train(config, &data, out).await,
        Commands::Assess { input } => assess(config, &input).await,
        Commands::Features { input } => features(config, &input).await,
        Commands::Yield { tvl, risk } => show_yield(config, tvl, risk),
    }
}

fn engineer(config: &Config) -> FeatureEngineer {
    FeatureEngineer::new(FeatureConfig {
        rolling_window: config.features.rolling_window,
    })
}

async fn read_markets(path: &Path) -> anyhow::Result<Vec<MarketSeries>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let markets: Vec<MarketSeries> =
        serde_json::from_str(&content).context("Invalid market series JSON")?;
    Ok(markets)
}

async fn train(config: Config, data: &Path, out: Option<PathBuf>) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(data)
        .await
        .with_context(|| format!("Failed to read {}", data.display()))?;
    let labelled: Vec<LabelledSeries> =
        serde_json::from_str(&content).context("Invalid training data JSON")?;

    let samples = TrainingSample::from_labelled(&engineer(&config), &labelled)?;
    tracing::info!(
        series = labelled.len(),
        samples = samples.len(),
        "Training risk model"
    );

    let scorer = RiskScorer::fit(&samples, config.model.forest_params())?;
    let path = out.unwrap_or_else(|| config.model.resolved_path());
    scorer.save(&path)?;

    println!("Model written to {}", path.display());
    Ok(())
}

async fn assess(config: Config, input: &Path) -> anyhow::Result<()> {
    let markets = read_markets(input).await?;
    let model_path = config.model.resolved_path();
    let scorer = RiskScorer::load(&model_path)
        .with_context(|| format!("Failed to load model from {}", model_path.display()))?;

    let pipeline = AssessmentPipeline::from_config(&config, Arc::new(scorer));
    let report = pipeline.assess(&markets)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn features(config: Config, input: &Path) -> anyhow::Result<()> {
    let markets = read_markets(input).await?;
    let matrix = engineer(&config).compute_features(&markets)?;

    let incomplete = matrix.rows.iter().filter(|r| !r.is_complete()).count();
    if incomplete > 0 {
        tracing::warn!(
            incomplete,
            window = config.features.rolling_window,
            "Some markets lack a full volatility window"
        );
    }

    println!("{}", serde_json::to_string_pretty(&matrix)?);
    Ok(())
}

fn show_yield(config: Config, tvl: Decimal, risk: Decimal) -> anyhow::Result<()> {
    let stats = PoolStatistics {
        total_locked_value: tvl,
        risk_score: risk,
    };
    stats.validate()?;

    let generator = YieldOpportunityGenerator::new(config.yield_rules.rules);
    let opportunities = generator.generate_opportunities(&stats);

    if opportunities.is_empty() {
        println!("No yield opportunities for TVL {} at risk {}", tvl, risk);
        return Ok(());
    }

    println!("{:<35} {:>8} {:>10}", "Protocol", "APY", "Risk");
    for opp in &opportunities {
        println!(
            "{:<35} {:>7.2}% {:>10}",
            opp.protocol_name,
            opp.estimated_apy * Decimal::ONE_HUNDRED,
            format!("{:?}", opp.risk_level)
        );
    }
    Ok(())
}
