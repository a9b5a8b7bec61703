//! ROUNDWATCH: round-close detection and Martingale bankroll engine
//!
//! Entry point. Loads configuration, initialises structured logging, wires
//! the sampler, predictor and bankroll together, and runs the control loop
//! until the bet limit is reached or Ctrl+C is pressed.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use roundwatch::config::{AppConfig, PredictorConfig};
use roundwatch::engine::{RoundEngine, Runner};
use roundwatch::llm::chat::{ChatPredictor, OPENAI_BASE_URL};
use roundwatch::llm::command::CommandPredictor;
use roundwatch::llm::{AbstainPredictor, PredictionService, Predictor};
use roundwatch::report::TracingSink;
use roundwatch::sampler::{latest_slot, ReplaySampler, SampleProducer};
use roundwatch::signal::Digitizer;
use roundwatch::strategy::Bankroll;

const BANNER: &str = r#"
 ___  ___  _   _ _  _ ___ _    _  _ _____ ___ _  _
| _ \/ _ \| | | | \| |   \ \    / /_\_   _/ __| || |
|   / (_) | |_| | .` | |) \ \/\/ / _ \| || (__| __ |
|_|_\\___/ \___/|_|\_|___/ \_/\_/_/ \_\_| \___|_||_|

  Round-close detection and Martingale bankroll engine
  v0.1.0
"#;

#[derive(Parser)]
#[command(name = "roundwatch")]
#[command(about = "Watch a binary-outcome round stream and run a Martingale bankroll against it")]
struct Args {
    /// Settled (non-NoBet) rounds before stopping. Overrides engine.max_rounds.
    rounds: Option<u64>,

    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let args = Args::parse();

    let mut cfg = AppConfig::load_or_default(&args.config)?;
    if let Some(rounds) = args.rounds {
        cfg.engine.max_rounds = rounds;
    }

    init_logging();

    // Bad settings are the only thing that stops us before the loop starts.
    cfg.validate().context("Invalid configuration")?;
    let bankroll = Bankroll::new(cfg.bankroll.clone())?;

    println!("{BANNER}");
    info!(
        config = %args.config.display(),
        max_rounds = cfg.engine.max_rounds,
        base_bet = cfg.bankroll.base_bet,
        multiplier = cfg.bankroll.multiplier,
        stake_cap = ?cfg.bankroll.stake_cap,
        round_length = cfg.engine.round_length,
        "ROUNDWATCH starting up"
    );

    // -- Initialise components -------------------------------------------

    let predictor = build_predictor(&cfg.predictor)?;
    info!(predictor = predictor.name(), "Predictor ready");
    let predictions = PredictionService::new(predictor, cfg.predictor.settings());

    let engine = RoundEngine::new(
        predictions,
        bankroll,
        Box::new(TracingSink),
        cfg.engine.max_rounds,
    );

    let (tx, slot) = latest_slot();
    let mut idle_tx = None;
    let producer = match &cfg.sampler.replay_path {
        Some(path) => {
            let replay = ReplaySampler::load(path)?;
            info!(path = %path.display(), frames = replay.len(), "Replaying recorded frames");
            let producer = SampleProducer::new(
                replay,
                Digitizer::new(cfg.engine.round_length),
                cfg.sampler.period(),
            );
            Some(producer.spawn(tx))
        }
        None => {
            warn!("No sampler configured (sampler.replay_path); every tick will be a gap");
            // Keep the slot open so the loop still runs its heartbeat.
            idle_tx = Some(tx);
            None
        }
    };

    // -- Main loop -------------------------------------------------------

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let summary = Runner::new(engine, &cfg.engine).run(slot, shutdown).await;

    drop(idle_tx);
    if let Some(handle) = producer {
        let _ = handle.await;
    }

    println!("{summary}");
    info!(session = %summary.session_id, "ROUNDWATCH shut down cleanly.");
    Ok(())
}

/// Pick the predictor named by `[predictor].provider`.
fn build_predictor(cfg: &PredictorConfig) -> Result<Box<dyn Predictor>> {
    match cfg.provider.as_str() {
        provider @ ("openrouter" | "openai") => match cfg.api_key() {
            Some(key) => {
                let base_url = cfg.base_url.clone().or_else(|| {
                    (provider == "openai").then(|| OPENAI_BASE_URL.to_string())
                });
                info!(provider, model = ?cfg.model, "Using chat completions predictor");
                Ok(Box::new(ChatPredictor::new(
                    key,
                    base_url,
                    cfg.model.clone(),
                    cfg.max_tokens,
                )?))
            }
            None => {
                warn!(env = %cfg.api_key_env, "No API key configured for predictor");
                local_predictor(cfg)
            }
        },
        "command" => local_predictor(cfg),
        other => {
            warn!(provider = other, "Unknown predictor provider");
            local_predictor(cfg)
        }
    }
}

/// The configured command predictor, or one that always abstains.
fn local_predictor(cfg: &PredictorConfig) -> Result<Box<dyn Predictor>> {
    if cfg.command.is_empty() {
        warn!("No predictor command configured, every pick comes from the fallback chain");
        return Ok(Box::new(AbstainPredictor));
    }
    info!(command = ?cfg.command, "Using command predictor");
    Ok(Box::new(CommandPredictor::new(&cfg.command)?))
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("roundwatch=info"));

    let json_logging = std::env::var("ROUNDWATCH_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
