//! FAIRLINE — Sharp-Consensus EV Scanner
//!
//! Entry point. Loads configuration, initialises structured logging,
//! then runs one extract→normalize→fair-price→score→publish cycle.
//! With `--recompute`, skips extraction and replays the calculation
//! stages over the last persisted quote snapshot.

use anyhow::Result;
use chrono::Utc;
use std::path::Path;
use tracing::{info, warn};

use fairline::config::AppConfig;
use fairline::feed::{FeedRouter, TheOddsApiClient};
use fairline::pipeline::{CycleOutput, Pipeline};
use fairline::registry::BookmakerRegistry;
use fairline::sink::{self, OpportunitySink};

const BANNER: &str = r#"
 _____ _    ___ ____  _     ___ _   _ _____
|  ___/ \  |_ _|  _ \| |   |_ _| \ | | ____|
| |_ / _ \  | || |_) | |    | ||  \| |  _|
|  _/ ___ \ | ||  _ <| |___ | || |\  | |___
|_|/_/   \_\___|_| \_\_____|___|_| \_|_____|

  Sharp-Consensus EV Scanner
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load_or_default("config.toml")?;

    init_logging();

    println!("{BANNER}");
    info!(
        sports = cfg.engine.sports.len(),
        min_edge = cfg.strategy.min_edge_threshold,
        min_sharp_quotes = cfg.strategy.min_sharp_quotes,
        bankroll = cfg.engine.bankroll,
        "FAIRLINE starting up"
    );

    let recompute = std::env::args().any(|a| a == "--recompute");

    let registry = BookmakerRegistry::with_overrides(&cfg.bookmakers);
    let pipeline = Pipeline::from_config(&cfg);
    let mut opportunity_sink = OpportunitySink::open(&cfg.sink.path)?;

    let output = if recompute {
        run_recompute(&cfg, &pipeline, &registry)?
    } else {
        run_cycle(&cfg, &pipeline, &registry).await?
    };

    // -- Publish -----------------------------------------------------------

    let now = Utc::now();
    let (inserted, updated) = opportunity_sink.upsert_cycle(output.opportunities);
    let pruned = opportunity_sink.prune(now, cfg.sink.retention_hours);
    opportunity_sink.set_audit(output.fair_prices);
    opportunity_sink.publish(now)?;

    info!(
        report = %output.report,
        inserted,
        updated,
        pruned,
        live = opportunity_sink.len(),
        "Cycle complete"
    );

    Ok(())
}

/// One full extraction cycle: fetch odds, run the pipeline, and persist
/// the raw quote snapshot for later recomputation.
async fn run_cycle(
    cfg: &AppConfig,
    pipeline: &Pipeline,
    registry: &BookmakerRegistry,
) -> Result<CycleOutput> {
    let api_key = AppConfig::resolve_env(&cfg.feed.api_key_env)?;
    let client = TheOddsApiClient::new(&cfg.feed, api_key)?;
    let router = FeedRouter::new(Box::new(client), cfg.engine.concurrency);

    let batch = router.extract_all(&cfg.engine.sports).await;
    if !batch.failures.is_empty() {
        warn!(
            failed = batch.failures.len(),
            requested = batch.requested,
            "Some sports failed extraction; proceeding with partial batch"
        );
    }

    let as_of = Utc::now();
    let (quotes, output) = pipeline.run(&batch, registry, as_of);

    sink::save_quotes(Path::new(&cfg.sink.quotes_path), &quotes, as_of)?;

    Ok(output)
}

/// Replay the calculation stages over the persisted quote snapshot,
/// stamped with the snapshot's original capture time so output matches
/// the original cycle byte for byte.
fn run_recompute(
    cfg: &AppConfig,
    pipeline: &Pipeline,
    registry: &BookmakerRegistry,
) -> Result<CycleOutput> {
    let snapshot = sink::load_quotes(Path::new(&cfg.sink.quotes_path))?.ok_or_else(|| {
        anyhow::anyhow!(
            "No quote snapshot at {} — run a normal cycle first",
            cfg.sink.quotes_path
        )
    })?;

    info!(
        quotes = snapshot.quotes.len(),
        captured_at = %snapshot.captured_at,
        "Recomputing from persisted quote snapshot"
    );

    Ok(pipeline.process_quotes(snapshot.quotes, registry, snapshot.captured_at))
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fairline=info"));

    let json_logging = std::env::var("FAIRLINE_LOG_JSON").is_ok();

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
