//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API keys) are referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`. Every field carries a serde
//! default so a minimal config file still produces a runnable scanner.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub props: PropsConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    /// Per-bookmaker tier overrides, keyed by feed key.
    #[serde(default)]
    pub bookmakers: HashMap<String, u8>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// Sport keys to extract each cycle.
    #[serde(default = "default_sports")]
    pub sports: Vec<String>,
    /// Bounded extraction parallelism (respects feed rate limits).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Bankroll used for Kelly stake sizing.
    #[serde(default = "default_bankroll")]
    pub bankroll: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sports: default_sports(),
            concurrency: default_concurrency(),
            bankroll: default_bankroll(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    /// Env var holding The Odds API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Comma-separated bookmaker regions, passed through to the API.
    #[serde(default = "default_regions")]
    pub regions: String,
    /// Market keys to request per sport.
    #[serde(default = "default_markets")]
    pub markets: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            regions: default_regions(),
            markets: default_markets(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StrategyConfig {
    /// Minimum EV (as a fraction, 0.03 = 3%) to emit an opportunity.
    #[serde(default = "default_min_edge")]
    pub min_edge_threshold: f64,
    /// Kelly stake cap as a fraction of bankroll.
    #[serde(default = "default_max_stake_fraction")]
    pub max_stake_fraction: f64,
    /// Relative tolerance for sharp-quote outlier rejection.
    #[serde(default = "default_outlier_tolerance")]
    pub outlier_tolerance: f64,
    /// Minimum sharp quotes needed for a fair price.
    #[serde(default = "default_min_sharp_quotes")]
    pub min_sharp_quotes: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            min_edge_threshold: default_min_edge(),
            max_stake_fraction: default_max_stake_fraction(),
            outlier_tolerance: default_outlier_tolerance(),
            min_sharp_quotes: default_min_sharp_quotes(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PropsConfig {
    /// Market-key prefixes identifying player-prop markets.
    #[serde(default = "default_prop_prefixes")]
    pub market_prefixes: Vec<String>,
}

impl Default for PropsConfig {
    fn default() -> Self {
        Self {
            market_prefixes: default_prop_prefixes(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SinkConfig {
    /// Published opportunity snapshot path.
    #[serde(default = "default_sink_path")]
    pub path: String,
    /// Captured raw-quote snapshot path (enables `--recompute`).
    #[serde(default = "default_quotes_path")]
    pub quotes_path: String,
    /// Entries not refreshed within this window are pruned.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: i64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            path: default_sink_path(),
            quotes_path: default_quotes_path(),
            retention_hours: default_retention_hours(),
        }
    }
}

fn default_sports() -> Vec<String> {
    vec![
        "basketball_nba".to_string(),
        "americanfootball_nfl".to_string(),
        "baseball_mlb".to_string(),
        "icehockey_nhl".to_string(),
    ]
}

fn default_concurrency() -> usize {
    3
}

fn default_bankroll() -> f64 {
    1000.0
}

fn default_api_key_env() -> String {
    "ODDS_API_KEY".to_string()
}

fn default_base_url() -> String {
    "https://api.the-odds-api.com/v4".to_string()
}

fn default_regions() -> String {
    "us,eu".to_string()
}

fn default_markets() -> Vec<String> {
    vec!["h2h".to_string(), "spreads".to_string(), "totals".to_string()]
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_min_edge() -> f64 {
    0.03
}

fn default_max_stake_fraction() -> f64 {
    0.05
}

fn default_outlier_tolerance() -> f64 {
    0.05
}

fn default_min_sharp_quotes() -> usize {
    2
}

fn default_prop_prefixes() -> Vec<String> {
    vec![
        "player_".to_string(),
        "batter_".to_string(),
        "pitcher_".to_string(),
    ]
}

fn default_sink_path() -> String {
    "opportunities.json".to_string()
}

fn default_quotes_path() -> String {
    "quotes_snapshot.json".to_string()
}

fn default_retention_hours() -> i64 {
    6
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Load from a TOML file, or fall back to defaults when the file is
    /// missing (a parse error is still fatal).
    pub fn load_or_default(path: &str) -> Result<Self> {
        if std::path::Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
