//! The Odds API client.
//!
//! Fetches upcoming events with bookmaker offers from
//! `https://api.the-odds-api.com/v4/sports/{sport}/odds`, requesting
//! decimal odds. Auth: `apiKey` query parameter. The free tier meters
//! requests via `x-requests-remaining` response headers, which are
//! logged at debug for quota tracking.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::OddsFeed;
use crate::config::FeedConfig;
use crate::types::FairlineError;

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

/// One event with all bookmaker offers, as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct OddsEvent {
    pub id: String,
    pub sport_key: String,
    pub commence_time: DateTime<Utc>,
    #[serde(default)]
    pub home_team: String,
    #[serde(default)]
    pub away_team: String,
    #[serde(default)]
    pub bookmakers: Vec<OddsBookmaker>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OddsBookmaker {
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub markets: Vec<OddsMarket>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OddsMarket {
    pub key: String,
    #[serde(default)]
    pub outcomes: Vec<OddsOffer>,
}

/// A single priced outcome. `price` is optional so that a malformed or
/// missing price deserializes cleanly and is dropped by the normalizer
/// instead of failing the whole payload.
#[derive(Debug, Clone, Deserialize)]
pub struct OddsOffer {
    pub name: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub point: Option<f64>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct TheOddsApiClient {
    http: Client,
    base_url: String,
    api_key: String,
    regions: String,
    markets: String,
}

impl TheOddsApiClient {
    pub fn new(cfg: &FeedConfig, api_key: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .user_agent("FAIRLINE/0.1.0")
            .build()
            .context("Failed to build odds HTTP client")?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            regions: cfg.regions.clone(),
            markets: cfg.markets.join(","),
        })
    }
}

#[async_trait]
impl OddsFeed for TheOddsApiClient {
    async fn fetch_sport(&self, sport: &str) -> Result<Vec<OddsEvent>> {
        let url = format!("{}/sports/{sport}/odds", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("regions", self.regions.as_str()),
                ("markets", self.markets.as_str()),
                ("oddsFormat", "decimal"),
            ])
            .send()
            .await
            .with_context(|| format!("Odds request failed for {sport}"))?;

        let status = response.status();
        if !status.is_success() {
            let message = if status.as_u16() == 429 {
                "rate limit exceeded".to_string()
            } else {
                format!("HTTP {status}")
            };
            return Err(FairlineError::Feed {
                sport: sport.to_string(),
                message,
            }
            .into());
        }

        if let Some(remaining) = response
            .headers()
            .get("x-requests-remaining")
            .and_then(|v| v.to_str().ok())
        {
            debug!(sport, remaining, "Odds API quota");
        }

        let events: Vec<OddsEvent> = response
            .json()
            .await
            .with_context(|| format!("Malformed odds payload for {sport}"))?;

        debug!(sport, events = events.len(), "Odds payload parsed");
        Ok(events)
    }

    fn name(&self) -> &str {
        "the-odds-api"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
