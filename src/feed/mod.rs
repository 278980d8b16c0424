//! Odds feed integrations.
//!
//! Defines the `OddsFeed` trait and the `FeedRouter` that drives
//! extraction across all configured sports with bounded parallelism.
//! One sport's failure never aborts the cycle: the router records it
//! and proceeds with the remaining sports, producing a partial-but-valid
//! batch.

pub mod the_odds_api;

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

pub use the_odds_api::{OddsBookmaker, OddsEvent, OddsMarket, OddsOffer, TheOddsApiClient};

/// Abstraction over odds market-data sources.
#[async_trait]
pub trait OddsFeed: Send + Sync {
    /// Fetch all upcoming events with bookmaker offers for one sport.
    async fn fetch_sport(&self, sport: &str) -> Result<Vec<OddsEvent>>;

    /// Feed name for logging and identification.
    fn name(&self) -> &str;
}

/// Result of one extraction pass: the raw events that arrived, plus the
/// sports that failed and why.
#[derive(Debug, Default)]
pub struct ExtractionBatch {
    /// Number of sports the extraction was asked for.
    pub requested: usize,
    pub events: Vec<OddsEvent>,
    pub failures: Vec<(String, String)>,
}

/// Runs extraction over the configured sports through a bounded worker
/// pool, respecting the external API's rate limits.
pub struct FeedRouter {
    feed: Box<dyn OddsFeed>,
    concurrency: usize,
}

impl FeedRouter {
    pub fn new(feed: Box<dyn OddsFeed>, concurrency: usize) -> Self {
        Self {
            feed,
            concurrency: concurrency.max(1),
        }
    }

    /// Extract all sports. Per-sport failures are isolated: logged,
    /// recorded in the batch, and the remaining sports still land.
    pub async fn extract_all(&self, sports: &[String]) -> ExtractionBatch {
        info!(
            feed = self.feed.name(),
            sports = sports.len(),
            concurrency = self.concurrency,
            "Starting odds extraction"
        );

        let mut results: Vec<(String, Result<Vec<OddsEvent>>)> =
            stream::iter(sports.iter().cloned())
                .map(|sport| async move {
                    let result = self.feed.fetch_sport(&sport).await;
                    (sport, result)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        // Completion order is nondeterministic; sort by sport key so the
        // batch (and everything downstream) is reproducible.
        results.sort_by(|a, b| a.0.cmp(&b.0));

        let mut batch = ExtractionBatch {
            requested: sports.len(),
            ..Default::default()
        };
        for (sport, result) in results {
            match result {
                Ok(events) => {
                    info!(sport = %sport, events = events.len(), "Sport extracted");
                    batch.events.extend(events);
                }
                Err(e) => {
                    warn!(sport = %sport, error = %e, "Sport extraction failed, continuing without");
                    batch.failures.push((sport, e.to_string()));
                }
            }
        }

        info!(
            events = batch.events.len(),
            failed_sports = batch.failures.len(),
            "Extraction complete"
        );

        batch
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    /// Feed that succeeds for every sport except those in `fail`.
    struct FlakyFeed {
        fail: Vec<&'static str>,
    }

    #[async_trait]
    impl OddsFeed for FlakyFeed {
        async fn fetch_sport(&self, sport: &str) -> Result<Vec<OddsEvent>> {
            if self.fail.contains(&sport) {
                anyhow::bail!("simulated timeout");
            }
            Ok(vec![OddsEvent {
                id: format!("{sport}-evt"),
                sport_key: sport.to_string(),
                commence_time: Utc::now(),
                home_team: "Home".into(),
                away_team: "Away".into(),
                bookmakers: Vec::new(),
            }])
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn test_failure_isolated_per_sport() {
        let router = FeedRouter::new(
            Box::new(FlakyFeed { fail: vec!["tennis_atp"] }),
            2,
        );
        let sports = vec![
            "basketball_nba".to_string(),
            "tennis_atp".to_string(),
            "baseball_mlb".to_string(),
        ];
        let batch = router.extract_all(&sports).await;

        assert_eq!(batch.events.len(), 2);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].0, "tennis_atp");
        assert!(batch.failures[0].1.contains("timeout"));
    }

    #[tokio::test]
    async fn test_events_sorted_by_sport() {
        let router = FeedRouter::new(Box::new(FlakyFeed { fail: vec![] }), 4);
        let sports = vec![
            "icehockey_nhl".to_string(),
            "baseball_mlb".to_string(),
            "basketball_nba".to_string(),
        ];
        let batch = router.extract_all(&sports).await;
        let keys: Vec<&str> = batch.events.iter().map(|e| e.sport_key.as_str()).collect();
        assert_eq!(keys, vec!["baseball_mlb", "basketball_nba", "icehockey_nhl"]);
    }

    #[tokio::test]
    async fn test_zero_concurrency_clamped() {
        let router = FeedRouter::new(Box::new(FlakyFeed { fail: vec![] }), 0);
        let batch = router.extract_all(&["basketball_nba".to_string()]).await;
        assert_eq!(batch.events.len(), 1);
    }
}
