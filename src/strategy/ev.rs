//! EV scoring.
//!
//! Compares every bookmaker's quote in a group against that group's
//! fair price, computes the percentage edge and implied probability,
//! and emits an `Opportunity` for quotes clearing the minimum edge.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::kelly::KellyCalculator;
use crate::types::{FairPrice, Opportunity, Quote};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EvConfig {
    /// Minimum EV as a fraction (0.03 = require ev_percent ≥ 3%).
    pub min_edge_threshold: f64,
}

impl Default for EvConfig {
    fn default() -> Self {
        Self {
            min_edge_threshold: 0.03,
        }
    }
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

pub struct EvScorer {
    config: EvConfig,
    kelly: KellyCalculator,
}

impl EvScorer {
    pub fn new(config: EvConfig, kelly: KellyCalculator) -> Self {
        Self { config, kelly }
    }

    /// Access the EV configuration.
    pub fn config(&self) -> &EvConfig {
        &self.config
    }

    /// Score every quote in a group against the group's fair price.
    ///
    /// `as_of` stamps the records; the caller passes the cycle's capture
    /// time so re-scoring an unchanged snapshot is byte-identical.
    pub fn score_group(
        &self,
        quotes: &[Quote],
        fair: &FairPrice,
        as_of: DateTime<Utc>,
    ) -> Vec<Opportunity> {
        quotes
            .iter()
            .filter_map(|q| self.score(q, fair, as_of))
            .collect()
    }

    /// Score a single quote. `None` is the expected filtering branch:
    /// edge below threshold, or a degenerate price that slipped through.
    pub fn score(
        &self,
        quote: &Quote,
        fair: &FairPrice,
        as_of: DateTime<Utc>,
    ) -> Option<Opportunity> {
        // Price ≈ 1.0 is excluded upstream; skip silently if present.
        if quote.price - 1.0 < f64::EPSILON {
            return None;
        }

        let ev_percent = (fair.fair_probability * quote.price - 1.0) * 100.0;
        if ev_percent < self.config.min_edge_threshold * 100.0 {
            return None;
        }

        let kelly_stake = self.kelly.stake(fair.fair_probability, quote.price);

        debug!(
            group = %fair.group,
            bookmaker = %quote.bookmaker,
            price = quote.price,
            fair_price = fair.fair_price,
            ev = format!("{ev_percent:.2}%"),
            "Opportunity found"
        );

        Some(Opportunity {
            event_id: quote.event_id.clone(),
            sport: quote.sport.clone(),
            commence_time: quote.commence_time,
            market: quote.market.clone(),
            point: quote.point,
            outcome_label: quote.outcome_label.clone(),
            bookmaker: quote.bookmaker.clone(),
            price: quote.price,
            fair_price: fair.fair_price,
            ev_percent,
            implied_prob: quote.implied_prob(),
            sharp_quote_count: fair.sharp_quote_count,
            kelly_stake,
            updated_at: as_of,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::kelly::KellyConfig;
    use crate::types::{GroupKey, OutcomeKey};

    fn make_fair(probability: f64) -> FairPrice {
        FairPrice {
            group: GroupKey {
                sport: "basketball_nba".into(),
                event_id: "evt1".into(),
                market: "totals".into(),
                line: Some(21050),
                outcome: OutcomeKey::Standard { label: "Over".into() },
            },
            fair_probability: probability,
            fair_price: 1.0 / probability,
            sharp_quote_count: 3,
            contributing_bookmakers: vec!["pinnacle".into()],
        }
    }

    fn make_quote(bookmaker: &str, price: f64) -> Quote {
        Quote {
            event_id: "evt1".into(),
            sport: "basketball_nba".into(),
            commence_time: Utc::now(),
            market: "totals".into(),
            point: Some(210.5),
            outcome_label: "Over".into(),
            bookmaker: bookmaker.into(),
            price,
        }
    }

    fn scorer() -> EvScorer {
        EvScorer::new(EvConfig::default(), KellyCalculator::new(KellyConfig::default()))
    }

    #[test]
    fn test_ev_formula_exact() {
        // price = 2.10 at fair 50% → ev_percent = (0.5·2.1 − 1)·100 = 5.0
        let opp = scorer()
            .score(&make_quote("draftkings", 2.10), &make_fair(0.50), Utc::now())
            .unwrap();
        assert!((opp.ev_percent - 5.0).abs() < 1e-9);
        assert!((opp.implied_prob - 1.0 / 2.10).abs() < 1e-12);
        assert_eq!(opp.sharp_quote_count, 3);
    }

    #[test]
    fn test_below_threshold_filtered() {
        // price 2.04 at fair 50% → 2% EV, under the 3% default.
        let result = scorer().score(&make_quote("draftkings", 2.04), &make_fair(0.50), Utc::now());
        assert!(result.is_none());
    }

    #[test]
    fn test_at_threshold_retained() {
        // price 2.06 at fair 50% → exactly 3% EV.
        let result = scorer().score(&make_quote("draftkings", 2.06), &make_fair(0.50), Utc::now());
        assert!(result.is_some());
    }

    #[test]
    fn test_degenerate_price_skipped() {
        let result = scorer().score(&make_quote("draftkings", 1.0), &make_fair(0.99), Utc::now());
        assert!(result.is_none());
    }

    #[test]
    fn test_kelly_stake_clamped() {
        // Massive edge: stake must not exceed max_stake_fraction × bankroll.
        let opp = scorer()
            .score(&make_quote("draftkings", 3.0), &make_fair(0.50), Utc::now())
            .unwrap();
        assert!((opp.kelly_stake - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_group_scores_every_bookmaker() {
        let quotes = vec![
            make_quote("draftkings", 2.10), // +5%
            make_quote("fanduel", 2.04),    // +2%, filtered
            make_quote("bovada", 2.20),     // +10%
        ];
        let opps = scorer().score_group(&quotes, &make_fair(0.50), Utc::now());
        assert_eq!(opps.len(), 2);
        let books: Vec<&str> = opps.iter().map(|o| o.bookmaker.as_str()).collect();
        assert!(books.contains(&"draftkings"));
        assert!(books.contains(&"bovada"));
    }

    #[test]
    fn test_same_as_of_same_output() {
        let as_of = Utc::now();
        let s = scorer();
        let quote = make_quote("draftkings", 2.10);
        let fair = make_fair(0.50);
        let a = s.score(&quote, &fair, as_of).unwrap();
        let b = s.score(&quote, &fair, as_of).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
