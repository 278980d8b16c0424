//! Calculation pipeline.
//!
//! Pure orchestration of the batch stages: normalize → resolve →
//! group → fair price → EV score. Operates on an owned in-memory
//! snapshot with no shared mutable state — groups are independent, and
//! re-running the calculation stages on an unchanged quote snapshot
//! yields byte-identical output.

pub mod normalize;
pub mod resolve;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::AppConfig;
use crate::feed::ExtractionBatch;
use crate::registry::BookmakerRegistry;
use crate::strategy::{
    EvConfig, EvScorer, FairConfig, FairPriceCalculator, KellyCalculator, KellyConfig,
};
use crate::types::{CycleReport, FairPrice, GroupKey, Opportunity, Quote};
use resolve::PropResolver;

/// Result of one calculation pass: scored opportunities, the fair-price
/// audit records backing them, and the cycle diagnostics.
#[derive(Debug)]
pub struct CycleOutput {
    pub opportunities: Vec<Opportunity>,
    pub fair_prices: Vec<FairPrice>,
    pub report: CycleReport,
}

/// The odds-normalization → fair-price → EV-scoring pipeline.
pub struct Pipeline {
    resolver: PropResolver,
    fair: FairPriceCalculator,
    scorer: EvScorer,
}

impl Pipeline {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            resolver: PropResolver::new(cfg.props.market_prefixes.clone()),
            fair: FairPriceCalculator::new(FairConfig {
                min_sharp_quotes: cfg.strategy.min_sharp_quotes,
                outlier_tolerance: cfg.strategy.outlier_tolerance,
            }),
            scorer: EvScorer::new(
                EvConfig {
                    min_edge_threshold: cfg.strategy.min_edge_threshold,
                },
                KellyCalculator::new(KellyConfig {
                    bankroll: cfg.engine.bankroll,
                    max_stake_fraction: cfg.strategy.max_stake_fraction,
                }),
            ),
        }
    }

    /// Run the full pipeline over an extraction batch.
    ///
    /// Returns the captured quote snapshot (for persistence and later
    /// recomputation) alongside the cycle output.
    pub fn run(
        &self,
        batch: &ExtractionBatch,
        registry: &BookmakerRegistry,
        as_of: DateTime<Utc>,
    ) -> (Vec<Quote>, CycleOutput) {
        let (quotes, norm_stats) = normalize::normalize(&batch.events, registry);

        let mut output = self.process_quotes(quotes.clone(), registry, as_of);
        output.report.sports_requested = batch.requested;
        output.report.sports_failed = batch.failures.clone();
        output.report.events_fetched = batch.events.len();
        output.report.offers_seen = norm_stats.offers_seen;
        output.report.offers_dropped = norm_stats.offers_dropped;
        output.report.unknown_bookmakers = norm_stats.unknown_bookmakers;

        (quotes, output)
    }

    /// Run the calculation stages over an already-captured quote
    /// snapshot (e.g. `--recompute` after a formula fix). Idempotent:
    /// the same snapshot and `as_of` produce identical output.
    pub fn process_quotes(
        &self,
        quotes: Vec<Quote>,
        registry: &BookmakerRegistry,
        as_of: DateTime<Utc>,
    ) -> CycleOutput {
        // Resolve each quote's grouping key and cluster into outcome
        // groups. BTreeMap keeps group iteration order reproducible.
        let mut groups: BTreeMap<GroupKey, Vec<Quote>> = BTreeMap::new();
        for quote in quotes {
            let (quote, key) = self.resolver.resolve(quote);
            groups.entry(key).or_default().push(quote);
        }

        let (fair, fair_stats) = self.fair.compute_all(&groups, registry);

        // Score every quote in every group that has a fair price;
        // groups without consensus are skipped entirely.
        let mut opportunities = Vec::new();
        for (key, fair_price) in &fair {
            if let Some(quotes) = groups.get(key) {
                opportunities.extend(self.scorer.score_group(quotes, fair_price, as_of));
            }
        }

        // Best edges first; key order breaks ties so output is total.
        opportunities.sort_by(|a, b| {
            b.ev_percent
                .partial_cmp(&a.ev_percent)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.key().cmp(&b.key()))
        });

        let report = CycleReport {
            groups_total: groups.len(),
            groups_without_consensus: fair_stats.groups_without_consensus,
            outliers_rejected: fair_stats.outliers_rejected,
            opportunities_found: opportunities.len(),
            ..Default::default()
        };

        info!(
            groups = report.groups_total,
            no_consensus = report.groups_without_consensus,
            opportunities = report.opportunities_found,
            "Calculation stages complete"
        );

        CycleOutput {
            opportunities,
            fair_prices: fair.into_values().collect(),
            report,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{OddsBookmaker, OddsEvent, OddsMarket, OddsOffer};
    use chrono::Utc;

    fn book(key: &str, market: &str, outcomes: Vec<(&str, f64, Option<f64>)>) -> OddsBookmaker {
        OddsBookmaker {
            key: key.into(),
            title: key.into(),
            markets: vec![OddsMarket {
                key: market.into(),
                outcomes: outcomes
                    .into_iter()
                    .map(|(name, price, point)| OddsOffer {
                        name: name.into(),
                        price: Some(price),
                        point,
                    })
                    .collect(),
            }],
        }
    }

    /// A totals market with sharp consensus at 1.91/1.91 and one soft
    /// book hanging a +EV Over price.
    fn make_batch() -> ExtractionBatch {
        ExtractionBatch {
            requested: 1,
            events: vec![OddsEvent {
                id: "evt1".into(),
                sport_key: "basketball_nba".into(),
                commence_time: Utc::now() + chrono::Duration::hours(4),
                home_team: "Lakers".into(),
                away_team: "Celtics".into(),
                bookmakers: vec![
                    book("pinnacle", "totals", vec![
                        ("Over", 1.91, Some(210.5)),
                        ("Under", 1.91, Some(210.5)),
                    ]),
                    book("betfair_ex_eu", "totals", vec![
                        ("Over", 1.91, Some(210.5)),
                        ("Under", 1.91, Some(210.5)),
                    ]),
                    book("bovada", "totals", vec![
                        ("Over", 2.15, Some(210.5)),
                        ("Under", 1.75, Some(210.5)),
                    ]),
                ],
            }],
            failures: Vec::new(),
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::from_config(&AppConfig::default())
    }

    #[test]
    fn test_full_run_finds_soft_book_edge() {
        let batch = make_batch();
        let (quotes, output) = pipeline().run(&batch, &BookmakerRegistry::new(), Utc::now());

        assert_eq!(quotes.len(), 6);
        assert_eq!(output.report.offers_seen, 6);
        assert_eq!(output.report.groups_total, 2);

        // Fair is exactly 2.0 each side (margin removed), so bovada's
        // 2.15 Over is +7.5% while every 1.91 sharp quote is -4.5%.
        assert_eq!(output.opportunities.len(), 1);
        let opp = &output.opportunities[0];
        assert_eq!(opp.bookmaker, "bovada");
        assert_eq!(opp.outcome_label, "Over");
        assert!((opp.ev_percent - 7.5).abs() < 1e-9);
        assert!((opp.fair_price - 2.0).abs() < 1e-9);
        assert_eq!(opp.sharp_quote_count, 2);
    }

    #[test]
    fn test_fair_audit_records_cover_consensus_groups() {
        let batch = make_batch();
        let (_, output) = pipeline().run(&batch, &BookmakerRegistry::new(), Utc::now());
        assert_eq!(output.fair_prices.len(), 2);
        let total: f64 = output.fair_prices.iter().map(|f| f.fair_probability).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_recompute_is_byte_identical() {
        let batch = make_batch();
        let registry = BookmakerRegistry::new();
        let p = pipeline();
        let as_of = Utc::now();

        let (quotes, first) = p.run(&batch, &registry, as_of);
        let second = p.process_quotes(quotes.clone(), &registry, as_of);
        let third = p.process_quotes(quotes, &registry, as_of);

        let a = serde_json::to_vec(&first.opportunities).unwrap();
        let b = serde_json::to_vec(&second.opportunities).unwrap();
        let c = serde_json::to_vec(&third.opportunities).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_no_consensus_group_emits_nothing() {
        // Only soft books quote this market: no fair price, no
        // opportunity regardless of how generous the prices look.
        let batch = ExtractionBatch {
            requested: 1,
            events: vec![OddsEvent {
                id: "evt2".into(),
                sport_key: "basketball_nba".into(),
                commence_time: Utc::now(),
                home_team: "Heat".into(),
                away_team: "Knicks".into(),
                bookmakers: vec![
                    book("bovada", "h2h", vec![("Heat", 3.50, None), ("Knicks", 1.40, None)]),
                    book("pinnacle", "h2h", vec![("Heat", 2.0, None)]),
                ],
            }],
            failures: Vec::new(),
        };
        let (_, output) = pipeline().run(&batch, &BookmakerRegistry::new(), Utc::now());
        assert!(output.opportunities.is_empty());
        assert_eq!(output.report.groups_without_consensus, 2);
    }

    #[test]
    fn test_failed_sports_carried_into_report() {
        let mut batch = make_batch();
        batch.requested = 2;
        batch.failures.push(("tennis_atp".into(), "HTTP 500".into()));
        let (_, output) = pipeline().run(&batch, &BookmakerRegistry::new(), Utc::now());
        assert_eq!(output.report.sports_requested, 2);
        assert_eq!(output.report.sports_failed.len(), 1);
        // The surviving sport's opportunities still made it through.
        assert_eq!(output.opportunities.len(), 1);
    }

    #[test]
    fn test_opportunities_sorted_by_edge_descending() {
        let mut batch = make_batch();
        // Second soft book slightly less wrong than bovada.
        batch.events[0].bookmakers.push(book(
            "mybookieag",
            "totals",
            vec![("Over", 2.08, Some(210.5))],
        ));
        let (_, output) = pipeline().run(&batch, &BookmakerRegistry::new(), Utc::now());
        assert_eq!(output.opportunities.len(), 2);
        assert!(output.opportunities[0].ev_percent >= output.opportunities[1].ev_percent);
        assert_eq!(output.opportunities[0].bookmaker, "bovada");
    }
}
