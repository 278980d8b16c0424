//! Fair price computation.
//!
//! For each outcome group: select sharp-tier quotes, reject outliers
//! against the median implied probability, form a tier-weighted
//! consensus, and remove the bookmaker overround by normalizing against
//! the complementary outcome when one exists.
//!
//! Deterministic by construction: groups live in ordered maps and
//! quotes are sorted before aggregation, so an identical input snapshot
//! produces bit-identical output. No randomness, no wall clock.

use std::collections::BTreeMap;
use tracing::debug;

use crate::registry::BookmakerRegistry;
use crate::types::{FairPrice, GroupKey, MarketSlice, OutcomeKey, Quote};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FairConfig {
    /// Minimum sharp quotes for a group to have a consensus at all.
    pub min_sharp_quotes: usize,
    /// Relative deviation from the median implied probability beyond
    /// which a sharp quote is excluded from the weighted average.
    pub outlier_tolerance: f64,
}

impl Default for FairConfig {
    fn default() -> Self {
        Self {
            min_sharp_quotes: 2,
            outlier_tolerance: 0.05,
        }
    }
}

/// Per-cycle diagnostics from fair-price computation.
#[derive(Debug, Clone, Copy, Default)]
pub struct FairStats {
    /// Groups with fewer than `min_sharp_quotes` sharp quotes.
    pub groups_without_consensus: usize,
    /// Sharp quotes excluded by outlier rejection.
    pub outliers_rejected: usize,
}

// ---------------------------------------------------------------------------
// Calculator
// ---------------------------------------------------------------------------

/// Pre-normalization consensus for one group.
struct RawConsensus {
    probability: f64,
    sharp_quote_count: usize,
    contributors: Vec<String>,
    rejected: usize,
}

pub struct FairPriceCalculator {
    config: FairConfig,
}

impl FairPriceCalculator {
    pub fn new(config: FairConfig) -> Self {
        Self { config }
    }

    /// Access the fair-price configuration.
    pub fn config(&self) -> &FairConfig {
        &self.config
    }

    /// Compute a fair price for every group that has sharp consensus.
    ///
    /// Groups without enough sharp quotes are simply absent from the
    /// result (insufficient consensus is not an error). Margin removal
    /// runs as a second pass so both sides of a market are normalized
    /// against each other's independently computed raw consensus.
    pub fn compute_all(
        &self,
        groups: &BTreeMap<GroupKey, Vec<Quote>>,
        registry: &BookmakerRegistry,
    ) -> (BTreeMap<GroupKey, FairPrice>, FairStats) {
        let mut stats = FairStats::default();

        // Pass 1: raw tier-weighted consensus per group. Each side of a
        // market keeps its own weight total — sides are separate groups.
        let mut raw: BTreeMap<GroupKey, RawConsensus> = BTreeMap::new();
        for (key, quotes) in groups {
            match self.raw_consensus(quotes, registry) {
                Some(consensus) => {
                    stats.outliers_rejected += consensus.rejected;
                    raw.insert(key.clone(), consensus);
                }
                None => {
                    debug!(group = %key, "Insufficient sharp consensus");
                    stats.groups_without_consensus += 1;
                }
            }
        }

        // Index the full group set by market slice so standard two-sided
        // markets can find their positional complement.
        let mut slices: BTreeMap<MarketSlice, Vec<&GroupKey>> = BTreeMap::new();
        for key in groups.keys() {
            slices.entry(key.slice()).or_default().push(key);
        }

        // Pass 2: margin removal, then invert to a price.
        let mut fair = BTreeMap::new();
        for (key, consensus) in &raw {
            let complement_prob = self
                .complement_key(key, &slices)
                .and_then(|comp| raw.get(&comp))
                .map(|c| c.probability);

            let fair_probability = match complement_prob {
                // Normalize both sides to sum to 1: removes the
                // bookmaker-agnostic overround.
                Some(cp) => consensus.probability / (consensus.probability + cp),
                // No complement: priced independently, unnormalized.
                None => consensus.probability,
            };

            fair.insert(
                key.clone(),
                FairPrice {
                    group: key.clone(),
                    fair_probability,
                    fair_price: 1.0 / fair_probability,
                    sharp_quote_count: consensus.sharp_quote_count,
                    contributing_bookmakers: consensus.contributors.clone(),
                },
            );
        }

        (fair, stats)
    }

    /// Raw consensus: sharp filter → implied probabilities → outlier
    /// rejection → tier-weighted average. `None` when fewer than
    /// `min_sharp_quotes` sharp quotes exist.
    fn raw_consensus(
        &self,
        quotes: &[Quote],
        registry: &BookmakerRegistry,
    ) -> Option<RawConsensus> {
        let mut sharp: Vec<&Quote> = quotes
            .iter()
            .filter(|q| registry.is_sharp(&q.bookmaker))
            .collect();

        if sharp.len() < self.config.min_sharp_quotes {
            return None;
        }

        // Sorted aggregation order keeps output reproducible regardless
        // of how the caller assembled the group.
        sharp.sort_by(|a, b| {
            a.bookmaker
                .cmp(&b.bookmaker)
                .then(a.price.partial_cmp(&b.price).unwrap_or(std::cmp::Ordering::Equal))
        });

        let probs: Vec<f64> = sharp.iter().map(|q| q.implied_prob()).collect();
        let med = median(&probs);

        // A quote exactly at the tolerance boundary is retained.
        let retained: Vec<usize> = (0..sharp.len())
            .filter(|&i| (probs[i] - med).abs() <= self.config.outlier_tolerance * med)
            .collect();

        // Never reduce below viability as a side effect of rejection.
        let (used, rejected) = if retained.len() < self.config.min_sharp_quotes {
            ((0..sharp.len()).collect::<Vec<_>>(), 0)
        } else {
            let rejected = sharp.len() - retained.len();
            (retained, rejected)
        };

        let mut weight_sum = 0.0;
        let mut weighted_prob = 0.0;
        let mut contributors = Vec::with_capacity(used.len());
        for &i in &used {
            let w = registry.weight(&sharp[i].bookmaker);
            weight_sum += w;
            weighted_prob += w * probs[i];
            contributors.push(sharp[i].bookmaker.clone());
        }

        if weight_sum <= 0.0 {
            // Zero-weight group: degenerate, treated as no consensus.
            return None;
        }

        Some(RawConsensus {
            probability: weighted_prob / weight_sum,
            sharp_quote_count: used.len(),
            contributors,
            rejected,
        })
    }

    /// The complementary group for margin removal, if one exists.
    ///
    /// Player props pair structurally (same player, opposite side).
    /// Standard outcomes pair positionally: within their market slice
    /// when it holds exactly two distinct standard outcomes (Over/Under
    /// style, both sides at the same line), or across the mirrored-line
    /// slice when each side carries a signed point (handicap style:
    /// home −7.5 pairs with away +7.5). Three-way markets are priced
    /// independently.
    fn complement_key(
        &self,
        key: &GroupKey,
        slices: &BTreeMap<MarketSlice, Vec<&GroupKey>>,
    ) -> Option<GroupKey> {
        if let Some(comp) = key.complement() {
            return Some(comp);
        }

        let standards = standard_outcomes(slices.get(&key.slice())?);
        match standards.len() {
            2 => standards
                .iter()
                .find(|k| k.outcome != key.outcome)
                .map(|k| (*k).clone()),
            1 => {
                // A level handicap (line 0) puts both sides in one
                // slice, handled above; only signed lines mirror.
                let line = key.line.filter(|&l| l != 0)?;
                let mut mirror = key.slice();
                mirror.line = Some(-line);
                let mirrored = standard_outcomes(slices.get(&mirror)?);
                match mirrored.as_slice() {
                    [comp] if comp.outcome != key.outcome => Some((*comp).clone()),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

fn standard_outcomes<'a>(keys: &[&'a GroupKey]) -> Vec<&'a GroupKey> {
    keys.iter()
        .filter(|k| matches!(k.outcome, OutcomeKey::Standard { .. }))
        .copied()
        .collect()
}

/// Median of a non-empty slice (mean of the middle two for even lengths).
fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
