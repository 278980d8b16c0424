//! Shared types for the FAIRLINE scanner.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that feed, pipeline, strategy,
//! and sink modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Bookmaker
// ---------------------------------------------------------------------------

/// A bookmaker with its reliability tier.
///
/// Tier is immutable configuration loaded once at process start.
/// Tier ≥ 3 marks the bookmaker "sharp": eligible to contribute to the
/// fair-price consensus. All tiers are eligible as EV targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmaker {
    /// Stable feed key, e.g. "pinnacle".
    pub id: String,
    pub display_name: String,
    /// Reliability tier 1–4, used directly as a consensus weight.
    pub tier: u8,
}

impl fmt::Display for Bookmaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}★)", self.display_name, self.tier)
    }
}

// ---------------------------------------------------------------------------
// Quote
// ---------------------------------------------------------------------------

/// One bookmaker's price for one outcome of one market.
///
/// Immutable once captured; the next extraction cycle supersedes it
/// rather than mutating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub event_id: String,
    /// Sport key, e.g. "basketball_nba".
    pub sport: String,
    pub commence_time: DateTime<Utc>,
    /// Market key, e.g. "h2h", "totals", "player_points".
    pub market: String,
    /// Handicap/total line, if the market carries one.
    pub point: Option<f64>,
    pub outcome_label: String,
    /// Bookmaker feed key.
    pub bookmaker: String,
    /// Decimal odds, always > 1.0 after normalization.
    pub price: f64,
}

impl Quote {
    /// Implied probability of this price (1 / decimal odds).
    pub fn implied_prob(&self) -> f64 {
        1.0 / self.price
    }

    /// The line as a centi-point integer for use in keys.
    pub fn line(&self) -> Option<i64> {
        line_from_point(self.point)
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}{} @ {:.2} ({})",
            self.sport,
            self.market,
            self.outcome_label,
            self.point.map(|p| format!(" {p}")).unwrap_or_default(),
            self.price,
            self.bookmaker,
        )
    }
}

/// Convert a floating line to a centi-point integer so group and
/// opportunity keys stay `Eq + Ord + Hash` without comparing floats.
pub fn line_from_point(point: Option<f64>) -> Option<i64> {
    point.map(|p| (p * 100.0).round() as i64)
}

// ---------------------------------------------------------------------------
// Outcome identity
// ---------------------------------------------------------------------------

/// Direction of a player-prop quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PropSide {
    Over,
    Under,
}

impl PropSide {
    /// The opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            PropSide::Over => PropSide::Under,
            PropSide::Under => PropSide::Over,
        }
    }
}

impl fmt::Display for PropSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropSide::Over => write!(f, "Over"),
            PropSide::Under => write!(f, "Under"),
        }
    }
}

/// Canonical identity of one bettable outcome, produced once by the
/// resolver and consumed unchanged downstream — no later stage
/// re-parses label strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OutcomeKey {
    /// Non-prop outcome, keyed by its (trimmed) label verbatim.
    Standard { label: String },
    /// Player prop, keyed by normalized player name and direction.
    PlayerProp { player: String, side: PropSide },
}

impl OutcomeKey {
    /// The complementary outcome, when it is knowable from the key alone.
    ///
    /// Player props always have a structural complement (same player,
    /// opposite side). Standard outcomes pair positionally within their
    /// market slice instead, so this returns `None` for them.
    pub fn complement(&self) -> Option<OutcomeKey> {
        match self {
            OutcomeKey::Standard { .. } => None,
            OutcomeKey::PlayerProp { player, side } => Some(OutcomeKey::PlayerProp {
                player: player.clone(),
                side: side.opposite(),
            }),
        }
    }
}

impl fmt::Display for OutcomeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeKey::Standard { label } => write!(f, "{label}"),
            OutcomeKey::PlayerProp { player, side } => write!(f, "{player} {side}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Group key
// ---------------------------------------------------------------------------

/// Identity of an outcome group: the unit of fair-price computation.
///
/// All quotes sharing a `GroupKey` represent the same bettable outcome
/// across bookmakers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub sport: String,
    pub event_id: String,
    pub market: String,
    /// Centi-point line (see [`line_from_point`]).
    pub line: Option<i64>,
    pub outcome: OutcomeKey,
}

impl GroupKey {
    /// The market slice this group belongs to — the scope within which
    /// complementary outcomes are paired for margin removal.
    pub fn slice(&self) -> MarketSlice {
        MarketSlice {
            sport: self.sport.clone(),
            event_id: self.event_id.clone(),
            market: self.market.clone(),
            line: self.line,
        }
    }

    /// The complementary group key, if structurally knowable.
    pub fn complement(&self) -> Option<GroupKey> {
        self.outcome.complement().map(|outcome| GroupKey {
            sport: self.sport.clone(),
            event_id: self.event_id.clone(),
            market: self.market.clone(),
            line: self.line,
            outcome,
        })
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}{}/{}",
            self.sport,
            self.event_id,
            self.market,
            self.line
                .map(|l| format!("@{:.2}", l as f64 / 100.0))
                .unwrap_or_default(),
            self.outcome,
        )
    }
}

/// One market at one line of one event — the pairing scope for margin
/// removal across complementary outcomes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarketSlice {
    pub sport: String,
    pub event_id: String,
    pub market: String,
    pub line: Option<i64>,
}

// ---------------------------------------------------------------------------
// Fair price
// ---------------------------------------------------------------------------

/// Margin-free consensus price for one outcome group.
///
/// Absent (never zero) when fewer than the configured minimum number of
/// sharp quotes back the group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FairPrice {
    pub group: GroupKey,
    /// Consensus probability, always in (0, 1).
    pub fair_probability: f64,
    /// 1 / fair_probability.
    pub fair_price: f64,
    /// Number of sharp quotes that backed the consensus.
    pub sharp_quote_count: usize,
    /// Bookmaker keys whose quotes survived outlier rejection.
    pub contributing_bookmakers: Vec<String>,
}

impl fmt::Display for FairPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} fair={:.2} (p={:.1}%, {} sharps)",
            self.group,
            self.fair_price,
            self.fair_probability * 100.0,
            self.sharp_quote_count,
        )
    }
}

// ---------------------------------------------------------------------------
// Opportunity
// ---------------------------------------------------------------------------

/// A scored +EV quote, ready for the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub event_id: String,
    pub sport: String,
    pub commence_time: DateTime<Utc>,
    pub market: String,
    pub point: Option<f64>,
    pub outcome_label: String,
    pub bookmaker: String,
    /// The bookmaker's offered decimal price.
    pub price: f64,
    /// The consensus fair decimal price.
    pub fair_price: f64,
    /// Percentage edge over fair: (fair_probability × price − 1) × 100.
    pub ev_percent: f64,
    /// 1 / price.
    pub implied_prob: f64,
    /// How many sharp books backed the fair price (auditability).
    pub sharp_quote_count: usize,
    /// Recommended stake under clamped Kelly.
    pub kelly_stake: f64,
    /// When this record was last refreshed, for retention.
    pub updated_at: DateTime<Utc>,
}

impl Opportunity {
    /// Upsert key: later cycles with the same key fully supersede
    /// earlier records.
    pub fn key(&self) -> OpportunityKey {
        OpportunityKey {
            event_id: self.event_id.clone(),
            market: self.market.clone(),
            line: line_from_point(self.point),
            outcome_label: self.outcome_label.clone(),
            bookmaker: self.bookmaker.clone(),
        }
    }
}

impl fmt::Display for Opportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{} @ {:.2} ({}) | fair={:.2} ev=+{:.2}% stake=${:.2}",
            self.market,
            self.outcome_label,
            self.point.map(|p| format!(" {p}")).unwrap_or_default(),
            self.price,
            self.bookmaker,
            self.fair_price,
            self.ev_percent,
            self.kelly_stake,
        )
    }
}

/// Identity under which opportunities are upserted idempotently.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OpportunityKey {
    pub event_id: String,
    pub market: String,
    pub line: Option<i64>,
    pub outcome_label: String,
    pub bookmaker: String,
}

// ---------------------------------------------------------------------------
// Cycle diagnostics
// ---------------------------------------------------------------------------

/// Structured diagnostics for one batch cycle.
///
/// No error in the core is user-facing directly; everything surfaces
/// here as counts for the operator layer to report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleReport {
    pub sports_requested: usize,
    /// Sports whose extraction failed, with the failure message.
    pub sports_failed: Vec<(String, String)>,
    pub events_fetched: usize,
    /// Raw offers seen before normalization.
    pub offers_seen: usize,
    /// Offers dropped for missing/corrupt prices.
    pub offers_dropped: usize,
    /// Quotes from bookmakers absent from the registry (kept, tier 1).
    pub unknown_bookmakers: usize,
    pub groups_total: usize,
    /// Groups with fewer than the minimum sharp quotes.
    pub groups_without_consensus: usize,
    /// Sharp quotes excluded by outlier rejection.
    pub outliers_rejected: usize,
    pub opportunities_found: usize,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sports={}/{} events={} offers={} dropped={} groups={} no-consensus={} outliers={} opps={}",
            self.sports_requested - self.sports_failed.len(),
            self.sports_requested,
            self.events_fetched,
            self.offers_seen,
            self.offers_dropped,
            self.groups_total,
            self.groups_without_consensus,
            self.outliers_rejected,
            self.opportunities_found,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for FAIRLINE.
///
/// Config and sink failures surface as `anyhow` errors with context at
/// the call site; only feed failures need classification (the router
/// records them per sport without aborting the cycle).
#[derive(Debug, thiserror::Error)]
pub enum FairlineError {
    #[error("Feed error ({sport}): {message}")]
    Feed { sport: String, message: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
