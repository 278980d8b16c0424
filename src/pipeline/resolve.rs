//! Prop identity resolution.
//!
//! Assigns each quote its canonical grouping key. Player-prop markets
//! encode the player and direction inside the outcome label ("LeBron
//! James Over 25.5 Points"), and every bookmaker formats that label
//! slightly differently — names are normalized (case-folded,
//! punctuation-trimmed, whitespace-collapsed) before keying so one
//! prop never fragments into several groups.
//!
//! Parsing failure degrades gracefully to standard grouping with the
//! label kept verbatim; no quote is ever dropped here.

use tracing::debug;

use crate::types::{line_from_point, GroupKey, OutcomeKey, PropSide, Quote};

/// Outcome of parsing a prop label.
struct ParsedProp {
    player: String,
    side: PropSide,
    /// Numeric line trailing the direction token, if any.
    line: Option<f64>,
}

/// Resolves quotes to grouping keys, detecting player-prop structure
/// for markets matching the configured key prefixes.
pub struct PropResolver {
    market_prefixes: Vec<String>,
}

impl PropResolver {
    pub fn new(market_prefixes: Vec<String>) -> Self {
        Self { market_prefixes }
    }

    /// Whether a market key denotes a player-prop market.
    pub fn is_prop_market(&self, market: &str) -> bool {
        self.market_prefixes.iter().any(|p| market.starts_with(p.as_str()))
    }

    /// Assign the quote its grouping key. When the label carries a line
    /// and the quote's `point` is missing, the parsed line backfills it
    /// so the key and the record agree.
    pub fn resolve(&self, mut quote: Quote) -> (Quote, GroupKey) {
        let outcome = if self.is_prop_market(&quote.market) {
            match parse_prop_label(&quote.outcome_label) {
                Some(parsed) => {
                    if quote.point.is_none() {
                        quote.point = parsed.line;
                    }
                    OutcomeKey::PlayerProp {
                        player: parsed.player,
                        side: parsed.side,
                    }
                }
                None => {
                    debug!(
                        market = %quote.market,
                        label = %quote.outcome_label,
                        "Prop label unparseable, falling back to standard grouping"
                    );
                    OutcomeKey::Standard {
                        label: quote.outcome_label.clone(),
                    }
                }
            }
        } else {
            OutcomeKey::Standard {
                label: quote.outcome_label.clone(),
            }
        };

        let key = GroupKey {
            sport: quote.sport.clone(),
            event_id: quote.event_id.clone(),
            market: quote.market.clone(),
            line: line_from_point(quote.point),
            outcome,
        };

        (quote, key)
    }
}

/// Parse "PLAYER NAME Over|Under [LINE] [STAT]" from an outcome label.
///
/// The last Over/Under token (case-insensitive) is the direction; the
/// tokens before it are the player name; an immediately following
/// numeric token is the line. Returns `None` when no direction token
/// exists or no name precedes it.
fn parse_prop_label(label: &str) -> Option<ParsedProp> {
    let tokens: Vec<&str> = label.split_whitespace().collect();

    let dir_idx = tokens.iter().rposition(|t| {
        let t = t.trim_matches(|c: char| !c.is_alphanumeric());
        t.eq_ignore_ascii_case("over") || t.eq_ignore_ascii_case("under")
    })?;
    if dir_idx == 0 {
        return None;
    }

    let side = if tokens[dir_idx]
        .trim_matches(|c: char| !c.is_alphanumeric())
        .eq_ignore_ascii_case("over")
    {
        PropSide::Over
    } else {
        PropSide::Under
    };

    let player = normalize_name(&tokens[..dir_idx].join(" "));
    if player.is_empty() {
        return None;
    }

    let line = tokens.get(dir_idx + 1).and_then(|t| t.parse::<f64>().ok());

    Some(ParsedProp { player, side, line })
}

/// Case-fold, trim punctuation off each token, and collapse whitespace,
/// so "LeBron  James" and "Lebron James." key identically.
fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
