//! Quote normalization.
//!
//! Flattens raw per-sport odds payloads (event → bookmaker → market →
//! outcome) into a long-format `Quote` list keyed by an enumerated
//! bookmaker identifier. A pure transform: no external calls, no
//! mutation of the input.
//!
//! Data-quality contract: an offer with a missing, non-finite, or
//! ≤ 1.0 price is corrupt data (a price ≤ 1.0 implies a guaranteed
//! loss), so it is dropped and counted — never an error. Unknown
//! bookmakers are kept at the lowest tier; their quotes are still
//! useful as EV targets.

use tracing::debug;

use crate::feed::OddsEvent;
use crate::registry::BookmakerRegistry;
use crate::types::Quote;

/// Counters from one normalization pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeStats {
    /// Raw offers seen across all events.
    pub offers_seen: usize,
    /// Offers dropped for missing/corrupt prices.
    pub offers_dropped: usize,
    /// Kept quotes whose bookmaker is absent from the registry.
    pub unknown_bookmakers: usize,
}

/// Flatten raw events into quotes, dropping corrupt prices.
pub fn normalize(events: &[OddsEvent], registry: &BookmakerRegistry) -> (Vec<Quote>, NormalizeStats) {
    let mut quotes = Vec::new();
    let mut stats = NormalizeStats::default();

    for event in events {
        for bookmaker in &event.bookmakers {
            let known = registry.is_known(&bookmaker.key);
            for market in &bookmaker.markets {
                for offer in &market.outcomes {
                    stats.offers_seen += 1;

                    let price = match offer.price {
                        Some(p) if p.is_finite() && p > 1.0 => p,
                        _ => {
                            stats.offers_dropped += 1;
                            debug!(
                                event = %event.id,
                                bookmaker = %bookmaker.key,
                                market = %market.key,
                                outcome = %offer.name,
                                price = ?offer.price,
                                "Dropped offer with corrupt price"
                            );
                            continue;
                        }
                    };

                    // A non-finite point cannot key a line group.
                    if offer.point.is_some_and(|p| !p.is_finite()) {
                        stats.offers_dropped += 1;
                        debug!(
                            event = %event.id,
                            bookmaker = %bookmaker.key,
                            market = %market.key,
                            outcome = %offer.name,
                            point = ?offer.point,
                            "Dropped offer with corrupt point"
                        );
                        continue;
                    }

                    if !known {
                        stats.unknown_bookmakers += 1;
                    }

                    quotes.push(Quote {
                        event_id: event.id.clone(),
                        sport: event.sport_key.clone(),
                        commence_time: event.commence_time,
                        market: market.key.clone(),
                        point: offer.point,
                        outcome_label: offer.name.trim().to_string(),
                        bookmaker: bookmaker.key.clone(),
                        price,
                    });
                }
            }
        }
    }

    debug!(
        quotes = quotes.len(),
        dropped = stats.offers_dropped,
        "Normalization complete"
    );

    (quotes, stats)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
