//! Bookmaker registry.
//!
//! Static table mapping each bookmaker feed key to a reliability tier
//! (1–4 stars). The tier doubles as the weight a bookmaker's quote
//! carries in the fair-price consensus; tier ≥ 3 marks the bookmaker
//! "sharp". Loaded once at process start, optionally overridden per key
//! from config. Unknown bookmakers resolve to the lowest tier — they
//! are still useful as EV targets and are never dropped.

use std::collections::HashMap;

use crate::types::Bookmaker;

/// Minimum tier for a bookmaker to contribute to the fair price.
pub const SHARP_TIER: u8 = 3;

/// Tier assigned to bookmakers absent from the table.
pub const DEFAULT_TIER: u8 = 1;

struct TierEntry {
    key: &'static str,
    name: &'static str,
    tier: u8,
}

/// Built-in tier assignments for The Odds API bookmaker keys.
/// Tier 4: market-making books whose lines move first.
/// Tier 3: low-margin books that track the sharps closely.
/// Tier 1–2: recreational books — EV targets, not consensus formers.
const DEFAULT_TIERS: &[TierEntry] = &[
    TierEntry { key: "pinnacle", name: "Pinnacle", tier: 4 },
    TierEntry { key: "betfair_ex_uk", name: "Betfair Exchange (UK)", tier: 4 },
    TierEntry { key: "betfair_ex_eu", name: "Betfair Exchange (EU)", tier: 4 },
    TierEntry { key: "circasports", name: "Circa Sports", tier: 4 },
    TierEntry { key: "lowvig", name: "LowVig", tier: 3 },
    TierEntry { key: "betonlineag", name: "BetOnline", tier: 3 },
    TierEntry { key: "smarkets", name: "Smarkets", tier: 3 },
    TierEntry { key: "matchbook", name: "Matchbook", tier: 3 },
    TierEntry { key: "draftkings", name: "DraftKings", tier: 2 },
    TierEntry { key: "fanduel", name: "FanDuel", tier: 2 },
    TierEntry { key: "betmgm", name: "BetMGM", tier: 2 },
    TierEntry { key: "caesars", name: "Caesars", tier: 2 },
    TierEntry { key: "pointsbetus", name: "PointsBet", tier: 2 },
    TierEntry { key: "betrivers", name: "BetRivers", tier: 2 },
    TierEntry { key: "unibet_eu", name: "Unibet", tier: 2 },
    TierEntry { key: "williamhill", name: "William Hill", tier: 2 },
    TierEntry { key: "bovada", name: "Bovada", tier: 1 },
    TierEntry { key: "mybookieag", name: "MyBookie", tier: 1 },
    TierEntry { key: "betus", name: "BetUS", tier: 1 },
];

/// Registry of bookmaker tiers, resolved once at startup.
#[derive(Debug, Clone)]
pub struct BookmakerRegistry {
    tiers: HashMap<String, Bookmaker>,
}

impl BookmakerRegistry {
    /// Build the registry from the built-in table.
    pub fn new() -> Self {
        Self::with_overrides(&HashMap::new())
    }

    /// Build the registry with per-key tier overrides from config.
    /// An override for an unknown key adds that bookmaker to the table.
    pub fn with_overrides(overrides: &HashMap<String, u8>) -> Self {
        let mut tiers: HashMap<String, Bookmaker> = DEFAULT_TIERS
            .iter()
            .map(|e| {
                (
                    e.key.to_string(),
                    Bookmaker {
                        id: e.key.to_string(),
                        display_name: e.name.to_string(),
                        tier: e.tier,
                    },
                )
            })
            .collect();

        for (key, &tier) in overrides {
            let tier = tier.clamp(1, 4);
            tiers
                .entry(key.clone())
                .and_modify(|b| b.tier = tier)
                .or_insert_with(|| Bookmaker {
                    id: key.clone(),
                    display_name: key.clone(),
                    tier,
                });
        }

        Self { tiers }
    }

    /// Look up a bookmaker. Unknown keys resolve to tier 1 with the key
    /// as display name.
    pub fn get(&self, key: &str) -> Bookmaker {
        self.tiers.get(key).cloned().unwrap_or_else(|| Bookmaker {
            id: key.to_string(),
            display_name: key.to_string(),
            tier: DEFAULT_TIER,
        })
    }

    /// Whether the key is present in the table (known bookmaker).
    pub fn is_known(&self, key: &str) -> bool {
        self.tiers.contains_key(key)
    }

    /// The tier of a bookmaker (1 for unknown keys).
    pub fn tier(&self, key: &str) -> u8 {
        self.get(key).tier
    }

    /// Consensus weight: the tier value as a float.
    pub fn weight(&self, key: &str) -> f64 {
        f64::from(self.tier(key))
    }

    /// Whether this bookmaker contributes to the fair-price consensus.
    pub fn is_sharp(&self, key: &str) -> bool {
        self.tier(key) >= SHARP_TIER
    }
}

impl Default for BookmakerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_sharp() {
        let reg = BookmakerRegistry::new();
        assert_eq!(reg.tier("pinnacle"), 4);
        assert!(reg.is_sharp("pinnacle"));
        assert!(reg.is_sharp("lowvig"));
        assert!(!reg.is_sharp("draftkings"));
    }

    #[test]
    fn test_unknown_defaults_to_lowest_tier() {
        let reg = BookmakerRegistry::new();
        assert!(!reg.is_known("new_book_2026"));
        let b = reg.get("new_book_2026");
        assert_eq!(b.tier, DEFAULT_TIER);
        assert_eq!(b.display_name, "new_book_2026");
        assert!(!reg.is_sharp("new_book_2026"));
    }

    #[test]
    fn test_weight_is_tier() {
        let reg = BookmakerRegistry::new();
        assert_eq!(reg.weight("pinnacle"), 4.0);
        assert_eq!(reg.weight("unknown"), 1.0);
    }

    #[test]
    fn test_override_existing() {
        let mut overrides = HashMap::new();
        overrides.insert("draftkings".to_string(), 3u8);
        let reg = BookmakerRegistry::with_overrides(&overrides);
        assert!(reg.is_sharp("draftkings"));
        // Display name from the built-in table survives the override.
        assert_eq!(reg.get("draftkings").display_name, "DraftKings");
    }

    #[test]
    fn test_override_adds_new_bookmaker() {
        let mut overrides = HashMap::new();
        overrides.insert("localbook".to_string(), 4u8);
        let reg = BookmakerRegistry::with_overrides(&overrides);
        assert!(reg.is_known("localbook"));
        assert!(reg.is_sharp("localbook"));
    }

    #[test]
    fn test_override_clamped_to_valid_range() {
        let mut overrides = HashMap::new();
        overrides.insert("pinnacle".to_string(), 9u8);
        let reg = BookmakerRegistry::with_overrides(&overrides);
        assert_eq!(reg.tier("pinnacle"), 4);
    }
}
