//! Kelly criterion stake sizing.
//!
//! Computes the recommended stake for a +EV quote from the fair
//! probability and the offered decimal price, clamped to a configured
//! fraction of bankroll to bound variance versus unconstrained Kelly.

use tracing::debug;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Stake sizing configuration.
#[derive(Debug, Clone)]
pub struct KellyConfig {
    /// Bankroll in account currency.
    pub bankroll: f64,
    /// Maximum stake as a fraction of bankroll.
    pub max_stake_fraction: f64,
}

impl Default for KellyConfig {
    fn default() -> Self {
        Self {
            bankroll: 1000.0,
            max_stake_fraction: 0.05,
        }
    }
}

// ---------------------------------------------------------------------------
// Kelly calculator
// ---------------------------------------------------------------------------

pub struct KellyCalculator {
    config: KellyConfig,
}

impl KellyCalculator {
    pub fn new(config: KellyConfig) -> Self {
        Self { config }
    }

    /// Access the Kelly configuration.
    pub fn config(&self) -> &KellyConfig {
        &self.config
    }

    /// Recommended stake for a quote at `price` whose true win
    /// probability is `fair_probability`.
    ///
    /// Kelly fraction: f* = (p·price − 1) / (price − 1), clamped to
    /// [0, max_stake_fraction]. Returns the stake in currency units.
    /// A degenerate price (≈ 1.0, excluded upstream) yields 0.0.
    pub fn stake(&self, fair_probability: f64, price: f64) -> f64 {
        let b = price - 1.0;
        if b.abs() < f64::EPSILON {
            return 0.0;
        }

        let kelly = (fair_probability * price - 1.0) / b;
        let clamped = kelly.clamp(0.0, self.config.max_stake_fraction);
        let stake = clamped * self.config.bankroll;

        debug!(
            fair_probability,
            price,
            raw_kelly = format!("{:.2}%", kelly * 100.0),
            stake = format!("${stake:.2}"),
            "Stake sized"
        );

        stake
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_edge_positive_stake() {
        let calc = KellyCalculator::new(KellyConfig::default());
        // Fair 50% at 2.10: kelly = (0.5*2.1 - 1)/1.1 ≈ 4.55%, under the 5% cap.
        let stake = calc.stake(0.50, 2.10);
        let expected = (0.50 * 2.10 - 1.0) / 1.10 * 1000.0;
        assert!((stake - expected).abs() < 1e-9);
    }

    #[test]
    fn test_stake_clamped_to_max_fraction() {
        let calc = KellyCalculator::new(KellyConfig {
            bankroll: 1000.0,
            max_stake_fraction: 0.05,
        });
        // Huge edge: raw Kelly far above 5%, must clamp to $50.
        let stake = calc.stake(0.80, 2.0);
        assert!((stake - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_edge_zero_stake() {
        let calc = KellyCalculator::new(KellyConfig::default());
        // Fair 50% at exactly 2.0: zero edge.
        assert_eq!(calc.stake(0.50, 2.0), 0.0);
    }

    #[test]
    fn test_negative_edge_zero_stake() {
        let calc = KellyCalculator::new(KellyConfig::default());
        assert_eq!(calc.stake(0.40, 2.0), 0.0);
    }

    #[test]
    fn test_degenerate_price_zero_stake() {
        let calc = KellyCalculator::new(KellyConfig::default());
        assert_eq!(calc.stake(0.99, 1.0), 0.0);
    }

    #[test]
    fn test_stake_scales_with_bankroll() {
        let small = KellyCalculator::new(KellyConfig {
            bankroll: 100.0,
            ..Default::default()
        });
        let large = KellyCalculator::new(KellyConfig {
            bankroll: 10_000.0,
            ..Default::default()
        });
        let s = small.stake(0.55, 2.0);
        let l = large.stake(0.55, 2.0);
        assert!(s > 0.0);
        assert!((l / s - 100.0).abs() < 1e-6);
    }
}
