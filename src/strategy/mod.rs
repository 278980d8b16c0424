//! Strategy engine — fair pricing, EV scoring, and stake sizing.

pub mod ev;
pub mod fair;
pub mod kelly;

pub use ev::{EvConfig, EvScorer};
pub use fair::{FairConfig, FairPriceCalculator, FairStats};
pub use kelly::{KellyCalculator, KellyConfig};
