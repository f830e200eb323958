//! Price alert conditions.
//!
//! Decides whether an alert's condition holds for a cryptocurrency's
//! current market snapshot. Used by the alert evaluation job; kept free
//! of I/O so it can be tested in isolation.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::models::{Cryptocurrency, PriceAlert};

/// Kind of condition a price alert watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Current price strictly above the target.
    PriceAbove,
    /// Current price strictly below the target.
    PriceBelow,
    /// Absolute 24h percentage change strictly above the target.
    PercentageChange,
}

impl AlertType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PriceAbove => "price_above",
            Self::PriceBelow => "price_below",
            Self::PercentageChange => "percentage_change",
        }
    }

    /// The market figure this condition compares against its target.
    ///
    /// `None` when the provider has not reported that figure yet.
    pub fn observed(self, crypto: &Cryptocurrency) -> Option<Decimal> {
        match self {
            Self::PriceAbove | Self::PriceBelow => crypto.market.current_price,
            Self::PercentageChange => crypto.market.price_change_percentage_24h.map(|p| p.abs()),
        }
    }

    /// Whether the condition holds for `crypto` at `target`.
    ///
    /// Missing market data never satisfies a condition.
    pub fn is_met(self, target: Decimal, crypto: &Cryptocurrency) -> bool {
        let Some(observed) = self.observed(crypto) else {
            return false;
        };
        match self {
            Self::PriceAbove | Self::PercentageChange => observed > target,
            Self::PriceBelow => observed < target,
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PriceAlert {
    /// Whether this alert should fire for the given market snapshot.
    ///
    /// Only pending alerts (active, not yet triggered) can fire.
    pub fn should_trigger(&self, crypto: &Cryptocurrency) -> bool {
        self.is_pending() && self.alert_type.is_met(self.target_value, crypto)
    }
}
