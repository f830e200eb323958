//! Push events broadcast to connected dashboard clients.
//!
//! Serialized as `{"type": "...", "data": {...}}` so clients can switch
//! on `type` and refetch the affected resources.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::alert::AlertType;
use super::models::{CryptoId, PriceAlert, RecordId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PushEvent {
    /// Fresh market data landed in the store.
    PriceUpdate {
        /// Number of cryptocurrencies refreshed.
        updated: usize,
        timestamp: DateTime<Utc>,
    },
    /// A price alert's condition was met.
    #[serde(rename_all = "camelCase")]
    AlertTriggered {
        alert_id: RecordId,
        user_id: UserId,
        crypto_id: CryptoId,
        alert_type: AlertType,
        target_value: Decimal,
        /// Current price of the cryptocurrency when the alert fired.
        price: Option<Decimal>,
        triggered_at: DateTime<Utc>,
    },
}

impl PushEvent {
    pub fn price_update(updated: usize, timestamp: DateTime<Utc>) -> Self {
        Self::PriceUpdate { updated, timestamp }
    }

    pub fn alert_triggered(
        alert: &PriceAlert,
        price: Option<Decimal>,
        triggered_at: DateTime<Utc>,
    ) -> Self {
        Self::AlertTriggered {
            alert_id: alert.id.clone(),
            user_id: alert.user_id.clone(),
            crypto_id: alert.crypto_id.clone(),
            alert_type: alert.alert_type,
            target_value: alert.target_value,
            price,
            triggered_at,
        }
    }

    /// Wire name of the event, as seen in the `type` field.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PriceUpdate { .. } => "price_update",
            Self::AlertTriggered { .. } => "alert_triggered",
        }
    }
}
