//! In-memory Storage - Process-lifetime Tracker State
//!
//! Implements the `Storage` port over plain collections guarded by a
//! single `tokio::sync::RwLock`. State starts empty and lives as long as
//! the process; nothing is persisted and nothing expires.
//!
//! One lock covers all five tables so watchlist and alert joins always
//! read a consistent snapshot of the cryptocurrency table.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::models::{
    CryptoId, Cryptocurrency, MarketSummary, NewCryptocurrency, NewPriceAlert, NewPricePoint, NewUser,
    NewWatchlistEntry, PriceAlert, PriceAlertPatch, PriceAlertWithCrypto, PricePoint, User,
    WatchlistEntry, WatchlistItem,
};
use crate::ports::storage::{DEFAULT_CRYPTO_LIMIT, Storage};

/// Source of "now" for timestamps and recency windows.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The five entity tables.
///
/// Vectors keep insertion order, which decides tie-breaks and
/// "first match" semantics.
#[derive(Default)]
struct Tables {
    users: Vec<User>,
    cryptocurrencies: HashMap<CryptoId, Cryptocurrency>,
    /// Insertion order of cryptocurrency ids. Upserts keep the original slot.
    crypto_order: Vec<CryptoId>,
    watchlists: Vec<WatchlistEntry>,
    price_alerts: Vec<PriceAlert>,
    price_history: Vec<PricePoint>,
    /// Last whole-market snapshot. Not counted in `table_sizes`.
    market_summary: Option<MarketSummary>,
}

impl Tables {
    fn cryptos_in_order(&self) -> impl Iterator<Item = &Cryptocurrency> {
        self.crypto_order
            .iter()
            .filter_map(|id| self.cryptocurrencies.get(id))
    }

    fn join_alerts<'a>(
        &self,
        alerts: impl Iterator<Item = &'a PriceAlert>,
    ) -> Vec<PriceAlertWithCrypto> {
        alerts
            .filter_map(|alert| {
                self.cryptocurrencies
                    .get(&alert.crypto_id)
                    .map(|crypto| PriceAlertWithCrypto {
                        alert: alert.clone(),
                        crypto: crypto.clone(),
                    })
            })
            .collect()
    }
}

/// In-memory implementation of the `Storage` port.
///
/// Construct once at startup and share behind an `Arc`.
pub struct MemStorage {
    tables: RwLock<Tables>,
    clock: Clock,
}

impl MemStorage {
    /// Create an empty store using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(Utc::now))
    }

    /// Create an empty store with a custom clock.
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            clock,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Row counts per table, in the order users, cryptocurrencies,
    /// watchlists, alerts, history.
    pub async fn table_sizes(&self) -> [usize; 5] {
        let tables = self.tables.read().await;
        [
            tables.users.len(),
            tables.cryptocurrencies.len(),
            tables.watchlists.len(),
            tables.price_alerts.len(),
            tables.price_history.len(),
        ]
    }
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[async_trait]
impl Storage for MemStorage {
    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let user = User {
            id: new_id(),
            username: user.username,
            password: user.password,
        };
        self.tables.write().await.users.push(user.clone());
        debug!(user_id = %user.id, "User created");
        Ok(user)
    }

    async fn get_cryptocurrencies(&self, limit: Option<usize>) -> Result<Vec<Cryptocurrency>> {
        let tables = self.tables.read().await;
        let mut cryptos: Vec<Cryptocurrency> = tables.cryptos_in_order().cloned().collect();
        // sort_by_key is stable: equal ranks keep insertion order.
        cryptos.sort_by_key(Cryptocurrency::rank);
        cryptos.truncate(limit.unwrap_or(DEFAULT_CRYPTO_LIMIT));
        Ok(cryptos)
    }

    async fn get_cryptocurrency(&self, id: &str) -> Result<Option<Cryptocurrency>> {
        let tables = self.tables.read().await;
        Ok(tables.cryptocurrencies.get(id).cloned())
    }

    #[instrument(skip(self, crypto), fields(crypto_id = %crypto.id))]
    async fn upsert_cryptocurrency(&self, crypto: NewCryptocurrency) -> Result<Cryptocurrency> {
        let now = self.now();
        let mut tables = self.tables.write().await;

        if let Some(existing) = tables.cryptocurrencies.get_mut(&crypto.id) {
            existing.merge(crypto, now);
            return Ok(existing.clone());
        }

        let record = Cryptocurrency::from_new(crypto, now);
        tables.crypto_order.push(record.id.clone());
        tables
            .cryptocurrencies
            .insert(record.id.clone(), record.clone());
        debug!("Cryptocurrency inserted");
        Ok(record)
    }

    async fn search_cryptocurrencies(&self, query: &str) -> Result<Vec<Cryptocurrency>> {
        let needle = query.to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables
            .cryptos_in_order()
            .filter(|c| c.matches(&needle))
            .cloned()
            .collect())
    }

    async fn get_watchlist(&self, user_id: &str) -> Result<Vec<WatchlistItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .watchlists
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .filter_map(|entry| {
                tables
                    .cryptocurrencies
                    .get(&entry.crypto_id)
                    .map(|crypto| WatchlistItem {
                        entry: entry.clone(),
                        crypto: crypto.clone(),
                    })
            })
            .collect())
    }

    #[instrument(skip(self, entry), fields(user_id = %entry.user_id, crypto_id = %entry.crypto_id))]
    async fn add_to_watchlist(&self, entry: NewWatchlistEntry) -> Result<WatchlistEntry> {
        let entry = WatchlistEntry {
            id: new_id(),
            user_id: entry.user_id,
            crypto_id: entry.crypto_id,
            created_at: self.now(),
        };
        self.tables.write().await.watchlists.push(entry.clone());
        Ok(entry)
    }

    #[instrument(skip(self))]
    async fn remove_from_watchlist(&self, user_id: &str, crypto_id: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        let position = tables
            .watchlists
            .iter()
            .position(|e| e.user_id == user_id && e.crypto_id == crypto_id);
        if let Some(index) = position {
            tables.watchlists.remove(index);
        } else {
            debug!("No watchlist entry to remove");
        }
        Ok(())
    }

    async fn get_price_alerts(&self, user_id: &str) -> Result<Vec<PriceAlertWithCrypto>> {
        let tables = self.tables.read().await;
        Ok(tables.join_alerts(tables.price_alerts.iter().filter(|a| a.user_id == user_id)))
    }

    #[instrument(skip(self, alert), fields(user_id = %alert.user_id, crypto_id = %alert.crypto_id))]
    async fn create_price_alert(&self, alert: NewPriceAlert) -> Result<PriceAlert> {
        let alert = PriceAlert {
            id: new_id(),
            user_id: alert.user_id,
            crypto_id: alert.crypto_id,
            alert_type: alert.alert_type,
            target_value: alert.target_value,
            is_active: true,
            is_triggered: false,
            triggered_at: None,
            created_at: self.now(),
        };
        self.tables.write().await.price_alerts.push(alert.clone());
        debug!(alert_id = %alert.id, alert_type = %alert.alert_type, "Price alert created");
        Ok(alert)
    }

    #[instrument(skip(self, patch))]
    async fn update_price_alert(
        &self,
        id: &str,
        patch: PriceAlertPatch,
    ) -> Result<Option<PriceAlert>> {
        let mut tables = self.tables.write().await;
        let Some(alert) = tables.price_alerts.iter_mut().find(|a| a.id == id) else {
            debug!("Price alert not found");
            return Ok(None);
        };
        alert.apply(patch);
        Ok(Some(alert.clone()))
    }

    #[instrument(skip(self))]
    async fn delete_price_alert(&self, id: &str) -> Result<()> {
        self.tables.write().await.price_alerts.retain(|a| a.id != id);
        Ok(())
    }

    async fn get_active_price_alerts(&self) -> Result<Vec<PriceAlertWithCrypto>> {
        let tables = self.tables.read().await;
        Ok(tables.join_alerts(tables.price_alerts.iter().filter(|a| a.is_pending())))
    }

    #[instrument(skip(self))]
    async fn trigger_price_alert(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<PriceAlertWithCrypto>> {
        let mut tables = self.tables.write().await;
        let Tables {
            price_alerts,
            cryptocurrencies,
            ..
        } = &mut *tables;

        let Some(alert) = price_alerts.iter_mut().find(|a| a.id == id) else {
            debug!("Price alert gone before trigger");
            return Ok(None);
        };
        let Some(crypto) = cryptocurrencies.get(&alert.crypto_id) else {
            return Ok(None);
        };
        // Re-checked under the write lock: a concurrent PATCH may have
        // paused or retargeted the alert since it was read.
        if !alert.should_trigger(crypto) {
            debug!("Price alert no longer satisfied, not triggered");
            return Ok(None);
        }

        alert.apply(PriceAlertPatch::triggered(at));
        Ok(Some(PriceAlertWithCrypto {
            alert: alert.clone(),
            crypto: crypto.clone(),
        }))
    }

    async fn add_price_history(&self, point: NewPricePoint) -> Result<PricePoint> {
        let point = PricePoint {
            id: new_id(),
            crypto_id: point.crypto_id,
            price: point.price,
            timestamp: self.now(),
        };
        self.tables.write().await.price_history.push(point.clone());
        Ok(point)
    }

    async fn get_price_history(&self, crypto_id: &str, hours: u32) -> Result<Vec<PricePoint>> {
        let now = self.now();
        let cutoff = now
            .checked_sub_signed(Duration::hours(i64::from(hours)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let tables = self.tables.read().await;
        let mut points: Vec<PricePoint> = tables
            .price_history
            .iter()
            .filter(|p| p.crypto_id == crypto_id && p.timestamp >= cutoff)
            .cloned()
            .collect();
        points.sort_by_key(|p| p.timestamp);
        Ok(points)
    }

    async fn get_market_summary(&self) -> Result<Option<MarketSummary>> {
        Ok(self.tables.read().await.market_summary.clone())
    }

    async fn set_market_summary(&self, summary: MarketSummary) -> Result<()> {
        self.tables.write().await.market_summary = Some(summary);
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}
