//! Core tracker domain types.
//!
//! Defines the five stored entities (users, cryptocurrencies, watchlist
//! entries, price alerts, price history points), the insert payloads that
//! create them, and the joined views returned by the storage port.
//!
//! Market figures are `Decimal` and serialize as strings, so no precision
//! is lost between the market data provider and API clients.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::alert::AlertType;

// ────────────────────────────────────────────
// Identifier aliases
// ────────────────────────────────────────────

/// Market slug used by the data provider (e.g. "bitcoin").
pub type CryptoId = String;

/// Opaque user identifier (UUID string generated by clients or the store).
pub type UserId = String;

/// Store-generated record identifier (UUID string).
pub type RecordId = String;

// ────────────────────────────────────────────
// Users
// ────────────────────────────────────────────

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Stored as given. Never serialized back out.
    #[serde(skip_serializing, default)]
    pub password: String,
}

/// Payload for `Storage::create_user`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
}

// ────────────────────────────────────────────
// Cryptocurrencies
// ────────────────────────────────────────────

/// Optional market figures shared by stored records and upsert payloads.
///
/// Every field is optional: the provider omits values for young or
/// illiquid coins, and an upsert only overrides the fields it carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketData {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub current_price: Option<Decimal>,
    #[serde(default)]
    pub market_cap: Option<Decimal>,
    /// Rank as text; see [`Cryptocurrency::rank`] for how it is ordered.
    #[serde(default)]
    pub market_cap_rank: Option<String>,
    #[serde(default)]
    pub fully_diluted_valuation: Option<Decimal>,
    #[serde(default)]
    pub total_volume: Option<Decimal>,
    #[serde(default)]
    pub high_24h: Option<Decimal>,
    #[serde(default)]
    pub low_24h: Option<Decimal>,
    #[serde(default)]
    pub price_change_24h: Option<Decimal>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<Decimal>,
    #[serde(default)]
    pub price_change_percentage_7d: Option<Decimal>,
    #[serde(default)]
    pub market_cap_change_24h: Option<Decimal>,
    #[serde(default)]
    pub market_cap_change_percentage_24h: Option<Decimal>,
    #[serde(default)]
    pub circulating_supply: Option<Decimal>,
    #[serde(default)]
    pub total_supply: Option<Decimal>,
    #[serde(default)]
    pub max_supply: Option<Decimal>,
    #[serde(default)]
    pub ath: Option<Decimal>,
    #[serde(default)]
    pub ath_change_percentage: Option<Decimal>,
    #[serde(default)]
    pub ath_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub atl: Option<Decimal>,
    #[serde(default)]
    pub atl_change_percentage: Option<Decimal>,
    #[serde(default)]
    pub atl_date: Option<DateTime<Utc>>,
}

macro_rules! overlay_fields {
    ($target:expr, $newer:expr, $($field:ident),+ $(,)?) => {
        $(
            if $newer.$field.is_some() {
                $target.$field = $newer.$field;
            }
        )+
    };
}

impl MarketData {
    /// Overlay `newer` on top of `self`: present values win, absent
    /// values leave the existing figure untouched.
    pub fn overlay(&mut self, newer: Self) {
        overlay_fields!(
            self,
            newer,
            image,
            current_price,
            market_cap,
            market_cap_rank,
            fully_diluted_valuation,
            total_volume,
            high_24h,
            low_24h,
            price_change_24h,
            price_change_percentage_24h,
            price_change_percentage_7d,
            market_cap_change_24h,
            market_cap_change_percentage_24h,
            circulating_supply,
            total_supply,
            max_supply,
            ath,
            ath_change_percentage,
            ath_date,
            atl,
            atl_change_percentage,
            atl_date,
        );
    }
}

/// A tracked cryptocurrency with its latest market snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cryptocurrency {
    pub id: CryptoId,
    pub symbol: String,
    pub name: String,
    #[serde(flatten)]
    pub market: MarketData,
    /// Refreshed on every upsert.
    pub last_updated: DateTime<Utc>,
}

impl Cryptocurrency {
    /// Build a fresh record from an upsert payload.
    pub fn from_new(new: NewCryptocurrency, now: DateTime<Utc>) -> Self {
        Self {
            id: new.id,
            symbol: new.symbol,
            name: new.name,
            market: new.market,
            last_updated: now,
        }
    }

    /// Merge an upsert payload into this record.
    ///
    /// Identity fields always take the new value; market figures follow
    /// [`MarketData::overlay`]. `last_updated` is always refreshed.
    pub fn merge(&mut self, new: NewCryptocurrency, now: DateTime<Utc>) {
        self.symbol = new.symbol;
        self.name = new.name;
        self.market.overlay(new.market);
        self.last_updated = now;
    }

    /// Integer market-cap rank used for ordering.
    ///
    /// Takes the leading integer of the rank text; a missing or
    /// unparseable rank counts as 0 and therefore sorts first. Ranks too
    /// large for `i64` saturate and sort last.
    pub fn rank(&self) -> i64 {
        parse_leading_int(self.market.market_cap_rank.as_deref())
    }

    /// Case-insensitive substring match on name or symbol.
    ///
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.symbol.to_lowercase().contains(needle)
    }
}

fn parse_leading_int(text: Option<&str>) -> i64 {
    let Some(text) = text else {
        return 0;
    };
    let text = text.trim_start();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let digits = &digits[..end];
    if digits.is_empty() {
        return 0;
    }
    // Only overflow can fail here; saturate so huge ranks sort last.
    match digits.parse::<i64>() {
        Ok(n) if negative => -n,
        Ok(n) => n,
        Err(_) if negative => i64::MIN,
        Err(_) => i64::MAX,
    }
}

/// Upsert payload for `Storage::upsert_cryptocurrency`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCryptocurrency {
    pub id: CryptoId,
    pub symbol: String,
    pub name: String,
    #[serde(flatten)]
    pub market: MarketData,
}

impl NewCryptocurrency {
    /// Minimal payload with identity fields only.
    pub fn new(id: impl Into<String>, symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            name: name.into(),
            market: MarketData::default(),
        }
    }
}

// ────────────────────────────────────────────
// Watchlist
// ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntry {
    pub id: RecordId,
    pub user_id: UserId,
    pub crypto_id: CryptoId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWatchlistEntry {
    pub user_id: UserId,
    pub crypto_id: CryptoId,
}

/// A watchlist row joined with the cryptocurrency it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchlistItem {
    #[serde(flatten)]
    pub entry: WatchlistEntry,
    pub crypto: Cryptocurrency,
}

// ────────────────────────────────────────────
// Price alerts
// ────────────────────────────────────────────

/// A user-configured price alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceAlert {
    pub id: RecordId,
    pub user_id: UserId,
    pub crypto_id: CryptoId,
    pub alert_type: AlertType,
    pub target_value: Decimal,
    pub is_active: bool,
    pub is_triggered: bool,
    pub triggered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PriceAlert {
    /// Eligible for evaluation against live prices.
    pub fn is_pending(&self) -> bool {
        self.is_active && !self.is_triggered
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, patch: PriceAlertPatch) {
        if let Some(alert_type) = patch.alert_type {
            self.alert_type = alert_type;
        }
        if let Some(target_value) = patch.target_value {
            self.target_value = target_value;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        if let Some(is_triggered) = patch.is_triggered {
            self.is_triggered = is_triggered;
        }
        if let Some(triggered_at) = patch.triggered_at {
            self.triggered_at = triggered_at;
        }
    }
}

/// Payload for `Storage::create_price_alert`.
///
/// Lifecycle flags are not part of the payload: new alerts always start
/// active, untriggered, with no trigger time.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPriceAlert {
    pub user_id: UserId,
    pub crypto_id: CryptoId,
    pub alert_type: AlertType,
    pub target_value: Decimal,
}

/// Partial update for `Storage::update_price_alert`. Absent fields are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceAlertPatch {
    #[serde(default)]
    pub alert_type: Option<AlertType>,
    #[serde(default)]
    pub target_value: Option<Decimal>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_triggered: Option<bool>,
    /// Outer `None` keeps the value, `Some(None)` clears it.
    #[serde(default, deserialize_with = "present")]
    pub triggered_at: Option<Option<DateTime<Utc>>>,
}

impl PriceAlertPatch {
    /// Patch marking an alert as fired at `at`.
    pub fn triggered(at: DateTime<Utc>) -> Self {
        Self {
            is_triggered: Some(true),
            triggered_at: Some(Some(at)),
            ..Self::default()
        }
    }

    /// Whether the patch carries no changes.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Distinguish an explicit `null` from an absent key.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A price alert joined with the cryptocurrency it watches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceAlertWithCrypto {
    #[serde(flatten)]
    pub alert: PriceAlert,
    pub crypto: Cryptocurrency,
}

// ────────────────────────────────────────────
// Price history
// ────────────────────────────────────────────

/// One recorded price observation. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub id: RecordId,
    pub crypto_id: CryptoId,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPricePoint {
    pub crypto_id: CryptoId,
    pub price: Decimal,
}

// ────────────────────────────────────────────
// Market summary
// ────────────────────────────────────────────

/// Whole-market figures shown above the coin table.
///
/// Money figures are in the configured quote currency. Dominance values
/// are percentages of total market cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSummary {
    pub active_cryptocurrencies: Option<u32>,
    pub markets: Option<u32>,
    pub total_market_cap: Option<Decimal>,
    pub total_volume: Option<Decimal>,
    pub market_cap_change_percentage_24h: Option<Decimal>,
    pub btc_dominance: Option<Decimal>,
    pub eth_dominance: Option<Decimal>,
    /// When the provider computed the figures.
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn crypto_with_rank(rank: Option<&str>) -> Cryptocurrency {
        let mut new = NewCryptocurrency::new("bitcoin", "btc", "Bitcoin");
        new.market.market_cap_rank = rank.map(str::to_string);
        Cryptocurrency::from_new(new, Utc::now())
    }

    #[test]
    fn test_rank_parses_leading_integer() {
        assert_eq!(crypto_with_rank(Some("7")).rank(), 7);
        assert_eq!(crypto_with_rank(Some(" 12th")).rank(), 12);
        assert_eq!(crypto_with_rank(Some("3.9")).rank(), 3);
    }

    #[test]
    fn test_rank_overflow_saturates() {
        assert_eq!(crypto_with_rank(Some("99999999999999999999")).rank(), i64::MAX);
        assert_eq!(crypto_with_rank(Some("-99999999999999999999")).rank(), i64::MIN);
    }

    #[test]
    fn test_rank_missing_or_garbage_is_zero() {
        assert_eq!(crypto_with_rank(None).rank(), 0);
        assert_eq!(crypto_with_rank(Some("n/a")).rank(), 0);
        assert_eq!(crypto_with_rank(Some("")).rank(), 0);
    }

    #[test]
    fn test_overlay_keeps_absent_fields() {
        let mut market = MarketData {
            current_price: Some(dec!(100)),
            market_cap: Some(dec!(5000)),
            ..MarketData::default()
        };
        market.overlay(MarketData {
            current_price: Some(dec!(110)),
            ..MarketData::default()
        });
        assert_eq!(market.current_price, Some(dec!(110)));
        assert_eq!(market.market_cap, Some(dec!(5000)));
    }

    #[test]
    fn test_matches_name_or_symbol() {
        let crypto = crypto_with_rank(Some("1"));
        assert!(crypto.matches("bit"));
        assert!(crypto.matches("btc"));
        assert!(!crypto.matches("eth"));
    }

    #[test]
    fn test_alert_patch_distinguishes_null() {
        let cleared: PriceAlertPatch =
            serde_json::from_str(r#"{"isTriggered": false, "triggeredAt": null}"#).unwrap();
        assert_eq!(cleared.triggered_at, Some(None));

        let untouched: PriceAlertPatch = serde_json::from_str(r#"{"isActive": false}"#).unwrap();
        assert_eq!(untouched.triggered_at, None);
        assert_eq!(untouched.is_active, Some(false));
    }

    #[test]
    fn test_new_alert_ignores_lifecycle_overrides() {
        let new: NewPriceAlert = serde_json::from_str(
            r#"{"userId":"u1","cryptoId":"bitcoin","alertType":"price_above",
                "targetValue":"50000","isActive":false,"isTriggered":true}"#,
        )
        .unwrap();
        assert_eq!(new.alert_type, AlertType::PriceAbove);
        assert_eq!(new.target_value, dec!(50000));
    }

    #[test]
    fn test_password_not_serialized() {
        let user = User {
            id: "u1".to_string(),
            username: "satoshi".to_string(),
            password: "hunter2".to_string(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("hunter2"));
    }
}
