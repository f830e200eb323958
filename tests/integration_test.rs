//! Integration Tests - End-to-end Job Testing
//!
//! Tests the interaction between usecases, ports, and mock adapters.
//! Uses mockall for trait mocking and tokio::test for async tests.

use std::sync::Arc;
use std::time::Duration;

use mockall::mock;
use mockall::predicate::*;
use rust_decimal_macros::dec;
use tokio::sync::broadcast;

use crypto_pulse::adapters::metrics::{HealthState, MetricsRegistry};
use crypto_pulse::adapters::persistence::MemStorage;
use crypto_pulse::config::{AlertsConfig, MarketDataConfig};
use crypto_pulse::domain::{
    AlertType, Cryptocurrency, MarketSummary, NewCryptocurrency, NewPriceAlert, NewPricePoint, NewUser,
    NewWatchlistEntry, PriceAlert, PriceAlertPatch, PriceAlertWithCrypto, PricePoint, PushEvent,
    User, WatchlistEntry, WatchlistItem,
};
use crypto_pulse::ports::storage::Storage;
use crypto_pulse::usecases::{AlertEvaluator, MarketSync};

// ---- Mock Definitions ----

mock! {
    pub Source {}

    #[async_trait::async_trait]
    impl crypto_pulse::ports::market_data::MarketDataSource for Source {
        async fn fetch_markets(&self, per_page: u32) -> anyhow::Result<Vec<NewCryptocurrency>>;
        async fn fetch_global(&self) -> anyhow::Result<MarketSummary>;
        async fn is_healthy(&self) -> bool;
    }
}

mock! {
    pub Publisher {}

    impl crypto_pulse::ports::publisher::EventPublisher for Publisher {
        fn publish(&self, event: PushEvent) -> usize;
        fn subscriber_count(&self) -> usize;
    }
}

mock! {
    pub Store {}

    #[async_trait::async_trait]
    impl Storage for Store {
        async fn get_user(&self, id: &str) -> anyhow::Result<Option<User>>;
        async fn get_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
        async fn create_user(&self, user: NewUser) -> anyhow::Result<User>;
        async fn get_cryptocurrencies(&self, limit: Option<usize>) -> anyhow::Result<Vec<Cryptocurrency>>;
        async fn get_cryptocurrency(&self, id: &str) -> anyhow::Result<Option<Cryptocurrency>>;
        async fn upsert_cryptocurrency(&self, crypto: NewCryptocurrency) -> anyhow::Result<Cryptocurrency>;
        async fn search_cryptocurrencies(&self, query: &str) -> anyhow::Result<Vec<Cryptocurrency>>;
        async fn get_watchlist(&self, user_id: &str) -> anyhow::Result<Vec<WatchlistItem>>;
        async fn add_to_watchlist(&self, entry: NewWatchlistEntry) -> anyhow::Result<WatchlistEntry>;
        async fn remove_from_watchlist(&self, user_id: &str, crypto_id: &str) -> anyhow::Result<()>;
        async fn get_price_alerts(&self, user_id: &str) -> anyhow::Result<Vec<PriceAlertWithCrypto>>;
        async fn create_price_alert(&self, alert: NewPriceAlert) -> anyhow::Result<PriceAlert>;
        async fn update_price_alert(&self, id: &str, patch: PriceAlertPatch) -> anyhow::Result<Option<PriceAlert>>;
        async fn delete_price_alert(&self, id: &str) -> anyhow::Result<()>;
        async fn get_active_price_alerts(&self) -> anyhow::Result<Vec<PriceAlertWithCrypto>>;
        async fn trigger_price_alert(&self, id: &str, at: chrono::DateTime<chrono::Utc>) -> anyhow::Result<Option<PriceAlertWithCrypto>>;
        async fn add_price_history(&self, point: NewPricePoint) -> anyhow::Result<PricePoint>;
        async fn get_price_history(&self, crypto_id: &str, hours: u32) -> anyhow::Result<Vec<PricePoint>>;
        async fn get_market_summary(&self) -> anyhow::Result<Option<MarketSummary>>;
        async fn set_market_summary(&self, summary: MarketSummary) -> anyhow::Result<()>;
        async fn is_healthy(&self) -> bool;
    }
}

// ---- Helpers ----

fn market_config() -> MarketDataConfig {
    MarketDataConfig {
        base_url: "http://localhost".to_string(),
        vs_currency: "usd".to_string(),
        per_page: 2,
        poll_interval_seconds: 1,
        timeout_seconds: 1,
        max_retries: 0,
        requests_per_minute: 60,
    }
}

fn alerts_config() -> AlertsConfig {
    AlertsConfig {
        enabled: true,
        evaluation_interval_seconds: 1,
    }
}

fn metrics() -> Arc<MetricsRegistry> {
    Arc::new(MetricsRegistry::new().unwrap())
}

fn coin(id: &str, symbol: &str, price: Option<rust_decimal::Decimal>, rank: &str) -> NewCryptocurrency {
    let mut new = NewCryptocurrency::new(id, symbol, id);
    new.market.current_price = price;
    new.market.market_cap_rank = Some(rank.to_string());
    new
}

fn alert(user: &str, crypto: &str, alert_type: AlertType, target: rust_decimal::Decimal) -> NewPriceAlert {
    NewPriceAlert {
        user_id: user.to_string(),
        crypto_id: crypto.to_string(),
        alert_type,
        target_value: target,
    }
}

fn summary(btc_dominance: rust_decimal::Decimal) -> MarketSummary {
    MarketSummary {
        active_cryptocurrencies: Some(14_000),
        markets: Some(1_100),
        total_market_cap: Some(dec!(2450000000000)),
        total_volume: Some(dec!(88000000000)),
        market_cap_change_percentage_24h: Some(dec!(-1.25)),
        btc_dominance: Some(btc_dominance),
        eth_dominance: Some(dec!(16.2)),
        updated_at: chrono::Utc::now(),
    }
}

// ---- Market Sync ----

#[tokio::test]
async fn test_sync_stores_markets_and_records_history() {
    let mut source = MockSource::new();
    source
        .expect_fetch_markets()
        .with(eq(2))
        .times(1)
        .returning(|_| {
            Ok(vec![
                coin("bitcoin", "btc", Some(dec!(50000)), "1"),
                coin("newcoin", "new", None, "2"),
            ])
        });
    source
        .expect_fetch_global()
        .times(1)
        .returning(|| Ok(summary(dec!(53.4))));

    let mut publisher = MockPublisher::new();
    publisher
        .expect_publish()
        .withf(|event| matches!(event, PushEvent::PriceUpdate { updated: 2, .. }))
        .times(1)
        .returning(|_| 3);

    let store = Arc::new(MemStorage::new());
    let sync = MarketSync::new(
        Arc::new(source),
        Arc::clone(&store),
        Arc::new(publisher),
        metrics(),
        Arc::new(HealthState::new()),
        &market_config(),
    );

    let report = sync.sync_once().await.unwrap();
    assert_eq!(report.upserted, 2);
    assert_eq!(report.recorded, 1);
    assert_eq!(report.notified, 3);
    assert!(report.summary_refreshed);

    let cached = store.get_market_summary().await.unwrap().unwrap();
    assert_eq!(cached.btc_dominance, Some(dec!(53.4)));

    let listed = store.get_cryptocurrencies(None).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, "bitcoin");

    let history = store.get_price_history("bitcoin", 1).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].price, dec!(50000));
    assert!(store.get_price_history("newcoin", 1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sync_keeps_prior_price_when_provider_omits_it() {
    let mut source = MockSource::new();
    let mut seq = mockall::Sequence::new();
    source
        .expect_fetch_markets()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(vec![coin("bitcoin", "btc", Some(dec!(50000)), "1")]));
    source
        .expect_fetch_markets()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(vec![coin("bitcoin", "btc", None, "1")]));
    source.expect_fetch_global().times(2).returning(|| Ok(summary(dec!(50))));

    let mut publisher = MockPublisher::new();
    publisher.expect_publish().times(2).returning(|_| 0);

    let store = Arc::new(MemStorage::new());
    let sync = MarketSync::new(
        Arc::new(source),
        Arc::clone(&store),
        Arc::new(publisher),
        metrics(),
        Arc::new(HealthState::new()),
        &market_config(),
    );

    sync.sync_once().await.unwrap();
    let second = sync.sync_once().await.unwrap();
    assert_eq!(second.recorded, 0);

    let btc = store.get_cryptocurrency("bitcoin").await.unwrap().unwrap();
    assert_eq!(btc.market.current_price, Some(dec!(50000)));
    // No stale point is appended for the price-less snapshot.
    assert_eq!(store.get_price_history("bitcoin", 1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_global_fetch_keeps_previous_summary() {
    let mut source = MockSource::new();
    source.expect_fetch_markets().returning(|_| Ok(Vec::new()));
    let mut seq = mockall::Sequence::new();
    source
        .expect_fetch_global()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(summary(dec!(52))));
    source
        .expect_fetch_global()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Err(anyhow::anyhow!("HTTP 429")));

    let mut publisher = MockPublisher::new();
    publisher.expect_publish().times(2).returning(|_| 0);

    let store = Arc::new(MemStorage::new());
    let sync = MarketSync::new(
        Arc::new(source),
        Arc::clone(&store),
        Arc::new(publisher),
        metrics(),
        Arc::new(HealthState::new()),
        &market_config(),
    );

    assert!(sync.sync_once().await.unwrap().summary_refreshed);
    // A summary failure does not fail the sync.
    assert!(!sync.sync_once().await.unwrap().summary_refreshed);

    let cached = store.get_market_summary().await.unwrap().unwrap();
    assert_eq!(cached.btc_dominance, Some(dec!(52)));
}

#[tokio::test]
async fn test_failed_fetch_leaves_store_untouched() {
    let mut source = MockSource::new();
    source
        .expect_fetch_markets()
        .returning(|_| Err(anyhow::anyhow!("HTTP 503")));
    source.expect_fetch_global().never();

    let mut publisher = MockPublisher::new();
    publisher.expect_publish().never();

    let store = Arc::new(MemStorage::new());
    let sync = MarketSync::new(
        Arc::new(source),
        Arc::clone(&store),
        Arc::new(publisher),
        metrics(),
        Arc::new(HealthState::new()),
        &market_config(),
    );

    assert!(sync.sync_once().await.is_err());
    assert_eq!(store.table_sizes().await, [0; 5]);
}

#[tokio::test]
async fn test_store_failure_aborts_sync() {
    let mut source = MockSource::new();
    source
        .expect_fetch_markets()
        .returning(|_| Ok(vec![coin("bitcoin", "btc", Some(dec!(1)), "1")]));
    source.expect_fetch_global().never();

    let mut store = MockStore::new();
    store
        .expect_upsert_cryptocurrency()
        .returning(|_| Err(anyhow::anyhow!("store offline")));
    store.expect_add_price_history().never();

    let mut publisher = MockPublisher::new();
    publisher.expect_publish().never();

    let sync = MarketSync::new(
        Arc::new(source),
        Arc::new(store),
        Arc::new(publisher),
        metrics(),
        Arc::new(HealthState::new()),
        &market_config(),
    );

    let err = sync.sync_once().await.unwrap_err();
    assert!(err.to_string().contains("store offline"));
}

#[tokio::test]
async fn test_sync_loop_marks_health_and_stops_on_shutdown() {
    let mut source = MockSource::new();
    source.expect_is_healthy().times(1).returning(|| true);
    source.expect_fetch_markets().returning(|_| Ok(Vec::new()));
    source.expect_fetch_global().returning(|| Ok(summary(dec!(50))));
    let mut publisher = MockPublisher::new();
    publisher.expect_publish().returning(|_| 0);

    let health = Arc::new(HealthState::new());
    health.set_market_data(false);
    let metrics = metrics();
    let sync = MarketSync::new(
        Arc::new(source),
        Arc::new(MemStorage::new()),
        Arc::new(publisher),
        Arc::clone(&metrics),
        Arc::clone(&health),
        &market_config(),
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(async move { sync.run(shutdown_rx).await });

    // The first tick fires immediately.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(health.is_ready());
    assert_eq!(metrics.market_polls.with_label_values(&["ok"]).get(), 1);

    shutdown_tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("sync loop did not stop");
    assert!(result.unwrap().is_ok());
}

// ---- Alert Evaluator ----

#[tokio::test]
async fn test_evaluator_triggers_only_satisfied_alerts() {
    let store = Arc::new(MemStorage::new());
    let mut btc = coin("bitcoin", "btc", Some(dec!(60000)), "1");
    btc.market.price_change_percentage_24h = Some(dec!(-8.2));
    store.upsert_cryptocurrency(btc).await.unwrap();

    let above = store
        .create_price_alert(alert("u1", "bitcoin", AlertType::PriceAbove, dec!(50000)))
        .await
        .unwrap();
    let below = store
        .create_price_alert(alert("u1", "bitcoin", AlertType::PriceBelow, dec!(30000)))
        .await
        .unwrap();
    let swing = store
        .create_price_alert(alert("u2", "bitcoin", AlertType::PercentageChange, dec!(5)))
        .await
        .unwrap();

    let mut publisher = MockPublisher::new();
    publisher
        .expect_publish()
        .withf(|event| matches!(event, PushEvent::AlertTriggered { price: Some(p), .. } if *p == dec!(60000)))
        .times(2)
        .returning(|_| 1);

    let metrics = metrics();
    let evaluator = AlertEvaluator::new(
        Arc::clone(&store),
        Arc::new(publisher),
        Arc::clone(&metrics),
        &alerts_config(),
    );

    assert_eq!(evaluator.evaluate_once().await.unwrap(), 2);
    assert_eq!(metrics.alerts_evaluated.get(), 3);
    assert_eq!(
        metrics.alerts_triggered.with_label_values(&["percentage_change"]).get(),
        1
    );

    let u1 = store.get_price_alerts("u1").await.unwrap();
    let fired = u1.iter().find(|a| a.alert.id == above.id).unwrap();
    assert!(fired.alert.is_triggered);
    assert!(fired.alert.triggered_at.is_some());
    let pending = u1.iter().find(|a| a.alert.id == below.id).unwrap();
    assert!(!pending.alert.is_triggered);

    let active = store.get_active_price_alerts().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].alert.id, below.id);
    assert_ne!(active[0].alert.id, swing.id);
}

#[tokio::test]
async fn test_triggered_alert_fires_once() {
    let store = Arc::new(MemStorage::new());
    store
        .upsert_cryptocurrency(coin("ethereum", "eth", Some(dec!(1500)), "2"))
        .await
        .unwrap();
    store
        .create_price_alert(alert("u1", "ethereum", AlertType::PriceBelow, dec!(2000)))
        .await
        .unwrap();

    let mut publisher = MockPublisher::new();
    publisher.expect_publish().times(1).returning(|_| 0);

    let evaluator = AlertEvaluator::new(
        Arc::clone(&store),
        Arc::new(publisher),
        metrics(),
        &alerts_config(),
    );

    assert_eq!(evaluator.evaluate_once().await.unwrap(), 1);
    assert_eq!(evaluator.evaluate_once().await.unwrap(), 0);
}

#[tokio::test]
async fn test_paused_alert_is_not_evaluated() {
    let store = Arc::new(MemStorage::new());
    store
        .upsert_cryptocurrency(coin("bitcoin", "btc", Some(dec!(60000)), "1"))
        .await
        .unwrap();
    let created = store
        .create_price_alert(alert("u1", "bitcoin", AlertType::PriceAbove, dec!(1)))
        .await
        .unwrap();
    store
        .update_price_alert(
            &created.id,
            PriceAlertPatch {
                is_active: Some(false),
                ..PriceAlertPatch::default()
            },
        )
        .await
        .unwrap();

    let mut publisher = MockPublisher::new();
    publisher.expect_publish().never();

    let evaluator = AlertEvaluator::new(store, Arc::new(publisher), metrics(), &alerts_config());
    assert_eq!(evaluator.evaluate_once().await.unwrap(), 0);
}

#[tokio::test]
async fn test_evaluator_propagates_store_errors() {
    let mut store = MockStore::new();
    store
        .expect_get_active_price_alerts()
        .returning(|| Err(anyhow::anyhow!("lock poisoned")));

    let mut publisher = MockPublisher::new();
    publisher.expect_publish().never();

    let evaluator = AlertEvaluator::new(
        Arc::new(store),
        Arc::new(publisher),
        metrics(),
        &alerts_config(),
    );

    assert!(evaluator.evaluate_once().await.is_err());
}

#[tokio::test]
async fn test_alert_changed_mid_pass_is_skipped() {
    let now = chrono::Utc::now();
    let crypto = Cryptocurrency::from_new(coin("bitcoin", "btc", Some(dec!(60000)), "1"), now);
    let pending = PriceAlert {
        id: "gone".to_string(),
        user_id: "u1".to_string(),
        crypto_id: "bitcoin".to_string(),
        alert_type: AlertType::PriceAbove,
        target_value: dec!(50000),
        is_active: true,
        is_triggered: false,
        triggered_at: None,
        created_at: now,
    };

    let mut store = MockStore::new();
    store.expect_get_active_price_alerts().returning(move || {
        Ok(vec![PriceAlertWithCrypto {
            alert: pending.clone(),
            crypto: crypto.clone(),
        }])
    });
    store
        .expect_trigger_price_alert()
        .withf(|id, _| id.to_string() == "gone")
        .times(1)
        .returning(|_, _| Ok(None));
    store.expect_update_price_alert().never();

    let mut publisher = MockPublisher::new();
    publisher.expect_publish().never();

    let evaluator = AlertEvaluator::new(
        Arc::new(store),
        Arc::new(publisher),
        metrics(),
        &alerts_config(),
    );
    assert_eq!(evaluator.evaluate_once().await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_alert_paused_after_read_is_not_pushed() {
    let store = Arc::new(MemStorage::new());
    store
        .upsert_cryptocurrency(coin("bitcoin", "btc", Some(dec!(60000)), "1"))
        .await
        .unwrap();
    let created = store
        .create_price_alert(alert("u1", "bitcoin", AlertType::PriceAbove, dec!(50000)))
        .await
        .unwrap();

    // Stale snapshot handed to the evaluator, then a client pauses the
    // alert before the evaluator writes.
    let stale = store.get_active_price_alerts().await.unwrap();
    store
        .update_price_alert(
            &created.id,
            PriceAlertPatch {
                is_active: Some(false),
                ..PriceAlertPatch::default()
            },
        )
        .await
        .unwrap();

    let mut racing = MockStore::new();
    racing
        .expect_get_active_price_alerts()
        .returning(move || Ok(stale.clone()));
    let backing = Arc::clone(&store);
    racing
        .expect_trigger_price_alert()
        .returning(move |id, at| {
            let backing = Arc::clone(&backing);
            let id = id.to_string();
            tokio::task::block_in_place(|| {
                tokio::runtime::Handle::current()
                    .block_on(async move { backing.trigger_price_alert(&id, at).await })
            })
        });

    let mut publisher = MockPublisher::new();
    publisher.expect_publish().never();

    let evaluator = AlertEvaluator::new(
        Arc::new(racing),
        Arc::new(publisher),
        metrics(),
        &alerts_config(),
    );
    assert_eq!(evaluator.evaluate_once().await.unwrap(), 0);

    let stored = store.get_price_alerts("u1").await.unwrap();
    assert!(!stored[0].alert.is_triggered);
    assert!(!stored[0].alert.is_active);
}
