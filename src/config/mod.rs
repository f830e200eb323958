//! Configuration Module - TOML-based Tracker Configuration
//!
//! Loads and validates configuration from `config.toml`. Provider
//! endpoints, polling cadence and listener addresses are externalized
//! here. The CoinGecko API key is read from `COINGECKO_API_KEY` at
//! startup and never stored in the file.

pub mod loader;

use serde::Deserialize;

/// Top-level tracker configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before any job or listener starts.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Service identity and logging.
  pub app: AppSection,
  /// HTTP API and push channel.
  #[serde(default)]
  pub server: ServerConfig,
  /// Market data provider and polling.
  pub market_data: MarketDataConfig,
  /// Price alert evaluation.
  #[serde(default)]
  pub alerts: AlertsConfig,
  /// Metrics and monitoring.
  pub metrics: MetricsConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
  /// Human-readable service name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

/// HTTP API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  /// API listener address (REST and `/ws`).
  #[serde(default = "default_server_addr")]
  pub bind_address: String,
  /// Push events buffered per subscriber before it starts lagging.
  #[serde(default = "default_push_buffer")]
  pub push_buffer: usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      bind_address: default_server_addr(),
      push_buffer: default_push_buffer(),
    }
  }
}

/// Market data provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketDataConfig {
  /// Provider REST base URL.
  pub base_url: String,
  /// Quote currency for prices and market caps.
  #[serde(default = "default_vs_currency")]
  pub vs_currency: String,
  /// Coins requested per poll (CoinGecko caps this at 250).
  #[serde(default = "default_per_page")]
  pub per_page: u32,
  /// Seconds between polls.
  #[serde(default = "default_poll_interval")]
  pub poll_interval_seconds: u64,
  /// Request timeout in seconds.
  #[serde(default = "default_timeout")]
  pub timeout_seconds: u64,
  /// Retries after the first failed attempt.
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  /// Client-side request budget (free tier allows ~30/min).
  #[serde(default = "default_requests_per_minute")]
  pub requests_per_minute: u32,
}

/// Price alert evaluation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertsConfig {
  /// Run the alert evaluation job.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Seconds between evaluation passes.
  #[serde(default = "default_evaluation_interval")]
  pub evaluation_interval_seconds: u64,
}

impl Default for AlertsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      evaluation_interval_seconds: default_evaluation_interval(),
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
  /// Health check endpoint port.
  #[serde(default = "default_health_port")]
  pub health_port: u16,
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_server_addr() -> String {
  "0.0.0.0:5000".to_string()
}

fn default_push_buffer() -> usize {
  1024
}

fn default_vs_currency() -> String {
  "usd".to_string()
}

fn default_per_page() -> u32 {
  100
}

fn default_poll_interval() -> u64 {
  60
}

fn default_timeout() -> u64 {
  10
}

fn default_max_retries() -> u32 {
  3
}

fn default_requests_per_minute() -> u32 {
  30
}

fn default_evaluation_interval() -> u64 {
  30
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_health_port() -> u16 {
  8080
}
