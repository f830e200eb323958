//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Upper bound CoinGecko accepts for `per_page`.
const MAX_PER_PAGE: u32 = 250;

/// Retry ceiling; backoff at the last attempt is already minutes long.
const MAX_RETRIES: u32 = 10;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    name = %config.app.name,
    per_page = config.market_data.per_page,
    poll_secs = config.market_data.poll_interval_seconds,
    alerts = config.alerts.enabled,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig =
    toml::from_str(content).with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;

  Ok(config)
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
  anyhow::ensure!(!config.app.name.is_empty(), "app.name must not be empty");

  // Server validation
  config
    .server
    .bind_address
    .parse::<SocketAddr>()
    .with_context(|| {
      format!("Invalid server.bind_address: {}", config.server.bind_address)
    })?;
  anyhow::ensure!(
    config.server.push_buffer > 0,
    "server.push_buffer must be positive"
  );

  // Market data validation
  let md = &config.market_data;
  anyhow::ensure!(
    md.base_url.starts_with("http://") || md.base_url.starts_with("https://"),
    "market_data.base_url must be an http(s) URL, got {:?}",
    md.base_url
  );
  anyhow::ensure!(
    !md.vs_currency.is_empty(),
    "market_data.vs_currency must not be empty"
  );
  anyhow::ensure!(
    (1..=MAX_PER_PAGE).contains(&md.per_page),
    "market_data.per_page must be in [1, {}], got {}",
    MAX_PER_PAGE,
    md.per_page
  );
  anyhow::ensure!(
    md.poll_interval_seconds > 0,
    "market_data.poll_interval_seconds must be positive"
  );
  anyhow::ensure!(
    md.timeout_seconds > 0,
    "market_data.timeout_seconds must be positive"
  );
  anyhow::ensure!(
    md.max_retries <= MAX_RETRIES,
    "market_data.max_retries must be at most {}, got {}",
    MAX_RETRIES,
    md.max_retries
  );
  anyhow::ensure!(
    md.requests_per_minute > 0,
    "market_data.requests_per_minute must be positive"
  );

  // Alerts validation
  anyhow::ensure!(
    config.alerts.evaluation_interval_seconds > 0,
    "alerts.evaluation_interval_seconds must be positive"
  );

  // Metrics validation
  if config.metrics.enabled {
    config
      .metrics
      .bind_address
      .parse::<SocketAddr>()
      .with_context(|| {
        format!("Invalid metrics.bind_address: {}", config.metrics.bind_address)
      })?;
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = r#"
    [app]
    name = "crypto-pulse"

    [market_data]
    base_url = "https://api.coingecko.com/api/v3"

    [metrics]
    enabled = true
  "#;

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_defaults_fill_optional_sections() {
    let config = parse_config(SAMPLE).unwrap();
    assert_eq!(config.app.log_level, "info");
    assert_eq!(config.server.bind_address, "0.0.0.0:5000");
    assert_eq!(config.server.push_buffer, 1024);
    assert_eq!(config.market_data.vs_currency, "usd");
    assert_eq!(config.market_data.per_page, 100);
    assert_eq!(config.market_data.poll_interval_seconds, 60);
    assert!(config.alerts.enabled);
    assert_eq!(config.alerts.evaluation_interval_seconds, 30);
    assert_eq!(config.metrics.health_port, 8080);
  }

  #[test]
  fn test_rejects_per_page_over_provider_cap() {
    let text = SAMPLE.replace(
      "base_url = \"https://api.coingecko.com/api/v3\"",
      "base_url = \"https://api.coingecko.com/api/v3\"\nper_page = 500",
    );
    let err = parse_config(&text).unwrap_err();
    assert!(err.to_string().contains("per_page"));
  }

  #[test]
  fn test_rejects_excessive_retries() {
    let text = SAMPLE.replace(
      "base_url = \"https://api.coingecko.com/api/v3\"",
      "base_url = \"https://api.coingecko.com/api/v3\"\nmax_retries = 40",
    );
    let err = parse_config(&text).unwrap_err();
    assert!(err.to_string().contains("max_retries"));
  }

  #[test]
  fn test_rejects_non_http_base_url() {
    let text = SAMPLE.replace("https://api.coingecko.com/api/v3", "ftp://example.com");
    assert!(parse_config(&text).is_err());
  }

  #[test]
  fn test_missing_market_data_section_fails() {
    let text = "[app]\nname = \"x\"\n[metrics]\nenabled = false\n";
    assert!(parse_config(text).is_err());
  }
}
