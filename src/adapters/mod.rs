//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! infrastructure (HTTP clients, axum servers, in-memory tables,
//! broadcast channels). Each sub-module groups adapters by concern.
//!
//! Adapter categories:
//! - `coingecko`: CoinGecko REST market data client
//! - `http`: REST API and `/ws` push endpoint
//! - `metrics`: Prometheus metrics export and health checks
//! - `persistence`: In-memory tracker store
//! - `push`: Broadcast hub for live events

pub mod coingecko;
pub mod http;
pub mod metrics;
pub mod persistence;
pub mod push;
