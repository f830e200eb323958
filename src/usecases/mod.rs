//! Use Cases Layer - Application Background Jobs
//!
//! Orchestrates the domain with port interfaces to keep the store
//! fresh and alerts evaluated. Each use case is a self-contained
//! polling job with a `*_once` entry point for tests.
//!
//! Use cases:
//! - `MarketSync`: Market data → store → `price_update` push
//! - `AlertEvaluator`: Active alerts → condition check → `alert_triggered` push

pub mod alert_evaluator;
pub mod market_sync;

pub use alert_evaluator::AlertEvaluator;
pub use market_sync::{MarketSync, SyncReport};
