//! Persistence Adapters - Tracker State Storage
//!
//! Implements the `Storage` port. Only the in-memory store exists today;
//! state lives for the lifetime of the process.

pub mod memory;

pub use memory::{Clock, MemStorage};
