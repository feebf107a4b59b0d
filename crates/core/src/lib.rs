//! Core types and shared functionality for reflux.
//!
//! This crate provides:
//! - In-memory response cache with TTL and LRU eviction
//! - Unified error types
//! - Configuration structures

pub mod artifact;
pub mod cache;
pub mod config;
pub mod error;

pub use artifact::{Artifact, TRANSFER_ENCODING_HEADER};
pub use cache::{CacheStats, ResponseCache};
pub use config::{AppConfig, ConfigError, RedirectPolicy};
pub use error::Error;
