//! # ResearchTwin Common Library
//!
//! Shared infrastructure for the ResearchTwin core:
//! - Error type and `Result` alias
//! - Bootstrap configuration loading (TOML, env override, platform default)
//! - Time-bounded response cache (in-memory and file-backed)
//! - Minimum-interval rate limiter for upstream services

pub mod cache;
pub mod config;
pub mod error;
pub mod rate_limiter;

pub use cache::{cache_key, Cache, FileCache, MemoryCache};
pub use config::TomlConfig;
pub use error::{Error, Result};
pub use rate_limiter::RateLimiter;
