//! Rate Limiting Infrastructure
//!
//! This module provides the sliding-window rate limiter:
//! - Three named policies (general API, auth endpoints, flagged bots)
//! - Rolling and weighted window algorithms built on atomic store increments
//! - Configurable fail-open/fail-closed behaviour when the store is unavailable

pub mod service;
pub mod types;
pub mod window;

pub use service::RateLimiterService;
pub use types::{RateLimitPolicy, RateLimitResult, UNENFORCED_LIMIT};
pub use window::{SlidingWindow, WindowHit};
