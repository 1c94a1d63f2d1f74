//! Rampart Core - traffic shaping and abuse mitigation
//!
//! This crate holds everything the gateway needs to decide whether a request
//! may proceed, independent of any HTTP framework:
//!
//! # Modules
//!
//! - [`config`] - Strongly-typed configuration with TOML and environment variable support
//! - [`domain`] - Fingerprints, bot scoring, admission decisions and security events
//! - [`infrastructure`] - Shared store, rate limiter, blocklist, kill switch,
//!   circuit breaker, traffic monitor, stale cache and event log
//! - [`application`] - Admission pipeline and stale-response fallback
//! - [`logging`] - Structured logging with tracing
//!
//! # Architecture
//!
//! ```text
//! rampart-core/
//! ├── domain/           # Pure decision logic, no I/O
//! ├── application/      # Admission and fallback services
//! ├── infrastructure/   # Store-backed components
//! │   ├── store/        # Redis and in-memory backends
//! │   └── rate_limiter/ # Policies and window algorithms
//! └── config/           # Configuration management
//! ```
//!
//! # Configuration
//!
//! ```rust,ignore
//! use rampart_core::Config;
//!
//! let config = Config::load()?;
//! ```
//!
//! Environment variables use the `RAMPART__` prefix with double underscore separators:
//!
//! ```bash
//! RAMPART__STORE__URL=redis://cache:6379
//! RAMPART__RATE_LIMIT__API__LIMIT=200
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;

pub use config::Config;
pub use logging::init_tracing;
