//! Rampart - traffic shaping and abuse mitigation gateway
//!
//! Binary crate that wires the core services and the gateway router in front
//! of an upstream application.

mod app;
pub mod proxy;

pub use app::{AppHandle, create_app};
pub use rampart_core::{Config, init_tracing};

pub use rampart_core;
pub use rampart_gateway;
