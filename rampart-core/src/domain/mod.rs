//! Domain Layer - request identity, bot scoring and admission vocabulary
//!
//! Everything here is pure: no I/O and no shared state.

pub mod admission;
pub mod bot;
pub mod events;
pub mod fingerprint;

pub use admission::{AdmissionRequest, DenyReason, RouteClass, is_mutating};
pub use bot::{BotScorer, BotVerdict, RequestProfile};
pub use events::{SecurityEvent, SecurityEventKind};
pub use fingerprint::{Fingerprint, UNKNOWN_CLIENT};
