//! Application services composed from the infrastructure components

pub mod admission;
pub mod errors;
pub mod fallback;

pub use admission::{AdmissionDecision, AdmissionService};
pub use errors::{ApplicationError, StoreError};
pub use fallback::{Served, StaleFallback};
