//! Rampart Gateway - HTTP layer
//!
//! Puts the admission pipeline from `rampart-core` in front of an axum
//! application and exposes the operator surface.
//!
//! # Layout
//!
//! ```text
//! presentation/
//! ├── controllers/  # health, metrics, admin and security event handlers
//! ├── middleware/   # admission, stale cache, bearer auth, request logging
//! ├── models.rs     # request/response DTOs
//! └── routes.rs     # router assembly
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use rampart_gateway::{GatewayState, create_router};
//!
//! let state = GatewayState::new(config, store);
//! let app = create_router(state, Router::new().route("/api/posts", get(list_posts)));
//! ```

pub mod presentation;

pub use presentation::{GatewayState, create_router};
