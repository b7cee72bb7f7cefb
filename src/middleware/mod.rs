//! Policy stages threaded in front of the forwarder.
//!
//! Each stage is an `axum::middleware::from_fn_with_state` function that
//! either answers the request itself or calls `next`. The router layers
//! them as CORS (outermost), then basic-auth, then the forwarder.

pub mod basic_auth;
pub mod cors;

pub use basic_auth::basic_auth_stage;
pub use cors::cors_stage;
