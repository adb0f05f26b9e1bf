//! MedLens lookup proxy.
//!
//! Exposes the drug label lookup to browser front-ends over HTTP.

pub mod health_api;
pub mod lookup_api;
pub mod server;

pub use server::{build_router, start_server, GatewayState};
