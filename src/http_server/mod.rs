//! # HTTP Server Module
//!
//! Serves the find action over HTTP and over a WebSocket transport.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/:model`, `/:model/find`, `/:model/:id`, `/:model/find/:id` - Find records
//! - `/socket` - WebSocket virtual requests
//! - `/observability/metrics` - Counters

pub mod blueprint_routes;
pub mod config;
pub mod observability_routes;
pub mod server;
pub mod socket_routes;

pub use blueprint_routes::BlueprintState;
pub use config::HttpServerConfig;
pub use server::HttpServer;
