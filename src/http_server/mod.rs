//! # HTTP Server Module
//!
//! Serves the overlap join over HTTP.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/_overlap` - Overlap join (`POST` form body or `GET` query string)

pub mod config;
pub mod health_routes;
pub mod overlap_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use server::HttpServer;
