//! # s3proxy gateway
//!
//! HTTP reverse proxy that serves objects out of S3 buckets.
//!
//! This crate provides:
//! - **Host routing**: one bucket per virtual host, or a single bucket for all
//! - **Site chains**: per-site stages for proxy headers, HTTPS redirects,
//!   Basic auth, gzip, CORS and website index documents
//! - **Object fetch**: store metadata mapped onto response headers, bodies
//!   streamed straight through
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   HTTP Clients                      │
//! └─────────────────────────┬───────────────────────────┘
//!                           │
//! ┌─────────────────────────▼───────────────────────────┐
//! │        Router (logging, tracing, timeout)           │
//! ├─────────────────────────────────────────────────────┤
//! │          HostRouter  ──►  SiteChain per host        │
//! ├─────────────────────────────────────────────────────┤
//! │  proxy-headers │ force-https │ basic-auth │ gzip    │
//! │  cors │ website-index                               │
//! ├─────────────────────────────────────────────────────┤
//! │               ObjectFetchHandler                    │
//! ├─────────────────────────────────────────────────────┤
//! │                  s3proxy-store                      │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod site;
pub mod stage;
pub mod state;

pub use config::{GatewayConfig, SiteConfig, SiteOptions, SiteSource};
pub use error::{ConfigError, ProxyError};
pub use routes::{HostRouter, ProxyHandler};
pub use server::{run_server, run_server_with_shutdown, serve};
pub use site::build_site_chain;
pub use stage::{Endpoint, Next, SiteChain, Stage};
pub use state::AppState;
