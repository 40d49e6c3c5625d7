//! # itemproxy
//!
//! Caching HTTP proxy in front of an inventory API. Clients POST a company
//! and a barcode to `/get-item`; the proxy answers from a TTL cache when it
//! can and otherwise asks the upstream service, retrying transient failures.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use itemproxy::app;
//! use itemproxy::cache::ItemCache;
//! use itemproxy::config::Config;
//! use itemproxy::lookup::LookupService;
//! use itemproxy::server::Server;
//! use itemproxy::upstream::{Inventory, UpstreamClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let cache = Arc::new(ItemCache::new(config.cache_ttl));
//!     let inventory: Arc<dyn Inventory> = Arc::new(UpstreamClient::new(config.upstream.clone())?);
//!     let service = Arc::new(LookupService::new(cache, inventory));
//!
//!     let server = Server::bind(config.listen_addr()).await?;
//!     app::serve(server, app::pipeline(service), std::future::pending()).await?;
//!     Ok(())
//! }
//! ```

pub mod http;
pub mod server;

pub mod context;
pub mod middleware;
pub mod router;
pub mod security;

pub mod app;
pub mod cache;
pub mod config;
pub mod item;
pub mod lookup;
pub mod upstream;

pub use config::{Config, ConfigError};
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use item::{ItemRecord, LookupKey};
pub use lookup::{LookupRequest, LookupResponse, LookupService};
pub use server::{Server, ServerError};
pub use upstream::{Inventory, UpstreamClient, UpstreamError};
