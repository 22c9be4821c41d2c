//! Fetch proxy HTTP surface.
//!
//! `proxy_router()` returns a composable `Router` with routes nested under
//! `/api/`; `server` runs it as a standalone process.

pub mod error;
pub mod proxy;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::proxy_router;
pub use server::{start_proxy_server, start_proxy_server_on, ProxyServer, ProxySession};
