//! # dualpx
//!
//! A small dual-mode proxy: an HTTP forward proxy that also tunnels `CONNECT` requests, and an
//! independent SOCKS5 endpoint running next to it.
//!
//! ```no_run
//! use dualpx::config::ProxyConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ProxyConfig::default();
//!     tokio::try_join!(dualpx::proxy::start_http_proxy(&config), dualpx::socks::start_socks_server(&config))?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod proxy;
pub mod socks;
pub mod utils;
