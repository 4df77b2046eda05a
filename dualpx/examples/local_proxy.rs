//! Local HTTP Proxy Example
//!
//! Builds the request router by hand instead of going through `ProxyConfig`: an HTTP proxy on
//! 127.0.0.1:3128 whose CONNECT dials give up after ten seconds, without the SOCKS5 endpoint.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example local_proxy
//! curl -x http://127.0.0.1:3128 https://example.com/
//! ```

use anyhow::Result;
use dualpx::proxy::{ForwardHandler, RequestRouter, TunnelRelay, bind_http_proxy};
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::env_logger::builder().filter_level(log::LevelFilter::Debug).init();

    let router = Arc::new(RequestRouter::new(TunnelRelay::new(Some(Duration::from_secs(10))), ForwardHandler::new()));
    let (addr, server) = bind_http_proxy(SocketAddr::from(([127, 0, 0, 1], 3128)), router)?;
    info!("Local proxy listening on {}", addr);

    server.await?;
    Ok(())
}
