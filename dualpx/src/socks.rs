use crate::config::ProxyConfig;
use anyhow::Result;
use fast_socks5::server::Socks5Server;
use log::{debug, error, info, warn};
use tokio_stream::StreamExt;

/// Start the SOCKS5 endpoint with the library's default (no authentication) configuration.
/// Returns immediately when SOCKS5 is disabled.
pub async fn start_socks_server(config: &ProxyConfig) -> Result<()> {
    if !config.is_socks_enabled() {
        info!("SOCKS5 server disabled via config");
        return Ok(());
    }
    let addr = config.socks_addr()?;
    let server = <Socks5Server>::bind(addr).await?;
    info!("SOCKS5 Server running on {}", addr);
    serve_socks(server).await;
    Ok(())
}

/// Accept SOCKS5 clients forever, negotiating each one on its own task
pub async fn serve_socks(server: Socks5Server) {
    let mut incoming = server.incoming();
    while let Some(socket) = incoming.next().await {
        match socket {
            Ok(socket) => {
                tokio::spawn(async move {
                    match socket.upgrade_to_socks5().await {
                        Ok(_) => debug!("SOCKS5 session finished"),
                        Err(e) => warn!("SOCKS5 session error: {}", e),
                    }
                });
            }
            Err(e) => error!("SOCKS5 accept error: {}", e),
        }
    }
}
