use crate::config::ProxyConfig;
use crate::proxy::forwarder::ForwardHandler;
use crate::proxy::request_handler::RequestRouter;
use crate::proxy::tunnel::TunnelRelay;
use anyhow::Result;
use hyper::client::connect::Connect;
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, StatusCode};
use log::{error, info};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

/// Start the HTTP forward proxy on the configured address and serve until the listener fails
pub async fn start_http_proxy(config: &ProxyConfig) -> Result<()> {
    let addr = config.http_addr()?;
    let router = Arc::new(RequestRouter::new(TunnelRelay::new(config.get_connect_timeout()), ForwardHandler::new()));
    let (local_addr, server) = bind_http_proxy(addr, router)?;
    info!("HTTP Proxy Server running on {}", local_addr);

    if let Err(e) = server.await {
        error!("HTTP proxy server error: {}", e);
        return Err(e.into());
    }
    Ok(())
}

/// Bind the proxy listener and return its local address with the server future to drive
pub fn bind_http_proxy<C>(addr: SocketAddr, router: Arc<RequestRouter<C>>) -> Result<(SocketAddr, impl Future<Output = hyper::Result<()>> + Send)>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    let make_svc = make_service_fn(move |conn: &AddrStream| {
        let router = router.clone();
        let remote_addr = conn.remote_addr().ip();
        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                let router = router.clone();
                async move {
                    match router.route(remote_addr, req).await {
                        Ok(resp) => Ok::<_, Infallible>(resp),
                        Err(e) => {
                            error!("handle_request error from {}: {}", remote_addr, e);
                            let mut resp = Response::new(Body::empty());
                            *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                            Ok::<_, Infallible>(resp)
                        }
                    }
                }
            }))
        }
    });

    // HTTP/1.1 only: forwarded requests keep their version and the upstream client speaks HTTP/1.
    let server = hyper::Server::try_bind(&addr)?.http1_only(true).serve(make_svc);
    Ok((server.local_addr(), server))
}
