use crate::proxy::forwarder::ForwardHandler;
use crate::proxy::tunnel::TunnelRelay;
use anyhow::Result;
use hyper::client::HttpConnector;
use hyper::client::connect::Connect;
use hyper::{Body, Method, Request, Response};
use hyper_tls::HttpsConnector;
use log::trace;
use std::net::IpAddr;

/// Check if the request asks for a raw tunnel rather than a forwarded exchange
pub fn is_tunnel_request(req: &Request<Body>) -> bool {
    req.method() == Method::CONNECT
}

/// Dispatches each proxy request by method: `CONNECT` is tunneled, everything else forwarded.
#[derive(Debug, Clone)]
pub struct RequestRouter<C = HttpsConnector<HttpConnector>> {
    tunnel: TunnelRelay,
    forwarder: ForwardHandler<C>,
}

impl<C> RequestRouter<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    pub fn new(tunnel: TunnelRelay, forwarder: ForwardHandler<C>) -> Self {
        Self { tunnel, forwarder }
    }

    pub async fn route(&self, client_ip: IpAddr, req: Request<Body>) -> Result<Response<Body>> {
        trace!("Request from {ip}: {req:?}", ip = client_ip, req = req);
        if is_tunnel_request(&req) {
            self.tunnel.open_tunnel(client_ip, req).await
        } else {
            self.forwarder.forward(client_ip, req).await
        }
    }
}
