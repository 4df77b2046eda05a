use crate::error::ProxyError;
use anyhow::Result;
use hyper::client::HttpConnector;
use hyper::client::connect::Connect;
use hyper::header::HeaderMap;
use hyper::{Body, Client, Request, Response, Uri, header};
use hyper_tls::HttpsConnector;
use log::{debug, error, info, warn};
use std::net::IpAddr;

/// Copy every header of `from` into `to`. Each key present in `from` replaces all values `to`
/// holds under that key; multi-valued headers keep every value.
pub fn copy_headers(from: &HeaderMap, to: &mut HeaderMap) {
    for name in from.keys() {
        to.remove(name);
        for value in from.get_all(name) {
            to.append(name.clone(), value.clone());
        }
    }
}

/// Rewrite an origin-form target (`/path`) into `http://{Host}/path` so the client can dial it.
/// Absolute-form targets are left untouched.
pub fn into_absolute_form(mut req: Request<Body>) -> Request<Body> {
    if req.uri().scheme().is_some() && req.uri().authority().is_some() {
        return req;
    }
    let Some(host) = req.headers().get(header::HOST).and_then(|hv| hv.to_str().ok()).map(|h| h.trim().to_string()) else {
        return req;
    };
    let path = req.uri().path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    match format!("http://{}{}", host, path).parse::<Uri>() {
        Ok(uri) => *req.uri_mut() = uri,
        Err(e) => warn!("Could not build an absolute URI from Host {host:?}: {err}", host = host, err = e),
    }
    req
}

/// Replays non-`CONNECT` requests against their origin through a hyper client.
///
/// The client is injected so tests (and callers with special transport needs) can choose the
/// connector; [`ForwardHandler::new`] uses an HTTPS-capable one.
#[derive(Debug, Clone)]
pub struct ForwardHandler<C = HttpsConnector<HttpConnector>> {
    client: Client<C, Body>,
}

impl ForwardHandler {
    pub fn new() -> Self {
        Self::with_client(Client::builder().build::<_, Body>(HttpsConnector::new()))
    }
}

impl Default for ForwardHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ForwardHandler<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    pub fn with_client(client: Client<C, Body>) -> Self {
        Self { client }
    }

    /// Send the request upstream once and hand the upstream status, headers and body back.
    pub async fn forward(&self, client_ip: IpAddr, req: Request<Body>) -> Result<Response<Body>> {
        let req = into_absolute_form(req);
        let method = req.method().clone();
        let uri = req.uri().clone();
        info!("Forwarding {method} {uri} for {ip}", method = method, uri = uri, ip = client_ip);

        let upstream = match self.client.request(req).await {
            Ok(response) => response,
            Err(e) => {
                let e = ProxyError::Upstream(e);
                error!("HTTP proxy error for {method} {uri}: {err}", method = method, uri = uri, err = e);
                return e.to_response();
            }
        };

        let (parts, body) = upstream.into_parts();
        debug!("Upstream {uri} answered {status}", uri = uri, status = parts.status);

        // The upstream body streams straight through; dropping it releases the upstream connection.
        let mut response = Response::new(body);
        *response.status_mut() = parts.status;
        copy_headers(&parts.headers, response.headers_mut());
        Ok(response)
    }
}
