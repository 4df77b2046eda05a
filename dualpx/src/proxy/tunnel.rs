use crate::error::ProxyError;
use crate::utils::validation::is_dialable_authority;
use anyhow::Result;
use hyper::upgrade::OnUpgrade;
use hyper::{Body, Request, Response, StatusCode, header};
use log::{debug, error, info, warn};
use std::fmt::Display;
use std::io;
use std::net::IpAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Extract the CONNECT target from the request-target, falling back to the Host header
pub fn target_authority(req: &Request<Body>) -> Option<String> {
    if let Some(authority) = req.uri().authority() {
        return Some(authority.as_str().to_string());
    }
    req.headers()
        .get(header::HOST)
        .and_then(|hv| hv.to_str().ok())
        .map(|host| host.trim().to_string())
        .filter(|host| !host.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToDestination,
    DestinationToClient,
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::ClientToDestination => write!(f, "client -> destination"),
            Direction::DestinationToClient => write!(f, "destination -> client"),
        }
    }
}

/// The direction that ended a tunnel, and how it ended.
#[derive(Debug)]
pub struct RelayOutcome {
    pub direction: Direction,
    pub result: io::Result<u64>,
}

/// A client connection and a destination connection, relayed as one unit.
///
/// The pair is consumed by [`TunnelPair::relay`], so each connection is shut down and dropped
/// exactly once no matter which direction finishes first.
pub struct TunnelPair<C, D> {
    client: C,
    destination: D,
}

impl<C, D> TunnelPair<C, D>
where
    C: AsyncRead + AsyncWrite,
    D: AsyncRead + AsyncWrite,
{
    pub fn new(client: C, destination: D) -> Self {
        Self { client, destination }
    }

    /// Copy bytes both ways until either direction reaches EOF or fails, then close both ends.
    pub async fn relay(self) -> RelayOutcome {
        let (mut client_reader, mut client_writer) = tokio::io::split(self.client);
        let (mut destination_reader, mut destination_writer) = tokio::io::split(self.destination);

        let outcome = tokio::select! {
            result = tokio::io::copy(&mut client_reader, &mut destination_writer) => {
                RelayOutcome { direction: Direction::ClientToDestination, result }
            }
            result = tokio::io::copy(&mut destination_reader, &mut client_writer) => {
                RelayOutcome { direction: Direction::DestinationToClient, result }
            }
        };

        // The losing copy was cancelled by select!; the halves are dropped on return.
        let _ = destination_writer.shutdown().await;
        let _ = client_writer.shutdown().await;
        outcome
    }
}

/// Handles `CONNECT` requests by dialing the destination and hijacking the client connection.
#[derive(Debug, Clone, Default)]
pub struct TunnelRelay {
    connect_timeout: Option<Duration>,
}

impl TunnelRelay {
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        Self { connect_timeout }
    }

    pub fn get_connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// Open a TCP connection to `authority`, bounded by the configured timeout if there is one
    pub async fn dial(&self, authority: &str) -> Result<TcpStream, ProxyError> {
        if !is_dialable_authority(authority) {
            return Err(ProxyError::InvalidAuthority(authority.to_string()));
        }
        let connect = TcpStream::connect(authority);
        let stream = match self.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, connect)
                .await
                .map_err(|_| ProxyError::DialTimeout { authority: authority.to_string(), timeout })?,
            None => connect.await,
        };
        stream.map_err(|source| ProxyError::DestinationUnreachable { authority: authority.to_string(), source })
    }

    /// Dial the destination, answer `200` and relay the hijacked client connection in the background.
    pub async fn open_tunnel(&self, client_ip: IpAddr, mut req: Request<Body>) -> Result<Response<Body>> {
        let authority = target_authority(&req).unwrap_or_default();
        info!("CONNECT from {ip} to {authority}", ip = client_ip, authority = authority);

        let destination = match self.dial(&authority).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("CONNECT from {ip} failed: {err}", ip = client_ip, err = e);
                return e.to_response();
            }
        };

        let Some(on_upgrade) = req.extensions_mut().remove::<OnUpgrade>() else {
            let e = ProxyError::HijackUnsupported;
            error!("CONNECT from {ip} to {authority}: {err}", ip = client_ip, authority = authority, err = e);
            return e.to_response();
        };

        tokio::spawn(async move {
            match on_upgrade.await {
                Ok(upgraded) => {
                    debug!("Tunnel established {ip} <-> {authority}", ip = client_ip, authority = authority);
                    let outcome = TunnelPair::new(upgraded, destination).relay().await;
                    match outcome.result {
                        Ok(bytes) => debug!(
                            "Tunnel {ip} <-> {authority} closed: {direction} finished after {bytes} bytes",
                            ip = client_ip,
                            authority = authority,
                            direction = outcome.direction,
                            bytes = bytes
                        ),
                        Err(e) => debug!(
                            "Tunnel {ip} <-> {authority} closed: {direction} failed: {err}",
                            ip = client_ip,
                            authority = authority,
                            direction = outcome.direction,
                            err = e
                        ),
                    }
                }
                Err(e) => {
                    error!("CONNECT from {ip} to {authority}: {err}", ip = client_ip, authority = authority, err = ProxyError::HijackFailed(e));
                }
            }
        });

        Ok(Response::builder().status(StatusCode::OK).body(Body::empty())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::Method;
    use std::net::{Ipv4Addr, SocketAddr};
    use tokio::io::{AsyncReadExt, duplex};
    use tokio::net::TcpListener;

    const CLIENT_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    fn closed_port() -> SocketAddr {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    }

    fn connect_request(authority: &str) -> Request<Body> {
        Request::builder().method(Method::CONNECT).uri(authority).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_target_authority_from_uri() {
        let req = connect_request("example.com:443");
        assert_eq!(target_authority(&req), Some("example.com:443".to_string()));
    }

    #[test]
    fn test_target_authority_from_host_header() {
        let req = Request::builder().method(Method::CONNECT).uri("/").header("Host", " example.com:8443 ").body(Body::empty()).unwrap();
        assert_eq!(target_authority(&req), Some("example.com:8443".to_string()));
    }

    #[test]
    fn test_target_authority_none() {
        let req = Request::builder().method(Method::CONNECT).uri("/").body(Body::empty()).unwrap();
        assert_eq!(target_authority(&req), None);
    }

    #[tokio::test]
    async fn test_relay_both_directions_then_destination_close() {
        let (mut client, proxy_client) = duplex(64);
        let (mut destination, proxy_destination) = duplex(64);
        let relay = tokio::spawn(TunnelPair::new(proxy_client, proxy_destination).relay());

        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        destination.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        destination.write_all(b"pong").await.unwrap();
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");

        drop(destination);
        let outcome = relay.await.unwrap();
        assert_eq!(outcome.direction, Direction::DestinationToClient);
        assert_eq!(outcome.result.unwrap(), 4);

        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_relay_client_eof_closes_destination() {
        let (mut client, proxy_client) = duplex(64);
        let (mut destination, proxy_destination) = duplex(64);
        let relay = tokio::spawn(TunnelPair::new(proxy_client, proxy_destination).relay());

        client.write_all(b"bye").await.unwrap();
        client.shutdown().await.unwrap();

        let mut received = Vec::new();
        destination.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"bye");

        let outcome = relay.await.unwrap();
        assert_eq!(outcome.direction, Direction::ClientToDestination);
        assert_eq!(outcome.result.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_relay_preserves_byte_order() {
        let (client, proxy_client) = duplex(1024);
        let (destination, proxy_destination) = duplex(1024);
        let relay = tokio::spawn(TunnelPair::new(proxy_client, proxy_destination).relay());

        let payload: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();
        let (mut client_reader, mut client_writer) = tokio::io::split(client);
        let (mut destination_reader, mut destination_writer) = tokio::io::split(destination);

        // Destination echoes everything back until the client hangs up.
        let echo = tokio::spawn(async move { tokio::io::copy(&mut destination_reader, &mut destination_writer).await });

        let expected = payload.clone();
        let writer = tokio::spawn(async move { client_writer.write_all(&payload).await });
        let mut echoed = vec![0u8; expected.len()];
        client_reader.read_exact(&mut echoed).await.unwrap();
        assert_eq!(echoed, expected);

        writer.await.unwrap().unwrap();
        drop(client_reader);
        relay.abort();
        let _ = echo.await;
    }

    #[tokio::test]
    async fn test_dial_rejects_authority_without_port() {
        let relay = TunnelRelay::default();
        let err = relay.dial("example.com").await.unwrap_err();
        assert!(matches!(err, ProxyError::InvalidAuthority(_)));
    }

    #[tokio::test]
    async fn test_dial_closed_port_is_unreachable() {
        let relay = TunnelRelay::default();
        let err = relay.dial(&closed_port().to_string()).await.unwrap_err();
        assert!(matches!(err, ProxyError::DestinationUnreachable { .. }));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_dial_with_timeout_succeeds() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let relay = TunnelRelay::new(Some(Duration::from_secs(5)));
        assert_eq!(relay.get_connect_timeout(), Some(Duration::from_secs(5)));
        let stream = relay.dial(&addr.to_string()).await.unwrap();
        assert_eq!(stream.peer_addr().unwrap(), addr);
    }

    #[tokio::test]
    async fn test_open_tunnel_unreachable_returns_503() {
        let relay = TunnelRelay::default();
        let response = relay.open_tunnel(CLIENT_IP, connect_request(&closed_port().to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::CONNECTION], "close");

        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&body[..], b"Unable to connect to destination");
    }

    #[tokio::test]
    async fn test_open_tunnel_without_upgrade_returns_500() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            stream.read_to_end(&mut buf).await.unwrap();
            buf
        });

        let relay = TunnelRelay::default();
        let response = relay.open_tunnel(CLIENT_IP, connect_request(&addr.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::CONNECTION], "close");
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&body[..], b"Hijacking not supported");

        // The destination was closed without receiving anything.
        assert!(accepted.await.unwrap().is_empty());
    }
}
