// Proxy module
//
// This module contains the HTTP forward proxy split into focused submodules:
// - http_server: HTTP listener setup and per-connection service wiring
// - request_handler: CONNECT vs. forward dispatch
// - tunnel: CONNECT dialing, hijacking and the bidirectional byte relay
// - forwarder: plain request forwarding through a hyper client

pub mod forwarder;
pub mod http_server;
pub mod request_handler;
pub mod tunnel;

pub use forwarder::ForwardHandler;
pub use http_server::{bind_http_proxy, start_http_proxy};
pub use request_handler::RequestRouter;
pub use tunnel::{TunnelPair, TunnelRelay};
