use hyper::{Body, Response, StatusCode, header};
use std::time::Duration;
use thiserror::Error;

/// Per-request failures of the HTTP proxy.
///
/// Every variant maps to the status code the client sees, if it sees one at all. `HijackFailed`
/// happens after the `200` has been committed, so it is only ever logged.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("CONNECT request has no usable target authority: {0:?}")]
    InvalidAuthority(String),

    #[error("unable to connect to {authority}: {source}")]
    DestinationUnreachable {
        authority: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connecting to {authority} timed out after {timeout:?}")]
    DialTimeout { authority: String, timeout: Duration },

    #[error("connection does not support hijacking")]
    HijackUnsupported,

    #[error("hijacking the client connection failed: {0}")]
    HijackFailed(#[source] hyper::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[source] hyper::Error),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidAuthority(_) | ProxyError::DestinationUnreachable { .. } | ProxyError::DialTimeout { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ProxyError::HijackUnsupported | ProxyError::HijackFailed(_) | ProxyError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body text sent to the client. Deliberately vague; details go to the log.
    pub fn client_message(&self) -> &'static str {
        match self {
            ProxyError::InvalidAuthority(_) | ProxyError::DestinationUnreachable { .. } | ProxyError::DialTimeout { .. } => {
                "Unable to connect to destination"
            }
            ProxyError::HijackUnsupported => "Hijacking not supported",
            ProxyError::HijackFailed(_) => "Hijacking failed",
            ProxyError::Upstream(_) => "Error when processing request",
        }
    }

    /// Whether the client connection must be closed after the error response.
    /// A failed `CONNECT` never leaves the connection reusable.
    pub fn closes_connection(&self) -> bool {
        !matches!(self, ProxyError::Upstream(_))
    }

    pub fn to_response(&self) -> anyhow::Result<Response<Body>> {
        let mut builder = Response::builder().status(self.status()).header(header::CONTENT_TYPE, "text/plain");
        if self.closes_connection() {
            builder = builder.header(header::CONNECTION, "close");
        }
        Ok(builder.body(Body::from(self.client_message()))?)
    }
}
