//! Session-per-call transport seam.
//!
//! A [`Transport`] knows how to reach the daemon; each call opens one
//! [`Session`], exchanges one request body for one response body, and drops
//! the session. Dropping is the release: it runs on every exit path,
//! including `?` early returns, deadline expiry, and task cancellation.

mod http;

pub use http::{HttpTransport, MAX_RESPONSE_BYTES};

use crate::BoxFuture;

/// Errors raised while opening a session or moving bytes over it.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid endpoint {url:?}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        source: std::io::Error,
    },

    #[error("HTTP handshake with {endpoint} failed: {reason}")]
    Handshake { endpoint: String, reason: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("daemon answered HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response body exceeds {limit} bytes")]
    ResponseTooLarge { limit: usize },
}

/// Opens sessions against one daemon endpoint.
///
/// Uses `BoxFuture` so the client can hold an `Arc<dyn Transport>`.
pub trait Transport: Send + Sync {
    /// Endpoint label for logs and error messages.
    fn describe(&self) -> &str;

    /// Establish a fresh session.
    fn open(&self) -> BoxFuture<'_, Result<Box<dyn Session>, TransportError>>;
}

/// One live connection, used for exactly one exchange and then dropped.
pub trait Session: Send {
    /// Send an encoded `<methodCall>` and return the raw response body.
    /// Interpreting the bytes is left to the caller.
    fn exchange(&mut self, body: String) -> BoxFuture<'_, Result<Vec<u8>, TransportError>>;
}
