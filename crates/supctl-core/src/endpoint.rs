//! Daemon endpoint addresses.
//!
//! Two forms are accepted:
//!
//! - `http://host[:port][/path]`: TCP. An empty path or `/` means `/RPC2`.
//! - `unix:///path/to/supervisor.sock`: Unix domain socket, always `/RPC2`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::transport::TransportError;

/// Path of the daemon's XML-RPC handler.
pub const DEFAULT_RPC_PATH: &str = "/RPC2";

const DEFAULT_HTTP_PORT: u16 = 80;

/// Where a session connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Tcp { host: String, port: u16 },
    Unix(PathBuf),
}

/// A parsed, immutable daemon address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: String,
    address: Address,
    rpc_path: String,
    host_header: String,
}

impl Endpoint {
    /// Parse an endpoint URL.
    pub fn parse(url: &str) -> Result<Self, TransportError> {
        let invalid = |reason: &str| TransportError::InvalidEndpoint {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        if let Some(path) = url.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(invalid("socket path is empty"));
            }
            return Ok(Self {
                url: url.to_string(),
                address: Address::Unix(PathBuf::from(path)),
                rpc_path: DEFAULT_RPC_PATH.to_string(),
                host_header: "localhost".to_string(),
            });
        }

        let uri: hyper::Uri = url.parse().map_err(|e| invalid(&format!("{e}")))?;
        match uri.scheme_str() {
            Some("http") => {}
            Some("https") => return Err(invalid("TLS is not supported")),
            Some(other) => return Err(invalid(&format!("unsupported scheme {other:?}"))),
            None => return Err(invalid("missing scheme")),
        }
        let host = uri
            .host()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing host"))?;
        let port = uri.port_u16().unwrap_or(DEFAULT_HTTP_PORT);
        let rpc_path = match uri.path_and_query().map(|pq| pq.as_str()) {
            None | Some("") | Some("/") => DEFAULT_RPC_PATH.to_string(),
            Some(path) => path.to_string(),
        };

        Ok(Self {
            url: url.to_string(),
            address: Address::Tcp {
                // IPv6 literals arrive bracketed; the socket API wants them bare.
                host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
                port,
            },
            rpc_path,
            host_header: format!("{host}:{port}"),
        })
    }

    /// The URL this endpoint was parsed from.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Request target for the HTTP POST.
    pub fn rpc_path(&self) -> &str {
        &self.rpc_path
    }

    /// Value of the HTTP `Host` header.
    pub fn host_header(&self) -> &str {
        &self.host_header
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}
