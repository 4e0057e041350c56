//! XML-RPC over HTTP/1.1, one connection per session.
//!
//! Uses `hyper`'s low-level connection API so that a session maps onto
//! exactly one TCP or Unix-domain connection that is torn down on drop.

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Bytes;
use hyper::client::conn::http1::SendRequest;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use super::{Session, Transport, TransportError};
use crate::BoxFuture;
use crate::build_info;
use crate::endpoint::{Address, Endpoint};

/// Largest response body read from the daemon, 16 MiB.
pub const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

/// Opens a fresh HTTP connection to the daemon for every call.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: Endpoint,
    max_response_bytes: usize,
}

impl HttpTransport {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            max_response_bytes: MAX_RESPONSE_BYTES,
        }
    }

    /// Cap the response body size; larger bodies fail the call.
    pub fn with_max_response_bytes(mut self, limit: usize) -> Self {
        self.max_response_bytes = limit;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn connect(&self) -> Result<HttpSession, TransportError> {
        let connect_err = |source: std::io::Error| TransportError::Connect {
            endpoint: self.endpoint.url().to_string(),
            source,
        };

        match self.endpoint.address() {
            Address::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port))
                    .await
                    .map_err(connect_err)?;
                // Requests are a single small write; don't let Nagle delay it.
                let _ = stream.set_nodelay(true);
                HttpSession::handshake(self.endpoint.clone(), self.max_response_bytes, stream).await
            }
            #[cfg(unix)]
            Address::Unix(path) => {
                let stream = tokio::net::UnixStream::connect(path)
                    .await
                    .map_err(connect_err)?;
                HttpSession::handshake(self.endpoint.clone(), self.max_response_bytes, stream).await
            }
            #[cfg(not(unix))]
            Address::Unix(_) => Err(TransportError::InvalidEndpoint {
                url: self.endpoint.url().to_string(),
                reason: "unix sockets are not available on this platform".to_string(),
            }),
        }
    }
}

impl Transport for HttpTransport {
    fn describe(&self) -> &str {
        self.endpoint.url()
    }

    fn open(&self) -> BoxFuture<'_, Result<Box<dyn Session>, TransportError>> {
        Box::pin(async move {
            let session = self.connect().await?;
            trace!(endpoint = %self.endpoint, "RPC session opened");
            Ok(Box::new(session) as Box<dyn Session>)
        })
    }
}

struct HttpSession {
    endpoint: Endpoint,
    max_response_bytes: usize,
    sender: SendRequest<Full<Bytes>>,
    driver: JoinHandle<()>,
}

impl HttpSession {
    async fn handshake<S>(
        endpoint: Endpoint,
        max_response_bytes: usize,
        stream: S,
    ) -> Result<Self, TransportError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sender, conn) =
            hyper::client::conn::http1::handshake::<_, Full<Bytes>>(TokioIo::new(stream))
                .await
                .map_err(|e| TransportError::Handshake {
                    endpoint: endpoint.url().to_string(),
                    reason: e.to_string(),
                })?;

        // Drive the connection in the background until the session drops.
        let label = endpoint.url().to_string();
        let driver = tokio::spawn(async move {
            if let Err(e) = conn.await {
                warn!(endpoint = %label, error = %e, "RPC connection error");
            }
        });

        Ok(Self {
            endpoint,
            max_response_bytes,
            sender,
            driver,
        })
    }
}

impl Session for HttpSession {
    fn exchange(&mut self, body: String) -> BoxFuture<'_, Result<Vec<u8>, TransportError>> {
        Box::pin(async move {
            let req = hyper::Request::builder()
                .method(hyper::Method::POST)
                .uri(self.endpoint.rpc_path())
                .header(hyper::header::HOST, self.endpoint.host_header())
                .header(hyper::header::CONTENT_TYPE, "text/xml")
                .header(hyper::header::USER_AGENT, build_info::user_agent())
                .body(Full::new(Bytes::from(body)))
                .map_err(|e| TransportError::Request(format!("failed to build request: {e}")))?;

            let resp = self
                .sender
                .send_request(req)
                .await
                .map_err(|e| TransportError::Request(e.to_string()))?;

            let status = resp.status();
            let limit = self.max_response_bytes;
            let bytes = Limited::new(resp.into_body(), limit)
                .collect()
                .await
                .map_err(|e| {
                    if e.downcast_ref::<LengthLimitError>().is_some() {
                        TransportError::ResponseTooLarge { limit }
                    } else {
                        TransportError::Request(format!("failed to read response body: {e}"))
                    }
                })?
                .to_bytes();

            if !status.is_success() {
                return Err(TransportError::Status {
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&bytes).into_owned(),
                });
            }

            Ok(bytes.to_vec())
        })
    }
}

impl Drop for HttpSession {
    fn drop(&mut self) {
        self.driver.abort();
        trace!(endpoint = %self.endpoint, "RPC session released");
    }
}
