//! Remote control client for the supervisor daemon.
//!
//! Every operation follows the same path: open one session, send one
//! `<methodCall>`, drop the session, then decode the response into the
//! operation's declared result type. Nothing is retried, pooled, or cached
//! between calls.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use supctl_config::AppConfig;

use crate::endpoint::Endpoint;
use crate::error::RpcError;
use crate::process::{ProcessInfo, SupervisorState};
use crate::transport::{HttpTransport, Transport};
use crate::xmlrpc::{self, FromValue, MethodResponse, Value};

/// Remote procedure names.
pub mod methods {
    pub const GET_ALL_PROCESS_INFO: &str = "supervisor.getAllProcessInfo";
    pub const GET_PROCESS_INFO: &str = "supervisor.getProcessInfo";
    pub const START_PROCESS: &str = "supervisor.startProcess";
    pub const START_ALL_PROCESSES: &str = "supervisor.startAllProcesses";
    pub const START_PROCESS_GROUP: &str = "supervisor.startProcessGroup";
    pub const STOP_PROCESS: &str = "supervisor.stopProcess";
    pub const STOP_ALL_PROCESSES: &str = "supervisor.stopAllProcesses";
    pub const STOP_PROCESS_GROUP: &str = "supervisor.stopProcessGroup";
    pub const RELOAD_CONFIG: &str = "supervisor.reloadConfig";
    pub const GET_API_VERSION: &str = "supervisor.getAPIVersion";
    pub const GET_SUPERVISOR_VERSION: &str = "supervisor.getSupervisorVersion";
    pub const GET_STATE: &str = "supervisor.getState";
    pub const SHUTDOWN: &str = "supervisor.shutdown";
    pub const RESTART: &str = "supervisor.restart";
}

/// Client for the daemon's XML-RPC control plane.
///
/// Cheap to clone; clones share the transport and may be used from
/// separate tasks concurrently.
#[derive(Clone)]
pub struct SupervisorClient {
    transport: Arc<dyn Transport>,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for SupervisorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupervisorClient")
            .field("endpoint", &self.transport.describe())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SupervisorClient {
    /// Create a client speaking HTTP to the given endpoint URL.
    ///
    /// A malformed URL fails here as a connection error.
    pub fn new(url: &str) -> Result<Self, RpcError> {
        let endpoint = Endpoint::parse(url)?;
        Ok(Self::with_transport(HttpTransport::new(endpoint)))
    }

    /// Create a client from loaded configuration: endpoint plus deadline.
    pub fn from_config(config: &AppConfig) -> Result<Self, RpcError> {
        let client = Self::new(&config.server.url)?;
        Ok(match config.server.timeout() {
            Some(after) => client.with_timeout(after),
            None => client,
        })
    }

    /// Create a client over any transport, e.g. a test stub.
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Bound every call (connect, exchange, and release) by `after`.
    pub fn with_timeout(mut self, after: Duration) -> Self {
        self.timeout = Some(after);
        self
    }

    /// Abort in-flight and future calls once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The endpoint label of the underlying transport.
    pub fn endpoint(&self) -> &str {
        self.transport.describe()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    // ── Call pattern ───────────────────────────────────────────────────

    /// Invoke `method` with positional `params` and decode the result as `R`.
    pub async fn call<R: FromValue>(&self, method: &str, params: &[Value]) -> Result<R, RpcError> {
        let started = Instant::now();
        let result = tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(RpcError::Cancelled {
                method: method.to_string(),
            }),
            result = self.call_within_deadline(method, params) => result,
        };
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &result {
            Ok(_) => debug!(
                method,
                endpoint = %self.endpoint(),
                elapsed_ms,
                "RPC call completed"
            ),
            Err(e) => warn!(
                method,
                endpoint = %self.endpoint(),
                elapsed_ms,
                kind = %e.kind(),
                error = %e,
                "RPC call failed"
            ),
        }
        result
    }

    async fn call_within_deadline<R: FromValue>(
        &self,
        method: &str,
        params: &[Value],
    ) -> Result<R, RpcError> {
        let body = match self.timeout {
            Some(after) => tokio::time::timeout(after, self.exchange(method, params))
                .await
                .map_err(|_| RpcError::Timeout {
                    method: method.to_string(),
                    after,
                })??,
            None => self.exchange(method, params).await?,
        };
        decode(method, &body)
    }

    /// Open a session, exchange one request, and release the session.
    async fn exchange(&self, method: &str, params: &[Value]) -> Result<Vec<u8>, RpcError> {
        let request = xmlrpc::encode_call(method, params);
        let mut session = self.transport.open().await?;
        let response = session.exchange(request).await;
        drop(session);
        Ok(response?)
    }

    // ── Status ─────────────────────────────────────────────────────────

    /// Status of every configured process.
    pub async fn get_all_process_info(&self) -> Result<Vec<ProcessInfo>, RpcError> {
        self.call(methods::GET_ALL_PROCESS_INFO, &[]).await
    }

    /// Status of one process, by `name` or `group:name`.
    pub async fn get_process_info(&self, name: &str) -> Result<ProcessInfo, RpcError> {
        self.call(methods::GET_PROCESS_INFO, &[Value::from(name)])
            .await
    }

    // ── Start ──────────────────────────────────────────────────────────

    /// Start one process. `name` may be `name`, `group:name`, or `group:*`
    /// and is passed through untouched.
    pub async fn start_process(&self, name: &str, wait: bool) -> Result<bool, RpcError> {
        self.call(methods::START_PROCESS, &[Value::from(name), Value::from(wait)])
            .await
    }

    pub async fn start_all_processes(&self, wait: bool) -> Result<Vec<ProcessInfo>, RpcError> {
        self.call(methods::START_ALL_PROCESSES, &[Value::from(wait)])
            .await
    }

    pub async fn start_process_group(
        &self,
        name: &str,
        wait: bool,
    ) -> Result<Vec<ProcessInfo>, RpcError> {
        self.call(
            methods::START_PROCESS_GROUP,
            &[Value::from(name), Value::from(wait)],
        )
        .await
    }

    // ── Stop ───────────────────────────────────────────────────────────

    /// Stop one process. `name` is passed through untouched.
    pub async fn stop_process(&self, name: &str, wait: bool) -> Result<bool, RpcError> {
        self.call(methods::STOP_PROCESS, &[Value::from(name), Value::from(wait)])
            .await
    }

    pub async fn stop_all_processes(&self, wait: bool) -> Result<Vec<ProcessInfo>, RpcError> {
        self.call(methods::STOP_ALL_PROCESSES, &[Value::from(wait)])
            .await
    }

    pub async fn stop_process_group(
        &self,
        name: &str,
        wait: bool,
    ) -> Result<Vec<ProcessInfo>, RpcError> {
        self.call(
            methods::STOP_PROCESS_GROUP,
            &[Value::from(name), Value::from(wait)],
        )
        .await
    }

    // ── Daemon control ─────────────────────────────────────────────────

    pub async fn reload_config(&self) -> Result<bool, RpcError> {
        self.call(methods::RELOAD_CONFIG, &[]).await
    }

    /// Version of the RPC API the daemon implements.
    pub async fn get_api_version(&self) -> Result<String, RpcError> {
        self.call(methods::GET_API_VERSION, &[]).await
    }

    /// Version of the daemon package itself.
    pub async fn get_supervisor_version(&self) -> Result<String, RpcError> {
        self.call(methods::GET_SUPERVISOR_VERSION, &[]).await
    }

    pub async fn get_state(&self) -> Result<SupervisorState, RpcError> {
        self.call(methods::GET_STATE, &[]).await
    }

    pub async fn shutdown(&self) -> Result<bool, RpcError> {
        self.call(methods::SHUTDOWN, &[]).await
    }

    pub async fn restart(&self) -> Result<bool, RpcError> {
        self.call(methods::RESTART, &[]).await
    }
}

fn decode<R: FromValue>(method: &str, body: &[u8]) -> Result<R, RpcError> {
    let body = match std::str::from_utf8(body) {
        Ok(body) => body,
        Err(e) => {
            return Err(RpcError::decode(
                method,
                format_args!("response body is not valid UTF-8: {e}"),
                &String::from_utf8_lossy(body),
            ));
        }
    };
    match xmlrpc::decode_response(body) {
        Ok(MethodResponse::Success(value)) => {
            R::from_value(value).map_err(|e| RpcError::decode(method, e, body))
        }
        Ok(MethodResponse::Fault(fault)) => Err(RpcError::RemoteCall {
            method: method.to_string(),
            code: fault.code,
            message: fault.message,
        }),
        Err(e) => Err(RpcError::decode(method, e, body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::BoxFuture;
    use crate::error::ErrorKind;
    use crate::transport::{Session, TransportError};
    use crate::xmlrpc::{Fault, encode_fault, encode_response};

    /// Replies with a fixed body and remembers the last request.
    struct FixedTransport {
        reply: Vec<u8>,
        last_request: Arc<Mutex<Option<String>>>,
    }

    struct FixedSession {
        reply: Vec<u8>,
        last_request: Arc<Mutex<Option<String>>>,
    }

    impl Transport for FixedTransport {
        fn describe(&self) -> &str {
            "fixed://"
        }

        fn open(&self) -> BoxFuture<'_, Result<Box<dyn Session>, TransportError>> {
            let session = FixedSession {
                reply: self.reply.clone(),
                last_request: Arc::clone(&self.last_request),
            };
            Box::pin(async move { Ok(Box::new(session) as Box<dyn Session>) })
        }
    }

    impl Session for FixedSession {
        fn exchange(&mut self, body: String) -> BoxFuture<'_, Result<Vec<u8>, TransportError>> {
            *self.last_request.lock().unwrap() = Some(body);
            let reply = self.reply.clone();
            Box::pin(async move { Ok(reply) })
        }
    }

    fn client_replying(reply: impl Into<Vec<u8>>) -> (SupervisorClient, Arc<Mutex<Option<String>>>) {
        let last_request = Arc::new(Mutex::new(None));
        let transport = FixedTransport {
            reply: reply.into(),
            last_request: Arc::clone(&last_request),
        };
        (SupervisorClient::with_transport(transport), last_request)
    }

    #[tokio::test]
    async fn test_api_version_decodes_string() {
        let (client, last) = client_replying(encode_response(&Value::from("3.0")));
        assert_eq!(client.get_api_version().await.unwrap(), "3.0");
        let request = last.lock().unwrap().clone().unwrap();
        assert!(request.contains("<methodName>supervisor.getAPIVersion</methodName>"));
    }

    #[tokio::test]
    async fn test_fault_becomes_remote_call_error() {
        let (client, _) = client_replying(encode_fault(&Fault {
            code: 70,
            message: "NOT_RUNNING: web".to_string(),
        }));
        let err = client.stop_process("web", true).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RemoteCall);
        assert_eq!(err.fault_code(), Some(70));
    }

    #[tokio::test]
    async fn test_garbage_body_is_decode_error_with_payload() {
        let (client, _) = client_replying("<html>bad gateway</html>".to_string());
        let err = client.reload_config().await.unwrap_err();
        match err {
            RpcError::Decode {
                method, payload, ..
            } => {
                assert_eq!(method, methods::RELOAD_CONFIG);
                assert_eq!(payload, "<html>bad gateway</html>");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_utf8_body_is_decode_error_not_connection() {
        let (client, _) = client_replying(b"<methodResponse>\xff\xfe</methodResponse>".to_vec());
        let err = client.get_api_version().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        match err {
            RpcError::Decode {
                method,
                reason,
                payload,
            } => {
                assert_eq!(method, methods::GET_API_VERSION);
                assert!(reason.contains("UTF-8"));
                assert_eq!(payload, "<methodResponse>\u{fffd}\u{fffd}</methodResponse>");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_new_rejects_malformed_url_as_connection_error() {
        let err = SupervisorClient::new("not a url").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[tokio::test]
    async fn test_from_config_applies_timeout() {
        let config = AppConfig::parse("[server]\ntimeout_secs = 7\n").unwrap();
        let client = SupervisorClient::from_config(&config).unwrap();
        assert_eq!(client.timeout(), Some(Duration::from_secs(7)));
        assert_eq!(client.endpoint(), "http://127.0.0.1:9001/RPC2");
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let (client, last) = client_replying(encode_response(&Value::from(true)));
        let token = CancellationToken::new();
        token.cancel();
        let client = client.with_cancellation(token);
        let err = client.shutdown().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(last.lock().unwrap().is_none());
    }
}
