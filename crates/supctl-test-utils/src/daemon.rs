//! In-process stub of the supervisor daemon's XML-RPC endpoint.
//!
//! [`StubDaemon`] serves `POST /RPC2` with axum on an ephemeral TCP port or
//! a Unix socket. Each method is programmed with the arguments it expects
//! and the reply it gives; anything else is answered with the daemon's own
//! fault codes, so the client sees realistic failures.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use supctl_core::FaultCode;
use supctl_core::xmlrpc::{self, Fault, Value};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::transport::Reply;

#[derive(Clone)]
struct Expectation {
    params: Option<Vec<Value>>,
    reply: Reply,
}

struct StubState {
    methods: HashMap<String, Expectation>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
}

/// Programs a [`StubDaemon`] before it starts listening.
#[derive(Default)]
pub struct StubDaemonBuilder {
    methods: HashMap<String, Expectation>,
}

impl StubDaemonBuilder {
    /// Answer `method` with `reply` only when called with exactly `params`;
    /// other arguments get an `INCORRECT_PARAMETERS` fault.
    pub fn expect(mut self, method: &str, params: Vec<Value>, reply: Reply) -> Self {
        self.methods.insert(
            method.to_string(),
            Expectation {
                params: Some(params),
                reply,
            },
        );
        self
    }

    /// Answer `method` with `reply` whatever the arguments.
    pub fn respond(mut self, method: &str, reply: Reply) -> Self {
        self.methods.insert(
            method.to_string(),
            Expectation {
                params: None,
                reply,
            },
        );
        self
    }

    /// Listen on an ephemeral localhost TCP port.
    pub async fn serve_tcp(self) -> StubDaemon {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind stub daemon");
        let addr = listener.local_addr().expect("stub daemon has no address");
        let (state, app) = self.into_router();
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        StubDaemon {
            url: format!("http://{addr}/RPC2"),
            state,
            server,
            _socket_dir: None,
        }
    }

    /// Listen on a Unix socket in a fresh temp directory.
    #[cfg(unix)]
    pub async fn serve_unix(self) -> StubDaemon {
        let dir = TempDir::new().expect("failed to create temp dir");
        let path: PathBuf = dir.path().join("supervisor.sock");
        let listener =
            tokio::net::UnixListener::bind(&path).expect("failed to bind stub daemon socket");
        let (state, app) = self.into_router();
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        StubDaemon {
            url: format!("unix://{}", path.display()),
            state,
            server,
            _socket_dir: Some(dir),
        }
    }

    fn into_router(self) -> (Arc<StubState>, axum::Router) {
        let state = Arc::new(StubState {
            methods: self.methods,
            calls: Mutex::new(Vec::new()),
        });
        let app = axum::Router::new()
            .route("/RPC2", post(handle_rpc))
            .with_state(Arc::clone(&state));
        (state, app)
    }
}

/// A running stub daemon. Stops serving when dropped.
pub struct StubDaemon {
    url: String,
    state: Arc<StubState>,
    server: JoinHandle<()>,
    _socket_dir: Option<TempDir>,
}

impl StubDaemon {
    pub fn builder() -> StubDaemonBuilder {
        StubDaemonBuilder::default()
    }

    /// Endpoint URL to point a client at.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Decoded `(method, params)` of every request received, in order.
    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.state.calls.lock().expect("calls lock poisoned").clone()
    }
}

impl Drop for StubDaemon {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// ── Route handler ───────────────────────────────────────────────────────

async fn handle_rpc(State(state): State<Arc<StubState>>, body: String) -> Response {
    match answer(&state, &body) {
        Some(xml) => ([(header::CONTENT_TYPE, "text/xml")], xml).into_response(),
        None => std::future::pending().await,
    }
}

/// The response body for `body`, or `None` to never answer.
fn answer(state: &StubState, body: &str) -> Option<String> {
    let (method, params) = match xmlrpc::decode_call(body) {
        Ok(call) => call,
        Err(e) => return Some(fault(FaultCode::BadArguments, &e.to_string())),
    };
    debug!(%method, "stub daemon received call");
    state
        .calls
        .lock()
        .expect("calls lock poisoned")
        .push((method.clone(), params.clone()));

    let Some(expectation) = state.methods.get(&method) else {
        return Some(fault(FaultCode::UnknownMethod, &method));
    };
    if expectation.params.as_ref().is_some_and(|p| *p != params) {
        return Some(fault(FaultCode::IncorrectParameters, &method));
    }

    Some(match &expectation.reply {
        Reply::Value(value) => xmlrpc::encode_response(value),
        Reply::Fault { code, message } => xmlrpc::encode_fault(&Fault {
            code: *code,
            message: message.clone(),
        }),
        Reply::Raw(raw) => raw.clone(),
        Reply::Hang => return None,
        Reply::Refuse => fault(FaultCode::Failed, "stub daemon cannot refuse an accepted call"),
    })
}

fn fault(code: FaultCode, detail: &str) -> String {
    xmlrpc::encode_fault(&Fault {
        code: code.code(),
        message: format!("{}: {detail}", code.as_str()),
    })
}
