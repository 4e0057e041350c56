//! In-memory transport that replays scripted daemon replies.
//!
//! [`ScriptedTransport`] is a cheap handle; clone it before handing it to
//! [`SupervisorClient::with_transport`] and keep the clone to inspect how
//! many sessions were opened and released and which calls were made.
//!
//! [`SupervisorClient::with_transport`]: supctl_core::SupervisorClient::with_transport

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use supctl_core::BoxFuture;
use supctl_core::transport::{Session, Transport, TransportError};
use supctl_core::xmlrpc::{self, Fault, Value};

/// What the fake daemon does with the next session.
#[derive(Debug, Clone)]
pub enum Reply {
    /// A well-formed success response carrying this value.
    Value(Value),
    /// A well-formed fault response.
    Fault { code: i32, message: String },
    /// This exact response body, well-formed or not.
    Raw(String),
    /// Fail to open the session with a refused connection.
    Refuse,
    /// Open the session but never answer.
    Hang,
}

impl Reply {
    pub fn fault(code: i32, message: &str) -> Self {
        Reply::Fault {
            code,
            message: message.to_string(),
        }
    }
}

#[derive(Default)]
struct Script {
    replies: VecDeque<Reply>,
    calls: Vec<(String, Vec<Value>)>,
    opens: usize,
    releases: usize,
}

/// A [`Transport`] answering from a queue of [`Reply`] values.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next session.
    pub fn push(&self, reply: Reply) -> &Self {
        self.lock().replies.push_back(reply);
        self
    }

    /// Sessions successfully opened so far.
    pub fn opens(&self) -> usize {
        self.lock().opens
    }

    /// Sessions released so far.
    pub fn releases(&self) -> usize {
        self.lock().releases
    }

    /// Decoded `(method, params)` of every request received, in order.
    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().expect("script lock poisoned")
    }
}

impl Transport for ScriptedTransport {
    fn describe(&self) -> &str {
        "scripted://"
    }

    fn open(&self) -> BoxFuture<'_, Result<Box<dyn Session>, TransportError>> {
        Box::pin(async move {
            let mut script = self.lock();
            let reply = script.replies.pop_front();
            if matches!(reply, Some(Reply::Refuse)) {
                return Err(TransportError::Connect {
                    endpoint: "scripted://".to_string(),
                    source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
                });
            }
            script.opens += 1;
            Ok(Box::new(ScriptedSession {
                script: Arc::clone(&self.script),
                reply,
            }) as Box<dyn Session>)
        })
    }
}

struct ScriptedSession {
    script: Arc<Mutex<Script>>,
    reply: Option<Reply>,
}

impl Session for ScriptedSession {
    fn exchange(&mut self, body: String) -> BoxFuture<'_, Result<Vec<u8>, TransportError>> {
        Box::pin(async move {
            let call = xmlrpc::decode_call(&body)
                .map_err(|e| TransportError::Request(format!("undecodable request: {e}")))?;
            self.script
                .lock()
                .expect("script lock poisoned")
                .calls
                .push(call);

            match self.reply.take() {
                Some(Reply::Value(value)) => Ok(xmlrpc::encode_response(&value).into_bytes()),
                Some(Reply::Fault { code, message }) => {
                    Ok(xmlrpc::encode_fault(&Fault { code, message }).into_bytes())
                }
                Some(Reply::Raw(raw)) => Ok(raw.into_bytes()),
                Some(Reply::Hang) => std::future::pending().await,
                Some(Reply::Refuse) | None => {
                    Err(TransportError::Request("no scripted reply".to_string()))
                }
            }
        })
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        if let Ok(mut script) = self.script.lock() {
            script.releases += 1;
        }
    }
}
