#![deny(unsafe_code)]

//! Remote control client for a supervisord-compatible process supervisor.
//!
//! The daemon exposes an XML-RPC control plane over HTTP (TCP or a Unix
//! socket). [`SupervisorClient`] wraps each remote procedure in a typed
//! async method: one session per call, a fresh request, a typed result or
//! an [`RpcError`] saying which layer failed.

use std::future::Future;
use std::pin::Pin;

/// A type-erased, `Send`-safe, boxed future, used as the return type of
/// trait methods that must stay object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Compile-time build metadata (version, git hash, profile).
pub mod build_info;
/// Typed operations and the shared call pattern.
pub mod client;
/// Daemon endpoint URLs.
pub mod endpoint;
/// Client error taxonomy.
pub mod error;
/// Well-known daemon fault codes.
pub mod faults;
/// Process and daemon status records.
pub mod process;
/// Session-per-call transport.
pub mod transport;
pub mod xmlrpc;

pub use client::{SupervisorClient, methods};
pub use endpoint::{Address, Endpoint};
pub use error::{ErrorKind, RpcError};
pub use faults::FaultCode;
pub use process::{ProcessInfo, ProcessState, SupervisorState};
pub use transport::{HttpTransport, Session, Transport, TransportError};
pub use xmlrpc::{Fault, FromValue, Value};
