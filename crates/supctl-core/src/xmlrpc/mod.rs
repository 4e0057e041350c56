//! XML-RPC wire codec.
//!
//! The daemon speaks XML-RPC over HTTP. This module turns a method name and
//! positional arguments into a `<methodCall>` document and turns the
//! daemon's `<methodResponse>` back into a [`Value`] or a [`Fault`]. Typed
//! results are then pulled out of the [`Value`] through [`FromValue`].
//!
//! The server-side halves ([`decode_call`], [`encode_response`],
//! [`encode_fault`]) exist for stub daemons in tests.

mod decode;
mod encode;
mod value;

pub use decode::{CodecError, decode_call, decode_response};
pub use encode::{encode_call, encode_fault, encode_response};
pub use value::{FromValue, Members, Value, ValueError};

/// A fault reported by the daemon in place of a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub code: i32,
    pub message: String,
}

/// A decoded `<methodResponse>`.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    Success(Value),
    Fault(Fault),
}
