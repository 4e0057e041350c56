use std::fmt;
use std::time::Duration;

use crate::faults::FaultCode;
use crate::transport::TransportError;

/// Upper bound on the raw payload kept in a [`RpcError::Decode`].
pub const MAX_PAYLOAD_BYTES: usize = 4096;

/// Every way a client operation can fail.
///
/// Callers branch on [`RpcError::kind`] to tell which layer failed.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("connection to supervisor failed: {0}")]
    Connection(#[from] TransportError),

    #[error("{method} failed with fault {code}: {message}")]
    RemoteCall {
        method: String,
        code: i32,
        message: String,
    },

    #[error("could not decode {method} response: {reason}")]
    Decode {
        method: String,
        reason: String,
        payload: String,
    },

    #[error("{method} timed out after {after:?}")]
    Timeout { method: String, after: Duration },

    #[error("{method} was cancelled")]
    Cancelled { method: String },
}

/// Which layer an [`RpcError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    RemoteCall,
    Decode,
    Timeout,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Connection => "connection",
            ErrorKind::RemoteCall => "remote_call",
            ErrorKind::Decode => "decode",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RpcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RpcError::Connection(_) => ErrorKind::Connection,
            RpcError::RemoteCall { .. } => ErrorKind::RemoteCall,
            RpcError::Decode { .. } => ErrorKind::Decode,
            RpcError::Timeout { .. } => ErrorKind::Timeout,
            RpcError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// The daemon's fault code, verbatim, for remote-call failures.
    pub fn fault_code(&self) -> Option<i32> {
        match self {
            RpcError::RemoteCall { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether this is a daemon fault with the given known code.
    pub fn is_fault(&self, fault: FaultCode) -> bool {
        self.fault_code() == Some(fault.code())
    }

    pub(crate) fn decode(method: &str, reason: impl fmt::Display, payload: &str) -> Self {
        RpcError::Decode {
            method: method.to_string(),
            reason: reason.to_string(),
            payload: truncate(payload, MAX_PAYLOAD_BYTES).to_string(),
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_per_variant() {
        let conn = RpcError::from(TransportError::ResponseTooLarge { limit: 16 });
        assert_eq!(conn.kind(), ErrorKind::Connection);

        let fault = RpcError::RemoteCall {
            method: "supervisor.startProcess".to_string(),
            code: 10,
            message: "BAD_NAME".to_string(),
        };
        assert_eq!(fault.kind(), ErrorKind::RemoteCall);
        assert_eq!(fault.fault_code(), Some(10));
        assert!(fault.is_fault(FaultCode::BadName));
        assert!(!fault.is_fault(FaultCode::AlreadyStarted));

        let decode = RpcError::decode("supervisor.getAPIVersion", "expected string", "<x/>");
        assert_eq!(decode.kind(), ErrorKind::Decode);
        assert_eq!(decode.fault_code(), None);
    }

    #[test]
    fn test_remote_call_display() {
        let err = RpcError::RemoteCall {
            method: "supervisor.stopProcess".to_string(),
            code: 70,
            message: "NOT_RUNNING: web".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "supervisor.stopProcess failed with fault 70: NOT_RUNNING: web"
        );
    }

    #[test]
    fn test_decode_payload_is_truncated_on_char_boundary() {
        let payload = "é".repeat(MAX_PAYLOAD_BYTES);
        let RpcError::Decode { payload, .. } = RpcError::decode("m", "bad", &payload) else {
            panic!("expected decode error");
        };
        assert!(payload.len() <= MAX_PAYLOAD_BYTES);
        assert!(payload.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::RemoteCall.to_string(), "remote_call");
        assert_eq!(ErrorKind::Timeout.as_str(), "timeout");
    }
}
