use std::fmt;

use serde::{Deserialize, Serialize};

/// Generic serializable error with a description and optional
/// cause. Used when forwarding a remote peer's `Error` message, or
/// any other error, across the wire.
#[derive(Debug, Deserialize, Serialize)]
pub struct GenericSerializableError {
    description: String,
    cause: Option<Box<GenericSerializableError>>,
}

impl GenericSerializableError {
    pub fn new(e: impl std::error::Error) -> Self {
        Self::from_dyn(&e)
    }

    /// Create a `GenericSerializableError` from a trait object. This
    /// preserves the description and cause of the error (as another
    /// `GenericSerializableError`), but the specific type and
    /// backtrace of the error are lost.
    pub fn from_dyn(e: &dyn std::error::Error) -> Self {
        let cause = e.source().map(|ec| Box::new(GenericSerializableError::from_dyn(ec)));
        GenericSerializableError {
            description: e.to_string(),
            cause,
        }
    }
}

impl std::error::Error for GenericSerializableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.cause {
            Some(ref e) => Some(e),
            None => None,
        }
    }
}

impl fmt::Display for GenericSerializableError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.cause {
            Some(ref e) => write!(f, "{} caused by:\n {}", self.description, e),
            None => write!(f, "{}", self.description),
        }
    }
}

/// Taxonomy of errors a [`Capnode`](crate::Capnode) may raise locally.
/// Only [`MethodFailure`](CapnodeErrorKind::MethodFailure) ever crosses
/// the wire (as the `value` of an `Error` message); the rest are local
/// to the peer that observed them.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub enum CapnodeErrorKind {
    /// Malformed message, unknown message type, or a repeat `Init`.
    ProtocolError,
    /// An inbound `Invocation` named a `methodId` with no Method Table entry.
    UnknownMethod,
    /// A locally exposed method's future rejected.
    MethodFailure,
    /// A value could not be serialized or deserialized, or contained a cycle.
    InvalidValue,
    /// The underlying stream closed or errored.
    TransportFailure,
}

/// Error raised by Capnode's serializer, reconstructor, or dispatcher.
///
/// Mirrors the shape of an RPC error: a kind, a human-readable
/// message, and an optional cause chain, so it can be carried as the
/// `value` of a wire `Error` message without losing the cause.
#[derive(Debug, Deserialize, Serialize)]
pub struct CapnodeError {
    pub kind: CapnodeErrorKind,
    msg: String,
    cause: Option<Box<GenericSerializableError>>,
}

impl CapnodeError {
    pub fn new(kind: CapnodeErrorKind, msg: impl Into<String>) -> Self {
        CapnodeError {
            kind,
            msg: msg.into(),
            cause: None,
        }
    }

    pub fn with_cause(kind: CapnodeErrorKind, msg: impl Into<String>, cause: impl std::error::Error) -> Self {
        CapnodeError {
            kind,
            msg: msg.into(),
            cause: Some(Box::new(GenericSerializableError::new(cause))),
        }
    }

    pub fn cause(&self) -> Option<&GenericSerializableError> {
        self.cause.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.msg
    }
}

impl fmt::Display for CapnodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.cause {
            Some(ref e) => write!(f, "{} caused by:\n {}", self.msg, e),
            None => write!(f, "{}", self.msg),
        }
    }
}

impl std::error::Error for CapnodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.cause {
            Some(ref e) => Some(e),
            None => None,
        }
    }
}

/// Error reported by the remote peer via an `Error` message, carrying
/// the wire-level `message`/`stack` pair rather than a `CapnodeErrorKind`
/// (the remote side's kind taxonomy is not transmitted).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RemoteError {
    pub message: String,
    pub stack: String,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RemoteError {}

/// Size cap (bytes, post-UTF8-encoding) applied to `message`/`stack`
/// before a `MethodFailure` is forwarded to the peer as an `Error`
/// message.
pub const MAX_ERROR_FIELD_LEN: usize = 8 * 1024;

pub(crate) fn truncate_field(s: &str) -> String {
    if s.len() <= MAX_ERROR_FIELD_LEN {
        s.to_string()
    } else {
        let mut cut = MAX_ERROR_FIELD_LEN;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... (truncated)", &s[..cut])
    }
}

pub type Result<T> = std::result::Result<T, CapnodeError>;
