use serde::{Deserialize, Serialize};

use crate::error::{CapnodeError, CapnodeErrorKind, Result};
use crate::id::Handle;
use crate::shape::Shape;

/// A message exchanged between two Capnodes. See the module-level
/// wire format documentation in `capnode::message` / the crate docs.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Init {
        value: Shape,
    },
    Invocation {
        #[serde(rename = "methodId")]
        method_id: Handle,
        arguments: Vec<Shape>,
        #[serde(rename = "replyId")]
        reply_id: Handle,
    },
    Return {
        #[serde(rename = "methodId")]
        method_id: Handle,
        value: Shape,
    },
    Error {
        #[serde(rename = "methodId")]
        method_id: Handle,
        value: ErrorValue,
    },
}

/// Payload of an `Error` message: a remote error rendered as plain
/// text, not the sender's [`CapnodeError`](crate::error::CapnodeError)
/// (which is a local-only type; only its rendered message/stack
/// crosses the wire).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ErrorValue {
    pub message: String,
    pub stack: String,
}

impl Message {
    /// Decode a `Message` from a raw JSON value (as read off a wire
    /// transport). An unrecognized `type` tag or a structurally
    /// malformed payload is reported as `CapnodeErrorKind::ProtocolError`
    /// rather than propagated as a bare `serde_json::Error`.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| CapnodeError::with_cause(CapnodeErrorKind::ProtocolError, "malformed message", e))
    }

    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self)
            .map_err(|e| CapnodeError::with_cause(CapnodeErrorKind::ProtocolError, "failed to encode message", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_round_trips_through_json() {
        let msg = Message::Invocation {
            method_id: Handle::from_raw("abc123"),
            arguments: vec![],
            reply_id: Handle::from_raw("def456"),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "invocation");
        assert_eq!(json["methodId"], "abc123");
        assert_eq!(json["replyId"], "def456");
        let back: Message = serde_json::from_value(json).unwrap();
        match back {
            Message::Invocation { method_id, reply_id, .. } => {
                assert_eq!(method_id.as_str(), "abc123");
                assert_eq!(reply_id.as_str(), "def456");
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn unknown_type_fails_to_deserialize() {
        let raw = serde_json::json!({"type": "bogus"});
        let res = Message::from_json_value(raw);
        let err = res.unwrap_err();
        assert_eq!(err.kind, CapnodeErrorKind::ProtocolError);
    }
}
