use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{CapnodeError, CapnodeErrorKind, Result};
use crate::message::{ErrorValue, Message};
use crate::peer::Peer;
use crate::shape::Shape;
use crate::value::{ApiValue, Method};

/// Walks a received [`Shape`], producing a local mirror: primitives
/// and containers become the matching `ApiValue` variants, and every
/// `function` leaf becomes a [`Proxy`] bound to `peer` under that
/// leaf's `methodId`.
pub fn deserialize(shape: &Shape, peer: &Arc<Peer>) -> ApiValue {
    match shape {
        Shape::Str { value } => ApiValue::String(value.clone()),
        Shape::Number { value } => ApiValue::Number(value.clone()),
        Shape::Array { value } => ApiValue::Array(value.iter().map(|s| deserialize(s, peer)).collect()),
        Shape::Object { value } => {
            ApiValue::Object(value.iter().map(|(k, s)| (k.clone(), deserialize(s, peer))).collect())
        }
        Shape::Function { method_id } => ApiValue::Function(Arc::new(Proxy {
            peer: peer.clone(),
            method_id: method_id.clone(),
        })),
    }
}

/// A locally callable standing in for a function exported by the
/// remote peer. Calling it serializes the arguments (registering any
/// callbacks passed in as new local Method Table entries), emits an
/// `Invocation`, and awaits the correlated `Return`/`Error`.
struct Proxy {
    peer: Arc<Peer>,
    method_id: crate::id::Handle,
}

#[async_trait]
impl Method for Proxy {
    async fn call(&self, args: Vec<ApiValue>) -> Result<ApiValue> {
        let mut shapes = Vec::with_capacity(args.len());
        for arg in &args {
            shapes.push(self.peer.serialize(arg)?);
        }
        let reply_id = self.peer.next_handle();
        let rx = self.peer.replies().register(reply_id.clone());
        self.peer.send(Message::Invocation {
            method_id: self.method_id.clone(),
            arguments: shapes,
            reply_id,
        });

        match rx.await {
            Ok(Ok(shape)) => Ok(deserialize(&shape, &self.peer)),
            Ok(Err(remote_err)) => Err(CapnodeError::with_cause(
                CapnodeErrorKind::MethodFailure,
                remote_err.message.clone(),
                remote_err,
            )),
            Err(_) => Err(CapnodeError::new(
                CapnodeErrorKind::TransportFailure,
                "transport closed before a reply arrived",
            )),
        }
    }
}

/// Render a [`CapnodeError`] as the wire `ErrorValue` payload of an
/// `Error` message, truncating oversized fields per the specification.
pub(crate) fn error_to_wire(err: &CapnodeError) -> ErrorValue {
    ErrorValue {
        message: crate::error::truncate_field(err.message()),
        stack: crate::error::truncate_field(&err.to_string()),
    }
}
