use std::sync::Arc;

use crate::error::{RemoteError, Result};
use crate::id::Handle;
use crate::message::{ErrorValue, Message};
use crate::peer::Peer;
use crate::reconstructor::{self, error_to_wire};
use crate::shape::Shape;
use crate::value::Method;

/// Route one inbound message. `Invocation`s are handed off to their
/// own spawned task (see [`invoke`]) so a slow method body never
/// blocks the processing of messages that arrive after it --
/// property #6 in the specification's testable-properties list.
pub async fn receive(peer: &Arc<Peer>, msg: Message) -> Result<()> {
    match msg {
        Message::Init { value } => {
            let api = reconstructor::deserialize(&value, peer);
            peer.adopt_remote(api)?;
            Ok(())
        }
        Message::Invocation {
            method_id,
            arguments,
            reply_id,
        } => {
            let peer = peer.clone();
            tokio::spawn(async move {
                invoke(peer, method_id, arguments, reply_id).await;
            });
            Ok(())
        }
        Message::Return { method_id, value } => {
            if !peer.replies().settle(&method_id, Ok(value)) {
                tracing::debug!(reply_id = %method_id, "dropping Return for unknown reply (orphan reply)");
            }
            Ok(())
        }
        Message::Error { method_id, value } => {
            let remote = RemoteError {
                message: value.message,
                stack: value.stack,
            };
            if !peer.replies().settle(&method_id, Err(remote)) {
                tracing::debug!(reply_id = %method_id, "dropping Error for unknown reply (orphan reply)");
            }
            Ok(())
        }
    }
}

async fn invoke(peer: Arc<Peer>, method_id: Handle, arguments: Vec<Shape>, reply_id: Handle) {
    let method = match peer.methods().get(&method_id) {
        Some(m) => m,
        None => {
            tracing::warn!(method_id = %method_id, "invocation referenced unknown method");
            peer.send(Message::Error {
                method_id: reply_id,
                value: ErrorValue {
                    message: format!("unknown methodId: {}", method_id),
                    stack: String::new(),
                },
            });
            return;
        }
    };

    let args = arguments.iter().map(|s| reconstructor::deserialize(s, &peer)).collect();

    let outcome = method.call(args).await;
    let msg = match outcome {
        Ok(result) => match peer.serialize(&result) {
            Ok(shape) => Message::Return {
                method_id: reply_id,
                value: shape,
            },
            Err(e) => Message::Error {
                method_id: reply_id,
                value: error_to_wire(&e),
            },
        },
        Err(e) => Message::Error {
            method_id: reply_id,
            value: error_to_wire(&e),
        },
    };
    peer.send(msg);
}
