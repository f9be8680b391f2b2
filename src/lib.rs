//! Capnode is an object-capability RPC runtime: two peers expose
//! trees of values and async functions to each other over a duplex
//! object channel.
//!
//! A peer builds an [`ApiValue`] tree -- primitives, nested objects
//! and arrays, and async function leaves -- and [`Capnode::expose`]s
//! it, which registers every function in a local Method Table and
//! returns a [`Shape`]: the same tree with function leaves replaced
//! by opaque [`Handle`]s. The peer on the other end of the channel
//! [`Capnode::adopt`]s that shape, producing a local mirror where
//! function leaves are callable proxies. Calling a proxy serializes
//! its arguments (which may themselves contain callbacks -- capability
//! passing is bidirectional), ships an `Invocation` message, and
//! resolves once a correlated `Return` or `Error` arrives.
//!
//! ```no_run
//! use capnode::{ApiValue, Capnode, Method};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let server = Capnode::new();
//! let api = ApiValue::object(vec![(
//!     "greet".to_string(),
//!     ApiValue::function(|args| {
//!         Box::pin(async move {
//!             let name = args[0].as_str().unwrap_or("world");
//!             Ok(ApiValue::str(format!("hello, {}!", name)))
//!         })
//!     }),
//! )]);
//! server.expose(api)?;
//!
//! let client = Capnode::new();
//! capnode::connect(&server, &client);
//! client.await_remote().await;
//!
//! let remote = client.remote_api().unwrap();
//! let greet = remote.as_object().unwrap().get("greet").unwrap().clone();
//! if let ApiValue::Function(f) = greet {
//!     let reply = f.call(vec![ApiValue::str("ada")]).await?;
//!     assert_eq!(reply.as_str(), Some("hello, ada!"));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The core assumes an ordered, reliable, bidirectional message
//! channel supplied by a collaborator; concrete wire framing,
//! authentication, and process entry points are out of scope, as is
//! garbage collection of exported capabilities (the Method Table is
//! append-only for the life of a session). See `SPEC_FULL.md` in the
//! repository for the full design rationale.

#![allow(clippy::type_repetition_in_bounds)]

mod capnode;
mod dispatcher;
mod error;
mod id;
mod message;
mod peer;
mod reconstructor;
mod registrar;
mod shape;
mod tables;
mod transport;
mod value;

pub use crate::capnode::{connect, Capnode};
pub use crate::error::{CapnodeError, CapnodeErrorKind, GenericSerializableError, RemoteError, Result};
pub use crate::id::{DefaultIdSource, Handle, IdSource};
pub use crate::message::{ErrorValue, Message};
pub use crate::peer::ListenerId;
pub use crate::shape::Shape;
pub use crate::transport::DuplexStream;
pub use crate::value::{ApiValue, BoxFuture, Method};
