use std::sync::Arc;

use crate::error::Result;
use crate::id::{DefaultIdSource, IdSource};
use crate::message::Message;
use crate::peer::{Listener, ListenerId, Peer};
use crate::reconstructor;
use crate::shape::Shape;
use crate::transport::DuplexStream;
use crate::value::ApiValue;

/// One endpoint of the capability-passing RPC runtime.
///
/// A `Capnode` is created empty, populated with [`expose`](Capnode::expose),
/// optionally wired to a transport with [`attach_stream`](Capnode::attach_stream)
/// (or driven purely through [`receive`](Capnode::receive) and
/// [`add_listener`](Capnode::add_listener)), and torn down as a whole --
/// there is no per-capability revocation in the core (see `SPEC_FULL.md` §9).
///
/// Cloning a `Capnode` is cheap and shares the same Method Table, Reply
/// Table, and Outbound Queue; clones refer to the same peer.
#[derive(Clone)]
pub struct Capnode {
    peer: Arc<Peer>,
}

impl Default for Capnode {
    fn default() -> Self {
        Self::new()
    }
}

impl Capnode {
    /// Create an empty Capnode using the default CSPRNG-backed
    /// [`IdSource`].
    pub fn new() -> Self {
        Self::with_id_source(Arc::new(DefaultIdSource))
    }

    /// Create an empty Capnode using a caller-supplied [`IdSource`]
    /// (a deterministic source in tests, a hardware RNG, etc).
    pub fn with_id_source(ids: Arc<dyn IdSource>) -> Self {
        Capnode { peer: Peer::new(ids) }
    }

    /// Register every function in `local_api` in the Method Table and
    /// return the transmittable [`Shape`] describing it. Fails only if
    /// `local_api` is nested beyond the supported depth (see
    /// `registrar::MAX_DEPTH`); the owned-tree `ApiValue` representation
    /// makes true reference cycles unrepresentable.
    pub fn expose(&self, local_api: ApiValue) -> Result<Shape> {
        let shape = self.peer.serialize(&local_api)?;
        self.peer.set_exposed_shape(shape.clone());
        Ok(shape)
    }

    /// Reconstruct a shape received from the peer into a local mirror,
    /// with function leaves materialized as callable proxies.
    pub fn adopt(&self, remote_shape: &Shape) -> ApiValue {
        reconstructor::deserialize(remote_shape, &self.peer)
    }

    /// Feed one inbound message to the Dispatcher.
    pub async fn receive(&self, message: Message) -> Result<()> {
        crate::dispatcher::receive(&self.peer, message).await
    }

    /// Subscribe to every message this Capnode offers to its
    /// Transport Adapter. Returns a token usable with
    /// [`remove_listener`](Capnode::remove_listener).
    pub fn add_listener<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.peer.add_listener(Arc::new(f) as Listener)
    }

    pub fn remove_listener(&self, id: ListenerId) {
        self.peer.remove_listener(id);
    }

    /// The remote peer's mirror, if an `Init` has been adopted.
    pub fn remote_api(&self) -> Option<ApiValue> {
        self.peer.remote_api()
    }

    /// Attach an object-mode duplex stream. If an API has already been
    /// exposed, publishes an `Init` message carrying its shape
    /// immediately; otherwise the caller is responsible for calling
    /// [`expose`](Capnode::expose) (which does not itself emit `Init` --
    /// only `attach_stream` does, matching the specification's
    /// redesigned "require an exposed API before `Init`" semantics:
    /// attaching before exposing simply sends no `Init` at all).
    pub fn attach_stream(&self) -> DuplexStream {
        let stream = DuplexStream::new(self.peer.clone());
        if let Some(shape) = self.peer.exposed_shape() {
            self.peer.send(Message::Init { value: shape });
        }
        stream
    }

    /// Attach a stream and resolve once the first inbound `Init` has
    /// been adopted, yielding a clone of this Capnode for convenience.
    pub async fn attach_stream_awaiting_init(&self) -> (DuplexStream, Capnode) {
        let stream = self.attach_stream();
        self.peer.await_init().await;
        (stream, self.clone())
    }

    /// Resolve once this Capnode has adopted a remote `Init`,
    /// immediately if it already has. Unlike
    /// [`attach_stream_awaiting_init`](Capnode::attach_stream_awaiting_init),
    /// this does not itself attach a stream -- useful alongside
    /// [`connect`], which attaches both sides' streams internally.
    pub async fn await_remote(&self) {
        self.peer.await_init().await;
    }

    /// `true` once this Capnode has adopted a remote `Init`.
    pub fn has_remote(&self) -> bool {
        self.peer.has_remote()
    }
}

/// Helper used by tests and simple in-process demos: wire two
/// Capnodes' streams together so each one's `Init` seeds the other's
/// remote API, per the pipe topology in the specification's Transport
/// Adapter section. Spawns the forwarding loops and returns
/// immediately; the pipe keeps running in the background until either
/// stream closes.
pub fn connect(a: &Capnode, b: &Capnode) {
    let a_stream = a.attach_stream();
    let b_stream = b.attach_stream();
    tokio::spawn(crate::transport::pipe(a_stream, b_stream));
}
