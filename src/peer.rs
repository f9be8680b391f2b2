use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot, Notify};

use crate::error::{CapnodeError, CapnodeErrorKind, Result};
use crate::id::{Handle, IdSource};
use crate::message::Message;
use crate::registrar;
use crate::shape::Shape;
use crate::tables::{MethodTable, ReplyTable};
use crate::value::ApiValue;

/// Subscriber added via [`Capnode::add_listener`](crate::Capnode::add_listener).
/// Invoked, synchronously, with every message this Capnode offers to
/// its Transport Adapter -- the same fan-out a stream receives.
pub type Listener = Arc<dyn Fn(&Message) + Send + Sync>;

/// Opaque token returned by `add_listener`, usable to unsubscribe.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ListenerId(u64);

/// The remote API, once adopted, plus anyone still waiting for it.
/// Held behind a single lock so "has `Init` already been adopted?"
/// and "register to be woken when it is" are never two separate
/// operations -- split across two locks (or a lock plus a racing
/// atomic), a waiter could check before adoption, lose the race to
/// register before `adopt_remote` drains, and wait forever.
#[derive(Default)]
struct RemoteState {
    api: Option<ApiValue>,
    waiters: Vec<oneshot::Sender<()>>,
}

/// Shared state behind a [`Capnode`](crate::Capnode): the Method
/// Table, Reply Table, listener set, and Outbound Queue described in
/// the specification. Always accessed through an `Arc`, since proxies
/// and spawned invocation handlers must be able to outlive the call
/// that created them.
pub(crate) struct Peer {
    ids: Arc<dyn IdSource>,
    methods: MethodTable,
    replies: ReplyTable,
    listeners: RwLock<HashMap<u64, Listener>>,
    next_listener_id: AtomicU64,
    outbound_queue: Mutex<VecDeque<Message>>,
    outbound_notify: Notify,
    exposed_shape: Mutex<Option<Shape>>,
    remote: Mutex<RemoteState>,
}

impl Peer {
    pub fn new(ids: Arc<dyn IdSource>) -> Arc<Self> {
        Arc::new(Peer {
            ids,
            methods: MethodTable::new(),
            replies: ReplyTable::new(),
            listeners: RwLock::new(HashMap::new()),
            next_listener_id: AtomicU64::new(0),
            outbound_queue: Mutex::new(VecDeque::new()),
            outbound_notify: Notify::new(),
            exposed_shape: Mutex::new(None),
            remote: Mutex::new(RemoteState::default()),
        })
    }

    pub fn next_handle(&self) -> Handle {
        self.ids.next_handle()
    }

    pub fn serialize(&self, value: &ApiValue) -> Result<Shape> {
        registrar::serialize(value, &self.methods, self.ids.as_ref())
    }

    pub fn methods(&self) -> &MethodTable {
        &self.methods
    }

    pub fn replies(&self) -> &ReplyTable {
        &self.replies
    }

    pub fn add_listener(&self, f: Listener) -> ListenerId {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.write().insert(id, f);
        ListenerId(id)
    }

    pub fn remove_listener(&self, id: ListenerId) {
        self.listeners.write().remove(&id.0);
    }

    /// Offer a message to the Transport Adapter: fan it out to every
    /// listener, then append it to the Outbound Queue for whichever
    /// stream (if any) is attached. Never blocks.
    pub fn send(&self, msg: Message) {
        let listeners: Vec<Listener> = self.listeners.read().values().cloned().collect();
        for listener in &listeners {
            listener(&msg);
        }
        self.outbound_queue.lock().push_back(msg);
        self.outbound_notify.notify_one();
    }

    /// Attach an outbound channel and spawn the task that drains the
    /// Outbound Queue into it. The drain task blocks on `sender.send`
    /// when the channel is at capacity -- that block *is* the
    /// `readerReady = false` state from the specification; once the
    /// send completes, readiness is implicitly restored and the loop
    /// continues.
    pub fn attach_outbound(self: &Arc<Self>, sender: mpsc::Sender<Message>) {
        let peer = self.clone();
        tokio::spawn(async move { peer.drain_loop(sender).await });
    }

    async fn drain_loop(self: Arc<Self>, sender: mpsc::Sender<Message>) {
        loop {
            let next = self.outbound_queue.lock().pop_front();
            match next {
                Some(msg) => {
                    if sender.send(msg).await.is_err() {
                        self.fail_transport("outbound channel closed");
                        return;
                    }
                }
                None => self.outbound_notify.notified().await,
            }
        }
    }

    pub fn set_exposed_shape(&self, shape: Shape) {
        *self.exposed_shape.lock() = Some(shape);
    }

    pub fn exposed_shape(&self) -> Option<Shape> {
        self.exposed_shape.lock().clone()
    }

    pub fn remote_api(&self) -> Option<ApiValue> {
        self.remote.lock().api.clone()
    }

    /// Adopt `api` as the remote API and mark `Init` as received.
    /// Returns an error if `Init` was already adopted once (the
    /// specification's redesigned, non-permissive behavior -- see
    /// `SPEC_FULL.md` §9).
    pub fn adopt_remote(&self, api: ApiValue) -> Result<()> {
        let mut state = self.remote.lock();
        if state.api.is_some() {
            return Err(CapnodeError::new(
                CapnodeErrorKind::ProtocolError,
                "received a second Init after one was already adopted",
            ));
        }
        state.api = Some(api);
        for waiter in state.waiters.drain(..) {
            let _ = waiter.send(());
        }
        Ok(())
    }

    pub fn has_remote(&self) -> bool {
        self.remote.lock().api.is_some()
    }

    /// Resolve once `adopt_remote` has run, immediately if it already has.
    pub async fn await_init(&self) {
        let rx = {
            let mut state = self.remote.lock();
            if state.api.is_some() {
                return;
            }
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            rx
        };
        let _ = rx.await;
    }

    /// Tear down in response to a broken transport: reject every
    /// pending proxy call, since no further `Return`/`Error` can ever
    /// arrive for them.
    pub fn fail_transport(&self, reason: &str) {
        tracing::error!(reason, "capnode transport failed; rejecting pending replies");
        self.replies.reject_all(crate::error::RemoteError {
            message: format!("transport failure: {}", reason),
            stack: String::new(),
        });
    }
}
