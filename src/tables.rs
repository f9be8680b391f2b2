use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::RemoteError;
use crate::id::Handle;
use crate::shape::Shape;
use crate::value::Method;

/// Registry mapping a [`Handle`] to the exported callable it was
/// minted for. Append-only for the life of a session (§9 of the
/// specification: no finalize/GC protocol in the core).
#[derive(Default)]
pub struct MethodTable {
    methods: Mutex<HashMap<Handle, Arc<dyn Method>>>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, handle: Handle, method: Arc<dyn Method>) {
        self.methods.lock().insert(handle, method);
    }

    pub fn get(&self, handle: &Handle) -> Option<Arc<dyn Method>> {
        self.methods.lock().get(handle).cloned()
    }

    pub fn len(&self) -> usize {
        self.methods.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type Settlement = std::result::Result<Shape, RemoteError>;

/// Registry mapping a pending reply's [`Handle`] to the
/// [`oneshot::Sender`] that will wake the proxy call awaiting it.
/// Entries are removed the moment they're settled (by a `Return` or
/// `Error` message) or torn down on transport failure.
#[derive(Default)]
pub struct ReplyTable {
    pending: Mutex<HashMap<Handle, oneshot::Sender<Settlement>>>,
}

impl ReplyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pending reply, returning the receiver half the
    /// caller should await.
    pub fn register(&self, handle: Handle) -> oneshot::Receiver<Settlement> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(handle, tx);
        rx
    }

    /// Pop and settle the entry for `handle`, if still pending.
    /// Returns `false` if there was no matching entry (an
    /// `OrphanReply`, per the specification's error taxonomy).
    pub fn settle(&self, handle: &Handle, result: Settlement) -> bool {
        match self.pending.lock().remove(handle) {
            Some(tx) => {
                let _ = tx.send(result);
                true
            }
            None => false,
        }
    }

    /// Remove and reject every pending entry, used when the transport
    /// fails: no further `Return`/`Error` will ever arrive for them.
    pub fn reject_all(&self, error: RemoteError) {
        let mut pending = self.pending.lock();
        for (_, tx) in pending.drain() {
            let _ = tx.send(Err(error.clone()));
        }
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }
}
