use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::dispatcher;
use crate::error::Result;
use crate::message::Message;
use crate::peer::Peer;

/// Capacity of the channel backing [`DuplexStream`]'s outbound half.
/// Bounds how far the Outbound Queue's drain task can run ahead of a
/// slow reader before it blocks -- the "downstream readiness" signal
/// described in the specification's Transport Adapter section.
const OUTBOUND_CAPACITY: usize = 64;

/// The object-mode duplex stream a [`Capnode`](crate::Capnode) exposes
/// via `attach_stream`. Reading it (via its [`Stream`] impl) yields
/// messages this Capnode wants sent over the wire, in offer order;
/// writing to it (via [`DuplexStream::write`]) feeds inbound wire
/// messages to the Dispatcher.
///
/// Two Capnodes are connected by piping each one's outbound stream
/// into the other's `write` -- see [`pipe`].
pub struct DuplexStream {
    outbound_rx: mpsc::Receiver<Message>,
    peer: Arc<Peer>,
}

impl DuplexStream {
    pub(crate) fn new(peer: Arc<Peer>) -> Self {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        peer.attach_outbound(tx);
        DuplexStream { outbound_rx: rx, peer }
    }

    /// Feed one inbound message to this Capnode's Dispatcher.
    pub async fn write(&self, msg: Message) -> Result<()> {
        dispatcher::receive(&self.peer, msg).await
    }
}

impl Stream for DuplexStream {
    type Item = Message;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Message>> {
        self.outbound_rx.poll_recv(cx)
    }
}

/// Connect two Capnodes' streams bidirectionally: everything `a`
/// offers is fed to `b`'s Dispatcher and vice versa. Spawns two
/// forwarding tasks and returns immediately; the pipe runs until
/// either stream closes.
pub async fn pipe(a: DuplexStream, b: DuplexStream) {
    let (mut a_rx, a_write) = (a.outbound_rx, a.peer);
    let (mut b_rx, b_write) = (b.outbound_rx, b.peer);

    let a_to_b = {
        let b_write = b_write.clone();
        tokio::spawn(async move {
            while let Some(msg) = a_rx.recv().await {
                if dispatcher::receive(&b_write, msg).await.is_err() {
                    break;
                }
            }
        })
    };
    let b_to_a = tokio::spawn(async move {
        while let Some(msg) = b_rx.recv().await {
            if dispatcher::receive(&a_write, msg).await.is_err() {
                break;
            }
        }
    });

    let _ = tokio::join!(a_to_b, b_to_a);
}
