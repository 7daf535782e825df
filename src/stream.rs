//! Bridge from push-based subscription to a pull-based, cancellable stream.
//!
//! [`Emitter::subscribe`] registers one internal listener and returns an
//! [`EventStream`]: a single-pass async sequence of payloads. Deliveries
//! that arrive while no consumer is waiting are buffered in an unbounded
//! FIFO and drained oldest-first; a suspended pull is resumed by the next
//! delivery or by cancellation, whichever comes first. Each `subscribe` call
//! is an independent sequence.
//!
//! Termination by any path (cancellation, dropping the stream, or the
//! producer side going away) detaches the internal listener and the
//! cancellation observer exactly once, leaving the emitter's table clean
//! even when the consumer keeps the terminated stream around.
//!
//! ```
//! use eventry::{CancellationToken, Emitter, EventRegistry};
//! use futures_util::StreamExt;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = EventRegistry::new();
//! let ticks = registry.mint::<u32>("clock.ticks").unwrap();
//! let emitter = Emitter::new();
//!
//! let cancel = CancellationToken::new();
//! let mut stream = emitter.subscribe(&ticks, cancel.clone());
//!
//! emitter.emit(&ticks, 1);
//! emitter.emit(&ticks, 2);
//! assert_eq!(stream.next().await, Some(1));
//! assert_eq!(stream.next().await, Some(2));
//!
//! cancel.cancel();
//! assert_eq!(stream.next().await, None);
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use crate::emitter::{Emitter, Payload, Subscription};
use crate::registry::EventId;

impl Emitter {
    /// Turn `event` into a pull-based async sequence of payloads.
    ///
    /// If `cancel` is already cancelled, the stream is immediately empty and
    /// no listener is registered. Otherwise exactly one internal listener is
    /// registered; it is removed again when the stream terminates, whichever
    /// way that happens.
    ///
    /// Cancellation ends the stream at its next poll without flushing
    /// already-buffered payloads, and promptly resumes a pull that is
    /// suspended at that moment.
    pub fn subscribe<T: Payload>(
        &self,
        event: &EventId<T>,
        cancel: CancellationToken,
    ) -> EventStream<T> {
        let (sender, receiver) = mpsc::unbounded_channel();
        if cancel.is_cancelled() {
            return EventStream {
                receiver,
                subscription: None,
                cancelled: None,
                finished: true,
            };
        }
        let subscription = self.on(event, move |payload: &T| {
            // The consumer may already be gone; a failed send is dropped
            // here and the listener is removed on stream teardown.
            let _ = sender.send(payload.clone());
        });
        EventStream {
            receiver,
            subscription: Some(subscription),
            cancelled: Some(Box::pin(cancel.cancelled_owned())),
            finished: false,
        }
    }
}

/// Single-pass, cancellable async sequence of payloads for one event.
///
/// Produced by [`Emitter::subscribe`]; consume it through the
/// [`Stream`] trait or the [`recv`](EventStream::recv) /
/// [`next_timeout`](EventStream::next_timeout) helpers.
pub struct EventStream<T> {
    receiver: mpsc::UnboundedReceiver<T>,
    subscription: Option<Subscription>,
    cancelled: Option<Pin<Box<WaitForCancellationFutureOwned>>>,
    finished: bool,
}

impl<T> EventStream<T> {
    /// Receive the next payload, awaiting if the buffer is empty. Returns
    /// `None` once the stream has terminated.
    pub async fn recv(&mut self) -> Option<T> {
        self.next().await
    }

    /// Wait up to `duration` for the next payload.
    pub async fn next_timeout(&mut self, duration: Duration) -> Option<T> {
        timeout(duration, self.recv()).await.ok().flatten()
    }

    /// Tear down exactly once: unregister the internal listener, release the
    /// cancellation observer, and stop accepting buffered deliveries. A
    /// terminated stream the consumer keeps around holds nothing back.
    fn detach(&mut self) {
        self.finished = true;
        self.cancelled = None;
        if let Some(subscription) = self.subscription.take() {
            tracing::trace!(subscription = ?subscription, "event stream detached");
            subscription.unsubscribe();
        }
        self.receiver.close();
    }
}

impl<T> Stream for EventStream<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        // Cancellation wins over buffered payloads: observed here, at the
        // next pull, per the contract in the module docs.
        if let Some(observer) = this.cancelled.as_mut() {
            if observer.as_mut().poll(cx).is_ready() {
                this.detach();
                return Poll::Ready(None);
            }
        }
        match this.receiver.poll_recv(cx) {
            Poll::Ready(Some(payload)) => Poll::Ready(Some(payload)),
            Poll::Ready(None) => {
                this.detach();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Drop for EventStream<T> {
    fn drop(&mut self) {
        self.detach();
    }
}

impl<T> fmt::Debug for EventStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("finished", &self.finished)
            .field("attached", &self.subscription.is_some())
            .field("observing", &self.cancelled.is_some())
            .finish_non_exhaustive()
    }
}
