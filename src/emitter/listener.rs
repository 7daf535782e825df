//! Listener registrations and subscription handles.

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use super::Emitter;

/// Untyped failure value produced by a fallible listener.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Identity of one listener registration.
///
/// Assigned fresh for every registration, so registering the same closure
/// twice yields two independent listeners.
pub type ListenerId = u64;

pub(crate) type SyncFn<T> = dyn Fn(&T) -> Result<(), ListenerError> + Send + Sync;
pub(crate) type TaskFn<T> = dyn Fn(T) -> BoxFuture<'static, Result<(), ListenerError>> + Send + Sync;

/// The declared execution contract of a listener: synchronous, or a deferred
/// task whose eventual failure is observed out-of-band.
pub(crate) enum Callback<T> {
    Sync(Arc<SyncFn<T>>),
    Task(Arc<TaskFn<T>>),
}

impl<T> Clone for Callback<T> {
    fn clone(&self) -> Self {
        match self {
            Callback::Sync(f) => Callback::Sync(Arc::clone(f)),
            Callback::Task(f) => Callback::Task(Arc::clone(f)),
        }
    }
}

/// One entry in a channel's ordered listener list.
///
/// `once` registrations carry their fired flag here, shared with every
/// emission snapshot, so a one-shot listener cannot double-fire even under
/// re-entrant emission.
pub(crate) struct ListenerEntry<T> {
    pub(crate) id: ListenerId,
    pub(crate) callback: Callback<T>,
    pub(crate) once: Option<Arc<AtomicBool>>,
}

impl<T> Clone for ListenerEntry<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: self.callback.clone(),
            once: self.once.clone(),
        }
    }
}

/// Handle to one listener registration.
///
/// [`unsubscribe`](Subscription::unsubscribe) removes exactly the
/// registration this handle was returned for. Calling it more than once is a
/// no-op: removal targets the unique [`ListenerId`], so a listener re-added
/// after the first removal is never affected. Dropping the handle does *not*
/// unsubscribe.
pub struct Subscription {
    emitter: Emitter,
    key: u64,
    id: ListenerId,
}

impl Subscription {
    pub(crate) fn new(emitter: Emitter, key: u64, id: ListenerId) -> Self {
        Self { emitter, key, id }
    }

    /// Remove the registration this handle refers to. Idempotent.
    pub fn unsubscribe(&self) {
        self.emitter.remove_listener(self.key, self.id);
    }

    /// The id of the underlying registration, usable with
    /// [`Emitter::off`](super::Emitter::off).
    pub fn listener_id(&self) -> ListenerId {
        self.id
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}
