//! Synchronous fan-out of typed payloads to ordered listener lists.
//!
//! An [`Emitter`] owns one listener table: per event id, an ordered list of
//! registrations. [`emit`](Emitter::emit) broadcasts against a snapshot of
//! that list taken at the start of the call, so listeners added during an
//! emission run on the next one, and listeners removed mid-emission still
//! receive the current payload. Emission is re-entrant: a listener may call
//! back into the same emitter, and the nested emission runs to completion
//! before the outer snapshot resumes.
//!
//! Listener failures never reach the `emit` caller. A fallible listener's
//! `Err` (or a task listener's eventual `Err`) is wrapped in an
//! [`ErrorEnvelope`] and emitted on the reserved
//! [`LISTENER_ERRORS`](crate::LISTENER_ERRORS) channel, which follows the
//! same emission rules recursively. A thread-local depth guard caps that
//! recursion: sixty-four nested failures on the error channel are treated as
//! resource exhaustion and reported by panicking rather than looping forever.
//!
//! ```
//! use eventry::{Emitter, EventRegistry, ErrorEnvelope, LISTENER_ERRORS};
//! use std::sync::{Arc, Mutex};
//!
//! let registry = EventRegistry::new();
//! let jobs = registry.mint::<String>("jobs.started").unwrap();
//! let emitter = Emitter::new();
//!
//! let failures = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&failures);
//! emitter.on(&LISTENER_ERRORS, move |envelope: &ErrorEnvelope| {
//!     sink.lock().unwrap().push(envelope.error().to_string());
//! });
//!
//! emitter.on_fallible(&jobs, |_job: &String| Err("disk full".into()));
//! emitter.emit(&jobs, "nightly-backup".into());
//!
//! assert_eq!(*failures.lock().unwrap(), vec!["disk full".to_string()]);
//! ```

mod envelope;
mod listener;

pub use envelope::ErrorEnvelope;
pub use listener::{ListenerError, ListenerId, Subscription};

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::registry::{EventId, RawEventId, LISTENER_ERRORS};

use listener::{Callback, ListenerEntry};

/// Bound required of event payloads: cloned per listener and allowed to
/// cross into spawned failure-watcher tasks.
pub trait Payload: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Payload for T {}

/// Nested error-channel emissions past this depth indicate a listener on the
/// error channel that fails on every delivery; see [`module docs`](self).
const MAX_ERROR_EMIT_DEPTH: usize = 64;

thread_local! {
    static ERROR_EMIT_DEPTH: Cell<usize> = const { Cell::new(0) };
}

struct DepthGuard(usize);

impl Drop for DepthGuard {
    fn drop(&mut self) {
        let depth = self.0;
        ERROR_EMIT_DEPTH.with(|d| d.set(depth));
    }
}

/// Typed publish/subscribe emitter.
///
/// Cheap to clone; clones share one listener table. All methods take
/// `&self`, and the internal lock is never held while a listener runs, so
/// listeners may freely call `on`/`off`/`emit` on the same emitter.
#[derive(Clone)]
pub struct Emitter {
    inner: Arc<Inner>,
}

struct Inner {
    channels: Mutex<FxHashMap<u64, Box<dyn Channel>>>,
    next_listener_id: AtomicU64,
}

/// Per-event listener list, stored type-erased in the table and downcast
/// through the typed [`EventId`] that owns the key.
struct ChannelState<T> {
    entries: Vec<ListenerEntry<T>>,
}

trait Channel: Send {
    fn remove(&mut self, id: ListenerId) -> bool;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Payload> Channel for ChannelState<T> {
    fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Emitter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                channels: Mutex::new(FxHashMap::default()),
                next_listener_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a listener for `event`. Listeners run in registration order;
    /// registering the same closure twice yields two independent entries.
    pub fn on<T, F>(&self, event: &EventId<T>, listener: F) -> Subscription
    where
        T: Payload,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.on_fallible(event, move |payload| {
            listener(payload);
            Ok(())
        })
    }

    /// Register a fallible listener. An `Err` is caught, never propagated to
    /// the `emit` caller, and re-emitted on
    /// [`LISTENER_ERRORS`](crate::LISTENER_ERRORS) as an [`ErrorEnvelope`].
    pub fn on_fallible<T, F>(&self, event: &EventId<T>, listener: F) -> Subscription
    where
        T: Payload,
        F: Fn(&T) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.insert(event, Callback::Sync(Arc::new(listener)), None)
    }

    /// Register a listener returning a deferred computation.
    ///
    /// `emit` never awaits the returned future; it spawns a watcher task
    /// that funnels an eventual `Err` to the error channel out-of-band.
    /// Emitting to an event with task listeners therefore requires an
    /// ambient Tokio runtime.
    pub fn on_task<T, F>(&self, event: &EventId<T>, listener: F) -> Subscription
    where
        T: Payload,
        F: Fn(T) -> BoxFuture<'static, Result<(), ListenerError>> + Send + Sync + 'static,
    {
        self.insert(event, Callback::Task(Arc::new(listener)), None)
    }

    /// Like [`on`](Emitter::on), but the listener runs at most once: it is
    /// removed on first delivery, before its body runs. Unsubscribing before
    /// the event fires prevents it from ever running; unsubscribing after is
    /// a no-op.
    pub fn once<T, F>(&self, event: &EventId<T>, listener: F) -> Subscription
    where
        T: Payload,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.once_fallible(event, move |payload| {
            listener(payload);
            Ok(())
        })
    }

    /// One-shot variant of [`on_fallible`](Emitter::on_fallible).
    pub fn once_fallible<T, F>(&self, event: &EventId<T>, listener: F) -> Subscription
    where
        T: Payload,
        F: Fn(&T) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.register_once(event, Callback::Sync(Arc::new(listener)))
    }

    /// One-shot variant of [`on_task`](Emitter::on_task).
    pub fn once_task<T, F>(&self, event: &EventId<T>, listener: F) -> Subscription
    where
        T: Payload,
        F: Fn(T) -> BoxFuture<'static, Result<(), ListenerError>> + Send + Sync + 'static,
    {
        self.register_once(event, Callback::Task(Arc::new(listener)))
    }

    /// Remove the registration `id` from `event`'s list. No-op if the event
    /// has no listeners or the id is not present.
    pub fn off<T: Payload>(&self, event: &EventId<T>, id: ListenerId) {
        self.remove_listener(event.key(), id);
    }

    /// Number of listeners currently registered for `event`.
    pub fn listener_count<T: Payload>(&self, event: &EventId<T>) -> usize {
        let channels = self.inner.channels.lock();
        channels.get(&event.key()).map_or(0, |slot| slot.len())
    }

    /// Broadcast `payload` to every listener registered for `event`, in
    /// registration order, against a snapshot taken at the start of this
    /// call. Returns after all synchronous listeners have run; never awaits.
    pub fn emit<T: Payload>(&self, event: &EventId<T>, payload: T) {
        let snapshot: Vec<ListenerEntry<T>> = {
            let channels = self.inner.channels.lock();
            match channels.get(&event.key()) {
                Some(slot) => slot
                    .as_any()
                    .downcast_ref::<ChannelState<T>>()
                    .expect("channel payload type is fixed by its EventId")
                    .entries
                    .clone(),
                None => return,
            }
        };

        for entry in &snapshot {
            if let Some(fired) = &entry.once {
                if fired.swap(true, Ordering::SeqCst) {
                    continue;
                }
                // One-shot listeners remove themselves before the body runs.
                self.remove_listener(event.key(), entry.id);
            }
            match &entry.callback {
                Callback::Sync(listener) => {
                    if let Err(error) = listener(&payload) {
                        self.report_failure(event.raw().clone(), payload.clone(), error);
                    }
                }
                Callback::Task(listener) => {
                    let future = listener(payload.clone());
                    let emitter = self.clone();
                    let raw = event.raw().clone();
                    let delivered = payload.clone();
                    tokio::spawn(async move {
                        if let Err(error) = future.await {
                            emitter.report_failure(raw, delivered, error);
                        }
                    });
                }
            }
        }
    }

    fn register_once<T: Payload>(&self, event: &EventId<T>, callback: Callback<T>) -> Subscription {
        self.insert(event, callback, Some(Arc::new(AtomicBool::new(false))))
    }

    fn insert<T: Payload>(
        &self,
        event: &EventId<T>,
        callback: Callback<T>,
        once: Option<Arc<AtomicBool>>,
    ) -> Subscription {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut channels = self.inner.channels.lock();
            let slot = channels
                .entry(event.key())
                .or_insert_with(|| Box::new(ChannelState::<T> { entries: Vec::new() }));
            let state = slot
                .as_any_mut()
                .downcast_mut::<ChannelState<T>>()
                .expect("channel payload type is fixed by its EventId");
            state.entries.push(ListenerEntry { id, callback, once });
        }
        Subscription::new(self.clone(), event.key(), id)
    }

    pub(crate) fn remove_listener(&self, key: u64, id: ListenerId) {
        let mut channels = self.inner.channels.lock();
        if let Some(slot) = channels.get_mut(&key) {
            slot.remove(id);
            if slot.is_empty() {
                channels.remove(&key);
            }
        }
    }

    fn report_failure<T: Payload>(&self, event: RawEventId, payload: T, error: ListenerError) {
        tracing::warn!(event = %event, error = %error, "listener failed; routing to error channel");
        self.funnel(ErrorEnvelope::new(error, event, Arc::new(payload)));
    }

    /// Emit an envelope on the error channel under the recursion guard.
    ///
    /// Past [`MAX_ERROR_EMIT_DEPTH`] nested failures this panics: an
    /// error-channel listener that fails on every delivery would otherwise
    /// recurse without bound, and that exhaustion must be reported rather
    /// than swallowed.
    fn funnel(&self, envelope: ErrorEnvelope) {
        let depth = ERROR_EMIT_DEPTH.with(Cell::get);
        if depth >= MAX_ERROR_EMIT_DEPTH {
            tracing::error!(depth, envelope = %envelope, "error-channel listeners keep failing");
            panic!(
                "error-channel emission exceeded {MAX_ERROR_EMIT_DEPTH} nested listener failures"
            );
        }
        ERROR_EMIT_DEPTH.with(|d| d.set(depth + 1));
        let _guard = DepthGuard(depth);
        self.emit(&LISTENER_ERRORS, envelope);
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("channels", &self.inner.channels.lock().len())
            .finish()
    }
}
