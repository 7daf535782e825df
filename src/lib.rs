//! # Eventry: typed in-process event channels
//!
//! Eventry is a small notification library with three pieces, each built on
//! the one before it:
//!
//! - **Registry**: mints unique, strongly-typed event identifiers so
//!   independently-authored modules cannot collide on a name
//!   ([`EventRegistry`], [`EventId`]).
//! - **Emitter**: per-event ordered listener lists with `on`/`once`/`off`
//!   and synchronous, fault-isolated broadcast; a failing listener never
//!   blocks the rest, its failure is re-routed as data on the reserved
//!   [`LISTENER_ERRORS`] channel ([`Emitter`], [`ErrorEnvelope`]).
//! - **Stream bridge**: turns a subscription into a cancellable, pull-based
//!   async sequence with deterministic teardown
//!   ([`Emitter::subscribe`], [`EventStream`]).
//!
//! ## Quick start
//!
//! ```
//! use eventry::{Emitter, EventRegistry};
//! use std::sync::{Arc, Mutex};
//!
//! let registry = EventRegistry::new();
//! let placed = registry.mint::<u64>("orders.placed").unwrap();
//!
//! let emitter = Emitter::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! let subscription = emitter.on(&placed, move |order: &u64| {
//!     sink.lock().unwrap().push(*order);
//! });
//!
//! emitter.emit(&placed, 41);
//! emitter.emit(&placed, 42);
//! subscription.unsubscribe();
//! emitter.emit(&placed, 43);
//!
//! assert_eq!(*seen.lock().unwrap(), vec![41, 42]);
//! ```
//!
//! ## Consuming events as a stream
//!
//! ```
//! use eventry::{CancellationToken, Emitter, EventRegistry};
//! use futures_util::StreamExt;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = EventRegistry::new();
//! let lines = registry.mint::<String>("input.lines").unwrap();
//! let emitter = Emitter::new();
//!
//! let cancel = CancellationToken::new();
//! let mut stream = emitter.subscribe(&lines, cancel.clone());
//!
//! emitter.emit(&lines, "first".into());
//! assert_eq!(stream.next().await.as_deref(), Some("first"));
//!
//! cancel.cancel();
//! assert_eq!(stream.next().await, None);
//! // The bridge unregistered its listener on termination.
//! assert_eq!(emitter.listener_count(&lines), 0);
//! # }
//! ```

pub mod emitter;
pub mod registry;
pub mod stream;

pub use emitter::{Emitter, ErrorEnvelope, ListenerError, ListenerId, Payload, Subscription};
pub use registry::{
    default_registry, mint, EventId, EventRegistry, MintError, RawEventId, LISTENER_ERRORS,
    LISTENER_ERRORS_NAME,
};
pub use stream::EventStream;

// Re-exported so downstream code does not need a direct tokio-util
// dependency to drive cancellation.
pub use tokio_util::sync::CancellationToken;
