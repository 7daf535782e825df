//! Event identity: registries, minted ids, and the reserved error channel.
//!
//! An [`EventRegistry`] is a scoped naming authority. It hands out
//! [`EventId`]s bound to a payload type and guarantees that a name is minted
//! at most once for the registry's lifetime. Most applications construct one
//! registry and pass it around; the free [`mint`] function delegates to a
//! process-wide default instance for code that wants the global behavior.
//!
//! ```
//! use eventry::EventRegistry;
//!
//! let registry = EventRegistry::new();
//! let opened = registry.mint::<String>("session.opened").unwrap();
//! assert_eq!(opened.name(), "session.opened");
//!
//! // Names are taken for good, regardless of payload type.
//! assert!(registry.mint::<u64>("session.opened").is_err());
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::emitter::ErrorEnvelope;

/// Name of the reserved listener-failure channel.
///
/// Every registry records this name as taken at construction, so user code
/// can never mint a colliding id.
pub const LISTENER_ERRORS_NAME: &str = "__listener_errors__";

/// Reserved channel carrying [`ErrorEnvelope`]s for listener failures.
///
/// Available to every [`Emitter`](crate::Emitter) with no setup; subscribe to
/// it to observe otherwise-unhandled listener failures.
pub static LISTENER_ERRORS: LazyLock<EventId<ErrorEnvelope>> = LazyLock::new(|| EventId {
    raw: RawEventId {
        key: 0,
        name: Arc::from(LISTENER_ERRORS_NAME),
    },
    _payload: PhantomData,
});

// Key 0 belongs to the reserved channel; minted ids start at 1. Keys are
// process-unique even across registries, so ids from different registries
// never compare equal by accident.
static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// Errors produced when minting an event id.
#[derive(Debug, Error)]
pub enum MintError {
    /// The name was already minted in this registry (payload type is not
    /// part of the uniqueness key).
    #[error("event name {name:?} is already minted")]
    DuplicateName { name: String },
}

/// Type-erased identity of an event channel: a process-unique key plus the
/// name it was minted under.
///
/// Equality and hashing use only the key; the name is carried for display
/// and diagnostics.
#[derive(Clone, Debug)]
pub struct RawEventId {
    key: u64,
    name: Arc<str>,
}

impl RawEventId {
    /// The name this id was minted under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn key(&self) -> u64 {
        self.key
    }
}

impl PartialEq for RawEventId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for RawEventId {}

impl Hash for RawEventId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for RawEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Unique token naming one event channel, branded with its payload type.
///
/// The payload type is a compile-time marker only (`PhantomData`); two ids
/// are equal iff they were minted by the same `mint` call. Cheap to clone.
pub struct EventId<T> {
    raw: RawEventId,
    _payload: PhantomData<fn(T) -> T>,
}

impl<T> EventId<T> {
    /// The name this id was minted under.
    pub fn name(&self) -> &str {
        self.raw.name()
    }

    /// The type-erased identity, as carried in [`ErrorEnvelope`]s.
    pub fn raw(&self) -> &RawEventId {
        &self.raw
    }

    pub(crate) fn key(&self) -> u64 {
        self.raw.key()
    }
}

impl<T> Clone for EventId<T> {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
            _payload: PhantomData,
        }
    }
}

impl<T> PartialEq for EventId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for EventId<T> {}

impl<T> Hash for EventId<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> fmt::Debug for EventId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventId")
            .field("name", &self.raw.name)
            .field("key", &self.raw.key)
            .finish()
    }
}

impl<T> fmt::Display for EventId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// Scoped naming authority for event channels.
///
/// Holds an append-only set of minted names; there is no unmint. Construct
/// one per application (or per test) and pass it explicitly, or use the
/// process-wide default via the free [`mint`] function.
pub struct EventRegistry {
    names: Mutex<FxHashSet<Arc<str>>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        let mut names = FxHashSet::default();
        names.insert(Arc::from(LISTENER_ERRORS_NAME));
        Self {
            names: Mutex::new(names),
        }
    }

    /// Mint a new event id for payloads of type `T`.
    ///
    /// Names are case-sensitive, compared byte-for-byte (so `"a_b"` and
    /// `"a-b"` are distinct), and may be empty, arbitrarily long, or
    /// non-ASCII. A name can be minted at most once per registry,
    /// independent of the payload type requested.
    pub fn mint<T>(&self, name: impl Into<String>) -> Result<EventId<T>, MintError> {
        let name = name.into();
        let mut names = self.names.lock();
        if names.contains(name.as_str()) {
            return Err(MintError::DuplicateName { name });
        }
        let name: Arc<str> = name.into();
        names.insert(Arc::clone(&name));
        let key = NEXT_KEY.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(name = %name, key, "minted event id");
        Ok(EventId {
            raw: RawEventId { key, name },
            _payload: PhantomData,
        })
    }

    /// Whether `name` has already been minted in this registry.
    pub fn is_minted(&self, name: &str) -> bool {
        self.names.lock().contains(name)
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("minted", &self.names.lock().len())
            .finish()
    }
}

static DEFAULT_REGISTRY: LazyLock<EventRegistry> = LazyLock::new(EventRegistry::new);

/// The process-wide default registry.
///
/// Its name set lives for the life of the process; prefer scoped
/// [`EventRegistry`] instances in tests to avoid cross-test contamination.
pub fn default_registry() -> &'static EventRegistry {
    &DEFAULT_REGISTRY
}

/// Mint an event id in the process-wide default registry.
pub fn mint<T>(name: impl Into<String>) -> Result<EventId<T>, MintError> {
    DEFAULT_REGISTRY.mint(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_process_unique_across_registries() {
        let a = EventRegistry::new();
        let b = EventRegistry::new();
        let x = a.mint::<u8>("same-name").unwrap();
        let y = b.mint::<u8>("same-name").unwrap();
        assert_ne!(x, y);
    }

    #[test]
    fn raw_id_displays_its_name() {
        let registry = EventRegistry::new();
        let id = registry.mint::<()>("display.me").unwrap();
        assert_eq!(id.to_string(), "display.me");
        assert_eq!(id.raw().to_string(), "display.me");
    }
}
