//! The payload carried on the reserved listener-failure channel.

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::registry::RawEventId;

use super::listener::ListenerError;

/// Describes one listener failure: the error value, the event being emitted
/// when it happened, and the payload that was being delivered.
///
/// Delivered on [`LISTENER_ERRORS`](crate::LISTENER_ERRORS). The payload is
/// type-erased because envelopes from channels of every payload type share
/// one error channel; recover it with [`payload_as`](ErrorEnvelope::payload_as)
/// when the event is known.
#[derive(Clone)]
pub struct ErrorEnvelope {
    error: Arc<dyn Error + Send + Sync>,
    event: RawEventId,
    payload: Arc<dyn Any + Send + Sync>,
}

impl ErrorEnvelope {
    pub(crate) fn new(
        error: ListenerError,
        event: RawEventId,
        payload: Arc<dyn Any + Send + Sync>,
    ) -> Self {
        Self {
            error: Arc::from(error),
            event,
            payload,
        }
    }

    /// The failure value the listener produced.
    pub fn error(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.error.as_ref()
    }

    /// Identity of the event channel being emitted when the listener failed.
    pub fn event(&self) -> &RawEventId {
        &self.event
    }

    /// The payload that was being delivered, type-erased.
    pub fn payload(&self) -> &(dyn Any + Send + Sync) {
        self.payload.as_ref()
    }

    /// The payload downcast to `T`, if the failing channel carried `T`.
    pub fn payload_as<T: 'static>(&self) -> Option<&T> {
        self.payload.downcast_ref()
    }
}

impl fmt::Debug for ErrorEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorEnvelope")
            .field("error", &self.error)
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener on {} failed: {}", self.event, self.error)
    }
}
