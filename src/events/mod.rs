//! Bus messages and the publishing seam.
//!
//! The bus is shared by every watched resource kind, so objects travel
//! type-erased as [`Object`] and subscribers recover the concrete type with
//! [`PubSubMessage::current_as`] / [`PubSubMessage::previous_as`].

pub mod pubsub;

pub use pubsub::{BusStats, PubSub, Subscription};

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::announcements::AnnouncementType;

/// A watched object as carried on the bus.
pub type Object = Arc<dyn Any + Send + Sync>;

/// Message published for one observed lifecycle transition.
///
/// Slot convention: add and delete put their single object in `current`;
/// update puts the old state in `previous` and the new state in `current`.
#[derive(Clone)]
pub struct PubSubMessage {
    pub announcement_type: AnnouncementType,
    pub previous: Option<Object>,
    pub current: Option<Object>,
}

impl PubSubMessage {
    pub fn new(
        announcement_type: AnnouncementType,
        previous: Option<Object>,
        current: Option<Object>,
    ) -> Self {
        Self {
            announcement_type,
            previous,
            current,
        }
    }

    /// Borrow the previous object as `K`, if present and of that type.
    pub fn previous_as<K: Any>(&self) -> Option<&K> {
        self.previous.as_deref().and_then(|obj| obj.downcast_ref::<K>())
    }

    /// Borrow the current object as `K`, if present and of that type.
    pub fn current_as<K: Any>(&self) -> Option<&K> {
        self.current.as_deref().and_then(|obj| obj.downcast_ref::<K>())
    }

    /// Same tag and the very same object allocations in both slots.
    pub fn is_same(&self, other: &PubSubMessage) -> bool {
        fn slot_eq(a: &Option<Object>, b: &Option<Object>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
        }

        self.announcement_type == other.announcement_type
            && slot_eq(&self.previous, &other.previous)
            && slot_eq(&self.current, &other.current)
    }
}

impl fmt::Debug for PubSubMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PubSubMessage")
            .field("announcement_type", &self.announcement_type)
            .field("previous", &self.previous.is_some())
            .field("current", &self.current.is_some())
            .finish()
    }
}

/// Fire-and-forget sink for bus messages.
///
/// Implementations decide delivery, blocking and failure semantics; callers
/// hand the message over and move on.
pub trait Publisher: Send + Sync {
    fn publish(&self, message: PubSubMessage);
}

impl<F> Publisher for F
where
    F: Fn(PubSubMessage) + Send + Sync,
{
    fn publish(&self, message: PubSubMessage) {
        self(message)
    }
}
