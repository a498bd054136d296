//! In-process pub/sub bus.
//!
//! Fan-out of [`PubSubMessage`]s to every subscriber registered for the
//! message's announcement type. Publishing is synchronous and never blocks:
//! each subscriber owns an unbounded channel, so handlers running on watcher
//! threads can publish without an async context.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

use super::{PubSubMessage, Publisher};
use crate::announcements::AnnouncementType;

// =============================================================================
// Subscriber Management
// =============================================================================

/// Subscriber handle for receiving messages.
#[derive(Debug, Clone)]
struct Subscriber {
    id: String,
    tx: mpsc::UnboundedSender<PubSubMessage>,
}

/// Subscription receipt for managing subscriptions.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: String,
    pub announcement_types: Vec<AnnouncementType>,
}

/// Statistics about bus usage.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusStats {
    pub messages_published: u64,
    pub messages_delivered: u64,
    pub active_subscribers: usize,
}

// =============================================================================
// PubSub - In-Memory Message Bus
// =============================================================================

/// In-memory pub/sub bus keyed by announcement type.
#[derive(Debug, Default)]
pub struct PubSub {
    /// announcement type -> list of subscribers
    subscribers: RwLock<HashMap<AnnouncementType, Vec<Subscriber>>>,
    messages_published: AtomicU64,
    messages_delivered: AtomicU64,
}

impl PubSub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a message to all subscribers of its announcement type.
    ///
    /// Returns how many subscribers received it. Subscribers whose receiver
    /// has been dropped are skipped and then pruned from the bus.
    pub fn publish(&self, message: PubSubMessage) -> usize {
        let subscribers = self.subscribers.read();

        let interested = subscribers
            .get(&message.announcement_type)
            .map(|subs| subs.as_slice())
            .unwrap_or(&[]);

        let mut delivered = 0;
        let mut closed = false;
        for subscriber in interested {
            if subscriber.tx.send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                closed = true;
            }
        }
        drop(subscribers);

        self.messages_published.fetch_add(1, Ordering::Relaxed);
        self.messages_delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);

        if closed {
            self.prune_closed();
        }

        tracing::trace!(
            "Published announcement={} to {} subscribers",
            message.announcement_type,
            delivered
        );

        delivered
    }

    /// Subscribe to announcement types.
    ///
    /// Subscribing again under an existing id replaces that subscriber's
    /// channel, so only the newest receiver gets messages.
    ///
    /// Returns (subscription handle, receiver channel) for receiving messages.
    pub fn subscribe(
        &self,
        subscriber_id: impl Into<String>,
        announcement_types: Vec<AnnouncementType>,
    ) -> (Subscription, mpsc::UnboundedReceiver<PubSubMessage>) {
        let subscriber_id = subscriber_id.into();
        let announcement_types: Vec<AnnouncementType> = announcement_types
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut subscribers = self.subscribers.write();
        Self::retain_open(&mut subscribers);
        for announcement_type in &announcement_types {
            let subs = subscribers.entry(*announcement_type).or_default();
            match subs.iter_mut().find(|s| s.id == subscriber_id) {
                Some(existing) => existing.tx = tx.clone(),
                None => subs.push(Subscriber {
                    id: subscriber_id.clone(),
                    tx: tx.clone(),
                }),
            }
        }
        drop(subscribers);

        tracing::debug!(
            "Subscriber {} registered for announcements: {:?}",
            subscriber_id,
            announcement_types
        );

        (
            Subscription {
                id: subscriber_id,
                announcement_types,
            },
            rx,
        )
    }

    /// Unsubscribe from announcements.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        let mut subscribers = self.subscribers.write();

        for announcement_type in &subscription.announcement_types {
            if let Some(subs) = subscribers.get_mut(announcement_type) {
                subs.retain(|s| s.id != subscription.id);
                if subs.is_empty() {
                    subscribers.remove(announcement_type);
                }
            }
        }

        tracing::debug!("Unsubscribed: {}", subscription.id);
    }

    /// Drop subscribers whose receiver is gone.
    fn prune_closed(&self) {
        Self::retain_open(&mut self.subscribers.write());
    }

    fn retain_open(subscribers: &mut HashMap<AnnouncementType, Vec<Subscriber>>) {
        subscribers.retain(|_, subs| {
            subs.retain(|s| !s.tx.is_closed());
            !subs.is_empty()
        });
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Get current bus statistics.
    pub fn stats(&self) -> BusStats {
        let active_subscribers = self.subscribers.read().values().map(Vec::len).sum();
        BusStats {
            messages_published: self.messages_published.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            active_subscribers,
        }
    }

    /// Reset statistics counters.
    pub fn reset_stats(&self) {
        self.messages_published.store(0, Ordering::Relaxed);
        self.messages_delivered.store(0, Ordering::Relaxed);
    }
}

impl Publisher for PubSub {
    fn publish(&self, message: PubSubMessage) {
        PubSub::publish(self, message);
    }
}

// =============================================================================
// Tests
// =============================================================================
