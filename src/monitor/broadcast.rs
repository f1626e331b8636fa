//! Ordered, multi-subscriber, non-replaying snapshot broadcast.
//!
//! Each subscriber owns a bounded crossbeam receiver; `publish` clones the
//! value into every live sender in subscription order and prunes subscribers
//! whose [`Subscription`] was dropped. A subscriber that falls a full backlog
//! behind loses its oldest pending values, never the newest. A subscriber that
//! joins late only sees values published after it subscribed.

#![allow(missing_docs)]

use std::sync::{Arc, Weak};

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use parking_lot::Mutex;

/// Identifier returned by [`Broadcast::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Receiving end of a broadcast subscription.
#[derive(Debug)]
pub struct Subscription<T> {
    id: SubscriptionId,
    rx: Receiver<T>,
    _alive: Arc<()>,
}

impl<T> Subscription<T> {
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Non-blocking receive of the next pending value.
    pub fn try_recv(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Drain every pending value, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }

    /// Most recent pending value, discarding older ones.
    pub fn latest(&self) -> Option<T> {
        self.rx.try_iter().last()
    }

    /// Underlying receiver, for `select!`-style consumers.
    #[must_use]
    pub const fn receiver(&self) -> &Receiver<T> {
        &self.rx
    }
}

/// Pending values kept per subscriber before the oldest is dropped.
pub const DEFAULT_BACKLOG: usize = 1024;

#[derive(Debug)]
struct Slot<T> {
    id: SubscriptionId,
    tx: Sender<T>,
    /// Hub-side handle on the same channel, used to evict the oldest value.
    evict: Receiver<T>,
    alive: Weak<()>,
}

impl<T> Slot<T> {
    /// Send `value`, evicting old values while the backlog is full. `false`
    /// once the subscriber is gone.
    fn deliver(&self, mut value: T) -> bool {
        if self.alive.strong_count() == 0 {
            return false;
        }
        loop {
            match self.tx.try_send(value) {
                Ok(()) => return true,
                Err(TrySendError::Full(back)) => {
                    let _ = self.evict.try_recv();
                    value = back;
                }
                Err(TrySendError::Disconnected(_)) => return false,
            }
        }
    }
}

#[derive(Debug)]
struct Inner<T> {
    next_id: u64,
    backlog: usize,
    subscribers: Vec<Slot<T>>,
}

/// Cheaply cloneable broadcast hub.
#[derive(Debug)]
pub struct Broadcast<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for Broadcast<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone> Default for Broadcast<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Broadcast<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_backlog(DEFAULT_BACKLOG)
    }

    /// Hub whose subscribers each hold at most `backlog` pending values.
    #[must_use]
    pub fn with_backlog(backlog: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 0,
                backlog: backlog.max(1),
                subscribers: Vec::new(),
            })),
        }
    }

    pub fn subscribe(&self) -> Subscription<T> {
        let mut inner = self.inner.lock();
        let (tx, rx) = bounded(inner.backlog);
        let alive = Arc::new(());
        let id = SubscriptionId(inner.next_id);
        inner.next_id = inner.next_id.wrapping_add(1);
        inner.subscribers.push(Slot {
            id,
            tx,
            evict: rx.clone(),
            alive: Arc::downgrade(&alive),
        });
        Subscription {
            id,
            rx,
            _alive: alive,
        }
    }

    /// Remove a subscriber. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|slot| slot.id != id);
        inner.subscribers.len() != before
    }

    /// Deliver `value` to every live subscriber. Returns the delivery count.
    pub fn publish(&self, value: &T) -> usize {
        let mut inner = self.inner.lock();
        inner
            .subscribers
            .retain(|slot| slot.deliver(value.clone()));
        inner.subscribers.len()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}
