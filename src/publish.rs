//! Catalogue publication to an owner-thread observer.
//!
//! Listeners (typically a UI device list) live on one owning thread.
//! [`Publisher::publish`] delivers a snapshot inline when called on that
//! thread, and otherwise posts it to a channel that the owner drains with
//! [`OwnerQueue::pump`]. Posting never blocks.
//!
//! A listener that publishes from inside its own callback would re-enter the
//! listener set; that publish is queued instead of dispatched inline.
//!
//! # Example
//! ```
//! use padcat::publish::{channel, CatalogFilter, CatalogListener, Delivery};
//! use padcat::CatalogSnapshot;
//!
//! struct Count(usize);
//! impl CatalogListener for Count {
//!     fn on_catalog(&mut self, snap: &CatalogSnapshot) {
//!         self.0 = snap.len();
//!     }
//! }
//!
//! let (publisher, queue) = channel();
//! queue.add_listener(Count(0), CatalogFilter::All);
//!
//! let remote = publisher.clone();
//! let delivery = std::thread::spawn(move || remote.publish(CatalogSnapshot::default()))
//!     .join()
//!     .unwrap();
//! assert_eq!(delivery, Delivery::Queued);
//! assert_eq!(queue.pump(), 1);
//! ```

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::thread::{self, ThreadId};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use log::{debug, warn};

use crate::registry::UnifiedDeviceEntry;
use crate::snapshot::CatalogSnapshot;
use crate::sources::SourceKind;

/// Receives published catalogues on the owner thread.
pub trait CatalogListener: Send {
    fn on_catalog(&mut self, snapshot: &CatalogSnapshot);
}

impl<F: FnMut(&CatalogSnapshot) + Send> CatalogListener for F {
    fn on_catalog(&mut self, snapshot: &CatalogSnapshot) {
        self(snapshot)
    }
}

/// Which entries a listener wants to see.
#[derive(Debug, Clone, Copy)]
pub enum CatalogFilter {
    All,
    Source(SourceKind),
    Custom(fn(&UnifiedDeviceEntry) -> bool),
}

impl CatalogFilter {
    fn keeps(&self, e: &UnifiedDeviceEntry) -> bool {
        match self {
            CatalogFilter::All => true,
            CatalogFilter::Source(kind) => e.source == *kind,
            CatalogFilter::Custom(f) => f(e),
        }
    }

    fn apply<'a>(&self, snapshot: &'a CatalogSnapshot) -> Cow<'a, CatalogSnapshot> {
        if matches!(self, CatalogFilter::All) {
            return Cow::Borrowed(snapshot);
        }
        Cow::Owned(CatalogSnapshot {
            generation: snapshot.generation,
            entries: snapshot
                .entries
                .iter()
                .filter(|e| self.keeps(e))
                .cloned()
                .collect(),
        })
    }
}

/// How a publish was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Dispatched on the calling (owner) thread.
    Inline,
    /// Posted for the owner's next [`OwnerQueue::pump`].
    Queued,
    /// The owner queue is gone; the snapshot was dropped.
    Closed,
}

struct ListenerEntry {
    listener: Box<dyn CatalogListener>,
    enabled: bool,
    filter: CatalogFilter,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: BTreeMap<u64, ListenerEntry>,
}

impl Listeners {
    fn emit(&mut self, snapshot: &CatalogSnapshot) {
        for entry in self.entries.values_mut().filter(|e| e.enabled) {
            let view = entry.filter.apply(snapshot);
            entry.listener.on_catalog(&view);
        }
    }
}

fn lock(listeners: &Mutex<Listeners>) -> MutexGuard<'_, Listeners> {
    listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Sending half; `Clone + Send`, usable from any thread.
#[derive(Clone)]
pub struct Publisher {
    owner: ThreadId,
    tx: Sender<CatalogSnapshot>,
    listeners: Arc<Mutex<Listeners>>,
}

/// Owner-thread half: holds the listeners and drains queued snapshots.
pub struct OwnerQueue {
    owner: ThreadId,
    rx: Receiver<CatalogSnapshot>,
    listeners: Arc<Mutex<Listeners>>,
}

/// Create a publisher / queue pair owned by the calling thread.
pub fn channel() -> (Publisher, OwnerQueue) {
    let owner = thread::current().id();
    let (tx, rx) = crossbeam_channel::unbounded();
    let listeners = Arc::new(Mutex::new(Listeners::default()));
    (
        Publisher {
            owner,
            tx,
            listeners: Arc::clone(&listeners),
        },
        OwnerQueue {
            owner,
            rx,
            listeners,
        },
    )
}

impl Publisher {
    #[inline]
    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Deliver a snapshot: inline on the owner thread, queued elsewhere.
    pub fn publish(&self, snapshot: CatalogSnapshot) -> Delivery {
        if self.is_owner_thread() {
            match self.listeners.try_lock() {
                Ok(mut listeners) => {
                    listeners.emit(&snapshot);
                    return Delivery::Inline;
                }
                Err(TryLockError::Poisoned(poisoned)) => {
                    poisoned.into_inner().emit(&snapshot);
                    return Delivery::Inline;
                }
                // Re-entered from a listener callback.
                Err(TryLockError::WouldBlock) => {
                    debug!("[PUBLISH] reentrant publish, queuing");
                }
            }
        }

        match self.tx.send(snapshot) {
            Ok(()) => Delivery::Queued,
            Err(_) => {
                warn!("[PUBLISH] owner queue closed; snapshot dropped");
                Delivery::Closed
            }
        }
    }
}

impl OwnerQueue {
    /// Register a listener; returns its id.
    pub fn add_listener(&self, listener: impl CatalogListener + 'static, filter: CatalogFilter) -> u64 {
        let mut l = lock(&self.listeners);
        let id = l.next_id;
        l.entries.insert(
            id,
            ListenerEntry {
                listener: Box::new(listener),
                enabled: true,
                filter,
            },
        );
        l.next_id += 1;
        id
    }

    pub fn enable(&self, id: u64) {
        if let Some(e) = lock(&self.listeners).entries.get_mut(&id) {
            e.enabled = true;
        }
    }

    /// Mute a listener without removing it.
    pub fn disable(&self, id: u64) {
        if let Some(e) = lock(&self.listeners).entries.get_mut(&id) {
            e.enabled = false;
        }
    }

    pub fn remove_listener(&self, id: u64) {
        lock(&self.listeners).entries.remove(&id);
    }

    /// Dispatch every queued snapshot; returns how many were delivered.
    ///
    /// Only the owner thread may pump; other callers get `0`.
    pub fn pump(&self) -> usize {
        if thread::current().id() != self.owner {
            warn!("[PUBLISH] pump called off the owner thread; ignored");
            return 0;
        }

        let mut delivered = 0;
        loop {
            match self.rx.try_recv() {
                Ok(snapshot) => {
                    lock(&self.listeners).emit(&snapshot);
                    delivered += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        delivered
    }

    /// Snapshots waiting for [`pump`](Self::pump).
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceRecord;
    use crate::identity::CanonicalId;
    use crate::registry::DeviceRegistry;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn snapshot() -> CatalogSnapshot {
        let mut reg = DeviceRegistry::new();
        let id = CanonicalId {
            vendor: 0x045E,
            product: 0x028E,
            ..Default::default()
        };
        reg.merge(vec![
            vec![DeviceRecord::new(SourceKind::XInput, "xinput:0", id.clone())],
            vec![DeviceRecord::new(SourceKind::Hid, "p", id)],
        ]);
        CatalogSnapshot::of(&reg, 1)
    }

    fn counter() -> (Arc<AtomicUsize>, impl CatalogListener) {
        let seen = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&seen);
        (seen, move |snap: &CatalogSnapshot| {
            s.fetch_add(snap.len(), Ordering::SeqCst);
        })
    }

    #[test]
    fn owner_thread_publishes_inline() {
        let (publisher, queue) = channel();
        let (seen, listener) = counter();
        queue.add_listener(listener, CatalogFilter::All);

        assert_eq!(publisher.publish(snapshot()), Delivery::Inline);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn other_threads_queue_until_pumped() {
        let (publisher, queue) = channel();
        let (seen, listener) = counter();
        queue.add_listener(listener, CatalogFilter::Source(SourceKind::Hid));

        let remote = publisher.clone();
        let delivery = thread::spawn(move || remote.publish(snapshot())).join().unwrap();
        assert_eq!(delivery, Delivery::Queued);
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        assert_eq!(queue.pump(), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reentrant_publish_is_queued() {
        let (publisher, queue) = channel();
        let inner = publisher.clone();
        let depth = Arc::new(AtomicUsize::new(0));
        let d = Arc::clone(&depth);
        queue.add_listener(
            move |snap: &CatalogSnapshot| {
                if d.fetch_add(1, Ordering::SeqCst) == 0 {
                    assert_eq!(inner.publish(snap.clone()), Delivery::Queued);
                }
            },
            CatalogFilter::All,
        );

        assert_eq!(publisher.publish(snapshot()), Delivery::Inline);
        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.pump(), 1);
        assert_eq!(depth.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn disabled_and_removed_listeners_are_skipped() {
        let (publisher, queue) = channel();
        let (seen, listener) = counter();
        let id = queue.add_listener(listener, CatalogFilter::All);

        queue.disable(id);
        publisher.publish(snapshot());
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        queue.enable(id);
        publisher.publish(snapshot());
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        queue.remove_listener(id);
        publisher.publish(snapshot());
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn custom_filter() {
        let (publisher, queue) = channel();
        let (seen, listener) = counter();
        queue.add_listener(listener, CatalogFilter::Custom(|e| e.handle.starts_with("xinput")));
        publisher.publish(snapshot());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closed_queue_drops() {
        let (publisher, queue) = channel();
        drop(queue);
        let remote = publisher.clone();
        let delivery = thread::spawn(move || remote.publish(CatalogSnapshot::default()))
            .join()
            .unwrap();
        assert_eq!(delivery, Delivery::Closed);
    }
}
