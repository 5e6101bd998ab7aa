//! Pending-reload queue between watcher threads and the main thread
//!
//! Watcher callbacks hold a [`ReloadSender`] and may flag resources from any
//! thread. The main thread owns the [`ReloadQueue`] and drains it once per
//! reload pass. The channel is bounded; when it is full the id goes to a
//! mutex-guarded overflow set instead, so senders never block and no flag is
//! lost.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use super::ResourceId;

/// Cloneable handle used to flag resources from any thread
#[derive(Clone)]
pub struct ReloadSender {
    tx: Sender<ResourceId>,
    overflow: Arc<Mutex<FxHashSet<ResourceId>>>,
}

impl ReloadSender {
    /// Mark a resource as changed
    pub fn flag(&self, id: ResourceId) {
        match self.tx.try_send(id) {
            Ok(()) => {}
            Err(TrySendError::Full(id)) => {
                log::debug!("Reload channel full, parking {} in overflow set", id);
                self.overflow.lock().insert(id);
            }
            Err(TrySendError::Disconnected(id)) => {
                log::debug!("Reload queue gone, dropping flag for {}", id);
            }
        }
    }
}

/// Main-thread end of the pending-reload queue
pub struct ReloadQueue {
    sender: ReloadSender,
    rx: Receiver<ResourceId>,
}

impl ReloadQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        Self {
            sender: ReloadSender {
                tx,
                overflow: Arc::new(Mutex::new(FxHashSet::default())),
            },
            rx,
        }
    }

    pub fn sender(&self) -> ReloadSender {
        self.sender.clone()
    }

    pub fn flag(&self, id: ResourceId) {
        self.sender.flag(id);
    }

    /// Number of queued flags, duplicates included
    pub fn len(&self) -> usize {
        self.rx.len() + self.sender.overflow.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take every pending id, deduplicated, in arrival order
    ///
    /// Only the flags present when the drain starts are taken; anything
    /// sent concurrently waits for the next pass.
    pub fn drain(&self) -> Vec<ResourceId> {
        let available = self.rx.len();
        let mut seen = FxHashSet::default();
        let mut pending = Vec::with_capacity(available);

        for id in self.rx.try_iter().take(available) {
            if seen.insert(id) {
                pending.push(id);
            }
        }

        let overflow = std::mem::take(&mut *self.sender.overflow.lock());
        for id in overflow {
            if seen.insert(id) {
                pending.push(id);
            }
        }

        pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_drain_deduplicates() {
        let queue = ReloadQueue::new(16);
        queue.flag(ResourceId(1));
        queue.flag(ResourceId(2));
        queue.flag(ResourceId(1));

        assert_eq!(queue.drain(), vec![ResourceId(1), ResourceId(2)]);
        assert!(queue.is_empty());
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_overflow_is_not_lost() {
        let queue = ReloadQueue::new(2);
        for i in 1..=10 {
            queue.flag(ResourceId(i));
        }

        let mut drained = queue.drain();
        drained.sort();
        assert_eq!(drained, (1..=10).map(ResourceId).collect::<Vec<_>>());
    }

    #[test]
    fn test_flags_from_many_threads() {
        let queue = ReloadQueue::new(8);
        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let sender = queue.sender();
                thread::spawn(move || {
                    for i in 0..50u64 {
                        sender.flag(ResourceId(t * 100 + i + 1));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(queue.drain().len(), 200);
    }
}
