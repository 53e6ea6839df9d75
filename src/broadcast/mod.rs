//! Fan-out of transcript updates to connected viewers.

mod events;

pub use events::ServerEvent;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::trace;

use crate::scheduler::TranscriptEntry;

/// Live-feed capacity per subscriber before it starts lagging
pub const DEFAULT_CAPACITY: usize = 64;

/// What a new subscriber receives: everything so far, then everything after.
pub struct Subscription {
    pub snapshot: Vec<TranscriptEntry>,
    pub receiver: broadcast::Receiver<TranscriptEntry>,
}

struct Inner {
    snapshot: Mutex<Vec<TranscriptEntry>>,
    sender: broadcast::Sender<TranscriptEntry>,
}

/// Publishes transcript entries to every subscriber.
///
/// Publishing and subscribing take the same lock, so a subscriber's snapshot
/// and live feed meet exactly: no entry is missed or delivered twice.
#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<Inner>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                snapshot: Mutex::new(Vec::new()),
                sender,
            }),
        }
    }

    /// Send `entry` to all subscribers and record `transcript` (which already
    /// contains it) as the snapshot for later ones.
    pub fn publish(&self, entry: &TranscriptEntry, transcript: &[TranscriptEntry]) {
        let mut snapshot = self.inner.snapshot.lock();
        snapshot.clear();
        snapshot.extend_from_slice(transcript);

        // No receivers is not an error: viewers may all have left
        let delivered = self.inner.sender.send(entry.clone()).unwrap_or(0);
        trace!(delivered, source = %entry.source, "Published transcript entry");
    }

    pub fn subscribe(&self) -> Subscription {
        let snapshot = self.inner.snapshot.lock();
        Subscription {
            snapshot: snapshot.clone(),
            receiver: self.inner.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.sender.receiver_count()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
