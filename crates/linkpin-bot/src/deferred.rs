use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::transport::ChatTransport;

#[derive(Debug, Clone, Copy)]
struct PendingDeletion {
    due: Instant,
    chat_id: i64,
    message_id: i64,
}

/// Short-lived messages waiting to be deleted.
///
/// Time is passed in by the caller. On shutdown every pending deletion runs immediately
/// instead of being dropped, so no confirmation outlives the process.
#[derive(Debug)]
pub struct DeferredDeletions {
    ttl: Duration,
    pending: Vec<PendingDeletion>,
}

impl DeferredDeletions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            pending: Vec::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn schedule(&mut self, now: Instant, chat_id: i64, message_id: i64) {
        self.pending.push(PendingDeletion {
            due: now + self.ttl,
            chat_id,
            message_id,
        });
    }

    /// Deletes every message whose time is up. Returns how many were attempted.
    pub fn run_due<T: ChatTransport + ?Sized>(&mut self, now: Instant, transport: &T) -> usize {
        let (due, waiting): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|item| item.due <= now);
        self.pending = waiting;
        for item in &due {
            delete_best_effort(transport, item);
        }
        due.len()
    }

    pub fn shutdown<T: ChatTransport + ?Sized>(&mut self, transport: &T) -> usize {
        let flushed = self.pending.len();
        for item in self.pending.drain(..) {
            delete_best_effort(transport, &item);
        }
        if flushed > 0 {
            debug!(flushed, "flushed pending deletions on shutdown");
        }
        flushed
    }
}

fn delete_best_effort<T: ChatTransport + ?Sized>(transport: &T, item: &PendingDeletion) {
    if let Err(err) = transport.delete(item.chat_id, item.message_id) {
        warn!(error = %err, message_id = item.message_id, "could not delete short-lived message");
    }
}
