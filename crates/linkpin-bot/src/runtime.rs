use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::{DateTime, Utc};
use linkpin_registry::StateStore;
use linkpin_telegram::{TelegramGateway, Update};
use tracing::{debug, info, warn};

use crate::dispatch::{CommandDispatcher, InboundEvent};
use crate::schedule::ResetSchedule;
use crate::transport::ChatTransport;

/// One blocking loop owns the dispatcher: poll, dispatch sequentially, then run timers.
/// Registry mutations, store writes and the scheduled reset never overlap.
///
/// The update offset is saved before each update is dispatched, so a restart resumes after
/// the last update seen and never runs a command twice.
pub struct PollLoop<T: ChatTransport> {
    dispatcher: CommandDispatcher<T>,
    reset: Option<ResetSchedule>,
    store: Arc<dyn StateStore>,
    offset: Option<i64>,
    poll_timeout_secs: u64,
}

impl<T: ChatTransport> PollLoop<T> {
    pub fn new(
        dispatcher: CommandDispatcher<T>,
        reset: Option<ResetSchedule>,
        poll_timeout_secs: u64,
    ) -> Self {
        let store = dispatcher.registry().store().clone();
        let offset = store.load_update_offset().unwrap_or_else(|err| {
            warn!(error = %err, "failed to load update offset, polling from the oldest pending update");
            None
        });
        if let Some(offset) = offset {
            info!(offset, "resuming after saved update offset");
        }
        Self {
            dispatcher,
            reset,
            store,
            offset,
            poll_timeout_secs,
        }
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<T> {
        &self.dispatcher
    }

    /// Next `getUpdates` offset: one past the highest update seen.
    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    /// Dispatches a batch of updates in arrival order and advances the offset.
    pub fn process_updates(&mut self, updates: Vec<Update>, now: Instant) -> usize {
        let mut handled = 0;
        for update in updates {
            if self.offset.is_some_and(|offset| update.update_id < offset) {
                debug!(update_id = update.update_id, "already handled update skipped");
                continue;
            }
            let next = update.update_id + 1;
            self.offset = Some(next);
            if let Err(err) = self.store.save_update_offset(next) {
                warn!(error = %err, offset = next, "failed to persist update offset");
            }
            if let Some(event) = InboundEvent::from_update(update) {
                self.dispatcher.handle(event, now);
                handled += 1;
            }
        }
        handled
    }

    /// Runs due deletions and the daily reset.
    pub fn tick(&mut self, now: Instant, wall_clock: DateTime<Utc>) {
        let deleted = self.dispatcher.run_deferred(now);
        if deleted > 0 {
            debug!(deleted, "short-lived messages removed");
        }
        if let Some(reset) = self.reset.as_mut()
            && reset.poll(wall_clock)
        {
            let cleared = self.dispatcher.scheduled_reset();
            info!(cleared, next = ?reset.next_due(), "daily reset fired");
        }
    }

    pub fn shutdown(&mut self) -> usize {
        self.dispatcher.shutdown()
    }
}

impl PollLoop<TelegramGateway> {
    /// One long-poll round trip followed by a timer tick. A failed poll still ticks.
    pub fn run_cycle(&mut self) -> Result<usize> {
        let polled = self
            .dispatcher
            .transport()
            .get_updates(self.offset, self.poll_timeout_secs);
        let handled = polled.map(|updates| self.process_updates(updates, Instant::now()));
        self.tick(Instant::now(), Utc::now());
        handled
    }
}
