use std::sync::Arc;

use linkpin_registry::{Registry, StateStore, Summary, format_summary};
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::transport::{ChatTransport, Destination, TextFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepublishOutcome {
    /// Registry empty; any existing pin is left alone.
    Skipped,
    Pinned {
        message_id: i64,
        replaced: Option<i64>,
    },
}

/// Keeps one pinned summary per destination in step with the registry.
pub struct PinSynchronizer {
    store: Arc<dyn StateStore>,
}

impl PinSynchronizer {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Unpins the previous summary, publishes a fresh one, pins it silently and records its id.
    ///
    /// Unpinning is best-effort since the old message may be gone. A failed publish or pin is
    /// returned to the caller; the registry is never touched.
    pub fn republish<T: ChatTransport + ?Sized>(
        &self,
        transport: &T,
        registry: &Registry,
        dest: Destination,
    ) -> Result<RepublishOutcome, TransportError> {
        let Summary::Text(text) = format_summary(registry.entries()) else {
            debug!("registry empty, pinned summary left unchanged");
            return Ok(RepublishOutcome::Skipped);
        };

        let previous = self.store.load_pin_ref().unwrap_or_else(|err| {
            warn!(error = %err, "failed to read pinned message id");
            None
        });
        if let Some(previous) = previous
            && let Err(err) = transport.unpin(dest.chat_id, previous)
        {
            warn!(error = %err, message_id = previous, "could not unpin previous summary");
        }

        let message_id = transport.send(dest, &text, TextFormat::Markdown, &[])?;
        transport.pin(dest.chat_id, message_id)?;
        if let Err(err) = self.store.save_pin_ref(message_id) {
            warn!(error = %err, message_id, "failed to persist pinned message id");
        }
        Ok(RepublishOutcome::Pinned {
            message_id,
            replaced: previous,
        })
    }
}
