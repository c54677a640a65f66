use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

use crate::RECORDED_AT_FORMAT;
use crate::entry::{LinkEntry, Requester};
use crate::error::RegistryError;
use crate::store::StateStore;
use crate::summary::{Listing, group_by_submitter};

#[derive(Debug, Clone)]
pub struct RegistryPolicy {
    /// Accepted content prefix; `None` accepts anything non-blank.
    pub allowed_prefix: Option<String>,
    pub admin_id: Option<i64>,
    /// Attribution used when the submitter has no usable name.
    pub unknown_submitter: String,
    pub timezone: Tz,
}

impl Default for RegistryPolicy {
    fn default() -> Self {
        Self {
            allowed_prefix: None,
            admin_id: None,
            unknown_submitter: "unknown".to_string(),
            timezone: chrono_tz::Asia::Ho_Chi_Minh,
        }
    }
}

/// Who asked for a reset.
#[derive(Debug, Clone, Copy)]
pub enum ResetOrigin<'a> {
    /// Chat control; only the administrator may reset.
    Interactive(&'a Requester),
    /// Daily trigger or local operator; trusted.
    Scheduled,
}

/// Insertion-ordered list of saved links, unique by content.
///
/// Every successful mutation rewrites the whole state through the store. A failed write is
/// logged and the in-memory list stays authoritative; the next mutation persists it again.
pub struct Registry {
    entries: Vec<LinkEntry>,
    policy: RegistryPolicy,
    store: Arc<dyn StateStore>,
}

impl Registry {
    /// Loads the persisted entries. Unreadable state starts the registry empty.
    pub fn open(store: Arc<dyn StateStore>, policy: RegistryPolicy) -> Self {
        let mut entries = store.load_entries().unwrap_or_else(|err| {
            warn!(error = %err, "failed to load saved links, starting empty");
            Vec::new()
        });
        for entry in &mut entries {
            if entry.submitter.trim().is_empty() {
                entry.submitter = policy.unknown_submitter.clone();
            }
        }
        info!(count = entries.len(), "registry loaded");
        Self {
            entries,
            policy,
            store,
        }
    }

    pub fn policy(&self) -> &RegistryPolicy {
        &self.policy
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    pub fn entries(&self) -> &[LinkEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_admin(&self, requester: &Requester) -> bool {
        self.policy.admin_id == Some(requester.user_id)
    }

    pub fn add(&mut self, submitter: &str, content: &str) -> Result<LinkEntry, RegistryError> {
        self.add_at(submitter, content, Utc::now())
    }

    pub fn add_at(
        &mut self,
        submitter: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<LinkEntry, RegistryError> {
        if content.trim().is_empty() {
            return Err(RegistryError::Validation {
                reason: "link is empty".to_string(),
            });
        }
        if let Some(prefix) = self.policy.allowed_prefix.as_deref()
            && !content.starts_with(prefix)
        {
            return Err(RegistryError::Validation {
                reason: format!("only links starting with {prefix} are accepted"),
            });
        }
        if self.entries.iter().any(|entry| entry.content == content) {
            return Err(RegistryError::Duplicate {
                content: content.to_string(),
            });
        }

        let entry = LinkEntry {
            submitter: self.attribution(submitter),
            content: content.to_string(),
            recorded_at: now
                .with_timezone(&self.policy.timezone)
                .format(RECORDED_AT_FORMAT)
                .to_string(),
        };
        self.entries.push(entry.clone());
        info!(submitter = %entry.submitter, content = %entry.content, "link added");
        self.persist();
        Ok(entry)
    }

    pub fn list(&self) -> Listing<'_> {
        if self.entries.is_empty() {
            return Listing::Empty;
        }
        Listing::Grouped(group_by_submitter(&self.entries))
    }

    /// Removes the entry at a 1-based position of the flat insertion order. Only the
    /// administrator or the entry's submitter may remove it.
    pub fn remove_at(
        &mut self,
        position: usize,
        requester: &Requester,
    ) -> Result<LinkEntry, RegistryError> {
        let len = self.entries.len();
        if position == 0 || position > len {
            return Err(RegistryError::Range { position, len });
        }
        let index = position - 1;
        let owner = &self.entries[index].submitter;
        if !self.is_admin(requester) && *owner != self.attribution(&requester.name) {
            return Err(RegistryError::Authorization {
                requester: requester.name.clone(),
                action: "remove this link",
            });
        }

        let removed = self.entries.remove(index);
        info!(position, content = %removed.content, by = %requester.name, "link removed");
        self.persist();
        Ok(removed)
    }

    /// Clears the registry and returns how many entries were dropped.
    pub fn reset(&mut self, origin: ResetOrigin<'_>) -> Result<usize, RegistryError> {
        if let ResetOrigin::Interactive(requester) = origin
            && !self.is_admin(requester)
        {
            return Err(RegistryError::Authorization {
                requester: requester.name.clone(),
                action: "reset the list",
            });
        }

        let cleared = self.entries.len();
        self.entries.clear();
        info!(cleared, "registry reset");
        self.persist();
        Ok(cleared)
    }

    fn attribution(&self, name: &str) -> String {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            self.policy.unknown_submitter.clone()
        } else {
            trimmed.to_string()
        }
    }

    fn persist(&self) {
        if let Err(err) = self.store.save_entries(&self.entries) {
            warn!(error = %err, count = self.entries.len(), "failed to persist links, keeping in-memory state");
        }
    }
}
