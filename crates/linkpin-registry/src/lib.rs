mod entry;
mod error;
mod registry;
mod store;
mod summary;

pub use entry::{LinkEntry, Requester};
pub use error::{RegistryError, StoreError};
pub use registry::{Registry, RegistryPolicy, ResetOrigin};
pub use store::{InMemoryStateStore, JsonStateStore, StateStore};
pub use summary::{Listing, PositionedEntry, SubmitterGroup, Summary, format_summary, group_by_submitter, short_display};

/// Time format used for `recordedAt`, e.g. `07:00:00 18/10/2026`.
pub const RECORDED_AT_FORMAT: &str = "%H:%M:%S %d/%m/%Y";
