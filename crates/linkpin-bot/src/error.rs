use thiserror::Error;

/// A failed publish, pin, unpin, delete or callback answer. Always absorbed and logged;
/// registry state is never rolled back because of one.
#[derive(Debug, Clone, Error)]
#[error("transport {operation} failed: {detail}")]
pub struct TransportError {
    pub operation: &'static str,
    pub detail: String,
}

impl TransportError {
    pub fn new(operation: &'static str, err: &anyhow::Error) -> Self {
        Self {
            operation,
            detail: format!("{err:#}"),
        }
    }
}
