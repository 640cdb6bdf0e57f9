use thiserror::Error;

use salesdesk_core::CustomerId;
use salesdesk_records::RecordsError;

/// Failure of an analytics computation.
///
/// Records failures pass through untouched: this layer does not retry.
#[derive(Debug, Error)]
pub enum AiError {
    #[error(transparent)]
    Records(#[from] RecordsError),

    #[error("customer {0} not found")]
    CustomerNotFound(CustomerId),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl AiError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, AiError::Records(e) if e.is_session_expired())
    }
}
