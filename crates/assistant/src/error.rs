use thiserror::Error;

use salesdesk_ai::AiError;
use salesdesk_memory::MemoryError;

use crate::classifier::ClassifyError;
use crate::llm::LlmError;

/// Failure inside an intent handler. Turned into a reply, never surfaced.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Ai(#[from] AiError),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl DispatchError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, DispatchError::Ai(e) if e.is_session_expired())
    }
}

/// Failure before an intent could be handled (context, persistence, classification).
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("memory: {0}")]
    Memory(#[from] MemoryError),

    #[error("classification: {0}")]
    Classify(#[from] ClassifyError),
}
