use thiserror::Error;

/// Faults the core can surface. Validation of inbound ranges is the caller's
/// contract, never raised here; degraded retrieval (fewer candidates than
/// requested) is not an error at all.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Q-table or history read/write failure, propagated unmodified.
    /// Retries are the collaborator's responsibility.
    #[error("storage fault: {0}")]
    Storage(String),

    /// The vector retriever did not answer within the caller-supplied
    /// timeout. Retryable.
    #[error("vector retrieval timed out after {waited_ms}ms")]
    RetrievalTimeout { waited_ms: u64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EngineError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RetrievalTimeout { .. })
    }
}
