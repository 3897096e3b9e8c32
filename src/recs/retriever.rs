use std::future::Future;

use crate::recs::error::EngineError;
use crate::recs::types::{Candidate, TransitionVector};

/// Similarity-index collaborator the core consumes. Given the transition the
/// user wants to make, returns up to `limit` candidate content items with
/// similarity scores on [0, 1].
///
/// Returning fewer candidates than requested (or none) is degraded
/// retrieval, not an error: ranking proceeds with whatever came back. The
/// facade wraps the call in a timeout; implementations should not add their
/// own retry loops.
pub trait VectorRetriever: Send + Sync {
    fn query(
        &self,
        transition: TransitionVector,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Candidate>, EngineError>> + Send;
}
