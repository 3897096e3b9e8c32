#![allow(dead_code)]

use moodrec_engine::recs::error::EngineError;
use moodrec_engine::recs::retriever::VectorRetriever;
use moodrec_engine::recs::types::{
    Candidate, ContentProfile, DesiredState, EmotionalState, Intensity, TransitionVector,
};

pub fn state(valence: f64, arousal: f64, stress: f64) -> EmotionalState {
    EmotionalState::new(valence, arousal, stress)
}

pub fn desired(valence: f64, arousal: f64, stress: f64) -> DesiredState {
    DesiredState {
        target_valence: valence,
        target_arousal: arousal,
        target_stress: stress,
        intensity: Intensity::Moderate,
    }
}

pub fn candidate(content_id: &str, similarity: f64) -> Candidate {
    Candidate {
        content_id: content_id.to_string(),
        similarity,
        profile: ContentProfile {
            valence_delta: 0.3,
            arousal_delta: -0.1,
            stress_delta: -0.2,
        },
    }
}

/// Retriever that always answers with a fixed candidate set.
pub struct FixedRetriever {
    pub candidates: Vec<Candidate>,
}

impl FixedRetriever {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }
}

impl VectorRetriever for FixedRetriever {
    fn query(
        &self,
        _transition: TransitionVector,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<Candidate>, EngineError>> + Send {
        let mut candidates = self.candidates.clone();
        candidates.truncate(limit);
        async move { Ok(candidates) }
    }
}

/// Retriever that never answers in time.
pub struct SlowRetriever {
    pub delay_ms: u64,
}

impl VectorRetriever for SlowRetriever {
    fn query(
        &self,
        _transition: TransitionVector,
        _limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<Candidate>, EngineError>> + Send {
        let delay = self.delay_ms;
        async move {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            Ok(Vec::new())
        }
    }
}

/// Retriever with nothing to offer.
pub struct EmptyRetriever;

impl VectorRetriever for EmptyRetriever {
    fn query(
        &self,
        _transition: TransitionVector,
        _limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<Candidate>, EngineError>> + Send {
        async move { Ok(Vec::new()) }
    }
}
