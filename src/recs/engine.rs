use std::sync::Arc;
use std::time::Duration;

use crate::recs::analytics::ProgressAnalytics;
use crate::recs::config::EngineConfig;
use crate::recs::discretizer::StateDiscretizer;
use crate::recs::error::EngineError;
use crate::recs::qpolicy::{QPolicyEngine, QTableStore, ShardedQTable};
use crate::recs::ranker::HybridRanker;
use crate::recs::retriever::VectorRetriever;
use crate::recs::reward::RewardCalculator;
use crate::recs::types::{
    DesiredState, EmotionalState, Experience, FeedbackEvent, LearningProgress,
    PolicyUpdateResult, Recommendation, TransitionVector,
};

/// Facade over the recommendation core: candidate retrieval + hybrid
/// ranking, the feedback loop (reward → TD update → ε decay), and progress
/// snapshots. Each call is an independent unit of work; the Q-table is the
/// only shared mutable state underneath.
pub struct RecsEngine<R: VectorRetriever> {
    config: EngineConfig,
    discretizer: StateDiscretizer,
    reward: RewardCalculator,
    policy: Arc<QPolicyEngine>,
    ranker: HybridRanker,
    analytics: ProgressAnalytics,
    retriever: R,
}

impl<R: VectorRetriever> std::fmt::Debug for RecsEngine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecsEngine").finish_non_exhaustive()
    }
}

impl<R: VectorRetriever> RecsEngine<R> {
    pub fn new(config: EngineConfig, retriever: R) -> Result<Self, EngineError> {
        let store = Arc::new(ShardedQTable::new(config.qlearning.shard_count));
        Self::with_store(config, retriever, store)
    }

    /// Builds the engine around an injected Q-table store.
    pub fn with_store(
        config: EngineConfig,
        retriever: R,
        store: Arc<dyn QTableStore>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let discretizer = StateDiscretizer::new(config.discretizer.clone());
        let policy = Arc::new(QPolicyEngine::new(
            config.qlearning.clone(),
            config.exploration.clone(),
            discretizer.clone(),
            store,
        ));
        let ranker = HybridRanker::new(Arc::clone(&policy), config.ranker.clone());
        let reward = RewardCalculator::new(config.reward.clone());
        let analytics = ProgressAnalytics::new(config.analytics.clone());

        Ok(Self {
            config,
            discretizer,
            reward,
            policy,
            ranker,
            analytics,
            retriever,
        })
    }

    /// Ranked recommendations for moving the user from `current` toward
    /// `desired`. An empty candidate set from the retriever yields an empty
    /// list, not an error; a timeout surfaces as a retryable fault.
    pub async fn rank(
        &self,
        user_id: &str,
        current: &EmotionalState,
        desired: &DesiredState,
        limit: usize,
    ) -> Result<Vec<Recommendation>, EngineError> {
        let limit = if limit == 0 {
            self.config.retrieval.default_limit
        } else {
            limit
        };

        let transition = TransitionVector::between(current, desired);
        let timeout = Duration::from_millis(self.config.retrieval.timeout_ms);
        let candidates =
            match tokio::time::timeout(timeout, self.retriever.query(transition, limit)).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(EngineError::RetrievalTimeout {
                        waited_ms: self.config.retrieval.timeout_ms,
                    })
                }
            };

        if candidates.is_empty() {
            tracing::debug!(user_id = %user_id, "retrieval returned no candidates");
            return Ok(Vec::new());
        }
        if candidates.len() < limit {
            tracing::debug!(
                user_id = %user_id,
                requested = limit,
                returned = candidates.len(),
                "degraded retrieval, ranking what came back"
            );
        }

        let state_key = self.discretizer.discretize(current);
        let mut ranked = self
            .ranker
            .rank(user_id, &state_key, &candidates, &transition)?;
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// Closes one feedback loop: computes the reward, applies the TD update
    /// and decays the user's exploration rate.
    pub fn apply_feedback(&self, event: &FeedbackEvent) -> Result<PolicyUpdateResult, EngineError> {
        let reward = self.reward.calculate(
            &event.state_before,
            &event.state_after,
            &event.desired,
            event.completed,
            event.rating,
            event.watched_duration_s,
            event.total_duration_s,
        );

        let experience = Experience {
            user_id: event.user_id.clone(),
            state_before: event.state_before,
            content_id: event.content_id.clone(),
            state_after: event.state_after,
            reward: reward.reward,
            desired: event.desired,
            completed: event.completed,
            rating: event.rating,
            ts: chrono::Utc::now().timestamp_millis(),
        };

        let update = self.policy.update_policy(&event.user_id, &experience)?;
        let exploration_rate = self.policy.decay_exploration(&event.user_id);

        tracing::debug!(
            user_id = %event.user_id,
            content_id = %event.content_id,
            reward = reward.reward,
            td_error = update.td_error,
            epsilon = exploration_rate,
            "feedback applied"
        );

        Ok(PolicyUpdateResult {
            reward,
            update,
            exploration_rate,
            experience,
        })
    }

    /// Learning-progress snapshot computed from the caller-supplied ordered
    /// experience log.
    pub fn progress(&self, user_id: &str, history: &[Experience]) -> LearningProgress {
        self.analytics.compute_progress(
            user_id,
            history,
            Some(self.policy.exploration_rate(user_id)),
            &self.policy.recent_q_deltas(user_id),
        )
    }

    pub fn exploration_rate(&self, user_id: &str) -> f64 {
        self.policy.exploration_rate(user_id)
    }

    pub fn invalidate_user(&self, user_id: &str) {
        self.policy.invalidate_user(user_id);
    }

    /// Drops per-user exploration state not touched within `max_age_ms`.
    pub fn cleanup_stale_users(&self, max_age_ms: i64) -> usize {
        let removed = self.policy.cleanup_stale_users(max_age_ms);
        if removed > 0 {
            tracing::info!(removed, "cleaned up stale user exploration state");
        }
        removed
    }

    /// (tracked users, Q-table entries).
    pub fn cache_stats(&self) -> (usize, usize) {
        (self.policy.tracked_users(), self.policy.table_size())
    }

    pub fn policy(&self) -> &QPolicyEngine {
        self.policy.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
