use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::recs::config::{ExplorationConfig, ExplorationStrategyKind, QLearningConfig};
use crate::recs::discretizer::StateDiscretizer;
use crate::recs::error::EngineError;
use crate::recs::qpolicy::exploration::ExplorationPolicy;
use crate::recs::qpolicy::store::{QKey, QTableStore};
use crate::recs::types::{Candidate, Experience, PolicyUpdate, StateKey};

#[derive(Debug, Clone)]
pub struct SelectedAction {
    pub content_id: String,
    pub is_exploration: bool,
}

/// Owns the Q-table and the exploration strategy; `update_policy` is the
/// only mutator of learned values. The store is injected, never ambient.
pub struct QPolicyEngine {
    store: Arc<dyn QTableStore>,
    discretizer: StateDiscretizer,
    config: QLearningConfig,
    exploration: ExplorationPolicy,
    recent_deltas: RwLock<HashMap<String, VecDeque<f64>>>,
}

impl QPolicyEngine {
    pub fn new(
        config: QLearningConfig,
        exploration: ExplorationConfig,
        discretizer: StateDiscretizer,
        store: Arc<dyn QTableStore>,
    ) -> Self {
        Self {
            store,
            discretizer,
            config,
            exploration: ExplorationPolicy::new(exploration),
            recent_deltas: RwLock::new(HashMap::new()),
        }
    }

    /// Stored value or the optimistic-but-neutral prior. Read-only: never
    /// creates an entry.
    pub fn q_value(
        &self,
        user_id: &str,
        state_key: &StateKey,
        content_id: &str,
    ) -> Result<f64, EngineError> {
        let key = QKey::new(user_id, state_key.clone(), content_id);
        Ok(self
            .store
            .get(&key)?
            .map(|e| e.q_value)
            .unwrap_or(self.config.default_q))
    }

    pub fn visit_count(
        &self,
        user_id: &str,
        state_key: &StateKey,
        content_id: &str,
    ) -> Result<u32, EngineError> {
        let key = QKey::new(user_id, state_key.clone(), content_id);
        Ok(self.store.get(&key)?.map(|e| e.visit_count).unwrap_or(0))
    }

    /// Picks one candidate under the configured exploration strategy.
    /// ε-greedy: random with probability ε, otherwise argmax q with ties
    /// broken by similarity then insertion order. UCB: argmax of q plus the
    /// visit-count uncertainty bonus, unvisited candidates first.
    pub fn select_action(
        &self,
        user_id: &str,
        state_key: &StateKey,
        candidates: &[Candidate],
    ) -> Result<Option<SelectedAction>, EngineError> {
        if candidates.is_empty() {
            return Ok(None);
        }

        match self.exploration.strategy() {
            ExplorationStrategyKind::EpsilonGreedy => {
                if self.exploration.roll(user_id) {
                    let idx = self.exploration.random_index(candidates.len());
                    return Ok(Some(SelectedAction {
                        content_id: candidates[idx].content_id.clone(),
                        is_exploration: true,
                    }));
                }

                let mut best_idx = 0;
                let mut best_q = self.q_value(user_id, state_key, &candidates[0].content_id)?;
                for (idx, candidate) in candidates.iter().enumerate().skip(1) {
                    let q = self.q_value(user_id, state_key, &candidate.content_id)?;
                    let better = q > best_q
                        || (q == best_q && candidate.similarity > candidates[best_idx].similarity);
                    if better {
                        best_idx = idx;
                        best_q = q;
                    }
                }
                Ok(Some(SelectedAction {
                    content_id: candidates[best_idx].content_id.clone(),
                    is_exploration: false,
                }))
            }
            ExplorationStrategyKind::Ucb => {
                let mut visits = Vec::with_capacity(candidates.len());
                let mut total: u64 = 0;
                for candidate in candidates {
                    let n = self.visit_count(user_id, state_key, &candidate.content_id)?;
                    total += n as u64;
                    visits.push(n);
                }

                let ln_total = (total.max(1) as f64).ln();
                let c = self.exploration.ucb_c();
                let mut best_idx = 0;
                let mut best_score = f64::NEG_INFINITY;
                for (idx, candidate) in candidates.iter().enumerate() {
                    let score = if visits[idx] == 0 {
                        f64::INFINITY
                    } else {
                        let q = self.q_value(user_id, state_key, &candidate.content_id)?;
                        q + c * (ln_total / visits[idx] as f64).sqrt()
                    };
                    if score > best_score {
                        best_idx = idx;
                        best_score = score;
                    }
                }
                Ok(Some(SelectedAction {
                    content_id: candidates[best_idx].content_id.clone(),
                    is_exploration: visits[best_idx] == 0,
                }))
            }
        }
    }

    /// Whether a ranked slot holding a candidate with `visit_count` visits
    /// counts as exploration. Unexplored content is always exploratory.
    pub fn slot_exploration(&self, user_id: &str, visit_count: u32) -> bool {
        if visit_count == 0 {
            return true;
        }
        self.exploration.roll(user_id)
    }

    /// Q-learning step: `Q ← Q + α·(r + γ·max_a' Q(s',a') − Q)`. The
    /// bootstrap max covers only content with a recorded value for the next
    /// state; with none recorded the term is 0. Applied atomically per key
    /// through the store, so concurrent feedback for the same user/content
    /// pair never loses an update.
    pub fn update_policy(
        &self,
        user_id: &str,
        experience: &Experience,
    ) -> Result<PolicyUpdate, EngineError> {
        let state_key = self.discretizer.discretize(&experience.state_before);
        let next_key = self.discretizer.discretize(&experience.state_after);

        let bootstrap = self
            .store
            .max_q_for_state(user_id, &next_key)?
            .unwrap_or(0.0);
        let target = experience.reward + self.config.gamma * bootstrap;

        let key = QKey::new(user_id, state_key.clone(), experience.content_id.as_str());
        let alpha = self.config.alpha;
        let now = chrono::Utc::now().timestamp_millis();

        let mut old_q = self.config.default_q;
        let mut td_error = 0.0;
        let entry = self.store.update(&key, self.config.default_q, &mut |e| {
            old_q = e.q_value;
            td_error = target - e.q_value;
            e.q_value += alpha * td_error;
            e.visit_count += 1;
            e.last_updated = now;
        })?;

        self.record_delta(user_id, (entry.q_value - old_q).abs());

        Ok(PolicyUpdate {
            state_key,
            old_q,
            new_q: entry.q_value,
            td_error,
            visit_count: entry.visit_count,
        })
    }

    /// ε ← max(ε·decay, ε_min), called after each processed experience.
    pub fn decay_exploration(&self, user_id: &str) -> f64 {
        self.exploration.decay(user_id)
    }

    pub fn exploration_rate(&self, user_id: &str) -> f64 {
        self.exploration.epsilon(user_id)
    }

    /// Recent |ΔQ| magnitudes for the user, oldest first. Feeds the
    /// analytics' Q-stability term.
    pub fn recent_q_deltas(&self, user_id: &str) -> Vec<f64> {
        self.recent_deltas
            .read()
            .get(user_id)
            .map(|d| d.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn invalidate_user(&self, user_id: &str) {
        self.exploration.invalidate(user_id);
        self.recent_deltas.write().remove(user_id);
    }

    pub fn cleanup_stale_users(&self, max_age_ms: i64) -> usize {
        self.exploration.cleanup_stale(max_age_ms)
    }

    pub fn tracked_users(&self) -> usize {
        self.exploration.tracked_users()
    }

    pub fn table_size(&self) -> usize {
        self.store.len()
    }

    fn record_delta(&self, user_id: &str, delta: f64) {
        let mut guard = self.recent_deltas.write();
        let window = guard.entry(user_id.to_string()).or_default();
        window.push_back(delta);
        while window.len() > self.config.recent_delta_window {
            window.pop_front();
        }
    }
}
