use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::recs::config::{ExplorationConfig, ExplorationStrategyKind};

#[derive(Debug, Clone, Copy)]
struct EpsilonState {
    epsilon: f64,
    last_updated: i64,
}

/// Per-user exploration state plus the injected random source. The RNG is
/// seedable so ranked output is reproducible in tests; production wiring
/// seeds from the OS.
pub struct ExplorationPolicy {
    config: ExplorationConfig,
    rng: Mutex<ChaCha8Rng>,
    epsilons: RwLock<HashMap<String, EpsilonState>>,
}

impl ExplorationPolicy {
    pub fn new(config: ExplorationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };
        Self {
            config,
            rng: Mutex::new(rng),
            epsilons: RwLock::new(HashMap::new()),
        }
    }

    pub fn strategy(&self) -> ExplorationStrategyKind {
        self.config.strategy
    }

    pub fn ucb_c(&self) -> f64 {
        self.config.ucb_c
    }

    /// Current ε for the user, initial value when none has been tracked yet.
    pub fn epsilon(&self, user_id: &str) -> f64 {
        self.epsilons
            .read()
            .get(user_id)
            .map(|s| s.epsilon)
            .unwrap_or(self.config.initial_epsilon)
    }

    /// Multiplies the user's ε by the decay factor, floored at the minimum so
    /// exploration never fully stops.
    pub fn decay(&self, user_id: &str) -> f64 {
        let mut guard = self.epsilons.write();
        let state = guard.entry(user_id.to_string()).or_insert(EpsilonState {
            epsilon: self.config.initial_epsilon,
            last_updated: 0,
        });
        state.epsilon = (state.epsilon * self.config.epsilon_decay).max(self.config.min_epsilon);
        state.last_updated = chrono::Utc::now().timestamp_millis();
        state.epsilon
    }

    /// One ε-greedy coin flip for the user. Always false under UCB, where
    /// exploration is driven by visit counts instead of a coin.
    pub fn roll(&self, user_id: &str) -> bool {
        if self.config.strategy == ExplorationStrategyKind::Ucb {
            return false;
        }
        let epsilon = self.epsilon(user_id);
        self.rng.lock().random::<f64>() < epsilon
    }

    pub fn random_index(&self, len: usize) -> usize {
        debug_assert!(len > 0);
        self.rng.lock().random_range(0..len)
    }

    pub fn invalidate(&self, user_id: &str) {
        self.epsilons.write().remove(user_id);
    }

    pub fn cleanup_stale(&self, max_age_ms: i64) -> usize {
        let now = chrono::Utc::now().timestamp_millis();
        let mut guard = self.epsilons.write();
        let before = guard.len();
        guard.retain(|_, s| now - s.last_updated <= max_age_ms);
        before - guard.len()
    }

    pub fn tracked_users(&self) -> usize {
        self.epsilons.read().len()
    }
}
