use serde::{Deserialize, Serialize};

use crate::recs::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum RewardStrategyKind {
    #[default]
    Directional,
    Engagement,
}

impl RewardStrategyKind {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "engagement" => Self::Engagement,
            _ => Self::Directional,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum ExplorationStrategyKind {
    #[default]
    EpsilonGreedy,
    Ucb,
}

impl ExplorationStrategyKind {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "ucb" => Self::Ucb,
            _ => Self::EpsilonGreedy,
        }
    }
}

/// Scale the Q-table store records values on. The canonical store keeps q in
/// [0, 1]; `SignedUnit` enables the (q+1)/2 normalization in the ranker for
/// stores recording on [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum QScale {
    #[default]
    ZeroOne,
    SignedUnit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscretizerConfig {
    pub valence_bins: usize,
    pub arousal_bins: usize,
    pub stress_bins: usize,
}

impl Default for DiscretizerConfig {
    fn default() -> Self {
        Self {
            valence_bins: 5,
            arousal_bins: 5,
            stress_bins: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardConfig {
    pub strategy: RewardStrategyKind,
    pub direction_weight: f64,
    pub magnitude_weight: f64,
    pub transition_weight: f64,
    pub completion_weight: f64,
    pub rating_weight: f64,
    pub proximity_bonus: f64,
    pub proximity_radius: f64,
    pub min_watch_fraction: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            strategy: RewardStrategyKind::Directional,
            direction_weight: 0.6,
            magnitude_weight: 0.4,
            transition_weight: 0.5,
            completion_weight: 0.15,
            rating_weight: 0.10,
            proximity_bonus: 0.2,
            proximity_radius: 0.15,
            min_watch_fraction: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QLearningConfig {
    pub alpha: f64,
    pub gamma: f64,
    pub default_q: f64,
    pub shard_count: usize,
    pub recent_delta_window: usize,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.9,
            default_q: 0.5,
            shard_count: 16,
            recent_delta_window: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorationConfig {
    pub strategy: ExplorationStrategyKind,
    pub initial_epsilon: f64,
    pub epsilon_decay: f64,
    pub min_epsilon: f64,
    pub ucb_c: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            strategy: ExplorationStrategyKind::EpsilonGreedy,
            initial_epsilon: 0.3,
            epsilon_decay: 0.95,
            min_epsilon: 0.10,
            ucb_c: 2.0,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankerConfig {
    pub q_weight: f64,
    pub sim_weight: f64,
    pub q_scale: QScale,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            q_weight: 0.7,
            sim_weight: 0.3,
            q_scale: QScale::ZeroOne,
        }
    }
}

impl RankerConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        let sum = self.q_weight + self.sim_weight;
        if (sum - 1.0).abs() > 1e-9 {
            return Err(EngineError::InvalidConfig(format!(
                "ranker weights must sum to 1.0, got {sum}"
            )));
        }
        if self.q_weight < 0.0 || self.sim_weight < 0.0 {
            return Err(EngineError::InvalidConfig(
                "ranker weights must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsConfig {
    pub trend_window: usize,
    pub trend_threshold: f64,
    pub min_experiences: usize,
    pub saturation_count: usize,
    pub variance_weight: f64,
    pub stability_weight: f64,
    pub reward_weight: f64,
    pub saturation_weight: f64,
    pub learning_threshold: f64,
    pub confident_threshold: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            trend_window: 10,
            trend_threshold: 0.1,
            min_experiences: 5,
            saturation_count: 50,
            variance_weight: 0.25,
            stability_weight: 0.25,
            reward_weight: 0.30,
            saturation_weight: 0.20,
            learning_threshold: 30.0,
            confident_threshold: 70.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalConfig {
    pub timeout_ms: u64,
    pub default_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 2000,
            default_limit: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub discretizer: DiscretizerConfig,
    pub reward: RewardConfig,
    pub qlearning: QLearningConfig,
    pub exploration: ExplorationConfig,
    pub ranker: RankerConfig,
    pub analytics: AnalyticsConfig,
    pub retrieval: RetrievalConfig,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("MOODREC_REWARD_STRATEGY") {
            config.reward.strategy = RewardStrategyKind::parse(&val);
        }
        if let Ok(val) = std::env::var("MOODREC_EXPLORATION_STRATEGY") {
            config.exploration.strategy = ExplorationStrategyKind::parse(&val);
        }
        if let Ok(val) = std::env::var("MOODREC_EXPLORATION_SEED") {
            config.exploration.seed = val.parse().ok();
        }
        if let Ok(val) = std::env::var("MOODREC_RETRIEVAL_TIMEOUT_MS") {
            if let Ok(ms) = val.parse() {
                config.retrieval.timeout_ms = ms;
            }
        }

        config
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.ranker.validate()?;
        if self.qlearning.shard_count == 0 {
            return Err(EngineError::InvalidConfig(
                "shard count must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.qlearning.alpha) {
            return Err(EngineError::InvalidConfig(format!(
                "alpha must lie in [0, 1], got {}",
                self.qlearning.alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.qlearning.gamma) {
            return Err(EngineError::InvalidConfig(format!(
                "gamma must lie in [0, 1], got {}",
                self.qlearning.gamma
            )));
        }
        Ok(())
    }
}
