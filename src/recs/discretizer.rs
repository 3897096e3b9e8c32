use crate::recs::config::DiscretizerConfig;
use crate::recs::types::{EmotionalState, StateKey};

/// Maps a continuous emotional state to a bounded discrete key by bucketing
/// each axis into equal-width bins. Coarse on purpose: a small state space
/// lets the Q-table converge with limited data.
#[derive(Debug, Clone)]
pub struct StateDiscretizer {
    config: DiscretizerConfig,
}

impl StateDiscretizer {
    pub fn new(config: DiscretizerConfig) -> Self {
        Self { config }
    }

    /// Number of distinct keys this discretizer can produce.
    pub fn state_space_size(&self) -> usize {
        self.config.valence_bins * self.config.arousal_bins * self.config.stress_bins
    }

    pub fn discretize(&self, state: &EmotionalState) -> StateKey {
        let v = bucket(state.valence, -1.0, 1.0, self.config.valence_bins);
        let a = bucket(state.arousal, -1.0, 1.0, self.config.arousal_bins);
        let s = bucket(state.stress, 0.0, 1.0, self.config.stress_bins);
        StateKey(format!("v{v}:a{a}:s{s}"))
    }
}

impl Default for StateDiscretizer {
    fn default() -> Self {
        Self::new(DiscretizerConfig::default())
    }
}

fn bucket(value: f64, min: f64, max: f64, bins: usize) -> usize {
    let max_idx = bins.saturating_sub(1);
    let idx = ((value - min) / (max - min) * bins as f64).floor() as i64;
    idx.clamp(0, max_idx as i64) as usize
}
