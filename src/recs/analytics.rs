use std::collections::HashMap;

use crate::recs::config::AnalyticsConfig;
use crate::recs::types::{
    ContentStats, Experience, LearningProgress, LearningStage, RewardTrend,
};

// Fallback ε approximation when the policy engine's value is unavailable
// (e.g. the process restarted and only the persisted log is at hand).
const FALLBACK_INITIAL_EPSILON: f64 = 0.3;
const FALLBACK_DECAY: f64 = 0.95;
const FALLBACK_MIN_EPSILON: f64 = 0.10;

/// Summarizes learning quality from the accumulated experience log. Pure
/// function of its inputs: no hidden state, recomputed on demand.
#[derive(Debug, Clone)]
pub struct ProgressAnalytics {
    config: AnalyticsConfig,
}

impl ProgressAnalytics {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self { config }
    }

    pub fn compute_progress(
        &self,
        user_id: &str,
        history: &[Experience],
        exploration_rate: Option<f64>,
        recent_q_deltas: &[f64],
    ) -> LearningProgress {
        let rewards: Vec<f64> = history.iter().map(|e| e.reward).collect();
        let n = rewards.len();

        let average_reward = mean(&rewards);
        let reward_trend = self.trend(&rewards);
        let exploration_rate = exploration_rate.unwrap_or_else(|| {
            (FALLBACK_INITIAL_EPSILON * FALLBACK_DECAY.powi(n as i32)).max(FALLBACK_MIN_EPSILON)
        });

        let (convergence_score, stage) = self.convergence(&rewards, recent_q_deltas);

        let (best_content, worst_content) = per_content_stats(history);

        LearningProgress {
            user_id: user_id.to_string(),
            experience_count: n,
            average_reward,
            reward_trend,
            exploration_rate,
            convergence_score,
            stage,
            best_content,
            worst_content,
        }
    }

    /// Mean of the last window vs. the window preceding it. Stable until at
    /// least five data points exist.
    fn trend(&self, rewards: &[f64]) -> RewardTrend {
        if rewards.len() < 5 {
            return RewardTrend::Stable;
        }
        let window = self.config.trend_window;
        let last_start = rewards.len().saturating_sub(window);
        let last = &rewards[last_start..];
        let prev_start = last_start.saturating_sub(window);
        let prev = &rewards[prev_start..last_start];
        if prev.is_empty() {
            return RewardTrend::Stable;
        }

        let delta = mean(last) - mean(prev);
        if delta > self.config.trend_threshold {
            RewardTrend::Improving
        } else if delta < -self.config.trend_threshold {
            RewardTrend::Declining
        } else {
            RewardTrend::Stable
        }
    }

    /// Convergence on [0, 100]: reward consistency, Q-value stability,
    /// recent average reward, and an experience-count saturation term.
    /// Forced to 0 / exploring below the cold-start minimum.
    fn convergence(&self, rewards: &[f64], recent_q_deltas: &[f64]) -> (f64, LearningStage) {
        if rewards.len() < self.config.min_experiences {
            return (0.0, LearningStage::Exploring);
        }

        let recent_start = rewards.len().saturating_sub(self.config.trend_window);
        let recent = &rewards[recent_start..];

        let consistency = 1.0 - variance(recent).min(1.0);
        let stability = if recent_q_deltas.is_empty() {
            0.5
        } else {
            1.0 - mean_abs(recent_q_deltas).min(1.0)
        };
        let recent_reward = ((mean(recent) + 1.0) / 2.0).clamp(0.0, 1.0);
        let saturation = (rewards.len() as f64 / self.config.saturation_count as f64).min(1.0);

        let score = (100.0
            * (self.config.variance_weight * consistency
                + self.config.stability_weight * stability
                + self.config.reward_weight * recent_reward
                + self.config.saturation_weight * saturation))
            .clamp(0.0, 100.0);

        let stage = if score < self.config.learning_threshold {
            LearningStage::Exploring
        } else if score < self.config.confident_threshold {
            LearningStage::Learning
        } else {
            LearningStage::Confident
        };

        (score, stage)
    }
}

impl Default for ProgressAnalytics {
    fn default() -> Self {
        Self::new(AnalyticsConfig::default())
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn mean_abs(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| v.abs()).sum::<f64>() / values.len() as f64
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

#[derive(Default)]
struct ContentAccumulator {
    reward_sum: f64,
    plays: u32,
    completed: u32,
    rating_sum: f64,
    rating_count: u32,
}

fn per_content_stats(
    history: &[Experience],
) -> (Option<ContentStats>, Option<ContentStats>) {
    let mut by_content: HashMap<&str, ContentAccumulator> = HashMap::new();
    for exp in history {
        let acc = by_content.entry(exp.content_id.as_str()).or_default();
        acc.reward_sum += exp.reward;
        acc.plays += 1;
        if exp.completed {
            acc.completed += 1;
        }
        if let Some(r) = exp.rating {
            acc.rating_sum += r as f64;
            acc.rating_count += 1;
        }
    }

    let mut stats: Vec<ContentStats> = by_content
        .into_iter()
        .map(|(content_id, acc)| ContentStats {
            content_id: content_id.to_string(),
            mean_reward: acc.reward_sum / acc.plays as f64,
            play_count: acc.plays,
            completion_rate: acc.completed as f64 / acc.plays as f64,
            mean_rating: (acc.rating_count > 0)
                .then(|| acc.rating_sum / acc.rating_count as f64),
        })
        .collect();

    // Deterministic ordering for ties.
    stats.sort_by(|a, b| {
        b.mean_reward
            .partial_cmp(&a.mean_reward)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.content_id.cmp(&b.content_id))
    });

    let best = stats.first().cloned();
    let worst = stats.last().cloned();
    (best, worst)
}
