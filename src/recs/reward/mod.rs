pub mod directional;
pub mod engagement;

use crate::recs::config::{RewardConfig, RewardStrategyKind};
use crate::recs::types::{DesiredState, EmotionalState, RewardResult};

pub(crate) const ZERO_MAGNITUDE_EPS: f64 = 1e-9;

/// Cosine similarity of two 2-d vectors, `None` when either has zero
/// magnitude. Callers substitute the neutral value their scale requires.
pub(crate) fn cosine2(ax: f64, ay: f64, bx: f64, by: f64) -> Option<f64> {
    let na = (ax * ax + ay * ay).sqrt();
    let nb = (bx * bx + by * by).sqrt();
    if na < ZERO_MAGNITUDE_EPS || nb < ZERO_MAGNITUDE_EPS {
        return None;
    }
    Some(((ax * bx + ay * by) / (na * nb)).clamp(-1.0, 1.0))
}

/// Fraction of the item actually watched, on [0, 1]. A completed session
/// counts as a full watch even when durations are missing.
pub(crate) fn watched_fraction(completed: bool, watched_s: f64, total_s: f64) -> f64 {
    if completed {
        return 1.0;
    }
    if total_s <= 0.0 {
        return 0.0;
    }
    (watched_s / total_s).clamp(0.0, 1.0)
}

/// 1-5 star rating mapped linearly to [-1, 1], 3 stars neutral, absent
/// rating contributing nothing.
pub(crate) fn rating_term(rating: Option<u8>) -> f64 {
    match rating {
        Some(r) => ((r as f64 - 3.0) / 2.0).clamp(-1.0, 1.0),
        None => 0.0,
    }
}

/// Turns an observed emotional-state transition plus engagement signals into
/// a scalar reward on [-1, 1]. Pure and total: in-range inputs never panic.
///
/// Two shapes are supported and deliberately kept separate: the directional
/// strategy scores how far the user travelled toward the goal, the
/// engagement strategy leans on completion and rating. Which one runs is a
/// configuration decision, not a code path merge.
#[derive(Debug, Clone)]
pub struct RewardCalculator {
    config: RewardConfig,
}

impl RewardCalculator {
    pub fn new(config: RewardConfig) -> Self {
        Self { config }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn calculate(
        &self,
        before: &EmotionalState,
        after: &EmotionalState,
        desired: &DesiredState,
        completed: bool,
        rating: Option<u8>,
        watched_duration_s: f64,
        total_duration_s: f64,
    ) -> RewardResult {
        match self.config.strategy {
            RewardStrategyKind::Directional => directional::calculate(
                &self.config,
                before,
                after,
                desired,
                completed,
                rating,
                watched_duration_s,
                total_duration_s,
            ),
            RewardStrategyKind::Engagement => engagement::calculate(
                before,
                after,
                desired,
                completed,
                rating,
                watched_duration_s,
                total_duration_s,
            ),
        }
    }
}

impl Default for RewardCalculator {
    fn default() -> Self {
        Self::new(RewardConfig::default())
    }
}
