use crate::recs::config::RewardConfig;
use crate::recs::types::{DesiredState, EmotionalState, RewardComponents, RewardResult};

use super::{cosine2, rating_term, watched_fraction, ZERO_MAGNITUDE_EPS};

/// Direction/magnitude reward: scores the observed transition against the
/// desired one. The transition core carries most of the weight; completion
/// and rating adjust at a lower combined weight, and a flat proximity bonus
/// rewards landing near the goal even when the path was crooked.
#[allow(clippy::too_many_arguments)]
pub fn calculate(
    config: &RewardConfig,
    before: &EmotionalState,
    after: &EmotionalState,
    desired: &DesiredState,
    completed: bool,
    rating: Option<u8>,
    watched_duration_s: f64,
    total_duration_s: f64,
) -> RewardResult {
    let actual_v = after.valence - before.valence;
    let actual_a = after.arousal - before.arousal;
    let desired_v = desired.target_valence - before.valence;
    let desired_a = desired.target_arousal - before.arousal;

    // Alignment on [0, 1]: (cos + 1) / 2, neutral 0.5 when either transition
    // vector has zero magnitude.
    let alignment = cosine2(actual_v, actual_a, desired_v, desired_a)
        .map(|cos| (cos + 1.0) / 2.0)
        .unwrap_or(0.5);

    // Travelled distance relative to the required one, capped at 1 so
    // overshooting earns no extra credit. Neutral when no travel was asked.
    let actual_mag = (actual_v * actual_v + actual_a * actual_a).sqrt();
    let desired_mag = (desired_v * desired_v + desired_a * desired_a).sqrt();
    let magnitude = if desired_mag < ZERO_MAGNITUDE_EPS {
        0.5
    } else {
        (actual_mag / desired_mag).min(1.0)
    };

    let core = config.direction_weight * alignment + config.magnitude_weight * magnitude;
    let core_signed = 2.0 * core - 1.0;

    let dv = after.valence - desired.target_valence;
    let da = after.arousal - desired.target_arousal;
    let ds = after.stress - desired.target_stress;
    let goal_distance = (dv * dv + da * da + ds * ds).sqrt();
    let proximity = if goal_distance <= config.proximity_radius {
        config.proximity_bonus
    } else {
        0.0
    };

    let fraction = watched_fraction(completed, watched_duration_s, total_duration_s);
    let span = 1.0 - config.min_watch_fraction;
    let completion =
        2.0 * ((fraction - config.min_watch_fraction) / span).clamp(0.0, 1.0) - 1.0;

    let rating_score = rating_term(rating);

    let reward = (config.transition_weight * core_signed
        + config.completion_weight * completion
        + config.rating_weight * rating_score
        + proximity)
        .clamp(-1.0, 1.0);

    let components = RewardComponents {
        direction: alignment,
        magnitude,
        proximity,
        completion,
        rating: rating_score,
    };

    RewardResult {
        reward,
        components,
        explanation: explain(&components, config),
    }
}

fn explain(c: &RewardComponents, config: &RewardConfig) -> String {
    let transition = config.transition_weight
        * (2.0 * (config.direction_weight * c.direction + config.magnitude_weight * c.magnitude)
            - 1.0);
    let completion = config.completion_weight * c.completion;
    let rating = config.rating_weight * c.rating;

    let mut dominant = ("transition", transition);
    for candidate in [("completion", completion), ("rating", rating), ("proximity", c.proximity)] {
        if candidate.1.abs() > dominant.1.abs() {
            dominant = candidate;
        }
    }

    match dominant.0 {
        "transition" if transition >= 0.0 => format!(
            "moved toward goal (alignment {:.2}, distance covered {:.0}%)",
            c.direction,
            c.magnitude * 100.0
        ),
        "transition" => format!("moved away from goal (alignment {:.2})", c.direction),
        "completion" if completion >= 0.0 => "watched through to the end".to_string(),
        "completion" => "abandoned early".to_string(),
        "rating" if rating >= 0.0 => "rated well".to_string(),
        "rating" => "rated poorly".to_string(),
        _ => "landed close to desired state".to_string(),
    }
}
