use crate::recs::types::{DesiredState, EmotionalState, RewardComponents, RewardResult};

use super::{cosine2, rating_term, watched_fraction};

const ALIGNMENT_WEIGHT: f64 = 0.5;
const COMPLETION_WEIGHT: f64 = 0.3;
const RATING_WEIGHT: f64 = 0.2;

/// Alternate reward shape observed in the source system: signed transition
/// alignment blended with completion and rating as first-class terms.
#[allow(clippy::too_many_arguments)]
pub fn calculate(
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

    // Signed alignment, 0.0 neutral on zero-magnitude vectors.
    let alignment = cosine2(actual_v, actual_a, desired_v, desired_a).unwrap_or(0.0);

    let fraction = watched_fraction(completed, watched_duration_s, total_duration_s);
    let completion = 2.0 * fraction - 1.0;
    let rating_score = rating_term(rating);

    let reward = (ALIGNMENT_WEIGHT * alignment
        + COMPLETION_WEIGHT * completion
        + RATING_WEIGHT * rating_score)
        .clamp(-1.0, 1.0);

    let components = RewardComponents {
        direction: (alignment + 1.0) / 2.0,
        magnitude: 0.0,
        proximity: 0.0,
        completion,
        rating: rating_score,
    };

    let explanation = if ALIGNMENT_WEIGHT * alignment.abs()
        >= COMPLETION_WEIGHT * completion.abs()
    {
        if alignment >= 0.0 {
            format!("transition aligned with goal ({:.2})", alignment)
        } else {
            format!("transition opposed goal ({:.2})", alignment)
        }
    } else if completion >= 0.0 {
        "engagement carried the reward".to_string()
    } else {
        "early abandon dragged the reward down".to_string()
    };

    RewardResult {
        reward,
        components,
        explanation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recs::types::Intensity;

    #[test]
    fn full_watch_and_top_rating_is_positive() {
        let before = EmotionalState::new(-0.4, 0.3, 0.6);
        let after = EmotionalState::new(0.2, 0.0, 0.4);
        let desired = DesiredState {
            target_valence: 0.5,
            target_arousal: -0.1,
            target_stress: 0.3,
            intensity: Intensity::Moderate,
        };
        let result = calculate(&before, &after, &desired, true, Some(5), 600.0, 600.0);
        assert!(result.reward > 0.5, "got {}", result.reward);
        assert!(result.reward <= 1.0);
    }
}
