use std::cmp::Ordering;
use std::sync::Arc;

use crate::recs::config::{QScale, RankerConfig};
use crate::recs::error::EngineError;
use crate::recs::qpolicy::QPolicyEngine;
use crate::recs::reward::cosine2;
use crate::recs::types::{
    Candidate, ContentProfile, Recommendation, StateKey, TransitionVector,
};

/// Fuses learned Q-values with similarity retrieval into one ranked list.
/// The exploration decision is made once per output slot and never revised.
pub struct HybridRanker {
    policy: Arc<QPolicyEngine>,
    config: RankerConfig,
}

impl HybridRanker {
    pub fn new(policy: Arc<QPolicyEngine>, config: RankerConfig) -> Self {
        Self { policy, config }
    }

    pub fn rank(
        &self,
        user_id: &str,
        state_key: &StateKey,
        candidates: &[Candidate],
        transition: &TransitionVector,
    ) -> Result<Vec<Recommendation>, EngineError> {
        let mut ranked = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let q_raw = self.policy.q_value(user_id, state_key, &candidate.content_id)?;
            let visits = self
                .policy
                .visit_count(user_id, state_key, &candidate.content_id)?;

            let q_norm = match self.config.q_scale {
                QScale::ZeroOne => q_raw.clamp(0.0, 1.0),
                QScale::SignedUnit => ((q_raw + 1.0) / 2.0).clamp(0.0, 1.0),
            };
            let similarity = candidate.similarity.clamp(0.0, 1.0);
            let combined = self.config.q_weight * q_norm + self.config.sim_weight * similarity;

            let predicted = outcome_alignment(&candidate.profile, transition);

            ranked.push((
                Recommendation {
                    content_id: candidate.content_id.clone(),
                    q_value: q_raw,
                    similarity,
                    combined_score: combined,
                    is_exploration: false,
                    predicted_outcome: predicted,
                    reasoning: reasoning(&self.config, q_norm, similarity, visits, predicted),
                },
                visits,
            ));
        }

        ranked.sort_by(|(a, _), (b, _)| {
            b.combined_score
                .partial_cmp(&a.combined_score)
                .unwrap_or(Ordering::Equal)
                .then(
                    b.similarity
                        .partial_cmp(&a.similarity)
                        .unwrap_or(Ordering::Equal),
                )
                .then(a.content_id.cmp(&b.content_id))
        });

        Ok(ranked
            .into_iter()
            .map(|(mut rec, visits)| {
                rec.is_exploration = self.policy.slot_exploration(user_id, visits);
                rec
            })
            .collect())
    }
}

/// Alignment between a content item's expected emotional effect and the
/// transition the user wants, on [0, 1]. Exactly 0.5 when either vector has
/// zero magnitude, matching the reward calculator's convention.
pub fn outcome_alignment(profile: &ContentProfile, transition: &TransitionVector) -> f64 {
    cosine2(
        profile.valence_delta,
        profile.arousal_delta,
        transition.valence_delta,
        transition.arousal_delta,
    )
    .map(|cos| (cos + 1.0) / 2.0)
    .unwrap_or(0.5)
}

fn reasoning(
    config: &RankerConfig,
    q_norm: f64,
    similarity: f64,
    visits: u32,
    predicted: f64,
) -> String {
    if visits == 0 {
        return format!(
            "unexplored in this state; similarity {:.2}, predicted alignment {:.2}",
            similarity, predicted
        );
    }
    if config.q_weight * q_norm >= config.sim_weight * similarity {
        format!(
            "learned value {:.2} over {} plays, predicted alignment {:.2}",
            q_norm, visits, predicted
        )
    } else {
        format!(
            "similarity {:.2} leads, learned value {:.2}, predicted alignment {:.2}",
            similarity, q_norm, predicted
        )
    }
}
