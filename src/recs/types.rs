use serde::{Deserialize, Serialize};

/// Snapshot of a user's measured emotional state, produced by an external
/// detector. Valence and arousal live on [-1, 1], stress on [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionalState {
    pub valence: f64,
    pub arousal: f64,
    pub stress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub ts: i64,
}

impl EmotionalState {
    pub fn new(valence: f64, arousal: f64, stress: f64) -> Self {
        Self {
            valence,
            arousal,
            stress,
            confidence: None,
            ts: chrono::Utc::now().timestamp_millis(),
        }
    }
}

impl Default for EmotionalState {
    fn default() -> Self {
        Self {
            valence: 0.0,
            arousal: 0.0,
            stress: 0.5,
            confidence: None,
            ts: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum Intensity {
    Subtle,
    #[default]
    Moderate,
    Significant,
}

impl Intensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subtle => "subtle",
            Self::Moderate => "moderate",
            Self::Significant => "significant",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "subtle" => Self::Subtle,
            "significant" => Self::Significant,
            _ => Self::Moderate,
        }
    }
}

/// The user's goal for one recommendation cycle; discarded once feedback
/// closes the loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredState {
    pub target_valence: f64,
    pub target_arousal: f64,
    pub target_stress: f64,
    pub intensity: Intensity,
}

impl Default for DesiredState {
    fn default() -> Self {
        Self {
            target_valence: 0.5,
            target_arousal: 0.0,
            target_stress: 0.3,
            intensity: Intensity::Moderate,
        }
    }
}

/// Discrete token derived from an `EmotionalState` by bucketing, used only
/// as a Q-table lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateKey(pub String);

impl StateKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One learned cell of the Q-table. `q_value` is always finite.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QEntry {
    pub q_value: f64,
    pub visit_count: u32,
    pub last_updated: i64,
}

impl QEntry {
    pub fn with_default_q(default_q: f64) -> Self {
        Self {
            q_value: default_q,
            visit_count: 0,
            last_updated: 0,
        }
    }
}

/// Expected emotional effect of a content item, produced by the external
/// embedding/catalog layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContentProfile {
    pub valence_delta: f64,
    pub arousal_delta: f64,
    pub stress_delta: f64,
}

/// Transition the user wants to make, handed to the vector retriever.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionVector {
    pub valence_delta: f64,
    pub arousal_delta: f64,
    pub stress_delta: f64,
}

impl TransitionVector {
    pub fn between(current: &EmotionalState, desired: &DesiredState) -> Self {
        Self {
            valence_delta: desired.target_valence - current.valence,
            arousal_delta: desired.target_arousal - current.arousal,
            stress_delta: desired.target_stress - current.stress,
        }
    }
}

/// Candidate content returned by the similarity index; ephemeral,
/// request-scoped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content_id: String,
    pub similarity: f64,
    pub profile: ContentProfile,
}

/// Ranked output record for one content slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub content_id: String,
    pub q_value: f64,
    pub similarity: f64,
    pub combined_score: f64,
    pub is_exploration: bool,
    pub predicted_outcome: f64,
    pub reasoning: String,
}

/// Closed feedback loop for one watched item, as submitted by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEvent {
    pub user_id: String,
    pub content_id: String,
    pub state_before: EmotionalState,
    pub state_after: EmotionalState,
    pub desired: DesiredState,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    pub watched_duration_s: f64,
    pub total_duration_s: f64,
}

/// Append-only log entry; the unit the analytics consume. Immutable once
/// written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub user_id: String,
    pub state_before: EmotionalState,
    pub content_id: String,
    pub state_after: EmotionalState,
    pub reward: f64,
    pub desired: DesiredState,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    pub ts: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RewardComponents {
    pub direction: f64,
    pub magnitude: f64,
    pub proximity: f64,
    pub completion: f64,
    pub rating: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardResult {
    pub reward: f64,
    pub components: RewardComponents,
    pub explanation: String,
}

/// Outcome of one TD update, for diagnostics and the analytics' Q-stability
/// term.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyUpdate {
    pub state_key: StateKey,
    pub old_q: f64,
    pub new_q: f64,
    pub td_error: f64,
    pub visit_count: u32,
}

/// Returned by the feedback path. The experience is handed back so the
/// caller's persistence layer can append it to the user's log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyUpdateResult {
    pub reward: RewardResult,
    pub update: PolicyUpdate,
    pub exploration_rate: f64,
    pub experience: Experience,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum RewardTrend {
    Improving,
    #[default]
    Stable,
    Declining,
}

impl RewardTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::Stable => "stable",
            Self::Declining => "declining",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum LearningStage {
    #[default]
    Exploring,
    Learning,
    Confident,
}

impl LearningStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exploring => "exploring",
            Self::Learning => "learning",
            Self::Confident => "confident",
        }
    }
}

/// Per-content aggregate for diagnostic display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentStats {
    pub content_id: String,
    pub mean_reward: f64,
    pub play_count: u32,
    pub completion_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_rating: Option<f64>,
}

/// Derived learning-quality snapshot; recomputed on demand from the
/// experience log, never independently mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningProgress {
    pub user_id: String,
    pub experience_count: usize,
    pub average_reward: f64,
    pub reward_trend: RewardTrend,
    pub exploration_rate: f64,
    pub convergence_score: f64,
    pub stage: LearningStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_content: Option<ContentStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worst_content: Option<ContentStats>,
}
