use serde::Serialize;

use crate::rl::actions::Action;
use crate::rl::config::RewardConfig;
use crate::rl::types::{EmotionalState, EngagementLevel, Mode, PromptNecessity, State};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardBreakdown {
    pub engagement: f64,
    pub vocabulary: f64,
    pub emotional_penalty: f64,
    pub clarification_shaping: f64,
    pub prompt_overuse_penalty: f64,
    /// Sum of the terms clamped to [-1, 1].
    pub total: f64,
}

/// Scores a (state, action) pair by engagement and vocabulary progress,
/// shaped by emotion and by how the action fits the engagement level.
#[derive(Debug, Clone, Default)]
pub struct RewardModel {
    config: RewardConfig,
}

impl RewardModel {
    pub fn new(config: RewardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    pub fn reward(&self, state: &State, action: &Action) -> f64 {
        self.breakdown(state, action).total
    }

    pub fn breakdown(&self, state: &State, action: &Action) -> RewardBreakdown {
        let cfg = &self.config;
        let low_engagement = state.engagement() == EngagementLevel::Low;

        let engagement = cfg.engagement_weight * state.engagement().score();
        let vocabulary = match state.mode() {
            Mode::Interaction => cfg.vocabulary_weight * state.vocabulary_usage().score(),
            Mode::Narration => 0.0,
        };

        let emotional_penalty = match state.emotion() {
            EmotionalState::Angry => cfg.anger_penalty,
            EmotionalState::Surprise => cfg.surprise_penalty,
            _ => 0.0,
        };

        let clarification_shaping = match (action.is_clarification(), low_engagement) {
            (true, true) => cfg.clarification_low_engagement_bonus,
            (true, false) => cfg.clarification_penalty,
            (false, _) => 0.0,
        };

        let prompt_overuse_penalty =
            if state.prompt_necessity() == PromptNecessity::Yes && low_engagement {
                cfg.prompt_overuse_penalty
            } else {
                0.0
            };

        let total = (engagement
            + vocabulary
            + emotional_penalty
            + clarification_shaping
            + prompt_overuse_penalty)
            .clamp(-1.0, 1.0);

        RewardBreakdown {
            engagement,
            vocabulary,
            emotional_penalty,
            clarification_shaping,
            prompt_overuse_penalty,
            total,
        }
    }
}
