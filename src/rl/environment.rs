//! Synthetic transition model for offline pretraining.
//!
//! Engagement, emotion and the interaction answer features are redrawn
//! uniformly on every step. Vocabulary usage only moves under
//! lexical-syntactic actions, as a lazy walk between adjacent buckets.
//! Live sessions never call into this module.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::rl::actions::Action;
use crate::rl::config::{EnvironmentConfig, InitialState};
use crate::rl::types::{
    EmotionalState, EngagementLevel, InteractionDetails, Mode, PromptNecessity, ResponseLength,
    ResponseQuality, State, VocabularyUsage,
};

#[derive(Debug, Clone)]
pub struct SimulatedEnvironment {
    config: EnvironmentConfig,
    rng: ChaCha8Rng,
}

impl SimulatedEnvironment {
    pub fn new(config: EnvironmentConfig) -> Self {
        let seed = config.seed.unwrap_or_else(|| {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(42)
        });
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn with_seed(config: EnvironmentConfig, seed: u64) -> Self {
        Self::new(EnvironmentConfig {
            seed: Some(seed),
            ..config
        })
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// Starting state of the fixed canonical session opener.
    pub fn canonical_state() -> State {
        State::interaction(
            EngagementLevel::Medium,
            EmotionalState::Happy,
            InteractionDetails {
                response_quality: ResponseQuality::Average,
                prompt_necessity: PromptNecessity::Yes,
                response_length: ResponseLength::Medium,
                vocabulary_usage: VocabularyUsage::Medium,
                wh_question_detected: false,
            },
        )
    }

    pub fn reset(&mut self) -> State {
        match self.config.initial_state {
            InitialState::Canonical => Self::canonical_state(),
            InitialState::Random => self.random_state(),
        }
    }

    /// Uniform draw over every field, respecting the narration invariant.
    pub fn random_state(&mut self) -> State {
        let mode = if self.rng.gen_bool(0.5) {
            Mode::Interaction
        } else {
            Mode::Narration
        };
        let engagement = pick(&mut self.rng, &EngagementLevel::ALL);
        let emotion = pick(&mut self.rng, &EmotionalState::ALL);
        let vocabulary_usage = pick(&mut self.rng, &VocabularyUsage::ALL);
        let details = self.random_details(vocabulary_usage);
        State::new(mode, engagement, emotion, details)
    }

    pub fn transition(&mut self, state: &State, action: &Action) -> State {
        let engagement = pick(&mut self.rng, &EngagementLevel::ALL);
        let emotion = pick(&mut self.rng, &EmotionalState::ALL);

        match state.mode() {
            Mode::Narration => State::narration(engagement, emotion),
            Mode::Interaction => {
                let vocabulary_usage = if action.is_lexical_syntactic() {
                    self.step_vocabulary(state.vocabulary_usage())
                } else {
                    state.vocabulary_usage()
                };
                let details = self.random_details(vocabulary_usage);
                State::interaction(engagement, emotion, details)
            }
        }
    }

    fn random_details(&mut self, vocabulary_usage: VocabularyUsage) -> InteractionDetails {
        InteractionDetails {
            response_quality: pick(&mut self.rng, &ResponseQuality::ALL),
            prompt_necessity: pick(&mut self.rng, &PromptNecessity::ALL),
            response_length: pick(&mut self.rng, &ResponseLength::ALL),
            vocabulary_usage,
            wh_question_detected: self.rng.gen_bool(0.5),
        }
    }

    fn step_vocabulary(&mut self, current: VocabularyUsage) -> VocabularyUsage {
        let stay = self.config.vocabulary_stay_probability.clamp(0.0, 1.0);
        if self.rng.gen::<f64>() < stay {
            return current;
        }
        match current {
            VocabularyUsage::Low => VocabularyUsage::Medium,
            VocabularyUsage::High => VocabularyUsage::Medium,
            VocabularyUsage::Medium => {
                if self.rng.gen_bool(0.5) {
                    current.lower()
                } else {
                    current.higher()
                }
            }
        }
    }
}

fn pick<T: Copy>(rng: &mut ChaCha8Rng, values: &[T]) -> T {
    values[rng.gen_range(0..values.len())]
}
