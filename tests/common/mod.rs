#![allow(dead_code)]

use std::sync::Arc;

use tello_rl::rl::actions::{
    default_actions, Action, ClarificationType, LexicalType, SentenceComplexity,
};
use tello_rl::rl::aggregator::{ManualClock, SensorAggregator};
use tello_rl::rl::config::{AggregatorConfig, PolicyConfig};
use tello_rl::rl::policy::QLearningAgent;
use tello_rl::rl::types::{
    EmotionalState, EngagementLevel, InteractionDetails, PromptNecessity, ResponseLength,
    ResponseQuality, State, VocabularyUsage,
};

pub fn seeded_agent(epsilon: f64, seed: u64) -> QLearningAgent {
    let config = PolicyConfig {
        epsilon,
        seed: Some(seed),
        ..PolicyConfig::default()
    };
    QLearningAgent::new(default_actions(), &config).unwrap()
}

pub fn three_actions() -> Vec<Action> {
    vec![
        Action::LexicalSyntactic {
            complexity: SentenceComplexity::Simple,
            lexical_type: LexicalType::Known,
        },
        Action::Clarification {
            clarification_type: ClarificationType::SentenceRepetition,
        },
        Action::NoIntervention,
    ]
}

pub fn aggregator_with_clock() -> (SensorAggregator, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let aggregator = SensorAggregator::with_clock(AggregatorConfig::default(), clock.clone());
    (aggregator, clock)
}

pub fn sample_interaction_state() -> State {
    State::interaction(
        EngagementLevel::Low,
        EmotionalState::Fear,
        InteractionDetails {
            response_quality: ResponseQuality::Weak,
            prompt_necessity: PromptNecessity::Yes,
            response_length: ResponseLength::Short,
            vocabulary_usage: VocabularyUsage::Low,
            wh_question_detected: true,
        },
    )
}

/// A handful of distinct states across both key shapes.
pub fn sample_states() -> Vec<State> {
    let mut states = vec![sample_interaction_state()];
    for engagement in EngagementLevel::ALL {
        for emotion in [EmotionalState::Happy, EmotionalState::Angry] {
            states.push(State::narration(engagement, emotion));
            states.push(State::interaction(
                engagement,
                emotion,
                InteractionDetails::default(),
            ));
        }
    }
    states
}
