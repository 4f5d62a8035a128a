//! Property-based tests for the decision core.
//!
//! Tests the following invariants:
//! - Reward bounds: reward(s, a) stays within [-1, 1] for every pair
//! - Narration narrowing: narration states never carry interaction fields
//! - Key uniqueness: distinct states map to distinct table keys
//! - Window law: only the most recent `capacity` readings affect aggregation
//! - Snapshot round trip: a saved table reloads with identical contents

use proptest::prelude::*;

use tello_rl::rl::actions::{
    default_actions, Action, ActionKind, ActionSpec, ClarificationType, LexicalType,
    SentenceComplexity,
};
use tello_rl::rl::aggregator::SensorAggregator;
use tello_rl::rl::config::{AggregatorConfig, PolicyConfig, RewardConfig};
use tello_rl::rl::policy::QLearningAgent;
use tello_rl::rl::reward::RewardModel;
use tello_rl::rl::types::{
    EmotionalState, EngagementLevel, InteractionDetails, Mode, PromptNecessity, ResponseLength,
    ResponseQuality, State, VocabularyUsage,
};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_mode() -> impl Strategy<Value = Mode> {
    prop_oneof![Just(Mode::Narration), Just(Mode::Interaction)]
}

fn arb_engagement() -> impl Strategy<Value = EngagementLevel> {
    prop::sample::select(EngagementLevel::ALL.to_vec())
}

fn arb_emotion() -> impl Strategy<Value = EmotionalState> {
    prop::sample::select(EmotionalState::ALL.to_vec())
}

fn arb_details() -> impl Strategy<Value = InteractionDetails> {
    (
        prop::sample::select(ResponseQuality::ALL.to_vec()),
        prop::sample::select(PromptNecessity::ALL.to_vec()),
        prop::sample::select(ResponseLength::ALL.to_vec()),
        prop::sample::select(VocabularyUsage::ALL.to_vec()),
        any::<bool>(),
    )
        .prop_map(
            |(response_quality, prompt_necessity, response_length, vocabulary_usage, wh)| {
                InteractionDetails {
                    response_quality,
                    prompt_necessity,
                    response_length,
                    vocabulary_usage,
                    wh_question_detected: wh,
                }
            },
        )
}

fn arb_state() -> impl Strategy<Value = State> {
    (arb_mode(), arb_engagement(), arb_emotion(), arb_details())
        .prop_map(|(mode, engagement, emotion, details)| {
            State::new(mode, engagement, emotion, details)
        })
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop::sample::select(default_actions())
}

fn arb_reward_config() -> impl Strategy<Value = RewardConfig> {
    (
        0.0f64..=2.0,
        0.0f64..=2.0,
        -1.0f64..=0.0,
        -1.0f64..=0.0,
        -1.0f64..=1.0,
        -1.0f64..=1.0,
        -1.0f64..=0.0,
    )
        .prop_map(|(ew, vw, anger, surprise, bonus, penalty, overuse)| RewardConfig {
            engagement_weight: ew,
            vocabulary_weight: vw,
            anger_penalty: anger,
            surprise_penalty: surprise,
            clarification_low_engagement_bonus: bonus,
            clarification_penalty: penalty,
            prompt_overuse_penalty: overuse,
        })
}

fn arb_label() -> impl Strategy<Value = (&'static str, &'static str)> {
    prop::sample::select(vec![
        ("Front", "Happy"),
        ("Left", "Sad"),
        ("Right", "Fear"),
        ("Down", "Angry"),
        ("Up", "Surprise"),
    ])
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn reward_is_bounded(state in arb_state(), action in arb_action()) {
        let reward = RewardModel::default().reward(&state, &action);
        prop_assert!((-1.0..=1.0).contains(&reward));
    }

    #[test]
    fn reward_is_bounded_for_any_weights(
        config in arb_reward_config(),
        state in arb_state(),
        action in arb_action(),
    ) {
        let reward = RewardModel::new(config).reward(&state, &action);
        prop_assert!((-1.0..=1.0).contains(&reward));
    }

    #[test]
    fn narration_discards_interaction_fields(
        engagement in arb_engagement(),
        emotion in arb_emotion(),
        details in arb_details(),
    ) {
        let state = State::new(Mode::Narration, engagement, emotion, details);
        prop_assert_eq!(*state.details(), InteractionDetails::default());
        prop_assert_eq!(state.key(), State::narration(engagement, emotion).key());
    }

    #[test]
    fn keys_are_collision_free(a in arb_state(), b in arb_state()) {
        prop_assert_eq!(a == b, a.key() == b.key());
        prop_assert_eq!(State::from(a.key()), a);
    }

    #[test]
    fn window_keeps_only_recent_readings(
        old in prop::collection::vec(arb_label(), 0..40),
        recent_label in arb_label(),
        capacity in 1usize..20,
    ) {
        let aggregator = SensorAggregator::new(AggregatorConfig {
            buffer_capacity: capacity,
            ..AggregatorConfig::default()
        });
        for (pose, emotion) in &old {
            aggregator.add_reading(pose, pose, "left", emotion, Some(0.1));
        }
        let (pose, emotion) = recent_label;
        for _ in 0..capacity {
            aggregator.add_reading(pose, pose, "center", emotion, Some(0.9));
        }

        let summary = aggregator.aggregate();
        prop_assert_eq!(summary.samples, capacity);
        prop_assert_eq!(summary.emotion, EmotionalState::parse(emotion).unwrap());
        prop_assert!((summary.emotion_confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn saved_tables_reload_identically(
        rows in prop::collection::vec((arb_state(), prop::collection::vec(-50.0f64..50.0, 10)), 0..20),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q_table.json");
        let config = PolicyConfig { seed: Some(0), ..PolicyConfig::default() };

        let mut agent = QLearningAgent::new(default_actions(), &config).unwrap();
        for (state, values) in &rows {
            agent.table_mut().row_mut(state.key()).copy_from_slice(values);
        }
        agent.save(&path).unwrap();

        let mut restored = QLearningAgent::new(default_actions(), &config).unwrap();
        restored.load(&path).unwrap();
        prop_assert_eq!(restored.table(), agent.table());
    }
}

#[test]
fn action_specs_reject_wrong_field_combinations() {
    let mut spec = ActionSpec::new(ActionKind::LexicalSyntactic);
    spec.complexity = Some(SentenceComplexity::Complex);
    assert!(spec.build().is_err());

    spec.lexical_type = Some(LexicalType::Unknown);
    assert!(spec.build().is_ok());

    let mut clarification = ActionSpec::new(ActionKind::Clarification);
    assert!(clarification.build().is_err());
    clarification.clarification_type = Some(ClarificationType::ConfirmConfusion);
    assert!(clarification.build().is_ok());

    let mut none = ActionSpec::new(ActionKind::NoIntervention);
    assert_eq!(none.build().unwrap(), Action::NoIntervention);
    none.complexity = Some(SentenceComplexity::Simple);
    assert!(none.build().is_err());
}
