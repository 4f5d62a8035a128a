//! Live storytelling session: perception in, interventions out.

use std::sync::Arc;

use crate::rl::actions::Action;
use crate::rl::aggregator::{SensorAggregator, SensorReading};
use crate::rl::policy::{PolicyError, SharedPolicy};
use crate::rl::reward::RewardModel;
use crate::rl::types::{EngagementLevel, Mode, PromptNecessity, State};

/// A decision taken by the session together with the state it was taken in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub state: State,
    pub action: Action,
}

pub struct StorySession {
    aggregator: Arc<SensorAggregator>,
    policy: SharedPolicy,
    reward: RewardModel,
    mode: Mode,
    pending: Option<Decision>,
}

impl StorySession {
    pub fn new(aggregator: Arc<SensorAggregator>, policy: SharedPolicy, reward: RewardModel) -> Self {
        Self {
            aggregator,
            policy,
            reward,
            mode: Mode::Narration,
            pending: None,
        }
    }

    pub fn aggregator(&self) -> &Arc<SensorAggregator> {
        &self.aggregator
    }

    pub fn policy(&self) -> &SharedPolicy {
        &self.policy
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn pending(&self) -> Option<Decision> {
        self.pending
    }

    pub fn add_reading(
        &self,
        horizontal: &str,
        vertical: &str,
        gaze: &str,
        emotion: &str,
        emotion_confidence: Option<f64>,
    ) {
        self.aggregator
            .add_reading(horizontal, vertical, gaze, emotion, emotion_confidence);
    }

    pub fn add_sample(&self, reading: SensorReading) {
        self.aggregator.add_sample(reading);
    }

    /// Derives a state from a transcript in the current mode and picks the
    /// next action for it.
    pub fn observe_utterance(&mut self, text: &str) -> Result<Decision, PolicyError> {
        let state = self.aggregator.update_from_utterance(self.mode, text);
        self.decide(state)
    }

    /// Runs an aggregation cycle when the configured period elapsed and picks
    /// an action for the resulting state.
    pub fn tick(&mut self) -> Result<Option<Decision>, PolicyError> {
        let period = self.aggregator.config().update_period_secs;
        match self.aggregator.maybe_update(period) {
            Some(state) => self.decide(state).map(Some),
            None => Ok(None),
        }
    }

    fn decide(&mut self, state: State) -> Result<Decision, PolicyError> {
        let mut policy = self.policy.lock();
        let action = policy.choose_action(&state);

        // The previous decision is rewarded with the state that followed it.
        if let Some(previous) = self.pending.take() {
            let reward = self.reward.reward(&previous.state, &previous.action);
            policy.update(&previous.state, &previous.action, reward, &state)?;
        }
        drop(policy);

        let decision = Decision { state, action };
        self.pending = Some(decision);
        tracing::info!(state = %state, action = %action, "session decision");
        Ok(decision)
    }

    /// Applies an externally measured reward to the last decision, using the
    /// most recent state as the successor. A non-finite reward is rejected
    /// and the pending decision is kept.
    pub fn feedback(&mut self, reward: f64) -> Result<Option<f64>, PolicyError> {
        if !reward.is_finite() {
            return Err(PolicyError::NonFiniteReward(reward));
        }
        let Some(previous) = self.pending.take() else {
            return Ok(None);
        };
        let next = self.aggregator.last_state().unwrap_or(previous.state);
        let q = self
            .policy
            .lock()
            .update(&previous.state, &previous.action, reward, &next)?;
        tracing::debug!(reward, q, "online feedback applied");
        Ok(Some(q))
    }

    pub fn needs_wh_follow_up(state: &State) -> bool {
        state.wh_question_detected() && state.prompt_necessity() == PromptNecessity::Yes
    }

    pub fn needs_motivation(state: &State) -> bool {
        state.prompt_necessity() == PromptNecessity::Yes
            && state.engagement() == EngagementLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::actions::default_actions;
    use crate::rl::config::{AggregatorConfig, PolicyConfig};
    use crate::rl::policy::QLearningAgent;
    use crate::rl::types::{EmotionalState, InteractionDetails};

    fn session() -> StorySession {
        let agent = QLearningAgent::new(
            default_actions(),
            &PolicyConfig {
                epsilon: 0.0,
                seed: Some(9),
                ..PolicyConfig::default()
            },
        )
        .unwrap();
        StorySession::new(
            Arc::new(SensorAggregator::new(AggregatorConfig::default())),
            agent.into_shared(),
            RewardModel::default(),
        )
    }

    #[test]
    fn follow_up_rules() {
        let prompted = |engagement, wh| {
            State::interaction(
                engagement,
                EmotionalState::Neutral,
                InteractionDetails {
                    prompt_necessity: PromptNecessity::Yes,
                    wh_question_detected: wh,
                    ..InteractionDetails::default()
                },
            )
        };
        assert!(StorySession::needs_wh_follow_up(&prompted(EngagementLevel::High, true)));
        assert!(!StorySession::needs_wh_follow_up(&prompted(EngagementLevel::High, false)));
        assert!(StorySession::needs_motivation(&prompted(EngagementLevel::Low, false)));
        assert!(!StorySession::needs_motivation(&prompted(EngagementLevel::Medium, false)));
        assert!(!StorySession::needs_motivation(&State::narration(
            EngagementLevel::Low,
            EmotionalState::Sad
        )));
    }

    #[test]
    fn consecutive_decisions_update_the_policy() {
        let mut session = session();
        session.set_mode(Mode::Interaction);
        let first = session.observe_utterance("I like the lion").unwrap();
        session.observe_utterance("the lion was very brave and strong").unwrap();

        let q = session
            .policy()
            .lock()
            .q_value(&first.state, &first.action)
            .unwrap();
        assert_ne!(q, 0.0);
    }

    #[test]
    fn feedback_without_decision_is_a_no_op() {
        let mut session = session();
        assert_eq!(session.feedback(1.0).unwrap(), None);
        session.observe_utterance("").unwrap();
        assert!(session.feedback(1.0).unwrap().is_some());
        assert!(session.pending().is_none());
    }
}
