use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    pub buffer_capacity: usize,
    /// Mean emotion confidence above which engagement is considered high.
    pub engagement_confidence_threshold: f64,
    /// Unique/total word ratio above which vocabulary usage is high.
    pub lexical_diversity_threshold: f64,
    /// Responses with fewer words are short.
    pub short_response_words: usize,
    /// Responses with more words are long.
    pub long_response_words: usize,
    pub strong_response_words: usize,
    pub average_response_words: usize,
    pub high_engagement_words: usize,
    pub update_period_secs: f64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 100,
            engagement_confidence_threshold: 0.6,
            lexical_diversity_threshold: 0.5,
            short_response_words: 5,
            long_response_words: 15,
            strong_response_words: 15,
            average_response_words: 5,
            high_engagement_words: 10,
            update_period_secs: 60.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub alpha: f64,
    pub gamma: f64,
    pub epsilon: f64,
    pub seed: Option<u64>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.9,
            epsilon: 0.2,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardConfig {
    pub engagement_weight: f64,
    pub vocabulary_weight: f64,
    pub anger_penalty: f64,
    pub surprise_penalty: f64,
    pub clarification_low_engagement_bonus: f64,
    pub clarification_penalty: f64,
    pub prompt_overuse_penalty: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            engagement_weight: 0.5,
            vocabulary_weight: 0.5,
            anger_penalty: -0.2,
            surprise_penalty: -0.1,
            clarification_low_engagement_bonus: 0.5,
            clarification_penalty: -0.3,
            prompt_overuse_penalty: -0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum InitialState {
    #[default]
    Canonical,
    Random,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Probability that a lexical-syntactic action leaves vocabulary usage unchanged.
    pub vocabulary_stay_probability: f64,
    pub initial_state: InitialState,
    pub seed: Option<u64>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            vocabulary_stay_probability: 0.7,
            initial_state: InitialState::Canonical,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub num_episodes: usize,
    pub steps_per_episode: usize,
    pub epsilon_decay: f64,
    pub epsilon_min: f64,
    pub evaluation_interval: usize,
    pub evaluation_trials: usize,
    /// Zero disables experience replay.
    pub replay_batch_size: usize,
    pub replay_capacity: usize,
    pub checkpoint_dir: PathBuf,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            num_episodes: 1000,
            steps_per_episode: 10,
            epsilon_decay: 0.995,
            epsilon_min: 0.05,
            evaluation_interval: 100,
            evaluation_trials: 5,
            replay_batch_size: 0,
            replay_capacity: 5000,
            checkpoint_dir: PathBuf::from("rl_table"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RlConfig {
    pub aggregator: AggregatorConfig,
    pub policy: PolicyConfig,
    pub reward: RewardConfig,
    pub environment: EnvironmentConfig,
    pub trainer: TrainerConfig,
}

impl RlConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(val) = env_parse::<u64>("TELLO_SEED") {
            config.policy.seed = Some(val);
            config.environment.seed = Some(val.wrapping_add(1));
        }
        if let Some(val) = env_parse::<f64>("TELLO_ALPHA").filter(|a| *a > 0.0 && *a <= 1.0) {
            config.policy.alpha = val;
        }
        if let Some(val) = env_parse::<f64>("TELLO_GAMMA").filter(|g| (0.0..1.0).contains(g)) {
            config.policy.gamma = val;
        }
        if let Some(val) = env_parse::<f64>("TELLO_EPSILON").filter(|e| e.is_finite()) {
            config.policy.epsilon = val;
        }
        if let Some(val) = env_parse("TELLO_EPISODES") {
            config.trainer.num_episodes = val;
        }
        if let Some(val) = env_parse("TELLO_STEPS_PER_EPISODE") {
            config.trainer.steps_per_episode = val;
        }
        if let Some(val) = env_parse("TELLO_EPSILON_DECAY") {
            config.trainer.epsilon_decay = val;
        }
        if let Some(val) = env_parse("TELLO_EPSILON_MIN") {
            config.trainer.epsilon_min = val;
        }
        if let Some(val) = env_parse("TELLO_EVAL_INTERVAL") {
            config.trainer.evaluation_interval = val;
        }
        if let Some(val) = env_parse("TELLO_EVAL_TRIALS") {
            config.trainer.evaluation_trials = val;
        }
        if let Some(val) = env_parse("TELLO_REPLAY_BATCH") {
            config.trainer.replay_batch_size = val;
        }
        if let Some(val) = env_parse("TELLO_UPDATE_PERIOD_SECS") {
            config.aggregator.update_period_secs = val;
        }
        if let Some(val) = env_parse("TELLO_ENGAGEMENT_CONFIDENCE") {
            config.aggregator.engagement_confidence_threshold = val;
        }
        if let Some(val) = env_parse("TELLO_LEXICAL_DIVERSITY") {
            config.aggregator.lexical_diversity_threshold = val;
        }
        if let Ok(val) = std::env::var("TELLO_CHECKPOINT_DIR") {
            config.trainer.checkpoint_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("TELLO_INITIAL_STATE") {
            config.environment.initial_state = match val.to_lowercase().as_str() {
                "random" => InitialState::Random,
                _ => InitialState::Canonical,
            };
        }

        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.parse().ok())
}
