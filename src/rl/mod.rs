pub mod actions;
pub mod aggregator;
pub mod config;
pub mod environment;
pub mod policy;
pub mod q_table;
pub mod reward;
pub mod session;
pub mod trainer;
pub mod types;

pub use actions::{default_actions, Action, ActionError, ActionSpec};
pub use aggregator::{Clock, ManualClock, SensorAggregator, SensorSummary, SystemClock};
pub use config::RlConfig;
pub use environment::SimulatedEnvironment;
pub use policy::{LoadOutcome, PolicyError, QLearningAgent, SharedPolicy};
pub use q_table::QTable;
pub use reward::{RewardBreakdown, RewardModel};
pub use session::StorySession;
pub use trainer::{train_parallel, Trainer, TrainingReport};
pub use types::*;
