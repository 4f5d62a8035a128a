//! Episodic offline pretraining against the simulated environment.

use chrono::{DateTime, Utc};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::VecDeque;
use std::path::PathBuf;

use crate::rl::actions::Action;
use crate::rl::config::{EnvironmentConfig, TrainerConfig};
use crate::rl::environment::SimulatedEnvironment;
use crate::rl::policy::{PolicyError, QLearningAgent};
use crate::rl::q_table::QTable;
use crate::rl::reward::RewardModel;
use crate::rl::types::State;

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: State,
    pub action: Action,
    pub reward: f64,
    pub next_state: State,
}

/// Bounded FIFO of past transitions, sampled uniformly without replacement.
#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    capacity: usize,
    buffer: VecDeque<Transition>,
    rng: ChaCha8Rng,
}

impl ReplayBuffer {
    pub fn new(capacity: usize, seed: u64) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            buffer: VecDeque::with_capacity(capacity.min(1024)),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn push(&mut self, transition: Transition) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    pub fn sample(&mut self, batch_size: usize) -> Vec<Transition> {
        let amount = batch_size.min(self.buffer.len());
        rand::seq::index::sample(&mut self.rng, self.buffer.len(), amount)
            .into_iter()
            .map(|i| self.buffer[i].clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub episode: usize,
    pub trials: usize,
    pub mean_reward: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingReport {
    pub episodes: usize,
    pub episode_rewards: Vec<f64>,
    pub evaluations: Vec<EvaluationResult>,
    pub final_epsilon: f64,
    pub checkpoints: Vec<PathBuf>,
    pub visited_states: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TrainingReport {
    pub fn mean_episode_reward(&self) -> f64 {
        if self.episode_rewards.is_empty() {
            return 0.0;
        }
        self.episode_rewards.iter().sum::<f64>() / self.episode_rewards.len() as f64
    }
}

pub struct Trainer {
    agent: QLearningAgent,
    env: SimulatedEnvironment,
    reward: RewardModel,
    config: TrainerConfig,
    replay: ReplayBuffer,
    rewards_history: Vec<f64>,
}

impl Trainer {
    pub fn new(
        agent: QLearningAgent,
        env: SimulatedEnvironment,
        reward: RewardModel,
        config: TrainerConfig,
    ) -> Self {
        let replay_seed = env.config().seed.unwrap_or(0).wrapping_add(17);
        Self {
            replay: ReplayBuffer::new(config.replay_capacity, replay_seed),
            agent,
            env,
            reward,
            config,
            rewards_history: Vec::new(),
        }
    }

    pub fn agent(&self) -> &QLearningAgent {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut QLearningAgent {
        &mut self.agent
    }

    pub fn into_agent(self) -> QLearningAgent {
        self.agent
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn rewards_history(&self) -> &[f64] {
        &self.rewards_history
    }

    pub fn replay_len(&self) -> usize {
        self.replay.len()
    }

    pub fn reset_history(&mut self) {
        self.replay.clear();
        self.rewards_history.clear();
    }

    pub fn train(&mut self) -> Result<TrainingReport, PolicyError> {
        let started_at = Utc::now();
        let num_episodes = self.config.num_episodes;
        let mut episode_rewards = Vec::with_capacity(num_episodes);
        let mut evaluations = Vec::new();
        let mut checkpoints = Vec::new();

        tracing::info!(
            episodes = num_episodes,
            steps = self.config.steps_per_episode,
            epsilon = self.agent.epsilon(),
            "training started"
        );

        for episode in 1..=num_episodes {
            let episode_reward = self.run_episode()?;
            episode_rewards.push(episode_reward);
            self.rewards_history.push(episode_reward);

            let decayed = (self.agent.epsilon() * self.config.epsilon_decay)
                .max(self.config.epsilon_min);
            self.agent.set_epsilon(decayed);

            tracing::debug!(
                episode,
                reward = episode_reward,
                epsilon = self.agent.epsilon(),
                "episode finished"
            );

            let interval = self.config.evaluation_interval;
            if interval > 0 && episode % interval == 0 {
                let mean_reward = self.evaluate(self.config.evaluation_trials);
                evaluations.push(EvaluationResult {
                    episode,
                    trials: self.config.evaluation_trials,
                    mean_reward,
                });
                let path = self.checkpoint_path(&format!("q_table_episode_{episode}.json"));
                self.agent.save(&path)?;
                checkpoints.push(path);
            }
        }

        let final_path = self.checkpoint_path("q_table_final.json");
        self.agent.save(&final_path)?;
        checkpoints.push(final_path);

        let report = TrainingReport {
            episodes: num_episodes,
            episode_rewards,
            evaluations,
            final_epsilon: self.agent.epsilon(),
            checkpoints,
            visited_states: self.agent.table().len(),
            started_at,
            finished_at: Utc::now(),
        };
        tracing::info!(
            mean_reward = report.mean_episode_reward(),
            visited_states = report.visited_states,
            epsilon = report.final_epsilon,
            "training complete"
        );
        Ok(report)
    }

    fn run_episode(&mut self) -> Result<f64, PolicyError> {
        let mut state = self.env.reset();
        let mut total = 0.0;

        for _ in 0..self.config.steps_per_episode {
            let action = self.agent.choose_action(&state);
            let next_state = self.env.transition(&state, &action);
            let reward = self.reward.reward(&state, &action);
            self.agent.update(&state, &action, reward, &next_state)?;

            if self.config.replay_batch_size > 0 {
                self.replay.push(Transition {
                    state,
                    action,
                    reward,
                    next_state,
                });
                if self.replay.len() >= self.config.replay_batch_size {
                    for t in self.replay.sample(self.config.replay_batch_size) {
                        self.agent.update(&t.state, &t.action, t.reward, &t.next_state)?;
                    }
                }
            }

            total += reward;
            state = next_state;
        }

        Ok(total)
    }

    /// Mean reward of `trials` greedy rollouts. Exploration is disabled for
    /// the duration and restored afterwards.
    pub fn evaluate(&mut self, trials: usize) -> f64 {
        if trials == 0 {
            return 0.0;
        }

        let saved_epsilon = self.agent.epsilon();
        self.agent.set_epsilon(0.0);

        let mut total = 0.0;
        for _ in 0..trials {
            let mut state = self.env.reset();
            for _ in 0..self.config.steps_per_episode {
                let action = self.agent.best_action(&state);
                let next_state = self.env.transition(&state, &action);
                total += self.reward.reward(&state, &action);
                state = next_state;
            }
        }

        self.agent.set_epsilon(saved_epsilon);
        let mean = total / trials as f64;
        tracing::info!(trials, mean_reward = mean, "evaluation finished");
        mean
    }

    fn checkpoint_path(&self, file_name: &str) -> PathBuf {
        self.config.checkpoint_dir.join(file_name)
    }
}

/// Trains `workers` independent copies of `agent` on disjoint tables and
/// returns an agent holding their averaged table. Each worker checkpoints
/// into `checkpoint_dir/worker_{i}`.
pub fn train_parallel(
    agent: &QLearningAgent,
    env_config: &EnvironmentConfig,
    reward: &RewardModel,
    config: &TrainerConfig,
    workers: usize,
    base_seed: u64,
) -> Result<(QLearningAgent, Vec<TrainingReport>), PolicyError> {
    let workers = workers.max(1);

    let results: Vec<Result<(QLearningAgent, TrainingReport), PolicyError>> = (0..workers)
        .into_par_iter()
        .map(|worker| {
            let seed = base_seed.wrapping_add(worker as u64 * 1_000);
            let mut worker_agent = agent.clone();
            worker_agent.reseed(seed);
            let env = SimulatedEnvironment::with_seed(env_config.clone(), seed.wrapping_add(1));
            let worker_config = TrainerConfig {
                checkpoint_dir: config.checkpoint_dir.join(format!("worker_{worker}")),
                ..config.clone()
            };
            let mut trainer = Trainer::new(worker_agent, env, reward.clone(), worker_config);
            let report = trainer.train()?;
            Ok((trainer.into_agent(), report))
        })
        .collect();

    let mut agents = Vec::with_capacity(workers);
    let mut reports = Vec::with_capacity(workers);
    for result in results {
        let (trained, report) = result?;
        agents.push(trained);
        reports.push(report);
    }

    let tables: Vec<QTable> = agents.iter().map(|a| a.table().clone()).collect();
    let mut merged = agents.swap_remove(0);
    if let Some(table) = QTable::average(&tables) {
        *merged.table_mut() = table;
    }

    tracing::info!(
        workers,
        visited_states = merged.table().len(),
        "merged parallel training tables"
    );
    Ok((merged, reports))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::actions::default_actions;
    use crate::rl::config::PolicyConfig;

    fn trainer(dir: &std::path::Path, config: TrainerConfig) -> Trainer {
        let agent = QLearningAgent::new(
            default_actions(),
            &PolicyConfig {
                epsilon: 1.0,
                seed: Some(3),
                ..PolicyConfig::default()
            },
        )
        .unwrap();
        let env = SimulatedEnvironment::with_seed(EnvironmentConfig::default(), 4);
        Trainer::new(
            agent,
            env,
            RewardModel::default(),
            TrainerConfig {
                checkpoint_dir: dir.to_path_buf(),
                ..config
            },
        )
    }

    #[test]
    fn replay_buffer_evicts_oldest() {
        let mut buffer = ReplayBuffer::new(2, 0);
        for reward in [1.0, 2.0, 3.0] {
            buffer.push(Transition {
                state: State::default(),
                action: Action::NoIntervention,
                reward,
                next_state: State::default(),
            });
        }
        assert_eq!(buffer.len(), 2);
        let mut rewards: Vec<f64> = buffer.sample(5).iter().map(|t| t.reward).collect();
        rewards.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(rewards, vec![2.0, 3.0]);
    }

    #[test]
    fn epsilon_decays_to_floor() {
        let dir = tempfile::tempdir().unwrap();
        let mut trainer = trainer(
            dir.path(),
            TrainerConfig {
                num_episodes: 50,
                steps_per_episode: 2,
                epsilon_decay: 0.5,
                epsilon_min: 0.1,
                evaluation_interval: 0,
                ..TrainerConfig::default()
            },
        );
        let report = trainer.train().unwrap();
        assert_eq!(report.final_epsilon, 0.1);
        assert_eq!(report.episode_rewards.len(), 50);
        assert_eq!(report.checkpoints, vec![dir.path().join("q_table_final.json")]);
    }

    #[test]
    fn evaluation_restores_epsilon() {
        let dir = tempfile::tempdir().unwrap();
        let mut trainer = trainer(dir.path(), TrainerConfig::default());
        trainer.agent_mut().set_epsilon(0.4);
        let mean = trainer.evaluate(3);
        assert!((-10.0..=10.0).contains(&mean));
        assert_eq!(trainer.agent().epsilon(), 0.4);
        assert_eq!(trainer.evaluate(0), 0.0);
    }

    #[test]
    fn replay_fills_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut trainer = trainer(
            dir.path(),
            TrainerConfig {
                num_episodes: 5,
                steps_per_episode: 4,
                evaluation_interval: 0,
                replay_batch_size: 8,
                replay_capacity: 10,
                ..TrainerConfig::default()
            },
        );
        trainer.train().unwrap();
        assert_eq!(trainer.replay_len(), 10);
        trainer.reset_history();
        assert_eq!(trainer.replay_len(), 0);
        assert!(trainer.rewards_history().is_empty());
    }
}
