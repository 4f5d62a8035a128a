//! Tabular Q-learning agent.
//!
//! - Epsilon-greedy selection with uniform tie-breaking among maximal actions
//! - One-step TD update: Q(s,a) <- Q(s,a) + alpha * (r + gamma * max Q(s',.) - Q(s,a))
//! - JSON persistence of the whole table

use parking_lot::Mutex;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::rl::actions::Action;
use crate::rl::config::PolicyConfig;
use crate::rl::q_table::{QTable, QTableSnapshot, SNAPSHOT_VERSION};
use crate::rl::types::{State, StateKey};

/// Agent shared between the dialogue loop and online updates. The mutex
/// serializes every read-modify-write of the table.
pub type SharedPolicy = Arc<Mutex<QLearningAgent>>;

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("action {0} is not in the policy's action list")]
    ActionNotInPolicy(Action),
    #[error("policy needs at least one action")]
    EmptyActionSet,
    #[error("invalid learning parameter: {0}")]
    InvalidParameter(String),
    #[error("reward must be finite, got {0}")]
    NonFiniteReward(f64),
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("q-table serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("incompatible q-table snapshot: {0}")]
    IncompatibleSnapshot(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No file at the path; the table was left untouched.
    Missing,
    Loaded { entries: usize, repaired: usize },
}

#[derive(Debug, Clone)]
pub struct QLearningAgent {
    actions: Vec<Action>,
    alpha: f64,
    gamma: f64,
    epsilon: f64,
    table: QTable,
    rng: ChaCha8Rng,
}

impl QLearningAgent {
    pub fn new(actions: Vec<Action>, config: &PolicyConfig) -> Result<Self, PolicyError> {
        if actions.is_empty() {
            return Err(PolicyError::EmptyActionSet);
        }
        if !(config.alpha > 0.0 && config.alpha <= 1.0) {
            return Err(PolicyError::InvalidParameter(format!(
                "alpha must be in (0, 1], got {}",
                config.alpha
            )));
        }
        if !(config.gamma >= 0.0 && config.gamma < 1.0) {
            return Err(PolicyError::InvalidParameter(format!(
                "gamma must be in [0, 1), got {}",
                config.gamma
            )));
        }
        if !config.epsilon.is_finite() {
            return Err(PolicyError::InvalidParameter(format!(
                "epsilon must be finite, got {}",
                config.epsilon
            )));
        }

        let seed = config.seed.unwrap_or_else(|| {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(42)
        });

        Ok(Self {
            table: QTable::new(actions.len()),
            actions,
            alpha: config.alpha,
            gamma: config.gamma,
            epsilon: config.epsilon.clamp(0.0, 1.0),
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    pub fn into_shared(self) -> SharedPolicy {
        Arc::new(Mutex::new(self))
    }

    /// Reseeds the exploration RNG.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Non-finite values are ignored.
    pub fn set_epsilon(&mut self, epsilon: f64) {
        if epsilon.is_finite() {
            self.epsilon = epsilon.clamp(0.0, 1.0);
        }
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut QTable {
        &mut self.table
    }

    pub fn action_index(&self, action: &Action) -> Option<usize> {
        self.actions.iter().position(|a| a == action)
    }

    /// Q-values for `state`, creating a zero row on first visit.
    pub fn q_values(&mut self, state: &State) -> &[f64] {
        self.table.row_mut(state.key())
    }

    pub fn q_value(&mut self, state: &State, action: &Action) -> Option<f64> {
        let index = self.action_index(action)?;
        Some(self.table.row_mut(state.key())[index])
    }

    /// Epsilon-greedy choice.
    pub fn choose_action(&mut self, state: &State) -> Action {
        let key = state.key();
        // Touch the row so visited states are persisted even before an update.
        self.table.row_mut(key);

        if self.rng.gen::<f64>() < self.epsilon {
            let index = self.rng.gen_range(0..self.actions.len());
            return self.actions[index];
        }
        self.greedy(key)
    }

    /// Greedy choice without exploration.
    pub fn best_action(&mut self, state: &State) -> Action {
        self.greedy(state.key())
    }

    fn greedy(&mut self, key: StateKey) -> Action {
        let row = self.table.row_mut(key);
        let max_q = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let best: Vec<usize> = row
            .iter()
            .enumerate()
            .filter(|(_, q)| **q == max_q)
            .map(|(i, _)| i)
            .collect();

        // NaN rows leave `best` empty; fall back to a uniform pick.
        let index = best
            .choose(&mut self.rng)
            .copied()
            .unwrap_or_else(|| self.rng.gen_range(0..self.actions.len()));
        self.actions[index]
    }

    /// One-step TD update for `(state, action)`. Returns the new Q-value.
    /// Non-finite rewards are rejected before the table is touched.
    pub fn update(
        &mut self,
        state: &State,
        action: &Action,
        reward: f64,
        next_state: &State,
    ) -> Result<f64, PolicyError> {
        if !reward.is_finite() {
            return Err(PolicyError::NonFiniteReward(reward));
        }
        let index = self
            .action_index(action)
            .ok_or(PolicyError::ActionNotInPolicy(*action))?;

        let max_next = self.table.max_value(next_state.key());
        let row = self.table.row_mut(state.key());
        let current = row[index];
        let updated = current + self.alpha * (reward + self.gamma * max_next - current);
        row[index] = updated;
        Ok(updated)
    }

    pub fn snapshot(&self) -> QTableSnapshot {
        self.table.snapshot(&self.actions)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PolicyError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| PolicyError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let payload = serde_json::to_string_pretty(&self.snapshot())?;
        std::fs::write(path, payload).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(path = %path.display(), entries = self.table.len(), "q-table saved");
        Ok(())
    }

    /// Replaces the table with the one stored at `path`. A missing file is
    /// not an error and leaves the current table as is.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<LoadOutcome, PolicyError> {
        let path = path.as_ref();
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no saved q-table found, starting fresh");
                return Ok(LoadOutcome::Missing);
            }
            Err(source) => {
                return Err(PolicyError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let snapshot: QTableSnapshot = serde_json::from_str(&contents)?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(PolicyError::IncompatibleSnapshot(format!(
                "version {} is newer than supported {}",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        if !snapshot.actions.is_empty() && snapshot.actions != self.actions {
            tracing::warn!(
                path = %path.display(),
                "saved action list differs from the configured one"
            );
        }

        let entries = snapshot.entries.len();
        let repaired = self.table.replace_with(snapshot.entries);
        tracing::info!(path = %path.display(), entries, repaired, "q-table loaded");
        Ok(LoadOutcome::Loaded { entries, repaired })
    }
}
