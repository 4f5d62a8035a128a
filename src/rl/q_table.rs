use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::rl::actions::Action;
use crate::rl::types::StateKey;

pub const SNAPSHOT_VERSION: u32 = 1;

/// Sparse action-value table. Rows are created with zeros on first visit.
#[derive(Debug, Clone, PartialEq)]
pub struct QTable {
    action_count: usize,
    rows: HashMap<StateKey, Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QTableEntry {
    pub key: StateKey,
    pub values: Vec<f64>,
}

/// On-disk form of a table. Entries are sorted by key so equal tables
/// serialize identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QTableSnapshot {
    pub version: u32,
    #[serde(default)]
    pub actions: Vec<Action>,
    pub entries: Vec<QTableEntry>,
}

impl QTable {
    pub fn new(action_count: usize) -> Self {
        Self {
            action_count,
            rows: HashMap::new(),
        }
    }

    pub fn action_count(&self) -> usize {
        self.action_count
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, key: &StateKey) -> bool {
        self.rows.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &StateKey> {
        self.rows.keys()
    }

    pub fn get(&self, key: &StateKey) -> Option<&[f64]> {
        self.rows.get(key).map(Vec::as_slice)
    }

    /// Row for `key`, created or zero-repaired when absent or mis-sized.
    pub fn row_mut(&mut self, key: StateKey) -> &mut Vec<f64> {
        let action_count = self.action_count;
        let row = self
            .rows
            .entry(key)
            .or_insert_with(|| vec![0.0; action_count]);
        if row.len() != action_count {
            tracing::warn!(
                key = %key,
                found = row.len(),
                expected = action_count,
                "q-value row length mismatch, resetting to zeros"
            );
            *row = vec![0.0; action_count];
        }
        row
    }

    pub fn max_value(&mut self, key: StateKey) -> f64 {
        self.row_mut(key)
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Replaces the contents with `entries`, zeroing rows whose length does
    /// not match the action count. Returns the number of repaired rows.
    pub fn replace_with(&mut self, entries: Vec<QTableEntry>) -> usize {
        let mut repaired = 0;
        self.rows.clear();
        for entry in entries {
            let values = if entry.values.len() == self.action_count {
                entry.values
            } else {
                tracing::warn!(
                    key = %entry.key,
                    found = entry.values.len(),
                    expected = self.action_count,
                    "persisted q-value row has wrong length, resetting to zeros"
                );
                repaired += 1;
                vec![0.0; self.action_count]
            };
            self.rows.insert(entry.key, values);
        }
        repaired
    }

    pub fn snapshot(&self, actions: &[Action]) -> QTableSnapshot {
        let mut entries: Vec<QTableEntry> = self
            .rows
            .iter()
            .map(|(key, values)| QTableEntry {
                key: *key,
                values: values.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));

        QTableSnapshot {
            version: SNAPSHOT_VERSION,
            actions: actions.to_vec(),
            entries,
        }
    }

    /// Folds `other` into this table. Keys present in both are averaged
    /// element-wise; keys only in `other` are copied. Rows of `other` with
    /// the wrong length are skipped.
    pub fn merge(&mut self, other: &QTable) {
        for (key, values) in &other.rows {
            if values.len() != self.action_count {
                tracing::warn!(key = %key, "skipping mis-sized row during merge");
                continue;
            }
            match self.rows.get_mut(key) {
                Some(existing) if existing.len() == values.len() => {
                    for (mine, theirs) in existing.iter_mut().zip(values) {
                        *mine = (*mine + theirs) / 2.0;
                    }
                }
                _ => {
                    self.rows.insert(*key, values.clone());
                }
            }
        }
    }

    /// Element-wise mean over every table that holds a key. Tables whose
    /// action count differs from the first are ignored.
    pub fn average(tables: &[QTable]) -> Option<QTable> {
        let first = tables.first()?;
        let action_count = first.action_count;
        let mut sums: HashMap<StateKey, (Vec<f64>, usize)> = HashMap::new();

        for table in tables.iter().filter(|t| t.action_count == action_count) {
            for (key, values) in &table.rows {
                if values.len() != action_count {
                    continue;
                }
                let (sum, count) = sums
                    .entry(*key)
                    .or_insert_with(|| (vec![0.0; action_count], 0));
                for (acc, value) in sum.iter_mut().zip(values) {
                    *acc += value;
                }
                *count += 1;
            }
        }

        let rows = sums
            .into_iter()
            .map(|(key, (sum, count))| {
                let values = sum.into_iter().map(|v| v / count as f64).collect();
                (key, values)
            })
            .collect();
        Some(QTable { action_count, rows })
    }
}
