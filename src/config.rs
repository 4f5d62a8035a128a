use std::path::PathBuf;

use crate::rl::RlConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub q_table_path: PathBuf,
    /// Worker count for parallel pretraining; 1 trains sequentially.
    pub workers: usize,
    pub rl: RlConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let q_table_path = std::env::var("TELLO_Q_TABLE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("rl_table/q_table.json"));

        let workers = std::env::var("TELLO_WORKERS")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(1);

        Self {
            log_level,
            q_table_path,
            workers,
            rl: RlConfig::from_env(),
        }
    }
}
