use std::process::ExitCode;

use tello_rl::config::Config;
use tello_rl::logging;
use tello_rl::rl::{
    default_actions, train_parallel, LoadOutcome, PolicyError, QLearningAgent, RewardModel,
    SimulatedEnvironment, Trainer,
};

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = logging::init_tracing(&config.log_level);

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "pretraining failed");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<(), PolicyError> {
    let rl = &config.rl;
    let mut agent = QLearningAgent::new(default_actions(), &rl.policy)?;

    match agent.load(&config.q_table_path)? {
        LoadOutcome::Missing => {}
        LoadOutcome::Loaded { entries, repaired } => {
            tracing::info!(entries, repaired, "resuming from saved q-table");
        }
    }

    let reward = RewardModel::new(rl.reward.clone());

    let agent = if config.workers > 1 {
        let base_seed = rl.policy.seed.unwrap_or(0);
        let (merged, reports) = train_parallel(
            &agent,
            &rl.environment,
            &reward,
            &rl.trainer,
            config.workers,
            base_seed,
        )?;
        for (worker, report) in reports.iter().enumerate() {
            tracing::info!(
                worker,
                mean_reward = report.mean_episode_reward(),
                visited_states = report.visited_states,
                "worker finished"
            );
        }
        merged
    } else {
        let env = SimulatedEnvironment::new(rl.environment.clone());
        let mut trainer = Trainer::new(agent, env, reward.clone(), rl.trainer.clone());
        let report = trainer.train()?;
        tracing::info!(
            episodes = report.episodes,
            checkpoints = report.checkpoints.len(),
            elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
            "training finished"
        );
        trainer.into_agent()
    };

    let env = SimulatedEnvironment::new(rl.environment.clone());
    let mut evaluator = Trainer::new(agent, env, reward, rl.trainer.clone());
    let score = evaluator.evaluate(rl.trainer.evaluation_trials.max(1));
    tracing::info!(mean_reward = score, "final evaluation");

    let agent = evaluator.into_agent();
    agent.save(&config.q_table_path)?;
    Ok(())
}
