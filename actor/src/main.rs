//! Actor - batched MCTS self-play for Prooftree
//!
//! A long-running process that:
//! 1. Loads the search settings (file, environment, `--conf-str`)
//! 2. Builds one batch evaluator per device and a pool of actors
//! 3. Runs the CPU/GPU phase loop until Ctrl+C or `--max-games`
//! 4. Writes one game record per finished game to stdout

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use engine_config::{load_config, write_default_config, SelfPlayConfig};
use engine_core::{Environment, Rotation};
use games_gomoku::Gomoku;
use games_tictactoe::TicTacToe;
use mcts::BatchEvaluator;
use tokio::signal;
use tracing::{error, info};

use actor::{
    load_networks, to_mcts_config, Actor, ActorGroup, Config, EnvId, GroupOptions, Mode,
    RunLimits,
};

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries game records
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    config.validate()?;

    init_tracing(&config.log_level)?;
    info!(log_level = %config.log_level, "Tracing initialized");

    if let Some(path) = &config.gen_path {
        write_default_config(path)?;
        info!(path = %path.display(), "Wrote default configuration");
        return Ok(());
    }

    let settings = load_config(config.conf_file.as_deref(), config.conf_str.as_deref())?;
    info!(
        mode = ?config.mode,
        env_id = ?config.env_id,
        simulations = settings.actor_num_simulation,
        parallel_games = settings.actor_num_parallel_games,
        threads = settings.actor_num_threads,
        devices = config.num_devices,
        proof_cost = settings.actor_use_proof_cost_backup,
        "Configuration loaded"
    );

    let result = match config.env_id {
        EnvId::TicTacToe => run::<TicTacToe>(config, settings).await,
        EnvId::Gomoku => run::<Gomoku>(config, settings).await,
    };

    match result {
        Ok(()) => {
            info!("Actor completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Actor failed: {:#}", e);
            Err(e)
        }
    }
}

async fn run<E>(config: Config, settings: SelfPlayConfig) -> Result<()>
where
    E: Environment + Default + 'static,
{
    match config.mode {
        Mode::SelfPlay => self_play::<E>(config, settings).await,
        Mode::Console => console::<E>(settings),
    }
}

async fn self_play<E>(config: Config, settings: SelfPlayConfig) -> Result<()>
where
    E: Environment + Default + 'static,
{
    let prototype = E::default();
    let feature_size = prototype.features(Rotation::Identity).len();
    let action_size = prototype.policy_size();
    let networks = load_networks(&settings, config.num_devices, feature_size, action_size)?;

    let mcts_config = to_mcts_config(&settings);
    let actors = (0..settings.actor_num_parallel_games)
        .map(|_| Actor::new(E::default(), mcts_config.clone()))
        .collect();
    let options = GroupOptions {
        num_threads: settings.actor_num_threads as usize,
        auto_seed: settings.auto_seed,
        seed: settings.seed,
    };
    let group = ActorGroup::new(actors, networks, io::stdout(), options)?;
    let limits = RunLimits {
        max_steps: None,
        max_games: config.max_games,
    };

    // Setup graceful shutdown
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);
    let shutdown_handle = tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
            return;
        }
        info!("Shutdown signal received, stopping after the current step...");
        shutdown_flag.store(true, Ordering::Relaxed);
    });

    let run_result = tokio::task::spawn_blocking(move || group.run(&shutdown, limits)).await?;
    shutdown_handle.abort();

    let summary = run_result?;
    info!(
        steps = summary.steps,
        games_completed = summary.games_completed,
        moves = summary.moves_played,
        "Self-play finished"
    );
    Ok(())
}

fn console<E>(settings: SelfPlayConfig) -> Result<()>
where
    E: Environment + Default,
{
    mcts::random::seed(settings.seed);
    let prototype = E::default();
    let feature_size = prototype.features(Rotation::Identity).len();
    let mut networks = load_networks(&settings, 1, feature_size, prototype.policy_size())?;
    let Some(network) = networks.pop() else {
        anyhow::bail!("no network loaded");
    };
    let evaluator = BatchEvaluator::new(network);

    let mut actor = Actor::new(prototype, to_mcts_config(&settings));
    println!("{}", actor.environment());
    while !actor.environment().is_terminal() {
        let action = actor.think(&evaluator, true)?;
        println!("{}: {}", action, actor.tree().search_distribution());
        println!("{}", actor.environment());
    }
    println!("result: {}", actor.environment().eval_score(false));
    Ok(())
}
