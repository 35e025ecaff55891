//! CPU/GPU coordinator for many concurrent self-play games.
//!
//! A fixed pool of worker threads alternates between two phases separated by
//! a shared barrier:
//!
//! - CPU phase: workers claim actors through an atomic index, feed each one
//!   the output from the previous GPU phase, and queue its next leaf
//! - GPU phase: worker `g` runs `forward` on evaluator `g`
//!
//! Actor `k` always uses evaluator `k mod G`, so every batch holds exactly one
//! leaf from each of its actors.

use std::any::Any;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Barrier, Mutex, PoisonError, RwLock};
use std::thread;

use engine_core::Environment;
use mcts::{random, BatchEvaluator, EvaluatorError, Network, NetworkOutput, SearchError};
use thiserror::Error;
use tracing::{debug, info};

use crate::actor::Actor;

const PHASE_CPU: u8 = 0;
const PHASE_GPU: u8 = 1;

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("actor {actor}: {source}")]
    Search {
        actor: usize,
        #[source]
        source: SearchError,
    },

    #[error("evaluator {evaluator}: {source}")]
    Evaluator {
        evaluator: usize,
        #[source]
        source: EvaluatorError,
    },

    #[error("actor {actor} has slot {slot} pending but evaluator {evaluator} returned no output for it")]
    MissingOutput {
        actor: usize,
        evaluator: usize,
        slot: usize,
    },

    #[error("worker {worker} panicked: {message}")]
    WorkerPanic { worker: usize, message: String },

    #[error("failed to write game record: {0}")]
    Sink(#[from] std::io::Error),

    #[error("invalid actor group: {0}")]
    InvalidSetup(&'static str),
}

/// Worker pool and seeding settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupOptions {
    pub num_threads: usize,
    /// Seed workers from OS entropy instead of `seed + worker_id`
    pub auto_seed: bool,
    pub seed: u64,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            num_threads: 1,
            auto_seed: false,
            seed: 0,
        }
    }
}

/// Stop conditions, checked after every GPU phase. `None` means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunLimits {
    pub max_steps: Option<u64>,
    pub max_games: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupSummary {
    /// Completed CPU+GPU phase pairs
    pub steps: u64,
    pub games_completed: u64,
    pub moves_played: u64,
}

pub struct ActorGroup<E: Environment, N: Network, W: Write + Send> {
    actors: Vec<Mutex<Actor<E>>>,
    evaluators: Vec<BatchEvaluator<N>>,
    outputs: Vec<RwLock<Vec<NetworkOutput>>>,
    actor_index: AtomicUsize,
    sink: Mutex<W>,
    error: Mutex<Option<GroupError>>,
    options: GroupOptions,
    games_completed: AtomicU64,
    moves_played: AtomicU64,
}

impl<E: Environment, N: Network, W: Write + Send> ActorGroup<E, N, W> {
    pub fn new(
        actors: Vec<Actor<E>>,
        networks: Vec<N>,
        sink: W,
        options: GroupOptions,
    ) -> Result<Self, GroupError> {
        if actors.is_empty() {
            return Err(GroupError::InvalidSetup("at least one actor is required"));
        }
        if networks.is_empty() {
            return Err(GroupError::InvalidSetup("at least one network is required"));
        }

        let outputs = networks.iter().map(|_| RwLock::new(Vec::new())).collect();
        Ok(Self {
            actors: actors.into_iter().map(Mutex::new).collect(),
            evaluators: networks.into_iter().map(BatchEvaluator::new).collect(),
            outputs,
            actor_index: AtomicUsize::new(0),
            sink: Mutex::new(sink),
            error: Mutex::new(None),
            options,
            games_completed: AtomicU64::new(0),
            moves_played: AtomicU64::new(0),
        })
    }

    pub fn num_actors(&self) -> usize {
        self.actors.len()
    }

    pub fn num_evaluators(&self) -> usize {
        self.evaluators.len()
    }

    /// Worker threads used by `run`: never fewer than one per evaluator.
    pub fn num_workers(&self) -> usize {
        self.options.num_threads.max(self.evaluators.len())
    }

    pub fn evaluator(&self, index: usize) -> Option<&BatchEvaluator<N>> {
        self.evaluators.get(index)
    }

    /// Run `f` on actor `index` while no phase is running.
    pub fn with_actor<T>(&self, index: usize, f: impl FnOnce(&Actor<E>) -> T) -> Option<T> {
        let actor = self.actors.get(index)?;
        let guard = actor.lock().unwrap_or_else(PoisonError::into_inner);
        Some(f(&guard))
    }

    pub fn into_sink(self) -> W {
        self.sink.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    /// Alternate CPU and GPU phases until `shutdown` is set, a limit is
    /// reached, or a worker fails.
    ///
    /// The checks happen only after a GPU phase, so in-flight forwards always
    /// finish. The first worker error is returned.
    pub fn run(&self, shutdown: &AtomicBool, limits: RunLimits) -> Result<GroupSummary, GroupError> {
        let num_workers = self.num_workers();
        let barrier = Barrier::new(num_workers + 1);
        let running = AtomicBool::new(true);
        let phase = AtomicU8::new(PHASE_CPU);
        let mut steps = 0u64;

        info!(
            actors = self.actors.len(),
            evaluators = self.evaluators.len(),
            workers = num_workers,
            "Starting actor group"
        );

        thread::scope(|scope| {
            for worker_id in 0..num_workers {
                let barrier = &barrier;
                let running = &running;
                let phase = &phase;
                scope.spawn(move || {
                    self.seed_worker(worker_id);
                    loop {
                        barrier.wait();
                        if !running.load(Ordering::Acquire) {
                            break;
                        }
                        let current = phase.load(Ordering::Acquire);
                        let outcome = panic::catch_unwind(AssertUnwindSafe(|| match current {
                            PHASE_CPU => self.cpu_phase(),
                            _ => self.gpu_phase(worker_id),
                        }));
                        if let Err(payload) = outcome {
                            self.record_error(GroupError::WorkerPanic {
                                worker: worker_id,
                                message: panic_message(payload.as_ref()),
                            });
                        }
                        barrier.wait();
                    }
                });
            }

            loop {
                self.actor_index.store(0, Ordering::Release);
                phase.store(PHASE_CPU, Ordering::Release);
                barrier.wait();
                barrier.wait();

                phase.store(PHASE_GPU, Ordering::Release);
                barrier.wait();
                barrier.wait();
                steps += 1;

                if self.should_stop(shutdown, limits, steps) {
                    break;
                }
            }

            running.store(false, Ordering::Release);
            barrier.wait();
        });

        if let Some(err) = self.error.lock().unwrap_or_else(PoisonError::into_inner).take() {
            return Err(err);
        }

        let summary = GroupSummary {
            steps,
            games_completed: self.games_completed.load(Ordering::Relaxed),
            moves_played: self.moves_played.load(Ordering::Relaxed),
        };
        info!(
            steps = summary.steps,
            games = summary.games_completed,
            moves = summary.moves_played,
            "Actor group stopped"
        );
        Ok(summary)
    }

    fn should_stop(&self, shutdown: &AtomicBool, limits: RunLimits, steps: u64) -> bool {
        if shutdown.load(Ordering::Relaxed) {
            info!(steps, "Shutdown requested");
            return true;
        }
        if self.error.lock().unwrap_or_else(PoisonError::into_inner).is_some() {
            return true;
        }
        if limits.max_steps.is_some_and(|max| steps >= max) {
            return true;
        }
        limits
            .max_games
            .is_some_and(|max| self.games_completed.load(Ordering::Relaxed) >= max)
    }

    fn seed_worker(&self, worker_id: usize) {
        if self.options.auto_seed {
            random::seed_from_entropy();
        } else {
            random::seed(self.options.seed.wrapping_add(worker_id as u64));
        }
    }

    fn record_error(&self, err: GroupError) {
        let mut slot = self.error.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    fn cpu_phase(&self) {
        loop {
            let index = self.actor_index.fetch_add(1, Ordering::AcqRel);
            if index >= self.actors.len() {
                break;
            }
            if let Err(err) = self.step_actor(index) {
                self.record_error(err);
            }
        }
    }

    fn gpu_phase(&self, worker_id: usize) {
        let Some(evaluator) = self.evaluators.get(worker_id) else {
            return;
        };
        match evaluator.forward() {
            Ok(outputs) => {
                *self.outputs[worker_id]
                    .write()
                    .unwrap_or_else(PoisonError::into_inner) = outputs;
            }
            Err(source) => self.record_error(GroupError::Evaluator {
                evaluator: worker_id,
                source,
            }),
        }
    }

    fn step_actor(&self, index: usize) -> Result<(), GroupError> {
        let search = |source| GroupError::Search {
            actor: index,
            source,
        };
        let evaluator_id = index % self.evaluators.len();
        let mut actor = self.actors[index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(slot) = actor.pending_batch_index() {
            {
                let outputs = self.outputs[evaluator_id]
                    .read()
                    .unwrap_or_else(PoisonError::into_inner);
                let output = outputs.get(slot).ok_or(GroupError::MissingOutput {
                    actor: index,
                    evaluator: evaluator_id,
                    slot,
                })?;
                actor.after_nn_evaluation(output).map_err(search)?;
            }
            if actor.is_search_done() {
                self.finish_move(index, evaluator_id, &mut actor)?;
            }
        }

        actor
            .before_nn_evaluation(&self.evaluators[evaluator_id])
            .map_err(search)
    }

    fn finish_move(
        &self,
        index: usize,
        evaluator_id: usize,
        actor: &mut Actor<E>,
    ) -> Result<(), GroupError> {
        let resign = actor.is_resign();
        if !resign {
            let action = actor.search_action().ok_or(GroupError::Search {
                actor: index,
                source: SearchError::NoSearchAction,
            })?;
            actor.act(action).map_err(|source| GroupError::Search {
                actor: index,
                source,
            })?;
            self.moves_played.fetch_add(1, Ordering::Relaxed);

            if index == 0 {
                debug!(
                    "actor 0 played {}\n{}\nroot: {}",
                    action,
                    actor.environment(),
                    actor.tree().root()
                );
            }
        }

        if !resign && !actor.environment().is_terminal() {
            actor.reset_search();
            return Ok(());
        }

        let record = actor.record(self.evaluators[evaluator_id].network().name());
        {
            let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
            writeln!(sink, "{}", record)?;
            sink.flush()?;
        }
        let games = self.games_completed.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            actor = index,
            moves = actor.environment().action_history().len(),
            resign,
            result = actor.environment().eval_score(resign),
            games,
            "Game completed"
        );
        actor.reset();
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use games_tictactoe::TicTacToe;
    use mcts::{MctsConfig, UniformNetwork};

    fn group(num_actors: usize, sims: u32) -> ActorGroup<TicTacToe, UniformNetwork, Vec<u8>> {
        let config = MctsConfig::for_testing().with_simulations(sims);
        let actors = (0..num_actors)
            .map(|_| Actor::new(TicTacToe::new(), config.clone()))
            .collect();
        ActorGroup::new(
            actors,
            vec![UniformNetwork::new(9)],
            Vec::new(),
            GroupOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_empty_setup() {
        let config = MctsConfig::for_testing();
        let err = ActorGroup::<TicTacToe, UniformNetwork, Vec<u8>>::new(
            Vec::new(),
            vec![UniformNetwork::new(9)],
            Vec::new(),
            GroupOptions::default(),
        );
        assert!(matches!(err, Err(GroupError::InvalidSetup(_))));

        let err = ActorGroup::<TicTacToe, UniformNetwork, Vec<u8>>::new(
            vec![Actor::new(TicTacToe::new(), config)],
            Vec::new(),
            Vec::new(),
            GroupOptions::default(),
        );
        assert!(matches!(err, Err(GroupError::InvalidSetup(_))));
    }

    #[test]
    fn test_workers_cover_every_evaluator() {
        let config = MctsConfig::for_testing();
        let group = ActorGroup::new(
            vec![Actor::new(TicTacToe::new(), config)],
            vec![UniformNetwork::new(9), UniformNetwork::new(9), UniformNetwork::new(9)],
            Vec::new(),
            GroupOptions {
                num_threads: 2,
                ..GroupOptions::default()
            },
        )
        .unwrap();
        assert_eq!(group.num_workers(), 3);
    }

    #[test]
    fn test_max_steps_limit() {
        let group = group(2, 4);
        let shutdown = AtomicBool::new(false);
        let summary = group
            .run(
                &shutdown,
                RunLimits {
                    max_steps: Some(3),
                    max_games: None,
                },
            )
            .unwrap();
        assert_eq!(summary.steps, 3);
        assert_eq!(group.evaluator(0).unwrap().stats().forward_count, 3);
    }

    #[test]
    fn test_shutdown_stops_after_first_step() {
        let group = group(1, 4);
        let shutdown = AtomicBool::new(true);
        let summary = group.run(&shutdown, RunLimits::default()).unwrap();
        assert_eq!(summary.steps, 1);
        assert_eq!(summary.games_completed, 0);
    }

    #[test]
    fn test_games_are_written_to_sink() {
        let group = group(2, 4);
        let shutdown = AtomicBool::new(false);
        let summary = group
            .run(
                &shutdown,
                RunLimits {
                    max_steps: None,
                    max_games: Some(2),
                },
            )
            .unwrap();
        assert!(summary.games_completed >= 2);
        assert!(summary.moves_played >= 10);

        let output = String::from_utf8(group.into_sink()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len() as u64, summary.games_completed);
        assert!(lines.iter().all(|l| l.starts_with("SelfPlay ")));
    }

    struct PanickingNetwork;

    impl Network for PanickingNetwork {
        fn name(&self) -> &str {
            "panicking"
        }

        fn action_size(&self) -> usize {
            9
        }

        fn evaluate_batch(
            &self,
            _features: &[Vec<f32>],
        ) -> Result<Vec<mcts::NetworkOutput>, EvaluatorError> {
            panic!("device lost");
        }
    }

    #[test]
    fn test_worker_panic_stops_the_run() {
        let config = MctsConfig::for_testing().with_simulations(4);
        let group = ActorGroup::new(
            vec![Actor::new(TicTacToe::new(), config)],
            vec![PanickingNetwork],
            Vec::new(),
            GroupOptions::default(),
        )
        .unwrap();

        let err = group
            .run(&AtomicBool::new(false), RunLimits::default())
            .unwrap_err();
        match err {
            GroupError::WorkerPanic { worker, message } => {
                assert_eq!(worker, 0);
                assert_eq!(message, "device lost");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_records_carry_game_result() {
        let group = group(1, 4);
        group
            .run(
                &AtomicBool::new(false),
                RunLimits {
                    max_steps: None,
                    max_games: Some(1),
                },
            )
            .unwrap();
        let output = String::from_utf8(group.into_sink()).unwrap();
        let line = output.lines().next().unwrap();
        assert!(
            ["RE[1]", "RE[-1]", "RE[0]"].iter().any(|re| line.contains(re)),
            "{line}"
        );
    }
}
