//! Serializes evaluation requests against a single engine worker.
//!
//! [`EvaluationCoordinator`] is a handle to an actor task that owns the
//! engine process, the evaluation cache and every pending request. Only one
//! position is searched at a time: a request for a new position supersedes
//! the previous one, repeated requests for the same position share one
//! search, and searches are spaced at least `min_dispatch_interval` apart.

mod actor;
mod commands;
mod state;


use engine::{EngineProcess, StockfishSpawner, WorkerSpawner};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

use crate::{Evaluation, EvaluationError, EvaluatorConfig, PositionKey};
use actor::run_coordinator;
use commands::CoordinatorCommand;
pub use state::EngineSessionState;
use state::CoordinatorState;

/// Handle to the coordinator actor. Dropping it shuts the actor down.
pub struct EvaluationCoordinator {
    cmd_tx: mpsc::Sender<CoordinatorCommand>,
    state_rx: watch::Receiver<EngineSessionState>,
}

impl EvaluationCoordinator {
    /// Spawn the coordinator actor on the current tokio runtime. The engine
    /// is started right away.
    pub fn new(spawner: impl WorkerSpawner, config: EvaluatorConfig) -> Self {
        let engine = EngineProcess::new(spawner, config.engine_options());
        let (state_tx, state_rx) = watch::channel(EngineSessionState::NotReady);
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let state = CoordinatorState::new(engine, config, state_tx);
        tokio::spawn(run_coordinator(state, cmd_rx));

        Self { cmd_tx, state_rx }
    }

    /// Coordinator backed by a Stockfish process.
    pub fn with_stockfish(config: EvaluatorConfig) -> Self {
        let spawner = StockfishSpawner::new(config.stockfish_path.clone());
        Self::new(spawner, config)
    }

    /// Evaluate the position given as FEN.
    ///
    /// Resolves from the cache when possible, otherwise once the engine has
    /// searched the position. Fails with [`EvaluationError::Superseded`] if a
    /// different position is requested before this one is done.
    pub async fn evaluate(&self, fen: &str) -> Result<Arc<Evaluation>, EvaluationError> {
        let key = PositionKey::new(fen)?;
        let (tx, rx) = oneshot::channel();
        self.send(CoordinatorCommand::Evaluate { key, reply: tx })
            .await?;
        rx.await.map_err(|_| EvaluationError::Closed)?
    }

    /// Cached evaluation for `fen`, without asking the engine.
    pub async fn cached(&self, fen: &str) -> Result<Option<Arc<Evaluation>>, EvaluationError> {
        let key = PositionKey::new(fen)?;
        let (tx, rx) = oneshot::channel();
        self.send(CoordinatorCommand::Cached { key, reply: tx })
            .await?;
        rx.await.map_err(|_| EvaluationError::Closed)
    }

    /// Forget all cached evaluations, e.g. when another game is loaded.
    pub async fn reset_game(&self) -> Result<(), EvaluationError> {
        let (tx, rx) = oneshot::channel();
        self.send(CoordinatorCommand::ResetGame { reply: tx }).await?;
        rx.await.map_err(|_| EvaluationError::Closed)
    }

    pub fn session_state(&self) -> EngineSessionState {
        *self.state_rx.borrow()
    }

    /// Receiver notified on every engine session state change.
    pub fn state_changes(&self) -> watch::Receiver<EngineSessionState> {
        self.state_rx.clone()
    }

    /// Reject all pending requests with [`EvaluationError::Closed`], stop
    /// the engine and wait for the actor to finish.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .send(CoordinatorCommand::Shutdown { reply: tx })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    async fn send(&self, cmd: CoordinatorCommand) -> Result<(), EvaluationError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| EvaluationError::Closed)
    }
}
