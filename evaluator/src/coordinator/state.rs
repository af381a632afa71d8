use engine::{
    EngineCommand, EngineEvent, EngineEventKind, EngineProcess, Score, UciMessage,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use super::commands::EvaluationReply;
use crate::{Evaluation, EvaluationCache, EvaluationError, EvaluatorConfig, PositionKey};

/// Lifecycle of the engine worker as seen by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineSessionState {
    /// Starting up, or torn down after a failed start.
    NotReady,
    Ready,
    /// A search is outstanding.
    Busy,
    /// The worker failed; persists only if it could not be restarted.
    Failed,
}

/// A caller waiting for an evaluation.
pub(crate) struct Waiter {
    created_at: Instant,
    reply: EvaluationReply,
}

impl Waiter {
    fn resolve(self, result: Result<Arc<Evaluation>, EvaluationError>) {
        // The caller may have given up; nothing to do then.
        let _ = self.reply.send(result);
    }
}

/// The search the engine is working on.
struct Search {
    key: PositionKey,
    waiters: Vec<Waiter>,
    dispatched_at: Instant,
    last_score: Option<Score>,
    /// Abandoned with `stop`; its result is discarded.
    stopped: bool,
}

/// The next position to search once the engine is free.
struct Queued {
    key: PositionKey,
    waiters: Vec<Waiter>,
}

fn reject_all(waiters: Vec<Waiter>, error: &EvaluationError) {
    for waiter in waiters {
        waiter.resolve(Err(error.clone()));
    }
}

/// Reject the waiters that have waited at least `stale_after`.
fn reject_stale(waiters: &mut Vec<Waiter>, now: Instant, stale_after: Duration) -> usize {
    let (stale, fresh): (Vec<_>, Vec<_>) = std::mem::take(waiters)
        .into_iter()
        .partition(|waiter| now.duration_since(waiter.created_at) >= stale_after);
    *waiters = fresh;

    let count = stale.len();
    reject_all(stale, &EvaluationError::EvaluationTimeout);
    count
}

/// Internal mutable state, owned entirely by the coordinator actor. No locks.
pub(crate) struct CoordinatorState {
    config: EvaluatorConfig,
    cache: EvaluationCache,
    engine: EngineProcess,
    events: mpsc::UnboundedReceiver<EngineEvent>,
    session: EngineSessionState,
    state_tx: watch::Sender<EngineSessionState>,
    in_flight: Option<Search>,
    queued: Option<Queued>,
    last_dispatch: Option<Instant>,
    /// Throttled dispatch wake-up.
    dispatch_at: Option<Instant>,
    ready_deadline: Option<Instant>,
}

impl CoordinatorState {
    pub fn new(
        mut engine: EngineProcess,
        config: EvaluatorConfig,
        state_tx: watch::Sender<EngineSessionState>,
    ) -> Self {
        let events = engine.subscribe();
        Self {
            config,
            cache: EvaluationCache::new(),
            engine,
            events,
            session: EngineSessionState::NotReady,
            state_tx,
            in_flight: None,
            queued: None,
            last_dispatch: None,
            dispatch_at: None,
            ready_deadline: None,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        self.config.sweep_interval
    }

    /// Start the engine so it is warm before the first request.
    pub fn boot(&mut self, now: Instant) {
        let result = self.engine.start();
        self.after_start(result, now);
    }

    pub async fn next_engine_event(&mut self) -> Option<EngineEvent> {
        self.events.recv().await
    }

    /// Earliest pending wake-up (throttle or readiness deadline).
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.dispatch_at, self.ready_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn cached(&self, key: &PositionKey) -> Option<Arc<Evaluation>> {
        self.cache.get(key)
    }

    pub fn reset_game(&mut self) {
        tracing::info!(entries = self.cache.len(), "Clearing evaluation cache");
        self.cache.clear();
    }

    pub fn evaluate(&mut self, key: PositionKey, reply: EvaluationReply, now: Instant) {
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(%key, "Cache hit");
            let _ = reply.send(Ok(hit));
            return;
        }

        let waiter = Waiter {
            created_at: now,
            reply,
        };

        if let Some(search) = self
            .in_flight
            .as_mut()
            .filter(|search| !search.stopped && search.key == key)
        {
            tracing::debug!(%key, "Joining in-flight search");
            search.waiters.push(waiter);
            return;
        }
        if let Some(queued) = self.queued.as_mut().filter(|queued| queued.key == key) {
            tracing::debug!(%key, "Joining queued request");
            queued.waiters.push(waiter);
            return;
        }

        // A newer position replaces whatever was asked for before.
        if let Some(older) = self.queued.take() {
            tracing::debug!(key = %older.key, "Queued request superseded");
            reject_all(older.waiters, &EvaluationError::Superseded);
        }
        self.abandon_in_flight();

        tracing::debug!(%key, "Queued evaluation");
        self.queued = Some(Queued {
            key,
            waiters: vec![waiter],
        });
        self.try_dispatch(now);
    }

    fn abandon_in_flight(&mut self) {
        let Some(search) = self.in_flight.as_mut() else {
            return;
        };
        if search.stopped {
            return;
        }

        tracing::debug!(key = %search.key, "Abandoning in-flight search");
        search.stopped = true;
        reject_all(
            std::mem::take(&mut search.waiters),
            &EvaluationError::Superseded,
        );
        self.engine.send(&EngineCommand::Stop);
    }

    /// Send the queued request to the engine if it can take it now.
    fn try_dispatch(&mut self, now: Instant) {
        if self.in_flight.is_some() {
            return;
        }
        let Some(queued) = self.queued.as_ref() else {
            return;
        };

        if let Some(hit) = self.cache.get(&queued.key) {
            if let Some(queued) = self.queued.take() {
                for waiter in queued.waiters {
                    waiter.resolve(Ok(hit.clone()));
                }
            }
            return;
        }

        if !self.engine.is_running() {
            tracing::info!("Engine not running, starting it");
            let result = self.engine.start();
            self.after_start(result, now);
            return;
        }
        if self.session != EngineSessionState::Ready {
            return;
        }

        if let Some(last) = self.last_dispatch {
            let earliest = last + self.config.min_dispatch_interval;
            if now < earliest {
                self.dispatch_at = Some(earliest);
                return;
            }
        }
        self.dispatch_at = None;

        let Some(queued) = self.queued.take() else {
            return;
        };
        tracing::debug!(key = %queued.key, depth = self.config.search_depth, "Dispatching search");

        self.engine.send(&EngineCommand::SetPosition {
            fen: queued.key.to_string(),
        });
        self.engine.send(&EngineCommand::Go {
            depth: self.config.search_depth,
        });

        self.in_flight = Some(Search {
            key: queued.key,
            waiters: queued.waiters,
            dispatched_at: now,
            last_score: None,
            stopped: false,
        });
        self.last_dispatch = Some(now);
        self.set_session(EngineSessionState::Busy);
    }

    pub fn handle_engine_event(&mut self, event: EngineEvent, now: Instant) {
        if !self.engine.is_running() || event.generation != self.engine.generation() {
            tracing::trace!(
                generation = event.generation,
                current = self.engine.generation(),
                "Dropping event from a replaced worker"
            );
            return;
        }

        match event.kind {
            EngineEventKind::Message(UciMessage::ReadyOk) => {
                if self.session == EngineSessionState::NotReady {
                    tracing::info!(generation = event.generation, "Engine ready");
                    self.ready_deadline = None;
                    self.set_session(EngineSessionState::Ready);
                    self.try_dispatch(now);
                }
            }
            EngineEventKind::Message(UciMessage::Info(info)) => {
                if let (Some(search), Some(score)) = (self.in_flight.as_mut(), info.score) {
                    if info.multipv.unwrap_or(1) == 1 {
                        search.last_score = Some(score);
                    }
                }
            }
            EngineEventKind::Message(UciMessage::BestMove { mv, score, .. }) => {
                self.complete_search(mv, score, now);
            }
            EngineEventKind::Message(UciMessage::UciOk) => {
                tracing::debug!("Engine acknowledged UCI mode");
            }
            EngineEventKind::Message(UciMessage::Id { name, value }) => {
                tracing::debug!("Engine id {}: {}", name, value);
            }
            EngineEventKind::Failed(reason) => self.handle_failure(reason, now),
        }
    }

    fn complete_search(&mut self, best_move: Option<String>, score: Option<Score>, now: Instant) {
        let Some(search) = self.in_flight.take() else {
            tracing::debug!("Ignoring bestmove with no search outstanding");
            return;
        };

        let evaluation = Arc::new(Evaluation {
            best_move,
            score: score
                .or(search.last_score)
                .unwrap_or(Score::Centipawns(0)),
        });

        if search.stopped {
            tracing::debug!(key = %search.key, "Discarding result of abandoned search");
        } else {
            tracing::debug!(
                key = %search.key,
                best_move = ?evaluation.best_move,
                score = %evaluation.score,
                "Search complete"
            );
            self.cache.set(search.key, evaluation.clone());
        }

        for waiter in search.waiters {
            waiter.resolve(Ok(evaluation.clone()));
        }

        self.set_session(EngineSessionState::Ready);
        self.try_dispatch(now);
    }

    fn handle_failure(&mut self, reason: String, now: Instant) {
        if let Some(search) = self.in_flight.take() {
            tracing::warn!(key = %search.key, "Engine failed during search: {}", reason);
            reject_all(search.waiters, &EvaluationError::EngineEvaluation(reason));
            self.restart(now);
        } else if self.session == EngineSessionState::NotReady {
            tracing::error!("Engine failed while starting: {}", reason);
            self.reject_queued(EvaluationError::EngineStartup(reason));
            self.engine.destroy();
            self.ready_deadline = None;
        } else {
            tracing::warn!("Engine failed while idle: {}", reason);
            self.restart(now);
        }
    }

    fn restart(&mut self, now: Instant) {
        self.set_session(EngineSessionState::Failed);
        let result = self.engine.restart();
        self.after_start(result, now);
    }

    fn after_start(&mut self, result: Result<(), engine::EngineError>, now: Instant) {
        match result {
            Ok(()) => {
                self.set_session(EngineSessionState::NotReady);
                self.ready_deadline = Some(now + self.config.ready_timeout);
            }
            Err(e) => {
                tracing::error!("Could not start engine: {}", e);
                self.ready_deadline = None;
                self.set_session(EngineSessionState::Failed);
                self.reject_queued(EvaluationError::EngineStartup(e.to_string()));
            }
        }
    }

    fn reject_queued(&mut self, error: EvaluationError) {
        if let Some(queued) = self.queued.take() {
            reject_all(queued.waiters, &error);
        }
    }

    /// Fire whichever deadlines have passed.
    pub fn on_deadline(&mut self, now: Instant) {
        if self.ready_deadline.is_some_and(|deadline| now >= deadline) {
            self.ready_deadline = None;
            if self.session == EngineSessionState::NotReady {
                tracing::error!(
                    timeout_ms = self.config.ready_timeout.as_millis() as u64,
                    "Engine did not answer readyok in time"
                );
                self.reject_queued(EvaluationError::EngineNotReady);
                self.engine.destroy();
            }
        }

        if self.dispatch_at.is_some_and(|at| now >= at) {
            self.dispatch_at = None;
            self.try_dispatch(now);
        }
    }

    /// Reject requests that waited too long and restart a wedged engine.
    pub fn sweep(&mut self, now: Instant) {
        let stale_after = self.config.stale_after;
        let mut expired = 0;

        if let Some(search) = self.in_flight.as_mut() {
            expired += reject_stale(&mut search.waiters, now, stale_after);
        }
        if let Some(queued) = self.queued.as_mut() {
            expired += reject_stale(&mut queued.waiters, now, stale_after);
            if queued.waiters.is_empty() {
                self.queued = None;
            }
        }
        if expired > 0 {
            tracing::warn!(expired, "Rejected stale evaluation requests");
        }

        let wedged = self
            .in_flight
            .as_ref()
            .is_some_and(|search| now.duration_since(search.dispatched_at) >= stale_after);
        if wedged {
            if let Some(search) = self.in_flight.take() {
                tracing::warn!(key = %search.key, "Engine stopped responding, restarting");
                reject_all(search.waiters, &EvaluationError::EvaluationTimeout);
            }
            self.restart(now);
        }
    }

    /// Reject everything still pending and stop the engine.
    pub fn shutdown(&mut self) {
        if let Some(search) = self.in_flight.take() {
            reject_all(search.waiters, &EvaluationError::Closed);
        }
        self.reject_queued(EvaluationError::Closed);
        self.engine.destroy();
        self.ready_deadline = None;
        self.dispatch_at = None;
        self.set_session(EngineSessionState::NotReady);
    }

    fn set_session(&mut self, session: EngineSessionState) {
        if self.session != session {
            tracing::debug!("Engine session {:?} -> {:?}", self.session, session);
            self.session = session;
        }
        self.state_tx.send_replace(session);
    }
}
