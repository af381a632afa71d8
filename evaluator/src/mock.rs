//! In-memory engine for testing the coordinator without Stockfish.
//!
//! [`mock_engine`] returns a [`MockSpawner`] to hand to the coordinator and a
//! [`MockEngine`] the test keeps to watch the commands sent and to script the
//! engine's answers.

use engine::{EngineError, EventSink, Worker, WorkerHandle, WorkerSpawner};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Default)]
struct Shared {
    sink: Option<EventSink>,
    spawns: usize,
    failing_spawns: usize,
    ignore_isready: bool,
    sent: Vec<String>,
}

type SharedState = Arc<Mutex<Shared>>;

fn lock(shared: &SharedState) -> std::sync::MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Spawns scripted workers. Answers `uci` with `uciok` and `isready` with
/// `readyok`; everything else is left to the test.
pub struct MockSpawner {
    shared: SharedState,
    lines_tx: mpsc::UnboundedSender<String>,
}

/// Test-side view of the scripted engine.
pub struct MockEngine {
    shared: SharedState,
    lines_rx: mpsc::UnboundedReceiver<String>,
}

/// A `position fen` / `go` pair observed on the engine's input.
#[derive(Debug, Clone, PartialEq)]
pub struct MockSearch {
    pub fen: String,
    pub go: String,
}

pub fn mock_engine() -> (MockEngine, MockSpawner) {
    let shared = SharedState::default();
    let (lines_tx, lines_rx) = mpsc::unbounded_channel();
    (
        MockEngine {
            shared: shared.clone(),
            lines_rx,
        },
        MockSpawner { shared, lines_tx },
    )
}

struct MockHandle {
    task: JoinHandle<()>,
}

impl WorkerHandle for MockHandle {
    fn terminate(&mut self) {
        self.task.abort();
    }
}

impl WorkerSpawner for MockSpawner {
    fn spawn(&mut self, sink: EventSink) -> Result<Worker, EngineError> {
        {
            let mut shared = lock(&self.shared);
            if shared.failing_spawns > 0 {
                shared.failing_spawns -= 1;
                return Err(EngineError::Startup("mock engine refused to start".into()));
            }
            shared.spawns += 1;
            shared.sink = Some(sink.clone());
        }

        let (stdin_tx, mut stdin_rx) = mpsc::unbounded_channel::<String>();
        let shared = self.shared.clone();
        let lines_tx = self.lines_tx.clone();

        let task = tokio::spawn(async move {
            while let Some(line) = stdin_rx.recv().await {
                let line = line.trim_end().to_string();
                let ignore_isready = {
                    let mut shared = lock(&shared);
                    shared.sent.push(line.clone());
                    shared.ignore_isready
                };
                let _ = lines_tx.send(line.clone());

                match line.as_str() {
                    "uci" => {
                        sink.line("id name MockFish");
                        sink.line("uciok");
                    }
                    "isready" if !ignore_isready => sink.line("readyok"),
                    _ => {}
                }
            }
        });

        Ok(Worker {
            stdin: stdin_tx,
            handle: Box::new(MockHandle { task }),
        })
    }
}

impl MockEngine {
    /// Next line written to any worker, in order.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines_rx.recv().await
    }

    /// Skip ahead to the next search request and return it.
    pub async fn next_search(&mut self) -> Option<MockSearch> {
        loop {
            let line = self.next_line().await?;
            if let Some(fen) = line.strip_prefix("position fen ") {
                let fen = fen.to_string();
                let go = self.next_line().await?;
                return Some(MockSearch { fen, go });
            }
        }
    }

    /// Send a line of output from the current worker.
    pub fn reply(&self, line: &str) {
        if let Some(sink) = lock(&self.shared).sink.clone() {
            sink.line(line);
        }
    }

    /// Answer the outstanding search with an optional score.
    pub fn answer(&self, best_move: &str, score_cp: Option<i32>) {
        if let Some(cp) = score_cp {
            self.reply(&format!("info depth 15 score cp {} pv {}", cp, best_move));
        }
        self.reply(&format!("bestmove {}", best_move));
    }

    /// Make the current worker's channel fail, as if the process died.
    pub fn crash(&self, reason: &str) {
        if let Some(sink) = lock(&self.shared).sink.clone() {
            sink.failed(reason);
        }
    }

    /// Make the next `n` spawn attempts fail.
    pub fn fail_next_spawns(&self, n: usize) {
        lock(&self.shared).failing_spawns = n;
    }

    /// Stop (or resume) answering `isready`.
    pub fn ignore_isready(&self, ignore: bool) {
        lock(&self.shared).ignore_isready = ignore;
    }

    /// Number of workers started so far.
    pub fn spawn_count(&self) -> usize {
        lock(&self.shared).spawns
    }

    /// Every line sent to any worker so far.
    pub fn sent(&self) -> Vec<String> {
        lock(&self.shared).sent.clone()
    }

    /// Number of `go` commands sent so far.
    pub fn go_count(&self) -> usize {
        lock(&self.shared)
            .sent
            .iter()
            .filter(|line| line.starts_with("go"))
            .count()
    }
}
