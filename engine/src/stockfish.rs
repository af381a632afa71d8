use crate::process::{EventSink, Worker, WorkerHandle, WorkerSpawner};
use crate::EngineError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::mpsc;

/// Spawns Stockfish child processes speaking UCI over stdin/stdout.
#[derive(Debug, Clone, Default)]
pub struct StockfishSpawner {
    path: Option<PathBuf>,
}

impl StockfishSpawner {
    /// Use an explicit binary path, or search the usual install locations
    /// when `path` is `None`.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

struct StockfishHandle {
    child: Child,
}

impl WorkerHandle for StockfishHandle {
    fn terminate(&mut self) {
        if let Err(e) = self.child.start_kill() {
            tracing::debug!("Stockfish already exited: {}", e);
        }
    }
}

impl WorkerSpawner for StockfishSpawner {
    #[tracing::instrument(level = "info", skip(self, sink), fields(generation = sink.generation()))]
    fn spawn(&mut self, sink: EventSink) -> Result<Worker, EngineError> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => find_stockfish_path().ok_or(EngineError::NotFound)?,
        };
        tracing::info!("Spawning Stockfish at: {:?}", path);

        let mut child = tokio::process::Command::new(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Startup(format!("Failed to spawn {}: {}", path.display(), e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Startup("Failed to get stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Startup("Failed to get stdout".into()))?;

        let (stdin_tx, stdin_rx) = mpsc::unbounded_channel::<String>();
        tokio::spawn(read_output(stdout, sink.clone()));
        tokio::spawn(write_input(stdin, stdin_rx, sink));

        Ok(Worker {
            stdin: stdin_tx,
            handle: Box::new(StockfishHandle { child }),
        })
    }
}

async fn read_output(stdout: ChildStdout, sink: EventSink) {
    let mut reader = BufReader::new(stdout);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                sink.failed("Stockfish stdout EOF - engine closed");
                break;
            }
            Ok(_) => sink.line(&line),
            Err(e) => {
                sink.failed(format!("Error reading from Stockfish stdout: {}", e));
                break;
            }
        }
    }
    tracing::debug!(generation = sink.generation(), "Output reader task exiting");
}

async fn write_input(mut stdin: ChildStdin, mut rx: mpsc::UnboundedReceiver<String>, sink: EventSink) {
    while let Some(cmd) = rx.recv().await {
        let written = async {
            stdin.write_all(cmd.as_bytes()).await?;
            stdin.flush().await
        }
        .await;

        if let Err(e) = written {
            sink.failed(format!("Failed to write to Stockfish stdin: {}", e));
            break;
        }
    }
    tracing::debug!(generation = sink.generation(), "Stdin writer task exiting");
}

/// Find Stockfish executable in common locations
pub fn find_stockfish_path() -> Option<PathBuf> {
    const COMMON_PATHS: [&str; 4] = [
        "/usr/local/bin/stockfish",
        "/usr/bin/stockfish",
        "/opt/homebrew/bin/stockfish",
        "/usr/games/stockfish",
    ];

    if let Some(path) = COMMON_PATHS.iter().map(Path::new).find(|p| p.is_file()) {
        return Some(path.to_path_buf());
    }

    // In PATH
    std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths)
            .map(|dir| dir.join("stockfish"))
            .find(|candidate| candidate.is_file())
    })
}
