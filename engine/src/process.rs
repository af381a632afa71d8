use crate::uci::parse_uci_message;
use crate::{EngineCommand, EngineError, EngineEvent, EngineEventKind};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

type Listener = Arc<Mutex<Option<mpsc::UnboundedSender<EngineEvent>>>>;

/// Where a worker reports its output.
///
/// Each sink is bound to the generation of the worker it was created for, so
/// the subscriber can discard output from workers that have been replaced.
#[derive(Clone)]
pub struct EventSink {
    generation: u64,
    listener: Listener,
}

impl EventSink {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Report one line of engine output. Lines that are not UCI messages
    /// (option listings, banners) are dropped.
    pub fn line(&self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        tracing::trace!(generation = self.generation, "UCI << {}", trimmed);

        match parse_uci_message(trimmed) {
            Ok(msg) => self.emit(EngineEventKind::Message(msg)),
            Err(e) => tracing::trace!("Ignoring engine output: {}", e),
        }
    }

    /// Report a failure of the worker channel.
    pub fn failed(&self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(generation = self.generation, "Engine channel failed: {}", reason);
        self.emit(EngineEventKind::Failed(reason));
    }

    fn emit(&self, kind: EngineEventKind) {
        let listener = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = listener.as_ref() {
            let _ = tx.send(EngineEvent {
                generation: self.generation,
                kind,
            });
        }
    }
}

/// Stops a running worker.
pub trait WorkerHandle: Send {
    fn terminate(&mut self);
}

/// A running worker: a line-oriented input channel plus a way to stop it.
/// Output flows through the [`EventSink`] the worker was spawned with.
pub struct Worker {
    pub stdin: mpsc::UnboundedSender<String>,
    pub handle: Box<dyn WorkerHandle>,
}

/// Creates engine workers.
pub trait WorkerSpawner: Send + 'static {
    fn spawn(&mut self, sink: EventSink) -> Result<Worker, EngineError>;
}

/// Options applied during the initialization handshake.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub multipv: u32,
    pub threads: u32,
    pub hash_mb: Option<u32>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            multipv: 1,
            threads: 1,
            hash_mb: None,
        }
    }
}

/// Owns the lifecycle of exactly one engine worker.
pub struct EngineProcess {
    spawner: Box<dyn WorkerSpawner>,
    options: EngineOptions,
    worker: Option<Worker>,
    generation: u64,
    listener: Listener,
}

impl EngineProcess {
    /// Create a process wrapper. No worker is running until [`start`](Self::start).
    pub fn new(spawner: impl WorkerSpawner, options: EngineOptions) -> Self {
        Self {
            spawner: Box::new(spawner),
            options,
            worker: None,
            generation: 0,
            listener: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawn a worker and send the initialization sequence, ending with
    /// `isready`. The worker is usable once the subscriber sees `readyok`.
    #[tracing::instrument(level = "info", skip(self))]
    pub fn start(&mut self) -> Result<(), EngineError> {
        self.terminate_worker();
        self.generation += 1;

        let sink = self.sink();
        let worker = self.spawner.spawn(sink).map_err(|e| {
            tracing::error!("Failed to spawn engine worker: {}", e);
            e
        })?;
        self.worker = Some(worker);

        for command in self.init_sequence() {
            self.send(&command);
        }
        tracing::info!(generation = self.generation, "Engine worker started, waiting for readyok");
        Ok(())
    }

    fn init_sequence(&self) -> Vec<EngineCommand> {
        let mut commands = vec![
            EngineCommand::Uci,
            EngineCommand::SetOption {
                name: "MultiPV".into(),
                value: Some(self.options.multipv.to_string()),
            },
            EngineCommand::SetOption {
                name: "Threads".into(),
                value: Some(self.options.threads.clamp(1, 16).to_string()),
            },
        ];
        if let Some(hash_mb) = self.options.hash_mb {
            commands.push(EngineCommand::SetOption {
                name: "Hash".into(),
                value: Some(hash_mb.clamp(1, 2048).to_string()),
            });
        }
        commands.push(EngineCommand::IsReady);
        commands
    }

    /// Write one command line to the worker. Failures are reported to the
    /// subscriber as [`EngineEventKind::Failed`], never returned.
    pub fn send(&self, command: &EngineCommand) {
        let line = command.to_string();
        match &self.worker {
            Some(worker) => {
                tracing::trace!(generation = self.generation, "UCI >> {}", line);
                if worker.stdin.send(format!("{}\n", line)).is_err() {
                    self.sink().failed(format!("engine input closed while sending `{}`", line));
                }
            }
            None => self
                .sink()
                .failed(format!("no engine worker running, dropped `{}`", line)),
        }
    }

    /// Register the single event listener, replacing (and closing) any
    /// previous one.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<EngineEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.listener.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
        rx
    }

    /// Kill the current worker, abandoning any search in progress, and start
    /// a fresh one.
    pub fn restart(&mut self) -> Result<(), EngineError> {
        tracing::info!(generation = self.generation, "Restarting engine worker");
        self.terminate_worker();
        self.start()
    }

    /// Terminate the worker. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        if self.worker.is_some() {
            self.send(&EngineCommand::Quit);
            self.terminate_worker();
            tracing::info!(generation = self.generation, "Engine worker destroyed");
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Generation of the current worker. Every start and every termination
    /// moves it forward, so it only ever matches a live worker.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn terminate_worker(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.handle.terminate();
            // Retire the generation so late output of the dead worker is stale.
            self.generation += 1;
        }
    }

    fn sink(&self) -> EventSink {
        EventSink {
            generation: self.generation,
            listener: Arc::clone(&self.listener),
        }
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UciMessage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Recorder {
        spawned: Arc<Mutex<Vec<(EventSink, mpsc::UnboundedReceiver<String>)>>>,
        terminated: Arc<AtomicUsize>,
        fail: bool,
    }

    struct CountingHandle(Arc<AtomicUsize>);

    impl WorkerHandle for CountingHandle {
        fn terminate(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl WorkerSpawner for Recorder {
        fn spawn(&mut self, sink: EventSink) -> Result<Worker, EngineError> {
            if self.fail {
                return Err(EngineError::NotFound);
            }
            let (tx, rx) = mpsc::unbounded_channel();
            self.spawned.lock().unwrap().push((sink, rx));
            Ok(Worker {
                stdin: tx,
                handle: Box::new(CountingHandle(Arc::clone(&self.terminated))),
            })
        }
    }

    fn recorder(fail: bool) -> (Recorder, Arc<Mutex<Vec<(EventSink, mpsc::UnboundedReceiver<String>)>>>, Arc<AtomicUsize>) {
        let spawned = Arc::new(Mutex::new(Vec::new()));
        let terminated = Arc::new(AtomicUsize::new(0));
        (
            Recorder {
                spawned: Arc::clone(&spawned),
                terminated: Arc::clone(&terminated),
                fail,
            },
            spawned,
            terminated,
        )
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line.trim_end().to_string());
        }
        lines
    }

    #[test]
    fn test_start_sends_handshake() {
        let (spawner, spawned, _) = recorder(false);
        let mut process = EngineProcess::new(
            spawner,
            EngineOptions {
                hash_mb: Some(16),
                ..Default::default()
            },
        );
        process.start().unwrap();

        let mut spawned = spawned.lock().unwrap();
        let lines = drain(&mut spawned[0].1);
        assert_eq!(
            lines,
            vec![
                "uci",
                "setoption name MultiPV value 1",
                "setoption name Threads value 1",
                "setoption name Hash value 16",
                "isready",
            ]
        );
        assert_eq!(process.generation(), 1);
    }

    #[test]
    fn test_events_carry_generation() {
        let (spawner, spawned, terminated) = recorder(false);
        let mut process = EngineProcess::new(spawner, EngineOptions::default());
        let mut events = process.subscribe();
        process.start().unwrap();
        process.restart().unwrap();
        assert_eq!(terminated.load(Ordering::SeqCst), 1);

        let spawned = spawned.lock().unwrap();
        spawned[0].0.line("readyok");
        spawned[1].0.line("readyok");
        spawned[1].0.line("option name Hash type spin default 16");

        let first = events.try_recv().unwrap();
        let second = events.try_recv().unwrap();
        assert_eq!(first.generation, 1);
        assert!(second.generation > first.generation);
        assert_eq!(second.generation, process.generation());
        assert_eq!(second.kind, EngineEventKind::Message(UciMessage::ReadyOk));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_send_failure_is_reported_to_subscriber() {
        let (spawner, spawned, _) = recorder(false);
        let mut process = EngineProcess::new(spawner, EngineOptions::default());
        let mut events = process.subscribe();
        process.start().unwrap();

        // Dropping the receiving end simulates a dead writer task.
        spawned.lock().unwrap().clear();
        process.send(&EngineCommand::IsReady);

        let event = events.try_recv().unwrap();
        assert!(matches!(event.kind, EngineEventKind::Failed(_)));
    }

    #[test]
    fn test_subscribe_replaces_previous_listener() {
        let (spawner, spawned, _) = recorder(false);
        let mut process = EngineProcess::new(spawner, EngineOptions::default());
        let mut old = process.subscribe();
        let mut new = process.subscribe();
        process.start().unwrap();

        spawned.lock().unwrap()[0].0.line("readyok");
        assert!(matches!(
            old.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
        assert!(new.try_recv().is_ok());
    }

    #[test]
    fn test_start_failure() {
        let (spawner, _, _) = recorder(true);
        let mut process = EngineProcess::new(spawner, EngineOptions::default());
        assert!(matches!(process.start(), Err(EngineError::NotFound)));
        assert!(!process.is_running());
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let (spawner, _, terminated) = recorder(false);
        let mut process = EngineProcess::new(spawner, EngineOptions::default());
        process.start().unwrap();
        process.destroy();
        process.destroy();
        drop(process);
        assert_eq!(terminated.load(Ordering::SeqCst), 1);
    }
}
