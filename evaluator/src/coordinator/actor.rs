use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::Instrument;

use super::commands::CoordinatorCommand;
use super::state::CoordinatorState;

/// The coordinator actor loop.
/// Owns all mutable state. Processes commands and engine events sequentially.
pub(crate) async fn run_coordinator(
    state: CoordinatorState,
    cmd_rx: mpsc::Receiver<CoordinatorCommand>,
) {
    run_coordinator_inner(state, cmd_rx)
        .instrument(tracing::info_span!("evaluator"))
        .await;
}

async fn run_coordinator_inner(
    mut state: CoordinatorState,
    mut cmd_rx: mpsc::Receiver<CoordinatorCommand>,
) {
    tracing::info!("Evaluation coordinator started");
    state.boot(Instant::now());

    let mut sweep = time::interval(state.sweep_interval());
    sweep.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

    loop {
        let deadline = state.next_deadline();

        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(CoordinatorCommand::Shutdown { reply }) => {
                        tracing::info!("Evaluation coordinator shutting down");
                        state.shutdown();
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        tracing::info!("Coordinator handle dropped, shutting down");
                        state.shutdown();
                        break;
                    }
                    Some(cmd) => handle_command(&mut state, cmd),
                }
            }

            Some(event) = state.next_engine_event() => {
                state.handle_engine_event(event, Instant::now());
            }

            _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                state.on_deadline(Instant::now());
            }

            _ = sweep.tick() => {
                state.sweep(Instant::now());
            }
        }
    }

    tracing::info!("Evaluation coordinator exited");
}

fn handle_command(state: &mut CoordinatorState, cmd: CoordinatorCommand) {
    match cmd {
        CoordinatorCommand::Evaluate { key, reply } => {
            state.evaluate(key, reply, Instant::now());
        }
        CoordinatorCommand::Cached { key, reply } => {
            let _ = reply.send(state.cached(&key));
        }
        CoordinatorCommand::ResetGame { reply } => {
            state.reset_game();
            let _ = reply.send(());
        }
        CoordinatorCommand::Shutdown { .. } => unreachable!(),
    }
}
