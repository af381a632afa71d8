//! chessview - step through chess games with engine feedback.
//!
//! Games come from PGN files (single games or multi-game archive exports).
//! Positions are evaluated by a local Stockfish process; see
//! [`chessview::config`] and [`evaluator::config`] for the environment
//! variables that tune it.

use std::path::PathBuf;

use anyhow::Context;
use chess::GameType;
use chessview::commands;
use chessview::config;
use chessview::ReviewSession;
use clap::{Parser, Subcommand};
use evaluator::EvaluationCoordinator;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Top-level CLI arguments for chessview.
#[derive(Parser)]
#[command(name = "chessview", about = "Review chess games against a UCI engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the games in a PGN archive, newest first.
    Games {
        /// PGN file with one or more games.
        file: PathBuf,

        /// Only games this player took part in; also shows their result.
        #[arg(short, long)]
        player: Option<String>,

        /// Only games of this type (bullet, blitz, rapid, daily).
        #[arg(short = 't', long = "type")]
        game_type: Option<GameType>,
    },

    /// Step through a game and compare each move with the engine's choice.
    ///
    /// Without `--interactive` the whole game is walked from the first move
    /// to the last.
    Review {
        /// PGN file with one or more games.
        file: PathBuf,

        /// Game number as listed by `chessview games`.
        #[arg(short, long, default_value_t = 1)]
        game: usize,

        /// Print the review as JSON.
        #[arg(long)]
        json: bool,

        /// Navigate with commands read from stdin.
        #[arg(short, long, conflicts_with = "json")]
        interactive: bool,
    },

    /// Evaluate a single position given as FEN.
    Eval {
        /// FEN string; may be passed unquoted as several words.
        #[arg(required = true, num_args = 1..)]
        fen: Vec<String>,

        /// Print the evaluation as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Install the tracing subscriber. Logs go to a daily rolling file when a
/// log directory is configured, otherwise to stderr. The returned guard must
/// be kept alive to flush the file writer.
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));

    match config::get_log_dir() {
        Some(log_dir) => {
            std::fs::create_dir_all(&log_dir).ok();
            let file_appender =
                tracing_appender::rolling::daily(log_dir, config::DEFAULT_LOG_FILE_PREFIX);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true)
                        .with_line_number(true),
                )
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true),
                )
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing();
    let mut out = std::io::stdout();

    match cli.command {
        Commands::Games {
            file,
            player,
            game_type,
        } => {
            let text = commands::read_pgn_file(&file)?;
            let games = commands::list_games(&text, player.as_deref(), game_type);
            commands::write_games(&mut out, &games, player.as_deref())?;
        }
        Commands::Review {
            file,
            game,
            json,
            interactive,
        } => {
            let text = commands::read_pgn_file(&file)?;
            let game = commands::load_game(&text, game)?;
            let mut session = ReviewSession::new(game);
            tracing::info!(plies = session.total_plies(), "Starting review");

            let coordinator = EvaluationCoordinator::with_stockfish(config::get_evaluator_config());
            let result = if interactive {
                let stdin = tokio::io::BufReader::new(tokio::io::stdin());
                commands::run_interactive(&mut session, &coordinator, stdin, &mut out).await
            } else {
                let reports = commands::review_game(&mut session, &coordinator).await;
                if json {
                    commands::write_review_json(&mut out, &reports)
                } else {
                    commands::write_review(&mut out, &reports)
                }
            };
            coordinator.shutdown().await;
            result?;
        }
        Commands::Eval { fen, json } => {
            let fen = fen.join(" ");
            let coordinator = EvaluationCoordinator::with_stockfish(config::get_evaluator_config());
            let report = commands::eval_position(&coordinator, &fen).await;
            coordinator.shutdown().await;

            let report = report.with_context(|| format!("failed to evaluate {}", fen))?;
            if json {
                serde_json::to_writer_pretty(&mut out, &report)?;
                println!();
            } else {
                commands::write_position_report(&mut out, &report)?;
            }
        }
    }

    Ok(())
}
