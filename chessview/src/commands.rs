//! Subcommand implementations, kept apart from argument parsing so they can
//! be driven with any writer and any coordinator.

use chess::{summarize_archive, Game, GameError, GameSummary, GameType};
use evaluator::{Evaluation, EvaluationCoordinator, EvaluationError};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::board::render_fen;
use crate::indicator::MoveVerdict;
use crate::review::{move_label, NavCommand, ReviewSession};

/// Error type for CLI operations.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// The PGN file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested game number is outside the archive.
    #[error("game {index} not found ({count} games in file)")]
    GameNotFound { index: usize, count: usize },

    /// The selected game's movetext could not be replayed.
    #[error("failed to load game: {0}")]
    Game(#[from] GameError),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn read_pgn_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Archived games, numbered newest first. Numbers are assigned before
/// filtering so they can be passed to `review --game`.
pub fn list_games(
    text: &str,
    player: Option<&str>,
    game_type: Option<GameType>,
) -> Vec<(usize, GameSummary)> {
    summarize_archive(text)
        .into_iter()
        .enumerate()
        .map(|(idx, summary)| (idx + 1, summary))
        .filter(|(_, summary)| player.map_or(true, |p| summary.outcome_for(p).is_some()))
        .filter(|(_, summary)| game_type.map_or(true, |t| summary.game_type == t))
        .collect()
}

pub fn write_games(
    out: &mut impl Write,
    games: &[(usize, GameSummary)],
    player: Option<&str>,
) -> Result<(), CliError> {
    if games.is_empty() {
        writeln!(out, "No games found")?;
        return Ok(());
    }

    for (number, game) in games {
        write!(
            out,
            "{:>3}  {}  {} vs {}  {}  {}",
            number, game.date, game.white, game.black, game.result, game.game_type
        )?;
        if let Some(outcome) = player.and_then(|p| game.outcome_for(p)) {
            write!(out, "  {:?}", outcome)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Load game number `index` (1-based, newest first) from an archive. Text
/// without the summary tags is treated as a single game.
pub fn load_game(text: &str, index: usize) -> Result<Game, CliError> {
    let games = summarize_archive(text);
    if games.is_empty() && index == 1 {
        return Ok(Game::load_pgn(text)?);
    }
    let summary = index
        .checked_sub(1)
        .and_then(|idx| games.get(idx))
        .ok_or(CliError::GameNotFound {
            index,
            count: games.len(),
        })?;
    Ok(Game::load_pgn(&summary.pgn)?)
}

/// One reviewed position.
#[derive(Debug, Clone, Serialize)]
pub struct PlyReport {
    pub ply: usize,
    pub fen: String,
    /// Move played from this position, e.g. "1... e5".
    pub played: Option<String>,
    pub played_uci: Option<String>,
    #[serde(flatten)]
    pub verdict: MoveVerdict,
}

/// Step through the whole game from the start, evaluating each position in
/// turn the way a user stepping forward would.
pub async fn review_game(
    session: &mut ReviewSession,
    coordinator: &EvaluationCoordinator,
) -> Vec<PlyReport> {
    session.go_to_start();
    let mut reports = Vec::with_capacity(session.total_plies() + 1);
    loop {
        let verdict = session.evaluate(coordinator).await.clone();
        reports.push(PlyReport {
            ply: session.current_ply(),
            fen: session.fen().to_string(),
            played: session.next_move_label(),
            played_uci: session.next_move().map(|entry| entry.uci.clone()),
            verdict,
        });
        if !session.next_ply() {
            break;
        }
    }
    reports
}

pub fn write_review(out: &mut impl Write, reports: &[PlyReport]) -> Result<(), CliError> {
    for report in reports {
        match &report.played {
            Some(label) => writeln!(out, "{:<12} {}", label, report.verdict)?,
            None => writeln!(out, "{:<12} {}", "(end)", report.verdict)?,
        }
    }
    let found = reports.iter().filter(|r| r.verdict.is_match()).count();
    let played = reports.iter().filter(|r| r.played.is_some()).count();
    writeln!(out, "Best moves found: {}/{}", found, played)?;
    Ok(())
}

pub fn write_review_json(out: &mut impl Write, reports: &[PlyReport]) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut *out, reports)?;
    writeln!(out)?;
    Ok(())
}

fn write_position(out: &mut impl Write, session: &ReviewSession) -> Result<(), CliError> {
    writeln!(
        out,
        "Ply {}/{}",
        session.current_ply(),
        session.total_plies()
    )?;
    if let Some(last) = session.last_move() {
        writeln!(out, "Last move: {}", move_label(last))?;
    }
    match render_fen(session.fen(), session.is_flipped()) {
        Ok(board) => write!(out, "{}", board)?,
        Err(e) => writeln!(out, "{}", e)?,
    }
    Ok(())
}

/// "Played: 1. e4  ✓ best move (+0.30)", or just the verdict at the end of
/// the game.
fn write_status(
    out: &mut impl Write,
    session: &ReviewSession,
    verdict: &MoveVerdict,
) -> Result<(), CliError> {
    match session.next_move_label() {
        Some(label) => writeln!(out, "Played: {}  {}", label, verdict)?,
        None => writeln!(out, "{}", verdict)?,
    }
    Ok(())
}

fn write_prompt(out: &mut impl Write) -> Result<(), CliError> {
    write!(out, "[n]ext [p]rev [s]tart [e]nd [g N] [f]lip [q]uit > ")?;
    out.flush()?;
    Ok(())
}

enum Step {
    Evaluated(MoveVerdict),
    Input(Option<String>),
}

/// Interactive review: read navigation commands line by line until `q` or
/// end of input.
///
/// The position on screen is evaluated while waiting for the next command.
/// A command that arrives first abandons that evaluation, so stepping
/// quickly only ever waits for the position the user stops at.
pub async fn run_interactive<R>(
    session: &mut ReviewSession,
    coordinator: &EvaluationCoordinator,
    input: R,
    out: &mut impl Write,
) -> Result<(), CliError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut redraw = true;

    loop {
        if redraw {
            write_position(out, session)?;
            if let Some(verdict) = session.verdict().filter(|_| !session.needs_evaluation()) {
                write_status(out, session, verdict)?;
            }
        }

        let line = if session.needs_evaluation() {
            write_status(out, session, &MoveVerdict::Evaluating)?;
            write_prompt(out)?;
            let step = tokio::select! {
                verdict = session.evaluate(coordinator) => Step::Evaluated(verdict.clone()),
                line = lines.next_line() => Step::Input(line?),
            };
            match step {
                Step::Evaluated(verdict) => {
                    writeln!(out)?;
                    write_status(out, session, &verdict)?;
                    write_prompt(out)?;
                    lines.next_line().await?
                }
                Step::Input(line) => line,
            }
        } else {
            write_prompt(out)?;
            lines.next_line().await?
        };

        let Some(line) = line else {
            break;
        };
        redraw = match NavCommand::parse(&line) {
            Some(NavCommand::Quit) => break,
            Some(NavCommand::Flip) => {
                session.flip();
                true
            }
            Some(cmd) => session.apply(cmd),
            None => {
                writeln!(out, "Unknown command: {}", line.trim())?;
                false
            }
        };
    }
    writeln!(out)?;
    Ok(())
}

/// Evaluation of a single position, for `chessview eval`.
#[derive(Debug, Clone, Serialize)]
pub struct PositionReport {
    pub fen: String,
    pub best_move: Option<String>,
    pub best_san: Option<String>,
    pub score: evaluator::Score,
    /// Score in pawns for the side to move; `null` in JSON for forced mates.
    pub pawns: Option<f64>,
}

impl PositionReport {
    pub fn new(fen: &str, evaluation: &Evaluation) -> Self {
        Self {
            fen: fen.to_string(),
            best_san: evaluation
                .best_move
                .as_deref()
                .and_then(|best| chess::uci_to_san(fen, best)),
            best_move: evaluation.best_move.clone(),
            score: evaluation.score,
            pawns: Some(evaluation.score.pawns()).filter(|p| p.is_finite()),
        }
    }
}

pub async fn eval_position(
    coordinator: &EvaluationCoordinator,
    fen: &str,
) -> Result<PositionReport, EvaluationError> {
    let evaluation = coordinator.evaluate(fen).await?;
    Ok(PositionReport::new(fen, &evaluation))
}

pub fn write_position_report(
    out: &mut impl Write,
    report: &PositionReport,
) -> Result<(), CliError> {
    match (&report.best_move, &report.best_san) {
        (Some(uci), Some(san)) => writeln!(out, "Best move: {} ({})", san, uci)?,
        (Some(uci), None) => writeln!(out, "Best move: {}", uci)?,
        (None, _) => writeln!(out, "Best move: none")?,
    }
    writeln!(out, "Score: {}", report.score)?;
    Ok(())
}
