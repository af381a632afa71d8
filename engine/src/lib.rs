//! UCI engine plumbing for chessview.
//!
//! [`EngineProcess`] owns one engine worker (normally a Stockfish child
//! process) and turns its output into [`EngineEvent`]s for a single
//! subscriber. Workers are produced by a [`WorkerSpawner`], which keeps the
//! process details out of the code that drives the engine.

pub mod process;
pub mod stockfish;
pub mod uci;

pub use process::{EngineOptions, EngineProcess, EventSink, Worker, WorkerHandle, WorkerSpawner};
pub use stockfish::{find_stockfish_path, StockfishSpawner};
pub use uci::{parse_uci_message, UciError, UciMessage};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Commands sent to the engine, one protocol line each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    Uci,
    IsReady,
    SetOption { name: String, value: Option<String> },
    SetPosition { fen: String },
    /// `go depth N`; searches are always bounded by depth.
    Go { depth: u8 },
    Stop,
    Quit,
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uci => write!(f, "uci"),
            Self::IsReady => write!(f, "isready"),
            Self::SetOption { name, value } => match value {
                Some(value) => write!(f, "setoption name {} value {}", name, value),
                None => write!(f, "setoption name {}", name),
            },
            Self::SetPosition { fen } => write!(f, "position fen {}", fen),
            Self::Go { depth } => write!(f, "go depth {}", depth),
            Self::Stop => write!(f, "stop"),
            Self::Quit => write!(f, "quit"),
        }
    }
}

/// Event delivered to the subscriber of an [`EngineProcess`].
///
/// `generation` identifies the worker that produced the event; it increases
/// with every (re)start, so output of a terminated worker can be told apart
/// from output of its replacement.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineEvent {
    pub generation: u64,
    pub kind: EngineEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEventKind {
    Message(UciMessage),
    Failed(String),
}

/// Engine analysis information
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineInfo {
    pub depth: Option<u8>,
    pub seldepth: Option<u8>,
    pub time_ms: Option<u64>,
    pub nodes: Option<u64>,
    pub score: Option<Score>,
    pub pv: Vec<String>, // Principal variation, UCI notation
    pub multipv: Option<u8>,
    pub hashfull: Option<u16>,
    pub nps: Option<u64>,
}

/// Engine evaluation score.
///
/// Centipawns: positive = side-to-move is better.
/// Mate: positive N = side-to-move mates in N moves,
/// zero or negative N = side-to-move gets mated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Score {
    #[serde(rename = "cp")]
    Centipawns(i32),
    Mate(i32),
}

impl Score {
    /// Score in pawns. Forced mates map to positive or negative infinity.
    pub fn pawns(&self) -> f64 {
        match self {
            Self::Centipawns(cp) => f64::from(*cp) / 100.0,
            Self::Mate(m) if *m > 0 => f64::INFINITY,
            Self::Mate(_) => f64::NEG_INFINITY,
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Centipawns(cp) => write!(f, "{:+.2}", f64::from(*cp) / 100.0),
            Self::Mate(m) if *m > 0 => write!(f, "+M{}", m),
            Self::Mate(m) => write!(f, "-M{}", m.abs()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Stockfish not found")]
    NotFound,
    #[error("Engine startup failed: {0}")]
    Startup(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
