pub mod archive;
pub mod fen;
pub mod game;
pub mod pgn;
pub mod uci;

pub use archive::{split_games, summarize_archive, ArchiveError, GameSummary, GameType, Outcome};
pub use fen::{format_fen, parse_fen, FenError, START_FEN};
pub use game::{uci_to_san, Game, GameError, HistoryEntry};
pub use pgn::{format_san, parse_pgn, parse_san, GameResult, PgnError, PgnGame, SanError};
pub use uci::{convert_uci_castling_to_cozy, format_uci_move, parse_uci_move};
