//! PGN (Portable Game Notation) parsing

mod parser;
mod san;

pub use parser::{parse_pgn, parse_tags, GameResult, PgnError, PgnGame, PgnMove};
pub use san::{format_san, parse_san, SanError};

pub(crate) use parser::find_tag;
