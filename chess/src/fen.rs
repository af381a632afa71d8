use cozy_chess::Board;

/// FEN of the standard starting position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Parse a FEN string into a Board
pub fn parse_fen(fen: &str) -> Result<Board, FenError> {
    let parts: Vec<&str> = fen.split_whitespace().collect();
    if parts.is_empty() {
        return Err(FenError::InvalidFormat);
    }
    if parts[0].split('/').count() != 8 {
        return Err(FenError::InvalidBoardLayout);
    }

    parts.join(" ").parse().map_err(|_| FenError::InvalidFormat)
}

/// Format a Board as a FEN string.
///
/// cozy-chess always writes the six fields in the same order with single
/// spaces, so equal positions produce equal strings.
pub fn format_fen(board: &Board) -> String {
    board.to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum FenError {
    #[error("Invalid FEN format")]
    InvalidFormat,
    #[error("Invalid board layout")]
    InvalidBoardLayout,
}
