use cozy_chess::{Board, Color, GameStatus, Move, Piece, Square};

use crate::fen::{format_fen, parse_fen, START_FEN};
use crate::pgn::{find_tag, format_san, parse_pgn, parse_san, GameResult, PgnError, SanError};
use crate::uci::{format_uci_move, is_castling, parse_uci_move};

/// A game replayed from a start position, with per-move history.
#[derive(Debug, Clone)]
pub struct Game {
    position: Board,
    start_fen: String,
    history: Vec<HistoryEntry>,
    tags: Vec<(String, String)>,
    result: GameResult,
}

/// One played move with everything a viewer needs to render and step it.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// 1-based ply number
    pub ply: usize,
    pub mv: Move,
    pub from: Square,
    pub to: Square,
    pub piece: Piece,
    pub color: Color,
    pub captured: Option<Piece>,
    pub promotion: Option<Piece>,
    pub san: String,
    /// Standard UCI notation (castling as e1g1, not king-takes-rook)
    pub uci: String,
    pub fen_before: String,
    pub fen_after: String,
}

/// All legal moves in `board`, in cozy_chess notation.
pub(crate) fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|mvs| {
        moves.extend(mvs);
        false
    });
    moves
}

impl Game {
    /// Create a new game from the standard starting position
    pub fn new() -> Self {
        Self {
            position: Board::default(),
            start_fen: START_FEN.to_string(),
            history: Vec::new(),
            tags: Vec::new(),
            result: GameResult::Ongoing,
        }
    }

    /// Create a game from a FEN string
    pub fn from_fen(fen: &str) -> Result<Self, GameError> {
        let position = parse_fen(fen)?;
        Ok(Self {
            start_fen: format_fen(&position),
            position,
            history: Vec::new(),
            tags: Vec::new(),
            result: GameResult::Ongoing,
        })
    }

    /// Load a single PGN game, replaying every move.
    ///
    /// A `FEN` tag sets the start position. Any illegal or unparsable move
    /// fails the whole load with the ply at which it occurred.
    pub fn load_pgn(text: &str) -> Result<Self, GameError> {
        let pgn = parse_pgn(text)?;

        let mut game = match find_tag(&pgn.tags, "FEN") {
            Some(fen) => Self::from_fen(fen)?,
            None => Self::new(),
        };

        for (idx, pgn_move) in pgn.moves.iter().enumerate() {
            let mv = parse_san(&game.position, &pgn_move.san).map_err(|source| {
                PgnError::IllegalMove {
                    ply: idx + 1,
                    san: pgn_move.san.clone(),
                    source,
                }
            })?;
            game.push(mv);
        }

        game.tags = pgn.tags;
        game.result = pgn.result;
        Ok(game)
    }

    /// Get the current board position
    pub fn position(&self) -> &Board {
        &self.position
    }

    /// Get the move history
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// FEN of the current position.
    pub fn fen(&self) -> String {
        format_fen(&self.position)
    }

    /// FEN after `ply` moves; ply 0 is the start position.
    pub fn fen_at(&self, ply: usize) -> Option<&str> {
        match ply {
            0 => Some(&self.start_fen),
            n => self.history.get(n - 1).map(|entry| entry.fen_after.as_str()),
        }
    }

    pub fn start_fen(&self) -> &str {
        &self.start_fen
    }

    pub fn tags(&self) -> &[(String, String)] {
        &self.tags
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        find_tag(&self.tags, name)
    }

    /// Result declared by the PGN (or `Ongoing` for games built move by move).
    pub fn result(&self) -> GameResult {
        self.result
    }

    /// Make a move on the board
    pub fn make_move(&mut self, mv: Move) -> Result<&HistoryEntry, GameError> {
        if !legal_moves(&self.position).contains(&mv) {
            return Err(GameError::IllegalMove);
        }
        Ok(self.push(mv))
    }

    /// Make a move given in SAN, e.g. "Nf3" or "exd5".
    pub fn make_san_move(&mut self, san: &str) -> Result<&HistoryEntry, GameError> {
        let mv = parse_san(&self.position, san)?;
        Ok(self.push(mv))
    }

    /// Make a move given in UCI notation, e.g. "e2e4" or "e1g1".
    pub fn make_uci_move(&mut self, uci: &str) -> Result<&HistoryEntry, GameError> {
        let mv = parse_uci_move(&self.position, uci).ok_or(GameError::IllegalMove)?;
        Ok(self.push(mv))
    }

    /// Undo the last move
    pub fn undo(&mut self) -> Result<HistoryEntry, GameError> {
        let entry = self.history.pop().ok_or(GameError::NothingToUndo)?;
        self.position = parse_fen(&entry.fen_before)?;
        Ok(entry)
    }

    /// Get all legal moves for the current position
    pub fn legal_moves(&self) -> Vec<Move> {
        legal_moves(&self.position)
    }

    /// Get the current game status
    pub fn status(&self) -> GameStatus {
        self.position.status()
    }

    /// Get the side to move
    pub fn side_to_move(&self) -> Color {
        self.position.side_to_move()
    }

    /// Play a move already known to be legal and record it.
    fn push(&mut self, mv: Move) -> &HistoryEntry {
        let board = &self.position;
        let color = board.side_to_move();
        let piece = board.piece_on(mv.from).unwrap_or(Piece::Pawn);

        let captured = if is_castling(board, mv) {
            None
        } else if let Some(target) = board.piece_on(mv.to) {
            Some(target)
        } else if piece == Piece::Pawn && mv.from.file() != mv.to.file() {
            // En passant
            Some(Piece::Pawn)
        } else {
            None
        };

        let san = format_san(board, mv);
        let uci = format_uci_move(board, mv);
        let fen_before = format_fen(board);

        self.position.play_unchecked(mv);

        let entry = HistoryEntry {
            ply: self.history.len() + 1,
            mv,
            from: mv.from,
            to: mv.to,
            piece,
            color,
            captured,
            promotion: mv.promotion,
            san,
            uci,
            fen_before,
            fen_after: format_fen(&self.position),
        };
        self.history.push(entry);
        &self.history[self.history.len() - 1]
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert an engine move (UCI) to SAN for display, if it is legal in `fen`.
pub fn uci_to_san(fen: &str, uci: &str) -> Option<String> {
    let board = parse_fen(fen).ok()?;
    let mv = parse_uci_move(&board, uci)?;
    Some(format_san(&board, mv))
}

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Illegal move")]
    IllegalMove,
    #[error("Nothing to undo")]
    NothingToUndo,
    #[error("FEN parse error: {0}")]
    Fen(#[from] crate::fen::FenError),
    #[error("PGN error: {0}")]
    Pgn(#[from] PgnError),
    #[error("SAN error: {0}")]
    San(#[from] SanError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement(fen: &str) -> &str {
        fen.split_whitespace().next().unwrap()
    }

    #[test]
    fn test_load_pgn_history() {
        let game = Game::load_pgn("1. e4 e5 2. Nf3 Nc6 *").unwrap();
        let history = game.history();
        assert_eq!(history.len(), 4);

        let ucis: Vec<&str> = history.iter().map(|e| e.uci.as_str()).collect();
        assert_eq!(ucis, vec!["e2e4", "e7e5", "g1f3", "b8c6"]);
        assert_eq!(history[0].fen_before, START_FEN);
        assert_eq!(
            placement(&history[0].fen_after),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR"
        );
        assert_eq!(history[1].color, Color::Black);
        assert_eq!(history[1].fen_before, history[0].fen_after);
        assert_eq!(game.fen(), history[3].fen_after);
        assert_eq!(game.fen_at(0), Some(START_FEN));
        assert_eq!(game.fen_at(2), Some(history[1].fen_after.as_str()));
        assert_eq!(game.fen_at(5), None);
    }

    #[test]
    fn test_load_pgn_castling_and_captures() {
        let pgn = "1. e4 e5 2. Nf3 Nc6 3. Bc4 Bc5 4. O-O Nf6 5. d4 exd4 6. e5 d5 7. exd6 *";
        let game = Game::load_pgn(pgn).unwrap();
        let history = game.history();

        let castle = &history[6];
        assert_eq!(castle.san, "O-O");
        assert_eq!(castle.uci, "e1g1");
        assert_eq!(castle.captured, None);

        let capture = &history[9];
        assert_eq!(capture.san, "exd4");
        assert_eq!(capture.captured, Some(Piece::Pawn));

        let en_passant = &history[12];
        assert_eq!(en_passant.san, "exd6");
        assert_eq!(en_passant.captured, Some(Piece::Pawn));
    }

    #[test]
    fn test_load_pgn_with_fen_tag_and_promotion() {
        let pgn = "[SetUp \"1\"]\n[FEN \"8/4P3/8/8/8/8/8/K6k w - - 0 1\"]\n\n1. e8=Q *";
        let game = Game::load_pgn(pgn).unwrap();
        assert_eq!(game.start_fen(), "8/4P3/8/8/8/8/8/K6k w - - 0 1");
        assert_eq!(game.history()[0].uci, "e7e8q");
        assert_eq!(game.history()[0].promotion, Some(Piece::Queen));
    }

    #[test]
    fn test_load_pgn_reports_illegal_ply() {
        let err = Game::load_pgn("1. e4 e5 2. Ke3 *").unwrap_err();
        assert!(matches!(
            err,
            GameError::Pgn(PgnError::IllegalMove { ply: 3, .. })
        ));
    }

    #[test]
    fn test_undo_restores_position() {
        let mut game = Game::new();
        game.make_san_move("d4").unwrap();
        game.make_uci_move("g8f6").unwrap();
        assert_eq!(game.side_to_move(), Color::White);

        let undone = game.undo().unwrap();
        assert_eq!(undone.san, "Nf6");
        assert_eq!(game.history().len(), 1);
        assert_eq!(game.side_to_move(), Color::Black);

        game.undo().unwrap();
        assert_eq!(game.fen(), START_FEN);
        assert!(matches!(game.undo(), Err(GameError::NothingToUndo)));
    }

    #[test]
    fn test_make_move_rejects_illegal() {
        let mut game = Game::new();
        assert!(matches!(game.make_uci_move("e2e5"), Err(GameError::IllegalMove)));
        assert!(game.make_san_move("Qh5").is_err());
        assert!(game.history().is_empty());
    }

    #[test]
    fn test_uci_to_san() {
        let after_e4 = Game::load_pgn("1. e4").unwrap().fen();
        assert_eq!(uci_to_san(&after_e4, "e7e5").as_deref(), Some("e5"));
        assert_eq!(uci_to_san(&after_e4, "g8f6").as_deref(), Some("Nf6"));
        assert_eq!(uci_to_san(&after_e4, "e2e4"), None);
        assert_eq!(uci_to_san("not a fen", "e2e4"), None);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

            #[test]
            fn prop_history_fens_are_canonical(picks in prop::collection::vec(any::<usize>(), 0..40)) {
                let mut game = Game::new();
                for pick in picks {
                    let moves = game.legal_moves();
                    if moves.is_empty() {
                        break;
                    }
                    game.make_move(moves[pick % moves.len()]).unwrap();
                }

                for entry in game.history() {
                    let reparsed = parse_fen(&entry.fen_after).unwrap();
                    prop_assert_eq!(format_fen(&reparsed), entry.fen_after.clone());
                    let replayed = Game::from_fen(&entry.fen_before).unwrap();
                    prop_assert_eq!(replayed.fen(), entry.fen_before.clone());
                }

                // Undo walks back through exactly the recorded positions.
                while let Some(last) = game.history().last().cloned() {
                    prop_assert_eq!(game.fen(), last.fen_after.clone());
                    game.undo().unwrap();
                    prop_assert_eq!(game.fen(), last.fen_before);
                }
            }
        }
    }
}
