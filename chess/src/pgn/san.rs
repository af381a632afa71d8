use cozy_chess::{Board, GameStatus, Move, Piece};

use crate::game::legal_moves;
use crate::uci::{
    file_char, file_from_char, format_square, is_castling, piece_char, piece_from_char,
    rank_char, rank_from_char,
};

/// Parse Standard Algebraic Notation (SAN) move
pub fn parse_san(board: &Board, san: &str) -> Result<Move, SanError> {
    let cleaned = san.trim_end_matches(|c| matches!(c, '+' | '#' | '!' | '?'));
    if cleaned.is_empty() {
        return Err(SanError::InvalidFormat(san.to_string()));
    }

    let legal = legal_moves(board);

    if let Some(kingside) = castling_side(cleaned) {
        return legal
            .into_iter()
            .find(|&mv| {
                is_castling(board, mv) && ((mv.to.file() as u8) > (mv.from.file() as u8)) == kingside
            })
            .ok_or_else(|| SanError::NoLegalMove(san.to_string()));
    }

    let mut chars: Vec<char> = cleaned.chars().collect();

    // Promotion: "e8=Q", also the older "e8Q"
    let mut promotion = None;
    if let Some(pos) = chars.iter().position(|&c| c == '=') {
        let letter = chars
            .get(pos + 1)
            .copied()
            .ok_or_else(|| SanError::InvalidPromotion(san.to_string()))?;
        promotion = Some(promotion_piece(letter, san)?);
        chars.truncate(pos);
    } else if chars.len() > 2
        && chars[chars.len() - 2].is_ascii_digit()
        && piece_from_char(chars[chars.len() - 1]).is_some()
    {
        let letter = chars.pop().unwrap_or_default();
        promotion = Some(promotion_piece(letter, san)?);
    }

    let (piece, rest) = match chars.first().copied().and_then(piece_from_char) {
        Some(piece) => (piece, &chars[1..]),
        None => (Piece::Pawn, &chars[..]),
    };
    if rest.len() < 2 {
        return Err(SanError::InvalidFormat(san.to_string()));
    }

    let (qualifier, dest) = rest.split_at(rest.len() - 2);
    let to_file = file_from_char(dest[0]).ok_or(SanError::InvalidFile(dest[0]))?;
    let to_rank = rank_from_char(dest[1]).ok_or(SanError::InvalidRank(dest[1]))?;
    let to = cozy_chess::Square::new(to_file, to_rank);

    let mut from_file = None;
    let mut from_rank = None;
    for &c in qualifier.iter().filter(|&&c| c != 'x' && c != ':') {
        if let Some(file) = file_from_char(c) {
            from_file = Some(file);
        } else if let Some(rank) = rank_from_char(c) {
            from_rank = Some(rank);
        } else {
            return Err(SanError::InvalidFormat(san.to_string()));
        }
    }

    let candidates: Vec<Move> = legal
        .into_iter()
        .filter(|&mv| {
            mv.to == to
                && mv.promotion == promotion
                && board.piece_on(mv.from) == Some(piece)
                && !is_castling(board, mv)
                && from_file.map_or(true, |f| mv.from.file() == f)
                && from_rank.map_or(true, |r| mv.from.rank() == r)
        })
        .collect();

    match candidates.as_slice() {
        [mv] => Ok(*mv),
        [] => Err(SanError::NoLegalMove(san.to_string())),
        _ => Err(SanError::AmbiguousMove(san.to_string())),
    }
}

fn castling_side(san: &str) -> Option<bool> {
    match san {
        "O-O" | "0-0" => Some(true),
        "O-O-O" | "0-0-0" => Some(false),
        _ => None,
    }
}

fn promotion_piece(letter: char, san: &str) -> Result<Piece, SanError> {
    match piece_from_char(letter.to_ascii_uppercase()) {
        Some(Piece::King) | None => Err(SanError::InvalidPromotion(san.to_string())),
        Some(piece) => Ok(piece),
    }
}

/// Format a legal move as SAN, including check and mate suffixes.
pub fn format_san(board: &Board, mv: Move) -> String {
    let mut san = String::new();

    if is_castling(board, mv) {
        let kingside = (mv.to.file() as u8) > (mv.from.file() as u8);
        san.push_str(if kingside { "O-O" } else { "O-O-O" });
    } else {
        let piece = board.piece_on(mv.from).unwrap_or(Piece::Pawn);
        let is_capture = board.piece_on(mv.to).is_some()
            || (piece == Piece::Pawn && mv.from.file() != mv.to.file());

        if piece == Piece::Pawn {
            // Pawn captures include the file
            if is_capture {
                san.push(file_char(mv.from.file()));
            }
        } else {
            san.push(piece_char(piece));
            san.push_str(&disambiguation(board, mv, piece));
        }

        if is_capture {
            san.push('x');
        }
        san.push_str(&format_square(mv.to));

        if let Some(promo) = mv.promotion {
            san.push('=');
            san.push(piece_char(promo));
        }
    }

    let mut after = board.clone();
    after.play_unchecked(mv);
    if !after.checkers().is_empty() {
        san.push(if matches!(after.status(), GameStatus::Won) { '#' } else { '+' });
    }

    san
}

fn disambiguation(board: &Board, mv: Move, piece: Piece) -> String {
    let rivals: Vec<Move> = legal_moves(board)
        .into_iter()
        .filter(|&other| {
            other.to == mv.to
                && other.from != mv.from
                && board.piece_on(other.from) == Some(piece)
                && !is_castling(board, other)
        })
        .collect();

    if rivals.is_empty() {
        String::new()
    } else if rivals.iter().all(|r| r.from.file() != mv.from.file()) {
        file_char(mv.from.file()).to_string()
    } else if rivals.iter().all(|r| r.from.rank() != mv.from.rank()) {
        rank_char(mv.from.rank()).to_string()
    } else {
        format_square(mv.from)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SanError {
    #[error("No legal move found for: {0}")]
    NoLegalMove(String),
    #[error("Ambiguous move: {0}")]
    AmbiguousMove(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Invalid file: {0}")]
    InvalidFile(char),
    #[error("Invalid rank: {0}")]
    InvalidRank(char),
    #[error("Invalid promotion: {0}")]
    InvalidPromotion(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uci::format_uci_move;

    fn board(fen: &str) -> Board {
        fen.parse().unwrap()
    }

    fn san_to_uci(fen: &str, san: &str) -> String {
        let b = board(fen);
        format_uci_move(&b, parse_san(&b, san).unwrap())
    }

    #[test]
    fn test_pawn_and_piece_moves() {
        let start = crate::fen::START_FEN;
        assert_eq!(san_to_uci(start, "e4"), "e2e4");
        assert_eq!(san_to_uci(start, "Nf3"), "g1f3");
        assert_eq!(san_to_uci(start, "Nc3!?"), "b1c3");
        assert!(matches!(
            parse_san(&board(start), "e5"),
            Err(SanError::NoLegalMove(_))
        ));
    }

    #[test]
    fn test_castling() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        assert_eq!(san_to_uci(fen, "O-O"), "e1g1");
        assert_eq!(san_to_uci(fen, "O-O-O"), "e1c1");
        assert_eq!(san_to_uci(fen, "0-0"), "e1g1");
    }

    #[test]
    fn test_promotion() {
        let fen = "8/4P3/8/8/8/8/8/K6k w - - 0 1";
        assert_eq!(san_to_uci(fen, "e8=Q"), "e7e8q");
        assert_eq!(san_to_uci(fen, "e8N"), "e7e8n");
        assert!(matches!(
            parse_san(&board(fen), "e8=K"),
            Err(SanError::InvalidPromotion(_))
        ));
    }

    #[test]
    fn test_disambiguation() {
        // Rooks on a1 and h1 can both reach d1.
        let fen = "2k5/8/8/8/8/8/4K3/R6R w - - 0 1";
        assert!(matches!(
            parse_san(&board(fen), "Rd1"),
            Err(SanError::AmbiguousMove(_))
        ));
        assert_eq!(san_to_uci(fen, "Rad1"), "a1d1");
        assert_eq!(san_to_uci(fen, "Rhd1"), "h1d1");

        let b = board(fen);
        let mv = parse_san(&b, "Rad1").unwrap();
        assert_eq!(format_san(&b, mv), "Rad1");
    }

    #[test]
    fn test_en_passant_capture() {
        let fen = "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3";
        let b = board(fen);
        let mv = parse_san(&b, "exf6").unwrap();
        assert_eq!(format_uci_move(&b, mv), "e5f6");
        assert_eq!(format_san(&b, mv), "exf6");
    }

    #[test]
    fn test_format_check_and_mate() {
        // Fool's mate: 1. f3 e5 2. g4 Qh4#
        let b = board("rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2");
        let mv = parse_san(&b, "Qh4#").unwrap();
        assert_eq!(format_san(&b, mv), "Qh4#");

        let b = board("4k3/8/8/8/8/8/8/R3K3 w - - 0 1");
        let mv = parse_san(&b, "Ra8").unwrap();
        assert_eq!(format_san(&b, mv), "Ra8+");
    }

    #[test]
    fn test_garbage() {
        let b = Board::default();
        assert!(parse_san(&b, "").is_err());
        assert!(parse_san(&b, "+").is_err());
        assert!(matches!(parse_san(&b, "Nz3"), Err(SanError::InvalidFile('z'))));
        assert!(parse_san(&b, "N").is_err());
    }
}
