//! UCI (Universal Chess Interface) move notation

use cozy_chess::{Board, File, Move, Piece, Rank, Square};

/// Convert UCI castling notation to cozy_chess notation
///
/// UCI uses standard notation (king moves 2 squares): e1g1, e1c1, e8g8, e8c8
/// cozy_chess uses king-to-rook notation: e1h1, e1a1, e8h8, e8a8
///
/// The converted move is only returned if it is in `legal_moves`.
pub fn convert_uci_castling_to_cozy(mv: Move, legal_moves: &[Move]) -> Move {
    let is_rank_1_or_8 = matches!(mv.from.rank(), Rank::First | Rank::Eighth);
    let is_e_file = matches!(mv.from.file(), File::E);
    let is_g_or_c_file = matches!(mv.to.file(), File::G | File::C);

    if is_rank_1_or_8 && is_e_file && is_g_or_c_file && mv.promotion.is_none() {
        let rook_file = match mv.to.file() {
            File::G => File::H,
            _ => File::A,
        };
        let converted = Move {
            from: mv.from,
            to: Square::new(rook_file, mv.from.rank()),
            promotion: None,
        };

        if legal_moves.contains(&converted) {
            return converted;
        }
    }

    // Not a castling move or conversion didn't work, return original
    mv
}

/// True if `mv` is a castling move in cozy_chess notation (king takes own rook).
pub fn is_castling(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King)
        && board.color_on(mv.to) == Some(board.side_to_move())
}

/// Format a move in standard UCI notation (e.g., "e2e4", "e7e8q", "e1g1").
///
/// `board` is the position before the move; it is needed to translate
/// castling out of cozy_chess's king-takes-rook form.
pub fn format_uci_move(board: &Board, mv: Move) -> String {
    let (from, to) = if is_castling(board, mv) {
        let king_file = if (mv.to.file() as u8) > (mv.from.file() as u8) {
            File::G
        } else {
            File::C
        };
        (mv.from, Square::new(king_file, mv.from.rank()))
    } else {
        (mv.from, mv.to)
    };

    let mut s = format!("{}{}", format_square(from), format_square(to));
    if let Some(promo) = mv.promotion {
        s.push(piece_char(promo).to_ascii_lowercase());
    }
    s
}

/// Parse a standard UCI move string against a position, returning the legal
/// cozy_chess move it denotes.
pub fn parse_uci_move(board: &Board, uci: &str) -> Option<Move> {
    let chars: Vec<char> = uci.chars().collect();
    if chars.len() != 4 && chars.len() != 5 {
        return None;
    }

    let from = Square::new(file_from_char(chars[0])?, rank_from_char(chars[1])?);
    let to = Square::new(file_from_char(chars[2])?, rank_from_char(chars[3])?);
    let promotion = match chars.get(4) {
        Some(&c) => Some(piece_from_char(c.to_ascii_uppercase())?),
        None => None,
    };

    let legal = crate::game::legal_moves(board);
    let mv = convert_uci_castling_to_cozy(Move { from, to, promotion }, &legal);
    legal.contains(&mv).then_some(mv)
}

pub(crate) fn format_square(sq: Square) -> String {
    format!("{}{}", file_char(sq.file()), rank_char(sq.rank()))
}

pub(crate) fn file_char(file: File) -> char {
    match file {
        File::A => 'a',
        File::B => 'b',
        File::C => 'c',
        File::D => 'd',
        File::E => 'e',
        File::F => 'f',
        File::G => 'g',
        File::H => 'h',
    }
}

pub(crate) fn rank_char(rank: Rank) -> char {
    match rank {
        Rank::First => '1',
        Rank::Second => '2',
        Rank::Third => '3',
        Rank::Fourth => '4',
        Rank::Fifth => '5',
        Rank::Sixth => '6',
        Rank::Seventh => '7',
        Rank::Eighth => '8',
    }
}

pub(crate) fn file_from_char(c: char) -> Option<File> {
    Some(match c {
        'a' => File::A,
        'b' => File::B,
        'c' => File::C,
        'd' => File::D,
        'e' => File::E,
        'f' => File::F,
        'g' => File::G,
        'h' => File::H,
        _ => return None,
    })
}

pub(crate) fn rank_from_char(c: char) -> Option<Rank> {
    Some(match c {
        '1' => Rank::First,
        '2' => Rank::Second,
        '3' => Rank::Third,
        '4' => Rank::Fourth,
        '5' => Rank::Fifth,
        '6' => Rank::Sixth,
        '7' => Rank::Seventh,
        '8' => Rank::Eighth,
        _ => return None,
    })
}

/// Uppercase SAN letter for a piece.
pub(crate) fn piece_char(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'P',
        Piece::Knight => 'N',
        Piece::Bishop => 'B',
        Piece::Rook => 'R',
        Piece::Queen => 'Q',
        Piece::King => 'K',
    }
}

/// Parse an uppercase SAN piece letter.
pub(crate) fn piece_from_char(c: char) -> Option<Piece> {
    Some(match c {
        'N' => Piece::Knight,
        'B' => Piece::Bishop,
        'R' => Piece::Rook,
        'Q' => Piece::Queen,
        'K' => Piece::King,
        _ => return None,
    })
}
