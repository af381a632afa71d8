//! Plain-text board diagram for the terminal.

use cozy_chess::{Board, Color, File, Piece, Rank, Square};

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("Invalid FEN string: {0}")]
    InvalidFen(String),
}

fn piece_char(piece: Piece, color: Color) -> char {
    let c = match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    };
    match color {
        Color::White => c.to_ascii_uppercase(),
        Color::Black => c,
    }
}

fn rank_char(rank: Rank) -> char {
    char::from(b'1' + rank as u8)
}

fn file_char(file: File) -> char {
    char::from(b'a' + file as u8)
}

/// Render the position as eight rank lines plus a file legend. With
/// `flipped` the board is seen from Black's side.
pub fn render_fen(fen: &str, flipped: bool) -> Result<String, BoardError> {
    let board: Board = fen
        .parse()
        .map_err(|_| BoardError::InvalidFen(fen.to_string()))?;
    Ok(render(&board, flipped))
}

pub fn render(board: &Board, flipped: bool) -> String {
    let mut ranks: Vec<Rank> = Rank::ALL.iter().rev().copied().collect();
    let mut files: Vec<File> = File::ALL.to_vec();
    if flipped {
        ranks.reverse();
        files.reverse();
    }

    let mut out = String::new();
    for rank in &ranks {
        out.push(rank_char(*rank));
        for file in &files {
            let square = Square::new(*file, *rank);
            let c = match (board.piece_on(square), board.color_on(square)) {
                (Some(piece), Some(color)) => piece_char(piece, color),
                _ => '.',
            };
            out.push(' ');
            out.push(c);
        }
        out.push('\n');
    }
    out.push(' ');
    for file in &files {
        out.push(' ');
        out.push(file_char(*file));
    }
    out.push('\n');
    out
}
