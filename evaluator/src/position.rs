use std::fmt;
use std::str::FromStr;

use crate::EvaluationError;

/// Canonical FEN used as the identity of a position.
///
/// Fields are joined by a single space and missing move counters are filled
/// in (`0 1`), so two keys for the same board state compare equal as strings.
/// A key never contains a newline, which keeps it safe to splice into a
/// `position fen` command.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionKey(String);

impl PositionKey {
    pub fn new(fen: &str) -> Result<Self, EvaluationError> {
        let invalid = |reason: &str| EvaluationError::InvalidPosition(format!("{}: {:?}", reason, fen));

        let mut fields: Vec<&str> = fen.split_whitespace().collect();
        if !(4..=6).contains(&fields.len()) {
            return Err(invalid("expected 4 to 6 fields"));
        }

        if !is_valid_placement(fields[0]) {
            return Err(invalid("bad piece placement"));
        }
        if !matches!(fields[1], "w" | "b") {
            return Err(invalid("side to move must be w or b"));
        }
        if !is_valid_castling(fields[2]) {
            return Err(invalid("bad castling rights"));
        }
        if !is_valid_en_passant(fields[3]) {
            return Err(invalid("bad en passant square"));
        }
        if fields[4..].iter().any(|n| n.parse::<u32>().is_err()) {
            return Err(invalid("move counters must be numbers"));
        }

        if fields.len() < 5 {
            fields.push("0");
        }
        if fields.len() < 6 {
            fields.push("1");
        }

        Ok(Self(fields.join(" ")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Eight ranks of eight squares, no two digits in a row, and exactly one
/// king per side.
fn is_valid_placement(placement: &str) -> bool {
    let ranks: Vec<&str> = placement.split('/').collect();
    let ranks_ok = ranks.len() == 8
        && ranks.iter().all(|rank| {
            let mut squares = 0u32;
            let mut after_digit = false;
            for c in rank.chars() {
                match c {
                    '1'..='8' if !after_digit => {
                        squares += c.to_digit(10).unwrap_or(0);
                        after_digit = true;
                    }
                    'p' | 'n' | 'b' | 'r' | 'q' | 'k' | 'P' | 'N' | 'B' | 'R' | 'Q' | 'K' => {
                        squares += 1;
                        after_digit = false;
                    }
                    _ => return false,
                }
            }
            squares == 8
        });

    let kings = |king: char| placement.chars().filter(|c| *c == king).count();
    ranks_ok && kings('K') == 1 && kings('k') == 1
}

fn is_valid_castling(castling: &str) -> bool {
    // Shredder-FEN file letters are accepted alongside KQkq.
    castling == "-"
        || (!castling.is_empty()
            && castling
                .chars()
                .all(|c| matches!(c, 'K' | 'Q' | 'k' | 'q' | 'A'..='H' | 'a'..='h')))
}

fn is_valid_en_passant(square: &str) -> bool {
    let mut chars = square.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some('-'), None, None) => true,
        (Some(file), Some(rank), None) => {
            matches!(file, 'a'..='h') && matches!(rank, '3' | '6')
        }
        _ => false,
    }
}

impl FromStr for PositionKey {
    type Err = EvaluationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PositionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn test_normalizes_whitespace() {
        let key = PositionKey::new("  rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR\tw  KQkq - 0 1\n").unwrap();
        assert_eq!(key.as_str(), START);
        assert_eq!(key, START.parse().unwrap());
    }

    #[test]
    fn test_fills_missing_counters() {
        let key = PositionKey::new("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -").unwrap();
        assert_eq!(key.as_str(), START);
    }

    #[test]
    fn test_rejects_malformed() {
        for fen in [
            "",
            "startpos",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1",
            "rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/ppppxppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e4 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - zero 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1 extra",
            "rnbqkbnr/pppppppp/44/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQ1BNR w kq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBKKBNR w kq - 0 1",
            "8/8/8/8/8/8/8/8 w - - 0 1",
        ] {
            assert!(
                matches!(PositionKey::new(fen), Err(EvaluationError::InvalidPosition(_))),
                "accepted {:?}",
                fen
            );
        }
    }

    proptest! {
        #[test]
        fn prop_key_is_whitespace_insensitive(
            seps in prop::collection::vec("[ \t]{1,3}", 5),
            lead in "[ \t\n]{0,2}",
            trail in "[ \t\n]{0,2}",
        ) {
            let fields = ["r3k2r/8/8/8/4P3/8/8/R3K2R", "b", "KQkq", "e3", "0", "1"];
            let mut fen = lead.clone();
            for (i, field) in fields.iter().enumerate() {
                fen.push_str(field);
                if let Some(sep) = seps.get(i) {
                    fen.push_str(sep);
                }
            }
            fen.push_str(&trail);

            let key = PositionKey::new(&fen).unwrap();
            prop_assert_eq!(key.as_str(), "r3k2r/8/8/8/4P3/8/8/R3K2R b KQkq e3 0 1");
            prop_assert!(!key.as_str().contains('\n'));
        }
    }
}
