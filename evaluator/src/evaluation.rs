use engine::Score;
use serde::{Deserialize, Serialize};

/// Engine verdict for one position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Best move in UCI notation (e.g. "e2e4", "e7e8q"); `None` when the
    /// engine has no move to offer (checkmate or stalemate).
    pub best_move: Option<String>,
    /// From the side to move's point of view.
    pub score: Score,
}

impl Evaluation {
    /// True if `uci` is the engine's recommended move.
    pub fn recommends(&self, uci: &str) -> bool {
        self.best_move
            .as_deref()
            .is_some_and(|best| best.eq_ignore_ascii_case(uci))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommends() {
        let eval = Evaluation {
            best_move: Some("e7e5".into()),
            score: Score::Centipawns(20),
        };
        assert!(eval.recommends("e7e5"));
        assert!(!eval.recommends("c7c5"));

        let mated = Evaluation {
            best_move: None,
            score: Score::Mate(0),
        };
        assert!(!mated.recommends("e7e5"));
    }

    #[test]
    fn test_serializes_for_json_output() {
        let eval = Evaluation {
            best_move: Some("g1f3".into()),
            score: Score::Mate(3),
        };
        let json = serde_json::to_value(&eval).unwrap();
        assert_eq!(json["best_move"], "g1f3");
        assert_eq!(json["score"]["type"], "mate");
        assert_eq!(json["score"]["value"], 3);
    }
}
