//! Best-move indicator: did the player find the engine's move?

use chess::{uci_to_san, HistoryEntry};
use evaluator::{Evaluation, Score};
use serde::Serialize;
use std::fmt;

/// What the indicator shows for the current review position.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum MoveVerdict {
    /// An evaluation has been requested and not answered yet.
    Evaluating,
    /// The move played from this position is the engine's best move.
    Matches { score: Score },
    /// The engine preferred another move.
    Differs {
        best_move: String,
        best_san: Option<String>,
        score: Score,
    },
    /// Last position of the game; nothing was played from here.
    GameOver {
        best_move: Option<String>,
        score: Score,
    },
    /// The evaluation failed or was superseded.
    Unavailable,
}

impl MoveVerdict {
    /// Compare the move played from the evaluated position (`played`, if
    /// any) with the engine's recommendation for that same position.
    pub fn from_evaluation(evaluation: &Evaluation, played: Option<&HistoryEntry>) -> Self {
        let score = evaluation.score;
        let Some(played) = played else {
            return Self::GameOver {
                best_move: evaluation.best_move.clone(),
                score,
            };
        };

        if evaluation.recommends(&played.uci) {
            return Self::Matches { score };
        }

        match &evaluation.best_move {
            Some(best) => Self::Differs {
                best_san: uci_to_san(&played.fen_before, best),
                best_move: best.clone(),
                score,
            },
            None => Self::Unavailable,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matches { .. })
    }

    /// Engine score, if an evaluation arrived.
    pub fn score(&self) -> Option<Score> {
        match self {
            Self::Matches { score } | Self::Differs { score, .. } | Self::GameOver { score, .. } => {
                Some(*score)
            }
            Self::Evaluating | Self::Unavailable => None,
        }
    }
}

impl fmt::Display for MoveVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evaluating => write!(f, "evaluating..."),
            Self::Matches { score } => write!(f, "✓ best move ({})", score),
            Self::Differs {
                best_move,
                best_san,
                score,
            } => write!(
                f,
                "✗ best was {} ({})",
                best_san.as_deref().unwrap_or(best_move),
                score
            ),
            Self::GameOver {
                best_move: Some(best),
                score,
            } => write!(f, "game over, engine line {} ({})", best, score),
            Self::GameOver {
                best_move: None,
                score,
            } => write!(f, "game over ({})", score),
            Self::Unavailable => write!(f, "no evaluation available"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::Game;

    fn after_e4() -> Game {
        Game::load_pgn("1. e4 e5 2. Nf3 Nc6").unwrap()
    }

    fn eval(best: Option<&str>, cp: i32) -> Evaluation {
        Evaluation {
            best_move: best.map(str::to_string),
            score: Score::Centipawns(cp),
        }
    }

    #[test]
    fn test_matches_played_move() {
        let game = after_e4();
        let played = &game.history()[1];
        let verdict = MoveVerdict::from_evaluation(&eval(Some("e7e5"), 20), Some(played));
        assert_eq!(
            verdict,
            MoveVerdict::Matches {
                score: Score::Centipawns(20)
            }
        );
        assert!(verdict.is_match());
        assert_eq!(verdict.to_string(), "✓ best move (+0.20)");
    }

    #[test]
    fn test_differs_shows_san() {
        let game = after_e4();
        let played = &game.history()[1];
        let verdict = MoveVerdict::from_evaluation(&eval(Some("c7c5"), 35), Some(played));
        assert_eq!(
            verdict,
            MoveVerdict::Differs {
                best_move: "c7c5".into(),
                best_san: Some("c5".into()),
                score: Score::Centipawns(35),
            }
        );
        assert_eq!(verdict.to_string(), "✗ best was c5 (+0.35)");
    }

    #[test]
    fn test_end_of_game_and_unavailable() {
        let verdict = MoveVerdict::from_evaluation(&eval(Some("g1f3"), -10), None);
        assert_eq!(verdict.score(), Some(Score::Centipawns(-10)));
        assert!(!verdict.is_match());

        let game = after_e4();
        let no_move = MoveVerdict::from_evaluation(&eval(None, 0), Some(&game.history()[0]));
        assert_eq!(no_move, MoveVerdict::Unavailable);
        assert_eq!(no_move.to_string(), "no evaluation available");
        assert_eq!(MoveVerdict::Evaluating.score(), None);
    }

    #[test]
    fn test_serializes_with_tag() {
        let json = serde_json::to_value(MoveVerdict::Matches {
            score: Score::Centipawns(20),
        })
        .unwrap();
        assert_eq!(json["verdict"], "matches");
        assert_eq!(json["score"]["type"], "cp");
        assert_eq!(json["score"]["value"], 20);
    }
}
