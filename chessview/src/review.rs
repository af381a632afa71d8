use chess::{Game, HistoryEntry};
use evaluator::EvaluationCoordinator;

use crate::indicator::MoveVerdict;

/// Navigation state for stepping through a loaded game.
///
/// Ply 0 is the starting position; ply `n` is the position after `n` moves.
/// Evaluations are requested for the position on screen and judged against
/// the move that was played *from* it.
pub struct ReviewSession {
    game: Game,
    current_ply: usize,
    /// Verdict for the current ply; `None` until evaluated.
    verdict: Option<MoveVerdict>,
    /// Board seen from Black's side.
    flipped: bool,
}

/// A navigation step typed at the review prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavCommand {
    Next,
    Prev,
    Start,
    End,
    GoTo(usize),
    Flip,
    Quit,
}

impl NavCommand {
    /// Parse a prompt line. An empty line steps forward.
    pub fn parse(input: &str) -> Option<Self> {
        let mut words = input.split_whitespace();
        let cmd = match words.next() {
            None => return Some(Self::Next),
            Some(word) => word.to_ascii_lowercase(),
        };
        let parsed = match cmd.as_str() {
            "n" | "next" => Self::Next,
            "p" | "prev" => Self::Prev,
            "s" | "start" => Self::Start,
            "e" | "end" => Self::End,
            "f" | "flip" => Self::Flip,
            "q" | "quit" => Self::Quit,
            "g" | "go" => Self::GoTo(words.next()?.parse().ok()?),
            _ => return None,
        };
        if words.next().is_some() {
            return None;
        }
        Some(parsed)
    }
}

impl ReviewSession {
    pub fn new(game: Game) -> Self {
        Self {
            game,
            current_ply: 0,
            verdict: None,
            flipped: false,
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn current_ply(&self) -> usize {
        self.current_ply
    }

    pub fn total_plies(&self) -> usize {
        self.game.history().len()
    }

    /// FEN of the position on screen.
    pub fn fen(&self) -> &str {
        self.game
            .fen_at(self.current_ply)
            .unwrap_or_else(|| self.game.start_fen())
    }

    /// The move that led to the current position (None at ply 0).
    pub fn last_move(&self) -> Option<&HistoryEntry> {
        self.current_ply
            .checked_sub(1)
            .and_then(|idx| self.game.history().get(idx))
    }

    /// The move played from the current position (None at the end).
    pub fn next_move(&self) -> Option<&HistoryEntry> {
        self.game.history().get(self.current_ply)
    }

    pub fn verdict(&self) -> Option<&MoveVerdict> {
        self.verdict.as_ref()
    }

    /// True until an evaluation of the current position has finished.
    pub fn needs_evaluation(&self) -> bool {
        matches!(self.verdict, None | Some(MoveVerdict::Evaluating))
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    /// Turn the board around. The position and its verdict are unchanged.
    pub fn flip(&mut self) {
        self.flipped = !self.flipped;
    }

    /// Navigate to a specific ply, clamped to the game length. Returns true
    /// if the position changed.
    pub fn go_to_ply(&mut self, ply: usize) -> bool {
        let target = ply.min(self.total_plies());
        if target == self.current_ply {
            return false;
        }
        self.current_ply = target;
        self.verdict = None;
        true
    }

    pub fn next_ply(&mut self) -> bool {
        self.go_to_ply(self.current_ply + 1)
    }

    pub fn prev_ply(&mut self) -> bool {
        match self.current_ply.checked_sub(1) {
            Some(ply) => self.go_to_ply(ply),
            None => false,
        }
    }

    pub fn go_to_start(&mut self) -> bool {
        self.go_to_ply(0)
    }

    pub fn go_to_end(&mut self) -> bool {
        self.go_to_ply(self.total_plies())
    }

    /// Apply a navigation command. Returns true if the position changed;
    /// `Flip` and `Quit` never change it.
    pub fn apply(&mut self, cmd: NavCommand) -> bool {
        match cmd {
            NavCommand::Flip => {
                self.flip();
                false
            }
            NavCommand::Next => self.next_ply(),
            NavCommand::Prev => self.prev_ply(),
            NavCommand::Start => self.go_to_start(),
            NavCommand::End => self.go_to_end(),
            NavCommand::GoTo(ply) => self.go_to_ply(ply),
            NavCommand::Quit => false,
        }
    }

    /// "3. Nf3" / "3... Nc6" label for the move played from the current
    /// position.
    pub fn next_move_label(&self) -> Option<String> {
        self.next_move().map(move_label)
    }

    /// Evaluate the current position and judge the move played from it.
    ///
    /// Any evaluation error (including being superseded) is shown as
    /// [`MoveVerdict::Unavailable`]. Dropping the future before it completes
    /// leaves the verdict at [`MoveVerdict::Evaluating`]; the coordinator
    /// drops the abandoned request once another position is asked for.
    pub async fn evaluate(&mut self, coordinator: &EvaluationCoordinator) -> &MoveVerdict {
        self.verdict = Some(MoveVerdict::Evaluating);
        let fen = self.fen().to_string();

        let verdict = match coordinator.evaluate(&fen).await {
            Ok(evaluation) => MoveVerdict::from_evaluation(&evaluation, self.next_move()),
            Err(e) => {
                tracing::debug!(ply = self.current_ply, error = %e, "Evaluation unavailable");
                MoveVerdict::Unavailable
            }
        };
        self.verdict.insert(verdict)
    }
}

/// Move-number label in PGN style, e.g. "1. e4" or "1... e5".
pub fn move_label(entry: &HistoryEntry) -> String {
    let number: u32 = entry
        .fen_before
        .split_whitespace()
        .nth(5)
        .and_then(|n| n.parse().ok())
        .unwrap_or(1);
    match entry.color {
        cozy_chess::Color::White => format!("{}. {}", number, entry.san),
        cozy_chess::Color::Black => format!("{}... {}", number, entry.san),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ReviewSession {
        ReviewSession::new(Game::load_pgn("1. e4 e5 2. Nf3 Nc6").unwrap())
    }

    #[test]
    fn test_navigation_bounds() {
        let mut review = session();
        assert_eq!(review.current_ply(), 0);
        assert_eq!(review.total_plies(), 4);
        assert!(!review.prev_ply());
        assert!(review.last_move().is_none());
        assert_eq!(review.next_move().unwrap().san, "e4");

        assert!(review.next_ply());
        assert_eq!(review.last_move().unwrap().san, "e4");
        assert_eq!(review.next_move().unwrap().san, "e5");

        assert!(review.go_to_end());
        assert_eq!(review.current_ply(), 4);
        assert!(!review.next_ply());
        assert!(review.next_move().is_none());

        assert!(!review.go_to_ply(99));
        assert!(review.go_to_start());
        assert_eq!(review.fen(), chess::START_FEN);
    }

    #[test]
    fn test_fen_follows_ply() {
        let mut review = session();
        review.go_to_ply(1);
        assert!(review
            .fen()
            .starts_with("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b"));
        assert_eq!(review.fen(), review.game().history()[0].fen_after);
    }

    #[test]
    fn test_move_labels() {
        let mut review = session();
        assert_eq!(review.next_move_label().as_deref(), Some("1. e4"));
        review.next_ply();
        assert_eq!(review.next_move_label().as_deref(), Some("1... e5"));
        review.go_to_ply(2);
        assert_eq!(review.next_move_label().as_deref(), Some("2. Nf3"));
    }

    #[test]
    fn test_nav_command_parse() {
        assert_eq!(NavCommand::parse(""), Some(NavCommand::Next));
        assert_eq!(NavCommand::parse("n"), Some(NavCommand::Next));
        assert_eq!(NavCommand::parse(" PREV "), Some(NavCommand::Prev));
        assert_eq!(NavCommand::parse("s"), Some(NavCommand::Start));
        assert_eq!(NavCommand::parse("end"), Some(NavCommand::End));
        assert_eq!(NavCommand::parse("g 3"), Some(NavCommand::GoTo(3)));
        assert_eq!(NavCommand::parse("q"), Some(NavCommand::Quit));
        assert_eq!(NavCommand::parse("F"), Some(NavCommand::Flip));
        assert_eq!(NavCommand::parse("g"), None);
        assert_eq!(NavCommand::parse("g x"), None);
        assert_eq!(NavCommand::parse("n 2"), None);
        assert_eq!(NavCommand::parse("jump"), None);
    }

    #[test]
    fn test_apply_clears_verdict() {
        let mut review = session();
        review.verdict = Some(MoveVerdict::Unavailable);
        assert!(!review.apply(NavCommand::Quit));
        assert!(review.verdict().is_some());
        assert!(review.apply(NavCommand::GoTo(2)));
        assert!(review.verdict().is_none());
        assert!(review.needs_evaluation());
    }

    #[test]
    fn test_flip_keeps_position_and_verdict() {
        let mut review = session();
        review.go_to_ply(1);
        review.verdict = Some(MoveVerdict::Unavailable);
        assert!(!review.is_flipped());

        assert!(!review.apply(NavCommand::Flip));
        assert!(review.is_flipped());
        assert_eq!(review.current_ply(), 1);
        assert_eq!(review.verdict(), Some(&MoveVerdict::Unavailable));
        assert!(!review.needs_evaluation());

        review.flip();
        assert!(!review.is_flipped());
    }

    #[test]
    fn test_evaluating_still_needs_evaluation() {
        let mut review = session();
        review.verdict = Some(MoveVerdict::Evaluating);
        assert!(review.needs_evaluation());
    }
}
