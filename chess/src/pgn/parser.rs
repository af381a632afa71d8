use serde::{Deserialize, Serialize};

/// A parsed PGN game
#[derive(Debug, Clone, PartialEq)]
pub struct PgnGame {
    pub tags: Vec<(String, String)>,
    pub moves: Vec<PgnMove>,
    pub result: GameResult,
}

/// A single move in PGN with metadata
#[derive(Debug, Clone, PartialEq)]
pub struct PgnMove {
    pub san: String,
    pub comment: Option<String>,
    pub nags: Vec<u8>, // Numeric Annotation Glyphs (!!, ?, etc.)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
    Ongoing,
}

impl GameResult {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "1-0" => Some(Self::WhiteWins),
            "0-1" => Some(Self::BlackWins),
            "1/2-1/2" | "½-½" => Some(Self::Draw),
            "*" => Some(Self::Ongoing),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WhiteWins => "1-0",
            Self::BlackWins => "0-1",
            Self::Draw => "1/2-1/2",
            Self::Ongoing => "*",
        }
    }
}

impl PgnGame {
    /// Value of the first tag named `name`.
    pub fn tag(&self, name: &str) -> Option<&str> {
        find_tag(&self.tags, name)
    }
}

pub(crate) fn find_tag<'a>(tags: &'a [(String, String)], name: &str) -> Option<&'a str> {
    tags.iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// Parse a PGN string into a game
///
/// Moves are returned as SAN tokens; they are checked for legality when the
/// game is replayed by [`crate::Game::load_pgn`].
pub fn parse_pgn(input: &str) -> Result<PgnGame, PgnError> {
    if input.trim().is_empty() {
        return Err(PgnError::InvalidFormat);
    }

    let (tags, movetext) = split_tag_section(input)?;
    let (moves, terminator) = parse_movetext(&movetext)?;

    let result = terminator
        .or_else(|| find_tag(&tags, "Result").and_then(GameResult::from_token))
        .unwrap_or(GameResult::Ongoing);

    Ok(PgnGame {
        tags,
        moves,
        result,
    })
}

/// Parse only the tag pairs at the top of a PGN game.
pub fn parse_tags(input: &str) -> Result<Vec<(String, String)>, PgnError> {
    split_tag_section(input).map(|(tags, _)| tags)
}

fn split_tag_section(input: &str) -> Result<(Vec<(String, String)>, String), PgnError> {
    let mut tags = Vec::new();
    let mut lines = input.lines().peekable();

    while let Some(line) = lines.peek() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            lines.next();
            continue;
        }
        if !trimmed.starts_with('[') {
            break;
        }
        tags.push(parse_tag_line(trimmed)?);
        lines.next();
    }

    let movetext = lines.collect::<Vec<_>>().join("\n");
    Ok((tags, movetext))
}

fn parse_tag_line(line: &str) -> Result<(String, String), PgnError> {
    let invalid = || PgnError::InvalidTag(line.to_string());

    let inner = line
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(invalid)?
        .trim();
    let (name, value) = inner.split_once(char::is_whitespace).ok_or_else(invalid)?;
    let value = value
        .trim()
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(invalid)?;

    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                unescaped.push(escaped);
            }
        } else {
            unescaped.push(c);
        }
    }

    Ok((name.to_string(), unescaped))
}

fn parse_movetext(text: &str) -> Result<(Vec<PgnMove>, Option<GameResult>), PgnError> {
    let mut moves: Vec<PgnMove> = Vec::new();
    let mut result = None;
    let mut chars = text.chars().peekable();
    let mut token = String::new();

    loop {
        let next = chars.next();
        let at_boundary = match next {
            None => true,
            Some(c) => c.is_whitespace() || matches!(c, '{' | ';' | '(' | ')' | '$'),
        };
        if at_boundary && !token.is_empty() {
            if let Some(r) = GameResult::from_token(&token) {
                result = Some(r);
            } else if let Some(san) = strip_move_number(&token) {
                moves.push(PgnMove {
                    san: san.to_string(),
                    comment: None,
                    nags: Vec::new(),
                });
            }
            token.clear();
        }

        let Some(c) = next else { break };
        match c {
            '{' => {
                let comment: String = chars.by_ref().take_while(|&c| c != '}').collect();
                if let Some(last) = moves.last_mut() {
                    let comment = comment.trim().to_string();
                    last.comment = match last.comment.take() {
                        Some(existing) => Some(format!("{} {}", existing, comment)),
                        None => Some(comment),
                    };
                }
            }
            ';' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '(' => skip_variation(&mut chars)?,
            ')' => return Err(PgnError::InvalidFormat),
            '$' => {
                let mut digits = String::new();
                while let Some(&d) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    digits.push(d);
                    chars.next();
                }
                let nag = digits.parse().map_err(|_| PgnError::InvalidFormat)?;
                if let Some(last) = moves.last_mut() {
                    last.nags.push(nag);
                }
            }
            c if c.is_whitespace() => {}
            c => token.push(c),
        }
    }

    Ok((moves, result))
}

/// Skip a (possibly nested) variation; the opening parenthesis is consumed.
fn skip_variation(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<(), PgnError> {
    let mut depth = 1;
    while let Some(c) = chars.next() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            // Comments may contain parentheses.
            '{' => {
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    Err(PgnError::UnterminatedVariation)
}

/// Strip a leading move number ("12.", "12...", "1.e4"). Returns `None` for
/// tokens that carry no move.
fn strip_move_number(token: &str) -> Option<&str> {
    if token == "e.p." {
        return None;
    }
    let rest = token.trim_start_matches(|c: char| c.is_ascii_digit());
    let san = if rest.len() < token.len() && rest.starts_with('.') {
        rest.trim_start_matches('.')
    } else {
        token
    };
    (!san.is_empty()).then_some(san)
}

#[derive(Debug, thiserror::Error)]
pub enum PgnError {
    #[error("Invalid PGN format")]
    InvalidFormat,
    #[error("Invalid tag: {0}")]
    InvalidTag(String),
    #[error("Unterminated variation")]
    UnterminatedVariation,
    #[error("Illegal move {san} at ply {ply}: {source}")]
    IllegalMove {
        ply: usize,
        san: String,
        #[source]
        source: super::san::SanError,
    },
}
