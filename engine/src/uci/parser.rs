use crate::{EngineInfo, Score};

/// Incoming message from UCI engine
#[derive(Debug, Clone, PartialEq)]
pub enum UciMessage {
    Id {
        name: String,
        value: String,
    },
    UciOk,
    ReadyOk,
    /// `mv` is `None` for `bestmove (none)`, sent for checkmate and stalemate positions.
    BestMove {
        mv: Option<String>,
        ponder: Option<String>,
        score: Option<Score>,
    },
    Info(EngineInfo),
}

/// Parse a UCI message line
pub fn parse_uci_message(line: &str) -> Result<UciMessage, crate::UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.first() {
        Some(&"uciok") => Ok(UciMessage::UciOk),
        Some(&"readyok") => Ok(UciMessage::ReadyOk),

        Some(&"id") => {
            if tokens.len() < 3 {
                return Err(crate::UciError::MalformedMessage(line.to_string()));
            }
            let name = tokens[1].to_string();
            let value = tokens[2..].join(" ");
            Ok(UciMessage::Id { name, value })
        }

        Some(&"bestmove") => {
            let Some(&mv_token) = tokens.get(1) else {
                return Err(crate::UciError::MalformedMessage(line.to_string()));
            };
            let mv = match mv_token {
                "(none)" | "0000" => None,
                other => Some(parse_uci_move(other)?),
            };

            let mut ponder = None;
            let mut score = None;
            let mut i = 2;
            while i < tokens.len() {
                match tokens[i] {
                    "ponder" => {
                        i += 1;
                        ponder = tokens.get(i).and_then(|s| parse_uci_move(s).ok());
                    }
                    // Non-standard, but some wrappers append the final score.
                    "score" => {
                        score = parse_score(&tokens[i + 1..]);
                        i += 2;
                    }
                    _ => {}
                }
                i += 1;
            }
            Ok(UciMessage::BestMove { mv, ponder, score })
        }

        Some(&"info") => Ok(UciMessage::Info(parse_info_line(&tokens[1..]))),

        _ => Err(crate::UciError::UnknownMessage(line.to_string())),
    }
}

fn parse_score(tokens: &[&str]) -> Option<Score> {
    let value = tokens.get(1)?;
    match *tokens.first()? {
        "cp" => value.parse().ok().map(Score::Centipawns),
        "mate" => value.parse().ok().map(Score::Mate),
        _ => None,
    }
}

/// Parse an "info" line from the engine
fn parse_info_line(tokens: &[&str]) -> EngineInfo {
    let mut info = EngineInfo::default();
    let mut i = 0;

    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                i += 1;
                info.depth = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "seldepth" => {
                i += 1;
                info.seldepth = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "time" => {
                i += 1;
                info.time_ms = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "nodes" => {
                i += 1;
                info.nodes = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "nps" => {
                i += 1;
                info.nps = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "score" => {
                // "score cp 35" / "score mate -3", optionally followed by a bound
                if let Some(score) = parse_score(&tokens[i + 1..]) {
                    info.score = Some(score);
                }
                i += 2;
            }
            "pv" => {
                // Collect all moves until next keyword
                i += 1;
                while i < tokens.len() && !is_keyword(tokens[i]) {
                    if let Ok(mv) = parse_uci_move(tokens[i]) {
                        info.pv.push(mv);
                    }
                    i += 1;
                }
                continue; // Don't increment i again
            }
            "multipv" => {
                i += 1;
                info.multipv = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "hashfull" => {
                i += 1;
                info.hashfull = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "string" => break, // Free text to end of line
            _ => {
                // Unknown keyword, skip
            }
        }
        i += 1;
    }

    info
}

fn is_keyword(token: &str) -> bool {
    matches!(
        token,
        "depth"
            | "seldepth"
            | "time"
            | "nodes"
            | "score"
            | "pv"
            | "multipv"
            | "currmove"
            | "currmovenumber"
            | "hashfull"
            | "nps"
            | "tbhits"
            | "cpuload"
            | "string"
    )
}

/// Validate a UCI move (e2e4, e7e8q) and return it in canonical lowercase form.
pub fn parse_uci_move(s: &str) -> Result<String, crate::UciError> {
    let mv = s.to_ascii_lowercase();
    let bytes = mv.as_bytes();
    let valid_square = |file: u8, rank: u8| (b'a'..=b'h').contains(&file) && (b'1'..=b'8').contains(&rank);

    let valid = match bytes.len() {
        4 | 5 => {
            valid_square(bytes[0], bytes[1])
                && valid_square(bytes[2], bytes[3])
                && bytes
                    .get(4)
                    .map_or(true, |p| matches!(p, b'q' | b'r' | b'b' | b'n'))
        }
        _ => false,
    };

    if valid {
        Ok(mv)
    } else {
        Err(crate::UciError::InvalidMove(s.to_string()))
    }
}
