//! Helpers for game archives: multi-game PGN files as exported by online
//! chess sites.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::pgn::{parse_tags, GameResult, PgnError};

/// Speed class of a game, derived from its `TimeControl` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameType {
    Bullet,
    Blitz,
    Rapid,
    Daily,
}

impl GameType {
    /// Classify a PGN `TimeControl` value such as `"180"`, `"600+5"`,
    /// `"300|2"` or `"1/86400"`.
    ///
    /// Missing time control counts as Rapid. Correspondence controls (with a
    /// `/`) and anything whose base time cannot be read count as Daily.
    pub fn from_time_control(time_control: Option<&str>) -> Self {
        let Some(tc) = time_control.map(str::trim).filter(|tc| !tc.is_empty()) else {
            return Self::Rapid;
        };
        if tc.contains('/') {
            return Self::Daily;
        }

        let base = tc.split(['|', '+']).next().unwrap_or_default();
        match base.parse::<u64>() {
            Ok(seconds) if seconds < 180 => Self::Bullet,
            Ok(seconds) if seconds <= 600 => Self::Blitz,
            Ok(seconds) if seconds < 3600 => Self::Rapid,
            _ => Self::Daily,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bullet => "bullet",
            Self::Blitz => "blitz",
            Self::Rapid => "rapid",
            Self::Daily => "daily",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameType {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bullet" => Ok(Self::Bullet),
            "blitz" => Ok(Self::Blitz),
            "rapid" => Ok(Self::Rapid),
            "daily" => Ok(Self::Daily),
            _ => Err(ArchiveError::UnknownGameType(s.to_string())),
        }
    }
}

/// Result of a game from one player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Loss,
    Draw,
    Ongoing,
}

/// Header fields of one archived game plus its full PGN text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    pub date: String,
    pub white: String,
    pub black: String,
    pub result: String,
    pub time_control: Option<String>,
    pub game_type: GameType,
    #[serde(skip)]
    pub pgn: String,
}

impl GameSummary {
    /// Read the summary tags of a single game. `Date`, `White`, `Black` and
    /// `Result` are required.
    pub fn from_pgn(text: &str) -> Result<Self, ArchiveError> {
        let tags = parse_tags(text)?;
        let required = |name: &'static str| {
            tags.iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
                .ok_or(ArchiveError::MissingTag(name))
        };

        let time_control = tags
            .iter()
            .find(|(key, _)| key == "TimeControl")
            .map(|(_, value)| value.clone());

        Ok(Self {
            date: required("Date")?,
            white: required("White")?,
            black: required("Black")?,
            result: required("Result")?,
            game_type: GameType::from_time_control(time_control.as_deref()),
            time_control,
            pgn: text.to_string(),
        })
    }

    /// Outcome for `player` (compared case-insensitively), or `None` if the
    /// player did not take part.
    pub fn outcome_for(&self, player: &str) -> Option<Outcome> {
        let is_white = self.white.eq_ignore_ascii_case(player);
        if !is_white && !self.black.eq_ignore_ascii_case(player) {
            return None;
        }

        Some(match GameResult::from_token(&self.result) {
            Some(GameResult::Draw) => Outcome::Draw,
            Some(GameResult::WhiteWins) if is_white => Outcome::Win,
            Some(GameResult::BlackWins) if !is_white => Outcome::Win,
            Some(GameResult::WhiteWins | GameResult::BlackWins) => Outcome::Loss,
            Some(GameResult::Ongoing) | None => Outcome::Ongoing,
        })
    }

    /// Sort key for dates written as `YYYY.MM.DD`; unknown parts (`??`) sort
    /// first.
    fn date_key(&self) -> String {
        self.date.replace('-', ".")
    }
}

/// Split a multi-game PGN export into one string per game.
///
/// A new game starts at a tag line that follows movetext.
pub fn split_games(text: &str) -> Vec<String> {
    let mut games = Vec::new();
    let mut current = String::new();
    let mut seen_movetext = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && seen_movetext {
            games.push(std::mem::take(&mut current));
            seen_movetext = false;
        }
        if !trimmed.is_empty() && !trimmed.starts_with('[') {
            seen_movetext = true;
        }
        current.push_str(line);
        current.push('\n');
    }
    games.push(current);

    games.retain(|game| !game.trim().is_empty());
    games
}

/// Summaries of every game in `text` that carries the required tags, newest
/// first. Games missing tags are skipped.
pub fn summarize_archive(text: &str) -> Vec<GameSummary> {
    let mut summaries: Vec<GameSummary> = split_games(text)
        .iter()
        .filter_map(|game| GameSummary::from_pgn(game).ok())
        .collect();
    summaries.sort_by_key(|summary| std::cmp::Reverse(summary.date_key()));
    summaries
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),
    #[error("Unknown game type: {0}")]
    UnknownGameType(String),
    #[error(transparent)]
    Pgn(#[from] PgnError),
}
