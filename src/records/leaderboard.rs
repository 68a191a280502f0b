//! High-Score Table
//!
//! Top-N scores with names and timestamps, persisted as JSON. The session
//! core never touches this; it hands finalized scores to a [`ScoreSink`].

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, info};

/// Entries kept on the table.
pub const LEADERBOARD_CAPACITY: usize = 10;

/// Name used when a player submits a blank one.
pub const DEFAULT_NAME: &str = "Anonymous";

/// Errors loading or saving the table.
#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("leaderboard I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("leaderboard JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),
}

/// One ranked score.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub name: String,
    pub score: u32,
    pub timestamp: DateTime<Utc>,
}

/// Scores sorted descending. Equal scores keep submission order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Leaderboard {
    entries: Vec<ScoreEntry>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ScoreEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest score on the table.
    pub fn best(&self) -> Option<&ScoreEntry> {
        self.entries.first()
    }

    /// Whether a score would make the table.
    pub fn qualifies(&self, score: u32) -> bool {
        self.entries.len() < LEADERBOARD_CAPACITY
            || self.entries.last().is_some_and(|lowest| score > lowest.score)
    }

    /// Insert a score. Returns its zero-based rank, or `None` if it fell off
    /// the bottom of the table.
    pub fn submit(&mut self, name: &str, score: u32, timestamp: DateTime<Utc>) -> Option<usize> {
        let name = match name.trim() {
            "" => DEFAULT_NAME.to_string(),
            trimmed => trimmed.to_string(),
        };

        let rank = self.entries.partition_point(|e| e.score >= score);
        self.entries.insert(rank, ScoreEntry { name, score, timestamp });
        self.entries.truncate(LEADERBOARD_CAPACITY);

        (rank < LEADERBOARD_CAPACITY).then_some(rank)
    }

    /// Parse a table, restoring the ordering and capacity invariants.
    pub fn from_json(json: &str) -> Result<Self, LeaderboardError> {
        let mut entries: Vec<ScoreEntry> = serde_json::from_str(json)?;
        // Stable sort keeps the stored order of equal scores
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(LEADERBOARD_CAPACITY);
        Ok(Self { entries })
    }

    pub fn to_json(&self) -> Result<String, LeaderboardError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from disk. A missing file is an empty table.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LeaderboardError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(json) => {
                let board = Self::from_json(&json)?;
                debug!(path = %path.display(), entries = board.len(), "leaderboard loaded");
                Ok(board)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no leaderboard yet");
                Ok(Self::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), LeaderboardError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        debug!(path = %path.display(), entries = self.len(), "leaderboard saved");
        Ok(())
    }
}

// =============================================================================
// SCORE SINK
// =============================================================================

/// Receives the finalized score of a session, once per session.
pub trait ScoreSink {
    fn on_score_finalized(&mut self, score: u32);
}

/// Submits finalized scores to a leaderboard under one player name.
#[derive(Debug)]
pub struct LeaderboardSink<'a> {
    board: &'a mut Leaderboard,
    name: String,
    last_rank: Option<usize>,
}

impl<'a> LeaderboardSink<'a> {
    pub fn new(board: &'a mut Leaderboard, name: impl Into<String>) -> Self {
        Self { board, name: name.into(), last_rank: None }
    }

    /// Rank of the last submitted score, if it made the table.
    pub fn last_rank(&self) -> Option<usize> {
        self.last_rank
    }
}

impl ScoreSink for LeaderboardSink<'_> {
    fn on_score_finalized(&mut self, score: u32) {
        self.last_rank = self.board.submit(&self.name, score, Utc::now());
        match self.last_rank {
            Some(rank) => info!(name = %self.name, score, rank = rank + 1, "new high score"),
            None => debug!(name = %self.name, score, "score did not make the leaderboard"),
        }
    }
}

impl ScoreSink for Vec<u32> {
    fn on_score_finalized(&mut self, score: u32) {
        self.push(score);
    }
}

// =============================================================================
// TESTS
// =============================================================================
