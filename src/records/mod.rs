//! Collaborator-Owned Records
//!
//! Stores that live outside the deterministic core.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    RECORDS                                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  leaderboard.rs  - Top-10 high scores, JSON persistence     │
//! │  replay.rs       - bincode transcript with hash checkpoints │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod leaderboard;
pub mod replay;

pub use leaderboard::{Leaderboard, LeaderboardError, LeaderboardSink, ScoreEntry, ScoreSink};
pub use replay::{ReplayError, ReplayTranscript};
