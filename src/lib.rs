//! # Lane Runner
//!
//! Deterministic simulation core for a crossy-road style endless runner:
//! tile streaming, obstacle traffic, hop locomotion, collision and scoring.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    LANE RUNNER                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── fixed.rs    - Q16.16 fixed-point arithmetic (tiles)     │
//! │  ├── vec2.rs     - 2D vector with fixed-point                │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  game/           - Session logic (deterministic)             │
//! │  ├── lane.rs     - Lane sequence and terrain policy          │
//! │  ├── horizon.rs  - Generate ahead, evict behind              │
//! │  ├── obstacle.rs - Vehicles, trains and logs                 │
//! │  ├── player.rs   - Hop and strafe locomotion                 │
//! │  ├── camera.rs   - Viewport tracking                         │
//! │  ├── collision.rs- Strikes and river support                 │
//! │  ├── state.rs    - Session state and lifecycle               │
//! │  ├── tick.rs     - Frame tick and configuration              │
//! │  └── snapshot.rs - Render view                               │
//! │                                                              │
//! │  records/        - Collaborator stores (non-deterministic)   │
//! │  ├── leaderboard.rs - High-score table                       │
//! │  └── replay.rs   - Replay transcripts                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - No floating-point arithmetic in game logic
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies (frame deltas are inputs)
//! - All randomness from seeded Xorshift128+
//!
//! Given the same seed, inputs and frame deltas, a session produces
//! **identical results** on any platform.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod records;

// Re-export commonly used types
pub use core::fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use core::vec2::FixedVec2;
pub use core::rng::DeterministicRng;
pub use game::input::{InputFrame, InputDelta, PlayerInputBuffer};
pub use game::state::{GamePhase, SessionState};
pub use game::player::PlayerId;
pub use game::tick::{SessionConfig, TickResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Nominal frame rate the demo driver and checkpoints assume (Hz)
pub const TICK_RATE: u32 = 60;

/// Nominal frame delta at `TICK_RATE`, in milliseconds
pub const FRAME_MS: u32 = 1000 / TICK_RATE;
