//! Game Logic Module
//!
//! All session simulation code. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `lane`: Lane descriptors, terrain policy, the lane sequence
//! - `horizon`: Generate-ahead, evict-behind and rebinding
//! - `obstacle`: Obstacle population and motion
//! - `player`: Hop/strafe locomotion state machine
//! - `camera`: Smoothed viewport tracking
//! - `collision`: Strikes and river support
//! - `input`: Intent frames and delta-compressed recording
//! - `events`: Game events for logging and replay
//! - `state`: Session state and lifecycle
//! - `tick`: Frame tick, configuration, replay
//! - `snapshot`: Read-only render view

pub mod lane;
pub mod horizon;
pub mod obstacle;
pub mod player;
pub mod camera;
pub mod collision;
pub mod input;
pub mod events;
pub mod state;
pub mod tick;
pub mod snapshot;

// Re-export key types
pub use input::{InputFrame, InputDelta, PlayerInputBuffer};
pub use lane::{Lane, LaneId, Level, TerrainKind};
pub use obstacle::{Obstacle, ObstacleId, ObstacleKind};
pub use player::{DeathCause, MoveRejected, PlayerId, PlayerState};
pub use state::{EndPolicy, GamePhase, SessionState};
pub use tick::{tick, replay_session, SessionConfig, TickResult};
pub use snapshot::RenderSnapshot;
pub use events::GameEvent;
