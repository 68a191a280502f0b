//! Player Locomotion
//!
//! Discrete lane stepping with a continuous hop animation.
//!
//! ```text
//!            request_forward (lane L+1 exists, no cooldown)
//!   ┌──────┐ ───────────────────────────────────────────▶ ┌───────────────────────┐
//!   │ Idle │                                               │ Advancing { L+1, t }  │
//!   └──────┘ ◀─────────────────────────────────────────── └───────────────────────┘
//!            t reaches 1: land on L+1 (or stay on L if L+1 is gone)
//! ```
//!
//! The lane id only changes when a hop completes. Lateral movement is a
//! clamped position update available in both states.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::fixed::{
    Fixed, FIXED_ONE, PLAYER_SIZE, fixed_clamp, fixed_lerp, fixed_mul, from_int, to_fixed,
};
use crate::core::vec2::FixedVec2;
use crate::game::lane::{LaneId, LaneSequence};

// =============================================================================
// PLAYER ID
// =============================================================================

/// Local player slot (0 or 1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

// =============================================================================
// CONFIG
// =============================================================================

/// Hop, cooldown and strafing tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    /// Hop progress per second (6 = a hop takes 1/6 s)
    pub hop_rate: Fixed,
    /// Minimum time between accepted forward requests, from hop start
    pub forward_cooldown: Fixed,
    /// Strafe speed in tiles per second
    pub lateral_speed: Fixed,
    /// Edge of the square player box
    pub player_size: Fixed,
    /// Points awarded per accepted hop
    pub hop_reward: u32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            hop_rate: from_int(6),
            forward_cooldown: to_fixed(0.2),
            lateral_speed: from_int(5),
            player_size: PLAYER_SIZE,
            hop_reward: 10,
        }
    }
}

// =============================================================================
// STATE
// =============================================================================

/// Locomotion phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locomotion {
    #[default]
    Idle,
    /// Hopping into `target` (always the next lane), progress in [0, 1)
    Advancing { target: LaneId, progress: Fixed },
}

/// What killed a player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeathCause {
    Vehicle,
    Train,
    Drowned,
}

/// Why a movement request was refused. Every variant is a no-op for the
/// simulation; callers may log or ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveRejected {
    #[error("session is not playing")]
    NotPlaying,

    #[error("player is dead")]
    Dead,

    #[error("already hopping")]
    AlreadyAdvancing,

    #[error("forward input is cooling down")]
    CoolingDown,

    #[error("no lane ahead of lane {0}")]
    NoLaneAhead(u32),

    #[error("no player in slot {0}")]
    UnknownPlayer(u8),
}

/// Result of a completed hop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HopOutcome {
    /// Landed on the target lane
    Landed(LaneId),
    /// Target lane vanished mid-hop; stayed on the source lane
    Aborted(LaneId),
}

/// One controllable player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: PlayerId,
    /// Lane currently occupied (the hop source while advancing)
    pub lane: LaneId,
    pub motion: Locomotion,
    /// Free-axis coordinate
    pub free: Fixed,
    pub alive: bool,
    pub score: u32,
    pub hops: u32,
    /// Remaining forward cooldown in seconds
    pub cooldown: Fixed,
    pub death: Option<DeathCause>,
}

impl PlayerState {
    pub fn new(id: PlayerId, lane: LaneId, free: Fixed) -> Self {
        Self {
            id,
            lane,
            motion: Locomotion::Idle,
            free,
            alive: true,
            score: 0,
            hops: 0,
            cooldown: 0,
            death: None,
        }
    }

    #[inline]
    pub fn is_advancing(&self) -> bool {
        matches!(self.motion, Locomotion::Advancing { .. })
    }

    /// Target lane: the hop target while advancing, else the current lane.
    #[inline]
    pub fn target_lane(&self) -> LaneId {
        match self.motion {
            Locomotion::Idle => self.lane,
            Locomotion::Advancing { target, .. } => target,
        }
    }

    /// Hop progress in [0, 1], zero when idle.
    #[inline]
    pub fn progress(&self) -> Fixed {
        match self.motion {
            Locomotion::Idle => 0,
            Locomotion::Advancing { progress, .. } => progress,
        }
    }

    /// Start a hop into the next lane.
    ///
    /// Awards the hop reward immediately on acceptance.
    pub fn request_forward(
        &mut self,
        lanes: &LaneSequence,
        config: &LocomotionConfig,
    ) -> Result<(), MoveRejected> {
        if !self.alive {
            return Err(MoveRejected::Dead);
        }
        if self.is_advancing() {
            return Err(MoveRejected::AlreadyAdvancing);
        }
        if self.cooldown > 0 {
            return Err(MoveRejected::CoolingDown);
        }

        let target = self.lane.next();
        if !lanes.contains_id(target) {
            return Err(MoveRejected::NoLaneAhead(lanes.index_of(self.lane).unwrap_or(0)));
        }

        self.motion = Locomotion::Advancing { target, progress: 0 };
        self.cooldown = config.forward_cooldown;
        self.score = self.score.saturating_add(config.hop_reward);
        self.hops += 1;
        Ok(())
    }

    /// Strafe along the free axis for one frame, clamped to the play field.
    pub fn request_lateral(
        &mut self,
        direction: i8,
        dt: Fixed,
        config: &LocomotionConfig,
        span: Fixed,
    ) -> Result<(), MoveRejected> {
        if !self.alive {
            return Err(MoveRejected::Dead);
        }
        let step = fixed_mul(config.lateral_speed, dt);
        self.free += step * direction.signum() as Fixed;
        self.clamp_free(config, span);
        Ok(())
    }

    /// Keep the player box inside `[0, span]`.
    pub fn clamp_free(&mut self, config: &LocomotionConfig, span: Fixed) {
        let half = config.player_size >> 1;
        self.free = fixed_clamp(self.free, half, span - half);
    }

    /// Advance cooldown and hop progress by one frame.
    ///
    /// The target lane is re-validated on completion because eviction may
    /// have removed it while the hop was in flight.
    pub fn advance(
        &mut self,
        dt: Fixed,
        lanes: &LaneSequence,
        config: &LocomotionConfig,
    ) -> Option<HopOutcome> {
        if !self.alive {
            return None;
        }
        self.cooldown = (self.cooldown - dt).max(0);

        let Locomotion::Advancing { target, progress } = self.motion else {
            return None;
        };

        let progress = progress + fixed_mul(dt, config.hop_rate);
        if progress < FIXED_ONE {
            self.motion = Locomotion::Advancing { target, progress };
            return None;
        }

        self.motion = Locomotion::Idle;
        if lanes.contains_id(target) {
            self.lane = target;
            Some(HopOutcome::Landed(target))
        } else {
            Some(HopOutcome::Aborted(self.lane))
        }
    }

    /// Travel-axis coordinate, interpolated between lane centers mid-hop.
    pub fn travel_position(&self, lanes: &LaneSequence) -> Option<Fixed> {
        let source = lanes.get(self.lane)?.center();
        match self.motion {
            Locomotion::Idle => Some(source),
            Locomotion::Advancing { target, progress } => {
                let dest = lanes.get(target).map(|l| l.center()).unwrap_or(source);
                Some(fixed_lerp(source, dest, progress))
            }
        }
    }

    /// World position for rendering.
    pub fn position(&self, lanes: &LaneSequence) -> Option<FixedVec2> {
        self.travel_position(lanes).map(|x| FixedVec2::new(x, self.free))
    }

    /// Mark the player dead. Returns false if it already was.
    pub fn kill(&mut self, cause: DeathCause) -> bool {
        if !self.alive {
            return false;
        }
        self.alive = false;
        self.death = Some(cause);
        self.motion = Locomotion::Idle;
        true
    }
}

// =============================================================================
// TESTS
// =============================================================================
