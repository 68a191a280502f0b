//! Camera/Viewport Tracker
//!
//! Follows the leading player's lane with exponential smoothing. The target
//! is only moved while that player is idle: retargeting against the
//! interpolated mid-hop position makes the view visibly jitter.

use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, FIXED_ONE, fixed_abs, fixed_mul, from_int, to_fixed};
use crate::game::lane::LaneSequence;
use crate::game::player::PlayerState;

/// Camera tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Distance from the camera coordinate to the followed lane center
    pub anchor: Fixed,
    /// Smoothing rate per second
    pub follow_rate: Fixed,
    /// Below this distance the camera snaps onto its target
    pub snap_distance: Fixed,
    /// Travel-axis length of the visible window, starting at the camera
    pub view_length: Fixed,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            // 150 px
            anchor: to_fixed(3.75),
            follow_rate: from_int(6),
            snap_distance: to_fixed(0.01),
            // 800 px
            view_length: from_int(20),
        }
    }
}

/// Tracked and target camera coordinates on the travel axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraTracker {
    pub tracked: Fixed,
    pub target: Fixed,
}

impl CameraTracker {
    /// Place the camera directly on a lane, with no smoothing.
    pub fn reset_to(&mut self, lane_center: Fixed, config: &CameraConfig) {
        self.target = lane_center - config.anchor;
        self.tracked = self.target;
    }

    /// Point the target at the player's lane, unless the player is mid-hop.
    ///
    /// Returns true when the target moved.
    pub fn retarget(&mut self, player: &PlayerState, lanes: &LaneSequence, config: &CameraConfig) -> bool {
        if player.is_advancing() {
            return false;
        }
        let Some(lane) = lanes.get(player.lane) else {
            return false;
        };
        let target = lane.center() - config.anchor;
        let moved = target != self.target;
        self.target = target;
        moved
    }

    /// Move the tracked coordinate towards the target.
    ///
    /// The blend factor is capped at 1 so a long frame never overshoots.
    pub fn follow(&mut self, dt: Fixed, config: &CameraConfig) {
        let diff = self.target - self.tracked;
        if fixed_abs(diff) <= config.snap_distance {
            self.tracked = self.target;
            return;
        }
        let factor = fixed_mul(config.follow_rate, dt).clamp(0, FIXED_ONE);
        self.tracked += fixed_mul(diff, factor);
    }
}
