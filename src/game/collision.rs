//! Collision & Hazard Evaluation
//!
//! Two independent hazard classes are checked every tick:
//!
//! - **Strike**: box overlap with a vehicle or train in any tested lane. A
//!   hopping player is tested in both its source and target lane.
//! - **Support**: on a river lane the player must be over a log, which then
//!   carries it. Without a log an idle player drowns; a hopping player gets
//!   a grace period.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, fixed_abs, to_fixed};
use crate::core::vec2::FixedVec2;
use crate::game::lane::{Lane, LaneSequence, TerrainKind};
use crate::game::obstacle::{Obstacle, ObstacleId, ObstacleKind};
use crate::game::player::{DeathCause, LocomotionConfig, PlayerId, PlayerState};
use crate::game::state::SessionState;
use crate::game::tick::SessionConfig;

// =============================================================================
// BOXES
// =============================================================================

/// Axis-aligned box given by center and half extents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Aabb {
    pub center: FixedVec2,
    pub half: FixedVec2,
}

impl Aabb {
    #[inline]
    pub const fn new(center: FixedVec2, half: FixedVec2) -> Self {
        Self { center, half }
    }

    #[inline]
    pub fn min(&self) -> FixedVec2 {
        self.center - self.half
    }

    #[inline]
    pub fn max(&self) -> FixedVec2 {
        self.center + self.half
    }

    /// Strict overlap; touching edges do not count.
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        let (a_min, a_max) = (self.min(), self.max());
        let (b_min, b_max) = (other.min(), other.max());
        a_min.x < b_max.x && a_max.x > b_min.x && a_min.y < b_max.y && a_max.y > b_min.y
    }

    /// Shrink every side by `margin`, never below zero size.
    #[inline]
    pub fn shrink(&self, margin: Fixed) -> Aabb {
        Aabb {
            center: self.center,
            half: FixedVec2::new((self.half.x - margin).max(0), (self.half.y - margin).max(0)),
        }
    }
}

// =============================================================================
// CONFIG
// =============================================================================

/// Hazard tolerances.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardConfig {
    /// Inset applied to the player box for strike tests
    pub hit_margin: Fixed,
    /// Extra free-axis reach on each side of a log
    pub support_tolerance: Fixed,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            hit_margin: to_fixed(0.1),
            support_tolerance: to_fixed(0.3),
        }
    }
}

// =============================================================================
// EVALUATION
// =============================================================================

/// River support result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Support {
    /// Not on a river, or mid-hop over one
    NotRequired,
    /// Riding a log; `free` is the log's current free-axis coordinate
    Carried { log: ObstacleId, free: Fixed },
    /// On a river with nothing underneath
    Drowned,
}

/// Hazard findings for one player in one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HazardReport {
    pub player_id: PlayerId,
    pub strike: Option<(ObstacleId, DeathCause)>,
    pub support: Support,
}

/// The player's box as if it stood in `lane`.
pub fn player_box(
    player: &PlayerState,
    lane: &Lane,
    locomotion: &LocomotionConfig,
    hazards: &HazardConfig,
) -> Aabb {
    let half = locomotion.player_size >> 1;
    Aabb::new(FixedVec2::new(lane.center(), player.free), FixedVec2::new(half, half))
        .shrink(hazards.hit_margin)
}

/// First lethal obstacle overlapping the player in its tested lanes.
pub fn find_strike(
    player: &PlayerState,
    lanes: &LaneSequence,
    obstacles: &BTreeMap<ObstacleId, Obstacle>,
    locomotion: &LocomotionConfig,
    hazards: &HazardConfig,
) -> Option<(ObstacleId, DeathCause)> {
    let mut tested = vec![player.lane];
    if player.is_advancing() {
        tested.push(player.target_lane());
    }

    for lane in tested.iter().filter_map(|id| lanes.get(*id)) {
        let body = player_box(player, lane, locomotion, hazards);
        let hit = obstacles
            .values()
            .filter(|o| o.lane == lane.id && o.kind.is_lethal())
            .find(|o| body.overlaps(&o.bounds()));

        if let Some(obstacle) = hit {
            let cause = match obstacle.kind {
                ObstacleKind::Train => DeathCause::Train,
                _ => DeathCause::Vehicle,
            };
            return Some((obstacle.id, cause));
        }
    }
    None
}

/// River support check for the player's current lane.
///
/// When several logs qualify the lowest id wins.
pub fn check_support(
    player: &PlayerState,
    lanes: &LaneSequence,
    obstacles: &BTreeMap<ObstacleId, Obstacle>,
    hazards: &HazardConfig,
) -> Support {
    let Some(lane) = lanes.get(player.lane) else {
        return Support::NotRequired;
    };
    if lane.kind != TerrainKind::River {
        return Support::NotRequired;
    }

    let log = obstacles
        .values()
        .filter(|o| o.lane == lane.id && o.kind == ObstacleKind::Log)
        .find(|o| fixed_abs(player.free - o.position.y) <= o.half_extents.y + hazards.support_tolerance);

    match log {
        Some(log) => Support::Carried { log: log.id, free: log.position.y },
        None if player.is_advancing() => Support::NotRequired,
        None => Support::Drowned,
    }
}

/// Evaluate every live player in id order.
pub fn check_all_hazards(state: &SessionState, config: &SessionConfig) -> Vec<HazardReport> {
    state
        .players
        .values()
        .filter(|p| p.alive)
        .map(|player| HazardReport {
            player_id: player.id,
            strike: find_strike(player, &state.lanes, &state.obstacles, &config.locomotion, &config.hazards),
            support: check_support(player, &state.lanes, &state.obstacles, &config.hazards),
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
