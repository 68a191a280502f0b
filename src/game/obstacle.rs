//! Obstacle Population and Motion
//!
//! Vehicles and trains are lethal and wrap around the free axis like endless
//! traffic. Logs are rideable and bounce between the river banks.
//!
//! ```text
//!   free axis ▶   -extent        0                    span      span+extent
//!   vehicle/train     │◀─── wrap ────────────────────────────────▶│
//!   log                          │◀──── bounce ──────────▶│
//! ```

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, FIXED_ONE, fixed_mul, to_fixed};
use crate::core::rng::DeterministicRng;
use crate::core::vec2::FixedVec2;
use crate::game::collision::Aabb;
use crate::game::lane::{Lane, LaneId, TerrainKind};

// =============================================================================
// TYPES
// =============================================================================

/// Permanent obstacle identifier, unique within a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ObstacleId(pub u32);

/// Obstacle class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ObstacleKind {
    Vehicle = 0,
    Train = 1,
    Log = 2,
}

/// What happens when an obstacle reaches the edge of the free axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Boundary {
    /// Teleport to the opposite bound, keeping direction
    Wrap,
    /// Reverse direction at the bound
    Bounce,
}

impl ObstacleKind {
    /// Terrain an obstacle of this kind lives on.
    pub fn terrain(self) -> TerrainKind {
        match self {
            ObstacleKind::Vehicle => TerrainKind::Road,
            ObstacleKind::Train => TerrainKind::Rail,
            ObstacleKind::Log => TerrainKind::River,
        }
    }

    /// Obstacle kind spawned on a terrain, if any.
    pub fn for_terrain(kind: TerrainKind) -> Option<ObstacleKind> {
        match kind {
            TerrainKind::Grass => None,
            TerrainKind::Road => Some(ObstacleKind::Vehicle),
            TerrainKind::Rail => Some(ObstacleKind::Train),
            TerrainKind::River => Some(ObstacleKind::Log),
        }
    }

    /// Touching this obstacle kills.
    #[inline]
    pub fn is_lethal(self) -> bool {
        !matches!(self, ObstacleKind::Log)
    }

    pub fn boundary(self) -> Boundary {
        match self {
            ObstacleKind::Log => Boundary::Bounce,
            _ => Boundary::Wrap,
        }
    }
}

/// Cosmetic vehicle variant, picked at spawn for the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStyle {
    Car,
    Truck,
    Bike,
}

const VEHICLE_STYLES: [VehicleStyle; 3] = [VehicleStyle::Car, VehicleStyle::Truck, VehicleStyle::Bike];

/// A moving hazard or platform bound to one lane.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: ObstacleId,
    pub kind: ObstacleKind,
    pub lane: LaneId,
    /// x = lane center (fixed), y = free-axis position (moving)
    pub position: FixedVec2,
    pub half_extents: FixedVec2,
    /// Speed magnitude in tiles per second
    pub speed: Fixed,
    /// +1 or -1
    pub direction: i8,
    pub style: Option<VehicleStyle>,
}

impl Obstacle {
    /// Bounding box in world coordinates.
    #[inline]
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.position, self.half_extents)
    }

    /// Full length along the free axis.
    #[inline]
    pub fn free_length(&self) -> Fixed {
        self.half_extents.y * 2
    }
}

// =============================================================================
// POPULATION
// =============================================================================

/// Spawn parameters for one obstacle kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnRule {
    /// Probability a lane of this terrain gets any obstacles (FIXED_ONE = always)
    pub chance: Fixed,
    pub min_count: u32,
    pub max_count: u32,
    /// Extent along the travel axis
    pub travel_length: Fixed,
    /// Extent along the free axis
    pub free_length: Fixed,
    pub min_speed: Fixed,
    pub max_speed: Fixed,
}

impl Default for SpawnRule {
    fn default() -> Self {
        PopulateConfig::default().vehicle
    }
}

/// Obstacle population settings for every kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulateConfig {
    pub vehicle: SpawnRule,
    pub train: SpawnRule,
    pub log: SpawnRule,
}

impl Default for PopulateConfig {
    fn default() -> Self {
        Self {
            vehicle: SpawnRule {
                chance: FIXED_ONE,
                min_count: 2,
                max_count: 4,
                travel_length: to_fixed(0.875),
                free_length: to_fixed(0.625),
                min_speed: to_fixed(2.25),
                max_speed: to_fixed(5.25),
            },
            train: SpawnRule {
                chance: FIXED_ONE,
                min_count: 1,
                max_count: 2,
                travel_length: to_fixed(0.75),
                free_length: to_fixed(1.5),
                min_speed: to_fixed(3.0),
                max_speed: to_fixed(7.5),
            },
            log: SpawnRule {
                chance: FIXED_ONE,
                min_count: 2,
                max_count: 4,
                travel_length: to_fixed(0.5),
                free_length: to_fixed(1.25),
                min_speed: to_fixed(1.5),
                max_speed: to_fixed(4.5),
            },
        }
    }
}

impl PopulateConfig {
    pub fn rule_for(&self, kind: ObstacleKind) -> &SpawnRule {
        match kind {
            ObstacleKind::Vehicle => &self.vehicle,
            ObstacleKind::Train => &self.train,
            ObstacleKind::Log => &self.log,
        }
    }
}

/// Spawn the obstacles for a freshly generated lane.
///
/// Vehicles and trains take the lane's traffic direction; each log flips its
/// own coin. `next_id` is advanced once per spawned obstacle.
pub fn populate_lane(
    lane: &Lane,
    rng: &mut DeterministicRng,
    config: &PopulateConfig,
    span: Fixed,
    next_id: &mut u32,
) -> Vec<Obstacle> {
    let Some(kind) = ObstacleKind::for_terrain(lane.kind) else {
        return Vec::new();
    };
    let rule = config.rule_for(kind);

    if !rng.next_bool(rule.chance) {
        return Vec::new();
    }

    let count = rng.next_int_range(rule.min_count as i32, rule.max_count as i32).max(0);
    let half_extents = FixedVec2::new(rule.travel_length >> 1, rule.free_length >> 1);

    (0..count)
        .map(|_| {
            let free = rng.next_fixed(span);
            let speed = rng.next_fixed_range(rule.min_speed, rule.max_speed);
            let direction = if kind.boundary() == Boundary::Bounce || lane.direction == 0 {
                rng.next_sign()
            } else {
                lane.direction
            };
            let style = if kind == ObstacleKind::Vehicle {
                rng.choose(&VEHICLE_STYLES).copied()
            } else {
                None
            };

            let id = ObstacleId(*next_id);
            *next_id += 1;

            Obstacle {
                id,
                kind,
                lane: lane.id,
                position: FixedVec2::new(lane.center(), free),
                half_extents,
                speed,
                direction,
                style,
            }
        })
        .collect()
}

// =============================================================================
// MOTION
// =============================================================================

/// Speed multiplier for a given score: +10% per 100 points.
pub fn difficulty_multiplier(score: u32) -> Fixed {
    let bonus = (score as i64 * FIXED_ONE as i64) / 1000;
    (FIXED_ONE as i64 + bonus).min(i32::MAX as i64) as Fixed
}

/// Advance one obstacle along the free axis and apply its boundary policy.
pub fn advance_obstacle(obstacle: &mut Obstacle, dt: Fixed, multiplier: Fixed, span: Fixed) {
    let step = fixed_mul(fixed_mul(obstacle.speed, dt), multiplier);
    let y = if obstacle.direction >= 0 {
        obstacle.position.y + step
    } else {
        obstacle.position.y - step
    };

    match obstacle.kind.boundary() {
        Boundary::Wrap => {
            let extent = obstacle.free_length();
            let (min, max) = (-extent, span + extent);
            obstacle.position.y = if obstacle.direction >= 0 && y > max {
                min
            } else if obstacle.direction < 0 && y < min {
                max
            } else {
                y
            };
        }
        Boundary::Bounce => {
            if y >= span {
                obstacle.position.y = span;
                obstacle.direction = -1;
            } else if y <= 0 {
                obstacle.position.y = 0;
                obstacle.direction = 1;
            } else {
                obstacle.position.y = y;
            }
        }
    }
}

/// Advance every obstacle in id order.
pub fn advance_all(
    obstacles: &mut BTreeMap<ObstacleId, Obstacle>,
    dt: Fixed,
    multiplier: Fixed,
    span: Fixed,
) {
    for obstacle in obstacles.values_mut() {
        advance_obstacle(obstacle, dt, multiplier, span);
    }
}

// =============================================================================
// TESTS
// =============================================================================
