//! Lane Sequence
//!
//! The spine of the world: an ordered, gapless run of lane strips along the
//! travel axis. Lanes are appended at the far end and evicted from the near
//! end, and each one keeps the permanent [`LaneId`] it was created with.
//!
//! ```text
//!   travel axis ──────────────────────────────────────────▶
//!   ┌───────┬───────────────┬───────┬───────────────┬─────
//!   │ grass │  road  (+1)   │ grass │  river        │ ...
//!   └───────┴───────────────┴───────┴───────────────┴─────
//!   id 7     id 8            id 9    id 10
//!   index 0  index 1         index 2 index 3     (index = id - front id)
//! ```

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, GRASS_LANE_WIDTH, WIDE_LANE_WIDTH};
use crate::core::rng::DeterministicRng;

// =============================================================================
// IDS
// =============================================================================

/// Permanent lane identifier. Ids grow in travel order and are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct LaneId(pub u32);

impl LaneId {
    /// The id of the lane directly ahead.
    #[inline]
    pub const fn next(self) -> LaneId {
        LaneId(self.0 + 1)
    }
}

// =============================================================================
// TERRAIN
// =============================================================================

/// Terrain of a lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum TerrainKind {
    Grass = 0,
    Road = 1,
    Rail = 2,
    River = 3,
}

impl TerrainKind {
    /// Grass is the only terrain that can be stood on without risk.
    #[inline]
    pub fn is_safe(self) -> bool {
        matches!(self, TerrainKind::Grass)
    }

    /// Whether obstacles on this terrain share a traffic direction.
    #[inline]
    pub fn has_traffic(self) -> bool {
        matches!(self, TerrainKind::Road | TerrainKind::Rail)
    }
}

// =============================================================================
// DIFFICULTY TIERS
// =============================================================================

/// Difficulty tier. Controls which terrains the generator draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Level {
    #[default]
    Roads = 1,
    Rails = 2,
    River = 3,
    Mixed = 4,
}

impl Level {
    pub const MAX: Level = Level::Mixed;

    /// Level from its 1-based number.
    pub fn from_number(number: u8) -> Option<Level> {
        match number {
            1 => Some(Level::Roads),
            2 => Some(Level::Rails),
            3 => Some(Level::River),
            4 => Some(Level::Mixed),
            _ => None,
        }
    }

    #[inline]
    pub fn number(self) -> u8 {
        self as u8
    }

    /// Terrain weights for this tier, indexed by `TerrainKind as usize`.
    pub fn terrain_weights(self) -> [u32; 4] {
        //                 grass road rail river
        match self {
            Level::Roads => [40, 60, 0, 0],
            Level::Rails => [40, 0, 60, 0],
            Level::River => [40, 0, 0, 60],
            Level::Mixed => [10, 35, 30, 25],
        }
    }
}

const TERRAINS: [TerrainKind; 4] = [
    TerrainKind::Grass,
    TerrainKind::Road,
    TerrainKind::Rail,
    TerrainKind::River,
];

// =============================================================================
// LANE
// =============================================================================

/// One strip of world perpendicular to the travel direction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lane {
    pub id: LaneId,
    /// Near edge on the travel axis
    pub start: Fixed,
    pub width: Fixed,
    pub kind: TerrainKind,
    /// Traffic direction (+1/-1) for road and rail, 0 otherwise
    pub direction: i8,
}

impl Lane {
    /// Far edge on the travel axis.
    #[inline]
    pub fn end(&self) -> Fixed {
        self.start + self.width
    }

    /// Travel-axis center of the lane.
    #[inline]
    pub fn center(&self) -> Fixed {
        self.start + (self.width >> 1)
    }

    /// Half-open containment: `start <= coord < end`.
    #[inline]
    pub fn contains(&self, coord: Fixed) -> bool {
        coord >= self.start && coord < self.end()
    }
}

// =============================================================================
// GENERATION CONFIG
// =============================================================================

/// Lane generation settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneGenConfig {
    /// Width of grass lanes
    pub grass_width: Fixed,
    /// Width of road, rail and river lanes
    pub hazard_width: Fixed,
    /// Longest allowed run of non-safe lanes; `None` disables the cap
    pub max_consecutive_hazards: Option<u32>,
}

impl Default for LaneGenConfig {
    fn default() -> Self {
        Self {
            grass_width: GRASS_LANE_WIDTH,
            hazard_width: WIDE_LANE_WIDTH,
            max_consecutive_hazards: Some(4),
        }
    }
}

impl LaneGenConfig {
    pub fn width_of(&self, kind: TerrainKind) -> Fixed {
        if kind.is_safe() { self.grass_width } else { self.hazard_width }
    }
}

/// Pick the terrain of the next lane.
///
/// Once `hazard_run` reaches the cap the draw is skipped and grass is forced.
pub fn select_terrain(
    rng: &mut DeterministicRng,
    level: Level,
    hazard_run: u32,
    config: &LaneGenConfig,
) -> TerrainKind {
    if let Some(cap) = config.max_consecutive_hazards {
        if hazard_run >= cap {
            return TerrainKind::Grass;
        }
    }
    TERRAINS[rng.pick_weighted(&level.terrain_weights())]
}

// =============================================================================
// LANE SEQUENCE
// =============================================================================

/// Ordered, gapless lane storage keyed by permanent id.
#[derive(Clone, Debug, Default)]
pub struct LaneSequence {
    lanes: BTreeMap<LaneId, Lane>,
    next_id: u32,
    /// Non-safe lanes at the far end, for the consecutive-hazard cap
    hazard_run: u32,
}

impl LaneSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every lane and restart ids from zero.
    pub fn reset(&mut self) {
        self.lanes.clear();
        self.next_id = 0;
        self.hazard_run = 0;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Nearest lane.
    pub fn front(&self) -> Option<&Lane> {
        self.lanes.values().next()
    }

    /// Furthest lane.
    pub fn back(&self) -> Option<&Lane> {
        self.lanes.values().next_back()
    }

    #[inline]
    pub fn get(&self, id: LaneId) -> Option<&Lane> {
        self.lanes.get(&id)
    }

    #[inline]
    pub fn contains_id(&self, id: LaneId) -> bool {
        self.lanes.contains_key(&id)
    }

    /// Lanes in travel order.
    pub fn iter(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.values()
    }

    /// Far edge of the furthest lane, the generation frontier.
    pub fn frontier(&self) -> Option<Fixed> {
        self.back().map(Lane::end)
    }

    /// Current non-safe run length at the far end.
    #[inline]
    pub fn hazard_run(&self) -> u32 {
        self.hazard_run
    }

    /// Position of a lane counted from the front.
    pub fn index_of(&self, id: LaneId) -> Option<u32> {
        let front = self.front()?;
        if self.lanes.contains_key(&id) {
            Some(id.0 - front.id.0)
        } else {
            None
        }
    }

    /// Lane at a position counted from the front.
    pub fn at_index(&self, index: u32) -> Option<&Lane> {
        let front = self.front()?;
        self.lanes.get(&LaneId(front.id.0.checked_add(index)?))
    }

    /// Find the lane whose near edge is exactly `start`.
    pub fn find_by_start(&self, start: Fixed) -> Option<LaneId> {
        self.lane_containing(start)
            .filter(|lane| lane.start == start)
            .map(|lane| lane.id)
    }

    /// Lane whose `[start, end)` range contains `coord`.
    pub fn lane_containing(&self, coord: Fixed) -> Option<&Lane> {
        let front = self.front()?;
        let back = self.back()?;
        if coord < front.start || coord >= back.end() {
            return None;
        }
        // Lanes are sorted and gapless, so a binary search over ids works
        let mut lo = front.id.0;
        let mut hi = back.id.0;
        while lo <= hi {
            let mid = lo + (hi - lo) / 2;
            let lane = self.lanes.get(&LaneId(mid))?;
            if coord < lane.start {
                hi = mid.checked_sub(1)?;
            } else if coord >= lane.end() {
                lo = mid + 1;
            } else {
                return Some(lane);
            }
        }
        None
    }

    /// Append a lane directly after the current far edge.
    pub fn push_lane(&mut self, kind: TerrainKind, direction: i8, width: Fixed) -> LaneId {
        let start = self.frontier().unwrap_or(0);
        let id = LaneId(self.next_id);
        self.next_id += 1;

        let direction = if kind.has_traffic() { direction.signum() } else { 0 };
        self.lanes.insert(id, Lane { id, start, width, kind, direction });

        self.hazard_run = if kind.is_safe() { 0 } else { self.hazard_run + 1 };
        id
    }

    /// Append the always-safe lane a session starts on.
    pub fn push_start_lane(&mut self, config: &LaneGenConfig) -> LaneId {
        self.push_lane(TerrainKind::Grass, 0, config.grass_width)
    }

    /// Draw and append the next lane for the given tier.
    pub fn generate_next(
        &mut self,
        rng: &mut DeterministicRng,
        level: Level,
        config: &LaneGenConfig,
    ) -> LaneId {
        let kind = select_terrain(rng, level, self.hazard_run, config);
        let direction = if kind.has_traffic() { rng.next_sign() } else { 0 };
        self.push_lane(kind, direction, config.width_of(kind))
    }

    /// Remove the prefix of lanes whose far edge is below `limit`.
    ///
    /// The furthest lane always survives so the sequence is never empty.
    /// Returns the removed lanes in travel order.
    pub fn evict_before(&mut self, limit: Fixed) -> Vec<Lane> {
        let mut removed = Vec::new();
        while self.lanes.len() > 1 {
            let Some(entry) = self.lanes.first_entry() else { break };
            if entry.get().end() >= limit {
                break;
            }
            removed.push(entry.remove());
        }
        removed
    }

    /// Move every lane `offset` back along the travel axis.
    pub fn shift_back(&mut self, offset: Fixed) {
        for lane in self.lanes.values_mut() {
            lane.start -= offset;
        }
    }

    /// Check the contiguity invariant over the whole sequence.
    pub fn is_gapless(&self) -> bool {
        self.lanes
            .values()
            .zip(self.lanes.values().skip(1))
            .all(|(a, b)| a.end() == b.start && a.id.next() == b.id)
    }
}

// =============================================================================
// TESTS
// =============================================================================
