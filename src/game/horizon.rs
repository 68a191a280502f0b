//! World Horizon Manager
//!
//! Streams the world: lanes are generated ahead of the camera and evicted
//! behind it. After an eviction every binding is re-derived from
//! coordinates rather than trusted:
//!
//! - players by the stored start coordinate of their lane (and hop target)
//! - obstacles by containment in a lane of matching terrain
//!
//! Anything that fails to re-resolve is an orphan. Orphaned obstacles are
//! destroyed; orphaned players fall back to the front lane. Only live players
//! are reported, so a dead player riding out an `AllDead` session is moved
//! silently.
//!
//! Coordinates are Q16.16, so the origin cannot stay put forever. Once the
//! front lane starts past `rebase_threshold` every travel-axis coordinate is
//! shifted back so the front lane starts at zero again. Lane ids are
//! unaffected, which keeps every binding intact across the shift.

use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

use crate::core::fixed::{Fixed, FIXED_SCALE, Tiles, from_int, to_fixed};
use crate::game::events::GameEvent;
use crate::game::obstacle::populate_lane;
use crate::game::player::{Locomotion, PlayerId};
use crate::game::state::SessionState;
use crate::game::tick::SessionConfig;

/// Streaming distances.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HorizonConfig {
    /// Lanes must exist this far past the camera coordinate
    pub generation_distance: Fixed,
    /// Lanes ending this far behind the camera coordinate are evicted
    pub eviction_distance: Fixed,
    /// Gap kept behind the near edge of every live player's lane
    pub safety_margin: Fixed,
    /// Front-lane start that triggers an origin shift
    pub rebase_threshold: Fixed,
}

impl Default for HorizonConfig {
    fn default() -> Self {
        Self {
            // 800 px viewport + 500 px lookahead
            generation_distance: to_fixed(32.5),
            // 500 px
            eviction_distance: to_fixed(12.5),
            safety_margin: from_int(5),
            rebase_threshold: from_int(4096),
        }
    }
}

/// Leading and trailing frontiers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldHorizon {
    /// Far edge of the furthest generated lane
    pub generation_frontier: Fixed,
    /// Highest eviction limit applied so far
    pub eviction_frontier: Fixed,
    /// Total distance the origin has been shifted forward (Q16.16, widened)
    pub origin: i64,
}

impl WorldHorizon {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whole tiles from the session start to a current coordinate.
    pub fn distance_tiles(&self, coord: Fixed) -> i64 {
        (self.origin + coord as i64) >> FIXED_SCALE
    }
}

/// Outcome of one eviction pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvictionReport {
    pub lanes_removed: u32,
    pub obstacles_orphaned: u32,
    pub players_snapped: Vec<PlayerId>,
}

/// Generate lanes until `[frontier, frontier + generation_distance]` is covered.
///
/// Returns `(lanes, obstacles)` created.
pub fn ensure_generated_ahead(
    state: &mut SessionState,
    frontier: Fixed,
    config: &SessionConfig,
) -> (u32, u32) {
    let target = frontier.saturating_add(config.horizon.generation_distance);
    let mut lanes_created = 0;
    let mut obstacles_created = 0;

    if state.lanes.is_empty() {
        state.lanes.push_start_lane(&config.lanes);
        lanes_created += 1;
    }

    while state.lanes.frontier().unwrap_or(0) < target {
        let id = state.lanes.generate_next(&mut state.rng, state.level, &config.lanes);
        lanes_created += 1;

        let Some(lane) = state.lanes.get(id) else { continue };
        let spawned = populate_lane(
            lane,
            &mut state.rng,
            &config.populate,
            config.viewport_span,
            &mut state.next_obstacle_id,
        );
        for obstacle in spawned {
            obstacles_created += 1;
            state.obstacles.insert(obstacle.id, obstacle);
        }
    }

    state.horizon.generation_frontier = state.lanes.frontier().unwrap_or(0);
    (lanes_created, obstacles_created)
}

/// Evict lanes behind `threshold`, never touching a live player's lane.
pub fn evict_behind(state: &mut SessionState, threshold: Fixed, config: &SessionConfig) -> EvictionReport {
    let protected = state
        .players
        .values()
        .filter(|p| p.alive)
        .filter_map(|p| state.lanes.get(p.lane))
        .map(|lane| lane.start - config.horizon.safety_margin)
        .min();
    let limit = protected.map_or(threshold, |p| p.min(threshold));

    // Coordinates to re-resolve against after the prefix is gone
    let anchors: Vec<(PlayerId, Option<Fixed>, Option<Fixed>)> = state
        .players
        .values()
        .map(|p| {
            let lane_start = state.lanes.get(p.lane).map(|l| l.start);
            let target_start = match p.motion {
                Locomotion::Advancing { target, .. } => state.lanes.get(target).map(|l| l.start),
                Locomotion::Idle => None,
            };
            (p.id, lane_start, target_start)
        })
        .collect();

    let removed = state.lanes.evict_before(limit);
    let mut report = EvictionReport {
        lanes_removed: removed.len() as u32,
        ..Default::default()
    };
    if removed.is_empty() {
        return report;
    }
    state.horizon.eviction_frontier = state.horizon.eviction_frontier.max(limit);

    let lanes = &state.lanes;
    let Some(front) = lanes.front().map(|l| l.id) else {
        return report;
    };

    for (id, lane_start, target_start) in anchors {
        let Some(player) = state.players.get_mut(&id) else { continue };

        match lane_start.and_then(|start| lanes.find_by_start(start)) {
            Some(lane) => player.lane = lane,
            None => {
                player.lane = front;
                player.motion = Locomotion::Idle;
                if player.alive {
                    report.players_snapped.push(id);
                }
                continue;
            }
        }

        if let Locomotion::Advancing { progress, .. } = player.motion {
            player.motion = match target_start.and_then(|start| lanes.find_by_start(start)) {
                Some(target) if target == player.lane.next() => Locomotion::Advancing { target, progress },
                _ => Locomotion::Idle,
            };
        }
    }

    let mut orphaned = 0;
    state.obstacles.retain(|_, obstacle| {
        match lanes.lane_containing(obstacle.position.x) {
            Some(lane) if lane.kind == obstacle.kind.terrain() => {
                obstacle.lane = lane.id;
                true
            }
            _ => {
                orphaned += 1;
                false
            }
        }
    });
    report.obstacles_orphaned = orphaned;

    report
}

/// Shift every travel-axis coordinate back by `offset`.
pub fn rebase_origin(state: &mut SessionState, offset: Fixed) {
    state.lanes.shift_back(offset);
    for obstacle in state.obstacles.values_mut() {
        obstacle.position.x -= offset;
    }
    state.camera.tracked -= offset;
    state.camera.target -= offset;
    state.horizon.generation_frontier -= offset;
    state.horizon.eviction_frontier -= offset;
    state.horizon.origin += offset as i64;
}

/// Per-tick streaming: generate ahead of the camera, evict behind it.
pub fn update_horizon(state: &mut SessionState, config: &SessionConfig) {
    let camera = state.camera.tracked;

    let (lanes, obstacles) = ensure_generated_ahead(state, camera, config);
    if lanes > 0 {
        let event = GameEvent::lanes_generated(state.tick, lanes, obstacles);
        state.push_event(event);
    }

    let threshold = camera - config.horizon.eviction_distance;
    let report = evict_behind(state, threshold, config);
    if report.lanes_removed == 0 {
        return;
    }

    debug!(
        tick = state.tick,
        removed = report.lanes_removed,
        orphaned = report.obstacles_orphaned,
        eviction_frontier = %Tiles(state.horizon.eviction_frontier),
        "lanes evicted"
    );
    let event = GameEvent::lanes_evicted(state.tick, report.lanes_removed, report.obstacles_orphaned);
    state.push_event(event);

    for id in report.players_snapped {
        warn!(player = id.0, tick = state.tick, "player lane lost in eviction, moved to front lane");
        let event = GameEvent::player_snapped(state.tick, id);
        state.push_event(event);
    }

    let front = state.lanes.front().map_or(0, |l| l.start);
    if front >= config.horizon.rebase_threshold {
        rebase_origin(state, front);
        debug!(
            tick = state.tick,
            shift = %Tiles(front),
            distance = state.horizon.distance_tiles(0),
            "travel origin rebased"
        );
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{FIXED_HALF, GRASS_LANE_WIDTH, WIDE_LANE_WIDTH};
    use crate::core::vec2::FixedVec2;
    use crate::game::lane::{LaneId, Level, TerrainKind};
    use crate::game::obstacle::{Obstacle, ObstacleId, ObstacleKind};
    use crate::game::player::PlayerState;
    use crate::game::events::GameEventData;
    use crate::game::state::GamePhase;
    use proptest::prelude::*;

    /// Session with `count` alternating grass/road lanes and one player.
    fn manual_session(count: u32, player_lane: u32) -> SessionState {
        let mut state = SessionState::new(1);
        for i in 0..count {
            if i % 2 == 0 {
                state.lanes.push_lane(TerrainKind::Grass, 0, GRASS_LANE_WIDTH);
            } else {
                state.lanes.push_lane(TerrainKind::Road, 1, WIDE_LANE_WIDTH);
            }
        }
        state.players.insert(PlayerId(0), PlayerState::new(PlayerId(0), LaneId(player_lane), from_int(7)));
        state.phase = GamePhase::Playing;
        state
    }

    #[test]
    fn test_generation_covers_requested_range() {
        let config = SessionConfig::default();
        let mut state = SessionState::new(8);
        let (lanes, _) = ensure_generated_ahead(&mut state, from_int(10), &config);

        assert!(lanes > 0);
        assert!(state.lanes.is_gapless());
        assert!(state.lanes.frontier().unwrap_or(0) >= from_int(10) + config.horizon.generation_distance);
        assert!(state.lanes.front().is_some_and(|l| l.kind == TerrainKind::Grass));

        // Already covered: nothing new
        assert_eq!(ensure_generated_ahead(&mut state, from_int(10), &config), (0, 0));
    }

    #[test]
    fn test_generated_obstacles_bound_to_matching_lanes() {
        let config = SessionConfig::default();
        let mut state = SessionState::new(21);
        state.level = Level::Mixed;
        ensure_generated_ahead(&mut state, 0, &config);

        assert!(!state.obstacles.is_empty());
        for obstacle in state.obstacles.values() {
            let lane = state.lanes.get(obstacle.lane).expect("bound lane exists");
            assert_eq!(lane.kind, obstacle.kind.terrain());
            assert!(lane.contains(obstacle.position.x));
        }
    }

    #[test]
    fn test_eviction_protects_player_lane() {
        let config = SessionConfig::default();
        let mut state = manual_session(30, 10);
        let start = state.lanes.get(LaneId(10)).map(|l| l.start).expect("lane 10");

        let report = evict_behind(&mut state, from_int(1000), &config);
        assert!(report.lanes_removed > 0);
        assert!(state.lanes.contains_id(LaneId(10)));
        assert_eq!(state.lanes.find_by_start(start), Some(LaneId(10)));
        assert_eq!(state.players[&PlayerId(0)].lane, LaneId(10));
        assert!(report.players_snapped.is_empty());
        // Everything ending before start - margin is gone
        assert!(state.lanes.front().is_some_and(|l| l.end() >= start - config.horizon.safety_margin));
    }

    #[test]
    fn test_eviction_during_hop_keeps_target_and_progress() {
        let config = SessionConfig::default();
        let mut state = manual_session(30, 12);
        if let Some(player) = state.players.get_mut(&PlayerId(0)) {
            player.motion = Locomotion::Advancing { target: LaneId(13), progress: FIXED_HALF };
        }

        let report = evict_behind(&mut state, from_int(1000), &config);
        assert!(report.lanes_removed > 0);

        let player = &state.players[&PlayerId(0)];
        assert_eq!(player.lane, LaneId(12));
        assert_eq!(player.motion, Locomotion::Advancing { target: LaneId(13), progress: FIXED_HALF });
        assert_eq!(state.lanes.index_of(player.lane), Some(state.lanes.index_of(LaneId(12)).unwrap_or(0)));
        assert_eq!(state.lanes.index_of(LaneId(13)), state.lanes.index_of(LaneId(12)).map(|i| i + 1));
    }

    #[test]
    fn test_dead_player_lane_not_protected() {
        let config = SessionConfig::default();
        let mut state = manual_session(30, 2);
        state.players.insert(PlayerId(1), PlayerState::new(PlayerId(1), LaneId(20), from_int(3)));
        if let Some(player) = state.players.get_mut(&PlayerId(0)) {
            player.alive = false;
        }

        let report = evict_behind(&mut state, from_int(1000), &config);
        assert!(report.lanes_removed > 0);
        assert!(!state.lanes.contains_id(LaneId(2)));
        assert!(report.players_snapped.is_empty());

        let front = state.lanes.front().map(|l| l.id).expect("front lane");
        assert_eq!(state.players[&PlayerId(0)].lane, front);
        assert_eq!(state.lane_index_of(PlayerId(0)), Some(0));
        assert_eq!(state.players[&PlayerId(1)].lane, LaneId(20));

        // Later evictions keep moving the dead player without reporting it
        for i in 0..10 {
            state.lanes.push_lane(TerrainKind::Grass, 0, GRASS_LANE_WIDTH);
            if let Some(player) = state.players.get_mut(&PlayerId(1)) {
                player.lane = LaneId(21 + i);
            }
            let report = evict_behind(&mut state, from_int(1000), &config);
            assert!(report.players_snapped.is_empty());
            assert_eq!(state.lane_index_of(PlayerId(0)), Some(0));
        }
    }

    #[test]
    fn test_dead_players_raise_no_snap_events() {
        let config = SessionConfig::default();
        let mut state = manual_session(40, 3);
        if let Some(player) = state.players.get_mut(&PlayerId(0)) {
            player.alive = false;
        }
        state.camera.tracked = from_int(30);

        update_horizon(&mut state, &config);
        let events = state.take_events();
        assert!(events.iter().any(|e| matches!(e.data, GameEventData::LanesEvicted { .. })));
        assert!(!events.iter().any(|e| matches!(e.data, GameEventData::PlayerSnapped { .. })));
    }

    #[test]
    fn test_rebase_shifts_every_coordinate() {
        let config = SessionConfig::default();
        let mut state = SessionState::new(17);
        state.start(Level::Mixed, &config);
        let shift = state.lanes.at_index(2).map(|l| l.start).expect("lane 2");
        state.lanes.evict_before(shift + 1);

        let lanes: Vec<(LaneId, Fixed)> = state.lanes.iter().map(|l| (l.id, l.start)).collect();
        let obstacles: Vec<Fixed> = state.obstacles.values().map(|o| o.position.x).collect();
        let camera = state.camera;
        let horizon = state.horizon;

        rebase_origin(&mut state, shift);

        assert_eq!(state.lanes.front().map(|l| l.start), Some(0));
        assert!(state.lanes.is_gapless());
        for ((id, start), lane) in lanes.iter().zip(state.lanes.iter()) {
            assert_eq!(lane.id, *id);
            assert_eq!(lane.start, start - shift);
        }
        for (x, obstacle) in obstacles.iter().zip(state.obstacles.values()) {
            assert_eq!(obstacle.position.x, x - shift);
        }
        assert_eq!(state.camera.tracked, camera.tracked - shift);
        assert_eq!(state.camera.target, camera.target - shift);
        assert_eq!(state.horizon.generation_frontier, horizon.generation_frontier - shift);
        assert_eq!(state.horizon.origin, shift as i64);
        assert_eq!(state.horizon.distance_tiles(state.lanes.front().map_or(0, |l| l.start)), (shift >> 16) as i64);
    }

    #[test]
    fn test_mismatched_obstacle_orphaned() {
        let config = SessionConfig::default();
        let mut state = manual_session(30, 20);
        let road = state.lanes.get(LaneId(21)).cloned().expect("road lane");

        // A log sitting on a road lane cannot re-resolve
        state.insert_obstacle(Obstacle {
            id: ObstacleId(0),
            kind: ObstacleKind::Log,
            lane: road.id,
            position: FixedVec2::new(road.center(), from_int(5)),
            half_extents: FixedVec2::new(FIXED_HALF / 2, FIXED_HALF),
            speed: from_int(2),
            direction: 1,
            style: None,
        });
        state.insert_obstacle(Obstacle {
            id: ObstacleId(1),
            kind: ObstacleKind::Vehicle,
            lane: road.id,
            position: FixedVec2::new(road.center(), from_int(9)),
            half_extents: FixedVec2::new(FIXED_HALF, FIXED_HALF / 2),
            speed: from_int(2),
            direction: 1,
            style: None,
        });

        let report = evict_behind(&mut state, from_int(1000), &config);
        assert!(report.lanes_removed > 0);
        assert_eq!(report.obstacles_orphaned, 1);
        assert!(state.obstacles.contains_key(&ObstacleId(1)));
        assert!(!state.obstacles.contains_key(&ObstacleId(0)));
    }

    #[test]
    fn test_nothing_evicted_below_threshold() {
        let config = SessionConfig::default();
        let mut state = manual_session(10, 5);
        let report = evict_behind(&mut state, -from_int(3), &config);
        assert_eq!(report, EvictionReport::default());
        assert_eq!(state.lanes.len(), 10);
    }

    proptest! {
        #[test]
        fn prop_eviction_never_removes_occupied_lane(
            lanes in 5u32..60,
            lane_pick in 0u32..60,
            threshold in -10i32..400,
        ) {
            let config = SessionConfig::default();
            let occupied = lane_pick % lanes;
            let mut state = manual_session(lanes, occupied);
            let start = state.lanes.get(LaneId(occupied)).map(|l| l.start);

            evict_behind(&mut state, from_int(threshold), &config);

            prop_assert!(state.lanes.is_gapless());
            prop_assert_eq!(start.and_then(|s| state.lanes.find_by_start(s)), Some(LaneId(occupied)));
            prop_assert_eq!(state.players[&PlayerId(0)].lane, LaneId(occupied));
        }
    }
}
