//! Render Snapshot
//!
//! Read-only view of a session for the renderer. Fixed-point values are
//! converted to `f32` tiles here and nowhere else.

use serde::Serialize;

use crate::core::fixed::{Fixed, to_float};
use crate::game::lane::{Level, TerrainKind};
use crate::game::obstacle::{ObstacleKind, VehicleStyle};
use crate::game::player::{DeathCause, Locomotion};
use crate::game::state::{GamePhase, SessionState};
use crate::game::tick::SessionConfig;

/// One lane as the renderer sees it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LaneView {
    pub index: u32,
    pub start: f32,
    pub width: f32,
    pub kind: TerrainKind,
    pub direction: i8,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ObstacleView {
    pub id: u32,
    pub kind: ObstacleKind,
    pub lane_index: u32,
    /// (travel, free)
    pub position: (f32, f32),
    /// Half extents (travel, free)
    pub extents: (f32, f32),
    pub direction: i8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<VehicleStyle>,
}

/// Locomotion phase name for the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionView {
    Idle,
    Advancing,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlayerView {
    pub id: u8,
    pub lane_index: u32,
    pub travel: f32,
    pub free: f32,
    pub motion: MotionView,
    /// Hop progress in [0, 1]
    pub progress: f32,
    pub alive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub death: Option<DeathCause>,
    pub score: u32,
}

/// Everything a frame of rendering needs.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderSnapshot {
    pub tick: u32,
    pub phase: GamePhase,
    pub level: Level,
    pub score: u32,
    pub camera: f32,
    pub lanes: Vec<LaneView>,
    pub obstacles: Vec<ObstacleView>,
    pub players: Vec<PlayerView>,
}

impl RenderSnapshot {
    /// Capture the session. With `visible_only`, lanes outside the camera
    /// window and their obstacles are left out.
    pub fn capture(state: &SessionState, config: &SessionConfig, visible_only: bool) -> Self {
        let window_start = state.camera.tracked;
        let window_end = window_start + config.camera.view_length;
        let in_view = |start: Fixed, end: Fixed| !visible_only || (end > window_start && start < window_end);

        let lanes = state
            .lanes
            .iter()
            .filter(|lane| in_view(lane.start, lane.end()))
            .filter_map(|lane| {
                Some(LaneView {
                    index: state.lanes.index_of(lane.id)?,
                    start: to_float(lane.start),
                    width: to_float(lane.width),
                    kind: lane.kind,
                    direction: lane.direction,
                })
            })
            .collect();

        let obstacles = state
            .obstacles
            .values()
            .filter(|o| state.lanes.get(o.lane).is_some_and(|lane| in_view(lane.start, lane.end())))
            .filter_map(|o| {
                Some(ObstacleView {
                    id: o.id.0,
                    kind: o.kind,
                    lane_index: state.lanes.index_of(o.lane)?,
                    position: o.position.to_floats(),
                    extents: o.half_extents.to_floats(),
                    direction: o.direction,
                    style: o.style,
                })
            })
            .collect();

        let players = state
            .players
            .values()
            .map(|p| PlayerView {
                id: p.id.0,
                lane_index: state.lanes.index_of(p.lane).unwrap_or(0),
                travel: p.travel_position(&state.lanes).map(to_float).unwrap_or(0.0),
                free: to_float(p.free),
                motion: match p.motion {
                    Locomotion::Idle => MotionView::Idle,
                    Locomotion::Advancing { .. } => MotionView::Advancing,
                },
                progress: to_float(p.progress()),
                alive: p.alive,
                death: p.death,
                score: p.score,
            })
            .collect();

        Self {
            tick: state.tick,
            phase: state.phase,
            level: state.level,
            score: state.best_score(),
            camera: to_float(state.camera.tracked),
            lanes,
            obstacles,
            players,
        }
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::player::PlayerId;

    fn started(seed: u64) -> (SessionState, SessionConfig) {
        let config = SessionConfig::default();
        let mut state = SessionState::new(seed);
        state.start(Level::Mixed, &config);
        (state, config)
    }

    #[test]
    fn test_full_snapshot_lists_everything() {
        let (state, config) = started(3);
        let snapshot = RenderSnapshot::capture(&state, &config, false);

        assert_eq!(snapshot.phase, GamePhase::Playing);
        assert_eq!(snapshot.lanes.len(), state.lanes.len());
        assert_eq!(snapshot.obstacles.len(), state.obstacles.len());
        assert_eq!(snapshot.players.len(), 1);
        assert_eq!(snapshot.lanes[0].index, 0);
        assert_eq!(snapshot.lanes[0].kind, TerrainKind::Grass);

        let player = &snapshot.players[0];
        assert_eq!(player.id, 0);
        assert_eq!(player.motion, MotionView::Idle);
        assert_eq!(player.lane_index, 0);
        assert!(player.alive);
    }

    #[test]
    fn test_visible_snapshot_is_windowed() {
        let (state, config) = started(3);
        let snapshot = RenderSnapshot::capture(&state, &config, true);
        let window_start = to_float(state.camera.tracked);
        let window_end = window_start + to_float(config.camera.view_length);

        assert!(!snapshot.lanes.is_empty());
        assert!(snapshot.lanes.len() < state.lanes.len());
        for lane in &snapshot.lanes {
            assert!(lane.start + lane.width > window_start);
            assert!(lane.start < window_end);
        }
        let visible: Vec<u32> = snapshot.lanes.iter().map(|l| l.index).collect();
        for obstacle in &snapshot.obstacles {
            assert!(visible.contains(&obstacle.lane_index));
        }
    }

    #[test]
    fn test_snapshot_json() {
        let (mut state, config) = started(8);
        state.request_forward(PlayerId(0), &config).expect("lane ahead");
        let json = RenderSnapshot::capture(&state, &config, true).to_json().expect("json");

        assert!(json.contains("\"phase\":\"playing\""));
        assert!(json.contains("\"motion\":\"advancing\""));
        assert!(json.contains("\"score\":10"));
    }
}
