//! Full sessions driven through the public API.

use std::collections::BTreeMap;
use lane_runner::game::events::GameEventData;
use lane_runner::game::obstacle::difficulty_multiplier;
use lane_runner::game::{
    tick, EndPolicy, GamePhase, InputFrame, Level, PlayerId, RenderSnapshot, SessionConfig,
    SessionState, TerrainKind,
};
use lane_runner::records::{ReplayTranscript, ScoreSink};
use lane_runner::core::fixed::from_int;
use lane_runner::FRAME_MS;

fn scripted(t: u32) -> InputFrame {
    match t % 24 {
        0 => InputFrame::forward(),
        6..=9 => InputFrame::lateral(1),
        15..=17 => InputFrame::lateral(-1),
        _ => InputFrame::new(),
    }
}

fn inputs_for(state: &SessionState, t: u32) -> BTreeMap<PlayerId, InputFrame> {
    state.players.keys().map(|id| (*id, scripted(t + id.0 as u32 * 7))).collect()
}

#[test]
fn test_invariants_hold_over_long_session() {
    let config = SessionConfig::default();
    let mut state = SessionState::new(2024);
    state.start(Level::Mixed, &config);

    let mut last_score = 0;
    let mut last_level = state.level;
    let mut last_multiplier = difficulty_multiplier(0);

    for t in 0..3000 {
        let inputs = inputs_for(&state, t);
        let result = tick(&mut state, &inputs, FRAME_MS, &config);

        assert!(state.lanes.is_gapless());
        assert!(state.lanes.front().is_some());
        for player in state.players.values().filter(|p| p.alive) {
            assert!(state.lanes.contains_id(player.lane));
        }
        for obstacle in state.obstacles.values() {
            let lane = state.lanes.get(obstacle.lane).expect("obstacle bound to a live lane");
            assert_eq!(lane.kind, obstacle.kind.terrain());
        }

        assert!(state.best_score() >= last_score);
        assert!(state.level >= last_level);
        let multiplier = difficulty_multiplier(state.best_score());
        assert!(multiplier >= last_multiplier);
        last_score = state.best_score();
        last_level = state.level;
        last_multiplier = multiplier;

        if result.session_ended {
            break;
        }
    }
}

#[test]
fn test_final_score_delivered_once_per_session() {
    let config = SessionConfig::default();
    let mut state = SessionState::new(11);
    state.start(Level::Roads, &config);
    let mut sink: Vec<u32> = Vec::new();

    for session in 0..2 {
        for t in 0..2000 {
            if t == 1500 {
                state.trigger_game_over();
            }
            let inputs = inputs_for(&state, t);
            let result = tick(&mut state, &inputs, FRAME_MS, &config);
            if let Some(score) = result.final_score {
                sink.on_score_finalized(score);
            }
        }
        assert_eq!(state.phase, GamePhase::GameOver);
        assert_eq!(sink.len(), session + 1);
        assert_eq!(state.final_score(), sink.last().copied());

        state.restart(&config);
        assert_eq!(state.best_score(), 0);
    }
}

#[test]
fn test_same_inputs_same_outcome() {
    let config = SessionConfig::default();
    let run = || {
        let mut state = SessionState::new(555);
        state.add_player(PlayerId(0));
        state.add_player(PlayerId(1));
        state.start(Level::River, &config);
        let mut hops = 0;
        for t in 0..1200 {
            let inputs = inputs_for(&state, t);
            let result = tick(&mut state, &inputs, 10 + t % 13, &config);
            hops += result
                .events
                .iter()
                .filter(|e| matches!(e.data, GameEventData::PlayerHopped { .. }))
                .count();
        }
        (state.compute_hash(), state.tick, hops)
    };

    assert_eq!(run(), run());
}

#[test]
fn test_two_player_policies() {
    let config = SessionConfig { end_policy: EndPolicy::FirstDeath, ..Default::default() };
    let mut state = SessionState::new(6);
    state.add_player(PlayerId(0));
    state.add_player(PlayerId(1));
    state.start(Level::Roads, &config);

    assert!(state.kill_player(PlayerId(1), lane_runner::game::DeathCause::Vehicle, config.end_policy));
    let result = tick(&mut state, &BTreeMap::new(), FRAME_MS, &config);
    assert!(result.session_ended);
    assert_eq!(result.final_score, Some(0));
    assert!(state.players[&PlayerId(0)].alive);
}

#[test]
fn test_partial_json_config_changes_generation() {
    let config = SessionConfig::from_json_str(r#"{ "lanes": { "max_consecutive_hazards": 1 } }"#)
        .expect("valid override");
    assert_eq!(config.lanes.max_consecutive_hazards, Some(1));
    assert_eq!(config.max_frame_ms, SessionConfig::default().max_frame_ms);

    let mut state = SessionState::new(77);
    state.start(Level::Mixed, &config);
    let kinds: Vec<TerrainKind> = state.lanes.iter().map(|l| l.kind).collect();
    assert!(kinds.windows(2).all(|w| w[0].is_safe() || w[1].is_safe()));
}

#[test]
fn test_recorded_session_verifies() {
    let config = SessionConfig::default();
    let mut state = SessionState::new(3141);
    state.start(Level::Rails, &config);
    let mut transcript = ReplayTranscript::begin(&state, &config, 0).expect("begin");

    for t in 0..1300 {
        let inputs = inputs_for(&state, t);
        transcript.record_inputs(state.tick, &inputs, FRAME_MS);
        let result = tick(&mut state, &inputs, FRAME_MS, &config);
        transcript.observe(&state, &result);
        if result.session_ended {
            break;
        }
    }
    if !transcript.is_complete() {
        transcript.finalize(&state);
    }

    let bytes = transcript.to_bytes().expect("encode");
    let decoded = ReplayTranscript::from_bytes(&bytes).expect("decode");
    let verified = decoded.verify(&config).expect("replay matches");
    assert_eq!(verified.compute_hash(), state.compute_hash());
}

#[test]
fn test_snapshot_tracks_session() {
    let config = SessionConfig::default();
    let mut state = SessionState::new(90);
    state.start(Level::Roads, &config);
    for t in 0..120 {
        let inputs = inputs_for(&state, t);
        tick(&mut state, &inputs, FRAME_MS, &config);
    }

    let snapshot = RenderSnapshot::capture(&state, &config, true);
    assert_eq!(snapshot.tick, state.tick);
    assert_eq!(snapshot.score, state.best_score());
    assert_eq!(snapshot.players.len(), 1);
    assert!(snapshot.to_json().expect("json").starts_with('{'));
}

#[test]
fn test_world_outlives_fixed_point_range() {
    let mut config = SessionConfig { level_up_score: 0, ..Default::default() };
    config.populate.vehicle.chance = 0;
    config.lanes.grass_width = from_int(64);
    config.lanes.hazard_width = from_int(64);
    config.horizon.generation_distance = from_int(256);
    config.camera.follow_rate = from_int(120);
    config.validate().expect("valid config");

    let mut state = SessionState::new(404);
    state.start(Level::Roads, &config);
    let forward: BTreeMap<PlayerId, InputFrame> = [(PlayerId(0), InputFrame::forward())].into();
    let bound = config.horizon.rebase_threshold + from_int(1024);

    let mut travelled = 0;
    for _ in 0..12_000 {
        let result = tick(&mut state, &forward, FRAME_MS, &config);
        assert!(!result.session_ended);
        assert!(state.lanes.is_gapless());
        assert!(state.lanes.frontier().is_some_and(|f| f < bound));

        let lane_start = state.lanes.get(state.players[&PlayerId(0)].lane).map(|l| l.start);
        let distance = state.horizon.distance_tiles(lane_start.expect("player lane is live"));
        assert!(distance >= travelled);
        travelled = distance;
        if travelled > 40_000 {
            break;
        }
    }

    // Past the 32768 tiles a Q16.16 coordinate can hold
    assert!(travelled > 40_000);
    assert!(state.horizon.origin > 0);
    assert_eq!(state.phase, GamePhase::Playing);
    assert_eq!(state.best_score(), state.players[&PlayerId(0)].hops * 10);
}
