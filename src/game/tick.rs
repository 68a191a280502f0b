//! Frame Tick
//!
//! Advances a session by one frame. Order within a tick:
//!
//! 1. Phase guard (only `Playing` simulates)
//! 2. Clamp the frame delta
//! 3. Apply input intents (lateral, then forward requests)
//! 4. Advance hops and cooldowns
//! 5. Move obstacles, scaled by the difficulty multiplier
//! 6. Evaluate hazards (strikes, then river support)
//! 7. Camera follow
//! 8. Stream the world (generate ahead, evict behind)
//! 9. Level promotion

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::info;

use crate::core::fixed::{Fixed, VIEWPORT_SPAN, millis_to_fixed};
use crate::game::camera::CameraConfig;
use crate::game::collision::{check_all_hazards, HazardConfig, Support};
use crate::game::events::GameEvent;
use crate::game::horizon::{update_horizon, HorizonConfig};
use crate::game::input::{InputFrame, PlayerInputBuffer};
use crate::game::lane::{LaneGenConfig, Level};
use crate::game::obstacle::{advance_all, difficulty_multiplier, PopulateConfig};
use crate::game::player::{DeathCause, HopOutcome, LocomotionConfig, MoveRejected, PlayerId};
use crate::game::state::{EndPolicy, GamePhase, SessionState};

// =============================================================================
// CONFIG
// =============================================================================

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config value: {0}")]
    Invalid(&'static str),
}

/// Configuration for a session. Missing JSON fields take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Free-axis span of the play field
    pub viewport_span: Fixed,
    /// Upper bound on a single frame delta
    pub max_frame_ms: u32,
    /// Points per level promotion
    pub level_up_score: u32,
    pub end_policy: EndPolicy,
    pub lanes: LaneGenConfig,
    pub populate: PopulateConfig,
    pub locomotion: LocomotionConfig,
    pub hazards: HazardConfig,
    pub camera: CameraConfig,
    pub horizon: HorizonConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            viewport_span: VIEWPORT_SPAN,
            max_frame_ms: 100,
            level_up_score: 500,
            end_policy: EndPolicy::AllDead,
            lanes: LaneGenConfig::default(),
            populate: PopulateConfig::default(),
            locomotion: LocomotionConfig::default(),
            hazards: HazardConfig::default(),
            camera: CameraConfig::default(),
            horizon: HorizonConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.viewport_span <= self.locomotion.player_size {
            return Err(ConfigError::Invalid("viewport_span must exceed player_size"));
        }
        if self.max_frame_ms == 0 {
            return Err(ConfigError::Invalid("max_frame_ms must be positive"));
        }
        if self.locomotion.hop_rate <= 0 {
            return Err(ConfigError::Invalid("hop_rate must be positive"));
        }
        if self.lanes.grass_width <= 0 || self.lanes.hazard_width <= 0 {
            return Err(ConfigError::Invalid("lane widths must be positive"));
        }
        if self.horizon.rebase_threshold <= 0 {
            return Err(ConfigError::Invalid("rebase_threshold must be positive"));
        }
        if self.lanes.max_consecutive_hazards == Some(0) {
            return Err(ConfigError::Invalid("max_consecutive_hazards must be at least 1"));
        }
        let rules = [&self.populate.vehicle, &self.populate.train, &self.populate.log];
        if rules.iter().any(|r| r.min_count > r.max_count || r.min_speed > r.max_speed) {
            return Err(ConfigError::Invalid("spawn rule ranges must be ordered"));
        }
        Ok(())
    }
}

// =============================================================================
// TICK
// =============================================================================

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick, sorted
    pub events: Vec<GameEvent>,
    /// The session is over
    pub session_ended: bool,
    /// Finalized score, delivered once on the tick the session ends
    pub final_score: Option<u32>,
}

/// Frame delta in seconds after clamping.
pub fn frame_delta(frame_ms: u32, config: &SessionConfig) -> Fixed {
    millis_to_fixed(frame_ms.min(config.max_frame_ms))
}

/// Run one simulation tick.
///
/// Deterministic: iteration is by id over `BTreeMap`s, arithmetic is fixed
/// point, and randomness comes only from `state.rng`.
pub fn tick(
    state: &mut SessionState,
    inputs: &BTreeMap<PlayerId, InputFrame>,
    frame_ms: u32,
    config: &SessionConfig,
) -> TickResult {
    match state.phase {
        GamePhase::Menu => return TickResult::default(),
        GamePhase::GameOver => {
            return TickResult {
                events: state.take_events(),
                session_ended: true,
                final_score: state.take_final_score(),
            };
        }
        GamePhase::Playing => {}
    }

    state.tick += 1;
    let dt = frame_delta(frame_ms, config);

    apply_inputs(state, inputs, dt, config);
    advance_players(state, dt, config);
    move_obstacles(state, dt, config);
    process_hazards(state, config);

    if state.is_playing() {
        state.update_camera(dt, config);
        update_horizon(state, config);
        check_level_up(state, config);
    }

    let mut events = state.take_events();
    events.sort();

    let session_ended = state.phase == GamePhase::GameOver;
    TickResult {
        events,
        session_ended,
        final_score: if session_ended { state.take_final_score() } else { None },
    }
}

/// Turn input intents into locomotion requests.
fn apply_inputs(
    state: &mut SessionState,
    inputs: &BTreeMap<PlayerId, InputFrame>,
    dt: Fixed,
    config: &SessionConfig,
) {
    for (player_id, frame) in inputs {
        let lateral = frame.lateral_direction();
        if lateral != 0 {
            if let Err(reason) = state.request_lateral(*player_id, lateral, dt, config) {
                note_rejection(*player_id, reason);
            }
        }
        if frame.forward_pressed() {
            if let Err(reason) = state.request_forward(*player_id, config) {
                note_rejection(*player_id, reason);
            }
        }
    }
}

#[cfg(feature = "debug-tracing")]
fn note_rejection(player_id: PlayerId, reason: MoveRejected) {
    tracing::trace!(player = player_id.0, %reason, "move rejected");
}

#[cfg(not(feature = "debug-tracing"))]
fn note_rejection(_player_id: PlayerId, _reason: MoveRejected) {}

/// Advance hop progress and cooldowns.
fn advance_players(state: &mut SessionState, dt: Fixed, config: &SessionConfig) {
    let mut events = Vec::new();
    for player in state.players.values_mut() {
        let event = match player.advance(dt, &state.lanes, &config.locomotion) {
            Some(HopOutcome::Landed(lane)) => {
                let index = state.lanes.index_of(lane).unwrap_or(0);
                GameEvent::player_landed(state.tick, player.id, index)
            }
            Some(HopOutcome::Aborted(lane)) => {
                let index = state.lanes.index_of(lane).unwrap_or(0);
                GameEvent::hop_aborted(state.tick, player.id, index)
            }
            None => continue,
        };
        events.push(event);
    }
    for event in events {
        state.push_event(event);
    }
}

/// Move every obstacle, faster as the score grows.
fn move_obstacles(state: &mut SessionState, dt: Fixed, config: &SessionConfig) {
    let multiplier = difficulty_multiplier(state.best_score());
    advance_all(&mut state.obstacles, dt, multiplier, config.viewport_span);
}

/// Apply strikes, river support and drowning.
fn process_hazards(state: &mut SessionState, config: &SessionConfig) {
    for report in check_all_hazards(state, config) {
        if let Some((_, cause)) = report.strike {
            state.kill_player(report.player_id, cause, config.end_policy);
            continue;
        }
        match report.support {
            Support::Carried { free, .. } => {
                if let Some(player) = state.players.get_mut(&report.player_id) {
                    player.free = free;
                    player.clamp_free(&config.locomotion, config.viewport_span);
                }
            }
            Support::Drowned => {
                state.kill_player(report.player_id, DeathCause::Drowned, config.end_policy);
            }
            Support::NotRequired => {}
        }
    }
}

/// Promote the level every `level_up_score` points. Never demotes.
fn check_level_up(state: &mut SessionState, config: &SessionConfig) {
    if config.level_up_score == 0 {
        return;
    }
    let earned = (state.best_score() / config.level_up_score + 1).min(Level::MAX.number() as u32) as u8;
    if earned <= state.level.number() {
        return;
    }
    if let Some(level) = Level::from_number(earned) {
        state.level = level;
        info!(level = level.number(), score = state.best_score(), tick = state.tick, "level up");
        let event = GameEvent::level_changed(state.tick, level);
        state.push_event(event);
    }
}

/// Re-run a session from recorded inputs and frame deltas.
///
/// `initial_state` must be freshly started. Stops early if the session ends.
pub fn replay_session(
    initial_state: SessionState,
    player_inputs: &BTreeMap<PlayerId, PlayerInputBuffer>,
    frame_ms: &[u32],
    config: &SessionConfig,
) -> (SessionState, Vec<GameEvent>) {
    let mut state = initial_state;
    let mut all_events = Vec::new();

    for (index, &ms) in frame_ms.iter().enumerate() {
        let inputs: BTreeMap<PlayerId, InputFrame> = player_inputs
            .iter()
            .map(|(id, buffer)| (*id, buffer.get_input_at(index as u32)))
            .collect();

        let result = tick(&mut state, &inputs, ms, config);
        all_events.extend(result.events);

        if result.session_ended {
            break;
        }
    }

    (state, all_events)
}

// =============================================================================
// TESTS
// =============================================================================
