//! Session State
//!
//! One explicit world object per session: lanes, obstacles, players, camera
//! and horizon, plus the lifecycle (`start`, `restart`, game over). Every
//! collection is a `BTreeMap` keyed by a monotonic id, so iteration order and
//! therefore the whole simulation is deterministic.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use tracing::info;

use crate::core::fixed::Fixed;
use crate::core::hash::{compute_state_hash, StateHash};
use crate::core::rng::DeterministicRng;
use crate::game::camera::CameraTracker;
use crate::game::events::GameEvent;
use crate::game::horizon::{self, WorldHorizon};
use crate::game::lane::{LaneSequence, Level};
use crate::game::obstacle::{Obstacle, ObstacleId};
use crate::game::player::{DeathCause, Locomotion, MoveRejected, PlayerId, PlayerState};
use crate::game::tick::SessionConfig;

/// Most local players a session accepts.
pub const MAX_PLAYERS: usize = 2;

// =============================================================================
// PHASE AND POLICY
// =============================================================================

/// Session phase. Only `Playing` advances the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    #[default]
    Menu,
    Playing,
    GameOver,
}

/// When a multi-player session ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndPolicy {
    /// The first death ends the session
    FirstDeath,
    /// The session runs until every player is dead
    #[default]
    AllDead,
}

// =============================================================================
// SESSION STATE
// =============================================================================

/// Complete state of one play session.
#[derive(Clone, Debug)]
pub struct SessionState {
    /// Session seed; each run derives its generator from this and `restarts`
    pub seed: u64,
    pub restarts: u32,
    pub tick: u32,
    pub phase: GamePhase,
    pub level: Level,
    pub rng: DeterministicRng,
    pub lanes: LaneSequence,
    pub obstacles: BTreeMap<ObstacleId, Obstacle>,
    pub next_obstacle_id: u32,
    pub players: BTreeMap<PlayerId, PlayerState>,
    pub camera: CameraTracker,
    pub horizon: WorldHorizon,
    final_score: Option<u32>,
    score_delivered: bool,
    pending_events: Vec<GameEvent>,
}

impl SessionState {
    /// Create an idle session in the menu. Nothing is generated until `start`.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            restarts: 0,
            tick: 0,
            phase: GamePhase::Menu,
            level: Level::default(),
            rng: DeterministicRng::for_run(seed, 0),
            lanes: LaneSequence::new(),
            obstacles: BTreeMap::new(),
            next_obstacle_id: 0,
            players: BTreeMap::new(),
            camera: CameraTracker::default(),
            horizon: WorldHorizon::default(),
            final_score: None,
            score_delivered: false,
            pending_events: Vec::new(),
        }
    }

    /// Reserve a player slot. Only allowed from the menu.
    pub fn add_player(&mut self, id: PlayerId) -> bool {
        if self.phase != GamePhase::Menu
            || self.players.len() >= MAX_PLAYERS
            || self.players.contains_key(&id)
        {
            return false;
        }
        self.players.insert(id, PlayerState::new(id, Default::default(), 0));
        true
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Begin a run at the given difficulty tier.
    pub fn start(&mut self, level: Level, config: &SessionConfig) {
        self.level = level;
        self.reinitialize(config);
        info!(seed = self.seed, level = level.number(), players = self.players.len(), "session started");
    }

    /// Begin a fresh run keeping the current level and player slots.
    pub fn restart(&mut self, config: &SessionConfig) {
        self.restarts += 1;
        self.reinitialize(config);
        info!(seed = self.seed, restart = self.restarts, level = self.level.number(), "session restarted");
    }

    fn reinitialize(&mut self, config: &SessionConfig) {
        self.tick = 0;
        self.rng = DeterministicRng::for_run(self.seed, self.restarts);
        self.lanes.reset();
        self.obstacles.clear();
        self.next_obstacle_id = 0;
        self.horizon.reset();
        self.final_score = None;
        self.score_delivered = false;
        self.pending_events.clear();

        if self.players.is_empty() {
            self.players.insert(PlayerId(0), PlayerState::new(PlayerId(0), Default::default(), 0));
        }

        let start = self.lanes.push_start_lane(&config.lanes);
        let start_center = self.lanes.get(start).map(|l| l.center()).unwrap_or(0);

        // Spread players evenly across the free axis
        let slots = self.players.len() as i64 + 1;
        for (i, player) in self.players.values_mut().enumerate() {
            let free = (config.viewport_span as i64 * (i as i64 + 1) / slots) as Fixed;
            *player = PlayerState::new(player.id, start, free);
            player.clamp_free(&config.locomotion, config.viewport_span);
        }

        self.camera.reset_to(start_center, &config.camera);
        let frontier = self.camera.tracked;
        horizon::ensure_generated_ahead(self, frontier, config);
        self.phase = GamePhase::Playing;
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.phase == GamePhase::Playing
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn alive_count(&self) -> usize {
        self.players.values().filter(|p| p.alive).count()
    }

    /// Session score: the best score of any player.
    pub fn best_score(&self) -> u32 {
        self.players.values().map(|p| p.score).max().unwrap_or(0)
    }

    /// Live player furthest along the travel axis; ties go to the lower id.
    pub fn leader(&self) -> Option<&PlayerState> {
        self.players
            .values()
            .filter(|p| p.alive)
            .max_by_key(|p| (p.lane, Reverse(p.id)))
    }

    /// Position of a player's lane counted from the front.
    pub fn lane_index_of(&self, id: PlayerId) -> Option<u32> {
        let player = self.players.get(&id)?;
        self.lanes.index_of(player.lane)
    }

    /// Finalized score, if the session has ended.
    pub fn final_score(&self) -> Option<u32> {
        self.final_score
    }

    // =========================================================================
    // PLAYER REQUESTS
    // =========================================================================

    /// Forward request from the input collaborator.
    pub fn request_forward(&mut self, id: PlayerId, config: &SessionConfig) -> Result<(), MoveRejected> {
        if !self.is_playing() {
            return Err(MoveRejected::NotPlaying);
        }
        let player = self.players.get_mut(&id).ok_or(MoveRejected::UnknownPlayer(id.0))?;
        let from_index = self.lanes.index_of(player.lane).unwrap_or(0);
        player.request_forward(&self.lanes, &config.locomotion)?;

        let event = GameEvent::player_hopped(self.tick, id, from_index, player.score);
        self.pending_events.push(event);
        Ok(())
    }

    /// Lateral request for one frame of `dt` seconds.
    pub fn request_lateral(
        &mut self,
        id: PlayerId,
        direction: i8,
        dt: Fixed,
        config: &SessionConfig,
    ) -> Result<(), MoveRejected> {
        if !self.is_playing() {
            return Err(MoveRejected::NotPlaying);
        }
        let player = self.players.get_mut(&id).ok_or(MoveRejected::UnknownPlayer(id.0))?;
        player.request_lateral(direction, dt, &config.locomotion, config.viewport_span)
    }

    // =========================================================================
    // DEATH AND GAME OVER
    // =========================================================================

    /// Kill a player and apply the end policy. Returns false if the player
    /// was already dead or does not exist.
    pub fn kill_player(&mut self, id: PlayerId, cause: DeathCause, policy: EndPolicy) -> bool {
        let Some(player) = self.players.get_mut(&id) else {
            return false;
        };
        if !player.kill(cause) {
            return false;
        }
        let score = player.score;

        info!(player = id.0, ?cause, score, tick = self.tick, "player died");
        self.pending_events.push(GameEvent::player_killed(self.tick, id, cause, score));

        let session_over = match policy {
            EndPolicy::FirstDeath => true,
            EndPolicy::AllDead => self.alive_count() == 0,
        };
        if session_over {
            self.trigger_game_over();
        }
        true
    }

    /// End the session. The first call wins; later calls change nothing.
    pub fn trigger_game_over(&mut self) -> bool {
        if self.phase != GamePhase::Playing {
            return false;
        }
        self.phase = GamePhase::GameOver;

        for player in self.players.values_mut() {
            player.motion = Locomotion::Idle;
        }

        let score = self.best_score();
        self.final_score = Some(score);
        self.pending_events.push(GameEvent::session_ended(self.tick, score));
        info!(score, tick = self.tick, level = self.level.number(), "game over");
        true
    }

    /// Hand the finalized score to the persistence collaborator.
    ///
    /// Yields the score exactly once per session.
    pub fn take_final_score(&mut self) -> Option<u32> {
        if self.score_delivered {
            return None;
        }
        let score = self.final_score?;
        self.score_delivered = true;
        Some(score)
    }

    // =========================================================================
    // EVENTS AND CAMERA
    // =========================================================================

    pub fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }

    /// Drain events produced since the last call.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Retarget the camera on the leader (frozen mid-hop) and smooth towards it.
    pub fn update_camera(&mut self, dt: Fixed, config: &SessionConfig) {
        let leader = self
            .players
            .values()
            .filter(|p| p.alive)
            .max_by_key(|p| (p.lane, Reverse(p.id)));
        if let Some(leader) = leader {
            self.camera.retarget(leader, &self.lanes, &config.camera);
        }
        self.camera.follow(dt, &config.camera);
    }

    pub fn insert_obstacle(&mut self, obstacle: Obstacle) {
        self.next_obstacle_id = self.next_obstacle_id.max(obstacle.id.0 + 1);
        self.obstacles.insert(obstacle.id, obstacle);
    }

    // =========================================================================
    // HASHING
    // =========================================================================

    /// Hash of everything that influences future ticks.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, self.seed, |h| {
            h.update_u32(self.restarts);
            h.update_u8(self.phase as u8);
            h.update_u8(self.level.number());
            let [s0, s1] = self.rng.state();
            h.update_u64(s0);
            h.update_u64(s1);

            h.update_u32(self.lanes.len() as u32);
            for lane in self.lanes.iter() {
                h.update_u32(lane.id.0);
                h.update_fixed(lane.start);
                h.update_fixed(lane.width);
                h.update_u8(lane.kind as u8);
                h.update_i8(lane.direction);
            }

            h.update_u32(self.obstacles.len() as u32);
            for obstacle in self.obstacles.values() {
                h.update_u32(obstacle.id.0);
                h.update_u32(obstacle.lane.0);
                h.update_u8(obstacle.kind as u8);
                h.update_vec2(obstacle.position);
                h.update_fixed(obstacle.speed);
                h.update_i8(obstacle.direction);
            }

            for player in self.players.values() {
                h.update_u8(player.id.0);
                h.update_u32(player.lane.0);
                h.update_u32(player.target_lane().0);
                h.update_fixed(player.progress());
                h.update_fixed(player.free);
                h.update_fixed(player.cooldown);
                h.update_bool(player.alive);
                h.update_u32(player.score);
            }

            h.update_fixed(self.camera.tracked);
            h.update_fixed(self.camera.target);
            h.update_fixed(self.horizon.generation_frontier);
            h.update_fixed(self.horizon.eviction_frontier);
            h.update_i64(self.horizon.origin);
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_in_menu() {
        let state = SessionState::new(1);
        assert_eq!(state.phase, GamePhase::Menu);
        assert!(state.lanes.is_empty());
        assert!(state.players.is_empty());
    }

    #[test]
    fn test_start_initial_invariants() {
        let config = SessionConfig::default();
        let mut state = SessionState::new(42);
        state.start(Level::Roads, &config);

        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.players.len(), 1);
        assert_eq!(state.best_score(), 0);
        assert_eq!(state.lane_index_of(PlayerId(0)), Some(0));
        assert!(state.lanes.front().is_some_and(|l| l.kind.is_safe()));
        assert!(state.lanes.is_gapless());

        let frontier = state.lanes.frontier().unwrap_or(0);
        assert!(frontier >= state.camera.tracked + config.horizon.generation_distance);
        assert_eq!(state.horizon.generation_frontier, frontier);
    }

    #[test]
    fn test_add_player_limits() {
        let mut state = SessionState::new(1);
        assert!(state.add_player(PlayerId(0)));
        assert!(!state.add_player(PlayerId(0)));
        assert!(state.add_player(PlayerId(1)));
        assert!(!state.add_player(PlayerId(2)));

        state.start(Level::Roads, &SessionConfig::default());
        assert!(!state.add_player(PlayerId(3)));
    }

    #[test]
    fn test_two_players_spread_on_start_lane() {
        let config = SessionConfig::default();
        let mut state = SessionState::new(9);
        state.add_player(PlayerId(0));
        state.add_player(PlayerId(1));
        state.start(Level::Roads, &config);

        let a = &state.players[&PlayerId(0)];
        let b = &state.players[&PlayerId(1)];
        assert_eq!(a.lane, b.lane);
        assert_eq!(a.free, config.viewport_span / 3);
        assert_eq!(b.free, config.viewport_span * 2 / 3);
    }

    #[test]
    fn test_game_over_is_idempotent() {
        let config = SessionConfig::default();
        let mut state = SessionState::new(5);
        state.start(Level::Roads, &config);
        state.request_forward(PlayerId(0), &config).expect("first lane ahead exists");

        assert!(state.trigger_game_over());
        let first = state.final_score();
        assert!(!state.trigger_game_over());
        assert_eq!(state.final_score(), first);
        assert_eq!(first, Some(10));

        assert_eq!(state.take_final_score(), Some(10));
        assert_eq!(state.take_final_score(), None);

        let ended = state
            .take_events()
            .into_iter()
            .filter(|e| matches!(e.data, crate::game::events::GameEventData::SessionEnded { .. }))
            .count();
        assert_eq!(ended, 1);
    }

    #[test]
    fn test_requests_refused_outside_play() {
        let config = SessionConfig::default();
        let mut state = SessionState::new(5);
        assert_eq!(state.request_forward(PlayerId(0), &config), Err(MoveRejected::NotPlaying));

        state.start(Level::Roads, &config);
        assert_eq!(state.request_forward(PlayerId(7), &config), Err(MoveRejected::UnknownPlayer(7)));

        state.trigger_game_over();
        assert_eq!(state.request_lateral(PlayerId(0), 1, 100, &config), Err(MoveRejected::NotPlaying));
    }

    #[test]
    fn test_end_policies() {
        let config = SessionConfig::default();

        let mut all_dead = SessionState::new(3);
        all_dead.add_player(PlayerId(0));
        all_dead.add_player(PlayerId(1));
        all_dead.start(Level::Roads, &config);
        all_dead.kill_player(PlayerId(0), DeathCause::Vehicle, EndPolicy::AllDead);
        assert!(all_dead.is_playing());
        all_dead.kill_player(PlayerId(1), DeathCause::Drowned, EndPolicy::AllDead);
        assert_eq!(all_dead.phase, GamePhase::GameOver);

        let mut first_death = SessionState::new(3);
        first_death.add_player(PlayerId(0));
        first_death.add_player(PlayerId(1));
        first_death.start(Level::Roads, &config);
        first_death.kill_player(PlayerId(1), DeathCause::Train, EndPolicy::FirstDeath);
        assert_eq!(first_death.phase, GamePhase::GameOver);
    }

    #[test]
    fn test_restart_resets_and_reseeds() {
        let config = SessionConfig::default();
        let mut state = SessionState::new(77);
        state.start(Level::Rails, &config);
        let first_world: Vec<_> = state.lanes.iter().map(|l| (l.kind, l.direction)).collect();

        state.request_forward(PlayerId(0), &config).expect("hop");
        state.kill_player(PlayerId(0), DeathCause::Train, EndPolicy::AllDead);
        state.restart(&config);

        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.level, Level::Rails);
        assert_eq!(state.tick, 0);
        assert_eq!(state.best_score(), 0);
        assert_eq!(state.lane_index_of(PlayerId(0)), Some(0));
        assert!(state.players[&PlayerId(0)].alive);
        assert_eq!(state.final_score(), None);
        assert_eq!(state.restarts, 1);

        let second_world: Vec<_> = state.lanes.iter().map(|l| (l.kind, l.direction)).collect();
        assert_ne!(first_world, second_world);
    }

    #[test]
    fn test_same_seed_same_hash() {
        let config = SessionConfig::default();
        let mut a = SessionState::new(1234);
        let mut b = SessionState::new(1234);
        a.start(Level::Mixed, &config);
        b.start(Level::Mixed, &config);
        assert_eq!(a.compute_hash(), b.compute_hash());

        let mut c = SessionState::new(4321);
        c.start(Level::Mixed, &config);
        assert_ne!(a.compute_hash(), c.compute_hash());
    }
}
