//! Session Replay Transcript
//!
//! Records everything needed to re-run a session and prove it replays to the
//! same state: seed, level, player slots, delta-compressed inputs, per-tick
//! frame deltas and state-hash checkpoints.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::debug;

use crate::core::hash::{hash_bytes, short_hex, StateHash};
use crate::game::events::{GameEvent, GameEventData};
use crate::game::input::{InputFrame, PlayerInputBuffer};
use crate::game::lane::Level;
use crate::game::player::{DeathCause, PlayerId};
use crate::game::state::SessionState;
use crate::game::tick::{tick, SessionConfig, TickResult};

/// Current transcript version.
pub const TRANSCRIPT_VERSION: u8 = 1;

/// Checkpoint interval in ticks (10 seconds of 60 Hz frames).
pub const CHECKPOINT_INTERVAL: u32 = 600;

/// Errors reading or verifying a transcript.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("transcript encoding failed: {0}")]
    Codec(#[from] bincode::Error),

    #[error("transcript version mismatch: expected {expected}, got {got}")]
    VersionMismatch { expected: u8, got: u8 },

    #[error("transcript is incomplete")]
    Incomplete,

    #[error("transcript was recorded with a different configuration")]
    ConfigMismatch,

    #[error("initial state diverged")]
    InitialStateMismatch,

    #[error("state diverged at checkpoint tick {tick}")]
    CheckpointMismatch { tick: u32 },

    #[error("final state diverged")]
    FinalStateMismatch,

    #[error("input stream of player {player} was altered after recording")]
    InputStreamMismatch { player: u8 },
}

/// Values fixed before the first tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub seed: u64,
    pub restarts: u32,
    pub level: Level,
    pub player_ids: Vec<PlayerId>,
    /// Hash of the serialized `SessionConfig`
    pub config_hash: StateHash,
    /// Unix seconds, informational only
    pub start_timestamp: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCheckpoint {
    pub tick: u32,
    pub state_hash: StateHash,
    pub rng_state: [u64; 2],
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    pub end_tick: u32,
    pub final_score: u32,
    pub final_state_hash: StateHash,
    /// `PlayerInputBuffer::stream_hash` of every slot when sealed
    pub input_hashes: BTreeMap<PlayerId, StateHash>,
}

/// Significant events kept for inspection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranscriptEvent {
    PlayerKilled { tick: u32, player_id: PlayerId, cause: DeathCause, score: u32 },
    LevelChanged { tick: u32, level: Level },
}

impl TranscriptEvent {
    pub fn from_game_event(event: &GameEvent) -> Option<Self> {
        match &event.data {
            GameEventData::PlayerKilled { player_id, cause, score } => Some(TranscriptEvent::PlayerKilled {
                tick: event.tick,
                player_id: *player_id,
                cause: *cause,
                score: *score,
            }),
            GameEventData::LevelChanged { level } => Some(TranscriptEvent::LevelChanged {
                tick: event.tick,
                level: *level,
            }),
            _ => None,
        }
    }
}

/// Hash a configuration so a transcript can only be replayed under it.
pub fn config_hash(config: &SessionConfig) -> Result<StateHash, ReplayError> {
    Ok(hash_bytes(&bincode::serialize(config)?))
}

/// Complete recording of one session run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplayTranscript {
    pub version: u8,
    pub metadata: SessionMetadata,
    pub initial_state_hash: StateHash,
    pub player_inputs: BTreeMap<PlayerId, PlayerInputBuffer>,
    /// Raw frame delta of every tick, before clamping
    pub frame_ms: Vec<u32>,
    pub checkpoints: Vec<StateCheckpoint>,
    pub events: Vec<TranscriptEvent>,
    pub result: Option<SessionResult>,
}

impl ReplayTranscript {
    /// Start recording a freshly started session.
    pub fn begin(state: &SessionState, config: &SessionConfig, start_timestamp: i64) -> Result<Self, ReplayError> {
        let player_ids: Vec<PlayerId> = state.players.keys().copied().collect();
        Ok(Self {
            version: TRANSCRIPT_VERSION,
            metadata: SessionMetadata {
                seed: state.seed,
                restarts: state.restarts,
                level: state.level,
                player_ids: player_ids.clone(),
                config_hash: config_hash(config)?,
                start_timestamp,
            },
            initial_state_hash: state.compute_hash(),
            player_inputs: player_ids.into_iter().map(|id| (id, PlayerInputBuffer::new(id))).collect(),
            frame_ms: Vec::new(),
            checkpoints: Vec::new(),
            events: Vec::new(),
            result: None,
        })
    }

    /// Record the inputs for the tick about to run. Call before `tick`.
    pub fn record_inputs(&mut self, tick: u32, inputs: &BTreeMap<PlayerId, InputFrame>, frame_ms: u32) {
        for (id, buffer) in self.player_inputs.iter_mut() {
            buffer.record(tick, inputs.get(id).copied().unwrap_or_default());
        }
        self.frame_ms.push(frame_ms);
    }

    /// Record the outcome of a tick. Call after `tick`.
    pub fn observe(&mut self, state: &SessionState, result: &TickResult) {
        self.events.extend(result.events.iter().filter_map(TranscriptEvent::from_game_event));

        if state.tick % CHECKPOINT_INTERVAL == 0 {
            self.add_checkpoint(state);
        }
        if result.session_ended && self.result.is_none() {
            self.finalize(state);
        }
    }

    pub fn add_checkpoint(&mut self, state: &SessionState) {
        self.checkpoints.push(StateCheckpoint {
            tick: state.tick,
            state_hash: state.compute_hash(),
            rng_state: state.rng.state(),
        });
    }

    /// Seal the transcript with the final state.
    pub fn finalize(&mut self, state: &SessionState) {
        let final_state_hash = state.compute_hash();
        debug!(tick = state.tick, hash = %short_hex(&final_state_hash), "transcript finalized");
        self.result = Some(SessionResult {
            end_tick: state.tick,
            final_score: state.final_score().unwrap_or_else(|| state.best_score()),
            final_state_hash,
            input_hashes: self
                .player_inputs
                .iter()
                .map(|(id, buffer)| (*id, buffer.stream_hash()))
                .collect(),
        });
    }

    pub fn is_complete(&self) -> bool {
        self.result.is_some()
    }

    pub fn tick_count(&self) -> u32 {
        self.frame_ms.len() as u32
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ReplayError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, ReplayError> {
        let transcript: Self = bincode::deserialize(data)?;
        if transcript.version != TRANSCRIPT_VERSION {
            return Err(ReplayError::VersionMismatch {
                expected: TRANSCRIPT_VERSION,
                got: transcript.version,
            });
        }
        Ok(transcript)
    }

    /// Rebuild the session exactly as it was when recording began.
    pub fn initial_state(&self, config: &SessionConfig) -> Result<SessionState, ReplayError> {
        if config_hash(config)? != self.metadata.config_hash {
            return Err(ReplayError::ConfigMismatch);
        }
        let mut state = SessionState::new(self.metadata.seed);
        for id in &self.metadata.player_ids {
            state.add_player(*id);
        }
        state.restarts = self.metadata.restarts;
        state.start(self.metadata.level, config);

        if state.compute_hash() != self.initial_state_hash {
            return Err(ReplayError::InitialStateMismatch);
        }
        Ok(state)
    }

    /// Re-run the session, checking every checkpoint and the final hash.
    ///
    /// Returns the verified final state.
    pub fn verify(&self, config: &SessionConfig) -> Result<SessionState, ReplayError> {
        let expected = self.result.as_ref().ok_or(ReplayError::Incomplete)?;
        for (id, buffer) in &self.player_inputs {
            if expected.input_hashes.get(id) != Some(&buffer.stream_hash()) {
                return Err(ReplayError::InputStreamMismatch { player: id.0 });
            }
        }
        let mut state = self.initial_state(config)?;
        let mut checkpoints = self.checkpoints.iter().peekable();

        for (index, &ms) in self.frame_ms.iter().enumerate() {
            let inputs: BTreeMap<PlayerId, InputFrame> = self
                .player_inputs
                .iter()
                .map(|(id, buffer)| (*id, buffer.get_input_at(index as u32)))
                .collect();
            tick(&mut state, &inputs, ms, config);

            while let Some(checkpoint) = checkpoints.next_if(|c| c.tick <= state.tick) {
                if checkpoint.tick != state.tick
                    || checkpoint.state_hash != state.compute_hash()
                    || checkpoint.rng_state != state.rng.state()
                {
                    return Err(ReplayError::CheckpointMismatch { tick: checkpoint.tick });
                }
            }
        }

        if state.tick != expected.end_tick || state.compute_hash() != expected.final_state_hash {
            return Err(ReplayError::FinalStateMismatch);
        }
        Ok(state)
    }
}

// =============================================================================
// TESTS
// =============================================================================
