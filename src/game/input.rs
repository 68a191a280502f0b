//! Input Intent and Recording
//!
//! Input collaborators never touch the world directly. They hand the tick a
//! per-player [`InputFrame`] of intent flags, which the tick turns into
//! locomotion requests. Frames are recorded delta-compressed for replays.

use serde::{Serialize, Deserialize};

use crate::core::hash::{StateHash, StateHasher};
use crate::game::player::PlayerId;

// =============================================================================
// INPUT FRAME
// =============================================================================

/// Intent flags for one player for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputFrame {
    /// Packed bits:
    /// - Bit 0: forward pressed
    /// - Bit 1: left held
    /// - Bit 2: right held
    pub flags: u8,
}

impl InputFrame {
    pub const FLAG_FORWARD: u8 = 0x01;
    pub const FLAG_LEFT: u8 = 0x02;
    pub const FLAG_RIGHT: u8 = 0x04;

    /// Empty frame.
    pub const fn new() -> Self {
        Self { flags: 0 }
    }

    /// Frame with only forward pressed.
    pub const fn forward() -> Self {
        Self { flags: Self::FLAG_FORWARD }
    }

    /// Frame holding one lateral direction (-1 left, +1 right, 0 none).
    pub const fn lateral(direction: i8) -> Self {
        let flags = if direction < 0 {
            Self::FLAG_LEFT
        } else if direction > 0 {
            Self::FLAG_RIGHT
        } else {
            0
        };
        Self { flags }
    }

    #[inline]
    pub fn forward_pressed(&self) -> bool {
        self.flags & Self::FLAG_FORWARD != 0
    }

    /// Held lateral direction. Left and right together cancel out.
    #[inline]
    pub fn lateral_direction(&self) -> i8 {
        let left = (self.flags & Self::FLAG_LEFT != 0) as i8;
        let right = (self.flags & Self::FLAG_RIGHT != 0) as i8;
        right - left
    }
}

/// Frame change recorded at a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDelta {
    pub tick: u32,
    pub frame: InputFrame,
}

// =============================================================================
// INPUT BUFFER
// =============================================================================

/// Complete input recording for one player in one session.
///
/// Only ticks where the frame changed are stored.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerInputBuffer {
    pub player_id: PlayerId,
    /// Last tick recorded
    pub end_tick: u32,
    deltas: Vec<InputDelta>,
    #[serde(skip)]
    last_frame: InputFrame,
}

impl PlayerInputBuffer {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            end_tick: 0,
            deltas: Vec::new(),
            last_frame: InputFrame::new(),
        }
    }

    /// Record the frame used at `tick`.
    pub fn record(&mut self, tick: u32, frame: InputFrame) {
        self.end_tick = tick;
        if frame != self.last_frame {
            self.deltas.push(InputDelta { tick, frame });
            self.last_frame = frame;
        }
    }

    /// Frame in effect at `tick`.
    pub fn get_input_at(&self, tick: u32) -> InputFrame {
        let idx = self.deltas.partition_point(|d| d.tick <= tick);
        if idx == 0 {
            InputFrame::new()
        } else {
            self.deltas[idx - 1].frame
        }
    }

    /// Hash of the recorded stream.
    pub fn stream_hash(&self) -> StateHash {
        let mut hasher = StateHasher::for_input_stream();
        hasher.update_u8(self.player_id.0);
        hasher.update_u32(self.end_tick);
        for delta in &self.deltas {
            hasher.update_u32(delta.tick);
            hasher.update_u8(delta.frame.flags);
        }
        hasher.finalize()
    }
}

// =============================================================================
// TESTS
// =============================================================================
