//! Game Events
//!
//! Everything observable that happens during a tick, in a deterministic
//! order. Collaborators (audio, UI, score sinks) react to these instead of
//! reaching into the session state.

use serde::{Serialize, Deserialize};

use crate::game::lane::Level;
use crate::game::player::{DeathCause, PlayerId};

/// Processing order within a tick. Lower value sorts first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Deaths first
    PlayerDeath = 0,
    /// Then hops and landings
    Locomotion = 1,
    /// Then world streaming
    World = 2,
    /// Then difficulty changes
    Progression = 3,
    /// Session lifecycle last
    Session = 255,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventData {
    /// A hop was accepted
    PlayerHopped {
        player_id: PlayerId,
        from_index: u32,
        score: u32,
    },

    /// A hop completed on its target lane
    PlayerLanded {
        player_id: PlayerId,
        lane_index: u32,
    },

    /// The hop target vanished mid-flight; the player stayed put
    HopAborted {
        player_id: PlayerId,
        lane_index: u32,
    },

    /// A player died
    PlayerKilled {
        player_id: PlayerId,
        cause: DeathCause,
        score: u32,
    },

    /// A player's lane failed to re-resolve and it was moved to the front lane
    PlayerSnapped {
        player_id: PlayerId,
    },

    /// Lanes appended at the far end
    LanesGenerated {
        count: u32,
        obstacles: u32,
    },

    /// Lanes removed from the near end
    LanesEvicted {
        count: u32,
        orphaned_obstacles: u32,
    },

    /// Difficulty tier promoted
    LevelChanged {
        level: Level,
    },

    /// Session ended; carries the finalized score
    SessionEnded {
        final_score: u32,
        duration_ticks: u32,
    },
}

/// A game event with timing and priority.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameEvent {
    pub tick: u32,
    pub priority: EventPriority,
    /// Player involved (for tie-breaking)
    pub player_id: Option<PlayerId>,
    pub data: GameEventData,
}

impl GameEvent {
    pub fn new(tick: u32, priority: EventPriority, data: GameEventData) -> Self {
        let player_id = match &data {
            GameEventData::PlayerHopped { player_id, .. }
            | GameEventData::PlayerLanded { player_id, .. }
            | GameEventData::HopAborted { player_id, .. }
            | GameEventData::PlayerKilled { player_id, .. }
            | GameEventData::PlayerSnapped { player_id } => Some(*player_id),
            _ => None,
        };

        Self { tick, priority, player_id, data }
    }

    pub fn player_hopped(tick: u32, player_id: PlayerId, from_index: u32, score: u32) -> Self {
        Self::new(
            tick,
            EventPriority::Locomotion,
            GameEventData::PlayerHopped { player_id, from_index, score },
        )
    }

    pub fn player_landed(tick: u32, player_id: PlayerId, lane_index: u32) -> Self {
        Self::new(
            tick,
            EventPriority::Locomotion,
            GameEventData::PlayerLanded { player_id, lane_index },
        )
    }

    pub fn hop_aborted(tick: u32, player_id: PlayerId, lane_index: u32) -> Self {
        Self::new(
            tick,
            EventPriority::Locomotion,
            GameEventData::HopAborted { player_id, lane_index },
        )
    }

    pub fn player_killed(tick: u32, player_id: PlayerId, cause: DeathCause, score: u32) -> Self {
        Self::new(
            tick,
            EventPriority::PlayerDeath,
            GameEventData::PlayerKilled { player_id, cause, score },
        )
    }

    pub fn player_snapped(tick: u32, player_id: PlayerId) -> Self {
        Self::new(tick, EventPriority::World, GameEventData::PlayerSnapped { player_id })
    }

    pub fn lanes_generated(tick: u32, count: u32, obstacles: u32) -> Self {
        Self::new(tick, EventPriority::World, GameEventData::LanesGenerated { count, obstacles })
    }

    pub fn lanes_evicted(tick: u32, count: u32, orphaned_obstacles: u32) -> Self {
        Self::new(
            tick,
            EventPriority::World,
            GameEventData::LanesEvicted { count, orphaned_obstacles },
        )
    }

    pub fn level_changed(tick: u32, level: Level) -> Self {
        Self::new(tick, EventPriority::Progression, GameEventData::LevelChanged { level })
    }

    pub fn session_ended(tick: u32, final_score: u32) -> Self {
        Self::new(
            tick,
            EventPriority::Session,
            GameEventData::SessionEnded { final_score, duration_ticks: tick },
        )
    }
}

impl PartialEq for GameEvent {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick
            && self.priority == other.priority
            && self.player_id == other.player_id
    }
}

impl Eq for GameEvent {}

impl PartialOrd for GameEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GameEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.tick
            .cmp(&other.tick)
            .then_with(|| self.priority.cmp(&other.priority))
            .then_with(|| self.player_id.cmp(&other.player_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_ordering() {
        let mut events = [
            GameEvent::session_ended(5, 40),
            GameEvent::player_hopped(5, PlayerId(1), 2, 30),
            GameEvent::player_killed(5, PlayerId(0), DeathCause::Train, 40),
            GameEvent::lanes_evicted(4, 3, 1),
        ];
        events.sort();

        assert!(matches!(events[0].data, GameEventData::LanesEvicted { .. }));
        assert!(matches!(events[1].data, GameEventData::PlayerKilled { .. }));
        assert!(matches!(events[2].data, GameEventData::PlayerHopped { .. }));
        assert!(matches!(events[3].data, GameEventData::SessionEnded { final_score: 40, .. }));
    }

    #[test]
    fn test_player_id_extracted() {
        let event = GameEvent::player_snapped(1, PlayerId(1));
        assert_eq!(event.player_id, Some(PlayerId(1)));
        assert_eq!(GameEvent::level_changed(1, Level::Rails).player_id, None);
    }
}
