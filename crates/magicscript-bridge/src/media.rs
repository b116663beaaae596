//! Pooled media players for video and audio nodes

use magicscript_core::{NodeId, Properties};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::error::MediaError;
use crate::lifecycle::LifecycleObserver;

pub const PROP_ACTION: &str = "action";

/// Playback action requested by the script through the `action` property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaAction {
    Start,
    Stop,
    Pause,
}

impl MediaAction {
    pub fn from_props(props: &Properties) -> Option<MediaAction> {
        match props.read_str(PROP_ACTION)? {
            "start" => Some(MediaAction::Start),
            "stop" => Some(MediaAction::Stop),
            "pause" => Some(MediaAction::Pause),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    Idle,
    Playing,
    Paused,
    Stopped,
}

#[derive(Debug, Clone)]
struct Player {
    source: String,
    state: PlayerState,
    /// Last action requested by the script, restored on resume
    last_action: Option<MediaAction>,
}

/// Bounded pool of media players keyed by owning node
#[derive(Debug)]
pub struct MediaPool {
    capacity: usize,
    players: HashMap<NodeId, Player>,
    destroyed: bool,
}

impl MediaPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            players: HashMap::new(),
            destroyed: false,
        }
    }

    /// Take a player for `id`, reusing the one it already holds
    pub fn acquire(&mut self, id: &NodeId, source: impl Into<String>) -> Result<(), MediaError> {
        if self.destroyed {
            return Err(MediaError::Destroyed);
        }
        let source = source.into();
        if let Some(player) = self.players.get_mut(id) {
            player.source = source;
            return Ok(());
        }
        if self.players.len() >= self.capacity {
            return Err(MediaError::PoolExhausted {
                capacity: self.capacity,
            });
        }

        debug!(node = %id, source = %source, "Media player acquired");
        self.players.insert(
            id.clone(),
            Player {
                source,
                state: PlayerState::Idle,
                last_action: None,
            },
        );
        Ok(())
    }

    /// Return the player of `id` to the pool
    pub fn release(&mut self, id: &NodeId) -> bool {
        let released = self.players.remove(id).is_some();
        if released {
            debug!(node = %id, "Media player released");
        }
        released
    }

    /// Apply a script action to the player of `id`
    pub fn apply(&mut self, id: &NodeId, action: MediaAction) -> Result<PlayerState, MediaError> {
        let player = self
            .players
            .get_mut(id)
            .ok_or_else(|| MediaError::UnknownPlayer(id.0.clone()))?;

        player.last_action = Some(action);
        player.state = match (action, player.state) {
            (MediaAction::Start, _) => PlayerState::Playing,
            (MediaAction::Pause, PlayerState::Playing) => PlayerState::Paused,
            (MediaAction::Stop, PlayerState::Playing | PlayerState::Paused) => PlayerState::Stopped,
            (_, state) => state,
        };
        Ok(player.state)
    }

    /// Pause every playing player, keeping the script's last action
    pub fn pause_all(&mut self) {
        for player in self.players.values_mut() {
            if player.state == PlayerState::Playing {
                player.state = PlayerState::Paused;
            }
        }
    }

    /// Restart the players the script had started
    pub fn resume_all(&mut self) {
        for (id, player) in self.players.iter_mut() {
            if player.last_action == Some(MediaAction::Start) && player.state != PlayerState::Playing {
                player.state = PlayerState::Playing;
                debug!(node = %id, "Media playback resumed");
            }
        }
    }

    /// Release every player, later acquisitions fail
    pub fn destroy(&mut self) {
        if !self.players.is_empty() {
            info!(players = self.players.len(), "Releasing media players");
        }
        self.players.clear();
        self.destroyed = true;
    }

    pub fn state(&self, id: &NodeId) -> Option<PlayerState> {
        self.players.get(id).map(|p| p.state)
    }

    pub fn source(&self, id: &NodeId) -> Option<&str> {
        self.players.get(id).map(|p| p.source.as_str())
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl LifecycleObserver for MediaPool {
    fn on_resume(&mut self) {
        self.resume_all();
    }

    fn on_pause(&mut self) {
        self.pause_all();
    }

    fn on_destroy(&mut self) {
        if self.destroyed {
            warn!("Media pool destroyed twice");
        }
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(s: &str) -> NodeId {
        NodeId::from(s)
    }

    #[test]
    fn test_pool_is_bounded() {
        let mut pool = MediaPool::new(1);
        pool.acquire(&id("v1"), "a.mp4").unwrap();
        // reacquiring keeps the same slot
        pool.acquire(&id("v1"), "b.mp4").unwrap();
        assert_eq!(pool.source(&id("v1")), Some("b.mp4"));

        assert_eq!(
            pool.acquire(&id("v2"), "c.mp4"),
            Err(MediaError::PoolExhausted { capacity: 1 })
        );

        assert!(pool.release(&id("v1")));
        pool.acquire(&id("v2"), "c.mp4").unwrap();
    }

    #[test]
    fn test_pause_and_resume_restore_started_players() {
        let mut pool = MediaPool::new(4);
        pool.acquire(&id("playing"), "a.mp4").unwrap();
        pool.acquire(&id("stopped"), "b.mp4").unwrap();
        pool.apply(&id("playing"), MediaAction::Start).unwrap();
        pool.apply(&id("stopped"), MediaAction::Start).unwrap();
        pool.apply(&id("stopped"), MediaAction::Stop).unwrap();

        pool.pause_all();
        assert_eq!(pool.state(&id("playing")), Some(PlayerState::Paused));

        pool.resume_all();
        assert_eq!(pool.state(&id("playing")), Some(PlayerState::Playing));
        assert_eq!(pool.state(&id("stopped")), Some(PlayerState::Stopped));
    }

    #[test]
    fn test_destroy_releases_everything() {
        let mut pool = MediaPool::new(2);
        pool.acquire(&id("a"), "a.ogg").unwrap();
        pool.destroy();

        assert!(pool.is_empty());
        assert_eq!(pool.acquire(&id("a"), "a.ogg"), Err(MediaError::Destroyed));
        assert_eq!(pool.apply(&id("a"), MediaAction::Start), Err(MediaError::UnknownPlayer("a".to_string())));
    }

    #[test]
    fn test_action_from_props() {
        let props = Properties::from_json(json!({"action": "pause"})).unwrap();
        assert_eq!(MediaAction::from_props(&props), Some(MediaAction::Pause));
        assert_eq!(MediaAction::from_props(&Properties::new()), None);
    }
}
