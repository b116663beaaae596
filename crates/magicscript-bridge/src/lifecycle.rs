//! Host lifecycle propagation
//!
//! The host (the application embedding the scene) reports foreground,
//! background and teardown transitions. Components that care implement
//! [`LifecycleObserver`] and are handed to the [`LifecycleCoordinator`] on
//! every transition.

use magicscript_core::{NodeId, PlaneDetector, SceneRegistry};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::LifecycleError;

/// Result code of a successful activity result
pub const RESULT_OK: i32 = -1;

/// Transition reported by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostEvent {
    Resume,
    Pause,
    Destroy,
    /// Result of an activity started on behalf of a node (file picker)
    ActivityResult {
        #[serde(rename = "requestCode")]
        request_code: i32,
        #[serde(rename = "resultCode")]
        result_code: i32,
        #[serde(default)]
        data: Option<String>,
    },
    NewIntent {
        #[serde(default)]
        data: Option<String>,
    },
}

impl HostEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::Resume => "resume",
            HostEvent::Pause => "pause",
            HostEvent::Destroy => "destroy",
            HostEvent::ActivityResult { .. } => "activityResult",
            HostEvent::NewIntent { .. } => "newIntent",
        }
    }
}

/// Component notified about host transitions
pub trait LifecycleObserver {
    fn on_resume(&mut self) {}
    fn on_pause(&mut self) {}
    fn on_destroy(&mut self) {}
}

impl LifecycleObserver for SceneRegistry {
    fn on_resume(&mut self) {
        self.resume_all();
    }

    fn on_pause(&mut self) {
        self.pause_all();
    }

    fn on_destroy(&mut self) {
        self.destroy();
    }
}

impl LifecycleObserver for PlaneDetector {
    fn on_destroy(&mut self) {
        self.destroy();
    }
}

/// Host state as seen by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    Resumed,
    Paused,
    Destroyed,
}

/// Forwards host transitions to the observers that opted in
#[derive(Debug)]
pub struct LifecycleCoordinator {
    state: HostState,
}

impl Default for LifecycleCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleCoordinator {
    pub fn new() -> Self {
        Self {
            state: HostState::Resumed,
        }
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    pub fn is_destroyed(&self) -> bool {
        self.state == HostState::Destroyed
    }

    /// Apply a transition to every observer, in order
    ///
    /// Activity results and intents carry no lifecycle change and are left
    /// to the caller. Any event after `Destroy` fails.
    pub fn handle(
        &mut self,
        event: &HostEvent,
        observers: &mut [&mut dyn LifecycleObserver],
    ) -> Result<(), LifecycleError> {
        if self.is_destroyed() {
            return Err(LifecycleError::Destroyed);
        }

        match event {
            HostEvent::Resume => {
                observers.iter_mut().for_each(|o| o.on_resume());
                self.state = HostState::Resumed;
                info!("Host resumed");
            }
            HostEvent::Pause => {
                observers.iter_mut().for_each(|o| o.on_pause());
                self.state = HostState::Paused;
                info!("Host paused");
            }
            HostEvent::Destroy => {
                observers.iter_mut().for_each(|o| o.on_destroy());
                self.state = HostState::Destroyed;
                info!(observers = observers.len(), "Host destroyed");
            }
            HostEvent::ActivityResult { .. } | HostEvent::NewIntent { .. } => {
                debug!(event = event.name(), "Host event passed through");
            }
        }
        Ok(())
    }
}

/// File-picker nodes waiting for the activity result with `request_code`
pub fn activity_result_targets(registry: &SceneRegistry, request_code: i32) -> Vec<NodeId> {
    let mut targets: Vec<NodeId> = registry
        .nodes()
        .filter(|node| node.request_code().map(i32::from) == Some(request_code))
        .filter_map(|node| node.id().cloned())
        .collect();
    targets.sort();
    targets
}
