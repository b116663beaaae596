//! Application state management

use anyhow::Result;
use magicscript_bridge::{Dispatcher, DispatcherHandle, SceneEngine};
use magicscript_core::{FsResourceLoader, SceneEvent};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::config::Config;

/// Shared application state
pub struct AppState {
    /// Producer side of the scene dispatcher
    pub dispatcher: DispatcherHandle,
    /// Outbound scene events for WebSocket clients
    pub events: broadcast::Sender<SceneEvent>,
    /// Configuration
    pub config: Config,
}

impl AppState {
    /// Create new application state and start the scene dispatcher
    pub async fn new(config: Config) -> Result<Arc<Self>> {
        let loader = Arc::new(FsResourceLoader::new(&config.resources.path));
        let (events, _) = broadcast::channel(config.daemon.event_buffer);

        let engine = SceneEngine::new(config.to_engine_config(), loader, events.clone());
        let (dispatcher, task) = Dispatcher::spawn(engine);

        tokio::spawn(async move {
            if let Err(e) = task.await {
                error!(error = %e, "Scene dispatcher task failed");
            }
        });

        info!(
            resources = %config.resources.path,
            media_pool = config.scene.media_pool_size,
            "Scene engine started"
        );

        Ok(Arc::new(Self {
            dispatcher,
            events,
            config,
        }))
    }

    /// Subscribe to outbound scene events
    pub fn subscribe(&self) -> broadcast::Receiver<SceneEvent> {
        self.events.subscribe()
    }
}
