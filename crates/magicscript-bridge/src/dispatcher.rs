//! Command dispatcher
//!
//! One tokio task owns the [`SceneEngine`]; every producer holds a cloneable
//! [`DispatcherHandle`] and pushes commands onto an unbounded channel. The
//! channel keeps each producer's submission order, and since only the task
//! touches the engine no two commands ever interleave.

use magicscript_core::{NodeId, NodeSnapshot, Plane, PlaneConfig, PlaneError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::command::{BridgeCall, Command, SceneSummary};
use crate::engine::SceneEngine;
use crate::error::DispatchError;

/// Spawns the affine task
pub struct Dispatcher;

impl Dispatcher {
    /// Move `engine` onto its own task and return the handle used to feed it
    pub fn spawn(mut engine: SceneEngine) -> (DispatcherHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Command>();

        let task = tokio::spawn(async move {
            info!("Scene dispatcher started");
            let mut applied: u64 = 0;

            while let Some(command) = rx.recv().await {
                applied += 1;
                if engine.apply(command).is_break() {
                    break;
                }
            }

            // anything still queued was submitted after teardown
            rx.close();
            while let Ok(command) = rx.try_recv() {
                error!(command = command.name(), "Command submitted after host destroy, dropped");
            }
            info!(applied, "Scene dispatcher stopped");
        });

        (DispatcherHandle { tx }, task)
    }
}

/// Cloneable producer side of the dispatcher
#[derive(Debug, Clone)]
pub struct DispatcherHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl DispatcherHandle {
    /// Queue a command, never blocks
    pub fn submit(&self, command: Command) -> Result<(), DispatchError> {
        self.tx.send(command).map_err(|_| DispatchError::Closed)
    }

    /// Convert and queue a bridge call
    pub fn submit_call(&self, call: BridgeCall) -> Result<(), DispatchError> {
        let command = Command::try_from(call)?;
        debug!(command = command.name(), "Bridge call queued");
        self.submit(command)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Snapshot of a node, read on the affine task
    pub async fn find_node(&self, id: NodeId) -> Result<Option<NodeSnapshot>, DispatchError> {
        self.query(|reply| Command::FindNode { id, reply }).await
    }

    pub async fn all_planes(
        &self,
        config: PlaneConfig,
    ) -> Result<Result<Vec<Plane>, PlaneError>, DispatchError> {
        self.query(|reply| Command::GetAllPlanes { config, reply })
            .await
    }

    pub async fn scene_snapshot(&self) -> Result<SceneSummary, DispatchError> {
        self.query(|reply| Command::Snapshot { reply }).await
    }

    async fn query<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, DispatchError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.submit(build(reply_tx))?;
        reply_rx.await.map_err(|_| DispatchError::NoReply)
    }
}
