//! MagicScript Bridge - Scene command service
//!
//! This crate runs the scene on a single affine task:
//! - Wire format of bridge calls and the internal command set
//! - The dispatcher serialising every command onto one task
//! - Per-node event routing to an outbound event sink
//! - Host lifecycle propagation and the media player pool

pub mod command;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod media;
pub mod router;

pub use command::{BridgeCall, Command, NativeEvent, SceneSummary};
pub use dispatcher::{Dispatcher, DispatcherHandle};
pub use engine::{EngineConfig, SceneEngine};
pub use error::{CommandError, DispatchError, LifecycleError, MediaError};
pub use lifecycle::{HostEvent, LifecycleCoordinator, LifecycleObserver, RESULT_OK};
pub use media::{MediaAction, MediaPool, PlayerState};
pub use router::{EventRouter, EventSink, Handler};
