//! Errors raised by the bridge service

use thiserror::Error;

/// Errors converting a bridge call into a command
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),
    #[error("Unknown event: {0}")]
    UnknownEvent(String),
    #[error("Invalid properties: {0}")]
    Properties(#[from] magicscript_core::PropertyError),
    #[error("Malformed call: {0}")]
    Malformed(String),
}

/// Errors submitting work to the affine task
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("Scene dispatcher has shut down")]
    Closed,
    #[error("Scene dispatcher dropped the reply")]
    NoReply,
    #[error(transparent)]
    Invalid(#[from] CommandError),
}

/// Errors raised by host lifecycle transitions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LifecycleError {
    #[error("Host has been destroyed")]
    Destroyed,
}

/// Errors raised by the media player pool
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MediaError {
    #[error("Media pool exhausted ({capacity} players in use)")]
    PoolExhausted { capacity: usize },
    #[error("No media player for node {0}")]
    UnknownPlayer(String),
    #[error("Media pool has been destroyed")]
    Destroyed,
}
