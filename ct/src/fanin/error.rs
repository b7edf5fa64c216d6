//! Fan-in error types

use thiserror::Error;
use tokio::task::JoinError;

use super::messages::Source;
use crate::sync::WaitGroupError;

/// Errors surfaced when a fan-in run shuts down
#[derive(Debug, Error)]
pub enum FanInError {
    #[error("{task} task failed: {source}")]
    Task {
        task: String,
        #[source]
        source: JoinError,
    },

    #[error("{producer} producer channel closed before emission {seq}")]
    ChannelClosed { producer: Source, seq: u32 },

    #[error("Completion counter misuse: {0}")]
    WaitGroup(#[from] WaitGroupError),

    #[error("Invalid fan-in configuration: {0}")]
    InvalidConfig(String),
}
