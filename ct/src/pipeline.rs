//! Pipeline: one producer, one consumer, channel closed by the producer

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{debug, info};

use crate::console::Console;

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Names to greet, in send order
    #[serde(default = "default_names")]
    pub names: Vec<String>,

    /// Pause before each send, in milliseconds
    #[serde(rename = "delay-ms", default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_names() -> Vec<String> {
    debug!("default_names: called");
    vec!["John".to_string(), "Tom".to_string(), "Ben".to_string()]
}

fn default_delay_ms() -> u64 {
    debug!("default_delay_ms: called");
    500
}

impl Default for PipelineConfig {
    fn default() -> Self {
        debug!("PipelineConfig::default: called");
        Self {
            names: default_names(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl PipelineConfig {
    /// Pause before each send as a Duration
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Errors surfaced when the pipeline joins its producer
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Producer task failed: {0}")]
    Producer(#[source] JoinError),
}

/// Greeting sent for one name
pub fn greeting(name: &str) -> String {
    format!("Hello, {}", name)
}

/// Send a greeting per name and print each one until the producer closes the channel
pub async fn run(config: &PipelineConfig, console: &Console) -> Result<Vec<String>, PipelineError> {
    debug!(?config, "pipeline::run: called");
    let (tx, mut rx) = mpsc::channel::<String>(1);

    let names = config.names.clone();
    let delay = config.delay();
    let producer = tokio::spawn(async move {
        // tx is moved in; dropping it at the end closes the channel
        for name in names {
            tokio::time::sleep(delay).await;
            if tx.send(greeting(&name)).await.is_err() {
                break;
            }
        }
        debug!("pipeline: producer done");
    });

    let mut received = Vec::with_capacity(config.names.len());
    while let Some(hello) = rx.recv().await {
        console.line(hello.clone());
        received.push(hello);
    }
    debug!("pipeline: channel closed");

    producer.await.map_err(PipelineError::Producer)?;
    info!(received = received.len(), "Pipeline finished");
    Ok(received)
}
