//! Fan-out: run a batch of workers concurrently and wait for all of them

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, info};

use crate::console::Console;
use crate::sync::{WaitGroup, WaitGroupError};

/// Fan-out configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanOutConfig {
    /// Number of workers to spawn
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// How long each worker's unit of work takes, in milliseconds
    #[serde(rename = "work-ms", default = "default_work_ms")]
    pub work_ms: u64,
}

fn default_workers() -> usize {
    debug!("default_workers: called");
    5
}

fn default_work_ms() -> u64 {
    debug!("default_work_ms: called");
    1000
}

impl Default for FanOutConfig {
    fn default() -> Self {
        debug!("FanOutConfig::default: called");
        Self {
            workers: default_workers(),
            work_ms: default_work_ms(),
        }
    }
}

impl FanOutConfig {
    /// One worker's unit of work as a Duration
    pub fn work(&self) -> Duration {
        Duration::from_millis(self.work_ms)
    }
}

/// Errors surfaced when a fan-out run collects its workers
#[derive(Debug, Error)]
pub enum FanOutError {
    #[error("Worker {index} failed: {source}")]
    Worker {
        index: usize,
        #[source]
        source: JoinError,
    },

    #[error("Completion counter misuse: {0}")]
    WaitGroup(#[from] WaitGroupError),
}

/// Outcome of a fan-out run
#[derive(Debug, Clone)]
pub struct FanOutSummary {
    pub completed: usize,
    pub elapsed: Duration,
}

/// Spawn every worker, block on the wait group, then report elapsed time
pub async fn run(config: &FanOutConfig, console: &Console) -> Result<FanOutSummary, FanOutError> {
    debug!(?config, "fanout::run: called");
    console.line(format!("Do {} works using tasks", config.workers));

    let wg = WaitGroup::new(config.workers);
    let start = Instant::now();

    let handles: Vec<_> = (0..config.workers)
        .map(|index| {
            let wg = wg.clone();
            let console = console.clone();
            let work = config.work();
            tokio::spawn(async move {
                let guard = wg.done_guard();
                tokio::time::sleep(work).await;
                console.line("Some work is done!");
                debug!(%index, "fanout: worker finished");
                guard.finish()
            })
        })
        .collect();

    wg.wait().await;
    let elapsed = start.elapsed();

    for (index, handle) in handles.into_iter().enumerate() {
        handle.await.map_err(|source| FanOutError::Worker { index, source })??;
    }

    console.line(format!("took: {:.2?}", elapsed));
    info!(workers = config.workers, ?elapsed, "Fan-out finished");
    Ok(FanOutSummary {
        completed: config.workers,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_workers_run_concurrently() {
        let config = FanOutConfig {
            workers: 5,
            work_ms: 100,
        };
        let console = Console::capture();

        let summary = tokio::time::timeout(Duration::from_secs(5), run(&config, &console))
            .await
            .expect("fan-out should finish")
            .unwrap();

        assert_eq!(summary.completed, 5);
        assert!(summary.elapsed >= Duration::from_millis(100));
        assert!(
            summary.elapsed < Duration::from_millis(400),
            "workers should overlap, took {:?}",
            summary.elapsed
        );
    }

    #[tokio::test]
    async fn test_output_lines() {
        let config = FanOutConfig {
            workers: 3,
            work_ms: 5,
        };
        let console = Console::capture();
        run(&config, &console).await.unwrap();

        let lines = console.lines();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "Do 3 works using tasks");
        assert!(lines[1..4].iter().all(|l| l == "Some work is done!"));
        assert!(lines[4].starts_with("took: "));
    }

    #[tokio::test]
    async fn test_zero_workers() {
        let config = FanOutConfig { workers: 0, work_ms: 5 };
        let summary = run(&config, &Console::capture()).await.unwrap();
        assert_eq!(summary.completed, 0);
    }
}
