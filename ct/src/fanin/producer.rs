//! Periodic producer feeding one fan-in channel

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::error::FanInError;
use super::messages::{Emission, ProducerReport, Source};
use crate::sync::WaitGroup;

/// Emits `text` every `period`, `emissions` times, then marks itself done
pub(crate) struct Producer {
    pub source: Source,
    pub period: Duration,
    pub emissions: u32,
    pub text: String,
    pub tx: mpsc::Sender<Emission>,
    pub wg: WaitGroup,
}

impl Producer {
    /// Run to completion
    ///
    /// The sender is dropped before `done()` so the producer has stopped
    /// writing by the time the completion counter can reach zero. If the task
    /// unwinds, the guard still counts it down so the watcher can fire.
    pub async fn run(self) -> Result<ProducerReport, FanInError> {
        let Producer {
            source,
            period,
            emissions,
            text,
            tx,
            wg,
        } = self;
        debug!(%source, ?period, %emissions, "Producer::run: called");
        let guard = wg.done_guard();

        let result = emit(source, period, emissions, &text, &tx).await;
        drop(tx);
        let finished_at = Instant::now();
        guard.finish()?;

        let emitted = result?;
        info!(%source, %emitted, "Producer finished");
        Ok(ProducerReport {
            source,
            emitted,
            finished_at,
        })
    }
}

async fn emit(
    source: Source,
    period: Duration,
    emissions: u32,
    text: &str,
    tx: &mpsc::Sender<Emission>,
) -> Result<u32, FanInError> {
    for seq in 0..emissions {
        tokio::time::sleep(period).await;
        tx.send(Emission {
            seq,
            text: text.to_string(),
        })
        .await
        .map_err(|_| FanInError::ChannelClosed { producer: source, seq })?;
        debug!(%source, %seq, "Producer: emitted");
    }
    Ok(emissions)
}
