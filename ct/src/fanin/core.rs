//! Fan-in coordinator: two periodic producers merged through one select loop

use std::time::Instant;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::FanInConfig;
use super::error::FanInError;
use super::messages::{Delivery, Emission, FanInSummary, ProducerReport, Source};
use super::producer::Producer;
use crate::console::Console;
use crate::sync::WaitGroup;

/// Output channels hold one message; the closest tokio gets to a rendezvous channel
const OUTPUT_CHANNEL_CAPACITY: usize = 1;

/// Result of one multiplexed wait
enum Event {
    Message(Source, Emission),
    Done { signaled: bool },
}

/// Builds and starts a fan-in run
pub struct FanIn {
    config: FanInConfig,
    console: Console,
}

impl FanIn {
    /// Create a new FanIn with the given configuration
    pub fn new(config: FanInConfig, console: Console) -> Self {
        Self { config, console }
    }

    /// Spawn both producers and the done-watcher
    ///
    /// Must be called from within a tokio runtime. Nothing is spawned if the
    /// configuration is invalid.
    pub fn start(self) -> Result<RunningFanIn, FanInError> {
        debug!(config = ?self.config, "FanIn::start: called");
        self.config.validate()?;
        let (Some(fast_period), Some(slow_period)) = (self.config.fast_period(), self.config.slow_period()) else {
            return Err(FanInError::InvalidConfig("producer period overflows".to_string()));
        };
        let started = Instant::now();

        let (fast_tx, fast_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let (slow_tx, slow_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let (done_tx, done_rx) = oneshot::channel();
        let wg = WaitGroup::new(2);

        let watcher = {
            let wg = wg.clone();
            tokio::spawn(async move {
                wg.wait().await;
                debug!("FanIn watcher: all producers finished");
                if done_tx.send(()).is_err() {
                    warn!("FanIn watcher: coordinator gone before done signal");
                }
            })
        };

        let fast = Producer {
            source: Source::Fast,
            period: fast_period,
            emissions: self.config.emissions,
            text: format!("{} sec", self.config.fast_interval),
            tx: fast_tx,
            wg: wg.clone(),
        };
        let slow = Producer {
            source: Source::Slow,
            period: slow_period,
            emissions: self.config.emissions,
            text: format!("{} sec", self.config.slow_interval),
            tx: slow_tx,
            wg,
        };
        let producers = vec![
            (Source::Fast, tokio::spawn(fast.run())),
            (Source::Slow, tokio::spawn(slow.run())),
        ];

        info!("FanIn started");
        Ok(RunningFanIn {
            console: self.console,
            fast_rx,
            slow_rx,
            done_rx,
            producers,
            watcher,
            deliveries: Vec::new(),
            started,
        })
    }

    /// Start and run until both producers are done
    pub async fn run(self) -> Result<FanInSummary, FanInError> {
        self.start()?.run().await
    }
}

/// A started fan-in; owns the read side of all three channels
pub struct RunningFanIn {
    console: Console,
    fast_rx: mpsc::Receiver<Emission>,
    slow_rx: mpsc::Receiver<Emission>,
    done_rx: oneshot::Receiver<()>,
    producers: Vec<(Source, JoinHandle<Result<ProducerReport, FanInError>>)>,
    watcher: JoinHandle<()>,
    deliveries: Vec<Delivery>,
    started: Instant,
}

impl RunningFanIn {
    /// Drive the select loop, release the channels, and collect every task
    pub async fn run(mut self) -> Result<FanInSummary, FanInError> {
        let (done_observed_at, drained_after_done) = self.select_until_done().await;
        self.release();

        let RunningFanIn {
            producers: handles,
            watcher,
            deliveries,
            started,
            ..
        } = self;

        watcher.await.map_err(|source| FanInError::Task {
            task: "watcher".to_string(),
            source,
        })?;

        let mut producers = Vec::with_capacity(handles.len());
        for (source, handle) in handles {
            let report = handle.await.map_err(|join_err| FanInError::Task {
                task: format!("{} producer", source),
                source: join_err,
            })??;
            producers.push(report);
        }

        let elapsed = started.elapsed();
        info!(deliveries = deliveries.len(), ?elapsed, "FanIn finished");
        Ok(FanInSummary {
            deliveries,
            drained_after_done,
            producers,
            done_observed_at,
            elapsed,
        })
    }

    /// Print messages as they arrive until the done signal fires
    ///
    /// Returns when the signal was observed and how many messages were still
    /// buffered at that point.
    async fn select_until_done(&mut self) -> (Instant, usize) {
        loop {
            let event = tokio::select! {
                Some(emission) = self.fast_rx.recv() => Event::Message(Source::Fast, emission),
                Some(emission) = self.slow_rx.recv() => Event::Message(Source::Slow, emission),
                signal = &mut self.done_rx => Event::Done { signaled: signal.is_ok() },
            };

            match event {
                Event::Message(source, emission) => self.deliver(source, emission),
                Event::Done { signaled } => return self.on_done(signaled),
            }
        }
    }

    fn on_done(&mut self, signaled: bool) -> (Instant, usize) {
        let observed_at = Instant::now();
        if !signaled {
            warn!("FanIn: done signal dropped without firing");
        }
        (observed_at, self.drain_buffered())
    }

    /// A producer's last send can complete into the buffer before the watcher fires
    fn drain_buffered(&mut self) -> usize {
        let mut drained = 0;
        while let Ok(emission) = self.fast_rx.try_recv() {
            self.deliver(Source::Fast, emission);
            drained += 1;
        }
        while let Ok(emission) = self.slow_rx.try_recv() {
            self.deliver(Source::Slow, emission);
            drained += 1;
        }
        if drained > 0 {
            debug!(%drained, "FanIn: drained buffered messages after done");
        }
        drained
    }

    fn deliver(&mut self, source: Source, emission: Emission) {
        debug!(%source, seq = emission.seq, "FanIn: delivered");
        self.console.line(emission.text.clone());
        self.deliveries.push(Delivery {
            source,
            seq: emission.seq,
            text: emission.text,
        });
    }

    /// Close all three channels; nothing reads or writes them afterwards
    fn release(&mut self) {
        debug!("FanIn: releasing channels");
        self.fast_rx.close();
        self.slow_rx.close();
        self.done_rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot::error::TryRecvError;

    fn quick_config() -> FanInConfig {
        FanInConfig {
            time_unit_ms: 10,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_channels_closed_after_release() {
        let mut running = FanIn::new(quick_config(), Console::capture()).start().unwrap();

        tokio::time::timeout(Duration::from_secs(5), running.select_until_done())
            .await
            .expect("fan-in should finish");
        running.release();

        assert!(running.fast_rx.recv().await.is_none());
        assert!(running.slow_rx.recv().await.is_none());
        assert!(matches!(running.done_rx.try_recv(), Err(TryRecvError::Closed)));
        assert_eq!(running.deliveries.len(), 6);
    }

    #[tokio::test]
    async fn test_run_prints_each_message() {
        let console = Console::capture();
        let summary = tokio::time::timeout(Duration::from_secs(5), FanIn::new(quick_config(), console.clone()).run())
            .await
            .expect("fan-in should finish")
            .unwrap();

        let lines = console.lines();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines.iter().filter(|l| *l == "1 sec").count(), 3);
        assert_eq!(lines.iter().filter(|l| *l == "2 sec").count(), 3);
        let delivered: Vec<_> = summary.deliveries.iter().map(|d| d.text.clone()).collect();
        assert_eq!(lines, delivered);
    }

    #[tokio::test]
    async fn test_labels_follow_intervals() {
        let config = FanInConfig {
            time_unit_ms: 5,
            emissions: 1,
            fast_interval: 3,
            slow_interval: 4,
        };
        let summary = FanIn::new(config, Console::capture()).run().await.unwrap();

        assert_eq!(summary.from_source(Source::Fast).next().unwrap().text, "3 sec");
        assert_eq!(summary.from_source(Source::Slow).next().unwrap().text, "4 sec");
    }

    fn assemble(
        console: Console,
        fast_rx: mpsc::Receiver<Emission>,
        slow_rx: mpsc::Receiver<Emission>,
        done_rx: oneshot::Receiver<()>,
        producers: Vec<(Source, JoinHandle<Result<ProducerReport, FanInError>>)>,
        watcher: JoinHandle<()>,
    ) -> RunningFanIn {
        RunningFanIn {
            console,
            fast_rx,
            slow_rx,
            done_rx,
            producers,
            watcher,
            deliveries: Vec::new(),
            started: Instant::now(),
        }
    }

    fn emission(seq: u32, text: &str) -> Emission {
        Emission {
            seq,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_done_drains_buffered_message() {
        let console = Console::capture();
        let (fast_tx, fast_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let (slow_tx, slow_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let (_done_tx, done_rx) = oneshot::channel();

        fast_tx.send(emission(2, "1 sec")).await.unwrap();
        drop(fast_tx);
        drop(slow_tx);

        let mut running = assemble(console.clone(), fast_rx, slow_rx, done_rx, Vec::new(), tokio::spawn(async {}));
        let (_, drained) = running.on_done(true);

        assert_eq!(drained, 1);
        assert_eq!(console.lines(), vec!["1 sec"]);
        assert_eq!(running.deliveries[0].source, Source::Fast);
        assert_eq!(running.deliveries[0].seq, 2);
    }

    #[tokio::test]
    async fn test_done_drains_both_streams_in_order() {
        let console = Console::capture();
        let (fast_tx, fast_rx) = mpsc::channel(2);
        let (slow_tx, slow_rx) = mpsc::channel(2);
        let (_done_tx, done_rx) = oneshot::channel();

        fast_tx.send(emission(1, "1 sec")).await.unwrap();
        fast_tx.send(emission(2, "1 sec")).await.unwrap();
        slow_tx.send(emission(2, "2 sec")).await.unwrap();

        let mut running = assemble(console.clone(), fast_rx, slow_rx, done_rx, Vec::new(), tokio::spawn(async {}));
        let (_, drained) = running.on_done(true);

        assert_eq!(drained, 3);
        assert_eq!(console.lines(), vec!["1 sec", "1 sec", "2 sec"]);
        let fast_seqs: Vec<u32> = running
            .deliveries
            .iter()
            .filter(|d| d.source == Source::Fast)
            .map(|d| d.seq)
            .collect();
        assert_eq!(fast_seqs, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_message_buffered_when_done_fires_is_not_lost() {
        let console = Console::capture();
        let (fast_tx, fast_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let (slow_tx, slow_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let (done_tx, done_rx) = oneshot::channel();

        fast_tx.send(emission(0, "1 sec")).await.unwrap();
        drop(fast_tx);
        drop(slow_tx);
        done_tx.send(()).unwrap();

        let running = assemble(console.clone(), fast_rx, slow_rx, done_rx, Vec::new(), tokio::spawn(async {}));
        let summary = tokio::time::timeout(Duration::from_secs(1), running.run())
            .await
            .expect("run should finish")
            .unwrap();

        // Either select! took the message first or the drain did; it is printed once
        assert_eq!(summary.deliveries.len(), 1);
        assert!(summary.drained_after_done <= 1);
        assert_eq!(console.lines(), vec!["1 sec"]);
    }

    fn blow_up() {
        panic!("producer blew up");
    }

    #[tokio::test]
    async fn test_panicking_producer_surfaces_as_task_error() {
        let (fast_tx, fast_rx) = mpsc::channel::<Emission>(OUTPUT_CHANNEL_CAPACITY);
        let (slow_tx, slow_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        drop(slow_tx);
        let (done_tx, done_rx) = oneshot::channel();
        let wg = WaitGroup::new(1);

        let watcher = {
            let wg = wg.clone();
            tokio::spawn(async move {
                wg.wait().await;
                let _ = done_tx.send(());
            })
        };
        let producer = tokio::spawn(async move {
            let _guard = wg.done_guard();
            let _tx = fast_tx;
            blow_up();
            Ok::<_, FanInError>(ProducerReport {
                source: Source::Fast,
                emitted: 0,
                finished_at: Instant::now(),
            })
        });

        let running = assemble(
            Console::capture(),
            fast_rx,
            slow_rx,
            done_rx,
            vec![(Source::Fast, producer)],
            watcher,
        );
        let err = tokio::time::timeout(Duration::from_secs(1), running.run())
            .await
            .expect("coordinator must not hang on a panicked producer")
            .unwrap_err();

        match err {
            FanInError::Task { task, source } => {
                assert_eq!(task, "fast producer");
                assert!(source.is_panic());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_start_rejects_overflowing_interval() {
        let config = FanInConfig {
            fast_interval: u64::from(u32::MAX) + 1,
            ..Default::default()
        };
        let result = FanIn::new(config, Console::capture()).start();
        assert!(matches!(result, Err(FanInError::InvalidConfig(_))));
    }
}
