//! Message and report types for the fan-in coordinator

use std::fmt;
use std::time::{Duration, Instant};

/// Which producer a message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Fast,
    Slow,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Fast => write!(f, "fast"),
            Source::Slow => write!(f, "slow"),
        }
    }
}

/// One message on a producer's output channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    /// Position in the producer's stream, starting at 0
    pub seq: u32,
    pub text: String,
}

/// A message as observed by the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub source: Source,
    pub seq: u32,
    pub text: String,
}

/// What a producer reports once it has stopped writing
#[derive(Debug, Clone)]
pub struct ProducerReport {
    pub source: Source,
    pub emitted: u32,
    pub finished_at: Instant,
}

/// Outcome of one fan-in run
#[derive(Debug, Clone)]
pub struct FanInSummary {
    /// Messages in the order the coordinator printed them
    pub deliveries: Vec<Delivery>,
    /// How many of those were still buffered when the done signal fired
    pub drained_after_done: usize,
    pub producers: Vec<ProducerReport>,
    pub done_observed_at: Instant,
    pub elapsed: Duration,
}

impl FanInSummary {
    /// Deliveries from one producer, in arrival order
    pub fn from_source(&self, source: Source) -> impl Iterator<Item = &Delivery> {
        self.deliveries.iter().filter(move |d| d.source == source)
    }

    /// Number of deliveries from one producer
    pub fn count(&self, source: Source) -> usize {
        self.from_source(source).count()
    }

    /// Report for one producer, if it finished
    pub fn producer(&self, source: Source) -> Option<&ProducerReport> {
        self.producers.iter().find(|p| p.source == source)
    }
}
