//! Fan-in coordinator
//!
//! Two producers write to their own channels at different cadences. A watcher
//! waits on a completion counter and fires a one-shot done signal once both
//! have finished. The coordinator selects over all three sources, printing
//! messages until done fires, then closes every channel.

mod config;
mod core;
mod error;
mod messages;
mod producer;

pub use config::FanInConfig;
pub use core::{FanIn, RunningFanIn};
pub use error::FanInError;
pub use messages::{Delivery, Emission, FanInSummary, ProducerReport, Source};
