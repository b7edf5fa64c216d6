//! channeltour - channel coordination walkthroughs on tokio
//!
//! Small, self-contained demos of task coordination:
//!
//! - [`fanin`] - two periodic producers merged through one `select!` loop,
//!   shut down by a one-shot done signal gated on a completion counter
//! - [`fanout`] - a batch of workers synchronized by a wait group
//! - [`pipeline`] - producer/consumer over a channel the producer closes
//! - [`sync`] - the [`WaitGroup`] completion counter the demos share
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod console;
pub mod fanin;
pub mod fanout;
pub mod pipeline;
pub mod sync;

pub use config::Config;
pub use console::Console;
pub use fanin::{FanIn, FanInConfig, FanInError, FanInSummary, Source};
pub use fanout::{FanOutConfig, FanOutError, FanOutSummary};
pub use pipeline::{PipelineConfig, PipelineError};
pub use sync::{WaitGroup, WaitGroupError};
