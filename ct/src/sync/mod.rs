//! Synchronization primitives shared by the demos

mod wait_group;

pub use wait_group::{DoneGuard, WaitGroup, WaitGroupError};
