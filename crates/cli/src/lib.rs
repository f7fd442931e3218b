//! eden
//!
//! Command-line client for Open Service Brokers. Provisions and binds service
//! instances, keeps their ids and credentials in a local registry, and waits
//! for asynchronous broker operations to finish.

pub mod commands;
pub mod config;
pub mod format;
pub mod poller;

pub use config::Config;
pub use poller::{OperationPoller, PollOutcome, PollSettings, StatusSource};
