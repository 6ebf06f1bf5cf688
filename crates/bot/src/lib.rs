//! Process plumbing around the skein thread reconciler.
//!
//! - [`cli`]: command-line surface of the `skein` binary.
//! - [`config`]: TOML configuration with log and thread sections.
//! - [`logging`]: `tracing` subscriber setup.
//! - [`event_log`]: a notification handler that only logs.
//! - [`replay`]: scripted scenarios against the in-memory platform.

pub mod cli;
pub mod config;
pub mod event_log;
pub mod logging;
pub mod replay;
