//! Process-level plumbing shared by the Event Portal binaries: configuration and logging.

pub mod config;
pub mod logging;
