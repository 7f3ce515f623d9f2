//! Side-effecting operations: artifact storage, external processes, config, logs.

pub mod artifact;
pub mod config;
pub mod generator;
pub mod isolation;
pub mod oracle;
pub mod process;
pub mod prompt;
pub mod round_log;
