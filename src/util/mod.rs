//! Shared utilities

pub mod config;
pub mod fs;
pub mod hash;
pub mod process;

pub use config::ToolchainConfig;
pub use process::{ProcessExecutor, SystemExecutor};
