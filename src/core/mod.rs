//! Core data structures.
//!
//! - Target platforms (operating system and architecture)
//! - Tool roles

pub mod platform;
pub mod role;

pub use platform::{Architecture, NativePlatform, OperatingSystem};
pub use role::ToolRole;
