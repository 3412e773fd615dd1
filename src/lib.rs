//! harbour-native - Native toolchain abstraction for Harbour
//!
//! This crate identifies GCC and Clang compilers by their predefined macros
//! and hands out ready-to-invoke compilers, linkers and archivers for each
//! tool role of the GCC and Visual C++ toolchain families.

pub mod builder;
pub mod core;
pub mod util;

/// Test utilities and mocks for unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a scripted process executor, a fixed tool
/// search and canned compiler outputs.
#[cfg(test)]
pub mod test_support;

pub use builder::toolchain::{
    detect_provider, provider_for_config, CompilerFamily, CompilerIdentity, GccVersionDeterminer,
    PlatformToolProvider, RoleCompiler, ToolchainError,
};
pub use crate::core::{NativePlatform, ToolRole};
