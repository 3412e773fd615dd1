//! Native compiler drivers.
//!
//! This module turns compile, link and archive specs into tool invocations
//! and assembles them into per-role compilers for each toolchain family.

pub mod args;
pub mod compiler;
pub mod context;
pub mod decorators;
pub mod factory;
pub mod naming;
pub mod options_file;
pub mod spec;
pub mod toolchain;
pub mod transform;

pub use compiler::{Compiler, CompilerVersion, WorkResult};
pub use context::{AmbientEnvironment, InvocationContext};
pub use factory::NativeCompilerFactory;
pub use spec::{CompileSpec, LinkKind, LinkerSpec, StaticLibraryArchiverSpec};
pub use toolchain::{PlatformToolProvider, RoleCompiler, ToolchainError};
