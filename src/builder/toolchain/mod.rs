//! Native toolchains: compiler identification and per-role tool providers.
//!
//! A [`PlatformToolProvider`] hands out a ready-to-invoke compiler for each
//! [`ToolRole`] its family supports. GCC-family providers probe the compiler
//! once per language; Visual C++ providers trust their installation
//! descriptor.
//!
//! Provider selection:
//! 1. Toolchain config file (`.harbour/native-toolchain.toml` or `~/.harbour/native-toolchain.toml`)
//! 2. Environment variables (CC, CXX, AR)
//! 3. Default executables searched on PATH

use std::fmt;
use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;

use crate::builder::compiler::Compiler;
use crate::builder::spec::{CompileSpec, LinkerSpec, StaticLibraryArchiverSpec};
use crate::core::platform::NativePlatform;
use crate::core::role::ToolRole;

pub mod detect;
pub mod gcc;
pub mod msvc;
pub mod probe;
pub mod registry;
pub mod search;

pub use detect::{detect_provider, provider_for_config};
pub use gcc::GccPlatformToolProvider;
pub use msvc::VisualCppPlatformToolProvider;
pub use probe::{CompilerFamily, CompilerIdentity, GccVersionDeterminer};
pub use search::{ToolNotFound, ToolSearch, ToolSearchPath};

/// Toolchain family, as named in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainFamily {
    Gcc,
    Clang,
    VisualCpp,
}

impl fmt::Display for ToolchainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ToolchainFamily::Gcc => "GCC",
            ToolchainFamily::Clang => "Clang",
            ToolchainFamily::VisualCpp => "Visual C++",
        })
    }
}

impl From<CompilerFamily> for ToolchainFamily {
    fn from(family: CompilerFamily) -> Self {
        match family {
            CompilerFamily::Gcc => ToolchainFamily::Gcc,
            CompilerFamily::Clang => ToolchainFamily::Clang,
        }
    }
}

/// Failure to construct a compiler for a role.
#[derive(Debug, Error, Diagnostic)]
pub enum ToolchainError {
    #[error("{role} is not available in the {family} toolchain")]
    #[diagnostic(
        code(harbour::toolchain::unsupported_role),
        help("Select a toolchain that provides this tool")
    )]
    UnsupportedRole { role: ToolRole, family: ToolchainFamily },

    #[error(transparent)]
    #[diagnostic(
        code(harbour::toolchain::tool_not_found),
        help("Install the tool, or set its path under [gcc] in .harbour/native-toolchain.toml")
    )]
    ToolNotFound(#[from] search::ToolNotFound),

    #[error("{family} installation has no tools for {platform}")]
    #[diagnostic(
        code(harbour::toolchain::missing_platform),
        help("Add the architecture to the installation's platforms, or pick another target")
    )]
    MissingPlatform {
        family: ToolchainFamily,
        platform: String,
    },

    #[error("{role} is unavailable: {}", .diagnostics.join(" "))]
    #[diagnostic(code(harbour::toolchain::compiler_unavailable))]
    CompilerUnavailable {
        role: ToolRole,
        diagnostics: Vec<String>,
    },
}

/// A compiler for one role, typed by the spec it takes.
#[derive(Clone)]
pub enum RoleCompiler {
    Compile(Arc<dyn Compiler<CompileSpec>>),
    Link(Arc<dyn Compiler<LinkerSpec>>),
    Archive(Arc<dyn Compiler<StaticLibraryArchiverSpec>>),
}

impl fmt::Debug for RoleCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RoleCompiler::Compile(_) => "RoleCompiler::Compile",
            RoleCompiler::Link(_) => "RoleCompiler::Link",
            RoleCompiler::Archive(_) => "RoleCompiler::Archive",
        })
    }
}

impl RoleCompiler {
    pub fn into_compile(self) -> Option<Arc<dyn Compiler<CompileSpec>>> {
        match self {
            RoleCompiler::Compile(c) => Some(c),
            _ => None,
        }
    }

    pub fn into_link(self) -> Option<Arc<dyn Compiler<LinkerSpec>>> {
        match self {
            RoleCompiler::Link(c) => Some(c),
            _ => None,
        }
    }

    pub fn into_archive(self) -> Option<Arc<dyn Compiler<StaticLibraryArchiverSpec>>> {
        match self {
            RoleCompiler::Archive(c) => Some(c),
            _ => None,
        }
    }
}

/// Tools of one toolchain for one target platform.
#[derive(Debug)]
pub enum PlatformToolProvider {
    Gcc(GccPlatformToolProvider),
    VisualCpp(VisualCppPlatformToolProvider),
}

impl PlatformToolProvider {
    pub fn family(&self) -> ToolchainFamily {
        match self {
            PlatformToolProvider::Gcc(p) => p.family(),
            PlatformToolProvider::VisualCpp(_) => ToolchainFamily::VisualCpp,
        }
    }

    pub fn target(&self) -> &NativePlatform {
        match self {
            PlatformToolProvider::Gcc(p) => p.target(),
            PlatformToolProvider::VisualCpp(p) => p.target(),
        }
    }

    pub fn is_supported(&self, role: ToolRole) -> bool {
        match self {
            PlatformToolProvider::Gcc(p) => p.is_supported(role),
            PlatformToolProvider::VisualCpp(p) => p.is_supported(role),
        }
    }

    /// Ready-to-invoke compiler for a role.
    pub fn compiler(&self, role: ToolRole) -> Result<RoleCompiler, ToolchainError> {
        match self {
            PlatformToolProvider::Gcc(p) => p.compiler(role),
            PlatformToolProvider::VisualCpp(p) => p.compiler(role),
        }
    }

    /// Executable that runs for a role.
    pub fn executable(&self, role: ToolRole) -> Result<std::path::PathBuf, ToolchainError> {
        match self {
            PlatformToolProvider::Gcc(p) => p.executable(role),
            PlatformToolProvider::VisualCpp(p) => p.executable(role).map(|(exe, _)| exe),
        }
    }

    /// Name of the file to link against for a shared library.
    pub fn shared_library_link_file_name(&self, shared_library_name: &str) -> String {
        match self {
            PlatformToolProvider::Gcc(p) => p.shared_library_link_file_name(shared_library_name),
            PlatformToolProvider::VisualCpp(p) => p.shared_library_link_file_name(shared_library_name),
        }
    }

    pub fn object_file_extension(&self) -> &'static str {
        self.target().operating_system.object_file_extension()
    }

    pub fn executable_name(&self, base: &str) -> String {
        self.target().operating_system.executable_name(base)
    }

    pub fn shared_library_name(&self, name: &str) -> String {
        self.target().operating_system.shared_library_name(name)
    }

    pub fn static_library_name(&self, name: &str) -> String {
        self.target().operating_system.static_library_name(name)
    }
}
