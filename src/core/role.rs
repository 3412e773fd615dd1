//! Semantic tool roles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One semantic job a native toolchain performs.
///
/// The set is closed. A toolchain family supports a subset of these roles;
/// asking a provider for a role outside that subset is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolRole {
    CCompiler,
    CppCompiler,
    CPchCompiler,
    CppPchCompiler,
    ObjectiveCCompiler,
    ObjectiveCppCompiler,
    ObjectiveCPchCompiler,
    ObjectiveCppPchCompiler,
    Assembler,
    WindowsResourceCompiler,
    Linker,
    StaticLibraryArchiver,
}

impl ToolRole {
    /// Every role, in declaration order.
    pub const ALL: [ToolRole; 12] = [
        ToolRole::CCompiler,
        ToolRole::CppCompiler,
        ToolRole::CPchCompiler,
        ToolRole::CppPchCompiler,
        ToolRole::ObjectiveCCompiler,
        ToolRole::ObjectiveCppCompiler,
        ToolRole::ObjectiveCPchCompiler,
        ToolRole::ObjectiveCppPchCompiler,
        ToolRole::Assembler,
        ToolRole::WindowsResourceCompiler,
        ToolRole::Linker,
        ToolRole::StaticLibraryArchiver,
    ];

    /// Human-readable tool name used in messages.
    pub fn tool_name(&self) -> &'static str {
        match self {
            ToolRole::CCompiler => "C compiler",
            ToolRole::CppCompiler => "C++ compiler",
            ToolRole::CPchCompiler => "C PCH compiler",
            ToolRole::CppPchCompiler => "C++ PCH compiler",
            ToolRole::ObjectiveCCompiler => "Objective-C compiler",
            ToolRole::ObjectiveCppCompiler => "Objective-C++ compiler",
            ToolRole::ObjectiveCPchCompiler => "Objective-C PCH compiler",
            ToolRole::ObjectiveCppPchCompiler => "Objective-C++ PCH compiler",
            ToolRole::Assembler => "assembler",
            ToolRole::WindowsResourceCompiler => "Windows resource compiler",
            ToolRole::Linker => "linker",
            ToolRole::StaticLibraryArchiver => "static library archiver",
        }
    }

    /// Configuration key for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolRole::CCompiler => "c-compiler",
            ToolRole::CppCompiler => "cpp-compiler",
            ToolRole::CPchCompiler => "c-pch-compiler",
            ToolRole::CppPchCompiler => "cpp-pch-compiler",
            ToolRole::ObjectiveCCompiler => "objective-c-compiler",
            ToolRole::ObjectiveCppCompiler => "objective-cpp-compiler",
            ToolRole::ObjectiveCPchCompiler => "objective-c-pch-compiler",
            ToolRole::ObjectiveCppPchCompiler => "objective-cpp-pch-compiler",
            ToolRole::Assembler => "assembler",
            ToolRole::WindowsResourceCompiler => "windows-resource-compiler",
            ToolRole::Linker => "linker",
            ToolRole::StaticLibraryArchiver => "static-library-archiver",
        }
    }

    /// The role whose tool configuration this role runs.
    ///
    /// Precompiled-header roles run their language's compiler.
    pub fn base_tool(&self) -> ToolRole {
        match self {
            ToolRole::CPchCompiler => ToolRole::CCompiler,
            ToolRole::CppPchCompiler => ToolRole::CppCompiler,
            ToolRole::ObjectiveCPchCompiler => ToolRole::ObjectiveCCompiler,
            ToolRole::ObjectiveCppPchCompiler => ToolRole::ObjectiveCppCompiler,
            other => *other,
        }
    }

    pub fn is_pch(&self) -> bool {
        matches!(
            self,
            ToolRole::CPchCompiler
                | ToolRole::CppPchCompiler
                | ToolRole::ObjectiveCPchCompiler
                | ToolRole::ObjectiveCppPchCompiler
        )
    }

    pub fn is_objective_c(&self) -> bool {
        matches!(
            self,
            ToolRole::ObjectiveCCompiler
                | ToolRole::ObjectiveCppCompiler
                | ToolRole::ObjectiveCPchCompiler
                | ToolRole::ObjectiveCppPchCompiler
        )
    }
}

impl fmt::Display for ToolRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool_name())
    }
}

impl FromStr for ToolRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolRole::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown tool role: {}", s))
    }
}
