//! Per-role tool configuration for GCC-family toolchains.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::builder::context::ArgHook;
use crate::builder::toolchain::probe::CompilerFamily;
use crate::core::platform::{Architecture, NativePlatform};
use crate::core::role::ToolRole;
use crate::util::config::GccConfig;

/// Executable and argument hook for one role.
#[derive(Debug, Clone)]
pub struct ToolInvocationConfig {
    executable: String,
    arg_hook: ArgHook,
}

impl ToolInvocationConfig {
    pub fn new(executable: impl Into<String>) -> Self {
        ToolInvocationConfig {
            executable: executable.into(),
            arg_hook: ArgHook::none(),
        }
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn set_executable(&mut self, executable: impl Into<String>) {
        self.executable = executable.into();
    }

    pub fn arg_hook(&self) -> &ArgHook {
        &self.arg_hook
    }

    /// Run `hook` after the hooks already registered.
    pub fn with_hook(&mut self, hook: ArgHook) {
        let current = std::mem::take(&mut self.arg_hook);
        self.arg_hook = current.then(hook);
    }
}

/// Roles a GCC-family toolchain can be configured for. PCH roles share the
/// configuration of their language compiler.
pub const GCC_TOOL_ROLES: [ToolRole; 7] = [
    ToolRole::CCompiler,
    ToolRole::CppCompiler,
    ToolRole::ObjectiveCCompiler,
    ToolRole::ObjectiveCppCompiler,
    ToolRole::Assembler,
    ToolRole::Linker,
    ToolRole::StaticLibraryArchiver,
];

/// Tool layout of a GCC or Clang installation.
#[derive(Debug, Clone)]
pub struct GccPlatformToolChain {
    family: CompilerFamily,
    path: Vec<PathBuf>,
    probe_args: Vec<String>,
    use_options_file: bool,
    tools: BTreeMap<ToolRole, ToolInvocationConfig>,
}

impl GccPlatformToolChain {
    /// Default executables for the family.
    pub fn new(family: CompilerFamily) -> Self {
        let (c, cpp) = match family {
            CompilerFamily::Gcc => ("gcc", "g++"),
            CompilerFamily::Clang => ("clang", "clang++"),
        };

        let mut tools = BTreeMap::new();
        for (role, exe) in [
            (ToolRole::CCompiler, c),
            (ToolRole::CppCompiler, cpp),
            (ToolRole::ObjectiveCCompiler, c),
            (ToolRole::ObjectiveCppCompiler, cpp),
            (ToolRole::Assembler, c),
            (ToolRole::Linker, cpp),
            (ToolRole::StaticLibraryArchiver, "ar"),
        ] {
            tools.insert(role, ToolInvocationConfig::new(exe));
        }

        GccPlatformToolChain {
            family,
            path: Vec::new(),
            probe_args: Vec::new(),
            use_options_file: false,
            tools,
        }
    }

    /// Build from the `[gcc]` configuration section.
    pub fn from_config(config: &GccConfig) -> Self {
        let mut toolchain = GccPlatformToolChain::new(config.family.unwrap_or_default());
        toolchain.path = config.path.clone();
        toolchain.probe_args = config.probe_args.clone();
        toolchain.use_options_file = config.options_file.unwrap_or(false);

        for (role, tool) in &config.tools {
            let Some(invocation) = toolchain.tool_mut(*role) else {
                tracing::warn!("Ignoring configuration for {}: not a GCC tool", role.tool_name());
                continue;
            };
            if let Some(ref exe) = tool.executable {
                invocation.set_executable(exe.clone());
            }
            if !tool.args.is_empty() {
                invocation.with_hook(ArgHook::appending(tool.args.clone()));
            }
        }
        toolchain
    }

    /// Adjust for a target whose architecture differs from `natural`, the
    /// architecture the compiler produces without flags.
    pub fn for_target(mut self, target: &NativePlatform, natural: &Architecture) -> Self {
        if target.architecture == *natural {
            return self;
        }
        let flag = if target.architecture.is_i386() {
            "-m32"
        } else if target.architecture.is_amd64() {
            "-m64"
        } else {
            return self;
        };

        tracing::debug!("Targeting {} with {}", target, flag);
        for role in [
            ToolRole::CCompiler,
            ToolRole::CppCompiler,
            ToolRole::ObjectiveCCompiler,
            ToolRole::ObjectiveCppCompiler,
            ToolRole::Assembler,
            ToolRole::Linker,
        ] {
            if let Some(tool) = self.tool_mut(role) {
                tool.with_hook(ArgHook::appending(vec![flag.to_string()]));
            }
        }
        self.probe_args.push(flag.to_string());
        self
    }

    pub fn family(&self) -> CompilerFamily {
        self.family
    }

    /// Directories holding the toolchain's executables.
    pub fn path(&self) -> &[PathBuf] {
        &self.path
    }

    /// Arguments prefixed to the identity probe.
    pub fn probe_args(&self) -> &[String] {
        &self.probe_args
    }

    pub fn use_options_file(&self) -> bool {
        self.use_options_file
    }

    /// Configuration for a role; PCH roles resolve to their language compiler.
    pub fn tool(&self, role: ToolRole) -> Option<&ToolInvocationConfig> {
        self.tools.get(&role.base_tool())
    }

    pub fn tool_mut(&mut self, role: ToolRole) -> Option<&mut ToolInvocationConfig> {
        self.tools.get_mut(&role.base_tool())
    }
}
