//! Visual C++ platform tool provider.
//!
//! Everything comes from the installation descriptors: executable paths,
//! include and library directories. Nothing is probed; the installation
//! version is trusted as recorded.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::builder::args::{ArchiveArgs, CompileArgs, LinkArgs, VisualCppSource};
use crate::builder::compiler::{CommandLineTool, Linker, NativeCompiler, StaticLibraryArchiver};
use crate::builder::context::{AmbientEnvironment, ArgHook, EnvironmentPolicy, InvocationContext};
use crate::builder::factory::{CPreprocessorDialect, NativeCompilerFactory};
use crate::builder::toolchain::registry::ToolInvocationConfig;
use crate::builder::toolchain::{RoleCompiler, ToolchainError, ToolchainFamily};
use crate::builder::transform::{CompileStage, LinkStage, PchLanguage, Pipeline};
use crate::core::platform::{Architecture, NativePlatform};
use crate::core::role::ToolRole;
use crate::util::process::ProcessExecutor;

fn default_compiler() -> String {
    "cl.exe".to_string()
}

fn default_linker() -> String {
    "link.exe".to_string()
}

fn default_archiver() -> String {
    "lib.exe".to_string()
}

fn default_resource_compiler() -> String {
    "rc.exe".to_string()
}

/// Look up a per-architecture entry by canonical or MSVC name.
fn for_architecture<'a, T>(map: &'a BTreeMap<String, T>, arch: &Architecture) -> Option<&'a T> {
    map.get(arch.name()).or_else(|| map.get(arch.msvc_name()))
}

/// Tools and directories of a Visual C++ installation for one architecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualCppPlatform {
    pub bin_dir: PathBuf,
    pub lib_dir: PathBuf,
    pub include_dir: PathBuf,
    /// Extra directories the tools need on `PATH` (e.g. the host bin dir of
    /// a cross compiler), searched before `bin_dir`
    #[serde(default)]
    pub path: Vec<PathBuf>,
    /// Preprocessor definitions added to every compilation
    #[serde(default)]
    pub definitions: BTreeMap<String, String>,
    #[serde(default = "default_compiler")]
    pub compiler: String,
    #[serde(default = "default_linker")]
    pub linker: String,
    #[serde(default = "default_archiver")]
    pub archiver: String,
    /// Defaults to the assembler matching the architecture
    #[serde(default)]
    pub assembler: Option<String>,
}

impl VisualCppPlatform {
    fn assembler_for(&self, arch: &Architecture) -> String {
        if let Some(ref exe) = self.assembler {
            return exe.clone();
        }
        match arch {
            Architecture::I386 => "ml.exe",
            Architecture::Arm => "armasm.exe",
            Architecture::Aarch64 => "armasm64.exe",
            _ => "ml64.exe",
        }
        .to_string()
    }
}

/// A Visual C++ installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualCppInstall {
    pub name: String,
    /// Version as recorded by the installation; never verified
    pub version: semver::Version,
    /// Keyed by architecture name (`i386`, `amd64`, or `x86`, `x64`, ...)
    #[serde(default)]
    pub platforms: BTreeMap<String, VisualCppPlatform>,
}

impl VisualCppInstall {
    pub fn platform(&self, arch: &Architecture) -> Option<&VisualCppPlatform> {
        for_architecture(&self.platforms, arch)
    }
}

/// A Windows SDK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowsSdk {
    pub version: String,
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub lib_dirs: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub bin_dirs: BTreeMap<String, PathBuf>,
    #[serde(default = "default_resource_compiler")]
    pub resource_compiler: String,
}

impl WindowsSdk {
    pub fn lib_dir(&self, arch: &Architecture) -> Option<&PathBuf> {
        for_architecture(&self.lib_dirs, arch)
    }

    pub fn bin_dir(&self, arch: &Architecture) -> Option<&PathBuf> {
        for_architecture(&self.bin_dirs, arch)
    }
}

/// The Universal C Runtime, installed separately from Visual C++ 2015 on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ucrt {
    pub version: String,
    pub include_dir: PathBuf,
    #[serde(default)]
    pub lib_dirs: BTreeMap<String, PathBuf>,
}

impl Ucrt {
    pub fn lib_dir(&self, arch: &Architecture) -> Option<&PathBuf> {
        for_architecture(&self.lib_dirs, arch)
    }
}

/// Import library name for a DLL: a trailing `.dll` becomes `.lib`. Names
/// without that suffix are returned unchanged.
pub fn import_library_name(runtime_file_name: &str) -> String {
    match runtime_file_name.strip_suffix(".dll") {
        Some(base) => format!("{}.lib", base),
        None => runtime_file_name.to_string(),
    }
}

/// Compiler source kind for a role, `None` for non-compiling roles.
fn source_kind(role: ToolRole) -> Option<(VisualCppSource, Option<PchLanguage>)> {
    match role {
        ToolRole::CCompiler => Some((VisualCppSource::C, None)),
        ToolRole::CppCompiler => Some((VisualCppSource::Cpp, None)),
        ToolRole::CPchCompiler => Some((VisualCppSource::CPch, Some(PchLanguage::C))),
        ToolRole::CppPchCompiler => Some((VisualCppSource::CppPch, Some(PchLanguage::Cpp))),
        _ => None,
    }
}

/// Provides tools for one Visual C++ installation and target platform.
pub struct VisualCppPlatformToolProvider {
    target: NativePlatform,
    install: VisualCppInstall,
    sdk: WindowsSdk,
    ucrt: Option<Ucrt>,
    tools: BTreeMap<ToolRole, ToolInvocationConfig>,
    executor: Arc<dyn ProcessExecutor>,
    factory: NativeCompilerFactory,
    ambient: AmbientEnvironment,
}

impl std::fmt::Debug for VisualCppPlatformToolProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisualCppPlatformToolProvider")
            .field("target", &self.target)
            .field("install", &self.install.name)
            .field("tools", &self.tools)
            .finish()
    }
}

impl VisualCppPlatformToolProvider {
    pub fn new(
        target: NativePlatform,
        install: VisualCppInstall,
        sdk: WindowsSdk,
        ucrt: Option<Ucrt>,
        executor: Arc<dyn ProcessExecutor>,
        ambient: AmbientEnvironment,
    ) -> Self {
        let mut tools = BTreeMap::new();
        if let Some(platform) = install.platform(&target.architecture) {
            for (role, exe) in [
                (ToolRole::CCompiler, platform.compiler.clone()),
                (ToolRole::CppCompiler, platform.compiler.clone()),
                (ToolRole::Assembler, platform.assembler_for(&target.architecture)),
                (ToolRole::WindowsResourceCompiler, sdk.resource_compiler.clone()),
                (ToolRole::Linker, platform.linker.clone()),
                (ToolRole::StaticLibraryArchiver, platform.archiver.clone()),
            ] {
                tools.insert(role, ToolInvocationConfig::new(exe));
            }
        }

        VisualCppPlatformToolProvider {
            target,
            install,
            sdk,
            ucrt,
            tools,
            executor,
            factory: NativeCompilerFactory::default(),
            ambient,
        }
    }

    pub fn with_factory(mut self, factory: NativeCompilerFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Register an argument hook for a role (PCH roles share their
    /// language compiler's hook).
    pub fn with_arg_hook(mut self, role: ToolRole, hook: ArgHook) -> Self {
        if let Some(tool) = self.tools.get_mut(&role.base_tool()) {
            tool.with_hook(hook);
        }
        self
    }

    pub fn target(&self) -> &NativePlatform {
        &self.target
    }

    /// Installation version, trusted and unverified.
    pub fn installation_version(&self) -> &semver::Version {
        &self.install.version
    }

    pub fn is_supported(&self, role: ToolRole) -> bool {
        !role.is_objective_c()
    }

    fn platform(&self) -> Result<&VisualCppPlatform, ToolchainError> {
        self.install
            .platform(&self.target.architecture)
            .ok_or_else(|| self.missing_platform())
    }

    fn missing_platform(&self) -> ToolchainError {
        ToolchainError::MissingPlatform {
            family: ToolchainFamily::VisualCpp,
            platform: self.target.name.clone(),
        }
    }

    fn unsupported(&self, role: ToolRole) -> ToolchainError {
        ToolchainError::UnsupportedRole {
            role,
            family: ToolchainFamily::VisualCpp,
        }
    }

    /// Executable path and `PATH` entries for a role.
    pub fn executable(&self, role: ToolRole) -> Result<(PathBuf, Vec<PathBuf>), ToolchainError> {
        if !self.is_supported(role) {
            return Err(self.unsupported(role));
        }
        let platform = self.platform()?;
        let tool = self
            .tools
            .get(&role.base_tool())
            .ok_or_else(|| self.unsupported(role))?;

        let sdk_bin_dir = self.sdk.bin_dir(&self.target.architecture);
        let bin_dir = if role == ToolRole::WindowsResourceCompiler {
            sdk_bin_dir.cloned().ok_or_else(|| self.missing_platform())?
        } else {
            platform.bin_dir.clone()
        };

        // link.exe runs mt.exe, rc.exe and cvtres.exe from the SDK by bare name.
        let mut path = platform.path.clone();
        for dir in std::iter::once(&platform.bin_dir).chain(sdk_bin_dir) {
            if !path.contains(dir) {
                path.push(dir.clone());
            }
        }
        Ok((bin_dir.join(tool.executable()), path))
    }

    fn context(&self, role: ToolRole, path: Vec<PathBuf>) -> InvocationContext {
        let hook = self
            .tools
            .get(&role.base_tool())
            .map(|t| t.arg_hook().clone())
            .unwrap_or_default();
        InvocationContext::build(path, EnvironmentPolicy::VisualCpp, &self.ambient, hook)
    }

    fn includes_and_definitions(&self, platform: &VisualCppPlatform) -> CompileStage {
        let mut include_dirs = vec![platform.include_dir.clone()];
        include_dirs.extend(self.sdk.include_dirs.iter().cloned());
        if let Some(ref ucrt) = self.ucrt {
            include_dirs.push(ucrt.include_dir.clone());
        }
        let definitions = platform
            .definitions
            .iter()
            .map(|(name, value)| {
                let value = if value.is_empty() { None } else { Some(value.clone()) };
                (name.clone(), value)
            })
            .collect();
        CompileStage::AddIncludesAndDefinitions {
            include_dirs,
            definitions,
        }
    }

    fn tool(&self, role: ToolRole) -> Result<(CommandLineTool, InvocationContext), ToolchainError> {
        let (exe, path) = self.executable(role)?;
        let tool = CommandLineTool::new(role.tool_name(), exe, self.executor.clone());
        Ok((tool, self.context(role, path)))
    }

    /// Ready-to-invoke compiler for a role.
    pub fn compiler(&self, role: ToolRole) -> Result<RoleCompiler, ToolchainError> {
        if !self.is_supported(role) {
            return Err(self.unsupported(role));
        }
        let platform = self.platform()?;
        let object_suffix = self.target.operating_system.object_file_extension();
        let (tool, context) = self.tool(role)?;

        let compiler = match role {
            ToolRole::CCompiler
            | ToolRole::CppCompiler
            | ToolRole::CPchCompiler
            | ToolRole::CppPchCompiler => {
                let Some((kind, pch)) = source_kind(role) else {
                    return Err(self.unsupported(role));
                };
                let mut pipeline = Pipeline::identity();
                if let Some(language) = pch {
                    pipeline = pipeline.then(CompileStage::SubstitutePchSource(language));
                }
                pipeline = pipeline.then(self.includes_and_definitions(platform));
                let suffix = if role.is_pch() { ".pch" } else { object_suffix };

                let base = NativeCompiler::new(
                    tool,
                    context,
                    pipeline,
                    CompileArgs::VisualCpp(kind),
                    suffix,
                    true,
                );
                RoleCompiler::Compile(self.factory.incremental_and_parallel_compiler(
                    base,
                    CPreprocessorDialect::StandardC,
                    suffix,
                ))
            }
            ToolRole::WindowsResourceCompiler => {
                let base = NativeCompiler::new(
                    tool,
                    context,
                    Pipeline::identity().then(self.includes_and_definitions(platform)),
                    CompileArgs::VisualCpp(VisualCppSource::Resource),
                    ".res",
                    false,
                );
                RoleCompiler::Compile(self.factory.incremental_and_parallel_compiler(
                    base,
                    CPreprocessorDialect::StandardC,
                    ".res",
                ))
            }
            ToolRole::Assembler => {
                let base = NativeCompiler::new(
                    tool,
                    context,
                    Pipeline::identity().then(self.includes_and_definitions(platform)),
                    CompileArgs::VisualCpp(VisualCppSource::Assembler),
                    object_suffix,
                    false,
                );
                RoleCompiler::Compile(self.factory.compiler(base))
            }
            ToolRole::Linker => {
                let arch = &self.target.architecture;
                let sdk_lib = self
                    .sdk
                    .lib_dir(arch)
                    .cloned()
                    .ok_or_else(|| self.missing_platform())?;
                let ucrt_lib = self.ucrt.as_ref().and_then(|u| u.lib_dir(arch)).cloned();
                let pipeline = Pipeline::identity().then(LinkStage::library_path(
                    platform.lib_dir.clone(),
                    sdk_lib,
                    ucrt_lib,
                ));
                let linker = Linker::new(tool, context, pipeline, LinkArgs::VisualCpp, true);
                RoleCompiler::Link(self.factory.compiler(linker))
            }
            ToolRole::StaticLibraryArchiver => {
                let archiver = StaticLibraryArchiver::new(tool, context, ArchiveArgs::LibExe);
                RoleCompiler::Archive(self.factory.compiler(archiver))
            }
            _ => return Err(self.unsupported(role)),
        };

        tracing::debug!("Created Visual C++ {} for {}", role.tool_name(), self.target);
        Ok(compiler)
    }

    /// Name of the file to link against for a shared library.
    pub fn shared_library_link_file_name(&self, shared_library_name: &str) -> String {
        import_library_name(shared_library_name)
    }
}
