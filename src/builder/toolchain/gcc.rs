//! GCC and Clang platform tool provider.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::builder::args::{ArchiveArgs, CompileArgs, GccLanguage, LinkArgs};
use crate::builder::compiler::{CommandLineTool, Linker, NativeCompiler, StaticLibraryArchiver};
use crate::builder::context::{AmbientEnvironment, EnvironmentPolicy, InvocationContext};
use crate::builder::decorators::{OutputCleaningCompiler, VersionAwareCompiler};
use crate::builder::factory::{CPreprocessorDialect, NativeCompilerFactory};
use crate::builder::toolchain::probe::{CompilerIdentity, GccVersionDeterminer};
use crate::builder::toolchain::registry::GccPlatformToolChain;
use crate::builder::toolchain::search::ToolSearch;
use crate::builder::toolchain::{RoleCompiler, ToolchainError, ToolchainFamily};
use crate::builder::transform::Pipeline;
use crate::core::platform::{Architecture, NativePlatform};
use crate::core::role::ToolRole;
use crate::util::process::ProcessExecutor;

/// Suffix of GCC precompiled headers.
pub const PCH_SUFFIX: &str = ".h.gch";

fn language(role: ToolRole) -> Option<GccLanguage> {
    Some(match role {
        ToolRole::CCompiler => GccLanguage::C,
        ToolRole::CppCompiler => GccLanguage::Cpp,
        ToolRole::ObjectiveCCompiler => GccLanguage::ObjectiveC,
        ToolRole::ObjectiveCppCompiler => GccLanguage::ObjectiveCpp,
        ToolRole::CPchCompiler => GccLanguage::CHeader,
        ToolRole::CppPchCompiler => GccLanguage::CppHeader,
        ToolRole::ObjectiveCPchCompiler => GccLanguage::ObjectiveCHeader,
        ToolRole::ObjectiveCppPchCompiler => GccLanguage::ObjectiveCppHeader,
        ToolRole::Assembler => GccLanguage::Assembler,
        _ => return None,
    })
}

/// Provides tools for one GCC-family toolchain and target platform.
///
/// Compiler identities are probed lazily, once per compiler binary. Roles
/// that run the same binary (C and Objective-C on `gcc`, a language and its
/// PCH role) share one probe.
pub struct GccPlatformToolProvider {
    target: NativePlatform,
    toolchain: GccPlatformToolChain,
    search: Arc<dyn ToolSearch>,
    executor: Arc<dyn ProcessExecutor>,
    determiner: GccVersionDeterminer,
    factory: NativeCompilerFactory,
    ambient: AmbientEnvironment,
    identities: Mutex<BTreeMap<PathBuf, Arc<OnceLock<CompilerIdentity>>>>,
}

impl std::fmt::Debug for GccPlatformToolProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GccPlatformToolProvider")
            .field("target", &self.target)
            .field("toolchain", &self.toolchain)
            .field("search", &self.search)
            .finish()
    }
}

impl GccPlatformToolProvider {
    pub fn new(
        target: NativePlatform,
        toolchain: GccPlatformToolChain,
        search: Arc<dyn ToolSearch>,
        executor: Arc<dyn ProcessExecutor>,
        ambient: AmbientEnvironment,
    ) -> Self {
        let determiner = GccVersionDeterminer::new(toolchain.family(), executor.clone());
        GccPlatformToolProvider {
            target,
            toolchain,
            search,
            executor,
            determiner,
            factory: NativeCompilerFactory::default(),
            ambient,
            identities: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn with_factory(mut self, factory: NativeCompilerFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Architecture reported for dumps naming neither i386 nor amd64.
    pub fn with_host_architecture(mut self, architecture: Architecture) -> Self {
        self.determiner = self.determiner.with_host_architecture(architecture);
        self
    }

    pub fn target(&self) -> &NativePlatform {
        &self.target
    }

    pub fn toolchain(&self) -> &GccPlatformToolChain {
        &self.toolchain
    }

    pub fn family(&self) -> ToolchainFamily {
        self.toolchain.family().into()
    }

    pub fn is_supported(&self, role: ToolRole) -> bool {
        self.toolchain.tool(role).is_some()
    }

    fn unsupported(&self, role: ToolRole) -> ToolchainError {
        ToolchainError::UnsupportedRole {
            role,
            family: self.family(),
        }
    }

    /// Locate the executable for a role.
    pub fn executable(&self, role: ToolRole) -> Result<PathBuf, ToolchainError> {
        let tool = self
            .toolchain
            .tool(role)
            .ok_or_else(|| self.unsupported(role))?;
        Ok(self.search.locate(role, tool.executable())?)
    }

    /// Identity of the compiler behind a compilation role, probed on first use.
    pub fn compiler_identity(&self, role: ToolRole) -> Result<CompilerIdentity, ToolchainError> {
        let base = role.base_tool();
        if !matches!(
            base,
            ToolRole::CCompiler
                | ToolRole::CppCompiler
                | ToolRole::ObjectiveCCompiler
                | ToolRole::ObjectiveCppCompiler
        ) {
            return Err(self.unsupported(role));
        }

        // Probe args are fixed per provider, so the binary alone keys the probe.
        let binary = self.executable(base)?;
        let slot = self
            .identities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(binary.clone())
            .or_default()
            .clone();

        let identity = slot.get_or_init(|| {
            let identity = self.determiner.identify(&binary, self.toolchain.probe_args());
            match identity.resolved() {
                Some(resolved) => tracing::debug!(
                    "Found {} {} for {}",
                    resolved.family,
                    resolved.version,
                    self.target
                ),
                None => tracing::debug!(
                    "{} is unavailable: {}",
                    base.tool_name(),
                    identity.diagnostics().join(" ")
                ),
            }
            identity
        });
        Ok(identity.clone())
    }

    fn context(&self, role: ToolRole) -> InvocationContext {
        let hook = self
            .toolchain
            .tool(role)
            .map(|t| t.arg_hook().clone())
            .unwrap_or_default();
        InvocationContext::build(
            self.search.path().to_vec(),
            EnvironmentPolicy::Gcc,
            &self.ambient,
            hook,
        )
    }

    /// Ready-to-invoke compiler for a role.
    pub fn compiler(&self, role: ToolRole) -> Result<RoleCompiler, ToolchainError> {
        if !self.is_supported(role) {
            return Err(self.unsupported(role));
        }

        let executable = self.executable(role)?;
        let tool = CommandLineTool::new(role.tool_name(), executable, self.executor.clone());
        let context = self.context(role);
        let target_os = self.target.operating_system;
        let object_suffix = target_os.object_file_extension();

        let compiler = match role {
            ToolRole::Assembler => {
                let base = NativeCompiler::new(
                    tool,
                    context,
                    Pipeline::identity(),
                    CompileArgs::Gcc {
                        language: GccLanguage::Assembler,
                        target_os,
                    },
                    object_suffix,
                    // Custom assemblers reject `@file` arguments.
                    false,
                );
                RoleCompiler::Compile(self.factory.compiler(base))
            }
            ToolRole::Linker => {
                let linker = Linker::new(
                    tool,
                    context,
                    Pipeline::identity(),
                    LinkArgs::Gcc { target_os },
                    self.toolchain.use_options_file(),
                );
                RoleCompiler::Link(self.factory.compiler(linker))
            }
            ToolRole::StaticLibraryArchiver => {
                let archiver = StaticLibraryArchiver::new(tool, context, ArchiveArgs::Ar);
                RoleCompiler::Archive(self.factory.compiler(archiver))
            }
            _ => {
                let Some(language) = language(role) else {
                    return Err(self.unsupported(role));
                };
                let resolved = match self.compiler_identity(role)? {
                    CompilerIdentity::Available(resolved) => resolved,
                    CompilerIdentity::Broken(broken) => {
                        return Err(ToolchainError::CompilerUnavailable {
                            role,
                            diagnostics: broken.diagnostics,
                        })
                    }
                };

                let suffix = if role.is_pch() { PCH_SUFFIX } else { object_suffix };
                let base = NativeCompiler::new(
                    tool,
                    context,
                    Pipeline::identity(),
                    CompileArgs::Gcc { language, target_os },
                    suffix,
                    self.toolchain.use_options_file(),
                );
                let incremental = self.factory.incremental_and_parallel_compiler(
                    base,
                    CPreprocessorDialect::Gcc,
                    suffix,
                );
                let cleaning = OutputCleaningCompiler::new(incremental, suffix);
                RoleCompiler::Compile(Arc::new(VersionAwareCompiler::new(
                    Arc::new(cleaning),
                    resolved.compiler_version(),
                    resolved.system_includes.clone(),
                )))
            }
        };

        tracing::debug!("Created {} {} for {}", self.family(), role.tool_name(), self.target);
        Ok(compiler)
    }

    /// Name of the file to link against for a shared library.
    pub fn shared_library_link_file_name(&self, shared_library_name: &str) -> String {
        shared_library_name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::builder::spec::{CompileSpec, LinkKind, LinkerSpec};
    use crate::builder::toolchain::probe::CompilerFamily;
    use crate::core::platform::OperatingSystem;
    use crate::util::config::GccConfig;
    use crate::test_support::{compiler_outputs, FakeToolSearch, MacroDump, MockExecutor, MockProcessOutput};
    use tempfile::TempDir;

    const BIN: &str = "/toolchain/bin";

    fn search() -> Arc<FakeToolSearch> {
        Arc::new(FakeToolSearch::new().with_tools_in(BIN, &["gcc", "g++", "ar", "clang", "clang++"]))
    }

    fn linux() -> NativePlatform {
        NativePlatform::new(OperatingSystem::Linux, Architecture::Amd64)
    }

    fn provider(executor: Arc<MockExecutor>, family: CompilerFamily) -> GccPlatformToolProvider {
        GccPlatformToolProvider::new(
            linux(),
            GccPlatformToolChain::new(family),
            search(),
            executor,
            AmbientEnvironment::from_vars([("PATH", "/usr/bin")]),
        )
    }

    fn probes(executor: &MockExecutor) -> usize {
        executor
            .commands()
            .iter()
            .filter(|c| c.ends_with("-dM -E -"))
            .count()
    }

    #[test]
    fn test_compile_role_stamps_version() {
        let tmp = TempDir::new().unwrap();
        let executor = Arc::new(MockExecutor::new());
        executor.expect("/toolchain/bin/gcc -dM -E -", compiler_outputs::gcc_defines(7, 4, 0));
        let provider = provider(executor.clone(), CompilerFamily::Gcc);

        let compiler = provider.compiler(ToolRole::CCompiler).unwrap().into_compile().unwrap();
        let spec = CompileSpec::new(tmp.path().join("obj"), tmp.path().join("tmp")).source("main.c");
        let result = compiler.execute(spec).unwrap();

        let version = result.compiler.unwrap();
        assert_eq!(version.identifier, "gcc");
        assert_eq!(version.version, semver::Version::new(7, 4, 0));
        assert!(result.did_work);

        let compile = executor
            .calls()
            .into_iter()
            .find(|r| r.args.contains(&"-c".to_string()))
            .unwrap();
        assert_eq!(compile.program, Path::new("/toolchain/bin/gcc"));
        assert!(compile.args.contains(&"-x".to_string()));
        assert!(compile.env["PATH"].starts_with(BIN));
    }

    #[test]
    fn test_identity_probed_once_per_language() {
        let executor = Arc::new(MockExecutor::new());
        executor.expect("/toolchain/bin/g++ -dM -E -", compiler_outputs::gcc_defines(9, 3, 0));
        let provider = provider(executor.clone(), CompilerFamily::Gcc);

        provider.compiler(ToolRole::CppCompiler).unwrap();
        provider.compiler(ToolRole::CppPchCompiler).unwrap();
        provider.compiler(ToolRole::CppCompiler).unwrap();

        assert_eq!(probes(&executor), 1);
    }

    #[test]
    fn test_roles_sharing_a_binary_share_its_identity() {
        let executor = Arc::new(MockExecutor::new());
        executor.expect("/toolchain/bin/gcc -dM -E -", compiler_outputs::gcc_defines(9, 3, 0));
        let provider = provider(executor.clone(), CompilerFamily::Gcc);

        provider.compiler(ToolRole::CCompiler).unwrap();
        provider.compiler(ToolRole::ObjectiveCCompiler).unwrap();
        provider.compiler(ToolRole::ObjectiveCPchCompiler).unwrap();

        assert_eq!(probes(&executor), 1);
    }

    #[test]
    fn test_distinct_binaries_probed_separately() {
        let executor = Arc::new(MockExecutor::new());
        executor.expect("/toolchain/bin/gcc -dM -E -", compiler_outputs::gcc_defines(9, 3, 0));
        executor.expect("/toolchain/bin/g++ -dM -E -", compiler_outputs::gcc_defines(9, 3, 0));
        let provider = provider(executor.clone(), CompilerFamily::Gcc);

        provider.compiler(ToolRole::CCompiler).unwrap();
        provider.compiler(ToolRole::CppCompiler).unwrap();
        provider.compiler(ToolRole::ObjectiveCppCompiler).unwrap();

        assert_eq!(probes(&executor), 2);
    }

    #[test]
    fn test_broken_identity_makes_compiler_unavailable() {
        let executor = Arc::new(MockExecutor::new());
        executor.expect("/toolchain/bin/gcc -dM -E -", MockProcessOutput::failure(1, "boom"));
        let provider = provider(executor.clone(), CompilerFamily::Gcc);

        let err = provider.compiler(ToolRole::CCompiler).unwrap_err();
        match err {
            ToolchainError::CompilerUnavailable { role, diagnostics } => {
                assert_eq!(role, ToolRole::CCompiler);
                assert_eq!(
                    diagnostics,
                    vec!["Could not determine GCC version: failed to execute gcc -dM -E -."]
                );
            }
            other => panic!("unexpected error: {other}"),
        }

        // The broken result is memoized too
        assert!(provider.compiler(ToolRole::CPchCompiler).is_err());
        assert_eq!(probes(&executor), 1);
    }

    #[test]
    fn test_clang_that_is_gcc() {
        let executor = Arc::new(MockExecutor::new());
        executor.expect(
            "/toolchain/bin/clang -dM -E -",
            MockProcessOutput::success(MacroDump::gnuc("4", "2", "1").build()),
        );
        let provider = provider(executor, CompilerFamily::Clang);

        let err = provider.compiler(ToolRole::CCompiler).unwrap_err();
        assert!(err.to_string().contains("appears to be GCC rather than Clang"));
    }

    #[test]
    fn test_windows_resource_compiler_unsupported() {
        let provider = provider(Arc::new(MockExecutor::new()), CompilerFamily::Gcc);
        let err = provider.compiler(ToolRole::WindowsResourceCompiler).unwrap_err();
        assert!(matches!(
            err,
            ToolchainError::UnsupportedRole {
                role: ToolRole::WindowsResourceCompiler,
                family: ToolchainFamily::Gcc,
            }
        ));
    }

    #[test]
    fn test_missing_tool() {
        let provider = GccPlatformToolProvider::new(
            linux(),
            GccPlatformToolChain::new(CompilerFamily::Gcc),
            Arc::new(FakeToolSearch::new()),
            Arc::new(MockExecutor::new()),
            AmbientEnvironment::default(),
        );
        let err = provider.compiler(ToolRole::StaticLibraryArchiver).unwrap_err();
        assert!(matches!(err, ToolchainError::ToolNotFound(_)));
    }

    #[test]
    fn test_plain_roles_skip_probe() {
        let tmp = TempDir::new().unwrap();
        let executor = Arc::new(MockExecutor::new());
        let provider = provider(executor.clone(), CompilerFamily::Gcc);

        let linker = provider.compiler(ToolRole::Linker).unwrap().into_link().unwrap();
        linker
            .execute(LinkerSpec::new(LinkKind::Executable, tmp.path().join("app")).objects(["main.o"]))
            .unwrap();
        provider.compiler(ToolRole::Assembler).unwrap();
        provider.compiler(ToolRole::StaticLibraryArchiver).unwrap();

        assert_eq!(probes(&executor), 0);
        assert_eq!(executor.calls()[0].program, Path::new("/toolchain/bin/g++"));
    }

    #[test]
    fn test_pch_output_suffix() {
        let tmp = TempDir::new().unwrap();
        let executor = Arc::new(MockExecutor::new());
        executor.expect("/toolchain/bin/gcc -dM -E -", compiler_outputs::gcc_defines(7, 4, 0));
        let provider = provider(executor.clone(), CompilerFamily::Gcc);

        let compiler = provider.compiler(ToolRole::CPchCompiler).unwrap().into_compile().unwrap();
        let spec = CompileSpec::new(tmp.path().join("obj"), tmp.path().join("tmp")).source("include/prefix.h");
        let result = compiler.execute(spec).unwrap();

        assert!(result.outputs[0].to_string_lossy().ends_with("prefix.h.gch"));
        let compile = executor.calls().into_iter().last().unwrap();
        let x = compile.args.iter().position(|a| a == "-x").unwrap();
        assert_eq!(compile.args[x + 1], "c-header");
    }

    #[test]
    fn test_target_flags_reach_probe_and_compiler() {
        let tmp = TempDir::new().unwrap();
        let executor = Arc::new(MockExecutor::new());
        executor.expect(
            "/toolchain/bin/gcc -m32 -dM -E -",
            MockProcessOutput::success(MacroDump::gnuc("7", "4", "0").i386().build()),
        );
        let target = NativePlatform::new(OperatingSystem::Linux, Architecture::I386);
        let toolchain = GccPlatformToolChain::new(CompilerFamily::Gcc).for_target(&target, &Architecture::Amd64);
        let provider = GccPlatformToolProvider::new(
            target,
            toolchain,
            search(),
            executor.clone(),
            AmbientEnvironment::default(),
        );

        let identity = provider.compiler_identity(ToolRole::CCompiler).unwrap();
        assert_eq!(identity.resolved().unwrap().architecture, Architecture::I386);

        let compiler = provider.compiler(ToolRole::CCompiler).unwrap().into_compile().unwrap();
        compiler
            .execute(CompileSpec::new(tmp.path().join("obj"), tmp.path().join("tmp")).source("a.c"))
            .unwrap();
        let compile = executor.calls().into_iter().last().unwrap();
        assert!(compile.args.contains(&"-m32".to_string()));
    }

    #[test]
    fn test_assembler_never_uses_options_file() {
        let tmp = TempDir::new().unwrap();
        let executor = Arc::new(MockExecutor::new());
        executor.expect("/toolchain/bin/gcc -dM -E -", compiler_outputs::gcc_defines(9, 3, 0));
        let config = GccConfig {
            options_file: Some(true),
            ..GccConfig::default()
        };
        let provider = GccPlatformToolProvider::new(
            linux(),
            GccPlatformToolChain::from_config(&config),
            search(),
            executor.clone(),
            AmbientEnvironment::default(),
        );

        let assembler = provider.compiler(ToolRole::Assembler).unwrap().into_compile().unwrap();
        assembler
            .execute(CompileSpec::new(tmp.path().join("obj"), tmp.path().join("tmp")).source("start.s"))
            .unwrap();
        let assemble = executor.calls().into_iter().last().unwrap();
        assert!(assemble.args.iter().all(|a| !a.starts_with('@')));

        let compiler = provider.compiler(ToolRole::CCompiler).unwrap().into_compile().unwrap();
        compiler
            .execute(CompileSpec::new(tmp.path().join("obj"), tmp.path().join("tmp")).source("main.c"))
            .unwrap();
        let compile = executor.calls().into_iter().last().unwrap();
        assert!(compile.args.iter().any(|a| a.starts_with('@')));
    }

    #[test]
    fn test_shared_library_link_file_name() {
        let provider = provider(Arc::new(MockExecutor::new()), CompilerFamily::Gcc);
        assert_eq!(provider.shared_library_link_file_name("libfoo.so"), "libfoo.so");
    }
}
