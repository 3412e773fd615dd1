//! Base compilers: a command-line tool plus argument generation.
//!
//! Every role returned by a platform tool provider is a [`Compiler`] over
//! its spec type. The base implementations here run the spec through a
//! transform pipeline, build the command line and invoke the tool through a
//! [`ProcessExecutor`]. Decorators in [`crate::builder::decorators`] wrap
//! them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use thiserror::Error;

use crate::builder::args::{ArchiveArgs, CompileArgs, LinkArgs};
use crate::builder::context::InvocationContext;
use crate::builder::naming::CompilerOutputFileNamingScheme;
use crate::builder::options_file::write_options_file;
use crate::builder::spec::{CompileSpec, LinkerSpec, StaticLibraryArchiverSpec};
use crate::builder::transform::{CompileStage, LinkStage, Pipeline};
use crate::util::fs::{ensure_dir, remove_file_if_exists, write_string};
use crate::util::process::{ExecOutput, ExecRequest, ProcessExecutor};

/// A tool that executes one kind of spec.
pub trait Compiler<S>: Send + Sync {
    fn execute(&self, spec: S) -> Result<WorkResult>;
}

impl<S, C: Compiler<S> + ?Sized> Compiler<S> for Arc<C> {
    fn execute(&self, spec: S) -> Result<WorkResult> {
        (**self).execute(spec)
    }
}

impl<S, C: Compiler<S> + ?Sized> Compiler<S> for Box<C> {
    fn execute(&self, spec: S) -> Result<WorkResult> {
        (**self).execute(spec)
    }
}

/// Identifier and version of the compiler that produced a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerVersion {
    /// `gcc` or `clang`
    pub identifier: String,
    pub version: semver::Version,
    /// Stable hash over identifier, version and architecture
    pub fingerprint: String,
}

impl fmt::Display for CompilerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.identifier, self.version)
    }
}

/// Outcome of executing a spec.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkResult {
    /// Whether anything was created or deleted
    pub did_work: bool,
    /// Files produced
    pub outputs: Vec<PathBuf>,
    /// Set by version-aware compilers
    pub compiler: Option<CompilerVersion>,
}

impl WorkResult {
    pub fn did_work(did_work: bool) -> Self {
        WorkResult {
            did_work,
            ..Default::default()
        }
    }

    /// Fold another result into this one.
    pub fn merge(&mut self, other: WorkResult) {
        self.did_work |= other.did_work;
        self.outputs.extend(other.outputs);
        if self.compiler.is_none() {
            self.compiler = other.compiler;
        }
    }
}

/// A tool exited unsuccessfully.
#[derive(Debug, Error)]
#[error("{tool} failed while {action}.\n{output}")]
pub struct ToolInvocationError {
    pub tool: String,
    pub action: String,
    pub exit_code: Option<i32>,
    pub output: String,
}

/// A resolved executable and the executor that runs it.
#[derive(Clone)]
pub struct CommandLineTool {
    name: String,
    executable: PathBuf,
    executor: Arc<dyn ProcessExecutor>,
}

impl fmt::Debug for CommandLineTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandLineTool")
            .field("name", &self.name)
            .field("executable", &self.executable)
            .finish()
    }
}

impl CommandLineTool {
    pub fn new(
        name: impl Into<String>,
        executable: impl Into<PathBuf>,
        executor: Arc<dyn ProcessExecutor>,
    ) -> Self {
        CommandLineTool {
            name: name.into(),
            executable: executable.into(),
            executor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn executor(&self) -> &Arc<dyn ProcessExecutor> {
        &self.executor
    }

    /// Run the tool with final arguments under `context`.
    pub fn invoke(
        &self,
        context: &InvocationContext,
        args: Vec<String>,
        cwd: Option<&Path>,
        action: &str,
    ) -> Result<ExecOutput> {
        let mut request = ExecRequest::new(&self.executable);
        request.args = args;
        request.cwd = cwd.map(Path::to_path_buf);
        request.ignore_exit_value = true;
        context.apply(&mut request);

        let output = self
            .executor
            .execute(&request)
            .with_context(|| format!("failed to run {} ({})", self.name, self.executable.display()))?;

        if !output.success() {
            let mut text = output.stdout_lossy();
            text.push_str(&output.stderr_lossy());
            return Err(ToolInvocationError {
                tool: self.name.clone(),
                action: action.to_string(),
                exit_code: output.exit_code,
                output: text,
            }
            .into());
        }
        Ok(output)
    }
}

/// Compiler for every source-compiling role.
#[derive(Debug, Clone)]
pub struct NativeCompiler {
    tool: CommandLineTool,
    context: InvocationContext,
    pipeline: Pipeline<CompileStage>,
    args: CompileArgs,
    output_suffix: String,
    use_options_file: bool,
}

impl NativeCompiler {
    pub fn new(
        tool: CommandLineTool,
        context: InvocationContext,
        pipeline: Pipeline<CompileStage>,
        args: CompileArgs,
        output_suffix: impl Into<String>,
        use_options_file: bool,
    ) -> Self {
        NativeCompiler {
            tool,
            context,
            pipeline,
            args,
            output_suffix: output_suffix.into(),
            use_options_file,
        }
    }

    pub fn tool(&self) -> &CommandLineTool {
        &self.tool
    }

    pub fn pipeline(&self) -> &Pipeline<CompileStage> {
        &self.pipeline
    }

    pub fn output_suffix(&self) -> &str {
        &self.output_suffix
    }

    /// Output files a spec's sources map to.
    pub fn naming_scheme(&self, object_file_dir: &Path) -> CompilerOutputFileNamingScheme {
        CompilerOutputFileNamingScheme::new(object_file_dir, self.output_suffix.clone())
    }
}

impl Compiler<CompileSpec> for NativeCompiler {
    fn execute(&self, spec: CompileSpec) -> Result<WorkResult> {
        let spec = self.pipeline.apply(spec);

        for generated in &spec.generated_sources {
            write_string(&generated.path, &generated.contents)?;
        }

        let mut common = self.args.common_args(&spec);
        self.context.arg_hook().apply(&mut common);

        let naming = self.naming_scheme(&spec.object_file_dir);
        let mut result = WorkResult::default();

        for source in &spec.source_files {
            let output = naming.map(source);
            if let Some(dir) = output.parent() {
                ensure_dir(dir)?;
            }

            let mut args = if self.use_options_file {
                write_options_file(
                    &spec.temp_dir,
                    common.clone(),
                    self.args.style(),
                    &source.display().to_string(),
                )?
            } else {
                common.clone()
            };
            args.extend(self.args.source_args(&spec, source, &output));

            tracing::debug!("Compiling {} with {}", source.display(), self.tool.name());
            self.tool.invoke(
                &self.context,
                args,
                Some(&spec.object_file_dir),
                &format!("compiling {}", source.display()),
            )?;

            result.did_work = true;
            result.outputs.push(output);
        }

        Ok(result)
    }
}

/// Linker for executables and shared libraries.
#[derive(Debug, Clone)]
pub struct Linker {
    tool: CommandLineTool,
    context: InvocationContext,
    pipeline: Pipeline<LinkStage>,
    args: LinkArgs,
    use_options_file: bool,
}

impl Linker {
    pub fn new(
        tool: CommandLineTool,
        context: InvocationContext,
        pipeline: Pipeline<LinkStage>,
        args: LinkArgs,
        use_options_file: bool,
    ) -> Self {
        Linker {
            tool,
            context,
            pipeline,
            args,
            use_options_file,
        }
    }

    pub fn tool(&self) -> &CommandLineTool {
        &self.tool
    }

    pub fn pipeline(&self) -> &Pipeline<LinkStage> {
        &self.pipeline
    }
}

impl Compiler<LinkerSpec> for Linker {
    fn execute(&self, spec: LinkerSpec) -> Result<WorkResult> {
        let spec = self.pipeline.apply(spec);

        let mut args = self.args.args(&spec);
        self.context.arg_hook().apply(&mut args);
        if self.use_options_file {
            args = write_options_file(
                &spec.temp_dir,
                args,
                self.args.style(),
                &spec.output_file.display().to_string(),
            )?;
        }

        if let Some(dir) = spec.output_file.parent() {
            ensure_dir(dir)?;
        }

        tracing::debug!("Linking {}", spec.output_file.display());
        self.tool.invoke(
            &self.context,
            args,
            None,
            &format!("linking {}", spec.output_file.display()),
        )?;

        Ok(WorkResult {
            did_work: true,
            outputs: vec![spec.output_file],
            compiler: None,
        })
    }
}

/// Static library archiver.
#[derive(Debug, Clone)]
pub struct StaticLibraryArchiver {
    tool: CommandLineTool,
    context: InvocationContext,
    args: ArchiveArgs,
}

impl StaticLibraryArchiver {
    pub fn new(tool: CommandLineTool, context: InvocationContext, args: ArchiveArgs) -> Self {
        StaticLibraryArchiver {
            tool,
            context,
            args,
        }
    }

    pub fn tool(&self) -> &CommandLineTool {
        &self.tool
    }
}

impl Compiler<StaticLibraryArchiverSpec> for StaticLibraryArchiver {
    fn execute(&self, spec: StaticLibraryArchiverSpec) -> Result<WorkResult> {
        // ar adds to an existing archive, so start from scratch
        remove_file_if_exists(&spec.output_file)?;
        if let Some(dir) = spec.output_file.parent() {
            ensure_dir(dir)?;
        }

        let mut args = self.args.args(&spec);
        self.context.arg_hook().apply(&mut args);

        tracing::debug!("Archiving {}", spec.output_file.display());
        self.tool.invoke(
            &self.context,
            args,
            None,
            &format!("archiving {}", spec.output_file.display()),
        )?;

        Ok(WorkResult {
            did_work: true,
            outputs: vec![spec.output_file],
            compiler: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::args::GccLanguage;
    use crate::builder::context::{AmbientEnvironment, ArgHook, EnvironmentPolicy};
    use crate::builder::spec::LinkKind;
    use crate::core::platform::OperatingSystem;
    use crate::test_support::{MockExecutor, MockProcessOutput};
    use tempfile::TempDir;

    fn context(hook: ArgHook) -> InvocationContext {
        InvocationContext::build(
            Vec::new(),
            EnvironmentPolicy::Gcc,
            &AmbientEnvironment::from_vars(Vec::<(String, String)>::new()),
            hook,
        )
    }

    fn gcc_c(executor: Arc<MockExecutor>, hook: ArgHook, options_file: bool) -> NativeCompiler {
        NativeCompiler::new(
            CommandLineTool::new("C compiler", "/usr/bin/gcc", executor),
            context(hook),
            Pipeline::identity(),
            CompileArgs::Gcc {
                language: GccLanguage::C,
                target_os: OperatingSystem::Linux,
            },
            ".o",
            options_file,
        )
    }

    #[test]
    fn test_compiles_each_source() {
        let tmp = TempDir::new().unwrap();
        let executor = Arc::new(MockExecutor::new());
        let compiler = gcc_c(executor.clone(), ArgHook::none(), false);

        let spec = CompileSpec::new(tmp.path().join("obj"), tmp.path().join("tmp"))
            .sources(["src/a.c", "src/b.c"]);
        let result = compiler.execute(spec).unwrap();

        assert!(result.did_work);
        assert_eq!(result.outputs.len(), 2);
        assert!(result.outputs[0].ends_with("a.o"));

        let calls = executor.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].program, PathBuf::from("/usr/bin/gcc"));
        assert_eq!(&calls[0].args[..2], &["-x".to_string(), "c".to_string()]);
        assert!(calls[1].args.contains(&"src/b.c".to_string()));
    }

    #[test]
    fn test_arg_hook_sees_final_arguments() {
        let tmp = TempDir::new().unwrap();
        let executor = Arc::new(MockExecutor::new());
        let hook = ArgHook::new(|args: &mut Vec<String>| {
            args.retain(|a| a != "-Werror");
            args.push("-fno-common".to_string());
        });
        let compiler = gcc_c(executor.clone(), hook, false);

        let spec = CompileSpec::new(tmp.path().join("obj"), tmp.path().join("tmp"))
            .source("main.c")
            .arg("-Werror");
        compiler.execute(spec).unwrap();

        let args = &executor.calls()[0].args;
        assert!(!args.contains(&"-Werror".to_string()));
        assert!(args.contains(&"-fno-common".to_string()));
    }

    #[test]
    fn test_options_file_used_when_enabled() {
        let tmp = TempDir::new().unwrap();
        let executor = Arc::new(MockExecutor::new());
        let hook = ArgHook::appending(vec!["-m32".to_string()]);
        let compiler = gcc_c(executor.clone(), hook, true);

        let spec = CompileSpec::new(tmp.path().join("obj"), tmp.path().join("tmp")).source("main.c");
        compiler.execute(spec).unwrap();

        let args = &executor.calls()[0].args;
        assert_eq!(args[0], "-m32");
        assert!(args[1].starts_with('@'));
        assert_eq!(args[2], "-c");
    }

    #[test]
    fn test_failed_compile_reports_output() {
        let tmp = TempDir::new().unwrap();
        let executor = Arc::new(MockExecutor::new());
        executor.expect_prefix("/usr/bin/gcc", MockProcessOutput::failure(1, "main.c:1: error"));
        let compiler = gcc_c(executor, ArgHook::none(), false);

        let spec = CompileSpec::new(tmp.path().join("obj"), tmp.path().join("tmp")).source("main.c");
        let err = compiler.execute(spec).unwrap_err();
        let err = err.downcast_ref::<ToolInvocationError>().unwrap();
        assert_eq!(err.tool, "C compiler");
        assert_eq!(err.exit_code, Some(1));
        assert!(err.to_string().contains("compiling main.c"));
        assert!(err.output.contains("main.c:1: error"));
    }

    #[test]
    fn test_no_sources_does_nothing() {
        let tmp = TempDir::new().unwrap();
        let executor = Arc::new(MockExecutor::new());
        let compiler = gcc_c(executor.clone(), ArgHook::none(), false);

        let result = compiler
            .execute(CompileSpec::new(tmp.path().join("obj"), tmp.path().join("tmp")))
            .unwrap();
        assert!(!result.did_work);
        assert!(executor.calls().is_empty());
    }

    #[test]
    fn test_linker_applies_pipeline() {
        let tmp = TempDir::new().unwrap();
        let executor = Arc::new(MockExecutor::new());
        let linker = Linker::new(
            CommandLineTool::new("Linker", "link.exe", executor.clone()),
            context(ArgHook::none()),
            Pipeline::identity().then(LinkStage::library_path(
                PathBuf::from("vc/lib"),
                PathBuf::from("sdk/lib"),
                None,
            )),
            LinkArgs::VisualCpp,
            false,
        );

        let spec = LinkerSpec::new(LinkKind::Executable, tmp.path().join("app.exe")).objects(["a.obj"]);
        let result = linker.execute(spec).unwrap();

        assert_eq!(result.outputs, vec![tmp.path().join("app.exe")]);
        let args = &executor.calls()[0].args;
        assert!(args.contains(&"/LIBPATH:vc/lib".to_string()));
        assert!(args.contains(&"/LIBPATH:sdk/lib".to_string()));
    }

    #[test]
    fn test_archiver_replaces_existing_archive() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("libfoo.a");
        std::fs::write(&archive, "stale").unwrap();

        let executor = Arc::new(MockExecutor::new());
        let archiver = StaticLibraryArchiver::new(
            CommandLineTool::new("Static library archiver", "ar", executor.clone()),
            context(ArgHook::none()),
            ArchiveArgs::Ar,
        );

        archiver
            .execute(StaticLibraryArchiverSpec::new(&archive).objects(["a.o"]))
            .unwrap();
        assert!(!archive.exists());
        assert_eq!(executor.calls()[0].args[0], "-rcs");
    }
}
