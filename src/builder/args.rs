//! Command-line generation for each toolchain family.
//!
//! Arguments are split in two: the *common* part derived from the spec alone
//! (eligible for an options file) and the per-source part naming the input
//! and output files.

use std::path::Path;

use crate::builder::spec::{CompileSpec, LinkKind, LinkerSpec, StaticLibraryArchiverSpec};
use crate::core::platform::OperatingSystem;

/// Value GCC's `-x` flag takes for each compilation role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GccLanguage {
    C,
    Cpp,
    ObjectiveC,
    ObjectiveCpp,
    CHeader,
    CppHeader,
    ObjectiveCHeader,
    ObjectiveCppHeader,
    Assembler,
}

impl GccLanguage {
    pub fn as_arg(&self) -> &'static str {
        match self {
            GccLanguage::C => "c",
            GccLanguage::Cpp => "c++",
            GccLanguage::ObjectiveC => "objective-c",
            GccLanguage::ObjectiveCpp => "objective-c++",
            GccLanguage::CHeader => "c-header",
            GccLanguage::CppHeader => "c++-header",
            GccLanguage::ObjectiveCHeader => "objective-c-header",
            GccLanguage::ObjectiveCppHeader => "objective-c++-header",
            GccLanguage::Assembler => "assembler",
        }
    }
}

/// Source kinds the Visual C++ tools compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualCppSource {
    C,
    Cpp,
    CPch,
    CppPch,
    Assembler,
    Resource,
}

impl VisualCppSource {
    fn is_pch(&self) -> bool {
        matches!(self, VisualCppSource::CPch | VisualCppSource::CppPch)
    }
}

/// How arguments are quoted when written to an options file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgStyle {
    Unix,
    Windows,
}

/// Compiler command lines, one variant per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileArgs {
    Gcc {
        language: GccLanguage,
        target_os: OperatingSystem,
    },
    VisualCpp(VisualCppSource),
}

impl CompileArgs {
    /// Arguments derived from the spec, shared by every source.
    pub fn common_args(&self, spec: &CompileSpec) -> Vec<String> {
        match self {
            CompileArgs::Gcc {
                language,
                target_os,
            } => gcc_common_args(*language, *target_os, spec),
            CompileArgs::VisualCpp(kind) => visual_cpp_common_args(*kind, spec),
        }
    }

    /// Arguments naming one source and its output.
    pub fn source_args(&self, spec: &CompileSpec, source: &Path, output: &Path) -> Vec<String> {
        match self {
            CompileArgs::Gcc { .. } => vec![
                "-c".to_string(),
                source.display().to_string(),
                "-o".to_string(),
                output.display().to_string(),
            ],
            CompileArgs::VisualCpp(kind) => visual_cpp_source_args(*kind, spec, source, output),
        }
    }

    pub fn style(&self) -> ArgStyle {
        match self {
            CompileArgs::Gcc { .. } => ArgStyle::Unix,
            CompileArgs::VisualCpp(_) => ArgStyle::Windows,
        }
    }
}

/// Arguments that must stay on the command line even with an options file.
pub fn is_command_line_only(arg: &str) -> bool {
    arg == "-m32" || arg == "-m64"
}

fn push_macros(args: &mut Vec<String>, prefix: &str, spec: &CompileSpec) {
    for (name, value) in &spec.macros {
        match value {
            Some(v) => args.push(format!("{}{}={}", prefix, name, v)),
            None => args.push(format!("{}{}", prefix, name)),
        }
    }
}

fn gcc_common_args(language: GccLanguage, target_os: OperatingSystem, spec: &CompileSpec) -> Vec<String> {
    let mut args = vec!["-x".to_string(), language.as_arg().to_string()];

    if language == GccLanguage::Assembler {
        args.extend(spec.args.iter().cloned());
        return args;
    }

    if spec.debuggable {
        args.push("-g".to_string());
    }
    if spec.optimized {
        args.push("-O3".to_string());
    }

    push_macros(&mut args, "-D", spec);
    args.extend(spec.args.iter().cloned());

    for dir in &spec.include_roots {
        args.push(format!("-I{}", dir.display()));
    }
    for dir in &spec.system_include_roots {
        args.push("-isystem".to_string());
        args.push(dir.display().to_string());
    }

    if spec.position_independent_code && !target_os.is_windows() {
        args.push("-fPIC".to_string());
    }

    if let Some(ref header) = spec.prefix_header {
        args.push("-include".to_string());
        args.push(header.display().to_string());
    }

    args
}

fn visual_cpp_common_args(kind: VisualCppSource, spec: &CompileSpec) -> Vec<String> {
    let mut args = vec!["/nologo".to_string()];

    match kind {
        VisualCppSource::Resource => {
            push_macros(&mut args, "/D", spec);
            args.extend(spec.args.iter().cloned());
            for dir in spec.include_roots.iter().chain(&spec.system_include_roots) {
                args.push(format!("/I{}", dir.display()));
            }
            return args;
        }
        VisualCppSource::Assembler => {
            args.push("/c".to_string());
            push_macros(&mut args, "/D", spec);
            args.extend(spec.args.iter().cloned());
            for dir in &spec.include_roots {
                args.push(format!("/I{}", dir.display()));
            }
            return args;
        }
        _ => {}
    }

    args.push("/c".to_string());
    match kind {
        VisualCppSource::C | VisualCppSource::CPch => args.push("/TC".to_string()),
        _ => args.push("/TP".to_string()),
    }
    if spec.debuggable {
        args.push("/Zi".to_string());
    }
    if spec.optimized {
        args.push("/O2".to_string());
    }

    push_macros(&mut args, "/D", spec);
    args.extend(spec.args.iter().cloned());

    for dir in spec.include_roots.iter().chain(&spec.system_include_roots) {
        args.push(format!("/I{}", dir.display()));
    }

    if !kind.is_pch() {
        if let (Some(header), Some(pch)) = (&spec.prefix_header, &spec.precompiled_header) {
            let name = header
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            args.push(format!("/Yu{}", name));
            args.push(format!("/Fp{}", pch.display()));
        }
    }

    args
}

fn visual_cpp_source_args(
    kind: VisualCppSource,
    spec: &CompileSpec,
    source: &Path,
    output: &Path,
) -> Vec<String> {
    let mut args = Vec::new();
    match kind {
        VisualCppSource::Resource => {
            args.push(format!("/fo{}", output.display()));
        }
        VisualCppSource::CPch | VisualCppSource::CppPch => {
            let header = spec
                .generated_sources
                .iter()
                .find(|g| g.path == source)
                .and_then(|g| g.wraps.as_ref())
                .and_then(|h| h.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            args.push(format!("/Yc{}", header));
            args.push(format!("/Fp{}", output.display()));
            args.push(format!("/Fo{}", output.with_extension("obj").display()));
        }
        _ => {
            args.push(format!("/Fo{}", output.display()));
        }
    }
    args.push(source.display().to_string());
    args
}

/// Linker command lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkArgs {
    Gcc { target_os: OperatingSystem },
    VisualCpp,
}

impl LinkArgs {
    pub fn args(&self, spec: &LinkerSpec) -> Vec<String> {
        match self {
            LinkArgs::Gcc { target_os } => gcc_link_args(*target_os, spec),
            LinkArgs::VisualCpp => visual_cpp_link_args(spec),
        }
    }

    pub fn style(&self) -> ArgStyle {
        match self {
            LinkArgs::Gcc { .. } => ArgStyle::Unix,
            LinkArgs::VisualCpp => ArgStyle::Windows,
        }
    }
}

fn gcc_link_args(target_os: OperatingSystem, spec: &LinkerSpec) -> Vec<String> {
    let mut args = Vec::new();

    if spec.kind == LinkKind::SharedLibrary {
        args.push("-shared".to_string());
        if let Some(ref install_name) = spec.install_name {
            if target_os.is_macos() {
                args.push("-Wl,-install_name,".to_string() + install_name);
            } else if !target_os.is_windows() {
                args.push("-Wl,-soname,".to_string() + install_name);
            }
        }
    }
    if spec.debuggable {
        args.push("-g".to_string());
    }

    args.push("-o".to_string());
    args.push(spec.output_file.display().to_string());

    for obj in &spec.object_files {
        args.push(obj.display().to_string());
    }
    for lib in &spec.libraries {
        args.push(lib.display().to_string());
    }
    for dir in &spec.library_path {
        args.push(format!("-L{}", dir.display()));
    }

    args.extend(spec.args.iter().cloned());
    args
}

fn visual_cpp_link_args(spec: &LinkerSpec) -> Vec<String> {
    let mut args = vec!["/nologo".to_string()];

    if spec.kind == LinkKind::SharedLibrary {
        args.push("/DLL".to_string());
    }
    if spec.debuggable {
        args.push("/DEBUG".to_string());
    }
    args.push(format!("/OUT:{}", spec.output_file.display()));

    for dir in &spec.library_path {
        args.push(format!("/LIBPATH:{}", dir.display()));
    }
    args.extend(spec.args.iter().cloned());

    for obj in &spec.object_files {
        args.push(obj.display().to_string());
    }
    for lib in &spec.libraries {
        args.push(lib.display().to_string());
    }
    args
}

/// Archiver command lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveArgs {
    Ar,
    LibExe,
}

impl ArchiveArgs {
    pub fn args(&self, spec: &StaticLibraryArchiverSpec) -> Vec<String> {
        let mut args = Vec::new();
        match self {
            ArchiveArgs::Ar => {
                // Create archive with symbol index, replace files
                args.push("-rcs".to_string());
                args.extend(spec.args.iter().cloned());
                args.push(spec.output_file.display().to_string());
            }
            ArchiveArgs::LibExe => {
                args.push("/nologo".to_string());
                args.extend(spec.args.iter().cloned());
                args.push(format!("/OUT:{}", spec.output_file.display()));
            }
        }
        for obj in &spec.object_files {
            args.push(obj.display().to_string());
        }
        args
    }
}
