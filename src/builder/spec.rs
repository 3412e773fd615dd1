//! Compile, link and archive specifications.
//!
//! Specs are builder-style values. A caller fills one in and moves it into a
//! compiler, which runs it through its transform pipeline before invoking the
//! tool.

use std::path::{Path, PathBuf};

/// A source file synthesized by a transform stage.
///
/// Stages never touch the filesystem; the compiler writes these files just
/// before the tool runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSource {
    pub path: PathBuf,
    pub contents: String,
    /// Header this source stands in for, when it wraps a precompiled header
    pub wraps: Option<PathBuf>,
}

/// Input for any compilation role (C, C++, Objective-C*, PCH, assembler,
/// resource compiler).
#[derive(Debug, Clone, Default)]
pub struct CompileSpec {
    /// Sources to compile
    pub source_files: Vec<PathBuf>,
    /// Sources compiled previously that no longer exist
    pub removed_source_files: Vec<PathBuf>,
    /// Directory receiving object files
    pub object_file_dir: PathBuf,
    /// Scratch directory for options files and generated sources
    pub temp_dir: PathBuf,
    /// User include directories (`-I`, `/I`)
    pub include_roots: Vec<PathBuf>,
    /// System include directories (`-isystem`, `/I` after user roots)
    pub system_include_roots: Vec<PathBuf>,
    /// Preprocessor definitions, in order
    pub macros: Vec<(String, Option<String>)>,
    /// Additional arguments passed verbatim
    pub args: Vec<String>,
    /// Header force-included into every source (the PCH header)
    pub prefix_header: Option<PathBuf>,
    /// Precompiled header file to consume
    pub precompiled_header: Option<PathBuf>,
    pub position_independent_code: bool,
    pub debuggable: bool,
    pub optimized: bool,
    /// Files a transform stage asked the compiler to materialize
    pub generated_sources: Vec<GeneratedSource>,
}

impl CompileSpec {
    /// Create a spec writing objects to `object_file_dir`.
    pub fn new(object_file_dir: impl Into<PathBuf>, temp_dir: impl Into<PathBuf>) -> Self {
        CompileSpec {
            object_file_dir: object_file_dir.into(),
            temp_dir: temp_dir.into(),
            ..Default::default()
        }
    }

    /// Add a source file.
    pub fn source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source_files.push(source.into());
        self
    }

    /// Add multiple source files.
    pub fn sources(mut self, sources: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.source_files.extend(sources.into_iter().map(Into::into));
        self
    }

    /// Record a source file removed since the last compilation.
    pub fn removed_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.removed_source_files.push(source.into());
        self
    }

    /// Add include directories.
    pub fn include(&mut self, dirs: impl IntoIterator<Item = impl Into<PathBuf>>) {
        self.include_roots.extend(dirs.into_iter().map(Into::into));
    }

    /// Add system include directories.
    pub fn system_include(&mut self, dirs: impl IntoIterator<Item = impl Into<PathBuf>>) {
        self.system_include_roots
            .extend(dirs.into_iter().map(Into::into));
    }

    /// Add a preprocessor definition.
    ///
    /// A name that is already defined keeps its existing value.
    pub fn define(&mut self, name: impl Into<String>, value: Option<String>) {
        let name = name.into();
        if !self.is_defined(&name) {
            self.macros.push((name, value));
        }
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.iter().any(|(n, _)| n == name)
    }

    /// Add a verbatim argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Copy of this spec restricted to a single source file.
    pub fn for_source(&self, source: &Path) -> CompileSpec {
        CompileSpec {
            source_files: vec![source.to_path_buf()],
            removed_source_files: Vec::new(),
            generated_sources: self
                .generated_sources
                .iter()
                .filter(|g| g.path == source)
                .cloned()
                .collect(),
            ..self.clone()
        }
    }
}

/// What a link produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkKind {
    #[default]
    Executable,
    SharedLibrary,
}

/// Input for the linker role.
#[derive(Debug, Clone, Default)]
pub struct LinkerSpec {
    pub kind: LinkKind,
    /// Output file (executable or shared library)
    pub output_file: PathBuf,
    /// Object files to link
    pub object_files: Vec<PathBuf>,
    /// Library files to link
    pub libraries: Vec<PathBuf>,
    /// Library search paths
    pub library_path: Vec<PathBuf>,
    /// Install name for shared libraries (`-soname`, `-install_name`)
    pub install_name: Option<String>,
    /// Scratch directory for options files
    pub temp_dir: PathBuf,
    /// Additional arguments passed verbatim
    pub args: Vec<String>,
    pub debuggable: bool,
}

impl LinkerSpec {
    pub fn new(kind: LinkKind, output_file: impl Into<PathBuf>) -> Self {
        LinkerSpec {
            kind,
            output_file: output_file.into(),
            ..Default::default()
        }
    }

    /// Add object files.
    pub fn objects(mut self, objects: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.object_files.extend(objects.into_iter().map(Into::into));
        self
    }

    /// Append library search path entries.
    pub fn library_path(&mut self, dirs: impl IntoIterator<Item = impl Into<PathBuf>>) {
        self.library_path.extend(dirs.into_iter().map(Into::into));
    }
}

/// Input for the static library archiver role.
#[derive(Debug, Clone, Default)]
pub struct StaticLibraryArchiverSpec {
    /// Output archive
    pub output_file: PathBuf,
    /// Object files to archive
    pub object_files: Vec<PathBuf>,
    /// Scratch directory
    pub temp_dir: PathBuf,
    /// Additional arguments passed verbatim
    pub args: Vec<String>,
}

impl StaticLibraryArchiverSpec {
    pub fn new(output_file: impl Into<PathBuf>) -> Self {
        StaticLibraryArchiverSpec {
            output_file: output_file.into(),
            ..Default::default()
        }
    }

    /// Add object files.
    pub fn objects(mut self, objects: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.object_files.extend(objects.into_iter().map(Into::into));
        self
    }
}
