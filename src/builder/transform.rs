//! Argument transform pipelines.
//!
//! A pipeline is an ordered list of named stages applied to a spec before a
//! tool runs. Stages only add: they append include directories, definitions
//! or library path entries, or swap a header for a generated wrapper source.
//! Caller-supplied data is never dropped.

use std::path::{Path, PathBuf};

use crate::builder::spec::{CompileSpec, GeneratedSource, LinkerSpec};

/// One named transformation of a spec.
pub trait Stage {
    type Spec;

    fn name(&self) -> &'static str;
    fn apply(&self, spec: Self::Spec) -> Self::Spec;
}

/// Ordered composition of stages.
#[derive(Debug, Clone)]
pub struct Pipeline<T> {
    stages: Vec<T>,
}

impl<T> Default for Pipeline<T> {
    fn default() -> Self {
        Pipeline { stages: Vec::new() }
    }
}

impl<T> Pipeline<T> {
    /// An empty pipeline that returns specs unchanged.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn then(mut self, stage: T) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[T] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order.
    pub fn apply(&self, spec: T::Spec) -> T::Spec
    where
        T: Stage,
    {
        self.stages.iter().fold(spec, |spec, stage| stage.apply(spec))
    }

    pub fn stage_names(&self) -> Vec<&'static str>
    where
        T: Stage,
    {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

/// Language of the wrapper source generated for a precompiled header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PchLanguage {
    C,
    Cpp,
}

impl PchLanguage {
    pub fn source_extension(&self) -> &'static str {
        match self {
            PchLanguage::C => "c",
            PchLanguage::Cpp => "cpp",
        }
    }
}

/// Stages applicable to compilation specs.
#[derive(Debug, Clone)]
pub enum CompileStage {
    /// Replace each header with a generated source that includes it.
    SubstitutePchSource(PchLanguage),
    /// Append toolchain include directories, then toolchain definitions.
    AddIncludesAndDefinitions {
        include_dirs: Vec<PathBuf>,
        definitions: Vec<(String, Option<String>)>,
    },
}

impl Stage for CompileStage {
    type Spec = CompileSpec;

    fn name(&self) -> &'static str {
        match self {
            CompileStage::SubstitutePchSource(_) => "substitute-pch-source",
            CompileStage::AddIncludesAndDefinitions { .. } => "add-includes-and-definitions",
        }
    }

    fn apply(&self, spec: CompileSpec) -> CompileSpec {
        match self {
            CompileStage::SubstitutePchSource(language) => substitute_pch_sources(spec, *language),
            CompileStage::AddIncludesAndDefinitions {
                include_dirs,
                definitions,
            } => {
                let mut spec = spec;
                spec.include(include_dirs.iter().cloned());
                for (name, value) in definitions {
                    spec.define(name.clone(), value.clone());
                }
                spec
            }
        }
    }
}

/// Directory under the spec's temp dir receiving generated PCH sources.
pub fn pch_generated_dir(temp_dir: &Path) -> PathBuf {
    temp_dir.join("pchGenerated")
}

fn substitute_pch_sources(mut spec: CompileSpec, language: PchLanguage) -> CompileSpec {
    let generated_dir = pch_generated_dir(&spec.temp_dir);
    let mut sources = Vec::with_capacity(spec.source_files.len());

    for header in std::mem::take(&mut spec.source_files) {
        let stem = header
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let header_name = header
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let path = generated_dir.join(format!("{}.{}", stem, language.source_extension()));

        // The wrapper includes the header by bare name, so its directory must be searchable.
        if let Some(parent) = header.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !spec.include_roots.iter().any(|r| r == parent) {
                spec.include_roots.push(parent.to_path_buf());
            }
        }

        spec.generated_sources.push(GeneratedSource {
            path: path.clone(),
            contents: format!("#include \"{}\"", header_name),
            wraps: Some(header),
        });
        sources.push(path);
    }

    spec.source_files = sources;
    spec
}

/// Stages applicable to linker specs.
#[derive(Debug, Clone)]
pub enum LinkStage {
    /// Append toolchain library directories after the spec's own entries.
    AddLibraryPath(Vec<PathBuf>),
}

impl LinkStage {
    /// Library path for an installation: compiler libs, SDK libs, then the
    /// optional runtime libs.
    pub fn library_path(
        compiler_lib_dir: PathBuf,
        sdk_lib_dir: PathBuf,
        runtime_lib_dir: Option<PathBuf>,
    ) -> Self {
        let mut dirs = vec![compiler_lib_dir, sdk_lib_dir];
        dirs.extend(runtime_lib_dir);
        LinkStage::AddLibraryPath(dirs)
    }
}

impl Stage for LinkStage {
    type Spec = LinkerSpec;

    fn name(&self) -> &'static str {
        match self {
            LinkStage::AddLibraryPath(_) => "add-library-path",
        }
    }

    fn apply(&self, spec: LinkerSpec) -> LinkerSpec {
        match self {
            LinkStage::AddLibraryPath(dirs) => {
                let mut spec = spec;
                spec.library_path(dirs.iter().cloned());
                spec
            }
        }
    }
}
