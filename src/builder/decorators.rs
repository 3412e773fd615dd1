//! Decorators applied to GCC-family compile roles.

use std::path::PathBuf;

use anyhow::Result;

use crate::builder::compiler::{Compiler, CompilerVersion, WorkResult};
use crate::builder::factory::SharedCompiler;
use crate::builder::naming::CompilerOutputFileNamingScheme;
use crate::builder::spec::CompileSpec;
use crate::util::fs::{remove_dir_if_empty, remove_file_if_exists};

/// Removes outputs left behind by earlier compilations before compiling.
///
/// Outputs of removed sources are deleted together with their hash directory
/// once it is empty. Outputs of the sources about to be compiled are deleted
/// so a failed compile never leaves a stale object in place.
pub struct OutputCleaningCompiler {
    delegate: SharedCompiler,
    output_suffix: String,
}

impl OutputCleaningCompiler {
    pub fn new(delegate: SharedCompiler, output_suffix: impl Into<String>) -> Self {
        OutputCleaningCompiler {
            delegate,
            output_suffix: output_suffix.into(),
        }
    }
}

impl Compiler<CompileSpec> for OutputCleaningCompiler {
    fn execute(&self, spec: CompileSpec) -> Result<WorkResult> {
        let naming = CompilerOutputFileNamingScheme::new(&spec.object_file_dir, self.output_suffix.clone());

        let mut removed = false;
        for source in &spec.removed_source_files {
            let output = naming.map(source);
            if remove_file_if_exists(&output)? {
                tracing::debug!("Removed stale output {}", output.display());
                removed = true;
            }
            remove_dir_if_empty(&naming.output_dir(source))?;
        }

        for source in &spec.source_files {
            remove_file_if_exists(&naming.map(source))?;
        }

        if spec.source_files.is_empty() {
            return Ok(WorkResult::did_work(removed));
        }

        let mut result = self.delegate.execute(spec)?;
        result.did_work |= removed;
        Ok(result)
    }
}

/// Stamps results with the compiler identity and adds the compiler's own
/// system include directories to every spec.
pub struct VersionAwareCompiler {
    delegate: SharedCompiler,
    version: CompilerVersion,
    system_includes: Vec<PathBuf>,
}

impl VersionAwareCompiler {
    pub fn new(delegate: SharedCompiler, version: CompilerVersion, system_includes: Vec<PathBuf>) -> Self {
        VersionAwareCompiler {
            delegate,
            version,
            system_includes,
        }
    }

    pub fn version(&self) -> &CompilerVersion {
        &self.version
    }
}

impl Compiler<CompileSpec> for VersionAwareCompiler {
    fn execute(&self, mut spec: CompileSpec) -> Result<WorkResult> {
        let missing: Vec<PathBuf> = self
            .system_includes
            .iter()
            .filter(|dir| !spec.system_include_roots.contains(*dir))
            .cloned()
            .collect();
        spec.system_include(missing);

        let mut result = self.delegate.execute(spec)?;
        result.compiler = Some(self.version.clone());
        Ok(result)
    }
}
