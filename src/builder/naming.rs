//! Mapping from source files to compiler output files.

use std::path::{Path, PathBuf};

use crate::util::hash::short_hash;

/// Places each output under `<base>/<hash of source dir>/<stem><suffix>`.
///
/// The hash keeps `a/util.c` and `b/util.c` from colliding in one object
/// directory.
#[derive(Debug, Clone)]
pub struct CompilerOutputFileNamingScheme {
    output_base_folder: PathBuf,
    object_file_suffix: String,
}

impl CompilerOutputFileNamingScheme {
    pub fn new(output_base_folder: impl Into<PathBuf>, object_file_suffix: impl Into<String>) -> Self {
        CompilerOutputFileNamingScheme {
            output_base_folder: output_base_folder.into(),
            object_file_suffix: object_file_suffix.into(),
        }
    }

    /// Output file for a source.
    pub fn map(&self, source: &Path) -> PathBuf {
        self.output_dir(source).join(self.output_file_name(source))
    }

    /// Hash directory an output for `source` lives in.
    pub fn output_dir(&self, source: &Path) -> PathBuf {
        let parent = source
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.output_base_folder.join(short_hash(&parent))
    }

    fn output_file_name(&self, source: &Path) -> String {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}{}", stem, self.object_file_suffix)
    }
}
