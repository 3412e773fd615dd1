//! Locating tool executables.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::role::ToolRole;

/// A tool executable could not be found.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Could not find {} '{}'. Searched in: {}", .role.tool_name(), .executable, display_dirs(.searched))]
pub struct ToolNotFound {
    pub role: ToolRole,
    pub executable: String,
    pub searched: Vec<PathBuf>,
}

fn display_dirs(dirs: &[PathBuf]) -> String {
    if dirs.is_empty() {
        return "PATH".to_string();
    }
    let mut parts: Vec<String> = dirs.iter().map(|d| d.display().to_string()).collect();
    parts.push("PATH".to_string());
    parts.join(", ")
}

/// Capability to locate an executable for a role.
pub trait ToolSearch: Send + Sync + fmt::Debug {
    fn locate(&self, role: ToolRole, executable: &str) -> Result<PathBuf, ToolNotFound>;

    /// Directories the toolchain itself lives in, searched first.
    fn path(&self) -> &[PathBuf];
}

/// Searches configured directories, then the process `PATH`.
#[derive(Debug, Clone, Default)]
pub struct ToolSearchPath {
    dirs: Vec<PathBuf>,
    system_path: Option<OsString>,
}

impl ToolSearchPath {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        ToolSearchPath {
            dirs,
            system_path: std::env::var_os("PATH"),
        }
    }

    /// Replace the inherited `PATH` value.
    pub fn with_system_path(mut self, path: Option<OsString>) -> Self {
        self.system_path = path;
        self
    }
}

impl ToolSearch for ToolSearchPath {
    fn locate(&self, role: ToolRole, executable: &str) -> Result<PathBuf, ToolNotFound> {
        let not_found = || ToolNotFound {
            role,
            executable: executable.to_string(),
            searched: self.dirs.clone(),
        };

        // Absolute or relative paths are used as given.
        let as_path = Path::new(executable);
        if as_path.components().count() > 1 {
            return if as_path.is_file() {
                Ok(as_path.to_path_buf())
            } else {
                Err(not_found())
            };
        }

        let cwd = std::env::current_dir().unwrap_or_default();
        if !self.dirs.is_empty() {
            if let Ok(found) = which::which_in(executable, std::env::join_paths(&self.dirs).ok(), &cwd) {
                tracing::debug!("Found {} at {}", role.tool_name(), found.display());
                return Ok(found);
            }
        }

        match which::which_in(executable, self.system_path.clone(), &cwd) {
            Ok(found) => {
                tracing::debug!("Found {} at {}", role.tool_name(), found.display());
                Ok(found)
            }
            Err(_) => Err(not_found()),
        }
    }

    fn path(&self) -> &[PathBuf] {
        &self.dirs
    }
}
