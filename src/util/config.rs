//! Toolchain configuration files.
//!
//! Two locations are read:
//! - Global: `~/.harbour/native-toolchain.toml` - User-wide defaults
//! - Project: `.harbour/native-toolchain.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::toolchain::msvc::{Ucrt, VisualCppInstall, WindowsSdk};
use crate::builder::toolchain::probe::CompilerFamily;
use crate::core::platform::Architecture;
use crate::core::role::ToolRole;

/// Toolchain family to build a provider for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolchainKind {
    Gcc,
    Msvc,
}

/// Native toolchain configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Which toolchain to use and what it targets
    pub toolchain: ToolchainSelection,

    /// GCC and Clang settings
    pub gcc: GccConfig,

    /// Visual C++ installation descriptors
    pub msvc: Option<VisualCppConfig>,
}

/// Toolchain selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSelection {
    /// Defaults to `msvc` on Windows when an installation is configured,
    /// `gcc` otherwise
    pub kind: Option<ToolchainKind>,

    /// Target architecture (defaults to the host)
    pub target_arch: Option<Architecture>,
}

/// Settings for a GCC-family toolchain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GccConfig {
    /// `gcc` or `clang`
    pub family: Option<CompilerFamily>,

    /// Directories searched for the tools before `PATH`
    pub path: Vec<PathBuf>,

    /// Arguments added to the identity probe (e.g. `--target=...`)
    pub probe_args: Vec<String>,

    /// Pass compiler arguments through an options file (off by default)
    pub options_file: Option<bool>,

    /// Per-role overrides, keyed by role (`c-compiler`, `linker`, ...)
    pub tools: BTreeMap<ToolRole, ToolConfig>,
}

/// Override for one tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Executable name or path
    pub executable: Option<String>,

    /// Arguments appended to every invocation
    pub args: Vec<String>,
}

/// A Visual C++ installation and the SDKs it builds against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualCppConfig {
    pub install: VisualCppInstall,
    pub sdk: WindowsSdk,
    #[serde(default)]
    pub ucrt: Option<Ucrt>,
}

impl ToolchainConfig {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read toolchain config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse toolchain config: {}", path.display()))
    }

    /// Load configuration, falling back to defaults if the file is missing
    /// or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!(
                    "Failed to load toolchain config from {}: {:#}",
                    path.display(),
                    e
                );
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: ToolchainConfig) {
        if other.toolchain.kind.is_some() {
            self.toolchain.kind = other.toolchain.kind;
        }
        if other.toolchain.target_arch.is_some() {
            self.toolchain.target_arch = other.toolchain.target_arch;
        }

        if other.gcc.family.is_some() {
            self.gcc.family = other.gcc.family;
        }
        if !other.gcc.path.is_empty() {
            self.gcc.path = other.gcc.path;
        }
        if !other.gcc.probe_args.is_empty() {
            self.gcc.probe_args = other.gcc.probe_args;
        }
        if other.gcc.options_file.is_some() {
            self.gcc.options_file = other.gcc.options_file;
        }
        // Tool overrides replace per role
        self.gcc.tools.extend(other.gcc.tools);

        if other.msvc.is_some() {
            self.msvc = other.msvc;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.harbour/native-toolchain.toml)
/// 2. Global config (~/.harbour/native-toolchain.toml)
/// 3. Defaults
pub fn load_toolchain_config(global_path: Option<&Path>, project_path: &Path) -> ToolchainConfig {
    let mut config = ToolchainConfig::default();

    if let Some(global_path) = global_path.filter(|p| p.exists()) {
        tracing::debug!("Loading global toolchain config {}", global_path.display());
        config.merge(ToolchainConfig::load_or_default(global_path));
    }

    if project_path.exists() {
        tracing::debug!("Loading project toolchain config {}", project_path.display());
        config.merge(ToolchainConfig::load_or_default(project_path));
    }

    config
}

/// Get the global harbour config directory (~/.harbour).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".harbour"))
}

/// Get the global toolchain config path (~/.harbour/native-toolchain.toml).
pub fn global_toolchain_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("native-toolchain.toml"))
}

/// Get the project toolchain config path (.harbour/native-toolchain.toml).
pub fn project_toolchain_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".harbour").join("native-toolchain.toml")
}
