//! GCC/Clang identification by macro dump.
//!
//! The compiler is run as `<binary> <probe args> -dM -E -` on an empty input
//! and its predefined macro table is scraped from stdout. Every failure is
//! turned into a [`CompilerIdentity::Broken`] value; nothing here returns an
//! error.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::builder::compiler::CompilerVersion;
use crate::core::platform::Architecture;
use crate::util::hash::fingerprint;
use crate::util::process::{ExecRequest, ProcessExecutor};

/// Arguments appended to the probe arguments to dump predefined macros.
pub const MACRO_DUMP_ARGS: [&str; 3] = ["-dM", "-E", "-"];

/// Arguments appended to list the default include search path.
pub const INCLUDE_SEARCH_ARGS: [&str; 3] = ["-E", "-v", "-"];

static DEFINE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#define\s+(\S+)\s+(.*)$").expect("valid regex"));

/// Compiler family a probe expects or found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerFamily {
    #[default]
    Gcc,
    Clang,
}

impl CompilerFamily {
    /// Name used in diagnostics.
    pub fn description(&self) -> &'static str {
        match self {
            CompilerFamily::Gcc => "GCC",
            CompilerFamily::Clang => "Clang",
        }
    }

    /// Short identifier stamped on compilation results.
    pub fn identifier(&self) -> &'static str {
        match self {
            CompilerFamily::Gcc => "gcc",
            CompilerFamily::Clang => "clang",
        }
    }

    fn version_macros(&self) -> [&'static str; 3] {
        match self {
            CompilerFamily::Gcc => ["__GNUC__", "__GNUC_MINOR__", "__GNUC_PATCHLEVEL__"],
            CompilerFamily::Clang => [
                "__clang_major__",
                "__clang_minor__",
                "__clang_patchlevel__",
            ],
        }
    }
}

impl fmt::Display for CompilerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A compiler that was identified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCompiler {
    pub family: CompilerFamily,
    pub version: semver::Version,
    /// Architecture the compiler targets by default
    pub architecture: Architecture,
    /// Default `#include <...>` search path, in search order
    pub system_includes: Vec<PathBuf>,
}

impl ResolvedCompiler {
    /// Identifier, version and fingerprint for result stamping.
    pub fn compiler_version(&self) -> CompilerVersion {
        let version = self.version.to_string();
        CompilerVersion {
            identifier: self.family.identifier().to_string(),
            fingerprint: fingerprint([
                self.family.identifier(),
                version.as_str(),
                self.architecture.name(),
            ]),
            version: self.version.clone(),
        }
    }
}

/// A compiler that could not be identified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenCompiler {
    /// Human-readable explanation, never empty
    pub diagnostics: Vec<String>,
}

impl BrokenCompiler {
    fn new(message: impl Into<String>) -> Self {
        BrokenCompiler {
            diagnostics: vec![message.into()],
        }
    }
}

impl fmt::Display for BrokenCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.diagnostics.join("\n"))
    }
}

/// Result of probing a compiler binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CompilerIdentity {
    Available(ResolvedCompiler),
    Broken(BrokenCompiler),
}

impl CompilerIdentity {
    fn broken(message: impl Into<String>) -> Self {
        CompilerIdentity::Broken(BrokenCompiler::new(message))
    }

    pub fn is_available(&self) -> bool {
        matches!(self, CompilerIdentity::Available(_))
    }

    pub fn resolved(&self) -> Option<&ResolvedCompiler> {
        match self {
            CompilerIdentity::Available(resolved) => Some(resolved),
            CompilerIdentity::Broken(_) => None,
        }
    }

    /// Diagnostics; empty for an available compiler.
    pub fn diagnostics(&self) -> &[String] {
        match self {
            CompilerIdentity::Available(_) => &[],
            CompilerIdentity::Broken(broken) => &broken.diagnostics,
        }
    }
}

/// Identifies GCC-family compilers.
#[derive(Clone)]
pub struct GccVersionDeterminer {
    family: CompilerFamily,
    executor: Arc<dyn ProcessExecutor>,
    host_architecture: Architecture,
}

impl fmt::Debug for GccVersionDeterminer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GccVersionDeterminer")
            .field("family", &self.family)
            .field("host_architecture", &self.host_architecture)
            .finish()
    }
}

impl GccVersionDeterminer {
    pub fn new(family: CompilerFamily, executor: Arc<dyn ProcessExecutor>) -> Self {
        GccVersionDeterminer {
            family,
            executor,
            host_architecture: Architecture::current(),
        }
    }

    pub fn for_gcc(executor: Arc<dyn ProcessExecutor>) -> Self {
        Self::new(CompilerFamily::Gcc, executor)
    }

    pub fn for_clang(executor: Arc<dyn ProcessExecutor>) -> Self {
        Self::new(CompilerFamily::Clang, executor)
    }

    /// Architecture reported when the dump names neither i386 nor amd64.
    pub fn with_host_architecture(mut self, architecture: Architecture) -> Self {
        self.host_architecture = architecture;
        self
    }

    pub fn family(&self) -> CompilerFamily {
        self.family
    }

    /// Probe `binary` and classify it.
    pub fn identify(&self, binary: &Path, probe_args: &[String]) -> CompilerIdentity {
        let mut args = probe_args.to_vec();
        args.extend(MACRO_DUMP_ARGS.iter().map(|a| a.to_string()));

        let name = binary
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| binary.display().to_string());

        let request = probe_request(binary, args.clone());
        tracing::debug!("Probing {} compiler: {}", self.family, request.display_command());

        let output = match self.executor.execute(&request) {
            Ok(output) if output.success() => output,
            Ok(output) => {
                tracing::debug!(
                    "Probe of {} exited with {:?}",
                    binary.display(),
                    output.exit_code
                );
                return self.execution_failure(&name, &args);
            }
            Err(e) => {
                tracing::debug!("Probe of {} failed: {:#}", binary.display(), e);
                return self.execution_failure(&name, &args);
            }
        };

        let identity = self.interpret(&name, &output.stdout_lossy());
        match identity {
            CompilerIdentity::Available(mut resolved) => {
                resolved.system_includes = self.system_includes(binary, probe_args);
                CompilerIdentity::Available(resolved)
            }
            broken => broken,
        }
    }

    fn execution_failure(&self, name: &str, args: &[String]) -> CompilerIdentity {
        CompilerIdentity::broken(format!(
            "Could not determine {} version: failed to execute {} {}.",
            self.family.description(),
            name,
            args.join(" ")
        ))
    }

    /// Classify a macro dump produced by the binary called `name`.
    pub fn interpret(&self, name: &str, output: &str) -> CompilerIdentity {
        let defines = match parse_defines(output) {
            Some(defines) => defines,
            None => return self.unexpected_output(name),
        };

        if !defines.contains_key("__GNUC__") {
            return self.unexpected_output(name);
        }

        let is_clang = defines.contains_key("__clang__");
        match (self.family, is_clang) {
            (CompilerFamily::Clang, false) => {
                return CompilerIdentity::broken(format!(
                    "{} appears to be GCC rather than Clang. Treating it as GCC.",
                    name
                ));
            }
            (CompilerFamily::Gcc, true) => {
                return CompilerIdentity::broken(format!(
                    "XCode {} is a wrapper around Clang. Treating it as Clang and not GCC.",
                    name
                ));
            }
            _ => {}
        }

        let [major, minor, patch] = self.family.version_macros();
        let version = semver::Version::new(
            to_int(defines.get(major)),
            to_int(defines.get(minor)),
            to_int(defines.get(patch)),
        );

        let architecture = if defines.contains_key("__i386__") {
            Architecture::I386
        } else if defines.contains_key("__amd64__") {
            Architecture::Amd64
        } else {
            self.host_architecture.clone()
        };

        CompilerIdentity::Available(ResolvedCompiler {
            family: self.family,
            version,
            architecture,
            system_includes: Vec::new(),
        })
    }

    fn unexpected_output(&self, name: &str) -> CompilerIdentity {
        CompilerIdentity::broken(format!(
            "Could not determine {} version: {} produced unexpected output.",
            self.family.description(),
            name
        ))
    }

    /// Default include search path; empty when it cannot be determined.
    fn system_includes(&self, binary: &Path, probe_args: &[String]) -> Vec<PathBuf> {
        let mut args = probe_args.to_vec();
        args.extend(INCLUDE_SEARCH_ARGS.iter().map(|a| a.to_string()));
        let request = probe_request(binary, args);

        match self.executor.execute(&request) {
            Ok(output) if output.success() => parse_system_includes(&output.stderr_lossy()),
            Ok(_) | Err(_) => {
                tracing::debug!(
                    "Could not list system include directories of {}",
                    binary.display()
                );
                Vec::new()
            }
        }
    }
}

fn probe_request(binary: &Path, args: Vec<String>) -> ExecRequest {
    let mut request = ExecRequest::new(binary);
    request.args = args;
    request.cwd = binary
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf);
    request.stdin = Some(Vec::new());
    request.ignore_exit_value = true;
    request
}

/// Parse `#define NAME VALUE` lines. `None` if any non-empty line does not
/// match.
pub fn parse_defines(output: &str) -> Option<HashMap<String, String>> {
    let mut defines = HashMap::new();
    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let caps = DEFINE_PATTERN.captures(line)?;
        defines.insert(caps[1].to_string(), caps[2].to_string());
    }
    Some(defines)
}

fn to_int(value: Option<&String>) -> u64 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

/// Extract the `#include <...>` search list from `-E -v` diagnostics.
pub fn parse_system_includes(stderr: &str) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let mut in_list = false;
    for line in stderr.lines() {
        if line.starts_with("#include <...> search starts here:") {
            in_list = true;
            continue;
        }
        if line.starts_with("End of search list.") {
            break;
        }
        if in_list {
            let dir = line.trim().trim_end_matches(" (framework directory)");
            if !dir.is_empty() {
                dirs.push(PathBuf::from(dir));
            }
        }
    }
    dirs
}
