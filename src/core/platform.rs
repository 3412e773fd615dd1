//! Target platform description: operating system and architecture.
//!
//! These types drive the per-platform file naming rules (object suffix,
//! library names) and the architecture-specific parts of tool selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// CPU architecture of a native platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Architecture {
    /// 32-bit x86
    I386,
    /// x86-64
    Amd64,
    /// 32-bit ARM
    Arm,
    /// 64-bit ARM
    Aarch64,
    /// Anything else, kept by name
    Other(String),
}

impl Architecture {
    /// The architecture of the running process.
    pub fn current() -> Self {
        Self::from_rust_arch(std::env::consts::ARCH)
    }

    /// Map a `std::env::consts::ARCH` value.
    pub fn from_rust_arch(arch: &str) -> Self {
        match arch {
            "x86" => Architecture::I386,
            "x86_64" => Architecture::Amd64,
            "arm" => Architecture::Arm,
            "aarch64" => Architecture::Aarch64,
            other => Architecture::Other(other.to_string()),
        }
    }

    /// Parse user input, accepting the usual aliases.
    pub fn for_input(input: &str) -> Self {
        match input.to_ascii_lowercase().as_str() {
            "x86" | "i386" | "ia-32" | "i686" => Architecture::I386,
            "x86_64" | "x86-64" | "amd64" | "x64" => Architecture::Amd64,
            "arm" | "armv7" | "arm-v7" => Architecture::Arm,
            "aarch64" | "arm64" | "arm-v8" => Architecture::Aarch64,
            _ => Architecture::Other(input.to_string()),
        }
    }

    /// Canonical name.
    pub fn name(&self) -> &str {
        match self {
            Architecture::I386 => "i386",
            Architecture::Amd64 => "amd64",
            Architecture::Arm => "arm",
            Architecture::Aarch64 => "aarch64",
            Architecture::Other(name) => name,
        }
    }

    /// Directory/argument name Visual C++ uses for this architecture.
    pub fn msvc_name(&self) -> &str {
        match self {
            Architecture::I386 => "x86",
            Architecture::Amd64 => "x64",
            Architecture::Arm => "arm",
            Architecture::Aarch64 => "arm64",
            Architecture::Other(name) => name,
        }
    }

    pub fn is_i386(&self) -> bool {
        *self == Architecture::I386
    }

    pub fn is_amd64(&self) -> bool {
        *self == Architecture::Amd64
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Architecture {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Architecture::for_input(s))
    }
}

impl Serialize for Architecture {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Architecture {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Architecture::for_input(&s))
    }
}

/// Operating system of a native platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystem {
    Windows,
    #[serde(alias = "osx", alias = "darwin")]
    MacOs,
    Linux,
    FreeBsd,
    Solaris,
    /// Any other Unix-like system
    Unix,
}

impl OperatingSystem {
    /// The operating system of the running process.
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => OperatingSystem::Windows,
            "macos" => OperatingSystem::MacOs,
            "linux" => OperatingSystem::Linux,
            "freebsd" => OperatingSystem::FreeBsd,
            "solaris" | "illumos" => OperatingSystem::Solaris,
            _ => OperatingSystem::Unix,
        }
    }

    pub fn is_windows(&self) -> bool {
        *self == OperatingSystem::Windows
    }

    pub fn is_macos(&self) -> bool {
        *self == OperatingSystem::MacOs
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingSystem::Windows => "windows",
            OperatingSystem::MacOs => "macos",
            OperatingSystem::Linux => "linux",
            OperatingSystem::FreeBsd => "freebsd",
            OperatingSystem::Solaris => "solaris",
            OperatingSystem::Unix => "unix",
        }
    }

    /// Object file suffix, including the leading dot.
    pub fn object_file_extension(&self) -> &'static str {
        if self.is_windows() {
            ".obj"
        } else {
            ".o"
        }
    }

    /// Executable file name for a base name.
    pub fn executable_name(&self, base: &str) -> String {
        if self.is_windows() {
            with_suffix(base, ".exe")
        } else {
            base.to_string()
        }
    }

    /// Shared library file name for a library name.
    pub fn shared_library_name(&self, name: &str) -> String {
        match self {
            OperatingSystem::Windows => with_suffix(name, ".dll"),
            OperatingSystem::MacOs => with_prefix_and_suffix(name, ".dylib"),
            _ => with_prefix_and_suffix(name, ".so"),
        }
    }

    /// Static library file name for a library name.
    pub fn static_library_name(&self, name: &str) -> String {
        if self.is_windows() {
            with_suffix(name, ".lib")
        } else {
            with_prefix_and_suffix(name, ".a")
        }
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn with_suffix(name: &str, suffix: &str) -> String {
    if name.ends_with(suffix) {
        name.to_string()
    } else {
        format!("{}{}", name, suffix)
    }
}

fn with_prefix_and_suffix(name: &str, suffix: &str) -> String {
    // A path-like name keeps its directory; only the file name gets the prefix.
    let (dir, file) = match name.rfind('/') {
        Some(idx) => name.split_at(idx + 1),
        None => ("", name),
    };
    let file = if file.starts_with("lib") {
        file.to_string()
    } else {
        format!("lib{}", file)
    };
    with_suffix(&format!("{}{}", dir, file), suffix)
}

/// A platform a toolchain can target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NativePlatform {
    /// Platform name, e.g. `linux_amd64`
    pub name: String,
    pub operating_system: OperatingSystem,
    pub architecture: Architecture,
}

impl NativePlatform {
    /// Create a platform with a generated name.
    pub fn new(operating_system: OperatingSystem, architecture: Architecture) -> Self {
        NativePlatform {
            name: format!("{}_{}", operating_system, architecture),
            operating_system,
            architecture,
        }
    }

    /// The platform of the running process.
    pub fn host() -> Self {
        Self::new(OperatingSystem::current(), Architecture::current())
    }
}

impl fmt::Display for NativePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_architecture_aliases() {
        assert_eq!(Architecture::for_input("x86"), Architecture::I386);
        assert_eq!(Architecture::for_input("i686"), Architecture::I386);
        assert_eq!(Architecture::for_input("x64"), Architecture::Amd64);
        assert_eq!(Architecture::for_input("X86_64"), Architecture::Amd64);
        assert_eq!(Architecture::for_input("arm64"), Architecture::Aarch64);
        assert_eq!(
            Architecture::for_input("sparc"),
            Architecture::Other("sparc".to_string())
        );
    }

    #[test]
    fn test_architecture_names() {
        assert_eq!(Architecture::I386.to_string(), "i386");
        assert_eq!(Architecture::Amd64.to_string(), "amd64");
        assert_eq!(Architecture::Amd64.msvc_name(), "x64");
        assert_eq!(Architecture::I386.msvc_name(), "x86");
    }

    #[test]
    fn test_windows_file_names() {
        let os = OperatingSystem::Windows;
        assert_eq!(os.object_file_extension(), ".obj");
        assert_eq!(os.executable_name("app"), "app.exe");
        assert_eq!(os.shared_library_name("foo"), "foo.dll");
        assert_eq!(os.static_library_name("foo"), "foo.lib");
    }

    #[test]
    fn test_unix_file_names() {
        let os = OperatingSystem::Linux;
        assert_eq!(os.object_file_extension(), ".o");
        assert_eq!(os.executable_name("app"), "app");
        assert_eq!(os.shared_library_name("foo"), "libfoo.so");
        assert_eq!(os.shared_library_name("out/foo"), "out/libfoo.so");
        assert_eq!(os.static_library_name("foo"), "libfoo.a");
        assert_eq!(OperatingSystem::MacOs.shared_library_name("foo"), "libfoo.dylib");
    }

    #[test]
    fn test_platform_name() {
        let platform = NativePlatform::new(OperatingSystem::Linux, Architecture::Amd64);
        assert_eq!(platform.name, "linux_amd64");
    }
}
