//! Canned compiler outputs.

use std::path::{Path, PathBuf};

/// Builder for a `-dM -E -` macro dump.
#[derive(Debug, Clone, Default)]
pub struct MacroDump {
    lines: Vec<String>,
}

impl MacroDump {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dump with `__GNUC__`, `__GNUC_MINOR__` and `__GNUC_PATCHLEVEL__`.
    pub fn gnuc(major: &str, minor: &str, patch: &str) -> Self {
        Self::new()
            .define("__GNUC__", major)
            .define("__GNUC_MINOR__", minor)
            .define("__GNUC_PATCHLEVEL__", patch)
    }

    pub fn define(mut self, name: &str, value: &str) -> Self {
        self.lines.push(format!("#define {} {}", name, value));
        self
    }

    /// Add a raw line.
    pub fn line(mut self, line: &str) -> Self {
        self.lines.push(line.to_string());
        self
    }

    pub fn clang(self, major: &str, minor: &str, patch: &str) -> Self {
        self.define("__clang__", "1")
            .define("__clang_major__", major)
            .define("__clang_minor__", minor)
            .define("__clang_patchlevel__", patch)
    }

    pub fn i386(self) -> Self {
        self.define("__i386__", "1")
    }

    pub fn amd64(self) -> Self {
        self.define("__amd64__", "1")
    }

    pub fn build(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

/// `cc -E -v -` stderr listing the given system include directories.
pub fn verbose_preprocess_stderr(dirs: &[&Path]) -> String {
    let mut out = String::from(
        "Using built-in specs.\n\
         ignoring nonexistent directory \"/usr/local/include/x86_64-linux-gnu\"\n\
         #include \"...\" search starts here:\n\
         #include <...> search starts here:\n",
    );
    for dir in dirs {
        out.push(' ');
        out.push_str(&dir.display().to_string());
        out.push('\n');
    }
    out.push_str("End of search list.\n");
    out
}

/// Default include dirs for a Linux GCC 7 install.
pub fn gcc7_system_includes() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/usr/lib/gcc/x86_64-linux-gnu/7/include"),
        PathBuf::from("/usr/local/include"),
        PathBuf::from("/usr/include"),
    ]
}

/// Mock compiler outputs for testing probes and builds.
pub mod compiler_outputs {
    use super::super::MockProcessOutput;
    use super::MacroDump;

    /// Macro dump of a GCC for the host architecture.
    pub fn gcc_defines(major: u32, minor: u32, patch: u32) -> MockProcessOutput {
        MockProcessOutput::success(
            MacroDump::gnuc(&major.to_string(), &minor.to_string(), &patch.to_string())
                .amd64()
                .build(),
        )
    }

    /// Macro dump of a Clang reporting GNUC 4.2.1 compatibility.
    pub fn clang_defines() -> MockProcessOutput {
        MockProcessOutput::success(
            MacroDump::gnuc("4", "2", "1")
                .clang("10", "0", "0")
                .amd64()
                .build(),
        )
    }

    /// Successful compilation.
    pub fn compile_success() -> MockProcessOutput {
        MockProcessOutput::success("")
    }

    /// Compilation failure.
    pub fn compile_error(file: &str, line: u32, message: &str) -> MockProcessOutput {
        MockProcessOutput::failure(1, format!("{}:{}: error: {}", file, line, message))
    }

    /// Link failure with undefined symbol.
    pub fn link_undefined_symbol(symbol: &str) -> MockProcessOutput {
        MockProcessOutput::failure(1, format!("undefined reference to `{}'", symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macro_dump() {
        let dump = MacroDump::gnuc("7", "4", "0").i386().build();
        assert_eq!(
            dump,
            "#define __GNUC__ 7\n#define __GNUC_MINOR__ 4\n#define __GNUC_PATCHLEVEL__ 0\n#define __i386__ 1\n"
        );
    }

    #[test]
    fn test_verbose_stderr_lists_dirs() {
        let dirs = gcc7_system_includes();
        let refs: Vec<&Path> = dirs.iter().map(PathBuf::as_path).collect();
        let stderr = verbose_preprocess_stderr(&refs);
        assert!(stderr.contains(" /usr/include\nEnd of search list."));
    }
}
