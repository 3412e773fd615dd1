//! Test utilities and mocks for unit tests.
//!
//! [`MockExecutor`] implements [`ProcessExecutor`] against a list of scripted
//! expectations, so probes and compilers can be exercised without a real
//! toolchain on the machine.
//!
//! # Example
//!
//! ```rust,ignore
//! use harbour_native::test_support::{MockExecutor, MockProcessOutput, compiler_outputs};
//!
//! #[test]
//! fn test_example() {
//!     let exec = MockExecutor::new();
//!     exec.expect_contains("-dM -E -", compiler_outputs::gcc_defines(7, 4, 0));
//!
//!     // Hand `Arc::new(exec)` to the code under test...
//! }
//! ```

pub mod fixtures;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{bail, Result};

use crate::builder::toolchain::search::{ToolNotFound, ToolSearch};
use crate::core::role::ToolRole;
use crate::util::process::{ExecOutput, ExecRequest, ProcessExecutor};

// Re-export fixtures for convenience
pub use fixtures::*;

/// Mock process output for testing command execution.
#[derive(Debug, Clone)]
pub struct MockProcessOutput {
    /// Exit status code (0 = success).
    pub status: i32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// When set, the process fails to start with this message.
    pub spawn_error: Option<String>,
}

impl MockProcessOutput {
    /// Create a successful output with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        MockProcessOutput {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            spawn_error: None,
        }
    }

    /// Create a failure output with the given stderr and status code.
    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        MockProcessOutput {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
            spawn_error: None,
        }
    }

    /// Create an output with both stdout and stderr.
    pub fn with_output(status: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        MockProcessOutput {
            status,
            stdout: stdout.into(),
            stderr: stderr.into(),
            spawn_error: None,
        }
    }

    /// A process that cannot be started at all.
    pub fn spawn_error(message: impl Into<String>) -> Self {
        MockProcessOutput {
            status: -1,
            stdout: String::new(),
            stderr: String::new(),
            spawn_error: Some(message.into()),
        }
    }
}

impl Default for MockProcessOutput {
    fn default() -> Self {
        MockProcessOutput::success("")
    }
}

/// Pattern for matching commands in MockExecutor.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Exact match on full command string.
    Exact(String),
    /// Match if command starts with prefix.
    StartsWith(String),
    /// Match if command contains substring.
    Contains(String),
    /// Match using a regex pattern.
    Regex(String),
    /// Match any command.
    Any,
}

impl CommandPattern {
    /// Check if this pattern matches the given command.
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
            CommandPattern::Contains(s) => cmd.contains(s),
            CommandPattern::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(cmd))
                .unwrap_or(false),
            CommandPattern::Any => true,
        }
    }
}

/// Expectation for a command execution.
#[derive(Debug, Clone)]
pub struct CommandExpectation {
    /// Pattern to match against commands.
    pub pattern: CommandPattern,
    /// Output to return when matched.
    pub output: MockProcessOutput,
    /// Number of times this expectation can be used (None = unlimited).
    pub times: Option<usize>,
    /// Number of times this expectation has been used.
    pub used: usize,
}

impl CommandExpectation {
    /// Create a new expectation.
    pub fn new(pattern: CommandPattern, output: MockProcessOutput) -> Self {
        CommandExpectation {
            pattern,
            output,
            times: None,
            used: 0,
        }
    }

    /// Set the number of times this expectation can be used.
    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    /// Check if this expectation can still be used.
    pub fn available(&self) -> bool {
        match self.times {
            Some(n) => self.used < n,
            None => true,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    expectations: Vec<CommandExpectation>,
    calls: Vec<ExecRequest>,
    default_output: Option<MockProcessOutput>,
}

/// Mock process executor for testing command execution.
///
/// Commands are matched on [`ExecRequest::display_command`]. Unmatched
/// commands succeed with empty output unless the executor is strict.
#[derive(Debug)]
pub struct MockExecutor {
    state: Mutex<MockState>,
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExecutor {
    /// Create a new mock executor.
    pub fn new() -> Self {
        MockExecutor {
            state: Mutex::new(MockState {
                default_output: Some(MockProcessOutput::success("")),
                ..Default::default()
            }),
        }
    }

    /// An executor that rejects unmatched commands.
    pub fn strict() -> Self {
        MockExecutor {
            state: Mutex::new(MockState::default()),
        }
    }

    fn push(&self, expectation: CommandExpectation) -> &Self {
        self.state.lock().unwrap().expectations.push(expectation);
        self
    }

    /// Add an expectation for an exact command match.
    pub fn expect(&self, cmd: &str, output: MockProcessOutput) -> &Self {
        self.push(CommandExpectation::new(
            CommandPattern::Exact(cmd.to_string()),
            output,
        ))
    }

    /// Add an expectation for a command starting with a prefix.
    pub fn expect_prefix(&self, prefix: &str, output: MockProcessOutput) -> &Self {
        self.push(CommandExpectation::new(
            CommandPattern::StartsWith(prefix.to_string()),
            output,
        ))
    }

    /// Add an expectation for a command containing a substring.
    pub fn expect_contains(&self, substring: &str, output: MockProcessOutput) -> &Self {
        self.push(CommandExpectation::new(
            CommandPattern::Contains(substring.to_string()),
            output,
        ))
    }

    /// Add a custom expectation.
    pub fn expect_pattern(&self, expectation: CommandExpectation) -> &Self {
        self.push(expectation)
    }

    /// Set a default output for commands that don't match any expectation.
    pub fn set_default(&self, output: MockProcessOutput) -> &Self {
        self.state.lock().unwrap().default_output = Some(output);
        self
    }

    /// Get all requests that were executed.
    pub fn calls(&self) -> Vec<ExecRequest> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Commands executed, as display strings.
    pub fn commands(&self) -> Vec<String> {
        self.calls().iter().map(ExecRequest::display_command).collect()
    }

    /// Clear all recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Verify that all expectations with a specific count were satisfied.
    pub fn verify(&self) -> Result<()> {
        let state = self.state.lock().unwrap();
        for (i, exp) in state.expectations.iter().enumerate() {
            if let Some(expected) = exp.times {
                if exp.used != expected {
                    bail!(
                        "expectation {} was used {} times, expected {}",
                        i,
                        exp.used,
                        expected
                    );
                }
            }
        }
        Ok(())
    }
}

impl ProcessExecutor for MockExecutor {
    fn execute(&self, request: &ExecRequest) -> Result<ExecOutput> {
        let full_cmd = request.display_command();
        let mut state = self.state.lock().unwrap();
        state.calls.push(request.clone());

        let mut matched = None;
        for exp in &mut state.expectations {
            if exp.pattern.matches(&full_cmd) && exp.available() {
                exp.used += 1;
                matched = Some(exp.output.clone());
                break;
            }
        }

        let output = match matched.or_else(|| state.default_output.clone()) {
            Some(output) => output,
            None => bail!("unexpected command: {}", full_cmd),
        };

        if let Some(message) = output.spawn_error {
            bail!("failed to execute `{}`: {}", full_cmd, message);
        }

        let result = ExecOutput {
            exit_code: Some(output.status),
            stdout: output.stdout.into_bytes(),
            stderr: output.stderr.into_bytes(),
        };
        if !request.ignore_exit_value && !result.success() {
            bail!(
                "`{}` failed with exit code {:?}\n{}",
                full_cmd,
                result.exit_code,
                result.stderr_lossy()
            );
        }
        Ok(result)
    }
}

/// Tool search over a fixed executable table.
#[derive(Debug, Clone, Default)]
pub struct FakeToolSearch {
    tools: BTreeMap<String, PathBuf>,
    path: Vec<PathBuf>,
}

impl FakeToolSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `executable` to `path`.
    pub fn with_tool(mut self, executable: &str, path: impl Into<PathBuf>) -> Self {
        self.tools.insert(executable.to_string(), path.into());
        self
    }

    /// Resolve each executable to `<dir>/<executable>`.
    pub fn with_tools_in(mut self, dir: impl Into<PathBuf>, executables: &[&str]) -> Self {
        let dir = dir.into();
        for exe in executables {
            self.tools.insert(exe.to_string(), dir.join(exe));
        }
        self.path.push(dir);
        self
    }
}

impl ToolSearch for FakeToolSearch {
    fn locate(&self, role: ToolRole, executable: &str) -> Result<PathBuf, ToolNotFound> {
        self.tools.get(executable).cloned().ok_or_else(|| ToolNotFound {
            role,
            executable: executable.to_string(),
            searched: self.path.clone(),
        })
    }

    fn path(&self) -> &[PathBuf] {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_executor_matches_in_order() {
        let exec = MockExecutor::strict();
        exec.expect("gcc --version", MockProcessOutput::success("gcc 12.0.0"))
            .expect_prefix("gcc", MockProcessOutput::failure(1, "boom"));

        let mut request = ExecRequest::new("gcc");
        request.args = vec!["--version".to_string()];
        let out = exec.execute(&request).unwrap();
        assert_eq!(out.stdout_lossy(), "gcc 12.0.0");

        request.args = vec!["-c".to_string()];
        request.ignore_exit_value = true;
        let out = exec.execute(&request).unwrap();
        assert_eq!(out.exit_code, Some(1));

        assert_eq!(exec.commands(), vec!["gcc --version", "gcc -c"]);
    }

    #[test]
    fn test_strict_executor_rejects_unknown() {
        let exec = MockExecutor::strict();
        assert!(exec.execute(&ExecRequest::new("cl.exe")).is_err());
    }

    #[test]
    fn test_spawn_error() {
        let exec = MockExecutor::new();
        exec.expect_prefix("missing", MockProcessOutput::spawn_error("not found"));
        let err = exec.execute(&ExecRequest::new("missing")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_expectation_times() {
        let exec = MockExecutor::new();
        exec.expect_pattern(
            CommandExpectation::new(CommandPattern::Any, MockProcessOutput::success("once")).times(1),
        );
        exec.execute(&ExecRequest::new("a")).unwrap();
        assert!(exec.verify().is_ok());
        let out = exec.execute(&ExecRequest::new("b")).unwrap();
        assert_eq!(out.stdout_lossy(), "");
    }
}
