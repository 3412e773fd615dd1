//! Invocation context for one command-line tool.
//!
//! A context carries the directories that must be searchable when the tool
//! runs, the environment overrides applied to the process, and the caller's
//! argument hook. Contexts are snapshots: they capture the inherited `PATH`
//! when they are built and never look at the live process environment again.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::util::process::ExecRequest;

/// Variables known to change what `cl.exe` and `link.exe` do.
pub const VISUAL_CPP_POISON_VARS: [&str; 5] = ["INCLUDE", "CL", "LIBPATH", "LINK", "LIB"];

/// Snapshot of the environment a tool would inherit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmbientEnvironment {
    vars: BTreeMap<String, String>,
}

impl AmbientEnvironment {
    /// Capture the inheritable environment of the current process.
    ///
    /// Variables whose name or value is not valid unicode are skipped.
    pub fn capture() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        AmbientEnvironment { vars }
    }

    /// Build a snapshot from explicit pairs.
    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        AmbientEnvironment {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Look a variable up the way Windows does, ignoring case.
    pub fn get_ignore_case(&self, name: &str) -> Option<&str> {
        self.get(name).or_else(|| {
            self.vars
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        })
    }
}

/// Caller-supplied hook that mutates a tool's final argument list.
#[derive(Clone, Default)]
pub struct ArgHook(Option<Arc<dyn Fn(&mut Vec<String>) + Send + Sync>>);

impl ArgHook {
    /// A hook that leaves arguments untouched.
    pub fn none() -> Self {
        ArgHook(None)
    }

    pub fn new(hook: impl Fn(&mut Vec<String>) + Send + Sync + 'static) -> Self {
        ArgHook(Some(Arc::new(hook)))
    }

    /// A hook appending fixed arguments.
    pub fn appending(extra: Vec<String>) -> Self {
        if extra.is_empty() {
            return ArgHook::none();
        }
        ArgHook::new(move |args| args.extend(extra.iter().cloned()))
    }

    /// Run `self`, then `next`.
    pub fn then(self, next: ArgHook) -> Self {
        match (self.0, next.0) {
            (None, None) => ArgHook::none(),
            (Some(a), None) => ArgHook(Some(a)),
            (None, Some(b)) => ArgHook(Some(b)),
            (Some(a), Some(b)) => ArgHook::new(move |args| {
                a(args);
                b(args);
            }),
        }
    }

    pub fn apply(&self, args: &mut Vec<String>) {
        if let Some(ref hook) = self.0 {
            hook(args);
        }
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }
}

impl fmt::Debug for ArgHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("ArgHook(<fn>)"),
            None => f.write_str("ArgHook(none)"),
        }
    }
}

/// An inherited variable that was neutralized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentWarning {
    pub name: String,
    pub ignored_value: String,
}

impl fmt::Display for EnvironmentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ignoring value '{}' set for environment variable '{}'.",
            self.ignored_value, self.name
        )
    }
}

/// Family-specific environment rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentPolicy {
    /// Set `CYGWIN=nodosfilewarning`, touch nothing else
    Gcc,
    /// Force-clear inherited variables that perturb `cl.exe`/`link.exe`
    VisualCpp,
}

impl EnvironmentPolicy {
    /// Compute the overrides this policy wants for the given snapshot.
    pub fn overrides(
        &self,
        ambient: &AmbientEnvironment,
    ) -> (BTreeMap<String, String>, Vec<EnvironmentWarning>) {
        match self {
            EnvironmentPolicy::Gcc => {
                let mut env = BTreeMap::new();
                env.insert("CYGWIN".to_string(), "nodosfilewarning".to_string());
                (env, Vec::new())
            }
            EnvironmentPolicy::VisualCpp => sanitize_environment(ambient, &VISUAL_CPP_POISON_VARS),
        }
    }
}

/// Force-clear every listed variable that is set to a non-empty value.
pub fn sanitize_environment(
    ambient: &AmbientEnvironment,
    names: &[&str],
) -> (BTreeMap<String, String>, Vec<EnvironmentWarning>) {
    let mut env = BTreeMap::new();
    let mut warnings = Vec::new();
    for name in names {
        match ambient.get_ignore_case(name) {
            Some(value) if !value.is_empty() => {
                env.insert(name.to_string(), String::new());
                warnings.push(EnvironmentWarning {
                    name: name.to_string(),
                    ignored_value: value.to_string(),
                });
            }
            _ => {}
        }
    }
    (env, warnings)
}

/// Resolved environment for one tool invocation.
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    paths: Vec<PathBuf>,
    environment: BTreeMap<String, String>,
    arg_hook: ArgHook,
    inherited_path: Option<String>,
    warnings: Vec<EnvironmentWarning>,
}

impl InvocationContext {
    /// Build the context for a tool.
    ///
    /// `search_path` lists, in order, the toolchain directories the tool needs
    /// to find the executables it runs by bare name.
    pub fn build(
        search_path: impl IntoIterator<Item = PathBuf>,
        policy: EnvironmentPolicy,
        ambient: &AmbientEnvironment,
        arg_hook: ArgHook,
    ) -> Self {
        let (environment, warnings) = policy.overrides(ambient);
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }

        InvocationContext {
            paths: search_path.into_iter().collect(),
            environment,
            arg_hook,
            inherited_path: ambient.get_ignore_case("PATH").map(str::to_string),
            warnings,
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    pub fn warnings(&self) -> &[EnvironmentWarning] {
        &self.warnings
    }

    pub fn arg_hook(&self) -> &ArgHook {
        &self.arg_hook
    }

    /// `PATH` value for the tool: context paths first, then the inherited one.
    pub fn search_path_value(&self) -> Option<String> {
        if self.paths.is_empty() {
            return None;
        }
        let mut entries: Vec<OsString> = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            // An entry holding the separator would make the whole value unjoinable.
            if std::env::join_paths([path]).is_err() {
                tracing::warn!("Leaving {} out of PATH: it contains the path separator", path.display());
                continue;
            }
            entries.push(path.clone().into());
        }
        if let Some(ref inherited) = self.inherited_path {
            entries.extend(std::env::split_paths(inherited).map(Into::into));
        }
        if entries.is_empty() {
            return None;
        }
        match std::env::join_paths(entries) {
            Ok(joined) => joined.into_string().ok(),
            Err(e) => {
                tracing::warn!("Keeping the inherited PATH: {}", e);
                None
            }
        }
    }

    /// Apply the search path and environment overrides to a request.
    pub fn apply(&self, request: &mut ExecRequest) {
        if let Some(path) = self.search_path_value() {
            request.env.insert("PATH".to_string(), path);
        }
        for (key, value) in &self.environment {
            request.env.insert(key.clone(), value.clone());
        }
    }
}
