//! Building a platform tool provider from configuration.

use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};

use crate::builder::context::AmbientEnvironment;
use crate::builder::toolchain::registry::GccPlatformToolChain;
use crate::builder::toolchain::search::ToolSearchPath;
use crate::builder::toolchain::{GccPlatformToolProvider, PlatformToolProvider, VisualCppPlatformToolProvider};
use crate::core::platform::{Architecture, NativePlatform};
use crate::core::role::ToolRole;
use crate::util::config::{
    global_toolchain_config_path, load_toolchain_config, project_toolchain_config_path,
    GccConfig, ToolConfig, ToolchainConfig, ToolchainKind,
};
use crate::util::process::ProcessExecutor;

/// Load the configuration for `project_root` and build its provider.
///
/// Searches for config in this order:
/// 1. Project config (`.harbour/native-toolchain.toml` under `project_root`)
/// 2. Global config (`~/.harbour/native-toolchain.toml`)
///
/// `target_arch` overrides the configured target architecture.
pub fn detect_provider(
    project_root: &Path,
    target_arch: Option<Architecture>,
    executor: Arc<dyn ProcessExecutor>,
) -> Result<PlatformToolProvider> {
    let global_path = global_toolchain_config_path();
    let mut config = load_toolchain_config(
        global_path.as_deref(),
        &project_toolchain_config_path(project_root),
    );
    if target_arch.is_some() {
        config.toolchain.target_arch = target_arch;
    }
    provider_for_config(&config, executor, AmbientEnvironment::capture())
}

/// Build the provider a configuration describes, targeting the host
/// operating system.
pub fn provider_for_config(
    config: &ToolchainConfig,
    executor: Arc<dyn ProcessExecutor>,
    ambient: AmbientEnvironment,
) -> Result<PlatformToolProvider> {
    let host = NativePlatform::host();
    let architecture = config
        .toolchain
        .target_arch
        .clone()
        .unwrap_or_else(|| host.architecture.clone());
    let target = NativePlatform::new(host.operating_system, architecture);

    let kind = config.toolchain.kind.unwrap_or_else(|| {
        if target.operating_system.is_windows() && config.msvc.is_some() {
            ToolchainKind::Msvc
        } else {
            ToolchainKind::Gcc
        }
    });

    match kind {
        ToolchainKind::Msvc => {
            let Some(ref msvc) = config.msvc else {
                bail!(
                    "no Visual C++ installation configured\n\
                     \n\
                     Describe the installation under [msvc] in .harbour/native-toolchain.toml"
                );
            };
            tracing::info!(
                "Using {} {} for {}",
                msvc.install.name,
                msvc.install.version,
                target
            );
            Ok(PlatformToolProvider::VisualCpp(VisualCppPlatformToolProvider::new(
                target,
                msvc.install.clone(),
                msvc.sdk.clone(),
                msvc.ucrt.clone(),
                executor,
                ambient,
            )))
        }
        ToolchainKind::Gcc => {
            let mut gcc = config.gcc.clone();
            apply_env_overrides(&mut gcc, &ambient);

            let toolchain = GccPlatformToolChain::from_config(&gcc).for_target(&target, &host.architecture);
            let search = ToolSearchPath::new(toolchain.path().to_vec())
                .with_system_path(ambient.get_ignore_case("PATH").map(OsString::from));

            tracing::debug!("Using {} toolchain for {}", toolchain.family(), target);
            Ok(PlatformToolProvider::Gcc(GccPlatformToolProvider::new(
                target,
                toolchain,
                Arc::new(search),
                executor,
                ambient,
            )))
        }
    }
}

/// Fill unconfigured executables from `CC`, `CXX` and `AR`.
fn apply_env_overrides(config: &mut GccConfig, ambient: &AmbientEnvironment) {
    let overrides: [(&str, &[ToolRole]); 3] = [
        ("CC", &[ToolRole::CCompiler, ToolRole::ObjectiveCCompiler, ToolRole::Assembler]),
        ("CXX", &[ToolRole::CppCompiler, ToolRole::ObjectiveCppCompiler, ToolRole::Linker]),
        ("AR", &[ToolRole::StaticLibraryArchiver]),
    ];

    for (var, roles) in overrides {
        let Some(value) = ambient.get(var).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        for role in roles {
            let tool = config.tools.entry(*role).or_insert_with(ToolConfig::default);
            if tool.executable.is_none() {
                tracing::debug!("Using {}={} for the {}", var, value, role.tool_name());
                tool.executable = Some(value.trim().to_string());
            }
        }
    }
}
