//! `harbour-native tools` command

use std::sync::Arc;

use anyhow::Result;

use crate::cli::ToolsArgs;
use harbour_native::core::Architecture;
use harbour_native::util::process::SystemExecutor;
use harbour_native::{detect_provider, ToolRole, ToolchainError};

pub fn execute(args: ToolsArgs) -> Result<()> {
    let target_arch = args.target_arch.as_deref().map(Architecture::for_input);
    let provider = detect_provider(&args.project, target_arch, Arc::new(SystemExecutor))?;

    println!("Toolchain: {} ({})", provider.family(), provider.target());
    println!();

    for role in ToolRole::ALL {
        let status = if !provider.is_supported(role) {
            "unsupported".to_string()
        } else {
            match provider.executable(role) {
                Ok(path) => path.display().to_string(),
                Err(ToolchainError::ToolNotFound(e)) => format!("not found ({})", e.executable),
                Err(e) => format!("unavailable ({})", e),
            }
        };
        println!("  {:<28} {}", role.tool_name(), status);
    }

    println!();
    println!("Files:");
    println!("  Object suffix:  {}", provider.object_file_extension());
    println!("  Executable:     {}", provider.executable_name("app"));
    println!("  Shared library: {}", provider.shared_library_name("foo"));
    println!("  Static library: {}", provider.static_library_name("foo"));
    println!(
        "  Link against:   {}",
        provider.shared_library_link_file_name(&provider.shared_library_name("foo"))
    );

    Ok(())
}
