//! `harbour-native probe` command

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::cli::ProbeArgs;
use harbour_native::builder::toolchain::{CompilerFamily, GccVersionDeterminer, ToolSearch, ToolSearchPath};
use harbour_native::util::process::SystemExecutor;
use harbour_native::{CompilerIdentity, ToolRole};

pub fn execute(args: ProbeArgs) -> Result<()> {
    let family = if args.clang {
        CompilerFamily::Clang
    } else {
        CompilerFamily::Gcc
    };

    // Fall back to the name as given so the probe reports the failure
    let binary = ToolSearchPath::new(Vec::new())
        .locate(ToolRole::CCompiler, &args.compiler)
        .unwrap_or_else(|_| PathBuf::from(&args.compiler));

    let determiner = GccVersionDeterminer::new(family, Arc::new(SystemExecutor));
    let identity = determiner.identify(&binary, &args.probe_args);

    if args.json {
        let json = serde_json::to_string_pretty(&identity).context("failed to serialize identity")?;
        println!("{}", json);
    } else {
        print_identity(&binary, &identity);
    }

    if !identity.is_available() {
        bail!("{} is not a usable {} compiler", args.compiler, family);
    }
    Ok(())
}

fn print_identity(binary: &std::path::Path, identity: &CompilerIdentity) {
    println!("Compiler: {}", binary.display());
    match identity {
        CompilerIdentity::Available(resolved) => {
            println!("  Family:       {}", resolved.family);
            println!("  Version:      {}", resolved.version);
            println!("  Architecture: {}", resolved.architecture);
            if !resolved.system_includes.is_empty() {
                println!("  System includes:");
                for dir in &resolved.system_includes {
                    println!("    {}", dir.display());
                }
            }
        }
        CompilerIdentity::Broken(broken) => {
            println!("  Status:       unavailable");
            for line in &broken.diagnostics {
                println!("  {}", line);
            }
        }
    }
}
