//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// harbour-native - Identify compilers and inspect native toolchains
#[derive(Parser)]
#[command(name = "harbour-native")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identify a GCC or Clang compiler from its predefined macros
    Probe(ProbeArgs),

    /// Show the tool used for each role by the configured toolchain
    Tools(ToolsArgs),
}

#[derive(Args)]
pub struct ProbeArgs {
    /// Compiler executable (name on PATH or path)
    pub compiler: String,

    /// Expect Clang rather than GCC
    #[arg(long)]
    pub clang: bool,

    /// Print the identity as JSON
    #[arg(long)]
    pub json: bool,

    /// Extra arguments passed to the compiler before `-dM -E -`
    #[arg(last = true)]
    pub probe_args: Vec<String>,
}

#[derive(Args)]
pub struct ToolsArgs {
    /// Target architecture (e.g. x86, x86_64, arm64)
    #[arg(long, value_name = "ARCH")]
    pub target_arch: Option<String>,

    /// Project directory holding `.harbour/native-toolchain.toml`
    #[arg(long, default_value = ".")]
    pub project: PathBuf,
}
