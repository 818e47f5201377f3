//! buildspec CLI tool.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "buildspec")]
#[command(about = "Resolve multidimensional build recipes", long_about = None)]
struct Cli {
    /// Log every resolve step (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Squash a recipe for one version and toolchain
    Resolve {
        /// Path to the recipe file
        path: String,
        /// Software version
        #[arg(long)]
        version: String,
        /// Toolchain name
        #[arg(long)]
        toolchain: String,
        /// Toolchain version
        #[arg(long)]
        toolchain_version: String,
    },
    /// Check a request against the supported ranges and print the defaults
    Specs {
        /// Path to the recipe file
        path: String,
        /// Software version
        #[arg(long)]
        version: Option<String>,
        /// Toolchain name
        #[arg(long)]
        toolchain: Option<String>,
        /// Toolchain version
        #[arg(long, requires = "toolchain")]
        toolchain_version: Option<String>,
    },
    /// Validate a recipe and summarize it
    Validate {
        /// Path to the recipe file
        path: String,
    },
    /// Print the recipe format version
    FormatVersion {
        /// Path to the recipe file
        path: String,
        /// Fall back to the default format version when the header is missing
        #[arg(long)]
        allow_missing: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Resolve {
            path,
            version,
            toolchain,
            toolchain_version,
        } => {
            commands::resolve::resolve(&path, &version, &toolchain, &toolchain_version)?;
        }
        Commands::Specs {
            path,
            version,
            toolchain,
            toolchain_version,
        } => {
            commands::resolve::specs(
                &path,
                version.as_deref(),
                toolchain.as_deref(),
                toolchain_version.as_deref(),
            )?;
        }
        Commands::Validate { path } => {
            commands::validate(&path)?;
        }
        Commands::FormatVersion {
            path,
            allow_missing,
        } => {
            commands::format_version(&path, allow_missing)?;
        }
    }

    Ok(())
}
