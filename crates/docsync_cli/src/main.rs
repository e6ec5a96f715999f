//! docsync CLI
//!
//! Command-line tools for docsync mapping definitions.
//!
//! # Commands
//!
//! - `inspect` - Display the tables and fields of a mapping file
//! - `verify` - Load a mapping file and report structural problems
//! - `discover` - Find mapping files below a host directory

mod commands;
mod error;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// docsync command-line tools.
#[derive(Parser)]
#[command(name = "docsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the tables and fields of a mapping file
    Inspect {
        /// Mapping file
        file: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Load a mapping file and report structural problems
    Verify {
        /// Mapping file
        file: PathBuf,
    },

    /// Find mapping files below a host directory
    Discover {
        /// Directory to search (defaults to the current directory)
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// File name to look for
        #[arg(short, long, default_value = commands::discover::DEFAULT_FILE_NAME)]
        file_name: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { file, format } => {
            commands::inspect::run(&file, &format)?;
        }
        Commands::Verify { file } => {
            commands::verify::run(&file)?;
        }
        Commands::Discover { root, file_name } => {
            let root = match root {
                Some(root) => root,
                None => std::env::current_dir()?,
            };
            commands::discover::run(&root, &file_name)?;
        }
        Commands::Version => {
            println!("docsync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("docsync mapping v{}", docsync_mapping::VERSION);
            println!("docsync engine v{}", docsync_engine::VERSION);
        }
    }

    Ok(())
}
