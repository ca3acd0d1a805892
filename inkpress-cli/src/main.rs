//! # inkpress CLI
//!
//! Command-line interface for the inkpress blog generator.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "inkpress")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "inkpress.yml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new inkpress site
    Init {
        /// Target directory (defaults to current directory)
        path: Option<PathBuf>,
    },

    /// Build the static site
    Build {
        /// Publish posts and pages marked as drafts
        #[arg(long)]
        include_drafts: bool,

        /// Output directory (overrides the config file)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Fail when any file was skipped
        #[arg(long)]
        strict: bool,
    },

    /// Parse all content and report problems without writing output
    Check {
        /// Include drafts in the report
        #[arg(long)]
        include_drafts: bool,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Build, then serve the site and rebuild on changes
    Serve {
        /// Server port (overrides the config file)
        #[arg(long)]
        port: Option<u16>,

        /// Publish drafts while serving
        #[arg(long)]
        include_drafts: bool,

        /// Output directory (overrides the config file)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Serve the initial build without watching for changes
        #[arg(long)]
        no_watch: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { path } => commands::init_project(path.as_deref()),
        Commands::Build {
            include_drafts,
            output,
            strict,
        } => commands::build_command(
            &cli.config,
            commands::BuildOverrides {
                include_drafts,
                output,
            },
            strict,
        ),
        Commands::Check {
            include_drafts,
            json,
        } => commands::check_site(&cli.config, include_drafts, json),
        Commands::Serve {
            port,
            include_drafts,
            output,
            no_watch,
        } => {
            let overrides = commands::BuildOverrides {
                include_drafts,
                output,
            };
            commands::serve_site(&cli.config, overrides, port, !no_watch).await
        }
    }
}
