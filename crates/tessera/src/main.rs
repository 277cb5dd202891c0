//! Tessera CLI - multi-language static site build pipeline.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "tessera")]
#[command(about = "Multi-language static site build pipeline")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to tessera.toml config file
    #[arg(short, long, default_value = "tessera.toml", global = true)]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold config, data and sources in the current directory
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },

    /// Aggregate locale JSON into _items.json and _project.json
    Data {
        /// Locale to aggregate (defaults to site.default_locale)
        #[arg(short, long, conflicts_with = "all")]
        locale: Option<String>,

        /// Aggregate every locale found in the data directory
        #[arg(short, long)]
        all: bool,
    },

    /// Build the static site
    Build {
        /// Locale to build (defaults to site.default_locale)
        #[arg(short, long, conflicts_with = "all")]
        locale: Option<String>,

        /// Build every locale found in the data directory
        #[arg(short, long)]
        all: bool,

        /// Output directory (defaults to config or "dist")
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip minification
        #[arg(long)]
        no_minify: bool,
    },

    /// Start development server with live reload
    Dev {
        /// Locale rebuilt on data changes for this session
        #[arg(short, long)]
        locale: Option<String>,

        /// Port to listen on (defaults to config or 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },

    /// Preview a built site
    Serve {
        /// Port to listen on (defaults to config or 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory to serve (defaults to config or "dist")
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    // Execute command
    match cli.command {
        Commands::Init { yes } => {
            commands::init::run(&cli.config, yes).await?;
        }
        Commands::Data { locale, all } => {
            commands::data::run(&cli.config, locale, all).await?;
        }
        Commands::Build {
            locale,
            all,
            output,
            no_minify,
        } => {
            let minify = if no_minify { Some(false) } else { None };
            commands::build::run(&cli.config, locale, all, output, minify).await?;
        }
        Commands::Dev {
            locale,
            port,
            no_open,
        } => {
            commands::dev::run(&cli.config, locale, port, !no_open).await?;
        }
        Commands::Serve { port, dir, no_open } => {
            commands::serve::run(&cli.config, port, dir, !no_open).await?;
        }
    }

    Ok(())
}
