//! Sprig CLI - Command-line interface for Sprig
//!
//! Adds, lists and reconciles projects, and watches their files.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "sprig")]
#[command(author = "Sprig Contributors")]
#[command(version)]
#[command(about = "Track and watch stylesheet and script projects", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project database (defaults to the user data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default config file
    Init,

    /// Start tracking a directory
    Add {
        /// Directory to add (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Stop tracking a project
    Remove {
        /// Project id
        id: String,
    },

    /// List tracked projects
    List,

    /// List the files of a project
    Files {
        /// Project id
        id: String,

        /// Only show files passing the extension and ignore rules
        #[arg(long)]
        valid: bool,
    },

    /// Reconcile a project with its directory
    Refresh {
        /// Project id
        id: String,
    },

    /// Drop projects and files that no longer exist
    Check,

    /// Change the settings of a tracked file
    Set {
        /// Project id
        id: String,

        /// Source file
        file: PathBuf,

        /// Compiled output path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Setting as key=value (value parsed as JSON when possible)
        #[arg(short, long = "setting")]
        settings: Vec<String>,
    },

    /// Watch every tracked file and report changes
    Watch,
}

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let paths = commands::Paths::resolve(cli.config, cli.db);

    let result = match cli.command {
        Commands::Init => commands::init(&paths),
        Commands::Add { path } => commands::add(&paths, &path),
        Commands::Remove { id } => commands::remove(&paths, &id),
        Commands::List => commands::list(&paths),
        Commands::Files { id, valid } => commands::files(&paths, &id, valid),
        Commands::Refresh { id } => commands::refresh(&paths, &id),
        Commands::Check => commands::check(&paths),
        Commands::Set {
            id,
            file,
            output,
            settings,
        } => commands::set(&paths, &id, &file, output.as_deref(), &settings),
        Commands::Watch => commands::watch(&paths),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
