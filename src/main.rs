use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use konsync::handlers;
use konsync::logger;
use konsync::model::Algorithm;
use konsync::sync::ForceMode;

#[derive(Parser)]
#[command(name = "konsync")]
#[command(about = "Keep dotfiles and desktop configuration in one synced directory", long_about = None)]
#[command(version)]
struct Cli {
    /// Show every filesystem operation
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the default one
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Move entries into the sync directory and link them back
    Sync {
        /// Sync directory, overriding settings.target.location
        location: Option<PathBuf>,

        /// Allow permanent deletion when the trash is unavailable, optionally
        /// picking the side that wins a conflict
        #[arg(
            short,
            long,
            value_enum,
            num_args = 0..=1,
            default_missing_value = "delete",
            value_name = "SIDE"
        )]
        force: Option<ForceArg>,

        /// Move replaced files into this directory instead of the desktop trash
        #[arg(long, value_name = "DIR")]
        trash_dir: Option<PathBuf>,
    },

    /// Replace synced symlinks with real copies
    Unsync,

    /// Archive the export entries
    Export {
        /// Compression algorithm
        #[arg(short = 'C', long, value_enum)]
        compression: Option<CompressionArg>,
    },

    /// Restore the export entries from the archive
    Import {
        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,
    },

    /// Show the state of every sync entry
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the config template
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ForceArg {
    /// Local content replaces the sync copy
    Local,
    /// Sync content replaces the local copy
    Sync,
    #[value(hide = true)]
    Delete,
}

impl From<ForceArg> for ForceMode {
    fn from(arg: ForceArg) -> Self {
        match arg {
            ForceArg::Local => ForceMode::Local,
            ForceArg::Sync => ForceMode::Sync,
            ForceArg::Delete => ForceMode::Delete,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CompressionArg {
    Fpaq,
}

impl From<CompressionArg> for Algorithm {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::Fpaq => Algorithm::Fpaq,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logger::init_logger(cli.verbose) {
        eprintln!("Warning: Failed to initialize logger: {e}");
    }

    let config_path = cli.config.as_deref();

    let errored = match cli.command {
        Commands::Init { force } => {
            handlers::handle_init(config_path, force)?;
            false
        }
        Commands::Sync {
            location,
            force,
            trash_dir,
        } => {
            let config = handlers::load_config(config_path)?;
            let config = handlers::apply_location(config, location)?;
            let force = force.map(ForceMode::from).unwrap_or_default();
            handlers::handle_sync(&config, force, trash_dir)?.errored()
        }
        Commands::Unsync => {
            let config = handlers::load_config(config_path)?;
            handlers::handle_unsync(&config)?.errored()
        }
        Commands::Export { compression } => {
            let config = handlers::load_config(config_path)?;
            handlers::handle_export(&config, compression.map(Algorithm::from))?;
            false
        }
        Commands::Import { force } => {
            let config = handlers::load_config(config_path)?;
            handlers::handle_import(&config, force)?.errored()
        }
        Commands::Status { json } => {
            let config = handlers::load_config(config_path)?;
            handlers::handle_status(&config, json)?;
            false
        }
    };

    if errored {
        std::process::exit(1);
    }

    Ok(())
}
