mod auth;
mod config;
mod executor;
mod http;
mod logging;
mod migrate;
mod model;
mod paginator;
mod planner;
mod ports;
mod progress;
mod report;
mod selection;
mod source;
mod spotify_rs;
mod tidal_rs;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::{Result, eyre::Context};

use crate::{
    config::Config,
    logging::setup_logging,
    migrate::MigrateOptions,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "LIBRARY_MIGRATOR_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Console log level (default: off)
    #[arg(long, default_value = "off", global = true, env = "LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// File log level (default: debug)
    #[arg(long, default_value = "debug", global = true)]
    log_file_level: log::LevelFilter,

    /// Path to log file
    #[arg(long, env = "LIBRARY_MIGRATOR_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy playlists and liked tracks from Spotify to Tidal
    Migrate {
        /// Migrate the playlist with this name (repeatable)
        #[arg(short, long = "playlist", value_name = "NAME")]
        playlists: Vec<String>,

        /// Migrate every playlist
        #[arg(long, conflicts_with = "playlists")]
        all_playlists: bool,

        /// Migrate liked tracks as Tidal favorites
        #[arg(long)]
        liked: bool,

        /// Number of playlists migrated at the same time
        #[arg(long, value_parser = positive)]
        concurrency: Option<usize>,

        /// Don't draw progress bars
        #[arg(long)]
        no_progress: bool,
    },
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    setup_logging(args.log_level, args.log_file.clone(), args.log_file_level)?;

    log::debug!("Library migrator starting");

    match args.command {
        Commands::Migrate {
            playlists,
            all_playlists,
            liked,
            concurrency,
            no_progress,
        } => {
            log::debug!("Loading configuration");
            let config = Config::load(args.config.as_deref())
                .with_context(|| "Failed to load library-migrator config")?;

            migrate::run(
                &config,
                MigrateOptions {
                    playlists,
                    all_playlists,
                    liked,
                    concurrency,
                    progress: !no_progress,
                },
            )
            .await?;
        }
        Commands::Config(config_commands) => match config_commands {
            ConfigCommands::CreateDefault => {
                log::debug!("Creating default config");
                let path = match args.config {
                    Some(path) => {
                        Config::create_default_at(&path)?;
                        path
                    }
                    None => Config::create_default()?,
                };
                println!("Config file at {}", path.display());
            }
            ConfigCommands::Path => match args.config.or_else(Config::config_path) {
                Some(path) => println!("{}", path.display()),
                None => println!("No default config path found"),
            },
        },
    }

    Ok(())
}
