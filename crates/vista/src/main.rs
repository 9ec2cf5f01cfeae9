//! Vista CLI - scenic tag extraction and tag-overlap image matching.
//!
//! Vista reports the scenic labels a vision model sees in a photo and picks a
//! reference image from an index that shares at least one of them.
//!
//! # Usage
//!
//! ```bash
//! # Tag a single image
//! vista tag photo.jpg --top-k 5 --min-conf 0.25
//!
//! # Match against the configured index
//! vista match photo.jpg --index data/image-tag.csv --images data/images
//!
//! # Keep a session open (reset random match, new image, adjust options)
//! vista match photo.jpg --interactive
//!
//! # Manage models
//! vista models download
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Vista - scenic tag extraction and tag-overlap image matching.
#[derive(Parser, Debug)]
#[command(name = "vista")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Report the scenic tags of an image
    Tag(cli::tag::TagArgs),

    /// Tag an image and pick a reference image sharing its tags
    Match(cli::matching::MatchArgs),

    /// Inspect the reference index
    Index(cli::index::IndexArgs),

    /// Manage scorer models (download, list, etc.)
    Models(cli::models::ModelsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match vista_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default logging settings. Check your config file with `vista config path`."
            );
            vista_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Vista v{}", vista_core::VERSION);

    match cli.command {
        Commands::Tag(args) => cli::tag::execute(args).await,
        Commands::Match(args) => cli::matching::execute(args).await,
        Commands::Index(args) => cli::index::execute(args).await,
        Commands::Models(args) => cli::models::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
