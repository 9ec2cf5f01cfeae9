//! The `vista config` command.
//!
//! `show` prints where the configured paths actually resolve before the TOML
//! itself, since `~` and relative paths are easy to misread. `init` writes a
//! starter file with the index section documented.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use vista_core::{Config, ScorerFactory};

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show resolved paths and the current configuration
    Show,

    /// Show config file path
    Path,

    /// Write a starter config file
    Init {
        /// Index table to record in `[index]`
        #[arg(long)]
        index: Option<PathBuf>,

        /// Image directory to record in `[index]`
        #[arg(long)]
        images: Option<PathBuf>,

        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Notes placed above `[index]` in a fresh config file.
const INDEX_NOTES: &str = "\
# Reference index: a CSV table with a header row.
# `id_column` names each image relative to `image_root`;
# `tags_column` holds its tags separated by `;`.
# Check it with `vista index check`.
";

/// Execute the config command.
pub async fn execute(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = Config::load()?;
            for line in resolved_summary(&config) {
                println!("# {line}");
            }
            println!();
            println!("{}", config.to_toml()?);
        }

        ConfigCommand::Path => {
            let path = Config::default_path();
            if path.exists() {
                println!("{}", path.display());
            } else {
                println!("{} (not created yet; run `vista config init`)", path.display());
            }
        }

        ConfigCommand::Init {
            index,
            images,
            force,
        } => {
            let path = Config::default_path();
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at: {}\nUse --force to overwrite.",
                    path.display()
                );
            }

            let mut config = Config::default();
            if let Some(index) = index {
                config.index.path = index.to_string_lossy().into_owned();
            }
            if let Some(images) = images {
                config.index.image_root = images.to_string_lossy().into_owned();
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, starter_file(&config)?)?;

            tracing::info!("Config file created at: {}", path.display());
            println!("Configuration initialized at: {}", path.display());
            if !config.index_path().exists() {
                println!(
                    "Note: index table {} does not exist yet.",
                    config.index_path().display()
                );
            }
        }
    }

    Ok(())
}

/// Resolved locations and scorer readiness, one line each.
fn resolved_summary(config: &Config) -> Vec<String> {
    let backend = config.scorer.backend;
    let readiness = if ScorerFactory::model_exists(backend, config) {
        "ready"
    } else {
        "models missing; run `vista models download`"
    };
    vec![
        format!("scorer:     {backend} ({readiness})"),
        format!("model_dir:  {}", config.model_dir().display()),
        format!("index:      {}", config.index_path().display()),
        format!("image_root: {}", config.image_root().display()),
    ]
}

/// TOML for `config`, with the index section documented.
fn starter_file(config: &Config) -> anyhow::Result<String> {
    let toml = config.to_toml()?;
    Ok(match toml.find("[index]") {
        Some(at) => format!("{}{INDEX_NOTES}{}", &toml[..at], &toml[at..]),
        None => format!("{toml}\n{INDEX_NOTES}"),
    })
}
