//! Command handlers and the argument types they share.

pub mod config;
pub mod index;
pub mod matching;
pub mod models;
pub mod tag;
pub mod theme;

use clap::{Args, ValueEnum};
use vista_core::{Config, ExtractOptions, ScorerBackend};

/// Tag extraction flags shared by `tag` and `match`.
#[derive(Args, Debug, Clone, Default)]
pub struct ExtractArgs {
    /// Maximum number of tags to keep (defaults to `tagging.max_tags`)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Minimum confidence in [0, 1] (defaults to `tagging.min_confidence`)
    #[arg(short = 'c', long)]
    pub min_conf: Option<f32>,

    /// Scorer backend (defaults to `scorer.backend`)
    #[arg(short, long, value_enum)]
    pub backend: Option<Backend>,
}

impl ExtractArgs {
    /// Flags first, then config defaults.
    pub fn options(&self, config: &Config) -> anyhow::Result<ExtractOptions> {
        Ok(ExtractOptions::new(
            self.top_k.unwrap_or(config.tagging.max_tags),
            self.min_conf.unwrap_or(config.tagging.min_confidence),
        )?)
    }

    /// Apply the backend override to `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(backend) = self.backend {
            config.scorer.backend = backend.into();
        }
    }
}

/// Scorer backend choices on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// CLIP similarity over a fixed vocabulary
    Clip,
    /// WD14-style multi-label tagger
    Tagger,
    /// Remote inference endpoint
    Remote,
}

impl From<Backend> for ScorerBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Clip => ScorerBackend::Clip,
            Backend::Tagger => ScorerBackend::Tagger,
            Backend::Remote => ScorerBackend::Remote,
        }
    }
}

/// Supported output formats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Pretty-printed JSON on stdout
    Json,
}

/// Load the config file, validating it; errors are fatal for commands.
pub fn load_config() -> anyhow::Result<Config> {
    Ok(Config::load()?)
}

/// Convert a dialoguer result into `Ok(Some(value))` on success, `Ok(None)` on
/// interrupt (Ctrl+C / terminal disconnect), and `Err` for other I/O failures.
pub fn handle_interrupt<T>(result: dialoguer::Result<T>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(dialoguer::Error::IO(e)) if e.kind() == std::io::ErrorKind::Interrupted => Ok(None),
        Err(e) => Err(e.into()),
    }
}
