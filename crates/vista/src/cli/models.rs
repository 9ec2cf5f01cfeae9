//! The `vista models` command for managing scorer models.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand, ValueEnum};
use vista_core::{Config, ScorerBackend, ScorerFactory};

/// Arguments for the `models` command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Subcommands for model management.
#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// Download model files for a local backend
    Download {
        /// Which model set to fetch (defaults to the configured backend)
        #[arg(value_enum)]
        which: Option<ModelSet>,
    },

    /// List installed models
    List,

    /// Show model directory path
    Path,
}

/// Downloadable model sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModelSet {
    /// CLIP ViT-B/32 visual + text encoders and tokenizer
    Clip,
    /// WD14 ConvNeXtV2 tagger and its label file
    Tagger,
    /// Both of the above
    All,
}

/// One file fetched from a Hugging Face repository.
struct ModelFile {
    remote_path: &'static str,
    local_name: &'static str,
}

const CLIP_REPO: &str = "Xenova/clip-vit-base-patch32";
const CLIP_FILES: &[ModelFile] = &[
    ModelFile {
        remote_path: "onnx/vision_model.onnx",
        local_name: "visual.onnx",
    },
    ModelFile {
        remote_path: "onnx/text_model.onnx",
        local_name: "text_model.onnx",
    },
    ModelFile {
        remote_path: "tokenizer.json",
        local_name: "tokenizer.json",
    },
];

const TAGGER_REPO: &str = "SmilingWolf/wd-v1-4-convnextv2-tagger-v2";
const TAGGER_FILES: &[ModelFile] = &[
    ModelFile {
        remote_path: "model.onnx",
        local_name: "model.onnx",
    },
    ModelFile {
        remote_path: "selected_tags.csv",
        local_name: "selected_tags.csv",
    },
];

/// Download URL for a file in a Hugging Face repository.
fn hf_url(repo: &str, remote_path: &str) -> String {
    format!("https://huggingface.co/{repo}/resolve/main/{remote_path}")
}

/// Where each model set lives and what it contains.
fn model_sets(config: &Config, which: ModelSet) -> Vec<(&'static str, &'static [ModelFile], PathBuf)> {
    let model_dir = config.model_dir();
    let clip = (CLIP_REPO, CLIP_FILES, model_dir.join(&config.scorer.clip.model));
    let tagger = (
        TAGGER_REPO,
        TAGGER_FILES,
        model_dir.join(&config.scorer.tagger.model),
    );
    match which {
        ModelSet::Clip => vec![clip],
        ModelSet::Tagger => vec![tagger],
        ModelSet::All => vec![clip, tagger],
    }
}

/// Execute the models command.
pub async fn execute(args: ModelsArgs) -> anyhow::Result<()> {
    let config = super::load_config()?;

    match args.command {
        ModelsCommand::Download { which } => {
            let which = match (which, config.scorer.backend) {
                (Some(which), _) => which,
                (None, ScorerBackend::Tagger) => ModelSet::Tagger,
                (None, ScorerBackend::Remote) => {
                    println!("The remote backend needs no local models.");
                    return Ok(());
                }
                (None, ScorerBackend::Clip) => ModelSet::Clip,
            };

            let client = reqwest::Client::new();
            for (repo, files, dir) in model_sets(&config, which) {
                download_set(&client, repo, files, &dir).await?;
            }
            tracing::info!("All downloads complete.");
        }

        ModelsCommand::List => {
            let model_dir = config.model_dir();
            println!("Installed models:");
            println!("  Directory: {}\n", model_dir.display());

            for (backend, which) in [
                (ScorerBackend::Clip, ModelSet::Clip),
                (ScorerBackend::Tagger, ModelSet::Tagger),
            ] {
                let default_marker = if backend == config.scorer.backend {
                    "  (active)"
                } else {
                    ""
                };
                let status = if ScorerFactory::model_exists(backend, &config) {
                    "ready"
                } else {
                    "not installed"
                };
                println!("  {backend}: {status}{default_marker}");

                for (_, files, dir) in model_sets(&config, which) {
                    for file in files {
                        let present = if dir.join(file.local_name).exists() {
                            "ready"
                        } else {
                            "missing"
                        };
                        println!("    - {:30} {}", file.local_name, present);
                    }
                }
            }

            if config.scorer.backend == ScorerBackend::Remote {
                println!("\n  remote: {} (active)", config.scorer.remote.endpoint);
            }
        }

        ModelsCommand::Path => {
            println!("{}", config.model_dir().display());
        }
    }

    Ok(())
}

/// Download every missing file of one model set into `dir`.
async fn download_set(
    client: &reqwest::Client,
    repo: &str,
    files: &[ModelFile],
    dir: &Path,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;

    for file in files {
        let dest = dir.join(file.local_name);
        if dest.exists() {
            tracing::info!("{} already exists at {:?}", file.local_name, dest);
            continue;
        }

        let url = hf_url(repo, file.remote_path);
        tracing::info!("Downloading {}...", file.local_name);
        tracing::info!("  Source: {}", url);
        tracing::info!("  Destination: {:?}", dest);
        download_file(client, &url, &dest).await?;
    }

    Ok(())
}

/// Download a file from a URL, streaming to disk with a progress bar.
///
/// Writes to a `.part` file first so an interrupted download is never
/// mistaken for a complete one.
async fn download_file(client: &reqwest::Client, url: &str, dest: &Path) -> anyhow::Result<()> {
    use futures_util::StreamExt;
    use indicatif::{ProgressBar, ProgressStyle};
    use tokio::io::AsyncWriteExt;

    let response = client
        .get(url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| anyhow::anyhow!("Download failed: {e}"))?;

    let pb = match response.content_length() {
        Some(total) => {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}")?
                    .progress_chars("##-"),
            );
            pb
        }
        None => ProgressBar::new_spinner(),
    };
    pb.set_message(
        dest.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );

    let part = dest.with_extension("part");
    let mut file = tokio::fs::File::create(&part).await?;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        pb.inc(chunk.len() as u64);
    }

    file.flush().await?;
    drop(file);
    tokio::fs::rename(&part, dest).await?;
    pb.finish_and_clear();

    let file_size = std::fs::metadata(dest)?.len();
    tracing::info!(
        "  Complete ({:.1} MB)",
        file_size as f64 / (1024.0 * 1024.0)
    );
    Ok(())
}
