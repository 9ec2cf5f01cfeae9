//! The `vista index` command for inspecting the reference index.

use std::collections::HashSet;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use vista_core::{Config, ImageDecoder, ImageResolver, IndexSource, TagIndex};

/// Arguments for the `index` command.
#[derive(Args, Debug)]
pub struct IndexArgs {
    #[command(subcommand)]
    pub command: IndexCommand,
}

/// Subcommands for index inspection.
#[derive(Subcommand, Debug)]
pub enum IndexCommand {
    /// Load the index and report rows, tags and missing image files
    Check {
        /// Index table (defaults to `index.path`)
        #[arg(long)]
        index: Option<PathBuf>,

        /// Directory the identifiers resolve against (defaults to `index.image_root`)
        #[arg(long)]
        images: Option<PathBuf>,
    },
}

/// Summary of an index and its image directory.
#[derive(Debug, Default, PartialEq)]
pub struct IndexReport {
    pub images: usize,
    pub distinct_tags: usize,
    pub untagged: Vec<String>,
    pub unresolvable: Vec<String>,
}

impl IndexReport {
    pub fn build(index: &TagIndex, resolver: &ImageResolver) -> Self {
        let distinct_tags: HashSet<&str> = index
            .iter()
            .flat_map(|(_, tags)| tags.iter().map(String::as_str))
            .collect();

        Self {
            images: index.len(),
            distinct_tags: distinct_tags.len(),
            untagged: index
                .iter()
                .filter(|(_, tags)| tags.is_empty())
                .map(|(id, _)| id.to_string())
                .collect(),
            unresolvable: index
                .image_ids()
                .filter(|id| !resolver.exists(id))
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Execute the index command.
pub async fn execute(args: IndexArgs) -> anyhow::Result<()> {
    let config = super::load_config()?;

    match args.command {
        IndexCommand::Check { index, images } => {
            let index_path = index.unwrap_or_else(|| config.index_path());
            let image_root = images.unwrap_or_else(|| config.image_root());
            check(&config, index_path, image_root)
        }
    }
}

fn check(config: &Config, index_path: PathBuf, image_root: PathBuf) -> anyhow::Result<()> {
    let index = IndexSource::from_config(&config.index).load(&index_path)?;
    let resolver = ImageResolver::new(&image_root, ImageDecoder::new(config.limits.clone()));
    let report = IndexReport::build(&index, &resolver);

    println!("Index:        {}", index_path.display());
    println!("Image root:   {}", image_root.display());
    println!("Images:       {}", report.images);
    println!("Distinct tags: {}", report.distinct_tags);

    if !report.untagged.is_empty() {
        println!("\nRows with no tags ({}):", report.untagged.len());
        for id in &report.untagged {
            println!("  - {id}");
        }
    }

    if !report.unresolvable.is_empty() {
        println!("\nMissing image files ({}):", report.unresolvable.len());
        for id in &report.unresolvable {
            println!("  - {id}");
        }
        tracing::warn!(
            "{} indexed images cannot be opened from {:?}",
            report.unresolvable.len(),
            image_root
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"not really a jpeg").unwrap();

        let index = IndexSource::default()
            .parse("image_name,tags\na.jpg,sky;sea\nb.jpg,sky\nc.jpg,\n../d.jpg,forest\n")
            .and_then(TagIndex::build)
            .unwrap();
        let resolver = ImageResolver::new(dir.path(), ImageDecoder::new(Default::default()));

        let report = IndexReport::build(&index, &resolver);
        assert_eq!(report.images, 4);
        assert_eq!(report.distinct_tags, 3);
        assert_eq!(report.untagged, vec!["c.jpg"]);
        assert_eq!(report.unresolvable, vec!["../d.jpg", "b.jpg", "c.jpg"]);
    }
}
