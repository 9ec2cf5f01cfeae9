//! The `vista tag` command: report the scenic tags of one image.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use vista_core::{ImageTagger, MatchOutcome, ScorerFactory, TagReport};

use super::{ExtractArgs, OutputFormat};

/// Arguments for the `tag` command.
#[derive(Args, Debug)]
pub struct TagArgs {
    /// Image file to tag
    #[arg(required = true)]
    pub image: PathBuf,

    #[command(flatten)]
    pub extract: ExtractArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Execute the tag command.
pub async fn execute(args: TagArgs) -> anyhow::Result<()> {
    let mut config = super::load_config()?;
    args.extract.apply(&mut config);
    let options = args.extract.options(&config)?;

    let scorer = ScorerFactory::create(&config)?;
    let tagger = ImageTagger::new(&config, Arc::from(scorer));
    let report = tagger.tag_path(&args.image, &options).await?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print!("{}", render_text(&report)),
    }
    Ok(())
}

/// Plain-text rendering: one `label  confidence` line per tag.
pub fn render_text(report: &TagReport) -> String {
    if report.tags.is_empty() {
        let message = MatchOutcome::NoTags.empty_message().unwrap_or_default();
        return format!("{message}\n");
    }

    let width = report
        .tags
        .labels()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0);
    report
        .tags
        .tags()
        .iter()
        .map(|t| format!("{:width$}  {:.3}\n", t.label, t.confidence, width = width))
        .collect()
}
