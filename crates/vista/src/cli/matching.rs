//! The `vista match` command: tag an image and pick a reference image that
//! shares at least one tag.
//!
//! With `--interactive` the session stays open so the user can redraw from
//! the same pool, swap the input image, or change the extraction options.
//! Repeating an evaluation whose pool is unchanged keeps the current pick.

use std::path::PathBuf;

use clap::Args;
use dialoguer::{Input, Select};
use vista_core::{Config, ExtractOptions, MatchOutcome, MatchSession, TagReport, Vista};

use super::theme::{print_session_header, vista_theme, Palette};
use super::{ExtractArgs, OutputFormat};

/// Arguments for the `match` command.
#[derive(Args, Debug)]
pub struct MatchArgs {
    /// Input image to match
    #[arg(required = true)]
    pub image: PathBuf,

    /// Index table (defaults to `index.path`)
    #[arg(long)]
    pub index: Option<PathBuf>,

    /// Directory the index identifiers resolve against (defaults to `index.image_root`)
    #[arg(long)]
    pub images: Option<PathBuf>,

    #[command(flatten)]
    pub extract: ExtractArgs,

    /// Keep the session open: redraw, swap images, adjust options
    #[arg(short, long)]
    pub interactive: bool,

    /// Seed the random draw (reproducible selections)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output format (non-interactive only)
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl MatchArgs {
    /// Apply path and backend overrides to `config`.
    fn apply(&self, config: &mut Config) {
        if let Some(index) = &self.index {
            config.index.path = index.to_string_lossy().into_owned();
        }
        if let Some(images) = &self.images {
            config.index.image_root = images.to_string_lossy().into_owned();
        }
        self.extract.apply(config);
    }
}

/// Execute the match command.
pub async fn execute(args: MatchArgs) -> anyhow::Result<()> {
    let mut config = super::load_config()?;
    args.apply(&mut config);
    let options = args.extract.options(&config)?;

    let vista = Vista::new(config)?;
    tracing::info!(
        "Matching against {} indexed images ({} scorer)",
        vista.index().len(),
        vista.tagger().scorer_name()
    );

    let mut session = match args.seed {
        Some(seed) => MatchSession::with_seed(seed),
        None => MatchSession::new(),
    };

    if args.interactive {
        return run_interactive(&vista, &mut session, args.image, options).await;
    }

    let (report, outcome) = vista
        .match_path(&mut session, &args.image, &options, false)
        .await?;

    match args.format {
        OutputFormat::Json => {
            let value = outcome_json(&vista, &report, &outcome).await;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => print_outcome(&vista, &report, &outcome).await,
    }
    Ok(())
}

/// JSON document for one evaluation.
///
/// The selected image is opened so an unreadable candidate shows up as
/// `image_error` rather than a path that cannot be used. The outcome is
/// reported unchanged either way.
async fn outcome_json(vista: &Vista, report: &TagReport, outcome: &MatchOutcome) -> serde_json::Value {
    let mut value = serde_json::json!({
        "input": report,
        "outcome": outcome,
        "image_path": null,
    });

    if let Some(selected) = outcome.selected() {
        match vista.open_selected(selected).await {
            Ok(_) => {
                value["image_path"] = serde_json::json!(vista.resolver().resolve(selected).ok());
            }
            Err(e) => {
                tracing::warn!("Selected image could not be opened: {e}");
                Palette::default().warn(format!("Could not open {selected}; selection kept."));
                value["image_error"] = serde_json::json!(e.to_string());
            }
        }
    }

    value
}

/// Interactive menu entries, in display order.
const MENU_ITEMS: &[&str] = &[
    "Reset random match",
    "New image",
    "Adjust threshold / top-k",
    "Quit",
];

/// Menu-driven session over one `MatchSession`.
async fn run_interactive(
    vista: &Vista,
    session: &mut MatchSession,
    mut image: PathBuf,
    mut options: ExtractOptions,
) -> anyhow::Result<()> {
    print_session_header(vista);
    let theme = vista_theme();
    let palette = Palette::default();

    let mut current = evaluate(vista, session, &image, &options).await;

    loop {
        let selection = Select::with_theme(&theme)
            .with_prompt("What next?")
            .items(MENU_ITEMS)
            .default(0)
            .interact_opt()?;

        match selection {
            Some(0) => {
                let Some(report) = &current else {
                    palette.warn("No tags to match yet. Load an image first.");
                    continue;
                };
                match vista.rematch(session, &report.tags, true) {
                    Ok(outcome) => print_outcome(vista, report, &outcome).await,
                    Err(e) => palette.warn(format!("Match failed: {e}")),
                }
            }
            Some(1) => {
                let Some(raw) = super::handle_interrupt(
                    Input::<String>::with_theme(&theme)
                        .with_prompt("Path to image")
                        .interact_text(),
                )?
                else {
                    continue;
                };
                let next = PathBuf::from(shellexpand::tilde(&raw).into_owned());
                if let Some(report) = evaluate(vista, session, &next, &options).await {
                    image = next;
                    current = Some(report);
                }
            }
            Some(2) => {
                let Some(next) = prompt_options(&options)? else {
                    continue;
                };
                if let Some(report) = evaluate(vista, session, &image, &next).await {
                    options = next;
                    current = Some(report);
                }
            }
            Some(3) | None => break,
            _ => unreachable!(),
        }
    }

    Ok(())
}

/// Tag `image` and advance the session, printing the result.
///
/// Errors are shown and leave the session and the current tags as they were.
async fn evaluate(
    vista: &Vista,
    session: &mut MatchSession,
    image: &std::path::Path,
    options: &ExtractOptions,
) -> Option<TagReport> {
    match vista.match_path(session, image, options, false).await {
        Ok((report, outcome)) => {
            print_outcome(vista, &report, &outcome).await;
            Some(report)
        }
        Err(e) => {
            Palette::default().fail(e);
            None
        }
    }
}

/// Ask for new extraction options, re-prompting on out-of-range values.
fn prompt_options(current: &ExtractOptions) -> anyhow::Result<Option<ExtractOptions>> {
    let theme = vista_theme();

    let Some(min_conf) = super::handle_interrupt(
        Input::<f32>::with_theme(&theme)
            .with_prompt("Minimum confidence (0-1)")
            .default(current.min_confidence())
            .validate_with(|v: &f32| {
                if (0.0..=1.0).contains(v) {
                    Ok(())
                } else {
                    Err("must be between 0 and 1")
                }
            })
            .interact_text(),
    )?
    else {
        return Ok(None);
    };

    let Some(top_k) = super::handle_interrupt(
        Input::<usize>::with_theme(&theme)
            .with_prompt("Maximum tags")
            .default(current.top_k())
            .validate_with(|v: &usize| if *v >= 1 { Ok(()) } else { Err("must be at least 1") })
            .interact_text(),
    )?
    else {
        return Ok(None);
    };

    Ok(Some(ExtractOptions::new(top_k, min_conf)?))
}

/// Print the outcome for a person to read.
///
/// A selected image that cannot be opened is reported but does not undo the
/// selection.
async fn print_outcome(vista: &Vista, report: &TagReport, outcome: &MatchOutcome) {
    let palette = Palette::default();

    println!();
    palette.field("Image:", report.file_path.display());
    if !report.tags.is_empty() {
        let tags: Vec<String> = report
            .tags
            .tags()
            .iter()
            .map(|t| format!("{} ({:.2})", t.label, t.confidence))
            .collect();
        palette.field("Tags:", tags.join(", "));
    }

    if let Some(message) = outcome.empty_message() {
        println!("{message}");
        return;
    }

    if let MatchOutcome::Matched {
        selected,
        pool_size,
        matched_tags,
        ..
    } = outcome
    {
        palette.field(
            "Match:",
            format!("{selected} {}", palette.muted.apply_to(format!("(1 of {pool_size})"))),
        );
        palette.field("Shared tags:", matched_tags.join(", "));

        match vista.open_selected(selected).await {
            Ok(image) => {
                if let Ok(path) = vista.resolver().resolve(selected) {
                    palette.field(
                        "File:",
                        format!(
                            "{} {}",
                            path.display(),
                            palette.muted.apply_to(format!("({}x{})", image.width, image.height))
                        ),
                    );
                }
            }
            Err(e) => {
                tracing::warn!("Selected image could not be opened: {e}");
                palette.warn(format!("Could not open {selected}; selection kept."));
            }
        }
    }
}
