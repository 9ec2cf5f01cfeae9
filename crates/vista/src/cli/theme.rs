//! Look of the interactive match session: prompt theme, result styling and
//! the session header.
//!
//! Results go to stdout. Warnings, failures and the header go to stderr.

use console::{style, Style};
use dialoguer::theme::ColorfulTheme;
use vista_core::Vista;

/// Prompt theme for the match menu and option inputs.
pub fn vista_theme() -> ColorfulTheme {
    ColorfulTheme {
        prompt_prefix: style("?".to_string()).for_stderr().green(),
        active_item_prefix: style("▸".to_string()).for_stderr().green(),
        active_item_style: Style::new().for_stderr().green(),
        values_style: Style::new().for_stderr().cyan(),
        ..ColorfulTheme::default()
    }
}

/// Styles for printed match results.
pub struct Palette {
    heading: Style,
    pub muted: Style,
    warning: Style,
    failure: Style,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            heading: Style::new().bold(),
            muted: Style::new().dim(),
            warning: Style::new().for_stderr().yellow(),
            failure: Style::new().for_stderr().red(),
        }
    }
}

impl Palette {
    /// Recoverable problem: the session carries on unchanged.
    pub fn warn(&self, message: impl AsRef<str>) {
        eprintln!("  {}", self.warning.apply_to(message.as_ref()));
    }

    /// A step failed outright.
    pub fn fail(&self, error: impl std::fmt::Display) {
        eprintln!("  {} {error}", self.failure.apply_to("✗"));
    }

    /// `Label: value` line on stdout.
    pub fn field(&self, label: &str, value: impl std::fmt::Display) {
        println!("{} {value}", self.heading.apply_to(label));
    }
}

/// Lines of the session header: what is being matched against and how.
fn header_lines(vista: &Vista) -> Vec<String> {
    vec![
        format!("Vista v{}", vista_core::VERSION),
        format!(
            "{} indexed images, {} scorer",
            vista.index().len(),
            vista.tagger().scorer_name()
        ),
        format!("images: {}", vista.resolver().root().display()),
    ]
}

/// Boxed header sized to its longest line.
fn boxed(lines: &[String]) -> Vec<String> {
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 4;
    let mut out = Vec::with_capacity(lines.len() + 2);
    out.push(format!("╔{:═<width$}╗", ""));
    for line in lines {
        out.push(format!("║  {line:<inner$}  ║", inner = width - 4));
    }
    out.push(format!("╚{:═<width$}╝", ""));
    out
}

/// Print the session header to stderr.
pub fn print_session_header(vista: &Vista) {
    let green = Style::new().for_stderr().green();
    eprintln!();
    for line in boxed(&header_lines(vista)) {
        eprintln!("  {}", green.apply_to(line));
    }
    eprintln!();
}
