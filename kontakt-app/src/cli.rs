use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use kontakt_common::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "kontakt", version, about = "Find contact forms and fill them with applicant data")]
pub struct Cli {
    /// Configuration file; defaults to ./kontakt.yaml and the user config dir.
    #[arg(long, short, global = true, env = "KONTAKT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Mirror log events to stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, value_enum, default_value_t = LogEncoding::Text)]
    pub log_format: LogEncoding,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogEncoding {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Yaml,
    Csv,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Json => OutputFormat::Json,
            Format::Yaml => OutputFormat::Yaml,
            Format::Csv => OutputFormat::Csv,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Visit each URL in a browser, fill its contact form and optionally submit.
    Apply(ApplyArgs),
    /// Run the heuristic matcher over a saved page or a URL fetched without a browser.
    Inspect(InspectArgs),
    /// Scrape job listings from career pages.
    Jobs(JobsArgs),
    /// Summarise a site: title, description, headline, phone number.
    SiteInfo(SiteInfoArgs),
}

#[derive(Debug, clap::Args)]
pub struct ApplyArgs {
    pub urls: Vec<String>,

    /// File with one URL per line; `#` starts a comment.
    #[arg(long)]
    pub urls_file: Option<PathBuf>,

    /// Submit after filling. Overrides `run.submit`.
    #[arg(long, conflicts_with = "preview")]
    pub submit: bool,

    /// Fill only. Overrides `run.submit`.
    #[arg(long)]
    pub preview: bool,

    /// Skip the language-model matcher even when configured.
    #[arg(long)]
    pub no_oracle: bool,

    /// Directory for the batch report. Overrides `output.dir`.
    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub format: Option<Format>,
}

impl ApplyArgs {
    /// `Some(true)` / `Some(false)` when a flag forces the mode.
    pub fn submit_override(&self) -> Option<bool> {
        match (self.submit, self.preview) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Debug, clap::Args)]
pub struct InspectArgs {
    /// Path to an HTML file, or an http(s) URL.
    pub source: String,

    #[arg(long, value_enum, default_value_t = Format::Json)]
    pub format: Format,
}

#[derive(Debug, clap::Args)]
pub struct JobsArgs {
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Card selector tried before the built-in candidates.
    #[arg(long)]
    pub card: Option<String>,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub company: Option<String>,
    #[arg(long)]
    pub location: Option<String>,

    /// Output file; stdout when absent.
    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Format::Json)]
    pub format: Format,
}

#[derive(Debug, clap::Args)]
pub struct SiteInfoArgs {
    pub url: String,

    /// Report the lines mentioning this word.
    #[arg(long)]
    pub keyword: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn apply_flags_override_submit() {
        let cli = Cli::parse_from(["kontakt", "apply", "https://a.example", "--preview"]);
        let Command::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(args.urls, vec!["https://a.example".to_string()]);
        assert_eq!(args.submit_override(), Some(false));
    }

    #[test]
    fn submit_and_preview_conflict() {
        let parsed = Cli::try_parse_from(["kontakt", "apply", "--submit", "--preview"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn jobs_takes_selector_hints() {
        let cli = Cli::parse_from([
            "kontakt",
            "jobs",
            "https://karriere.example",
            "--card",
            ".offer",
            "--format",
            "csv",
        ]);
        let Command::Jobs(args) = cli.command else {
            panic!("expected jobs");
        };
        assert_eq!(args.card.as_deref(), Some(".offer"));
        assert_eq!(args.format, Format::Csv);
    }
}
