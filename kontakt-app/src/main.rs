use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Parser;
use kontakt_common::OutputFormat;
use kontakt_common::observability::{LogConfig, LogFormat, init_logging};
use kontakt_config::KontaktConfig;
use kontakt_drivers::kontakt_browser::KontaktDriver;
use kontakt_forms::{ApplicantRecord, heuristic};
use kontakt_web::{ListingSelectors, PageFetcher, extract_listings, extract_site_info};
use tracing::{info, warn};

use cli::{ApplyArgs, Cli, Command, InspectArgs, JobsArgs, LogEncoding, SiteInfoArgs};

mod cli;
mod export;
mod wiring;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins)
    let cfg = wiring::load_config(cli.config.as_deref())?;

    let log_path = init_logging(LogConfig {
        emit_stderr: cli.verbose,
        format: match cli.log_format {
            LogEncoding::Text => LogFormat::Text,
            LogEncoding::Json => LogFormat::Json,
        },
        ..LogConfig::default()
    })?;
    info!(log = %log_path.display(), "kontakt starting");

    match cli.command {
        Command::Apply(args) => apply(&cfg, args).await,
        Command::Inspect(args) => inspect(&cfg, args).await,
        Command::Jobs(args) => jobs(args).await,
        Command::SiteInfo(args) => site_info(args).await,
    }
}

async fn apply(cfg: &KontaktConfig, args: ApplyArgs) -> Result<()> {
    let urls = collect_urls(&args)?;
    if urls.is_empty() {
        bail!("no URLs given");
    }
    let record = ApplicantRecord::from_profile(&cfg.applicant);
    if record.is_empty() {
        bail!("applicant section is empty; nothing to fill");
    }

    let pipeline = wiring::build_pipeline(cfg, args.submit_override(), !args.no_oracle).await?;
    let options = wiring::browser_options(&cfg.browser)?;
    let driver = KontaktDriver::connect(&options).await?;
    let page = driver.page();

    let report = pipeline.run_batch(&page, &urls, &record).await;

    if let Err(e) = driver.close().await {
        warn!(error = %e, "closing browser session failed");
    }

    let format = args.format.map(OutputFormat::from).unwrap_or(cfg.output.format);
    match args.out.as_deref().or(cfg.output.dir.as_deref()) {
        Some(dir) => {
            let path = export::write_batch(&report, dir, format)?;
            println!("report written to {}", path.display());
        }
        None => println!("{}", export::render_batch(&report, format)?),
    }
    eprintln!(
        "{} of {} pages filled, {} submitted",
        report.succeeded(),
        report.reports.len(),
        report.submitted()
    );
    Ok(())
}

async fn inspect(cfg: &KontaktConfig, args: InspectArgs) -> Result<()> {
    let vocabulary = wiring::vocabulary(&cfg.matching)?;
    let doc = PageFetcher::new()?.load(&args.source).await?;
    let mapping = heuristic::match_document(&doc.html, &vocabulary)
        .with_context(|| format!("matching {}", doc.url))?;
    println!("{}", export::render(&mapping, args.format.into())?);
    Ok(())
}

async fn jobs(args: JobsArgs) -> Result<()> {
    let mut selectors = ListingSelectors::default();
    if let Some(css) = args.card {
        selectors = selectors.prefer_card(css);
    }
    if let Some(css) = args.title {
        selectors = selectors.prefer_title(css);
    }
    if let Some(css) = args.company {
        selectors = selectors.prefer_company(css);
    }
    if let Some(css) = args.location {
        selectors = selectors.prefer_location(css);
    }

    let fetcher = PageFetcher::new()?;
    let mut listings = Vec::new();
    for url in &args.urls {
        match fetcher.fetch(url).await {
            Ok(doc) => {
                let found = extract_listings(&doc.html, &doc.url, &selectors, Utc::now());
                info!(%url, count = found.len(), "listings extracted");
                listings.extend(found);
            }
            Err(e) => warn!(%url, error = %e, "skipping page"),
        }
    }

    let format = OutputFormat::from(args.format);
    let rendered = match format {
        OutputFormat::Csv => export::render_csv(&listings)?,
        _ => export::render(&listings, format)?,
    };
    match args.out {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("{} listings written to {}", listings.len(), path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

async fn site_info(args: SiteInfoArgs) -> Result<()> {
    let doc = PageFetcher::new()?.fetch(&args.url).await?;
    let info = extract_site_info(&doc.html, doc.url.as_str(), args.keyword.as_deref());
    println!("{}", export::render(&info, OutputFormat::Json)?);
    Ok(())
}

fn collect_urls(args: &ApplyArgs) -> Result<Vec<String>> {
    let mut urls = args.urls.clone();
    if let Some(path) = &args.urls_file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        urls.extend(parse_url_list(&text));
    }
    Ok(urls)
}

fn parse_url_list(text: &str) -> impl Iterator<Item = String> + '_ {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(String::from)
}
