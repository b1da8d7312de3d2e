//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use svedb_core::{
    CatalogAggregator, CatalogRun, ProgressReporter, SegmentSummary, write_export,
};
use svedb_shared::{
    AppConfig, CrawlConfig, ExtractionStrategy, SegmentRegistry, init_config, load_config,
};
use svedb_storage::S3AssetStore;

/// Segment request selecting the whole catalog.
const ALL_SEGMENTS: &str = "all";

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// svedb: extract the card catalog into a JSON document.
#[derive(Parser)]
#[command(
    name = "svedb-extract",
    version,
    about = "Extract the card catalog, enrich it from detail pages, and mirror card images.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch, enrich and export the requested segments.
    Extract {
        /// Segment codes separated by ';' or ',' (e.g. "BP01;SD02"), or "all".
        #[arg(required_unless_present = "ci")]
        segments: Option<String>,

        /// Output file (defaults to the configured `extract.output`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Unattended mode: every segment, with image mirroring.
        #[arg(long)]
        ci: bool,

        /// Mirror card images to the configured bucket.
        #[arg(long)]
        mirror: bool,

        /// Detail page extraction strategy: structural or pattern.
        #[arg(long)]
        strategy: Option<ExtractionStrategy>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "svedb=info",
        1 => "svedb=debug",
        _ => "svedb=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Extract {
            segments,
            out,
            ci,
            mirror,
            strategy,
        } => {
            let options = ExtractOptions::resolve(segments, out, ci, mirror, strategy);
            cmd_extract(options).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Extract
// ---------------------------------------------------------------------------

/// Extract flags after applying CI mode.
#[derive(Debug, PartialEq, Eq)]
struct ExtractOptions {
    request: String,
    out: Option<PathBuf>,
    mirror: bool,
    strategy: Option<ExtractionStrategy>,
}

impl ExtractOptions {
    /// `--ci`, or a bare `ci` segment argument, means every segment plus mirroring.
    fn resolve(
        segments: Option<String>,
        out: Option<PathBuf>,
        ci: bool,
        mirror: bool,
        strategy: Option<ExtractionStrategy>,
    ) -> Self {
        let ci = ci
            || segments
                .as_deref()
                .is_some_and(|s| s.trim().eq_ignore_ascii_case("ci"));

        let request = if ci {
            ALL_SEGMENTS.to_string()
        } else {
            segments.unwrap_or_else(|| ALL_SEGMENTS.to_string())
        };

        Self {
            request,
            out,
            mirror: mirror || ci,
            strategy,
        }
    }
}

async fn cmd_extract(options: ExtractOptions) -> Result<()> {
    let mut config: AppConfig = load_config()?;
    if let Some(strategy) = options.strategy {
        config.extract.strategy = strategy;
    }

    let crawl = CrawlConfig::from(&config);
    let asset_base_url = crawl.asset_base_url.clone();
    let registry = match &config.extract.segments {
        Some(codes) => SegmentRegistry::new(codes),
        None => SegmentRegistry::default(),
    };

    let mut aggregator = CatalogAggregator::new(crawl, registry)?;

    if options.mirror {
        match config.mirror.credentials() {
            Some(credentials) => {
                info!(bucket = %config.mirror.bucket, "image mirroring enabled");
                let store = S3AssetStore::from_credentials(
                    config.mirror.bucket.clone(),
                    config.mirror.region.clone(),
                    credentials,
                );
                aggregator = aggregator.with_asset_store(Arc::new(store));
            }
            None => {
                warn!(
                    env = %config.mirror.secret_key_env,
                    "mirroring requested but no secret key is set, skipping"
                );
            }
        }
    }

    info!(
        request = %options.request,
        strategy = %config.extract.strategy,
        "extracting catalog"
    );

    let reporter = CliProgress::new();
    let run = aggregator.run(&options.request, &reporter).await?;

    let out = options
        .out
        .unwrap_or_else(|| PathBuf::from(&config.extract.output));
    let export = run.export(&asset_base_url);
    write_export(&out, &export)?;

    // Print summary
    println!();
    println!("  Extraction complete!");
    println!("  Segments: {}", run.segments.len());
    println!("  Records:  {}", run.records.len());
    println!("  Enriched: {}", run.metadata.len());
    println!("  Uploads:  {}", run.uploads);
    for failure in &run.failed_segments {
        println!("  Failed:   {} ({})", failure.segment, failure.error);
    }
    println!("  Output:   {}", out.display());
    println!("  Time:     {:.1}s", run.elapsed.as_secs_f64());
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn segment_fetched(&self, summary: &SegmentSummary) {
        self.spinner.set_message(format!(
            "Fetched {} ({} records, {} pages)",
            summary.segment, summary.records_added, summary.pages
        ));
    }

    fn record_enriched(&self, id: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Enriching [{current}/{total}] {id}"));
    }

    fn done(&self, _run: &CatalogRun) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ci_flag_selects_everything_and_mirrors() {
        let options = ExtractOptions::resolve(None, None, true, false, None);
        assert_eq!(options.request, "all");
        assert!(options.mirror);
    }

    #[test]
    fn bare_ci_argument_means_ci_mode() {
        let options = ExtractOptions::resolve(Some("CI".into()), None, false, false, None);
        assert_eq!(options.request, "all");
        assert!(options.mirror);
    }

    #[test]
    fn explicit_segments_pass_through() {
        let options = ExtractOptions::resolve(
            Some("BP01;SD02".into()),
            Some(PathBuf::from("out.json")),
            false,
            false,
            Some(ExtractionStrategy::Pattern),
        );
        assert_eq!(options.request, "BP01;SD02");
        assert!(!options.mirror);
        assert_eq!(options.strategy, Some(ExtractionStrategy::Pattern));
    }

    #[test]
    fn cli_parses_extract_flags() {
        let cli = Cli::try_parse_from([
            "svedb-extract",
            "extract",
            "bp01,bp02",
            "--out",
            "cards.json",
            "--strategy",
            "pattern",
            "--mirror",
        ])
        .unwrap();

        match cli.command {
            Command::Extract {
                segments,
                mirror,
                strategy,
                ..
            } => {
                assert_eq!(segments.as_deref(), Some("bp01,bp02"));
                assert!(mirror);
                assert_eq!(strategy, Some(ExtractionStrategy::Pattern));
            }
            Command::Config { .. } => panic!("expected extract"),
        }
    }

    #[test]
    fn segments_required_without_ci() {
        assert!(Cli::try_parse_from(["svedb-extract", "extract"]).is_err());
        assert!(Cli::try_parse_from(["svedb-extract", "extract", "--ci"]).is_ok());
    }
}
