//! CLI command definitions, routing, and tracing setup.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arxivdigest_core::{AggregateResult, ProgressReporter, aggregate};
use arxivdigest_fetcher::HttpFetcher;
use arxivdigest_shared::{
    AppConfig, Category, DigestConfig, EmittedRecord, config_file_path, init_config, load_config,
};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// arxivdigest — one ordered feed of new submissions across categories.
#[derive(Parser)]
#[command(
    name = "arxivdigest",
    version,
    about = "Aggregate per-category new-submission listings into one ordered, deduplicated feed.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
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

/// Record output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// One JSON object per line.
    Jsonl,
    /// A single JSON array.
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Crawl the configured categories and write the ordered records.
    Run {
        /// Comma-separated category codes (overrides config and $CATEGORIES).
        #[arg(short, long)]
        categories: Option<String>,

        /// Repository origin (defaults to the configured base_url).
        #[arg(long)]
        base_url: Option<String>,

        /// Maximum concurrent detail-page fetches.
        #[arg(long)]
        concurrency: Option<usize>,

        /// Output format.
        #[arg(short, long, value_enum, default_value = "jsonl")]
        format: OutputFormat,

        /// Write records to this file instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
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

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries records.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "arxivdigest=info",
        1 => "arxivdigest=debug",
        _ => "arxivdigest=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
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
        Command::Run {
            categories,
            base_url,
            concurrency,
            format,
            out,
        } => {
            cmd_run(
                categories.as_deref(),
                base_url,
                concurrency,
                format,
                out.as_deref(),
            )
            .await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Load config, apply `$CATEGORIES`, then CLI overrides.
fn resolve_config(
    categories: Option<&str>,
    base_url: Option<String>,
    concurrency: Option<usize>,
) -> Result<AppConfig> {
    let mut config = load_config()?
        .with_env()
        .with_categories_override(categories);
    if let Some(url) = base_url {
        config.crawl.base_url = url;
    }
    if let Some(n) = concurrency {
        config.crawl.concurrency = n;
    }
    Ok(config)
}

async fn cmd_run(
    categories: Option<&str>,
    base_url: Option<String>,
    concurrency: Option<usize>,
    format: OutputFormat,
    out: Option<&Path>,
) -> Result<()> {
    let app_config = resolve_config(categories, base_url, concurrency)?;
    let digest_config = DigestConfig::try_from(&app_config)?;

    let codes: Vec<&str> = digest_config.categories.iter().map(|c| c.code.as_str()).collect();
    info!(
        categories = ?codes,
        base_url = %digest_config.base_url,
        "running digest"
    );

    let fetcher = Arc::new(HttpFetcher::new(digest_config.timeout_secs)?);
    let reporter = CliProgress::new();
    let result = aggregate(fetcher, &digest_config, &reporter).await?;
    reporter.spinner.finish_and_clear();

    match out {
        Some(path) => {
            let file = std::fs::File::create(path)
                .map_err(|e| eyre!("cannot create {}: {e}", path.display()))?;
            let mut writer = std::io::BufWriter::new(file);
            write_records(&mut writer, &result.records, format)?;
            writer.flush()?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            write_records(&mut writer, &result.records, format)?;
            writer.flush()?;
        }
    }

    print_summary(&result);
    Ok(())
}

/// Serialize records in the requested format.
fn write_records(
    writer: &mut impl Write,
    records: &[EmittedRecord],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Jsonl => {
            for record in records {
                serde_json::to_writer(&mut *writer, record)?;
                writeln!(writer)?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, records)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

fn print_summary(result: &AggregateResult) {
    eprintln!();
    eprintln!("  Records:     {}", result.records.len());
    eprintln!("  Categories:  {}", result.categories_visited);
    eprintln!("  Duplicates:  {}", result.duplicates_skipped);
    if !result.errors.is_empty() {
        eprintln!("  Failed listings:");
        for (url, error) in &result.errors {
            eprintln!("    {url}: {error}");
        }
    }
    eprintln!("  Time:        {:.1}s", result.elapsed.as_secs_f64());
    eprintln!();
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = resolve_config(None, None, None)?;
    let path = config_file_path()?;
    println!("# {}", path.display());
    println!("{}", toml::to_string_pretty(&config)?);

    let digest = DigestConfig::try_from(&config)?;
    println!("# visit order");
    for category in &digest.categories {
        println!("#   {} (priority {})", category.code, category.priority);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner on stderr.
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

    fn listing_parsed(&self, category: &Category, admitted: usize, duplicates: usize) {
        self.spinner.println(format!(
            "  {category}: {admitted} entries ({duplicates} already seen)"
        ));
    }

    fn record_resolved(&self, identifier: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Resolving [{current}/{total}] {identifier}"));
    }

    fn batch_released(&self, category: &Category, batch: &[EmittedRecord]) {
        self.spinner
            .println(format!("  {category}: released {} records", batch.len()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arxivdigest_shared::DEFAULT_REVISION;

    fn sample() -> Vec<EmittedRecord> {
        vec![
            EmittedRecord {
                identifier: "2401.00010".into(),
                section: "new".into(),
                abstract_url: "https://arxiv.org/abs/2401.00010".into(),
                document_url: "https://arxiv.org/pdf/2401.00010".into(),
                declared_categories: vec!["math.QA".into()],
                revision: "v3".into(),
            },
            EmittedRecord {
                identifier: "2401.00002".into(),
                section: "cross".into(),
                abstract_url: "https://arxiv.org/abs/2401.00002".into(),
                document_url: "https://arxiv.org/pdf/2401.00002".into(),
                declared_categories: Vec::new(),
                revision: DEFAULT_REVISION.into(),
            },
        ]
    }

    #[test]
    fn jsonl_writes_one_object_per_line() {
        let mut buf = Vec::new();
        write_records(&mut buf, &sample(), OutputFormat::Jsonl).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: EmittedRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.identifier, "2401.00010");
    }

    #[test]
    fn json_writes_array() {
        let mut buf = Vec::new();
        write_records(&mut buf, &sample(), OutputFormat::Json).unwrap();
        let parsed: Vec<EmittedRecord> = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "arxivdigest",
            "-vv",
            "run",
            "--categories",
            "math.RT,math.QA",
            "--format",
            "json",
            "--concurrency",
            "8",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Run {
                categories,
                format,
                concurrency,
                out,
                ..
            } => {
                assert_eq!(categories.as_deref(), Some("math.RT,math.QA"));
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(concurrency, Some(8));
                assert!(out.is_none());
            }
            Command::Config { .. } => panic!("expected run"),
        }
    }
}
