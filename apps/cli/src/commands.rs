//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use opds_export_core::catalog::sheet_key;
use opds_export_core::pipeline::{ExportReport, ProgressReporter};
use opds_export_shared::{AppConfig, CONFIG_FILE_NAME, ExportConfig, init_config, load_config};
use opds_export_workbook::Workbook;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// opds-export: build a static OPDS catalog from a course spreadsheet.
#[derive(Parser)]
#[command(
    name = "opds-export",
    version,
    about = "Convert a course/lesson spreadsheet into OPDS-style JSON catalogs.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ./opds-export.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Defaults to `export` with the configured settings.
    #[command(subcommand)]
    pub command: Option<Command>,
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
    /// Export the workbook to the catalog tree.
    Export(ExportArgs),

    /// List the workbook's sheets, their keys and headers.
    Sheets {
        /// Workbook to inspect (defaults to the configured input).
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Overrides for a single export run.
#[derive(clap::Args, Default)]
pub(crate) struct ExportArgs {
    /// Workbook to read.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output root directory.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Base URL for links (must end with '/').
    #[arg(long)]
    pub base_url: Option<String>,

    /// Sheet to leave out (repeatable). Replaces the configured skip list.
    #[arg(long = "skip-sheet")]
    pub skip_sheets: Vec<String>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a config file with defaults.
    Init {
        /// Where to write it.
        #[arg(long, default_value = CONFIG_FILE_NAME)]
        path: PathBuf,
    },
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "opds_export=info",
        1 => "opds_export=debug",
        _ => "opds_export=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

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
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command.unwrap_or(Command::Export(ExportArgs::default())) {
        Command::Export(args) => cmd_export(config_path, args),
        Command::Sheets { input } => cmd_sheets(config_path, input.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init { path } => cmd_config_init(&path),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn cmd_export(config_path: Option<&Path>, args: ExportArgs) -> Result<()> {
    let mut app = load_config(config_path)?;

    if let Some(input) = args.input {
        app.export.input = input.to_string_lossy().into_owned();
    }
    if let Some(out) = args.out {
        app.export.output_dir = out.to_string_lossy().into_owned();
    }
    if let Some(base_url) = args.base_url {
        app.catalog.base_url = base_url;
    }
    if !args.skip_sheets.is_empty() {
        app.export.skip_sheets = args.skip_sheets;
    }

    let config = ExportConfig::try_from(&app)?;

    info!(
        input = %config.input.display(),
        output = %config.output_dir.display(),
        base_url = %config.base_url,
        "exporting catalog"
    );

    let reporter = CliProgress::new();
    let report = opds_export_core::pipeline::export(&config, &reporter)?;

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &ExportReport) {
    println!();
    println!("  Catalog generated successfully!");
    println!("  Output:  {}", report.output_dir.display());
    println!();
    for grade in &report.grades {
        println!(
            "  {:<24} {:>4} lessons  {:>4} skipped  -> grades/{}.json",
            grade.sheet,
            grade.lessons,
            grade.skipped.len(),
            grade.key
        );
    }
    println!();
    println!("  Grades:  {}", report.grades.len());
    println!("  Lessons: {}", report.lesson_count());
    println!("  Skipped: {}", report.skipped_count());
    println!("  Time:    {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

fn cmd_sheets(config_path: Option<&Path>, input: Option<&Path>) -> Result<()> {
    let app = load_config(config_path)?;
    let config = ExportConfig::try_from(&app)?;
    let path = input.unwrap_or(config.input.as_path());

    let mut workbook = Workbook::open(path)?;
    let names: Vec<String> = workbook.sheet_names().iter().map(|s| s.to_string()).collect();
    for name in &names {
        let status = if config.is_skipped(name) {
            "skipped"
        } else {
            "grade"
        };
        match workbook.load_sheet(name) {
            Ok(sheet) => {
                println!(
                    "{name} [{status}] key={} rows={}",
                    sheet_key(name),
                    sheet.row_count()
                );
                println!("    columns: {:?}", sheet.headers());
            }
            Err(e) => println!("{name} [{status}] key={} unreadable: {e}", sheet_key(name)),
        }
    }
    Ok(())
}

fn cmd_config_init(path: &Path) -> Result<()> {
    let path = init_config(path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config: AppConfig = load_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
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
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn sheet_started(&self, sheet: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Processing [{current}/{total}] {sheet}"));
    }

    fn lesson_written(&self, lesson_id: &str) {
        self.spinner.set_message(format!("Wrote lesson {lesson_id}"));
    }

    fn done(&self, _report: &ExportReport) {
        self.spinner.finish_and_clear();
    }
}
