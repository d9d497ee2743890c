//! Command-line front end: fill a template from an order file.
//!
//! Usage:
//!   sizegrid orders.csv                      # writes orders_FILLED.xlsx
//!   sizegrid orders.xlsx -t template.xlsx -o out.xlsx --write-zeros
//!   sizegrid orders.tsv --report json        # machine-readable summary on stdout

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use sizegrid::{fill_template, load_config, read_input, CapacityPolicy, FillReport};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "sizegrid",
    version,
    about = "Fill a size-grid order template from item/size/qty data."
)]
struct Cli {
    /// Input file (.xlsx, .csv or .tsv) with columns index, size, qty
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Template workbook (overrides the configured path)
    #[arg(short = 't', long = "template", value_name = "XLSX")]
    template: Option<PathBuf>,

    /// Configuration file (default: sizegrid.toml next to the executable)
    #[arg(short = 'c', long = "config", value_name = "TOML")]
    config: Option<PathBuf>,

    /// Output path (default: <input stem>_FILLED.xlsx beside the input)
    #[arg(short = 'o', long = "output", value_name = "XLSX")]
    output: Option<PathBuf>,

    /// Write 0 into size cells whose quantity is zero
    #[arg(long = "write-zeros")]
    write_zeros: bool,

    /// First data row, counted from the header row (1 = directly below)
    #[arg(long = "start-offset", value_name = "N")]
    start_offset: Option<u32>,

    /// Fail instead of appending rows when the template is too short
    #[arg(long = "strict-capacity")]
    strict_capacity: bool,

    /// Target sheet name (default: the workbook's active sheet)
    #[arg(long = "sheet", value_name = "NAME")]
    sheet: Option<String>,

    /// Summary format printed after a successful run
    #[arg(long = "report", value_enum, default_value_t = ReportFormat::Text)]
    report: ReportFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref()).context("loading configuration")?;
    if cli.write_zeros {
        config.write_zeros = true;
    }
    if let Some(offset) = cli.start_offset {
        config.start_offset = offset;
    }
    if cli.strict_capacity {
        config.capacity = CapacityPolicy::Strict;
    }
    if cli.sheet.is_some() {
        config.sheet.clone_from(&cli.sheet);
    }

    let template_path = config
        .resolve_template_path(cli.template.as_deref())
        .context("locating template")?;
    let template = fs::read(&template_path)
        .with_context(|| format!("reading template {}", template_path.display()))?;
    let records = read_input(&cli.input)
        .with_context(|| format!("reading input {}", cli.input.display()))?;

    let outcome = fill_template(&template, &records, &config)
        .with_context(|| format!("filling template {}", template_path.display()))?;

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));
    fs::write(&output, &outcome.bytes)
        .with_context(|| format!("writing {}", output.display()))?;
    tracing::info!("Written: {}", output.display());

    match cli.report {
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&outcome.report)
                .context("serializing report")?;
            println!("{json}");
        }
        ReportFormat::Text => print!("{}", text_report(&outcome.report)),
    }
    Ok(())
}

/// `orders.csv` -> `orders_FILLED.xlsx` in the same directory.
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "output".into(), |s| s.to_string_lossy());
    input.with_file_name(format!("{stem}_FILLED.xlsx"))
}

fn text_report(report: &FillReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Sheet '{}': {} items written from row {} (header row {})",
        report.sheet, report.items_written, report.first_row, report.header_row
    );
    if report.rows_appended > 0 {
        let _ = writeln!(out, "Rows appended: {}", report.rows_appended);
    }
    if !report.hidden_columns.is_empty() {
        let _ = writeln!(out, "Hidden columns: {}", report.hidden_columns.join(", "));
    }
    if !report.expanded_tables.is_empty() {
        let _ = writeln!(out, "Expanded: {}", report.expanded_tables.join(", "));
    }
    if report.truncated_quantities > 0 {
        let _ = writeln!(
            out,
            "Fractional quantities truncated: {}",
            report.truncated_quantities
        );
    }
    for unmapped in &report.unmapped_sizes {
        let _ = writeln!(
            out,
            "WARNING: size '{}' has no template column ({} units; items: {})",
            unmapped.key,
            unmapped.total_quantity,
            unmapped.items.join(", ")
        );
    }
    out
}
