// Entry point and high-level CLI flow.
//
// - `calculate` loads the input, layers settings, runs the pipeline, prints a
//   preview plus summary and optionally exports CSV/JSON.
// - `check` prints the date-column data quality report only.
// - `analyze` runs the pipeline and drills into a single project.
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use evm_report::columns::parse_mapping;
use evm_report::loader::{self, LoadedInput};
use evm_report::quality::{profile_date_columns, DateColumnProfile};
use evm_report::{output, reports, util};
use evm_report::{CurveType, EvmError, GlobalSettings, Result, Session, SettingsOverrides};

#[derive(Parser)]
#[command(
    name = "evm_report",
    version,
    about = "Earned Value Management metrics for a project portfolio"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute EVM metrics and optionally export them
    Calculate(CalculateArgs),
    /// Report on date column quality without computing
    Check {
        /// CSV file or JSON project document
        input: PathBuf,
    },
    /// Compute, then show one project's history and health
    Analyze(AnalyzeArgs),
}

#[derive(Args)]
struct RunArgs {
    /// CSV file or JSON project document
    input: PathBuf,

    /// JSON settings file (bare settings or a document with global_values)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Default curve: linear or s-curve
    #[arg(long, value_parser = parse_curve)]
    curve: Option<CurveType>,

    #[arg(long)]
    alpha: Option<f64>,

    #[arg(long)]
    beta: Option<f64>,

    /// Annual inflation rate in percent
    #[arg(long)]
    inflation_rate: Option<f64>,

    /// Take EV from the Manual EV column (`--manual-ev=false` turns it off)
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    manual_ev: Option<bool>,

    /// Take PV from the Manual PV column (`--manual-pv=false` turns it off)
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    manual_pv: Option<bool>,

    /// Bind a field to a header, e.g. --map "bac=Total Budget"
    #[arg(long = "map", value_name = "FIELD=HEADER")]
    mappings: Vec<String>,
}

#[derive(Args)]
struct CalculateArgs {
    #[command(flatten)]
    run: RunArgs,

    /// Write results as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write results as a JSON project document
    #[arg(long)]
    json: Option<PathBuf>,

    /// Leave global_values out of the JSON export
    #[arg(long)]
    no_settings: bool,

    /// Rows shown in the console preview
    #[arg(long, default_value_t = 10)]
    preview: usize,
}

#[derive(Args)]
struct AnalyzeArgs {
    #[command(flatten)]
    run: RunArgs,

    /// Project ID to analyze; lists projects when omitted
    #[arg(long)]
    project: Option<String>,
}

fn parse_curve(s: &str) -> std::result::Result<CurveType, String> {
    CurveType::parse(s).ok_or_else(|| format!("unknown curve '{s}' (expected linear or s-curve)"))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("evm_report={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load(path: &Path) -> Result<LoadedInput> {
    let loaded = loader::load_path(path)?;
    println!(
        "Processing dataset... ({} rows loaded, {} columns)",
        util::format_int(loaded.report.total_rows),
        util::format_int(loaded.report.columns)
    );
    if !loaded.report.dropped_columns.is_empty() {
        println!(
            "Note: dropped empty or unnamed columns: {}",
            loaded.report.dropped_columns.join(", ")
        );
    }
    Ok(loaded)
}

/// Defaults, then document settings, then the settings file, then flags.
fn resolve_settings(args: &RunArgs, from_document: Option<GlobalSettings>) -> Result<GlobalSettings> {
    let mut settings = from_document.unwrap_or_default();
    if let Some(path) = &args.settings {
        settings = GlobalSettings::from_path(path)?;
    }
    let overrides = SettingsOverrides {
        curve: args.curve,
        alpha: args.alpha,
        beta: args.beta,
        inflation_rate: args.inflation_rate,
        use_manual_ev: args.manual_ev,
        use_manual_pv: args.manual_pv,
    };
    Ok(overrides.apply(settings))
}

fn run_session(args: &RunArgs) -> Result<Session> {
    let loaded = load(&args.input)?;
    let settings = resolve_settings(args, loaded.settings)?;
    let mapping = args
        .mappings
        .iter()
        .map(|m| parse_mapping(m))
        .collect::<Result<Vec<_>>>()?;

    let mut session = Session::new();
    session.load_input(loaded.table);
    session.set_mapping(mapping);
    session.configure(settings);

    let calculation = session.calculate()?;
    if !calculation.warnings.is_empty() {
        println!("Calculation completed with warnings:");
        for w in &calculation.warnings {
            println!("- {}", w);
        }
        println!();
    }
    Ok(session)
}

fn handle_calculate(args: CalculateArgs) -> Result<()> {
    let session = run_session(&args.run)?;
    let (Some(calculation), Some(settings)) = (session.result(), session.settings()) else {
        return Err(EvmError::SessionNotReady { missing: "results" });
    };
    let records = &calculation.records;

    let note = format!("first {} of {} rows", args.preview.min(records.len()), records.len());
    output::preview_table(
        "EVM Results",
        Some(note.as_str()),
        &reports::result_rows(records),
        args.preview,
    );

    let summary = reports::portfolio_summary(records);
    println!("Key Metrics Summary:");
    println!("  Avg CPI:        {}", util::format_optional(summary.avg_cpi, 2));
    println!("  Avg SPI:        {}", util::format_optional(summary.avg_spi, 2));
    println!("  Total CV:       {}", util::format_optional(summary.total_cv, 0));
    println!("  Avg % Complete: {}\n", util::format_optional(summary.avg_percent_complete, 1));

    if let Some(path) = &args.csv {
        output::write_csv(path, records)?;
        println!("(Full table exported to {})", path.display());
    }
    if let Some(path) = &args.json {
        let global_values = (!args.no_settings).then_some(settings);
        output::write_document(path, records, global_values)?;
        println!("(JSON document exported to {})", path.display());
    }
    Ok(())
}

fn print_profile(p: &DateColumnProfile) {
    println!("Column: {}", p.column);
    if p.numeric_count == 0 {
        println!("  No numeric values found - will attempt to parse as date strings");
    } else {
        println!(
            "  Numeric values found: {}/{} (range {} to {})",
            p.numeric_count,
            p.total_rows,
            util::format_optional(p.numeric_min, 2),
            util::format_optional(p.numeric_max, 2)
        );
        if p.has_issues() {
            println!(
                "  PROBLEM: {} rows exceed the serial date range (rows {:?}); they will be treated as missing",
                p.out_of_range_rows.len(),
                p.out_of_range_rows
            );
        } else if p.below_range {
            println!("  Found values < 1; these are not valid serial dates");
        } else {
            println!("  All numeric values are in the valid serial date range (1-50,000)");
        }
    }
    if p.non_numeric_count > 0 {
        println!(
            "  Non-numeric values: {} (sample: {})",
            p.non_numeric_count,
            p.non_numeric_samples.join(", ")
        );
    }
}

fn handle_check(input: PathBuf) -> Result<()> {
    let loaded = load(&input)?;
    let report = profile_date_columns(&loaded.table);
    println!(
        "Data Quality Check{}\n",
        if report.has_issues() { " - ISSUES FOUND!" } else { "" }
    );
    if report.columns.is_empty() {
        println!("(no date columns found)");
    }
    for profile in &report.columns {
        print_profile(profile);
    }
    Ok(())
}

fn handle_analyze(args: AnalyzeArgs) -> Result<()> {
    let session = run_session(&args.run)?;
    let Some(calculation) = session.result() else {
        return Err(EvmError::SessionNotReady { missing: "results" });
    };
    let records = &calculation.records;

    let Some(project_id) = args.project else {
        println!("Projects:");
        for (id, name) in reports::project_index(records) {
            println!("  {} - {}", id, name);
        }
        return Ok(());
    };

    let history = reports::project_history(records, &project_id)?;
    let Some(latest) = history.last().copied() else {
        return Err(EvmError::UnknownProject(project_id));
    };

    println!("{} - {}\n", latest.project_id, latest.project_name);
    println!("Key Performance Indicators:");
    println!("  % Complete: {}", util::format_optional(latest.percent_complete, 1));
    println!("  CPI: {}   SPI: {}", util::format_optional(latest.cpi, 2), util::format_optional(latest.spi, 2));
    println!("  CV: {}   SV: {}", util::format_optional(latest.cv, 0), util::format_optional(latest.sv, 0));
    println!("  BAC: {}   AC: {}", util::format_optional(latest.bac, 0), util::format_optional(latest.ac, 0));
    println!("  EAC: {}   VAC: {}", util::format_optional(latest.eac, 0), util::format_optional(latest.vac, 0));
    println!("  Likely completion: {}", util::format_date(latest.likely_completion));

    output::preview_table("Detailed Project Data", None, &reports::history_rows(&history), history.len());

    println!("Project Health Assessment:");
    println!("{}", reports::assess_health(latest));
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Calculate(args) => handle_calculate(args),
        Commands::Check { input } => handle_check(input),
        Commands::Analyze(args) => handle_analyze(args),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}
