//! rsi-extract CLI - Retail Sales Index workbook to long-format CSV
//!
//! # Main Commands
//!
//! ```bash
//! rsi-extract run tables.xlsx                 # Full extraction into ./cleansed
//! rsi-extract run tables.xlsx -o out \
//!     --overrides manual_agg_ref.txt \
//!     --series series-210325.csv              # With manual codes and a series
//! rsi-extract reconcile a.csv b.csv           # Reconcile reference CSVs only
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! rsi-extract sheets tables.xlsx              # Which pass or table reads which sheet
//! rsi-extract blocks tables.xlsx -s "Table 1 M"   # Located table blocks as JSON
//! rsi-extract example-plan                    # Print the default extraction plan
//! ```

use clap::{Parser, Subcommand};
use rsi_extract::{
    export_reconciliation, export_run, reconcile_files, run_pipeline, segment_sheet,
    ExtractionPlan, RunInputs, Workbook,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Output directory when neither `--output` nor `RSI_OUTPUT_DIR` is given.
const DEFAULT_OUTPUT_DIR: &str = "cleansed";

#[derive(Parser)]
#[command(name = "rsi-extract")]
#[command(about = "Extract Retail Sales Index workbook tables into long-format CSV", long_about = None)]
struct Cli {
    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: workbook → records → reconciled reference → CSV files
    Run {
        /// Input workbook (xlsx, xls, xlsb, ods)
        input: PathBuf,

        /// Extraction plan JSON (default: built-in RSI plan)
        #[arg(short, long)]
        plan: Option<PathBuf>,

        /// Pipe-delimited manual reference rows
        #[arg(long)]
        overrides: Option<PathBuf>,

        /// Single-series CSV download to merge in
        #[arg(long)]
        series: Option<PathBuf>,

        /// Output directory (default: $RSI_OUTPUT_DIR or ./cleansed)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List workbook sheets and the pass or category table that reads each one
    Sheets {
        /// Input workbook
        input: PathBuf,

        /// Extraction plan JSON
        #[arg(short, long)]
        plan: Option<PathBuf>,
    },

    /// Show the table blocks found on each sheet
    Blocks {
        /// Input workbook
        input: PathBuf,

        /// Only this sheet
        #[arg(short, long)]
        sheet: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Reconcile reference CSV files with optional manual overrides
    Reconcile {
        /// Reference CSV files, in priority order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Pipe-delimited manual reference rows
        #[arg(long)]
        overrides: Option<PathBuf>,

        /// Output directory (default: $RSI_OUTPUT_DIR or ./cleansed)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the default extraction plan
    ExamplePlan,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    rsi_extract::logs::init(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            input,
            plan,
            overrides,
            series,
            output,
        } => cmd_run(
            &input,
            plan.as_deref(),
            overrides.as_deref(),
            series.as_deref(),
            output,
        ),

        Commands::Sheets { input, plan } => cmd_sheets(&input, plan.as_deref()),

        Commands::Blocks {
            input,
            sheet,
            output,
        } => cmd_blocks(&input, sheet.as_deref(), output.as_deref()),

        Commands::Reconcile {
            inputs,
            overrides,
            output,
        } => cmd_reconcile(&inputs, overrides.as_deref(), output),

        Commands::ExamplePlan => cmd_example_plan(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn load_plan(path: Option<&Path>) -> Result<ExtractionPlan, Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            eprintln!("📋 Plan: {}", p.display());
            Ok(ExtractionPlan::from_file(p)?)
        }
        None => Ok(ExtractionPlan::default()),
    }
}

fn output_dir(output: Option<PathBuf>) -> PathBuf {
    output
        .or_else(|| std::env::var_os("RSI_OUTPUT_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
}

fn cmd_run(
    input: &Path,
    plan: Option<&Path>,
    overrides: Option<&Path>,
    series: Option<&Path>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let plan = load_plan(plan)?;
    let workbook = Workbook::open(input)?;
    eprintln!("   Sheets: {}", workbook.len());

    let inputs = RunInputs::load(overrides, series)?;
    let result = run_pipeline(&workbook, &plan, inputs)?;

    let summary = &result.summary;
    eprintln!("\n⚙️  Passes:");
    for pass in &summary.passes {
        eprintln!(
            "   {}: {} sheets, {} blocks ({} skipped), {} records",
            pass.name, pass.sheets, pass.blocks, pass.skipped_blocks, pass.records
        );
    }
    for table in &result.categories {
        eprintln!("   {}: {} category records", table.name, table.records.len());
    }

    eprintln!("\n🔗 Reference:");
    eprintln!("   Codes: {}", summary.reference_entries);
    eprintln!("   Conflicts: {}", summary.conflicts);
    eprintln!("   Overrides added: {}", summary.overrides_added);
    if summary.unmatched > 0 {
        eprintln!("   ⚠️  Unmatched descriptions: {}", summary.unmatched);
    }

    let dir = output_dir(output);
    let files = export_run(&dir, &result)?;
    eprintln!("\n📦 Dataset: {} rows", summary.rows);
    for file in files {
        eprintln!("   💾 {}", file.display());
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_sheets(input: &Path, plan: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let plan = load_plan(plan)?;
    let workbook = Workbook::open(input)?;
    let names = workbook.sheet_names();

    let mut claimed: Vec<Option<&str>> = vec![None; names.len()];
    let readers = plan
        .passes
        .iter()
        .map(|p| (p.name.as_str(), p.sheet_regex()))
        .chain(
            plan.category_tables
                .iter()
                .map(|t| (t.name.as_str(), t.sheet_regex())),
        );
    for (reader, regex) in readers {
        let regex = regex?;
        for (slot, name) in claimed.iter_mut().zip(&names) {
            if slot.is_none() && regex.is_match(name) {
                *slot = Some(reader);
            }
        }
    }

    eprintln!("📋 {} sheets in {}:\n", names.len(), input.display());
    for (name, pass) in names.iter().zip(claimed) {
        let role = if plan.contents_sheet.as_deref() == Some(name.as_str()) {
            "contents"
        } else if plan.notes_sheet.as_deref() == Some(name.as_str()) {
            "notes"
        } else {
            pass.unwrap_or("-")
        };
        println!("  {:<20} {}", name, role);
    }
    Ok(())
}

fn cmd_blocks(
    input: &Path,
    sheet: Option<&str>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let workbook = Workbook::open(input)?;

    let grids = match sheet {
        Some(name) => vec![workbook.sheet(name)?],
        None => workbook.sheets().iter().collect(),
    };

    let blocks: Vec<_> = grids.into_iter().flat_map(segment_sheet).collect();
    eprintln!("🔍 Found {} blocks", blocks.len());

    let json = serde_json::to_string_pretty(&blocks)?;
    write_output(&json, output)?;
    Ok(())
}

fn cmd_reconcile(
    inputs: &[PathBuf],
    overrides: Option<&Path>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🔗 Reconciling {} reference files", inputs.len());

    let result = reconcile_files(inputs, overrides)?;
    eprintln!("   Codes: {}", result.entries.len());
    eprintln!("   Conflicts: {}", result.conflicts.len());
    eprintln!("   ➕ Overrides added: {}", result.overrides_added);

    let dir = output_dir(output);
    for file in export_reconciliation(&dir, &result)? {
        eprintln!("   💾 {}", file.display());
    }
    Ok(())
}

fn cmd_example_plan() -> Result<(), Box<dyn std::error::Error>> {
    let plan = ExtractionPlan::rsi_default();
    println!("{}", plan.to_json()?);
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
