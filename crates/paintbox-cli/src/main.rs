//! Paintbox CLI - painting estimates from room files

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use paintbox::prelude::*;
use paintbox_core::{CellKey, RawValue, SheetName};
use paintbox_formula::Engine;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "paintbox")]
#[command(author, version, about = "Good/Better/Best painting estimates")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the rooms in a JSON file and print the result as JSON
    Estimate {
        /// JSON array of rooms
        input: PathBuf,

        /// Calculator options (JSON); missing fields keep their defaults
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Disable the formula result cache
        #[arg(long)]
        no_cache: bool,

        /// Print a single room estimate; the file must hold exactly one room
        #[arg(long)]
        single: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Evaluate a formula against seeded cells
    Eval {
        /// Formula text, e.g. "=A1*2"
        formula: String,

        /// Seed a cell, e.g. A1=100 or Rates!B2=21 (repeatable)
        #[arg(short, long = "set", value_name = "CELL=VALUE")]
        set: Vec<String>,

        /// Sheet for unqualified addresses
        #[arg(long, default_value = "Sheet1")]
        sheet: String,

        /// Cell that holds the formula
        #[arg(long, default_value = "Z1")]
        cell: String,
    },

    /// Print the default calculator options as JSON
    Defaults,
}

fn main() -> Result<()> {
    // Logs go to stderr so JSON on stdout stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Estimate {
            input,
            config,
            no_cache,
            single,
            output,
        } => estimate(&input, config.as_deref(), no_cache, single, output.as_deref()),
        Commands::Eval {
            formula,
            set,
            sheet,
            cell,
        } => eval(&formula, &set, &sheet, &cell),
        Commands::Defaults => {
            let json = serde_json::to_string_pretty(&CalculatorOptions::default())?;
            println!("{}", json);
            Ok(())
        }
    }
}

fn load_options(path: Option<&Path>) -> Result<CalculatorOptions> {
    let Some(path) = path else {
        return Ok(CalculatorOptions::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config '{}'", path.display()))
}

fn estimate(
    input: &Path,
    config: Option<&Path>,
    no_cache: bool,
    single: bool,
    output: Option<&Path>,
) -> Result<()> {
    let mut options = load_options(config)?;
    if no_cache {
        options.enable_cache = false;
    }
    let calculator = PaintingCalculator::new(options).context("Invalid calculator options")?;

    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read '{}'", input.display()))?;
    let rooms: Vec<RoomInput> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid room file '{}'", input.display()))?;
    tracing::debug!(rooms = rooms.len(), single, "room file loaded");

    let (json, failures) = if single {
        let [room] = rooms.as_slice() else {
            bail!("--single needs exactly one room, found {}", rooms.len());
        };
        let estimate = calculator.calculate_complete_room_estimate(room)?;
        (serde_json::to_string_pretty(&estimate)?, estimate.failures.len())
    } else {
        let estimate = calculator.calculate_multi_room_estimate(&rooms)?;
        (serde_json::to_string_pretty(&estimate)?, estimate.failures.len())
    };

    if failures > 0 {
        eprintln!("Warning: {} cells failed to evaluate", failures);
    }

    match output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", json))
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            eprintln!("Wrote estimate for {} rooms to '{}'", rooms.len(), path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", json).context("Failed to write to stdout")?;
        }
    }
    Ok(())
}

/// `A1` on the default sheet, or a sheet-qualified `Rates!B2`
fn parse_cell(text: &str, sheet: &SheetName) -> Result<CellKey> {
    CellKey::parse_in(text, sheet).with_context(|| format!("Invalid cell '{}'", text))
}

fn eval(formula: &str, assignments: &[String], sheet: &str, cell: &str) -> Result<()> {
    let sheet = SheetName::new(sheet).context("Invalid sheet name")?;

    let mut cells = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let Some((target, value)) = assignment.split_once('=') else {
            bail!("Expected CELL=VALUE, got '{}'", assignment);
        };
        cells.push((parse_cell(target.trim(), &sheet)?, RawValue::from_input(value)));
    }

    let mut engine = Engine::new();
    engine.set_worksheet_data(cells);

    let target = parse_cell(cell, &sheet)?;
    let value = engine.evaluate(&target, Some(formula));
    println!("{}", value);
    if let Some(diagnostic) = engine.diagnostic(&target) {
        eprintln!("{}: {}", target, diagnostic);
    }
    Ok(())
}
