//! ICG processor CLI - validate deal files and publish CSV/Parquet outputs
//!
//! # Main Commands
//!
//! ```bash
//! icg-processor run --event event.json          # Process one file
//! icg-processor run --event event.json --json   # Same, print the JSON response
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! icg-processor check Data.csv --lookup Lookup.xlsx   # Validate only, write nothing
//! icg-processor parse Data.csv                        # Show the loaded dataset
//! icg-processor lookup Lookup.xlsx                    # Show the lookup summary
//! ```

use clap::{Parser, Subcommand};
use icg_processor::{check_file, handle_event, load_lookup, parser::load_dataset, RunStatus};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "icg-processor")]
#[command(about = "Validate ICG deal files and publish enriched CSV/Parquet outputs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one deal file: validate, then publish or route to the error directory
    Run {
        /// JSON event file with the run configuration
        #[arg(short, long)]
        event: Option<PathBuf>,

        #[command(flatten)]
        keys: EventKeys,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Print the full JSON response
        #[arg(long)]
        json: bool,
    },

    /// Load and validate a deal file without writing anything
    Check {
        /// Input CSV file
        input: PathBuf,

        /// Lookup workbook (or JSON lookup)
        #[arg(short, long)]
        lookup: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,
    },

    /// Parse a CSV file and output the dataset as JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show declared types, code counts and collisions of a lookup
    Lookup {
        /// Lookup workbook (or JSON lookup)
        file: PathBuf,
    },
}

/// Per-key overrides of the event file.
#[derive(clap::Args)]
struct EventKeys {
    #[arg(long)]
    input_dir: Option<String>,
    #[arg(long)]
    input_file: Option<String>,
    #[arg(long)]
    lookup_dir: Option<String>,
    #[arg(long)]
    lookup_file: Option<String>,
    #[arg(long)]
    error_dir: Option<String>,
    #[arg(long)]
    csv_output_dir: Option<String>,
    #[arg(long)]
    parquet_output_dir: Option<String>,
}

impl EventKeys {
    fn values(&self) -> [(&'static str, Option<&String>); 7] {
        [
            ("input_dir", self.input_dir.as_ref()),
            ("input_file", self.input_file.as_ref()),
            ("lookup_dir", self.lookup_dir.as_ref()),
            ("lookup_file", self.lookup_file.as_ref()),
            ("error_dir", self.error_dir.as_ref()),
            ("csv_output_dir", self.csv_output_dir.as_ref()),
            ("parquet_output_dir", self.parquet_output_dir.as_ref()),
        ]
    }
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            event,
            keys,
            delimiter,
            json,
        } => cmd_run(event.as_deref(), &keys, delimiter, json),

        Commands::Check {
            input,
            lookup,
            delimiter,
        } => cmd_check(&input, &lookup, delimiter),

        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter, output.as_deref()),

        Commands::Lookup { file } => cmd_lookup(&file),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_run(
    event_path: Option<&Path>,
    keys: &EventKeys,
    delimiter: Option<char>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut event = match event_path {
        Some(path) => icg_processor::config::read_event(path)?,
        None => Value::Object(Map::new()),
    };
    let object = event
        .as_object_mut()
        .ok_or("event file must contain a JSON object")?;

    for (key, value) in keys.values() {
        if let Some(value) = value {
            object.insert(key.to_string(), json!(value));
        }
    }
    if let Some(d) = delimiter {
        object.insert("delimiter".to_string(), json!(d.to_string()));
    }

    let response = handle_event(&event);

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("[{}] {}", response.status_code, response.message);
        if let Some(ref outputs) = response.outputs {
            println!("   CSV: {}", outputs.csv.display());
            println!("   Parquet: {}", outputs.parquet.display());
        }
        if let Some(ref error_file) = response.error_file {
            println!("   Copied to: {}", error_file.display());
        }
    }

    match response.status {
        RunStatus::Published | RunStatus::Rejected => Ok(()),
        _ => std::process::exit(1),
    }
}

fn cmd_check(
    input: &Path,
    lookup: &Path,
    delimiter: Option<char>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Checking: {}", input.display());

    match check_file(input, lookup, delimiter)? {
        Ok(dataset) => {
            println!("PASS ({} rows)", dataset.len());
            Ok(())
        }
        Err(failure) => {
            println!("FAIL {}: {}", failure.category(), failure);
            std::process::exit(1);
        }
    }
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<char>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Parsing CSV: {}", input.display());

    let result = load_dataset(input, delimiter)?;

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!(
        "   Delimiter: '{}'{}",
        format_delimiter(result.delimiter),
        if delimiter.is_none() { " (auto-detected)" } else { "" }
    );
    eprintln!("   Rows: {}", result.dataset.len());

    let columns: Vec<Value> = result
        .dataset
        .columns
        .iter()
        .zip(&result.column_types)
        .map(|(name, ty)| json!({ "name": name, "type": ty.map(|t| t.as_str()) }))
        .collect();

    let json = serde_json::to_string_pretty(&json!({
        "columns": columns,
        "rows": result.dataset.rows,
    }))?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_lookup(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let table = load_lookup(file)?;

    println!("Declared types ({}):", table.types.len());
    for (column, ty) in &table.types {
        println!("   {}: {}", column, ty);
    }

    println!("\nCodes ({}):", table.codes.len());
    for (code_type, count) in table.code_counts() {
        println!("   {}: {}", code_type, count);
    }

    let collisions = table.collisions();
    if !collisions.is_empty() {
        println!("\nCodes listed under several types (first wins):");
        for (code, types) in collisions {
            let types: Vec<&str> = types.iter().map(|t| t.as_str()).collect();
            println!("   {}: {}", code, types.join(", "));
        }
    }

    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
