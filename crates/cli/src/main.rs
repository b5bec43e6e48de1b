// docgrade CLI - headless recognition QA scoring

mod exit_codes;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use docgrade_engine::model::EngineInput;
use docgrade_engine::schema::{DocTypeSchema, RunOptions, SchemaRegistry};
use docgrade_engine::EngineError;

use exit_codes::{
    EXIT_FAILED_FIELDS, EXIT_FILE_SET_MISMATCH, EXIT_INVALID_CONFIG, EXIT_RUNTIME, EXIT_SUCCESS,
};

#[derive(Parser)]
#[command(name = "dgrade")]
#[command(about = "Score document-recognition output against ground truth")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scoring from a TOML config file
    #[command(after_help = "\
Examples:
  dgrade run permits.toml
  dgrade run permits.toml --json
  dgrade run permits.toml --output result.json")]
    Run {
        /// Path to the run config file
        config: PathBuf,

        /// Output JSON to stdout instead of human summary only
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate a run config without scoring
    #[command(after_help = "\
Examples:
  dgrade validate permits.toml")]
    Validate {
        /// Path to the run config file
        config: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// Run config
// ---------------------------------------------------------------------------

#[derive(Debug, serde::Deserialize)]
struct RunConfig {
    name: String,
    /// Document-type id to score, resolved against `types`.
    doc_type: String,
    inputs: InputsConfig,
    #[serde(default)]
    options: RunOptions,
    #[serde(default)]
    output: OutputConfig,
    types: BTreeMap<String, DocTypeSchema>,
}

#[derive(Debug, serde::Deserialize)]
struct InputsConfig {
    /// Document index CSV.
    index: PathBuf,
    /// Type-specific attribute table CSV; multi-valued types have none.
    #[serde(default)]
    attributes: Option<PathBuf>,
    /// Ground-truth file, XLSX or CSV by extension.
    answers: PathBuf,
}

#[derive(Debug, Default, serde::Deserialize)]
struct OutputConfig {
    #[serde(default)]
    json: Option<PathBuf>,
}

#[derive(Debug)]
struct CliError {
    code: u8,
    message: String,
}

fn cli_err(code: u8, message: impl Into<String>) -> CliError {
    CliError { code, message: message.into() }
}

fn load_config(config_path: &Path) -> Result<(RunConfig, SchemaRegistry), CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| cli_err(EXIT_RUNTIME, format!("cannot read config: {e}")))?;
    let config: RunConfig = toml::from_str(&config_str)
        .map_err(|e| cli_err(EXIT_INVALID_CONFIG, format!("config parse error: {e}")))?;
    let registry = SchemaRegistry::from_types(config.types.clone())
        .map_err(|e| cli_err(EXIT_INVALID_CONFIG, e.to_string()))?;
    registry
        .get(&config.doc_type)
        .map_err(|e| cli_err(EXIT_INVALID_CONFIG, e.to_string()))?;
    Ok((config, registry))
}

/// Answer files are spreadsheets or CSV exports, told apart by extension.
fn read_answer_records(path: &Path) -> Result<Vec<docgrade_engine::model::Record>, String> {
    let is_sheet = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "xlsx" | "xlsm" | "xls" | "ods"));
    if is_sheet {
        docgrade_io::xlsx::read_records(path)
    } else {
        docgrade_io::csv::read_records(path)
    }
}

fn cmd_run(config_path: PathBuf, json_output: bool, output_file: Option<PathBuf>) -> Result<(), CliError> {
    let (config, registry) = load_config(&config_path)?;
    let schema = registry.get(&config.doc_type).expect("validated above");

    // Resolve input paths relative to the config file's directory
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let runtime = |message: String| cli_err(EXIT_RUNTIME, message);

    let index = docgrade_io::csv::read_records(&base_dir.join(&config.inputs.index)).map_err(runtime)?;
    let attributes = match &config.inputs.attributes {
        Some(path) => docgrade_io::csv::read_records(&base_dir.join(path)).map_err(runtime)?,
        None => Vec::new(),
    };
    let answers = read_answer_records(&base_dir.join(&config.inputs.answers)).map_err(runtime)?;

    let input = EngineInput { index, attributes, answers };
    let result = match docgrade_engine::run(schema, &input, &config.options) {
        Ok(result) => result,
        Err(EngineError::FileSetMismatch { missing_in_index, missing_in_answers }) => {
            eprintln!("filename sets differ, nothing was scored");
            for name in &missing_in_index {
                eprintln!("  in answers but not in index: {name}");
            }
            for name in &missing_in_answers {
                eprintln!("  in index but not in answers: {name}");
            }
            return Err(cli_err(EXIT_FILE_SET_MISMATCH, "filename set mismatch"));
        }
        Err(e) => return Err(cli_err(EXIT_RUNTIME, e.to_string())),
    };

    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }

    // Output
    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| cli_err(EXIT_RUNTIME, format!("JSON serialization error: {e}")))?;

    let output_path = output_file.or_else(|| config.output.json.as_ref().map(|p| base_dir.join(p)));
    if let Some(ref path) = output_path {
        std::fs::write(path, &json_str)
            .map_err(|e| cli_err(EXIT_RUNTIME, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    // Human summary to stderr
    let s = &result.summary;
    eprintln!(
        "{} ({}): {} row(s) — {} pass, {} fail; precision {:.3}, recall {:.3}, F1 {:.3}, item accuracy {:.3}",
        config.name,
        schema.name,
        s.total_rows,
        s.passed,
        s.failed,
        s.avg_precision,
        s.avg_recall,
        s.avg_f1,
        s.avg_item_accuracy,
    );

    if s.failed > 0 {
        return Err(cli_err(EXIT_FAILED_FIELDS, format!("{} row(s) failed", s.failed)));
    }
    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let (config, registry) = load_config(&config_path)?;
    let schema = registry.get(&config.doc_type).expect("validated above");
    eprintln!(
        "valid: '{}' scoring {} ({}) with {} declared type(s)",
        config.name,
        config.doc_type,
        if schema.multi_valued { "multi-valued" } else { "scalar" },
        registry.len(),
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run { config, json, output } => cmd_run(config, json, output),
        Commands::Validate { config } => cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("error: {}", e.message);
            ExitCode::from(e.code)
        }
    }
}
