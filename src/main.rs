//! testcasegen command-line tool
//!
//! ```text
//! testcasegen run requirements.docx -o testcases.xlsx -c config.yaml
//! testcasegen sample -o sample_testcases.xlsx
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use testcasegen::{
    sample_testcases, write_testcases, DocumentFormat, EngineConfig, PipelineBuilder,
    TestcaseGenError,
};

#[derive(Debug, Parser)]
#[command(name = "testcasegen")]
#[command(about = "Generate manual test cases from requirement documents using AI", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides this.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate test cases from a requirement document (PDF, DOCX, or TXT)
    Run {
        /// Path to the requirement document
        input_file: PathBuf,

        /// Output Excel file path
        #[arg(short, long, default_value = "testcases.xlsx")]
        output: PathBuf,

        /// Configuration file path
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,
    },

    /// Write built-in sample test cases without contacting a provider
    Sample {
        /// Output Excel file path
        #[arg(short, long, default_value = "sample_testcases.xlsx")]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Run {
            input_file,
            output,
            config,
        } => run(&input_file, &output, &config),
        Command::Sample { output } => sample(&output),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            handle_error(e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(input: &Path, output: &Path, config_path: &Path) -> Result<(), TestcaseGenError> {
    // 拡張子の検証は設定の読み込みより先に行う
    DocumentFormat::from_path(input)?;

    let config = EngineConfig::load(config_path)?;
    debug!(ai_engine = %config.ai_engine, model = %config.active().model, "Configuration loaded");

    let pipeline = PipelineBuilder::new().with_config(config).build()?;
    println!("Reading requirement document: {}", input.display());
    println!("Using AI engine: {}", pipeline.provider());

    let summary = pipeline.run(input, output)?;
    println!("Extracted {} characters from document", summary.characters);

    match &summary.fallback {
        Some(reason) => {
            println!("No test cases were generated: {}", reason);
            println!("A placeholder row was written to: {}", summary.output.display());
        }
        None => {
            println!("Generated {} test cases", summary.testcases);
            println!("Test cases saved to: {}", summary.output.display());
        }
    }
    Ok(())
}

fn sample(output: &Path) -> Result<(), TestcaseGenError> {
    let records = sample_testcases();
    write_testcases(&records, output)?;
    println!("Sample file with {} test cases saved to: {}", records.len(), output.display());
    Ok(())
}

fn handle_error(error: TestcaseGenError) {
    match error {
        TestcaseGenError::InputNotFound(path) => {
            eprintln!("Input Error: input file '{}' not found.", path.display());
        }
        TestcaseGenError::UnsupportedFormat { extension } => {
            eprintln!("Input Error: unsupported file format '{}'.", extension);
            eprintln!("Supported formats: .pdf, .docx, .txt");
        }
        TestcaseGenError::EmptyDocument(path) => {
            eprintln!("Input Error: no text content found in '{}'.", path.display());
        }
        TestcaseGenError::SecurityViolation(msg) => {
            eprintln!("Security Violation: {}", msg);
            eprintln!("The document violates input limits (e.g., file size or archive entry count).");
        }
        e @ (TestcaseGenError::Pdf(_) | TestcaseGenError::Zip(_) | TestcaseGenError::Xml(_)) => {
            eprintln!("Document Error: {}", e);
            eprintln!("The file may be corrupted or not a valid document of its type.");
        }
        TestcaseGenError::Config(msg) => {
            eprintln!("Configuration Error: {}", msg);
        }
        TestcaseGenError::Yaml(yaml_err) => {
            eprintln!("Configuration Error: failed to parse configuration file: {}", yaml_err);
        }
        e @ (TestcaseGenError::Export(_)
        | TestcaseGenError::Spreadsheet(_)
        | TestcaseGenError::InvalidWorkbook(_)) => {
            eprintln!("Output Error: {}", e);
            eprintln!("Please check that the output path is writable.");
        }
        TestcaseGenError::Io(io_err) => {
            eprintln!("I/O Error: {}", io_err);
            eprintln!("Please check that the file exists and you have permission to access it.");
        }
        e => {
            eprintln!("Error during processing: {}", e);
        }
    }
}
