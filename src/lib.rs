//! testcasegen - Generate manual test-case spreadsheets from requirement documents
//!
//! This crate reads a requirement document (`.txt`, `.docx`, `.pdf`), asks an LLM
//! provider (OpenAI or Google Gemini) to derive manual test cases from it, and writes
//! the result as a nine-column XLSX worksheet ready for manual execution.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use testcasegen::{EngineConfig, PipelineBuilder};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load provider selection and API keys
//!     let config = EngineConfig::load("config.yaml")?;
//!
//!     // Build the pipeline
//!     let pipeline = PipelineBuilder::new().with_config(config).build()?;
//!
//!     // Extract, generate, export
//!     let summary = pipeline.run("requirements.docx", "testcases.xlsx")?;
//!     println!("{} test cases written to {}", summary.testcases, summary.output.display());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Step by Step
//!
//! Each stage is also available on its own:
//!
//! ```rust,no_run
//! use testcasegen::{create_engine, extract, write_testcases, EngineConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let document = extract("requirements.txt")?;
//!
//!     let config = EngineConfig::from_yaml_str("ai_engine: gemini\n")?;
//!     let engine = create_engine(&config)?;
//!
//!     // Provider failures never abort: a single fallback record is returned instead
//!     let generation = engine.generate_testcases(&document.text);
//!     if let Some(reason) = &generation.fallback_reason {
//!         eprintln!("generation failed: {}", reason);
//!     }
//!
//!     write_testcases(&generation.records, "testcases.xlsx")?;
//!     Ok(())
//! }
//! ```
//!
//! # Parsing Provider Output
//!
//! Response parsing is a pure function and can be used without any network access:
//!
//! ```rust
//! use testcasegen::engine::{number_records, parse_response};
//!
//! let parsed = parse_response(
//!     r#"[{"feature": "Login", "title": "Verify successful login", "steps": ["Open page", "Log in"]}]"#,
//! );
//! let records = number_records(parsed.rows);
//! assert_eq!(records[0].test_id, "TC001");
//! assert_eq!(records[0].steps, "1. Open page\n2. Log in");
//! assert_eq!(records[0].status, "Not Executed");
//! ```

mod config;
pub mod engine;
mod error;
mod export;
mod extract;
mod pipeline;
mod security;
mod types;

// 公開API
pub use config::{EngineConfig, ProviderKind, ProviderSettings, DEFAULT_TIMEOUT_SECS};
pub use engine::{create_engine, GeminiEngine, Generation, OpenAiEngine, TestCaseEngine};
pub use error::{Result, TestcaseGenError};
pub use export::{
    read_testcases, read_testcases_from_path, sample_testcases, testcases_to_buffer,
    write_testcases, SHEET_NAME,
};
pub use extract::{extract, DocumentFormat, ExtractedDocument};
pub use pipeline::{Pipeline, PipelineBuilder, RunSummary};
pub use types::{Priority, TestCaseRecord, COLUMNS, DEFAULT_STATUS};
