//! Integration Tests for testcasegen
//!
//! End-to-end runs of the pipeline (extract → generate → export) with a
//! scripted engine standing in for the LLM provider.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use testcasegen::{
    read_testcases_from_path, DocumentFormat, PipelineBuilder, Priority, Result, TestCaseEngine,
    TestcaseGenError, COLUMNS, DEFAULT_STATUS,
};

// Helper module for generating test fixtures
mod fixtures {
    use std::io::{Cursor, Write};

    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};
    use zip::write::{FileOptions, ZipWriter};
    use zip::CompressionMethod;

    /// Generate a DOCX file whose body holds one paragraph per line
    pub fn generate_docx(paragraphs: &[&str]) -> Vec<u8> {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
            .collect();
        let document_xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );

        let mut data = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut data));
            let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
            zip.start_file("[Content_Types].xml", options).unwrap();
            zip.write_all(b"<Types/>").unwrap();
            zip.start_file("word/document.xml", options).unwrap();
            zip.write_all(document_xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        data
    }

    /// Generate a single-page PDF containing one line of text
    pub fn generate_pdf(text: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }
}

const LOGIN_RESPONSE: &str = r#"```json
[
  {
    "feature": "Login",
    "test_id": "TC999",
    "title": "Verify successful login",
    "steps": ["Open the login page", "Enter a valid email and password", "Click Login"],
    "expected_result": "User is redirected to the dashboard",
    "priority": "High"
  },
  {
    "feature": "Login",
    "test_id": "TC998",
    "title": "Verify login failure with invalid password",
    "steps": ["Open the login page", "Enter a valid email and a wrong password", "Click Login"],
    "expected_result": "An error message is shown",
    "priority": "Medium"
  }
]
```"#;

/// Engine returning a canned response (or failing) and recording every prompt
struct ScriptedEngine {
    response: Option<String>,
    calls: Rc<Cell<usize>>,
    prompts: Rc<RefCell<Vec<String>>>,
}

impl ScriptedEngine {
    fn new(response: Option<&str>) -> (Self, Rc<Cell<usize>>, Rc<RefCell<Vec<String>>>) {
        let calls = Rc::new(Cell::new(0));
        let prompts = Rc::new(RefCell::new(Vec::new()));
        let engine = Self {
            response: response.map(str::to_string),
            calls: Rc::clone(&calls),
            prompts: Rc::clone(&prompts),
        };
        (engine, calls, prompts)
    }
}

impl TestCaseEngine for ScriptedEngine {
    fn provider(&self) -> &str {
        "scripted"
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        self.calls.set(self.calls.get() + 1);
        self.prompts.borrow_mut().push(prompt.to_string());
        self.response
            .clone()
            .ok_or_else(|| TestcaseGenError::Provider("scripted API error 401 Unauthorized".to_string()))
    }
}

fn write_input(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_login_requirements_produce_two_rows() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        dir.path(),
        "login.txt",
        b"Users must be able to log in with email and password.\nSystem should validate credentials.",
    );
    let output = dir.path().join("testcases.xlsx");

    let (engine, calls, prompts) = ScriptedEngine::new(Some(LOGIN_RESPONSE));
    let pipeline = PipelineBuilder::new().with_engine(Box::new(engine)).build().unwrap();
    let summary = pipeline.run(&input, &output).unwrap();

    assert_eq!(calls.get(), 1);
    assert!(prompts.borrow()[0].contains("System should validate credentials."));
    assert_eq!(summary.format, DocumentFormat::Text);
    assert_eq!(summary.testcases, 2);
    assert!(!summary.is_fallback());

    let records = read_testcases_from_path(&output).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].test_id, "TC001");
    assert_eq!(records[1].test_id, "TC002");
    assert_eq!(records[0].feature, "Login");
    assert_eq!(records[0].priority, Priority::High);
    assert_eq!(
        records[0].steps,
        "1. Open the login page\n2. Enter a valid email and password\n3. Click Login"
    );
    for record in &records {
        assert_eq!(record.status, DEFAULT_STATUS);
        assert_eq!(record.actual_result, "");
    }
}

#[test]
fn test_provider_failure_writes_fallback_row() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "req.txt", b"The system shall export reports.");
    let output = dir.path().join("testcases.xlsx");

    let (engine, calls, _) = ScriptedEngine::new(None);
    let pipeline = PipelineBuilder::new().with_engine(Box::new(engine)).build().unwrap();
    let summary = pipeline.run(&input, &output).unwrap();

    assert_eq!(calls.get(), 1);
    assert!(summary.is_fallback());
    assert_eq!(summary.testcases, 1);

    let records = read_testcases_from_path(&output).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].test_id, "TC001");
    assert_eq!(records[0].feature, "N/A");
    assert_eq!(records[0].title, "No test cases generated");
    assert_eq!(records[0].priority, Priority::Low);
    assert!(records[0].notes.as_deref().unwrap().contains("401 Unauthorized"));
}

#[test]
fn test_unusable_response_writes_fallback_row() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "req.txt", b"The system shall export reports.");
    let output = dir.path().join("testcases.xlsx");

    let (engine, _, _) = ScriptedEngine::new(Some("I'm sorry, I cannot help with that."));
    let pipeline = PipelineBuilder::new().with_engine(Box::new(engine)).build().unwrap();
    let summary = pipeline.run(&input, &output).unwrap();

    assert!(summary.is_fallback());
    let records = read_testcases_from_path(&output).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "No test cases generated");
}

#[test]
fn test_delimited_response_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "req.txt", b"Users can reset their password.");
    let output = dir.path().join("testcases.xlsx");

    let response = "| Feature | Title | Steps | Expected Result | Priority |\n\
                    |---|---|---|---|---|\n\
                    | Password | Reset via email | Request reset<br>Open link | Password changed | Low |";
    let (engine, _, _) = ScriptedEngine::new(Some(response));
    let pipeline = PipelineBuilder::new().with_engine(Box::new(engine)).build().unwrap();
    pipeline.run(&input, &output).unwrap();

    let records = read_testcases_from_path(&output).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].feature, "Password");
    assert_eq!(records[0].title, "Reset via email");
    assert_eq!(records[0].priority, Priority::Low);
}

#[test]
fn test_unsupported_extension_never_calls_provider() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "requirements.csv", b"id,requirement\n1,login");
    let output = dir.path().join("testcases.xlsx");

    let (engine, calls, _) = ScriptedEngine::new(Some(LOGIN_RESPONSE));
    let pipeline = PipelineBuilder::new().with_engine(Box::new(engine)).build().unwrap();

    match pipeline.run(&input, &output) {
        Err(TestcaseGenError::UnsupportedFormat { extension }) => assert_eq!(extension, "csv"),
        other => panic!("Expected UnsupportedFormat, got {:?}", other),
    }
    assert_eq!(calls.get(), 0);
    assert!(!output.exists());
}

#[test]
fn test_missing_input_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("testcases.xlsx");

    let (engine, calls, _) = ScriptedEngine::new(Some(LOGIN_RESPONSE));
    let pipeline = PipelineBuilder::new().with_engine(Box::new(engine)).build().unwrap();
    let result = pipeline.run(dir.path().join("missing.txt"), &output);

    assert!(matches!(result, Err(TestcaseGenError::InputNotFound(_))));
    assert_eq!(calls.get(), 0);
}

#[test]
fn test_whitespace_only_input_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "blank.txt", b"  \n\t\n ");
    let output = dir.path().join("testcases.xlsx");

    let (engine, calls, _) = ScriptedEngine::new(Some(LOGIN_RESPONSE));
    let pipeline = PipelineBuilder::new().with_engine(Box::new(engine)).build().unwrap();
    let result = pipeline.run(&input, &output);

    assert!(matches!(result, Err(TestcaseGenError::EmptyDocument(_))));
    assert_eq!(calls.get(), 0);
    assert!(!output.exists());
}

#[test]
fn test_docx_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        dir.path(),
        "login.docx",
        &fixtures::generate_docx(&[
            "Users must be able to log in with email and password.",
            "System should validate credentials.",
        ]),
    );
    let output = dir.path().join("testcases.xlsx");

    let (engine, _, prompts) = ScriptedEngine::new(Some(LOGIN_RESPONSE));
    let pipeline = PipelineBuilder::new().with_engine(Box::new(engine)).build().unwrap();
    let summary = pipeline.run(&input, &output).unwrap();

    assert_eq!(summary.format, DocumentFormat::Docx);
    assert!(prompts.borrow()[0].contains(
        "Users must be able to log in with email and password.\nSystem should validate credentials."
    ));
    assert_eq!(read_testcases_from_path(&output).unwrap().len(), 2);
}

#[test]
fn test_pdf_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        dir.path(),
        "login.pdf",
        &fixtures::generate_pdf("Users must be able to log in with email and password."),
    );
    let output = dir.path().join("testcases.xlsx");

    let (engine, _, prompts) = ScriptedEngine::new(Some(LOGIN_RESPONSE));
    let pipeline = PipelineBuilder::new().with_engine(Box::new(engine)).build().unwrap();
    let summary = pipeline.run(&input, &output).unwrap();

    assert_eq!(summary.format, DocumentFormat::Pdf);
    assert!(prompts.borrow()[0].contains("Users must be able to log in with email and password."));
}

#[test]
fn test_output_is_overwritten_and_nested_dirs_created() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "req.txt", b"The system shall export reports.");
    let output = dir.path().join("reports/2024/testcases.xlsx");

    let (engine, _, _) = ScriptedEngine::new(Some(LOGIN_RESPONSE));
    let pipeline = PipelineBuilder::new().with_engine(Box::new(engine)).build().unwrap();
    pipeline.run(&input, &output).unwrap();
    assert_eq!(read_testcases_from_path(&output).unwrap().len(), 2);

    let (engine, _, _) = ScriptedEngine::new(None);
    let pipeline = PipelineBuilder::new().with_engine(Box::new(engine)).build().unwrap();
    pipeline.run(&input, &output).unwrap();
    assert_eq!(read_testcases_from_path(&output).unwrap().len(), 1);
}

#[test]
fn test_unwritable_output_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "req.txt", b"The system shall export reports.");
    let output = dir.path().join("out.xlsx");
    std::fs::create_dir(&output).unwrap();

    let (engine, calls, _) = ScriptedEngine::new(Some(LOGIN_RESPONSE));
    let pipeline = PipelineBuilder::new().with_engine(Box::new(engine)).build().unwrap();

    match pipeline.run(&input, &output) {
        Err(TestcaseGenError::Export(_)) | Err(TestcaseGenError::Io(_)) => {}
        other => panic!("Expected Export or Io error, got {:?}", other),
    }
    assert_eq!(calls.get(), 1);
    assert!(output.is_dir());
}

#[test]
fn test_output_parent_that_is_a_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "req.txt", b"The system shall export reports.");
    let blocker = write_input(dir.path(), "reports", b"not a directory");
    let output = blocker.join("testcases.xlsx");

    let (engine, _, _) = ScriptedEngine::new(Some(LOGIN_RESPONSE));
    let pipeline = PipelineBuilder::new().with_engine(Box::new(engine)).build().unwrap();

    let err = pipeline.run(&input, &output).unwrap_err();
    assert!(matches!(err, TestcaseGenError::Io(_)), "got {:?}", err);
}

#[test]
fn test_header_matches_column_schema() {
    assert_eq!(COLUMNS.len(), 9);
    assert_eq!(COLUMNS[0], "Test ID");
    assert_eq!(COLUMNS[8], "Notes");
}
