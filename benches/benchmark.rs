//! パフォーマンスベンチマーク
//!
//! testcasegenクレートのローカル処理（ネットワークを除く）の性能を測定します。
//!
//! 実装するベンチマーク:
//! - 応答解析: JSON配列 / 区切り文字の表 / 前置き付きのコードフェンス
//! - テキスト抽出: 大きめのTXT / DOCX
//! - スプレッドシート出力: 500行のXLSXをメモリ上に生成

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::io::{Cursor, Write};
use testcasegen::engine::{number_records, parse_response};
use testcasegen::{extract, testcases_to_buffer, Priority, TestCaseRecord};
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

/// `rows`件のテストケースを含むJSON応答を生成
fn json_response(rows: usize) -> String {
    let items: Vec<String> = (0..rows)
        .map(|i| {
            format!(
                r#"{{"feature": "Feature {f}", "test_id": "TC{i:03}", "title": "Verify behaviour {i}",
"steps": ["Open screen {i}", "Enter data", "Submit"], "expected_result": "Result {i} is shown", "priority": "High"}}"#,
                f = i % 7,
                i = i
            )
        })
        .collect();
    format!("Here are the test cases:\n```json\n[{}]\n```", items.join(",\n"))
}

/// `rows`件のテストケースを含むMarkdown表の応答を生成
fn table_response(rows: usize) -> String {
    let mut text = String::from("| Feature | Title | Steps | Expected Result | Priority |\n|---|---|---|---|---|\n");
    for i in 0..rows {
        text.push_str(&format!(
            "| Feature {} | Verify behaviour {} | Open screen<br>Submit | Result shown | Medium |\n",
            i % 7,
            i
        ));
    }
    text
}

fn benchmark_parse_response(c: &mut Criterion) {
    let json = json_response(200);
    let table = table_response(200);

    let mut group = c.benchmark_group("parse_response");

    group.throughput(Throughput::Bytes(json.len() as u64));
    group.bench_function("json_200_rows", |b| {
        b.iter(|| number_records(parse_response(black_box(&json)).rows));
    });

    group.throughput(Throughput::Bytes(table.len() as u64));
    group.bench_function("markdown_table_200_rows", |b| {
        b.iter(|| number_records(parse_response(black_box(&table)).rows));
    });

    group.finish();
}

fn benchmark_extract(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();

    let paragraph = "The system shall allow registered users to log in with email and password.";
    let text: String = (0..20_000).map(|i| format!("{} ({})\n", paragraph, i)).collect();
    let txt_path = dir.path().join("requirements.txt");
    std::fs::write(&txt_path, &text).unwrap();

    let body: String = (0..20_000)
        .map(|i| format!("<w:p><w:r><w:t>{} ({})</w:t></w:r></w:p>", paragraph, i))
        .collect();
    let document_xml = format!(
        r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );
    let mut docx = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut docx));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file("word/document.xml", options).unwrap();
        zip.write_all(document_xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    let docx_path = dir.path().join("requirements.docx");
    std::fs::write(&docx_path, &docx).unwrap();

    let mut group = c.benchmark_group("extract");
    group.sample_size(20);

    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("txt_20k_lines", |b| {
        b.iter(|| extract(black_box(&txt_path)).unwrap());
    });

    group.throughput(Throughput::Bytes(document_xml.len() as u64));
    group.bench_function("docx_20k_paragraphs", |b| {
        b.iter(|| extract(black_box(&docx_path)).unwrap());
    });

    group.finish();
}

fn benchmark_export(c: &mut Criterion) {
    let records: Vec<TestCaseRecord> = (1..=500)
        .map(|i| {
            TestCaseRecord::new(i, format!("Feature {}", i % 7), format!("Verify behaviour {}", i))
                .with_steps("1. Open screen\n2. Enter data\n3. Submit")
                .with_expected_result("Result is shown")
                .with_priority(Priority::High)
        })
        .collect();

    let mut group = c.benchmark_group("export");
    group.sample_size(20);
    group.bench_function("xlsx_500_rows", |b| {
        b.iter(|| testcases_to_buffer(black_box(&records)).unwrap());
    });
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(std::time::Duration::from_secs(10))
        .warm_up_time(std::time::Duration::from_secs(3));
    targets = benchmark_parse_response, benchmark_extract, benchmark_export
}

criterion_main!(benches);
