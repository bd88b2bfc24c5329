//! Spreadsheet Export Module
//!
//! テストケースのレコードを1シートのXLSXワークブックとして書き出すモジュール。
//! 書き出したワークブックを読み戻して検証する機能も提供します。
//!
//! # 出力形式
//!
//! - シート名: `Test Cases`
//! - 1行目: 列見出し（太字、背景色`#CCCCCC`、中央揃え）
//! - 2行目以降: レコードを入力順に1行ずつ
//! - 「Test Steps」「Expected Result」列は折り返し表示
//! - 列幅: 最大表示幅 + 2（上限50）

use std::fs;
use std::io::{Read, Seek};
use std::path::Path;

use calamine::{open_workbook_from_rs, Data, Range, Reader, Xlsx};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use tracing::{debug, info};
use unicode_width::UnicodeWidthStr;

use crate::error::{Result, TestcaseGenError};
use crate::types::{number_steps, Priority, TestCaseRecord, COLUMNS};

/// ワークシート名
pub const SHEET_NAME: &str = "Test Cases";

/// 列幅の上限（文字数）
const MAX_COLUMN_WIDTH: usize = 50;

/// 列幅に加える余白
const COLUMN_PADDING: usize = 2;

/// 見出し行の高さ（ポイント）
const HEADER_ROW_HEIGHT: f64 = 20.0;

/// 折り返し表示する列（Test Steps, Expected Result）
const WRAPPED_COLUMNS: [usize; 2] = [3, 4];

/// レコードをXLSXファイルに書き出す
///
/// 親ディレクトリが存在しない場合は作成し、既存のファイルは上書きします。
///
/// # 引数
///
/// * `records` - 書き出すレコード（空の場合は見出し行のみ）
/// * `output_path` - 出力先のパス
///
/// # 使用例
///
/// ```rust,no_run
/// use testcasegen::{write_testcases, TestCaseRecord};
///
/// # fn main() -> Result<(), testcasegen::TestcaseGenError> {
/// let records = vec![TestCaseRecord::new(1, "Login", "Verify successful login")];
/// write_testcases(&records, "out/testcases.xlsx")?;
/// # Ok(())
/// # }
/// ```
pub fn write_testcases(records: &[TestCaseRecord], output_path: impl AsRef<Path>) -> Result<()> {
    let output_path = output_path.as_ref();

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut workbook = build_workbook(records)?;
    workbook.save(output_path)?;

    info!(path = %output_path.display(), rows = records.len(), "Saved test case workbook");
    Ok(())
}

/// レコードをメモリ上のXLSXとして書き出す
pub fn testcases_to_buffer(records: &[TestCaseRecord]) -> Result<Vec<u8>> {
    let mut workbook = build_workbook(records)?;
    Ok(workbook.save_to_buffer()?)
}

fn build_workbook(records: &[TestCaseRecord]) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xCCCCCC))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);
    let wrap_format = Format::new()
        .set_text_wrap()
        .set_align(FormatAlign::Top);
    let cell_format = Format::new().set_align(FormatAlign::Top);

    for (col, title) in COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, &header_format)?;
    }
    worksheet.set_row_height(0, HEADER_ROW_HEIGHT)?;
    worksheet.set_freeze_panes(1, 0)?;

    for (index, record) in records.iter().enumerate() {
        let row = (index + 1) as u32;
        for (col, value) in record.to_row().iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let format = if WRAPPED_COLUMNS.contains(&col) {
                &wrap_format
            } else {
                &cell_format
            };
            worksheet.write_string_with_format(row, col as u16, *value, format)?;
        }
    }

    apply_column_widths(worksheet, records)?;

    debug!(rows = records.len(), "Built test case worksheet");
    Ok(workbook)
}

/// 各列の最大表示幅から列幅を決める
///
/// 複数行のセルは最も長い行で測ります。全角文字は幅2として数えます。
fn apply_column_widths(worksheet: &mut Worksheet, records: &[TestCaseRecord]) -> Result<()> {
    for (col, width) in column_widths(records).into_iter().enumerate() {
        worksheet.set_column_width(col as u16, width as f64)?;
    }
    Ok(())
}

fn column_widths(records: &[TestCaseRecord]) -> [usize; 9] {
    let mut widths = COLUMNS.map(display_width);
    for record in records {
        for (col, value) in record.to_row().iter().enumerate() {
            widths[col] = widths[col].max(display_width(value));
        }
    }
    widths.map(|w| (w + COLUMN_PADDING).min(MAX_COLUMN_WIDTH))
}

fn display_width(value: &str) -> usize {
    value.lines().map(UnicodeWidthStr::width).max().unwrap_or(0)
}

/// `write_testcases`で書き出したワークブックを読み戻す
///
/// シート名と列見出しを検証し、2行目以降をレコードとして返します。
///
/// # 戻り値
///
/// * `Err(TestcaseGenError::InvalidWorkbook)` - シートまたは列見出しが一致しない場合
/// * `Err(TestcaseGenError::Spreadsheet)` - XLSXとして読み込めない場合
pub fn read_testcases<R: Read + Seek>(reader: R) -> Result<Vec<TestCaseRecord>> {
    let mut workbook: Xlsx<R> = open_workbook_from_rs(reader).map_err(calamine::Error::from)?;

    if !workbook.sheet_names().iter().any(|name| name == SHEET_NAME) {
        return Err(TestcaseGenError::InvalidWorkbook(format!(
            "worksheet '{}' not found",
            SHEET_NAME
        )));
    }

    let range = workbook
        .worksheet_range(SHEET_NAME)
        .map_err(calamine::Error::from)?;

    records_from_range(&range)
}

/// パスを指定してワークブックを読み戻す
pub fn read_testcases_from_path(path: impl AsRef<Path>) -> Result<Vec<TestCaseRecord>> {
    let file = fs::File::open(path.as_ref())?;
    read_testcases(std::io::BufReader::new(file))
}

fn records_from_range(range: &Range<Data>) -> Result<Vec<TestCaseRecord>> {
    let mut rows = range.rows();

    let header: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(cell_text).collect())
        .unwrap_or_default();
    for (col, expected) in COLUMNS.iter().enumerate() {
        let found = header.get(col).map(String::as_str).unwrap_or("");
        if found != *expected {
            return Err(TestcaseGenError::InvalidWorkbook(format!(
                "expected column {} to be '{}', found '{}'",
                col + 1,
                expected,
                found
            )));
        }
    }

    let records = rows
        .filter(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)))
        .map(|row| {
            let cell = |col: usize| row.get(col).map(cell_text).unwrap_or_default();
            TestCaseRecord {
                test_id: cell(0),
                feature: cell(1),
                title: cell(2),
                steps: cell(3),
                expected_result: cell(4),
                priority: Priority::parse_lenient(&cell(5)).unwrap_or_default(),
                status: cell(6),
                actual_result: cell(7),
                notes: Some(cell(8)).filter(|n| !n.is_empty()),
            }
        })
        .collect();

    Ok(records)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// プロバイダーを呼び出さずに出力形式を確認するためのサンプル
pub fn sample_testcases() -> Vec<TestCaseRecord> {
    vec![
        TestCaseRecord::new(1, "User Authentication", "Verify successful login with valid credentials")
            .with_steps(number_steps(&[
                "Navigate to login page",
                "Enter valid username",
                "Enter valid password",
                "Click Login button",
            ]))
            .with_expected_result("User successfully logs in and is redirected to dashboard")
            .with_priority(Priority::High),
        TestCaseRecord::new(2, "User Authentication", "Verify login failure with invalid credentials")
            .with_steps(number_steps(&[
                "Navigate to login page",
                "Enter invalid username",
                "Enter invalid password",
                "Click Login button",
            ]))
            .with_expected_result("Error message displayed and user remains on login page")
            .with_priority(Priority::High),
        TestCaseRecord::new(3, "User Profile", "Verify user can update profile information")
            .with_steps(number_steps(&[
                "Login with valid credentials",
                "Navigate to profile page",
                "Update profile information",
                "Click Save button",
            ]))
            .with_expected_result(
                "Profile information is updated successfully with confirmation message",
            )
            .with_priority(Priority::Medium),
    ]
}
