//! DOCX Text Extraction
//!
//! DOCXファイル（ZIPアーカイブ）内の`word/document.xml`をストリーミング解析し、
//! 段落ごとに1行のテキストを生成します。

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{Result, TestcaseGenError};
use crate::security::SecurityConfig;

/// 本文を格納しているエントリ
const DOCUMENT_ENTRY: &str = "word/document.xml";

/// 表のセルを1行にまとめる際の区切り
const CELL_SEPARATOR: &str = " | ";

/// DOCXのバイト列からテキストを抽出する
///
/// # 戻り値
///
/// * `Ok(String)` - 段落を改行で連結したテキスト
/// * `Err(TestcaseGenError::Zip)` - ZIPとして開けない、または本文エントリがない場合
/// * `Err(TestcaseGenError::SecurityViolation)` - セキュリティ制限に違反した場合
pub(crate) fn extract_docx(bytes: &[u8], security_config: &SecurityConfig) -> Result<String> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| TestcaseGenError::Zip(format!("{}", e)))?;

    security_config.check_archive(&mut archive)?;

    let mut entry = archive.by_name(DOCUMENT_ENTRY).map_err(|e| match e {
        ZipError::FileNotFound => TestcaseGenError::Zip(format!(
            "'{}' not found; the file is not a Word document",
            DOCUMENT_ENTRY
        )),
        other => TestcaseGenError::Zip(format!("{}", other)),
    })?;

    let mut xml_content = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut xml_content)?;

    document_xml_to_text(&xml_content)
}

/// `word/document.xml`の内容をテキストに変換する
///
/// - `w:p`（段落）ごとに1行
/// - `w:t`（テキスト）を連結、`w:tab`はタブ、`w:br` / `w:cr`は改行
/// - 表は行ごとにセルを`" | "`で連結して1行
/// - 図形やフィールドなどテキスト以外の要素は無視
fn document_xml_to_text(xml: &[u8]) -> Result<String> {
    let mut reader = Reader::from_reader(xml);

    let mut buf = Vec::new();
    let mut lines: Vec<String> = Vec::new();
    let mut paragraph = String::new();
    let mut cell = String::new();
    let mut row_cells: Vec<String> = Vec::new();
    let mut table_depth = 0usize;
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"r" => in_run = true,
                b"t" if in_run => in_text = true,
                b"tbl" => table_depth += 1,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" if in_run => paragraph.push('\t'),
                b"br" | b"cr" if in_run => paragraph.push('\n'),
                _ => {}
            },
            Event::Text(e) if in_text => paragraph.push_str(&e.unescape()?),
            Event::CData(e) if in_text => {
                paragraph.push_str(&String::from_utf8_lossy(&e.into_inner()))
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"r" => in_run = false,
                b"p" => {
                    let text = std::mem::take(&mut paragraph);
                    let text = text.trim_end();
                    if text.trim().is_empty() {
                        // 空段落はスキップ
                    } else if table_depth > 0 {
                        if !cell.is_empty() {
                            cell.push(' ');
                        }
                        cell.push_str(text.trim());
                    } else {
                        lines.push(text.to_string());
                    }
                }
                b"tc" if table_depth == 1 => {
                    row_cells.push(std::mem::take(&mut cell));
                }
                b"tr" if table_depth == 1 => {
                    let row = row_cells
                        .drain(..)
                        .filter(|c| !c.is_empty())
                        .collect::<Vec<_>>()
                        .join(CELL_SEPARATOR);
                    if !row.is_empty() {
                        lines.push(row);
                    }
                }
                b"tbl" => table_depth = table_depth.saturating_sub(1),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(lines.join("\n"))
}
