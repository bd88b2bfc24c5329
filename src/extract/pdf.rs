//! PDF Text Extraction
//!
//! lopdfのページモデルを使用して、ページ順にテキストを抽出します。

use lopdf::Document;
use tracing::{debug, warn};

use crate::error::{Result, TestcaseGenError};

/// PDFのバイト列からテキストを抽出する
///
/// 各ページのテキストをトリムし、空でないページを改行で連結します。
/// テキストを持たないページ（スキャン画像など）はスキップされます。
pub(crate) fn extract_pdf(bytes: &[u8]) -> Result<String> {
    let document = Document::load_mem(bytes)?;

    if document.is_encrypted() {
        return Err(TestcaseGenError::SecurityViolation(
            "Encrypted PDF files are not supported".to_string(),
        ));
    }

    let pages = document.get_pages();
    let mut page_texts = Vec::with_capacity(pages.len());

    // get_pages()はページ番号（1始まり）の昇順
    for page_number in pages.keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    debug!(page = page_number, "PDF page has no text layer");
                } else {
                    page_texts.push(trimmed.to_string());
                }
            }
            Err(e) => {
                warn!(page = page_number, error = %e, "Failed to extract text from PDF page");
            }
        }
    }

    Ok(page_texts.join("\n"))
}
