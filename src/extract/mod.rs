//! Text Extraction Module
//!
//! 要件ドキュメント（TXT / DOCX / PDF）からプレーンテキストを抽出するモジュール。
//! 形式は拡張子で判定し、未対応の形式はネットワーク呼び出しの前に拒否します。

mod docx;
mod pdf;
mod text;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TestcaseGenError};
use crate::security::SecurityConfig;

pub(crate) use docx::extract_docx;
pub(crate) use pdf::extract_pdf;
pub(crate) use text::decode_text;

/// 対応している入力ドキュメント形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// プレーンテキスト（`.txt`）
    Text,
    /// Word文書（`.docx`）
    Docx,
    /// PDF（`.pdf`）
    Pdf,
}

impl DocumentFormat {
    /// 拡張子（大文字小文字を区別しない）から形式を判定する
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use testcasegen::DocumentFormat;
    ///
    /// assert_eq!(DocumentFormat::from_path("spec.DOCX").unwrap(), DocumentFormat::Docx);
    /// assert!(DocumentFormat::from_path("data.csv").is_err());
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "txt" => Ok(DocumentFormat::Text),
            "docx" => Ok(DocumentFormat::Docx),
            "pdf" => Ok(DocumentFormat::Pdf),
            _ => Err(TestcaseGenError::UnsupportedFormat { extension }),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Text => "txt",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}", self.extension())
    }
}

/// 抽出済みの要件ドキュメント
///
/// 内部構造は持たず、機能の境界を見つけるのはLLMの役割です。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// 入力ファイルのパス
    pub path: PathBuf,
    /// 判定された形式
    pub format: DocumentFormat,
    /// 抽出されたプレーンテキスト（空白のみになることはない）
    pub text: String,
}

impl ExtractedDocument {
    /// 抽出したテキストの文字数
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// ファイルからテキストを抽出する
///
/// # 引数
///
/// * `path` - 入力ファイルのパス（`.txt`, `.docx`, `.pdf`）
///
/// # 戻り値
///
/// * `Ok(ExtractedDocument)` - 空でないテキストを抽出できた場合
/// * `Err(TestcaseGenError::UnsupportedFormat)` - 拡張子が未対応の場合（ファイルは読まない）
/// * `Err(TestcaseGenError::InputNotFound)` - ファイルが存在しない場合
/// * `Err(TestcaseGenError::EmptyDocument)` - 抽出結果が空白のみの場合
///
/// # 使用例
///
/// ```rust,no_run
/// use testcasegen::extract;
///
/// # fn main() -> Result<(), testcasegen::TestcaseGenError> {
/// let document = extract("requirements.docx")?;
/// println!("{} characters", document.char_count());
/// # Ok(())
/// # }
/// ```
pub fn extract(path: impl AsRef<Path>) -> Result<ExtractedDocument> {
    let path = path.as_ref();
    let format = DocumentFormat::from_path(path)?;

    if !path.is_file() {
        return Err(TestcaseGenError::InputNotFound(path.to_path_buf()));
    }

    let security_config = SecurityConfig::default();
    security_config.check_input_size(fs::metadata(path)?.len())?;

    let bytes = fs::read(path)?;
    debug!(path = %path.display(), %format, bytes = bytes.len(), "Read input document");

    let text = extract_from_bytes(format, &bytes, &security_config)?;
    if text.trim().is_empty() {
        return Err(TestcaseGenError::EmptyDocument(path.to_path_buf()));
    }

    let document = ExtractedDocument {
        path: path.to_path_buf(),
        format,
        text,
    };
    info!(
        path = %path.display(),
        characters = document.char_count(),
        "Extracted text from document"
    );
    Ok(document)
}

/// 形式に応じた抽出処理を振り分ける
fn extract_from_bytes(
    format: DocumentFormat,
    bytes: &[u8],
    security_config: &SecurityConfig,
) -> Result<String> {
    match format {
        DocumentFormat::Text => Ok(decode_text(bytes)),
        DocumentFormat::Docx => extract_docx(bytes, security_config),
        DocumentFormat::Pdf => extract_pdf(bytes),
    }
}
