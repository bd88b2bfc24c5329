//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use std::path::PathBuf;
use thiserror::Error;

/// クレート全体で使用する`Result`型エイリアス
pub type Result<T> = std::result::Result<T, TestcaseGenError>;

/// testcasegenクレート全体で使用するエラー型
///
/// 要件ドキュメントの読み込み、設定の読み込み、AIプロバイダーとの通信、
/// スプレッドシートの書き込み中に発生するすべてのエラーを統一的に扱います。
///
/// # エラーの分類
///
/// - 入力エラー: `InputNotFound`, `UnsupportedFormat`, `EmptyDocument`, `Pdf`, `Zip`, `Xml`,
///   `SecurityViolation`
/// - 設定エラー: `Config`, `Yaml`
/// - プロバイダーエラー: `Provider`, `Http`, `Json`（AIエンジン内部でフォールバック行に変換される）
/// - 出力エラー: `Export`, `Spreadsheet`, `InvalidWorkbook`
/// - `Io`はどの段階でも発生し得ます
///
/// # 使用例
///
/// ```rust,no_run
/// use testcasegen::{extract, TestcaseGenError};
///
/// match extract("requirements.csv") {
///     Err(TestcaseGenError::UnsupportedFormat { extension }) => {
///         println!("未対応の形式: {}", extension);
///     }
///     _ => {}
/// }
/// ```
#[derive(Error, Debug)]
pub enum TestcaseGenError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 入力ファイルが存在しない
    #[error("Input file '{}' not found", .0.display())]
    InputNotFound(PathBuf),

    /// 対応していない拡張子
    ///
    /// ネットワーク呼び出しよりも前に検出されます。
    #[error("Unsupported file format: '{extension}'. Supported formats: .pdf, .docx, .txt")]
    UnsupportedFormat {
        /// 検出された拡張子（ドットなし、拡張子がない場合は空文字列）
        extension: String,
    },

    /// 抽出したテキストが空、または空白のみ
    #[error("No text content found in '{}'", .0.display())]
    EmptyDocument(PathBuf),

    /// PDFの解析エラー（lopdf由来）
    #[error("Failed to read PDF file: {0}")]
    Pdf(#[from] lopdf::Error),

    /// ZIPアーカイブの解析エラー
    ///
    /// DOCXファイル（ZIPアーカイブ）の解析中に発生したエラーです。
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// XMLの解析エラー（quick-xml由来）
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// セキュリティ制限に違反したエラー
    ///
    /// ZIP bomb攻撃、パストラバーサル攻撃、ファイルサイズ制限などの
    /// セキュリティ制限に違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),

    /// 設定の検証に失敗したエラー
    ///
    /// 設定ファイルが存在しない、APIキーが未設定、未知のAIエンジン名などの場合に発生します。
    ///
    /// # 例
    ///
    /// ```rust,no_run
    /// use testcasegen::{EngineConfig, TestcaseGenError};
    ///
    /// match EngineConfig::load("missing.yaml") {
    ///     Err(TestcaseGenError::Config(msg)) => println!("設定エラー: {}", msg),
    ///     _ => {}
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// YAMLの構文エラー
    #[error("Failed to parse configuration file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// AIプロバイダーがエラーを返した、または応答が期待した形でなかった
    #[error("Provider error: {0}")]
    Provider(String),

    /// HTTP通信エラー（接続失敗、タイムアウトなど）
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSONの解析エラー
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// スプレッドシートの書き込みエラー（rust_xlsxwriter由来）
    #[error("Failed to write spreadsheet: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    /// スプレッドシートの読み込みエラー（calamine由来）
    #[error("Failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// 読み込んだワークブックがテストケースの形式（シート名・列見出し）と一致しない
    #[error("Not a test case workbook: {0}")]
    InvalidWorkbook(String),
}

impl TestcaseGenError {
    /// AIプロバイダーとの通信で発生したエラーかどうか
    ///
    /// これらのエラーはAIエンジン内でフォールバック行に変換され、実行を中断しません。
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            TestcaseGenError::Provider(_) | TestcaseGenError::Http(_) | TestcaseGenError::Json(_)
        )
    }

    /// 入力ドキュメントに起因するエラーかどうか
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            TestcaseGenError::InputNotFound(_)
                | TestcaseGenError::UnsupportedFormat { .. }
                | TestcaseGenError::EmptyDocument(_)
                | TestcaseGenError::Pdf(_)
                | TestcaseGenError::Zip(_)
                | TestcaseGenError::Xml(_)
                | TestcaseGenError::SecurityViolation(_)
        )
    }
}
