//! Pipeline Module
//!
//! テキスト抽出 → テストケース生成 → スプレッドシート出力を1回の実行として束ねる
//! ファサードと、それを段階的に構築するビルダーを提供する。

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::engine::{create_engine, TestCaseEngine};
use crate::error::{Result, TestcaseGenError};
use crate::export::write_testcases;
use crate::extract::{extract, DocumentFormat};

/// 1回の実行で生成したものの要約
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// 入力ドキュメントの形式
    pub format: DocumentFormat,
    /// 抽出したテキストの文字数
    pub characters: usize,
    /// 書き出したテストケースの件数
    pub testcases: usize,
    /// フォールバックレコードを書き出した場合、その理由
    pub fallback: Option<String>,
    /// 出力ファイルのパス
    pub output: PathBuf,
}

impl RunSummary {
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// `Pipeline`を構築するビルダー
///
/// エンジンを直接指定した場合はそれを使い、指定がなければ設定からエンジンを生成します。
///
/// # 使用例
///
/// ```rust,no_run
/// use testcasegen::{EngineConfig, PipelineBuilder};
///
/// # fn main() -> Result<(), testcasegen::TestcaseGenError> {
/// let config = EngineConfig::load("config.yaml")?;
/// let pipeline = PipelineBuilder::new().with_config(config).build()?;
/// let summary = pipeline.run("requirements.docx", "testcases.xlsx")?;
/// println!("{} test cases", summary.testcases);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<EngineConfig>,
    engine: Option<Box<dyn TestCaseEngine>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// エンジン設定を指定する
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// 生成済みのエンジンを指定する（設定より優先される）
    pub fn with_engine(mut self, engine: Box<dyn TestCaseEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// # 戻り値
    ///
    /// * `Err(TestcaseGenError::Config)` - エンジンも設定も指定されていない、
    ///   またはAPIキーが未設定の場合
    pub fn build(self) -> Result<Pipeline> {
        let engine = match (self.engine, self.config) {
            (Some(engine), _) => engine,
            (None, Some(config)) => create_engine(&config)?,
            (None, None) => {
                return Err(TestcaseGenError::Config(
                    "No AI engine configured".to_string(),
                ))
            }
        };
        Ok(Pipeline { engine })
    }
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("config", &self.config.as_ref().map(|c| c.ai_engine))
            .field("engine", &self.engine.as_ref().map(|e| e.provider().to_string()))
            .finish()
    }
}

/// 1回の生成処理のファサード
pub struct Pipeline {
    engine: Box<dyn TestCaseEngine>,
}

impl Pipeline {
    /// 使用しているプロバイダー名
    pub fn provider(&self) -> &str {
        self.engine.provider()
    }

    /// 要件ドキュメントからテストケースを生成し、XLSXに書き出す
    ///
    /// # 処理フロー
    ///
    /// 1. テキスト抽出（入力エラーはここで中断、プロバイダーは呼ばれない）
    /// 2. テストケース生成（失敗してもフォールバックレコードで続行）
    /// 3. スプレッドシート出力（書き込みエラーは中断）
    pub fn run(&self, input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<RunSummary> {
        let output = output.as_ref();

        let document = extract(input.as_ref())?;
        let generation = self.engine.generate_testcases(&document.text);

        if let Some(reason) = &generation.fallback_reason {
            warn!(reason = %reason, "Writing fallback record");
        }

        write_testcases(&generation.records, output)?;

        let summary = RunSummary {
            format: document.format,
            characters: document.char_count(),
            testcases: generation.records.len(),
            fallback: generation.fallback_reason,
            output: output.to_path_buf(),
        };
        info!(
            provider = self.engine.provider(),
            testcases = summary.testcases,
            output = %output.display(),
            "Pipeline run completed"
        );
        Ok(summary)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("provider", &self.engine.provider())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;

    struct EchoEngine;

    impl TestCaseEngine for EchoEngine {
        fn provider(&self) -> &str {
            "echo"
        }

        fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(r#"[{"feature": "Echo", "title": "Echo the input"}]"#.to_string())
        }
    }

    #[test]
    fn test_build_requires_engine_or_config() {
        match PipelineBuilder::new().build() {
            Err(TestcaseGenError::Config(msg)) => assert!(msg.contains("No AI engine")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_engine_takes_precedence_over_config() {
        let pipeline = PipelineBuilder::new()
            .with_config(EngineConfig::default())
            .with_engine(Box::new(EchoEngine))
            .build()
            .unwrap();
        assert_eq!(pipeline.provider(), "echo");
    }

    #[test]
    fn test_build_from_config() {
        let mut config = EngineConfig::default();
        config.ai_engine = ProviderKind::Gemini;
        config.gemini.api_key = Some("g-key".to_string());

        let pipeline = PipelineBuilder::new().with_config(config).build().unwrap();
        assert_eq!(pipeline.provider(), "Gemini");
        assert!(!format!("{:?}", pipeline).contains("g-key"));
    }

    #[test]
    fn test_run_writes_summary() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("req.txt");
        std::fs::write(&input, "The system echoes input.").unwrap();
        let output = dir.path().join("out.xlsx");

        let pipeline = PipelineBuilder::new()
            .with_engine(Box::new(EchoEngine))
            .build()
            .unwrap();
        let summary = pipeline.run(&input, &output).unwrap();

        assert_eq!(summary.format, DocumentFormat::Text);
        assert_eq!(summary.characters, 24);
        assert_eq!(summary.testcases, 1);
        assert!(!summary.is_fallback());
        assert!(output.exists());
    }
}
