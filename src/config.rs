//! Configuration Module
//!
//! YAML設定ファイルからAIエンジンの選択とプロバイダーごとの設定を読み込むモジュール。
//! 起動時に一度だけ構築され、実行中は変更されません。
//!
//! ```yaml
//! ai_engine: openai        # "openai" または "gemini"
//! openai:
//!   api_key: sk-...
//!   model: gpt-4
//! gemini:
//!   api_key: ...
//!   model: gemini-pro
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, TestcaseGenError};

/// HTTPリクエストのデフォルトタイムアウト（秒）
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// AIプロバイダーの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    /// OpenAI Chat Completions API
    #[default]
    OpenAi,
    /// Google Gemini generateContent API
    Gemini,
}

impl ProviderKind {
    /// 設定ファイル上の名前
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
        }
    }

    /// APIキーのフォールバックに使う環境変数名
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
        }
    }

    /// モデル名が未指定の場合のデフォルト
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4",
            ProviderKind::Gemini => "gemini-pro",
        }
    }

    /// ログやエラーメッセージ用の表示名
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Gemini => "Gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = TestcaseGenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(TestcaseGenError::Config(format!(
                "Unsupported AI engine: '{}' (expected 'openai' or 'gemini')",
                other
            ))),
        }
    }
}

/// プロバイダーごとの設定
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    /// APIキー（設定ファイル、なければ環境変数から取得）
    pub api_key: Option<String>,
    /// モデル名
    pub model: String,
    /// APIのベースURL（未指定の場合はプロバイダーの公式エンドポイント）
    pub base_url: Option<String>,
    /// サンプリング温度
    pub temperature: Option<f32>,
    /// HTTPタイムアウト
    pub timeout: Duration,
}

impl ProviderSettings {
    fn defaults_for(kind: ProviderKind) -> Self {
        Self {
            api_key: None,
            model: kind.default_model().to_string(),
            base_url: None,
            temperature: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// エンジン設定（不変）
///
/// # 使用例
///
/// ```rust
/// use testcasegen::{EngineConfig, ProviderKind};
///
/// # fn main() -> Result<(), testcasegen::TestcaseGenError> {
/// let config = EngineConfig::from_yaml_str(
///     "ai_engine: gemini\ngemini:\n  api_key: abc\n  model: gemini-1.5-flash\n",
/// )?;
/// assert_eq!(config.ai_engine, ProviderKind::Gemini);
/// assert_eq!(config.active().model, "gemini-1.5-flash");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// 使用するプロバイダー
    pub ai_engine: ProviderKind,
    pub openai: ProviderSettings,
    pub gemini: ProviderSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ai_engine: ProviderKind::default(),
            openai: ProviderSettings::defaults_for(ProviderKind::OpenAi),
            gemini: ProviderSettings::defaults_for(ProviderKind::Gemini),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    ai_engine: Option<String>,
    openai: Option<RawProviderSettings>,
    gemini: Option<RawProviderSettings>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawProviderSettings {
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
}

impl EngineConfig {
    /// 設定ファイルを読み込む
    ///
    /// # 戻り値
    ///
    /// * `Err(TestcaseGenError::Config)` - ファイルが存在しない、または値が不正な場合
    /// * `Err(TestcaseGenError::Yaml)` - YAMLとして解析できない場合
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => TestcaseGenError::Config(format!(
                "Configuration file '{}' not found",
                path.display()
            )),
            _ => TestcaseGenError::Io(e),
        })?;

        let config = Self::from_yaml_str(&content)?;
        debug!(path = %path.display(), ai_engine = %config.ai_engine, "Loaded configuration");
        Ok(config)
    }

    /// YAML文字列から設定を構築する（APIキーは環境変数にもフォールバックする）
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Self::from_yaml_str_with_env(yaml, |name| std::env::var(name).ok())
    }

    /// 環境変数の参照方法を指定してYAML文字列から設定を構築する
    pub fn from_yaml_str_with_env<F>(yaml: &str, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = if yaml.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };

        let ai_engine = match raw.ai_engine.as_deref() {
            Some(name) => name.parse()?,
            None => ProviderKind::default(),
        };

        Ok(Self {
            ai_engine,
            openai: resolve_settings(ProviderKind::OpenAi, raw.openai, &env)?,
            gemini: resolve_settings(ProviderKind::Gemini, raw.gemini, &env)?,
        })
    }

    /// 選択されたプロバイダーの設定
    pub fn active(&self) -> &ProviderSettings {
        self.settings_for(self.ai_engine)
    }

    pub fn settings_for(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Gemini => &self.gemini,
        }
    }

    /// 選択されたプロバイダーのAPIキーを取得する
    ///
    /// 未設定の場合は設定エラーになります。
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key_for(self.ai_engine)
    }

    pub fn api_key_for(&self, kind: ProviderKind) -> Result<&str> {
        self.settings_for(kind).api_key.as_deref().ok_or_else(|| {
            TestcaseGenError::Config(format!(
                "{} API key is required (set {}.api_key or the {} environment variable)",
                kind.display_name(),
                kind.as_str(),
                kind.api_key_env()
            ))
        })
    }
}

fn resolve_settings<F>(
    kind: ProviderKind,
    raw: Option<RawProviderSettings>,
    env: &F,
) -> Result<ProviderSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = raw.unwrap_or_default();
    let mut settings = ProviderSettings::defaults_for(kind);

    settings.api_key = non_empty(raw.api_key).or_else(|| non_empty(env(kind.api_key_env())));

    if let Some(model) = non_empty(raw.model) {
        settings.model = model;
    }

    settings.base_url = non_empty(raw.base_url).map(|url| url.trim_end_matches('/').to_string());

    if let Some(temperature) = raw.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(TestcaseGenError::Config(format!(
                "{}.temperature must be between 0.0 and 2.0, got {}",
                kind, temperature
            )));
        }
        settings.temperature = Some(temperature);
    }

    if let Some(secs) = raw.timeout_secs {
        if secs == 0 {
            return Err(TestcaseGenError::Config(format!(
                "{}.timeout_secs must be greater than 0",
                kind
            )));
        }
        settings.timeout = Duration::from_secs(secs);
    }

    Ok(settings)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
