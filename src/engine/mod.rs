//! AI Engine Module
//!
//! 要件テキストからテストケースを生成するAIエンジンを提供するモジュール。
//!
//! プロバイダーごとの違いは[`TestCaseEngine::complete`]（1回のHTTPリクエスト）だけに閉じ込め、
//! プロンプト構築・応答解析・フォールバック処理は[`TestCaseEngine::generate_testcases`]で共通化します。

mod gemini;
mod openai;
mod parse;
mod prompt;

use std::error::Error as StdError;
use std::net::IpAddr;

use reqwest::blocking::{Client, Response};
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, ProviderKind, ProviderSettings};
use crate::error::{Result, TestcaseGenError};
use crate::types::TestCaseRecord;

pub use gemini::GeminiEngine;
pub use openai::OpenAiEngine;
pub use parse::{number_records, parse_response, ParsedResponse, PartialTestCase, ResponseLayout};
pub use prompt::{build_prompt, SYSTEM_PROMPT};

/// 出力の揺らぎを抑えるための既定温度（全プロバイダー共通）
pub(crate) const DEFAULT_TEMPERATURE: f32 = 0.3;

/// エラー応答の本文をメッセージに含める際の最大文字数
const ERROR_BODY_EXCERPT_CHARS: usize = 300;

/// テストケース生成の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// 生成されたレコード（常に1件以上、識別子はTC001からの連番）
    pub records: Vec<TestCaseRecord>,
    /// フォールバックレコードを返した場合、その理由
    pub fallback_reason: Option<String>,
    /// 応答から破棄された行数
    pub discarded: usize,
}

impl Generation {
    fn fallback(reason: String, discarded: usize) -> Self {
        Self {
            records: vec![TestCaseRecord::fallback(&reason)],
            fallback_reason: Some(reason),
            discarded,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

/// テストケース生成エンジン（Strategy Pattern）
///
/// 実装者は[`complete`](TestCaseEngine::complete)のみを提供すれば、
/// 共通の生成処理（プロンプト構築、応答解析、フォールバック）を利用できます。
///
/// # 使用例
///
/// ```rust
/// use testcasegen::{Result, TestCaseEngine};
///
/// struct Canned;
///
/// impl TestCaseEngine for Canned {
///     fn provider(&self) -> &str {
///         "canned"
///     }
///
///     fn complete(&self, _prompt: &str) -> Result<String> {
///         Ok(r#"[{"feature": "Login", "title": "Verify successful login"}]"#.to_string())
///     }
/// }
///
/// let generation = Canned.generate_testcases("Users must be able to log in.");
/// assert_eq!(generation.records[0].test_id, "TC001");
/// ```
pub trait TestCaseEngine {
    /// ログやメッセージに使うプロバイダー名
    fn provider(&self) -> &str;

    /// プロンプトを送信し、応答テキストを返す（外部への唯一の副作用）
    fn complete(&self, prompt: &str) -> Result<String>;

    /// 要件テキストからテストケースを生成する
    ///
    /// プロバイダーの呼び出しに失敗した場合や、有効な行が1件も得られなかった場合は、
    /// エラーを返す代わりに失敗理由を記録したフォールバックレコードを1件返します。
    fn generate_testcases(&self, requirement_text: &str) -> Generation {
        let provider = self.provider();
        let prompt = build_prompt(requirement_text);
        info!(provider, prompt_chars = prompt.len(), "Requesting test cases");

        let raw = match self.complete(&prompt) {
            Ok(raw) => raw,
            Err(e) => {
                let detail = error_chain(&e);
                warn!(provider, error = %detail, "Provider request failed, emitting fallback record");
                return Generation::fallback(format!("{} request failed: {}", provider, detail), 0);
            }
        };

        let parsed = parse_response(&raw);
        debug!(
            provider,
            layout = ?parsed.layout,
            rows = parsed.rows.len(),
            discarded = parsed.discarded,
            "Parsed provider response"
        );

        if parsed.rows.is_empty() {
            warn!(provider, response_chars = raw.len(), "Response contained no usable test cases");
            return Generation::fallback(
                format!("{} returned no usable test cases", provider),
                parsed.discarded,
            );
        }

        let records = number_records(parsed.rows);
        info!(provider, count = records.len(), "Generated test cases");
        Generation {
            records,
            fallback_reason: None,
            discarded: parsed.discarded,
        }
    }
}

/// 設定に応じてエンジンを生成する
///
/// # 戻り値
///
/// * `Err(TestcaseGenError::Config)` - APIキーが未設定の場合
pub fn create_engine(config: &EngineConfig) -> Result<Box<dyn TestCaseEngine>> {
    let engine: Box<dyn TestCaseEngine> = match config.ai_engine {
        ProviderKind::OpenAi => Box::new(OpenAiEngine::from_config(config)?),
        ProviderKind::Gemini => Box::new(GeminiEngine::from_config(config)?),
    };
    info!(provider = engine.provider(), model = %config.active().model, "Initialized AI engine");
    Ok(engine)
}

/// プロバイダー共通のHTTPクライアントを構築する
///
/// ループバックアドレス宛て（ローカルのゲートウェイなど）はプロキシを経由しません。
pub(crate) fn build_http_client(settings: &ProviderSettings, base_url: &str) -> Result<Client> {
    let mut builder = Client::builder().timeout(settings.timeout);
    if is_loopback_url(base_url) {
        builder = builder.no_proxy();
    }
    Ok(builder.build()?)
}

/// 成功ステータスなら本文を返し、それ以外はプロバイダーエラーにする
pub(crate) fn read_success_body(provider: &str, response: Response) -> Result<String> {
    let status = response.status();
    let body = response.text()?;
    debug!(provider, %status, body_chars = body.len(), "Received provider response");

    if !status.is_success() {
        return Err(TestcaseGenError::Provider(format!(
            "{} API error {}: {}",
            provider,
            status,
            excerpt(&body)
        )));
    }
    Ok(body)
}

/// エラーとその原因（`source()`の連鎖）を`: `で連結する
///
/// `reqwest::Error`の表示は原因を含まないため、接続拒否やタイムアウトの理由はここで補います。
fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= ERROR_BODY_EXCERPT_CHARS {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(ERROR_BODY_EXCERPT_CHARS).collect();
        format!("{}...", cut)
    }
}

fn is_loopback_url(url: &str) -> bool {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .map(|host| {
            host == "localhost"
                || host
                    .trim_matches(|c| c == '[' || c == ']')
                    .parse::<IpAddr>()
                    .map(|ip| ip.is_loopback())
                    .unwrap_or(false)
        })
        .unwrap_or(false)
}
