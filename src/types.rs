//! Type Definitions Module
//!
//! テストケース行とその属性を表すデータ型を定義するモジュール。

use std::fmt;
use std::str::FromStr;

/// 新規テストケースの初期ステータス
pub const DEFAULT_STATUS: &str = "Not Executed";

/// 出力スプレッドシートの列見出し（順序固定）
pub const COLUMNS: [&str; 9] = [
    "Test ID",
    "Feature",
    "Test Case Title",
    "Test Steps",
    "Expected Result",
    "Priority",
    "Status",
    "Actual Result",
    "Notes",
];

/// テストの優先度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// 表示用の文字列
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    /// LLMの出力に現れる表記ゆれを許容して優先度を解釈する
    ///
    /// `"high"`, `"HIGH"`, `"P1"`, `"critical"` などを受け付けます。
    /// 解釈できない場合は`None`を返します。
    pub fn parse_lenient(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "high" | "h" | "p1" | "p0" | "critical" | "urgent" => Some(Priority::High),
            "medium" | "med" | "m" | "p2" | "normal" | "moderate" => Some(Priority::Medium),
            "low" | "l" | "p3" | "p4" | "minor" => Some(Priority::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::parse_lenient(s).ok_or_else(|| format!("unknown priority: '{}'", s))
    }
}

/// 手動テストケース1件（出力スプレッドシートの1行）
///
/// AIエンジンが応答の解析結果から生成し、エクスポーターは読み取るだけです。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseRecord {
    /// 連番の識別子（例: `TC001`）
    pub test_id: String,
    /// テスト対象の機能名
    pub feature: String,
    /// テストケースのタイトル
    pub title: String,
    /// テスト手順（複数行になることが多い）
    pub steps: String,
    /// 期待結果
    pub expected_result: String,
    /// 優先度
    pub priority: Priority,
    /// 実行ステータス（生成時は常に`"Not Executed"`）
    pub status: String,
    /// 実際の結果（生成時は空。手動で記入する）
    pub actual_result: String,
    /// 備考
    pub notes: Option<String>,
}

impl TestCaseRecord {
    /// 連番から識別子を生成する（1始まり、3桁ゼロ埋め）
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use testcasegen::TestCaseRecord;
    ///
    /// assert_eq!(TestCaseRecord::format_id(1), "TC001");
    /// assert_eq!(TestCaseRecord::format_id(1234), "TC1234");
    /// ```
    pub fn format_id(sequence: usize) -> String {
        format!("TC{:03}", sequence)
    }

    /// 必須項目のみを指定してレコードを生成する
    ///
    /// `status`は`"Not Executed"`、`actual_result`は空、優先度は`Medium`になります。
    pub fn new(sequence: usize, feature: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            test_id: Self::format_id(sequence),
            feature: feature.into(),
            title: title.into(),
            steps: String::new(),
            expected_result: String::new(),
            priority: Priority::default(),
            status: DEFAULT_STATUS.to_string(),
            actual_result: String::new(),
            notes: None,
        }
    }

    pub fn with_steps(mut self, steps: impl Into<String>) -> Self {
        self.steps = steps.into();
        self
    }

    pub fn with_expected_result(mut self, expected: impl Into<String>) -> Self {
        self.expected_result = expected.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        let notes = notes.into();
        self.notes = if notes.is_empty() { None } else { Some(notes) };
        self
    }

    /// AIエンジンが有効な行を1件も得られなかった場合の代替レコード
    ///
    /// 出力ファイルは常に生成され、失敗理由は`notes`に記録されます。
    pub fn fallback(reason: impl fmt::Display) -> Self {
        Self::new(1, "N/A", "No test cases generated")
            .with_priority(Priority::Low)
            .with_notes(format!("Generation failed: {}", reason))
    }

    /// スプレッドシートの列順に並べたセル値
    pub fn to_row(&self) -> [&str; 9] {
        [
            self.test_id.as_str(),
            self.feature.as_str(),
            self.title.as_str(),
            self.steps.as_str(),
            self.expected_result.as_str(),
            self.priority.as_str(),
            self.status.as_str(),
            self.actual_result.as_str(),
            self.notes.as_deref().unwrap_or(""),
        ]
    }
}

/// 手順のリストを番号付きの複数行テキストに整形する
///
/// 既に`"1. "`のような番号が付いている項目は二重に番号を付けません。
pub(crate) fn number_steps<S: AsRef<str>>(steps: &[S]) -> String {
    steps
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .enumerate()
        .map(|(i, step)| {
            if has_numbering(step) {
                step.to_string()
            } else {
                format!("{}. {}", i + 1, step)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn has_numbering(step: &str) -> bool {
    let digits = step.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && matches!(step[digits..].chars().next(), Some('.') | Some(')'))
}
