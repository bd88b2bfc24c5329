//! Response Parsing
//!
//! LLMの応答テキストをテストケース行に変換する純粋関数群。
//! ネットワーク呼び出しから切り離されており、固定文字列だけでテストできます。
//!
//! 解析は2段階のベストエフォート方式です。
//!
//! 1. 応答中のJSON配列（コードフェンスや前置きの文章があってもよい）
//! 2. JSONが見つからない場合は、`|`またはタブ区切りの表形式
//!
//! タイトルを持たない行は警告を出して破棄します。

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::types::{number_steps, Priority, TestCaseRecord};

/// 応答から取り出した1行分（識別子は未割り当て）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialTestCase {
    pub feature: String,
    /// 常に空でない
    pub title: String,
    pub steps: String,
    pub expected_result: String,
    /// 解釈できなかった場合は`None`
    pub priority: Option<Priority>,
    pub notes: String,
}

/// 応答がどの形式として解釈されたか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseLayout {
    /// JSON配列
    Json,
    /// `|`またはタブ区切りの表
    Delimited,
    /// どちらとしても解釈できなかった
    #[default]
    Unrecognized,
}

/// 応答の解析結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResponse {
    pub layout: ResponseLayout,
    /// 採用された行（応答中の順序を保持）
    pub rows: Vec<PartialTestCase>,
    /// タイトルがないなどの理由で破棄された行数
    pub discarded: usize,
}

impl ParsedResponse {
    fn accept(&mut self, row: RowBuilder, position: usize) {
        match row.finish() {
            Some(partial) => self.rows.push(partial),
            None => {
                self.discarded += 1;
                warn!(row = position, "Discarding response row without a title");
            }
        }
    }
}

/// 列（またはJSONキー）の意味
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    TestId,
    Feature,
    Title,
    Steps,
    Expected,
    Priority,
    Status,
    ActualResult,
    Notes,
}

/// 正規のキー名（`title`など）の優先順位。別名はこれより後ろに回る
const CANONICAL_RANK: u8 = 0;
const ALIAS_RANK: u8 = 1;

impl Field {
    /// 見出しやキーの表記ゆれ（大文字小文字、空白、`_`、`-`）を吸収して判定する
    fn from_key(key: &str) -> Option<Field> {
        Self::classify(key).map(|(field, _)| field)
    }

    /// キーの意味と優先順位を返す
    ///
    /// 正規のキー名はキーの出現順に関係なく別名より優先されます。
    fn classify(key: &str) -> Option<(Field, u8)> {
        let normalized: String = key
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();

        let field = Self::from_normalized(&normalized)?;
        let rank = if normalized == field.canonical_key() {
            CANONICAL_RANK
        } else {
            ALIAS_RANK
        };
        Some((field, rank))
    }

    fn canonical_key(self) -> &'static str {
        match self {
            Field::TestId => "testid",
            Field::Feature => "feature",
            Field::Title => "title",
            Field::Steps => "steps",
            Field::Expected => "expectedresult",
            Field::Priority => "priority",
            Field::Status => "status",
            Field::ActualResult => "actualresult",
            Field::Notes => "notes",
        }
    }

    fn from_normalized(normalized: &str) -> Option<Field> {
        match normalized {
            "testid" | "id" | "tcid" | "testcaseid" | "caseid" => Some(Field::TestId),
            "feature" | "featurename" | "module" | "area" | "component" => Some(Field::Feature),
            "title" | "testcasetitle" | "testcase" | "testcasename" | "testtitle" | "name"
            | "scenario" | "summary" => Some(Field::Title),
            "steps" | "teststeps" | "step" | "procedure" => Some(Field::Steps),
            "expectedresult" | "expectedresults" | "expected" | "expectedoutcome"
            | "expectedbehavior" => Some(Field::Expected),
            "priority" => Some(Field::Priority),
            "status" => Some(Field::Status),
            "actualresult" | "actual" => Some(Field::ActualResult),
            "notes" | "note" | "comments" | "comment" | "remarks" => Some(Field::Notes),
            _ => None,
        }
    }
}

/// 見出しがない表の列順
const POSITIONAL_FIELDS: [Field; 6] = [
    Field::Feature,
    Field::Title,
    Field::Steps,
    Field::Expected,
    Field::Priority,
    Field::Notes,
];

/// 優先順位付きの値
type Ranked = Option<(u8, String)>;

#[derive(Debug, Default)]
struct RowBuilder {
    feature: Ranked,
    title: Ranked,
    steps: Ranked,
    expected_result: Ranked,
    priority: Ranked,
    notes: Ranked,
}

impl RowBuilder {
    fn set(&mut self, field: Field, value: String) {
        self.set_ranked(field, CANONICAL_RANK, value);
    }

    /// 空でない値のうち、優先順位が最も高いもの（同順位なら最初のもの）を採用する
    fn set_ranked(&mut self, field: Field, rank: u8, value: String) {
        if value.is_empty() {
            return;
        }
        let slot = match field {
            Field::Feature => &mut self.feature,
            Field::Title => &mut self.title,
            Field::Steps => &mut self.steps,
            Field::Expected => &mut self.expected_result,
            Field::Priority => &mut self.priority,
            Field::Notes => &mut self.notes,
            // 識別子とステータスはエンジン側で決める
            Field::TestId | Field::Status | Field::ActualResult => return,
        };
        if !matches!(slot, Some((current, _)) if *current <= rank) {
            *slot = Some((rank, value));
        }
    }

    fn finish(self) -> Option<PartialTestCase> {
        let value = |slot: Ranked| slot.map(|(_, v)| v);
        let title = value(self.title)?;
        let raw_priority = value(self.priority);
        let priority = raw_priority.as_deref().and_then(|raw| {
            let parsed = Priority::parse_lenient(raw);
            if parsed.is_none() {
                debug!(priority = raw, "Unrecognized priority, using default");
            }
            parsed
        });

        Some(PartialTestCase {
            feature: value(self.feature).unwrap_or_default(),
            title,
            steps: value(self.steps).unwrap_or_default(),
            expected_result: value(self.expected_result).unwrap_or_default(),
            priority,
            notes: value(self.notes).unwrap_or_default(),
        })
    }
}

/// LLMの応答テキストを解析する
///
/// # 使用例
///
/// ```rust
/// use testcasegen::engine::{parse_response, ResponseLayout};
///
/// let raw = r#"Here you go:
/// [{"feature": "Login", "title": "Verify successful login", "steps": ["Open page", "Submit"]}]"#;
/// let parsed = parse_response(raw);
/// assert_eq!(parsed.layout, ResponseLayout::Json);
/// assert_eq!(parsed.rows[0].steps, "1. Open page\n2. Submit");
/// ```
pub fn parse_response(raw: &str) -> ParsedResponse {
    if let Some(items) = find_json_array(raw) {
        let mut parsed = ParsedResponse {
            layout: ResponseLayout::Json,
            ..ParsedResponse::default()
        };
        for (position, item) in items.iter().enumerate() {
            match item {
                Value::Object(map) => parsed.accept(row_from_object(map), position + 1),
                other => {
                    parsed.discarded += 1;
                    warn!(row = position + 1, kind = json_kind(other), "Discarding non-object JSON item");
                }
            }
        }
        return parsed;
    }

    parse_delimited(raw)
}

/// 解析済みの行に連番の識別子を割り当ててレコードにする
///
/// 識別子は`TC001`から始まり、行の順序と一致します。
pub fn number_records(rows: Vec<PartialTestCase>) -> Vec<TestCaseRecord> {
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            let sequence = index + 1;
            let feature = if row.feature.is_empty() {
                format!("Feature {}", sequence)
            } else {
                row.feature
            };
            TestCaseRecord::new(sequence, feature, row.title)
                .with_steps(row.steps)
                .with_expected_result(row.expected_result)
                .with_priority(row.priority.unwrap_or_default())
                .with_notes(row.notes)
        })
        .collect()
}

/// テキスト中で最初に現れる、オブジェクトを含むJSON配列を探す
///
/// 前置きの文章、コードフェンス、後続の文章は無視します。
fn find_json_array(text: &str) -> Option<Vec<Value>> {
    for (start, _) in text.match_indices('[') {
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Vec<Value>>();
        if let Some(Ok(items)) = stream.next() {
            if items.iter().any(Value::is_object) {
                return Some(items);
            }
        }
    }
    None
}

fn row_from_object(map: &Map<String, Value>) -> RowBuilder {
    let mut row = RowBuilder::default();
    for (key, value) in map {
        if let Some((field, rank)) = Field::classify(key) {
            if let Some(text) = json_text(value, field == Field::Steps) {
                row.set_ranked(field, rank, text);
            }
        }
    }
    row
}

fn json_text(value: &Value, numbered: bool) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(|v| json_text(v, false)).collect();
            if numbered {
                Some(number_steps(&parts))
            } else {
                Some(parts.join("\n"))
            }
        }
        Value::Object(_) => Some(value.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn parse_delimited(text: &str) -> ParsedResponse {
    let mut parsed = ParsedResponse::default();
    let mut header: Option<Vec<Option<(Field, u8)>>> = None;
    let mut saw_table = false;

    for (line_index, line) in text.lines().enumerate() {
        let Some(cells) = split_cells(line) else {
            continue;
        };
        saw_table = true;

        if is_separator_row(&cells) {
            continue;
        }
        if looks_like_header(&cells) {
            header = Some(cells.iter().map(|c| Field::classify(c)).collect());
            continue;
        }

        let mut row = RowBuilder::default();
        match &header {
            Some(fields) => {
                for (cell, field) in cells.into_iter().zip(fields) {
                    if let Some((field, rank)) = field {
                        row.set_ranked(*field, *rank, cell);
                    }
                }
            }
            None => fill_positional(cells, &mut row),
        }
        parsed.accept(row, line_index + 1);
    }

    if saw_table {
        parsed.layout = ResponseLayout::Delimited;
    }
    parsed
}

fn fill_positional(mut cells: Vec<String>, row: &mut RowBuilder) {
    if cells.first().is_some_and(|c| looks_like_id(c)) {
        cells.remove(0);
    }
    if cells.len() == 1 {
        row.set(Field::Title, cells.remove(0));
        return;
    }
    for (cell, field) in cells.into_iter().zip(POSITIONAL_FIELDS) {
        row.set(field, cell);
    }
}

/// 1行をセルに分割する（区切りがない行、列が1つしかない行は`None`）
fn split_cells(line: &str) -> Option<Vec<String>> {
    let line = line.trim();
    let delimiter = if line.contains('|') {
        '|'
    } else if line.contains('\t') {
        '\t'
    } else {
        return None;
    };

    let mut cells: Vec<String> = line.split(delimiter).map(clean_cell).collect();
    if delimiter == '|' {
        // Markdown表の外枠
        if line.starts_with('|') {
            cells.remove(0);
        }
        if line.ends_with('|') && !cells.is_empty() {
            cells.pop();
        }
    }

    if cells.len() < 2 {
        return None;
    }
    Some(cells)
}

fn clean_cell(cell: &str) -> String {
    cell.replace("<br />", "\n")
        .replace("<br/>", "\n")
        .replace("<br>", "\n")
        .trim()
        .trim_matches('*')
        .trim()
        .to_string()
}

fn is_separator_row(cells: &[String]) -> bool {
    cells
        .iter()
        .all(|c| c.chars().all(|ch| matches!(ch, '-' | ':' | '=' | ' ')))
        && cells.iter().any(|c| c.contains('-') || c.contains('='))
}

fn looks_like_header(cells: &[String]) -> bool {
    let fields: Vec<Field> = cells.iter().filter_map(|c| Field::from_key(c)).collect();
    fields.len() >= 2 && fields.contains(&Field::Title)
}

/// `TC001`, `TC-12`, `#3`, `7`のような識別子セルか
fn looks_like_id(cell: &str) -> bool {
    let rest = cell.trim().trim_start_matches('#');
    let letters = rest.chars().take_while(|c| c.is_ascii_alphabetic()).count();
    if letters > 4 {
        return false;
    }
    let digits = rest[letters..].trim_start_matches(|c| matches!(c, '-' | '_' | ' '));
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}
