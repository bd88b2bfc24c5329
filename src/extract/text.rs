//! プレーンテキストのデコード
//!
//! UTF-8としてデコードし、失敗した場合はLatin-1として再デコードします。

use encoding_rs::mem::decode_latin1;
use tracing::warn;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// バイト列をテキストとしてデコードする
///
/// Latin-1はすべてのバイト値を文字に対応付けるため、この関数は失敗しません。
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    match std::str::from_utf8(body) {
        Ok(text) => text.to_string(),
        Err(e) => {
            warn!(
                valid_up_to = e.valid_up_to(),
                "Input is not valid UTF-8, falling back to Latin-1"
            );
            decode_latin1(body).into_owned()
        }
    }
}
