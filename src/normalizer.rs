//! Text Normalizer Module
//!
//! 出力するセル文字列を整形するモジュール。

/// ノーブレークスペース (U+00A0)
const NO_BREAK_SPACE: char = '\u{00A0}';

/// セルの文字列を出力用に整形する
///
/// ノーブレークスペースを通常の空白 (U+0020) に置き換えます。
/// それ以外の文字（改行、通常の空白を含む）はそのまま残します。
///
/// # 使用例
///
/// ```rust
/// use form2txt::normalize;
///
/// assert_eq!(normalize("売上高\u{00A0}100"), "売上高 100");
/// ```
pub fn normalize(raw: &str) -> String {
    raw.replace(NO_BREAK_SPACE, " ")
}
