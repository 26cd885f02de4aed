//! Sheet Extractor Module
//!
//! シートの行を順に走査し、出力すべきA列の文字列を取り出すモジュール。

use crate::classifier::is_printable;
use crate::normalizer::normalize;
use crate::types::{Sheet, SheetRow};

/// 本文を読み取る列（A列）
const TEXT_COLUMN: u32 = 0;

/// シートから出力行を遅延的に取り出すイテレータ
///
/// [`extract_lines`]で生成します。入力のシートは変更しないため、
/// 同じシートに対して何度でも作り直せます。
#[derive(Debug, Clone)]
pub struct SheetLines<'a> {
    rows: std::slice::Iter<'a, SheetRow>,
}

impl Iterator for SheetLines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        for row in self.rows.by_ref() {
            // 空行は飛ばす
            if row.is_blank() {
                continue;
            }

            let cell = row.cell(TEXT_COLUMN);
            if is_printable(cell) {
                if let Some(value) = cell.and_then(|c| c.value()) {
                    return Some(normalize(value));
                }
            }
        }
        None
    }
}

/// シートの出力行を取り出す
///
/// 行の順序を保ちます。出力しない行は何も生成せず、空行も挿入しません。
///
/// # 使用例
///
/// ```rust
/// use form2txt::{extract_lines, Sheet, SheetRow, SpreadsheetCell};
///
/// let sheet = Sheet::new(
///     "事業の状況",
///     vec![
///         SheetRow::new().with_cell(0, SpreadsheetCell::text("本文")),
///         SheetRow::new(),
///         SheetRow::new().with_cell(0, SpreadsheetCell::text("表").with_left_border(true)),
///     ],
/// );
/// let lines: Vec<String> = extract_lines(&sheet).collect();
/// assert_eq!(lines, vec!["本文"]);
/// ```
pub fn extract_lines(sheet: &Sheet) -> SheetLines<'_> {
    SheetLines {
        rows: sheet.rows().iter(),
    }
}
